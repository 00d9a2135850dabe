//! gzip and zlib framing: header validation and trailer verification.
//!
//! These are states of the same machine as the block decoder and pull bytes
//! through the same bit accumulator; every gzip header field is byte-aligned,
//! so the reads below are whole bytes and the header CRC can be fed as the
//! bytes are consumed.

use super::{InflateError, Inflater, State, Status};
use crate::common::*;
use crate::crc32::crc32;
use crate::window::SlidingWindow;

/// Position inside the optional gzip header fields, used to pick the next
/// state from the flag byte.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum GzipField {
    Meta,
    Extra,
    Name,
    Comment,
}

fn after_gzip_field(flags: u8, done: GzipField) -> State {
    if done < GzipField::Extra && flags & GZIP_FEXTRA != 0 {
        return State::GzExtraLen;
    }
    if done < GzipField::Name && flags & GZIP_FNAME != 0 {
        return State::GzName;
    }
    if done < GzipField::Comment && flags & GZIP_FCOMMENT != 0 {
        return State::GzComment;
    }
    if flags & GZIP_FHCRC != 0 {
        return State::GzHeaderCrc;
    }
    State::BlockStart
}

impl Inflater {
    /// Advances one envelope state. `Ok(None)` means the state changed and
    /// the main loop should continue; `Ok(Some(_))` suspends the call.
    pub(super) fn step_envelope(
        &mut self,
        input: &[u8],
        head: &mut usize,
        output: &[u8],
        out_pos: usize,
    ) -> Result<Option<Status>, InflateError> {
        match self.state {
            State::GzMagic => {
                if !self.bits.ensure(24, input, head) {
                    return Ok(Some(Status::NeedInput));
                }
                let id1 = self.bits.peek(8);
                let id2 = self.bits.peek(16) >> 8;
                let method = self.bits.peek(24) >> 16;
                if id1 != GZIP_ID1 || id2 != GZIP_ID2 {
                    return Err(InflateError::InvalidMagic);
                }
                if method != GZIP_CM_DEFLATE {
                    return Err(InflateError::UnsupportedMethod);
                }
                self.header_crc =
                    crc32(self.header_crc, &[id1 as u8, id2 as u8, method as u8]);
                self.bits.consume(24);
                self.state = State::GzFlags;
            }

            State::GzFlags => {
                if !self.bits.ensure(8, input, head) {
                    return Ok(Some(Status::NeedInput));
                }
                let flags = self.bits.peek(8) as u8;
                if flags & GZIP_FRESERVED != 0 {
                    return Err(InflateError::UnsupportedFlags);
                }
                self.header_crc = crc32(self.header_crc, &[flags]);
                self.bits.consume(8);
                self.gzip_flags = flags;
                // MTIME, XFL and OS are recorded nowhere; they still count
                // toward the header CRC.
                self.state = State::GzMeta { remaining: 6 };
            }

            State::GzMeta { ref mut remaining } => {
                while *remaining > 0 {
                    if !self.bits.ensure(8, input, head) {
                        return Ok(Some(Status::NeedInput));
                    }
                    let byte = self.bits.peek(8) as u8;
                    self.bits.consume(8);
                    self.header_crc = crc32(self.header_crc, &[byte]);
                    *remaining -= 1;
                }
                self.state = after_gzip_field(self.gzip_flags, GzipField::Meta);
            }

            State::GzExtraLen => {
                if !self.bits.ensure(16, input, head) {
                    return Ok(Some(Status::NeedInput));
                }
                let lo = self.bits.peek(8) as u8;
                let hi = (self.bits.peek(16) >> 8) as u8;
                self.header_crc = crc32(self.header_crc, &[lo, hi]);
                self.bits.consume(16);
                self.state = State::GzExtraSkip {
                    remaining: u16::from_le_bytes([lo, hi]) as usize,
                };
            }

            State::GzExtraSkip { ref mut remaining } => {
                while *remaining > 0 {
                    if !self.bits.ensure(8, input, head) {
                        return Ok(Some(Status::NeedInput));
                    }
                    let byte = self.bits.peek(8) as u8;
                    self.bits.consume(8);
                    self.header_crc = crc32(self.header_crc, &[byte]);
                    *remaining -= 1;
                }
                self.state = after_gzip_field(self.gzip_flags, GzipField::Extra);
            }

            State::GzName | State::GzComment => {
                loop {
                    if !self.bits.ensure(8, input, head) {
                        return Ok(Some(Status::NeedInput));
                    }
                    let byte = self.bits.peek(8) as u8;
                    self.bits.consume(8);
                    self.header_crc = crc32(self.header_crc, &[byte]);
                    if byte == 0 {
                        break;
                    }
                }
                self.state = if matches!(self.state, State::GzName) {
                    after_gzip_field(self.gzip_flags, GzipField::Name)
                } else {
                    after_gzip_field(self.gzip_flags, GzipField::Comment)
                };
            }

            State::GzHeaderCrc => {
                if !self.bits.ensure(16, input, head) {
                    return Ok(Some(Status::NeedInput));
                }
                // CRC-16 of the header is the low half of its CRC-32.
                if self.bits.peek(16) != self.header_crc & 0xFFFF {
                    return Err(InflateError::HeaderChecksumMismatch);
                }
                self.bits.consume(16);
                self.state = State::BlockStart;
            }

            State::ZlibHeader => {
                if !self.bits.ensure(16, input, head) {
                    return Ok(Some(Status::NeedInput));
                }
                let cmf = self.bits.peek(8);
                let flg = self.bits.peek(16) >> 8;
                if ((cmf << 8) | flg) % 31 != 0 {
                    return Err(InflateError::InvalidMagic);
                }
                if cmf & 0xF != ZLIB_CM_DEFLATE {
                    return Err(InflateError::UnsupportedMethod);
                }
                let cinfo = cmf >> 4;
                if cinfo > ZLIB_CINFO_32K_WINDOW {
                    return Err(InflateError::UnsupportedFlags);
                }
                // Window sizes below the floor are quietly widened; the
                // stream cannot reference further back than it declared.
                let size = (1usize << (8 + cinfo)).max(WINDOW_MIN_SIZE);
                self.window = SlidingWindow::new(size);
                self.check = 1;
                self.bits.consume(16);
                self.state = if flg & ZLIB_FLG_FDICT != 0 {
                    State::DictId
                } else {
                    State::BlockStart
                };
            }

            State::DictId => {
                if !self.bits.ensure(32, input, head) {
                    return Ok(Some(Status::NeedInput));
                }
                self.dict_id = Some(self.bits.peek(32).swap_bytes());
                self.bits.consume(32);
                self.state = State::DictWait;
            }

            State::DictWait => return Ok(Some(Status::NeedDictionary)),

            State::AdlerCheck => {
                // Bytes written earlier in this call have not been folded
                // into the running checksum yet.
                self.commit(output, out_pos);
                if !self.bits.ensure(32, input, head) {
                    return Ok(Some(Status::NeedInput));
                }
                if self.bits.peek(32).swap_bytes() != self.check {
                    return Err(InflateError::ChecksumMismatch);
                }
                self.bits.consume(32);
                self.state = State::Done;
            }

            State::GzCrc => {
                self.commit(output, out_pos);
                if !self.bits.ensure(32, input, head) {
                    return Ok(Some(Status::NeedInput));
                }
                if self.bits.peek(32) != self.check {
                    return Err(InflateError::ChecksumMismatch);
                }
                self.bits.consume(32);
                self.state = State::GzIsize;
            }

            State::GzIsize => {
                if !self.bits.ensure(32, input, head) {
                    return Ok(Some(Status::NeedInput));
                }
                let expected = (self.total_out + out_pos as u64) as u32;
                if self.bits.peek(32) != expected {
                    return Err(InflateError::ChecksumMismatch);
                }
                self.bits.consume(32);
                self.state = State::Done;
            }

            _ => unreachable!("not an envelope state"),
        }
        Ok(None)
    }
}
