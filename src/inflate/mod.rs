mod envelope;

use crate::adler32::adler32;
use crate::bits::BitReader;
use crate::common::*;
use crate::crc32::crc32;
use crate::huffman::HuffmanTable;
use crate::window::SlidingWindow;
use std::sync::OnceLock;
use thiserror::Error;

/// Framing around the raw DEFLATE bit stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Bare RFC 1951 stream, no header or trailer, 32 KiB window.
    Raw,
    /// RFC 1950: 2-byte header, optional dictionary id, Adler-32 trailer.
    Zlib,
    /// RFC 1952: 10+ byte header, CRC-32 + length trailer. First member only.
    Gzip,
}

/// Why an [`Inflater::inflate`] call returned control to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the caller must refill, drain, or stop according to the status"]
pub enum Status {
    /// The input span is exhausted and the current state needs more bits.
    NeedInput,
    /// The output span is full.
    OutputFull,
    /// The zlib header requested a preset dictionary; see
    /// [`Inflater::dictionary_id`]. Dictionary loading is not supported.
    NeedDictionary,
    /// The stream is complete and verified. Later calls repeat this status.
    StreamEnd,
}

/// Fatal stream errors. After any of these the decoder is poisoned: every
/// further call returns the same error. DEFLATE has no resynchronization
/// point, so there is no in-stream recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InflateError {
    #[error("unexpected end of input stream")]
    UnexpectedEndOfInput,
    #[error("incorrect header check")]
    InvalidMagic,
    #[error("unknown compression method")]
    UnsupportedMethod,
    #[error("unsupported header flags")]
    UnsupportedFlags,
    #[error("incorrect header crc")]
    HeaderChecksumMismatch,
    #[error("invalid block type")]
    InvalidBlockType,
    #[error("invalid stored block lengths")]
    InvalidStoredLength,
    #[error("invalid code lengths set")]
    InvalidCodeSet,
    #[error("invalid literal/length code")]
    InvalidLengthCode,
    #[error("invalid distance code")]
    InvalidDistanceCode,
    #[error("invalid bit length repeat")]
    InvalidRepeatPrefix,
    #[error("distance too far back")]
    DistanceTooFar,
    #[error("incorrect data check")]
    ChecksumMismatch,
}

/// Decode tables for the block being inflated. Dynamic tables are dropped at
/// each end-of-block symbol; the fixed tables are shared process-wide.
enum CodeTables {
    None,
    Fixed,
    Dynamic {
        litlen: HuffmanTable,
        distance: HuffmanTable,
    },
}

struct FixedTables {
    litlen: HuffmanTable,
    distance: HuffmanTable,
}

static FIXED_TABLES: OnceLock<FixedTables> = OnceLock::new();

fn fixed_tables() -> &'static FixedTables {
    FIXED_TABLES.get_or_init(|| {
        let mut lens = [0u8; DEFLATE_NUM_LITLEN_SYMS];
        lens[..144].fill(8);
        lens[144..256].fill(9);
        lens[256..280].fill(7);
        lens[280..].fill(8);
        let litlen = HuffmanTable::build(&lens).expect("fixed literal/length code is complete");
        let distance = HuffmanTable::build(&[5u8; DEFLATE_NUM_OFFSET_SYMS])
            .expect("fixed distance code is complete");
        FixedTables { litlen, distance }
    })
}

/// One state per suspension-safe step. Each variant carries exactly the
/// scratch that step needs, so nothing stale leaks across block boundaries.
enum State {
    // gzip header (byte-aligned fields read through the bit accumulator)
    GzMagic,
    GzFlags,
    GzMeta { remaining: u8 },
    GzExtraLen,
    GzExtraSkip { remaining: usize },
    GzName,
    GzComment,
    GzHeaderCrc,

    // zlib header
    ZlibHeader,
    DictId,
    DictWait,

    // deflate blocks
    BlockStart,
    StoredLen,
    StoredCopy { remaining: usize },
    DynSizes,
    PrecodeLens {
        nlit: usize,
        ndist: usize,
        ncode: usize,
        have: usize,
        lens: [u8; DEFLATE_NUM_PRECODE_SYMS],
    },
    CodeLens {
        nlit: usize,
        ndist: usize,
        lens: Vec<u8>,
        precode: HuffmanTable,
    },
    Len,
    LenExt { length: usize, extra: u32 },
    DistSym { length: usize },
    DistExt { length: usize, distance: usize, extra: u32 },
    Match { length: usize, distance: usize },

    // trailers
    AdlerCheck,
    GzCrc,
    GzIsize,

    Done,
}

/// Resumable DEFLATE decompressor.
///
/// The engine is a pure state machine over caller-supplied spans: it consumes
/// bits from `input`, writes decompressed bytes to `output`, and returns as
/// soon as either span is exhausted or the stream ends. All state survives
/// between calls, so input and output may arrive in arbitrary fragments; a
/// decoder must not be driven from two threads, but independent decoders are
/// independent.
pub struct Inflater {
    format: Format,
    state: State,
    bits: BitReader,
    window: SlidingWindow,
    tables: CodeTables,
    last_block: bool,
    /// Running Adler-32 (zlib) or CRC-32 (gzip) of the decompressed bytes.
    check: u32,
    /// CRC-32 over the gzip header bytes, for the optional FHCRC field.
    header_crc: u32,
    gzip_flags: u8,
    dict_id: Option<u32>,
    total_in: u64,
    total_out: u64,
    /// Output bytes already folded into window + checksum this call.
    committed: usize,
    failed: Option<InflateError>,
}

impl Inflater {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            state: match format {
                Format::Raw => State::BlockStart,
                Format::Zlib => State::ZlibHeader,
                Format::Gzip => State::GzMagic,
            },
            bits: BitReader::new(),
            window: SlidingWindow::new(WINDOW_MAX_SIZE),
            tables: CodeTables::None,
            last_block: false,
            check: if format == Format::Zlib { 1 } else { 0 },
            header_crc: 0,
            gzip_flags: 0,
            dict_id: None,
            total_in: 0,
            total_out: 0,
            committed: 0,
            failed: None,
        }
    }

    /// Decoder for a bare DEFLATE stream.
    pub fn raw() -> Self {
        Self::new(Format::Raw)
    }

    /// Decoder for a zlib-wrapped stream (RFC 1950).
    pub fn zlib() -> Self {
        Self::new(Format::Zlib)
    }

    /// Decoder for a gzip-wrapped stream (RFC 1952).
    pub fn gzip() -> Self {
        Self::new(Format::Gzip)
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Compressed bytes consumed so far, across all calls.
    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    /// Decompressed bytes produced so far, across all calls.
    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Running checksum of the decompressed data: Adler-32 for zlib, CRC-32
    /// for gzip, 0 for raw streams.
    pub fn checksum(&self) -> u32 {
        self.check
    }

    /// True once a zlib header has requested a preset dictionary.
    pub fn needs_dictionary(&self) -> bool {
        matches!(self.state, State::DictWait)
    }

    /// The dictionary identifier from the zlib header, if one was present.
    pub fn dictionary_id(&self) -> Option<u32> {
        self.dict_id
    }

    /// Decompresses as much as possible, returning `(status, bytes consumed
    /// from input, bytes written to output)`.
    ///
    /// The call returns at exactly three junctures: the output span filled,
    /// the input span ran dry mid-symbol, or the stream ended. Presenting
    /// the same stream in different fragmentations yields byte-identical
    /// output and the same final state.
    pub fn inflate(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(Status, usize, usize), InflateError> {
        if let Some(err) = self.failed {
            return Err(err);
        }

        let mut head = 0usize;
        let mut out_pos = 0usize;
        self.committed = 0;

        let result = self.run(input, &mut head, output, &mut out_pos);

        // Window and checksum track every byte handed to the caller, even on
        // the error path (the decoder is poisoned afterwards anyway).
        self.commit(output, out_pos);
        self.total_in += head as u64;
        self.total_out += out_pos as u64;

        match result {
            Ok(status) => Ok((status, head, out_pos)),
            Err(err) => {
                self.failed = Some(err);
                Err(err)
            }
        }
    }

    /// Folds `output[..upto]` into the window and the running checksum.
    /// Idempotent within one call; the trailer states use it to bring the
    /// checksum up to date before comparing.
    fn commit(&mut self, output: &[u8], upto: usize) {
        if upto > self.committed {
            let fresh = &output[self.committed..upto];
            match self.format {
                Format::Zlib => self.check = adler32(self.check, fresh),
                Format::Gzip => self.check = crc32(self.check, fresh),
                Format::Raw => {}
            }
            self.window.absorb(fresh);
            self.committed = upto;
        }
    }

    fn run(
        &mut self,
        input: &[u8],
        head: &mut usize,
        output: &mut [u8],
        out_pos: &mut usize,
    ) -> Result<Status, InflateError> {
        loop {
            match self.state {
                State::GzMagic
                | State::GzFlags
                | State::GzMeta { .. }
                | State::GzExtraLen
                | State::GzExtraSkip { .. }
                | State::GzName
                | State::GzComment
                | State::GzHeaderCrc
                | State::ZlibHeader
                | State::DictId
                | State::DictWait
                | State::AdlerCheck
                | State::GzCrc
                | State::GzIsize => {
                    if let Some(status) = self.step_envelope(input, head, output, *out_pos)? {
                        return Ok(status);
                    }
                }

                State::BlockStart => {
                    if self.last_block {
                        self.bits.align_to_byte();
                        self.state = match self.format {
                            Format::Zlib => State::AdlerCheck,
                            Format::Gzip => State::GzCrc,
                            Format::Raw => State::Done,
                        };
                        continue;
                    }
                    if !self.bits.ensure(3, input, head) {
                        return Ok(Status::NeedInput);
                    }
                    self.last_block = self.bits.peek(1) != 0;
                    let block_type = self.bits.peek(3) >> 1;
                    self.bits.consume(3);
                    match block_type {
                        DEFLATE_BLOCKTYPE_UNCOMPRESSED => self.state = State::StoredLen,
                        DEFLATE_BLOCKTYPE_STATIC_HUFFMAN => {
                            self.tables = CodeTables::Fixed;
                            self.state = State::Len;
                        }
                        DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN => self.state = State::DynSizes,
                        _ => return Err(InflateError::InvalidBlockType),
                    }
                }

                State::StoredLen => {
                    self.bits.align_to_byte();
                    if !self.bits.ensure(32, input, head) {
                        return Ok(Status::NeedInput);
                    }
                    let len = self.bits.peek(16) as usize;
                    self.bits.consume(16);
                    let nlen = self.bits.peek(16);
                    self.bits.consume(16);
                    if len != (!nlen & 0xFFFF) as usize {
                        return Err(InflateError::InvalidStoredLength);
                    }
                    self.state = State::StoredCopy { remaining: len };
                }

                State::StoredCopy { ref mut remaining } => {
                    // The accumulator is drained after the aligned 32-bit
                    // header read, so bytes move span to span.
                    debug_assert_eq!(self.bits.count(), 0);
                    while *remaining > 0 {
                        let n = (*remaining)
                            .min(input.len() - *head)
                            .min(output.len() - *out_pos);
                        if n == 0 {
                            return Ok(if *out_pos == output.len() {
                                Status::OutputFull
                            } else {
                                Status::NeedInput
                            });
                        }
                        output[*out_pos..*out_pos + n].copy_from_slice(&input[*head..*head + n]);
                        *head += n;
                        *out_pos += n;
                        *remaining -= n;
                    }
                    self.state = State::BlockStart;
                }

                State::DynSizes => {
                    if !self.bits.ensure(14, input, head) {
                        return Ok(Status::NeedInput);
                    }
                    let nlit = 257 + self.bits.peek(5) as usize;
                    self.bits.consume(5);
                    let ndist = 1 + self.bits.peek(5) as usize;
                    self.bits.consume(5);
                    let ncode = 4 + self.bits.peek(4) as usize;
                    self.bits.consume(4);
                    self.state = State::PrecodeLens {
                        nlit,
                        ndist,
                        ncode,
                        have: 0,
                        lens: [0; DEFLATE_NUM_PRECODE_SYMS],
                    };
                }

                State::PrecodeLens {
                    nlit,
                    ndist,
                    ncode,
                    ref mut have,
                    ref mut lens,
                } => {
                    while *have < ncode {
                        if !self.bits.ensure(3, input, head) {
                            return Ok(Status::NeedInput);
                        }
                        lens[PRECODE_PERMUTATION[*have]] = self.bits.peek(3) as u8;
                        self.bits.consume(3);
                        *have += 1;
                    }
                    let precode = match HuffmanTable::build(&lens[..]) {
                        Some(table) => table,
                        None => return Err(InflateError::InvalidCodeSet),
                    };
                    self.state = State::CodeLens {
                        nlit,
                        ndist,
                        lens: Vec::with_capacity(nlit + ndist),
                        precode,
                    };
                }

                State::CodeLens {
                    nlit,
                    ndist,
                    ref mut lens,
                    ref precode,
                } => {
                    let total = nlit + ndist;
                    while lens.len() < total {
                        let (presym, code_len) =
                            match precode.peek_symbol(&mut self.bits, input, head) {
                                Some(decoded) => decoded,
                                None => return Ok(Status::NeedInput),
                            };
                        if presym < 16 {
                            self.bits.consume(code_len);
                            lens.push(presym as u8);
                            continue;
                        }
                        let (extra, base) = match presym {
                            16 => (2u32, 3usize),
                            17 => (3, 3),
                            18 => (7, 11),
                            _ => return Err(InflateError::InvalidCodeSet),
                        };
                        // Take the code and its repeat field together so a
                        // suspension cannot land between them.
                        if !self.bits.ensure(code_len + extra, input, head) {
                            return Ok(Status::NeedInput);
                        }
                        self.bits.consume(code_len);
                        let repeat = base + self.bits.peek(extra) as usize;
                        self.bits.consume(extra);
                        let value = if presym == 16 {
                            match lens.last() {
                                Some(&prev) => prev,
                                None => return Err(InflateError::InvalidRepeatPrefix),
                            }
                        } else {
                            0
                        };
                        if lens.len() + repeat > total {
                            return Err(InflateError::InvalidCodeSet);
                        }
                        for _ in 0..repeat {
                            lens.push(value);
                        }
                    }

                    let litlen = match HuffmanTable::build(&lens[..nlit]) {
                        Some(table) => table,
                        None => return Err(InflateError::InvalidCodeSet),
                    };
                    let distance = match HuffmanTable::build(&lens[nlit..]) {
                        Some(table) => table,
                        None => return Err(InflateError::InvalidCodeSet),
                    };
                    self.tables = CodeTables::Dynamic { litlen, distance };
                    self.state = State::Len;
                }

                State::Len => {
                    let litlen = match self.tables {
                        CodeTables::Fixed => &fixed_tables().litlen,
                        CodeTables::Dynamic { ref litlen, .. } => litlen,
                        CodeTables::None => unreachable!("no code tables inside a block"),
                    };
                    // Peek first: an end-of-block or length symbol can still
                    // be taken when the output budget is already spent.
                    let (sym, code_len) = match litlen.peek_symbol(&mut self.bits, input, head) {
                        Some(decoded) => decoded,
                        None => return Ok(Status::NeedInput),
                    };
                    if sym < DEFLATE_END_OF_BLOCK {
                        if *out_pos == output.len() {
                            return Ok(Status::OutputFull);
                        }
                        self.bits.consume(code_len);
                        output[*out_pos] = sym as u8;
                        *out_pos += 1;
                    } else if sym == DEFLATE_END_OF_BLOCK {
                        self.bits.consume(code_len);
                        self.tables = CodeTables::None;
                        self.state = State::BlockStart;
                    } else if sym < DEFLATE_FIRST_LEN_SYM + LEN_BASE.len() as u32 {
                        self.bits.consume(code_len);
                        let idx = (sym - DEFLATE_FIRST_LEN_SYM) as usize;
                        let length = LEN_BASE[idx] as usize;
                        let extra = LEN_EXTRA[idx] as u32;
                        self.state = if extra > 0 {
                            State::LenExt { length, extra }
                        } else {
                            State::DistSym { length }
                        };
                    } else {
                        return Err(InflateError::InvalidLengthCode);
                    }
                }

                State::LenExt { length, extra } => {
                    if !self.bits.ensure(extra, input, head) {
                        return Ok(Status::NeedInput);
                    }
                    let length = length + self.bits.peek(extra) as usize;
                    self.bits.consume(extra);
                    self.state = State::DistSym { length };
                }

                State::DistSym { length } => {
                    let distance_table = match self.tables {
                        CodeTables::Fixed => &fixed_tables().distance,
                        CodeTables::Dynamic { ref distance, .. } => distance,
                        CodeTables::None => unreachable!("no code tables inside a block"),
                    };
                    let sym = match distance_table.decode(&mut self.bits, input, head) {
                        Some(sym) => sym,
                        None => return Ok(Status::NeedInput),
                    };
                    if sym as usize >= DIST_BASE.len() {
                        return Err(InflateError::InvalidDistanceCode);
                    }
                    let distance = DIST_BASE[sym as usize] as usize;
                    let extra = DIST_EXTRA[sym as usize] as u32;
                    self.state = if extra > 0 {
                        State::DistExt {
                            length,
                            distance,
                            extra,
                        }
                    } else {
                        State::Match { length, distance }
                    };
                }

                State::DistExt {
                    length,
                    distance,
                    extra,
                } => {
                    if !self.bits.ensure(extra, input, head) {
                        return Ok(Status::NeedInput);
                    }
                    let distance = distance + self.bits.peek(extra) as usize;
                    self.bits.consume(extra);
                    self.state = State::Match { length, distance };
                }

                State::Match {
                    ref mut length,
                    distance,
                } => {
                    if distance as u64 > self.total_out + *out_pos as u64 {
                        return Err(InflateError::DistanceTooFar);
                    }
                    while *length > 0 {
                        if *out_pos == output.len() {
                            return Ok(Status::OutputFull);
                        }
                        let in_call = *out_pos;
                        if distance > in_call {
                            // The tail of the reference predates this call
                            // and is served from the window.
                            let back = distance - in_call;
                            if back > self.window.filled() {
                                return Err(InflateError::DistanceTooFar);
                            }
                            let want = (*length).min(output.len() - *out_pos);
                            let n = self
                                .window
                                .copy_back(back, &mut output[*out_pos..*out_pos + want]);
                            *out_pos += n;
                            *length -= n;
                        } else {
                            // The source overlaps bytes written during this
                            // call; a run with distance < length replicates
                            // itself, so the copy is byte-at-a-time.
                            let src = *out_pos - distance;
                            let n = (*length).min(output.len() - *out_pos);
                            for i in 0..n {
                                output[*out_pos + i] = output[src + i];
                            }
                            *out_pos += n;
                            *length -= n;
                        }
                    }
                    self.state = State::Len;
                }

                State::Done => return Ok(Status::StreamEnd),
            }
        }
    }
}
