//! Malformed streams must fail with the specific error kind, and a failed
//! decoder must stay failed.

use puffer::{crc32, Format, InflateError, Inflater, Status};

/// LSB-first bit packer for composing DEFLATE streams by hand.
struct BitWriter {
    bytes: Vec<u8>,
    bit: u32,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            bit: 0,
        }
    }

    /// Appends the low `n` bits of `value`, least significant first.
    fn write_bits(&mut self, value: u32, n: u32) {
        for i in 0..n {
            if self.bit == 0 {
                self.bytes.push(0);
            }
            if (value >> i) & 1 != 0 {
                *self.bytes.last_mut().unwrap() |= 1 << self.bit;
            }
            self.bit = (self.bit + 1) & 7;
        }
    }

    /// Appends a Huffman codeword, most significant bit first.
    fn write_code(&mut self, code: u32, len: u32) {
        for i in (0..len).rev() {
            self.write_bits((code >> i) & 1, 1);
        }
    }

    fn finish(mut self) -> Vec<u8> {
        self.write_bits(0, 7); // flush to a byte boundary
        self.bytes
    }
}

fn expect_error(format: Format, data: &[u8], expected: InflateError) {
    let mut inflater = Inflater::new(format);
    let mut out = [0u8; 1024];
    let err = inflater.inflate(data, &mut out).unwrap_err();
    assert_eq!(err, expected);
}

#[test]
fn reserved_block_type() {
    // BFINAL = 1, BTYPE = 11.
    expect_error(Format::Raw, &[0x07], InflateError::InvalidBlockType);
}

#[test]
fn stored_length_complement_mismatch() {
    expect_error(
        Format::Raw,
        &[0x01, 0x05, 0x00, 0x00, 0x00],
        InflateError::InvalidStoredLength,
    );
}

#[test]
fn distance_before_stream_start() {
    // Fixed block: literal 'a', then a match of length 3 at distance 3 with
    // only one byte emitted.
    let mut w = BitWriter::new();
    w.write_bits(1, 1); // BFINAL
    w.write_bits(1, 2); // fixed Huffman
    w.write_code(0x30 + b'a' as u32, 8); // literal
    w.write_code(0b0000001, 7); // length symbol 257 -> L = 3
    w.write_code(2, 5); // distance symbol 2 -> D = 3
    expect_error(Format::Raw, &w.finish(), InflateError::DistanceTooFar);
}

#[test]
fn repeat_with_no_previous_length() {
    let mut w = BitWriter::new();
    w.write_bits(1, 1); // BFINAL
    w.write_bits(2, 2); // dynamic Huffman
    w.write_bits(0, 5); // HLIT = 257
    w.write_bits(0, 5); // HDIST = 1
    w.write_bits(0, 4); // HCLEN = 4
    // Code-length code lengths for symbols 16, 17, 18, 0.
    w.write_bits(1, 3);
    w.write_bits(1, 3);
    w.write_bits(0, 3);
    w.write_bits(0, 3);
    // First decoded symbol is 16 (copy previous), with nothing to copy.
    w.write_code(0, 1);
    w.write_bits(0, 2);
    expect_error(Format::Raw, &w.finish(), InflateError::InvalidRepeatPrefix);
}

#[test]
fn empty_code_length_code() {
    let mut w = BitWriter::new();
    w.write_bits(1, 1);
    w.write_bits(2, 2);
    w.write_bits(0, 5);
    w.write_bits(0, 5);
    w.write_bits(0, 4);
    for _ in 0..4 {
        w.write_bits(0, 3); // every code-length code absent
    }
    w.write_bits(0, 8); // bits for the doomed first decode
    expect_error(Format::Raw, &w.finish(), InflateError::InvalidCodeSet);
}

#[test]
fn oversubscribed_literal_lengths() {
    let mut w = BitWriter::new();
    w.write_bits(1, 1);
    w.write_bits(2, 2);
    w.write_bits(0, 5); // HLIT = 257
    w.write_bits(0, 5); // HDIST = 1
    w.write_bits(14, 4); // HCLEN = 18
    // Symbols 18 and 1 get 1-bit codes; everything else 0. Transmission
    // order: 16 17 18 0 8 7 9 6 10 5 11 4 12 3 13 2 14 1.
    w.write_bits(0, 3);
    w.write_bits(0, 3);
    w.write_bits(1, 3); // symbol 18
    for _ in 0..14 {
        w.write_bits(0, 3);
    }
    w.write_bits(1, 3); // symbol 1
    // Canonically symbol 1 takes code 0 and symbol 18 code 1. Assigning a
    // 1-bit length to all 258 symbols oversubscribes the literal code.
    for _ in 0..258 {
        w.write_code(0, 1);
    }
    expect_error(Format::Raw, &w.finish(), InflateError::InvalidCodeSet);
}

#[test]
fn zlib_header_check_failure() {
    expect_error(
        Format::Zlib,
        &[0x79, 0x9C, 0x03, 0x00],
        InflateError::InvalidMagic,
    );
}

#[test]
fn zlib_unknown_method() {
    // CMF 0x77: method 7; FLG 0x09 keeps the %31 check valid.
    expect_error(
        Format::Zlib,
        &[0x77, 0x09, 0x03, 0x00],
        InflateError::UnsupportedMethod,
    );
}

#[test]
fn zlib_window_too_large() {
    // CMF 0x88: CINFO 8 advertises a 64 KiB window.
    expect_error(
        Format::Zlib,
        &[0x88, 0x1C, 0x03, 0x00],
        InflateError::UnsupportedFlags,
    );
}

#[test]
fn zlib_checksum_mismatch() {
    let mut data = vec![
        0x78, 0x9C, 0x4B, 0x4C, 0x4A, 0x06, 0x00, 0x02, 0x4D, 0x01, 0x27,
    ];
    *data.last_mut().unwrap() ^= 0x01;
    expect_error(Format::Zlib, &data, InflateError::ChecksumMismatch);
}

#[test]
fn gzip_bad_magic() {
    expect_error(
        Format::Gzip,
        &[0x1F, 0x8C, 0x08, 0x00],
        InflateError::InvalidMagic,
    );
}

#[test]
fn gzip_unknown_method() {
    expect_error(
        Format::Gzip,
        &[0x1F, 0x8B, 0x07, 0x00],
        InflateError::UnsupportedMethod,
    );
}

#[test]
fn gzip_reserved_flags() {
    expect_error(
        Format::Gzip,
        &[0x1F, 0x8B, 0x08, 0x80],
        InflateError::UnsupportedFlags,
    );
}

fn gzip_with_header_crc(stored_crc16: u16) -> Vec<u8> {
    let header = [0x1F, 0x8B, 0x08, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03];
    let mut data = header.to_vec();
    data.extend_from_slice(&stored_crc16.to_le_bytes());
    // Empty deflate body plus a trailer for the empty string.
    data.extend_from_slice(&[0x03, 0x00]);
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&0u32.to_le_bytes());
    data
}

#[test]
fn gzip_header_crc_is_verified() {
    let header = [0x1F, 0x8B, 0x08, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03];
    let good = (crc32(0, &header) & 0xFFFF) as u16;

    let mut inflater = Inflater::gzip();
    let mut out = [0u8; 16];
    let (status, _, produced) = inflater
        .inflate(&gzip_with_header_crc(good), &mut out)
        .unwrap();
    assert_eq!(status, Status::StreamEnd);
    assert_eq!(produced, 0);

    expect_error(
        Format::Gzip,
        &gzip_with_header_crc(good.wrapping_add(1)),
        InflateError::HeaderChecksumMismatch,
    );
}

#[test]
fn gzip_trailer_crc_mismatch() {
    let mut data = vec![
        0x1F, 0x8B, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x4B, 0x4C, 0x4A, 0x06,
        0x00, 0xC2, 0x41, 0x24, 0x35, 0x03, 0x00, 0x00, 0x00,
    ];
    data[16] ^= 0x01; // second trailer byte
    expect_error(Format::Gzip, &data, InflateError::ChecksumMismatch);
}

#[test]
fn gzip_length_mismatch() {
    let mut data = vec![
        0x1F, 0x8B, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x4B, 0x4C, 0x4A, 0x06,
        0x00, 0xC2, 0x41, 0x24, 0x35, 0x03, 0x00, 0x00, 0x00,
    ];
    data[19] = 0x04; // ISIZE says 4, stream decodes 3 bytes
    expect_error(Format::Gzip, &data, InflateError::ChecksumMismatch);
}

#[test]
fn zlib_dictionary_request_is_signaled() {
    let data = [0x78, 0x20, 0xDE, 0xAD, 0xBE, 0xEF, 0x03, 0x00];
    let mut inflater = Inflater::zlib();
    let mut out = [0u8; 16];
    let (status, _, produced) = inflater.inflate(&data, &mut out).unwrap();
    assert_eq!(status, Status::NeedDictionary);
    assert_eq!(produced, 0);
    assert!(inflater.needs_dictionary());
    assert_eq!(inflater.dictionary_id(), Some(0xDEADBEEF));

    // Without dictionary support the request is permanent.
    let (status, _, _) = inflater.inflate(&data[6..], &mut out).unwrap();
    assert_eq!(status, Status::NeedDictionary);
}

#[test]
fn errors_poison_the_decoder() {
    let mut inflater = Inflater::raw();
    let mut out = [0u8; 64];
    let err = inflater.inflate(&[0x07], &mut out).unwrap_err();
    assert_eq!(err, InflateError::InvalidBlockType);

    // A well-formed stream cannot revive it.
    let err = inflater.inflate(&[0x03, 0x00], &mut out).unwrap_err();
    assert_eq!(err, InflateError::InvalidBlockType);
}
