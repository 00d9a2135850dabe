pub const DEFLATE_BLOCKTYPE_UNCOMPRESSED: u32 = 0;
pub const DEFLATE_BLOCKTYPE_STATIC_HUFFMAN: u32 = 1;
pub const DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN: u32 = 2;

pub const DEFLATE_MAX_MATCH_LEN: usize = 258;

pub const DEFLATE_NUM_PRECODE_SYMS: usize = 19;
pub const DEFLATE_NUM_LITLEN_SYMS: usize = 288;
pub const DEFLATE_NUM_OFFSET_SYMS: usize = 32;

pub const DEFLATE_END_OF_BLOCK: u32 = 256;
pub const DEFLATE_FIRST_LEN_SYM: u32 = 257;
pub const DEFLATE_MAX_CODEWORD_LEN: usize = 15;

/// Sliding-window bounds. zlib headers may shrink the window; anything below
/// the minimum is coerced up, anything above the maximum is rejected.
pub const WINDOW_MIN_SIZE: usize = 1 << 9;
pub const WINDOW_MAX_SIZE: usize = 1 << 15;

pub const ZLIB_CM_DEFLATE: u32 = 8;
pub const ZLIB_CINFO_32K_WINDOW: u32 = 7;
pub const ZLIB_FLG_FDICT: u32 = 0x20;

pub const GZIP_ID1: u32 = 0x1F;
pub const GZIP_ID2: u32 = 0x8B;
pub const GZIP_CM_DEFLATE: u32 = 8;

pub const GZIP_FHCRC: u8 = 0x02;
pub const GZIP_FEXTRA: u8 = 0x04;
pub const GZIP_FNAME: u8 = 0x08;
pub const GZIP_FCOMMENT: u8 = 0x10;
pub const GZIP_FRESERVED: u8 = 0xE0;

/// Base match lengths for literal/length symbols 257..=285 (RFC 1951 §3.2.5).
pub const LEN_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59,
    67, 83, 99, 115, 131, 163, 195, 227, 258,
];

/// Extra bits consumed after each length symbol.
pub const LEN_EXTRA: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4,
    5, 5, 5, 5, 0,
];

/// Base match distances for distance symbols 0..=29.
pub const DIST_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513,
    769, 1025, 1537, 2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Extra bits consumed after each distance symbol.
pub const DIST_EXTRA: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10,
    11, 11, 12, 12, 13, 13,
];

/// Transmission order of the code-length alphabet (RFC 1951 §3.2.7).
pub const PRECODE_PERMUTATION: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];
