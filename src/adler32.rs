use std::cmp::min;

const DIVISOR: u32 = 65521;

/// Largest number of byte additions before `s1`/`s2` can overflow a u32
/// accumulator in the worst case (all 0xFF input).
const MAX_CHUNK_LEN: usize = 5552;

#[inline]
fn adler32_chunk(s1: &mut u32, s2: &mut u32, p: &[u8]) {
    let mut s1_local = *s1;
    let mut s2_local = *s2;

    let mut iter = p.chunks_exact(16);
    for chunk in &mut iter {
        let b0 = chunk[0] as u32;
        let b1 = chunk[1] as u32;
        let b2 = chunk[2] as u32;
        let b3 = chunk[3] as u32;
        let b4 = chunk[4] as u32;
        let b5 = chunk[5] as u32;
        let b6 = chunk[6] as u32;
        let b7 = chunk[7] as u32;
        let b8 = chunk[8] as u32;
        let b9 = chunk[9] as u32;
        let b10 = chunk[10] as u32;
        let b11 = chunk[11] as u32;
        let b12 = chunk[12] as u32;
        let b13 = chunk[13] as u32;
        let b14 = chunk[14] as u32;
        let b15 = chunk[15] as u32;

        s2_local += (s1_local << 4)
            + (b0 * 16)
            + (b1 * 15)
            + (b2 * 14)
            + (b3 * 13)
            + (b4 * 12)
            + (b5 * 11)
            + (b6 * 10)
            + (b7 * 9)
            + (b8 * 8)
            + (b9 * 7)
            + (b10 * 6)
            + (b11 * 5)
            + (b12 * 4)
            + (b13 * 3)
            + (b14 * 2)
            + b15;

        s1_local +=
            b0 + b1 + b2 + b3 + b4 + b5 + b6 + b7 + b8 + b9 + b10 + b11 + b12 + b13 + b14 + b15;
    }

    for &b in iter.remainder() {
        s1_local += b as u32;
        s2_local += s1_local;
    }

    *s1 = s1_local % DIVISOR;
    *s2 = s2_local % DIVISOR;
}

/// Incrementally updates an Adler-32 checksum. The initial value is 1; the
/// result of one call feeds the next.
pub fn adler32(adler: u32, mut buffer: &[u8]) -> u32 {
    let mut s1 = adler & 0xFFFF;
    let mut s2 = adler >> 16;

    while !buffer.is_empty() {
        let n = min(buffer.len(), MAX_CHUNK_LEN);
        let (chunk, rest) = buffer.split_at(n);
        buffer = rest;

        adler32_chunk(&mut s1, &mut s2, chunk);
    }

    (s2 << 16) | s1
}
