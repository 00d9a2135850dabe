use puffer::{adler32, crc32, Decompressor};

#[test]
fn test_adler32_empty() {
    let buf = [];
    assert_eq!(adler32(1, &buf), 1);
}

#[test]
fn test_adler32_small() {
    let data = b"A";
    assert_eq!(adler32(1, data), 4325442);

    let data = b"AB";
    assert_eq!(adler32(1, data), 12976260);
}

#[test]
fn test_adler32_simple() {
    assert_eq!(adler32(1, b"abc"), 0x024D0127);
    assert_eq!(adler32(1, b"Hello, World!"), 530449514);
}

#[test]
fn test_adler32_incremental_matches_one_shot() {
    let data: Vec<u8> = (0..40_000u32).map(|i| (i * 7 + 3) as u8).collect();
    let whole = adler32(1, &data);
    let mut running = 1;
    for chunk in data.chunks(977) {
        running = adler32(running, chunk);
    }
    assert_eq!(running, whole);
}

#[test]
fn test_adler32_modulo_boundary() {
    // 0xFF runs long enough to force the deferred modulo reductions.
    let data = vec![0xFFu8; 11_000];
    let mut s1: u64 = 1;
    let mut s2: u64 = 0;
    for &b in &data {
        s1 = (s1 + b as u64) % 65521;
        s2 = (s2 + s1) % 65521;
    }
    assert_eq!(adler32(1, &data), ((s2 as u32) << 16) | s1 as u32);
}

#[test]
fn test_crc32_empty() {
    let buf = [];
    assert_eq!(crc32(0, &buf), 0);
}

#[test]
fn test_crc32_simple() {
    assert_eq!(crc32(0, b"abc"), 0x352441C2);
    assert_eq!(crc32(0, b"Hello, World!"), 0xEC4AC3D0);
}

#[test]
fn test_crc32_incremental_matches_one_shot() {
    let data: Vec<u8> = (0..10_000u32).map(|i| (i ^ (i >> 3)) as u8).collect();
    let whole = crc32(0, &data);
    let mut running = 0;
    for chunk in data.chunks(313) {
        running = crc32(running, chunk);
    }
    assert_eq!(running, whole);
}

#[test]
fn test_decompress_empty_stream() {
    // zlib framing around a final fixed block holding only end-of-block.
    let data = [0x78, 0x9C, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01];
    let mut d = Decompressor::new();
    assert_eq!(d.decompress_zlib(&data, 0).unwrap(), Vec::<u8>::new());
}

#[test]
fn test_decompress_errors() {
    let mut d = Decompressor::new();
    let bad_data = [0u8, 1, 2, 3];
    assert!(d.decompress_deflate(&bad_data, 100).is_err());
    assert!(d.decompress_zlib(&bad_data, 100).is_err());
    assert!(d.decompress_gzip(&bad_data, 100).is_err());
}

#[test]
fn test_implausible_size_claim_rejected() {
    let mut d = Decompressor::new();
    let tiny = [0x78u8, 0x9C];
    // Two input bytes cannot decode to 50 MB.
    let err = d.decompress_zlib(&tiny, 50_000_000).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);

    // A plausible claim can still run into the configured output cap.
    d.set_output_cap(1024);
    let err = d.decompress_zlib(&tiny, 8192).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}
