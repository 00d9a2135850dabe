use crate::inflate::{Format, InflateError, Inflater, Status};
use std::io;

/// The densest stream DEFLATE can express stays near 1032 output bytes per
/// input byte, so any size claim beyond that order is a lie.
const MAX_DEFLATE_EXPANSION: usize = 1032;

/// Floor applied to the input length before the expansion check, so that a
/// header-sized input can still claim a few KiB of output.
const EXPANSION_INPUT_FLOOR: usize = 64;

/// One-shot decompression over whole buffers.
///
/// The caller supplies the expected decompressed size; a fresh engine is
/// spun up per call, so one failed stream never taints the next. The size
/// claim is sanity-checked before anything is reserved: a forged length
/// field must not be able to commit gigabytes of memory.
pub struct Decompressor {
    output_cap: usize,
    expansion_limit: usize,
}

impl Decompressor {
    pub fn new() -> Self {
        Self {
            output_cap: usize::MAX,
            expansion_limit: MAX_DEFLATE_EXPANSION,
        }
    }

    /// Absolute ceiling on a single output allocation, in bytes.
    pub fn set_output_cap(&mut self, bytes: usize) {
        self.output_cap = bytes;
    }

    /// Ceiling on how many output bytes one input byte may account for.
    pub fn set_expansion_limit(&mut self, ratio: usize) {
        self.expansion_limit = ratio;
    }

    fn check_size_claim(&self, input_len: usize, claimed: usize) -> io::Result<()> {
        let plausible = self
            .expansion_limit
            .saturating_mul(input_len.max(EXPANSION_INPUT_FLOOR));
        if claimed > plausible {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("refusing a {claimed} byte output claim for {input_len} bytes of input"),
            ));
        }
        if claimed > self.output_cap {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "output claim of {claimed} bytes is over the configured cap of {} bytes",
                    self.output_cap
                ),
            ));
        }
        Ok(())
    }

    pub fn decompress_deflate(&mut self, data: &[u8], expected_size: usize) -> io::Result<Vec<u8>> {
        self.decompress_helper(Format::Raw, data, expected_size)
    }

    pub fn decompress_deflate_into(&mut self, data: &[u8], output: &mut [u8]) -> io::Result<usize> {
        decompress_into(Format::Raw, data, output)
    }

    pub fn decompress_zlib(&mut self, data: &[u8], expected_size: usize) -> io::Result<Vec<u8>> {
        self.decompress_helper(Format::Zlib, data, expected_size)
    }

    pub fn decompress_zlib_into(&mut self, data: &[u8], output: &mut [u8]) -> io::Result<usize> {
        decompress_into(Format::Zlib, data, output)
    }

    pub fn decompress_gzip(&mut self, data: &[u8], expected_size: usize) -> io::Result<Vec<u8>> {
        self.decompress_helper(Format::Gzip, data, expected_size)
    }

    pub fn decompress_gzip_into(&mut self, data: &[u8], output: &mut [u8]) -> io::Result<usize> {
        decompress_into(Format::Gzip, data, output)
    }

    fn decompress_helper(
        &mut self,
        format: Format,
        data: &[u8],
        expected_size: usize,
    ) -> io::Result<Vec<u8>> {
        self.check_size_claim(data.len(), expected_size)?;

        let mut output = Vec::new();
        output
            .try_reserve_exact(expected_size)
            .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
        output.resize(expected_size, 0);

        let n = decompress_into(format, data, &mut output)?;
        output.truncate(n);
        Ok(output)
    }
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new()
    }
}

fn decompress_into(format: Format, data: &[u8], output: &mut [u8]) -> io::Result<usize> {
    let mut inflater = Inflater::new(format);
    let (status, _, produced) = inflater
        .inflate(data, output)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

    match status {
        Status::StreamEnd => Ok(produced),
        Status::NeedInput => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            InflateError::UnexpectedEndOfInput,
        )),
        Status::OutputFull => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "insufficient space in output buffer",
        )),
        Status::NeedDictionary => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "preset dictionary required",
        )),
    }
}
