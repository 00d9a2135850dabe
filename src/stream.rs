use crate::inflate::{Format, InflateError, Inflater, Status};
use std::io::{self, Read};

const DEFAULT_BUF_SIZE: usize = 32 * 1024;

/// Streaming decompressor over any [`Read`] source.
///
/// Compressed bytes are pulled into a fixed-capacity buffer and fed to the
/// engine; decompressed bytes land directly in the caller's buffer. The
/// source is only polled once the engine has drained the buffer, so a
/// transient I/O error can be retried by calling `read` again. Format errors
/// are final: the engine stays poisoned and every later read fails the same
/// way.
pub struct InflateReader<R: Read> {
    inner: R,
    inflater: Inflater,
    buf: Box<[u8]>,
    pos: usize,
    cap: usize,
    done: bool,
}

impl<R: Read> InflateReader<R> {
    /// Reader for a bare DEFLATE stream.
    pub fn raw(inner: R) -> Self {
        Self::with_capacity(inner, Format::Raw, DEFAULT_BUF_SIZE)
    }

    /// Reader for a zlib stream (RFC 1950).
    pub fn zlib(inner: R) -> Self {
        Self::with_capacity(inner, Format::Zlib, DEFAULT_BUF_SIZE)
    }

    /// Reader for a gzip stream (RFC 1952).
    pub fn gzip(inner: R) -> Self {
        Self::with_capacity(inner, Format::Gzip, DEFAULT_BUF_SIZE)
    }

    /// As above with an explicit input-buffer capacity.
    pub fn with_capacity(inner: R, format: Format, capacity: usize) -> Self {
        Self {
            inner,
            inflater: Inflater::new(format),
            buf: vec![0; capacity.max(1)].into_boxed_slice(),
            pos: 0,
            cap: 0,
            done: false,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// The underlying engine, e.g. for `total_out` or the running checksum.
    pub fn inflater(&self) -> &Inflater {
        &self.inflater
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for InflateReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() || self.done {
            return Ok(0);
        }
        loop {
            let (status, consumed, produced) = self
                .inflater
                .inflate(&self.buf[self.pos..self.cap], out)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
            self.pos += consumed;

            if status == Status::StreamEnd {
                self.done = true;
            }
            if produced > 0 || self.done {
                return Ok(produced);
            }

            match status {
                Status::NeedDictionary => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "preset dictionary required",
                    ));
                }
                Status::NeedInput => {
                    let n = self.inner.read(&mut self.buf)?;
                    if n == 0 {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            InflateError::UnexpectedEndOfInput,
                        ));
                    }
                    self.pos = 0;
                    self.cap = n;
                }
                // A full output buffer always carries bytes when `out` is
                // non-empty, so it was handled above.
                Status::OutputFull | Status::StreamEnd => {}
            }
        }
    }
}
