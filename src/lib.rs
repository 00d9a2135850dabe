pub mod adler32;
pub mod api;
pub mod batch;
pub mod bits;
pub mod common;
pub mod crc32;
pub mod huffman;
pub mod inflate;
pub mod stream;
pub mod window;

pub use adler32::adler32;
pub use api::Decompressor;
pub use crc32::crc32;
pub use inflate::{Format, InflateError, Inflater, Status};
pub use stream::InflateReader;
