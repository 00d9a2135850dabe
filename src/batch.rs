use crate::inflate::{Format, Inflater, Status};
use rayon::prelude::*;

/// Decompresses many independent streams in parallel.
///
/// One engine instance serves one stream; separate instances share nothing
/// mutable, so the fan-out is embarrassingly parallel.
pub struct BatchDecompressor {
    format: Format,
}

impl BatchDecompressor {
    pub fn new(format: Format) -> Self {
        Self { format }
    }

    /// Decompresses `inputs[i]` into a buffer of `max_out_sizes[i]` bytes.
    /// A stream that fails or overflows its buffer yields `None`.
    pub fn decompress_batch(
        &self,
        inputs: &[&[u8]],
        max_out_sizes: &[usize],
    ) -> Vec<Option<Vec<u8>>> {
        inputs
            .par_iter()
            .zip(max_out_sizes.par_iter())
            .map(|(&input, &max_size)| {
                let mut output = vec![0u8; max_size];
                let mut inflater = Inflater::new(self.format);
                match inflater.inflate(input, &mut output) {
                    Ok((Status::StreamEnd, _, produced)) => {
                        output.truncate(produced);
                        Some(output)
                    }
                    _ => None,
                }
            })
            .collect()
    }
}
