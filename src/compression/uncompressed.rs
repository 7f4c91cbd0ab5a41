//! Handler for uncompressed strips

use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;

/// Uncompressed data handler (compression code 1)
pub struct UncompressedHandler;

impl CompressionHandler for UncompressedHandler {
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>> {
        // Writers may pad the final strip; short strips are corrupt.
        if data.len() < expected_len {
            return Err(TiffError::GenericError(format!(
                "Uncompressed block holds {} bytes, layout needs {}", data.len(), expected_len)));
        }
        Ok(data[..expected_len].to_vec())
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn name(&self) -> &'static str {
        "Uncompressed"
    }

    fn code(&self) -> u16 {
        1
    }
}
