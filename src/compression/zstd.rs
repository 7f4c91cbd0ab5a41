//! Handler for ZSTD compressed strips

use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;
use log::{debug, warn};

/// ZSTD compression handler (compression code 14)
pub struct ZstdHandler {
    /// Compression level (1-22, default 3)
    compression_level: i32,
}

impl ZstdHandler {
    pub fn new() -> Self {
        ZstdHandler { compression_level: 3 }
    }

    pub fn with_level(level: i32) -> Self {
        ZstdHandler { compression_level: level.clamp(1, 22) }
    }
}

impl Default for ZstdHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionHandler for ZstdHandler {
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        // Bulk API needs an upper bound; fall back to streaming when the
        // frame is larger than the layout claims.
        match zstd::bulk::decompress(data, expected_len.max(1)) {
            Ok(decoded) => Ok(decoded),
            Err(_) => zstd::decode_all(data).map_err(|e| {
                warn!("ZSTD decompression error: {}", e);
                TiffError::GenericError(format!("ZSTD decompression error: {}", e))
            }),
        }
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        debug!("ZSTD compressing {} bytes with level {}", data.len(), self.compression_level);
        zstd::encode_all(data, self.compression_level)
            .map_err(|e| TiffError::GenericError(format!("ZSTD compression error: {}", e)))
    }

    fn name(&self) -> &'static str {
        "ZSTD"
    }

    fn code(&self) -> u16 {
        14
    }
}
