//! Handler for Deflate (zlib) compressed strips

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use log::trace;

use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;

/// Deflate handler for compression codes 8 (Adobe) and 32946 (legacy PKZIP)
pub struct DeflateHandler {
    level: u32,
}

impl DeflateHandler {
    pub fn new() -> Self {
        DeflateHandler { level: 6 }
    }

    /// Create a handler with a zlib level in 0..=9
    pub fn with_level(level: u32) -> Self {
        DeflateHandler { level: level.min(9) }
    }
}

impl Default for DeflateHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionHandler for DeflateHandler {
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut decompressed = Vec::with_capacity(expected_len);
        decoder.read_to_end(&mut decompressed).map_err(TiffError::IoError)?;
        trace!("Inflated {} -> {} bytes", data.len(), decompressed.len());
        Ok(decompressed)
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(data).map_err(TiffError::IoError)?;
        encoder.finish().map_err(TiffError::IoError)
    }

    fn name(&self) -> &'static str {
        "Deflate"
    }

    fn code(&self) -> u16 {
        8
    }
}
