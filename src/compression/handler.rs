//! Compression handler trait definition

use crate::tiff::errors::TiffResult;

/// Strategy trait for the codecs a strip or tile may be stored with
pub trait CompressionHandler: Send + Sync {
    /// Decompress one strip or tile
    ///
    /// `expected_len` is the decoded size implied by the image layout; it
    /// is used to size the output buffer up front.
    fn decompress(&self, data: &[u8], expected_len: usize) -> TiffResult<Vec<u8>>;

    /// Compress one strip or tile
    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Get the name of this compression method
    fn name(&self) -> &'static str;

    /// TIFF Compression tag value written for this codec
    fn code(&self) -> u16;
}
