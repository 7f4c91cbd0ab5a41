//! Factory for creating compression handlers

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;
use super::uncompressed::UncompressedHandler;
use super::deflate::DeflateHandler;
use super::zstd::ZstdHandler;

/// Factory for creating compression handlers
pub struct CompressionFactory;

impl CompressionFactory {
    /// Create a compression handler for a TIFF Compression tag value
    pub fn create_handler(code: u64) -> TiffResult<Box<dyn CompressionHandler>> {
        match code {
            c if c == compression::NONE as u64 => Ok(Box::new(UncompressedHandler)),
            c if c == compression::DEFLATE as u64 || c == compression::DEFLATE_LEGACY as u64 => {
                Ok(Box::new(DeflateHandler::new()))
            }
            c if c == compression::ZSTD as u64 => Ok(Box::new(ZstdHandler::new())),
            _ => Err(TiffError::UnsupportedCompression(code)),
        }
    }

    /// Get a handler by its common name
    pub fn get_handler_by_name(name: &str) -> TiffResult<Box<dyn CompressionHandler>> {
        match name.to_lowercase().as_str() {
            "uncompressed" | "none" => Ok(Box::new(UncompressedHandler)),
            "deflate" | "zip" | "adobe deflate" => Ok(Box::new(DeflateHandler::new())),
            "zstd" => Ok(Box::new(ZstdHandler::new())),
            _ => Err(TiffError::GenericError(format!("Unknown compression type: {}", name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deflate_codes_share_handler() {
        let adobe = CompressionFactory::create_handler(8).unwrap();
        let legacy = CompressionFactory::create_handler(32946).unwrap();
        assert_eq!(adobe.name(), legacy.name());
        assert_eq!(adobe.code(), 8);
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        assert!(matches!(
            CompressionFactory::create_handler(5),
            Err(TiffError::UnsupportedCompression(5))
        ));
    }

    #[test]
    fn test_deflate_roundtrip() {
        let handler = CompressionFactory::get_handler_by_name("deflate").unwrap();
        let data: Vec<u8> = (0..4096u32).map(|v| (v % 251) as u8).collect();
        let packed = handler.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(handler.decompress(&packed, data.len()).unwrap(), data);
    }

    #[test]
    fn test_zstd_roundtrip() {
        let handler = CompressionFactory::create_handler(14).unwrap();
        let data = vec![7u8; 1000];
        let packed = handler.compress(&data).unwrap();
        assert_eq!(handler.decompress(&packed, data.len()).unwrap(), data);
    }
}
