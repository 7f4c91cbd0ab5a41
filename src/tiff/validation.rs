//! TIFF validation utilities
//!
//! Bounds checks applied before trusting offsets and sizes read from a
//! container, so a corrupt entry cannot trigger huge allocations.

use log::{debug, error, warn};
use std::io::SeekFrom;

use crate::io::byte_order::ByteOrderHandler;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::header;
use crate::tiff::errors::{TiffError, TiffResult};

/// Validates an IFD offset against the container size
pub fn validate_ifd_offset(offset: u64, file_size: u64) -> TiffResult<()> {
    if offset >= file_size || offset < 8 {
        return Err(TiffError::GenericError(format!(
            "Invalid IFD offset: {} (file size: {})",
            offset, file_size
        )));
    }
    Ok(())
}

/// Validates that `len` bytes starting at `offset` lie inside the container
pub fn validate_block(offset: u64, len: u64, file_size: u64, what: &str) -> TiffResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= file_size => Ok(()),
        _ => Err(TiffError::GenericError(format!(
            "{} at offset {} with {} bytes runs past end of data ({} bytes)",
            what, offset, len, file_size
        ))),
    }
}

/// Gets the container size, restoring the reader position afterwards
pub fn get_file_size(reader: &mut dyn SeekableReader) -> TiffResult<u64> {
    let current_position = reader.stream_position()?;
    let file_size = match reader.seek(SeekFrom::End(0)) {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not determine file size: {}", e);
            u64::MAX
        }
    };
    reader.seek(SeekFrom::Start(current_position))?;
    Ok(file_size)
}

/// Validates the BigTIFF header fields following the version number
pub fn validate_bigtiff_header(
    reader: &mut dyn SeekableReader,
    byte_order_handler: &dyn ByteOrderHandler,
) -> TiffResult<()> {
    let offset_size = byte_order_handler.read_u16(reader)?;
    let zeros = byte_order_handler.read_u16(reader)?;
    debug!("BigTIFF offset size: {}, reserved: {}", offset_size, zeros);

    if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
        error!("Invalid BigTIFF header: offset_size={}, zeros={}", offset_size, zeros);
        return Err(TiffError::InvalidBigTIFFHeader);
    }
    Ok(())
}

/// Validates image dimensions are non-zero and addressable
pub fn validate_dimensions(width: u64, height: u64) -> TiffResult<()> {
    if width == 0 || height == 0 {
        return Err(TiffError::GenericError(format!("Degenerate image size {}x{}", width, height)));
    }
    if width.checked_mul(height).map_or(true, |px| px > (1u64 << 34)) {
        return Err(TiffError::GenericError(format!("Image size {}x{} is not addressable", width, height)));
    }
    Ok(())
}
