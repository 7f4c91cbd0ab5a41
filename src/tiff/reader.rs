//! TIFF container reader
//!
//! Parses the header and IFD chain of a classic or BigTIFF container from
//! any `SeekableReader` and decodes tag payloads in the container's byte
//! order. Pixel data is handled by `tiff::decoder`.

use log::{debug, warn};
use std::fs::File;
use std::io::{BufReader, SeekFrom};
use std::path::Path;

use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{field_types, header};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TIFF;
use crate::tiff::validation;

/// Upper bound on IFDs followed in one chain
const MAX_IFDS: usize = 100;

/// Reader for TIFF and BigTIFF containers
pub struct TiffReader {
    /// Byte order handler, set once the header has been read
    byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Whether the current container is BigTIFF
    is_big_tiff: bool,
    /// Size of the current container in bytes
    file_size: u64,
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffReader {
    /// Creates a reader with no container attached
    pub fn new() -> Self {
        TiffReader {
            byte_order_handler: None,
            is_big_tiff: false,
            file_size: 0,
        }
    }

    fn handler(&self) -> TiffResult<&dyn ByteOrderHandler> {
        self.byte_order_handler
            .as_deref()
            .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Byte order of the container read last
    pub fn byte_order(&self) -> TiffResult<ByteOrder> {
        Ok(self.handler()?.byte_order())
    }

    /// Returns whether the container read last is a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Opens and parses a TIFF file from disk
    pub fn load(&mut self, path: &Path) -> TiffResult<TIFF> {
        debug!("Loading TIFF file: {}", path.display());
        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(1024 * 1024, file);
        self.read(&mut reader)
    }

    /// Parses the header and the IFD chain
    ///
    /// # Arguments
    /// * `reader` - Any struct implementing the SeekableReader trait
    ///
    /// # Returns
    /// The container structure with every IFD in chain order
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> TiffResult<TIFF> {
        reader.seek(SeekFrom::Start(0))?;
        self.file_size = validation::get_file_size(reader)?;

        let byte_order = ByteOrder::detect(reader)?;
        debug!("Detected byte order: {}", byte_order.name());
        self.byte_order_handler = Some(byte_order.create_handler());

        let handler = self.handler()?;
        let version = handler.read_u16(reader)?;
        let is_big_tiff = match version {
            header::BIG_TIFF_VERSION => {
                validation::validate_bigtiff_header(reader, handler)?;
                true
            }
            header::TIFF_VERSION => false,
            _ => return Err(TiffError::UnsupportedVersion(version)),
        };

        let first_ifd_offset = if is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };
        self.is_big_tiff = is_big_tiff;

        debug!("First IFD offset: {}", first_ifd_offset);
        validation::validate_ifd_offset(first_ifd_offset, self.file_size)?;

        let mut tiff = TIFF::new(is_big_tiff, byte_order);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset)?;

        if tiff.ifds.is_empty() {
            return Err(TiffError::GenericError("No IFDs found in TIFF data".to_string()));
        }

        debug!("Read {} IFDs", tiff.ifds.len());
        Ok(tiff)
    }

    /// Follows the chain of IFDs starting at `first_ifd_offset`
    ///
    /// A broken link ends the chain with a warning; the IFDs read so far
    /// are kept.
    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_ifd_offset: u64) -> TiffResult<Vec<IFD>> {
        let mut ifds = Vec::new();
        let mut ifd_offset = first_ifd_offset;

        while ifd_offset != 0 && ifds.len() < MAX_IFDS {
            if ifd_offset >= self.file_size {
                warn!("IFD offset {} exceeds data size {}, stopping IFD chain", ifd_offset, self.file_size);
                break;
            }

            let ifd = match self.read_ifd(reader, ifd_offset, ifds.len()) {
                Ok(ifd) => ifd,
                Err(e) => {
                    warn!("Error reading IFD {}: {}", ifds.len(), e);
                    break;
                }
            };

            // read_ifd leaves the reader right after the last entry
            let next_ifd_offset = match self.read_offset(reader) {
                Ok(offset) => offset,
                Err(e) => {
                    warn!("Error reading next IFD offset: {}", e);
                    ifds.push(ifd);
                    break;
                }
            };
            ifds.push(ifd);

            if next_ifd_offset != 0 && (next_ifd_offset >= self.file_size || next_ifd_offset < 8) {
                warn!("Invalid next IFD offset: {}, stopping IFD chain", next_ifd_offset);
                break;
            }
            ifd_offset = next_ifd_offset;
        }

        Ok(ifds)
    }

    /// Reads one IFD located at `offset`
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> TiffResult<IFD> {
        reader.seek(SeekFrom::Start(offset))?;
        let handler = self.handler()?;

        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };
        let entry_size = if self.is_big_tiff { 20 } else { 12 };
        validation::validate_block(offset, entry_count * entry_size, self.file_size, "IFD")?;

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            ifd.add_entry(self.read_ifd_entry(reader)?);
        }

        debug!("Read IFD #{} with {} entries", number, ifd.entry_count());
        Ok(ifd)
    }

    /// Reads one 12-byte (or 20-byte BigTIFF) directory entry
    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> TiffResult<IFDEntry> {
        let handler = self.handler()?;
        let byte_order = handler.byte_order();

        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        let field_len = if self.is_big_tiff { 8 } else { 4 };
        let mut raw = [0u8; 8];
        reader.read_exact(&mut raw[..field_len])?;

        let mut entry = IFDEntry::with_inline_bytes(tag, field_type, count, 0, raw);
        entry.value_offset = if entry.is_value_inline(self.is_big_tiff) && count == 1 {
            decode_scalar(field_type, &raw, byte_order)
        } else if self.is_big_tiff {
            byte_order.u64_from(&raw)
        } else {
            byte_order.u32_from(&raw) as u64
        };

        Ok(entry)
    }

    fn read_offset(&self, reader: &mut dyn SeekableReader) -> TiffResult<u64> {
        let handler = self.handler()?;
        if self.is_big_tiff {
            Ok(handler.read_u64(reader)?)
        } else {
            Ok(handler.read_u32(reader)? as u64)
        }
    }

    /// Raw payload of an entry, inline or fetched from its offset
    fn payload_bytes(&self, reader: &mut dyn SeekableReader, entry: &IFDEntry) -> TiffResult<Vec<u8>> {
        let size = entry.payload_size();
        if entry.is_value_inline(self.is_big_tiff) {
            return Ok(entry.inline_bytes[..size].to_vec());
        }

        validation::validate_block(entry.value_offset, size as u64, self.file_size, "Tag payload")?;
        reader.seek(SeekFrom::Start(entry.value_offset))?;
        let mut buffer = vec![0u8; size];
        reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Reads an integer-typed tag as a vector of u64
    ///
    /// # Arguments
    /// * `reader` - The seekable reader to use
    /// * `ifd` - The IFD containing the tag
    /// * `tag` - The tag number to read
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<u64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        let byte_order = self.byte_order()?;
        let payload = self.payload_bytes(reader, entry)?;
        let width = entry.get_field_type_size();

        match entry.field_type {
            field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED |
            field_types::SHORT | field_types::SSHORT |
            field_types::LONG | field_types::SLONG |
            field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => Ok(payload
                .chunks_exact(width)
                .map(|chunk| decode_scalar(entry.field_type, chunk, byte_order))
                .collect()),
            other => Err(TiffError::UnsupportedFieldType(other)),
        }
    }

    /// Reads a numeric tag as a vector of f64
    pub fn read_tag_doubles(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<f64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        let byte_order = self.byte_order()?;
        let payload = self.payload_bytes(reader, entry)?;
        let width = entry.get_field_type_size();

        let values = match entry.field_type {
            field_types::DOUBLE => payload.chunks_exact(8).map(|c| byte_order.f64_from(c)).collect(),
            field_types::FLOAT => payload.chunks_exact(4).map(|c| byte_order.f32_from(c) as f64).collect(),
            field_types::RATIONAL => payload
                .chunks_exact(8)
                .map(|c| {
                    let num = byte_order.u32_from(&c[..4]) as f64;
                    let den = byte_order.u32_from(&c[4..]) as f64;
                    if den == 0.0 { f64::NAN } else { num / den }
                })
                .collect(),
            field_types::SSHORT => payload.chunks_exact(2).map(|c| byte_order.u16_from(c) as i16 as f64).collect(),
            field_types::SLONG => payload.chunks_exact(4).map(|c| byte_order.u32_from(c) as i32 as f64).collect(),
            field_types::BYTE | field_types::SHORT | field_types::LONG | field_types::LONG8 => payload
                .chunks_exact(width)
                .map(|c| decode_scalar(entry.field_type, c, byte_order) as f64)
                .collect(),
            other => return Err(TiffError::UnsupportedFieldType(other)),
        };
        Ok(values)
    }

    /// Reads an ASCII tag, trimming the trailing NUL terminator(s)
    pub fn read_tag_ascii(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<String> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        let mut payload = self.payload_bytes(reader, entry)?;
        while payload.last() == Some(&0) {
            payload.pop();
        }
        String::from_utf8(payload)
            .map_err(|e| TiffError::InvalidTagData(tag, format!("invalid UTF-8: {}", e)))
    }
}

/// Decodes one unsigned integer value of `field_type` from `bytes`
fn decode_scalar(field_type: u16, bytes: &[u8], byte_order: ByteOrder) -> u64 {
    match field_type {
        field_types::SHORT | field_types::SSHORT => byte_order.u16_from(bytes) as u64,
        field_types::LONG | field_types::SLONG | field_types::FLOAT => byte_order.u32_from(bytes) as u64,
        field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 |
        field_types::DOUBLE | field_types::RATIONAL | field_types::SRATIONAL => byte_order.u64_from(bytes),
        _ => bytes[0] as u64,
    }
}
