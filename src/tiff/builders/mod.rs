//! TIFF builder strategy modules
//!
//! Each builder adds one family of tags to an IFD. Payloads that do not
//! fit in the entry's value field go to `external_data`, keyed by
//! (IFD index, tag), and are laid out by the writer.

use std::collections::BTreeMap;

use crate::tiff::ifd::{IFD, IFDEntry};

pub mod basic_tags;
pub mod geo_tags;
pub mod metadata_tags;
pub mod writer;

/// Tag payloads stored outside the IFD, keyed by (IFD index, tag)
pub type ExternalData = BTreeMap<(usize, u16), Vec<u8>>;

/// Adds a tag whose payload is already encoded little-endian
///
/// Payloads that fit in the value field (4 bytes, 8 for BigTIFF) are
/// packed into the entry; larger ones are stored as external data.
pub(crate) fn put_tag(
    ifd: &mut IFD,
    external_data: &mut ExternalData,
    ifd_index: usize,
    is_big_tiff: bool,
    tag: u16,
    field_type: u16,
    count: u64,
    payload: Vec<u8>,
) {
    let inline_limit = if is_big_tiff { 8 } else { 4 };
    if payload.len() <= inline_limit {
        let mut packed = [0u8; 8];
        packed[..payload.len()].copy_from_slice(&payload);
        external_data.remove(&(ifd_index, tag));
        ifd.add_entry(IFDEntry::new(tag, field_type, count, u64::from_le_bytes(packed)));
    } else {
        ifd.add_entry(IFDEntry::new(tag, field_type, count, 0));
        external_data.insert((ifd_index, tag), payload);
    }
}

pub(crate) fn shorts_le(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub(crate) fn doubles_le(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// NUL-terminated ASCII payload
pub(crate) fn ascii(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    bytes
}
