//! Image File Directory (IFD) structures
//!
//! An IFD is the tag table describing one image inside a TIFF container.

use std::collections::HashMap;
use std::fmt;
use log::trace;

use crate::tiff::constants::{field_types, tags};
use crate::utils::tag_utils;

/// Represents an Image File Directory (IFD) in a TIFF file
#[derive(Debug, Clone)]
pub struct IFD {
    /// Entries in this IFD, in insertion order
    pub entries: Vec<IFDEntry>,
    /// IFD number (0-based)
    pub number: usize,
    /// Offset to this IFD in the file
    pub offset: u64,
    /// Latest entry per tag for quick lookup
    tag_map: HashMap<u16, IFDEntry>,
}

/// One tag entry of an IFD
///
/// `value_offset` holds the decoded scalar for inline single values and
/// the file offset of the payload otherwise. `inline_bytes` keeps the raw
/// value field so multi-value inline payloads can be decoded in the
/// file's byte order.
#[derive(Debug, Clone)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// Value or offset to values
    pub value_offset: u64,
    /// Raw value field as read from disk (zeroed for builder entries)
    pub inline_bytes: [u8; 8],
}

impl IFDEntry {
    /// Creates an entry whose value (or placeholder offset) is known
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        Self {
            tag,
            field_type,
            count,
            value_offset,
            inline_bytes: [0u8; 8],
        }
    }

    /// Creates an entry together with the raw bytes of its value field
    pub fn with_inline_bytes(tag: u16, field_type: u16, count: u64, value_offset: u64, inline_bytes: [u8; 8]) -> Self {
        Self {
            tag,
            field_type,
            count,
            value_offset,
            inline_bytes,
        }
    }

    /// Size in bytes of one value of this entry's field type
    pub fn get_field_type_size(&self) -> usize {
        tag_utils::field_type_size(self.field_type)
    }

    /// Total payload size in bytes
    pub fn payload_size(&self) -> usize {
        self.get_field_type_size() * self.count as usize
    }

    /// Whether the payload lives in the value field rather than at an offset
    pub fn is_value_inline(&self, is_big_tiff: bool) -> bool {
        let inline_size = if is_big_tiff { 8 } else { 4 };
        self.payload_size() <= inline_size
    }

    /// Returns a human-readable description of this entry
    pub fn description(&self) -> String {
        format!("Tag: {} ({}), Type: {} ({}), Count: {}, Value/Offset: {}",
                self.tag, tag_utils::get_tag_name(self.tag),
                self.field_type, tag_utils::get_field_type_name(self.field_type),
                self.count, self.value_offset)
    }
}

impl IFD {
    /// Creates an empty IFD
    pub fn new(number: usize, offset: u64) -> Self {
        Self {
            entries: Vec::new(),
            number,
            offset,
            tag_map: HashMap::new(),
        }
    }

    /// Adds an entry; a later entry for the same tag shadows the earlier one
    pub fn add_entry(&mut self, entry: IFDEntry) {
        trace!("Adding entry to IFD #{}: {}", self.number, entry.description());
        self.tag_map.insert(entry.tag, entry.clone());
        self.entries.push(entry);
    }

    /// Gets a tag's scalar value or payload offset
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.tag_map.get(&tag).map(|entry| entry.value_offset)
    }

    pub fn has_tag(&self, tag: u16) -> bool {
        self.tag_map.contains_key(&tag)
    }

    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.tag_map.get(&tag)
    }

    /// Gets (width, height) if both tags are present
    pub fn get_dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Number of samples per pixel (1 if absent)
    pub fn get_samples_per_pixel(&self) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// Whether pixel data is organised in tiles rather than strips
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_WIDTH) && self.has_tag(tags::TILE_OFFSETS)
    }

    /// Whether the IFD carries any georeferencing tag
    pub fn is_georeferenced(&self) -> bool {
        self.has_tag(tags::MODEL_TRANSFORMATION_TAG)
            || (self.has_tag(tags::MODEL_PIXEL_SCALE_TAG) && self.has_tag(tags::MODEL_TIEPOINT_TAG))
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        if let Some((width, height)) = self.get_dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }
        writeln!(f, "  Samples per pixel: {}", self.get_samples_per_pixel())?;
        writeln!(f, "  Tags:")?;
        for entry in &self.entries {
            let shown = if entry.field_type == field_types::ASCII || entry.count > 1 {
                format!("<{} values>", entry.count)
            } else {
                entry.value_offset.to_string()
            };
            writeln!(f, "    {} ({}): {} [{}]",
                     entry.tag, tag_utils::get_tag_name(entry.tag), shown,
                     tag_utils::get_field_type_name(entry.field_type))?;
        }
        Ok(())
    }
}
