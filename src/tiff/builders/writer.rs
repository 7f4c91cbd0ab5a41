//! TIFF writing
//!
//! Lays out a container as header, IFDs, external tag data and finally
//! image data, each block aligned to four bytes. All offsets are computed
//! before anything is written, and maps are ordered, so equal input gives
//! byte-identical output.

use std::collections::{BTreeMap, HashSet};
use std::io::{Seek, SeekFrom, Write};

use log::{debug, info};

use super::ExternalData;
use crate::tiff::constants::{header, tags};
use crate::tiff::errors::TiffResult;
use crate::tiff::ifd::{IFD, IFDEntry};

/// Next 4-byte aligned position at or after `offset`
fn align_to_4_bytes(offset: u64) -> u64 {
    (offset + 3) & !3
}

fn write_padding(writer: &mut impl Write, data_len: usize) -> TiffResult<()> {
    let padding = (4 - (data_len % 4)) % 4;
    if padding > 0 {
        writer.write_all(&[0u8; 3][..padding])?;
    }
    Ok(())
}

/// Entries sorted by tag with duplicates removed, the last occurrence winning
fn unique_sorted_entries(entries: &[IFDEntry]) -> Vec<IFDEntry> {
    let mut seen = HashSet::new();
    let mut unique: Vec<IFDEntry> = entries
        .iter()
        .rev()
        .filter(|e| seen.insert(e.tag))
        .cloned()
        .collect();
    unique.sort_by_key(|e| e.tag);
    unique
}

/// Handles writing TIFF containers
pub struct WriterBuilder;

impl WriterBuilder {
    /// Writes a complete container to `writer`
    pub fn write<W: Write + Seek>(
        writer: &mut W,
        is_big_tiff: bool,
        ifds: &[IFD],
        image_data: &BTreeMap<usize, Vec<u8>>,
        external_data: &ExternalData,
    ) -> TiffResult<()> {
        info!("Writing TIFF with {} IFD(s)", ifds.len());

        let sorted_ifds: Vec<IFD> = ifds
            .iter()
            .map(|ifd| {
                let mut sorted = ifd.clone();
                sorted.entries = unique_sorted_entries(&ifd.entries);
                sorted
            })
            .collect();

        let header_size = if is_big_tiff { 16 } else { 8 };
        let (ifd_offsets, data_offsets) =
            Self::calculate_offsets(&sorted_ifds, external_data, image_data, header_size, is_big_tiff);

        Self::write_header(writer, is_big_tiff, ifd_offsets.first().copied().unwrap_or(0))?;
        Self::write_ifds(writer, &sorted_ifds, &ifd_offsets, &data_offsets, is_big_tiff)?;

        for ((ifd_index, tag), data) in external_data {
            if let Some(offset) = data_offsets.get(&(*ifd_index, *tag)) {
                writer.seek(SeekFrom::Start(*offset))?;
                writer.write_all(data)?;
                write_padding(writer, data.len())?;
            }
        }

        for (ifd_index, data) in image_data {
            let offset = [tags::STRIP_OFFSETS, tags::TILE_OFFSETS]
                .iter()
                .find_map(|&tag| data_offsets.get(&(*ifd_index, tag)))
                .copied();
            if let Some(offset) = offset {
                writer.seek(SeekFrom::Start(offset))?;
                writer.write_all(data)?;
                write_padding(writer, data.len())?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    /// Offsets of every IFD, then of every external payload and image block
    fn calculate_offsets(
        sorted_ifds: &[IFD],
        external_data: &ExternalData,
        image_data: &BTreeMap<usize, Vec<u8>>,
        header_size: u64,
        is_big_tiff: bool,
    ) -> (Vec<u64>, BTreeMap<(usize, u16), u64>) {
        let mut current_offset = header_size;
        let mut ifd_offsets = Vec::with_capacity(sorted_ifds.len());
        let mut data_offsets = BTreeMap::new();

        for ifd in sorted_ifds {
            ifd_offsets.push(current_offset);
            current_offset = align_to_4_bytes(current_offset + Self::calculate_ifd_size(ifd, is_big_tiff));
        }

        for (key, data) in external_data {
            data_offsets.insert(*key, current_offset);
            current_offset = align_to_4_bytes(current_offset + data.len() as u64);
        }

        for (ifd_index, data) in image_data {
            if let Some(ifd) = sorted_ifds.get(*ifd_index) {
                for tag in [tags::STRIP_OFFSETS, tags::TILE_OFFSETS] {
                    if ifd.has_tag(tag) {
                        data_offsets.insert((*ifd_index, tag), current_offset);
                    }
                }
            }
            current_offset = align_to_4_bytes(current_offset + data.len() as u64);
        }

        debug!("Container layout: IFDs at {:?}, {} bytes total", ifd_offsets, current_offset);
        (ifd_offsets, data_offsets)
    }

    /// Header with the first IFD offset
    fn write_header(writer: &mut (impl Write + Seek), is_big_tiff: bool, first_ifd_offset: u64) -> TiffResult<()> {
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(&header::LITTLE_ENDIAN_MARKER)?;

        if is_big_tiff {
            writer.write_all(&header::BIG_TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&header::BIGTIFF_OFFSET_SIZE.to_le_bytes())?;
            writer.write_all(&[0u8, 0])?;
            writer.write_all(&first_ifd_offset.to_le_bytes())?;
        } else {
            writer.write_all(&header::TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&(first_ifd_offset as u32).to_le_bytes())?;
        }
        Ok(())
    }

    /// Entry count, 12 (20) bytes per entry and the next IFD offset
    fn calculate_ifd_size(ifd: &IFD, is_big_tiff: bool) -> u64 {
        let entries = ifd.entries.len() as u64;
        if is_big_tiff {
            8 + 20 * entries + 8
        } else {
            2 + 12 * entries + 4
        }
    }

    fn write_ifds(
        writer: &mut (impl Write + Seek),
        sorted_ifds: &[IFD],
        ifd_offsets: &[u64],
        data_offsets: &BTreeMap<(usize, u16), u64>,
        is_big_tiff: bool,
    ) -> TiffResult<()> {
        for (i, ifd) in sorted_ifds.iter().enumerate() {
            let next_offset = ifd_offsets.get(i + 1).copied().unwrap_or(0);
            writer.seek(SeekFrom::Start(ifd_offsets[i]))?;
            Self::write_ifd(writer, ifd, next_offset, data_offsets, i, is_big_tiff)?;
            write_padding(writer, Self::calculate_ifd_size(ifd, is_big_tiff) as usize)?;
        }
        Ok(())
    }

    /// Writes one IFD; external payloads get their computed offsets
    fn write_ifd(
        writer: &mut impl Write,
        ifd: &IFD,
        next_offset: u64,
        data_offsets: &BTreeMap<(usize, u16), u64>,
        ifd_index: usize,
        is_big_tiff: bool,
    ) -> TiffResult<()> {
        if is_big_tiff {
            writer.write_all(&(ifd.entries.len() as u64).to_le_bytes())?;
        } else {
            writer.write_all(&(ifd.entries.len() as u16).to_le_bytes())?;
        }

        for entry in &ifd.entries {
            let value_offset = data_offsets
                .get(&(ifd_index, entry.tag))
                .copied()
                .unwrap_or(entry.value_offset);

            writer.write_all(&entry.tag.to_le_bytes())?;
            writer.write_all(&entry.field_type.to_le_bytes())?;
            if is_big_tiff {
                writer.write_all(&entry.count.to_le_bytes())?;
                writer.write_all(&value_offset.to_le_bytes())?;
            } else {
                writer.write_all(&(entry.count as u32).to_le_bytes())?;
                writer.write_all(&(value_offset as u32).to_le_bytes())?;
            }
        }

        if is_big_tiff {
            writer.write_all(&next_offset.to_le_bytes())?;
        } else {
            writer.write_all(&(next_offset as u32).to_le_bytes())?;
        }
        Ok(())
    }
}
