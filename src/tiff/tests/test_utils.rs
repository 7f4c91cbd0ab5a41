use std::io::Cursor;
use byteorder::{ByteOrder as ByteOrderExt, LittleEndian, WriteBytesExt};

use crate::tiff::constants::tags;

/// Creates a test buffer with TIFF header and sample data
pub fn create_test_tiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    // TIFF header (little-endian)
    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II for little-endian
    buffer.write_u16::<LittleEndian>(42).unwrap();     // TIFF magic number
    buffer.write_u32::<LittleEndian>(8).unwrap();      // IFD offset

    // Sample IFD (at offset 8)
    buffer.write_u16::<LittleEndian>(2).unwrap();      // Entry count (2 entries)

    // Entry 1: ImageWidth (tag 256)
    buffer.write_u16::<LittleEndian>(256).unwrap();    // Tag
    buffer.write_u16::<LittleEndian>(4).unwrap();      // Type (LONG)
    buffer.write_u32::<LittleEndian>(1).unwrap();      // Count
    buffer.write_u32::<LittleEndian>(800).unwrap();    // Value (width)

    // Entry 2: ImageLength (tag 257)
    buffer.write_u16::<LittleEndian>(257).unwrap();
    buffer.write_u16::<LittleEndian>(4).unwrap();
    buffer.write_u32::<LittleEndian>(1).unwrap();
    buffer.write_u32::<LittleEndian>(600).unwrap();

    // Next IFD offset (0 = no more IFDs)
    buffer.write_u32::<LittleEndian>(0).unwrap();

    Cursor::new(buffer)
}

/// Creates a test buffer with BigTIFF header and sample data
pub fn create_test_bigtiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II
    buffer.write_u16::<LittleEndian>(43).unwrap();     // BigTIFF version
    buffer.write_u16::<LittleEndian>(8).unwrap();      // Offset size
    buffer.write_u16::<LittleEndian>(0).unwrap();      // Reserved
    buffer.write_u64::<LittleEndian>(16).unwrap();     // IFD offset

    buffer.write_u64::<LittleEndian>(2).unwrap();      // Entry count

    buffer.write_u16::<LittleEndian>(256).unwrap();
    buffer.write_u16::<LittleEndian>(4).unwrap();
    buffer.write_u64::<LittleEndian>(1).unwrap();
    buffer.write_u64::<LittleEndian>(1024).unwrap();

    buffer.write_u16::<LittleEndian>(257).unwrap();
    buffer.write_u16::<LittleEndian>(4).unwrap();
    buffer.write_u64::<LittleEndian>(1).unwrap();
    buffer.write_u64::<LittleEndian>(768).unwrap();

    buffer.write_u64::<LittleEndian>(0).unwrap();

    Cursor::new(buffer)
}

/// One directory entry for `assemble`: tag, field type, count, payload
pub type RawEntry = (u16, u16, u32, Vec<u8>);

pub fn shorts<B: ByteOrderExt>(values: &[u16]) -> Vec<u8> {
    let mut out = vec![0u8; values.len() * 2];
    B::write_u16_into(values, &mut out);
    out
}

pub fn longs<B: ByteOrderExt>(values: &[u32]) -> Vec<u8> {
    let mut out = vec![0u8; values.len() * 4];
    B::write_u32_into(values, &mut out);
    out
}

pub fn doubles<B: ByteOrderExt>(values: &[f64]) -> Vec<u8> {
    let mut out = vec![0u8; values.len() * 8];
    B::write_f64_into(values, &mut out);
    out
}

/// Assembles a classic TIFF in byte order `B`
///
/// Image blocks are laid out first; StripOffsets/StripByteCounts (or the
/// tile equivalents when `tiled`) are generated for them. Payloads over
/// four bytes go after the blocks and the single IFD comes last.
pub fn assemble<B: ByteOrderExt>(mut entries: Vec<RawEntry>, blocks: &[Vec<u8>], tiled: bool) -> Vec<u8> {
    let big_endian = B::read_u16(&[0, 1]) == 1;
    let mut buffer = if big_endian { b"MM".to_vec() } else { b"II".to_vec() };
    buffer.extend_from_slice(&shorts::<B>(&[42]));
    buffer.extend_from_slice(&[0u8; 4]);

    let mut offsets = Vec::new();
    for block in blocks {
        offsets.push(buffer.len() as u32);
        buffer.extend_from_slice(block);
        if buffer.len() % 2 == 1 {
            buffer.push(0);
        }
    }
    let counts: Vec<u32> = blocks.iter().map(|b| b.len() as u32).collect();
    let (offsets_tag, counts_tag) = if tiled {
        (tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
    } else {
        (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
    };
    entries.push((offsets_tag, 4, blocks.len() as u32, longs::<B>(&offsets)));
    entries.push((counts_tag, 4, blocks.len() as u32, longs::<B>(&counts)));
    entries.sort_by_key(|e| e.0);

    let mut value_fields = Vec::new();
    for (_, _, _, payload) in &entries {
        if payload.len() <= 4 {
            let mut field = payload.clone();
            field.resize(4, 0);
            value_fields.push(field);
        } else {
            let offset = buffer.len() as u32;
            buffer.extend_from_slice(payload);
            if buffer.len() % 2 == 1 {
                buffer.push(0);
            }
            value_fields.push(longs::<B>(&[offset]));
        }
    }

    let ifd_offset = buffer.len() as u32;
    buffer.extend_from_slice(&shorts::<B>(&[entries.len() as u16]));
    for ((tag, field_type, count, _), field) in entries.iter().zip(value_fields) {
        buffer.extend_from_slice(&shorts::<B>(&[*tag, *field_type]));
        buffer.extend_from_slice(&longs::<B>(&[*count]));
        buffer.extend_from_slice(&field);
    }
    buffer.extend_from_slice(&[0u8; 4]);

    let first = longs::<B>(&[ifd_offset]);
    buffer[4..8].copy_from_slice(&first);
    buffer
}
