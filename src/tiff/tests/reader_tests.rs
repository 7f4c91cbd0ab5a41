//! Tests for container parsing

extern crate std;

use byteorder::{BigEndian, LittleEndian};
use std::io::Cursor;

use super::test_utils::{assemble, create_test_bigtiff_buffer, create_test_tiff_buffer, longs, shorts};
use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::{field_types, tags};
use crate::tiff::reader::TiffReader;

#[test]
fn test_read_classic_header() {
    let mut cursor = create_test_tiff_buffer();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    std::assert!(!tiff.is_big_tiff);
    std::assert_eq!(tiff.byte_order, ByteOrder::LittleEndian);
    std::assert_eq!(tiff.main_ifd().unwrap().get_dimensions(), Some((800, 600)));
}

#[test]
fn test_read_bigtiff_header() {
    let mut cursor = create_test_bigtiff_buffer();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    std::assert!(tiff.is_big_tiff);
    std::assert!(reader.is_big_tiff());
    std::assert_eq!(tiff.main_ifd().unwrap().get_dimensions(), Some((1024, 768)));
}

#[test]
fn test_big_endian_inline_values() {
    let entries = vec![
        (tags::IMAGE_WIDTH, field_types::SHORT, 1, shorts::<BigEndian>(&[300])),
        (tags::IMAGE_LENGTH, field_types::LONG, 1, longs::<BigEndian>(&[70000])),
        (tags::BITS_PER_SAMPLE, field_types::SHORT, 2, shorts::<BigEndian>(&[8, 16])),
    ];
    let bytes = assemble::<BigEndian>(entries, &[vec![0u8; 4]], false);
    let mut cursor = Cursor::new(bytes);

    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    std::assert_eq!(tiff.byte_order, ByteOrder::BigEndian);
    std::assert_eq!(ifd.get_dimensions(), Some((300, 70000)));
    std::assert_eq!(reader.read_tag_values(&mut cursor, ifd, tags::BITS_PER_SAMPLE).unwrap(), vec![8, 16]);
}

#[test]
fn test_external_ascii_and_doubles() {
    let mut ascii = b"sentinel software".to_vec();
    ascii.push(0);
    let entries = vec![
        (tags::IMAGE_WIDTH, field_types::LONG, 1, longs::<LittleEndian>(&[1])),
        (tags::IMAGE_LENGTH, field_types::LONG, 1, longs::<LittleEndian>(&[1])),
        (tags::SOFTWARE, field_types::ASCII, ascii.len() as u32, ascii),
        (tags::MODEL_PIXEL_SCALE_TAG, field_types::DOUBLE, 3,
         super::test_utils::doubles::<LittleEndian>(&[10.0, 10.0, 0.0])),
    ];
    let bytes = assemble::<LittleEndian>(entries, &[vec![0u8; 1]], false);
    let mut cursor = Cursor::new(bytes);

    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    std::assert_eq!(reader.read_tag_ascii(&mut cursor, ifd, tags::SOFTWARE).unwrap(), "sentinel software");
    std::assert_eq!(
        reader.read_tag_doubles(&mut cursor, ifd, tags::MODEL_PIXEL_SCALE_TAG).unwrap(),
        vec![10.0, 10.0, 0.0]
    );
    std::assert!(reader.read_tag_values(&mut cursor, ifd, tags::PREDICTOR).is_err());
}

#[test]
fn test_garbage_is_rejected() {
    let mut cursor = Cursor::new(b"PK\x03\x04 not a tiff".to_vec());
    std::assert!(TiffReader::new().read(&mut cursor).is_err());
}
