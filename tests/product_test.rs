//! Band access, validity masks and stacking on synthetic products

mod common;

use common::{band_entry, band_tiff, jp2_band_entry, reflectance, scl_code, standard_entries, tiff_to_jp2, utm33, Fixture};
use rstest::rstest;
use sentinelkit::raster::{DataType, Window};
use sentinelkit::{AlignTo, MaskOptions, ProductReader, Resampling, SceneError, StackOptions};

const INVALID: [u8; 6] = [0, 1, 3, 8, 9, 10];

#[test]
fn test_index_lists_bands_and_classification() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();

    assert_eq!(reader.available_bands(), vec!["B01", "B02", "B03", "B04", "B8A"]);
    assert_eq!(reader.resolutions_of("B04"), vec![10]);
    assert_eq!(reader.resolutions_of("B01"), vec![60]);
    assert_eq!(reader.tile_identifier(), "T33TWM");
    assert!(reader.classification_path().unwrap().ends_with("_SCL_20m.tif"));
}

#[test]
fn test_read_band_returns_native_grid() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();

    let band = reader.read_band("B04", None).unwrap();
    assert_eq!(band.resolution, 10);
    assert_eq!(band.data.dim(), (60, 60));
    assert_eq!(band.profile.dtype, DataType::UInt16);
    assert_eq!(band.profile.nodata, Some(0.0));
    assert_eq!(band.crs, Some(utm33()));
    assert_eq!(band.data[[2, 3]], reflectance(4)(2, 3));
    assert_eq!(band.bounds.min_x, common::ORIGIN_X);
    assert_eq!(band.bounds.max_y, common::ORIGIN_Y);
}

#[test]
fn test_missing_archive_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let result = ProductReader::open(dir.path().join("absent.zip"));
    assert!(matches!(result, Err(SceneError::NotFound(_))));
}

#[test]
fn test_unknown_band_or_resolution_is_invalid_request() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();

    assert!(matches!(reader.read_band("B12", None), Err(SceneError::InvalidRequest(_))));
    match reader.read_band("B04", Some(20)) {
        Err(SceneError::InvalidRequest(msg)) => assert!(msg.contains("10"), "{}", msg),
        other => panic!("expected InvalidRequest, got {:?}", other.map(|b| b.band)),
    }
}

#[test]
fn test_jpeg2000_band_is_decoded() {
    let mut entries = standard_entries(Some(utm33()));
    let tiff = band_tiff(20, DataType::UInt16, Some(utm33()), reflectance(5));
    entries.push(jp2_band_entry("B05", 20, tiff_to_jp2(&tiff)));
    let fixture = Fixture::with_entries(entries);
    let reader = ProductReader::open(&fixture.product).unwrap();

    assert_eq!(reader.resolutions_of("B05"), vec![20]);
    let band = reader.read_band("B05", None).unwrap();
    assert_eq!(band.data.dim(), (30, 30));
    assert_eq!(band.profile.dtype, DataType::UInt16);
    assert_eq!(band.crs, Some(utm33()));
    assert_eq!(band.bounds.min_x, common::ORIGIN_X);
    assert_eq!(band.bounds.max_y, common::ORIGIN_Y);
    // reversible encoding keeps every value
    assert!(band.data.indexed_iter().all(|((r, c), v)| *v == reflectance(5)(r, c)));

    let opened = reader.open_band("B05", None).unwrap();
    let patch = opened.source.read_window(&Window::new(4, 7, 5, 3)).unwrap();
    assert_eq!(patch, Window::new(4, 7, 5, 3).view(&band.data));
}

#[test]
fn test_jpeg2000_band_stacks_with_geotiff_bands() {
    let mut entries = standard_entries(Some(utm33()));
    let tiff = band_tiff(20, DataType::UInt16, Some(utm33()), reflectance(5));
    entries.push(jp2_band_entry("B05", 20, tiff_to_jp2(&tiff)));
    let fixture = Fixture::with_entries(entries);
    let reader = ProductReader::open(&fixture.product).unwrap();

    let options = StackOptions { align_to: AlignTo::Resolution(20), ..StackOptions::default() };
    let stack = reader.stack_bands(&["B8A", "B05"], &options).unwrap();
    assert_eq!(stack.data.dim(), (2, 30, 30));
    assert_eq!(stack.data[[1, 3, 4]], reflectance(5)(3, 4));
}

#[test]
fn test_corrupt_jpeg2000_entry_is_an_error() {
    let mut entries = standard_entries(Some(utm33()));
    entries.push(jp2_band_entry("B05", 20, vec![0, 0, 0, 12, b'j', b'P', b' ', b' ']));
    let fixture = Fixture::with_entries(entries);
    let reader = ProductReader::open(&fixture.product).unwrap();

    assert!(matches!(reader.read_band("B05", None), Err(SceneError::Gdal(_))));
}

#[test]
fn test_mask_at_native_resolution() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();

    let mask = reader.build_valid_mask(&INVALID, &MaskOptions::default()).unwrap();
    assert_eq!(mask.mask.dim(), (30, 30));
    assert_eq!(mask.profile.dtype, DataType::UInt8);
    assert_eq!(mask.profile.nodata, None);
    for ((r, c), valid) in mask.mask.indexed_iter() {
        let code = scl_code(r, c) as u8;
        assert_eq!(*valid, !INVALID.contains(&code), "pixel ({}, {}) code {}", r, c, code);
    }
}

#[rstest]
#[case(None)]
#[case(Some(10))]
#[case(Some(60))]
fn test_mask_invert_is_complementary(#[case] target: Option<u32>) {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();

    let options = MaskOptions { target_resolution: target, ..MaskOptions::default() };
    let valid = reader.build_valid_mask(&INVALID, &options).unwrap();
    let invalid = reader
        .build_valid_mask(&INVALID, &MaskOptions { invert: false, ..options })
        .unwrap();
    assert_eq!(valid.mask, invalid.mask.mapv(|v| !v));
    assert_eq!(valid.profile, invalid.profile);
}

#[test]
fn test_mask_upsampled_follows_classification_codes() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();

    let options = MaskOptions { target_resolution: Some(10), ..MaskOptions::default() };
    let mask = reader.build_valid_mask(&INVALID, &options).unwrap();
    assert_eq!(mask.mask.dim(), (60, 60));
    assert_eq!(mask.profile.resolution().0, 10.0);
    for ((r, c), valid) in mask.mask.indexed_iter() {
        let code = scl_code(r / 2, c / 2) as u8;
        assert_eq!(*valid, !INVALID.contains(&code));
    }
}

#[test]
fn test_mask_without_classification_is_missing_data() {
    let entries = vec![band_entry("B04", 10, band_tiff(10, DataType::UInt16, Some(utm33()), reflectance(4)))];
    let fixture = Fixture::with_entries(entries);
    let reader = ProductReader::open(&fixture.product).unwrap();

    let result = reader.build_valid_mask(&INVALID, &MaskOptions::default());
    assert!(matches!(result, Err(SceneError::MissingData(_))));
}

#[test]
fn test_stack_same_grid() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();

    let stack = reader.stack_bands(&["B04", "B03", "B02"], &StackOptions::default()).unwrap();
    assert_eq!(stack.data.dim(), (3, 60, 60));
    assert_eq!(stack.bands, vec!["B04", "B03", "B02"]);
    assert_eq!(stack.profile.count, 3);
    assert_eq!(stack.profile.resolution().0, 10.0);

    let b04 = reader.read_band("B04", None).unwrap();
    assert_eq!(stack.data.index_axis(ndarray::Axis(0), 0), b04.data);
}

#[test]
fn test_stack_align_to_coarsest() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();

    let options = StackOptions { align_to: AlignTo::Max, ..StackOptions::default() };
    let stack = reader.stack_bands(&["B01", "B04"], &options).unwrap();
    assert_eq!(stack.data.dim(), (2, 10, 10));
    assert_eq!(stack.profile.resolution().0, 60.0);

    let b01 = reader.read_band("B01", None).unwrap();
    assert_eq!(stack.data.index_axis(ndarray::Axis(0), 0), b01.data);
}

#[rstest]
#[case(AlignTo::Min, 10, 60)]
#[case(AlignTo::Max, 60, 10)]
#[case(AlignTo::Resolution(20), 20, 30)]
fn test_stack_align_targets(#[case] align_to: AlignTo, #[case] resolution: u32, #[case] side: usize) {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();

    let options = StackOptions { align_to, resampling: Resampling::Average, ..StackOptions::default() };
    let stack = reader.stack_bands(&["B02", "B8A", "B01"], &options).unwrap();
    assert_eq!(stack.data.dim(), (3, side, side));
    assert_eq!(stack.profile.resolution().0, resolution as f64);
}

#[test]
fn test_stack_order_follows_request() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();

    let forward = reader.stack_bands(&["B02", "B03", "B04"], &StackOptions::default()).unwrap();
    let reversed = reader.stack_bands(&["B04", "B03", "B02"], &StackOptions::default()).unwrap();
    for i in 0..3 {
        assert_eq!(
            forward.data.index_axis(ndarray::Axis(0), i),
            reversed.data.index_axis(ndarray::Axis(0), 2 - i)
        );
    }
    assert_eq!(forward.profile, reversed.profile);
}

#[test]
fn test_single_band_keeps_native_grid_unless_forced() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();

    let options = StackOptions { align_to: AlignTo::Resolution(20), ..StackOptions::default() };
    let native = reader.stack_bands(&["B04"], &options).unwrap();
    assert_eq!(native.data.dim(), (1, 60, 60));

    let forced = reader
        .stack_bands(&["B04"], &StackOptions { force_resample_single: true, ..options })
        .unwrap();
    assert_eq!(forced.data.dim(), (1, 30, 30));
}

#[test]
fn test_stack_rejects_empty_request() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();
    let none: [&str; 0] = [];
    assert!(matches!(reader.stack_bands(&none, &StackOptions::default()), Err(SceneError::InvalidRequest(_))));
}

#[test]
fn test_stack_is_deterministic() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();

    let options = StackOptions { align_to: AlignTo::Resolution(20), ..StackOptions::default() };
    let first = reader.stack_bands(&["B04", "B8A", "B01"], &options).unwrap();
    let second = reader.stack_bands(&["B04", "B8A", "B01"], &options).unwrap();
    assert_eq!(first.data, second.data);
    assert_eq!(first.profile, second.profile);
}
