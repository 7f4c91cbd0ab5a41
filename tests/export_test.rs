//! WGS84 exports, quicklooks and overlay bounds on synthetic products

mod common;

use std::fs;

use common::{band_entry, band_tiff, reflectance, scl_entry, sized_band_tiff, utm33, Fixture};
use ndarray::Axis;
use sentinelkit::coordinate::{CoordinateSystem, CoordinateSystemFactory};
use sentinelkit::display::AlignOffset;
use sentinelkit::raster::DataType;
use sentinelkit::tiff::read_geotiff_file;
use sentinelkit::{Composite, ExportMode, ExportOptions, ProductReader, ReprojectionExporter, SceneError, SentinelKit, Settings};

fn exporter_options() -> ExportOptions {
    ExportOptions { resolution: Some(10), ..ExportOptions::default() }
}

#[test]
fn test_single_export_without_crs_writes_nothing() {
    let fixture = Fixture::without_crs();
    let reader = ProductReader::open(&fixture.product).unwrap();
    let out = fixture.out("b04.tif");

    let result = ReprojectionExporter::new(&reader, exporter_options()).export_single("B04", &out);
    assert!(matches!(result, Err(SceneError::InvalidData(_))));
    assert!(!out.exists());
}

#[test]
fn test_composite_without_crs_is_invalid_data() {
    let fixture = Fixture::without_crs();
    let reader = ProductReader::open(&fixture.product).unwrap();
    let out = fixture.out("rgb.tif");

    let result = ReprojectionExporter::new(&reader, exporter_options()).export_composite(Composite::Rgb, &out);
    assert!(matches!(result, Err(SceneError::InvalidData(_))));
    assert!(!out.exists());
}

#[test]
fn test_single_export_keeps_source_type() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();
    let out = fixture.out("b04.tif");

    let profile = ReprojectionExporter::new(&reader, exporter_options()).export_single("B04", &out).unwrap();
    assert_eq!(profile.crs, Some(CoordinateSystem::WGS84));
    assert_eq!(profile.dtype, DataType::UInt16);
    assert_eq!(profile.nodata, Some(0.0));

    let (data, written) = read_geotiff_file(&out).unwrap();
    assert_eq!(written.crs, Some(CoordinateSystem::WGS84));
    assert_eq!(written.dtype, DataType::UInt16);
    assert_eq!(data.dim().0, 1);
    assert!(data.iter().any(|v| *v > 0.0));
}

#[test]
fn test_single_export_without_source_nodata_has_none() {
    let fixture = Fixture::with_entries(vec![
        band_entry("B04", 10, band_tiff(10, DataType::Float32, Some(utm33()), |r, c| (r * 60 + c) as f64 * 0.25)),
        scl_entry(Some(utm33())),
    ]);
    let reader = ProductReader::open(&fixture.product).unwrap();
    let out = fixture.out("b04.tif");

    let profile = ReprojectionExporter::new(&reader, exporter_options()).export_single("B04", &out).unwrap();
    assert_eq!(profile.dtype, DataType::Float32);
    assert_eq!(profile.nodata, None);

    let (_, written) = read_geotiff_file(&out).unwrap();
    assert_eq!(written.dtype, DataType::Float32);
    assert_eq!(written.nodata, None);
}

#[test]
fn test_composite_with_mixed_crs_writes_nothing() {
    let utm32 = CoordinateSystemFactory::from_epsg(32632);
    let fixture = Fixture::with_entries(vec![
        band_entry("B02", 10, band_tiff(10, DataType::UInt16, Some(utm33()), reflectance(2))),
        band_entry("B03", 10, band_tiff(10, DataType::UInt16, Some(utm32), reflectance(3))),
        band_entry("B04", 10, band_tiff(10, DataType::UInt16, Some(utm33()), reflectance(4))),
    ]);
    let reader = ProductReader::open(&fixture.product).unwrap();
    let exporter = ReprojectionExporter::new(&reader, exporter_options());
    let out = fixture.out("rgb.tif");

    assert!(matches!(exporter.export_composite(Composite::Rgb, &out), Err(SceneError::InvalidData(_))));
    assert!(!out.exists());

    let out_dir = fixture.out("grid");
    assert!(matches!(exporter.export_grid(&out_dir), Err(SceneError::InvalidData(_))));
    assert!(!out_dir.exists());
}

#[test]
fn test_rgba_alpha_marks_footprint() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();
    let out = fixture.out("rgba.tif");

    ReprojectionExporter::new(&reader, exporter_options()).export_composite(Composite::Rgba, &out).unwrap();
    let (data, profile) = read_geotiff_file(&out).unwrap();
    assert_eq!(profile.count, 4);
    assert_eq!(profile.dtype, DataType::UInt8);
    assert_eq!(profile.nodata, None);

    let alpha = data.index_axis(Axis(0), 3);
    assert!(alpha.iter().all(|a| *a == 0.0 || *a == 255.0));
    assert!(alpha.iter().any(|a| *a == 255.0));
    for ((r, c), a) in alpha.indexed_iter() {
        if *a == 0.0 {
            assert!((0..3).all(|b| data[[b, r, c]] == 0.0));
        }
    }
}

#[test]
fn test_rgb_composite_has_nodata_zero() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();
    let out = fixture.out("rgb.tif");

    let profile = ReprojectionExporter::new(&reader, exporter_options()).export_composite(Composite::Rgb, &out).unwrap();
    assert_eq!(profile.count, 3);
    assert_eq!(profile.nodata, Some(0.0));
    let (data, _) = read_geotiff_file(&out).unwrap();
    assert!(data.iter().all(|v| (0.0..=255.0).contains(v)));
}

#[test]
fn test_grid_export_names_patches_row_major() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();
    let out_dir = fixture.out("grid");

    let written = ReprojectionExporter::new(&reader, exporter_options()).export_grid(&out_dir).unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    let expected: Vec<String> = (1..=9).map(|n| format!("T33TWM_{}.tif", n)).collect();
    assert_eq!(names, expected);

    for path in &written {
        let (_, profile) = read_geotiff_file(path).unwrap();
        assert_eq!(profile.count, 4);
        assert_eq!(profile.crs, Some(CoordinateSystem::WGS84));
    }
}

#[test]
fn test_grid_size_follows_options() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();
    let options = ExportOptions { grid_rows: 2, grid_cols: 2, ..exporter_options() };

    let written = ReprojectionExporter::new(&reader, options).export_grid(&fixture.out("grid2")).unwrap();
    assert_eq!(written.len(), 4);
}

#[test]
fn test_grid_larger_than_band_skips_empty_patches() {
    let tiny = |seed| sized_band_tiff(2, 10, DataType::UInt16, Some(utm33()), reflectance(seed));
    let fixture = Fixture::with_entries(vec![
        band_entry("B02", 10, tiny(2)),
        band_entry("B03", 10, tiny(3)),
        band_entry("B04", 10, tiny(4)),
    ]);
    let reader = ProductReader::open(&fixture.product).unwrap();
    let out_dir = fixture.out("grid");

    let written = ReprojectionExporter::new(&reader, exporter_options()).export_grid(&out_dir).unwrap();
    // 2 pixels over 3 bands leaves the first row and column band empty
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["T33TWM_5.tif", "T33TWM_6.tif", "T33TWM_8.tif", "T33TWM_9.tif"]);
    assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 4);
}

#[test]
fn test_grid_export_regrids_coarser_bands_per_patch() {
    let fixture = Fixture::with_entries(vec![
        band_entry("B02", 10, band_tiff(10, DataType::UInt16, Some(utm33()), reflectance(2))),
        band_entry("B03", 20, band_tiff(20, DataType::UInt16, Some(utm33()), reflectance(3))),
        band_entry("B04", 10, band_tiff(10, DataType::UInt16, Some(utm33()), reflectance(4))),
    ]);
    let reader = ProductReader::open(&fixture.product).unwrap();
    let options = ExportOptions { resolution: None, ..ExportOptions::default() };

    let written = ReprojectionExporter::new(&reader, options).export_grid(&fixture.out("grid")).unwrap();
    assert_eq!(written.len(), 9);
    for path in &written {
        let (data, profile) = read_geotiff_file(path).unwrap();
        assert_eq!(profile.count, 4);
        // all three channels overlap inside the patch
        assert!(data.index_axis(Axis(0), 3).iter().any(|a| *a == 255.0));
    }
}

#[test]
fn test_export_is_deterministic() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();
    let exporter = ReprojectionExporter::new(&reader, exporter_options());

    exporter.export_composite(Composite::Rgba, &fixture.out("a.tif")).unwrap();
    exporter.export_composite(Composite::Rgba, &fixture.out("b.tif")).unwrap();
    assert_eq!(fs::read(fixture.out("a.tif")).unwrap(), fs::read(fixture.out("b.tif")).unwrap());
}

#[test]
fn test_quicklook_and_bounds_from_export() {
    let fixture = Fixture::standard();
    let kit = SentinelKit::new(Settings::default());
    let tif = fixture.out("rgb.tif");
    kit.export(&fixture.product, &ExportMode::Rgb, &tif, false).unwrap();

    let png = fixture.out("rgb.png");
    let slices = kit.quicklook(&tif, &png, Some(&fixture.out("slices"))).unwrap().unwrap();
    assert!(png.exists());
    assert_eq!(slices.tiles.len(), 9);
    assert!(slices.tiles.iter().all(|t| t.path.exists()));

    let bounds = kit.bounds(&tif).unwrap();
    assert!(bounds.min_x < bounds.max_x && bounds.min_y < bounds.max_y);
    assert!(bounds.min_x > 11.0 && bounds.max_x < 14.0, "{:?}", bounds);
    assert!(bounds.min_y > 44.0 && bounds.max_y < 46.0, "{:?}", bounds);

    let mut settings = Settings::default();
    settings.align_offset = AlignOffset::new(0.0, 111.32);
    let shifted = SentinelKit::new(settings).bounds(&tif).unwrap();
    assert!((shifted.min_y - bounds.min_y - 0.001).abs() < 1e-9);
    assert!((shifted.min_x - bounds.min_x).abs() < 1e-12);
}

#[test]
fn test_describe_geotiff_lists_tags_by_name() {
    let fixture = Fixture::standard();
    let reader = ProductReader::open(&fixture.product).unwrap();
    let out = fixture.out("b04.tif");
    ReprojectionExporter::new(&reader, exporter_options()).export_single("B04", &out).unwrap();

    let report = SentinelKit::new(Settings::default()).describe_geotiff(&out).unwrap();
    for name in ["256 (ImageWidth)", "257 (ImageLength)", "(Compression)", "(GeoKeyDirectory)", "(ModelPixelScale)", "(GDALNoData)"] {
        assert!(report.contains(name), "missing {} in {}", name, report);
    }
    assert!(report.contains("Profile: "), "{}", report);
}

#[test]
fn test_facade_describe_and_mask() {
    let fixture = Fixture::standard();
    let kit = SentinelKit::new(Settings::default());

    let report = kit.describe(&fixture.product).unwrap();
    assert!(report.contains("T33TWM"));
    assert!(report.contains("B8A"));
    assert!(report.contains("cloud shadows") || report.contains("Cloud"), "{}", report);

    let out = fixture.out("mask.tif");
    let mask = kit.mask(&fixture.product, None, Some(&out)).unwrap();
    let (data, profile) = read_geotiff_file(&out).unwrap();
    assert_eq!(profile.dtype, DataType::UInt8);
    assert_eq!(data.iter().filter(|v| **v == 1.0).count(), mask.valid_count());

    let tif_report = kit.describe_geotiff(&out).unwrap();
    assert!(tif_report.contains("Deflate") || tif_report.contains("deflate"), "{}", tif_report);
}
