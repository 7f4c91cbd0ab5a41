//! PNG quicklooks of exported composites and their grid slices

use std::fs;
use std::path::{Path, PathBuf};

use image::{imageops, RgbImage};
use log::{debug, info};
use ndarray::Axis;

use crate::errors::{SceneError, SceneResult};
use crate::raster::stretch::min_max_stretch;
use crate::tiff::read_geotiff_file;

/// One piece of a sliced quicklook
#[derive(Debug, Clone, PartialEq)]
pub struct SliceTile {
    pub row: u32,
    pub col: u32,
    pub width: u32,
    pub height: u32,
    pub path: PathBuf,
}

/// Result of slicing a quicklook
#[derive(Debug, Clone, PartialEq)]
pub struct SliceGrid {
    pub width: u32,
    pub height: u32,
    pub rows: u32,
    pub cols: u32,
    pub tiles: Vec<SliceTile>,
}

/// Renders the first three bands of `tif` to an RGB PNG at native size
///
/// Each channel is stretched between its own minimum and maximum.
pub fn render_quicklook(tif: &Path, out_png: &Path) -> SceneResult<(u32, u32)> {
    let (data, profile) = read_geotiff_file(tif)?;
    if profile.count < 3 {
        return Err(SceneError::InvalidData(format!(
            "{} has {} band(s), a quicklook needs 3", tif.display(), profile.count)));
    }

    let channels: Vec<_> = (0..3).map(|b| min_max_stretch(&data.index_axis(Axis(0), b).to_owned())).collect();
    let (width, height) = (profile.width as u32, profile.height as u32);
    let image = RgbImage::from_fn(width, height, |x, y| {
        let (r, c) = (y as usize, x as usize);
        image::Rgb([channels[0][[r, c]] as u8, channels[1][[r, c]] as u8, channels[2][[r, c]] as u8])
    });

    if let Some(parent) = out_png.parent() {
        fs::create_dir_all(parent)?;
    }
    image.save(out_png)?;
    info!("Quicklook {}x{} written to {}", width, height, out_png.display());
    Ok((width, height))
}

/// Pixel edges of `parts` slices over `length`; the last slice takes the remainder
pub fn slice_edges(length: u32, parts: u32) -> Vec<(u32, u32)> {
    let step = length / parts;
    (0..parts)
        .map(|i| {
            let start = i * step;
            let end = if i == parts - 1 { length } else { (i + 1) * step };
            (start, end)
        })
        .collect()
}

/// Cuts `png` into `rows` x `cols` RGBA tiles named `tile_<r>_<c>.png`
pub fn slice_png(png: &Path, out_dir: &Path, rows: u32, cols: u32) -> SceneResult<SliceGrid> {
    if rows == 0 || cols == 0 {
        return Err(SceneError::InvalidRequest(format!("Cannot slice into a {}x{} grid", rows, cols)));
    }
    let image = image::open(png)?.to_rgba8();
    let (width, height) = image.dimensions();
    fs::create_dir_all(out_dir)?;

    let mut tiles = Vec::with_capacity((rows * cols) as usize);
    for (r, (y0, y1)) in slice_edges(height, rows).into_iter().enumerate() {
        for (c, (x0, x1)) in slice_edges(width, cols).into_iter().enumerate() {
            let path = out_dir.join(format!("tile_{}_{}.png", r, c));
            imageops::crop_imm(&image, x0, y0, x1 - x0, y1 - y0).to_image().save(&path)?;
            debug!("Slice ({}, {}) {}x{} -> {}", r, c, x1 - x0, y1 - y0, path.display());
            tiles.push(SliceTile { row: r as u32, col: c as u32, width: x1 - x0, height: y1 - y0, path });
        }
    }

    Ok(SliceGrid { width, height, rows, cols, tiles })
}
