//! GeoTIFF georeferencing: GeoKey directory, affine transform, nodata
//!
//! Supports the subset of GeoTIFF a Sentinel-2 product uses: a projected
//! or geographic EPSG code, pixel scale plus tiepoint or a full model
//! transformation, and the GDAL nodata tag.

use log::{debug, warn};

use crate::io::seekable::SeekableReader;
use crate::raster::GeoTransform;
use crate::tiff::constants::{geo_keys, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

/// One entry of the GeoKey directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    pub key_id: u16,
    /// 0 when the value is stored inline in `value_offset`
    pub tiff_tag_location: u16,
    pub count: u16,
    pub value_offset: u16,
}

impl GeoKeyEntry {
    pub fn new(key_id: u16, tiff_tag_location: u16, count: u16, value_offset: u16) -> Self {
        GeoKeyEntry { key_id, tiff_tag_location, count, value_offset }
    }

    /// Inline short value, if the key carries one
    pub fn inline_value(&self) -> Option<u16> {
        (self.tiff_tag_location == 0).then_some(self.value_offset)
    }
}

/// Human-readable name of the GeoKeys this crate reads and writes
pub fn get_key_name(key_id: u16) -> &'static str {
    match key_id {
        geo_keys::GT_MODEL_TYPE => "GTModelTypeGeoKey",
        geo_keys::GT_RASTER_TYPE => "GTRasterTypeGeoKey",
        geo_keys::GEOGRAPHIC_TYPE => "GeographicTypeGeoKey",
        geo_keys::PROJECTED_CS_TYPE => "ProjectedCSTypeGeoKey",
        _ => "Unknown",
    }
}

/// Splits a GeoKey directory (as read from tag 34735) into its entries
pub fn parse_geo_key_directory(directory: &[u64]) -> TiffResult<Vec<GeoKeyEntry>> {
    if directory.len() < 4 {
        return Err(TiffError::InvalidTagData(
            tags::GEO_KEY_DIRECTORY_TAG,
            "GeoKey directory header is truncated".to_string(),
        ));
    }

    let num_keys = directory[3] as usize;
    debug!(
        "GeoKey directory: version={}, revision={}.{}, keys={}",
        directory[0], directory[1], directory[2], num_keys
    );

    let entries: Vec<GeoKeyEntry> = directory[4..]
        .chunks_exact(4)
        .take(num_keys)
        .map(|k| GeoKeyEntry::new(k[0] as u16, k[1] as u16, k[2] as u16, k[3] as u16))
        .collect();
    if entries.len() < num_keys {
        warn!("GeoKey directory announces {} keys but holds {}", num_keys, entries.len());
    }
    Ok(entries)
}

/// Georeferencing found in one IFD
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoReference {
    pub transform: Option<GeoTransform>,
    pub epsg: Option<u32>,
    pub nodata: Option<f64>,
}

impl GeoReference {
    /// Reads transform, EPSG code and nodata from `ifd`
    ///
    /// Missing tags leave the corresponding field `None`; malformed tags
    /// are errors.
    pub fn read(reader: &TiffReader, source: &mut dyn SeekableReader, ifd: &IFD) -> TiffResult<Self> {
        let keys = if ifd.has_tag(tags::GEO_KEY_DIRECTORY_TAG) {
            parse_geo_key_directory(&reader.read_tag_values(source, ifd, tags::GEO_KEY_DIRECTORY_TAG)?)?
        } else {
            Vec::new()
        };

        let key = |id: u16| keys.iter().find(|k| k.key_id == id).and_then(|k| k.inline_value());
        let epsg = [geo_keys::PROJECTED_CS_TYPE, geo_keys::GEOGRAPHIC_TYPE]
            .iter()
            .filter_map(|&id| key(id))
            .find(|&code| code != 0 && code != geo_keys::USER_DEFINED)
            .map(u32::from);
        let pixel_is_point = key(geo_keys::GT_RASTER_TYPE) == Some(geo_keys::RASTER_PIXEL_IS_POINT);

        let mut transform = Self::read_transform(reader, source, ifd)?;
        if pixel_is_point {
            // Tiepoints name pixel centres; shift to the outer corner
            transform = transform.map(|gt| {
                let (x, y) = gt.apply(-0.5, -0.5);
                GeoTransform { origin_x: x, origin_y: y, ..gt }
            });
        }

        let nodata = if ifd.has_tag(tags::GDAL_NODATA) {
            let text = reader.read_tag_ascii(source, ifd, tags::GDAL_NODATA)?;
            match text.trim().parse::<f64>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("Ignoring unparsable GDAL nodata value '{}'", text);
                    None
                }
            }
        } else {
            None
        };

        debug!("GeoReference: epsg={:?}, nodata={:?}, transform={:?}", epsg, nodata, transform);
        Ok(GeoReference { transform, epsg, nodata })
    }

    fn read_transform(reader: &TiffReader, source: &mut dyn SeekableReader, ifd: &IFD) -> TiffResult<Option<GeoTransform>> {
        if ifd.has_tag(tags::MODEL_TRANSFORMATION_TAG) {
            let m = reader.read_tag_doubles(source, ifd, tags::MODEL_TRANSFORMATION_TAG)?;
            if m.len() < 16 {
                return Err(TiffError::InvalidTagData(
                    tags::MODEL_TRANSFORMATION_TAG,
                    format!("expected 16 values, found {}", m.len()),
                ));
            }
            return Ok(Some(GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]])));
        }

        if !(ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG) && ifd.has_tag(tags::MODEL_TIEPOINT_TAG)) {
            return Ok(None);
        }

        let scale = reader.read_tag_doubles(source, ifd, tags::MODEL_PIXEL_SCALE_TAG)?;
        let tiepoint = reader.read_tag_doubles(source, ifd, tags::MODEL_TIEPOINT_TAG)?;
        if scale.len() < 2 || tiepoint.len() < 6 {
            return Err(TiffError::InvalidTagData(
                tags::MODEL_TIEPOINT_TAG,
                "pixel scale or tiepoint too short".to_string(),
            ));
        }

        let (sx, sy) = (scale[0], scale[1]);
        let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
        Ok(Some(GeoTransform::new(x - i * sx, sx, y + j * sy, -sy)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directory() {
        let dir = [1, 1, 0, 3, 1024, 0, 1, 1, 1025, 0, 1, 1, 3072, 0, 1, 32633];
        let keys = parse_geo_key_directory(&dir).unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[2], GeoKeyEntry::new(3072, 0, 1, 32633));
        assert_eq!(get_key_name(keys[2].key_id), "ProjectedCSTypeGeoKey");
    }

    #[test]
    fn test_truncated_directory() {
        assert!(parse_geo_key_directory(&[1, 1, 0]).is_err());
        assert_eq!(parse_geo_key_directory(&[1, 1, 0, 2, 1024, 0, 1, 2]).unwrap().len(), 1);
    }

    #[test]
    fn test_referenced_value_is_not_inline() {
        assert_eq!(GeoKeyEntry::new(2048, 34736, 1, 0).inline_value(), None);
        assert_eq!(GeoKeyEntry::new(2048, 0, 1, 4326).inline_value(), Some(4326));
    }
}
