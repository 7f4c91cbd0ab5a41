//! GeoTIFF tag strategies
//!
//! These are the tags that turn a plain TIFF into a GeoTIFF: the affine
//! placement of the raster and the GeoKey directory naming its CRS.

use log::{debug, info, warn};

use super::{doubles_le, put_tag, shorts_le, ExternalData};
use crate::raster::GeoTransform;
use crate::tiff::constants::{field_types, geo_keys, tags};
use crate::tiff::ifd::IFD;

/// Handles GeoTIFF tags
pub struct GeoTagsBuilder;

impl GeoTagsBuilder {
    /// Adds placement tags for `transform`
    ///
    /// North-up transforms are written as ModelPixelScale + ModelTiepoint,
    /// which most readers prefer; rotated ones as ModelTransformation.
    pub fn add_transform(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        is_big_tiff: bool,
        transform: &GeoTransform,
    ) {
        if transform.is_north_up() {
            let scale = [transform.pixel_width, -transform.pixel_height, 0.0];
            let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
            debug!("ModelPixelScale {:?}, ModelTiepoint {:?}", scale, tiepoint);

            put_tag(ifd, external_data, ifd_index, is_big_tiff,
                    tags::MODEL_PIXEL_SCALE_TAG, field_types::DOUBLE, 3, doubles_le(&scale));
            put_tag(ifd, external_data, ifd_index, is_big_tiff,
                    tags::MODEL_TIEPOINT_TAG, field_types::DOUBLE, 6, doubles_le(&tiepoint));
        } else {
            let [c, a, b, f, d, e] = transform.to_gdal();
            let matrix = [
                a, b, 0.0, c,
                d, e, 0.0, f,
                0.0, 0.0, 0.0, 0.0,
                0.0, 0.0, 0.0, 1.0,
            ];
            put_tag(ifd, external_data, ifd_index, is_big_tiff,
                    tags::MODEL_TRANSFORMATION_TAG, field_types::DOUBLE, 16, doubles_le(&matrix));
        }
    }

    /// Adds the GeoKey directory for an EPSG-coded CRS
    ///
    /// Codes that do not fit a GeoKey short are written as user-defined.
    pub fn add_geo_keys(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        is_big_tiff: bool,
        epsg: Option<u32>,
        geographic: bool,
    ) {
        let mut keys: Vec<[u16; 4]> = Vec::new();

        if epsg.is_some() {
            let model = if geographic { geo_keys::MODEL_TYPE_GEOGRAPHIC } else { geo_keys::MODEL_TYPE_PROJECTED };
            keys.push([geo_keys::GT_MODEL_TYPE, 0, 1, model]);
        }
        keys.push([geo_keys::GT_RASTER_TYPE, 0, 1, geo_keys::RASTER_PIXEL_IS_AREA]);

        if let Some(code) = epsg {
            let value = u16::try_from(code).unwrap_or_else(|_| {
                warn!("EPSG code {} does not fit a GeoKey, writing user-defined", code);
                geo_keys::USER_DEFINED
            });
            let key = if geographic { geo_keys::GEOGRAPHIC_TYPE } else { geo_keys::PROJECTED_CS_TYPE };
            keys.push([key, 0, 1, value]);
        }

        info!("Adding GeoKey directory with {} keys (EPSG {:?})", keys.len(), epsg);

        let [version, revision, minor] = geo_keys::DIRECTORY_VERSION;
        let mut directory = vec![version, revision, minor, keys.len() as u16];
        for key in &keys {
            directory.extend_from_slice(key);
        }

        put_tag(ifd, external_data, ifd_index, is_big_tiff,
                tags::GEO_KEY_DIRECTORY_TAG, field_types::SHORT,
                directory.len() as u64, shorts_le(&directory));
    }
}
