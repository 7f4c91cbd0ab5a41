//! Metadata tag strategies
//!
//! The GDAL nodata tag and the Software tag.

use log::info;

use super::{ascii, put_tag, ExternalData};
use crate::tiff::constants::{field_types, tags};
use crate::tiff::ifd::IFD;

/// Handles metadata tags in TIFF files
pub struct MetadataBuilder;

impl MetadataBuilder {
    /// Formats a nodata value the way GDAL writes it
    ///
    /// Integral values carry no decimal point; NaN is spelled `nan`.
    pub fn format_nodata(value: f64) -> String {
        if value.is_nan() {
            "nan".to_string()
        } else if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{}", value as i64)
        } else {
            format!("{}", value)
        }
    }

    /// Adds the GDAL nodata tag (ASCII, NUL-terminated)
    pub fn add_nodata_tag(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        is_big_tiff: bool,
        nodata: f64,
    ) {
        let text = Self::format_nodata(nodata);
        info!("Adding GDAL NoData tag: {}", text);
        let payload = ascii(&text);
        put_tag(ifd, external_data, ifd_index, is_big_tiff,
                tags::GDAL_NODATA, field_types::ASCII, payload.len() as u64, payload);
    }

    /// Adds the Software tag
    pub fn add_software_tag(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        is_big_tiff: bool,
        software: &str,
    ) {
        let payload = ascii(software);
        put_tag(ifd, external_data, ifd_index, is_big_tiff,
                tags::SOFTWARE, field_types::ASCII, payload.len() as u64, payload);
    }
}
