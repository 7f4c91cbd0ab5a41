//! Basic TIFF tag strategies
//!
//! Dimensions, sample layout, photometric interpretation, compression and
//! the single-strip layout every written image uses.

use log::{debug, info};

use super::{put_tag, shorts_le, ExternalData};
use crate::raster::DataType;
use crate::tiff::constants::{extra_samples, field_types, photometric, planar_config, predictor, tags};
use crate::tiff::ifd::{IFD, IFDEntry};

/// Layout of an image about to be written
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSpec {
    pub width: u32,
    pub height: u32,
    pub dtype: DataType,
    /// Samples per pixel, interleaved
    pub samples: u16,
    /// Whether the last sample is unassociated alpha
    pub alpha: bool,
    pub compression: u16,
    pub predictor: u16,
}

impl ImageSpec {
    /// RGB for three or more 8-bit samples, MinIsBlack otherwise
    pub fn photometric(&self) -> u16 {
        if self.samples >= 3 && self.dtype == DataType::UInt8 {
            photometric::RGB
        } else {
            photometric::BLACK_IS_ZERO
        }
    }

    /// Bytes in one row of interleaved samples
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.samples as usize * self.dtype.bytes()
    }
}

/// Adds basic TIFF tags to an IFD
pub struct BasicTagsBuilder;

impl BasicTagsBuilder {
    /// Adds BitsPerSample, one value per sample
    ///
    /// A single value fits in the entry; RGB and RGBA need an array.
    pub fn add_bits_per_sample(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        is_big_tiff: bool,
        bits_per_channel: &[u16],
    ) {
        debug!("Adding BitsPerSample: {:?}", bits_per_channel);
        put_tag(ifd, external_data, ifd_index, is_big_tiff,
                tags::BITS_PER_SAMPLE, field_types::SHORT,
                bits_per_channel.len() as u64, shorts_le(bits_per_channel));
    }

    /// Adds every tag describing the pixel layout of `spec`
    pub fn add_image_tags(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        is_big_tiff: bool,
        spec: &ImageSpec,
    ) {
        info!("Adding image tags for {}x{}x{} {} image", spec.width, spec.height, spec.samples, spec.dtype);
        let samples = spec.samples as usize;

        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, spec.width as u64));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, field_types::LONG, 1, spec.height as u64));

        Self::add_bits_per_sample(ifd, external_data, ifd_index, is_big_tiff, &vec![spec.dtype.bits(); samples]);

        ifd.add_entry(IFDEntry::new(tags::COMPRESSION, field_types::SHORT, 1, spec.compression as u64));
        ifd.add_entry(IFDEntry::new(tags::PHOTOMETRIC_INTERPRETATION, field_types::SHORT, 1, spec.photometric() as u64));
        ifd.add_entry(IFDEntry::new(tags::SAMPLES_PER_PIXEL, field_types::SHORT, 1, spec.samples as u64));

        // Samples are always interleaved (RGBRGB...)
        ifd.add_entry(IFDEntry::new(tags::PLANAR_CONFIGURATION, field_types::SHORT, 1, planar_config::CHUNKY as u64));

        if spec.predictor == predictor::HORIZONTAL_DIFFERENCING {
            ifd.add_entry(IFDEntry::new(tags::PREDICTOR, field_types::SHORT, 1, spec.predictor as u64));
        }

        // Every sample after the colour channels is extra; the last is alpha when flagged
        let colour = if spec.photometric() == photometric::RGB { 3 } else { 1 };
        if samples > colour {
            let mut extra = vec![extra_samples::UNSPECIFIED; samples - colour];
            if spec.alpha {
                if let Some(last) = extra.last_mut() {
                    *last = extra_samples::UNASSOCIATED_ALPHA;
                }
            }
            put_tag(ifd, external_data, ifd_index, is_big_tiff,
                    tags::EXTRA_SAMPLES, field_types::SHORT, extra.len() as u64, shorts_le(&extra));
        }

        put_tag(ifd, external_data, ifd_index, is_big_tiff,
                tags::SAMPLE_FORMAT, field_types::SHORT, samples as u64,
                shorts_le(&vec![spec.dtype.sample_format(); samples]));
    }

    /// Sets up a single strip holding the whole (compressed) image
    ///
    /// StripOffsets is a placeholder; the writer fills in the real
    /// position once the layout is known.
    pub fn setup_single_strip(
        ifd: &mut IFD,
        image_data: &mut std::collections::BTreeMap<usize, Vec<u8>>,
        ifd_index: usize,
        strip_data: Vec<u8>,
    ) {
        info!("Setting up single strip: {} bytes", strip_data.len());

        ifd.add_entry(IFDEntry::new(tags::STRIP_OFFSETS, field_types::LONG, 1, 0));
        ifd.add_entry(IFDEntry::new(tags::STRIP_BYTE_COUNTS, field_types::LONG, 1, strip_data.len() as u64));

        if let Some((_, height)) = ifd.get_dimensions() {
            ifd.add_entry(IFDEntry::new(tags::ROWS_PER_STRIP, field_types::LONG, 1, height));
        }

        image_data.insert(ifd_index, strip_data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::constants::compression;

    fn rgba_spec() -> ImageSpec {
        ImageSpec {
            width: 4,
            height: 2,
            dtype: DataType::UInt8,
            samples: 4,
            alpha: true,
            compression: compression::DEFLATE,
            predictor: predictor::NONE,
        }
    }

    #[test]
    fn test_rgba_tags() {
        let mut ifd = IFD::new(0, 0);
        let mut external = ExternalData::new();
        BasicTagsBuilder::add_image_tags(&mut ifd, &mut external, 0, false, &rgba_spec());

        assert_eq!(ifd.get_tag_value(tags::PHOTOMETRIC_INTERPRETATION), Some(photometric::RGB as u64));
        assert_eq!(ifd.get_tag_value(tags::EXTRA_SAMPLES), Some(extra_samples::UNASSOCIATED_ALPHA as u64));
        assert!(!ifd.has_tag(tags::PREDICTOR));
        // Four shorts do not fit in a classic entry
        assert_eq!(external.get(&(0, tags::BITS_PER_SAMPLE)).map(|d| d.len()), Some(8));
        assert_eq!(rgba_spec().row_bytes(), 16);
    }

    #[test]
    fn test_single_band_float_tags() {
        let spec = ImageSpec {
            dtype: DataType::Float32,
            samples: 1,
            alpha: false,
            predictor: predictor::HORIZONTAL_DIFFERENCING,
            ..rgba_spec()
        };
        let mut ifd = IFD::new(0, 0);
        let mut external = ExternalData::new();
        BasicTagsBuilder::add_image_tags(&mut ifd, &mut external, 0, false, &spec);

        assert!(external.is_empty());
        assert_eq!(ifd.get_tag_value(tags::BITS_PER_SAMPLE), Some(32));
        assert_eq!(ifd.get_tag_value(tags::PREDICTOR), Some(2));
        assert!(!ifd.has_tag(tags::EXTRA_SAMPLES));
    }
}
