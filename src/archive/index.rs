//! Index of the band and classification rasters inside a scene archive
//!
//! Entry names are matched once, when the archive is opened. Band files
//! look like `T33TWM_20240221T083121_B04_10m.jp2`, the classification
//! raster like `T33TWM_20240221T083121_SCL_20m.jp2`. The extension is
//! matched case-insensitively.

use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use log::{debug, trace};
use regex::Regex;

use crate::errors::{SceneError, SceneResult};

/// Pixel sizes a Sentinel-2 band can be stored at, in metres
pub const NATIVE_RESOLUTIONS: [u32; 3] = [10, 20, 60];

/// Tile identifier used when no entry name carries one
pub const DEFAULT_TILE_ID: &str = "TILE";

lazy_static! {
    static ref BAND_PATTERN: Regex =
        Regex::new(r"_B(\d{2}|8A)_(10|20|60)m\.(?i:jp2|j2k|tiff?)$").expect("valid band pattern");
    static ref SCL_PATTERN: Regex =
        Regex::new(r"_SCL_(10|20|60)m\.(?i:jp2|j2k|tiff?)$").expect("valid classification pattern");
    static ref RESOLUTION_PATTERN: Regex =
        Regex::new(r"_(10|20|60)m\.(?i:jp2|j2k|tiff?)$").expect("valid resolution pattern");
    static ref TILE_PATTERN: Regex = Regex::new(r"[A-Z]\d{2}[A-Z]{3}").expect("valid tile pattern");
}

/// One band raster inside the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandReference {
    /// Band identifier such as `B04` or `B8A`
    pub band: String,
    /// Native pixel size in metres
    pub resolution: u32,
    /// Entry name inside the archive
    pub path: String,
}

impl fmt::Display for BandReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}m ({})", self.band, self.resolution, self.path)
    }
}

/// Mapping from (band, resolution) to archive entry
///
/// Built once and never mutated; ordered so that iteration and error
/// messages are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveIndex {
    bands: BTreeMap<(String, u32), BandReference>,
    classification: Option<String>,
}

impl ArchiveIndex {
    /// Builds the index from the entry names of an archive
    ///
    /// When several classification rasters are present the last one wins.
    pub fn from_entry_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = ArchiveIndex::default();

        for name in names {
            let name = name.as_ref();
            if let Some(caps) = BAND_PATTERN.captures(name) {
                let band = format!("B{}", &caps[1]);
                let resolution: u32 = match caps[2].parse() {
                    Ok(r) => r,
                    Err(_) => continue,
                };
                trace!("Indexed {} at {}m: {}", band, resolution, name);
                index.bands.insert(
                    (band.clone(), resolution),
                    BandReference { band, resolution, path: name.to_string() },
                );
            } else if SCL_PATTERN.is_match(name) {
                trace!("Indexed classification raster: {}", name);
                index.classification = Some(name.to_string());
            }
        }

        debug!(
            "Archive index: {} band rasters, classification raster {}",
            index.bands.len(),
            if index.classification.is_some() { "present" } else { "absent" }
        );
        index
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Exact (band, resolution) lookup
    pub fn get(&self, band: &str, resolution: u32) -> Option<&BandReference> {
        self.bands.get(&(band.to_string(), resolution))
    }

    /// Every indexed band raster, ordered by band then resolution
    pub fn references(&self) -> impl Iterator<Item = &BandReference> {
        self.bands.values()
    }

    /// Distinct band identifiers, sorted
    pub fn bands(&self) -> Vec<String> {
        let mut bands: Vec<String> = self.bands.keys().map(|(b, _)| b.clone()).collect();
        bands.dedup();
        bands
    }

    /// Native resolutions available for `band`, ascending
    pub fn resolutions_of(&self, band: &str) -> Vec<u32> {
        self.bands
            .values()
            .filter(|r| r.band == band)
            .map(|r| r.resolution)
            .collect()
    }

    pub fn classification_path(&self) -> Option<&str> {
        self.classification.as_deref()
    }

    /// Picks the entry for `band`
    ///
    /// With an explicit resolution the pair must exist; otherwise the
    /// finest resolution stored for the band is used.
    pub fn select(&self, band: &str, resolution: Option<u32>) -> SceneResult<&BandReference> {
        let available = self.resolutions_of(band);
        if available.is_empty() {
            return Err(SceneError::InvalidRequest(format!("Band {} not found in archive", band)));
        }

        match resolution {
            Some(res) => self.get(band, res).ok_or_else(|| {
                SceneError::InvalidRequest(format!(
                    "Requested {} at {} m not available. Have: {:?}",
                    band, res, available
                ))
            }),
            None => self.get(band, available[0]).ok_or_else(|| {
                SceneError::InvalidRequest(format!("Band {} not found in archive", band))
            }),
        }
    }

    /// Tile code such as `T33TWM` from the first band entry carrying one
    pub fn tile_identifier(&self) -> String {
        self.bands
            .values()
            .find_map(|r| TILE_PATTERN.find(&r.path).map(|m| m.as_str().to_string()))
            .unwrap_or_else(|| DEFAULT_TILE_ID.to_string())
    }
}

/// Native resolution encoded in an entry name (`..._20m.jp2` -> 20)
pub fn native_resolution_of_path(path: &str) -> SceneResult<u32> {
    RESOLUTION_PATTERN
        .captures(path)
        .and_then(|caps| caps[1].parse().ok())
        .ok_or_else(|| SceneError::InvalidRequest(format!("Cannot infer resolution from: {}", path)))
}

/// File name suffix for a resolution, the inverse of `native_resolution_of_path`
pub fn resolution_suffix(resolution: u32) -> String {
    format!("_{}m", resolution)
}

/// True for a resolution Sentinel-2 stores bands at
pub fn is_native_resolution(resolution: u32) -> bool {
    NATIVE_RESOLUTIONS.contains(&resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRANULE: &str = "S2A_MSIL2A_20240221T083121_N0510_R021_T33TWM_20240221T111234.SAFE/GRANULE/L2A_T33TWM_A045123_20240221T083555/IMG_DATA";

    fn names() -> Vec<String> {
        vec![
            format!("{}/R10m/T33TWM_20240221T083121_B02_10m.jp2", GRANULE),
            format!("{}/R10m/T33TWM_20240221T083121_B04_10m.jp2", GRANULE),
            format!("{}/R20m/T33TWM_20240221T083121_B04_20m.jp2", GRANULE),
            format!("{}/R20m/T33TWM_20240221T083121_B8A_20m.JP2", GRANULE),
            format!("{}/R60m/T33TWM_20240221T083121_B01_60m.tif", GRANULE),
            format!("{}/R20m/T33TWM_20240221T083121_SCL_20m.jp2", GRANULE),
            format!("{}/R60m/T33TWM_20240221T083121_SCL_60m.jp2", GRANULE),
            format!("{}/R10m/T33TWM_20240221T083121_TCI_10m.jp2", GRANULE),
            "S2A_MSIL2A.SAFE/MTD_MSIL2A.xml".to_string(),
        ]
    }

    #[test]
    fn test_index_bands_and_classification() {
        let index = ArchiveIndex::from_entry_names(names());
        assert_eq!(index.len(), 5);
        assert_eq!(index.bands(), vec!["B01", "B02", "B04", "B8A"]);
        assert_eq!(index.resolutions_of("B04"), vec![10, 20]);
        assert!(index.get("B8A", 20).is_some());
        // last classification entry wins
        assert!(index.classification_path().unwrap().ends_with("SCL_60m.jp2"));
    }

    #[test]
    fn test_select_finest_and_explicit() {
        let index = ArchiveIndex::from_entry_names(names());
        assert_eq!(index.select("B04", None).unwrap().resolution, 10);
        assert_eq!(index.select("B04", Some(20)).unwrap().resolution, 20);

        let err = index.select("B04", Some(60)).unwrap_err();
        assert!(matches!(err, SceneError::InvalidRequest(_)));
        assert!(err.to_string().contains("[10, 20]"));

        assert!(matches!(index.select("B12", None), Err(SceneError::InvalidRequest(_))));
    }

    #[test]
    fn test_index_is_deterministic() {
        let mut shuffled = names();
        shuffled.reverse();
        shuffled.retain(|n| !n.contains("SCL"));
        let a = ArchiveIndex::from_entry_names(names());
        let b = ArchiveIndex::from_entry_names(shuffled);
        assert!(a.references().eq(b.references()));
    }

    #[test]
    fn test_resolution_round_trip() {
        for name in names().iter().filter(|n| BAND_PATTERN.is_match(n) || SCL_PATTERN.is_match(n)) {
            let res = native_resolution_of_path(name).unwrap();
            let stem_end = name.rfind('.').unwrap();
            assert!(name[..stem_end].ends_with(&resolution_suffix(res)), "{}", name);
        }
        assert!(native_resolution_of_path("MTD_MSIL2A.xml").is_err());
        assert!(native_resolution_of_path("B04_30m.jp2").is_err());
    }

    #[test]
    fn test_tile_identifier() {
        assert_eq!(ArchiveIndex::from_entry_names(names()).tile_identifier(), "T33TWM");
        let bare = ArchiveIndex::from_entry_names(vec!["x_B04_10m.tif"]);
        assert_eq!(bare.tile_identifier(), DEFAULT_TILE_ID);
    }
}
