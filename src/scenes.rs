//! Discovery of Sentinel-2 products in a folder

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

use crate::errors::{SceneError, SceneResult};

lazy_static! {
    static ref TILE_IN_NAME: Regex = Regex::new(r"_T([0-9A-Z]{5})").expect("valid tile pattern");
    static ref DATE_IN_NAME: Regex = Regex::new(r"_(20\d{6})T").expect("valid date pattern");
}

/// How a product is stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    Zip,
    Safe,
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneKind::Zip => f.pad("zip"),
            SceneKind::Safe => f.pad("SAFE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneItem {
    pub name: String,
    pub kind: SceneKind,
    pub path: PathBuf,
    /// Tile code such as `T33TWM`
    pub tile: Option<String>,
    /// Sensing date as `YYYY-MM-DD`
    pub date: Option<String>,
    /// Archive size; 0 for SAFE directories
    pub size_mb: f64,
}

/// Tile code and sensing date parsed from a product name
pub fn tile_and_date(name: &str) -> (Option<String>, Option<String>) {
    let tile = TILE_IN_NAME.captures(name).map(|c| format!("T{}", &c[1]));
    let date = DATE_IN_NAME
        .captures(name)
        .map(|c| format!("{}-{}-{}", &c[1][0..4], &c[1][4..6], &c[1][6..8]));
    (tile, date)
}

/// Lists `*.zip` archives and `*.SAFE` directories in `dir`, sorted by name
///
/// Hidden entries are ignored.
pub fn list_scenes(dir: &Path) -> SceneResult<Vec<SceneItem>> {
    if !dir.is_dir() {
        return Err(SceneError::NotFound(dir.display().to_string()));
    }

    let mut items = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }

        let is_zip = path.is_file()
            && path.extension().map_or(false, |e| e.eq_ignore_ascii_case("zip"));
        let kind = if is_zip {
            SceneKind::Zip
        } else if path.is_dir() && name.ends_with(".SAFE") {
            SceneKind::Safe
        } else {
            continue;
        };

        let size_mb = match (kind, entry.metadata()) {
            (SceneKind::Zip, Ok(meta)) => (meta.len() as f64 / (1024.0 * 1024.0) * 10.0).round() / 10.0,
            (SceneKind::Zip, Err(e)) => {
                warn!("Cannot stat {}: {}", path.display(), e);
                0.0
            }
            (SceneKind::Safe, _) => 0.0,
        };
        let (tile, date) = tile_and_date(&name);
        debug!("Found {} scene {} (tile {:?}, date {:?})", kind, name, tile, date);
        items.push(SceneItem { name, kind, path, tile, date, size_mb });
    }

    items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_and_date() {
        let (tile, date) = tile_and_date("S2A_MSIL2A_20240221T083121_N0510_R021_T33TWM_20240221T111234.zip");
        assert_eq!(tile.as_deref(), Some("T33TWM"));
        assert_eq!(date.as_deref(), Some("2024-02-21"));
        assert_eq!(tile_and_date("scene.zip"), (None, None));
    }

    #[test]
    fn test_list_scenes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("S2B_MSIL2A_20230101T100000_N0509_R122_T32UQD_20230101T120000.zip"), b"zip").unwrap();
        fs::write(dir.path().join("S2A_MSIL2A_20240221T083121_N0510_R021_T33TWM_20240221T111234.ZIP"), b"zip").unwrap();
        fs::create_dir(dir.path().join("S2A_MSIL1C_20220505T101010_N0400_R022_T31UFU_20220505T120000.SAFE")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::write(dir.path().join(".hidden.zip"), b"x").unwrap();

        let scenes = list_scenes(dir.path()).unwrap();
        let names: Vec<&str> = scenes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(scenes[0].kind, SceneKind::Safe);
        assert_eq!(scenes[0].tile.as_deref(), Some("T31UFU"));
        assert!(scenes.iter().filter(|s| s.kind == SceneKind::Zip).count() == 2);
    }

    #[test]
    fn test_missing_folder() {
        assert!(matches!(list_scenes(Path::new("/nonexistent/scenes")), Err(SceneError::NotFound(_))));
    }
}
