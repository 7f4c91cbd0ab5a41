//! Indexed, non-extracting access to a zipped scene
//!
//! The zip file is opened per call and closed when the call returns, on
//! error paths too; only the entry-name index outlives a call.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use log::{debug, info};
use zip::ZipArchive;

use crate::archive::index::ArchiveIndex;
use crate::errors::{SceneError, SceneResult};

/// Raster encodings an archive entry can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFormat {
    GeoTiff,
    Jpeg2000,
    Other,
}

impl EntryFormat {
    /// Format from the entry name's extension, case-insensitive
    pub fn of_entry(name: &str) -> Self {
        let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
        match ext.as_str() {
            "tif" | "tiff" => EntryFormat::GeoTiff,
            "jp2" | "j2k" => EntryFormat::Jpeg2000,
            _ => EntryFormat::Other,
        }
    }
}

/// One scene archive with its entry index
#[derive(Debug, Clone)]
pub struct SceneArchive {
    path: PathBuf,
    index: ArchiveIndex,
}

impl SceneArchive {
    /// Opens `path` and indexes its entries
    ///
    /// Fails with `NotFound` when the path does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> SceneResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(SceneError::NotFound(path.display().to_string()));
        }

        let mut archive = Self::zip(&path)?;
        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            names.push(entry.name().to_string());
        }
        info!("Opened {} ({} entries)", path.display(), names.len());

        Ok(SceneArchive { index: ArchiveIndex::from_entry_names(names), path })
    }

    fn zip(path: &Path) -> SceneResult<ZipArchive<BufReader<File>>> {
        let file = File::open(path)?;
        Ok(ZipArchive::new(BufReader::new(file))?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    /// Byte reader over one entry
    ///
    /// Only the requested entry is inflated; the buffer is seekable so the
    /// raster decoder can jump between strips and tiles.
    pub fn open_entry(&self, name: &str) -> SceneResult<Cursor<Vec<u8>>> {
        let mut archive = Self::zip(&self.path)?;
        let mut entry = archive.by_name(name).map_err(|e| match e {
            zip::result::ZipError::FileNotFound => {
                SceneError::NotFound(format!("{} in {}", name, self.path.display()))
            }
            other => SceneError::Archive(other),
        })?;

        let mut buffer = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buffer)?;
        debug!("Read entry {} ({} bytes)", name, buffer.len());
        Ok(Cursor::new(buffer))
    }
}
