//! Seekable reader and writer traits
//!
//! Archive entries, files on disk and in-memory buffers all reach the
//! TIFF layer through these two traits, so the decoder never knows
//! where its bytes come from.

use std::io::{Read, Seek, Write};

/// Trait for readers that can both read and seek
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}

/// Trait for writers that can both write and seek
///
/// The TIFF writer lays out IFDs first and back-patches the header, so
/// plain `Write` is not enough.
pub trait SeekableWriter: Write + Seek {}

impl<T: Write + Seek> SeekableWriter for T {}
