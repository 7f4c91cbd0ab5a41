//! Utility modules shared across the crate

pub mod logger;
pub mod progress;
pub(crate) mod tag_utils;
