//! Sentinel-2 L2A scene classification codes

use std::collections::BTreeMap;

use lazy_static::lazy_static;

/// Codes usually treated as invalid: no data, defective, cloud shadow,
/// medium and high cloud probability, thin cirrus
pub const DEFAULT_INVALID_CODES: [u8; 6] = [0, 1, 3, 8, 9, 10];

lazy_static! {
    /// Meaning of every classification code
    pub static ref SCL_CODE_MEANINGS: BTreeMap<u8, &'static str> = {
        let mut m = BTreeMap::new();
        m.insert(0, "No data");
        m.insert(1, "Saturated/Defective");
        m.insert(2, "Dark features / Shadows");
        m.insert(3, "Cloud shadows");
        m.insert(4, "Vegetation");
        m.insert(5, "Bare soils");
        m.insert(6, "Water");
        m.insert(7, "Unclassified");
        m.insert(8, "Cloud medium probability");
        m.insert(9, "Cloud high probability");
        m.insert(10, "Thin cirrus");
        m.insert(11, "Snow or ice");
        m
    };
}

pub fn scl_meaning(code: u8) -> Option<&'static str> {
    SCL_CODE_MEANINGS.get(&code).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meanings() {
        assert_eq!(SCL_CODE_MEANINGS.len(), 12);
        assert_eq!(scl_meaning(9), Some("Cloud high probability"));
        assert_eq!(scl_meaning(12), None);
        assert!(DEFAULT_INVALID_CODES.iter().all(|c| scl_meaning(*c).is_some()));
    }
}
