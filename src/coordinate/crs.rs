//! Coordinate Reference System handling
//!
//! Systems are identified by EPSG code. Projection parameters come from
//! the bundled `crs-definitions` database.

use std::fmt;
use std::str::FromStr;

use crate::errors::{SceneError, SceneResult};

/// Identifier for the coordinate systems a scene moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinateSystem {
    /// WGS 84 geographic (EPSG:4326)
    WGS84,
    /// Web Mercator (EPSG:3857)
    WebMercator,
    /// UTM zone on WGS 84 (EPSG:326xx north, 327xx south)
    UTM(u8, bool),
    /// Any other EPSG code
    Other(u32),
}

impl CoordinateSystem {
    /// Get the EPSG code for this coordinate system
    pub fn epsg_code(&self) -> u32 {
        match self {
            CoordinateSystem::WGS84 => 4326,
            CoordinateSystem::WebMercator => 3857,
            CoordinateSystem::UTM(zone, true) => 32600 + *zone as u32,
            CoordinateSystem::UTM(zone, false) => 32700 + *zone as u32,
            CoordinateSystem::Other(code) => *code,
        }
    }

    /// PROJ.4 definition for this system, if the database knows it
    pub fn proj_string(&self) -> Option<&'static str> {
        u16::try_from(self.epsg_code())
            .ok()
            .and_then(crs_definitions::from_code)
            .map(|def| def.proj4)
    }

    /// Whether coordinates are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        match self {
            CoordinateSystem::WGS84 => true,
            CoordinateSystem::WebMercator | CoordinateSystem::UTM(..) => false,
            CoordinateSystem::Other(code) => match self.proj_string() {
                Some(def) => def.contains("+proj=longlat"),
                None => (4000..5000).contains(code),
            },
        }
    }

    pub fn description(&self) -> String {
        match self {
            CoordinateSystem::WGS84 => "WGS 84 (EPSG:4326)".to_string(),
            CoordinateSystem::WebMercator => "Web Mercator (EPSG:3857)".to_string(),
            CoordinateSystem::UTM(zone, true) => format!("UTM Zone {}N (EPSG:{})", zone, self.epsg_code()),
            CoordinateSystem::UTM(zone, false) => format!("UTM Zone {}S (EPSG:{})", zone, self.epsg_code()),
            CoordinateSystem::Other(code) => format!("EPSG:{}", code),
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg_code())
    }
}

impl FromStr for CoordinateSystem {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CoordinateSystemFactory::from_string(s)
    }
}

/// Factory for creating coordinate systems
pub struct CoordinateSystemFactory;

impl CoordinateSystemFactory {
    /// Create a coordinate system from an EPSG code
    pub fn from_epsg(epsg: u32) -> CoordinateSystem {
        match epsg {
            4326 => CoordinateSystem::WGS84,
            3857 => CoordinateSystem::WebMercator,
            32601..=32660 => CoordinateSystem::UTM((epsg - 32600) as u8, true),
            32701..=32760 => CoordinateSystem::UTM((epsg - 32700) as u8, false),
            _ => CoordinateSystem::Other(epsg),
        }
    }

    /// Parse "EPSG:4326" or a bare code
    pub fn from_string(crs_str: &str) -> SceneResult<CoordinateSystem> {
        let upper = crs_str.trim().to_uppercase();
        let code = upper.strip_prefix("EPSG:").unwrap_or(&upper);
        code.parse::<u32>()
            .map(Self::from_epsg)
            .map_err(|_| SceneError::InvalidRequest(format!("Unsupported CRS format: {}", crs_str)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utm_codes_roundtrip() {
        let crs = CoordinateSystemFactory::from_epsg(32633);
        assert_eq!(crs, CoordinateSystem::UTM(33, true));
        assert_eq!(crs.epsg_code(), 32633);
        assert_eq!(CoordinateSystemFactory::from_epsg(32755), CoordinateSystem::UTM(55, false));
    }

    #[test]
    fn test_parse_strings() {
        assert_eq!("epsg:3857".parse::<CoordinateSystem>().unwrap(), CoordinateSystem::WebMercator);
        assert_eq!("4326".parse::<CoordinateSystem>().unwrap(), CoordinateSystem::WGS84);
        assert!("utm33".parse::<CoordinateSystem>().is_err());
    }

    #[test]
    fn test_geographic_flag() {
        assert!(CoordinateSystem::WGS84.is_geographic());
        assert!(!CoordinateSystem::UTM(33, true).is_geographic());
        assert!(CoordinateSystem::UTM(33, true).proj_string().is_some());
    }
}
