use crate::error::{IngestError, Result};
use std::fmt;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::str::FromStr;

/// CDB level of detail. Negative values are the coarse sub-tile levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lod(i32);

impl Lod {
    pub const MIN: i32 = -10;
    pub const MAX: i32 = 19;

    pub fn new(value: i32) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(IngestError::LodOutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            })
        }
    }

    #[inline]
    pub fn get(self) -> i32 {
        self.0
    }
}

impl Default for Lod {
    fn default() -> Self {
        Self(16)
    }
}

impl fmt::Display for Lod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Lod {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        let value: i32 = s.trim().parse().map_err(|e: ParseIntError| IngestError::InvalidLod {
            input: s.to_owned(),
            reason: e.to_string(),
        })?;
        Lod::new(value)
    }
}

/// Attribute translation ruleset. Accepted and recorded; the ingestion tool
/// is not told about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeRuleset {
    #[default]
    Ggdm,
    OpenStreetMaps,
    SeCore,
}

impl AttributeRuleset {
    pub const ALL: [AttributeRuleset; 3] = [
        AttributeRuleset::Ggdm,
        AttributeRuleset::OpenStreetMaps,
        AttributeRuleset::SeCore,
    ];
}

impl fmt::Display for AttributeRuleset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttributeRuleset::Ggdm => "GGDM",
            AttributeRuleset::OpenStreetMaps => "OpenStreetMaps",
            AttributeRuleset::SeCore => "SE Core",
        })
    }
}

impl FromStr for AttributeRuleset {
    type Err = IngestError;

    /// Case-insensitive; spaces, dashes and underscores are ignored.
    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "ggdm" => Ok(AttributeRuleset::Ggdm),
            "openstreetmaps" | "osm" => Ok(AttributeRuleset::OpenStreetMaps),
            "secore" => Ok(AttributeRuleset::SeCore),
            _ => Err(IngestError::UnknownRuleset(s.to_owned())),
        }
    }
}

/// Parameters for one import run.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    /// CDB datastore root handed to both tools.
    pub output_dir: PathBuf,
    /// Directory holding `cdb-inject`, `gdaladdo` and their GDAL data.
    pub tool_dir: PathBuf,
    pub imagery_lod: Lod,
    pub elevation_lod: Lod,
    pub ruleset: AttributeRuleset,
    /// Report command lines instead of running them.
    pub dry_run: bool,
}

impl RunConfiguration {
    pub fn new(output_dir: impl Into<PathBuf>, tool_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            tool_dir: tool_dir.into(),
            imagery_lod: Lod::default(),
            elevation_lod: Lod::default(),
            ruleset: AttributeRuleset::default(),
            dry_run: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lod_range_is_enforced() {
        assert_eq!(Lod::new(-10).unwrap().get(), -10);
        assert_eq!(Lod::new(19).unwrap().get(), 19);
        assert!(Lod::new(-11).is_err());
        assert!(Lod::new(20).is_err());
        assert_eq!(Lod::default().get(), 16);
        assert_eq!("  -3".parse::<Lod>().unwrap().get(), -3);
        assert!(matches!(
            "x".parse::<Lod>(),
            Err(IngestError::InvalidLod { input, .. }) if input == "x"
        ));
        assert!(matches!(
            "20".parse::<Lod>(),
            Err(IngestError::LodOutOfRange { value: 20, .. })
        ));
    }

    #[test]
    fn ruleset_names_round_trip() {
        for ruleset in AttributeRuleset::ALL {
            assert_eq!(ruleset.to_string().parse::<AttributeRuleset>().unwrap(), ruleset);
        }
        assert_eq!("se-core".parse::<AttributeRuleset>().unwrap(), AttributeRuleset::SeCore);
        assert_eq!("osm".parse::<AttributeRuleset>().unwrap(), AttributeRuleset::OpenStreetMaps);
        assert!("nfdd".parse::<AttributeRuleset>().is_err());
    }
}
