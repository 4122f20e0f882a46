use crate::error::{IngestError, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Geographic bounding rectangle. `x` is longitude, `y` is latitude (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "RawExtent")]
pub struct Extent {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

#[derive(Deserialize)]
struct RawExtent {
    x_min: f64,
    y_min: f64,
    x_max: f64,
    y_max: f64,
}

impl TryFrom<RawExtent> for Extent {
    type Error = IngestError;

    fn try_from(raw: RawExtent) -> Result<Self> {
        Extent::new(raw.x_min, raw.y_min, raw.x_max, raw.y_max)
    }
}

impl Extent {
    /// Builds an extent, rejecting non-finite or inverted bounds.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<Self> {
        let extent = Self {
            x_min,
            y_min,
            x_max,
            y_max,
        };
        extent.validate()?;
        Ok(extent)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| IngestError::InvalidExtent {
            input: self.to_string(),
            reason: reason.to_owned(),
        };

        if ![self.x_min, self.y_min, self.x_max, self.y_max]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(invalid("bounds must be finite numbers"));
        }
        if self.x_min > self.x_max {
            return Err(invalid("x_min is greater than x_max"));
        }
        if self.y_min > self.y_max {
            return Err(invalid("y_min is greater than y_max"));
        }
        Ok(())
    }

    /// Inclusive intersection test; rectangles sharing only an edge intersect.
    #[inline]
    pub fn intersects(&self, other: &Extent) -> bool {
        self.x_min.max(other.x_min) <= self.x_max.min(other.x_max)
            && self.y_min.max(other.y_min) <= self.y_max.min(other.y_max)
    }

    /// Bounds in the order `cdb-inject -bounds` expects: south, west, north, east.
    pub fn bounds_args(&self) -> [String; 4] {
        [
            self.y_min.to_string(),
            self.x_min.to_string(),
            self.y_max.to_string(),
            self.x_max.to_string(),
        ]
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.x_min, self.x_max, self.y_min, self.y_max
        )
    }
}

/// Parses `xmin,xmax,ymin,ymax`, optionally followed by a bracketed CRS
/// such as `[EPSG:4326]`, which is ignored.
impl FromStr for Extent {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| IngestError::InvalidExtent {
            input: s.to_owned(),
            reason: reason.to_owned(),
        };

        let numbers = match s.find('[') {
            Some(idx) => &s[..idx],
            None => s,
        };

        let values = numbers
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| invalid(&e.to_string()))?;

        let [x_min, x_max, y_min, y_max] = values[..] else {
            return Err(invalid("expected four comma-separated values"));
        };

        Extent::new(x_min, y_min, x_max, y_max).map_err(|e| match e {
            IngestError::InvalidExtent { reason, .. } => invalid(&reason),
            other => other,
        })
    }
}
