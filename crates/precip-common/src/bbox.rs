//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

/// A geographic lon/lat rectangle, in degrees.
///
/// Containment is closed on every side, matching how the window is cut
/// out of the full high-resolution dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lon_min: f64,
    pub lat_min: f64,
    pub lon_max: f64,
    pub lat_max: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(lon_min: f64, lat_min: f64, lon_max: f64, lat_max: f64) -> Self {
        Self {
            lon_min,
            lat_min,
            lon_max,
            lat_max,
        }
    }

    /// Create a bounding box, rejecting empty or non-finite extents.
    pub fn try_new(lon_min: f64, lat_min: f64, lon_max: f64, lat_max: f64) -> CommonResult<Self> {
        let bbox = Self::new(lon_min, lat_min, lon_max, lat_max);
        bbox.validate()?;
        Ok(bbox)
    }

    /// Parse a "lon_min,lat_min,lon_max,lat_max" string.
    pub fn from_csv(s: &str) -> CommonResult<Self> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(CommonError::InvalidWindow(format!(
                "{s}: expected 'lon_min,lat_min,lon_max,lat_max'"
            )));
        }

        let mut values = [0.0f64; 4];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .trim()
                .parse()
                .map_err(|_| CommonError::InvalidWindow(format!("invalid number '{part}'")))?;
        }

        Self::try_new(values[0], values[1], values[2], values[3])
    }

    /// Check that the box is finite and non-empty on both axes.
    pub fn validate(&self) -> CommonResult<()> {
        let finite = [self.lon_min, self.lat_min, self.lon_max, self.lat_max]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(CommonError::InvalidWindow(format!(
                "non-finite bounds {self:?}"
            )));
        }
        if self.lon_min >= self.lon_max || self.lat_min >= self.lat_max {
            return Err(CommonError::InvalidWindow(format!(
                "min must be below max, got lon [{}, {}] lat [{}, {}]",
                self.lon_min, self.lon_max, self.lat_min, self.lat_max
            )));
        }
        Ok(())
    }

    /// Check if a point is contained within this bbox (closed on all sides).
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        lon >= self.lon_min && lon <= self.lon_max && lat >= self.lat_min && lat <= self.lat_max
    }

    /// Grow the box by `pad` degrees on every side.
    pub fn padded(&self, pad: f64) -> BoundingBox {
        BoundingBox {
            lon_min: self.lon_min - pad,
            lat_min: self.lat_min - pad,
            lon_max: self.lon_max + pad,
            lat_max: self.lat_max + pad,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_bbox() {
        let bbox = BoundingBox::from_csv("6.5,43.5,14.25,47.5").unwrap();
        assert_eq!(bbox.lon_min, 6.5);
        assert_eq!(bbox.lat_min, 43.5);
        assert_eq!(bbox.lon_max, 14.25);
        assert_eq!(bbox.lat_max, 47.5);
    }

    #[test]
    fn test_contains_point_is_closed() {
        let bbox = BoundingBox::new(0.0, 0.0, 2.0, 2.0);
        assert!(bbox.contains_point(0.0, 0.0));
        assert!(bbox.contains_point(2.0, 2.0));
        assert!(!bbox.contains_point(2.000001, 1.0));
    }

    #[test]
    fn test_padded() {
        let bbox = BoundingBox::new(1.0, 1.0, 2.0, 2.0).padded(0.5);
        assert_eq!(bbox, BoundingBox::new(0.5, 0.5, 2.5, 2.5));
    }
}
