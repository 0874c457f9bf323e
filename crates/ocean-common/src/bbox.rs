//! Geographic bounding box.

use serde::{Deserialize, Serialize};

/// A WGS-84 bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Check that the corners are ordered and within geographic range.
    pub fn is_valid(&self) -> bool {
        self.min_lat <= self.max_lat
            && self.min_lon <= self.max_lon
            && (-90.0..=90.0).contains(&self.min_lat)
            && (-90.0..=90.0).contains(&self.max_lat)
            && (-180.0..=180.0).contains(&self.min_lon)
            && (-180.0..=180.0).contains(&self.max_lon)
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_lat
            && latitude <= self.max_lat
            && longitude >= self.min_lon
            && longitude <= self.max_lon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_point() {
        let bbox = BoundingBox::new(40.83, 1.10, 41.26, 2.53);
        assert!(bbox.contains_point(41.0, 2.0));
        assert!(bbox.contains_point(40.83, 1.10));
        assert!(!bbox.contains_point(42.0, 2.0));
        assert!(!bbox.contains_point(41.0, 3.0));
    }

    #[test]
    fn test_validity() {
        assert!(BoundingBox::new(40.83, 1.10, 41.26, 2.53).is_valid());
        assert!(!BoundingBox::new(41.26, 1.10, 40.83, 2.53).is_valid());
        assert!(!BoundingBox::new(40.83, 1.10, 95.0, 2.53).is_valid());
    }
}
