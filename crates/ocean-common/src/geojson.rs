//! GeoJSON feature collections for query responses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::observation::{ChlorophyllRecord, CurrentsRecord};

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    /// Array of features.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Create a new empty FeatureCollection.
    pub fn new() -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            features: Vec::new(),
        }
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new()
    }
}

/// A GeoJSON Feature with a point geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    /// The geometry of this feature.
    pub geometry: Geometry,

    /// Properties containing measurement values and metadata.
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Create a new feature at a point. Coordinates are [longitude, latitude].
    pub fn point(lon: f64, lat: f64) -> Self {
        Self {
            type_: "Feature".to_string(),
            geometry: Geometry::Point {
                coordinates: [lon, lat],
            },
            properties: Map::new(),
        }
    }
}

/// GeoJSON geometry types used by the query surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
}

/// Build a FeatureCollection from chlorophyll records.
///
/// Records whose value is NaN are omitted: the frontend renders every
/// feature it receives and has no missing-value convention.
pub fn chlorophyll_collection(records: &[ChlorophyllRecord]) -> FeatureCollection {
    let mut fc = FeatureCollection::new();
    for record in records {
        if record.chlor_a.is_nan() {
            continue;
        }
        let mut feature = Feature::point(record.longitude, record.latitude);
        if let Some(id) = record.id {
            feature.properties.insert("id".to_string(), id.into());
        }
        feature.properties.insert(
            "measurement_time".to_string(),
            record.measurement_time.to_rfc3339().into(),
        );
        feature
            .properties
            .insert("chlor_a".to_string(), record.chlor_a.into());
        fc.features.push(feature);
    }
    fc
}

/// Build a FeatureCollection from currents records.
///
/// Each feature carries the raw u/v components plus the derived compass
/// angle and magnitude the map layer consumes. Features with a NaN
/// component are omitted.
pub fn currents_collection(records: &[CurrentsRecord]) -> FeatureCollection {
    let mut fc = FeatureCollection::new();
    for record in records {
        if record.u_current.is_nan() || record.v_current.is_nan() {
            continue;
        }
        let mut feature = Feature::point(record.longitude, record.latitude);
        if let Some(id) = record.id {
            feature.properties.insert("id".to_string(), id.into());
        }
        feature.properties.insert(
            "measurement_time".to_string(),
            record.measurement_time.to_rfc3339().into(),
        );
        feature
            .properties
            .insert("u_current".to_string(), record.u_current.into());
        feature
            .properties
            .insert("v_current".to_string(), record.v_current.into());
        feature.properties.insert(
            "current_angle".to_string(),
            current_angle(record.u_current, record.v_current).into(),
        );
        feature.properties.insert(
            "magnitude".to_string(),
            magnitude(record.u_current, record.v_current).into(),
        );
        fc.features.push(feature);
    }
    fc
}

/// Compass angle of a current vector: 0 degrees is north, increasing clockwise.
fn current_angle(u: f32, v: f32) -> f32 {
    if u == 0.0 && v == 0.0 {
        return 0.0;
    }
    if u == 0.0 {
        return if v > 0.0 { 0.0 } else { 180.0 };
    }
    if v == 0.0 {
        return if u > 0.0 { 90.0 } else { 270.0 };
    }

    let from_east_degrees = (v as f64).atan2(u as f64).to_degrees();
    // Rotate from the math convention (0 = east, counter-clockwise) to
    // compass bearings (0 = north, clockwise).
    let compass = (90.0 - from_east_degrees).rem_euclid(360.0);
    compass as f32
}

fn magnitude(u: f32, v: f32) -> f32 {
    (u * u + v * v).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn currents_record(u: f32, v: f32) -> CurrentsRecord {
        CurrentsRecord {
            id: Some(7),
            measurement_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            latitude: 41.0,
            longitude: 2.0,
            u_current: u,
            v_current: v,
            created_at: None,
        }
    }

    #[test]
    fn test_current_angle_cardinal_directions() {
        assert_eq!(current_angle(0.0, 1.0), 0.0);
        assert_eq!(current_angle(1.0, 0.0), 90.0);
        assert_eq!(current_angle(0.0, -1.0), 180.0);
        assert_eq!(current_angle(-1.0, 0.0), 270.0);
        assert_eq!(current_angle(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_current_angle_diagonals() {
        assert!((current_angle(1.0, 1.0) - 45.0).abs() < 1e-4);
        assert!((current_angle(-1.0, -1.0) - 225.0).abs() < 1e-4);
    }

    #[test]
    fn test_magnitude() {
        assert!((magnitude(3.0, 4.0) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_nan_components_are_omitted() {
        let records = vec![currents_record(1.0, 1.0), currents_record(f32::NAN, 1.0)];
        let fc = currents_collection(&records);
        assert_eq!(fc.features.len(), 1);
    }

    #[test]
    fn test_chlorophyll_feature_shape() {
        let record = ChlorophyllRecord {
            id: Some(3),
            measurement_time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            latitude: 41.0,
            longitude: 2.0,
            chlor_a: 0.5,
            created_at: None,
        };
        let fc = chlorophyll_collection(&[record]);
        assert_eq!(fc.type_, "FeatureCollection");
        assert_eq!(fc.features.len(), 1);

        let feature = &fc.features[0];
        assert_eq!(
            feature.geometry,
            Geometry::Point {
                coordinates: [2.0, 41.0]
            }
        );
        assert_eq!(feature.properties["id"], 3);

        let json = serde_json::to_value(&fc).unwrap();
        assert_eq!(json["features"][0]["geometry"]["type"], "Point");
    }
}
