//! Observation records and variable-kind descriptors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Variable families ingested from the upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Chlorophyll,
    Currents,
}

impl VariableKind {
    /// Short label used in log fields and temp file names.
    pub fn label(&self) -> &'static str {
        match self {
            VariableKind::Chlorophyll => "chlorophyll",
            VariableKind::Currents => "currents",
        }
    }

    /// Upstream variable names requested from the provider, in query order.
    pub fn variables(&self) -> &'static [&'static str] {
        match self {
            VariableKind::Chlorophyll => &["chlor_a"],
            VariableKind::Currents => &["u_current", "v_current"],
        }
    }

    /// Table backing the given store for this kind.
    pub fn table(&self, which: StoreKind) -> &'static str {
        match (self, which) {
            (VariableKind::Chlorophyll, StoreKind::Canonical) => "chlorophyll_data",
            (VariableKind::Chlorophyll, StoreKind::Raw) => "chlorophyll_data_raw",
            (VariableKind::Currents, StoreKind::Canonical) => "currents_data",
            (VariableKind::Currents, StoreKind::Raw) => "currents_data_raw",
        }
    }
}

/// Which of the two parallel stores a read or write addresses.
///
/// The raw store is append-only and reflects what was decoded from upstream;
/// the canonical store is mutated in place by the interpolator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Canonical,
    Raw,
}

/// One scalar column of a variable kind.
///
/// Currents expose two independent fields; interpolation never couples them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarField {
    ChlorA,
    UCurrent,
    VCurrent,
}

impl ScalarField {
    /// Every scalar field, in interpolation order.
    pub const ALL: [ScalarField; 3] = [
        ScalarField::ChlorA,
        ScalarField::UCurrent,
        ScalarField::VCurrent,
    ];

    pub fn kind(&self) -> VariableKind {
        match self {
            ScalarField::ChlorA => VariableKind::Chlorophyll,
            ScalarField::UCurrent | ScalarField::VCurrent => VariableKind::Currents,
        }
    }

    /// Column name in the archive tables.
    pub fn column(&self) -> &'static str {
        match self {
            ScalarField::ChlorA => "chlor_a",
            ScalarField::UCurrent => "u_current",
            ScalarField::VCurrent => "v_current",
        }
    }
}

/// A sample location carrying the exact grid coordinates emitted upstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A chlorophyll-a measurement (mg/m3) at a point in space-time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChlorophyllRecord {
    /// Archive-assigned identity; `None` until the record is persisted.
    pub id: Option<i64>,
    pub measurement_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub chlor_a: f32,
    pub created_at: Option<DateTime<Utc>>,
}

/// A surface geostrophic current measurement at a point in space-time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentsRecord {
    pub id: Option<i64>,
    pub measurement_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Eastward sea water velocity, m/s.
    pub u_current: f32,
    /// Northward sea water velocity, m/s.
    pub v_current: f32,
    pub created_at: Option<DateTime<Utc>>,
}

/// The single-scalar working shape the interpolator operates on.
///
/// Series and grid reads project one column of a kind into this record;
/// value updates are matched back by `id`. A `None` id marks a grid cell
/// synthesized for rectangularity and must never be persisted.
#[derive(Debug, Clone)]
pub struct ScalarObservation {
    pub id: Option<i64>,
    pub measurement_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub value: f32,
    pub created_at: Option<DateTime<Utc>>,
}

impl ScalarObservation {
    /// Sentinel for a grid cell with no backing row.
    pub fn missing(measurement_time: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: None,
            measurement_time,
            latitude,
            longitude,
            value: f32::NAN,
            created_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tables() {
        assert_eq!(
            VariableKind::Chlorophyll.table(StoreKind::Canonical),
            "chlorophyll_data"
        );
        assert_eq!(
            VariableKind::Chlorophyll.table(StoreKind::Raw),
            "chlorophyll_data_raw"
        );
        assert_eq!(
            VariableKind::Currents.table(StoreKind::Canonical),
            "currents_data"
        );
        assert_eq!(
            VariableKind::Currents.table(StoreKind::Raw),
            "currents_data_raw"
        );
    }

    #[test]
    fn test_field_descriptors() {
        assert_eq!(ScalarField::ChlorA.kind(), VariableKind::Chlorophyll);
        assert_eq!(ScalarField::UCurrent.kind(), VariableKind::Currents);
        assert_eq!(ScalarField::VCurrent.column(), "v_current");
    }

    #[test]
    fn test_missing_sentinel() {
        let t = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let obs = ScalarObservation::missing(t, 41.0, 2.0);
        assert!(obs.id.is_none());
        assert!(obs.value.is_nan());
    }
}
