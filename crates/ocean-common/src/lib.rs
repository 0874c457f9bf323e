//! Shared types for the ocean observation services.

pub mod bbox;
pub mod error;
pub mod geojson;
pub mod observation;

pub use bbox::BoundingBox;
pub use error::{OceanError, OceanResult};
pub use observation::{
    ChlorophyllRecord, CurrentsRecord, GridPoint, ScalarField, ScalarObservation, StoreKind,
    VariableKind,
};
