//! Domain models - core navigation types and error kinds
//!
//! This module contains the canonical data types used throughout the system:
//! - `Coordinate` - WGS84 position with great-circle distance
//! - `Building` - static directory entry
//! - `Route` / `Step` - walking route returned by the directions provider
//! - `LocationSample` - a single position fix
//! - `NavError` - user-facing error kinds

pub mod error;
pub mod types;

// Re-export commonly used types at module level
pub use error::{DirectionsError, DirectoryError, LocationError, NavError};
pub use types::{Building, BuildingId, Coordinate, LocationSample, ManeuverType, Route, Step};
