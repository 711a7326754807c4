//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `directions` - HTTP client for the walking directions provider
//! - `directory` - Building directory loading (HTTP or local files)
//! - `location` - Position sources (gpsd, replay)
//! - `announcer` - Instruction output (log, external command)
//! - `http_api` - HTTP API for view snapshots and user controls
//! - `prometheus` - Prometheus text exposition of metrics

pub mod announcer;
pub mod directions;
pub mod directory;
pub mod http_api;
pub mod location;
pub mod prometheus;

// Re-export commonly used types
pub use announcer::{announcer_from_config, Announcer, CommandAnnouncer, LogAnnouncer};
pub use directions::{DirectionsClient, MapboxDirectionsClient};
pub use directory::{load_directory, load_directory_from_config};
pub use http_api::{start_api_server, ApiState};
pub use location::{
    source_from_config, LocationEvent, LocationOptions, LocationSource, Subscription,
};
