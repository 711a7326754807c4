//! Error kinds surfaced to the user
//!
//! None of these are fatal. Each is shown in place of the map or route
//! panel until the user re-triggers the failed action.

use serde::{Deserialize, Serialize};

/// Directions client failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DirectionsError {
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),
    #[error("directions request failed: {0}")]
    Network(String),
    #[error("no route found")]
    NoRouteFound,
}

/// Location source failures, delivered at most once per subscription
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("positioning permission denied: {0}")]
    Denied(String),
    #[error("positioning unavailable: {0}")]
    Unavailable(String),
    #[error("no position fix within {0} ms")]
    Timeout(u64),
}

/// Directory loading failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("failed to fetch {resource}: {reason}")]
pub struct DirectoryError {
    pub resource: String,
    pub reason: String,
}

/// Umbrella error kind displayed by the map projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NavError {
    #[error("positioning unavailable: {0}")]
    PositioningUnavailable(String),
    #[error("positioning denied: {0}")]
    PositioningDenied(String),
    #[error("directions network error: {0}")]
    DirectionsNetworkError(String),
    #[error("no route found")]
    DirectionsNoRoute,
    #[error("directory fetch failed: {0}")]
    DirectoryFetchFailed(String),
}

impl NavError {
    /// Text shown to the user in place of the map
    pub fn user_message(&self) -> &'static str {
        match self {
            NavError::PositioningUnavailable(_) => "Geolocation is not supported or unavailable.",
            NavError::PositioningDenied(_) => "Unable to retrieve your location",
            NavError::DirectionsNetworkError(_) => "Error fetching route",
            NavError::DirectionsNoRoute => "No route found",
            NavError::DirectoryFetchFailed(_) => "Failed to fetch data",
        }
    }

    /// Positioning errors are cleared by the next accepted fix
    pub fn is_positioning(&self) -> bool {
        matches!(self, NavError::PositioningUnavailable(_) | NavError::PositioningDenied(_))
    }

    /// Directions errors are cleared by a later successful route
    pub fn is_directions(&self) -> bool {
        matches!(self, NavError::DirectionsNetworkError(_) | NavError::DirectionsNoRoute)
    }
}

impl From<DirectionsError> for NavError {
    fn from(e: DirectionsError) -> Self {
        match e {
            DirectionsError::NoRouteFound => NavError::DirectionsNoRoute,
            other => NavError::DirectionsNetworkError(other.to_string()),
        }
    }
}

impl From<LocationError> for NavError {
    fn from(e: LocationError) -> Self {
        match e {
            LocationError::Denied(reason) => NavError::PositioningDenied(reason),
            other => NavError::PositioningUnavailable(other.to_string()),
        }
    }
}

impl From<DirectoryError> for NavError {
    fn from(e: DirectoryError) -> Self {
        NavError::DirectoryFetchFailed(e.to_string())
    }
}
