//! Walking directions over HTTP (Mapbox Directions v5 wire format)
//!
//! One request per call, no caching, no retry. The first candidate route
//! returned by the provider wins.

use crate::domain::error::DirectionsError;
use crate::domain::types::{Coordinate, ManeuverType, Route, Step};
use crate::infra::config::Config;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Source of walking routes
#[async_trait]
pub trait DirectionsClient: Send + Sync {
    async fn fetch_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, DirectionsError>;
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<ApiRoute>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiRoute {
    geometry: ApiGeometry,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    legs: Vec<ApiLeg>,
}

#[derive(Debug, Deserialize)]
struct ApiGeometry {
    #[serde(default)]
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct ApiLeg {
    #[serde(default)]
    steps: Vec<ApiStep>,
}

#[derive(Debug, Deserialize)]
struct ApiStep {
    maneuver: ApiManeuver,
}

#[derive(Debug, Deserialize)]
struct ApiManeuver {
    #[serde(rename = "type")]
    kind: ManeuverType,
    #[serde(default)]
    instruction: String,
    location: [f64; 2],
}

impl From<ApiRoute> for Route {
    fn from(route: ApiRoute) -> Self {
        let steps = route
            .legs
            .into_iter()
            .next()
            .map(|leg| {
                leg.steps
                    .into_iter()
                    .map(|s| Step {
                        instruction_text: s.maneuver.instruction,
                        maneuver_type: s.maneuver.kind,
                        maneuver_location: Coordinate::from_lng_lat(s.maneuver.location),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Route {
            geometry: route.geometry.coordinates.into_iter().map(Coordinate::from_lng_lat).collect(),
            duration_seconds: route.duration,
            steps,
        }
    }
}

/// Parse a provider response body into the first route.
///
/// Unparseable bodies count as transport failures; a parseable body with no
/// routes (including provider error bodies) is `NoRouteFound`.
pub fn parse_directions_response(body: &[u8]) -> Result<Route, DirectionsError> {
    let response: DirectionsResponse = serde_json::from_slice(body)
        .map_err(|e| DirectionsError::Network(format!("invalid response body: {e}")))?;

    match response.routes.into_iter().next() {
        Some(route) => Ok(route.into()),
        None => {
            debug!(
                code = ?response.code,
                message = ?response.message,
                "directions_response_without_routes"
            );
            Err(DirectionsError::NoRouteFound)
        }
    }
}

fn check_coordinate(label: &str, c: &Coordinate) -> Result<(), DirectionsError> {
    if c.is_valid() {
        Ok(())
    } else {
        Err(DirectionsError::InvalidCoordinate(format!("{label} {c}")))
    }
}

/// Mapbox-compatible directions client
pub struct MapboxDirectionsClient {
    http: reqwest::Client,
    base_url: String,
    profile: String,
    access_token: Option<String>,
}

impl MapboxDirectionsClient {
    pub fn new(
        base_url: impl Into<String>,
        profile: impl Into<String>,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DirectionsError> {
        // Create HTTP client once for reuse (connection pooling)
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectionsError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            profile: profile.into(),
            access_token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, DirectionsError> {
        if config.directions_access_token().is_none() {
            warn!("directions_access_token_missing");
        }
        Self::new(
            config.directions_base_url(),
            config.directions_profile(),
            config.directions_access_token().map(str::to_string),
            config.directions_timeout(),
        )
    }

    /// Request URL without the access token (safe to log)
    pub fn route_url(&self, origin: &Coordinate, destination: &Coordinate) -> String {
        format!(
            "{}/directions/v5/mapbox/{}/{},{};{},{}",
            self.base_url,
            self.profile,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude
        )
    }
}

#[async_trait]
impl DirectionsClient for MapboxDirectionsClient {
    async fn fetch_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Route, DirectionsError> {
        check_coordinate("origin", &origin)?;
        check_coordinate("destination", &destination)?;

        let url = self.route_url(&origin, &destination);
        let mut request =
            self.http.get(&url).query(&[("geometries", "geojson"), ("steps", "true")]);
        if let Some(token) = &self.access_token {
            request = request.query(&[("access_token", token.as_str())]);
        }

        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            error!(url = %url, error = %e, "directions_request_failed");
            DirectionsError::Network(e.to_string())
        })?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            error!(url = %url, error = %e, "directions_body_read_failed");
            DirectionsError::Network(e.to_string())
        })?;
        let latency_ms = start.elapsed().as_millis() as u64;

        let result = parse_directions_response(&body);
        match &result {
            Ok(route) => info!(
                status = %status.as_u16(),
                latency_ms = %latency_ms,
                steps = %route.steps.len(),
                duration_s = %route.duration_seconds,
                "directions_route_received"
            ),
            Err(e) => warn!(
                status = %status.as_u16(),
                latency_ms = %latency_ms,
                error = %e,
                "directions_route_failed"
            ),
        }
        result
    }
}
