//! Map view projection

use super::BasemapStyle;
use crate::domain::error::NavError;
use crate::domain::types::{Building, BuildingId, Coordinate, LocationSample, Route};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CAMERA_PITCH: f64 = 60.0;
pub const CAMERA_BEARING: f64 = -30.0;
pub const MIN_ZOOM: f64 = 0.0;
pub const MAX_ZOOM: f64 = 22.0;
pub const USER_POPUP_TEXT: &str = "You Are Here";

/// Ephemeral view choices. Never read by tracking or directions.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub hovered: Option<BuildingId>,
    pub style: BasemapStyle,
    pub zoom: f64,
    pub center: Coordinate,
    /// Camera tracks the user until they pan away
    pub follow_user: bool,
    default_zoom: f64,
}

impl ViewState {
    pub fn new(style: BasemapStyle, zoom: f64, center: Coordinate) -> Self {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        Self { hovered: None, style, zoom, center, follow_user: true, default_zoom: zoom }
    }

    /// New user fix
    pub fn on_location(&mut self, coordinate: Coordinate) {
        if self.follow_user {
            self.center = coordinate;
        }
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn pan(&mut self, center: Coordinate) {
        self.center = center;
        self.follow_user = false;
    }

    /// Snap back to the user at the default zoom and resume following
    pub fn recenter(&mut self, user: Option<Coordinate>) {
        if let Some(user) = user {
            self.center = user;
        }
        self.zoom = self.default_zoom;
        self.follow_user = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewStatus {
    Loading,
    Error,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBanner {
    pub error: NavError,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub center: Coordinate,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    pub following: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleView {
    pub name: BasemapStyle,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMarker {
    pub coordinate: Coordinate,
    pub popup: String,
    pub last_updated: DateTime<Utc>,
    pub accuracy_m: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingMarker {
    pub id: BuildingId,
    pub name: String,
    pub coordinate: Coordinate,
    pub hovered: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingPopup {
    pub id: BuildingId,
    pub name: String,
    pub travel_time_minutes: Option<u64>,
    /// Only filled for the selected building
    pub steps: Vec<String>,
}

/// Everything a renderer needs, as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub status: ViewStatus,
    pub error: Option<ErrorBanner>,
    pub camera: Camera,
    pub style: StyleView,
    pub user_marker: Option<UserMarker>,
    pub markers: Vec<BuildingMarker>,
    pub hover_popup: Option<BuildingPopup>,
    pub selected_popup: Option<BuildingPopup>,
    pub route_line: Option<Vec<Coordinate>>,
    pub current_step: Option<usize>,
    pub instruction: Option<String>,
    pub search: String,
    pub quick_navigation: Vec<Building>,
}

/// Navigation state borrowed for one projection
#[derive(Debug, Clone, Copy)]
pub struct ProjectionInput<'a> {
    pub user_location: Option<&'a LocationSample>,
    pub buildings: &'a [Building],
    pub quick_navigation: &'a [Building],
    pub selected: Option<&'a Building>,
    pub route: Option<&'a Route>,
    pub current_step: Option<usize>,
    pub instruction: Option<&'a str>,
    pub error: Option<&'a NavError>,
    pub search: &'a str,
}

/// Pure: same input, same view
pub fn project(input: &ProjectionInput<'_>, view: &ViewState) -> MapView {
    let status = match (input.error, input.user_location) {
        (Some(_), _) => ViewStatus::Error,
        (None, None) => ViewStatus::Loading,
        (None, Some(_)) => ViewStatus::Ready,
    };

    let selected_id = input.selected.map(|b| b.id);
    let travel_time = input.route.map(Route::travel_time_minutes);

    let markers = input
        .buildings
        .iter()
        .map(|b| BuildingMarker {
            id: b.id,
            name: b.name.clone(),
            coordinate: b.coordinate(),
            hovered: view.hovered == Some(b.id),
            selected: selected_id == Some(b.id),
        })
        .collect();

    let hover_popup = view.hovered.and_then(|id| {
        let building = input
            .buildings
            .iter()
            .chain(input.quick_navigation)
            .find(|b| b.id == id)?;
        Some(BuildingPopup {
            id,
            name: building.name.clone(),
            travel_time_minutes: if selected_id == Some(id) { travel_time } else { None },
            steps: Vec::new(),
        })
    });

    let selected_popup = input.selected.map(|b| BuildingPopup {
        id: b.id,
        name: b.name.clone(),
        travel_time_minutes: travel_time,
        steps: input
            .route
            .map(|r| r.steps.iter().map(|s| s.instruction_text.clone()).collect())
            .unwrap_or_default(),
    });

    MapView {
        status,
        error: input
            .error
            .map(|e| ErrorBanner { error: e.clone(), message: e.user_message().to_string() }),
        camera: Camera {
            center: view.center,
            zoom: view.zoom,
            pitch: CAMERA_PITCH,
            bearing: CAMERA_BEARING,
            following: view.follow_user,
        },
        style: StyleView { name: view.style, url: view.style.url().to_string() },
        user_marker: input.user_location.map(|s| UserMarker {
            coordinate: s.coordinate,
            popup: USER_POPUP_TEXT.to_string(),
            last_updated: s.timestamp,
            accuracy_m: s.accuracy_m,
        }),
        markers,
        hover_popup,
        selected_popup,
        route_line: input.route.map(|r| r.geometry.clone()),
        current_step: input.current_step,
        instruction: input.instruction.map(str::to_string),
        search: input.search.to_string(),
        quick_navigation: input.quick_navigation.to_vec(),
    }
}
