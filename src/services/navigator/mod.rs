//! Navigation state owner and event loop
//!
//! The Navigator is the single consumer of everything that changes what the
//! user sees:
//! - user commands (destination, search text, hover, style, camera)
//! - location events from the active subscription
//! - directions responses, each tagged with the selection generation
//! - the search debounce deadline
//!
//! State never leaves the loop except as an immutable `MapView` snapshot
//! published through a `watch` channel.

mod handlers;
#[cfg(test)]
mod tests;

use crate::domain::error::{DirectionsError, NavError};
use crate::domain::types::{Building, BuildingId, Coordinate, LocationSample, Route};
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::directions::DirectionsClient;
use crate::io::location::LocationEvent;
use crate::presentation::{project, BasemapStyle, MapView, ProjectionInput, ViewState};
use crate::services::announce_worker::AnnounceCmd;
use crate::services::search::{Directory, SearchDebouncer};
use crate::services::tracker::RouteProgressTracker;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::info;

/// Buffer for in-flight directions responses
const ROUTE_CHANNEL_CAPACITY: usize = 16;

/// User intent delivered to the navigator
#[derive(Debug, Clone, PartialEq)]
pub enum NavCommand {
    Select(BuildingId),
    ClearDestination,
    /// Raw search text; applied after the debounce window
    SetSearch(String),
    Hover(Option<BuildingId>),
    SetStyle(BasemapStyle),
    Zoom(f64),
    Pan(Coordinate),
    Recenter,
}

/// A finished directions request
#[derive(Debug)]
pub struct RouteResult {
    pub generation: u64,
    pub destination: BuildingId,
    pub result: Result<Route, DirectionsError>,
    pub latency_ms: u64,
}

pub struct Navigator {
    pub(crate) directory: Arc<Directory>,
    pub(crate) tracker: RouteProgressTracker,
    pub(crate) route: Option<Route>,
    pub(crate) selected: Option<Building>,
    /// Selected before the first fix; requested once a fix arrives
    pub(crate) route_pending: bool,
    /// Bumped on every selection change; older responses are discarded
    pub(crate) generation: u64,
    pub(crate) user_location: Option<LocationSample>,
    pub(crate) instruction: Option<String>,
    pub(crate) error: Option<NavError>,
    pub(crate) search: String,
    pub(crate) quick_navigation: Vec<Building>,
    pub(crate) debouncer: SearchDebouncer,
    pub(crate) view: ViewState,
    pub(crate) directions: Arc<dyn DirectionsClient>,
    pub(crate) announce_tx: mpsc::Sender<AnnounceCmd>,
    pub(crate) metrics: Arc<Metrics>,
    pub(crate) route_tx: mpsc::Sender<RouteResult>,
    pub(crate) route_rx: mpsc::Receiver<RouteResult>,
    view_tx: watch::Sender<Arc<MapView>>,
}

impl Navigator {
    pub fn new(
        config: &Config,
        directory: Arc<Directory>,
        directions: Arc<dyn DirectionsClient>,
        announce_tx: mpsc::Sender<AnnounceCmd>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let (route_tx, route_rx) = mpsc::channel(ROUTE_CHANNEL_CAPACITY);
        let view = ViewState::new(config.default_style(), config.default_zoom(), config.default_center());
        let quick_navigation = directory.quick_navigation().to_vec();
        let (view_tx, _) = watch::channel(Arc::new(placeholder_view(&view)));

        let navigator = Self {
            directory,
            tracker: RouteProgressTracker::new(),
            route: None,
            selected: None,
            route_pending: false,
            generation: 0,
            user_location: None,
            instruction: None,
            error: None,
            search: String::new(),
            quick_navigation,
            debouncer: SearchDebouncer::new(config.search_debounce()),
            view,
            directions,
            announce_tx,
            metrics,
            route_tx,
            route_rx,
            view_tx,
        };
        navigator.publish();
        navigator
    }

    /// Show an error from startup (e.g. the directory failed to load)
    pub fn with_error(mut self, error: NavError) -> Self {
        self.error = Some(error);
        self.publish();
        self
    }

    /// Apply an initial search immediately, as if it came from the link
    pub fn with_initial_search(mut self, query: &str) -> Self {
        self.apply_search(query.to_string());
        self.publish();
        self
    }

    /// Receiver for view snapshots
    pub fn subscribe_view(&self) -> watch::Receiver<Arc<MapView>> {
        self.view_tx.subscribe()
    }

    pub fn current_view(&self) -> Arc<MapView> {
        self.view_tx.borrow().clone()
    }

    /// Run until shutdown or until the command channel closes
    pub async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<NavCommand>,
        mut location_rx: mpsc::Receiver<LocationEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("navigator_started");
        let mut location_open = true;

        loop {
            let debounce_at = self.debouncer.deadline();

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                event = location_rx.recv(), if location_open => match event {
                    Some(event) => self.handle_location_event(event),
                    None => location_open = false,
                },
                Some(result) = self.route_rx.recv() => {
                    self.handle_route_result(result);
                }
                _ = sleep_until(debounce_at.unwrap_or_else(Instant::now)), if debounce_at.is_some() => {
                    self.handle_debounce(Instant::now());
                }
            }

            self.publish();
        }

        info!("navigator_stopped");
    }

    /// Recompute and publish the view snapshot
    pub(crate) fn publish(&self) {
        let input = ProjectionInput {
            user_location: self.user_location.as_ref(),
            buildings: self.directory.buildings(),
            quick_navigation: &self.quick_navigation,
            selected: self.selected.as_ref(),
            route: self.route.as_ref(),
            current_step: self.tracker.current_step_index(),
            instruction: self.instruction.as_deref(),
            error: self.error.as_ref(),
            search: &self.search,
        };
        let view = project(&input, &self.view);
        self.view_tx.send_replace(Arc::new(view));
    }
}

/// Empty view shown before the navigator's first projection
fn placeholder_view(view: &ViewState) -> MapView {
    project(
        &ProjectionInput {
            user_location: None,
            buildings: &[],
            quick_navigation: &[],
            selected: None,
            route: None,
            current_step: None,
            instruction: None,
            error: None,
            search: "",
        },
        view,
    )
}
