//! Handlers for the Navigator
//!
//! Each handler applies one kind of input to navigation state. Side effects
//! (directions requests, announcements) are enqueued, never awaited here.

use super::{NavCommand, Navigator, RouteResult};
use crate::domain::error::{DirectionsError, NavError};
use crate::domain::types::BuildingId;
use crate::io::location::LocationEvent;
use crate::services::announce_worker::AnnounceCmd;
use std::time::Instant as StdInstant;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::Instant;
use tracing::{debug, info, warn};

impl Navigator {
    pub(crate) fn handle_command(&mut self, cmd: NavCommand) {
        match cmd {
            NavCommand::Select(id) => self.select_destination(id),
            NavCommand::ClearDestination => self.clear_destination("cleared"),
            NavCommand::SetSearch(text) => {
                debug!(text = %text, "search_text_changed");
                self.debouncer.push(text, Instant::now());
            }
            NavCommand::Hover(id) => self.view.hovered = id,
            NavCommand::SetStyle(style) => {
                info!(style = %style, "basemap_style_changed");
                self.view.style = style;
            }
            NavCommand::Zoom(level) => self.view.set_zoom(level),
            NavCommand::Pan(center) => self.view.pan(center),
            NavCommand::Recenter => {
                let user = self.user_location.map(|s| s.coordinate);
                self.view.recenter(user);
            }
        }
    }

    /// Choose a destination and request a route to it.
    ///
    /// Without a fix yet, the request waits for the first sample.
    pub(crate) fn select_destination(&mut self, id: BuildingId) {
        let Some(building) = self.directory.get(id).cloned() else {
            warn!(building_id = %id, "destination_unknown");
            return;
        };
        info!(building_id = %id, name = %building.name, "destination_selected");

        self.generation += 1;
        self.selected = Some(building);
        self.route = None;
        self.tracker.clear();
        self.instruction = None;
        if self.error.as_ref().is_some_and(NavError::is_directions) {
            self.error = None;
        }

        if self.user_location.is_some() {
            self.request_route();
        } else {
            debug!(building_id = %id, "route_request_pending_fix");
            self.route_pending = true;
        }
    }

    /// Drop destination and route; the tracker returns to idle
    pub(crate) fn clear_destination(&mut self, reason: &'static str) {
        if self.selected.is_none() && self.route.is_none() {
            return;
        }
        info!(reason = %reason, "destination_cleared");
        self.generation += 1;
        self.selected = None;
        self.route = None;
        self.route_pending = false;
        self.tracker.clear();
        self.instruction = None;
        if self.error.as_ref().is_some_and(NavError::is_directions) {
            self.error = None;
        }
    }

    /// Spawn one directions request for the current selection
    fn request_route(&mut self) {
        let (Some(building), Some(sample)) = (&self.selected, &self.user_location) else {
            return;
        };
        let destination = building.id;
        let target = building.coordinate();
        let origin = sample.coordinate;
        let generation = self.generation;
        self.route_pending = false;

        let client = self.directions.clone();
        let route_tx = self.route_tx.clone();
        self.metrics.record_directions_request();

        debug!(generation = %generation, building_id = %destination, origin = %origin, "route_requested");
        tokio::spawn(async move {
            let started = StdInstant::now();
            let result = client.fetch_route(origin, target).await;
            let latency_ms = started.elapsed().as_millis() as u64;
            let _ = route_tx.send(RouteResult { generation, destination, result, latency_ms }).await;
        });
    }

    pub(crate) fn handle_route_result(&mut self, result: RouteResult) {
        self.metrics.record_directions_latency(result.latency_ms);

        if result.generation != self.generation {
            self.metrics.record_stale_route_discarded();
            debug!(
                generation = %result.generation,
                current = %self.generation,
                building_id = %result.destination,
                "stale_route_discarded"
            );
            return;
        }

        match result.result {
            Ok(route) => {
                info!(
                    building_id = %result.destination,
                    steps = %route.steps.len(),
                    minutes = %route.travel_time_minutes(),
                    latency_ms = %result.latency_ms,
                    "route_adopted"
                );
                self.tracker.adopt(route.steps.clone());
                self.route = Some(route);
                self.instruction = None;
                if self.error.as_ref().is_some_and(NavError::is_directions) {
                    self.error = None;
                }
            }
            Err(e) => {
                match e {
                    DirectionsError::NoRouteFound => self.metrics.record_directions_no_route(),
                    _ => self.metrics.record_directions_failure(),
                }
                warn!(building_id = %result.destination, error = %e, "route_failed");
                self.route = None;
                self.tracker.clear();
                self.instruction = None;
                self.error = Some(e.into());
            }
        }
    }

    pub(crate) fn handle_location_event(&mut self, event: LocationEvent) {
        match event {
            LocationEvent::Sample(sample) => {
                if !sample.coordinate.is_valid()
                    || self.user_location.is_some_and(|last| sample.timestamp < last.timestamp)
                {
                    self.metrics.record_sample_ignored();
                    return;
                }
                self.metrics.record_sample();
                if self.error.as_ref().is_some_and(NavError::is_positioning) {
                    info!("location_recovered");
                    self.error = None;
                }
                self.user_location = Some(sample);
                self.view.on_location(sample.coordinate);

                if self.route_pending {
                    self.request_route();
                }

                let update = self.tracker.update(&sample);
                if update.advanced {
                    self.metrics.record_step_advanced();
                }
                if let Some(instruction) = update.instruction {
                    if instruction.announce {
                        self.enqueue_announcement(instruction.step_index, &instruction.text);
                    }
                    self.instruction = Some(instruction.text);
                }
            }
            LocationEvent::Error(e) => {
                self.metrics.record_location_error();
                warn!(error = %e, "location_error");
                self.error = Some(e.into());
            }
        }
    }

    fn enqueue_announcement(&self, step_index: usize, text: &str) {
        match self.announce_tx.try_send(AnnounceCmd::new(step_index, text)) {
            Ok(()) => {}
            Err(TrySendError::Full(cmd)) => {
                warn!(step = %cmd.step_index, "announce_queue_full");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(step = %step_index, "announce_worker_gone");
            }
        }
    }

    /// Apply the debounced search text once its window has elapsed
    pub(crate) fn handle_debounce(&mut self, now: Instant) {
        if let Some(text) = self.debouncer.poll(now) {
            self.apply_search(text);
        }
    }

    /// Filter the quick list; clearing a non-empty query clears the route
    pub(crate) fn apply_search(&mut self, text: String) {
        let previous = std::mem::replace(&mut self.search, text);
        self.quick_navigation = self.directory.filter(&self.search);
        self.metrics.record_search_applied();
        info!(query = %self.search, results = %self.quick_navigation.len(), "search_applied");

        if !previous.is_empty() && self.search.is_empty() {
            self.clear_destination("search_cleared");
        }
    }
}
