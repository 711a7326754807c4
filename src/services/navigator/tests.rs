//! Tests for the Navigator

use super::*;
use crate::domain::types::{ManeuverType, Step};
use crate::presentation::ViewStatus;
use crate::services::tracker::TrackerPhase;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::time::Duration;

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_767_617_600 + secs, 0).unwrap()
}

fn sample_at(lat: f64, lng: f64, secs: i64) -> LocationEvent {
    LocationEvent::Sample(LocationSample::new(Coordinate::new(lat, lng), ts(secs)))
}

fn building(id: u32, name: &str, lat: f64, lng: f64) -> Building {
    Building { id: BuildingId(id), name: name.to_string(), latitude: lat, longitude: lng }
}

fn step(kind: ManeuverType, text: &str, lat: f64, lng: f64) -> Step {
    Step {
        instruction_text: text.to_string(),
        maneuver_type: kind,
        maneuver_location: Coordinate::new(lat, lng),
    }
}

/// (0,0) -> (0,1) with a turn halfway
fn three_step_route() -> Route {
    Route {
        geometry: vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.5), Coordinate::new(0.0, 1.0)],
        duration_seconds: 600.0,
        steps: vec![
            step(ManeuverType::Depart, "Head east", 0.0, 0.0),
            step(ManeuverType::Turn, "left onto Oak St", 0.0, 0.5),
            step(ManeuverType::Arrive, "You have arrived", 0.0, 1.0),
        ],
    }
}

/// Scripted directions provider keyed by destination
#[derive(Default)]
struct FakeDirections {
    script: Vec<(Coordinate, Duration, Result<Route, DirectionsError>)>,
    calls: Mutex<Vec<(Coordinate, Coordinate)>>,
}

impl FakeDirections {
    fn respond(mut self, destination: Coordinate, delay: Duration, result: Result<Route, DirectionsError>) -> Self {
        self.script.push((destination, delay, result));
        self
    }
}

#[async_trait]
impl DirectionsClient for FakeDirections {
    async fn fetch_route(&self, origin: Coordinate, destination: Coordinate) -> Result<Route, DirectionsError> {
        self.calls.lock().push((origin, destination));
        let (delay, result) = self
            .script
            .iter()
            .find(|(d, _, _)| *d == destination)
            .map(|(_, delay, result)| (*delay, result.clone()))
            .unwrap_or((Duration::ZERO, Err(DirectionsError::Network("unscripted".into()))));
        tokio::time::sleep(delay).await;
        result
    }
}

struct Harness {
    nav: Navigator,
    directions: Arc<FakeDirections>,
    announce_rx: mpsc::Receiver<AnnounceCmd>,
    metrics: Arc<Metrics>,
}

fn harness(directions: FakeDirections) -> Harness {
    harness_with_config(directions, &Config::default())
}

fn harness_with_config(directions: FakeDirections, config: &Config) -> Harness {
    let campus = vec![
        building(1, "Main Hall", 0.0, 1.0),
        building(2, "Library", 0.0, 2.0),
        building(3, "Science Center", 0.0, 3.0),
    ];
    let directory = Arc::new(Directory::new(vec![campus[0].clone()], campus));
    let directions = Arc::new(directions);
    let metrics = Arc::new(Metrics::new());
    let (announce_tx, announce_rx) = mpsc::channel(8);
    let nav = Navigator::new(
        config,
        directory,
        directions.clone(),
        announce_tx,
        metrics.clone(),
    );
    Harness { nav, directions, announce_rx, metrics }
}

impl Harness {
    async fn deliver_route(&mut self) {
        let result = self.nav.route_rx.recv().await.expect("route result");
        self.nav.handle_route_result(result);
    }
}

#[tokio::test]
async fn test_three_step_route_scenario() {
    let fake = FakeDirections::default().respond(
        Coordinate::new(0.0, 1.0),
        Duration::ZERO,
        Ok(three_step_route()),
    );
    let mut h = harness(fake);

    // Selected before the first fix: request waits
    h.nav.handle_command(NavCommand::Select(BuildingId(1)));
    assert!(h.nav.route_pending);
    assert!(h.directions.calls.lock().is_empty());

    h.nav.handle_location_event(sample_at(0.0, 0.0, 0));
    h.deliver_route().await;
    assert_eq!(
        *h.directions.calls.lock(),
        vec![(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0))]
    );
    assert_eq!(h.nav.tracker.phase(), TrackerPhase::Tracking);
    assert_eq!(h.nav.tracker.current_step_index(), Some(0));

    // Exactly at step[1] maneuver location: advance and emit turn
    h.nav.handle_location_event(sample_at(0.0, 0.5, 10));
    assert_eq!(h.nav.tracker.current_step_index(), Some(1));
    assert_eq!(h.nav.instruction.as_deref(), Some("Turn left onto Oak St"));
    let cmd = h.announce_rx.try_recv().unwrap();
    assert_eq!((cmd.step_index, cmd.text.as_str()), (1, "Turn left onto Oak St"));

    // Same step again: displayed, not re-announced
    h.nav.handle_location_event(sample_at(0.0, 0.5, 11));
    assert_eq!(h.nav.instruction.as_deref(), Some("Turn left onto Oak St"));
    assert!(h.announce_rx.try_recv().is_err());
    assert_eq!(h.metrics.steps_advanced(), 1);

    // One request per selection, not per sample
    assert_eq!(h.directions.calls.lock().len(), 1);

    h.nav.publish();
    let view = h.nav.current_view();
    assert_eq!(view.status, ViewStatus::Ready);
    assert_eq!(view.current_step, Some(1));
    assert_eq!(view.selected_popup.as_ref().unwrap().travel_time_minutes, Some(10));
    assert_eq!(view.route_line.as_ref().unwrap().len(), 3);
}

#[tokio::test]
async fn test_zero_routes_stays_idle() {
    let fake = FakeDirections::default().respond(
        Coordinate::new(0.0, 1.0),
        Duration::ZERO,
        Err(DirectionsError::NoRouteFound),
    );
    let mut h = harness(fake);

    h.nav.handle_location_event(sample_at(0.0, 0.0, 0));
    h.nav.handle_command(NavCommand::Select(BuildingId(1)));
    h.deliver_route().await;

    assert_eq!(h.nav.error, Some(NavError::DirectionsNoRoute));
    assert_eq!(h.nav.tracker.phase(), TrackerPhase::Idle);
    assert!(h.nav.route.is_none());

    h.nav.handle_location_event(sample_at(0.0, 0.5, 5));
    assert!(h.nav.instruction.is_none());
    assert!(h.announce_rx.try_recv().is_err());

    h.nav.publish();
    let view = h.nav.current_view();
    assert_eq!(view.status, ViewStatus::Error);
    assert_eq!(view.error.as_ref().unwrap().message, "No route found");
}

#[tokio::test(start_paused = true)]
async fn test_stale_response_discarded() {
    let mut route_two = three_step_route();
    route_two.steps.truncate(2);
    let fake = FakeDirections::default()
        .respond(Coordinate::new(0.0, 1.0), Duration::from_secs(5), Ok(three_step_route()))
        .respond(Coordinate::new(0.0, 2.0), Duration::from_secs(1), Ok(route_two));
    let mut h = harness(fake);

    h.nav.handle_location_event(sample_at(0.0, 0.0, 0));
    h.nav.handle_command(NavCommand::Select(BuildingId(1)));
    h.nav.handle_command(NavCommand::Select(BuildingId(2)));

    // Building 2 answers first, then the slower building 1 response
    h.deliver_route().await;
    h.deliver_route().await;

    assert_eq!(h.nav.selected.as_ref().map(|b| b.id), Some(BuildingId(2)));
    assert_eq!(h.nav.route.as_ref().unwrap().steps.len(), 2);
    assert_eq!(h.metrics.stale_routes_discarded(), 1);
}

#[tokio::test]
async fn test_new_route_clears_directions_error() {
    let fake = FakeDirections::default()
        .respond(Coordinate::new(0.0, 1.0), Duration::ZERO, Err(DirectionsError::Network("503".into())))
        .respond(Coordinate::new(0.0, 2.0), Duration::ZERO, Ok(three_step_route()));
    let mut h = harness(fake);

    h.nav.handle_location_event(sample_at(0.0, 0.0, 0));
    h.nav.handle_command(NavCommand::Select(BuildingId(1)));
    h.deliver_route().await;
    assert!(matches!(h.nav.error, Some(NavError::DirectionsNetworkError(_))));

    h.nav.handle_command(NavCommand::Select(BuildingId(2)));
    assert!(h.nav.error.is_none());
    h.deliver_route().await;
    assert!(h.nav.route.is_some());
}

#[tokio::test]
async fn test_unknown_destination_ignored() {
    let mut h = harness(FakeDirections::default());
    h.nav.handle_command(NavCommand::Select(BuildingId(99)));
    assert!(h.nav.selected.is_none());
    assert_eq!(h.nav.generation, 0);
}

#[tokio::test]
async fn test_location_error_shown() {
    let mut h = harness(FakeDirections::default());
    h.nav.handle_location_event(LocationEvent::Error(crate::domain::error::LocationError::Denied(
        "EACCES".into(),
    )));
    h.nav.publish();
    let view = h.nav.current_view();
    assert_eq!(view.status, ViewStatus::Error);
    assert_eq!(view.error.as_ref().unwrap().message, "Unable to retrieve your location");
}

#[tokio::test]
async fn test_fix_after_timeout_clears_error_and_resumes_tracking() {
    let fake = FakeDirections::default().respond(
        Coordinate::new(0.0, 1.0),
        Duration::ZERO,
        Ok(three_step_route()),
    );
    let mut h = harness(fake);
    h.nav.handle_command(NavCommand::Select(BuildingId(1)));
    h.nav.handle_location_event(sample_at(0.0, 0.0, 0));
    h.deliver_route().await;

    // Walked through a building: no fix for a while
    h.nav.handle_location_event(LocationEvent::Error(
        crate::domain::error::LocationError::Timeout(5000),
    ));
    h.nav.publish();
    assert_eq!(h.nav.current_view().status, ViewStatus::Error);

    h.nav.handle_location_event(sample_at(0.0, 0.5, 20));
    assert!(h.nav.error.is_none());
    assert_eq!(h.nav.tracker.current_step_index(), Some(1));
    assert_eq!(h.nav.instruction.as_deref(), Some("Turn left onto Oak St"));
    h.nav.publish();
    assert_eq!(h.nav.current_view().status, ViewStatus::Ready);
}

#[tokio::test]
async fn test_directions_error_survives_fix() {
    let fake = FakeDirections::default().respond(
        Coordinate::new(0.0, 1.0),
        Duration::ZERO,
        Err(DirectionsError::NoRouteFound),
    );
    let mut h = harness(fake);
    h.nav.handle_location_event(sample_at(0.0, 0.0, 0));
    h.nav.handle_command(NavCommand::Select(BuildingId(1)));
    h.deliver_route().await;

    h.nav.handle_location_event(sample_at(0.0, 0.1, 5));
    assert_eq!(h.nav.error, Some(NavError::DirectionsNoRoute));
}

#[tokio::test]
async fn test_proximity_threshold_not_configurable() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"[navigation]\nproximity_threshold_m = 500.0\n").unwrap();
    let config = Config::from_file(file.path()).unwrap();

    let fake = FakeDirections::default().respond(
        Coordinate::new(0.0, 1.0),
        Duration::ZERO,
        Ok(three_step_route()),
    );
    let mut h = harness_with_config(fake, &config);
    h.nav.handle_command(NavCommand::Select(BuildingId(1)));
    h.nav.handle_location_event(sample_at(0.0, 0.0, 0));
    h.deliver_route().await;

    // ~111 m short of the turn: outside 20 m, inside the stray 500 m key
    h.nav.handle_location_event(sample_at(0.0, 0.499, 5));
    assert_eq!(h.nav.tracker.current_step_index(), Some(0));
}

#[tokio::test]
async fn test_out_of_order_sample_ignored() {
    let mut h = harness(FakeDirections::default());
    h.nav.handle_location_event(sample_at(0.0, 0.0, 10));
    h.nav.handle_location_event(sample_at(5.0, 5.0, 3));
    assert_eq!(h.nav.user_location.unwrap().coordinate, Coordinate::new(0.0, 0.0));
}

#[tokio::test(start_paused = true)]
async fn test_search_debounced_and_clear_drops_route() {
    let fake = FakeDirections::default().respond(
        Coordinate::new(0.0, 1.0),
        Duration::ZERO,
        Ok(three_step_route()),
    );
    let mut h = harness(fake);
    let start = Instant::now();

    h.nav.handle_command(NavCommand::SetSearch("lib".into()));
    h.nav.handle_command(NavCommand::SetSearch("main".into()));
    h.nav.handle_debounce(start + Duration::from_millis(400));
    assert_eq!(h.nav.search, "");
    h.nav.handle_debounce(start + Duration::from_millis(500));
    assert_eq!(h.nav.search, "main");
    assert_eq!(h.nav.quick_navigation.len(), 1);

    h.nav.handle_location_event(sample_at(0.0, 0.0, 0));
    h.nav.handle_command(NavCommand::Select(BuildingId(1)));
    h.deliver_route().await;
    assert_eq!(h.nav.tracker.phase(), TrackerPhase::Tracking);

    h.nav.apply_search(String::new());
    assert!(h.nav.selected.is_none());
    assert_eq!(h.nav.tracker.phase(), TrackerPhase::Idle);
    // Empty query shows the shortlist again
    assert_eq!(h.nav.quick_navigation, h.nav.directory.quick_navigation());
}

#[tokio::test]
async fn test_view_commands() {
    let mut h = harness(FakeDirections::default());
    h.nav.handle_command(NavCommand::SetStyle(BasemapStyle::Satellite));
    h.nav.handle_command(NavCommand::Hover(Some(BuildingId(2))));
    h.nav.handle_command(NavCommand::Zoom(-3.0));
    h.nav.handle_command(NavCommand::Pan(Coordinate::new(1.0, 1.0)));
    h.nav.handle_location_event(sample_at(0.0, 0.0, 0));

    assert_eq!(h.nav.view.center, Coordinate::new(1.0, 1.0));
    assert_eq!(h.nav.view.zoom, 0.0);

    h.nav.handle_command(NavCommand::Recenter);
    h.nav.publish();
    let view = h.nav.current_view();
    assert_eq!(view.style.url, "mapbox://styles/mapbox/satellite-v9");
    assert_eq!(view.camera.center, Coordinate::new(0.0, 0.0));
    assert_eq!(view.camera.zoom, 17.0);
    assert_eq!(view.hover_popup.as_ref().unwrap().name, "Library");
}

#[tokio::test]
async fn test_run_loop_publishes_route() {
    let fake = FakeDirections::default().respond(
        Coordinate::new(0.0, 1.0),
        Duration::ZERO,
        Ok(three_step_route()),
    );
    let h = harness(fake);
    let mut view_rx = h.nav.subscribe_view();
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (loc_tx, loc_rx) = mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(h.nav.run(cmd_rx, loc_rx, shutdown_rx));

    cmd_tx.send(NavCommand::Select(BuildingId(1))).await.unwrap();
    loc_tx.send(sample_at(0.0, 0.0, 0)).await.unwrap();

    let view = view_rx.wait_for(|v| v.route_line.is_some()).await.unwrap().clone();
    assert_eq!(view.current_step, Some(0));
    assert!(view.user_marker.is_some());

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
}
