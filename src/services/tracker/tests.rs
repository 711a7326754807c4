//! Tests for the route progress tracker

use super::*;
use chrono::{DateTime, Duration, TimeZone, Utc};

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_767_617_600 + secs, 0).unwrap()
}

fn step(kind: ManeuverType, text: &str, lat: f64, lng: f64) -> Step {
    Step {
        instruction_text: text.to_string(),
        maneuver_type: kind,
        maneuver_location: Coordinate::new(lat, lng),
    }
}

/// Three steps along the equator, ~111 m apart
fn equator_steps() -> Vec<Step> {
    vec![
        step(ManeuverType::Depart, "Head east", 0.0, 0.0),
        step(ManeuverType::Turn, "left onto Campus Drive", 0.0, 0.001),
        step(ManeuverType::Arrive, "You have arrived", 0.0, 0.002),
    ]
}

fn sample_at(lat: f64, lng: f64, secs: i64) -> LocationSample {
    LocationSample::new(Coordinate::new(lat, lng), ts(secs))
}

fn tracking(steps: Vec<Step>) -> RouteProgressTracker {
    let mut tracker = RouteProgressTracker::default();
    tracker.adopt(steps);
    tracker
}

#[test]
fn test_idle_without_route() {
    let mut tracker = RouteProgressTracker::default();
    assert_eq!(tracker.phase(), TrackerPhase::Idle);
    assert_eq!(tracker.current_step_index(), None);

    let update = tracker.update(&sample_at(0.0, 0.0, 0));
    assert_eq!(update, ProgressUpdate::default());
}

#[test]
fn test_adopt_empty_steps_stays_idle() {
    let mut tracker = RouteProgressTracker::default();
    tracker.adopt(vec![]);
    assert_eq!(tracker.phase(), TrackerPhase::Idle);
    assert!(tracker.update(&sample_at(0.0, 0.0, 0)).instruction.is_none());
}

#[test]
fn test_adopt_starts_at_first_step() {
    let tracker = tracking(equator_steps());
    assert_eq!(tracker.phase(), TrackerPhase::Tracking);
    assert_eq!(tracker.current_step_index(), Some(0));
}

#[test]
fn test_sample_at_next_maneuver_advances_and_emits_turn() {
    let mut tracker = tracking(equator_steps());

    let update = tracker.update(&sample_at(0.0, 0.001, 0));

    assert!(update.advanced);
    assert_eq!(update.step_index, Some(1));
    let instruction = update.instruction.unwrap();
    assert_eq!(instruction.text, "Turn left onto Campus Drive");
    assert!(instruction.announce);
    assert_eq!(tracker.last_announced_instruction(), Some("Turn left onto Campus Drive"));
}

#[test]
fn test_far_sample_never_advances() {
    let mut tracker = tracking(equator_steps());

    // ~55 m short of step 1
    let update = tracker.update(&sample_at(0.0, 0.0005, 0));

    assert!(!update.advanced);
    assert_eq!(update.step_index, Some(0));
    assert!(update.instruction.is_none());
}

#[test]
fn test_threshold_is_strict() {
    let mut tracker = tracking(equator_steps());
    let next = tracker.steps()[1].maneuver_location;

    // Find a point just outside 20 m by walking west from the maneuver
    let outside = Coordinate::new(0.0, next.longitude - 0.000_181);
    assert!(outside.distance_to(&next) > PROXIMITY_THRESHOLD_M);
    assert!(!tracker.update(&LocationSample::new(outside, ts(0))).advanced);

    let inside = Coordinate::new(0.0, next.longitude - 0.000_170);
    assert!(inside.distance_to(&next) < PROXIMITY_THRESHOLD_M);
    assert!(tracker.update(&LocationSample::new(inside, ts(1))).advanced);
}

#[test]
fn test_at_most_one_advance_per_sample() {
    // Steps 1, 2 and 3 share a location; one sample must advance only once
    let steps = vec![
        step(ManeuverType::Depart, "Head north", 0.0, 0.0),
        step(ManeuverType::Continue, "Continue", 0.0, 0.001),
        step(ManeuverType::Turn, "right", 0.0, 0.001),
        step(ManeuverType::Arrive, "Arrive", 0.0, 0.001),
    ];
    let mut tracker = tracking(steps);

    let update = tracker.update(&sample_at(0.0, 0.001, 0));
    assert_eq!(update.step_index, Some(1));

    let update = tracker.update(&sample_at(0.0, 0.001, 1));
    assert_eq!(update.step_index, Some(2));

    let update = tracker.update(&sample_at(0.0, 0.001, 2));
    assert_eq!(update.step_index, Some(3));
}

#[test]
fn test_stays_on_final_step() {
    let mut tracker = tracking(equator_steps());
    tracker.update(&sample_at(0.0, 0.001, 0));
    tracker.update(&sample_at(0.0, 0.002, 1));
    assert_eq!(tracker.current_step_index(), Some(2));

    for i in 2..10 {
        let update = tracker.update(&sample_at(0.0, 0.002, i));
        assert!(!update.advanced);
        assert_eq!(update.step_index, Some(2));
    }
    assert_eq!(tracker.phase(), TrackerPhase::Tracking);
}

#[test]
fn test_index_monotonic_and_bounded() {
    let steps = equator_steps();
    let len = steps.len();
    let mut tracker = tracking(steps);

    let walk = [0.0, 0.0004, 0.0009, 0.0, 0.0012, 0.0019, 0.0021, 0.0, 0.003];
    let mut last = 0;
    for (i, lng) in walk.iter().enumerate() {
        let update = tracker.update(&sample_at(0.0, *lng, i as i64));
        let idx = update.step_index.unwrap();
        assert!(idx >= last, "index went backwards: {last} -> {idx}");
        assert!(idx < len);
        last = idx;
    }
}

#[test]
fn test_adopt_resets_index() {
    let mut tracker = tracking(equator_steps());
    tracker.update(&sample_at(0.0, 0.001, 0));
    tracker.update(&sample_at(0.0, 0.002, 1));
    assert_eq!(tracker.current_step_index(), Some(2));

    tracker.adopt(equator_steps());
    assert_eq!(tracker.current_step_index(), Some(0));
    assert_eq!(tracker.last_announced_instruction(), None);
}

#[test]
fn test_turn_instruction_repeats_but_announces_once() {
    let mut tracker = tracking(equator_steps());

    let first = tracker.update(&sample_at(0.0, 0.001, 0)).instruction.unwrap();
    let second = tracker.update(&sample_at(0.0, 0.0012, 1)).instruction.unwrap();

    assert!(first.announce);
    assert!(!second.announce);
    assert_eq!(first.text, second.text);
}

#[test]
fn test_non_turn_step_emits_nothing() {
    let mut tracker = tracking(equator_steps());
    tracker.update(&sample_at(0.0, 0.001, 0));

    // Arrive step is not a turn
    let update = tracker.update(&sample_at(0.0, 0.002, 1));
    assert_eq!(update.step_index, Some(2));
    assert!(update.instruction.is_none());
    // Previously announced instruction is retained
    assert_eq!(tracker.last_announced_instruction(), Some("Turn left onto Campus Drive"));
}

#[test]
fn test_turn_on_first_step_emits_without_advance() {
    let steps = vec![
        step(ManeuverType::Turn, "right onto Quad Walk", 0.0, 0.0),
        step(ManeuverType::Arrive, "Arrive", 0.0, 0.01),
    ];
    let mut tracker = tracking(steps);

    let update = tracker.update(&sample_at(0.0, 0.0, 0));
    assert!(!update.advanced);
    assert_eq!(update.instruction.unwrap().text, "Turn right onto Quad Walk");
}

#[test]
fn test_invalid_sample_ignored() {
    let mut tracker = tracking(equator_steps());

    let update = tracker.update(&sample_at(f64::NAN, 0.001, 0));
    assert_eq!(update, ProgressUpdate::default());

    let update = tracker.update(&sample_at(120.0, 0.001, 1));
    assert_eq!(update, ProgressUpdate::default());
    assert_eq!(tracker.current_step_index(), Some(0));
}

#[test]
fn test_out_of_order_sample_ignored() {
    let mut tracker = tracking(equator_steps());
    tracker.update(&sample_at(0.0, 0.0, 10));

    let older = LocationSample::new(Coordinate::new(0.0, 0.001), ts(10) - Duration::seconds(5));
    let update = tracker.update(&older);

    assert_eq!(update, ProgressUpdate::default());
    assert_eq!(tracker.current_step_index(), Some(0));
}

#[test]
fn test_clear_returns_to_idle() {
    let mut tracker = tracking(equator_steps());
    tracker.update(&sample_at(0.0, 0.001, 0));

    tracker.clear();

    assert_eq!(tracker.phase(), TrackerPhase::Idle);
    assert_eq!(tracker.current_step_index(), None);
    assert!(tracker.last_sample().is_none());
}

#[test]
fn test_decide_is_pure() {
    let steps = equator_steps();
    let position = Coordinate::new(0.0, 0.001);

    let a = decide(&steps, 0, &position, PROXIMITY_THRESHOLD_M);
    let b = decide(&steps, 0, &position, PROXIMITY_THRESHOLD_M);

    assert_eq!(a, b);
    assert_eq!(a.step_index, 1);
    assert!(a.advanced);
    assert_eq!(a.instruction_text.as_deref(), Some("Turn left onto Campus Drive"));
}

#[test]
fn test_decide_on_last_step_has_no_next_distance() {
    let steps = equator_steps();
    let decision = decide(&steps, 2, &Coordinate::new(0.0, 0.002), PROXIMITY_THRESHOLD_M);
    assert_eq!(decision.step_index, 2);
    assert!(!decision.advanced);
    assert!(decision.distance_to_next_m.is_none());
}
