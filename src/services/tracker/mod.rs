//! Route progress tracking
//!
//! Consumes location samples against the active route's step list, advances
//! the current step when the traveler comes within the proximity threshold
//! of the next maneuver, and derives turn instructions.
//!
//! Deciding what to say (`decide`) is pure; saying it is left to the caller
//! via the `announce` flag on [`Instruction`].

#[cfg(test)]
mod tests;

use crate::domain::types::{Coordinate, LocationSample, ManeuverType, Step};
use serde::Serialize;
use tracing::{debug, info};

/// Radius around a maneuver location that counts as "arrived at this step"
pub const PROXIMITY_THRESHOLD_M: f64 = 20.0;

/// Tracker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerPhase {
    Idle,
    Tracking,
}

/// Instruction produced for the current step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instruction {
    pub step_index: usize,
    pub text: String,
    /// First time this step produced an instruction
    pub announce: bool,
}

/// Result of the pure progress decision
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub step_index: usize,
    pub advanced: bool,
    pub distance_to_next_m: Option<f64>,
    pub instruction_text: Option<String>,
}

/// Outcome of feeding one sample to the tracker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressUpdate {
    pub advanced: bool,
    pub step_index: Option<usize>,
    pub instruction: Option<Instruction>,
}

/// Decide the next step index and instruction for a position.
///
/// At most one advance per call. `steps` must be non-empty and `index` in
/// bounds.
pub fn decide(steps: &[Step], index: usize, position: &Coordinate, threshold_m: f64) -> Decision {
    debug_assert!(index < steps.len());

    let mut step_index = index;
    let mut advanced = false;
    let mut distance_to_next_m = None;

    if let Some(next) = steps.get(index + 1) {
        let distance = position.distance_to(&next.maneuver_location);
        distance_to_next_m = Some(distance);
        if distance < threshold_m {
            step_index = index + 1;
            advanced = true;
        }
    }

    let current = &steps[step_index];
    let instruction_text = (current.maneuver_type == ManeuverType::Turn)
        .then(|| format!("Turn {}", current.instruction_text));

    Decision { step_index, advanced, distance_to_next_m, instruction_text }
}

/// Tracks progress along the active route
///
/// Holds no state while `Idle`. Invariant while `Tracking`:
/// `current_step_index < steps.len()`.
#[derive(Debug)]
pub struct RouteProgressTracker {
    steps: Vec<Step>,
    current_step_index: usize,
    last_announced_instruction: Option<String>,
    announced_step: Option<usize>,
    last_sample: Option<LocationSample>,
}

impl Default for RouteProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteProgressTracker {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            current_step_index: 0,
            last_announced_instruction: None,
            announced_step: None,
            last_sample: None,
        }
    }

    /// Adopt a new route's steps, resetting progress to the first step.
    /// An empty step list leaves the tracker idle.
    pub fn adopt(&mut self, steps: Vec<Step>) {
        self.clear();
        self.steps = steps;
        if !self.steps.is_empty() {
            info!(steps = %self.steps.len(), "tracker_route_adopted");
        }
    }

    /// Drop the active route and all progress
    pub fn clear(&mut self) {
        self.steps.clear();
        self.current_step_index = 0;
        self.last_announced_instruction = None;
        self.announced_step = None;
        self.last_sample = None;
    }

    pub fn phase(&self) -> TrackerPhase {
        if self.steps.is_empty() {
            TrackerPhase::Idle
        } else {
            TrackerPhase::Tracking
        }
    }

    pub fn current_step_index(&self) -> Option<usize> {
        (!self.steps.is_empty()).then_some(self.current_step_index)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn last_announced_instruction(&self) -> Option<&str> {
        self.last_announced_instruction.as_deref()
    }

    pub fn last_sample(&self) -> Option<&LocationSample> {
        self.last_sample.as_ref()
    }

    /// Feed one location sample.
    ///
    /// Ignored (empty update) when idle, when the coordinate is invalid, or
    /// when the sample is older than the last accepted one.
    pub fn update(&mut self, sample: &LocationSample) -> ProgressUpdate {
        if self.steps.is_empty() {
            return ProgressUpdate::default();
        }
        if !sample.coordinate.is_valid() {
            debug!(coordinate = %sample.coordinate, "tracker_sample_invalid");
            return ProgressUpdate::default();
        }
        if let Some(last) = &self.last_sample {
            if sample.timestamp < last.timestamp {
                debug!(
                    sample_ts = %sample.timestamp,
                    last_ts = %last.timestamp,
                    "tracker_sample_out_of_order"
                );
                return ProgressUpdate::default();
            }
        }
        self.last_sample = Some(*sample);

        let decision = decide(
            &self.steps,
            self.current_step_index,
            &sample.coordinate,
            PROXIMITY_THRESHOLD_M,
        );

        if decision.advanced {
            info!(
                from = %self.current_step_index,
                to = %decision.step_index,
                distance_m = %format!("{:.1}", decision.distance_to_next_m.unwrap_or_default()),
                "tracker_step_advanced"
            );
        }
        self.current_step_index = decision.step_index;

        let instruction = decision.instruction_text.map(|text| {
            let announce = self.announced_step != Some(decision.step_index);
            if announce {
                self.announced_step = Some(decision.step_index);
                self.last_announced_instruction = Some(text.clone());
            }
            Instruction { step_index: decision.step_index, text, announce }
        });

        ProgressUpdate {
            advanced: decision.advanced,
            step_index: Some(self.current_step_index),
            instruction,
        }
    }
}
