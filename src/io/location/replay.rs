//! Replay location source
//!
//! Plays back a fixed sequence of fixes at a constant interval. After the
//! last fix the source keeps re-emitting it, like a device standing still.
//!
//! File format is JSON lines:
//! `{"latitude": 37.7749, "longitude": -122.4194, "accuracy_m": 5.0}`
//! File fixes are stamped with the time they are emitted.

use super::{spawn_pump, ActiveSlot, LocationEvent, LocationOptions, LocationSource, RawFix, Subscription};
use crate::domain::error::LocationError;
use crate::domain::types::{Coordinate, LocationSample};
use chrono::Utc;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct ReplayRecord {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    accuracy_m: Option<f64>,
}

/// Parse JSON lines into fixes stamped at `Utc::now()`.
/// Blank lines and `#` comments are skipped.
pub fn parse_replay(content: &str) -> Result<Vec<LocationSample>, LocationError> {
    let now = Utc::now();
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(i, line)| {
            let record: ReplayRecord = serde_json::from_str(line).map_err(|e| {
                LocationError::Unavailable(format!("replay line {}: {e}", i + 1))
            })?;
            let sample = LocationSample::new(Coordinate::new(record.latitude, record.longitude), now);
            Ok(match record.accuracy_m {
                Some(a) => sample.with_accuracy(a),
                None => sample,
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
enum Script {
    File(PathBuf),
    Samples(Vec<LocationSample>),
}

/// Recorded or synthetic position feed
pub struct ReplayLocationSource {
    script: Script,
    interval: Duration,
    active: ActiveSlot,
}

impl ReplayLocationSource {
    /// Read fixes from a JSON lines file on each subscribe
    pub fn from_file(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self { script: Script::File(path.into()), interval, active: ActiveSlot::default() }
    }

    /// Emit the given fixes with their timestamps preserved
    pub fn from_samples(samples: Vec<LocationSample>, interval: Duration) -> Self {
        Self { script: Script::Samples(samples), interval, active: ActiveSlot::default() }
    }
}

impl LocationSource for ReplayLocationSource {
    fn subscribe(
        &self,
        options: LocationOptions,
        listener: mpsc::Sender<LocationEvent>,
    ) -> Subscription {
        let (subscription, cancel) = self.active.replace();
        let raw_tx = spawn_pump(options, listener, cancel.clone());
        tokio::spawn(run_replay(self.script.clone(), self.interval, raw_tx, cancel));
        subscription
    }
}

async fn load_script(script: Script) -> Result<(Vec<LocationSample>, bool), LocationError> {
    match script {
        Script::Samples(samples) => Ok((samples, false)),
        Script::File(path) => {
            let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                LocationError::Unavailable(format!("{}: {e}", path.display()))
            })?;
            let samples = parse_replay(&content)?;
            info!(file = %path.display(), fixes = %samples.len(), "replay_loaded");
            Ok((samples, true))
        }
    }
}

async fn run_replay(
    script: Script,
    period: Duration,
    raw_tx: mpsc::Sender<RawFix>,
    mut cancel: watch::Receiver<bool>,
) {
    let (samples, restamp) = match load_script(script).await {
        Ok((samples, _)) if samples.is_empty() => {
            let _ = raw_tx
                .send(RawFix::Failed(LocationError::Unavailable("replay has no fixes".to_string())))
                .await;
            return;
        }
        Ok(loaded) => loaded,
        Err(e) => {
            warn!(error = %e, "replay_load_failed");
            let _ = raw_tx.send(RawFix::Failed(e)).await;
            return;
        }
    };

    let mut ticker = interval(period.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let last = samples.len() - 1;
    let mut index = 0usize;

    loop {
        tokio::select! {
            _ = cancel.changed() => {
                debug!(index = %index, "replay_cancelled");
                return;
            }
            _ = ticker.tick() => {
                let mut sample = samples[index.min(last)];
                if restamp {
                    sample.timestamp = Utc::now();
                }
                if raw_tx.send(RawFix::Sample(sample)).await.is_err() {
                    return;
                }
                if index == last {
                    debug!("replay_holding_last_fix");
                }
                index = (index + 1).min(last + 1);
            }
        }
    }
}
