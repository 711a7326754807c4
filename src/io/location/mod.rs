//! Location sources - cancellable position subscriptions
//!
//! A source delivers `LocationEvent`s to a single listener channel. Every
//! source shares the same delivery rules, enforced by the pump task:
//! - at most one terminal error, and nothing after it
//! - invalid coordinates are dropped
//! - fixes older than the previous delivered fix are dropped
//! - fixes older than `max_sample_age` are dropped as stale
//! - no delivered fix for `timeout` reports `Timeout` once per gap; delivery
//!   resumes with the next accepted fix
//!
//! Sources:
//! - `gpsd` - device positioning via a gpsd daemon
//! - `replay` - recorded or synthetic sample sequences

pub mod gpsd;
pub mod replay;

pub use gpsd::GpsdLocationSource;
pub use replay::ReplayLocationSource;

use crate::domain::error::LocationError;
use crate::domain::types::LocationSample;
use crate::infra::config::{Config, LocationSourceKind};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Capacity of the internal raw fix channel between producer and pump
const RAW_CHANNEL_CAPACITY: usize = 64;

/// Subscription options
#[derive(Debug, Clone, PartialEq)]
pub struct LocationOptions {
    /// Request best available precision
    pub high_accuracy: bool,
    /// Max wait for a fix before `Timeout`; zero disables
    pub timeout: Duration,
    /// Reject fixes older than this
    pub max_sample_age: Option<Duration>,
}

impl Default for LocationOptions {
    fn default() -> Self {
        Self { high_accuracy: true, timeout: Duration::from_millis(5000), max_sample_age: None }
    }
}

impl LocationOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            high_accuracy: config.high_accuracy(),
            timeout: Duration::from_millis(config.location_timeout_ms()),
            max_sample_age: match config.max_sample_age_ms() {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }
}

/// What a listener receives
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    Sample(LocationSample),
    Error(LocationError),
}

/// A position provider
pub trait LocationSource: Send + Sync {
    /// Start delivering events to `listener`. Any previous subscription on
    /// this source is cancelled first.
    fn subscribe(
        &self,
        options: LocationOptions,
        listener: mpsc::Sender<LocationEvent>,
    ) -> Subscription;
}

/// Handle to an active subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    cancel: Arc<watch::Sender<bool>>,
}

impl Subscription {
    /// Permanently stop delivery. Idempotent.
    pub fn unsubscribe(&self) {
        if !self.cancel.send_replace(true) {
            debug!("location_unsubscribed");
        }
    }

    pub fn is_active(&self) -> bool {
        !*self.cancel.borrow()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Tracks the single active subscription of a source
#[derive(Debug, Default)]
pub(crate) struct ActiveSlot {
    current: Mutex<Option<Arc<watch::Sender<bool>>>>,
}

impl ActiveSlot {
    /// Cancel the previous subscription and register a new one
    pub(crate) fn replace(&self) -> (Subscription, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        let tx = Arc::new(tx);
        if let Some(previous) = self.current.lock().replace(tx.clone()) {
            previous.send_replace(true);
        }
        (Subscription { cancel: tx }, rx)
    }
}

/// Producer-side message; the pump turns these into listener events
#[derive(Debug)]
pub(crate) enum RawFix {
    Sample(LocationSample),
    Failed(LocationError),
}

/// Why a fix was not delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    InvalidCoordinate,
    OutOfOrder,
    Stale,
}

/// Ordering, validity and staleness rules for delivered fixes
#[derive(Debug)]
pub struct SampleFilter {
    max_age: Option<Duration>,
    last_delivered: Option<DateTime<Utc>>,
}

impl SampleFilter {
    pub fn new(max_age: Option<Duration>) -> Self {
        Self { max_age, last_delivered: None }
    }

    /// Check a fix against `now`; accepted fixes advance the ordering floor
    pub fn accept(&mut self, sample: &LocationSample, now: DateTime<Utc>) -> Result<(), Rejection> {
        if !sample.coordinate.is_valid() {
            return Err(Rejection::InvalidCoordinate);
        }
        if self.last_delivered.is_some_and(|last| sample.timestamp < last) {
            return Err(Rejection::OutOfOrder);
        }
        if let Some(max_age) = self.max_age {
            let age = now.signed_duration_since(sample.timestamp);
            if age.to_std().is_ok_and(|age| age > max_age) {
                return Err(Rejection::Stale);
            }
        }
        self.last_delivered = Some(sample.timestamp);
        Ok(())
    }
}

/// Spawn the pump for one subscription, returning the producer side
pub(crate) fn spawn_pump(
    options: LocationOptions,
    listener: mpsc::Sender<LocationEvent>,
    cancel: watch::Receiver<bool>,
) -> mpsc::Sender<RawFix> {
    let (raw_tx, raw_rx) = mpsc::channel(RAW_CHANNEL_CAPACITY);
    tokio::spawn(pump(options, raw_rx, listener, cancel));
    raw_tx
}

async fn pump(
    options: LocationOptions,
    mut raw_rx: mpsc::Receiver<RawFix>,
    listener: mpsc::Sender<LocationEvent>,
    mut cancel: watch::Receiver<bool>,
) {
    let mut filter = SampleFilter::new(options.max_sample_age);
    let timeout_enabled = !options.timeout.is_zero();
    let mut deadline = Instant::now() + options.timeout;
    // Disarmed after a timeout until the next delivered fix
    let mut timeout_armed = true;

    let failure = loop {
        if *cancel.borrow() {
            return;
        }
        tokio::select! {
            biased;
            changed = cancel.changed() => {
                // Err means every handle is gone
                if changed.is_err() || *cancel.borrow() {
                    return;
                }
            }
            raw = raw_rx.recv() => match raw {
                Some(RawFix::Sample(sample)) => {
                    match filter.accept(&sample, Utc::now()) {
                        Ok(()) => {
                            if *cancel.borrow() {
                                return;
                            }
                            if listener.send(LocationEvent::Sample(sample)).await.is_err() {
                                debug!("location_listener_closed");
                                return;
                            }
                            deadline = Instant::now() + options.timeout;
                            timeout_armed = true;
                        }
                        Err(reason) => {
                            debug!(reason = ?reason, ts = %sample.timestamp, "location_sample_rejected");
                        }
                    }
                }
                Some(RawFix::Failed(e)) => break e,
                None => break LocationError::Unavailable("position stream ended".to_string()),
            },
            _ = sleep_until(deadline), if timeout_enabled && timeout_armed => {
                timeout_armed = false;
                let timeout = LocationError::Timeout(options.timeout.as_millis() as u64);
                warn!(error = %timeout, "location_fix_timeout");
                if listener.send(LocationEvent::Error(timeout)).await.is_err() {
                    debug!("location_listener_closed");
                    return;
                }
            }
        }
    };

    if *cancel.borrow() {
        return;
    }
    warn!(error = %failure, "location_subscription_failed");
    let _ = listener.send(LocationEvent::Error(failure)).await;
    // Ends the producer too
    drop(raw_rx);
}

/// Build the configured location source
pub fn source_from_config(config: &Config) -> Box<dyn LocationSource> {
    match config.location_source() {
        LocationSourceKind::Gpsd => {
            info!(addr = %config.gpsd_addr(), "location_source_gpsd");
            Box::new(GpsdLocationSource::new(config.gpsd_addr()))
        }
        LocationSourceKind::Replay => {
            let path = config.replay_file().unwrap_or_default();
            info!(file = %path, interval_ms = %config.replay_interval().as_millis(), "location_source_replay");
            Box::new(ReplayLocationSource::from_file(path, config.replay_interval()))
        }
    }
}
