//! gpsd client
//!
//! Protocol: connect to gpsd (default 127.0.0.1:2947), send
//! `?WATCH={"enable":true,"json":true};`, then read one JSON report per line.
//! Only `TPV` reports with a usable fix become samples.

use super::{spawn_pump, ActiveSlot, LocationEvent, LocationOptions, LocationSource, RawFix, Subscription};
use crate::domain::error::LocationError;
use crate::domain::types::{Coordinate, LocationSample};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::io::ErrorKind;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

const WATCH_COMMAND: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";

/// gpsd fix modes
const MODE_2D: u8 = 2;
const MODE_3D: u8 = 3;

#[derive(Debug, Deserialize)]
struct GpsdReport {
    class: String,
    #[serde(default)]
    mode: u8,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    /// Estimated horizontal position error (m)
    #[serde(default)]
    eph: Option<f64>,
    #[serde(default)]
    epx: Option<f64>,
    #[serde(default)]
    epy: Option<f64>,
}

/// Parse one gpsd report line into a sample.
///
/// `high_accuracy` requires a 3D fix; otherwise 2D fixes are accepted.
/// Non-TPV reports and fixes without position yield `None`.
pub fn parse_tpv(line: &str, high_accuracy: bool) -> Option<LocationSample> {
    let report: GpsdReport = serde_json::from_str(line).ok()?;
    if report.class != "TPV" {
        return None;
    }
    let min_mode = if high_accuracy { MODE_3D } else { MODE_2D };
    if report.mode < min_mode {
        return None;
    }

    let coordinate = Coordinate::new(report.lat?, report.lon?);
    let timestamp = report
        .time
        .as_deref()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let accuracy = report.eph.or(match (report.epx, report.epy) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, y) => x.or(y),
    });

    let sample = LocationSample::new(coordinate, timestamp);
    Some(match accuracy {
        Some(a) => sample.with_accuracy(a),
        None => sample,
    })
}

/// Map a socket error onto the location error kinds
fn classify_io_error(e: &std::io::Error) -> LocationError {
    match e.kind() {
        ErrorKind::PermissionDenied => LocationError::Denied(e.to_string()),
        _ => LocationError::Unavailable(e.to_string()),
    }
}

/// Device positioning through a gpsd daemon
pub struct GpsdLocationSource {
    addr: String,
    active: ActiveSlot,
}

impl GpsdLocationSource {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), active: ActiveSlot::default() }
    }
}

impl LocationSource for GpsdLocationSource {
    fn subscribe(
        &self,
        options: LocationOptions,
        listener: mpsc::Sender<LocationEvent>,
    ) -> Subscription {
        let (subscription, cancel) = self.active.replace();
        let high_accuracy = options.high_accuracy;
        let raw_tx = spawn_pump(options, listener, cancel.clone());
        tokio::spawn(run_gpsd(self.addr.clone(), high_accuracy, raw_tx, cancel));
        subscription
    }
}

async fn run_gpsd(
    addr: String,
    high_accuracy: bool,
    raw_tx: mpsc::Sender<RawFix>,
    mut cancel: watch::Receiver<bool>,
) {
    let stream = match TcpStream::connect(&addr).await {
        Ok(stream) => stream,
        Err(e) => {
            let _ = raw_tx.send(RawFix::Failed(classify_io_error(&e))).await;
            return;
        }
    };
    let (read_half, mut write_half) = stream.into_split();

    if let Err(e) = write_half.write_all(WATCH_COMMAND).await {
        let _ = raw_tx.send(RawFix::Failed(classify_io_error(&e))).await;
        return;
    }
    info!(addr = %addr, high_accuracy = %high_accuracy, "gpsd_watch_started");

    let mut lines = BufReader::new(read_half).lines();
    loop {
        tokio::select! {
            _ = cancel.changed() => {
                debug!(addr = %addr, "gpsd_watch_cancelled");
                return;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(sample) = parse_tpv(&line, high_accuracy) {
                        if raw_tx.send(RawFix::Sample(sample)).await.is_err() {
                            return;
                        }
                    }
                }
                Ok(None) => {
                    let _ = raw_tx
                        .send(RawFix::Failed(LocationError::Unavailable(
                            "gpsd closed the connection".to_string(),
                        )))
                        .await;
                    return;
                }
                Err(e) => {
                    let _ = raw_tx.send(RawFix::Failed(classify_io_error(&e))).await;
                    return;
                }
            }
        }
    }
}
