//! Announce worker - speaks instructions off the navigator loop
//!
//! The navigator enqueues each newly produced instruction; the worker hands
//! it to the configured `Announcer`, which may run an external program.

use crate::infra::metrics::Metrics;
use crate::io::announcer::Announcer;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// An instruction waiting to be announced
#[derive(Debug, Clone, PartialEq)]
pub struct AnnounceCmd {
    pub step_index: usize,
    pub text: String,
    /// When the command was enqueued (for queue delay measurement)
    pub enqueued_at: Instant,
}

impl AnnounceCmd {
    pub fn new(step_index: usize, text: impl Into<String>) -> Self {
        Self { step_index, text: text.into(), enqueued_at: Instant::now() }
    }
}

pub struct AnnounceWorker {
    announcer: Arc<dyn Announcer>,
    cmd_rx: mpsc::Receiver<AnnounceCmd>,
    metrics: Arc<Metrics>,
}

impl AnnounceWorker {
    pub fn new(
        announcer: Arc<dyn Announcer>,
        cmd_rx: mpsc::Receiver<AnnounceCmd>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { announcer, cmd_rx, metrics }
    }

    /// Run until every sender is dropped
    pub async fn run(mut self) {
        info!("announce_worker_started");

        while let Some(cmd) = self.cmd_rx.recv().await {
            let queue_delay_ms = cmd.enqueued_at.elapsed().as_millis() as u64;
            self.announcer.announce(cmd.step_index, &cmd.text).await;
            self.metrics.record_instruction_announced();

            debug!(step = %cmd.step_index, queue_delay_ms = %queue_delay_ms, "announce_processed");
            if queue_delay_ms > 1000 {
                warn!(step = %cmd.step_index, queue_delay_ms = %queue_delay_ms, "announce_queue_delay_high");
            }
        }

        info!("announce_worker_stopped");
    }
}

/// Create the announce channel and its worker.
///
/// Returns the sender (for the navigator) and the worker (to be spawned)
pub fn create_announce_worker(
    announcer: Arc<dyn Announcer>,
    metrics: Arc<Metrics>,
    buffer_size: usize,
) -> (mpsc::Sender<AnnounceCmd>, AnnounceWorker) {
    let (cmd_tx, cmd_rx) = mpsc::channel(buffer_size);
    (cmd_tx, AnnounceWorker::new(announcer, cmd_rx, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::announcer::RecordingAnnouncer;

    #[tokio::test]
    async fn test_worker_announces_in_order() {
        let recorder = Arc::new(RecordingAnnouncer::default());
        let metrics = Arc::new(Metrics::new());
        let (tx, worker) = create_announce_worker(recorder.clone(), metrics.clone(), 8);

        tx.send(AnnounceCmd::new(1, "Turn Turn left")).await.unwrap();
        tx.send(AnnounceCmd::new(2, "Turn Turn right")).await.unwrap();
        drop(tx);
        worker.run().await;

        assert_eq!(recorder.texts(), vec!["Turn Turn left", "Turn Turn right"]);
        assert_eq!(metrics.instructions_announced(), 2);
    }
}
