//! Instruction announcement
//!
//! The navigator hands each new instruction to an `Announcer` exactly once.
//! `LogAnnouncer` writes it to the log; `CommandAnnouncer` additionally runs
//! an external program (e.g. a text-to-speech tool) with the text appended as
//! the final argument.

use crate::infra::config::Config;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Upper bound on how long an external announce command may run
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, step_index: usize, text: &str);
}

/// Logs instructions
#[derive(Debug, Default)]
pub struct LogAnnouncer;

#[async_trait]
impl Announcer for LogAnnouncer {
    async fn announce(&self, step_index: usize, text: &str) {
        info!(step = %step_index, text = %text, "instruction_announced");
    }
}

/// Logs instructions and runs `program args... <text>` for each one
#[derive(Debug)]
pub struct CommandAnnouncer {
    program: String,
    args: Vec<String>,
}

impl CommandAnnouncer {
    /// `None` when the command line is empty
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self { program: program.clone(), args: args.to_vec() })
    }
}

#[async_trait]
impl Announcer for CommandAnnouncer {
    async fn announce(&self, step_index: usize, text: &str) {
        info!(step = %step_index, text = %text, "instruction_announced");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(text).kill_on_drop(true);

        match tokio::time::timeout(COMMAND_TIMEOUT, cmd.status()).await {
            Ok(Ok(status)) if status.success() => {
                debug!(program = %self.program, "announce_command_done");
            }
            Ok(Ok(status)) => {
                warn!(program = %self.program, status = %status, "announce_command_failed");
            }
            Ok(Err(e)) => {
                warn!(program = %self.program, error = %e, "announce_command_spawn_failed");
            }
            Err(_) => {
                warn!(program = %self.program, timeout_secs = %COMMAND_TIMEOUT.as_secs(), "announce_command_timeout");
            }
        }
    }
}

/// Pick the announcer for the configured `announce.command`
pub fn announcer_from_config(config: &Config) -> Arc<dyn Announcer> {
    match CommandAnnouncer::new(config.announce_command()) {
        Some(announcer) => {
            info!(program = %announcer.program, "announce_command_enabled");
            Arc::new(announcer)
        }
        None => Arc::new(LogAnnouncer),
    }
}

/// Collects announcements for assertions
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingAnnouncer {
    pub announced: parking_lot::Mutex<Vec<(usize, String)>>,
}

#[cfg(test)]
impl RecordingAnnouncer {
    pub fn texts(&self) -> Vec<String> {
        self.announced.lock().iter().map(|(_, text)| text.clone()).collect()
    }
}

#[cfg(test)]
#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn announce(&self, step_index: usize, text: &str) {
        self.announced.lock().push((step_index, text.to_string()));
    }
}
