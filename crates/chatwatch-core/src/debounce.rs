//! Trailing-edge debounce for page re-scans.
//!
//! A burst of triggers closer together than the window produces exactly one
//! call to the action, one window after the last trigger.

use crate::{ChatwatchError, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::trace;

/// Quiet periods for the three re-scan sources, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DebounceWindows {
    #[serde(default = "default_mutation_ms")]
    pub mutation_ms: u64,
    #[serde(default = "default_input_ms")]
    pub input_ms: u64,
    #[serde(default = "default_focus_ms")]
    pub focus_ms: u64,
}

fn default_mutation_ms() -> u64 {
    500
}

fn default_input_ms() -> u64 {
    1000
}

fn default_focus_ms() -> u64 {
    300
}

impl Default for DebounceWindows {
    fn default() -> Self {
        Self {
            mutation_ms: default_mutation_ms(),
            input_ms: default_input_ms(),
            focus_ms: default_focus_ms(),
        }
    }
}

/// Handle to a debounce task. Dropping it flushes a pending call and stops the task.
pub struct Debouncer {
    name: &'static str,
    window: Duration,
    trigger_tx: mpsc::UnboundedSender<()>,
}

impl Debouncer {
    /// Spawn the debounce task on the current tokio runtime.
    pub fn spawn<F>(name: &'static str, window: Duration, mut action: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel::<()>();

        tokio::spawn(async move {
            // Idle until the first trigger of a burst
            while trigger_rx.recv().await.is_some() {
                loop {
                    tokio::select! {
                        next = trigger_rx.recv() => {
                            if next.is_none() {
                                action();
                                return;
                            }
                            trace!(target: "chatwatch::debounce", "{}: timer reset", name);
                        }
                        _ = tokio::time::sleep(window) => {
                            trace!(target: "chatwatch::debounce", "{}: firing", name);
                            action();
                            break;
                        }
                    }
                }
            }
        });

        Self {
            name,
            window,
            trigger_tx,
        }
    }

    /// Record an event; restarts the quiet period.
    pub fn trigger(&self) -> Result<()> {
        self.trigger_tx
            .send(())
            .map_err(|_| ChatwatchError::ChannelInvalid)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// The independent debouncers that drive a re-scan: DOM mutations, typing in
/// an editable field, and focusing one.
pub struct RescanTriggers {
    pub mutation: Debouncer,
    pub input: Debouncer,
    pub focus: Debouncer,
}

impl RescanTriggers {
    pub fn spawn(windows: DebounceWindows, rescan: Arc<dyn Fn() + Send + Sync>) -> Self {
        let action = |rescan: &Arc<dyn Fn() + Send + Sync>| {
            let rescan = rescan.clone();
            move || (*rescan)()
        };
        Self {
            mutation: Debouncer::spawn(
                "mutation",
                Duration::from_millis(windows.mutation_ms),
                action(&rescan),
            ),
            input: Debouncer::spawn(
                "input",
                Duration::from_millis(windows.input_ms),
                action(&rescan),
            ),
            focus: Debouncer::spawn(
                "focus",
                Duration::from_millis(windows.focus_ms),
                action(&rescan),
            ),
        }
    }
}
