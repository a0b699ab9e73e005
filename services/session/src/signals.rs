//! Reconciliation triggers for the session synchronizer
//!
//! Wires the four signal paths that keep a synchronizer fresh: one
//! reconciliation at startup, cross-context storage events scoped to the
//! two session keys, a focus signal fed by the embedding shell, and a
//! fixed-period repair timer. The timer is not a primary path; it bounds
//! staleness for storage writes that emit no event, because change
//! events are never delivered to the context that wrote them.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::synchronizer::{SessionSynchronizer, TOKEN_KEY, USER_KEY};

/// Configuration for the signal driver
#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Repair-timer period in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            poll_interval_ms: 1000,
        }
    }
}

impl SignalConfig {
    /// Create a new SignalConfig from environment variables
    ///
    /// # Environment Variables
    /// - `SESSION_POLL_INTERVAL_MS`: repair-timer period in milliseconds (default: 1000)
    pub fn from_env() -> Result<Self> {
        let poll_interval_ms = std::env::var("SESSION_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .unwrap_or(1000);

        Ok(SignalConfig { poll_interval_ms })
    }
}

/// Signal the embedding shell raises when the context regains focus
#[derive(Clone)]
pub struct FocusSignal {
    tx: broadcast::Sender<()>,
}

impl FocusSignal {
    /// Create a new focus signal
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        FocusSignal { tx }
    }

    /// Report that the context regained input focus
    pub fn notify(&self) {
        // Send fails only when nobody is listening, which is fine
        let _ = self.tx.send(());
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

impl Default for FocusSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the background tasks that trigger reconciliation
///
/// Dropping the driver aborts all of its tasks, so signal listeners and
/// the repair timer never outlive the owning context.
pub struct SignalDriver {
    tasks: Vec<JoinHandle<()>>,
}

impl SignalDriver {
    /// Run the initial reconciliation and spawn the signal tasks
    pub fn spawn(
        synchronizer: &SessionSynchronizer,
        focus: &FocusSignal,
        config: &SignalConfig,
    ) -> Self {
        // Subscriptions are taken before any task runs so that no event
        // raised after this call can be missed
        let mut storage_events = synchronizer.context().subscribe();
        let mut focus_events = focus.subscribe();
        let poll_interval = Duration::from_millis(config.poll_interval_ms.max(1));

        synchronizer.reconcile();

        let mut tasks = Vec::with_capacity(3);

        let storage_sync = synchronizer.clone();
        tasks.push(tokio::spawn(async move {
            while let Some(event) = storage_events.recv().await {
                if event.key == TOKEN_KEY || event.key == USER_KEY {
                    debug!("Storage change on {}, reconciling", event.key);
                    storage_sync.reconcile();
                }
            }
        }));

        let focus_sync = synchronizer.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                match focus_events.recv().await {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        debug!("Focus regained, reconciling");
                        focus_sync.reconcile();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));

        let timer_sync = synchronizer.clone();
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                timer_sync.reconcile();
            }
        }));

        info!(
            "Session signal driver started (poll interval: {:?})",
            poll_interval
        );

        SignalDriver { tasks }
    }
}

impl Drop for SignalDriver {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
