use anyhow::Result;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

mod api;
mod guard;
mod models;
mod signals;
mod synchronizer;
mod validation;

use common::storage::{SharedStorage, StorageConfig};

use crate::api::{ApiClient, ApiConfig};
use crate::signals::{FocusSignal, SignalConfig, SignalDriver};
use crate::synchronizer::SessionSynchronizer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting session service");

    // Open persisted storage
    let storage_config = StorageConfig::from_env()?;
    let storage = SharedStorage::open(&storage_config)?;

    // Build the synchronizer and start its reconciliation triggers
    let synchronizer = SessionSynchronizer::new(storage.context());
    let focus = FocusSignal::new();
    let signal_config = SignalConfig::from_env()?;
    let _driver = SignalDriver::spawn(&synchronizer, &focus, &signal_config);

    info!("Session service initialized successfully");

    // When storage already holds a session, refresh the profile so the
    // mirrored record is current
    let api_config = ApiConfig::from_env()?;
    let api_client = ApiClient::new(&api_config, synchronizer.clone())?;

    if guard::has_active_session(synchronizer.context()) {
        match api_client.fetch_profile().await {
            Ok(user) => info!("Refreshed profile for user: {}", user.id),
            Err(e) => warn!("Profile refresh failed: {}", e),
        }
    }

    // Log session state transitions until shutdown
    let mut states = synchronizer.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down session service");
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                info!(
                    "Session state: authenticated={} user={:?}",
                    state.is_authenticated,
                    state.current_user.as_ref().map(|u| u.id.as_str())
                );
            }
        }
    }

    Ok(())
}
