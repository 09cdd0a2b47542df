//! Draftsync demo harness.
//!
//! Drives a scripted wizard session against in-memory collaborators so the
//! sync lifecycle can be watched from a terminal: a typing burst coalescing
//! into one sync, an offline edit surfacing the error state, and the
//! recovery sync on reconnect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::sleep;

use draftsync_core::bus::{DraftChannel, InProcessBus};
use draftsync_core::clock::{Clock, SystemClock};
use draftsync_core::connectivity::ConnectivityMonitor;
use draftsync_core::models::Draft;
use draftsync_core::slot::{LocalPersistence, MemoryPersistence};
use draftsync_core::store::{DraftStore, StoreAck, StoreError, StoreResult};
use draftsync_core::{
    DraftEngine, DraftFields, EngineConfig, OwnerId, StatusSnapshot, SyncStatus,
};

#[derive(Parser)]
#[command(name = "draftsync")]
#[command(about = "Run a scripted listing-wizard session through the draft sync engine")]
#[command(version)]
struct Cli {
    /// Owner identity for the draft (defaults to a fresh anonymous id)
    #[arg(long)]
    owner: Option<String>,

    /// Debounce quiet period in milliseconds
    #[arg(long, default_value = "500")]
    debounce_ms: u64,

    /// Print the final draft as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("timed out waiting for sync status {0:?}")]
    StatusTimeout(SyncStatus),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// In-memory draft store with an offline switch, standing in for the
/// remote draft store API.
#[derive(Clone, Default)]
struct DemoStore {
    online: Arc<AtomicBool>,
    drafts: Arc<Mutex<HashMap<String, Draft>>>,
}

impl DemoStore {
    fn new() -> Self {
        Self {
            online: Arc::new(AtomicBool::new(true)),
            drafts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl DraftStore for DemoStore {
    async fn save_draft(&self, draft: Draft) -> StoreResult<StoreAck> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("network unavailable".to_string()));
        }
        let accepted_at = draft.updated_at;
        if let Ok(mut drafts) = self.drafts.lock() {
            drafts.insert(draft.owner_id.as_str().to_string(), draft);
        }
        Ok(StoreAck { accepted_at })
    }

    async fn load_draft(&self, owner_id: &OwnerId) -> StoreResult<Option<Draft>> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(StoreError::Unreachable("network unavailable".to_string()));
        }
        Ok(self
            .drafts
            .lock()
            .ok()
            .and_then(|drafts| drafts.get(owner_id.as_str()).cloned()))
    }
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("draftsync=info".parse().expect("valid directive")),
        )
        .init();

    let cli = Cli::parse();
    let owner = cli
        .owner
        .map_or_else(OwnerId::anonymous, OwnerId::new);
    let config = EngineConfig {
        debounce_window_ms: cli.debounce_ms,
        ..EngineConfig::default()
    };
    let debounce = Duration::from_millis(cli.debounce_ms);

    let store = DemoStore::new();
    let connectivity = ConnectivityMonitor::new(true);
    let engine = DraftEngine::new(
        config,
        owner.clone(),
        store.clone(),
        Arc::new(MemoryPersistence::new()) as Arc<dyn LocalPersistence>,
        Arc::new(InProcessBus::new()) as Arc<dyn DraftChannel>,
        connectivity.watch(),
        Arc::new(SystemClock::new()) as Arc<dyn Clock>,
    );
    let mut status_rx = engine.subscribe_status();

    println!("Session owner: {owner}");
    engine.hydrate();

    println!("\n-- Phase 1: typing burst --");
    for title in ["L", "Lux", "Luxury", "Luxury Penthouse"] {
        engine.update_draft(fields_with_title(title));
        sleep(debounce / 4).await;
    }
    let synced = wait_for(&mut status_rx, SyncStatus::Synced, debounce * 4).await?;
    println!(
        "Draft Saved (one sync for the whole burst, acknowledged at {})",
        synced.last_synced_at.unwrap_or_default()
    );

    println!("\n-- Phase 2: working offline --");
    store.set_online(false);
    connectivity.handle().set_online(false);
    let mut partial = DraftFields::new();
    partial.set("location", "Offline Lekki");
    engine.update_draft(partial);
    wait_for(&mut status_rx, SyncStatus::Error, debounce * 4).await?;
    println!("Sync Error (edits are safe in the local slot)");

    println!("\n-- Phase 3: reconnect --");
    store.set_online(true);
    connectivity.handle().set_online(true);
    wait_for(&mut status_rx, SyncStatus::Synced, debounce * 4).await?;
    println!("Draft Saved (recovery sync, no extra edit needed)");

    let draft = engine.draft();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&draft)?);
    } else {
        println!("\nFinal draft (version {}):", draft.version);
        for (key, value) in draft.fields.iter() {
            println!("  {key}: {value:?}");
        }
    }
    Ok(())
}

fn fields_with_title(title: &str) -> DraftFields {
    let mut fields = DraftFields::new();
    fields.set("title", title);
    fields
}

/// Wait until the status stream reports `want`, or fail after `timeout`.
async fn wait_for(
    status_rx: &mut watch::Receiver<StatusSnapshot>,
    want: SyncStatus,
    timeout: Duration,
) -> Result<StatusSnapshot, CliError> {
    let observed = tokio::time::timeout(timeout, async {
        loop {
            let snapshot = *status_rx.borrow_and_update();
            if snapshot.status == want {
                return snapshot;
            }
            if status_rx.changed().await.is_err() {
                return snapshot;
            }
        }
    })
    .await
    .map_err(|_| CliError::StatusTimeout(want))?;

    if observed.status == want {
        Ok(observed)
    } else {
        Err(CliError::StatusTimeout(want))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn demo_store_round_trips_drafts() {
        let store = DemoStore::new();
        let mut draft = Draft::new(OwnerId::new("op-1"), 100);
        draft.apply(fields_with_title("Two bed flat"), 150);

        store.save_draft(draft.clone()).await.unwrap();
        let loaded = store.load_draft(&OwnerId::new("op-1")).await.unwrap();
        assert_eq!(loaded, Some(draft));
    }

    #[tokio::test]
    async fn demo_store_fails_while_offline() {
        let store = DemoStore::new();
        store.set_online(false);
        let draft = Draft::new(OwnerId::new("op-1"), 100);
        assert!(store.save_draft(draft).await.is_err());
    }

    #[tokio::test]
    async fn wait_for_times_out_when_status_never_arrives() {
        let (tx, mut rx) = watch::channel(StatusSnapshot::new());
        let result = wait_for(&mut rx, SyncStatus::Synced, Duration::from_millis(50)).await;
        assert!(result.is_err());
        drop(tx);
    }
}
