//! Sync manager.
//!
//! Reconciles the pending-sync backlog with the remote store. Each sync tick
//! does at most two things: re-probe reachability when the device is marked
//! offline, and attempt one all-or-nothing bulk write of the entire backlog
//! when online. A failed flush leaves the queue byte-for-byte untouched so
//! the next tick retries the same backlog; there is no partial drain and
//! therefore no silent gap in the remote record.
//!
//! Connectivity state machine: `offline → online` only on a successful
//! probe; `online → offline` on any failed remote write (here or in the
//! storage manager). No intermediate states.

use anyhow::Result;

use crate::remote::RemoteStore;
use crate::state::DeviceState;

// ---

/// Run one sync cycle against the remote store.
///
/// Never returns an error for remote failures; they are absorbed into the
/// connectivity state and retried on a later tick.
pub async fn run_sync_cycle<R: RemoteStore>(remote: &R, state: &mut DeviceState) -> Result<()> {
    // ---
    if !state.online {
        match remote.ping().await {
            Ok(()) => {
                state.online = true;
                tracing::info!("Remote store reachable again, marking online");
            }
            Err(e) => {
                tracing::debug!("Reachability probe failed, staying offline: {:#}", e);
                return Ok(());
            }
        }
    }

    if state.pending_sync.is_empty() {
        return Ok(());
    }

    tracing::info!(
        "Syncing {} pending grid points to remote store",
        state.pending_sync.len()
    );

    match remote.write_grid(&state.pending_sync).await {
        Ok(()) => {
            state.pending_sync.clear();
            tracing::info!("Sync complete, backlog cleared");
        }
        Err(e) => {
            // Queue stays exactly as it was; next tick re-probes and retries
            tracing::warn!(
                "Sync failed, keeping {} points queued: {:#}",
                state.pending_sync.len(),
                e
            );
            state.online = false;
        }
    }

    Ok(())
}
