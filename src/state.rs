//! Cross-cycle device state.
//!
//! The online flag and the pending-sync queue are the only state shared
//! between compute and sync cycles. The scheduler owns a single
//! [`DeviceState`] and lends it mutably to storage and sync calls; because
//! cycles are serialized on one task, the queue is never read and written
//! concurrently and no lock is needed. Tests inject a fresh state per case.

use crate::models::GridPoint;

/// Connectivity flag plus the backlog of grid points awaiting remote
/// delivery.
///
/// The queue is appended to whenever a remote write fails or the device is
/// offline, and drained only by a complete successful bulk write. It is
/// never partially truncated; a failed flush leaves it exactly as it was.
#[derive(Debug)]
pub struct DeviceState {
    // ---
    pub online: bool,
    pub pending_sync: Vec<GridPoint>,
}

impl DeviceState {
    pub fn new(online: bool) -> Self {
        // ---
        Self {
            online,
            pending_sync: Vec::new(),
        }
    }

    /// Append points to the pending-sync backlog, preserving order.
    pub fn queue_for_sync(&mut self, points: Vec<GridPoint>) {
        // ---
        self.pending_sync.extend(points);
    }
}
