//! Cooperative compute/sync scheduler.
//!
//! One task, two independent fixed-interval timers. Whichever timer fires,
//! the corresponding cycle runs to completion before the next tick is even
//! considered, so compute and sync never interleave. Both cycles mutate the
//! shared device state (online flag, pending queue); serializing them on a
//! single task removes that whole class of races without any lock.
//!
//! Cycle errors are contained here: they are logged with the field id and
//! cycle type and never escape to crash the loop.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::Config;
use crate::grid;
use crate::interpolate;
use crate::readings;
use crate::remote::RemoteStore;
use crate::state::DeviceState;
use crate::storage::{self, LocalCache};
use crate::sync;

// ---

/// Owns the device state and drives the compute and sync cycles.
pub struct Scheduler<R: RemoteStore> {
    // ---
    cfg: Config,
    local: LocalCache,
    remote: R,
    state: DeviceState,
}

impl<R: RemoteStore> Scheduler<R> {
    pub fn new(cfg: Config, local: LocalCache, remote: R, initially_online: bool) -> Self {
        // ---
        Self {
            cfg,
            local,
            remote,
            state: DeviceState::new(initially_online),
        }
    }

    /// Run the scheduler loop forever.
    ///
    /// Timers fire first after one full interval (not immediately), and a
    /// tick missed while a long cycle runs is delayed rather than bursted.
    pub async fn run(&mut self) {
        // ---
        let compute_period = Duration::from_secs(u64::from(self.cfg.compute_interval_sec));
        let sync_period = Duration::from_secs(u64::from(self.cfg.sync_interval_sec));

        let mut compute_timer = interval_at(Instant::now() + compute_period, compute_period);
        let mut sync_timer = interval_at(Instant::now() + sync_period, sync_period);
        compute_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        sync_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Scheduler running: compute every {}s, sync every {}s",
            self.cfg.compute_interval_sec,
            self.cfg.sync_interval_sec
        );

        loop {
            tokio::select! {
                _ = compute_timer.tick() => {
                    if let Err(e) = self.run_compute_cycle().await {
                        tracing::error!(
                            "Compute cycle failed for field {}: {:#}",
                            self.cfg.field_id,
                            e
                        );
                    }
                }
                _ = sync_timer.tick() => {
                    if let Err(e) = self.run_sync_cycle().await {
                        tracing::error!(
                            "Sync cycle failed for field {}: {:#}",
                            self.cfg.field_id,
                            e
                        );
                    }
                }
            }
        }
    }

    /// One full compute cycle: fetch readings, interpolate the grid, store.
    pub async fn run_compute_cycle(&mut self) -> Result<()> {
        // ---
        tracing::info!("Starting virtual grid computation for field {}", self.cfg.field_id);
        let started = std::time::Instant::now();
        let now = Utc::now();

        let readings =
            readings::fetch_recent(&self.remote, &self.local, &self.state, &self.cfg, now)
                .await?;

        if readings.len() < self.cfg.min_sensors as usize {
            // Not an error: the field just gets no grid this cycle
            tracing::info!(
                "Insufficient sensors: {} (minimum {} required), skipping cycle",
                readings.len(),
                self.cfg.min_sensors
            );
            return Ok(());
        }

        let coords = grid::generate_grid_points(&self.cfg.field_extent(), self.cfg.grid_resolution_m);
        tracing::debug!("Generated {} grid coordinates", coords.len());

        let mut points = Vec::with_capacity(coords.len());
        for coord in &coords {
            if let Some(point) = interpolate::interpolate(coord, &readings, &self.cfg, now) {
                points.push(point);
            }
        }

        let computed = points.len();
        storage::store_grid(&self.local, &self.remote, &mut self.state, points).await?;

        tracing::info!(
            "Grid computation complete: {} of {} points in {:.2}s",
            computed,
            coords.len(),
            started.elapsed().as_secs_f64()
        );

        Ok(())
    }

    /// One full sync cycle; see [`sync::run_sync_cycle`].
    pub async fn run_sync_cycle(&mut self) -> Result<()> {
        // ---
        sync::run_sync_cycle(&self.remote, &mut self.state).await
    }

    #[cfg(test)]
    pub fn state(&self) -> &DeviceState {
        // ---
        &self.state
    }

    #[cfg(test)]
    pub fn local(&self) -> &LocalCache {
        // ---
        &self.local
    }
}
