//! Grid point storage.
//!
//! Every computed point is written to the local durable cache first; only
//! then is a remote write attempted, and only while the device believes it
//! is online. A failed remote write flips the device offline and moves the
//! whole batch onto the pending-sync queue. This ordering is the source of
//! the core invariant: nothing ever exists remotely that did not first exist
//! locally.
//!
//! A local write failure is not swallowed: it aborts the compute cycle as an
//! error, because without the local record the device would be able to lose
//! data silently while offline.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::models::{GridPoint, SensorReading};
use crate::remote::RemoteStore;
use crate::state::DeviceState;

// ---

/// Durable local cache backed by SQLite.
pub struct LocalCache {
    // ---
    pool: SqlitePool,
}

impl LocalCache {
    /// Open (creating if missing) the cache database at `path`.
    ///
    /// Failure here is fatal to the process: without local durability the
    /// device has no safe mode of operation.
    pub async fn open(path: &str) -> Result<Self> {
        // ---
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open local cache '{}'", path))?;

        Ok(Self { pool })
    }

    /// In-memory cache for tests.
    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        // ---
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        // ---
        &self.pool
    }

    /// Persist a batch of grid points in one transaction.
    ///
    /// `INSERT OR REPLACE` keyed on (grid_id, timestamp) makes recomputation
    /// of the same cell in the same cycle idempotent, while later cycles add
    /// new rows instead of touching old ones.
    pub async fn store_points(&self, points: &[GridPoint]) -> Result<()> {
        // ---
        let mut tx = self.pool.begin().await.context("Local cache unavailable")?;

        for point in points {
            let source_sensors = serde_json::to_string(&point.source_sensors)?;

            sqlx::query(
                r#"
                INSERT OR REPLACE INTO grid_points (
                    grid_id, field_id, timestamp, latitude, longitude,
                    moisture_surface, moisture_root, temperature,
                    water_deficit_mm, stress_index, irrigation_need,
                    source_sensors, confidence, computation_mode, edge_device_id
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&point.grid_id)
            .bind(&point.field_id)
            .bind(point.timestamp)
            .bind(point.latitude)
            .bind(point.longitude)
            .bind(point.moisture_surface)
            .bind(point.moisture_root)
            .bind(point.temperature)
            .bind(point.water_deficit_mm)
            .bind(point.stress_index)
            .bind(point.irrigation_need.as_str())
            .bind(&source_sensors)
            .bind(point.confidence)
            .bind(&point.computation_mode)
            .bind(&point.edge_device_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Local write failed for grid point {}", point.grid_id))?;
        }

        tx.commit().await.context("Local write commit failed")?;
        Ok(())
    }

    /// Recent valid readings for a field from the local readings cache.
    pub async fn fetch_recent_readings(
        &self,
        field_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SensorReading>> {
        // ---
        let readings = sqlx::query_as::<_, SensorReading>(
            r#"
            SELECT sensor_id, timestamp, latitude, longitude,
                   moisture_surface, moisture_root, temp_surface,
                   battery_voltage, quality_flag
            FROM soil_readings
            WHERE field_id = ?
              AND timestamp > ?
              AND quality_flag = 'valid'
            ORDER BY timestamp DESC
            "#,
        )
        .bind(field_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .context("Local readings query failed")?;

        Ok(readings)
    }

    /// Number of grid point rows, for diagnostics and tests.
    pub async fn grid_point_count(&self) -> Result<i64> {
        // ---
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM grid_points")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// ---

/// Store a batch of computed grid points: local cache first, then remote if
/// the device is online, with failed or skipped remote writes queued for the
/// sync manager.
///
/// Returns an error only for a local write failure; remote failures are
/// absorbed into the connectivity state and the queue.
pub async fn store_grid<R: RemoteStore>(
    local: &LocalCache,
    remote: &R,
    state: &mut DeviceState,
    points: Vec<GridPoint>,
) -> Result<()> {
    // ---
    if points.is_empty() {
        return Ok(());
    }

    // Local durability comes first, unconditionally
    local.store_points(&points).await?;
    tracing::info!("Stored {} points to local cache", points.len());

    if state.online {
        match remote.write_grid(&points).await {
            Ok(()) => {
                tracing::info!("Stored {} points to remote store", points.len());
            }
            Err(e) => {
                tracing::warn!("Remote write failed, queuing for sync: {:#}", e);
                state.online = false;
                state.queue_for_sync(points);
            }
        }
    } else {
        tracing::debug!("Device offline, queuing {} points for sync", points.len());
        state.queue_for_sync(points);
    }

    Ok(())
}
