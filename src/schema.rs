//! Local cache schema management.
//!
//! Ensures the SQLite tables backing the edge device exist before the
//! scheduler starts. Applied once on startup from `main.rs`; safe to call on
//! every startup since all statements are idempotent.

use anyhow::Result;
use sqlx::SqlitePool;

// ---

/// Create or update the local cache schema (idempotent).
///
/// Two tables: `grid_points` holds every computed grid point (the durable
/// record the remote store is eventually reconciled against), and
/// `soil_readings` is the local readings cache populated by the radio ingest
/// path and queried here when the device is offline.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Every computed grid point, keyed by cell and computation time so a
    // later cycle supersedes rather than overwrites
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS grid_points (
            grid_id          TEXT NOT NULL,
            field_id         TEXT NOT NULL,
            timestamp        TEXT NOT NULL,
            latitude         REAL NOT NULL,
            longitude        REAL NOT NULL,
            moisture_surface REAL NOT NULL,
            moisture_root    REAL NOT NULL,
            temperature      REAL NOT NULL,
            water_deficit_mm REAL NOT NULL,
            stress_index     REAL NOT NULL,
            irrigation_need  TEXT NOT NULL,
            source_sensors   TEXT NOT NULL,
            confidence       REAL NOT NULL,
            computation_mode TEXT NOT NULL,
            edge_device_id   TEXT NOT NULL,
            PRIMARY KEY (grid_id, timestamp)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Readings cache used as the offline reading source
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS soil_readings (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            sensor_id        TEXT NOT NULL,
            field_id         TEXT NOT NULL,
            timestamp        TEXT NOT NULL,
            latitude         REAL NOT NULL,
            longitude        REAL NOT NULL,
            moisture_surface REAL NOT NULL,
            moisture_root    REAL NOT NULL,
            temp_surface     REAL NOT NULL,
            battery_voltage  REAL NOT NULL,
            quality_flag     TEXT NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Basic indexes for the recency queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_soil_readings_field_ts
            ON soil_readings (field_id, timestamp);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_grid_points_field_ts
            ON grid_points (field_id, timestamp);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
