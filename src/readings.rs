//! Reading source glue.
//!
//! Selects where recent sensor readings come from based on connectivity:
//! the remote store's readings API while online, the local cache table while
//! offline. Whatever the source, readings older than the recency window or
//! not flagged valid are excluded before they ever reach the interpolator.

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::models::SensorReading;
use crate::remote::RemoteStore;
use crate::state::DeviceState;
use crate::storage::LocalCache;

// ---

/// Fetch the readings eligible for this compute cycle.
///
/// A remote query failure while online is a transient error: it propagates
/// so the caller can abort the cycle early (the device does not fall back to
/// possibly stale local data mid-cycle, and a query failure alone does not
/// flip the connectivity state).
pub async fn fetch_recent<R: RemoteStore>(
    remote: &R,
    local: &LocalCache,
    state: &DeviceState,
    cfg: &Config,
    now: DateTime<Utc>,
) -> Result<Vec<SensorReading>> {
    // ---
    let cutoff = now - cfg.reading_max_age();

    let readings = if state.online {
        remote.fetch_readings(&cfg.field_id, cutoff).await?
    } else {
        local.fetch_recent_readings(&cfg.field_id, cutoff).await?
    };

    // Both sources filter server-side, but the recency/validity contract is
    // enforced here regardless of where the rows came from
    let eligible: Vec<SensorReading> = readings
        .into_iter()
        .filter(|r| r.timestamp > cutoff && r.quality_flag == "valid")
        .collect();

    Ok(eligible)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::config::test_config;
    use crate::remote::testing::MockRemote;
    use crate::schema;
    use chrono::TimeZone;

    fn create_test_reading(sensor_id: &str, age_min: i64, flag: &str) -> SensorReading {
        // ---
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        SensorReading {
            sensor_id: sensor_id.to_string(),
            timestamp: now - chrono::Duration::minutes(age_min),
            latitude: 37.776,
            longitude: -122.415,
            moisture_surface: 0.2,
            moisture_root: 0.22,
            temp_surface: 19.0,
            battery_voltage: 3.6,
            quality_flag: flag.to_string(),
        }
    }

    #[tokio::test]
    async fn test_online_source_is_remote_with_filtering() {
        // ---
        let cfg = test_config();
        let remote = MockRemote::default();
        remote.readings.lock().unwrap().extend([
            create_test_reading("s-fresh", 5, "valid"),
            create_test_reading("s-stale", 30, "valid"),
            create_test_reading("s-bad", 5, "suspect"),
        ]);

        let local = LocalCache::open_in_memory().await.unwrap();
        schema::create_schema(local.pool()).await.unwrap();

        let state = DeviceState::new(true);
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        let readings = fetch_recent(&remote, &local, &state, &cfg, now).await.unwrap();

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].sensor_id, "s-fresh");
    }

    #[tokio::test]
    async fn test_offline_source_is_local_cache() {
        // ---
        let cfg = test_config();
        // Remote would fail if touched
        let remote = MockRemote::default();
        remote.set_reachable(false);

        let local = LocalCache::open_in_memory().await.unwrap();
        schema::create_schema(local.pool()).await.unwrap();

        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        sqlx::query(
            r#"
            INSERT INTO soil_readings (
                sensor_id, field_id, timestamp, latitude, longitude,
                moisture_surface, moisture_root, temp_surface,
                battery_voltage, quality_flag
            ) VALUES ('s-local', 'field-001', ?, 37.776, -122.415, 0.2, 0.22, 19.0, 3.6, 'valid')
            "#,
        )
        .bind(now - chrono::Duration::minutes(3))
        .execute(local.pool())
        .await
        .unwrap();

        let state = DeviceState::new(false);
        let readings = fetch_recent(&remote, &local, &state, &cfg, now).await.unwrap();

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].sensor_id, "s-local");
    }

    #[tokio::test]
    async fn test_remote_query_failure_propagates() {
        // ---
        let cfg = test_config();
        let remote = MockRemote::default();
        remote.set_reachable(false);

        let local = LocalCache::open_in_memory().await.unwrap();
        schema::create_schema(local.pool()).await.unwrap();

        // Online but the query fails: the cycle must see the error
        let state = DeviceState::new(true);
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        assert!(fetch_recent(&remote, &local, &state, &cfg, now).await.is_err());
    }
}
