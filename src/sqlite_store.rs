//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation onto the schema created by
//! [`migrate::apply_schema`](crate::migrate::apply_schema). Timestamps are
//! stored as unix milliseconds and ordered with `id` as a tie-breaker.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use visionaid_core::models::{
    EmergencyLogEntry, NewEmergencyLog, NewScanLog, Preferences, ProfileUpdate, ScanKind,
    ScanLogEntry, UserProfile,
};
use visionaid_core::store::{now_millis, Store};

/// The fixed primary key of the only `users` row.
const USER_ROW_ID: i64 = 1;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| anyhow!("timestamp out of range: {}", ms))
}

fn scan_from_row(row: &SqliteRow) -> Result<ScanLogEntry> {
    let kind: String = row.try_get("type")?;
    Ok(ScanLogEntry {
        id: row.try_get("id")?,
        kind: kind.parse::<ScanKind>().map_err(|e| anyhow!(e))?,
        result: row.try_get("result")?,
        confidence: row.try_get("confidence")?,
        timestamp: from_millis(row.try_get("timestamp")?)?,
    })
}

fn emergency_from_row(row: &SqliteRow) -> Result<EmergencyLogEntry> {
    Ok(EmergencyLogEntry {
        id: row.try_get("id")?,
        location_lat: row.try_get("location_lat")?,
        location_lng: row.try_get("location_lng")?,
        status: row.try_get("status")?,
        timestamp: from_millis(row.try_get("timestamp")?)?,
    })
}

fn user_from_row(row: &SqliteRow) -> Result<UserProfile> {
    let preferences_json: Option<String> = row.try_get("preferences_json")?;
    let preferences = match preferences_json {
        Some(json) => serde_json::from_str::<Option<Preferences>>(&json)
            .context("Invalid preferences_json in users row")?,
        None => None,
    };
    Ok(UserProfile {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        emergency_contact: row.try_get("emergency_contact")?,
        alternate_contact: row.try_get("alternate_contact")?,
        language: row.try_get("language")?,
        preferences,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_user(&self) -> Result<Option<UserProfile>> {
        let row = sqlx::query(
            "SELECT id, name, address, emergency_contact, alternate_contact, language, preferences_json FROM users WHERE id = ?",
        )
        .bind(USER_ROW_ID)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn upsert_user(&self, update: &ProfileUpdate) -> Result<UserProfile> {
        let preferences_json = update
            .preferences
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        // Single statement: concurrent saves cannot create a second row.
        sqlx::query(
            r#"
            INSERT INTO users (id, name, address, emergency_contact, alternate_contact,
                               language, preferences_json)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                address = excluded.address,
                emergency_contact = excluded.emergency_contact,
                alternate_contact = excluded.alternate_contact,
                language = excluded.language,
                preferences_json = excluded.preferences_json
            "#,
        )
        .bind(USER_ROW_ID)
        .bind(&update.name)
        .bind(&update.address)
        .bind(&update.emergency_contact)
        .bind(&update.alternate_contact)
        .bind(update.language())
        .bind(&preferences_json)
        .execute(&self.pool)
        .await?;

        self.get_user()
            .await?
            .ok_or_else(|| anyhow!("user row missing after upsert"))
    }

    async fn create_scan_log(&self, entry: &NewScanLog) -> Result<ScanLogEntry> {
        let timestamp = now_millis();
        let result = sqlx::query(
            "INSERT INTO scan_logs (type, result, confidence, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(entry.kind.as_str())
        .bind(&entry.result)
        .bind(entry.confidence)
        .bind(timestamp.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(ScanLogEntry {
            id: result.last_insert_rowid(),
            kind: entry.kind,
            result: entry.result.clone(),
            confidence: entry.confidence,
            timestamp,
        })
    }

    async fn list_scan_logs(&self, limit: usize) -> Result<Vec<ScanLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, type, result, confidence, timestamp
            FROM scan_logs
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(scan_from_row).collect()
    }

    async fn create_emergency_log(&self, log: &NewEmergencyLog) -> Result<EmergencyLogEntry> {
        let log = log.clone().normalized();
        let timestamp = now_millis();
        let result = sqlx::query(
            "INSERT INTO emergency_logs (location_lat, location_lng, status, timestamp) VALUES (?, ?, ?, ?)",
        )
        .bind(&log.location_lat)
        .bind(&log.location_lng)
        .bind(log.status())
        .bind(timestamp.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(EmergencyLogEntry {
            id: result.last_insert_rowid(),
            location_lat: log.location_lat.clone(),
            location_lng: log.location_lng.clone(),
            status: log.status().to_string(),
            timestamp,
        })
    }

    async fn list_emergency_logs(&self, limit: usize) -> Result<Vec<EmergencyLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, location_lat, location_lng, status, timestamp
            FROM emergency_logs
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(emergency_from_row).collect()
    }
}
