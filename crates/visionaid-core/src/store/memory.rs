//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Uses `Vec`s and an `Option` behind `std::sync::RwLock`. Ids are assigned
//! from a per-table counter, the same way SQLite's `AUTOINCREMENT` does.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{
    EmergencyLogEntry, NewEmergencyLog, NewScanLog, ProfileUpdate, ScanLogEntry, UserProfile,
};

use super::{now_millis, Store};

const USER_ROW_ID: i64 = 1;

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    user: RwLock<Option<UserProfile>>,
    scans: RwLock<Vec<ScanLogEntry>>,
    emergencies: RwLock<Vec<EmergencyLogEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a scan log with an explicit timestamp. Test helper for
    /// ordering checks.
    pub fn push_scan_log(&self, entry: ScanLogEntry) -> Result<()> {
        self.scans.write().map_err(poisoned)?.push(entry);
        Ok(())
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

fn newest_first<T: Clone>(
    rows: &[T],
    limit: usize,
    key: impl Fn(&T) -> (chrono::DateTime<chrono::Utc>, i64),
) -> Vec<T> {
    let mut rows = rows.to_vec();
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows.truncate(limit);
    rows
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_user(&self) -> Result<Option<UserProfile>> {
        Ok(self.user.read().map_err(poisoned)?.clone())
    }

    async fn upsert_user(&self, update: &ProfileUpdate) -> Result<UserProfile> {
        let profile = UserProfile {
            id: USER_ROW_ID,
            name: update.name.clone(),
            address: update.address.clone(),
            emergency_contact: update.emergency_contact.clone(),
            alternate_contact: update.alternate_contact.clone(),
            language: update.language().to_string(),
            preferences: update.preferences.clone(),
        };
        *self.user.write().map_err(poisoned)? = Some(profile.clone());
        Ok(profile)
    }

    async fn create_scan_log(&self, entry: &NewScanLog) -> Result<ScanLogEntry> {
        let mut scans = self.scans.write().map_err(poisoned)?;
        let id = scans.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let row = ScanLogEntry {
            id,
            kind: entry.kind,
            result: entry.result.clone(),
            confidence: entry.confidence,
            timestamp: now_millis(),
        };
        scans.push(row.clone());
        Ok(row)
    }

    async fn list_scan_logs(&self, limit: usize) -> Result<Vec<ScanLogEntry>> {
        let scans = self.scans.read().map_err(poisoned)?;
        Ok(newest_first(&scans, limit, |s| (s.timestamp, s.id)))
    }

    async fn create_emergency_log(&self, log: &NewEmergencyLog) -> Result<EmergencyLogEntry> {
        let log = log.clone().normalized();
        let mut rows = self.emergencies.write().map_err(poisoned)?;
        let id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let row = EmergencyLogEntry {
            id,
            location_lat: log.location_lat.clone(),
            location_lng: log.location_lng.clone(),
            status: log.status().to_string(),
            timestamp: now_millis(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn list_emergency_logs(&self, limit: usize) -> Result<Vec<EmergencyLogEntry>> {
        let rows = self.emergencies.read().map_err(poisoned)?;
        Ok(newest_first(&rows, limit, |r| (r.timestamp, r.id)))
    }
}
