//! Storage abstraction for VisionAid.
//!
//! The [`Store`] trait is the persistence collaborator of the scan pipeline
//! and the profile / emergency endpoints. It exposes exactly the operations
//! the application needs: a single-row user profile accessor, append/list
//! for scan logs and append/list for emergency logs.
//!
//! Implementations must be `Send + Sync` to be shared across request
//! handlers. The SQLite implementation lives in the app crate;
//! [`memory::InMemoryStore`] backs tests.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    EmergencyLogEntry, NewEmergencyLog, NewScanLog, ProfileUpdate, ScanLogEntry, UserProfile,
};

/// Hard cap on the number of scan log rows returned by the history read path.
pub const SCAN_HISTORY_LIMIT: usize = 50;

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`get_user`](Store::get_user) | Read the single user profile |
/// | [`upsert_user`](Store::upsert_user) | Create or replace the single user profile |
/// | [`create_scan_log`](Store::create_scan_log) | Append a scan summary |
/// | [`list_scan_logs`](Store::list_scan_logs) | Most recent scan summaries, newest first |
/// | [`create_emergency_log`](Store::create_emergency_log) | Append an emergency event |
/// | [`list_emergency_logs`](Store::list_emergency_logs) | Most recent emergency events, newest first |
#[async_trait]
pub trait Store: Send + Sync {
    /// Return the user profile, if one has been saved.
    async fn get_user(&self) -> Result<Option<UserProfile>>;

    /// Create the profile or overwrite the existing one. There is never more
    /// than one profile row.
    async fn upsert_user(&self, update: &ProfileUpdate) -> Result<UserProfile>;

    async fn create_scan_log(&self, entry: &NewScanLog) -> Result<ScanLogEntry>;

    /// Return at most `limit` scan logs ordered by descending timestamp.
    async fn list_scan_logs(&self, limit: usize) -> Result<Vec<ScanLogEntry>>;

    async fn create_emergency_log(&self, log: &NewEmergencyLog) -> Result<EmergencyLogEntry>;

    async fn list_emergency_logs(&self, limit: usize) -> Result<Vec<EmergencyLogEntry>>;
}

/// Read scan history, capping the requested size at [`SCAN_HISTORY_LIMIT`].
pub async fn scan_history(store: &dyn Store, limit: Option<usize>) -> Result<Vec<ScanLogEntry>> {
    let limit = limit
        .unwrap_or(SCAN_HISTORY_LIMIT)
        .min(SCAN_HISTORY_LIMIT);
    store.list_scan_logs(limit).await
}

/// Ensure a profile exists, creating the default one on first start.
pub async fn seed_user(store: &dyn Store) -> Result<UserProfile> {
    match store.get_user().await? {
        Some(user) => Ok(user),
        None => store.upsert_user(&ProfileUpdate::seed()).await,
    }
}

/// Current time truncated to the millisecond precision every store persists.
pub fn now_millis() -> chrono::DateTime<chrono::Utc> {
    let now = chrono::Utc::now();
    chrono::DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}
