//! Per-user upload statistics.
//!
//! The ledger is a single JSON document mapping a user id to that user's record:
//!
//! ```json
//! {
//!   "123456789": {
//!     "display_name": "alice",
//!     "files_uploaded": 3,
//!     "last_activity": "2024-05-01T09:30:00Z"
//!   }
//! }
//! ```
//!
//! Every `record` reads the whole document, updates one entry and rewrites the whole
//! document through a temp file and rename, all under one lock. A missing file is an empty
//! ledger. A file that does not parse is reported and never overwritten.

use crate::{RepositoryError, RepositoryResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use studyshare_types::UserId;

/// One user's statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStatsRecord {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub files_uploaded: u64,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Totals over users with at least one upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub users_with_uploads: usize,
    pub total_uploads: u64,
}

/// On-disk shape of a ledger entry. The user id is the map key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "StoredEntry")]
struct LedgerEntry {
    display_name: Option<String>,
    files_uploaded: u64,
    last_activity: Option<DateTime<Utc>>,
}

/// Entry as read, where older ledgers may carry `username` instead of, or beside,
/// `display_name`.
#[derive(Deserialize)]
struct StoredEntry {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    files_uploaded: u64,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    last_activity: Option<DateTime<Utc>>,
}

impl From<StoredEntry> for LedgerEntry {
    fn from(stored: StoredEntry) -> Self {
        Self {
            display_name: stored.display_name.or(stored.username),
            files_uploaded: stored.files_uploaded,
            last_activity: stored.last_activity,
        }
    }
}

/// Accepts RFC 3339, naive ISO-8601 (taken as UTC), or an empty string.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    let Some(raw) = raw.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }

    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}

type Ledger = BTreeMap<String, LedgerEntry>;

fn to_record(user_id: UserId, entry: LedgerEntry) -> UserStatsRecord {
    UserStatsRecord {
        user_id,
        display_name: entry.display_name,
        files_uploaded: entry.files_uploaded,
        last_activity: entry.last_activity,
    }
}

#[derive(Debug)]
pub struct StatsLedger {
    path: PathBuf,
    /// Held across the whole read-modify-write in `record`
    lock: Mutex<()>,
}

impl StatsLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records one upload for `user_id` at the current time.
    pub fn record(
        &self,
        user_id: &UserId,
        display_name: Option<&str>,
    ) -> RepositoryResult<UserStatsRecord> {
        self.record_at(user_id, display_name, Utc::now())
    }

    /// Records one upload for `user_id` at `at`.
    ///
    /// The count grows by exactly one; the display name and last activity are overwritten.
    pub fn record_at(
        &self,
        user_id: &UserId,
        display_name: Option<&str>,
        at: DateTime<Utc>,
    ) -> RepositoryResult<UserStatsRecord> {
        let _guard = self.lock.lock();

        let mut ledger = self.load()?;
        let entry = ledger.entry(user_id.to_string()).or_default();
        entry.files_uploaded = entry.files_uploaded.saturating_add(1);
        entry.display_name = display_name.map(str::to_owned);
        entry.last_activity = Some(at);
        let updated = entry.clone();

        self.save(&ledger)?;
        tracing::debug!(
            user = %user_id,
            files_uploaded = updated.files_uploaded,
            "recorded upload"
        );
        Ok(to_record(user_id.clone(), updated))
    }

    pub fn get(&self, user_id: &UserId) -> RepositoryResult<UserStatsRecord> {
        let mut ledger = self.load()?;
        ledger
            .remove(user_id.as_str())
            .map(|entry| to_record(user_id.clone(), entry))
            .ok_or_else(|| RepositoryError::StatsRecordNotFound(user_id.to_string()))
    }

    /// The `n` most active uploaders, by count descending then user id ascending.
    ///
    /// Users with no uploads are left out.
    pub fn top(&self, n: usize) -> RepositoryResult<Vec<UserStatsRecord>> {
        let mut records = self.active_records()?;
        records.sort_by(|a, b| {
            b.files_uploaded
                .cmp(&a.files_uploaded)
                .then_with(|| a.user_id.as_str().cmp(b.user_id.as_str()))
        });
        records.truncate(n);
        Ok(records)
    }

    pub fn summary(&self) -> RepositoryResult<LedgerSummary> {
        let records = self.active_records()?;
        Ok(LedgerSummary {
            users_with_uploads: records.len(),
            total_uploads: records.iter().map(|r| r.files_uploaded).sum(),
        })
    }

    fn active_records(&self) -> RepositoryResult<Vec<UserStatsRecord>> {
        let ledger = self.load()?;
        let mut records = Vec::with_capacity(ledger.len());

        for (key, entry) in ledger {
            if entry.files_uploaded == 0 {
                continue;
            }
            match UserId::new(&key) {
                Ok(user_id) => records.push(to_record(user_id, entry)),
                Err(_) => tracing::warn!("ignoring stats entry with blank user id"),
            }
        }

        Ok(records)
    }

    fn load(&self) -> RepositoryResult<Ledger> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Ledger::new()),
            Err(e) => return Err(RepositoryError::StatsRead(e)),
        };

        if contents.trim().is_empty() {
            return Ok(Ledger::new());
        }

        serde_json::from_str(&contents).map_err(|source| RepositoryError::StatsCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, ledger: &Ledger) -> RepositoryResult<()> {
        let json = serde_json::to_string_pretty(ledger).map_err(RepositoryError::StatsSerialization)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(RepositoryError::StatsWrite)?;

        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(RepositoryError::StatsWrite)?;
        staged
            .write_all(json.as_bytes())
            .map_err(RepositoryError::StatsWrite)?;
        staged
            .persist(&self.path)
            .map_err(|e| RepositoryError::StatsWrite(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn ledger(temp: &TempDir) -> StatsLedger {
        StatsLedger::new(temp.path().join("user_stats.json"))
    }

    fn uid(id: i64) -> UserId {
        UserId::from(id)
    }

    #[test]
    fn test_first_record_starts_at_one() {
        let temp = TempDir::new().unwrap();
        let stats = ledger(&temp);

        let record = stats.record(&uid(1), Some("alice")).unwrap();

        assert_eq!(record.files_uploaded, 1);
        assert_eq!(record.display_name.as_deref(), Some("alice"));
        assert!(record.last_activity.is_some());
        assert_eq!(stats.get(&uid(1)).unwrap(), record);
    }

    #[test]
    fn test_k_records_add_k() {
        let temp = TempDir::new().unwrap();
        let stats = ledger(&temp);

        for _ in 0..7 {
            stats.record(&uid(5), None).unwrap();
        }

        assert_eq!(stats.get(&uid(5)).unwrap().files_uploaded, 7);
    }

    #[test]
    fn test_record_overwrites_name_and_time() {
        let temp = TempDir::new().unwrap();
        let stats = ledger(&temp);
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();

        stats.record_at(&uid(1), Some("old"), earlier).unwrap();
        let record = stats.record_at(&uid(1), Some("new"), later).unwrap();

        assert_eq!(record.display_name.as_deref(), Some("new"));
        assert_eq!(record.last_activity, Some(later));
        assert_eq!(record.files_uploaded, 2);
    }

    #[test]
    fn test_get_unknown_user() {
        let temp = TempDir::new().unwrap();
        let stats = ledger(&temp);

        assert!(matches!(
            stats.get(&uid(99)),
            Err(RepositoryError::StatsRecordNotFound(_))
        ));
    }

    #[test]
    fn test_persisted_layout() {
        let temp = TempDir::new().unwrap();
        let stats = ledger(&temp);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();

        stats.record_at(&uid(42), Some("Әлия"), at).unwrap();

        let raw = std::fs::read_to_string(stats.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["42"]["display_name"], "Әлия");
        assert_eq!(json["42"]["files_uploaded"], 1);
        assert_eq!(json["42"]["last_activity"], "2024-05-01T09:30:00Z");
        assert!(raw.contains("Әлия"));
    }

    #[test]
    fn test_reads_legacy_entries() {
        let temp = TempDir::new().unwrap();
        let stats = ledger(&temp);
        std::fs::write(
            stats.path(),
            r#"{
                "10": {"username": "bob", "files_uploaded": 4, "last_activity": "2024-03-02T10:11:12.123456"},
                "11": {"username": "carol", "files_uploaded": 0, "last_activity": ""}
            }"#,
        )
        .unwrap();

        let bob = stats.get(&uid(10)).unwrap();
        assert_eq!(bob.display_name.as_deref(), Some("bob"));
        assert_eq!(bob.files_uploaded, 4);
        assert_eq!(
            bob.last_activity.unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-03-02 10:11:12"
        );

        let record = stats.record(&uid(10), Some("bob")).unwrap();
        assert_eq!(record.files_uploaded, 5);
        assert_eq!(stats.get(&uid(11)).unwrap().last_activity, None);
    }

    #[test]
    fn test_entry_with_both_name_keys_prefers_display_name() {
        let temp = TempDir::new().unwrap();
        let stats = ledger(&temp);
        std::fs::write(
            stats.path(),
            r#"{
                "7": {"username": "old", "display_name": "current", "files_uploaded": 2},
                "8": {"username": "legacy", "display_name": null, "files_uploaded": 1}
            }"#,
        )
        .unwrap();

        assert_eq!(stats.get(&uid(7)).unwrap().display_name.as_deref(), Some("current"));
        assert_eq!(stats.get(&uid(8)).unwrap().display_name.as_deref(), Some("legacy"));

        let record = stats.record(&uid(7), Some("current")).unwrap();
        assert_eq!(record.files_uploaded, 3);
        let raw = std::fs::read_to_string(stats.path()).unwrap();
        assert!(!raw.contains("username"));
    }

    #[test]
    fn test_corrupt_ledger_is_not_overwritten() {
        let temp = TempDir::new().unwrap();
        let stats = ledger(&temp);
        std::fs::write(stats.path(), "{ not json").unwrap();

        let result = stats.record(&uid(1), None);

        assert!(matches!(result, Err(RepositoryError::StatsCorrupt { .. })));
        assert_eq!(std::fs::read_to_string(stats.path()).unwrap(), "{ not json");
    }

    #[test]
    fn test_top_orders_by_count_then_id() {
        let temp = TempDir::new().unwrap();
        let stats = ledger(&temp);
        for (id, uploads) in [(3, 2), (1, 5), (2, 2), (4, 1)] {
            for _ in 0..uploads {
                stats.record(&uid(id), None).unwrap();
            }
        }

        let top = stats.top(3).unwrap();

        let ids: Vec<&str> = top.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(stats.top(10).unwrap().len(), 4);
    }

    #[test]
    fn test_top_and_summary_skip_zero_counts() {
        let temp = TempDir::new().unwrap();
        let stats = ledger(&temp);
        std::fs::write(
            stats.path(),
            r#"{"1": {"files_uploaded": 0}, "2": {"files_uploaded": 3}, "3": {"files_uploaded": 2}}"#,
        )
        .unwrap();

        let top = stats.top(10).unwrap();
        let summary = stats.summary().unwrap();

        assert_eq!(top.len(), 2);
        assert_eq!(
            summary,
            LedgerSummary {
                users_with_uploads: 2,
                total_uploads: 5
            }
        );
    }

    #[test]
    fn test_empty_ledger() {
        let temp = TempDir::new().unwrap();
        let stats = ledger(&temp);

        assert!(stats.top(10).unwrap().is_empty());
        assert_eq!(stats.summary().unwrap(), LedgerSummary::default());
    }

    #[test]
    fn test_concurrent_records_are_not_lost() {
        let temp = TempDir::new().unwrap();
        let stats = ledger(&temp);
        const THREADS: usize = 8;
        const PER_THREAD: usize = 5;

        std::thread::scope(|s| {
            for _ in 0..THREADS {
                let stats = &stats;
                s.spawn(move || {
                    for _ in 0..PER_THREAD {
                        stats.record(&uid(1), Some("shared")).unwrap();
                    }
                });
            }
        });

        assert_eq!(
            stats.get(&uid(1)).unwrap().files_uploaded,
            (THREADS * PER_THREAD) as u64
        );
    }
}
