//! Lockfile contents: `{"user": <string>, "ts": <unix seconds>}`.

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{io_err, LockError};

/// Who holds the lock and since when. Written only by the holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub user: String,
    pub ts: i64,
}

impl LockRecord {
    /// Record for `user` stamped with the current time.
    pub fn now(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ts: Utc::now().timestamp(),
        }
    }

    /// Seconds between `ts` and `now`, clamped at zero for clock skew.
    pub fn held_for_secs(&self, now: i64) -> u64 {
        now.saturating_sub(self.ts).max(0) as u64
    }

    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents.trim())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Read the record at `path` without touching the lock.
    ///
    /// Returns `Ok(None)` when no lockfile exists.
    pub fn read_at(path: &Path) -> Result<Option<Self>, LockError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(path, err)),
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::parse(&contents)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn wire_format_uses_user_and_ts_keys() {
        let record = LockRecord {
            user: "MyManJenkins".to_string(),
            ts: 1_700_000_000,
        };
        assert_eq!(
            record.to_json().unwrap(),
            r#"{"user":"MyManJenkins","ts":1700000000}"#
        );
    }

    #[test]
    fn parse_tolerates_surrounding_whitespace() {
        let record = LockRecord::parse("  {\"user\":\"alice\",\"ts\":10}\n").unwrap();
        assert_eq!(record.user, "alice");
        assert_eq!(record.ts, 10);
    }

    #[test]
    fn held_for_is_never_negative() {
        let record = LockRecord {
            user: "alice".to_string(),
            ts: 100,
        };
        assert_eq!(record.held_for_secs(160), 60);
        assert_eq!(record.held_for_secs(50), 0);
    }

    #[test]
    fn read_at_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(LockRecord::read_at(&dir.path().join("nope.lock"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn read_at_parses_written_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync.lock");
        std::fs::write(&path, r#"{"user":"bob","ts":42}"#).unwrap();
        let record = LockRecord::read_at(&path).unwrap().expect("record");
        assert_eq!(record, LockRecord { user: "bob".to_string(), ts: 42 });
    }

    #[test]
    fn read_at_corrupt_record_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync.lock");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            LockRecord::read_at(&path),
            Err(LockError::Record(_))
        ));
    }
}
