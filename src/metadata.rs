//! Bookkeeping for range refreshes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime};

use crate::store::OptionStore;
use crate::Result;

/// Option key the refresh metadata is stored under.
pub const METADATA_KEY: &str = "TrackingSpamBlockedIpRangesLastUpdate";

/// What the most recent refresh produced.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RefreshMetadata {
    #[serde(with = "unix_secs")]
    pub last_updated: Option<SystemTime>,
    /// Number of entries in the refreshed collection
    pub entry_count: usize,
    /// Hex sha256 of the persisted collection
    pub fingerprint: Option<String>,
}

/// `last_updated` is stored as whole unix seconds.
mod unix_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S: Serializer>(time: &Option<SystemTime>, s: S) -> Result<S::Ok, S::Error> {
        time.map(|t| t.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs()))
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SystemTime>, D::Error> {
        let secs = Option::<u64>::deserialize(d)?;
        Ok(secs.map(|secs| UNIX_EPOCH + Duration::from_secs(secs)))
    }
}

/// Hex encoded sha256 of a persisted collection.
pub fn fingerprint(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

impl RefreshMetadata {
    /// Metadata for a refresh that just persisted `data` holding `entry_count` entries.
    pub fn now(entry_count: usize, data: &[u8]) -> Self {
        Self {
            last_updated: Some(SystemTime::now()),
            entry_count,
            fingerprint: Some(fingerprint(data)),
        }
    }

    /// Load metadata from the option store.
    ///
    /// Returns default metadata if none was stored yet.
    pub fn load(store: &dyn OptionStore) -> Result<Self> {
        match store.get(METADATA_KEY)? {
            Some(data) => Ok(serde_json::from_slice(&data)?),
            None => Ok(Self::default()),
        }
    }

    /// Save metadata to the option store.
    pub fn save(&self, store: &dyn OptionStore) -> Result<()> {
        let data = serde_json::to_vec(self)?;
        store.set(METADATA_KEY, &data)
    }

    /// Check if a refresh is due based on the given interval.
    ///
    /// Returns `true` if:
    /// - No refresh time is recorded
    /// - The elapsed time since the last refresh exceeds the interval
    pub fn needs_update(&self, interval: Duration) -> bool {
        match self.last_updated {
            None => true,
            Some(last) => {
                let elapsed = SystemTime::now().duration_since(last).unwrap_or(Duration::MAX);
                elapsed >= interval
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryOptionStore;
    use std::time::UNIX_EPOCH;

    #[test]
    fn test_metadata_save_load() {
        let store = MemoryOptionStore::new();
        let meta = RefreshMetadata::now(3, b"{}");
        meta.save(&store).unwrap();

        let loaded = RefreshMetadata::load(&store).unwrap();
        assert!(loaded.last_updated.is_some());
        assert_eq!(loaded.entry_count, 3);
        assert_eq!(loaded.fingerprint, meta.fingerprint);
    }

    #[test]
    fn test_last_updated_as_unix_secs() {
        let meta = RefreshMetadata {
            last_updated: Some(UNIX_EPOCH + Duration::from_millis(1_700_000_000_900)),
            entry_count: 2,
            fingerprint: None,
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains(r#""last_updated":1700000000"#));

        let decoded: RefreshMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(
            decoded.last_updated,
            Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
        );

        let never: RefreshMetadata =
            serde_json::from_str(r#"{"last_updated":null,"entry_count":0,"fingerprint":null}"#)
                .unwrap();
        assert_eq!(never.last_updated, None);
    }

    #[test]
    fn test_metadata_missing() {
        let store = MemoryOptionStore::new();
        let loaded = RefreshMetadata::load(&store).unwrap();
        assert_eq!(loaded, RefreshMetadata::default());
        assert!(loaded.needs_update(Duration::from_secs(1)));
    }

    #[test]
    fn test_metadata_needs_update() {
        let meta = RefreshMetadata {
            last_updated: Some(SystemTime::now() - Duration::from_secs(3600)),
            ..Default::default()
        };
        // 1h ago, 30min interval -> needs update
        assert!(meta.needs_update(Duration::from_secs(1800)));
        // 1h ago, 2h interval -> doesn't need update
        assert!(!meta.needs_update(Duration::from_secs(7200)));
    }

    #[test]
    fn test_fingerprint() {
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(fingerprint(b"{}"), fingerprint(b"{}"));
        assert_ne!(fingerprint(b"{}"), fingerprint(b"[]"));
    }
}
