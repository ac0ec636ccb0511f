//! Index key derivation and the bucketed range collection.
//!
//! Ranges are partitioned by the text of their leading group (everything up
//! to and including the first `.` or `:`), so a membership test only has to
//! compare an address against the handful of ranges sharing its prefix.

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Result;

/// Compute the index key of an IP address or range.
///
/// The key is the input up to and including the first `.`; when there is no
/// `.`, up to and including the first `:`. Inputs with neither separator fall
/// back to their first character. Empty input has no key.
///
/// # Examples
/// ```
/// use cloudblock::index_key;
///
/// assert_eq!(index_key("10.11.12.13"), Some("10."));
/// assert_eq!(index_key("f::0"), Some("f:"));
/// assert_eq!(index_key(""), None);
/// ```
pub fn index_key(ip_or_range: &str) -> Option<&str> {
    if ip_or_range.is_empty() {
        return None;
    }

    for separator in ['.', ':'] {
        if let Some(pos) = ip_or_range.find(separator) {
            return Some(&ip_or_range[..pos + separator.len_utf8()]);
        }
    }

    // No separator at all; not a real address but still indexable.
    ip_or_range
        .chars()
        .next()
        .map(|c| &ip_or_range[..c.len_utf8()])
}

/// Collection of blocked ranges grouped by index key.
///
/// Every entry lives in the bucket its own [`index_key`] computes to, and no
/// bucket is ever empty. Buckets keep insertion order; keys are ordered so
/// that two equal collections always encode to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RangeIndex {
    buckets: BTreeMap<String, Vec<String>>,
}

/// Accepted encodings of a persisted collection.
///
/// An empty collection has historically been written as `[]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredIndex {
    Indexed(BTreeMap<String, Vec<String>>),
    List(Vec<serde_json::Value>),
}

impl RangeIndex {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from scratch, in iteration order.
    pub fn from_ranges<I, S>(ranges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut index = Self::new();
        for range in ranges {
            index.insert(range);
        }
        index
    }

    /// Append an entry to the bucket of its index key.
    ///
    /// Returns `false` (and stores nothing) when the entry has no key.
    /// Duplicates are kept.
    pub fn insert(&mut self, entry: impl Into<String>) -> bool {
        let entry = entry.into();
        let key = match index_key(&entry) {
            Some(key) => key.to_string(),
            None => return false,
        };
        self.buckets.entry(key).or_default().push(entry);
        true
    }

    /// Get the entries stored under an index key.
    pub fn bucket(&self, key: &str) -> Option<&[String]> {
        self.buckets.get(key).map(Vec::as_slice)
    }

    /// Get the bucket a given address would be compared against.
    pub fn bucket_for(&self, ip: &str) -> Option<&[String]> {
        index_key(ip).and_then(|key| self.bucket(key))
    }

    /// Total number of stored entries.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Check if the collection holds no entries.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Iterate over `(key, entries)` pairs in key order.
    pub fn buckets(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.buckets
            .iter()
            .map(|(key, entries)| (key.as_str(), entries.as_slice()))
    }

    /// Iterate over every stored entry, bucket by bucket.
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.buckets.values().flatten().map(String::as_str)
    }

    /// Encode the collection for persistence.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a persisted collection.
    ///
    /// Empty input, `{}` and `[]` all decode to the empty collection.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }

        match serde_json::from_slice::<StoredIndex>(data)? {
            StoredIndex::Indexed(mut buckets) => {
                buckets.retain(|_, entries| !entries.is_empty());
                Ok(Self { buckets })
            }
            StoredIndex::List(items) if items.is_empty() => Ok(Self::new()),
            StoredIndex::List(_) => Err(serde_json::Error::custom(
                "expected a map of index keys to ranges, found a non-empty list",
            )
            .into()),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for RangeIndex {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_ranges(iter)
    }
}
