//! YAML configuration.
//!
//! ```yaml
//! store_dir: /var/lib/cloudblock
//! internet_enabled: true
//! sources: [gcloud, aws, azure, oracle]
//! extra_range_files:
//!   - /etc/cloudblock/extra.txt
//! http_timeout_secs: 30
//! request_cache_capacity: 1024
//! refresh_interval_secs: 86400
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::blocked::BlockedIpRanges;
use crate::cache::{SharedCache, DEFAULT_REQUEST_CACHE_CAPACITY};
use crate::error::Error;
use crate::source::{self, FileSource, HttpFetcher, RangeSource, PROVIDER_NAMES};
use crate::store::{FileOptionStore, OptionStore};
use crate::Result;

/// Runtime configuration. Every field has a default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory of the file-backed option store
    pub store_dir: PathBuf,
    /// Whether outbound network access is allowed
    pub internet_enabled: bool,
    /// Provider feeds to query, in order
    pub sources: Vec<String>,
    /// Local range lists appended after the provider feeds
    pub extra_range_files: Vec<PathBuf>,
    pub http_timeout_secs: u64,
    /// Number of answers a per-request memo cache is pre-sized for
    pub request_cache_capacity: usize,
    /// Minimum age of the collection before a conditional refresh runs
    pub refresh_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("cloudblock-data"),
            internet_enabled: true,
            sources: PROVIDER_NAMES.iter().map(|s| s.to_string()).collect(),
            extra_range_files: Vec::new(),
            http_timeout_secs: 30,
            request_cache_capacity: DEFAULT_REQUEST_CACHE_CAPACITY,
            refresh_interval_secs: 86400, // 1 day
        }
    }
}

impl Config {
    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse a configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.http_timeout_secs == 0 {
            return Err(Error::Config("http_timeout_secs must be positive".to_string()));
        }
        for name in &self.sources {
            if source::canonical_provider_name(name).is_none() {
                return Err(Error::UnknownSource(name.clone()));
            }
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Instantiate the configured feeds in query order.
    pub fn build_sources(&self) -> Result<Vec<Box<dyn RangeSource>>> {
        let fetcher = HttpFetcher::new(self.http_timeout());

        let mut sources = Vec::with_capacity(self.sources.len() + self.extra_range_files.len());
        for name in &self.sources {
            let source =
                source::provider(name, &fetcher).ok_or_else(|| Error::UnknownSource(name.clone()))?;
            sources.push(source);
        }
        for path in &self.extra_range_files {
            sources.push(Box::new(FileSource::new(path)) as Box<dyn RangeSource>);
        }
        Ok(sources)
    }

    /// Open the file-backed option store.
    pub fn open_store(&self) -> Result<FileOptionStore> {
        FileOptionStore::open(&self.store_dir)
    }

    /// Assemble a range store using this configuration.
    pub fn build(
        &self,
        store: Arc<dyn OptionStore>,
        shared: Arc<dyn SharedCache>,
    ) -> Result<BlockedIpRanges> {
        Ok(BlockedIpRanges::new(store, shared)
            .with_sources(self.build_sources()?)
            .with_internet_enabled(self.internet_enabled)
            .with_request_cache_capacity(self.request_cache_capacity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml("{}").unwrap(), Config::default());
        assert!(Config::from_yaml("sources: [Google, OCI]").is_ok());
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
store_dir: /var/lib/cloudblock
internet_enabled: false
sources: [aws, oracle]
extra_range_files:
  - /etc/cloudblock/extra.txt
http_timeout_secs: 5
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.store_dir, PathBuf::from("/var/lib/cloudblock"));
        assert!(!config.internet_enabled);
        assert_eq!(config.sources, vec!["aws", "oracle"]);
        assert_eq!(config.http_timeout(), Duration::from_secs(5));
        assert_eq!(config.refresh_interval(), Duration::from_secs(86400));

        let names: Vec<String> = config
            .build_sources()
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["aws", "oracle", "file:/etc/cloudblock/extra.txt"]);
    }

    #[test]
    fn test_unknown_source() {
        assert!(matches!(
            Config::from_yaml("sources: [aws, hetzner]"),
            Err(Error::UnknownSource(ref name)) if name == "hetzner"
        ));
    }

    #[test]
    fn test_request_cache_capacity_is_a_hint() {
        let config = Config::from_yaml("request_cache_capacity: 0").unwrap();
        assert_eq!(config.request_cache_capacity, 0);
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::from_yaml("http_timeout_secs: 0").is_err());
        assert!(Config::from_yaml("unknown_key: 1").is_err());
        assert!(Config::from_yaml("internet_enabled: [").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloudblock.yaml");
        fs::write(&path, "sources: [gcloud]\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.sources, vec!["gcloud"]);
        assert!(Config::load(dir.path().join("missing.yaml")).is_err());
    }
}
