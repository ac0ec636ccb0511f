//! Range feeds the blocked collection is rebuilt from.
//!
//! Each cloud provider publishes its address blocks in its own document
//! format; every feed here reduces that document to a flat list of CIDR
//! strings. The refresh treats feeds as black boxes and only relies on
//! [`RangeSource::get_ranges`].

mod aws;
mod azure;
mod gcloud;
mod http;
mod list;
mod oracle;

pub use aws::{parse_aws, AwsSource, AWS_RANGES_URL};
pub use azure::{find_service_tags_url, parse_azure, AzureSource, AZURE_DOWNLOAD_PAGE_URL};
pub use gcloud::{parse_gcloud, GcloudSource, GCLOUD_RANGES_URL};
pub use http::{HttpFetcher, DEFAULT_TIMEOUT};
pub use list::{parse_range_list, FileSource, StaticSource};
pub use oracle::{parse_oracle, OracleSource, ORACLE_RANGES_URL};

use crate::Result;

/// A provider of IP ranges.
pub trait RangeSource: Send + Sync {
    /// Short name used in logs and configuration.
    fn name(&self) -> &str;

    /// Fetch the current ranges as CIDR or single-address strings.
    fn get_ranges(&self) -> Result<Vec<String>>;
}

/// Names of the provider feeds, in the order the refresh queries them.
pub const PROVIDER_NAMES: [&str; 4] = ["gcloud", "aws", "azure", "oracle"];

/// Resolve a provider name or alias to its canonical name.
pub fn canonical_provider_name(name: &str) -> Option<&'static str> {
    match name.to_lowercase().as_str() {
        "gcloud" | "google" => Some("gcloud"),
        "aws" | "amazon" => Some("aws"),
        "azure" | "microsoft" => Some("azure"),
        "oracle" | "oci" => Some("oracle"),
        _ => None,
    }
}

/// Create the provider feed registered under `name`.
pub fn provider(name: &str, fetcher: &HttpFetcher) -> Option<Box<dyn RangeSource>> {
    let source: Box<dyn RangeSource> = match canonical_provider_name(name)? {
        "gcloud" => Box::new(GcloudSource::new(fetcher.clone())),
        "aws" => Box::new(AwsSource::new(fetcher.clone())),
        "azure" => Box::new(AzureSource::new(fetcher.clone())),
        _ => Box::new(OracleSource::new(fetcher.clone())),
    };
    Some(source)
}

/// All provider feeds in reference order.
pub fn default_providers(fetcher: &HttpFetcher) -> Vec<Box<dyn RangeSource>> {
    PROVIDER_NAMES
        .iter()
        .filter_map(|name| provider(name, fetcher))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_lookup() {
        let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT);
        assert_eq!(provider("gcloud", &fetcher).unwrap().name(), "gcloud");
        assert_eq!(provider("AWS", &fetcher).unwrap().name(), "aws");
        assert_eq!(provider("microsoft", &fetcher).unwrap().name(), "azure");
        assert_eq!(provider("oci", &fetcher).unwrap().name(), "oracle");
        assert!(provider("digitalocean", &fetcher).is_none());
    }

    #[test]
    fn test_default_provider_order() {
        let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT);
        let names: Vec<String> = default_providers(&fetcher)
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, PROVIDER_NAMES);
    }
}
