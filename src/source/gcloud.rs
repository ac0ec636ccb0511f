//! Google Cloud published ranges.

use serde::Deserialize;

use super::{HttpFetcher, RangeSource};
use crate::error::Error;
use crate::Result;

/// Google Cloud customer-usable external ranges.
pub const GCLOUD_RANGES_URL: &str = "https://www.gstatic.com/ipranges/cloud.json";

#[derive(Deserialize)]
struct CloudJson {
    #[serde(default)]
    prefixes: Vec<CloudPrefix>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloudPrefix {
    ipv4_prefix: Option<String>,
    ipv6_prefix: Option<String>,
}

/// Extract the ranges from a `cloud.json` document.
pub fn parse_gcloud(document: &str) -> Result<Vec<String>> {
    let parsed: CloudJson =
        serde_json::from_str(document).map_err(|e| Error::feed_parse("gcloud", e))?;

    Ok(parsed
        .prefixes
        .into_iter()
        .flat_map(|p| p.ipv4_prefix.into_iter().chain(p.ipv6_prefix))
        .collect())
}

/// Feed for Google Cloud ranges.
pub struct GcloudSource {
    fetcher: HttpFetcher,
    url: String,
}

impl GcloudSource {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self::with_url(fetcher, GCLOUD_RANGES_URL)
    }

    pub fn with_url(fetcher: HttpFetcher, url: &str) -> Self {
        Self {
            fetcher,
            url: url.to_string(),
        }
    }
}

impl RangeSource for GcloudSource {
    fn name(&self) -> &str {
        "gcloud"
    }

    fn get_ranges(&self) -> Result<Vec<String>> {
        let document = self.fetcher.get_text(self.name(), &self.url)?;
        parse_gcloud(&document)
    }
}
