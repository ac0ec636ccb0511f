//! Microsoft Azure service tag ranges.
//!
//! Azure publishes its ranges as a weekly `ServiceTags_Public_<date>.json`
//! whose URL changes with every release; the current link is scraped from
//! the download page first.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{HttpFetcher, RangeSource};
use crate::error::Error;
use crate::Result;

/// Download page listing the current service tag file.
pub const AZURE_DOWNLOAD_PAGE_URL: &str =
    "https://www.microsoft.com/en-us/download/details.aspx?id=56519";

static SERVICE_TAGS_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"https://download\.microsoft\.com/download/[^"'\s<>]+/ServiceTags_Public_\d+\.json"#)
        .expect("valid service tags regex")
});

#[derive(Deserialize)]
struct ServiceTagsJson {
    #[serde(default)]
    values: Vec<ServiceTag>,
}

#[derive(Deserialize)]
struct ServiceTag {
    properties: ServiceTagProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServiceTagProperties {
    #[serde(default)]
    address_prefixes: Vec<String>,
}

/// Find the service tag JSON link on the download page.
pub fn find_service_tags_url(page: &str) -> Option<&str> {
    SERVICE_TAGS_LINK.find(page).map(|m| m.as_str())
}

/// Extract the ranges from a service tags document.
///
/// The same prefix appears under many tags; each is reported once.
pub fn parse_azure(document: &str) -> Result<Vec<String>> {
    let parsed: ServiceTagsJson =
        serde_json::from_str(document).map_err(|e| Error::feed_parse("azure", e))?;

    let mut seen = ahash::AHashSet::new();
    Ok(parsed
        .values
        .into_iter()
        .flat_map(|tag| tag.properties.address_prefixes)
        .filter(|prefix| seen.insert(prefix.clone()))
        .collect())
}

/// Feed for Azure ranges.
pub struct AzureSource {
    fetcher: HttpFetcher,
    page_url: String,
}

impl AzureSource {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self::with_page_url(fetcher, AZURE_DOWNLOAD_PAGE_URL)
    }

    pub fn with_page_url(fetcher: HttpFetcher, page_url: &str) -> Self {
        Self {
            fetcher,
            page_url: page_url.to_string(),
        }
    }
}

impl RangeSource for AzureSource {
    fn name(&self) -> &str {
        "azure"
    }

    fn get_ranges(&self) -> Result<Vec<String>> {
        let page = self.fetcher.get_text(self.name(), &self.page_url)?;
        let url = find_service_tags_url(&page).ok_or_else(|| {
            Error::feed_parse(self.name(), "no service tags link on download page")
        })?;

        let document = self.fetcher.get_text(self.name(), url)?;
        parse_azure(&document)
    }
}
