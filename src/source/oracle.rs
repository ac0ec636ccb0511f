//! Oracle Cloud Infrastructure published ranges.

use serde::Deserialize;

use super::{HttpFetcher, RangeSource};
use crate::error::Error;
use crate::Result;

pub const ORACLE_RANGES_URL: &str =
    "https://docs.oracle.com/en-us/iaas/tools/public_ip_ranges.json";

#[derive(Deserialize)]
struct PublicIpRangesJson {
    #[serde(default)]
    regions: Vec<Region>,
}

#[derive(Deserialize)]
struct Region {
    #[serde(default)]
    cidrs: Vec<Cidr>,
}

#[derive(Deserialize)]
struct Cidr {
    cidr: String,
}

/// Extract the ranges from a `public_ip_ranges.json` document.
pub fn parse_oracle(document: &str) -> Result<Vec<String>> {
    let parsed: PublicIpRangesJson =
        serde_json::from_str(document).map_err(|e| Error::feed_parse("oracle", e))?;

    Ok(parsed
        .regions
        .into_iter()
        .flat_map(|region| region.cidrs)
        .map(|c| c.cidr)
        .collect())
}

/// Feed for Oracle Cloud ranges.
pub struct OracleSource {
    fetcher: HttpFetcher,
    url: String,
}

impl OracleSource {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self::with_url(fetcher, ORACLE_RANGES_URL)
    }

    pub fn with_url(fetcher: HttpFetcher, url: &str) -> Self {
        Self {
            fetcher,
            url: url.to_string(),
        }
    }
}

impl RangeSource for OracleSource {
    fn name(&self) -> &str {
        "oracle"
    }

    fn get_ranges(&self) -> Result<Vec<String>> {
        let document = self.fetcher.get_text(self.name(), &self.url)?;
        parse_oracle(&document)
    }
}
