//! Amazon Web Services published ranges.

use serde::Deserialize;

use super::{HttpFetcher, RangeSource};
use crate::error::Error;
use crate::Result;

pub const AWS_RANGES_URL: &str = "https://ip-ranges.amazonaws.com/ip-ranges.json";

#[derive(Deserialize)]
struct IpRangesJson {
    #[serde(default)]
    prefixes: Vec<Ipv4Prefix>,
    #[serde(default)]
    ipv6_prefixes: Vec<Ipv6Prefix>,
}

#[derive(Deserialize)]
struct Ipv4Prefix {
    ip_prefix: String,
}

#[derive(Deserialize)]
struct Ipv6Prefix {
    ipv6_prefix: String,
}

/// Extract the ranges from an `ip-ranges.json` document.
///
/// A prefix shared by several AWS services is listed once per service
/// upstream; it is reported once here, at its first position.
pub fn parse_aws(document: &str) -> Result<Vec<String>> {
    let parsed: IpRangesJson =
        serde_json::from_str(document).map_err(|e| Error::feed_parse("aws", e))?;

    let mut seen = ahash::AHashSet::new();
    Ok(parsed
        .prefixes
        .into_iter()
        .map(|p| p.ip_prefix)
        .chain(parsed.ipv6_prefixes.into_iter().map(|p| p.ipv6_prefix))
        .filter(|prefix| seen.insert(prefix.clone()))
        .collect())
}

/// Feed for AWS ranges.
pub struct AwsSource {
    fetcher: HttpFetcher,
    url: String,
}

impl AwsSource {
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self::with_url(fetcher, AWS_RANGES_URL)
    }

    pub fn with_url(fetcher: HttpFetcher, url: &str) -> Self {
        Self {
            fetcher,
            url: url.to_string(),
        }
    }
}

impl RangeSource for AwsSource {
    fn name(&self) -> &str {
        "aws"
    }

    fn get_ranges(&self) -> Result<Vec<String>> {
        let document = self.fetcher.get_text(self.name(), &self.url)?;
        parse_aws(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "syncToken": "1700000000",
        "createDate": "2023-11-14-22-13-20",
        "prefixes": [
            {"ip_prefix": "3.2.34.0/26", "region": "af-south-1", "service": "AMAZON", "network_border_group": "af-south-1"},
            {"ip_prefix": "3.2.34.0/26", "region": "af-south-1", "service": "EC2", "network_border_group": "af-south-1"},
            {"ip_prefix": "13.34.37.64/27", "region": "ap-southeast-4", "service": "AMAZON", "network_border_group": "ap-southeast-4"}
        ],
        "ipv6_prefixes": [
            {"ipv6_prefix": "2600:1f14::/35", "region": "us-west-2", "service": "EC2", "network_border_group": "us-west-2"}
        ]
    }"#;

    #[test]
    fn test_parse_aws() {
        let ranges = parse_aws(FIXTURE).unwrap();
        assert_eq!(
            ranges,
            vec!["3.2.34.0/26", "13.34.37.64/27", "2600:1f14::/35"]
        );
    }

    #[test]
    fn test_parse_aws_invalid() {
        assert!(parse_aws(r#"{"prefixes": [{"region": "x"}]}"#).is_err());
    }
}
