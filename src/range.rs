//! Range entries and address containment.

use ipnet::{IpNet, Ipv4Net};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

/// A single blocked entry, parsed from its stored text form.
///
/// Stored entries come in three shapes:
/// - CIDR notation: `192.168.0.0/16`, `2001:db8::/32`
/// - a bare address, which only matches itself: `203.0.113.5`
/// - an IPv4 wildcard: `192.168.*.*`, `10.*`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeEntry {
    /// Network range (wildcards are normalized to this form)
    Net(IpNet),
    /// Exact address
    Addr(IpAddr),
}

impl RangeEntry {
    /// Parse an entry. Returns `None` for text that is not a valid entry.
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }

        if entry.contains('/') {
            return entry.parse::<IpNet>().ok().map(RangeEntry::Net);
        }

        if entry.contains('*') {
            return parse_wildcard(entry).map(|net| RangeEntry::Net(IpNet::V4(net)));
        }

        entry.parse::<IpAddr>().ok().map(RangeEntry::Addr)
    }

    /// Check whether the address falls inside this entry.
    ///
    /// IPv4 addresses never match IPv6 entries and vice versa.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match self {
            RangeEntry::Net(net) => net.contains(&ip),
            RangeEntry::Addr(addr) => *addr == ip,
        }
    }
}

impl fmt::Display for RangeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeEntry::Net(net) => write!(f, "{}", net),
            RangeEntry::Addr(addr) => write!(f, "{}", addr),
        }
    }
}

/// Parse `a.b.*.*` style IPv4 wildcards into the equivalent prefix.
///
/// Only trailing octets may be wildcards; missing trailing octets count as
/// wildcards, so `10.*` equals `10.*.*.*`.
fn parse_wildcard(entry: &str) -> Option<Ipv4Net> {
    let parts: Vec<&str> = entry.split('.').collect();
    if parts.len() > 4 {
        return None;
    }

    let fixed = parts.iter().take_while(|part| **part != "*").count();
    if parts[fixed..].iter().any(|part| *part != "*") {
        return None;
    }

    let mut octets = [0u8; 4];
    for (octet, part) in octets.iter_mut().zip(&parts[..fixed]) {
        *octet = part.parse().ok()?;
    }

    Ipv4Net::new(Ipv4Addr::from(octets), (fixed * 8) as u8).ok()
}

/// Check whether an address is inside any of the given entries.
///
/// Entries that cannot be parsed are skipped.
pub fn ip_in_ranges<S: AsRef<str>>(ip: IpAddr, entries: &[S]) -> bool {
    entries
        .iter()
        .filter_map(|entry| RangeEntry::parse(entry.as_ref()))
        .any(|entry| entry.contains(ip))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_ipv4_cidr() {
        let entry = RangeEntry::parse("192.168.0.0/16").unwrap();
        assert!(entry.contains(ip("192.168.1.1")));
        assert!(entry.contains(ip("192.168.255.255")));
        assert!(!entry.contains(ip("192.169.0.1")));
    }

    #[test]
    fn test_ipv6_cidr() {
        let entry = RangeEntry::parse("2001:db8::/32").unwrap();
        assert!(entry.contains(ip("2001:db8::1")));
        assert!(!entry.contains(ip("2001:4860::1")));
    }

    #[test]
    fn test_host_bits_set_in_cidr() {
        let entry = RangeEntry::parse("10.1.2.3/8").unwrap();
        assert!(entry.contains(ip("10.200.0.1")));
    }

    #[test]
    fn test_bare_address_is_exact() {
        let entry = RangeEntry::parse("203.0.113.5").unwrap();
        assert!(entry.contains(ip("203.0.113.5")));
        assert!(!entry.contains(ip("203.0.113.6")));

        let entry = RangeEntry::parse("2001:db8::5").unwrap();
        assert!(entry.contains(ip("2001:db8:0:0::5")));
    }

    #[test]
    fn test_families_do_not_mix() {
        let entry = RangeEntry::parse("::/0").unwrap();
        assert!(!entry.contains(ip("1.2.3.4")));
        let entry = RangeEntry::parse("0.0.0.0/0").unwrap();
        assert!(!entry.contains(ip("::1")));
    }

    #[test]
    fn test_wildcards() {
        let entry = RangeEntry::parse("192.168.*.*").unwrap();
        assert_eq!(entry.to_string(), "192.168.0.0/16");
        assert!(entry.contains(ip("192.168.44.2")));

        let entry = RangeEntry::parse("10.*").unwrap();
        assert_eq!(entry.to_string(), "10.0.0.0/8");

        assert!(RangeEntry::parse("10.*.3.4").is_none());
        assert!(RangeEntry::parse("300.*").is_none());
        assert!(RangeEntry::parse("1.2.3.4.*").is_none());
    }

    #[test]
    fn test_invalid_entries() {
        assert!(RangeEntry::parse("").is_none());
        assert!(RangeEntry::parse("invalid").is_none());
        assert!(RangeEntry::parse("192.168.1.1/33").is_none());
    }

    #[test]
    fn test_ip_in_ranges_skips_garbage() {
        let entries = ["garbage", "10.0.0.0/8"];
        assert!(ip_in_ranges(ip("10.9.9.9"), &entries));
        assert!(!ip_in_ranges(ip("11.0.0.1"), &entries));
        assert!(!ip_in_ranges::<&str>(ip("10.0.0.1"), &[]));
    }
}
