//! cloudblock - indexed store of untrusted IP ranges.
//!
//! This crate keeps a dynamically updated set of IP ranges that should not
//! be trusted (published cloud provider blocks plus manually banned
//! addresses) and answers, for any incoming address, whether it falls inside
//! one of them. What to do with an excluded address is up to the caller.
//!
//! # Features
//!
//! - **Indexed lookups**: ranges are bucketed by their leading group, so an
//!   address is only compared against ranges sharing its prefix
//! - **IPv4 and IPv6**: CIDR ranges, exact addresses and IPv4 wildcards
//! - **Provider feeds**: Google Cloud, AWS, Azure and Oracle Cloud ranges
//! - **Hot reload**: the shared read cache swaps snapshots atomically
//! - **Per-request memoization**: repeated checks within one request agree
//!
//! # Quick Start
//!
//! ```
//! use cloudblock::{BlockedIpRanges, MemoryOptionStore, SharedRangeCache, StaticSource};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryOptionStore::new());
//! let shared = Arc::new(SharedRangeCache::new());
//! let ranges = BlockedIpRanges::new(store.clone(), shared.clone())
//!     .with_sources(vec![Box::new(StaticSource::new("hosting", ["35.184.0.0/13"]))]);
//!
//! // Periodic job: rebuild the collection, then repopulate the read cache
//! ranges.update_blocked_ip_ranges()?;
//! shared.reload(store.as_ref())?;
//!
//! // Request path
//! let request = ranges.request();
//! assert!(request.is_excluded("35.190.1.1"));
//! assert!(!request.is_excluded("8.8.8.8"));
//! # Ok::<(), cloudblock::Error>(())
//! ```
//!
//! # Consistency
//!
//! The option store is authoritative and only written by [`BlockedIpRanges`].
//! Membership tests read the [`SharedCache`], which the surrounding system
//! repopulates; a ban or refresh becomes visible to lookups once that
//! happens. Refreshes must not run concurrently with each other, and two
//! racing bans may lose one of the two writes.

mod error;

pub mod blocked;
pub mod cache;
pub mod config;
pub mod index;
pub mod metadata;
pub mod range;
pub mod source;
pub mod store;

// Re-export core types
pub use error::{Error, Result};

pub use blocked::{BlockedIpRanges, RequestScope, OPTION_KEY};
pub use cache::{RequestCache, SharedCache, SharedRangeCache, TransientCache};
pub use config::Config;
pub use index::{index_key, RangeIndex};
pub use metadata::RefreshMetadata;
pub use range::{ip_in_ranges, RangeEntry};
pub use source::{FileSource, HttpFetcher, RangeSource, StaticSource};
pub use store::{FileOptionStore, MemoryOptionStore, OptionStore};
