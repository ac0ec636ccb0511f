//! Blocking HTTP access shared by the provider feeds.

use std::io::Read;
use std::time::Duration;

use crate::error::Error;
use crate::Result;

/// Default per-request timeout for feed downloads.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on a single feed document.
const MAX_DOCUMENT_SIZE: u64 = 64 * 1024 * 1024;

/// Thin wrapper around a `ureq` agent.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("cloudblock/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }

    /// Download a document as text.
    pub fn get_text(&self, source_name: &str, url: &str) -> Result<String> {
        log::debug!("Fetching {} ranges from {}", source_name, url);

        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => {
                Error::download(source_name, format!("HTTP error: {}", code))
            }
            ureq::Error::Transport(t) => {
                Error::download(source_name, format!("Transport error: {}", t))
            }
        })?;

        let mut body = String::new();
        response
            .into_reader()
            .take(MAX_DOCUMENT_SIZE)
            .read_to_string(&mut body)
            .map_err(|e| Error::download(source_name, format!("Failed to read response: {}", e)))?;

        Ok(body)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}
