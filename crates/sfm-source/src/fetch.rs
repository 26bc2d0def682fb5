//! HTTP retrieval for hosted Stoplight sites.
//!
//! [`Fetch`] is the seam between [`HostedSource`](crate::HostedSource) and the
//! network, so hosted parsing can be exercised without a server.

use std::time::Duration;

use tracing::info;
use ureq::Agent;

use crate::error::SourceError;

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT: u64 = 30;

/// Single-shot text retrieval.
pub trait Fetch {
    /// GET `url` and return the body as text.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Retrieval`] on transport failure or a
    /// non-success status.
    fn get(&self, url: &str) -> Result<String, SourceError>;
}

/// [`Fetch`] implementation backed by a `ureq` agent.
pub struct HttpFetcher {
    agent: Agent,
    user_agent: String,
}

impl HttpFetcher {
    /// Create a fetcher with the given User-Agent and global timeout.
    #[must_use]
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            user_agent: user_agent.to_owned(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new("Mozilla/5.0", Duration::from_secs(DEFAULT_TIMEOUT))
    }
}

impl Fetch for HttpFetcher {
    fn get(&self, url: &str) -> Result<String, SourceError> {
        info!("Fetching {}", url);

        let retrieval = |reason: String| SourceError::Retrieval {
            url: url.to_owned(),
            reason,
        };

        let response = self
            .agent
            .get(url)
            .header("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| retrieval(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(retrieval(format!("HTTP {}", status.as_u16())));
        }

        response
            .into_body()
            .read_to_string()
            .map_err(|e| retrieval(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory [`Fetch`] for tests.

    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::Fetch;
    use crate::error::SourceError;

    /// Serves canned bodies; any other URL yields a 404 retrieval error.
    #[derive(Default)]
    pub(crate) struct FakeFetcher {
        responses: HashMap<String, String>,
        pub(crate) requested: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        pub(crate) fn with(mut self, url: &str, body: &str) -> Self {
            self.responses.insert(url.to_owned(), body.to_owned());
            self
        }
    }

    impl Fetch for FakeFetcher {
        fn get(&self, url: &str) -> Result<String, SourceError> {
            self.requested.borrow_mut().push(url.to_owned());
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| SourceError::Retrieval {
                    url: url.to_owned(),
                    reason: "HTTP 404".to_owned(),
                })
        }
    }
}
