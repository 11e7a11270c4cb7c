//! WordPress Search
//!
//! Queries the WordPress REST search endpoint (`/wp-json/wp/v2/search`) and
//! turns the outcome into a postable layout. Failures never leave
//! [`SearchClient::search_layout`]; they become warning layouts.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::slack::blocks::{self, MessageLayout};

/// Path of the REST search route relative to the site base URL.
const SEARCH_PATH: &str = "/wp-json/wp/v2/search";

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
}

/// Search backend errors.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("search returned HTTP {0}")]
    Status(u16),
    #[error("unexpected search response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SearchError {
    /// Short, user-facing category of the failure. The full error (which
    /// names the backend URL) only goes to the logs.
    pub fn summary(&self) -> String {
        match self {
            Self::Transport(e) if e.is_timeout() => "search request timed out".to_string(),
            Self::Transport(e) if e.is_connect() => "search backend unreachable".to_string(),
            Self::Transport(_) => "search request failed".to_string(),
            Self::Status(status) => format!("search returned HTTP {status}"),
            Self::Decode(_) => "unexpected search response".to_string(),
        }
    }
}

/// Client for a single WordPress site.
#[derive(Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    logo_url: String,
}

impl SearchClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        logo_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            logo_url: logo_url.into(),
        }
    }

    /// Run a search and return the hits in backend order.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .http
            .get(format!("{}{SEARCH_PATH}", self.base_url))
            .query(&[("search", query)])
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Search and build the reply layout. Never fails.
    ///
    /// A blank query short-circuits to the "no search term" warning without
    /// touching the network.
    pub async fn search_layout(&self, query: &str) -> MessageLayout {
        let query = query.trim();
        if query.is_empty() {
            return blocks::warning(blocks::EMPTY_QUERY_WARNING);
        }

        match self.search(query).await {
            Ok(hits) => blocks::compose(query, &hits, &self.logo_url),
            Err(e) => {
                warn!(error = %e, "WordPress search failed");
                blocks::warning(&format!("{}{}", blocks::SEARCH_FAILED_WARNING, e.summary()))
            }
        }
    }
}
