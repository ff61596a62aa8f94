//! GitHub repository accessor.
//!
//! The audit core only reads forge data through the [`RepoAccessor`]
//! trait; [`GithubClient`] is the concrete REST-backed implementation.
//! Pagination, auth and timeouts live here, never in the query units.

use crate::errors::AuditError;
use crate::models::PullRequest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Read-only capability over a single repository's pull requests.
#[async_trait]
pub trait RepoAccessor: Send + Sync {
    /// `owner/name` of the repository, used to build search queries.
    fn full_name(&self) -> &str;

    /// Run a forge search query and return matching PR numbers.
    async fn search_prs(&self, query: &str) -> Result<Vec<u64>, AuditError>;

    /// Fetch the detail record for one pull request.
    async fn get_pull(&self, number: u64) -> Result<PullRequest, AuditError>;
}

const DEFAULT_API_BASE: &str = "https://api.github.com";
const SEARCH_PAGE_SIZE: usize = 100;

/// REST client for the GitHub API.
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    repo: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct PullWire {
    number: u64,
    title: String,
    user: UserWire,
    created_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    changed_files: u64,
    html_url: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct UserWire {
    login: String,
}

impl From<PullWire> for PullRequest {
    fn from(wire: PullWire) -> Self {
        PullRequest {
            number: wire.number,
            title: wire.title,
            author_login: wire.user.login,
            created_at: wire.created_at,
            closed_at: wire.closed_at,
            merged: wire.merged,
            changed_files: wire.changed_files,
            html_url: wire.html_url,
            state: wire.state,
        }
    }
}

impl GithubClient {
    /// Create a client for `owner/name`, authenticated with `token`.
    pub fn new(token: &str, repo: &str) -> Result<Self, AuditError> {
        Self::with_api_base(token, repo, DEFAULT_API_BASE)
    }

    /// Create a client against a non-default API base (tests, GHE).
    pub fn with_api_base(token: &str, repo: &str, api_base: &str) -> Result<Self, AuditError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| AuditError::config("GitHub token contains invalid characters"))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/vnd.github+json"),
        );

        let http = reqwest::Client::builder()
            .user_agent(concat!("repo-radar/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(AuditError::upstream)?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            repo: repo.to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, AuditError> {
        debug!("GET {}", url);

        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AuditError::upstream(format!("GitHub request timed out: {}", url))
            } else if e.is_connect() {
                AuditError::upstream(format!("Cannot connect to GitHub API at {}", self.api_base))
            } else {
                AuditError::upstream(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuditError::upstream(format!(
                "GitHub API error {} for {}: {}",
                status, url, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuditError::upstream(format!("Failed to parse GitHub response: {}", e)))
    }
}

#[async_trait]
impl RepoAccessor for GithubClient {
    fn full_name(&self) -> &str {
        &self.repo
    }

    async fn search_prs(&self, query: &str) -> Result<Vec<u64>, AuditError> {
        let mut numbers = Vec::new();
        let mut page = 1usize;

        loop {
            let url = format!(
                "{}/search/issues?q={}&per_page={}&page={}",
                self.api_base,
                urlencode(query),
                SEARCH_PAGE_SIZE,
                page
            );
            let response: SearchResponse = self.get_json(&url).await?;
            let count = response.items.len();
            numbers.extend(response.items.into_iter().map(|item| item.number));

            if count < SEARCH_PAGE_SIZE {
                break;
            }
            page += 1;
        }

        debug!("search '{}' matched {} PRs", query, numbers.len());
        Ok(numbers)
    }

    async fn get_pull(&self, number: u64) -> Result<PullRequest, AuditError> {
        let url = format!("{}/repos/{}/pulls/{}", self.api_base, self.repo, number);
        let wire: PullWire = self.get_json(&url).await?;
        Ok(wire.into())
    }
}

fn urlencode(query: &str) -> String {
    // Percent-encode the handful of characters GitHub search queries use.
    query
        .replace('%', "%25")
        .replace(' ', "%20")
        .replace(':', "%3A")
        .replace('/', "%2F")
        .replace('.', "%2E")
}

/// In-memory accessor used by unit tests across the crate.
#[cfg(test)]
pub mod fake {
    use super::*;
    use chrono::TimeZone;

    /// Serves pull requests from a fixed in-memory list.
    pub struct FakeRepo {
        pub pulls: Vec<PullRequest>,
        pub fail_search: bool,
    }

    impl FakeRepo {
        pub fn new(pulls: Vec<PullRequest>) -> Self {
            Self {
                pulls,
                fail_search: false,
            }
        }

        pub fn failing() -> Self {
            Self {
                pulls: Vec::new(),
                fail_search: true,
            }
        }
    }

    #[async_trait]
    impl RepoAccessor for FakeRepo {
        fn full_name(&self) -> &str {
            "acme/widgets"
        }

        async fn search_prs(&self, query: &str) -> Result<Vec<u64>, AuditError> {
            if self.fail_search {
                return Err(AuditError::upstream("simulated GitHub outage"));
            }

            let want_open = query.contains("is:open");
            Ok(self
                .pulls
                .iter()
                .filter(|pr| (pr.state == "open") == want_open)
                .map(|pr| pr.number)
                .collect())
        }

        async fn get_pull(&self, number: u64) -> Result<PullRequest, AuditError> {
            self.pulls
                .iter()
                .find(|pr| pr.number == number)
                .cloned()
                .ok_or_else(|| AuditError::upstream(format!("no such PR #{}", number)))
        }
    }

    /// Build a pull request with the given shape; helper for tests.
    pub fn pull(
        number: u64,
        author: &str,
        created: (i32, u32, u32),
        closed: Option<(i32, u32, u32)>,
        merged: bool,
        changed_files: u64,
    ) -> PullRequest {
        let created_at = Utc
            .with_ymd_and_hms(created.0, created.1, created.2, 12, 0, 0)
            .unwrap();
        let closed_at =
            closed.map(|(y, m, d)| Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap());
        PullRequest {
            number,
            title: format!("PR #{}", number),
            author_login: author.to_string(),
            created_at,
            closed_at,
            merged,
            changed_files,
            html_url: format!("https://example.test/pr/{}", number),
            state: if closed.is_some() { "closed" } else { "open" }.to_string(),
        }
    }
}
