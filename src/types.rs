use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Page size used for every paginated REST listing.
pub const PER_PAGE: usize = 100;

/// Errors surfaced by the GitHub API seam.
///
/// `Status` keeps the HTTP status and GitHub's message so callers can
/// classify failures such as "advanced security must be enabled".
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    #[error("rate limit still exceeded after {attempts} attempts")]
    RateLimited { attempts: usize },

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    /// Case-insensitive substring match against the error text.
    pub fn message_contains(&self, needle: &str) -> bool {
        self.to_string()
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }

    /// True for primary and secondary rate limit responses.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            ApiError::Status { status: 429, .. } => true,
            ApiError::Status { status: 403, .. } => self.message_contains("rate limit"),
            ApiError::RateLimited { .. } => true,
            _ => false,
        }
    }

    pub fn is_secondary_rate_limit(&self) -> bool {
        self.message_contains("secondary rate limit")
    }

    /// Repositories where code scanning is unavailable answer with one of
    /// these errors; bulk tools treat them as "nothing to do".
    pub fn is_code_scanning_unavailable(&self) -> bool {
        self.message_contains("advanced security must be enabled")
            || self.message_contains("code security must be enabled")
            || self.is_not_found()
            || self.is_forbidden()
    }
}

/// HTTP verbs used for mutating REST calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Put,
    Patch,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Post => write!(f, "POST"),
            Method::Put => write!(f, "PUT"),
            Method::Patch => write!(f, "PATCH"),
        }
    }
}

/// Abstraction over the GitHub REST and GraphQL endpoints.
///
/// Every bulk tool is written against this trait so that workflows can be
/// driven by an in-memory implementation in tests.
#[async_trait]
pub trait Api: Send + Sync {
    async fn get(&self, route: &str, query: &[(&str, String)]) -> Result<Value, ApiError>;

    async fn send(&self, method: Method, route: &str, body: Value) -> Result<Value, ApiError>;

    /// Runs a GraphQL document and returns its `data` member.
    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, ApiError>;

    /// Number of requests issued so far, retries included.
    fn api_calls(&self) -> usize;

    /// Fetches every page of a REST listing that returns a JSON array.
    async fn paginate(
        &self,
        route: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<Value>, ApiError> {
        let mut items = Vec::new();
        let mut page = 1usize;

        loop {
            let mut params: Vec<(&str, String)> = query.to_vec();
            params.push(("per_page", PER_PAGE.to_string()));
            params.push(("page", page.to_string()));

            let response = self.get(route, &params).await?;
            let batch = match response {
                Value::Array(values) => values,
                other => {
                    return Err(ApiError::Decode(format!(
                        "expected a JSON array from {route}, got {other}"
                    )));
                }
            };

            let len = batch.len();
            items.extend(batch);

            if len < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(items)
    }
}

/// Validation errors for `owner/repo` identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
    #[error("expected 'owner/repo', got '{0}'")]
    InvalidFormat(String),
    #[error("owner must not be empty")]
    EmptyOwner,
    #[error("repository name must not be empty")]
    EmptyName,
}

/// A repository identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Repo {
    pub owner: String,
    pub name: String,
}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, RepoError> {
        let owner = owner.into();
        let name = name.into();
        if owner.trim().is_empty() {
            return Err(RepoError::EmptyOwner);
        }
        if name.trim().is_empty() {
            return Err(RepoError::EmptyName);
        }
        Ok(Self { owner, name })
    }

    /// Parses the strict `owner/repo` form.
    pub fn parse(value: &str) -> Result<Self, RepoError> {
        let parts: Vec<&str> = value.trim().split('/').collect();
        if parts.len() != 2 {
            return Err(RepoError::InvalidFormat(value.to_string()));
        }
        Self::new(parts[0], parts[1])
    }

    /// Parses a repository list entry: either `owner/repo` or a URL whose
    /// last two path segments name the repository.
    pub fn parse_line(line: &str) -> Result<Self, RepoError> {
        let line = line.trim();
        if line.starts_with("https://") || line.starts_with("http://") {
            let url = url::Url::parse(line)
                .map_err(|_| RepoError::InvalidFormat(line.to_string()))?;
            let segments: Vec<&str> = url
                .path_segments()
                .map(|segments| segments.filter(|s| !s.is_empty()).collect())
                .unwrap_or_default();
            if segments.len() < 2 {
                return Err(RepoError::InvalidFormat(line.to_string()));
            }
            let name = segments[segments.len() - 1].trim_end_matches(".git");
            return Self::new(segments[segments.len() - 2], name);
        }
        Self::parse(line)
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Outcome tag carried by every per-item result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemStatus {
    Success,
    Error,
    DryRun,
    Skipped,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Success => "success",
            ItemStatus::Error => "error",
            ItemStatus::DryRun => "dry-run",
            ItemStatus::Skipped => "skipped",
        }
    }

    /// Marker used in human-readable result listings.
    pub fn icon(&self) -> &'static str {
        match self {
            ItemStatus::Success => "✓",
            ItemStatus::DryRun => "○",
            ItemStatus::Skipped => "-",
            ItemStatus::Error => "✗",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads a string member, treating `null` and missing as `None`.
pub fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Reads a string at a JSON pointer such as `/rule/id`.
pub fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}
