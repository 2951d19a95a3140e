use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_humanize::HumanTime;
use octocrab::Octocrab;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::types::{Api, ApiError, Method};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_MAX_RETRIES: usize = 3;

/// Wait used for secondary rate limits, which carry no reset time.
const SECONDARY_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);
/// Upper bound on a single rate-limit wait.
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(15 * 60);

/// Connection settings shared by every client a tool creates.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_url: String,
    pub max_retries: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ClientOptions {
    /// Reads `GITHUB_API_URL`, falling back to the public API.
    pub fn from_env(max_retries: usize) -> Self {
        let api_url = std::env::var("GITHUB_API_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self {
            api_url,
            max_retries,
        }
    }

    /// Replaces the API URL with the value of `var` when it is set.
    pub fn with_api_url_from(mut self, var: &str) -> Self {
        if let Some(url) = std::env::var(var).ok().filter(|url| !url.trim().is_empty()) {
            self.api_url = url;
        }
        self
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitResponse {
    resources: RateLimitResources,
}

#[derive(Debug, Deserialize)]
struct RateLimitResources {
    core: RateLimitBucket,
}

/// One bucket of `GET /rate_limit`.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitBucket {
    pub limit: u64,
    pub remaining: u64,
    pub reset: i64,
}

impl RateLimitBucket {
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.reset, 0)
    }

    /// Renders e.g. `4990/5000 remaining (resets in 12 minutes)`.
    pub fn summary(&self) -> String {
        let reset = self
            .reset_at()
            .map(|at| HumanTime::from(at).to_string())
            .unwrap_or_else(|| "at an unknown time".to_string());
        format!(
            "{}/{} remaining (resets {})",
            self.remaining, self.limit, reset
        )
    }
}

/// GitHub API client backed by octocrab.
///
/// Clones share the request counter, so a tool that creates one client per
/// organization still reports a process-wide total.
#[derive(Clone)]
pub struct GitHub {
    client: Octocrab,
    calls: Arc<AtomicUsize>,
    max_retries: usize,
}

impl GitHub {
    pub fn new(client: Octocrab, calls: Arc<AtomicUsize>, max_retries: usize) -> Self {
        Self {
            client,
            calls,
            max_retries,
        }
    }

    /// Builds a client authenticated with a bearer token.
    pub fn with_token(
        token: impl Into<String>,
        options: &ClientOptions,
        calls: Arc<AtomicUsize>,
    ) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(token.into())
            .base_uri(options.api_url.as_str())
            .with_context(|| format!("Invalid GitHub API URL: '{}'", options.api_url))?
            .build()
            .context("Failed to create GitHub client")?;
        Ok(Self::new(client, calls, options.max_retries))
    }

    /// Returns the core rate limit bucket. GitHub does not charge this request
    /// against the quota, but it is still included in `api_calls`.
    pub async fn rate_limit(&self) -> Result<RateLimitBucket, ApiError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let response: Value = self
            .client
            .get("/rate_limit", None::<&()>)
            .await
            .map_err(classify)?;
        let parsed: RateLimitResponse =
            serde_json::from_value(response).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(parsed.resources.core)
    }

    async fn backoff_for(&self, secondary: bool) -> Duration {
        if secondary {
            return SECONDARY_RATE_LIMIT_WAIT;
        }

        match self.rate_limit().await {
            Ok(bucket) => wait_until_reset(bucket.reset, Utc::now().timestamp()),
            Err(e) => {
                debug!(error = %e, "Could not read rate limit reset time");
                SECONDARY_RATE_LIMIT_WAIT
            }
        }
    }

    async fn raw_get(&self, route: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        let params = if query.is_empty() { None } else { Some(&query) };
        self.client.get(route, params).await.map_err(classify)
    }

    async fn raw_send(&self, method: Method, route: &str, body: &Value) -> Result<Value, ApiError> {
        let result = match method {
            Method::Post => self.client.post(route, Some(body)).await,
            Method::Put => self.client.put(route, Some(body)).await,
            Method::Patch => self.client.patch(route, Some(body)).await,
        };
        result.map_err(classify)
    }
}

#[async_trait]
impl Api for GitHub {
    async fn get(&self, route: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        debug!(route, "GET");
        retry_on_rate_limit(
            self.max_retries,
            &self.calls,
            || self.raw_get(route, query),
            |secondary| self.backoff_for(secondary),
        )
        .await
    }

    async fn send(&self, method: Method, route: &str, body: Value) -> Result<Value, ApiError> {
        debug!(route, %method, "send");
        retry_on_rate_limit(
            self.max_retries,
            &self.calls,
            || self.raw_send(method, route, &body),
            |secondary| self.backoff_for(secondary),
        )
        .await
    }

    async fn graphql(&self, query: &str, variables: Value) -> Result<Value, ApiError> {
        let payload = json!({ "query": query, "variables": variables });
        let response = retry_on_rate_limit(
            self.max_retries,
            &self.calls,
            || async {
                self.client
                    .graphql::<Value>(&payload)
                    .await
                    .map_err(classify)
            },
            |secondary| self.backoff_for(secondary),
        )
        .await?;
        graphql_data(response)
    }

    fn api_calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

/// Splits a GraphQL envelope into its data, turning `errors` into an error.
pub fn graphql_data(response: Value) -> Result<Value, ApiError> {
    if let Some(errors) = response.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(Value::as_str))
                .collect();
            let joined = messages.join("; ");
            if joined.to_lowercase().contains("rate limit") {
                return Err(ApiError::Status {
                    status: 403,
                    message: joined,
                });
            }
            return Err(ApiError::GraphQl(joined));
        }
    }

    match response.get("data") {
        Some(data) if !data.is_null() => Ok(data.clone()),
        _ => Err(ApiError::Decode("GraphQL response carried no data".into())),
    }
}

fn classify(err: octocrab::Error) -> ApiError {
    match err {
        octocrab::Error::GitHub { source, .. } => ApiError::Status {
            status: source.status_code.as_u16(),
            message: source.message.clone(),
        },
        other => ApiError::Transport(other.to_string()),
    }
}

/// Seconds until `reset`, clamped to at least one second and at most
/// [`MAX_RATE_LIMIT_WAIT`].
pub fn wait_until_reset(reset: i64, now: i64) -> Duration {
    let secs = (reset - now).max(1) as u64;
    Duration::from_secs(secs).min(MAX_RATE_LIMIT_WAIT)
}

/// Issues `call`, retrying up to `max_retries` times while it reports a rate
/// limit. Each attempt is counted; `backoff` supplies the wait and is told
/// whether the limit was a secondary one.
pub async fn retry_on_rate_limit<C, CF, B, BF>(
    max_retries: usize,
    calls: &AtomicUsize,
    mut call: C,
    mut backoff: B,
) -> Result<Value, ApiError>
where
    C: FnMut() -> CF,
    CF: Future<Output = Result<Value, ApiError>>,
    B: FnMut(bool) -> BF,
    BF: Future<Output = Duration>,
{
    let mut retries = 0usize;

    loop {
        calls.fetch_add(1, Ordering::Relaxed);
        match call().await {
            Err(err) if err.is_rate_limited() => {
                if retries >= max_retries {
                    warn!(attempts = retries + 1, "Rate limit retries exhausted");
                    return Err(ApiError::RateLimited {
                        attempts: retries + 1,
                    });
                }
                retries += 1;
                let secondary = err.is_secondary_rate_limit();
                let wait = backoff(secondary).await;
                let kind = if secondary {
                    "Secondary rate limit"
                } else {
                    "Rate limit"
                };
                warn!(
                    retry = retries,
                    max_retries,
                    "{} hit, retrying after {} seconds...",
                    kind,
                    wait.as_secs()
                );
                tokio::time::sleep(wait).await;
            }
            other => return other,
        }
    }
}
