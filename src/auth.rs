use std::{
    path::PathBuf,
    process::Command,
    sync::{Arc, atomic::AtomicUsize},
    time::Duration,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    github::{ClientOptions, GitHub},
    jwt::generate_jwt,
    types::Api,
};

const USER_AGENT: &str = concat!("ghbulk/", env!("CARGO_PKG_VERSION"));

pub fn get_github_token() -> Result<String> {
    // Prefer environment variables over gh CLI to avoid subprocess overhead.
    if let Some(token) = non_empty_env("GITHUB_TOKEN") {
        return Ok(token);
    }

    if let Some(token) = non_empty_env("GH_TOKEN") {
        return Ok(token);
    }

    let output = Command::new("gh")
        .args(["auth", "token"])
        .output()
        .context("Failed to run 'gh auth token'")?;

    if !output.status.success() {
        anyhow::bail!("Failed to get GitHub token from gh CLI. Please run 'gh auth login' first");
    }

    let token = String::from_utf8(output.stdout)?.trim().to_string();

    if token.is_empty() {
        anyhow::bail!("Empty token returned from gh CLI");
    }

    Ok(token)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// GitHub App identity read from `GITHUB_APP_*` variables.
#[derive(Clone)]
pub struct AppCredentials {
    pub app_id: String,
    pub private_key: Vec<u8>,
    pub installation_id: Option<u64>,
}

impl std::fmt::Debug for AppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppCredentials")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .finish_non_exhaustive()
    }
}

impl AppCredentials {
    /// Returns `None` unless both the app id and key path are set.
    pub fn from_env() -> Result<Option<Self>> {
        let (Some(app_id), Some(key_path)) = (
            non_empty_env("GITHUB_APP_ID"),
            non_empty_env("GITHUB_APP_PRIVATE_KEY_PATH"),
        ) else {
            return Ok(None);
        };

        let key_path = PathBuf::from(key_path);
        let private_key = std::fs::read(&key_path).with_context(|| {
            format!("Failed to read private key file: {}", key_path.display())
        })?;

        let installation_id = non_empty_env("GITHUB_APP_INSTALLATION_ID")
            .map(|id| {
                id.trim()
                    .parse::<u64>()
                    .with_context(|| format!("Invalid GITHUB_APP_INSTALLATION_ID: '{id}'"))
            })
            .transpose()?;

        Ok(Some(Self {
            app_id,
            private_key,
            installation_id,
        }))
    }
}

#[derive(Debug, Clone)]
pub enum Credentials {
    App(AppCredentials),
    Token(String),
}

impl Credentials {
    /// App credentials win when configured; otherwise a token is looked up.
    pub fn from_env() -> Result<Self> {
        if let Some(app) = AppCredentials::from_env()? {
            info!(app_id = %app.app_id, "Using GitHub App authentication");
            return Ok(Credentials::App(app));
        }

        get_github_token().map(Credentials::Token).context(
            "Authentication required. Set either:\n  \
             - GITHUB_TOKEN (or GH_TOKEN, or log in with 'gh auth login'), or\n  \
             - GITHUB_APP_ID and GITHUB_APP_PRIVATE_KEY_PATH",
        )
    }

    /// Token read from a single named variable, as used for the source and
    /// target sides of a discussion copy.
    pub fn token_from_var(name: &str) -> Result<Self> {
        non_empty_env(name)
            .map(Credentials::Token)
            .with_context(|| format!("{name} environment variable is required"))
    }
}

#[derive(Debug, Deserialize)]
struct Installation {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct InstallationToken {
    token: String,
}

/// Source of API clients scoped to an organization.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn client_for_org(&self, org: &str) -> Result<Arc<dyn Api>>;
}

/// Creates authenticated [`GitHub`] clients that share one call counter.
pub struct Connector {
    credentials: Credentials,
    options: ClientOptions,
    calls: Arc<AtomicUsize>,
    http: ClientWithMiddleware,
}

impl Connector {
    pub fn new(credentials: Credentials, options: ClientOptions) -> Result<Self> {
        Self::with_counter(credentials, options, Arc::new(AtomicUsize::new(0)))
    }

    pub fn with_counter(
        credentials: Credentials,
        options: ClientOptions,
        calls: Arc<AtomicUsize>,
    ) -> Result<Self> {
        let base_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        // Transient failures on the app endpoints are retried with backoff.
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(250), Duration::from_secs(5))
            .build_with_max_retries(3);

        let http = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            credentials,
            options,
            calls,
            http,
        })
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Client for work that is not scoped to one organization. App auth
    /// needs `GITHUB_APP_INSTALLATION_ID` here.
    pub async fn client(&self) -> Result<GitHub> {
        match &self.credentials {
            Credentials::Token(token) => self.token_client(token),
            Credentials::App(app) => {
                let installation_id = app.installation_id.context(
                    "GITHUB_APP_INSTALLATION_ID is required for GitHub App authentication",
                )?;
                let token = self.installation_token(app, installation_id).await?;
                self.token_client(&token)
            }
        }
    }

    /// Client for `org`. With App auth the installation is looked up unless
    /// one was configured explicitly.
    pub async fn github_for_org(&self, org: &str) -> Result<GitHub> {
        match &self.credentials {
            Credentials::Token(token) => self.token_client(token),
            Credentials::App(app) => {
                let installation_id = match app.installation_id {
                    Some(id) => id,
                    None => self.org_installation_id(app, org).await?,
                };
                let token = self.installation_token(app, installation_id).await?;
                self.token_client(&token)
            }
        }
    }

    fn token_client(&self, token: &str) -> Result<GitHub> {
        GitHub::with_token(token, &self.options, Arc::clone(&self.calls))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.options.api_url.trim_end_matches('/'), path)
    }

    async fn org_installation_id(&self, app: &AppCredentials, org: &str) -> Result<u64> {
        let jwt = generate_jwt(&app.app_id, &app.private_key)?;
        self.count_call();

        let response = self
            .http
            .get(self.endpoint(&format!("/orgs/{org}/installation")))
            .bearer_auth(jwt)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .with_context(|| format!("Failed to look up GitHub App installation for {org}"))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            anyhow::bail!("GitHub App is not installed on organization: {}", org);
        }

        let installation: Installation = response
            .error_for_status()
            .with_context(|| format!("Failed to look up GitHub App installation for {org}"))?
            .json()
            .await
            .context("Failed to decode installation response")?;

        debug!(org, installation_id = installation.id, "Resolved app installation");
        Ok(installation.id)
    }

    async fn installation_token(&self, app: &AppCredentials, installation_id: u64) -> Result<String> {
        let jwt = generate_jwt(&app.app_id, &app.private_key)?;
        self.count_call();

        let token: InstallationToken = self
            .http
            .post(self.endpoint(&format!(
                "/app/installations/{installation_id}/access_tokens"
            )))
            .bearer_auth(jwt)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .context("Failed to request installation access token")?
            .error_for_status()
            .with_context(|| {
                format!("GitHub rejected the token request for installation {installation_id}")
            })?
            .json()
            .await
            .context("Failed to decode installation access token")?;

        Ok(token.token)
    }

    fn count_call(&self) {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }
}

#[async_trait]
impl ClientFactory for Connector {
    async fn client_for_org(&self, org: &str) -> Result<Arc<dyn Api>> {
        let client = self.github_for_org(org).await?;
        Ok(Arc::new(client))
    }
}
