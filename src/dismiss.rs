//! Bulk dismissal of open code scanning alerts that match one rule.

use std::{fmt, str::FromStr};

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::{
    auth::ClientFactory,
    batch::process_in_batches,
    csv::CsvTable,
    types::{Api, ApiError, ItemStatus, Method, str_at},
};

pub const DEFAULT_CONCURRENCY: usize = 10;

/// Reasons accepted by the alert update endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    FalsePositive,
    WontFix,
    UsedInTests,
}

impl DismissReason {
    pub const ALL: [DismissReason; 3] = [
        DismissReason::FalsePositive,
        DismissReason::WontFix,
        DismissReason::UsedInTests,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DismissReason::FalsePositive => "false positive",
            DismissReason::WontFix => "won't fix",
            DismissReason::UsedInTests => "used in tests",
        }
    }
}

impl fmt::Display for DismissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DismissReason {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|reason| reason.as_str() == s)
            .with_context(|| {
                let valid: Vec<String> = Self::ALL
                    .iter()
                    .map(|r| format!("\"{}\"", r.as_str()))
                    .collect();
                format!("Invalid reason. Must be one of: {}", valid.join(", "))
            })
    }
}

/// The fields of an alert that end up in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub number: u64,
    pub rule_id: String,
    pub severity: String,
    pub path: String,
    pub url: String,
}

impl Alert {
    pub fn from_value(value: &Value) -> Option<Self> {
        let number = value.get("number").and_then(Value::as_u64)?;
        let rule_id = str_at(value, "/rule/id")?.to_string();
        let severity = str_at(value, "/rule/security_severity_level")
            .or_else(|| str_at(value, "/rule/severity"))
            .unwrap_or("unknown")
            .to_string();
        let path = str_at(value, "/most_recent_instance/location/path")
            .unwrap_or("unknown")
            .to_string();
        let url = str_at(value, "/html_url").unwrap_or_default().to_string();

        Some(Self {
            number,
            rule_id,
            severity,
            path,
            url,
        })
    }
}

fn matches_rule(value: &Value, rule: &str) -> bool {
    str_at(value, "/rule/id") == Some(rule)
}

/// Open alerts for `rule` in one repository. Repositories without code
/// scanning yield no alerts.
pub async fn fetch_matching_alerts(
    api: &dyn Api,
    org: &str,
    repo: &str,
    rule: &str,
) -> Result<Vec<Alert>, ApiError> {
    let route = format!("/repos/{org}/{repo}/code-scanning/alerts");
    match api.paginate(&route, &[("state", "open".to_string())]).await {
        Ok(alerts) => Ok(alerts
            .iter()
            .filter(|a| matches_rule(a, rule))
            .filter_map(Alert::from_value)
            .collect()),
        Err(e) if e.is_code_scanning_unavailable() || e.message_contains("no analysis found") => {
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Open alerts for `rule` across an organization, grouped by repository in
/// first-seen order.
pub async fn fetch_matching_alerts_for_org(
    api: &dyn Api,
    org: &str,
    rule: &str,
) -> Result<Vec<(String, Vec<Alert>)>, ApiError> {
    let route = format!("/orgs/{org}/code-scanning/alerts");
    let alerts = match api.paginate(&route, &[("state", "open".to_string())]).await {
        Ok(alerts) => alerts,
        Err(e) if e.is_code_scanning_unavailable() => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut by_repo: Vec<(String, Vec<Alert>)> = Vec::new();
    for value in alerts.iter().filter(|a| matches_rule(a, rule)) {
        let (Some(repo), Some(alert)) = (str_at(value, "/repository/name"), Alert::from_value(value))
        else {
            continue;
        };
        match by_repo.iter_mut().find(|(name, _)| name == repo) {
            Some((_, list)) => list.push(alert),
            None => by_repo.push((repo.to_string(), vec![alert])),
        }
    }

    Ok(by_repo)
}

pub async fn dismiss_alert(
    api: &dyn Api,
    org: &str,
    repo: &str,
    number: u64,
    reason: DismissReason,
    comment: Option<&str>,
) -> Result<(), ApiError> {
    let mut body = json!({
        "state": "dismissed",
        "dismissed_reason": reason.as_str(),
    });
    if let Some(comment) = comment {
        body["dismissed_comment"] = json!(comment);
    }

    let route = format!("/repos/{org}/{repo}/code-scanning/alerts/{number}");
    api.send(Method::Patch, &route, body).await.map(|_| ())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DismissStatus {
    Dismissed,
    WouldDismiss,
    Error(String),
}

impl DismissStatus {
    pub fn item_status(&self) -> ItemStatus {
        match self {
            DismissStatus::Dismissed => ItemStatus::Success,
            DismissStatus::WouldDismiss => ItemStatus::DryRun,
            DismissStatus::Error(_) => ItemStatus::Error,
        }
    }
}

impl fmt::Display for DismissStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DismissStatus::Dismissed => write!(f, "dismissed"),
            DismissStatus::WouldDismiss => write!(f, "would dismiss (dry-run)"),
            DismissStatus::Error(message) => write!(f, "error: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DismissResult {
    pub organization: String,
    pub repository: String,
    pub alert: Alert,
    pub status: DismissStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DismissOptions {
    pub rule: String,
    pub reason: DismissReason,
    pub comment: Option<String>,
    pub dry_run: bool,
    pub concurrency: usize,
}

async fn dismiss_one(
    api: &dyn Api,
    org: &str,
    repo: &str,
    alert: &Alert,
    options: &DismissOptions,
) -> DismissResult {
    let status = if options.dry_run {
        DismissStatus::WouldDismiss
    } else {
        match dismiss_alert(
            api,
            org,
            repo,
            alert.number,
            options.reason,
            options.comment.as_deref(),
        )
        .await
        {
            Ok(()) => {
                info!(
                    "  ✓ Dismissed: {}#{} ({}) - {}",
                    repo, alert.number, alert.rule_id, alert.path
                );
                DismissStatus::Dismissed
            }
            Err(e) => {
                warn!("  ✗ Failed: {}#{} - {}", repo, alert.number, e);
                DismissStatus::Error(e.to_string())
            }
        }
    };

    DismissResult {
        organization: org.to_string(),
        repository: repo.to_string(),
        alert: alert.clone(),
        status,
    }
}

/// Single-repository mode: lists the repository's alerts and dismisses the
/// matching ones in order.
pub async fn process_repository(
    api: &dyn Api,
    org: &str,
    repo: &str,
    options: &DismissOptions,
) -> Result<Vec<DismissResult>, ApiError> {
    let alerts = fetch_matching_alerts(api, org, repo, &options.rule).await?;

    let mut results = Vec::with_capacity(alerts.len());
    for alert in &alerts {
        results.push(dismiss_one(api, org, repo, alert, options).await);
    }
    Ok(results)
}

/// Dismisses alerts gathered by the organization listing, a window at a time.
pub async fn process_alerts(
    api: &dyn Api,
    org: &str,
    alerts_by_repo: &[(String, Vec<Alert>)],
    options: &DismissOptions,
) -> Vec<DismissResult> {
    let flattened: Vec<(&str, &Alert)> = alerts_by_repo
        .iter()
        .flat_map(|(repo, alerts)| alerts.iter().map(move |alert| (repo.as_str(), alert)))
        .collect();

    process_in_batches(
        &flattened,
        options.concurrency,
        "Dismissing",
        |(repo, alert)| format!("{}#{}", repo, alert.number),
        |(repo, alert)| dismiss_one(api, org, repo, alert, options),
    )
    .await
}

/// Runs one organization, through the repository API when `repo` is given
/// and the organization alert listing otherwise.
pub async fn process_org(
    api: &dyn Api,
    org: &str,
    repo: Option<&str>,
    options: &DismissOptions,
) -> Result<Vec<DismissResult>, ApiError> {
    if let Some(repo) = repo {
        info!("Checking repository: {}", repo);
        return process_repository(api, org, repo, options).await;
    }

    info!(
        "Fetching alerts for rule \"{}\" across organization...",
        options.rule
    );
    let alerts_by_repo = fetch_matching_alerts_for_org(api, org, &options.rule).await?;
    let alert_count: usize = alerts_by_repo.iter().map(|(_, alerts)| alerts.len()).sum();
    info!(
        "Found {} matching alert(s) across {} repository(ies)",
        alert_count,
        alerts_by_repo.len()
    );

    Ok(process_alerts(api, org, &alerts_by_repo, options).await)
}

/// Counts of dismissal outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DismissTally {
    pub dismissed: usize,
    pub would_dismiss: usize,
    pub errors: usize,
}

impl DismissTally {
    pub fn from_results(results: &[DismissResult]) -> Self {
        let mut tally = Self::default();
        for result in results {
            match result.status {
                DismissStatus::Dismissed => tally.dismissed += 1,
                DismissStatus::WouldDismiss => tally.would_dismiss += 1,
                DismissStatus::Error(_) => tally.errors += 1,
            }
        }
        tally
    }

    pub fn org_line(&self, dry_run: bool) -> String {
        if dry_run {
            return format!("Found {} alert(s) that would be dismissed", self.would_dismiss);
        }
        if self.errors > 0 {
            format!(
                "Dismissed {} alert(s), {} error(s)",
                self.dismissed, self.errors
            )
        } else {
            format!("Dismissed {} alert(s)", self.dismissed)
        }
    }
}

/// Processes every organization. With more than one, an organization that
/// cannot be authenticated or listed is skipped; with one, that is fatal.
pub async fn run(
    factory: &dyn ClientFactory,
    orgs: &[String],
    repo: Option<&str>,
    options: &DismissOptions,
) -> Result<Vec<DismissResult>> {
    let multi_org = orgs.len() > 1;
    let mut all_results = Vec::new();

    for (index, org) in orgs.iter().enumerate() {
        if multi_org {
            info!(
                "[{}/{}] Processing organization: {}",
                index + 1,
                orgs.len(),
                org
            );
        } else {
            info!("Processing organization: {}", org);
        }

        let api = match factory.client_for_org(org).await {
            Ok(api) => api,
            Err(e) if multi_org => {
                error!("Failed to authenticate for {}: {:#}", org, e);
                warn!("Skipping organization: {}", org);
                continue;
            }
            Err(e) => return Err(e.context(format!("Failed to authenticate for {org}"))),
        };

        let calls_before = api.api_calls();
        let results = match process_org(api.as_ref(), org, repo, options).await {
            Ok(results) => results,
            Err(e) if multi_org => {
                error!("Failed to fetch alerts for {}: {}", org, e);
                warn!("Skipping organization: {}", org);
                continue;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("Failed to fetch alerts for {org}")));
            }
        };

        info!(
            "API calls used for {}: {}",
            org,
            api.api_calls().saturating_sub(calls_before)
        );
        info!("{}", DismissTally::from_results(&results).org_line(options.dry_run));

        all_results.extend(results);
    }

    Ok(all_results)
}

pub fn results_table(results: &[DismissResult]) -> CsvTable {
    let mut table = CsvTable::new([
        "Organization",
        "Repository",
        "Alert Number",
        "Rule ID",
        "Severity",
        "Path",
        "URL",
        "Status",
    ]);
    for r in results {
        table.push(vec![
            r.organization.clone(),
            r.repository.clone(),
            r.alert.number.to_string(),
            r.alert.rule_id.clone(),
            r.alert.severity.clone(),
            r.alert.path.clone(),
            r.alert.url.clone(),
            r.status.to_string(),
        ]);
    }
    table
}
