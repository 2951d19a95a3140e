//! Per-repository code scanning lookups. Each lookup folds API failures into
//! a reportable value so one repository never aborts the report.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::types::{Api, str_at};

static CATEGORY_LANGUAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"language:([a-zA-Z0-9_-]+)").expect("category pattern is valid")
});

/// Whether code scanning is producing results for a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeqlStatus {
    Yes,
    NoScans,
    Disabled,
    RequiresGhas,
    /// Archived repositories that refuse the request.
    NotApplicable,
    Unknown,
}

impl CodeqlStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeqlStatus::Yes => "Yes",
            CodeqlStatus::NoScans => "No Scans",
            CodeqlStatus::Disabled => "Disabled",
            CodeqlStatus::RequiresGhas => "Requires GHAS",
            CodeqlStatus::NotApplicable => "N/A",
            CodeqlStatus::Unknown => "Unknown",
        }
    }

    /// Statuses that call for enabling scanning.
    pub fn needs_enablement(&self) -> bool {
        matches!(
            self,
            CodeqlStatus::Disabled | CodeqlStatus::RequiresGhas | CodeqlStatus::NoScans
        )
    }
}

impl fmt::Display for CodeqlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub async fn check_codeql_status(
    api: &dyn Api,
    org: &str,
    repo: &str,
    is_archived: bool,
) -> CodeqlStatus {
    let route = format!("/repos/{org}/{repo}/code-scanning/analyses");
    match api.get(&route, &[("per_page", "1".to_string())]).await {
        Ok(Value::Array(analyses)) if !analyses.is_empty() => CodeqlStatus::Yes,
        Ok(_) => CodeqlStatus::NoScans,
        Err(e) => {
            debug!(repo, error = %e, "Code scanning status lookup failed");
            if e.message_contains("advanced security must be enabled") {
                CodeqlStatus::RequiresGhas
            } else if e.message_contains("code security must be enabled") {
                CodeqlStatus::Disabled
            } else if e.message_contains("no analysis found") {
                CodeqlStatus::NoScans
            } else if e.is_not_found() || e.is_forbidden() {
                if is_archived {
                    CodeqlStatus::NotApplicable
                } else {
                    CodeqlStatus::Disabled
                }
            } else {
                CodeqlStatus::Unknown
            }
        }
    }
}

/// Summary of the most recent default-branch analyses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanningInfo {
    pub last_scan_date: Option<String>,
    pub scanned_languages: Vec<String>,
    pub analysis_error: Option<String>,
    pub analysis_warning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Analysis {
    created_at: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warning: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Scanned languages named by `language:<name>` categories, unique and in
/// first-seen order.
pub fn languages_from_categories<'a, I>(categories: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut languages: Vec<String> = Vec::new();
    for category in categories {
        if let Some(caps) = CATEGORY_LANGUAGE.captures(category) {
            let lang = caps[1].to_string();
            if !languages.contains(&lang) {
                languages.push(lang);
            }
        }
    }
    languages
}

pub async fn fetch_scanning_info(
    api: &dyn Api,
    org: &str,
    repo: &str,
    default_branch: &str,
) -> ScanningInfo {
    let route = format!("/repos/{org}/{repo}/code-scanning/analyses");
    let query = [
        ("ref", format!("refs/heads/{default_branch}")),
        ("per_page", "100".to_string()),
    ];

    let analyses: Vec<Analysis> = match api.get(&route, &query).await {
        Ok(value) => match serde_json::from_value(value) {
            Ok(analyses) => analyses,
            Err(e) => {
                debug!(repo, error = %e, "Scanning info decode failed");
                return ScanningInfo::default();
            }
        },
        Err(e) => {
            debug!(repo, error = %e, "Scanning info lookup failed");
            return ScanningInfo::default();
        }
    };

    let Some(latest) = analyses.first() else {
        return ScanningInfo::default();
    };

    ScanningInfo {
        last_scan_date: latest.created_at.clone(),
        scanned_languages: languages_from_categories(
            analyses.iter().filter_map(|a| a.category.as_deref()),
        ),
        analysis_error: non_empty(latest.error.clone()),
        analysis_warning: non_empty(latest.warning.clone()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertCounts {
    pub open: usize,
    pub critical: usize,
}

/// Counts open alerts and those rated critical. `None` when the alerts
/// could not be listed.
pub async fn fetch_alert_counts(api: &dyn Api, org: &str, repo: &str) -> Option<AlertCounts> {
    let route = format!("/repos/{org}/{repo}/code-scanning/alerts");
    match api.paginate(&route, &[("state", "open".to_string())]).await {
        Ok(alerts) => Some(AlertCounts {
            open: alerts.len(),
            critical: alerts
                .iter()
                .filter(|a| str_at(a, "/rule/security_severity_level") == Some("critical"))
                .count(),
        }),
        Err(e) => {
            debug!(repo, error = %e, "Alert listing failed");
            None
        }
    }
}

pub async fn has_workflows(api: &dyn Api, org: &str, repo: &str) -> bool {
    let route = format!("/repos/{org}/{repo}/contents/.github/workflows");
    api.get(&route, &[]).await.is_ok()
}

/// Health of the repository's CodeQL workflows, judged by their latest runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStatus {
    NoWorkflow,
    Failing,
    Ok,
    Unknown,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::NoWorkflow => "No workflow",
            WorkflowStatus::Failing => "Failing",
            WorkflowStatus::Ok => "OK",
            WorkflowStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub async fn fetch_workflow_status(api: &dyn Api, org: &str, repo: &str) -> WorkflowStatus {
    let route = format!("/repos/{org}/{repo}/actions/workflows");
    let workflows = match api.get(&route, &[]).await {
        Ok(value) => value,
        Err(e) => {
            debug!(repo, error = %e, "Workflow listing failed");
            return WorkflowStatus::Unknown;
        }
    };

    let codeql_ids: Vec<u64> = workflows
        .get("workflows")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter(|w| {
                    w.get("name")
                        .and_then(Value::as_str)
                        .is_some_and(|name| name.to_lowercase().contains("codeql"))
                })
                .filter_map(|w| w.get("id").and_then(Value::as_u64))
                .collect()
        })
        .unwrap_or_default();

    if codeql_ids.is_empty() {
        return WorkflowStatus::NoWorkflow;
    }

    let mut has_failure = false;
    let mut has_success = false;

    for id in codeql_ids {
        let runs_route = format!("/repos/{org}/{repo}/actions/workflows/{id}/runs");
        let Ok(runs) = api.get(&runs_route, &[("per_page", "1".to_string())]).await else {
            continue;
        };
        match str_at(&runs, "/workflow_runs/0/conclusion") {
            Some("failure") => has_failure = true,
            Some("success") => has_success = true,
            _ => {}
        }
    }

    if has_failure {
        WorkflowStatus::Failing
    } else if has_success {
        WorkflowStatus::Ok
    } else {
        WorkflowStatus::Unknown
    }
}
