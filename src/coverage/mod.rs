//! Organization-wide code scanning coverage report.

pub mod inventory;
pub mod languages;
pub mod report;
pub mod scanning;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use self::{
    inventory::RepoInfo,
    languages::unscanned_languages,
    report::{CoverageRow, Summary, build_table, date_part, write_sub_reports},
    scanning::{
        check_codeql_status, fetch_alert_counts, fetch_scanning_info, fetch_workflow_status,
        has_workflows,
    },
};
use crate::{batch::process_in_batches, types::Api};

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_STALE_DAYS: u64 = 90;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageOptions {
    pub org: String,
    pub output: Option<PathBuf>,
    pub repo: Option<String>,
    pub sample: bool,
    pub check_workflow_status: bool,
    pub check_unscanned_actions: bool,
    pub fetch_alerts: bool,
    pub concurrency: usize,
    pub stale_days: u64,
    pub max_retries: usize,
}

/// Runs every lookup for one repository and assembles its row.
pub async fn process_repository(
    api: &dyn Api,
    org: &str,
    repo: &RepoInfo,
    options: &CoverageOptions,
) -> CoverageRow {
    let name = repo.name.as_str();

    let (codeql, scanning, alerts, workflows, workflow_status) = tokio::join!(
        check_codeql_status(api, org, name, repo.is_archived),
        fetch_scanning_info(api, org, name, &repo.default_branch),
        async {
            if options.fetch_alerts {
                fetch_alert_counts(api, org, name).await
            } else {
                None
            }
        },
        async {
            options.check_unscanned_actions && has_workflows(api, org, name).await
        },
        async {
            if options.check_workflow_status {
                Some(fetch_workflow_status(api, org, name).await)
            } else {
                None
            }
        },
    );

    let unscanned = unscanned_languages(
        &repo.languages,
        &scanning.scanned_languages,
        workflows,
        options.check_unscanned_actions,
    );

    CoverageRow {
        repository: repo.name.clone(),
        default_branch: repo.default_branch.clone(),
        last_updated: date_part(&repo.updated_at),
        is_archived: repo.is_archived,
        languages: repo.languages.clone(),
        codeql,
        last_scan_date: scanning.last_scan_date.as_deref().map(date_part),
        scanned_languages: scanning.scanned_languages,
        unscanned,
        alerts,
        analysis_error: scanning.analysis_error,
        analysis_warning: scanning.analysis_warning,
        workflow_status,
    }
}

/// Collects the repositories the report covers.
pub async fn select_repositories(api: &dyn Api, options: &CoverageOptions) -> Result<Vec<RepoInfo>> {
    if let Some(repo) = &options.repo {
        return inventory::fetch_single_repository(api, &options.org, repo).await;
    }

    let repos = inventory::fetch_repositories(api, &options.org).await?;
    if !options.sample {
        return Ok(repos);
    }

    let available = repos.len();
    let picked = inventory::sample(repos, &mut rand::thread_rng());
    info!(
        "Sample mode: selecting {} random repos from {} available",
        inventory::SAMPLE_SIZE,
        available
    );
    Ok(picked)
}

pub async fn process_repositories(
    api: &dyn Api,
    repos: &[RepoInfo],
    options: &CoverageOptions,
) -> Vec<CoverageRow> {
    process_in_batches(
        repos,
        options.concurrency,
        "Processing",
        |repo| repo.name.clone(),
        |repo| process_repository(api, &options.org, repo, options),
    )
    .await
}

/// Outcome of a full report run.
#[derive(Debug, Clone)]
pub struct CoverageReport {
    pub rows: Vec<CoverageRow>,
    pub csv: String,
    pub summary: Summary,
    pub sub_reports: Vec<PathBuf>,
}

/// Builds the report, writing the CSV and sub-reports when an output file is
/// configured. Without one, the caller prints `csv`.
pub async fn generate_report(api: &dyn Api, options: &CoverageOptions) -> Result<CoverageReport> {
    info!("Generating code scanning coverage report for: {}", options.org);

    let repos = select_repositories(api, options).await?;
    let rows = process_repositories(api, &repos, options).await;

    let csv = build_table(&rows, options.check_workflow_status).render();
    let summary = Summary::from_rows(&rows, options.stale_days);

    info!("Report complete. Processed {} repositories.", rows.len());
    info!("Summary: {}", summary.render());

    let mut sub_reports = Vec::new();
    if let Some(output) = &options.output {
        tokio::fs::write(output, &csv)
            .await
            .with_context(|| format!("Failed to write report to {}", output.display()))?;
        info!("Report saved to: {}", output.display());
        sub_reports = write_sub_reports(
            &rows,
            output,
            options.stale_days,
            options.check_workflow_status,
        )
        .await?;
    }

    Ok(CoverageReport {
        rows,
        csv,
        summary,
        sub_reports,
    })
}
