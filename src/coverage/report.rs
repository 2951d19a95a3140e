use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::{Days, NaiveDate};
use tracing::info;

use super::{
    languages::Unscanned,
    scanning::{AlertCounts, CodeqlStatus, WorkflowStatus},
};
use crate::csv::CsvTable;

/// One report line per repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageRow {
    pub repository: String,
    pub default_branch: String,
    /// `YYYY-MM-DD`, empty when unknown.
    pub last_updated: String,
    pub is_archived: bool,
    pub languages: Vec<String>,
    pub codeql: CodeqlStatus,
    /// `YYYY-MM-DD` of the latest default-branch analysis.
    pub last_scan_date: Option<String>,
    pub scanned_languages: Vec<String>,
    pub unscanned: Unscanned,
    pub alerts: Option<AlertCounts>,
    pub analysis_error: Option<String>,
    pub analysis_warning: Option<String>,
    pub workflow_status: Option<WorkflowStatus>,
}

/// Keeps the date part of an ISO-8601 timestamp.
pub fn date_part(timestamp: &str) -> String {
    timestamp.split('T').next().unwrap_or_default().to_string()
}

impl CoverageRow {
    pub fn fields(&self, with_workflow_status: bool) -> Vec<String> {
        let mut fields = vec![
            self.repository.clone(),
            self.default_branch.clone(),
            self.last_updated.clone(),
            if self.is_archived { "Yes" } else { "No" }.to_string(),
            self.languages.join(";"),
            self.codeql.to_string(),
            self.last_scan_date.clone().unwrap_or_else(|| "Never".into()),
            self.scanned_languages.join(";"),
            self.unscanned.to_string(),
            self.alerts
                .map(|a| a.open.to_string())
                .unwrap_or_else(|| "N/A".into()),
            self.alerts
                .map(|a| a.critical.to_string())
                .unwrap_or_else(|| "N/A".into()),
            self.analysis_error.clone().unwrap_or_else(|| "None".into()),
            self.analysis_warning.clone().unwrap_or_else(|| "None".into()),
        ];
        if with_workflow_status {
            fields.push(
                self.workflow_status
                    .map(|s| s.to_string())
                    .unwrap_or_default(),
            );
        }
        fields
    }

    /// Updated more than `stale_days` after its last scan.
    pub fn is_stale(&self, stale_days: u64) -> bool {
        let Some(scan) = self.last_scan_date.as_deref() else {
            return false;
        };
        let (Ok(scan), Ok(updated)) = (
            NaiveDate::parse_from_str(scan, "%Y-%m-%d"),
            NaiveDate::parse_from_str(&self.last_updated, "%Y-%m-%d"),
        ) else {
            return false;
        };
        scan.checked_add_days(Days::new(stale_days))
            .is_some_and(|cutoff| updated > cutoff)
    }

    pub fn is_disabled(&self) -> bool {
        !self.is_archived && self.codeql.needs_enablement()
    }

    pub fn is_missing_languages(&self) -> bool {
        self.codeql == CodeqlStatus::Yes && self.unscanned.has_gaps()
    }

    pub fn has_critical_alerts(&self) -> bool {
        self.alerts.is_some_and(|a| a.critical > 0)
    }

    pub fn has_analysis_issues(&self) -> bool {
        self.analysis_error.is_some() || self.analysis_warning.is_some()
    }
}

pub const HEADERS: [&str; 13] = [
    "Repository",
    "Default Branch",
    "Last Updated",
    "Archived",
    "Languages",
    "CodeQL Enabled",
    "Last Default Branch Scan Date",
    "Scanned Languages",
    "Unscanned CodeQL Languages",
    "Open Alerts",
    "Critical Alerts",
    "Analysis Errors",
    "Analysis Warnings",
];

pub fn build_table<'a, I>(rows: I, with_workflow_status: bool) -> CsvTable
where
    I: IntoIterator<Item = &'a CoverageRow>,
{
    let mut table = CsvTable::new(HEADERS);
    if with_workflow_status {
        table.headers.push("Workflow Status".to_string());
    }
    for row in rows {
        table.push(row.fields(with_workflow_status));
    }
    table
}

/// Named subset of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubReport {
    Disabled,
    Stale,
    MissingLanguages,
    CriticalAlerts,
    AnalysisIssues,
}

impl SubReport {
    pub const ALL: [SubReport; 5] = [
        SubReport::Disabled,
        SubReport::Stale,
        SubReport::MissingLanguages,
        SubReport::CriticalAlerts,
        SubReport::AnalysisIssues,
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            SubReport::Disabled => "disabled",
            SubReport::Stale => "stale",
            SubReport::MissingLanguages => "missing-languages",
            SubReport::CriticalAlerts => "critical-alerts",
            SubReport::AnalysisIssues => "analysis-issues",
        }
    }

    pub fn description(&self, stale_days: u64) -> String {
        match self {
            SubReport::Disabled => "Disabled/Not scanning".to_string(),
            SubReport::Stale => format!("Stale scans (modified >{stale_days} days after scan)"),
            SubReport::MissingLanguages => "Missing CodeQL languages".to_string(),
            SubReport::CriticalAlerts => "Repos with critical alerts".to_string(),
            SubReport::AnalysisIssues => "Analysis errors/warnings".to_string(),
        }
    }

    pub fn matches(&self, row: &CoverageRow, stale_days: u64) -> bool {
        match self {
            SubReport::Disabled => row.is_disabled(),
            SubReport::Stale => row.is_stale(stale_days),
            SubReport::MissingLanguages => row.is_missing_languages(),
            SubReport::CriticalAlerts => row.has_critical_alerts(),
            SubReport::AnalysisIssues => row.has_analysis_issues(),
        }
    }

    /// `report.csv` becomes `report-<suffix>.csv`.
    pub fn path_for(&self, output: &Path) -> PathBuf {
        let rendered = output.to_string_lossy();
        let base = rendered.strip_suffix(".csv").unwrap_or(&rendered);
        PathBuf::from(format!("{}-{}.csv", base, self.suffix()))
    }
}

/// Writes each non-empty sub-report next to `output` and returns the files
/// written.
pub async fn write_sub_reports(
    rows: &[CoverageRow],
    output: &Path,
    stale_days: u64,
    with_workflow_status: bool,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for report in SubReport::ALL {
        let matching: Vec<&CoverageRow> = rows
            .iter()
            .filter(|row| report.matches(row, stale_days))
            .collect();
        if matching.is_empty() {
            continue;
        }

        let path = report.path_for(output);
        build_table(matching.iter().copied(), with_workflow_status)
            .write_to(&path)
            .await?;
        info!(
            "  - {}: {} ({} repos)",
            report.description(stale_days),
            path.display(),
            matching.len()
        );
        written.push(path);
    }

    Ok(written)
}

/// Tallies behind the one-line report summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub enabled: usize,
    pub no_scans: usize,
    pub disabled: usize,
    pub requires_ghas: usize,
    pub unknown: usize,
    pub archived: usize,
    pub stale: usize,
    pub missing_languages: usize,
    pub critical_alerts: usize,
    pub analysis_issues: usize,
}

impl Summary {
    pub fn from_rows(rows: &[CoverageRow], stale_days: u64) -> Self {
        let mut summary = Summary::default();
        for row in rows {
            match row.codeql {
                CodeqlStatus::Yes => summary.enabled += 1,
                CodeqlStatus::NoScans => summary.no_scans += 1,
                CodeqlStatus::Disabled => summary.disabled += 1,
                CodeqlStatus::RequiresGhas => summary.requires_ghas += 1,
                CodeqlStatus::Unknown => summary.unknown += 1,
                CodeqlStatus::NotApplicable => {}
            }
            summary.archived += usize::from(row.is_archived);
            summary.stale += usize::from(row.is_stale(stale_days));
            summary.missing_languages += usize::from(row.is_missing_languages());
            summary.critical_alerts += usize::from(row.has_critical_alerts());
            summary.analysis_issues += usize::from(row.has_analysis_issues());
        }
        summary
    }

    /// Comma-separated counts; zero counts are left out.
    pub fn render(&self) -> String {
        [
            (self.enabled, "enabled"),
            (self.no_scans, "no scans"),
            (self.disabled, "disabled"),
            (self.requires_ghas, "requires GHAS"),
            (self.unknown, "unknown"),
            (self.archived, "archived"),
            (self.stale, "stale"),
            (self.missing_languages, "missing languages"),
            (self.critical_alerts, "with critical alerts"),
            (self.analysis_issues, "analysis issues"),
        ]
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{count} {label}"))
        .collect::<Vec<_>>()
        .join(", ")
    }
}
