//! Rewrites owners in existing CODEOWNERS files from an `oldValue,newValue`
//! mapping table.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::{
    batch::{StatusCounts, process_in_batches},
    contents::{CODEOWNERS_PATHS, Committer, FileUpdate, RepoFile, get_file, put_file},
    csv::parse_records,
    inputs::parse_repositories,
    types::{Api, ApiError, ItemStatus, Repo},
};

pub const DEFAULT_MAPPINGS_FILE: &str = "codeowners-mappings.csv";
pub const COMMIT_MESSAGE: &str = "Updating codeowners file";

pub fn bot_committer() -> Committer {
    Committer {
        name: "github-actions[bot]".to_string(),
        email: "github-actions[bot]@users.noreply.github.com".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub old_value: String,
    pub new_value: String,
}

/// Parses the mapping CSV. Rows without an `oldValue` are ignored.
pub fn parse_mappings(text: &str) -> Result<Vec<Mapping>> {
    let records = parse_records(text);
    let mappings: Vec<Mapping> = records
        .into_iter()
        .filter_map(|mut record| {
            let old_value = record.remove("oldValue").filter(|v| !v.is_empty())?;
            let new_value = record.remove("newValue").unwrap_or_default();
            Some(Mapping {
                old_value,
                new_value,
            })
        })
        .collect();

    if mappings.is_empty() {
        anyhow::bail!("No mappings found; expected 'oldValue,newValue' columns");
    }
    Ok(mappings)
}

pub async fn read_mappings_file(path: &Path) -> Result<Vec<Mapping>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read mappings file: {}", path.display()))?;
    parse_mappings(&text).with_context(|| format!("Invalid mappings file: {}", path.display()))
}

/// Repositories from the newline-separated `REPOSITORIES` variable.
pub fn repositories_from_env() -> Result<Vec<Repo>> {
    let value = std::env::var("REPOSITORIES")
        .context("Provide --repos-file or set the REPOSITORIES environment variable")?;
    let repos = parse_repositories(&value);
    if repos.is_empty() {
        anyhow::bail!("No valid repositories found in REPOSITORIES");
    }
    Ok(repos)
}

/// Applies each mapping once, to the first occurrence of its old value.
pub fn apply_mappings(content: &str, mappings: &[Mapping]) -> String {
    mappings.iter().fold(content.to_string(), |acc, m| {
        debug!("Replacing {} with {}", m.old_value, m.new_value);
        acc.replacen(&m.old_value, &m.new_value, 1)
    })
}

/// Checks every CODEOWNERS location; the last one present wins.
pub async fn find_last_codeowners(api: &dyn Api, repo: &Repo) -> Result<Option<RepoFile>, ApiError> {
    let mut found = None;
    for path in CODEOWNERS_PATHS {
        if let Some(file) = get_file(api, repo, path).await? {
            found = Some(file);
        }
    }
    Ok(found)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingResult {
    pub repository: String,
    pub status: ItemStatus,
    pub message: String,
}

async fn apply(
    api: &dyn Api,
    repo: &Repo,
    mappings: &[Mapping],
    dry_run: bool,
) -> Result<(ItemStatus, String), ApiError> {
    let Some(file) = find_last_codeowners(api, repo).await? else {
        return Ok((
            ItemStatus::Skipped,
            format!("Could not find CODEOWNERS file in {repo}"),
        ));
    };

    let updated = apply_mappings(&file.content, mappings);
    if updated == file.content {
        return Ok((
            ItemStatus::Skipped,
            format!("No mappings matched {}", file.path),
        ));
    }

    if dry_run {
        return Ok((
            ItemStatus::DryRun,
            format!("Would update CODEOWNERS file at {} (dry-run)", file.path),
        ));
    }

    let committer = bot_committer();
    put_file(
        api,
        repo,
        &FileUpdate {
            path: &file.path,
            message: COMMIT_MESSAGE,
            content: &updated,
            sha: Some(&file.sha),
            branch: None,
            committer: Some(&committer),
        },
    )
    .await?;

    Ok((
        ItemStatus::Success,
        format!("Successfully updated CODEOWNERS file at {}", file.path),
    ))
}

pub async fn process_repository(
    api: &dyn Api,
    repo: &Repo,
    mappings: &[Mapping],
    dry_run: bool,
) -> MappingResult {
    let (status, message) = match apply(api, repo, mappings, dry_run).await {
        Ok(outcome) => outcome,
        Err(e) => (ItemStatus::Error, e.to_string()),
    };
    MappingResult {
        repository: repo.full_name(),
        status,
        message,
    }
}

pub async fn run(
    api: &dyn Api,
    repos: &[Repo],
    mappings: &[Mapping],
    dry_run: bool,
    concurrency: usize,
) -> (Vec<MappingResult>, StatusCounts) {
    let results = process_in_batches(
        repos,
        concurrency,
        "Processing",
        Repo::full_name,
        |repo| process_repository(api, repo, mappings, dry_run),
    )
    .await;

    for result in &results {
        info!("{} {}: {}", result.status.icon(), result.repository, result.message);
    }

    let counts = StatusCounts::from_statuses(results.iter().map(|r| r.status));
    info!(
        "Updated: {}, Skipped: {}, Dry run: {}, Errors: {}",
        counts.get(ItemStatus::Success),
        counts.get(ItemStatus::Skipped),
        counts.get(ItemStatus::DryRun),
        counts.get(ItemStatus::Error)
    );
    info!("Total API calls: {}", api.api_calls());

    (results, counts)
}
