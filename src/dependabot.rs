//! Commits `.github/dependabot.yml` to a list of repositories.

use tracing::info;

use crate::{
    batch::{StatusCounts, process_in_batches},
    contents::{Committer, FileUpdate, get_file, put_file},
    types::{Api, ApiError, ItemStatus, Repo},
};

pub const DEPENDABOT_PATH: &str = ".github/dependabot.yml";
pub const DEFAULT_CONCURRENCY: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependabotOptions {
    pub overwrite: bool,
    pub dry_run: bool,
    pub committer: Option<Committer>,
    pub concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependabotResult {
    pub repository: String,
    pub status: ItemStatus,
    pub message: String,
}

pub fn commit_message(existing_sha: Option<&str>) -> &'static str {
    if existing_sha.is_some() {
        "Updating dependabot.yml file"
    } else {
        "Adding dependabot.yml file"
    }
}

async fn apply(
    api: &dyn Api,
    repo: &Repo,
    content: &str,
    options: &DependabotOptions,
) -> Result<(ItemStatus, String), ApiError> {
    let existing = get_file(api, repo, DEPENDABOT_PATH).await?;
    let sha = existing.as_ref().map(|f| f.sha.as_str());

    if sha.is_some() && !options.overwrite {
        return Ok((
            ItemStatus::Skipped,
            format!("{DEPENDABOT_PATH} already exists"),
        ));
    }

    let message = commit_message(sha);
    if options.dry_run {
        return Ok((ItemStatus::DryRun, format!("{message} (dry-run)")));
    }

    put_file(
        api,
        repo,
        &FileUpdate {
            path: DEPENDABOT_PATH,
            message,
            content,
            sha,
            branch: None,
            committer: options.committer.as_ref(),
        },
    )
    .await?;

    Ok((ItemStatus::Success, format!("Successful: {message}")))
}

pub async fn process_repository(
    api: &dyn Api,
    repo: &Repo,
    content: &str,
    options: &DependabotOptions,
) -> DependabotResult {
    let (status, message) = match apply(api, repo, content, options).await {
        Ok(outcome) => outcome,
        Err(e) => (ItemStatus::Error, e.to_string()),
    };
    DependabotResult {
        repository: repo.full_name(),
        status,
        message,
    }
}

pub async fn run(
    api: &dyn Api,
    repos: &[Repo],
    content: &str,
    options: &DependabotOptions,
) -> (Vec<DependabotResult>, StatusCounts) {
    let results = process_in_batches(
        repos,
        options.concurrency,
        "Processing",
        Repo::full_name,
        |repo| process_repository(api, repo, content, options),
    )
    .await;

    for result in &results {
        info!("{} {}: {}", result.status.icon(), result.repository, result.message);
    }

    let counts = StatusCounts::from_statuses(results.iter().map(|r| r.status));
    info!(
        "Success: {}, Skipped: {}, Dry run: {}, Errors: {}",
        counts.get(ItemStatus::Success),
        counts.get(ItemStatus::Skipped),
        counts.get(ItemStatus::DryRun),
        counts.get(ItemStatus::Error)
    );
    info!("Total API calls: {}", api.api_calls());

    (results, counts)
}
