//! Adds or extends CODEOWNERS across a list of repositories, either by
//! committing to the default branch or through a pull request.

use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::{
    batch::{StatusCounts, process_in_batches},
    contents::{CODEOWNERS_PATHS, FileUpdate, RepoFile, get_file, put_file},
    types::{Api, ApiError, ItemStatus, Method, Repo, str_at, str_field},
};

pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_BRANCH_NAME: &str = "add-codeowners";
pub const DEFAULT_PR_TITLE: &str = "Add CODEOWNERS file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeownersOptions {
    pub overwrite: bool,
    pub create_pr: bool,
    pub branch: String,
    pub pr_title: String,
    pub dry_run: bool,
    pub concurrency: usize,
}

impl Default for CodeownersOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            create_pr: false,
            branch: DEFAULT_BRANCH_NAME.to_string(),
            pr_title: DEFAULT_PR_TITLE.to_string(),
            dry_run: false,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeownersResult {
    pub repository: String,
    pub status: ItemStatus,
    pub message: String,
    pub path: Option<String>,
    pub sha: Option<String>,
    pub pr_url: Option<String>,
}

impl CodeownersResult {
    fn new(repo: &Repo) -> Self {
        Self {
            repository: repo.full_name(),
            status: ItemStatus::Error,
            message: String::new(),
            path: None,
            sha: None,
            pr_url: None,
        }
    }

    /// `✓ org/repo: message - url`
    pub fn line(&self) -> String {
        let mut line = format!("{} {}: {}", self.status.icon(), self.repository, self.message);
        if let Some(url) = &self.pr_url {
            line.push_str(" - ");
            line.push_str(url);
        }
        line
    }
}

/// First CODEOWNERS found in lookup order. A 404 moves on to the next
/// location; other failures are returned.
pub async fn find_existing(api: &dyn Api, repo: &Repo) -> Result<Option<RepoFile>, ApiError> {
    for path in CODEOWNERS_PATHS {
        if let Some(file) = get_file(api, repo, path).await? {
            return Ok(Some(file));
        }
    }
    Ok(None)
}

/// What will be committed for a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub path: String,
    pub sha: Option<String>,
    pub content: String,
    pub commit_message: &'static str,
    pub message: &'static str,
    pub pr_body: String,
}

pub fn plan(existing: Option<&RepoFile>, new_content: &str, overwrite: bool) -> Plan {
    match existing {
        Some(file) => {
            let (content, message) = if overwrite {
                (new_content.to_string(), "Replaced existing CODEOWNERS")
            } else {
                (
                    format!("{}\n{}", file.content, new_content),
                    "Appended to existing CODEOWNERS",
                )
            };
            Plan {
                path: file.path.clone(),
                sha: Some(file.sha.clone()),
                content,
                commit_message: "Updating CODEOWNERS file",
                message,
                pr_body: format!(
                    "This PR {} the CODEOWNERS file.",
                    if overwrite { "replaces" } else { "updates" }
                ),
            }
        }
        None => Plan {
            path: "CODEOWNERS".to_string(),
            sha: None,
            content: new_content.to_string(),
            commit_message: "Adding CODEOWNERS file",
            message: "Created new CODEOWNERS file",
            pr_body: "This PR adds a CODEOWNERS file to the repository.".to_string(),
        },
    }
}

/// Default branch name and the commit it points at.
pub async fn default_branch_head(api: &dyn Api, repo: &Repo) -> Result<(String, String), ApiError> {
    let info = api
        .get(&format!("/repos/{}/{}", repo.owner, repo.name), &[])
        .await?;
    let branch = str_field(&info, "default_branch")
        .ok_or_else(|| ApiError::Decode("repository has no default branch".into()))?
        .to_string();

    let reference = api
        .get(
            &format!("/repos/{}/{}/git/ref/heads/{}", repo.owner, repo.name, branch),
            &[],
        )
        .await?;
    let sha = str_at(&reference, "/object/sha")
        .ok_or_else(|| ApiError::Decode(format!("ref heads/{branch} has no sha")))?
        .to_string();

    Ok((branch, sha))
}

pub async fn create_branch(api: &dyn Api, repo: &Repo, branch: &str, sha: &str) -> Result<(), ApiError> {
    api.send(
        Method::Post,
        &format!("/repos/{}/{}/git/refs", repo.owner, repo.name),
        json!({ "ref": format!("refs/heads/{branch}"), "sha": sha }),
    )
    .await
    .map(|_| ())
}

/// Opens a pull request and returns its number and URL.
pub async fn create_pull_request(
    api: &dyn Api,
    repo: &Repo,
    head: &str,
    base: &str,
    title: &str,
    body: &str,
) -> Result<(u64, String), ApiError> {
    let pr = api
        .send(
            Method::Post,
            &format!("/repos/{}/{}/pulls", repo.owner, repo.name),
            json!({ "title": title, "body": body, "head": head, "base": base }),
        )
        .await?;
    let number = pr.get("number").and_then(|n| n.as_u64()).unwrap_or_default();
    let url = str_field(&pr, "html_url").unwrap_or_default().to_string();
    Ok((number, url))
}

async fn apply(
    api: &dyn Api,
    repo: &Repo,
    new_content: &str,
    options: &CodeownersOptions,
    result: &mut CodeownersResult,
) -> Result<(), ApiError> {
    let existing = find_existing(api, repo).await?;
    let plan = plan(existing.as_ref(), new_content, options.overwrite);
    result.message = plan.message.to_string();

    if options.dry_run {
        result.status = ItemStatus::DryRun;
        result.path = Some(plan.path);
        result.message.push_str(if options.create_pr {
            " (dry-run, would create PR)"
        } else {
            " (dry-run)"
        });
        return Ok(());
    }

    let mut update = FileUpdate {
        path: &plan.path,
        message: plan.commit_message,
        content: &plan.content,
        sha: plan.sha.as_deref(),
        branch: None,
        committer: None,
    };

    if !options.create_pr {
        let commit = put_file(api, repo, &update).await?;
        result.status = ItemStatus::Success;
        result.path = Some(commit.path);
        result.sha = Some(commit.sha);
        return Ok(());
    }

    let (base, head_sha) = default_branch_head(api, repo).await?;
    if let Err(e) = create_branch(api, repo, &options.branch, &head_sha).await {
        if e.status() == Some(422) && e.message_contains("Reference already exists") {
            result.status = ItemStatus::Error;
            result.message = format!(
                "Branch '{}' already exists. Delete it or use a different branch name.",
                options.branch
            );
            return Ok(());
        }
        return Err(e);
    }

    update.branch = Some(options.branch.as_str());
    let commit = put_file(api, repo, &update).await?;
    let (number, url) = create_pull_request(
        api,
        repo,
        &options.branch,
        &base,
        &options.pr_title,
        &plan.pr_body,
    )
    .await?;

    result.status = ItemStatus::Success;
    result.path = Some(commit.path);
    result.sha = Some(commit.sha);
    result.pr_url = Some(url);
    result.message.push_str(&format!(" (PR #{number})"));
    Ok(())
}

/// Adds `new_content` to one repository. Failures are recorded on the
/// result.
pub async fn process_repository(
    api: &dyn Api,
    repo: &Repo,
    new_content: &str,
    options: &CodeownersOptions,
) -> CodeownersResult {
    let mut result = CodeownersResult::new(repo);
    if let Err(e) = apply(api, repo, new_content, options, &mut result).await {
        result.status = ItemStatus::Error;
        result.message = e.to_string();
    }
    result
}

pub async fn process_repositories(
    api: &dyn Api,
    repos: &[Repo],
    new_content: &str,
    options: &CodeownersOptions,
) -> Vec<CodeownersResult> {
    process_in_batches(
        repos,
        options.concurrency,
        "Processing",
        Repo::full_name,
        |repo| process_repository(api, repo, new_content, options),
    )
    .await
}

/// Per-repository lines followed by the totals, in output order.
pub fn report_lines(results: &[CodeownersResult], counts: &StatusCounts) -> Vec<String> {
    let mut lines = vec!["--- Results ---".to_string()];
    lines.extend(results.iter().map(CodeownersResult::line));
    lines.push("--- Summary ---".to_string());
    lines.extend(summary_lines(counts));
    lines
}

/// Logs each result and the totals. Returns the tally so callers can set the
/// exit status.
pub fn report(results: &[CodeownersResult]) -> StatusCounts {
    let counts = StatusCounts::from_statuses(results.iter().map(|r| r.status));
    for line in report_lines(results, &counts) {
        info!("{}", line);
    }
    counts
}

pub fn summary_lines(counts: &StatusCounts) -> Vec<String> {
    let dry_run = counts.get(ItemStatus::DryRun);
    if dry_run > 0 {
        return vec![format!("Would update: {dry_run} repositories")];
    }
    vec![
        format!("Success: {}", counts.get(ItemStatus::Success)),
        format!("Errors: {}", counts.get(ItemStatus::Error)),
    ]
}

pub async fn run(
    api: &dyn Api,
    repos: &[Repo],
    new_content: &str,
    options: &CodeownersOptions,
) -> Result<StatusCounts> {
    info!("Processing {} repositories...", repos.len());
    info!(
        "Mode: {}{}",
        if options.overwrite { "overwrite" } else { "append" },
        if options.create_pr { " (create PR)" } else { "" }
    );
    if options.dry_run {
        info!("DRY RUN: No changes will be made");
    }

    let results = process_repositories(api, repos, new_content, options).await;
    let counts = report(&results);
    info!("Total API calls: {}", api.api_calls());
    Ok(counts)
}
