use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::types::Repo;

/// Non-blank lines that are not `#` comments, trimmed.
fn entries(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Parses a repository list: one `owner/repo` or repository URL per line.
/// Invalid lines are logged and skipped.
pub fn parse_repositories(text: &str) -> Vec<Repo> {
    entries(text)
        .filter_map(|line| match Repo::parse_line(line) {
            Ok(repo) => Some(repo),
            Err(e) => {
                warn!(line, error = %e, "Skipping invalid repository entry");
                None
            }
        })
        .collect()
}

pub async fn read_repositories_file(path: &Path) -> Result<Vec<Repo>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read repositories file: {}", path.display()))?;

    let repos = parse_repositories(&text);
    if repos.is_empty() {
        anyhow::bail!("No valid repositories found in {}", path.display());
    }
    Ok(repos)
}

pub fn parse_orgs(text: &str) -> Vec<String> {
    entries(text).map(str::to_string).collect()
}

pub async fn read_orgs_file(path: &Path) -> Result<Vec<String>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read orgs file: {}", path.display()))?;

    let orgs = parse_orgs(&text);
    if orgs.is_empty() {
        anyhow::bail!("No organizations found in {}", path.display());
    }
    Ok(orgs)
}

/// Reads a text file such as a CODEOWNERS template.
pub async fn read_text_file(path: &Path, what: &str) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {what}: {}", path.display()))
}
