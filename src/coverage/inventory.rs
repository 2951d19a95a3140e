use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use serde::Deserialize;
use serde_json::json;

use crate::types::Api;

/// Number of repositories picked by `--sample`.
pub const SAMPLE_SIZE: usize = 25;

const ORG_REPOSITORIES_QUERY: &str = r#"
query($org: String!, $cursor: String) {
  organization(login: $org) {
    repositories(first: 100, after: $cursor) {
      pageInfo {
        hasNextPage
        endCursor
      }
      nodes {
        name
        updatedAt
        isArchived
        defaultBranchRef {
          name
        }
        languages(first: 20) {
          nodes {
            name
          }
        }
      }
    }
  }
}
"#;

const REPOSITORY_QUERY: &str = r#"
query($org: String!, $repo: String!) {
  repository(owner: $org, name: $repo) {
    name
    updatedAt
    isArchived
    defaultBranchRef {
      name
    }
    languages(first: 20) {
      nodes {
        name
      }
    }
  }
}
"#;

/// Repository attributes collected up front by GraphQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoInfo {
    pub name: String,
    pub updated_at: String,
    pub is_archived: bool,
    pub default_branch: String,
    pub languages: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepoNode {
    name: String,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    is_archived: bool,
    #[serde(default)]
    default_branch_ref: Option<NamedNode>,
    #[serde(default)]
    languages: Option<Connection<NamedNode>>,
}

#[derive(Debug, Deserialize)]
struct NamedNode {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
    #[serde(default)]
    page_info: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

impl From<RepoNode> for RepoInfo {
    fn from(node: RepoNode) -> Self {
        RepoInfo {
            name: node.name,
            updated_at: node.updated_at.unwrap_or_default(),
            is_archived: node.is_archived,
            default_branch: node
                .default_branch_ref
                .map(|b| b.name)
                .unwrap_or_else(|| "main".to_string()),
            languages: node
                .languages
                .map(|l| l.nodes.into_iter().map(|n| n.name).collect())
                .unwrap_or_default(),
        }
    }
}

/// Lists every repository in `org`, 100 per GraphQL page.
pub async fn fetch_repositories(api: &dyn Api, org: &str) -> Result<Vec<RepoInfo>> {
    let mut repos = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let data = api
            .graphql(
                ORG_REPOSITORIES_QUERY,
                json!({ "org": org, "cursor": cursor }),
            )
            .await
            .with_context(|| format!("Failed to list repositories for {org}"))?;

        let connection = data
            .pointer("/organization/repositories")
            .cloned()
            .filter(|v| !v.is_null())
            .with_context(|| format!("Organization {org} not found"))?;
        let page: Connection<RepoNode> = serde_json::from_value(connection)
            .context("Failed to decode repository listing")?;

        repos.extend(page.nodes.into_iter().map(RepoInfo::from));

        match page.page_info {
            Some(PageInfo {
                has_next_page: true,
                end_cursor: Some(next),
            }) => cursor = Some(next),
            _ => break,
        }
    }

    Ok(repos)
}

pub async fn fetch_single_repository(
    api: &dyn Api,
    org: &str,
    repo: &str,
) -> Result<Vec<RepoInfo>> {
    let data = api
        .graphql(REPOSITORY_QUERY, json!({ "org": org, "repo": repo }))
        .await
        .with_context(|| format!("Repository {org}/{repo} not found"))?;

    match data.get("repository") {
        Some(node) if !node.is_null() => {
            let node: RepoNode = serde_json::from_value(node.clone())
                .context("Failed to decode repository")?;
            Ok(vec![node.into()])
        }
        _ => anyhow::bail!("Repository {}/{} not found", org, repo),
    }
}

/// Shuffles and keeps at most [`SAMPLE_SIZE`] repositories.
pub fn sample<R: rand::Rng + ?Sized>(mut repos: Vec<RepoInfo>, rng: &mut R) -> Vec<RepoInfo> {
    repos.shuffle(rng);
    repos.truncate(SAMPLE_SIZE);
    repos
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_repo_node_defaults_branch_to_main() {
        let node: RepoNode = serde_json::from_value(json!({
            "name": "widgets",
            "updatedAt": "2024-05-01T10:00:00Z",
            "isArchived": false,
            "defaultBranchRef": null,
            "languages": { "nodes": [{ "name": "Rust" }, { "name": "Shell" }] }
        }))
        .unwrap();
        let info = RepoInfo::from(node);
        assert_eq!(info.default_branch, "main");
        assert_eq!(info.languages, vec!["Rust", "Shell"]);
    }

    #[test]
    fn test_sample_caps_size() {
        let repos: Vec<RepoInfo> = (0..40)
            .map(|i| RepoInfo {
                name: format!("repo-{i}"),
                updated_at: String::new(),
                is_archived: false,
                default_branch: "main".into(),
                languages: vec![],
            })
            .collect();
        let mut rng = StdRng::seed_from_u64(7);
        let picked = sample(repos, &mut rng);
        assert_eq!(picked.len(), SAMPLE_SIZE);

        let mut names: Vec<&str> = picked.iter().map(|r| r.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), SAMPLE_SIZE);
    }
}
