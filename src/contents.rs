//! Reading and committing single files through the repository contents API.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Value, json};

use crate::types::{Api, ApiError, Method, Repo, str_at, str_field};

/// Locations GitHub reads CODEOWNERS from, in lookup order.
pub const CODEOWNERS_PATHS: [&str; 3] = ["CODEOWNERS", ".github/CODEOWNERS", "docs/CODEOWNERS"];

/// A file as stored on a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    pub path: String,
    pub sha: String,
    pub content: String,
}

/// Decodes the base64 payload of a contents response. GitHub wraps the
/// encoding at 60 columns.
pub fn decode_content(encoded: &str) -> Result<String, ApiError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| ApiError::Decode(format!("invalid base64 content: {e}")))?;
    String::from_utf8(bytes).map_err(|e| ApiError::Decode(format!("file is not UTF-8: {e}")))
}

pub fn encode_content(content: &str) -> String {
    STANDARD.encode(content.as_bytes())
}

/// Fetches `path` from the default branch. `Ok(None)` when it does not exist.
pub async fn get_file(api: &dyn Api, repo: &Repo, path: &str) -> Result<Option<RepoFile>, ApiError> {
    let route = format!("/repos/{}/{}/contents/{}", repo.owner, repo.name, path);
    let data = match api.get(&route, &[]).await {
        Ok(data) => data,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e),
    };

    let sha = str_field(&data, "sha")
        .ok_or_else(|| ApiError::Decode(format!("{path} has no sha")))?
        .to_string();
    let content = decode_content(str_field(&data, "content").unwrap_or_default())?;

    Ok(Some(RepoFile {
        path: path.to_string(),
        sha,
        content,
    }))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committer {
    pub name: String,
    pub email: String,
}

/// A create-or-update request for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate<'a> {
    pub path: &'a str,
    pub message: &'a str,
    pub content: &'a str,
    /// Blob being replaced; required when the file already exists.
    pub sha: Option<&'a str>,
    pub branch: Option<&'a str>,
    pub committer: Option<&'a Committer>,
}

impl FileUpdate<'_> {
    pub fn body(&self) -> Value {
        let mut body = json!({
            "message": self.message,
            "content": encode_content(self.content),
        });
        if let Some(sha) = self.sha {
            body["sha"] = json!(sha);
        }
        if let Some(branch) = self.branch {
            body["branch"] = json!(branch);
        }
        if let Some(committer) = self.committer {
            body["committer"] = json!({ "name": committer.name, "email": committer.email });
        }
        body
    }
}

/// Where a commit landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResult {
    pub path: String,
    pub sha: String,
}

pub async fn put_file(
    api: &dyn Api,
    repo: &Repo,
    update: &FileUpdate<'_>,
) -> Result<CommitResult, ApiError> {
    let route = format!(
        "/repos/{}/{}/contents/{}",
        repo.owner, repo.name, update.path
    );
    let data = api.send(Method::Put, &route, update.body()).await?;

    Ok(CommitResult {
        path: str_at(&data, "/content/path")
            .unwrap_or(update.path)
            .to_string(),
        sha: str_at(&data, "/content/sha").unwrap_or_default().to_string(),
    })
}
