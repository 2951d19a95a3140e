//! Copies GitHub Discussions, with their labels, comments and replies, from
//! one repository to another. The source and target may live on different
//! GitHub instances, so each side has its own [`Api`] client.

pub mod queries;
pub mod templates;

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::types::{Api, ApiError, Repo};

use self::templates::{author_or_unknown, comment_body, discussion_body, reply_body};

pub const DEFAULT_DELAY_SCALE: f64 = 1.0;

const CALL_DELAY_SECS: f64 = 2.0;
const CREATE_DELAY_SECS: f64 = 3.0;
const DISCUSSION_DELAY_SECS: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CopyOptions {
    pub source: Repo,
    pub target: Repo,
    /// Multiplier applied to every pause; `0.0` disables pacing.
    pub delay_scale: f64,
}

/// Sleeps between calls to stay clear of secondary rate limits.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    scale: f64,
}

impl Pacer {
    pub fn new(scale: f64) -> Self {
        Self {
            scale: scale.max(0.0),
        }
    }

    pub fn delay(&self, secs: f64) -> Duration {
        Duration::from_secs_f64(secs * self.scale)
    }

    pub async fn wait(&self, secs: f64) {
        let delay = self.delay(secs);
        if delay.is_zero() {
            return;
        }
        info!("Waiting {}s to avoid rate limiting...", delay.as_secs_f64());
        tokio::time::sleep(delay).await;
    }

    pub async fn pause(&self, secs: f64) {
        let delay = self.delay(secs);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Label {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Author {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<T>,
}

impl<T> Default for Nodes<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscussionPage {
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<SourceDiscussion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceDiscussion {
    id: String,
    title: String,
    #[serde(default)]
    body: Option<String>,
    category: Category,
    #[serde(default)]
    labels: Nodes<Label>,
    #[serde(default)]
    author: Option<Author>,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    closed: bool,
    #[serde(default)]
    url: String,
    number: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceComment {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    author: Option<Author>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    replies: Nodes<SourceComment>,
}

impl SourceComment {
    fn author(&self) -> &str {
        author_or_unknown(self.author.as_ref().map(|a| a.login.as_str()))
    }

    fn created_at(&self) -> &str {
        self.created_at.as_deref().unwrap_or_default()
    }

    fn text(&self) -> Option<&str> {
        self.body.as_deref().filter(|b| !b.is_empty())
    }
}

/// Counters reported once the copy completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub discussions_found: usize,
    pub discussions_created: usize,
    pub discussions_skipped: usize,
    pub comments_found: usize,
    pub comments_copied: usize,
    /// Source category names absent from the target, in first-seen order.
    pub missing_categories: Vec<String>,
}

impl CopyStats {
    fn record_missing_category(&mut self, name: &str) {
        if !self.missing_categories.iter().any(|c| c == name) {
            self.missing_categories.push(name.to_string());
        }
    }
}

/// How a source category maps onto the target repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryChoice<'a> {
    Matched(&'a Category),
    Fallback(&'a Category),
    Unavailable,
}

/// Matches by name or slug, then falls back to `General`, then to the first
/// target category.
pub fn choose_category<'a>(categories: &'a [Category], name: &str, slug: &str) -> CategoryChoice<'a> {
    if let Some(category) = categories.iter().find(|c| c.name == name || c.slug == slug) {
        return CategoryChoice::Matched(category);
    }
    categories
        .iter()
        .find(|c| c.name == "General" || c.slug == "general")
        .or_else(|| categories.first())
        .map_or(CategoryChoice::Unavailable, CategoryChoice::Fallback)
}

fn decode<T: serde::de::DeserializeOwned>(data: &Value, pointer: &str) -> Result<T> {
    let value = data
        .pointer(pointer)
        .filter(|v| !v.is_null())
        .with_context(|| format!("Response is missing {pointer}"))?;
    serde_json::from_value(value.clone()).with_context(|| format!("Failed to decode {pointer}"))
}

/// Returns the repository node ID, or an error if discussions are disabled.
pub async fn check_discussions_enabled(api: &dyn Api, repo: &Repo, pacer: &Pacer) -> Result<String> {
    info!("Checking if discussions are enabled in {}...", repo);
    pacer.wait(CALL_DELAY_SECS).await;

    let data = api
        .graphql(
            queries::DISCUSSIONS_ENABLED,
            json!({ "owner": repo.owner, "repo": repo.name }),
        )
        .await
        .context("Failed to check discussions status")?;

    let enabled = data
        .pointer("/repository/hasDiscussionsEnabled")
        .and_then(Value::as_bool)
        .with_context(|| format!("Repository {repo} not found"))?;
    if !enabled {
        anyhow::bail!("Discussions are not enabled in {}", repo);
    }

    let id: String = decode(&data, "/repository/id")?;
    info!("✓ Discussions are enabled in {}", repo);
    Ok(id)
}

pub async fn fetch_categories(api: &dyn Api, repo: &Repo, pacer: &Pacer) -> Result<Vec<Category>> {
    info!("Fetching categories from {}...", repo);
    pacer.wait(CALL_DELAY_SECS).await;

    let data = api
        .graphql(
            queries::CATEGORIES,
            json!({ "owner": repo.owner, "repo": repo.name }),
        )
        .await
        .context("Failed to fetch categories")?;
    let categories: Nodes<Category> = decode(&data, "/repository/discussionCategories")?;
    info!("Found {} categories", categories.nodes.len());
    Ok(categories.nodes)
}

pub async fn fetch_labels(api: &dyn Api, repo: &Repo, pacer: &Pacer) -> Result<Vec<Label>> {
    info!("Fetching labels from {}...", repo);
    pacer.wait(CALL_DELAY_SECS).await;

    let data = api
        .graphql(
            queries::LABELS,
            json!({ "owner": repo.owner, "repo": repo.name }),
        )
        .await
        .context("Failed to fetch labels")?;
    let labels: Nodes<Label> = decode(&data, "/repository/labels")?;
    info!("Found {} labels", labels.nodes.len());
    Ok(labels.nodes)
}

fn created_id(data: &Value, pointer: &str) -> Result<String, ApiError> {
    data.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::Decode(format!("response is missing {pointer}")))
}

/// Copy state for one source/target pair.
struct Copier<'a> {
    source: &'a dyn Api,
    target: &'a dyn Api,
    target_repo_id: String,
    categories: Vec<Category>,
    labels: Vec<Label>,
    pacer: Pacer,
    stats: CopyStats,
}

impl Copier<'_> {
    fn category_for(&mut self, discussion: &SourceDiscussion) -> Option<String> {
        let name = &discussion.category.name;
        let slug = &discussion.category.slug;
        match choose_category(&self.categories, name, slug) {
            CategoryChoice::Matched(category) => Some(category.id.clone()),
            CategoryChoice::Fallback(category) => {
                warn!("Category '{}' ({}) not found in target repository", name, slug);
                warn!("Using '{}' category as fallback for '{}'", category.name, name);
                let id = category.id.clone();
                self.stats.record_missing_category(name);
                Some(id)
            }
            CategoryChoice::Unavailable => {
                self.stats.record_missing_category(name);
                error!("No available categories found in target repository");
                None
            }
        }
    }

    async fn label_id(&mut self, label: &Label) -> Option<String> {
        if let Some(existing) = self.labels.iter().find(|l| l.name == label.name) {
            return Some(existing.id.clone());
        }

        info!("Creating new label: '{}'", label.name);
        self.pacer.wait(CALL_DELAY_SECS).await;
        let description = label.description.clone().unwrap_or_default();
        let result = self
            .target
            .graphql(
                queries::CREATE_LABEL,
                json!({
                    "repositoryId": self.target_repo_id,
                    "name": label.name,
                    "color": label.color,
                    "description": description,
                }),
            )
            .await
            .and_then(|data| created_id(&data, "/createLabel/label/id"));

        match result {
            Ok(id) => {
                info!("✓ Created label '{}' with ID: {}", label.name, id);
                self.labels.push(Label {
                    id: id.clone(),
                    name: label.name.clone(),
                    color: label.color.clone(),
                    description: Some(description),
                });
                Some(id)
            }
            Err(e) => {
                error!("Failed to create label '{}': {}", label.name, e);
                None
            }
        }
    }

    async fn copy_labels(&mut self, discussion_id: &str, labels: &[Label]) {
        let mut ids = Vec::new();
        for label in labels {
            info!("Processing label: '{}' (color: {})", label.name, label.color);
            if let Some(id) = self.label_id(label).await {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            return;
        }

        info!("Adding {} labels to discussion", ids.len());
        self.pacer.wait(CALL_DELAY_SECS).await;
        match self
            .target
            .graphql(
                queries::ADD_LABELS,
                json!({ "labelableId": discussion_id, "labelIds": ids }),
            )
            .await
        {
            Ok(_) => info!("✓ Successfully added labels to discussion"),
            Err(e) => error!("Failed to add labels to discussion: {}", e),
        }
    }

    async fn fetch_comments(&self, discussion_id: &str) -> Vec<SourceComment> {
        info!("Fetching comments for discussion {}...", discussion_id);
        self.pacer.wait(CALL_DELAY_SECS).await;

        let result = self
            .source
            .graphql(
                queries::DISCUSSION_COMMENTS,
                json!({ "discussionId": discussion_id }),
            )
            .await
            .map_err(anyhow::Error::from)
            .and_then(|data| decode::<Nodes<SourceComment>>(&data, "/node/comments"));

        match result {
            Ok(comments) => comments.nodes,
            Err(e) => {
                error!("Failed to fetch comments: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn add_comment(
        &self,
        discussion_id: &str,
        reply_to: Option<&str>,
        body: String,
    ) -> Result<String, ApiError> {
        self.pacer.wait(CALL_DELAY_SECS).await;
        let (query, variables) = match reply_to {
            Some(parent) => (
                queries::ADD_REPLY,
                json!({ "discussionId": discussion_id, "replyToId": parent, "body": body }),
            ),
            None => (
                queries::ADD_COMMENT,
                json!({ "discussionId": discussion_id, "body": body }),
            ),
        };
        let data = self.target.graphql(query, variables).await?;
        created_id(&data, "/addDiscussionComment/comment/id")
    }

    async fn copy_comments(&mut self, discussion_id: &str, comments: &[SourceComment]) {
        if comments.is_empty() {
            info!("No comments to copy for this discussion");
            return;
        }

        info!("Copying {} comments...", comments.len());
        self.stats.comments_found += comments.len();

        for comment in comments {
            let Some(text) = comment.text() else {
                continue;
            };
            let author = comment.author();
            info!("Copying comment by @{}", author);

            let body = comment_body(text, author, comment.created_at());
            let comment_id = match self.add_comment(discussion_id, None, body).await {
                Ok(id) => {
                    info!("✓ Added comment with ID: {}", id);
                    id
                }
                Err(e) => {
                    error!("Failed to add comment: {}", e);
                    warn!("Failed to copy comment by @{}, skipping replies", author);
                    continue;
                }
            };
            self.stats.comments_copied += 1;

            let replies = &comment.replies.nodes;
            if !replies.is_empty() {
                info!("Copying {} replies to comment...", replies.len());
            }
            for reply in replies {
                let Some(text) = reply.text() else {
                    continue;
                };
                info!("Copying reply by @{}", reply.author());
                let body = reply_body(text, reply.author(), reply.created_at());
                match self.add_comment(discussion_id, Some(&comment_id), body).await {
                    Ok(id) => info!("✓ Added reply with ID: {}", id),
                    Err(e) => error!("Failed to add reply: {}", e),
                }
            }
        }

        info!("✓ Finished copying comments");
    }

    async fn create_discussion(
        &self,
        category_id: &str,
        discussion: &SourceDiscussion,
    ) -> Result<String, ApiError> {
        info!("Creating discussion: '{}'", discussion.title);
        self.pacer.wait(CREATE_DELAY_SECS).await;

        let author = author_or_unknown(discussion.author.as_ref().map(|a| a.login.as_str()));
        let body = discussion_body(
            discussion.body.as_deref().unwrap_or_default(),
            author,
            &discussion.created_at,
            &discussion.url,
        );
        let data = self
            .target
            .graphql(
                queries::CREATE_DISCUSSION,
                json!({
                    "repositoryId": self.target_repo_id,
                    "categoryId": category_id,
                    "title": discussion.title,
                    "body": body,
                }),
            )
            .await?;
        created_id(&data, "/createDiscussion/discussion/id")
    }

    async fn close_discussion(&self, discussion_id: &str) {
        info!("Source discussion is closed, closing target discussion...");
        self.pacer.wait(CALL_DELAY_SECS).await;
        match self
            .target
            .graphql(
                queries::CLOSE_DISCUSSION,
                json!({ "discussionId": discussion_id, "reason": "RESOLVED" }),
            )
            .await
        {
            Ok(_) => info!("✓ Discussion closed"),
            Err(e) => error!("Failed to close discussion: {}", e),
        }
    }

    async fn copy_discussion(&mut self, discussion: &SourceDiscussion) {
        self.stats.discussions_found += 1;
        info!(
            "=== Processing discussion #{}: '{}' ===",
            discussion.number, discussion.title
        );

        let Some(category_id) = self.category_for(discussion) else {
            error!("No valid category found for discussion #{}", discussion.number);
            self.stats.discussions_skipped += 1;
            return;
        };

        let new_id = match self.create_discussion(&category_id, discussion).await {
            Ok(id) => id,
            Err(e) => {
                error!(
                    "Failed to create discussion #{}: '{}' - {}",
                    discussion.number, discussion.title, e
                );
                self.stats.discussions_skipped += 1;
                return;
            }
        };
        self.stats.discussions_created += 1;
        info!(
            "✓ Created discussion #{}: '{}'",
            discussion.number, discussion.title
        );

        if !discussion.labels.nodes.is_empty() {
            self.copy_labels(&new_id, &discussion.labels.nodes).await;
        }

        let comments = self.fetch_comments(&discussion.id).await;
        self.copy_comments(&new_id, &comments).await;

        if discussion.closed {
            self.close_discussion(&new_id).await;
        }

        info!(
            "✅ Finished processing discussion #{}: '{}'",
            discussion.number, discussion.title
        );
        self.pacer.pause(DISCUSSION_DELAY_SECS).await;
    }

    async fn copy_all(&mut self, source: &Repo) -> Result<()> {
        let mut cursor: Option<String> = None;

        loop {
            info!(
                "Fetching discussions page (cursor: {})...",
                cursor.as_deref().unwrap_or("null")
            );
            self.pacer.wait(CREATE_DELAY_SECS).await;

            let data = self
                .source
                .graphql(
                    queries::DISCUSSIONS,
                    json!({ "owner": source.owner, "repo": source.name, "cursor": cursor }),
                )
                .await
                .context("Failed to fetch discussions")?;
            let page: DiscussionPage = decode(&data, "/repository/discussions")?;
            info!(
                "Found {} discussions to process on this page",
                page.nodes.len()
            );

            for discussion in &page.nodes {
                self.copy_discussion(discussion).await;
            }

            match page.page_info {
                PageInfo {
                    has_next_page: true,
                    end_cursor: Some(next),
                } => {
                    info!("Processing next page with cursor: {}", next);
                    cursor = Some(next);
                }
                _ => {
                    info!("No more pages to process");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Copies every discussion in `options.source` into `options.target`.
pub async fn copy_discussions(
    source: &dyn Api,
    target: &dyn Api,
    options: &CopyOptions,
) -> Result<CopyStats> {
    let pacer = Pacer::new(options.delay_scale);

    info!("Starting discussion copy process...");
    info!("Source: {}", options.source);
    info!("Target: {}", options.target);

    let source_id = check_discussions_enabled(source, &options.source, &pacer).await?;
    info!("Source repository ID: {}", source_id);
    let target_repo_id = check_discussions_enabled(target, &options.target, &pacer).await?;
    info!("Target repository ID: {}", target_repo_id);

    let categories = fetch_categories(target, &options.target, &pacer).await?;
    if categories.is_empty() {
        anyhow::bail!("No categories found in target repository");
    }
    info!("Available categories in target repository:");
    for category in &categories {
        info!("  {} ({})", category.name, category.slug);
    }

    let labels = fetch_labels(target, &options.target, &pacer).await?;
    info!(
        "Available labels in target repository: {} labels",
        labels.len()
    );

    let mut copier = Copier {
        source,
        target,
        target_repo_id,
        categories,
        labels,
        pacer,
        stats: CopyStats::default(),
    };
    copier.copy_all(&options.source).await?;

    Ok(copier.stats)
}

/// Lines for the closing summary. Warnings are flagged with `true`.
pub fn summary_lines(stats: &CopyStats, target: &Repo) -> Vec<(bool, String)> {
    let mut lines = vec![
        (false, "=".repeat(60)),
        (false, "Discussion copy completed!".to_string()),
        (false, format!("Total discussions found: {}", stats.discussions_found)),
        (false, format!("Discussions created: {}", stats.discussions_created)),
        (false, format!("Discussions skipped: {}", stats.discussions_skipped)),
        (false, format!("Total comments found: {}", stats.comments_found)),
        (false, format!("Comments copied: {}", stats.comments_copied)),
    ];

    if !stats.missing_categories.is_empty() {
        lines.push((
            true,
            "The following categories were missing and need to be created manually:".to_string(),
        ));
        lines.extend(
            stats
                .missing_categories
                .iter()
                .map(|c| (true, format!("  - {c}"))),
        );
        lines.push((true, "To create categories manually:".to_string()));
        lines.push((
            true,
            format!(
                "1. Go to https://github.com/{}/{}/discussions",
                target.owner, target.name
            ),
        ));
        lines.push((true, "2. Click 'New discussion'".to_string()));
        lines.push((true, "3. Look for category management options".to_string()));
        lines.push((
            true,
            "4. Create the missing categories with appropriate names and descriptions".to_string(),
        ));
    }

    if stats.discussions_skipped > 0 {
        lines.push((
            true,
            "Some discussions were skipped. Please check the categories in the target repository."
                .to_string(),
        ));
    }

    lines
}

pub fn log_summary(stats: &CopyStats, target: &Repo) {
    for (is_warning, line) in summary_lines(stats, target) {
        if is_warning {
            warn!("{}", line);
        } else {
            info!("{}", line);
        }
    }
}
