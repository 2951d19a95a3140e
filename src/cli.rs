use std::{ffi::OsString, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser};

use crate::{
    codeowners::{self, CodeownersOptions},
    contents::Committer,
    coverage::{self, CoverageOptions},
    dependabot::{self, DependabotOptions},
    discussions::{CopyOptions, DEFAULT_DELAY_SCALE},
    dismiss::{self, DismissOptions, DismissReason},
    github::DEFAULT_MAX_RETRIES,
    inputs::read_orgs_file,
    mappings::DEFAULT_MAPPINGS_FILE,
    types::Repo,
};

const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

fn positive(flag: &str, value: usize) -> Result<usize> {
    if value == 0 {
        anyhow::bail!("{flag} must be a positive number");
    }
    Ok(value)
}

/// Options shared by every tool that talks to the REST API in windows.
#[derive(Args, Debug, Clone)]
struct ThrottleArgs {
    /// Number of repositories or alerts processed concurrently
    #[arg(long, default_value_t = coverage::DEFAULT_CONCURRENCY, value_name = "N")]
    pub concurrency: usize,

    /// Retries after hitting a rate limit
    #[arg(long = "max-retries", default_value_t = DEFAULT_MAX_RETRIES, value_name = "N")]
    pub max_retries: usize,
}

impl ThrottleArgs {
    fn concurrency(&self) -> Result<usize> {
        positive("--concurrency", self.concurrency)
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "code-scanning-coverage-report",
    about = "Report CodeQL code scanning coverage for the repositories of an organization"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct CoverageArgs {
    /// GitHub organization name
    pub org: String,

    /// Write the CSV report (and filtered sub-reports) to FILE instead of stdout
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report on a single repository
    #[arg(long, value_name = "REPO", conflicts_with = "sample")]
    pub repo: Option<String>,

    /// Report on a random sample of repositories
    #[arg(long)]
    pub sample: bool,

    /// Check the latest CodeQL workflow run
    #[arg(long = "check-workflow-status")]
    pub check_workflow_status: bool,

    /// Flag repositories with workflows whose Actions are not scanned
    #[arg(long = "check-unscanned-actions")]
    pub check_unscanned_actions: bool,

    /// Count open and critical code scanning alerts
    #[arg(long = "fetch-alerts")]
    pub fetch_alerts: bool,

    /// Days between last update and last scan before a repository is stale
    #[arg(long = "stale-days", default_value_t = coverage::DEFAULT_STALE_DAYS, value_name = "DAYS")]
    pub stale_days: u64,

    #[command(flatten)]
    pub throttle: ThrottleArgs,
}

/// Parses `code-scanning-coverage-report` arguments.
pub fn parse_coverage_args<I, T>(args: I) -> Result<CoverageOptions>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = CoverageArgs::try_parse_from(args)?;
    if cli.stale_days == 0 {
        anyhow::bail!("--stale-days must be a positive number");
    }

    Ok(CoverageOptions {
        org: cli.org,
        output: cli.output,
        repo: cli.repo,
        sample: cli.sample,
        check_workflow_status: cli.check_workflow_status,
        check_unscanned_actions: cli.check_unscanned_actions,
        fetch_alerts: cli.fetch_alerts,
        concurrency: cli.throttle.concurrency()?,
        stale_days: cli.stale_days,
        max_retries: cli.throttle.max_retries,
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "dismiss-code-scanning-alerts",
    about = "Dismiss code scanning alerts by rule ID across the repositories of one or more organizations"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct DismissArgs {
    /// GitHub organization name
    #[arg(required_unless_present = "orgs_file", conflicts_with = "orgs_file")]
    pub org: Option<String>,

    /// File listing organizations, one per line
    #[arg(long = "orgs-file", value_name = "FILE")]
    pub orgs_file: Option<PathBuf>,

    /// Target a single repository instead of every repository
    #[arg(long, value_name = "REPO")]
    pub repo: Option<String>,

    /// CodeQL rule ID to match (e.g. js/stack-trace-exposure)
    #[arg(long, value_name = "RULE-ID")]
    pub rule: String,

    /// Dismissal reason: "false positive", "won't fix" or "used in tests"
    #[arg(long, value_name = "REASON")]
    pub reason: String,

    /// Dismissal comment
    #[arg(long, value_name = "TEXT")]
    pub comment: Option<String>,

    /// Write the CSV report to FILE instead of stdout
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Show what would be dismissed without changing anything
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    #[command(flatten)]
    pub throttle: ThrottleArgs,
}

/// Where the organizations to process come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrgTarget {
    Single(String),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DismissRequest {
    pub orgs: OrgTarget,
    pub repo: Option<String>,
    pub output: Option<PathBuf>,
    pub max_retries: usize,
    pub options: DismissOptions,
}

impl DismissRequest {
    /// Resolves the organization list, reading the orgs file if given.
    /// `--repo` only makes sense with exactly one organization.
    pub async fn resolve_orgs(&self) -> Result<Vec<String>> {
        let orgs = match &self.orgs {
            OrgTarget::Single(org) => vec![org.clone()],
            OrgTarget::File(path) => read_orgs_file(path).await?,
        };
        if self.repo.is_some() && orgs.len() > 1 {
            anyhow::bail!("--repo cannot be used with multiple organizations");
        }
        Ok(orgs)
    }
}

/// Parses `dismiss-code-scanning-alerts` arguments.
pub fn parse_dismiss_args<I, T>(args: I) -> Result<DismissRequest>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = DismissArgs::try_parse_from(args)?;
    let reason: DismissReason = cli.reason.parse()?;
    let orgs = match cli.orgs_file {
        Some(path) => OrgTarget::File(path),
        None => OrgTarget::Single(
            cli.org.context("Organization name or --orgs-file is required")?,
        ),
    };

    Ok(DismissRequest {
        orgs,
        repo: cli.repo,
        output: cli.output,
        max_retries: cli.throttle.max_retries,
        options: DismissOptions {
            rule: cli.rule,
            reason,
            comment: cli.comment,
            dry_run: cli.dry_run,
            concurrency: cli.throttle.concurrency()?,
        },
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "add-codeowners-to-repositories",
    about = "Add or update a CODEOWNERS file across a list of repositories"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct CodeownersArgs {
    /// File listing repositories (owner/repo or URL), one per line
    #[arg(long = "repos-file", value_name = "FILE")]
    pub repos_file: PathBuf,

    /// CODEOWNERS content to add
    #[arg(long, value_name = "FILE")]
    pub codeowners: PathBuf,

    /// Replace an existing CODEOWNERS file instead of appending to it
    #[arg(long)]
    pub overwrite: bool,

    /// Commit on a new branch and open a pull request
    #[arg(long = "create-pr")]
    pub create_pr: bool,

    /// Branch name used with --create-pr
    #[arg(long, default_value = codeowners::DEFAULT_BRANCH_NAME, value_name = "NAME")]
    pub branch: String,

    /// Pull request title used with --create-pr
    #[arg(long = "pr-title", default_value = codeowners::DEFAULT_PR_TITLE, value_name = "TITLE")]
    pub pr_title: String,

    /// Show what would change without committing
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    #[command(flatten)]
    pub throttle: ThrottleArgs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeownersRequest {
    pub repos_file: PathBuf,
    pub codeowners_file: PathBuf,
    pub max_retries: usize,
    pub options: CodeownersOptions,
}

/// Parses `add-codeowners-to-repositories` arguments.
pub fn parse_codeowners_args<I, T>(args: I) -> Result<CodeownersRequest>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = CodeownersArgs::try_parse_from(args)?;
    if cli.branch.trim().is_empty() {
        anyhow::bail!("--branch must not be empty");
    }

    Ok(CodeownersRequest {
        repos_file: cli.repos_file,
        codeowners_file: cli.codeowners,
        max_retries: cli.throttle.max_retries,
        options: CodeownersOptions {
            overwrite: cli.overwrite,
            create_pr: cli.create_pr,
            branch: cli.branch,
            pr_title: cli.pr_title,
            dry_run: cli.dry_run,
            concurrency: cli.throttle.concurrency()?,
        },
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "add-dependabot-file-to-repositories",
    about = "Commit a dependabot.yml file to a list of repositories"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct DependabotArgs {
    /// File listing repositories (owner/repo or URL), one per line
    pub repos_file: PathBuf,

    /// dependabot.yml content to commit
    pub dependabot_file: PathBuf,

    /// Replace an existing .github/dependabot.yml
    #[arg(long)]
    pub overwrite: bool,

    /// Show what would change without committing
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Commit author name (e.g. my-app[bot])
    #[arg(long = "committer-name", requires = "committer_email", value_name = "NAME")]
    pub committer_name: Option<String>,

    /// Commit author email
    #[arg(long = "committer-email", requires = "committer_name", value_name = "EMAIL")]
    pub committer_email: Option<String>,

    #[command(flatten)]
    pub throttle: ThrottleArgs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependabotRequest {
    pub repos_file: PathBuf,
    pub dependabot_file: PathBuf,
    pub max_retries: usize,
    pub options: DependabotOptions,
}

/// Parses `add-dependabot-file-to-repositories` arguments.
pub fn parse_dependabot_args<I, T>(args: I) -> Result<DependabotRequest>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = DependabotArgs::try_parse_from(args)?;
    let committer = match (cli.committer_name, cli.committer_email) {
        (Some(name), Some(email)) => Some(Committer { name, email }),
        _ => None,
    };

    Ok(DependabotRequest {
        repos_file: cli.repos_file,
        dependabot_file: cli.dependabot_file,
        max_retries: cli.throttle.max_retries,
        options: DependabotOptions {
            overwrite: cli.overwrite,
            dry_run: cli.dry_run,
            committer,
            concurrency: cli.throttle.concurrency()?,
        },
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "update-codeowners-mappings",
    about = "Rewrite owners in existing CODEOWNERS files from an oldValue,newValue mapping CSV"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct MappingsArgs {
    /// File listing repositories; defaults to the REPOSITORIES environment variable
    #[arg(long = "repos-file", value_name = "FILE")]
    pub repos_file: Option<PathBuf>,

    /// Mapping CSV with oldValue,newValue columns
    #[arg(long, default_value = DEFAULT_MAPPINGS_FILE, value_name = "FILE")]
    pub mappings: PathBuf,

    /// Show what would change without committing
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    #[command(flatten)]
    pub throttle: ThrottleArgs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingsRequest {
    pub repos_file: Option<PathBuf>,
    pub mappings_file: PathBuf,
    pub dry_run: bool,
    pub concurrency: usize,
    pub max_retries: usize,
}

/// Parses `update-codeowners-mappings` arguments.
pub fn parse_mappings_args<I, T>(args: I) -> Result<MappingsRequest>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = MappingsArgs::try_parse_from(args)?;
    Ok(MappingsRequest {
        repos_file: cli.repos_file,
        mappings_file: cli.mappings,
        dry_run: cli.dry_run,
        concurrency: cli.throttle.concurrency()?,
        max_retries: cli.throttle.max_retries,
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "copy-discussions",
    about = "Copy discussions, labels, comments and replies between repositories"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct DiscussionsArgs {
    /// Source organization (read with SOURCE_TOKEN)
    pub source_org: String,
    /// Source repository
    pub source_repo: String,
    /// Target organization (written with TARGET_TOKEN)
    pub target_org: String,
    /// Target repository
    pub target_repo: String,

    /// Multiplier for the pauses between API calls; 0 disables them
    #[arg(long = "delay-scale", default_value_t = DEFAULT_DELAY_SCALE, value_name = "FACTOR")]
    pub delay_scale: f64,

    /// Retries after hitting a rate limit
    #[arg(long = "max-retries", default_value_t = DEFAULT_MAX_RETRIES, value_name = "N")]
    pub max_retries: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscussionsRequest {
    pub copy: CopyOptions,
    pub max_retries: usize,
}

/// Parses `copy-discussions` arguments.
pub fn parse_discussions_args<I, T>(args: I) -> Result<DiscussionsRequest>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = DiscussionsArgs::try_parse_from(args)?;
    if !cli.delay_scale.is_finite() || cli.delay_scale < 0.0 {
        anyhow::bail!("--delay-scale must be zero or a positive number");
    }

    Ok(DiscussionsRequest {
        copy: CopyOptions {
            source: Repo::new(cli.source_org, cli.source_repo)?,
            target: Repo::new(cli.target_org, cli.target_repo)?,
            delay_scale: cli.delay_scale,
        },
        max_retries: cli.max_retries,
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "create-app-jwt",
    about = "Print a JWT for authenticating as a GitHub App"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct JwtArgs {
    /// Path to the App's private key (.pem); prompted for when omitted
    pub private_key: Option<PathBuf>,

    /// GitHub App ID; prompted for when omitted
    pub app_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtRequest {
    pub private_key: Option<PathBuf>,
    pub app_id: Option<String>,
}

/// Parses `create-app-jwt` arguments.
pub fn parse_jwt_args<I, T>(args: I) -> Result<JwtRequest>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = JwtArgs::try_parse_from(args)?;
    Ok(JwtRequest {
        private_key: cli.private_key,
        app_id: cli.app_id,
    })
}
