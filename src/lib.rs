//! ghbulk: bulk administration tools for GitHub organizations.
//!
//! Each binary drives one workflow (code scanning coverage reports, alert
//! dismissal, CODEOWNERS and dependabot.yml rollout, owner remapping and
//! discussion copying) over the shared [`Api`] seam, so every workflow can
//! run against an in-memory GitHub in tests.

pub mod auth;
pub mod batch;
pub mod bootstrap;
pub mod cli;
pub mod codeowners;
pub mod contents;
pub mod coverage;
pub mod csv;
pub mod dependabot;
pub mod discussions;
pub mod dismiss;
pub mod github;
pub mod inputs;
pub mod jwt;
pub mod mappings;
pub mod types;

pub use auth::{ClientFactory, Connector, Credentials};
pub use batch::{StatusCounts, process_in_batches};
pub use github::{ClientOptions, GitHub};
pub use types::{Api, ApiError, ItemStatus, Method, Repo, RepoError};
