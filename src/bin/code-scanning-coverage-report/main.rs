use std::io::Write;

use anyhow::Context;
use ghbulk::{
    Api, ClientOptions, Connector, Credentials, bootstrap, cli::parse_coverage_args,
    coverage::generate_report,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::init_tracing();

    let options = bootstrap::args_or_exit(parse_coverage_args(std::env::args_os()))?;

    let connector = Connector::new(
        Credentials::from_env()?,
        ClientOptions::from_env(options.max_retries),
    )?;
    let github = connector.github_for_org(&options.org).await?;

    let report = generate_report(&github, &options).await?;

    if options.output.is_none() {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", report.csv).context("Failed to write report to stdout")?;
    }

    info!("API calls used: {}", github.api_calls());
    match github.rate_limit().await {
        Ok(bucket) => info!("Rate limit: {}", bucket.summary()),
        Err(e) => warn!("Could not fetch rate limit: {}", e),
    }

    Ok(())
}
