use std::io::Write;

use anyhow::Context;
use ghbulk::{
    ClientOptions, Connector, Credentials, bootstrap,
    cli::parse_dismiss_args,
    dismiss::{self, DismissTally},
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::init_tracing();

    let request = bootstrap::args_or_exit(parse_dismiss_args(std::env::args_os()))?;
    let orgs = request.resolve_orgs().await?;

    let connector = Connector::new(
        Credentials::from_env()?,
        ClientOptions::from_env(request.max_retries),
    )?;

    let options = &request.options;
    info!("Configuration:");
    info!("  Rule ID: {}", options.rule);
    info!("  Reason: {}", options.reason);
    if let Some(comment) = &options.comment {
        info!("  Comment: {}", comment);
    }
    if options.dry_run {
        info!("  Mode: DRY RUN (no changes will be made)");
    }

    let results = dismiss::run(&connector, &orgs, request.repo.as_deref(), options).await?;

    if !results.is_empty() {
        let table = dismiss::results_table(&results);
        match &request.output {
            Some(path) => {
                table.write_to(path).await?;
                info!("Report written to: {}", path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{}", table.render()).context("Failed to write report to stdout")?;
            }
        }
    }

    let tally = DismissTally::from_results(&results);
    if orgs.len() > 1 {
        info!("Processed {} organizations", orgs.len());
    }
    info!("Total: {}", tally.org_line(options.dry_run));
    info!(
        "Total API calls: {}",
        connector.calls().load(std::sync::atomic::Ordering::Relaxed)
    );

    Ok(())
}
