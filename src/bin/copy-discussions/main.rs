use ghbulk::{
    Api, ClientOptions, Connector, Credentials, bootstrap,
    cli::parse_discussions_args,
    discussions::{copy_discussions, log_summary},
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::init_tracing();

    let request = bootstrap::args_or_exit(parse_discussions_args(std::env::args_os()))?;

    let source = Connector::new(
        Credentials::token_from_var("SOURCE_TOKEN")?,
        ClientOptions::from_env(request.max_retries).with_api_url_from("SOURCE_API_URL"),
    )?
    .client()
    .await?;
    let target = Connector::new(
        Credentials::token_from_var("TARGET_TOKEN")?,
        ClientOptions::from_env(request.max_retries).with_api_url_from("TARGET_API_URL"),
    )?
    .client()
    .await?;

    let stats = copy_discussions(&source, &target, &request.copy).await?;
    log_summary(&stats, &request.copy.target);
    info!(
        "API calls used: {} (source), {} (target)",
        source.api_calls(),
        target.api_calls()
    );
    info!("All done! ✨");

    Ok(())
}
