use ghbulk::{
    ClientOptions, Connector, Credentials, bootstrap,
    cli::parse_mappings_args,
    inputs::read_repositories_file,
    mappings::{self, read_mappings_file, repositories_from_env},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::init_tracing();

    let request = bootstrap::args_or_exit(parse_mappings_args(std::env::args_os()))?;
    let repos = match &request.repos_file {
        Some(path) => read_repositories_file(path).await?,
        None => repositories_from_env()?,
    };
    let table = read_mappings_file(&request.mappings_file).await?;

    let connector = Connector::new(
        Credentials::from_env()?,
        ClientOptions::from_env(request.max_retries),
    )?;
    let github = connector.client().await?;

    mappings::run(&github, &repos, &table, request.dry_run, request.concurrency).await;
    Ok(())
}
