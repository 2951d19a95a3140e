use ghbulk::{
    ClientOptions, Connector, Credentials, bootstrap,
    cli::parse_codeowners_args,
    codeowners,
    inputs::{read_repositories_file, read_text_file},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::init_tracing();

    let request = bootstrap::args_or_exit(parse_codeowners_args(std::env::args_os()))?;
    let repos = read_repositories_file(&request.repos_file).await?;
    let content = read_text_file(&request.codeowners_file, "CODEOWNERS file").await?;

    let connector = Connector::new(
        Credentials::from_env()?,
        ClientOptions::from_env(request.max_retries),
    )?;
    let github = connector.client().await?;

    let counts = codeowners::run(&github, &repos, &content, &request.options).await?;

    if counts.has_errors() {
        std::process::exit(1);
    }
    Ok(())
}
