use ghbulk::{
    ClientOptions, Connector, Credentials, bootstrap,
    cli::parse_dependabot_args,
    dependabot,
    inputs::{read_repositories_file, read_text_file},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::init_tracing();

    let request = bootstrap::args_or_exit(parse_dependabot_args(std::env::args_os()))?;
    let repos = read_repositories_file(&request.repos_file).await?;
    let content = read_text_file(&request.dependabot_file, "dependabot.yml").await?;

    let connector = Connector::new(
        Credentials::from_env()?,
        ClientOptions::from_env(request.max_retries),
    )?;
    let github = connector.client().await?;

    dependabot::run(&github, &repos, &content, &request.options).await;
    Ok(())
}
