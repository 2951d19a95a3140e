use std::path::PathBuf;

use anyhow::Context;
use ghbulk::{bootstrap, cli::parse_jwt_args, jwt::generate_jwt};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

/// Asks for a value on stdin; the prompt goes to stderr so stdout carries
/// only the token.
async fn prompt(input: &mut Lines<BufReader<Stdin>>, message: &str) -> anyhow::Result<String> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(message.as_bytes()).await?;
    stderr.flush().await?;

    let line = input
        .next_line()
        .await
        .context("Failed to read from stdin")?
        .unwrap_or_default();
    let value = line.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("No value entered");
    }
    Ok(value)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    bootstrap::init_tracing();

    let request = bootstrap::args_or_exit(parse_jwt_args(std::env::args_os()))?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let pem_path = match request.private_key {
        Some(path) => path,
        None => PathBuf::from(prompt(&mut input, "Enter path of private PEM file: ").await?),
    };
    let app_id = match request.app_id {
        Some(id) => id,
        None => prompt(&mut input, "Enter your APP ID: ").await?,
    };

    let pem = tokio::fs::read(&pem_path)
        .await
        .with_context(|| format!("Failed to read private key file: {}", pem_path.display()))?;
    let token = generate_jwt(&app_id, &pem)?;
    println!("{token}");

    Ok(())
}
