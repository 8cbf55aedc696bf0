mod cli;
mod commands;
mod config;
mod terminal;

use std::sync::Arc;

use clap::Parser;
use eyre::WrapErr;
use gitpad_client::{FileTokenStore, GitHubClient};

use crate::cli::Commands;
use crate::config::Config;
use crate::terminal::{Terminal, TerminalConsent, TerminalInteraction};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let terminal = Terminal::stdin();
    let yes = cli.yes;

    match cli.command {
        Commands::Config { command } => {
            commands::handle_config_command(command, &terminal).await?;
        }
        Commands::Login { remember } => {
            let client = connect(&terminal, remember, None, yes).await?;
            commands::handle_login_command(&client).await?;
        }
        Commands::Logout => {
            let client = connect(&terminal, false, None, yes).await?;
            commands::handle_logout_command(&client).await?;
        }
        Commands::Whoami => {
            let client = connect(&terminal, false, None, yes).await?;
            commands::handle_whoami_command(&client).await?;
        }
        Commands::Ls { locator } => {
            let client = connect(&terminal, false, None, yes).await?;
            commands::handle_ls_command(&client, locator).await?;
        }
        Commands::Cat { locator, library } => {
            let client = connect(&terminal, false, None, yes).await?;
            commands::handle_cat_command(&client, locator, library).await?;
        }
        Commands::Push {
            file,
            locator,
            message,
            library,
        } => {
            let client = connect(&terminal, false, message, yes).await?;
            commands::handle_push_command(&client, file, locator, library).await?;
        }
    }

    Ok(())
}

/// Builds a client from the saved configuration, prompting on the terminal.
async fn connect(
    terminal: &Terminal,
    remember: bool,
    message: Option<String>,
    yes: bool,
) -> eyre::Result<GitHubClient> {
    let config = Config::load().await?;
    let remember = remember || config.auth.remember;
    tracing::debug!(
        "Loaded configuration from {}",
        Config::get_config_path().display()
    );

    GitHubClient::builder(config.client.clone())
        .consent(Arc::new(TerminalConsent::new(terminal.clone(), remember)))
        .interaction(Arc::new(TerminalInteraction::new(
            terminal.clone(),
            message,
            yes,
        )))
        .token_store(Arc::new(FileTokenStore::new(config.token_path())))
        .build()
        .await
        .wrap_err("Cannot set up the GitHub client (see `gitpad config show`)")
}
