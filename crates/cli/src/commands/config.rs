use eyre::Result;

use crate::cli::ConfigCommands;
use crate::config::Config;
use crate::terminal::Terminal;

pub async fn handle_config_command(cmd: ConfigCommands, terminal: &Terminal) -> Result<()> {
    match cmd {
        ConfigCommands::Set { key, value } => handle_set_config(key, value).await,
        ConfigCommands::Get { key } => handle_get_config(key).await,
        ConfigCommands::Show => handle_show_config().await,
        ConfigCommands::Reset { force } => handle_reset_config(force, terminal).await,
    }
}

async fn handle_set_config(key: String, value: String) -> Result<()> {
    let mut config = Config::load().await?;

    match config.set_value(&key, &value) {
        Ok(_) => {
            config.save().await?;
            println!("✅ Configuration updated: {} = {}", key, value);
        }
        Err(e) => {
            println!("❌ Failed to set configuration: {}", e);
            return Err(e);
        }
    }

    Ok(())
}

async fn handle_get_config(key: String) -> Result<()> {
    let config = Config::load().await?;

    match config.get_value(&key) {
        Ok(value) => {
            println!("{}: {}", key, value);
        }
        Err(e) => {
            println!("❌ Failed to get configuration: {}", e);
            return Err(e);
        }
    }

    Ok(())
}

async fn handle_show_config() -> Result<()> {
    let config = Config::load().await?;
    println!("{}", config.show_all());
    println!("Stored at {}", Config::get_config_path().display());
    Ok(())
}

async fn handle_reset_config(force: bool, terminal: &Terminal) -> Result<()> {
    if !force {
        let answer = terminal
            .ask("Are you sure you want to reset all configuration? (y/N): ")
            .await
            .unwrap_or_default();
        if !answer.trim().to_lowercase().starts_with('y') {
            println!("❌ Cancelled");
            return Ok(());
        }
    }

    Config::reset().await?;
    println!("✅ Configuration reset to defaults");
    Ok(())
}
