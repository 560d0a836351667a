use anyhow::{Context, Result};
use clap::Subcommand;
use costforge_core::config::{init_config_file, Config, ConfigLoader};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a default configuration file to the standard location
    Init,

    /// Show the effective configuration (defaults + file + environment)
    Show,

    /// Validate a configuration file
    Validate {
        /// Path to config file (default: ~/.config/costforge/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub async fn execute(cmd: ConfigCommands, verbose: bool) -> Result<()> {
    match cmd {
        ConfigCommands::Init => init(verbose).await,
        ConfigCommands::Show => show(verbose).await,
        ConfigCommands::Validate { config } => validate(config, verbose).await,
    }
}

async fn init(verbose: bool) -> Result<()> {
    let path = init_config_file().context("Failed to initialize configuration file")?;
    println!("Configuration saved to: {}", path.display());

    if verbose {
        println!("\nNext steps:");
        println!("  • Run 'costforge plugin install <name>' to install a plugin");
        println!("  • Run 'costforge config show' to view the effective configuration");
    }

    Ok(())
}

async fn show(verbose: bool) -> Result<()> {
    let config = ConfigLoader::new().load().context("Failed to load configuration")?;

    println!("Registry root:      {}", config.registry.root.display());
    println!("HTTP timeout:       {}s", config.registry.http_timeout_seconds);
    println!("Max retries:        {}", config.registry.max_retries);
    println!("Legacy plugin names: {}", config.registry.legacy_plugin_names);
    println!("Log level:          {}", config.logging.level);

    if verbose {
        if let Ok(toml_string) = toml::to_string_pretty(&config) {
            println!("\nFull configuration:\n{}", toml_string);
        }
    }

    if let Some(path) = ConfigLoader::default_config_path() {
        println!("\nConfig file: {}", path.display());
    }

    Ok(())
}

async fn validate(config_path: Option<PathBuf>, verbose: bool) -> Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(ref path) = config_path {
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        loader = loader.with_file(path).skip_default_file();
    }

    let config: Config = loader.load().context("Configuration is invalid")?;

    println!("Configuration file is valid!");
    println!("  Registry root:       {}", config.registry.root.display());
    println!("  HTTP timeout:        {}s", config.registry.http_timeout_seconds);
    println!("  Max retries:         {}", config.registry.max_retries);
    println!("  Log level:           {}", config.logging.level);

    if verbose {
        if let Some(path) = &config_path {
            let content = std::fs::read_to_string(path).context("Failed to read configuration file")?;
            println!("\nConfiguration content:\n{}", content);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_show_default_config_succeeds() {
        assert!(show(false).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_missing_file_fails() {
        let result = validate(Some(PathBuf::from("/nonexistent/costforge.toml")), false).await;
        assert!(result.is_err());
    }
}
