use anyhow::{Context, Result};
use clap::Subcommand;
use costforge_core::config::ConfigLoader;
use costforge_registry::discovery;
use costforge_registry::install::{self, InstallOptions};
use costforge_registry::manifest::PluginManifest;
use costforge_registry::release::ReleaseClient;
use costforge_registry::remove::{self, RemoveOptions};
use costforge_registry::update;

use crate::error::CliError;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum PluginCommands {
    /// Install a plugin by catalog name or host/owner/repo reference
    Install {
        /// `name[@version]` or `host/owner/repo[@version]`
        specifier: String,

        /// Overwrite an existing install of the same name/version
        #[arg(long)]
        force: bool,

        /// Don't record the install in the manifest
        #[arg(long)]
        no_save: bool,

        #[arg(short, long, value_enum, default_value = "pretty")]
        output_format: OutputFormat,
    },

    /// Update an installed plugin to its latest (or a specific) release
    #[command(disable_version_flag = true)]
    Update {
        /// Installed plugin name
        name: String,

        /// Update to this version instead of latest
        #[arg(long)]
        version: Option<String>,

        /// Report the would-be transition without changing anything on disk
        #[arg(long)]
        dry_run: bool,

        #[arg(short, long, value_enum, default_value = "pretty")]
        output_format: OutputFormat,
    },

    /// Remove an installed plugin
    Remove {
        /// Installed plugin name
        name: String,

        /// Leave the manifest record in place
        #[arg(long)]
        keep_config: bool,

        #[arg(short, long, value_enum, default_value = "pretty")]
        output_format: OutputFormat,
    },

    /// List plugins discovered on disk
    List {
        #[arg(short, long, value_enum, default_value = "pretty")]
        output_format: OutputFormat,
    },
}

pub async fn execute(cmd: PluginCommands, verbose: bool) -> Result<()> {
    let config = ConfigLoader::new().load().context("Failed to load configuration")?;
    let manifest = PluginManifest::default_location().context("Failed to open plugin manifest")?;

    match cmd {
        PluginCommands::Install {
            specifier,
            force,
            no_save,
            output_format,
        } => {
            if verbose {
                tracing::info!(specifier = %specifier, "installing plugin");
            }
            let client = ReleaseClient::with_config(config.registry.http_timeout_seconds, config.registry.max_retries)
                .context("Failed to build release client")?;
            let options = InstallOptions { force, no_save };
            let outcome = install::install(&config.registry.root, &manifest, &client, &specifier, &options)
                .await
                .map_err(|e| CliError::plugin_operation_failed("install", e))?;
            output::display_install_outcome(&outcome, output_format)
        }

        PluginCommands::Update {
            name,
            version,
            dry_run,
            output_format,
        } => {
            if verbose {
                tracing::info!(plugin = %name, "updating plugin");
            }
            let client = ReleaseClient::with_config(config.registry.http_timeout_seconds, config.registry.max_retries)
                .context("Failed to build release client")?;
            let outcome = update::update(
                &config.registry.root,
                &manifest,
                &client,
                &name,
                version.as_deref(),
                dry_run,
            )
            .await
            .map_err(|e| CliError::plugin_operation_failed("update", e))?;
            output::display_update_outcome(&outcome, output_format)
        }

        PluginCommands::Remove {
            name,
            keep_config,
            output_format,
        } => {
            if verbose {
                tracing::info!(plugin = %name, "removing plugin");
            }
            let options = RemoveOptions { keep_config };
            remove::remove(&config.registry.root, &manifest, &name, &options)
                .map_err(|e| CliError::plugin_operation_failed("remove", e))?;
            output::display_removed(&name, output_format);
            Ok(())
        }

        PluginCommands::List { output_format } => {
            let (plugins, warnings) =
                discovery::list_latest(&config.registry.root, config.registry.legacy_plugin_names);
            for warning in &warnings {
                eprintln!("warning: {warning}");
            }
            output::display_plugin_list(&plugins, output_format)
        }
    }
}
