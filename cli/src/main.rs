use clap::{Parser, Subcommand};
use std::process;

mod commands;
mod error;
mod output;

use commands::{config, plugin};
use error::{exit_codes, CliError};

/// Costforge - plugin registry and lifecycle manager for cost-source plugins
#[derive(Parser)]
#[command(name = "costforge")]
#[command(author = "Costforge Contributors")]
#[command(version)]
#[command(about = "Install, update, and manage costforge cost-source plugins", long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install, update, remove, and list plugins
    #[command(subcommand, visible_alias = "p")]
    Plugin(plugin::PluginCommands),

    /// Configuration management commands
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = match cli.command {
        Commands::Plugin(cmd) => plugin::execute(cmd, cli.verbose).await,
        Commands::Config(cmd) => config::execute(cmd, cli.verbose).await,
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        let exit_code = match e.downcast::<CliError>() {
            Ok(cli_error) => {
                cli_error.print_error();
                cli_error.exit_code()
            }
            Err(other) => {
                eprintln!("Error: {other}");
                if cli.verbose {
                    eprintln!("\nCaused by:");
                    for cause in other.chain().skip(1) {
                        eprintln!("  {cause}");
                    }
                }
                exit_codes::ERROR
            }
        };
        process::exit(exit_code);
    }
}

fn init_tracing() {
    let filter = std::env::var("COSTFORGE_LOG_LEVEL")
        .ok()
        .and_then(|level| tracing_subscriber::EnvFilter::try_new(level).ok())
        .or_else(|| tracing_subscriber::EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
