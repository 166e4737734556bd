//! strictqa CLI
//!
//! Answers questions strictly from the answer cache, the local document
//! folder and the calculation services, in that order.

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AskCommand, CacheCommand, DocsCommand, InteractiveCommand, ScanCommand, ServeCalcCommand,
    StatusCommand,
};
use std::path::PathBuf;
use strictqa_core::{config::AppConfig, logging, AppError, AppResult};
use strictqa_router::Router;

/// strictqa - strict question answering over local documents
#[derive(Parser, Debug)]
#[command(name = "strictqa")]
#[command(about = "Strict question answering over local documents and calculation services", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "STRICTQA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "STRICTQA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Answer generator provider
    #[arg(short, long, global = true, env = "STRICTQA_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "STRICTQA_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a single question
    Ask(AskCommand),

    /// Ask questions in a loop (default)
    Interactive(InteractiveCommand),

    /// Show indexed documents and cache size
    Status(StatusCommand),

    /// List indexed documents
    Docs(DocsCommand),

    /// Index new files in the documents folder
    Scan(ScanCommand),

    /// Manage the answer cache
    Cache(CacheCommand),

    /// Serve the factorization and math services
    ServeCalc(ServeCalcCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Interactive(_) => "interactive",
            Commands::Status(_) => "status",
            Commands::Docs(_) => "docs",
            Commands::Scan(_) => "scan",
            Commands::Cache(_) => "cache",
            Commands::ServeCalc(_) => "serve-calc",
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_with(cli.workspace, cli.config)?.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;
    config.validate()?;

    tracing::info!("strictqa starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {} / {}", config.llm.provider, config.llm.model);

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Interactive(InteractiveCommand::default()));
    let _span = tracing::info_span!("command", name = command.name()).entered();

    let result = run(command, &config).await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

async fn run(command: Commands, config: &AppConfig) -> AppResult<()> {
    if let Commands::ServeCalc(cmd) = &command {
        return cmd
            .execute()
            .await
            .map_err(|e| AppError::Other(format!("{:#}", e)));
    }

    let router = Router::from_config(config)?;

    match command {
        Commands::Ask(cmd) => cmd.execute(config, &router).await,
        Commands::Interactive(cmd) => {
            // Pick up files dropped into the folder since the last run.
            match router.scan_documents().await {
                Ok(0) => {}
                Ok(added) => tracing::info!("Indexed {} new document(s)", added),
                Err(e) => tracing::warn!("Document scan failed: {}", e),
            }
            cmd.execute(config, &router).await
        }
        Commands::Status(cmd) => cmd.execute(&router).await,
        Commands::Docs(cmd) => cmd.execute(&router).await,
        Commands::Scan(cmd) => cmd.execute(&router).await,
        Commands::Cache(cmd) => cmd.execute(&router).await,
        // Handled before the router is built.
        Commands::ServeCalc(_) => Ok(()),
    }
}
