//! # souk-cli
//!
//! Command-line client for the Souk request core.
//!
//! Issues requests through the same `ApiClient` the marketplace services use,
//! so caching, deduplication and retries can be exercised against a live API.

use std::collections::HashMap;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use souk_core::error::{SoukError, SoukResult};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::CommandContext;
use output::errors::ErrorFormatter;

/// Exercise the Souk HTTP request core from the terminal
#[derive(Parser)]
#[command(name = "souk", version, about = "Souk API request core CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Anything that is not a known command
    #[arg(value_name = "COMMAND")]
    pub unknown: Option<String>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Flags that override every configuration file
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Retries after the first attempt
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Delay between retries in milliseconds
    #[arg(long, global = true)]
    pub retry_delay_ms: Option<u64>,

    /// Bearer token
    #[arg(long, global = true)]
    pub token: Option<String>,
}

impl ConfigOverrides {
    /// Overrides keyed the way the config layering expects them
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(base_url) = &self.base_url {
            overrides.insert("base_url".to_string(), base_url.clone());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            overrides.insert("timeout_ms".to_string(), timeout_ms.to_string());
        }
        if let Some(max_retries) = self.max_retries {
            overrides.insert("max_retries".to_string(), max_retries.to_string());
        }
        if let Some(retry_delay_ms) = self.retry_delay_ms {
            overrides.insert("retry_delay_ms".to_string(), retry_delay_ms.to_string());
        }
        if let Some(token) = &self.token {
            overrides.insert("token".to_string(), token.clone());
        }
        overrides
    }
}

/// How many times, and how concurrently, to issue a request
#[derive(Args, Debug, Clone, Copy)]
pub struct LoadArgs {
    /// Sequential rounds
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,

    /// Identical requests issued at once in every round
    #[arg(long, default_value_t = 1)]
    pub concurrent: u32,
}

#[derive(Subcommand)]
pub enum Commands {
    /// GET an endpoint
    Get {
        endpoint: String,
        #[command(flatten)]
        load: LoadArgs,
    },
    /// POST a JSON body
    Post {
        endpoint: String,
        /// JSON request body
        #[arg(long, short)]
        data: Option<String>,
        #[command(flatten)]
        load: LoadArgs,
    },
    /// PUT a JSON body
    Put {
        endpoint: String,
        /// JSON request body
        #[arg(long, short)]
        data: Option<String>,
        #[command(flatten)]
        load: LoadArgs,
    },
    /// PATCH a JSON body
    Patch {
        endpoint: String,
        /// JSON request body
        #[arg(long, short)]
        data: Option<String>,
        #[command(flatten)]
        load: LoadArgs,
    },
    /// DELETE an endpoint
    Delete {
        endpoint: String,
        #[command(flatten)]
        load: LoadArgs,
    },
    /// Validate and show the effective configuration
    Check {
        /// Print the effective configuration as souk.toml
        #[arg(long)]
        print: bool,
    },
    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose);
    setup_panic_handler();

    info!("Starting souk CLI v{}", env!("CARGO_PKG_VERSION"));

    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprint!("{}", ErrorFormatter::new().format_error(&e));
            ExitCode::FAILURE
        },
    }
}

fn run_cli(cli: Cli) -> SoukResult<()> {
    // Create Tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| SoukError::io("Failed to create async runtime".to_string(), e))?;

    rt.block_on(async {
        let ctx = CommandContext::new(cli.overrides.to_map())?;

        match (cli.command, cli.unknown) {
            (Some(command), _) => commands::dispatch_command(command, &ctx).await,
            (None, Some(input)) => commands::unknown_command(&input, &ctx),
            (None, None) => commands::show_help(&ctx),
        }
    })
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "souk={level},souk_client={level},souk_cache={level},souk_config={level}",
            level = level
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("souk encountered an unexpected error: {}", panic_info);
        eprintln!("souk crashed! This is a bug.");
        eprintln!("Please report this at: https://github.com/souk-market/souk/issues");
        eprintln!("Error: {}", panic_info);
    }));
}
