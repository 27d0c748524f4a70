//! Framebase signature CLI.
//!
//! This tool provides commands for:
//! - Signing requests with a shared secret key
//! - Verifying signature tokens against a request
//! - Inspecting tokens and extracting their nonce
//! - Building signed API URLs from a configuration file
//! - Validating configuration files

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod config;
mod error;
mod logging;
mod signature;

use error::CliError;
use signature::{KeyArgs, RequestArgs};

#[derive(Parser)]
#[command(name = "fbsig")]
#[command(about = "Sign, verify and inspect Framebase API request signatures")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a request and print the signature token
    Sign {
        #[command(flatten)]
        request: RequestArgs,

        #[command(flatten)]
        key: KeyArgs,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Verify a signature token against a request
    Verify {
        /// Signature token
        #[arg(long, short)]
        token: String,

        #[command(flatten)]
        request: RequestArgs,

        #[command(flatten)]
        key: KeyArgs,
    },

    /// Print the nonce embedded in a token
    Nonce {
        /// Signature token
        #[arg(long, short)]
        token: String,
    },

    /// Decode a token without verifying it
    Inspect {
        /// Signature token
        #[arg(long, short)]
        token: String,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print a signed URL for an API endpoint
    Url {
        /// Path to the TOML configuration file
        #[arg(long, short)]
        file: PathBuf,

        /// HTTP method
        #[arg(long, short, default_value = "GET")]
        method: String,

        /// Endpoint path (e.g. /videos.json)
        #[arg(long, short)]
        endpoint: String,

        /// Query parameter as name=value; may be repeated
        #[arg(long = "param", short = 'p', value_parser = config::parse_param)]
        params: Vec<(String, String)>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate config against settings validation
    Validate {
        /// Path to the TOML configuration file
        #[arg(long, short)]
        file: PathBuf,
    },
}

#[derive(Clone, ValueEnum, Debug)]
pub enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match run(cli) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<String, CliError> {
    match cli.command {
        Commands::Sign {
            request,
            key,
            format,
        } => signature::sign_command(&request, &key, &format),
        Commands::Verify {
            token,
            request,
            key,
        } => signature::verify_command(&token, &request, &key),
        Commands::Nonce { token } => signature::nonce_command(&token),
        Commands::Inspect { token, format } => signature::inspect_command(&token, &format),
        Commands::Url {
            file,
            method,
            endpoint,
            params,
        } => config::signed_url(&file, &method, &endpoint, &params),
        Commands::Config { action } => match action {
            ConfigAction::Validate { file } => config::validate(&file, cli.verbose),
        },
    }
}
