//! mccli
//!
//! SSH client wrapper for OIDC-based authentication:
//! - `ssh`: log in or run a command on a motley_cue-managed host
//! - `scp`: copy files to or from such hosts
//! - `sftp`: not implemented

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mc_core::config::load_client_config;
use mc_core::credentials::process_env;
use mc_core::{McError, SessionResolver};
use mccli::args::{CommonArgs, ScpArgs, SshArgs};
use mccli::commands;
use mccli::output::print_error;
use mccli::transport::{askpass, SystemTransport};

#[derive(Parser)]
#[command(name = "mccli")]
#[command(author, version, about = "SSH client wrapper with OIDC-based authentication")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remote login client
    Ssh(SshArgs),

    /// Secure file copy
    Scp(ScpArgs),

    /// --- Not implemented ---
    Sftp,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Some(code) = askpass::run_if_requested() {
        return code;
    }

    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            print_error(&e.to_string());
            let code = e.downcast_ref::<McError>().map(McError::exit_code).unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    if let Commands::Sftp = cli.command {
        commands::sftp_command();
        return Ok(0);
    }

    let config = load_client_config(cli.config.as_deref()).map_err(McError::from)?;

    let port = match &cli.command {
        Commands::Sftp => return Ok(0),
        Commands::Ssh(args) => commands::effective_port(args.port, &config),
        Commands::Scp(args) => commands::effective_port(args.port, &config),
    };

    let source = cli
        .common
        .credential_flags()
        .select(process_env, &config)?;
    match &source {
        Some(source) => tracing::debug!("Access token source: {}", source.describe()),
        None => tracing::debug!("No access token source configured"),
    }

    let settings = commands::resolver_settings(&cli.common, &config);
    let mut resolver = SessionResolver::connect(settings, source, &config)?;
    let transport = SystemTransport::new()?;

    let code = match &cli.command {
        Commands::Ssh(args) => commands::ssh_command(args, port, &mut resolver, &transport).await?,
        Commands::Scp(args) => commands::scp_command(args, port, &mut resolver, &transport).await?,
        Commands::Sftp => 0,
    };

    Ok(u8::try_from(code).unwrap_or(1))
}
