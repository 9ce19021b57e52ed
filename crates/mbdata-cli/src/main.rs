//! mbdata - Command-line tool for the Mercedes-Benz vehicle data API
//!
//! Logs in with a refresh token, discovers the vehicle's resources and reads
//! odometer, lock status and the discovered fields. The rotated refresh
//! token is written back to the token file after every command.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mbdata_client::{MercedesVehicle, VehicleApi};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "mbdata")]
#[command(author, version, about = "Mercedes-Benz Vehicle Data CLI")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MBDATA_CONFIG")]
    config: Option<PathBuf>,

    /// Developer account identifier
    #[arg(short, long, env = "MBDATA_ACCOUNT")]
    account: Option<String>,

    /// Vehicle identification number
    #[arg(long, env = "MBDATA_VIN")]
    vin: Option<String>,

    /// Refresh token (overrides the token file)
    #[arg(long, env = "MBDATA_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange the refresh token and store the rotated one
    Login,

    /// Discover the resources available for the vehicle
    Resources,

    /// Read vehicle status and all discovered resources once
    Read,

    /// Read repeatedly until Ctrl+C
    Poll {
        /// Seconds between cycles
        #[arg(long, default_value = "60")]
        interval: u64,

        /// Stop after this many cycles
        #[arg(long)]
        count: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("mbdata_client=info,mbdata_cli=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    let mut settings = config.merge_with_args(
        cli.account.as_deref(),
        cli.vin.as_deref(),
        cli.refresh_token.as_deref(),
    )?;

    let ctx = OutputContext::new(cli.output, cli.no_color);

    let mut vehicle = MercedesVehicle::new(
        &settings.account,
        &settings.refresh_token,
        &settings.vin,
        settings.client.clone(),
    )
    .context("Failed to create vehicle session")?;

    let login = vehicle.login().await;
    commands::persist_token(&vehicle, &mut settings.token_file)?;
    login.context("Login failed")?;

    let result = match cli.command {
        Commands::Login => commands::login(&vehicle, &ctx),
        Commands::Resources => commands::resources(&mut vehicle, &ctx).await,
        Commands::Read => commands::read(&mut vehicle, &ctx).await,
        Commands::Poll { interval, count } => {
            commands::poll(
                &mut vehicle,
                &mut settings.token_file,
                Duration::from_secs(interval),
                count,
                &ctx,
            )
            .await
        }
    };

    commands::persist_token(&vehicle, &mut settings.token_file)?;
    result
}
