// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Beacon - SMS notification dispatcher.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod serve;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

/// Beacon - SMS notification dispatcher.
#[derive(Parser, Debug)]
#[command(name = "beacon", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the default locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway and retry scheduler.
    Serve,
    /// List carrier compliance policies.
    Policies,
    /// Check a message against compliance rules without sending it.
    Check {
        /// Destination in international format.
        phone: String,
        /// Message body.
        message: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => beacon_config::load_and_validate_path(path),
        None => beacon_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            beacon_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await.map(|()| true),
        Some(Commands::Policies) => commands::run_policies(&config).await.map(|()| true),
        Some(Commands::Check { phone, message }) => {
            commands::run_check(&config, &phone, &message).await
        }
        None => {
            println!("beacon: use --help for available commands");
            Ok(true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
