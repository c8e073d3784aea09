// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hearth Daemon (hearthd)
//!
//! Background process that owns the event fabric and the scheduled jobs:
//! platform sync, leaderboard rebuilds, presence cleanup, and the daily
//! digest. The chat frontend and HTTP surface talk to the same store and
//! bus from their own processes.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use hearth_daemon::{lifecycle, Config};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.level.clone()));
    if config.log.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("hearthd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("hearthd {}", env!("CARGO_PKG_VERSION"));
                println!("Hearth daemon - community engagement backend worker");
                println!();
                println!("USAGE:");
                println!("    hearthd");
                println!();
                println!("Configuration comes from HEARTH_* environment variables;");
                println!("HEARTH_CHAT_TOKEN and HEARTH_DATABASE_URL are required.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }

    let config = Config::from_env();
    init_tracing(&config);

    let services = match lifecycle::start(config).await {
        Ok(services) => services,
        Err(err) => {
            error!(error = %err, "startup failed");
            std::process::exit(1);
        }
    };
    info!(
        environment = %services.config.environment,
        "hearthd running"
    );

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("SIGTERM received"),
        _ = sigint.recv() => info!("SIGINT received"),
    }

    lifecycle::shutdown(services).await;
    Ok(())
}
