// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod cli;
mod console;

use std::sync::{Arc, Mutex};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use adept_config::Config;
use adept_core::{InputMode, MunicipalityDirectory, SessionController, StaticDirectory};
use clap::Parser;
use cli::{Cli, Commands};
use console::{ConsoleSink, LineAction};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Some(Commands::Completions { shell }) = &cli.command {
        cli::print_completions(*shell);
        return Ok(());
    }

    let mut config = adept_config::load(cli.config.as_deref())?;
    if let Some(url) = &cli.base_url {
        config.backend.base_url = url.clone();
    }

    match &cli.command {
        Some(Commands::ShowConfig) => {
            let text = toml::to_string_pretty(&config).context("serialising configuration")?;
            println!("{text}");
            Ok(())
        }
        Some(Commands::Health { json }) => health_cmd(&config, *json).await,
        Some(Commands::Municipalities { prefix }) => {
            municipalities_cmd(&config, prefix.as_deref());
            Ok(())
        }
        Some(Commands::Completions { .. }) => Ok(()),
        None => run_console(cli.municipality, config).await,
    }
}

async fn health_cmd(config: &Config, json: bool) -> anyhow::Result<()> {
    let gateway = adept_gateway::from_config(&config.backend)?;
    let report = gateway
        .health()
        .await
        .with_context(|| format!("probing {}", config.backend.base_url))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{} {} ({})", report.service, report.version, report.status);
        for feature in &report.features {
            println!("  {feature}");
        }
    }
    Ok(())
}

fn municipalities_cmd(config: &Config, prefix: Option<&str>) {
    let directory = StaticDirectory::new(config.session.municipalities.clone());
    let names = match prefix {
        Some(p) => directory.lookup(p),
        None => directory.names().to_vec(),
    };
    for name in names {
        println!("{name}");
    }
}

async fn run_console(municipality: Option<String>, config: Config) -> anyhow::Result<()> {
    let gateway = adept_gateway::from_config(&config.backend)?;
    let backend = gateway.name().to_string();
    let mode = Arc::new(Mutex::new(InputMode::Idle));
    let sink = ConsoleSink::new(Arc::clone(&mode));
    let controller = SessionController::new(gateway, Box::new(sink), &config);

    match controller.probe_health().await {
        Ok(report) => info!(
            %backend,
            service = %report.service,
            version = %report.version,
            features = ?report.features,
            "dialogue engine reachable"
        ),
        Err(e) => warn!(%backend, error = %e, "dialogue engine health probe failed"),
    }

    let (tx, rx) = mpsc::channel(32);
    let controller_task = tokio::spawn(controller.run(rx));

    let directory = StaticDirectory::new(config.session.municipalities.clone());
    println!("Connected to {}. Type /help for commands.", config.backend.base_url);
    match municipality {
        Some(name) => tx.send(adept_core::Command::Start(name)).await?,
        None => println!("Municipalities: {}", directory.names().join(", ")),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        let current = mode.lock().map(|m| m.clone()).unwrap_or_default();
        match console::parse_line(&line, &current) {
            LineAction::Send(cmd) => {
                if tx.send(cmd).await.is_err() {
                    break;
                }
            }
            LineAction::Lookup(query) => {
                let hits = directory.lookup(&query);
                if hits.is_empty() {
                    println!("  no municipality matches \"{query}\"");
                }
                for name in hits {
                    println!("  {name}");
                }
            }
            LineAction::Help => println!("{}", console::HELP),
            LineAction::Quit => break,
            LineAction::Nothing => {}
        }
    }

    drop(tx);
    controller_task.await.context("controller task failed")?;
    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
