// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "adept",
    about = "Talk to the municipal issue-reporting assistant from a terminal",
    version,
    long_about = None,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Municipality to open a session for right away
    #[arg(value_name = "MUNICIPALITY")]
    pub municipality: Option<String>,

    /// Path to config file (overrides auto-discovery)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Base URL of the dialogue engine, e.g. "http://localhost:5000"
    #[arg(long, env = "ADEPT_BASE_URL")]
    pub base_url: Option<String>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Print the effective configuration and exit
    ShowConfig,
    /// Probe the dialogue engine and print what it advertises
    Health {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List known municipalities, optionally filtered by a name fragment
    Municipalities {
        #[arg(value_name = "PREFIX")]
        prefix: Option<String>,
    },
}

pub fn print_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "adept", &mut std::io::stdout());
}
