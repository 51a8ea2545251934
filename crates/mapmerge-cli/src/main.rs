// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CLI entry point for mapmerge.

use anyhow::Result;
use clap::Parser;
use mapmerge_cli::{run, Cli};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(&cli, &mut out)
}
