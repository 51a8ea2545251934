// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Argument parsing and command execution.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mapmerge_app_core::config::ConfigService;
use mapmerge_config_fs::FsConfigStore;
use mapmerge_core::{finish_merge, start_merge, GraphComparer, MergeSettings};
use mapmerge_scene::SceneRoot;
use tracing::{debug, info, warn};

/// Compare and merge level scene snapshots.
#[derive(Parser, Debug)]
#[command(name = "mapmerge", version)]
#[command(about = "Compare and merge level scene snapshots")]
pub struct Cli {
    /// Directory holding config sections (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Significant digits kept when fingerprinting floats (1-15)
    #[arg(long, global = true)]
    pub digits: Option<u32>,
    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print what differs between two scenes
    Diff {
        /// Scene whose changes are merged in
        source: PathBuf,
        /// Scene being changed
        base: PathBuf,
        /// Emit JSON instead of a text report
        #[arg(long)]
        json: bool,
    },
    /// Merge source into base and write the result
    Merge {
        /// Scene whose changes are merged in
        source: PathBuf,
        /// Scene being changed
        base: PathBuf,
        /// Where to write the merged scene
        #[arg(long, required_unless_present = "dry_run")]
        out: Option<PathBuf>,
        /// List and check the actions without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Print identity and fingerprints of every entity
    Fingerprint {
        /// Scene to fingerprint
        scene: PathBuf,
    },
}

/// Execute `cli`, writing human output to `out`.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let settings = resolve_settings(cli)?;
    match &cli.command {
        Command::Diff { source, base, json } => {
            let source = load_scene(source)?;
            let base = load_scene(base)?;
            let result = GraphComparer::new(settings)
                .compare(&source, &base)
                .context("comparison failed")?;
            if *json {
                serde_json::to_writer_pretty(&mut *out, &result)?;
                writeln!(out)?;
            } else {
                write!(out, "{result}")?;
            }
        }
        Command::Merge {
            source,
            base,
            out: target,
            dry_run,
        } => {
            let source = load_scene(source)?;
            let mut merged = load_scene(base)?;
            let (result, operation) =
                start_merge(&source, &merged, &settings).context("comparison failed")?;
            writeln!(
                out,
                "{} differences, {} actions",
                result.len(),
                operation.len()
            )?;
            for (id, action) in operation.actions() {
                writeln!(out, "  {id} {}", action.describe())?;
            }
            let report = finish_merge(operation, &mut merged).context("merge failed")?;
            match target {
                Some(path) if !*dry_run => {
                    write_scene(path, &merged)?;
                    info!(path = %path.display(), "merged scene written");
                    writeln!(
                        out,
                        "applied {} actions, wrote {}",
                        report.applied,
                        path.display()
                    )?;
                }
                _ => writeln!(out, "dry run: {} actions apply cleanly", report.applied)?,
            }
        }
        Command::Fingerprint { scene } => {
            let scene = load_scene(scene)?;
            print_fingerprints(&scene, &settings, out)?;
        }
    }
    Ok(())
}

fn resolve_settings(cli: &Cli) -> Result<MergeSettings> {
    let store = match &cli.config {
        Some(dir) => Some(
            FsConfigStore::at(dir)
                .with_context(|| format!("failed to open config dir {}", dir.display()))?,
        ),
        None => match FsConfigStore::new() {
            Ok(store) => Some(store),
            Err(err) => {
                warn!(error = %err, "no config dir, using default merge settings");
                None
            }
        },
    };
    let mut settings = match store {
        Some(store) => MergeSettings::load(&ConfigService::new(store))
            .context("failed to load merge settings")?,
        None => MergeSettings::default(),
    };
    if let Some(digits) = cli.digits {
        settings.significant_digits = digits;
    }
    settings.validate()?;
    debug!(?settings, "merge settings");
    Ok(settings)
}

fn load_scene(path: &Path) -> Result<SceneRoot> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read scene {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse scene {}", path.display()))
}

fn write_scene(path: &Path, scene: &SceneRoot) -> Result<()> {
    let json = serde_json::to_string_pretty(scene)?;
    fs::write(path, json + "\n").with_context(|| format!("failed to write {}", path.display()))
}

fn print_fingerprints<W: Write>(scene: &SceneRoot, settings: &MergeSettings, out: &mut W) -> Result<()> {
    let fingerprinter = settings.fingerprinter();
    for (index, entity) in scene.entities().iter().enumerate() {
        let label = entity
            .key_value(&settings.identity_key)
            .or_else(|| entity.classname())
            .unwrap_or("<unnamed>");
        writeln!(
            out,
            "#{index} {label} entity={} primitives={}",
            fingerprinter.entity(entity).as_str(),
            fingerprinter.primitives(entity.primitives()).as_str()
        )?;
        for (at, primitive) in entity.primitives().iter().enumerate() {
            writeln!(
                out,
                "  {} #{at} {}",
                primitive.kind(),
                fingerprinter.primitive(primitive).as_str()
            )?;
        }
    }
    Ok(())
}
