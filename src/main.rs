// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Rally tagger
//!
//! Headless driver for the tagging workflow: replays recorded operator
//! sessions and audits stored match records.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rally_tagger::app::TaggerApp;
use rally_tagger::config::TaggerConfig;
use rally_tagger::io::persistence::MemoryStore;
use rally_tagger::io::player::ScriptedPlayer;
use rally_tagger::io::serialization::{export_record, import_record, load_script};
use rally_tagger::rules::audit::audit_record;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "rally-tagger", version)]
#[command(about = "Replay table tennis tagging sessions and audit match records")]
struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recorded script of playhead moves and intents
    Replay {
        script: PathBuf,
        /// Where to write the resulting match record
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Check a stored match record for rule inconsistencies
    Audit { record: PathBuf },
}

fn load_config(path: Option<&Path>) -> Result<TaggerConfig> {
    let config = match path {
        Some(path) => TaggerConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TaggerConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn replay(config: TaggerConfig, script: &Path, output: Option<&Path>) -> Result<()> {
    let script = load_script(script)?;
    let player = ScriptedPlayer::new(config.frame_rate, script.media_duration);
    let mut app = TaggerApp::new(config, player, MemoryStore::new());

    let summary = app.replay(&script);
    for (step, reason) in &summary.rejected {
        log::warn!("Step {} rejected: {}", step, reason);
    }
    for finding in app.audit() {
        log::warn!("Audit: {:?}", finding);
    }
    if app.failed_write_count() > 0 {
        log::error!("{} writes were never stored", app.failed_write_count());
    }

    match (output, app.record()) {
        (Some(path), Some(record)) => export_record(record, path)?,
        (Some(_), None) => log::warn!("No match was initialized; nothing to export"),
        (None, _) => {}
    }
    println!(
        "{} intents applied, {} rejected, ended in {}",
        summary.applied,
        summary.rejected.len(),
        app.phase()
    );
    Ok(())
}

fn audit(config: TaggerConfig, path: &Path) -> Result<()> {
    let record = import_record(path)?;
    let findings = audit_record(&record, &config.service, &config.scoring);
    if findings.is_empty() {
        println!("No findings");
    }
    for finding in &findings {
        println!("{}", serde_json::to_string(finding)?);
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Replay { script, output } => replay(config, &script, output.as_deref()),
        Command::Audit { record } => audit(config, &record),
    }
}
