// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Match record serialization and deserialization.
//!
//! This module handles exporting and importing match records, and loading
//! replay scripts, in YAML and JSON formats.

use crate::models::match_record::MatchRecord;
use crate::util::timecode::Timecode;
use crate::workflow::intent::Intent;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File format, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Format> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            other => bail!("Unsupported file extension: {:?}", other),
        }
    }
}

/// Export a match record to YAML format.
pub fn export_yaml(record: &MatchRecord, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(record)?;
    std::fs::write(path, yaml)?;
    Ok(())
}

/// Export a match record to JSON format.
pub fn export_json(record: &MatchRecord, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(record)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Export in the format implied by the file extension.
pub fn export_record(record: &MatchRecord, path: &Path) -> Result<()> {
    let written = match Format::from_path(path)? {
        Format::Yaml => export_yaml(record, path),
        Format::Json => export_json(record, path),
    };
    written.with_context(|| format!("Failed to export match record to {}", path.display()))?;
    log::info!(
        "Exported {} rallies and {} shots to {}",
        record.rally_count(),
        record.shot_count(),
        path.display()
    );
    Ok(())
}

/// Import in the format implied by the file extension.
pub fn import_record(path: &Path) -> Result<MatchRecord> {
    let record: MatchRecord = read_as(path, Format::from_path(path)?)?;
    log::info!(
        "Imported {} sets and {} rallies from {}",
        record.sets.len(),
        record.rally_count(),
        path.display()
    );
    Ok(record)
}

fn read_as<T: DeserializeOwned>(path: &Path, format: Format) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = match format {
        Format::Yaml => serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse YAML in {}", path.display()))?,
        Format::Json => serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON in {}", path.display()))?,
    };
    Ok(value)
}

/// One step of a headless replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptStep {
    /// Move the playhead, as an operator scrubbing the video would.
    At(Timecode),
    /// Issue an operator intent.
    Do(Intent),
}

/// A recorded sequence of playhead moves and intents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayScript {
    /// Length of the media being tagged, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_duration: Option<Timecode>,
    pub steps: Vec<ScriptStep>,
}

pub fn load_script(path: &Path) -> Result<ReplayScript> {
    let script: ReplayScript = read_as(path, Format::from_path(path)?)?;
    log::info!("Loaded {} replay steps from {}", script.steps.len(), path.display());
    Ok(script)
}
