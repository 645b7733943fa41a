// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Persistence collaborator.
//!
//! The workflow emits one [`PersistRequest`] per entity write. A store
//! applies it and the caller acknowledges success back to the workflow.

use crate::models::framework::MatchFramework;
use crate::models::ids::EntityId;
use crate::models::match_record::{MatchRecord, MatchResult};
use crate::models::rally::Rally;
use crate::models::set::SetRecord;
use crate::models::shot::renumber;
use crate::workflow::effect::PersistRequest;
use anyhow::{bail, Context, Result};
use std::collections::BTreeMap;

pub trait MatchStore {
    fn write(&mut self, request: &PersistRequest) -> Result<()>;
}

/// Keeps every written entity in memory, keyed by identifier.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    framework: Option<MatchFramework>,
    result: Option<MatchResult>,
    sets: BTreeMap<EntityId, SetRecord>,
    /// Rally id to (owning set id, rally).
    rallies: BTreeMap<EntityId, (EntityId, Rally)>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of writes applied so far.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    pub fn rally(&self, rally_id: &EntityId) -> Option<&Rally> {
        self.rallies.get(rally_id).map(|(_, rally)| rally)
    }

    /// Rebuild a match record from the stored entities.
    ///
    /// Rallies whose set has not been written yet are left out.
    pub fn assemble(&self) -> Option<MatchRecord> {
        let framework = self.framework.clone()?;
        let mut record = MatchRecord::new(framework);

        let mut sets: Vec<SetRecord> = self.sets.values().cloned().collect();
        sets.sort_by_key(|set| set.number);
        for set in &mut sets {
            let mut rallies: Vec<Rally> = self
                .rallies
                .values()
                .filter(|(set_id, _)| *set_id == set.id)
                .map(|(_, rally)| rally.clone())
                .collect();
            // Keep rallies only known through the set write.
            for rally in &set.rallies {
                if !rallies.iter().any(|r| r.id == rally.id) {
                    rallies.push(rally.clone());
                }
            }
            rallies.sort_by_key(|rally| rally.index);
            set.rallies = rallies;
            set.recompute_final_score();
        }

        record.sets = sets;
        record.result = self.result.clone();
        Some(record)
    }
}

impl MatchStore for MemoryStore {
    fn write(&mut self, request: &PersistRequest) -> Result<()> {
        match request {
            PersistRequest::Framework(framework) => {
                self.framework = Some(framework.clone());
            }
            PersistRequest::Set { match_id, set } => {
                let known = self.framework.as_ref().map(|f| &f.id);
                if known != Some(match_id) {
                    bail!("set {} belongs to unknown match {}", set.id, match_id);
                }
                self.sets.insert(set.id.clone(), set.clone());
            }
            PersistRequest::Rally { set_id, rally } => {
                self.rallies
                    .insert(rally.id.clone(), (set_id.clone(), rally.clone()));
            }
            PersistRequest::DeleteShot { rally_id, shot_id } => {
                let (_, rally) = self
                    .rallies
                    .get_mut(rally_id)
                    .with_context(|| format!("no stored rally {}", rally_id))?;
                let before = rally.shots.len();
                rally.shots.retain(|shot| shot.id != *shot_id);
                if rally.shots.len() == before {
                    bail!("rally {} has no shot {}", rally_id, shot_id);
                }
                renumber(&mut rally.shots);
            }
            PersistRequest::FinalResult { match_id, result } => {
                let known = self.framework.as_ref().map(|f| &f.id);
                if known != Some(match_id) {
                    bail!("result for unknown match {}", match_id);
                }
                self.result = Some(result.clone());
            }
        }
        self.writes += 1;
        log::debug!("Stored {}", request.key());
        Ok(())
    }
}
