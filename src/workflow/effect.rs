// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Effect requests emitted by the state machine.
//!
//! The machine never calls a collaborator directly; it returns these and
//! the caller carries them out.

use super::session::Phase;
use crate::models::framework::MatchFramework;
use crate::models::ids::EntityId;
use crate::models::match_record::MatchResult;
use crate::models::player::Side;
use crate::models::rally::Rally;
use crate::models::set::SetRecord;
use crate::util::timecode::{FrameDirection, Timecode};
use serde::{Deserialize, Serialize};

/// A write for the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistRequest {
    Framework(MatchFramework),
    Set {
        match_id: EntityId,
        set: SetRecord,
    },
    /// Upsert a rally together with its current shots.
    Rally {
        set_id: EntityId,
        rally: Rally,
    },
    DeleteShot {
        rally_id: EntityId,
        shot_id: EntityId,
    },
    /// Final-result metadata for the match.
    FinalResult {
        match_id: EntityId,
        result: MatchResult,
    },
}

impl PersistRequest {
    /// Identifier of the entity being written; used to acknowledge the write.
    pub fn key(&self) -> &EntityId {
        match self {
            PersistRequest::Framework(framework) => &framework.id,
            PersistRequest::Set { set, .. } => &set.id,
            PersistRequest::Rally { rally, .. } => &rally.id,
            PersistRequest::DeleteShot { shot_id, .. } => shot_id,
            PersistRequest::FinalResult { match_id, .. } => match_id,
        }
    }

    /// Whether storing `self` makes an earlier, unapplied `earlier` obsolete.
    ///
    /// Snapshots replace older snapshots of the same entity; a rally snapshot
    /// also covers shot deletes in that rally. Deletes replace nothing.
    pub fn supersedes(&self, earlier: &PersistRequest) -> bool {
        match (self, earlier) {
            (PersistRequest::Framework(new), PersistRequest::Framework(old)) => new.id == old.id,
            (PersistRequest::Set { set: new, .. }, PersistRequest::Set { set: old, .. }) => {
                new.id == old.id
            }
            (PersistRequest::Rally { rally: new, .. }, PersistRequest::Rally { rally: old, .. }) => {
                new.id == old.id
            }
            (PersistRequest::Rally { rally, .. }, PersistRequest::DeleteShot { rally_id, .. }) => {
                rally.id == *rally_id
            }
            (
                PersistRequest::FinalResult { match_id: new, .. },
                PersistRequest::FinalResult { match_id: old, .. },
            ) => new == old,
            _ => false,
        }
    }
}

/// Forced/unforced decision the operator must make before confirming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChoice {
    pub rally_id: EntityId,
    /// Already derived; only the error classification is open.
    pub winner: Side,
    pub ending_shot: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Seek(Timecode),
    Play { rate: f64 },
    Pause,
    StepFrame {
        direction: FrameDirection,
        ignore_bounds: bool,
    },
    Persist(PersistRequest),
    Prompt(PendingChoice),
    /// Shots were removed after an error; undo is available.
    ShotsPruned { rally_id: EntityId, count: usize },
    PhaseChanged(Phase),
    SessionComplete,
}
