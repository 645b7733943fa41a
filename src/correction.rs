// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Shot-level corrections with undo.
//!
//! Nudge, delete and prune-after-error each either apply completely or
//! leave the rally untouched. Every applied correction is recorded so the
//! most recent one can be reverted verbatim.

use crate::error::CorrectionError;
use crate::models::ids::EntityId;
use crate::models::rally::Rally;
use crate::models::shot::{renumber, Shot};
use crate::util::timecode::{FrameDirection, Timecode};
use serde::{Deserialize, Serialize};

/// Shots removed because they followed an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruneRecord {
    pub rally_id: EntityId,
    pub error_shot: EntityId,
    /// Index of the error shot; the removed shots followed it.
    pub error_index: u32,
    pub removed: Vec<Shot>,
}

impl PruneRecord {
    pub fn count(&self) -> usize {
        self.removed.len()
    }
}

/// A reversible change to a rally's shots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Correction {
    Nudge {
        rally_id: EntityId,
        shot_id: EntityId,
        previous: Timecode,
        applied: Timecode,
    },
    Delete {
        rally_id: EntityId,
        position: usize,
        removed: Shot,
    },
    Prune(PruneRecord),
}

impl Correction {
    pub fn rally_id(&self) -> &EntityId {
        match self {
            Correction::Nudge { rally_id, .. } | Correction::Delete { rally_id, .. } => rally_id,
            Correction::Prune(record) => &record.rally_id,
        }
    }
}

/// Applies corrections and keeps a bounded undo history.
#[derive(Debug, Clone)]
pub struct CorrectionEngine {
    history: Vec<Correction>,
    max_depth: usize,
}

impl Default for CorrectionEngine {
    fn default() -> Self {
        Self::new(50)
    }
}

impl CorrectionEngine {
    pub fn new(max_depth: usize) -> Self {
        Self {
            history: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    fn record(&mut self, correction: Correction) {
        self.history.push(correction);
        if self.history.len() > self.max_depth {
            self.history.remove(0);
        }
    }

    /// Shift a shot's time by one frame.
    ///
    /// With `bounded`, the shot may not move past its neighbours; otherwise
    /// it may, so that deliberate reorders are possible.
    pub fn nudge(
        &mut self,
        rally: &mut Rally,
        shot_id: &EntityId,
        direction: FrameDirection,
        frame_rate: f64,
        bounded: bool,
    ) -> Result<Timecode, CorrectionError> {
        ensure_unlocked(rally)?;
        let position = find_shot(rally, shot_id)?;

        let previous = rally.shots[position].time;
        let applied = previous.offset_frames(direction.sign(), frame_rate);

        if applied.seconds() < 0.0 {
            return Err(CorrectionError::BeforeMediaStart {
                shot: shot_id.clone(),
            });
        }
        if bounded {
            let lower = position
                .checked_sub(1)
                .and_then(|p| rally.shots.get(p))
                .map(|s| s.time);
            let upper = rally.shots.get(position + 1).map(|s| s.time);
            let below = lower.is_some_and(|lower| applied < lower);
            let above = upper.is_some_and(|upper| applied > upper);
            if below || above {
                return Err(CorrectionError::OutOfBounds {
                    shot: shot_id.clone(),
                    time: applied,
                });
            }
        }

        rally.shots[position].time = applied;
        log::debug!("Nudged {} from {} to {}", shot_id, previous, applied);
        self.record(Correction::Nudge {
            rally_id: rally.id.clone(),
            shot_id: shot_id.clone(),
            previous,
            applied,
        });
        Ok(applied)
    }

    /// Remove one shot and renumber the rest.
    pub fn delete(&mut self, rally: &mut Rally, shot_id: &EntityId) -> Result<Shot, CorrectionError> {
        ensure_unlocked(rally)?;
        let position = find_shot(rally, shot_id)?;
        if rally.shots.len() == 1 {
            return Err(CorrectionError::WouldEmptyRally(rally.id.clone()));
        }

        let removed = rally.shots.remove(position);
        renumber(&mut rally.shots);
        log::info!(
            "Deleted shot {} from rally {}, {} shots remain",
            shot_id,
            rally.id,
            rally.shots.len()
        );
        self.record(Correction::Delete {
            rally_id: rally.id.clone(),
            position,
            removed: removed.clone(),
        });
        Ok(removed)
    }

    /// Remove every shot after a rally-ending shot (an error, or a let serve).
    ///
    /// Returns `None` when that shot is already the last one.
    pub fn prune_after_error(
        &mut self,
        rally: &mut Rally,
        shot_id: &EntityId,
    ) -> Result<Option<PruneRecord>, CorrectionError> {
        ensure_unlocked(rally)?;
        let position = find_shot(rally, shot_id)?;
        let error_shot = &rally.shots[position];
        if !error_shot.quality.is_some_and(|q| q.ends_rally()) {
            return Err(CorrectionError::NotRallyEnding {
                shot: shot_id.clone(),
            });
        }
        if position + 1 == rally.shots.len() {
            return Ok(None);
        }

        let error_index = error_shot.index;
        let removed = rally.shots.split_off(position + 1);
        log::info!(
            "Pruned {} shots after error at shot {} of rally {}",
            removed.len(),
            error_index,
            rally.id
        );

        let record = PruneRecord {
            rally_id: rally.id.clone(),
            error_shot: shot_id.clone(),
            error_index,
            removed,
        };
        self.record(Correction::Prune(record.clone()));
        Ok(Some(record))
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Rally touched by the most recent correction.
    pub fn last_target(&self) -> Option<&EntityId> {
        self.history.last().map(Correction::rally_id)
    }

    pub fn last(&self) -> Option<&Correction> {
        self.history.last()
    }

    /// Revert the most recent correction on `rally`.
    ///
    /// The rally must be in the state the correction left it in; otherwise
    /// the undo is refused and nothing changes.
    pub fn undo(&mut self, rally: &mut Rally) -> Result<Correction, CorrectionError> {
        let correction = self.history.last().ok_or(CorrectionError::NothingToUndo)?;
        if correction.rally_id() != &rally.id {
            return Err(CorrectionError::UndoConflict(rally.id.clone()));
        }
        ensure_unlocked(rally)?;

        match correction {
            Correction::Nudge {
                shot_id,
                previous,
                applied,
                ..
            } => {
                let position = find_shot(rally, shot_id)?;
                if rally.shots[position].time != *applied {
                    return Err(CorrectionError::UndoConflict(rally.id.clone()));
                }
                rally.shots[position].time = *previous;
            }
            Correction::Delete {
                position, removed, ..
            } => {
                if *position > rally.shots.len() {
                    return Err(CorrectionError::UndoConflict(rally.id.clone()));
                }
                rally.shots.insert(*position, removed.clone());
                renumber(&mut rally.shots);
            }
            Correction::Prune(record) => {
                let intact = rally.shots.len() == record.error_index as usize
                    && rally.shots.last().map(|s| &s.id) == Some(&record.error_shot);
                if !intact {
                    return Err(CorrectionError::UndoConflict(rally.id.clone()));
                }
                rally.shots.extend(record.removed.iter().cloned());
            }
        }

        let reverted = self.history.pop().ok_or(CorrectionError::NothingToUndo)?;
        log::info!("Undid {:?} correction on rally {}", kind_name(&reverted), rally.id);
        Ok(reverted)
    }

    /// Put back the shots pruned from `rally` and drop the prune from history.
    ///
    /// Corrections made after the prune stay in effect and stay undoable.
    pub fn restore_pruned(&mut self, rally: &mut Rally) -> Result<Option<PruneRecord>, CorrectionError> {
        let found = self.history.iter().rposition(|c| {
            matches!(c, Correction::Prune(record) if record.rally_id == rally.id)
        });
        let Some(position) = found else {
            return Ok(None);
        };
        ensure_unlocked(rally)?;

        let Correction::Prune(record) = &self.history[position] else {
            return Ok(None);
        };
        let intact = rally.shots.len() == record.error_index as usize
            && rally.shots.last().map(|s| &s.id) == Some(&record.error_shot);
        if !intact {
            return Err(CorrectionError::UndoConflict(rally.id.clone()));
        }
        rally.shots.extend(record.removed.iter().cloned());
        log::info!("Restored {} pruned shots to rally {}", record.count(), rally.id);

        match self.history.remove(position) {
            Correction::Prune(record) => Ok(Some(record)),
            _ => Ok(None),
        }
    }

    /// Drop undo records for a rally that is confirmed or discarded.
    pub fn forget_rally(&mut self, rally_id: &EntityId) {
        self.history.retain(|c| c.rally_id() != rally_id);
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

fn kind_name(correction: &Correction) -> &'static str {
    match correction {
        Correction::Nudge { .. } => "nudge",
        Correction::Delete { .. } => "delete",
        Correction::Prune(_) => "prune",
    }
}

fn ensure_unlocked(rally: &Rally) -> Result<(), CorrectionError> {
    if rally.is_locked() {
        Err(CorrectionError::RallyLocked(rally.id.clone()))
    } else {
        Ok(())
    }
}

fn find_shot(rally: &Rally, shot_id: &EntityId) -> Result<usize, CorrectionError> {
    rally
        .position_of(shot_id)
        .ok_or_else(|| CorrectionError::ShotNotFound {
            rally: rally.id.clone(),
            shot: shot_id.clone(),
        })
}
