// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Workflow session state.
//!
//! The session holds the current phase, the active sub-state and pointers
//! into the match graph. It owns no domain data itself.

use super::effect::PendingChoice;
use crate::error::WorkflowError;
use crate::models::ids::EntityId;
use crate::util::timecode::Timecode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sub-states of coarse boundary capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryStep {
    Tagging,
    Checkpoint,
    FastForward,
    /// All boundaries captured; waiting for final-result metadata.
    AwaitingResult,
}

/// The question currently asked about a shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Question {
    Stroke,
    Quality,
    Landing,
}

/// Sub-states of per-shot detail capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailStep {
    ShotQuestions(Question),
    EndOfRally,
    RallyReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    BoundaryCapture(BoundaryStep),
    DetailCapture(DetailStep),
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setup => f.write_str("setup"),
            Phase::BoundaryCapture(step) => {
                let name = match step {
                    BoundaryStep::Tagging => "tagging",
                    BoundaryStep::Checkpoint => "checkpoint",
                    BoundaryStep::FastForward => "ff_mode",
                    BoundaryStep::AwaitingResult => "complete",
                };
                write!(f, "boundary-capture.{}", name)
            }
            Phase::DetailCapture(step) => match step {
                DetailStep::ShotQuestions(question) => {
                    let name = match question {
                        Question::Stroke => "stroke",
                        Question::Quality => "quality",
                        Question::Landing => "landing",
                    };
                    write!(f, "detail-capture.shot-questions.{}", name)
                }
                DetailStep::EndOfRally => f.write_str("detail-capture.end-of-rally"),
                DetailStep::RallyReview => f.write_str("detail-capture.rally-review"),
            },
            Phase::Complete => f.write_str("complete"),
        }
    }
}

/// Position in the match graph: set and rally by position, shot by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub set: usize,
    pub rally: usize,
    pub shot: u32,
}

/// What the engine knows about the player's clock.
///
/// Seeks are fire-and-forget, so after one is requested the reported time
/// is stale until the player reports a position near the target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaClock {
    pub reported: Option<Timecode>,
    pub pending_seek: Option<Timecode>,
    pub duration: Option<Timecode>,
}

impl MediaClock {
    pub fn request_seek(&mut self, target: Timecode) {
        self.pending_seek = Some(target);
    }

    pub fn report(&mut self, time: Timecode, tolerance: f64) {
        self.reported = Some(time);
        if let Some(target) = self.pending_seek {
            if time.distance(target) <= tolerance {
                self.pending_seek = None;
            }
        }
    }

    /// Current time, provided it reflects the last requested seek.
    pub fn now(&self) -> Result<Timecode, WorkflowError> {
        let reported = self.reported.unwrap_or(Timecode::ZERO);
        if let Some(requested) = self.pending_seek {
            return Err(WorkflowError::StaleMediaTime {
                requested,
                reported,
            });
        }
        if let Some(duration) = self.duration {
            if reported > duration {
                return Err(WorkflowError::BeyondMedia {
                    time: reported,
                    duration,
                });
            }
        }
        Ok(reported)
    }
}

/// Process-scoped state of one annotation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSession {
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
    #[serde(default)]
    pub clock: MediaClock,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_choice: Option<PendingChoice>,
    /// Writes issued but not yet acknowledged, counted per entity.
    #[serde(default)]
    pub outstanding_writes: BTreeMap<EntityId, usize>,
}

impl Default for WorkflowSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Setup,
            cursor: None,
            clock: MediaClock::default(),
            pending_choice: None,
            outstanding_writes: BTreeMap::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    pub fn write_issued(&mut self, key: &EntityId) {
        *self.outstanding_writes.entry(key.clone()).or_insert(0) += 1;
    }

    /// Settle one write of `key`; false if none was outstanding.
    pub fn write_acknowledged(&mut self, key: &EntityId) -> bool {
        let Some(count) = self.outstanding_writes.get_mut(key) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.outstanding_writes.remove(key);
        }
        true
    }

    pub fn write_pending(&self, key: &EntityId) -> bool {
        self.outstanding_writes.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::Setup.to_string(), "setup");
        assert_eq!(
            Phase::BoundaryCapture(BoundaryStep::FastForward).to_string(),
            "boundary-capture.ff_mode"
        );
        assert_eq!(
            Phase::DetailCapture(DetailStep::ShotQuestions(Question::Quality)).to_string(),
            "detail-capture.shot-questions.quality"
        );
    }

    #[test]
    fn test_clock_stale_until_seek_lands() {
        let mut clock = MediaClock::default();
        clock.report(Timecode(40.0), 0.25);
        clock.request_seek(Timecode(12.0));

        // A report queued before the seek does not count.
        clock.report(Timecode(40.1), 0.25);
        assert!(matches!(clock.now(), Err(WorkflowError::StaleMediaTime { .. })));

        clock.report(Timecode(12.1), 0.25);
        assert_eq!(clock.now(), Ok(Timecode(12.1)));
    }

    #[test]
    fn test_each_write_needs_its_own_ack() {
        let mut session = WorkflowSession::new();
        let key = EntityId::from("rally-0001");
        session.write_issued(&key);
        session.write_issued(&key);

        assert!(session.write_acknowledged(&key));
        assert!(session.write_pending(&key));
        assert!(session.write_acknowledged(&key));
        assert!(!session.write_pending(&key));
        assert!(!session.write_acknowledged(&key));
        assert!(session.outstanding_writes.is_empty());
    }

    #[test]
    fn test_clock_beyond_duration() {
        let mut clock = MediaClock {
            duration: Some(Timecode(60.0)),
            ..MediaClock::default()
        };
        clock.report(Timecode(61.0), 0.25);
        assert!(matches!(clock.now(), Err(WorkflowError::BeyondMedia { .. })));
    }
}
