// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types for the tagging engine.
//!
//! Rules components, corrections and the workflow each report named
//! conditions so the operator-facing layer can say exactly which action
//! could not be completed. None of these errors leave partial state behind.

use crate::models::ids::EntityId;
use crate::models::outcome::PointEndType;
use crate::models::score::ScorePair;
use crate::util::timecode::Timecode;
use thiserror::Error;

/// Contract violations raised by the pure rules components.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RulesError {
    #[error("rally has no shots")]
    EmptyRally,

    #[error("no shot in the rally has been judged yet")]
    Unjudged,

    #[error("shot {index} is marked as a let, but only the serve can be a let")]
    LetOutsideServe { index: u32 },

    #[error("point end is already resolved as {0:?}")]
    AlreadyResolved(PointEndType),

    #[error("a let has no point end to resolve")]
    NothingToResolve,

    #[error("set reached completion tied at {0}")]
    TiedAtCompletion(ScorePair),
}

/// Failures of shot-level corrections.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorrectionError {
    #[error("rally {0} not found")]
    RallyNotFound(EntityId),

    #[error("shot {shot} not found in rally {rally}")]
    ShotNotFound { rally: EntityId, shot: EntityId },

    #[error("shot {shot} would move to {time}, outside its neighbours")]
    OutOfBounds { shot: EntityId, time: Timecode },

    #[error("shot {shot} cannot move before the start of the media")]
    BeforeMediaStart { shot: EntityId },

    #[error("deleting the only shot would leave rally {0} empty")]
    WouldEmptyRally(EntityId),

    #[error("rally {0} is confirmed and can no longer be corrected")]
    RallyLocked(EntityId),

    #[error("shot {shot} is not judged as ending the rally")]
    NotRallyEnding { shot: EntityId },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("rally {0} changed since the correction was made; undo refused")]
    UndoConflict(EntityId),
}

/// Rejections from the tagging workflow state machine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("{intent} is not permitted in current state {state}")]
    NotPermitted { state: String, intent: String },

    #[error("invalid match framework: {0}")]
    InvalidFramework(String),

    #[error("media time is stale: waiting for seek to {requested}, player reports {reported}")]
    StaleMediaTime {
        requested: Timecode,
        reported: Timecode,
    },

    #[error("time {time} is past the end of the media ({duration})")]
    BeyondMedia { time: Timecode, duration: Timecode },

    #[error("a write for {0} is still in flight")]
    WriteInFlight(EntityId),

    #[error("rally {0} has an unresolved forced/unforced choice")]
    ChoicePending(EntityId),

    #[error("set {0} has no rallies")]
    EmptySet(u32),

    #[error("invalid answer: {0}")]
    InvalidAnswer(String),

    #[error("session cursor points outside the match record")]
    CursorInvalid,

    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error(transparent)]
    Correction(#[from] CorrectionError),
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
