// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Operator intents.
//!
//! Discrete commands issued by the surrounding interface, plus the inbound
//! notifications from the media player and persistence collaborators.
//! Key bindings are mapped to these outside the engine.

use crate::models::ids::EntityId;
use crate::models::match_record::MatchResult;
use crate::models::outcome::ErrorJudgment;
use crate::models::player::Side;
use crate::models::shot::ShotQuality;
use crate::util::timecode::{FrameDirection, Timecode};
use serde::{Deserialize, Serialize};

/// Everything needed to initialize a match framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkInput {
    pub player1: String,
    pub player2: String,
    pub first_server: Side,
    pub best_of: u32,
    pub first_serve_time: Timecode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    // Setup
    InitializeFramework(FrameworkInput),

    // Boundary capture
    MarkContact,
    EndRally,
    Confirm,
    Redo,
    MarkNextServe,
    EndSet,
    EndMatch,
    SubmitResult(MatchResult),

    // Detail capture
    AnswerStroke(String),
    AnswerQuality(ShotQuality),
    AnswerLanding(String),
    ResolveError(ErrorJudgment),
    StepEndTime(FrameDirection),
    ReplayRally,

    // Corrections
    NudgeShot {
        rally_id: EntityId,
        shot_id: EntityId,
        direction: FrameDirection,
        #[serde(default)]
        bounded: bool,
    },
    DeleteShot {
        rally_id: EntityId,
        shot_id: EntityId,
    },
    UndoCorrection,

    // Collaborator notifications
    TimeChanged(Timecode),
    DurationKnown(Timecode),
    WriteCompleted(EntityId),

    Abandon,
}

impl Intent {
    /// Stable name used in rejection messages and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Intent::InitializeFramework(_) => "initialize-framework",
            Intent::MarkContact => "mark-contact",
            Intent::EndRally => "end-rally",
            Intent::Confirm => "confirm",
            Intent::Redo => "redo",
            Intent::MarkNextServe => "mark-next-serve",
            Intent::EndSet => "end-set",
            Intent::EndMatch => "end-match",
            Intent::SubmitResult(_) => "submit-result",
            Intent::AnswerStroke(_) => "answer-stroke",
            Intent::AnswerQuality(_) => "answer-quality",
            Intent::AnswerLanding(_) => "answer-landing",
            Intent::ResolveError(_) => "resolve-error",
            Intent::StepEndTime(_) => "step-end-time",
            Intent::ReplayRally => "replay-rally",
            Intent::NudgeShot { .. } => "nudge-shot",
            Intent::DeleteShot { .. } => "delete-shot",
            Intent::UndoCorrection => "undo-correction",
            Intent::TimeChanged(_) => "time-changed",
            Intent::DurationKnown(_) => "duration-known",
            Intent::WriteCompleted(_) => "write-completed",
            Intent::Abandon => "abandon",
        }
    }

    /// Intents whose meaning depends on the player's current time.
    pub fn reads_media_time(&self) -> bool {
        matches!(
            self,
            Intent::MarkContact | Intent::EndRally | Intent::MarkNextServe
        )
    }

    /// Notifications that are accepted in every state.
    pub fn is_notification(&self) -> bool {
        matches!(
            self,
            Intent::TimeChanged(_) | Intent::DurationKnown(_) | Intent::WriteCompleted(_)
        )
    }
}
