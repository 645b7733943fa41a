// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Match framework.
//!
//! The one-time configuration captured before annotation begins. A
//! framework is never edited; re-initializing starts a new session.

use super::ids::EntityId;
use super::player::{Players, Side};
use crate::error::WorkflowError;
use crate::util::timecode::Timecode;
use serde::{Deserialize, Serialize};

/// Immutable match configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchFramework {
    pub id: EntityId,
    pub players: Players,
    pub first_server: Side,
    /// Best-of-N sets.
    pub best_of: u32,
    pub first_serve_time: Timecode,
    /// Source video reference, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_file: Option<String>,
}

impl MatchFramework {
    /// Validate and build a framework.
    pub fn new(
        id: EntityId,
        players: Players,
        first_server: Side,
        best_of: u32,
        first_serve_time: Timecode,
    ) -> Result<Self, WorkflowError> {
        if players.player1 == players.player2 {
            return Err(WorkflowError::InvalidFramework(
                "player identifiers must differ".to_string(),
            ));
        }
        if best_of == 0 || best_of % 2 == 0 {
            return Err(WorkflowError::InvalidFramework(format!(
                "best-of must be a positive odd number, got {}",
                best_of
            )));
        }
        if first_serve_time.seconds() < 0.0 || !first_serve_time.seconds().is_finite() {
            return Err(WorkflowError::InvalidFramework(format!(
                "first serve time {} is not a valid media position",
                first_serve_time.seconds()
            )));
        }
        Ok(Self {
            id,
            players,
            first_server,
            best_of,
            first_serve_time,
            media_file: None,
        })
    }

    /// Sets one side must win to take the match.
    pub fn sets_to_win(&self) -> u32 {
        self.best_of / 2 + 1
    }
}
