// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Match record state.
//!
//! This module holds the complete Set/Rally/Shot graph of one annotated
//! match, as produced by a finished session and exported for storage.

use super::framework::MatchFramework;
use super::ids::EntityId;
use super::player::Side;
use super::rally::Rally;
use super::score::ScorePair;
use super::set::SetRecord;
use serde::{Deserialize, Serialize};

/// Final-result metadata supplied by the operator after boundary capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub winner: Side,
    /// Final score of each set, in order.
    #[serde(default)]
    pub set_scores: Vec<ScorePair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Complete match data for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub framework: MatchFramework,
    pub sets: Vec<SetRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResult>,
}

impl MatchRecord {
    /// Create a new record with no sets.
    pub fn new(framework: MatchFramework) -> Self {
        Self {
            framework,
            sets: Vec::new(),
            result: None,
        }
    }

    pub fn rally_count(&self) -> usize {
        self.sets.iter().map(|set| set.rallies.len()).sum()
    }

    pub fn shot_count(&self) -> usize {
        self.sets
            .iter()
            .flat_map(|set| set.rallies.iter())
            .map(Rally::shot_count)
            .sum()
    }

    /// Locate a rally by identifier, returning its set position as well.
    pub fn find_rally(&self, rally_id: &EntityId) -> Option<(usize, &Rally)> {
        self.sets.iter().enumerate().find_map(|(set_pos, set)| {
            set.rally(rally_id).map(|rally| (set_pos, rally))
        })
    }

    pub fn find_rally_mut(&mut self, rally_id: &EntityId) -> Option<(usize, &mut Rally)> {
        self.sets.iter_mut().enumerate().find_map(|(set_pos, set)| {
            set.rally_mut(rally_id).map(|rally| (set_pos, rally))
        })
    }
}
