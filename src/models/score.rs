// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Running score within a set.

use super::player::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Points won by each side in the current set.
///
/// Scores are unsigned, so a negative score cannot be expressed at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScorePair {
    pub player1: u32,
    pub player2: u32,
}

impl ScorePair {
    pub const LOVE_ALL: ScorePair = ScorePair { player1: 0, player2: 0 };

    pub fn new(player1: u32, player2: u32) -> Self {
        Self { player1, player2 }
    }

    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Player1 => self.player1,
            Side::Player2 => self.player2,
        }
    }

    /// Total points played that scored.
    pub fn total(&self) -> u32 {
        self.player1 + self.player2
    }

    /// The pair after `side` wins one point.
    pub fn with_point(self, side: Side) -> ScorePair {
        match side {
            Side::Player1 => ScorePair::new(self.player1 + 1, self.player2),
            Side::Player2 => ScorePair::new(self.player1, self.player2 + 1),
        }
    }

    /// The side ahead, or `None` when level.
    pub fn leader(&self) -> Option<Side> {
        use std::cmp::Ordering;
        match self.player1.cmp(&self.player2) {
            Ordering::Greater => Some(Side::Player1),
            Ordering::Less => Some(Side::Player2),
            Ordering::Equal => None,
        }
    }
}

impl fmt::Display for ScorePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.player1, self.player2)
    }
}
