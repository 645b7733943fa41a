// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Rally data structures.
//!
//! A rally is captured in two passes: boundary capture fills in shot
//! timestamps, then detail capture judges each shot and commits the
//! derived server, outcome and score.

use super::ids::EntityId;
use super::outcome::RallyOutcome;
use super::player::Side;
use super::score::ScorePair;
use super::shot::Shot;
use crate::util::timecode::Timecode;
use serde::{Deserialize, Serialize};

/// Server and receiver of a rally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServeAssignment {
    pub server: Side,
    pub receiver: Side,
}

impl ServeAssignment {
    pub fn served_by(server: Side) -> Self {
        Self {
            server,
            receiver: server.opponent(),
        }
    }
}

/// Rule-derived result of a confirmed rally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedOutcome {
    pub serve: ServeAssignment,
    pub outcome: RallyOutcome,
    pub score_before: ScorePair,
    pub score_after: ScorePair,
}

impl CommittedOutcome {
    /// Build the committed record, applying the score invariant.
    pub fn new(serve: ServeAssignment, outcome: RallyOutcome, score_before: ScorePair) -> Self {
        let score_after = match outcome.winner() {
            Some(winner) => score_before.with_point(winner),
            None => score_before,
        };
        Self {
            serve,
            outcome,
            score_before,
            score_after,
        }
    }
}

/// One point from serve to its end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rally {
    pub id: EntityId,
    /// 1-based position within the set.
    pub index: u32,
    pub shots: Vec<Shot>,
    /// End-of-point timestamp, fine-adjusted during detail capture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timecode>,
    /// Present once the rally has been confirmed in detail capture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed: Option<CommittedOutcome>,
}

impl Rally {
    /// Create a new rally with no shots.
    pub fn new(id: EntityId, index: u32) -> Self {
        Self {
            id,
            index,
            shots: Vec::new(),
            end_time: None,
            committed: None,
        }
    }

    /// Append a shot at the next index.
    pub fn push_shot(&mut self, id: EntityId, time: Timecode) -> &Shot {
        let index = self.shots.len() as u32 + 1;
        self.shots.push(Shot::new(id, index, time));
        &self.shots[self.shots.len() - 1]
    }

    pub fn shot_count(&self) -> usize {
        self.shots.len()
    }

    pub fn first_shot_time(&self) -> Option<Timecode> {
        self.shots.first().map(|shot| shot.time)
    }

    pub fn last_shot_time(&self) -> Option<Timecode> {
        self.shots.last().map(|shot| shot.time)
    }

    /// Shot by 1-based index.
    pub fn shot_at(&self, index: u32) -> Option<&Shot> {
        let position = index.checked_sub(1)? as usize;
        self.shots.get(position)
    }

    pub fn shot_at_mut(&mut self, index: u32) -> Option<&mut Shot> {
        let position = index.checked_sub(1)? as usize;
        self.shots.get_mut(position)
    }

    pub fn position_of(&self, shot_id: &EntityId) -> Option<usize> {
        self.shots.iter().position(|shot| shot.id == *shot_id)
    }

    /// Rule-derived fields are frozen once the rally is confirmed.
    pub fn is_locked(&self) -> bool {
        self.committed.is_some()
    }

    pub fn is_scoring(&self) -> Option<bool> {
        self.committed.map(|c| c.outcome.is_scoring())
    }

    pub fn winner(&self) -> Option<Side> {
        self.committed.and_then(|c| c.outcome.winner())
    }

    /// Drop every detail-capture judgment, leaving timestamps intact.
    pub fn clear_judgments(&mut self) {
        for shot in &mut self.shots {
            shot.clear_judgment();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::outcome::{Determination, PointEndType, PointOutcome};

    #[test]
    fn test_push_shot_indices() {
        let mut rally = Rally::new(EntityId::from("rally-1"), 1);
        rally.push_shot(EntityId::from("a"), Timecode(1.0));
        let second = rally.push_shot(EntityId::from("b"), Timecode(1.6));
        assert_eq!(second.index, 2);
        assert_eq!(rally.shot_at(1).map(|s| s.id.0.as_str()), Some("a"));
        assert!(rally.shot_at(0).is_none());
        assert!(rally.shot_at(3).is_none());
        assert_eq!(rally.first_shot_time(), Some(Timecode(1.0)));
    }

    #[test]
    fn test_committed_score_invariant() {
        let serve = ServeAssignment::served_by(Side::Player1);
        let point = RallyOutcome::Point(PointOutcome {
            winner: Side::Player2,
            ending_shot: 1,
            end_type: Determination::Resolved(PointEndType::ServiceFault),
        });
        let committed = CommittedOutcome::new(serve, point, ScorePair::new(4, 4));
        assert_eq!(committed.score_after, ScorePair::new(4, 5));

        let replay = CommittedOutcome::new(serve, RallyOutcome::Let, ScorePair::new(4, 4));
        assert_eq!(replay.score_after, ScorePair::new(4, 4));
    }
}
