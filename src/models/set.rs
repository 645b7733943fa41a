// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Set data structures.

use super::ids::EntityId;
use super::player::Side;
use super::rally::Rally;
use super::score::ScorePair;
use serde::{Deserialize, Serialize};

/// A set within a match, owning its rallies in play order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    pub id: EntityId,
    /// 1-based set number.
    pub number: u32,
    pub first_server: Side,
    pub rallies: Vec<Rally>,
    #[serde(default)]
    pub final_score: ScorePair,
}

impl SetRecord {
    pub fn new(id: EntityId, number: u32, first_server: Side) -> Self {
        Self {
            id,
            number,
            first_server,
            rallies: Vec::new(),
            final_score: ScorePair::LOVE_ALL,
        }
    }

    /// Recompute the final score from the confirmed rallies.
    pub fn recompute_final_score(&mut self) {
        self.final_score = self
            .rallies
            .iter()
            .rev()
            .find_map(|rally| rally.committed.map(|c| c.score_after))
            .unwrap_or(ScorePair::LOVE_ALL);
    }

    pub fn rally(&self, rally_id: &EntityId) -> Option<&Rally> {
        self.rallies.iter().find(|rally| rally.id == *rally_id)
    }

    pub fn rally_mut(&mut self, rally_id: &EntityId) -> Option<&mut Rally> {
        self.rallies.iter_mut().find(|rally| rally.id == *rally_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::outcome::{Determination, PointEndType, PointOutcome, RallyOutcome};
    use crate::models::rally::{CommittedOutcome, ServeAssignment};

    #[test]
    fn test_final_score_tracks_last_confirmed_rally() {
        let mut set = SetRecord::new(EntityId::from("set-01"), 1, Side::Player1);
        let mut first = Rally::new(EntityId::from("r1"), 1);
        first.committed = Some(CommittedOutcome::new(
            ServeAssignment::served_by(Side::Player1),
            RallyOutcome::Point(PointOutcome {
                winner: Side::Player1,
                ending_shot: 3,
                end_type: Determination::Resolved(PointEndType::WinnerShot),
            }),
            ScorePair::LOVE_ALL,
        ));
        set.rallies.push(first);
        set.rallies.push(Rally::new(EntityId::from("r2"), 2));

        set.recompute_final_score();
        assert_eq!(set.final_score, ScorePair::new(1, 0));
    }
}
