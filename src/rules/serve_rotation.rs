// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Serve rotation.
//!
//! The server of any rally is a function of the set's first server and the
//! absolute score before the rally. No counters are kept, so re-deriving
//! from a persisted score pair always reproduces the same server.

use crate::models::ids::EntityId;
use crate::models::player::Side;
use crate::models::rally::ServeAssignment;
use crate::models::score::ScorePair;
use crate::models::set::SetRecord;
use serde::{Deserialize, Serialize};

/// How often service changes hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceRule {
    /// Consecutive serves per player outside the deuce region.
    pub points_per_turn: u32,
    /// Once both scores reach this value, service alternates every point.
    pub deuce_threshold: u32,
}

impl Default for ServiceRule {
    fn default() -> Self {
        Self {
            points_per_turn: 2,
            deuce_threshold: 10,
        }
    }
}

impl ServiceRule {
    pub fn in_deuce(&self, score: ScorePair) -> bool {
        score.player1 >= self.deuce_threshold && score.player2 >= self.deuce_threshold
    }

    /// Number of service changes that have happened at this score.
    fn turns_elapsed(&self, score: ScorePair) -> u32 {
        let per_turn = self.points_per_turn.max(1);
        let total = score.total();
        if self.in_deuce(score) {
            let deuce_start = 2 * self.deuce_threshold;
            deuce_start / per_turn + (total - deuce_start)
        } else {
            total / per_turn
        }
    }
}

/// Server and receiver for the rally played at `score`.
pub fn server(first_server: Side, score: ScorePair, rule: &ServiceRule) -> ServeAssignment {
    let server = if rule.turns_elapsed(score) % 2 == 0 {
        first_server
    } else {
        first_server.opponent()
    };
    ServeAssignment::served_by(server)
}

/// First server of a set: odd sets keep the match's first server, even sets swap.
pub fn set_first_server(match_first_server: Side, set_number: u32) -> Side {
    if set_number % 2 == 1 {
        match_first_server
    } else {
        match_first_server.opponent()
    }
}

/// A confirmed rally whose recorded server disagrees with the rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMismatch {
    pub set_number: u32,
    pub rally_id: EntityId,
    pub rally_index: u32,
    pub score_before: ScorePair,
    pub recorded: Side,
    pub expected: Side,
}

/// Replay a set's confirmed rallies and flag every server that does not
/// match the rotation derived from the preceding running score.
///
/// Stops at the first unconfirmed rally, since the running score is unknown
/// past that point.
pub fn audit_server_sequence(set: &SetRecord, rule: &ServiceRule) -> Vec<ServerMismatch> {
    let mut findings = Vec::new();
    let mut running = ScorePair::LOVE_ALL;

    for rally in &set.rallies {
        let Some(committed) = rally.committed else {
            break;
        };

        let expected = server(set.first_server, running, rule).server;
        if committed.serve.server != expected {
            log::warn!(
                "Set {} rally {}: recorded server {} but rotation gives {} at {}",
                set.number,
                rally.index,
                committed.serve.server,
                expected,
                running
            );
            findings.push(ServerMismatch {
                set_number: set.number,
                rally_id: rally.id.clone(),
                rally_index: rally.index,
                score_before: running,
                recorded: committed.serve.server,
                expected,
            });
        }

        if let Some(winner) = committed.outcome.winner() {
            running = running.with_point(winner);
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::outcome::{Determination, PointEndType, PointOutcome, RallyOutcome};
    use crate::models::rally::{CommittedOutcome, Rally};

    fn serve_at(first: Side, p1: u32, p2: u32) -> Side {
        server(first, ScorePair::new(p1, p2), &ServiceRule::default()).server
    }

    #[test]
    fn test_two_point_rotation() {
        // 0-0 -> 1-0 -> 1-1 -> 2-1
        let servers: Vec<Side> = [(0, 0), (1, 0), (1, 1), (2, 1)]
            .iter()
            .map(|&(a, b)| serve_at(Side::Player1, a, b))
            .collect();
        assert_eq!(
            servers,
            vec![Side::Player1, Side::Player1, Side::Player2, Side::Player2]
        );
    }

    #[test]
    fn test_deuce_alternates_every_point() {
        assert_eq!(serve_at(Side::Player1, 10, 10), Side::Player1);
        assert_eq!(serve_at(Side::Player1, 11, 10), Side::Player2);
        assert_eq!(serve_at(Side::Player1, 11, 11), Side::Player1);
        assert_eq!(serve_at(Side::Player1, 12, 11), Side::Player2);
    }

    #[test]
    fn test_server_depends_only_on_total() {
        let rule = ServiceRule::default();
        for p1 in 0..15u32 {
            for p2 in 0..15u32 {
                let score = ScorePair::new(p1, p2);
                let got = server(Side::Player2, score, &rule).server;
                let total = p1 + p2;
                let expected_turns = if p1.min(p2) >= 10 { total } else { total / 2 };
                let expected = if expected_turns % 2 == 0 {
                    Side::Player2
                } else {
                    Side::Player1
                };
                assert_eq!(got, expected, "score {}", score);
                assert_eq!(server(Side::Player2, score, &rule).receiver, got.opponent());
            }
        }
    }

    #[test]
    fn test_one_side_at_threshold_is_not_deuce() {
        // 10-5: total 15, 7 turns -> odd -> opponent of first server
        assert_eq!(serve_at(Side::Player1, 10, 5), Side::Player2);
        assert!(!ServiceRule::default().in_deuce(ScorePair::new(10, 9)));
    }

    #[test]
    fn test_custom_rule_five_serves() {
        let rule = ServiceRule {
            points_per_turn: 5,
            deuce_threshold: 20,
        };
        assert_eq!(server(Side::Player1, ScorePair::new(3, 1), &rule).server, Side::Player1);
        assert_eq!(server(Side::Player1, ScorePair::new(3, 2), &rule).server, Side::Player2);
        assert_eq!(server(Side::Player1, ScorePair::new(20, 20), &rule).server, Side::Player1);
        assert_eq!(server(Side::Player1, ScorePair::new(21, 20), &rule).server, Side::Player2);
    }

    #[test]
    fn test_set_first_server() {
        assert_eq!(set_first_server(Side::Player1, 1), Side::Player1);
        assert_eq!(set_first_server(Side::Player1, 2), Side::Player2);
        assert_eq!(set_first_server(Side::Player1, 3), Side::Player1);
        assert_eq!(set_first_server(Side::Player2, 4), Side::Player1);
    }

    fn confirmed(index: u32, server: Side, winner: Side, before: ScorePair) -> Rally {
        let mut rally = Rally::new(EntityId(format!("r{index}")), index);
        rally.committed = Some(CommittedOutcome::new(
            ServeAssignment::served_by(server),
            RallyOutcome::Point(PointOutcome {
                winner,
                ending_shot: 2,
                end_type: Determination::Resolved(PointEndType::ReceiveError),
            }),
            before,
        ));
        rally
    }

    #[test]
    fn test_audit_flags_wrong_server() {
        let mut set = SetRecord::new(EntityId::from("set-01"), 1, Side::Player1);
        set.rallies.push(confirmed(1, Side::Player1, Side::Player1, ScorePair::new(0, 0)));
        set.rallies.push(confirmed(2, Side::Player1, Side::Player2, ScorePair::new(1, 0)));
        // 1-1: rotation says player2, recorded player1
        set.rallies.push(confirmed(3, Side::Player1, Side::Player2, ScorePair::new(1, 1)));

        let findings = audit_server_sequence(&set, &ServiceRule::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rally_index, 3);
        assert_eq!(findings[0].expected, Side::Player2);
        assert_eq!(findings[0].score_before, ScorePair::new(1, 1));
    }

    #[test]
    fn test_lets_replay_the_server_of_the_copied_score() {
        use crate::rules::score_progression::fold;

        let rule = ServiceRule::default();
        let point = |winner| {
            RallyOutcome::Point(PointOutcome {
                winner,
                ending_shot: 2,
                end_type: Determination::Resolved(PointEndType::ReceiveError),
            })
        };
        // Level to 10-10 with a let at 5-4, then lets at 10-10 and 11-10.
        let mut outcomes = Vec::new();
        for i in 0..20 {
            if i == 9 {
                outcomes.push(RallyOutcome::Let);
            }
            outcomes.push(point(if i % 2 == 0 { Side::Player1 } else { Side::Player2 }));
        }
        outcomes.extend([
            RallyOutcome::Let,
            point(Side::Player1),
            RallyOutcome::Let,
            point(Side::Player2),
        ]);

        let scores = fold(&outcomes);
        let mut set = SetRecord::new(EntityId::from("set-01"), 1, Side::Player1);
        let mut servers = Vec::new();
        for (i, outcome) in outcomes.iter().enumerate() {
            let before = i.checked_sub(1).map_or(ScorePair::LOVE_ALL, |p| scores[p]);
            let serve = server(set.first_server, before, &rule);
            let committed = CommittedOutcome::new(serve, *outcome, before);
            assert_eq!(committed.score_after, scores[i]);
            servers.push(serve.server);

            let mut rally = Rally::new(EntityId(format!("r{}", i + 1)), i as u32 + 1);
            rally.committed = Some(committed);
            set.rallies.push(rally);
        }

        assert!(audit_server_sequence(&set, &rule).is_empty());
        assert_eq!(scores[9], ScorePair::new(5, 4));
        assert_eq!(scores[20], ScorePair::new(10, 10));
        assert_eq!(scores.last(), Some(&ScorePair::new(11, 11)));
        // Each let is served again by the same player.
        for let_position in [9, 21, 23] {
            assert_eq!(outcomes[let_position], RallyOutcome::Let);
            assert_eq!(servers[let_position], servers[let_position + 1]);
        }
        assert_eq!(servers[21], Side::Player1);
        assert_eq!(servers[23], Side::Player2);
    }

    #[test]
    fn test_audit_stops_at_unconfirmed_rally() {
        let mut set = SetRecord::new(EntityId::from("set-02"), 2, Side::Player2);
        set.rallies.push(confirmed(1, Side::Player2, Side::Player1, ScorePair::new(0, 0)));
        set.rallies.push(Rally::new(EntityId::from("open"), 2));
        set.rallies.push(confirmed(3, Side::Player1, Side::Player1, ScorePair::new(9, 9)));

        assert!(audit_server_sequence(&set, &ServiceRule::default()).is_empty());
    }
}
