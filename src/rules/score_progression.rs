// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Score progression.
//!
//! Folds rally outcomes into running scores, detects set completion and
//! counts sets toward the match result.

use crate::error::RulesError;
use crate::models::outcome::RallyOutcome;
use crate::models::player::Side;
use crate::models::score::ScorePair;
use serde::{Deserialize, Serialize};

/// When a set is won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetRule {
    pub target: u32,
    pub win_by: u32,
}

impl Default for SetRule {
    fn default() -> Self {
        Self {
            target: 11,
            win_by: 2,
        }
    }
}

impl SetRule {
    /// One side has reached the target with the required lead.
    pub fn is_complete(&self, score: ScorePair) -> bool {
        let high = score.player1.max(score.player2);
        let low = score.player1.min(score.player2);
        high >= self.target && high - low >= self.win_by
    }

    /// Winner of a completed set, `None` if the set is still open.
    ///
    /// A level score at completion cannot happen with `win_by >= 1`; it is
    /// reported rather than resolved arbitrarily.
    pub fn winner(&self, score: ScorePair) -> Result<Option<Side>, RulesError> {
        if !self.is_complete(score) {
            return Ok(None);
        }
        score
            .leader()
            .map(Some)
            .ok_or(RulesError::TiedAtCompletion(score))
    }
}

/// Running score after each rally, in rally order.
///
/// A non-scoring rally copies the previous pair forward.
pub fn fold(outcomes: &[RallyOutcome]) -> Vec<ScorePair> {
    outcomes
        .iter()
        .scan(ScorePair::LOVE_ALL, |running, outcome| {
            if let Some(winner) = outcome.winner() {
                *running = running.with_point(winner);
            }
            Some(*running)
        })
        .collect()
}

/// A set's progression through its rallies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetProgress {
    /// Running score after each rally.
    pub scores: Vec<ScorePair>,
    /// Position of the rally after which the set became complete.
    pub completed_after: Option<usize>,
    pub winner: Option<Side>,
    /// Scoring rallies played after completion.
    pub points_after_completion: usize,
}

impl SetProgress {
    pub fn final_score(&self) -> ScorePair {
        self.scores.last().copied().unwrap_or(ScorePair::LOVE_ALL)
    }
}

/// Fold a set's outcomes and evaluate completion after each scoring rally.
pub fn track(outcomes: &[RallyOutcome], rule: &SetRule) -> Result<SetProgress, RulesError> {
    let scores = fold(outcomes);
    let mut completed_after = None;
    let mut winner = None;
    let mut points_after_completion = 0;

    for (position, (outcome, score)) in outcomes.iter().zip(&scores).enumerate() {
        if !outcome.is_scoring() {
            continue;
        }
        if completed_after.is_some() {
            points_after_completion += 1;
            continue;
        }
        if let Some(side) = rule.winner(*score)? {
            completed_after = Some(position);
            winner = Some(side);
        }
    }

    Ok(SetProgress {
        scores,
        completed_after,
        winner,
        points_after_completion,
    })
}

/// Sets won by each side, and the match winner once decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchProgress {
    pub sets_won: ScorePair,
    pub set_winners: Vec<Option<Side>>,
    pub winner: Option<Side>,
}

/// Count completed sets toward a best-of-N match.
pub fn match_progress(
    set_scores: &[ScorePair],
    rule: &SetRule,
    sets_to_win: u32,
) -> Result<MatchProgress, RulesError> {
    let set_winners = set_scores
        .iter()
        .map(|score| rule.winner(*score))
        .collect::<Result<Vec<_>, _>>()?;

    let mut sets_won = ScorePair::LOVE_ALL;
    let mut winner = None;
    for side in set_winners.iter().flatten() {
        sets_won = sets_won.with_point(*side);
        if winner.is_none() && sets_won.get(*side) >= sets_to_win {
            winner = Some(*side);
        }
    }

    Ok(MatchProgress {
        sets_won,
        set_winners,
        winner,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::outcome::{Determination, PointEndType, PointOutcome};

    fn point(winner: Side) -> RallyOutcome {
        RallyOutcome::Point(PointOutcome {
            winner,
            ending_shot: 3,
            end_type: Determination::Resolved(PointEndType::WinnerShot),
        })
    }

    #[test]
    fn test_fold_copies_forward_on_let() {
        let outcomes = [point(Side::Player1), RallyOutcome::Let, point(Side::Player2)];
        assert_eq!(
            fold(&outcomes),
            vec![ScorePair::new(1, 0), ScorePair::new(1, 0), ScorePair::new(1, 1)]
        );
    }

    #[test]
    fn test_completion_at_eleven_nine() {
        let rule = SetRule::default();
        assert!(rule.is_complete(ScorePair::new(11, 9)));
        assert_eq!(rule.winner(ScorePair::new(11, 9)), Ok(Some(Side::Player1)));
        assert!(!rule.is_complete(ScorePair::new(11, 10)));
        assert!(!rule.is_complete(ScorePair::new(10, 8)));
        assert!(rule.is_complete(ScorePair::new(12, 14)));
    }

    #[test]
    fn test_tie_at_completion_is_reported() {
        let rule = SetRule { target: 11, win_by: 0 };
        assert_eq!(
            rule.winner(ScorePair::new(11, 11)),
            Err(RulesError::TiedAtCompletion(ScorePair::new(11, 11)))
        );
    }

    #[test]
    fn test_track_detects_completion_and_overplay() {
        let mut outcomes = Vec::new();
        for _ in 0..9 {
            outcomes.push(point(Side::Player1));
            outcomes.push(point(Side::Player2));
        }
        outcomes.push(point(Side::Player2));
        outcomes.push(point(Side::Player2)); // 9-11
        outcomes.push(RallyOutcome::Let);
        outcomes.push(point(Side::Player1)); // played after the set was over

        let progress = track(&outcomes, &SetRule::default()).unwrap();
        assert_eq!(progress.completed_after, Some(19));
        assert_eq!(progress.winner, Some(Side::Player2));
        assert_eq!(progress.points_after_completion, 1);
        assert_eq!(progress.final_score(), ScorePair::new(10, 11));
    }

    #[test]
    fn test_match_progress() {
        let scores = [
            ScorePair::new(11, 7),
            ScorePair::new(9, 11),
            ScorePair::new(13, 11),
        ];
        let progress = match_progress(&scores, &SetRule::default(), 2).unwrap();
        assert_eq!(progress.sets_won, ScorePair::new(2, 1));
        assert_eq!(progress.winner, Some(Side::Player1));
    }

    #[test]
    fn test_match_progress_with_open_set() {
        let scores = [ScorePair::new(11, 3), ScorePair::new(4, 2)];
        let progress = match_progress(&scores, &SetRule::default(), 2).unwrap();
        assert_eq!(progress.set_winners, vec![Some(Side::Player1), None]);
        assert_eq!(progress.winner, None);
    }
}
