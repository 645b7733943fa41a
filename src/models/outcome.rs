// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Rally outcome types.
//!
//! Fields that may be waiting on an operator decision are modelled with
//! [`Determination`] so that "not yet known" is never confused with
//! "known to be absent".

use super::player::Side;
use crate::error::RulesError;
use serde::{Deserialize, Serialize};

/// A value that is either still awaiting human input or settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "value")]
pub enum Determination<T> {
    Pending,
    Resolved(T),
}

impl<T: Copy> Determination<T> {
    pub fn resolved(&self) -> Option<T> {
        match self {
            Determination::Pending => None,
            Determination::Resolved(value) => Some(*value),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Determination::Pending)
    }
}

/// Classified cause of a rally's conclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PointEndType {
    ServiceFault,
    ReceiveError,
    WinnerShot,
    ForcedError,
    UnforcedError,
}

/// Operator's call on an error made during open play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorJudgment {
    Forced,
    Unforced,
}

impl From<ErrorJudgment> for PointEndType {
    fn from(judgment: ErrorJudgment) -> Self {
        match judgment {
            ErrorJudgment::Forced => PointEndType::ForcedError,
            ErrorJudgment::Unforced => PointEndType::UnforcedError,
        }
    }
}

/// A scoring rally's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointOutcome {
    pub winner: Side,
    /// Index of the shot that decided the rally.
    pub ending_shot: u32,
    pub end_type: Determination<PointEndType>,
}

impl PointOutcome {
    /// Settle a pending forced/unforced classification.
    ///
    /// The winner is already known and is kept as-is.
    pub fn resolve(self, judgment: ErrorJudgment) -> Result<PointOutcome, RulesError> {
        match self.end_type {
            Determination::Pending => Ok(PointOutcome {
                end_type: Determination::Resolved(judgment.into()),
                ..self
            }),
            Determination::Resolved(current) => Err(RulesError::AlreadyResolved(current)),
        }
    }
}

/// What a rally produced, as derived from its shots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RallyOutcome {
    /// Non-scoring serve; no winner and no classification.
    Let,
    Point(PointOutcome),
}

impl RallyOutcome {
    pub fn is_scoring(&self) -> bool {
        matches!(self, RallyOutcome::Point(_))
    }

    pub fn winner(&self) -> Option<Side> {
        match self {
            RallyOutcome::Let => None,
            RallyOutcome::Point(point) => Some(point.winner),
        }
    }

    /// `None` for a let; `Some(Pending)` while forced/unforced is open.
    pub fn point_end(&self) -> Option<Determination<PointEndType>> {
        match self {
            RallyOutcome::Let => None,
            RallyOutcome::Point(point) => Some(point.end_type),
        }
    }

    pub fn needs_disambiguation(&self) -> bool {
        matches!(self, RallyOutcome::Point(point) if point.end_type.is_pending())
    }

    pub fn resolve(self, judgment: ErrorJudgment) -> Result<RallyOutcome, RulesError> {
        match self {
            RallyOutcome::Let => Err(RulesError::NothingToResolve),
            RallyOutcome::Point(point) => point.resolve(judgment).map(RallyOutcome::Point),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_point() -> RallyOutcome {
        RallyOutcome::Point(PointOutcome {
            winner: Side::Player1,
            ending_shot: 4,
            end_type: Determination::Pending,
        })
    }

    #[test]
    fn test_resolve_keeps_winner() {
        let outcome = pending_point();
        assert!(outcome.needs_disambiguation());

        let resolved = outcome.resolve(ErrorJudgment::Unforced).unwrap();
        assert!(!resolved.needs_disambiguation());
        assert_eq!(resolved.winner(), Some(Side::Player1));
        assert_eq!(
            resolved.point_end(),
            Some(Determination::Resolved(PointEndType::UnforcedError))
        );
    }

    #[test]
    fn test_resolve_twice_is_rejected() {
        let resolved = pending_point().resolve(ErrorJudgment::Forced).unwrap();
        assert!(matches!(
            resolved.resolve(ErrorJudgment::Unforced),
            Err(RulesError::AlreadyResolved(PointEndType::ForcedError))
        ));
    }

    #[test]
    fn test_let_has_nothing_to_resolve() {
        assert!(!RallyOutcome::Let.is_scoring());
        assert_eq!(RallyOutcome::Let.point_end(), None);
        assert!(matches!(
            RallyOutcome::Let.resolve(ErrorJudgment::Forced),
            Err(RulesError::NothingToResolve)
        ));
    }
}
