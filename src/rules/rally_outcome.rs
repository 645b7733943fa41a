// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Rally outcome derivation.
//!
//! Maps the judged shots of a rally to whether it scored, who won it and
//! why it ended. Whether an open-play error was forced or unforced cannot
//! be read off the shot data; such outcomes come back with a pending
//! point-end classification for the operator to settle.

use crate::error::RulesError;
use crate::models::outcome::{Determination, PointEndType, PointOutcome, RallyOutcome};
use crate::models::player::Side;
use crate::models::shot::{Shot, ShotQuality};

/// Derive the outcome of a rally from its shots and its server.
///
/// The deciding shot is the first one judged as an error or let, or
/// otherwise the last judged shot. Shots after the deciding shot are
/// ignored; they are structurally invalid and pruned elsewhere.
pub fn derive(shots: &[Shot], server: Side) -> Result<RallyOutcome, RulesError> {
    if shots.is_empty() {
        return Err(RulesError::EmptyRally);
    }

    if let Some(shot) = shots
        .iter()
        .find(|shot| shot.quality == Some(ShotQuality::Let) && !shot.is_serve())
    {
        return Err(RulesError::LetOutsideServe { index: shot.index });
    }

    let (deciding, quality) = deciding_shot(shots).ok_or(RulesError::Unjudged)?;

    if quality == ShotQuality::Let {
        return Ok(RallyOutcome::Let);
    }

    let striker = deciding.striker(server);
    let is_error = quality.is_error();
    let winner = if is_error { striker.opponent() } else { striker };

    let end_type = match (is_error, deciding.index) {
        (false, _) => Determination::Resolved(PointEndType::WinnerShot),
        (true, 1) => Determination::Resolved(PointEndType::ServiceFault),
        (true, 2) => Determination::Resolved(PointEndType::ReceiveError),
        (true, _) => Determination::Pending,
    };

    Ok(RallyOutcome::Point(PointOutcome {
        winner,
        ending_shot: deciding.index,
        end_type,
    }))
}

fn deciding_shot(shots: &[Shot]) -> Option<(&Shot, ShotQuality)> {
    let judged = || {
        shots
            .iter()
            .filter_map(|shot| shot.quality.map(|quality| (shot, quality)))
    };
    judged()
        .find(|(_, quality)| quality.ends_rally())
        .or_else(|| judged().last())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ids::EntityId;
    use crate::util::timecode::Timecode;

    fn rally(qualities: &[Option<ShotQuality>]) -> Vec<Shot> {
        qualities
            .iter()
            .enumerate()
            .map(|(i, quality)| {
                let index = i as u32 + 1;
                let mut shot = Shot::new(EntityId(format!("s{index}")), index, Timecode(index as f64));
                shot.quality = *quality;
                shot
            })
            .collect()
    }

    use ShotQuality::*;

    #[test]
    fn test_open_play_error_needs_disambiguation() {
        let shots = rally(&[Some(Good), Some(Average), Some(InNet)]);
        let outcome = derive(&shots, Side::Player1).unwrap();

        // Shot 3 struck by the server, so the receiver wins.
        assert!(outcome.is_scoring());
        assert!(outcome.needs_disambiguation());
        assert_eq!(outcome.winner(), Some(Side::Player2));
        assert_eq!(outcome.point_end(), Some(Determination::Pending));
    }

    #[test]
    fn test_receive_error() {
        let shots = rally(&[Some(Good), Some(Wide)]);
        let outcome = derive(&shots, Side::Player2).unwrap();

        assert!(!outcome.needs_disambiguation());
        assert_eq!(outcome.winner(), Some(Side::Player2));
        assert_eq!(
            outcome.point_end(),
            Some(Determination::Resolved(PointEndType::ReceiveError))
        );
    }

    #[test]
    fn test_service_fault() {
        let outcome = derive(&rally(&[Some(Long)]), Side::Player1).unwrap();
        assert_eq!(outcome.winner(), Some(Side::Player2));
        assert_eq!(
            outcome.point_end(),
            Some(Determination::Resolved(PointEndType::ServiceFault))
        );
    }

    #[test]
    fn test_winner_shot_any_index() {
        for length in 1..=6 {
            let shots = rally(&vec![Some(Good); length]);
            let outcome = derive(&shots, Side::Player1).unwrap();
            let expected = if length % 2 == 1 { Side::Player1 } else { Side::Player2 };
            assert_eq!(outcome.winner(), Some(expected));
            assert_eq!(
                outcome.point_end(),
                Some(Determination::Resolved(PointEndType::WinnerShot))
            );
        }
    }

    #[test]
    fn test_let_serve_does_not_score() {
        let outcome = derive(&rally(&[Some(Let)]), Side::Player1).unwrap();
        assert_eq!(outcome, RallyOutcome::Let);
        assert!(!outcome.is_scoring());
        assert_eq!(outcome.winner(), None);
        assert_eq!(outcome.point_end(), None);
    }

    #[test]
    fn test_let_outside_serve_is_rejected() {
        let shots = rally(&[Some(Good), Some(Let)]);
        assert_eq!(
            derive(&shots, Side::Player1),
            Err(RulesError::LetOutsideServe { index: 2 })
        );
    }

    #[test]
    fn test_empty_and_unjudged() {
        assert_eq!(derive(&[], Side::Player1), Err(RulesError::EmptyRally));
        assert_eq!(
            derive(&rally(&[None, None]), Side::Player1),
            Err(RulesError::Unjudged)
        );
    }

    #[test]
    fn test_error_before_trailing_shots_decides() {
        let shots = rally(&[Some(Good), Some(Long), Some(Good), None]);
        let outcome = derive(&shots, Side::Player1).unwrap();
        assert_eq!(outcome.winner(), Some(Side::Player1));
        match outcome {
            RallyOutcome::Point(point) => assert_eq!(point.ending_shot, 2),
            RallyOutcome::Let => panic!("expected a point"),
        }
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let shots = rally(&[Some(Good), Some(Weak), Some(Average), Some(Wide)]);
        let first = derive(&shots, Side::Player2);
        let second = derive(&shots, Side::Player2);
        assert_eq!(first, second);
    }
}
