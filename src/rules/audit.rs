// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Consistency audit of a match record.
//!
//! Findings are reported for the operator to act on. The audit never
//! rewrites history.

use super::score_progression::{self, SetRule};
use super::serve_rotation::{self, ServerMismatch, ServiceRule};
use crate::models::match_record::MatchRecord;
use crate::models::player::Side;
use crate::models::score::ScorePair;
use serde::{Deserialize, Serialize};

/// A single inconsistency in a match record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "finding")]
pub enum Finding {
    ServerMismatch(ServerMismatch),
    /// Points were recorded after the set had already been won.
    PointsAfterCompletion { set_number: u32, points: usize },
    /// A set reached completion with level scores.
    TiedAtCompletion { set_number: u32, score: ScorePair },
    /// The stored final score disagrees with the confirmed rallies.
    FinalScoreMismatch {
        set_number: u32,
        stored: ScorePair,
        derived: ScorePair,
    },
    /// Operator-reported result disagrees with the derived winner.
    ResultMismatch {
        reported: Side,
        derived: Option<Side>,
    },
}

/// Audit every set of a record.
pub fn audit_record(record: &MatchRecord, service: &ServiceRule, scoring: &SetRule) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut set_scores = Vec::with_capacity(record.sets.len());

    for set in &record.sets {
        findings.extend(
            serve_rotation::audit_server_sequence(set, service)
                .into_iter()
                .map(Finding::ServerMismatch),
        );

        let outcomes: Vec<_> = set
            .rallies
            .iter()
            .map_while(|rally| rally.committed.map(|c| c.outcome))
            .collect();

        match score_progression::track(&outcomes, scoring) {
            Ok(progress) => {
                if progress.points_after_completion > 0 {
                    findings.push(Finding::PointsAfterCompletion {
                        set_number: set.number,
                        points: progress.points_after_completion,
                    });
                }
                let derived = progress.final_score();
                if set.final_score != derived {
                    findings.push(Finding::FinalScoreMismatch {
                        set_number: set.number,
                        stored: set.final_score,
                        derived,
                    });
                }
                set_scores.push(derived);
            }
            Err(crate::error::RulesError::TiedAtCompletion(score)) => {
                findings.push(Finding::TiedAtCompletion {
                    set_number: set.number,
                    score,
                });
                set_scores.push(score);
            }
            Err(other) => {
                log::error!("Unexpected rules error auditing set {}: {}", set.number, other);
            }
        }
    }

    if let Some(result) = &record.result {
        let derived = score_progression::match_progress(
            &set_scores,
            scoring,
            record.framework.sets_to_win(),
        )
        .ok()
        .and_then(|progress| progress.winner);

        if derived != Some(result.winner) {
            findings.push(Finding::ResultMismatch {
                reported: result.winner,
                derived,
            });
        }
    }

    if findings.is_empty() {
        log::info!("Audit clean: {} sets, {} rallies", record.sets.len(), record.rally_count());
    } else {
        log::warn!("Audit produced {} findings", findings.len());
    }

    findings
}
