// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Shot data structures.
//!
//! This module defines a single ball contact within a rally, the quality
//! vocabulary used during detail capture, and the free-form descriptive
//! attributes consumed by downstream statistics.

use super::ids::EntityId;
use super::player::Side;
use crate::util::timecode::Timecode;
use serde::{Deserialize, Serialize};

/// Operator judgment of how a shot landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotQuality {
    /// In play, struck well.
    Good,
    /// In play.
    Average,
    /// In play, but weak.
    Weak,
    /// Serve touched the net and landed validly; replayed without score.
    Let,
    InNet,
    Long,
    Wide,
}

impl ShotQuality {
    pub fn is_error(self) -> bool {
        matches!(self, ShotQuality::InNet | ShotQuality::Long | ShotQuality::Wide)
    }

    pub fn is_in_play(self) -> bool {
        matches!(self, ShotQuality::Good | ShotQuality::Average | ShotQuality::Weak)
    }

    /// Whether this judgment ends the rally on the shot it is applied to.
    pub fn ends_rally(self) -> bool {
        self.is_error() || self == ShotQuality::Let
    }
}

/// Descriptive attributes captured in detail mode. Not interpreted here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landing: Option<String>,
}

/// A single ball contact within a rally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    pub id: EntityId,
    /// 1-based position in the rally; the serve is 1.
    pub index: u32,
    pub time: Timecode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<ShotQuality>,
    #[serde(default)]
    pub detail: ShotDetail,
}

impl Shot {
    /// Create a new untagged shot.
    pub fn new(id: EntityId, index: u32, time: Timecode) -> Self {
        Self {
            id,
            index,
            time,
            quality: None,
            detail: ShotDetail::default(),
        }
    }

    pub fn is_serve(&self) -> bool {
        self.index == 1
    }

    /// The side that struck this shot: odd indices belong to the server.
    pub fn striker(&self, server: Side) -> Side {
        if self.index % 2 == 1 {
            server
        } else {
            server.opponent()
        }
    }

    /// Forget every detail-capture judgment on this shot.
    pub fn clear_judgment(&mut self) {
        self.quality = None;
        self.detail = ShotDetail::default();
    }
}

/// Re-number shots so indices run 1..=n in their current order.
pub fn renumber(shots: &mut [Shot]) {
    for (position, shot) in shots.iter_mut().enumerate() {
        shot.index = position as u32 + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(index: u32) -> Shot {
        Shot::new(EntityId(format!("shot-{index}")), index, Timecode(index as f64))
    }

    #[test]
    fn test_striker_alternates() {
        assert_eq!(shot(1).striker(Side::Player2), Side::Player2);
        assert_eq!(shot(2).striker(Side::Player2), Side::Player1);
        assert_eq!(shot(5).striker(Side::Player1), Side::Player1);
    }

    #[test]
    fn test_quality_classes() {
        assert!(ShotQuality::Wide.is_error());
        assert!(!ShotQuality::Let.is_error());
        assert!(ShotQuality::Let.ends_rally());
        assert!(ShotQuality::Weak.is_in_play());
        assert!(!ShotQuality::Good.ends_rally());
    }

    #[test]
    fn test_renumber() {
        let mut shots = vec![shot(1), shot(3), shot(4)];
        renumber(&mut shots);
        let indices: Vec<u32> = shots.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }
}
