// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media time utilities.
//!
//! This module provides the timestamp type used for every shot and rally
//! boundary, and the conversions between seconds and frame numbers used by
//! nudging and frame stepping.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A position in the source video, in seconds from the start of the media.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timecode(pub f64);

impl Timecode {
    pub const ZERO: Timecode = Timecode(0.0);

    pub fn seconds(self) -> f64 {
        self.0
    }

    /// Shift by a whole number of frames at the given frame rate.
    pub fn offset_frames(self, frames: i64, frame_rate: f64) -> Timecode {
        Timecode(self.0 + frames as f64 / frame_rate)
    }

    /// Absolute distance to another timecode, in seconds.
    pub fn distance(self, other: Timecode) -> f64 {
        (self.0 - other.0).abs()
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.max(0.0);
        let minutes = (total / 60.0).floor() as u64;
        let seconds = total - minutes as f64 * 60.0;
        write!(f, "{:02}:{:06.3}", minutes, seconds)
    }
}

impl From<f64> for Timecode {
    fn from(seconds: f64) -> Self {
        Timecode(seconds)
    }
}

/// Direction of a single-frame step or nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameDirection {
    Forward,
    Backward,
}

impl FrameDirection {
    pub fn sign(self) -> i64 {
        match self {
            FrameDirection::Forward => 1,
            FrameDirection::Backward => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_frames() {
        let t = Timecode(10.0);
        let forward = t.offset_frames(3, 30.0);
        assert!((forward.seconds() - 10.1).abs() < 1e-9);

        let back = t.offset_frames(-30, 30.0);
        assert!((back.seconds() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_display() {
        assert_eq!(Timecode(0.0).to_string(), "00:00.000");
        assert_eq!(Timecode(75.5).to_string(), "01:15.500");
    }

    #[test]
    fn test_direction_sign() {
        assert_eq!(FrameDirection::Forward.sign(), 1);
        assert_eq!(FrameDirection::Backward.sign(), -1);
    }
}
