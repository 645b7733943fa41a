// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media player collaborator.
//!
//! The workflow only needs transport control and the current position.
//! Decoding and rendering belong to whatever implements [`MediaPlayer`].

use crate::util::timecode::{FrameDirection, Timecode};

pub trait MediaPlayer {
    fn seek(&mut self, time: Timecode);
    fn play(&mut self, rate: f64);
    fn pause(&mut self);
    /// Step one frame; with `ignore_bounds` the step may pass the media ends.
    fn step_frame(&mut self, direction: FrameDirection, ignore_bounds: bool);
    fn current_time(&self) -> Timecode;
    fn duration(&self) -> Option<Timecode>;
}

/// A player without media, driven by explicit position changes.
///
/// Used for headless replays and tests. Playback does not advance the
/// position on its own.
#[derive(Debug, Clone)]
pub struct ScriptedPlayer {
    position: Timecode,
    rate: f64,
    playing: bool,
    frame_rate: f64,
    duration: Option<Timecode>,
}

impl ScriptedPlayer {
    pub fn new(frame_rate: f64, duration: Option<Timecode>) -> Self {
        Self {
            position: Timecode::ZERO,
            rate: 1.0,
            playing: false,
            frame_rate,
            duration,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    fn clamp(&self, time: Timecode) -> Timecode {
        let upper = self.duration.map_or(f64::INFINITY, Timecode::seconds);
        Timecode(time.seconds().clamp(0.0, upper))
    }
}

impl MediaPlayer for ScriptedPlayer {
    fn seek(&mut self, time: Timecode) {
        self.position = self.clamp(time);
    }

    fn play(&mut self, rate: f64) {
        self.rate = rate;
        self.playing = true;
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn step_frame(&mut self, direction: FrameDirection, ignore_bounds: bool) {
        self.playing = false;
        let stepped = self.position.offset_frames(direction.sign(), self.frame_rate);
        self.position = if ignore_bounds {
            stepped
        } else {
            self.clamp(stepped)
        };
    }

    fn current_time(&self) -> Timecode {
        self.position
    }

    fn duration(&self) -> Option<Timecode> {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_clamps_to_media() {
        let mut player = ScriptedPlayer::new(30.0, Some(Timecode(60.0)));
        player.seek(Timecode(75.0));
        assert_eq!(player.current_time(), Timecode(60.0));
        player.seek(Timecode(-1.0));
        assert_eq!(player.current_time(), Timecode::ZERO);
    }

    #[test]
    fn test_step_frame_pauses() {
        let mut player = ScriptedPlayer::new(25.0, None);
        player.seek(Timecode(1.0));
        player.play(4.0);
        player.step_frame(FrameDirection::Forward, false);
        assert!(!player.is_playing());
        assert!((player.current_time().seconds() - 1.04).abs() < 1e-9);
    }
}
