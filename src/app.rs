// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state.
//!
//! This module contains the application structure that owns the workflow
//! state machine and its collaborators, feeding player notifications in and
//! carrying the returned effects out.

use crate::config::TaggerConfig;
use crate::error::WorkflowError;
use crate::io::persistence::MatchStore;
use crate::io::player::MediaPlayer;
use crate::io::serialization::{ReplayScript, ScriptStep};
use crate::models::ids::EntityId;
use crate::models::match_record::MatchRecord;
use crate::rules::audit::Finding;
use crate::workflow::effect::{Effect, PersistRequest};
use crate::workflow::intent::Intent;
use crate::workflow::machine::TaggingStateMachine;
use crate::workflow::session::Phase;

/// Tally of a replayed script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplaySummary {
    pub applied: usize,
    /// Step number and reason for every rejected intent.
    pub rejected: Vec<(usize, String)>,
}

/// Main application state.
pub struct TaggerApp<P: MediaPlayer, S: MatchStore> {
    machine: TaggingStateMachine,
    player: P,
    store: S,

    /// Writes the store refused; retried on request
    failed_writes: Vec<PersistRequest>,
}

impl<P: MediaPlayer, S: MatchStore> TaggerApp<P, S> {
    pub fn new(config: TaggerConfig, player: P, store: S) -> Self {
        Self {
            machine: TaggingStateMachine::new(config),
            player,
            store,
            failed_writes: Vec::new(),
        }
    }

    pub fn machine(&self) -> &TaggingStateMachine {
        &self.machine
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn phase(&self) -> Phase {
        self.machine.phase()
    }

    pub fn record(&self) -> Option<&MatchRecord> {
        self.machine.record()
    }

    pub fn audit(&self) -> Vec<Finding> {
        self.machine.audit()
    }

    pub fn failed_write_count(&self) -> usize {
        self.failed_writes.len()
    }

    /// Issue one operator intent and carry out its effects.
    pub fn handle(&mut self, intent: Intent) -> Result<Vec<Effect>, WorkflowError> {
        if intent.reads_media_time() {
            self.sync_clock()?;
        }
        let effects = self.machine.dispatch(intent)?;
        self.execute(&effects);
        Ok(effects)
    }

    /// Report the player's position and duration to the workflow.
    pub fn sync_clock(&mut self) -> Result<(), WorkflowError> {
        if let Some(duration) = self.player.duration() {
            if self.machine.session().clock.duration != Some(duration) {
                self.machine.dispatch(Intent::DurationKnown(duration))?;
            }
        }
        let time = self.player.current_time();
        self.machine.dispatch(Intent::TimeChanged(time))?;
        Ok(())
    }

    fn execute(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::Seek(time) => {
                    self.player.seek(*time);
                    // Players report their position once a seek lands.
                    if let Err(e) = self.sync_clock() {
                        log::error!("Failed to report position after seek: {}", e);
                    }
                }
                Effect::Play { rate } => self.player.play(*rate),
                Effect::Pause => self.player.pause(),
                Effect::StepFrame {
                    direction,
                    ignore_bounds,
                } => self.player.step_frame(*direction, *ignore_bounds),
                Effect::Persist(request) => self.write(request.clone()),
                Effect::Prompt(choice) => log::info!(
                    "Forced or unforced? {} wins {} on shot {}",
                    choice.winner,
                    choice.rally_id,
                    choice.ending_shot
                ),
                Effect::ShotsPruned { rally_id, count } => {
                    log::info!("Removed {} shots after the error in {}", count, rally_id)
                }
                Effect::PhaseChanged(phase) => log::debug!("Now in {}", phase),
                Effect::SessionComplete => log::info!("Session complete"),
            }
        }
    }

    fn write(&mut self, request: PersistRequest) {
        // A queued write this one replaces must never be retried over it.
        let (superseded, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.failed_writes)
            .into_iter()
            .partition(|earlier| request.supersedes(earlier));
        self.failed_writes = kept;
        for earlier in superseded {
            log::info!("Dropped refused write of {}, replaced by a newer one", earlier.key());
            self.acknowledge(earlier.key());
        }

        let key = request.key().clone();
        match self.store.write(&request) {
            Ok(()) => self.acknowledge(&key),
            Err(e) => {
                log::error!("Failed to persist {}: {:#}", key, e);
                self.failed_writes.push(request);
            }
        }
    }

    fn acknowledge(&mut self, key: &EntityId) {
        if let Err(e) = self.machine.dispatch(Intent::WriteCompleted(key.clone())) {
            log::error!("Failed to acknowledge write: {}", e);
        }
    }

    /// Retry refused writes in order; returns how many are still failing.
    pub fn retry_failed_writes(&mut self) -> usize {
        let pending = std::mem::take(&mut self.failed_writes);
        for request in pending {
            self.write(request);
        }
        self.failed_writes.len()
    }

    /// Replay a script step by step.
    ///
    /// Rejected intents are logged and skipped, as an operator would retry.
    pub fn replay(&mut self, script: &ReplayScript) -> ReplaySummary {
        let mut summary = ReplaySummary::default();
        if let Some(duration) = script.media_duration {
            if let Err(e) = self.machine.dispatch(Intent::DurationKnown(duration)) {
                log::error!("Failed to set media duration: {}", e);
            }
        }

        for (number, step) in script.steps.iter().enumerate() {
            match step {
                ScriptStep::At(time) => self.player.seek(*time),
                ScriptStep::Do(intent) => match self.handle(intent.clone()) {
                    Ok(_) => summary.applied += 1,
                    Err(e) => summary.rejected.push((number + 1, e.to_string())),
                },
            }
        }

        log::info!(
            "Replay finished in {}: {} intents applied, {} rejected",
            self.phase(),
            summary.applied,
            summary.rejected.len()
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::persistence::MemoryStore;
    use crate::io::player::ScriptedPlayer;
    use crate::models::match_record::MatchResult;
    use crate::models::player::Side;
    use crate::models::score::ScorePair;
    use crate::models::shot::ShotQuality;
    use crate::util::timecode::{FrameDirection, Timecode};
    use crate::workflow::intent::FrameworkInput;
    use anyhow::bail;

    fn app() -> TaggerApp<ScriptedPlayer, MemoryStore> {
        TaggerApp::new(
            TaggerConfig::default(),
            ScriptedPlayer::new(30.0, Some(Timecode(300.0))),
            MemoryStore::new(),
        )
    }

    fn init() -> Intent {
        Intent::InitializeFramework(FrameworkInput {
            player1: "ma-long".to_string(),
            player2: "fan-zhendong".to_string(),
            first_server: Side::Player2,
            best_of: 1,
            first_serve_time: Timecode(10.0),
            media_file: Some("final.mp4".to_string()),
        })
    }

    fn at(seconds: f64) -> ScriptStep {
        ScriptStep::At(Timecode(seconds))
    }

    fn act(intent: Intent) -> ScriptStep {
        ScriptStep::Do(intent)
    }

    fn answer(stroke: &str, quality: ShotQuality) -> Vec<ScriptStep> {
        let mut steps = vec![
            act(Intent::AnswerStroke(stroke.to_string())),
            act(Intent::AnswerQuality(quality)),
        ];
        if quality.is_in_play() {
            steps.push(act(Intent::AnswerLanding("short forehand".to_string())));
        }
        steps
    }

    fn two_rally_script() -> ReplayScript {
        let mut steps = vec![
            act(init()),
            at(11.0),
            act(Intent::MarkContact),
            at(12.0),
            act(Intent::EndRally),
            act(Intent::Confirm),
            at(30.0),
            act(Intent::MarkNextServe),
            at(31.0),
            act(Intent::MarkContact),
            at(31.8),
            act(Intent::MarkContact),
            at(33.0),
            act(Intent::EndRally),
            act(Intent::Confirm),
            act(Intent::EndSet),
            act(Intent::SubmitResult(MatchResult {
                winner: Side::Player2,
                set_scores: vec![ScorePair::new(0, 2)],
                notes: None,
            })),
        ];
        // Rally 1: player 1 fails the return.
        steps.extend(answer("pendulum", ShotQuality::Good));
        steps.extend(answer("push", ShotQuality::InNet));
        steps.push(act(Intent::Confirm));
        // Rally 2: player 2 wins with the third ball.
        steps.extend(answer("reverse", ShotQuality::Good));
        steps.extend(answer("flick", ShotQuality::Weak));
        steps.extend(answer("loop", ShotQuality::Good));
        steps.push(act(Intent::Confirm));
        ReplayScript {
            media_duration: None,
            steps,
        }
    }

    #[test]
    fn test_replay_end_to_end() {
        let mut app = app();
        let summary = app.replay(&two_rally_script());

        assert!(summary.rejected.is_empty(), "{:?}", summary.rejected);
        assert_eq!(app.phase(), Phase::Complete);
        assert!(app.machine().session().outstanding_writes.is_empty());

        let record = app.record().unwrap();
        assert_eq!(record.sets[0].final_score, ScorePair::new(0, 2));
        // Two points do not finish a set, so no winner can be derived.
        assert_eq!(
            app.audit(),
            vec![Finding::ResultMismatch {
                reported: Side::Player2,
                derived: None,
            }]
        );

        // The store holds the same match the workflow built.
        assert_eq!(app.store().assemble().as_ref(), Some(record));
    }

    #[test]
    fn test_rejected_steps_are_reported() {
        let mut app = app();
        let script = ReplayScript {
            media_duration: None,
            steps: vec![
                act(Intent::Confirm),
                act(init()),
                at(400.0),
                act(Intent::MarkContact),
                act(Intent::EndSet),
            ],
        };
        let summary = app.replay(&script);

        assert_eq!(summary.applied, 2);
        let steps: Vec<usize> = summary.rejected.iter().map(|(step, _)| *step).collect();
        assert_eq!(steps, vec![1, 5]);

        // The scripted player clamps to the media, so the contact lands at the end.
        let rally = &app.record().unwrap().sets[0].rallies[0];
        assert_eq!(rally.last_shot_time(), Some(Timecode(300.0)));
    }

    /// Refuses rally writes until told otherwise.
    struct FlakyStore {
        inner: MemoryStore,
        refuse_rallies: bool,
    }

    impl MatchStore for FlakyStore {
        fn write(&mut self, request: &PersistRequest) -> anyhow::Result<()> {
            if self.refuse_rallies && matches!(request, PersistRequest::Rally { .. }) {
                bail!("store offline");
            }
            self.inner.write(request)
        }
    }

    fn flaky_app() -> TaggerApp<ScriptedPlayer, FlakyStore> {
        let store = FlakyStore {
            inner: MemoryStore::new(),
            refuse_rallies: true,
        };
        TaggerApp::new(
            TaggerConfig::default(),
            ScriptedPlayer::new(30.0, None),
            store,
        )
    }

    #[test]
    fn test_failed_write_blocks_confirm_until_retried() {
        let mut app = flaky_app();
        app.handle(init()).unwrap();
        app.player_mut().seek(Timecode(11.0));
        app.handle(Intent::MarkContact).unwrap();
        app.handle(Intent::EndRally).unwrap();
        app.handle(Intent::Confirm).unwrap();
        assert_eq!(app.failed_write_count(), 1);

        app.handle(Intent::EndSet).unwrap();
        app.handle(Intent::SubmitResult(MatchResult {
            winner: Side::Player1,
            set_scores: Vec::new(),
            notes: None,
        }))
        .unwrap();
        app.handle(Intent::AnswerStroke("serve".to_string())).unwrap();
        app.handle(Intent::AnswerQuality(ShotQuality::Good)).unwrap();
        app.handle(Intent::AnswerLanding("long".to_string())).unwrap();
        app.handle(Intent::AnswerStroke("block".to_string())).unwrap();
        app.handle(Intent::AnswerQuality(ShotQuality::Wide)).unwrap();

        assert!(matches!(
            app.handle(Intent::Confirm),
            Err(WorkflowError::WriteInFlight(_))
        ));

        app.store.refuse_rallies = false;
        assert_eq!(app.retry_failed_writes(), 0);
        app.handle(Intent::Confirm).unwrap();
        assert_eq!(app.phase(), Phase::Complete);
    }

    #[test]
    fn test_newer_rally_write_replaces_refused_one() {
        let mut app = flaky_app();
        app.handle(init()).unwrap();
        app.player_mut().seek(Timecode(11.0));
        app.handle(Intent::MarkContact).unwrap();
        app.handle(Intent::EndRally).unwrap();
        app.handle(Intent::Confirm).unwrap();
        assert_eq!(app.failed_write_count(), 1);

        let rally = app.record().unwrap().sets[0].rallies[0].clone();
        let nudge = Intent::NudgeShot {
            rally_id: rally.id.clone(),
            shot_id: rally.shots[1].id.clone(),
            direction: FrameDirection::Forward,
            bounded: true,
        };

        // Refused again: the newer snapshot takes the queued one's place.
        app.handle(nudge.clone()).unwrap();
        assert_eq!(app.failed_write_count(), 1);
        assert!(app.machine().session().write_pending(&rally.id));

        // Accepted: nothing older is left to retry, and the guard clears.
        app.store.refuse_rallies = false;
        app.handle(nudge).unwrap();
        assert_eq!(app.failed_write_count(), 0);
        assert!(!app.machine().session().write_pending(&rally.id));

        assert_eq!(app.retry_failed_writes(), 0);
        let live = &app.record().unwrap().sets[0].rallies[0];
        assert_eq!(app.store().inner.rally(&rally.id), Some(live));
        assert_ne!(live.shots[1].time, Timecode(11.0));
    }
}
