// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! The tagging workflow state machine.
//!
//! Every operator intent goes through [`TaggingStateMachine::dispatch`].
//! An intent is applied to a working copy of the machine and only committed
//! when it succeeds, so a rejected intent leaves the session, the match
//! record and the correction history exactly as they were. Collaborators
//! are never called directly; the returned [`Effect`]s describe what the
//! caller must do.

use super::effect::{Effect, PendingChoice, PersistRequest};
use super::intent::{FrameworkInput, Intent};
use super::session::{BoundaryStep, Cursor, DetailStep, Phase, Question, WorkflowSession};
use crate::config::TaggerConfig;
use crate::correction::{Correction, CorrectionEngine};
use crate::error::{CorrectionError, RulesError, WorkflowError};
use crate::models::framework::MatchFramework;
use crate::models::ids::{EntityId, IdAllocator};
use crate::models::match_record::{MatchRecord, MatchResult};
use crate::models::outcome::{ErrorJudgment, RallyOutcome};
use crate::models::player::Players;
use crate::models::rally::{CommittedOutcome, Rally, ServeAssignment};
use crate::models::score::ScorePair;
use crate::models::set::SetRecord;
use crate::models::shot::{Shot, ShotQuality};
use crate::rules::audit::{audit_record, Finding};
use crate::rules::{rally_outcome, serve_rotation};
use crate::util::timecode::{FrameDirection, Timecode};

/// Outcome derived for the rally under detail capture, not yet confirmed.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RallyDraft {
    serve: ServeAssignment,
    score_before: ScorePair,
    outcome: RallyOutcome,
}

#[derive(Debug, Clone)]
pub struct TaggingStateMachine {
    config: TaggerConfig,
    session: WorkflowSession,
    record: Option<MatchRecord>,
    draft: Option<RallyDraft>,
    ids: IdAllocator,
    corrections: CorrectionEngine,
}

impl TaggingStateMachine {
    pub fn new(config: TaggerConfig) -> Self {
        let corrections = CorrectionEngine::new(config.history_depth);
        Self {
            config,
            session: WorkflowSession::new(),
            record: None,
            draft: None,
            ids: IdAllocator::new(),
            corrections,
        }
    }

    pub fn config(&self) -> &TaggerConfig {
        &self.config
    }

    pub fn session(&self) -> &WorkflowSession {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase
    }

    pub fn record(&self) -> Option<&MatchRecord> {
        self.record.as_ref()
    }

    pub fn pending_choice(&self) -> Option<&PendingChoice> {
        self.session.pending_choice.as_ref()
    }

    /// Outcome derived for the rally at end-of-rally, before confirmation.
    pub fn draft_outcome(&self) -> Option<RallyOutcome> {
        self.draft.map(|draft| draft.outcome)
    }

    /// The rally the cursor points at.
    pub fn current_rally(&self) -> Option<&Rally> {
        let cursor = self.session.cursor?;
        self.record
            .as_ref()?
            .sets
            .get(cursor.set)?
            .rallies
            .get(cursor.rally)
    }

    pub fn can_undo(&self) -> bool {
        self.corrections.can_undo()
    }

    /// Whether a `Confirm` would be accepted right now.
    pub fn can_confirm(&self) -> bool {
        let in_flight = self
            .current_rally()
            .is_some_and(|rally| self.session.write_pending(&rally.id));
        match self.session.phase {
            Phase::BoundaryCapture(BoundaryStep::Checkpoint) => !in_flight,
            Phase::DetailCapture(DetailStep::EndOfRally) => {
                !in_flight && self.draft.is_some() && self.session.pending_choice.is_none()
            }
            Phase::DetailCapture(DetailStep::RallyReview) => true,
            _ => false,
        }
    }

    /// Consistency findings for the record captured so far.
    pub fn audit(&self) -> Vec<Finding> {
        self.record
            .as_ref()
            .map(|record| audit_record(record, &self.config.service, &self.config.scoring))
            .unwrap_or_default()
    }

    /// Apply one intent atomically.
    pub fn dispatch(&mut self, intent: Intent) -> Result<Vec<Effect>, WorkflowError> {
        // Notifications cannot fail, so they skip the working copy.
        if intent.is_notification() {
            self.notify(&intent);
            return Ok(Vec::new());
        }

        let before = self.session.phase;
        let mut next = self.clone();

        match next.apply(&intent) {
            Ok(mut effects) => {
                let after = next.session.phase;
                if after != before {
                    log::info!("{} --{}--> {}", before, intent.name(), after);
                    effects.push(Effect::PhaseChanged(after));
                } else {
                    log::info!("Accepted {} in {}", intent.name(), before);
                }
                for effect in &effects {
                    log::debug!("Effect: {:?}", effect);
                }
                *self = next;
                Ok(effects)
            }
            Err(err) => {
                log::warn!("Rejected {} in {}: {}", intent.name(), before, err);
                Err(err)
            }
        }
    }

    fn not_permitted(&self, intent: &Intent) -> WorkflowError {
        WorkflowError::NotPermitted {
            state: self.session.phase.to_string(),
            intent: intent.name().to_string(),
        }
    }

    fn notify(&mut self, intent: &Intent) {
        match intent {
            Intent::TimeChanged(time) => {
                self.session.clock.report(*time, self.config.seek_tolerance);
            }
            Intent::DurationKnown(duration) => {
                self.session.clock.duration = Some(*duration);
            }
            Intent::WriteCompleted(id) => {
                if !self.session.write_acknowledged(id) {
                    log::debug!("Acknowledgement for {} matched no outstanding write", id);
                }
            }
            _ => {}
        }
    }

    fn apply(&mut self, intent: &Intent) -> Result<Vec<Effect>, WorkflowError> {
        let mut fx = Vec::new();
        match intent {
            Intent::Abandon => self.abandon(&mut fx),
            Intent::InitializeFramework(_) if self.session.phase != Phase::Setup => {
                // Re-initializing starts over with a fresh session.
                self.abandon(&mut fx);
                self.on_setup(intent, &mut fx)?;
            }
            _ => match self.session.phase {
                Phase::Setup => self.on_setup(intent, &mut fx)?,
                Phase::BoundaryCapture(step) => {
                    self.with_record(|machine, record| machine.on_boundary(step, intent, record, &mut fx))?
                }
                Phase::DetailCapture(step) => {
                    self.with_record(|machine, record| machine.on_detail(step, intent, record, &mut fx))?
                }
                Phase::Complete => return Err(self.not_permitted(intent)),
            },
        }
        Ok(fx)
    }

    /// Run `f` with the match record detached from the machine.
    fn with_record<F>(&mut self, f: F) -> Result<(), WorkflowError>
    where
        F: FnOnce(&mut Self, &mut MatchRecord) -> Result<(), WorkflowError>,
    {
        let mut record = self.record.take().ok_or(WorkflowError::CursorInvalid)?;
        let result = f(self, &mut record);
        self.record = Some(record);
        result
    }

    fn seek(&mut self, time: Timecode, fx: &mut Vec<Effect>) {
        self.session.clock.request_seek(time);
        fx.push(Effect::Seek(time));
    }

    fn persist(&mut self, request: PersistRequest, fx: &mut Vec<Effect>) {
        self.session.write_issued(request.key());
        fx.push(Effect::Persist(request));
    }

    fn abandon(&mut self, fx: &mut Vec<Effect>) {
        if let Some(record) = &self.record {
            log::warn!(
                "Abandoning session for {} with {} rallies captured",
                record.framework.id,
                record.rally_count()
            );
        }
        fx.push(Effect::Pause);
        // Identifiers keep counting so a new session never reuses stored keys.
        let ids = std::mem::take(&mut self.ids);
        let clock = std::mem::take(&mut self.session.clock);
        *self = Self::new(self.config.clone());
        self.ids = ids;
        self.session.clock = clock;
    }

    // ---- Setup ----

    fn on_setup(&mut self, intent: &Intent, fx: &mut Vec<Effect>) -> Result<(), WorkflowError> {
        let Intent::InitializeFramework(input) = intent else {
            return Err(self.not_permitted(intent));
        };
        let framework = self.build_framework(input)?;
        let first_serve_time = framework.first_serve_time;

        let mut record = MatchRecord::new(framework.clone());
        let mut set = SetRecord::new(
            self.ids.set(),
            1,
            serve_rotation::set_first_server(framework.first_server, 1),
        );
        let mut rally = Rally::new(self.ids.rally(), 1);
        rally.push_shot(self.ids.shot(), first_serve_time);
        set.rallies.push(rally);
        record.sets.push(set);

        log::info!(
            "Initialized {}: {} vs {}, best of {}, first serve at {}",
            framework.id,
            framework.players.player1,
            framework.players.player2,
            framework.best_of,
            first_serve_time
        );

        self.persist(PersistRequest::Framework(framework), fx);
        fx.push(Effect::Pause);
        self.seek(first_serve_time, fx);
        self.session.phase = Phase::BoundaryCapture(BoundaryStep::Tagging);
        self.point_at_tail(&record);
        self.record = Some(record);
        Ok(())
    }

    fn build_framework(&mut self, input: &FrameworkInput) -> Result<MatchFramework, WorkflowError> {
        if let Some(duration) = self.session.clock.duration {
            if input.first_serve_time > duration {
                return Err(WorkflowError::BeyondMedia {
                    time: input.first_serve_time,
                    duration,
                });
            }
        }
        let mut framework = MatchFramework::new(
            self.ids.framework(),
            Players::new(input.player1.clone(), input.player2.clone()),
            input.first_server,
            input.best_of,
            input.first_serve_time,
        )?;
        framework.media_file = input.media_file.clone();
        Ok(framework)
    }

    // ---- Boundary capture ----

    fn on_boundary(
        &mut self,
        step: BoundaryStep,
        intent: &Intent,
        record: &mut MatchRecord,
        fx: &mut Vec<Effect>,
    ) -> Result<(), WorkflowError> {
        use BoundaryStep::*;

        match (step, intent) {
            (_, Intent::NudgeShot { .. } | Intent::DeleteShot { .. } | Intent::UndoCorrection) => {
                self.boundary_correction(step, intent, record, fx)
            }
            (Tagging, Intent::MarkContact) => {
                let now = self.session.clock.now()?;
                let shot_id = self.ids.shot();
                let rally = tail_rally(record)?;
                if rally.last_shot_time().is_some_and(|last| now < last) {
                    log::warn!("Contact at {} precedes the previous contact in {}", now, rally.id);
                }
                let index = rally.push_shot(shot_id, now).index;
                log::info!("Marked shot {} of {} at {}", index, rally.id, now);
                self.point_at_tail(record);
                Ok(())
            }
            (Tagging, Intent::EndRally) => {
                let now = self.session.clock.now()?;
                let rally = tail_rally(record)?;
                if rally.shots.is_empty() {
                    return Err(RulesError::EmptyRally.into());
                }
                rally.end_time = Some(now);
                log::info!("Ended {} at {} with {} shots", rally.id, now, rally.shot_count());
                fx.push(Effect::Pause);
                self.session.phase = Phase::BoundaryCapture(Checkpoint);
                Ok(())
            }
            (Checkpoint, Intent::Confirm) => {
                let set_id = tail_set(record)?.id.clone();
                let rally = tail_rally(record)?.clone();
                if self.session.write_pending(&rally.id) {
                    return Err(WorkflowError::WriteInFlight(rally.id));
                }
                self.corrections.forget_rally(&rally.id);
                self.persist(PersistRequest::Rally { set_id, rally }, fx);
                fx.push(Effect::Play {
                    rate: self.config.fast_forward_rate,
                });
                self.session.phase = Phase::BoundaryCapture(FastForward);
                Ok(())
            }
            (Checkpoint, Intent::Redo) => {
                let rally = tail_rally(record)?;
                let restart = rally.first_shot_time();
                rally.shots.clear();
                rally.end_time = None;
                let rally_id = rally.id.clone();
                self.corrections.forget_rally(&rally_id);
                log::info!("Re-tagging {}", rally_id);
                if let Some(time) = restart {
                    self.seek(time, fx);
                }
                self.session.phase = Phase::BoundaryCapture(Tagging);
                self.point_at_tail(record);
                Ok(())
            }
            (FastForward, Intent::MarkNextServe) => {
                let now = self.session.clock.now()?;
                let rally_id = self.ids.rally();
                let shot_id = self.ids.shot();
                let set = tail_set(record)?;
                let mut rally = Rally::new(rally_id, set.rallies.len() as u32 + 1);
                rally.push_shot(shot_id, now);
                log::info!("Set {} rally {} served at {}", set.number, rally.index, now);
                set.rallies.push(rally);
                fx.push(Effect::Play { rate: 1.0 });
                self.session.phase = Phase::BoundaryCapture(Tagging);
                self.point_at_tail(record);
                Ok(())
            }
            (FastForward, Intent::EndSet) => self.close_set(record, false, fx),
            (FastForward, Intent::EndMatch) => self.close_set(record, true, fx),
            (AwaitingResult, Intent::SubmitResult(result)) => self.begin_detail(record, result, fx),
            _ => Err(self.not_permitted(intent)),
        }
    }

    fn close_set(
        &mut self,
        record: &mut MatchRecord,
        end_match: bool,
        fx: &mut Vec<Effect>,
    ) -> Result<(), WorkflowError> {
        let match_id = record.framework.id.clone();
        let (empty, number) = {
            let set = tail_set(record)?;
            (set.rallies.is_empty(), set.number)
        };
        if empty {
            // Only the set opened by a previous end-set may be dropped.
            if !end_match || record.sets.len() < 2 {
                return Err(WorkflowError::EmptySet(number));
            }
            record.sets.pop();
            log::info!("Dropped empty set {}", number);
        } else {
            let set = tail_set(record)?;
            set.recompute_final_score();
            let set = set.clone();
            log::info!("Closed set {} after {} rallies", set.number, set.rallies.len());
            self.persist(PersistRequest::Set { match_id, set }, fx);
        }

        let number = tail_set(record)?.number;
        if end_match || number >= record.framework.best_of {
            fx.push(Effect::Pause);
            self.session.phase = Phase::BoundaryCapture(BoundaryStep::AwaitingResult);
            self.session.cursor = None;
            return Ok(());
        }

        let next = number + 1;
        let first_server = serve_rotation::set_first_server(record.framework.first_server, next);
        record.sets.push(SetRecord::new(self.ids.set(), next, first_server));
        log::info!("Opened set {}, {} serves first", next, first_server);
        Ok(())
    }

    fn begin_detail(
        &mut self,
        record: &mut MatchRecord,
        result: &MatchResult,
        fx: &mut Vec<Effect>,
    ) -> Result<(), WorkflowError> {
        if record.sets.iter().all(|set| set.rallies.is_empty()) {
            return Err(WorkflowError::EmptySet(1));
        }
        record.result = Some(result.clone());
        let match_id = record.framework.id.clone();
        self.persist(
            PersistRequest::FinalResult {
                match_id,
                result: result.clone(),
            },
            fx,
        );
        self.corrections.clear();
        log::info!(
            "Result recorded, {} wins; detail capture of {} rallies begins",
            result.winner,
            record.rally_count()
        );
        let cursor = Cursor {
            set: 0,
            rally: 0,
            shot: 1,
        };
        self.enter_shot(record, cursor, Question::Stroke, fx)
    }

    fn boundary_correction(
        &mut self,
        step: BoundaryStep,
        intent: &Intent,
        record: &mut MatchRecord,
        fx: &mut Vec<Effect>,
    ) -> Result<(), WorkflowError> {
        // The rally being tagged is persisted as a whole at the checkpoint.
        let in_progress = match step {
            BoundaryStep::Tagging | BoundaryStep::Checkpoint => {
                tail_rally(record).ok().map(|rally| rally.id.clone())
            }
            _ => None,
        };

        let rally_id = match intent {
            Intent::NudgeShot {
                rally_id,
                shot_id,
                direction,
                bounded,
            } => {
                let (_, rally) = find_rally(record, rally_id)?;
                let time =
                    self.corrections
                        .nudge(rally, shot_id, *direction, self.config.frame_rate, *bounded)?;
                self.seek(time, fx);
                rally_id.clone()
            }
            Intent::DeleteShot { rally_id, shot_id } => {
                let (_, rally) = find_rally(record, rally_id)?;
                self.corrections.delete(rally, shot_id)?;
                if in_progress.as_ref() != Some(rally_id) {
                    self.persist(
                        PersistRequest::DeleteShot {
                            rally_id: rally_id.clone(),
                            shot_id: shot_id.clone(),
                        },
                        fx,
                    );
                }
                rally_id.clone()
            }
            Intent::UndoCorrection => {
                let target = self
                    .corrections
                    .last_target()
                    .cloned()
                    .ok_or(CorrectionError::NothingToUndo)?;
                let (_, rally) = find_rally(record, &target)?;
                self.corrections.undo(rally)?;
                target
            }
            _ => return Err(self.not_permitted(intent)),
        };

        if in_progress.as_ref() != Some(&rally_id) {
            let (set_pos, rally) = find_rally(record, &rally_id)?;
            let rally = rally.clone();
            let set_id = record.sets[set_pos].id.clone();
            self.persist(PersistRequest::Rally { set_id, rally }, fx);
        }
        if step == BoundaryStep::Tagging {
            self.point_at_tail(record);
        }
        Ok(())
    }

    fn point_at_tail(&mut self, record: &MatchRecord) {
        self.session.cursor = record.sets.len().checked_sub(1).and_then(|set| {
            let rallies = &record.sets[set].rallies;
            rallies.len().checked_sub(1).map(|rally| Cursor {
                set,
                rally,
                shot: rallies[rally].shot_count() as u32,
            })
        });
    }

    // ---- Detail capture ----

    fn on_detail(
        &mut self,
        step: DetailStep,
        intent: &Intent,
        record: &mut MatchRecord,
        fx: &mut Vec<Effect>,
    ) -> Result<(), WorkflowError> {
        use DetailStep::*;

        let cursor = self.session.cursor.ok_or(WorkflowError::CursorInvalid)?;
        match (step, intent) {
            (ShotQuestions(Question::Stroke), Intent::AnswerStroke(stroke)) => {
                let stroke = non_empty(stroke, "stroke")?;
                shot_at(record, cursor)?.detail.stroke = Some(stroke);
                self.session.phase = Phase::DetailCapture(ShotQuestions(Question::Quality));
                Ok(())
            }
            (ShotQuestions(Question::Quality), Intent::AnswerQuality(quality)) => {
                self.answer_quality(record, cursor, *quality, fx)
            }
            (ShotQuestions(Question::Landing), Intent::AnswerLanding(landing)) => {
                let landing = non_empty(landing, "landing")?;
                shot_at(record, cursor)?.detail.landing = Some(landing);
                let count = rally_at(record, cursor)?.shot_count() as u32;
                if cursor.shot < count {
                    let next = Cursor {
                        shot: cursor.shot + 1,
                        ..cursor
                    };
                    self.enter_shot(record, next, Question::Stroke, fx)
                } else {
                    self.finish_rally(record, cursor, fx)
                }
            }
            (EndOfRally, Intent::StepEndTime(direction)) => {
                self.step_end_time(record, cursor, *direction, fx)
            }
            (EndOfRally, Intent::ResolveError(judgment)) => self.resolve_error(*judgment),
            (EndOfRally, Intent::Confirm) => self.confirm_rally(record, cursor, fx),
            (EndOfRally, Intent::Redo) => {
                let set_id = record
                    .sets
                    .get(cursor.set)
                    .map(|set| set.id.clone())
                    .ok_or(WorkflowError::CursorInvalid)?;
                let rally = rally_at(record, cursor)?;
                let restored = self.corrections.restore_pruned(rally)?.is_some();
                rally.clear_judgments();
                log::info!("Re-judging {}", rally.id);
                if restored {
                    let rally = rally.clone();
                    self.persist(PersistRequest::Rally { set_id, rally }, fx);
                }
                self.draft = None;
                self.session.pending_choice = None;
                let first = Cursor { shot: 1, ..cursor };
                self.enter_shot(record, first, Question::Stroke, fx)
            }
            (EndOfRally, Intent::UndoCorrection) => self.undo_in_detail(record, cursor, intent, fx),
            (
                EndOfRally,
                Intent::NudgeShot {
                    rally_id,
                    shot_id,
                    direction,
                    bounded,
                },
            ) => {
                let set_id = record
                    .sets
                    .get(cursor.set)
                    .map(|set| set.id.clone())
                    .ok_or(WorkflowError::CursorInvalid)?;
                let rally = rally_at(record, cursor)?;
                if rally.id != *rally_id {
                    return Err(self.not_permitted(intent));
                }
                let time =
                    self.corrections
                        .nudge(rally, shot_id, *direction, self.config.frame_rate, *bounded)?;
                let rally = rally.clone();
                self.seek(time, fx);
                self.persist(PersistRequest::Rally { set_id, rally }, fx);
                Ok(())
            }
            (RallyReview, Intent::Confirm) => self.advance(record, cursor, fx),
            (RallyReview, Intent::ReplayRally) => {
                let start = rally_at(record, cursor)?
                    .first_shot_time()
                    .ok_or(WorkflowError::CursorInvalid)?;
                self.seek(start, fx);
                fx.push(Effect::Play { rate: 1.0 });
                Ok(())
            }
            _ => Err(self.not_permitted(intent)),
        }
    }

    fn enter_shot(
        &mut self,
        record: &MatchRecord,
        cursor: Cursor,
        question: Question,
        fx: &mut Vec<Effect>,
    ) -> Result<(), WorkflowError> {
        let time = record
            .sets
            .get(cursor.set)
            .and_then(|set| set.rallies.get(cursor.rally))
            .and_then(|rally| rally.shot_at(cursor.shot))
            .map(|shot| shot.time)
            .ok_or(WorkflowError::CursorInvalid)?;
        self.session.cursor = Some(cursor);
        self.session.phase = Phase::DetailCapture(DetailStep::ShotQuestions(question));
        fx.push(Effect::Pause);
        self.seek(time, fx);
        Ok(())
    }

    fn answer_quality(
        &mut self,
        record: &mut MatchRecord,
        cursor: Cursor,
        quality: ShotQuality,
        fx: &mut Vec<Effect>,
    ) -> Result<(), WorkflowError> {
        let shot = shot_at(record, cursor)?;
        if quality == ShotQuality::Let && !shot.is_serve() {
            return Err(WorkflowError::InvalidAnswer(format!(
                "only the serve can be a let, shot {} is not",
                shot.index
            )));
        }
        shot.quality = Some(quality);

        if quality.ends_rally() {
            self.finish_rally(record, cursor, fx)
        } else {
            self.session.phase = Phase::DetailCapture(DetailStep::ShotQuestions(Question::Landing));
            Ok(())
        }
    }

    /// Derive the outcome of the rally at `cursor` and move to end-of-rally.
    fn finish_rally(
        &mut self,
        record: &mut MatchRecord,
        cursor: Cursor,
        fx: &mut Vec<Effect>,
    ) -> Result<(), WorkflowError> {
        let set = record.sets.get(cursor.set).ok_or(WorkflowError::CursorInvalid)?;
        let score_before = set.rallies[..cursor.rally.min(set.rallies.len())]
            .iter()
            .rev()
            .find_map(|rally| rally.committed.map(|c| c.score_after))
            .unwrap_or(ScorePair::LOVE_ALL);
        let serve = serve_rotation::server(set.first_server, score_before, &self.config.service);

        let rally = rally_at(record, cursor)?;
        let outcome = rally_outcome::derive(&rally.shots, serve.server)?;
        let ending_index = match outcome {
            RallyOutcome::Let => 1,
            RallyOutcome::Point(point) => point.ending_shot,
        };
        let ending = rally.shot_at(ending_index).ok_or(WorkflowError::CursorInvalid)?;
        let ending_time = ending.time;
        if ending.quality.is_some_and(ShotQuality::ends_rally) {
            let ending_id = ending.id.clone();
            if let Some(pruned) = self.corrections.prune_after_error(rally, &ending_id)? {
                fx.push(Effect::ShotsPruned {
                    rally_id: pruned.rally_id.clone(),
                    count: pruned.count(),
                });
            }
        }

        let end_time = *rally.end_time.get_or_insert(ending_time);
        log::info!(
            "{}: {} serves at {}, outcome {:?}",
            rally.id,
            serve.server,
            score_before,
            outcome
        );

        self.session.pending_choice = match outcome {
            RallyOutcome::Point(point) if outcome.needs_disambiguation() => Some(PendingChoice {
                rally_id: rally.id.clone(),
                winner: point.winner,
                ending_shot: point.ending_shot,
            }),
            _ => None,
        };
        if let Some(choice) = &self.session.pending_choice {
            fx.push(Effect::Prompt(choice.clone()));
        }

        self.draft = Some(RallyDraft {
            serve,
            score_before,
            outcome,
        });
        self.session.cursor = Some(Cursor {
            shot: ending_index,
            ..cursor
        });
        self.session.phase = Phase::DetailCapture(DetailStep::EndOfRally);
        fx.push(Effect::Pause);
        self.seek(end_time, fx);
        Ok(())
    }

    fn step_end_time(
        &mut self,
        record: &mut MatchRecord,
        cursor: Cursor,
        direction: FrameDirection,
        fx: &mut Vec<Effect>,
    ) -> Result<(), WorkflowError> {
        let rally = rally_at(record, cursor)?;
        let current = rally
            .end_time
            .or_else(|| rally.last_shot_time())
            .unwrap_or(Timecode::ZERO);
        let next = current.offset_frames(direction.sign(), self.config.frame_rate);
        if next.seconds() < 0.0 {
            return Err(WorkflowError::InvalidAnswer(
                "end of point cannot precede the start of the media".to_string(),
            ));
        }
        if let Some(duration) = self.session.clock.duration {
            if next > duration {
                return Err(WorkflowError::BeyondMedia {
                    time: next,
                    duration,
                });
            }
        }
        rally.end_time = Some(next);
        fx.push(Effect::StepFrame {
            direction,
            ignore_bounds: false,
        });
        Ok(())
    }

    fn resolve_error(&mut self, judgment: ErrorJudgment) -> Result<(), WorkflowError> {
        let draft = self.draft.as_mut().ok_or(RulesError::NothingToResolve)?;
        draft.outcome = draft.outcome.resolve(judgment)?;
        self.session.pending_choice = None;
        log::info!("Error resolved as {:?}", judgment);
        Ok(())
    }

    fn confirm_rally(
        &mut self,
        record: &mut MatchRecord,
        cursor: Cursor,
        fx: &mut Vec<Effect>,
    ) -> Result<(), WorkflowError> {
        let set_id = record
            .sets
            .get(cursor.set)
            .map(|set| set.id.clone())
            .ok_or(WorkflowError::CursorInvalid)?;
        let rally = rally_at(record, cursor)?;
        if self.session.pending_choice.is_some() {
            return Err(WorkflowError::ChoicePending(rally.id.clone()));
        }
        if self.session.write_pending(&rally.id) {
            return Err(WorkflowError::WriteInFlight(rally.id.clone()));
        }
        let draft = self.draft.take().ok_or(RulesError::Unjudged)?;

        let committed = CommittedOutcome::new(draft.serve, draft.outcome, draft.score_before);
        rally.committed = Some(committed);
        self.corrections.forget_rally(&rally.id);
        log::info!(
            "Confirmed {}: {} -> {}",
            rally.id,
            committed.score_before,
            committed.score_after
        );
        let rally = rally.clone();

        let set = &mut record.sets[cursor.set];
        set.recompute_final_score();
        if self.config.scoring.is_complete(committed.score_after) && cursor.rally + 1 < set.rallies.len() {
            log::warn!(
                "Set {} reached {} with {} rallies still to judge",
                set.number,
                committed.score_after,
                set.rallies.len() - cursor.rally - 1
            );
        }
        self.persist(PersistRequest::Rally { set_id, rally }, fx);

        if self.config.review_rallies {
            let start = rally_at(record, cursor)?
                .first_shot_time()
                .ok_or(WorkflowError::CursorInvalid)?;
            self.session.phase = Phase::DetailCapture(DetailStep::RallyReview);
            self.seek(start, fx);
            fx.push(Effect::Play { rate: 1.0 });
            Ok(())
        } else {
            self.advance(record, cursor, fx)
        }
    }

    /// Move past the confirmed rally at `cursor`.
    fn advance(
        &mut self,
        record: &mut MatchRecord,
        cursor: Cursor,
        fx: &mut Vec<Effect>,
    ) -> Result<(), WorkflowError> {
        let rallies_in_set = record
            .sets
            .get(cursor.set)
            .map(|set| set.rallies.len())
            .ok_or(WorkflowError::CursorInvalid)?;
        if cursor.rally + 1 < rallies_in_set {
            let next = Cursor {
                set: cursor.set,
                rally: cursor.rally + 1,
                shot: 1,
            };
            return self.enter_shot(record, next, Question::Stroke, fx);
        }

        let match_id = record.framework.id.clone();
        let set = record.sets[cursor.set].clone();
        log::info!("Set {} finished at {}", set.number, set.final_score);
        self.persist(PersistRequest::Set { match_id, set }, fx);

        if let Some(next_set) = (cursor.set + 1..record.sets.len())
            .find(|&pos| !record.sets[pos].rallies.is_empty())
        {
            let next = Cursor {
                set: next_set,
                rally: 0,
                shot: 1,
            };
            return self.enter_shot(record, next, Question::Stroke, fx);
        }

        log::info!(
            "Detail capture complete: {} sets, {} rallies, {} shots",
            record.sets.len(),
            record.rally_count(),
            record.shot_count()
        );
        self.session.cursor = None;
        self.session.phase = Phase::Complete;
        fx.push(Effect::Pause);
        fx.push(Effect::SessionComplete);
        Ok(())
    }

    fn undo_in_detail(
        &mut self,
        record: &mut MatchRecord,
        cursor: Cursor,
        intent: &Intent,
        fx: &mut Vec<Effect>,
    ) -> Result<(), WorkflowError> {
        let last = self
            .corrections
            .last()
            .cloned()
            .ok_or(CorrectionError::NothingToUndo)?;
        let set_id = record
            .sets
            .get(cursor.set)
            .map(|set| set.id.clone())
            .ok_or(WorkflowError::CursorInvalid)?;
        let rally = rally_at(record, cursor)?;
        if *last.rally_id() != rally.id {
            return Err(self.not_permitted(intent));
        }
        self.corrections.undo(rally)?;

        match last {
            Correction::Prune(prune) => {
                // Back to the question that caused the prune.
                if let Some(shot) = rally.shot_at_mut(prune.error_index) {
                    shot.quality = None;
                }
                self.draft = None;
                self.session.pending_choice = None;
                self.session.cursor = Some(Cursor {
                    shot: prune.error_index,
                    ..cursor
                });
                self.session.phase =
                    Phase::DetailCapture(DetailStep::ShotQuestions(Question::Quality));
                let time = rally
                    .shot_at(prune.error_index)
                    .map(|shot| shot.time)
                    .ok_or(WorkflowError::CursorInvalid)?;
                self.seek(time, fx);
            }
            Correction::Nudge { previous, .. } => {
                let rally = rally.clone();
                self.seek(previous, fx);
                self.persist(PersistRequest::Rally { set_id, rally }, fx);
            }
            Correction::Delete { .. } => {
                let rally = rally.clone();
                self.persist(PersistRequest::Rally { set_id, rally }, fx);
            }
        }
        Ok(())
    }
}

fn non_empty(answer: &str, what: &str) -> Result<String, WorkflowError> {
    let trimmed = answer.trim();
    if trimmed.is_empty() {
        return Err(WorkflowError::InvalidAnswer(format!("{} must not be empty", what)));
    }
    Ok(trimmed.to_string())
}

fn tail_set(record: &mut MatchRecord) -> Result<&mut SetRecord, WorkflowError> {
    record.sets.last_mut().ok_or(WorkflowError::CursorInvalid)
}

fn tail_rally(record: &mut MatchRecord) -> Result<&mut Rally, WorkflowError> {
    tail_set(record)?
        .rallies
        .last_mut()
        .ok_or(WorkflowError::CursorInvalid)
}

fn rally_at(record: &mut MatchRecord, cursor: Cursor) -> Result<&mut Rally, WorkflowError> {
    record
        .sets
        .get_mut(cursor.set)
        .and_then(|set| set.rallies.get_mut(cursor.rally))
        .ok_or(WorkflowError::CursorInvalid)
}

fn shot_at(record: &mut MatchRecord, cursor: Cursor) -> Result<&mut Shot, WorkflowError> {
    rally_at(record, cursor)?
        .shot_at_mut(cursor.shot)
        .ok_or(WorkflowError::CursorInvalid)
}

fn find_rally<'a>(
    record: &'a mut MatchRecord,
    rally_id: &EntityId,
) -> Result<(usize, &'a mut Rally), WorkflowError> {
    record
        .find_rally_mut(rally_id)
        .ok_or_else(|| CorrectionError::RallyNotFound(rally_id.clone()).into())
}
