use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use uuid::Uuid;

use super::config::{Difficulty, ExerciseCatalog, SessionConfig, SessionSelection};
use super::state::{
    FinishReason, PostureInfo, SessionPhase, SessionResult, SessionSnapshot, SessionState,
};
use crate::events::{frame_score, PoseEvent};
use crate::scoring::{compute_score, RepAggregator, ScoreBreakdown, ScoringPolicy};

/// State change caused by one input.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Activated(SessionConfig),
    Started,
    Finished(SessionResult),
}

/// What a clock tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Tick for a session that is gone or no longer active; the clock should stop.
    Ignored,
    /// Active but still waiting for a ready posture.
    Waiting,
    Counted { elapsed_secs: u32 },
    Expired(SessionResult),
}

/// One session instance: selection, live scoring and finalization.
///
/// All inputs are applied synchronously and run to completion, so the
/// caller only has to serialize access (the controller keeps it behind one
/// mutex). Finalization is latched: the first finish trigger wins and every
/// later one is a no-op.
#[derive(Debug)]
pub struct SessionMachine {
    session_id: Uuid,
    identity: String,
    catalog: ExerciseCatalog,
    policy: ScoringPolicy,
    selection: SessionSelection,
    config: Option<SessionConfig>,
    state: SessionState,
    aggregator: RepAggregator,
    live_score: Option<ScoreBreakdown>,
    posture: PostureInfo,
    started_at: Option<DateTime<Utc>>,
    finalized: bool,
}

impl SessionMachine {
    pub fn new(identity: impl Into<String>, catalog: ExerciseCatalog, policy: ScoringPolicy) -> Self {
        let aggregator = RepAggregator::new(policy.skip_warmup);
        Self {
            session_id: Uuid::new_v4(),
            identity: identity.into(),
            catalog,
            policy,
            selection: SessionSelection::default(),
            config: None,
            state: SessionState::Selecting,
            aggregator,
            live_score: None,
            posture: PostureInfo::default(),
            started_at: None,
            finalized: false,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn catalog(&self) -> &ExerciseCatalog {
        &self.catalog
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn select_exercise(&mut self, key: &str) -> Result<Option<Transition>> {
        self.ensure_selecting()?;
        self.selection.select_exercise(&self.catalog, key)?;
        Ok(self.try_activate())
    }

    pub fn select_difficulty(&mut self, difficulty: Difficulty) -> Result<Option<Transition>> {
        self.ensure_selecting()?;
        self.selection.select_difficulty(difficulty);
        Ok(self.try_activate())
    }

    pub fn select_time_limit(&mut self, secs: u32) -> Result<Option<Transition>> {
        self.ensure_selecting()?;
        self.selection.select_time_limit(secs)?;
        Ok(self.try_activate())
    }

    /// Applies one tracker event. Events outside the Active phase are dropped.
    pub fn apply(&mut self, event: &PoseEvent) -> Option<Transition> {
        let SessionState::Active { started, reps, .. } = &mut self.state else {
            debug!(
                "session {} ignoring {} event while {:?}",
                self.session_id,
                event.kind(),
                self.state.phase()
            );
            return None;
        };

        match event {
            PoseEvent::Counter { count } => {
                *reps = *count;
                None
            }
            PoseEvent::Posture {
                ready,
                message,
                direction,
            } => {
                self.posture = PostureInfo {
                    ready: *ready,
                    message: message.clone(),
                    direction: direction.clone(),
                };
                if *ready && !*started {
                    *started = true;
                    info!("session {} started: posture confirmed", self.session_id);
                    return Some(Transition::Started);
                }
                None
            }
            PoseEvent::Keypoints { frames } => {
                let rep_index = *reps;
                let score = frame_score(frames);
                if let Some(closed) = self.aggregator.observe(rep_index, score) {
                    debug!(
                        "session {} closed rep {} at {}",
                        self.session_id, closed.rep_index, closed.average
                    );
                }
                self.refresh_live_score();
                None
            }
            PoseEvent::Finished => self.finish(FinishReason::TrackerFinished),
            PoseEvent::Unknown => None,
        }
    }

    /// Advances the session clock by one second. `session_id` identifies the
    /// session the clock was armed for; ticks from an older session are dropped.
    pub fn tick(&mut self, session_id: Uuid) -> TickOutcome {
        if session_id != self.session_id {
            warn!(
                "dropping stale clock tick for session {session_id} (current {})",
                self.session_id
            );
            return TickOutcome::Ignored;
        }

        let limit = match &self.config {
            Some(config) => config.time_limit.secs(),
            None => return TickOutcome::Ignored,
        };

        let SessionState::Active {
            started,
            elapsed_secs,
            ..
        } = &mut self.state
        else {
            return TickOutcome::Ignored;
        };

        if !*started {
            return TickOutcome::Waiting;
        }

        *elapsed_secs = elapsed_secs.saturating_add(1);
        if *elapsed_secs >= limit {
            info!("session {} reached its {limit}s limit", self.session_id);
            return match self.finish(FinishReason::TimeLimitReached) {
                Some(Transition::Finished(result)) => TickOutcome::Expired(result),
                _ => TickOutcome::Ignored,
            };
        }

        TickOutcome::Counted {
            elapsed_secs: *elapsed_secs,
        }
    }

    /// Ends an active session early on the athlete's request.
    pub fn finish_now(&mut self) -> Result<SessionResult> {
        if self.phase() != SessionPhase::Active {
            bail!("no active session to finish");
        }
        match self.finish(FinishReason::Manual) {
            Some(Transition::Finished(result)) => Ok(result),
            _ => bail!("session {} was already finalized", self.session_id),
        }
    }

    /// Throws the whole session away and starts a fresh one in `Selecting`.
    pub fn reset(&mut self) {
        let previous = self.session_id;
        let identity = std::mem::take(&mut self.identity);
        let catalog = std::mem::take(&mut self.catalog);
        let policy = std::mem::take(&mut self.policy);
        *self = Self::new(identity, catalog, policy);
        info!("session {previous} discarded; new session {}", self.session_id);
    }

    /// Replaces catalog and policy. Only allowed before a session is pinned.
    pub fn reconfigure(&mut self, catalog: ExerciseCatalog, policy: ScoringPolicy) -> Result<()> {
        self.ensure_selecting()?;
        self.aggregator = RepAggregator::new(policy.skip_warmup);
        self.catalog = catalog;
        self.policy = policy;
        self.selection = SessionSelection::default();
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (started, reps, elapsed_secs) = match &self.state {
            SessionState::Selecting => (false, 0, 0),
            SessionState::Active {
                started,
                reps,
                elapsed_secs,
            } => (*started, *reps, *elapsed_secs),
            SessionState::Finished(result) => (true, result.total_reps, result.elapsed_secs),
        };
        let limit = self.config.as_ref().map(|c| c.time_limit.secs()).unwrap_or(0);
        let result = match &self.state {
            SessionState::Finished(result) => Some(result.clone()),
            _ => None,
        };
        let live_score = match &result {
            Some(result) => result.final_score,
            None => self.live_score.map(|b| b.final_score),
        };

        SessionSnapshot {
            session_id: self.session_id,
            phase: self.phase(),
            selection: self.selection.clone(),
            config: self.config.clone(),
            started,
            reps,
            elapsed_secs,
            remaining_secs: limit.saturating_sub(elapsed_secs),
            live_score,
            posture: self.posture.clone(),
            result,
        }
    }

    fn ensure_selecting(&self) -> Result<()> {
        if self.phase() != SessionPhase::Selecting {
            bail!(
                "session {} is {:?}; reset before choosing a new configuration",
                self.session_id,
                self.phase()
            );
        }
        Ok(())
    }

    fn try_activate(&mut self) -> Option<Transition> {
        let config = self.selection.to_config()?;
        info!(
            "session {} active: {} ({}, {}s)",
            self.session_id,
            config.exercise.key,
            config.difficulty,
            config.time_limit.secs()
        );
        self.config = Some(config.clone());
        self.started_at = Some(Utc::now());
        self.state = SessionState::Active {
            started: false,
            reps: 0,
            elapsed_secs: 0,
        };
        Some(Transition::Activated(config))
    }

    fn refresh_live_score(&mut self) {
        let (Some(config), SessionState::Active { reps, .. }) = (&self.config, &self.state) else {
            return;
        };
        self.live_score = compute_score(
            self.aggregator.closed(),
            self.aggregator.in_progress_average(),
            *reps,
            config.difficulty,
            &self.policy,
        );
    }

    fn finish(&mut self, reason: FinishReason) -> Option<Transition> {
        if self.finalized {
            debug!("session {} already finalized; ignoring {reason:?}", self.session_id);
            return None;
        }
        let SessionState::Active {
            reps, elapsed_secs, ..
        } = self.state
        else {
            return None;
        };
        let config = self.config.clone()?;
        self.finalized = true;

        self.aggregator.finalize();
        let breakdown = compute_score(
            self.aggregator.closed(),
            None,
            reps,
            config.difficulty,
            &self.policy,
        );
        self.live_score = breakdown;

        let finished_at = Utc::now();
        let result = SessionResult {
            session_id: self.session_id,
            identity: self.identity.clone(),
            config,
            total_reps: reps,
            final_score: breakdown.map(|b| b.final_score),
            breakdown,
            rep_averages: self.aggregator.closed().to_vec(),
            elapsed_secs,
            reason,
            started_at: self.started_at.unwrap_or(finished_at),
            finished_at,
        };

        info!(
            "session {} finished ({reason:?}): {} reps, score {:?}",
            self.session_id, result.total_reps, result.final_score
        );
        self.state = SessionState::Finished(result.clone());
        Some(Transition::Finished(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FrameScore;

    fn keypoints(score: f64) -> PoseEvent {
        PoseEvent::Keypoints {
            frames: vec![FrameScore::new(score)],
        }
    }

    fn active_machine(difficulty: Difficulty, limit: u32) -> SessionMachine {
        let mut machine =
            SessionMachine::new("athlete-1", ExerciseCatalog::default(), ScoringPolicy::default());
        machine.select_exercise("squat").unwrap();
        machine.select_difficulty(difficulty).unwrap();
        let transition = machine.select_time_limit(limit).unwrap();
        assert!(matches!(transition, Some(Transition::Activated(_))));
        machine
    }

    fn ready() -> PoseEvent {
        PoseEvent::Posture {
            ready: true,
            message: None,
            direction: None,
        }
    }

    #[test]
    fn activates_only_after_all_choices() {
        let mut machine =
            SessionMachine::new("athlete-1", ExerciseCatalog::default(), ScoringPolicy::default());
        assert_eq!(machine.select_time_limit(60).unwrap(), None);
        assert_eq!(machine.select_exercise("lunge").unwrap(), None);
        assert_eq!(machine.phase(), SessionPhase::Selecting);
        assert!(machine.select_difficulty(Difficulty::Hard).unwrap().is_some());
        assert_eq!(machine.phase(), SessionPhase::Active);
        assert!(machine.select_difficulty(Difficulty::Easy).is_err());
    }

    #[test]
    fn events_before_activation_are_ignored() {
        let mut machine =
            SessionMachine::new("athlete-1", ExerciseCatalog::default(), ScoringPolicy::default());
        assert_eq!(machine.apply(&PoseEvent::Finished), None);
        assert_eq!(machine.phase(), SessionPhase::Selecting);
    }

    #[test]
    fn ready_posture_starts_once() {
        let mut machine = active_machine(Difficulty::Medium, 60);
        assert_eq!(machine.apply(&ready()), Some(Transition::Started));
        assert_eq!(machine.apply(&ready()), None);
        assert_eq!(machine.phase(), SessionPhase::Active);
    }

    #[test]
    fn scores_the_reference_session() {
        let mut machine = active_machine(Difficulty::Medium, 60);
        machine.apply(&keypoints(0.99));
        machine.apply(&PoseEvent::Counter { count: 1 });
        for score in [0.8, 0.9, 0.7] {
            machine.apply(&keypoints(score));
        }
        machine.apply(&PoseEvent::Counter { count: 2 });
        machine.apply(&keypoints(0.6));
        assert_eq!(machine.snapshot().live_score, Some(47));

        let Some(Transition::Finished(result)) = machine.apply(&PoseEvent::Finished) else {
            panic!("expected finish");
        };
        let averages: Vec<u32> = result.rep_averages.iter().map(|r| r.average).collect();
        assert_eq!(averages, vec![80, 60]);
        assert_eq!(result.total_reps, 2);
        assert_eq!(result.final_score, Some(47));
        assert_eq!(result.reason, FinishReason::TrackerFinished);
    }

    #[test]
    fn finish_without_frames_has_no_score() {
        let mut machine = active_machine(Difficulty::Easy, 30);
        machine.apply(&PoseEvent::Counter { count: 4 });
        let result = machine.finish_now().unwrap();
        assert_eq!(result.final_score, None);
        assert_eq!(result.summary().score, "N/A");
        assert_eq!(result.summary().feedback, None);
    }

    #[test]
    fn finalization_is_latched() {
        let mut machine = active_machine(Difficulty::Medium, 30);
        machine.apply(&ready());
        assert!(machine.apply(&PoseEvent::Finished).is_some());
        assert_eq!(machine.apply(&PoseEvent::Finished), None);
        assert_eq!(machine.tick(machine.session_id()), TickOutcome::Ignored);
        assert!(machine.finish_now().is_err());
    }

    #[test]
    fn clock_waits_for_posture_then_expires() {
        let mut machine = active_machine(Difficulty::Medium, 30);
        let id = machine.session_id();
        assert_eq!(machine.tick(id), TickOutcome::Waiting);

        machine.apply(&ready());
        for expected in 1..30 {
            assert_eq!(machine.tick(id), TickOutcome::Counted { elapsed_secs: expected });
        }
        let TickOutcome::Expired(result) = machine.tick(id) else {
            panic!("expected expiry on the 30th tick");
        };
        assert_eq!(result.elapsed_secs, 30);
        assert_eq!(result.reason, FinishReason::TimeLimitReached);
        assert_eq!(machine.snapshot().remaining_secs, 0);
    }

    #[test]
    fn stale_ticks_are_dropped_after_reset() {
        let mut machine = active_machine(Difficulty::Medium, 30);
        let old = machine.session_id();
        machine.apply(&ready());
        machine.reset();

        assert_ne!(machine.session_id(), old);
        assert_eq!(machine.phase(), SessionPhase::Selecting);
        assert_eq!(machine.tick(old), TickOutcome::Ignored);
        assert!(machine.config().is_none());
        assert_eq!(machine.snapshot().posture, PostureInfo::default());
    }

    #[test]
    fn reconfigure_is_rejected_mid_session() {
        let mut machine = active_machine(Difficulty::Medium, 30);
        assert!(machine
            .reconfigure(ExerciseCatalog::default(), ScoringPolicy::default())
            .is_err());
    }
}
