use std::sync::Arc;

use anyhow::Result;
use log::{error, info};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::clock::{ClockControl, SessionClock};
use super::config::{Difficulty, ExerciseCatalog};
use super::machine::{SessionMachine, TickOutcome, Transition};
use super::state::{SessionResult, SessionSnapshot};
use crate::events::{classify_message, RawMessage};
use crate::scoring::ScoringPolicy;
use crate::submit::{ResultSubmitter, SubmissionPayload};

struct EventListener {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl EventListener {
    fn detach(self) {
        self.cancel_token.cancel();
        self.handle.abort();
    }
}

/// Async host for a [`SessionMachine`]: wires it to an event source, a
/// countdown clock and a result submitter.
///
/// Message handlers and clock ticks both take the machine lock and run to
/// completion, so they never interleave mid-update.
pub struct SessionController<S: ResultSubmitter> {
    machine: Arc<Mutex<SessionMachine>>,
    clock: Arc<Mutex<Option<SessionClock>>>,
    listener: Arc<Mutex<Option<EventListener>>>,
    submitter: Arc<S>,
    tick_interval: Duration,
}

impl<S: ResultSubmitter> Clone for SessionController<S> {
    fn clone(&self) -> Self {
        Self {
            machine: self.machine.clone(),
            clock: self.clock.clone(),
            listener: self.listener.clone(),
            submitter: self.submitter.clone(),
            tick_interval: self.tick_interval,
        }
    }
}

impl<S: ResultSubmitter> SessionController<S> {
    pub fn new(
        identity: impl Into<String>,
        catalog: ExerciseCatalog,
        policy: ScoringPolicy,
        submitter: S,
    ) -> Self {
        Self {
            machine: Arc::new(Mutex::new(SessionMachine::new(identity, catalog, policy))),
            clock: Arc::new(Mutex::new(None)),
            listener: Arc::new(Mutex::new(None)),
            submitter: Arc::new(submitter),
            tick_interval: Duration::from_secs(1),
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.machine.lock().await.snapshot()
    }

    pub async fn select_exercise(&self, key: &str) -> Result<SessionSnapshot> {
        let transition = self.machine.lock().await.select_exercise(key)?;
        self.after_selection(transition).await
    }

    pub async fn select_difficulty(&self, difficulty: Difficulty) -> Result<SessionSnapshot> {
        let transition = self.machine.lock().await.select_difficulty(difficulty)?;
        self.after_selection(transition).await
    }

    pub async fn select_time_limit(&self, secs: u32) -> Result<SessionSnapshot> {
        let transition = self.machine.lock().await.select_time_limit(secs)?;
        self.after_selection(transition).await
    }

    /// Classifies and applies one tracker message.
    pub async fn handle_message(&self, raw: RawMessage) -> SessionSnapshot {
        let events = classify_message(&raw);
        let (finished, snapshot) = {
            let mut machine = self.machine.lock().await;
            let mut finished = None;
            for event in &events {
                if let Some(Transition::Finished(result)) = machine.apply(event) {
                    finished = Some(result);
                }
            }
            (finished, machine.snapshot())
        };

        if let Some(result) = finished {
            self.stop_clock_for(result.session_id).await;
            self.dispatch(&result);
        }
        snapshot
    }

    /// Ends the active session now and submits whatever was scored.
    pub async fn finish_now(&self) -> Result<SessionResult> {
        let result = self.machine.lock().await.finish_now()?;
        self.stop_clock_for(result.session_id).await;
        self.dispatch(&result);
        Ok(result)
    }

    /// Tears down clock and listener, then replaces the session with a fresh one.
    pub async fn reset(&self) -> SessionSnapshot {
        self.stop_clock().await;
        self.detach_source().await;
        let mut machine = self.machine.lock().await;
        machine.reset();
        machine.snapshot()
    }

    /// Swaps in a new catalog and policy; only valid while selecting.
    pub async fn reconfigure(&self, catalog: ExerciseCatalog, policy: ScoringPolicy) -> Result<()> {
        self.machine.lock().await.reconfigure(catalog, policy)
    }

    /// Subscribes to an event source, detaching any previous one first.
    pub async fn attach_source(&self, mut source: mpsc::Receiver<RawMessage>) {
        self.detach_source().await;

        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();
        let controller = self.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    message = source.recv() => match message {
                        Some(raw) => {
                            controller.handle_message(raw).await;
                        }
                        None => {
                            info!("event source closed");
                            break;
                        }
                    },
                }
            }
        });

        *self.listener.lock().await = Some(EventListener {
            cancel_token,
            handle,
        });
    }

    pub async fn detach_source(&self) {
        if let Some(listener) = self.listener.lock().await.take() {
            listener.detach();
        }
    }

    pub async fn clock_running(&self) -> bool {
        self.clock
            .lock()
            .await
            .as_ref()
            .map(SessionClock::is_running)
            .unwrap_or(false)
    }

    async fn after_selection(&self, transition: Option<Transition>) -> Result<SessionSnapshot> {
        if let Some(Transition::Activated(_)) = transition {
            self.arm_clock().await;
        }
        Ok(self.snapshot().await)
    }

    async fn arm_clock(&self) {
        let session_id = self.machine.lock().await.session_id();
        let machine = self.machine.clone();
        let submitter = self.submitter.clone();

        let mut slot = self.clock.lock().await;
        if let Some(mut previous) = slot.take() {
            previous.cancel();
        }
        *slot = Some(SessionClock::start(
            session_id,
            self.tick_interval,
            move |tick_session| {
                let machine = machine.clone();
                let submitter = submitter.clone();
                async move {
                    let outcome = machine.lock().await.tick(tick_session);
                    match outcome {
                        TickOutcome::Expired(result) => {
                            dispatch_submission(submitter, &result);
                            ClockControl::Stop
                        }
                        TickOutcome::Ignored => ClockControl::Stop,
                        TickOutcome::Waiting | TickOutcome::Counted { .. } => {
                            ClockControl::Continue
                        }
                    }
                }
            },
        ));
    }

    async fn stop_clock(&self) {
        if let Some(mut clock) = self.clock.lock().await.take() {
            clock.cancel();
        }
    }

    /// Stops the clock only if it still belongs to `session_id`. The machine
    /// lock is released before this runs, so a reset may already have armed
    /// the clock of the next session.
    async fn stop_clock_for(&self, session_id: Uuid) {
        let mut slot = self.clock.lock().await;
        if slot.as_ref().map(SessionClock::session_id) == Some(session_id) {
            if let Some(mut clock) = slot.take() {
                clock.cancel();
            }
        }
    }

    fn dispatch(&self, result: &SessionResult) {
        dispatch_submission(self.submitter.clone(), result);
    }
}

/// Fire-and-forget upload; nothing waits on the outcome.
fn dispatch_submission<S: ResultSubmitter>(submitter: Arc<S>, result: &SessionResult) {
    let payload = SubmissionPayload::from(result);
    tokio::spawn(async move {
        let session_id = payload.session_id;
        match submitter.submit(payload).await {
            Ok(receipt) => info!(
                "session {} submitted at {}",
                receipt.session_id, receipt.accepted_at
            ),
            Err(err) => error!("failed to submit session {session_id}: {err:#}"),
        }
    });
}
