use std::future::Future;

use log::debug;
use tokio::{
    task::JoinHandle,
    time::{self, Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Returned by the tick handler to keep or stop the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockControl {
    Continue,
    Stop,
}

/// Countdown driver for one session.
///
/// The clock owns its task and a cancellation token, and every tick carries
/// the id of the session it was armed for, so a tick that slips through
/// after teardown can be recognised and dropped by the receiver.
pub struct SessionClock {
    session_id: Uuid,
    cancel_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl SessionClock {
    /// Spawns the ticker. The first tick fires one `period` after the call.
    pub fn start<F, Fut>(session_id: Uuid, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(Uuid) -> Fut + Send + 'static,
        Fut: Future<Output = ClockControl> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!("clock for session {session_id} cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        if on_tick(session_id).await == ClockControl::Stop {
                            debug!("clock for session {session_id} stopped");
                            break;
                        }
                    }
                }
            }
        });

        Self {
            session_id,
            cancel_token,
            handle: Some(handle),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stops the ticker. Safe to call any number of times.
    pub fn cancel(&mut self) {
        self.cancel_token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SessionClock {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    fn counting_clock(limit: u32) -> (SessionClock, Arc<AtomicU32>) {
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        let clock = SessionClock::start(Uuid::new_v4(), Duration::from_secs(1), move |_| {
            let counter = counter.clone();
            async move {
                let seen = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if seen >= limit {
                    ClockControl::Stop
                } else {
                    ClockControl::Continue
                }
            }
        });
        (clock, ticks)
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_until_stopped() {
        let (clock, ticks) = counting_clock(3);

        time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(!clock.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent_and_silences_ticks() {
        let (mut clock, ticks) = counting_clock(100);
        time::sleep(Duration::from_millis(1_500)).await;
        clock.cancel();
        clock.cancel();

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert!(!clock.is_running());
    }
}
