use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};
use std::time::Duration;

use tokio::sync::watch;

use crate::{domain::window, usecases::contracts::Clock};

const WINDOW_TIMER_STARTED: &str = "WINDOW_TIMER_STARTED";
const WINDOW_TIMER_STOPPED: &str = "WINDOW_TIMER_STOPPED";

/// Countdown for the platform messaging window of the open conversation.
///
/// Owns one cancellable background task that re-derives (never decrements)
/// the remaining seconds from the stored deadline every second and publishes
/// it on a `watch` channel, so the send control can disable itself the moment
/// the window closes without waiting for another event. `reset` only moves
/// the deadline, which makes repeated resets idempotent with respect to
/// drift. The task is stopped when the timer is dropped.
pub struct WindowTimer {
    deadline_ms: Arc<AtomicI64>,
    clock: Arc<dyn Clock>,
    remaining_tx: watch::Sender<u64>,
    stop_tx: Option<watch::Sender<bool>>,
}

impl WindowTimer {
    /// Spawns the countdown task; requires a running tokio runtime.
    pub fn start(clock: Arc<dyn Clock>) -> Self {
        let deadline_ms = Arc::new(AtomicI64::new(0));
        let (remaining_tx, _) = watch::channel(0);
        let (stop_tx, stop_rx) = watch::channel(false);

        tokio::spawn(run_countdown(
            deadline_ms.clone(),
            clock.clone(),
            remaining_tx.clone(),
            stop_rx,
        ));
        tracing::debug!(code = WINDOW_TIMER_STARTED, "window timer started");

        Self {
            deadline_ms,
            clock,
            remaining_tx,
            stop_tx: Some(stop_tx),
        }
    }

    /// Re-derives the deadline from the window length and the last message
    /// timestamp and publishes the fresh remaining value immediately.
    pub fn reset(&self, window_secs: u64, last_message_ms: i64) {
        let deadline = window::deadline_ms(window_secs, last_message_ms);
        self.deadline_ms.store(deadline, Ordering::SeqCst);
        let _ = self
            .remaining_tx
            .send(window::remaining_from_deadline(deadline, self.clock.now_ms()));
    }

    /// Forces the window shut, used when the server reports an expiry the
    /// client has not yet heard about via push.
    pub fn force_expired(&self) {
        self.deadline_ms.store(0, Ordering::SeqCst);
        let _ = self.remaining_tx.send(0);
    }

    /// Clears the deadline on conversation close; remaining drops to zero.
    pub fn clear(&self) {
        self.force_expired();
    }

    pub fn remaining_seconds(&self) -> u64 {
        let deadline = self.deadline_ms.load(Ordering::SeqCst);
        if deadline == 0 {
            return 0;
        }
        window::remaining_from_deadline(deadline, self.clock.now_ms())
    }

    pub fn send_disabled(&self) -> bool {
        self.remaining_seconds() == 0
    }

    /// Receiver for UI bindings that want countdown updates pushed to them.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.remaining_tx.subscribe()
    }
}

impl Drop for WindowTimer {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
            tracing::debug!(code = WINDOW_TIMER_STOPPED, "window timer stop signal sent");
        }
    }
}

async fn run_countdown(
    deadline_ms: Arc<AtomicI64>,
    clock: Arc<dyn Clock>,
    remaining_tx: watch::Sender<u64>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    return;
                }
            }
            _ = interval.tick() => {
                let deadline = deadline_ms.load(Ordering::SeqCst);
                let remaining = if deadline == 0 {
                    0
                } else {
                    window::remaining_from_deadline(deadline, clock.now_ms())
                };
                if remaining_tx.send(remaining).is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::stubs::FixedClock;
    use crate::domain::{conversation::Platform, window::window_seconds};

    const NOW_MS: i64 = 1_700_000_000_000;

    #[tokio::test(start_paused = true)]
    async fn reset_derives_remaining_from_last_message() {
        let clock = Arc::new(FixedClock::at(NOW_MS));
        let timer = WindowTimer::start(clock.clone());

        timer.reset(window_seconds(Platform::Whatsapp), NOW_MS - 3_600 * 1_000);

        assert_eq!(timer.remaining_seconds(), 82_800);
        assert!(!timer.send_disabled());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_window_disables_send() {
        let clock = Arc::new(FixedClock::at(NOW_MS));
        let timer = WindowTimer::start(clock.clone());

        timer.reset(
            window_seconds(Platform::Instagram),
            NOW_MS - 8 * 86_400 * 1_000,
        );

        assert_eq!(timer.remaining_seconds(), 0);
        assert!(timer.send_disabled());
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_re_derives_each_tick() {
        let clock = Arc::new(FixedClock::at(NOW_MS));
        let timer = WindowTimer::start(clock.clone());
        let mut remaining_rx = timer.subscribe();

        timer.reset(window_seconds(Platform::Whatsapp), NOW_MS);
        remaining_rx
            .changed()
            .await
            .expect("reset must publish a value");
        assert_eq!(*remaining_rx.borrow_and_update(), 86_400);

        // The wall clock jumps by more than one tick; the published value
        // must reflect the jump, not a single decrement.
        clock.advance_ms(10_000);
        tokio::time::advance(Duration::from_secs(1)).await;
        remaining_rx
            .changed()
            .await
            .expect("tick must publish a value");
        assert_eq!(*remaining_rx.borrow_and_update(), 86_390);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_reaches_zero_without_further_events() {
        let clock = Arc::new(FixedClock::at(NOW_MS));
        let timer = WindowTimer::start(clock.clone());
        let mut remaining_rx = timer.subscribe();

        timer.reset(window_seconds(Platform::Whatsapp), NOW_MS);
        remaining_rx.changed().await.expect("reset publish");
        let _ = remaining_rx.borrow_and_update();

        clock.advance_ms((86_400 + 1) * 1_000);
        tokio::time::advance(Duration::from_secs(1)).await;
        remaining_rx.changed().await.expect("tick publish");

        assert_eq!(*remaining_rx.borrow_and_update(), 0);
        assert!(timer.send_disabled());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_resets_are_idempotent() {
        let clock = Arc::new(FixedClock::at(NOW_MS));
        let timer = WindowTimer::start(clock.clone());

        timer.reset(86_400, NOW_MS - 1_000);
        let first = timer.remaining_seconds();
        timer.reset(86_400, NOW_MS - 1_000);

        assert_eq!(timer.remaining_seconds(), first);
    }

    #[tokio::test(start_paused = true)]
    async fn force_expired_zeroes_immediately() {
        let clock = Arc::new(FixedClock::at(NOW_MS));
        let timer = WindowTimer::start(clock.clone());
        timer.reset(86_400, NOW_MS);

        timer.force_expired();

        assert_eq!(timer.remaining_seconds(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_stops_the_countdown_task() {
        let clock = Arc::new(FixedClock::at(NOW_MS));
        let timer = WindowTimer::start(clock.clone());
        let mut remaining_rx = timer.subscribe();

        drop(timer);

        // Once the task observes the stop signal it drops its sender clone;
        // with the struct's sender gone too, the channel closes.
        while remaining_rx.changed().await.is_ok() {}
    }
}
