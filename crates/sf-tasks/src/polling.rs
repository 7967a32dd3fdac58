//! A bounded polling loop with an explicit lifecycle.
//!
//! ```text
//! Idle --start--> Polling --should_stop--> Stopped
//!                    |  \---deadline----> TimedOut
//!                    |   \--error budget-> ErrorHalted
//!                    \------stop()------> Stopped
//! ```
//!
//! The first poll happens immediately on [`PollingController::start`], then
//! once per interval. The deadline is measured from `start` and also bounds a
//! poll that is still in flight when it passes. Polls never overlap. An
//! interval shorter than [`MIN_INTERVAL`] is raised to it.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use sf_config::PollingConfig;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::PollError;

// ---------------------------------------------------------------------------
// PollState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling,
    Stopped,
    TimedOut,
    ErrorHalted,
}

impl PollState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Polling => "polling",
            Self::Stopped => "stopped",
            Self::TimedOut => "timed_out",
            Self::ErrorHalted => "error_halted",
        }
    }

    /// Whether the loop has ended for good.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::TimedOut | Self::ErrorHalted)
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Options and outcome
// ---------------------------------------------------------------------------

/// Shortest interval the loop ticks at.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

type ErrorHook<E> = Arc<dyn Fn(PollError<E>) + Send + Sync>;

pub struct PollOptions<E> {
    pub interval: Duration,
    pub max_duration: Duration,
    /// Called for every failed poll and once on timeout.
    pub on_error: Option<ErrorHook<E>>,
    /// Halt after this many consecutive failed polls.
    pub max_consecutive_errors: Option<u32>,
}

impl<E> PollOptions<E> {
    #[must_use]
    pub fn new(interval: Duration, max_duration: Duration) -> Self {
        Self {
            interval,
            max_duration,
            on_error: None,
            max_consecutive_errors: None,
        }
    }

    #[must_use]
    pub fn with_on_error(mut self, hook: impl Fn(PollError<E>) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub const fn with_max_consecutive_errors(mut self, limit: u32) -> Self {
        self.max_consecutive_errors = Some(limit);
        self
    }
}

impl<E> Default for PollOptions<E> {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl<E> From<&PollingConfig> for PollOptions<E> {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            max_duration: config.max_duration(),
            on_error: None,
            max_consecutive_errors: config.max_consecutive_errors,
        }
    }
}

impl<E> Clone for PollOptions<E> {
    fn clone(&self) -> Self {
        Self {
            interval: self.interval,
            max_duration: self.max_duration,
            on_error: self.on_error.clone(),
            max_consecutive_errors: self.max_consecutive_errors,
        }
    }
}

impl<E> fmt::Debug for PollOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollOptions")
            .field("interval", &self.interval)
            .field("max_duration", &self.max_duration)
            .field("on_error", &self.on_error.is_some())
            .field("max_consecutive_errors", &self.max_consecutive_errors)
            .finish()
    }
}

/// Terminal state plus the value that satisfied `should_stop`, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome<T> {
    pub state: PollState,
    pub value: Option<T>,
}

// ---------------------------------------------------------------------------
// PollingController
// ---------------------------------------------------------------------------

type PollFn<T, E> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync>;
type StopFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

pub struct PollingController<T, E> {
    poll: PollFn<T, E>,
    should_stop: StopFn<T>,
    options: PollOptions<E>,
    state: Arc<watch::Sender<PollState>>,
    value: Arc<Mutex<Option<T>>>,
    task: Mutex<Option<AbortHandle>>,
}

impl<T, E> PollingController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    pub fn new<P, Fut, S>(poll: P, should_stop: S, options: PollOptions<E>) -> Self
    where
        P: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        S: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let (state, _) = watch::channel(PollState::Idle);
        Self {
            poll: Arc::new(move || poll().boxed()),
            should_stop: Arc::new(should_stop),
            options,
            state: Arc::new(state),
            value: Arc::default(),
            task: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> PollState {
        *self.state.borrow()
    }

    /// Begin polling. Does nothing while already polling.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut task = lock(&self.task);
        if self.state() == PollState::Polling {
            return;
        }

        self.state.send_replace(PollState::Polling);
        *lock(&self.value) = None;

        let run = PollLoop {
            poll: Arc::clone(&self.poll),
            should_stop: Arc::clone(&self.should_stop),
            options: self.options.clone(),
            state: Arc::clone(&self.state),
            value: Arc::clone(&self.value),
        };
        let handle = tokio::spawn(run.run());
        *task = Some(handle.abort_handle());
    }

    /// Cancel the interval and the deadline. Always safe to call.
    pub fn stop(&self) {
        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }
        self.state.send_if_modified(|state| {
            if *state == PollState::Polling {
                *state = PollState::Stopped;
                true
            } else {
                false
            }
        });
    }

    /// Wait until the loop reaches a terminal state. Returns at once when
    /// the controller was never started.
    pub async fn wait(&self) -> PollOutcome<T> {
        let mut rx = self.state.subscribe();
        let state = match rx
            .wait_for(|s| *s != PollState::Polling)
            .await
        {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        PollOutcome {
            state,
            value: lock(&self.value).clone(),
        }
    }
}

impl<T, E> Drop for PollingController<T, E> {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.task).take() {
            handle.abort();
        }
        self.state.send_if_modified(|state| {
            if *state == PollState::Polling {
                *state = PollState::Stopped;
                true
            } else {
                false
            }
        });
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The detached loop body. Owns clones of everything it touches so the
/// controller can be dropped while it runs.
struct PollLoop<T, E> {
    poll: PollFn<T, E>,
    should_stop: StopFn<T>,
    options: PollOptions<E>,
    state: Arc<watch::Sender<PollState>>,
    value: Arc<Mutex<Option<T>>>,
}

impl<T, E> PollLoop<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    fn report(&self, error: PollError<E>) {
        if let Some(hook) = &self.options.on_error {
            hook(error);
        }
    }

    fn finish(&self, terminal: PollState) {
        self.state.send_if_modified(|state| {
            if *state == PollState::Polling {
                *state = terminal;
                true
            } else {
                false
            }
        });
    }

    fn time_out(&self) {
        tracing::debug!(max_duration = ?self.options.max_duration, "polling timed out");
        self.finish(PollState::TimedOut);
        self.report(PollError::TimedOut(self.options.max_duration));
    }

    async fn run(self) {
        let deadline = Instant::now() + self.options.max_duration;
        let mut ticker = tokio::time::interval(self.options.interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_errors = 0u32;

        loop {
            tokio::select! {
                biased;
                () = tokio::time::sleep_until(deadline) => {
                    self.time_out();
                    return;
                }
                _ = ticker.tick() => {}
            }

            let Ok(result) = tokio::time::timeout_at(deadline, (self.poll)()).await else {
                self.time_out();
                return;
            };

            match result {
                Ok(value) => {
                    consecutive_errors = 0;
                    if (self.should_stop)(&value) {
                        *lock(&self.value) = Some(value);
                        self.finish(PollState::Stopped);
                        return;
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::debug!(consecutive_errors, "poll failed");
                    self.report(PollError::Poll(e));
                    if self
                        .options
                        .max_consecutive_errors
                        .is_some_and(|limit| consecutive_errors >= limit)
                    {
                        tracing::warn!(consecutive_errors, "polling halted after repeated errors");
                        self.finish(PollState::ErrorHalted);
                        return;
                    }
                }
            }
        }
    }
}
