//! Fixed-window admission gate for blocking, multi-threaded callers.
//!
//! The gate hands out at most `limit` permits per window of length `period`. A window
//! opens when the first caller arrives at least `period` after the previous window
//! began; leftover capacity is discarded at that point. Callers that find the window
//! full queue up in arrival order and wait until a later window has room for them or
//! their acquire budget runs out. Blocking callers park on a condition variable, async
//! callers on a [`Notify`].
//!
//! Permits are handed to queued callers by whichever caller resets the window, so a
//! non-empty queue always means the current window is full and fresh callers can
//! never overtake the queue.

use crate::clock::{Clock, MonotonicClock};
use crate::config::{duration_millis, GateConfig};
use crate::error::AcquireTimeout;
use crate::sync::{Condvar, Mutex, MutexGuard};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// Proof of admission returned by [`AdmissionGate::acquire`].
///
/// Permits are not returned to the gate; capacity comes back only when a new window opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct Permit {
    window_start_millis: u64,
    waited: Duration,
}

impl Permit {
    /// Clock reading at which the window this permit was drawn from began.
    pub fn window_start_millis(&self) -> u64 {
        self.window_start_millis
    }

    /// Time the caller spent queued before being admitted (zero on the fast path).
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

/// Point-in-time view of the gate's window.
///
/// Read without refreshing: a window whose period has elapsed is reported as-is until
/// the next caller arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSnapshot {
    /// Clock reading at which the current window began.
    pub window_start_millis: u64,
    /// Permits granted in the current window.
    pub granted: u32,
    /// Callers currently queued.
    pub waiting: usize,
    /// Configured permits per window.
    pub limit: u32,
}

#[derive(Debug, Clone, Copy)]
struct Waiter {
    ticket: u64,
    deadline: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Refresh {
    reset: bool,
    handed_off: usize,
    expired: usize,
}

#[derive(Debug)]
struct WindowState {
    window_start: u64,
    granted: u32,
    waiters: VecDeque<Waiter>,
    // ticket -> start of the window its permit was drawn from
    admitted: HashMap<u64, u64>,
    next_ticket: u64,
}

impl WindowState {
    fn new(now: u64) -> Self {
        Self {
            window_start: now,
            granted: 0,
            waiters: VecDeque::new(),
            admitted: HashMap::new(),
            next_ticket: 0,
        }
    }

    /// Open a new window if the current one has run its course, drop queued callers
    /// whose deadline has passed, then admit queued callers front to back while capacity lasts.
    fn refresh(&mut self, now: u64, config: &GateConfig) -> Refresh {
        let mut outcome = Refresh::default();

        if now.saturating_sub(self.window_start) >= config.period_millis() {
            self.window_start = now;
            self.granted = 0;
            outcome.reset = true;
        }

        let queued = self.waiters.len();
        self.waiters.retain(|w| w.deadline >= now);
        outcome.expired = queued - self.waiters.len();

        while self.granted < config.limit() {
            let Some(waiter) = self.waiters.pop_front() else { break };
            self.granted += 1;
            self.admitted.insert(waiter.ticket, self.window_start);
            outcome.handed_off += 1;
        }

        if outcome.reset {
            tracing::debug!(
                window_start = self.window_start,
                handed_off = outcome.handed_off,
                expired = outcome.expired,
                "admission window reset"
            );
        }
        outcome
    }

    fn enqueue(&mut self, deadline: u64) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.waiters.push_back(Waiter { ticket, deadline });
        ticket
    }

    fn abandon(&mut self, ticket: u64) {
        self.waiters.retain(|w| w.ticket != ticket);
    }
}

/// A caller queued behind a full window.
#[derive(Debug, Clone, Copy)]
struct Queued {
    ticket: u64,
    arrived: u64,
    deadline: u64,
    position: u64,
    budget: Duration,
}

enum Admission {
    Granted(Permit),
    Queued(Queued),
}

enum Step {
    Done(Result<Permit, AcquireTimeout>),
    Wait(Duration),
}

struct Shared {
    state: Mutex<WindowState>,
    wakeup: Condvar,
    async_wakeup: Notify,
    config: GateConfig,
    clock: Arc<dyn Clock>,
}

impl Shared {
    // Every unlock point leaves the state consistent, so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn park<'a>(
        &self,
        guard: MutexGuard<'a, WindowState>,
        timeout: Duration,
    ) -> MutexGuard<'a, WindowState> {
        match self.wakeup.wait_timeout(guard, timeout) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }

    fn notify_all(&self) {
        self.wakeup.notify_all();
        self.async_wakeup.notify_waiters();
    }

    fn refresh(&self, state: &mut WindowState, now: u64) {
        if state.refresh(now, &self.config).handed_off > 0 {
            self.notify_all();
        }
    }

    /// Grant a permit from an open window, or queue the caller if a later window can
    /// still serve it within `budget`.
    fn admit(&self, state: &mut WindowState, budget: Duration) -> Result<Admission, AcquireTimeout> {
        let config = &self.config;
        let arrived = self.clock.now_millis();
        self.refresh(state, arrived);

        if state.granted < config.limit() {
            state.granted += 1;
            tracing::trace!(
                granted = state.granted,
                limit = config.limit(),
                window_start = state.window_start,
                "admission granted"
            );
            return Ok(Admission::Granted(Permit {
                window_start_millis: state.window_start,
                waited: Duration::ZERO,
            }));
        }

        // Full window. Everyone queued ahead is served first, `limit` per window.
        let deadline = arrived.saturating_add(duration_millis(budget));
        let position = state.waiters.len() as u64;
        let windows_ahead = position / u64::from(config.limit()) + 1;
        let served_at = state
            .window_start
            .saturating_add(windows_ahead.saturating_mul(config.period_millis()));
        if served_at > deadline {
            log_timeout(budget, Duration::ZERO, position);
            return Err(AcquireTimeout { waited: Duration::ZERO, timeout: budget });
        }

        let ticket = state.enqueue(deadline);
        tracing::debug!(position, wait_ms = served_at - arrived, "admission window full; waiting");
        Ok(Admission::Queued(Queued { ticket, arrived, deadline, position, budget }))
    }

    /// Settle a queued caller if it was admitted or ran out of budget, otherwise report
    /// how long it may sleep before the window can change on its own.
    fn check(&self, state: &mut WindowState, queued: &Queued) -> Step {
        let now = self.clock.now_millis();
        self.refresh(state, now);
        let waited = Duration::from_millis(now.saturating_sub(queued.arrived));

        if let Some(window_start) = state.admitted.remove(&queued.ticket) {
            tracing::trace!(
                waited_ms = waited.as_millis() as u64,
                window_start,
                "admission granted after wait"
            );
            return Step::Done(Ok(Permit { window_start_millis: window_start, waited }));
        }
        if now >= queued.deadline {
            state.abandon(queued.ticket);
            log_timeout(queued.budget, waited, queued.position);
            return Step::Done(Err(AcquireTimeout { waited, timeout: queued.budget }));
        }

        let wake_at = state.window_start.saturating_add(self.config.period_millis()).min(queued.deadline);
        Step::Wait(Duration::from_millis(wake_at.saturating_sub(now)))
    }

    /// Withdraw a queued caller that stopped waiting. A permit already handed to it
    /// goes back to the window it came from and on to the next caller in line.
    fn withdraw(&self, ticket: u64) {
        let mut state = self.lock();
        match state.admitted.remove(&ticket) {
            Some(window_start) => {
                if window_start == state.window_start {
                    state.granted = state.granted.saturating_sub(1);
                }
                let now = self.clock.now_millis();
                self.refresh(&mut state, now);
            }
            None => state.abandon(ticket),
        }
        tracing::debug!(ticket, "admission wait cancelled");
    }
}

fn log_timeout(budget: Duration, waited: Duration, position: u64) {
    if budget.is_zero() {
        tracing::debug!(position, "admission refused; window full");
    } else {
        tracing::warn!(
            waited_ms = waited.as_millis() as u64,
            timeout_ms = budget.as_millis() as u64,
            position,
            "admission timed out"
        );
    }
}

/// Withdraws an async caller's place in the queue if its future is dropped mid-wait.
struct QueuedGuard<'a> {
    shared: &'a Shared,
    ticket: u64,
    settled: bool,
}

impl Drop for QueuedGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.shared.withdraw(self.ticket);
        }
    }
}

/// Fixed-window admission gate.
///
/// Clones share the same window, so every handle competes for the same pool of permits.
///
/// # Examples
/// ```
/// use windowgate::{AdmissionGate, GateConfig};
/// use std::time::Duration;
///
/// let gate = AdmissionGate::new(GateConfig::new(2, Duration::from_secs(1), Duration::ZERO).unwrap());
/// assert!(gate.acquire().is_ok());
/// assert!(gate.acquire().is_ok());
/// assert!(gate.acquire().is_err());
/// ```
#[derive(Clone)]
pub struct AdmissionGate {
    inner: Arc<Shared>,
}

impl AdmissionGate {
    /// Create a gate reading the process monotonic clock.
    pub fn new(config: GateConfig) -> Self {
        Self::with_clock(config, MonotonicClock::default())
    }

    /// Create a gate reading an explicit clock (useful for deterministic tests).
    ///
    /// The first window begins at the clock's current reading.
    pub fn with_clock<C: Clock + 'static>(config: GateConfig, clock: C) -> Self {
        let now = clock.now_millis();
        Self {
            inner: Arc::new(Shared {
                state: Mutex::new(WindowState::new(now)),
                wakeup: Condvar::new(),
                async_wakeup: Notify::new(),
                config,
                clock: Arc::new(clock),
            }),
        }
    }

    /// Configuration this gate was built with.
    pub fn config(&self) -> &GateConfig {
        &self.inner.config
    }

    /// Acquire a permit, blocking the calling thread for up to the configured acquire timeout.
    ///
    /// # Behavior
    /// - **Open window**: the permit is granted immediately.
    /// - **Full window**: the caller queues behind earlier callers and is admitted when a
    ///   later window has room for it. If that would happen after the acquire timeout, the
    ///   call fails at once instead of waiting.
    ///
    /// # Errors
    /// Returns [`AcquireTimeout`] if no permit could be granted within the acquire timeout.
    pub fn acquire(&self) -> Result<Permit, AcquireTimeout> {
        self.acquire_within(self.inner.config.acquire_timeout())
    }

    /// Acquire a permit only if one is available right now.
    pub fn try_acquire(&self) -> Result<Permit, AcquireTimeout> {
        self.acquire_within(Duration::ZERO)
    }

    /// Acquire a permit from async code without blocking a runtime worker.
    ///
    /// Queues exactly like [`acquire`](Self::acquire). Dropping the future while it waits
    /// gives up its place in the queue, and a permit already handed to it passes to the
    /// next caller in line. Must be polled within a tokio runtime with the time driver enabled.
    pub async fn acquire_async(&self) -> Result<Permit, AcquireTimeout> {
        let shared = &*self.inner;
        let queued = {
            let mut state = shared.lock();
            match shared.admit(&mut state, shared.config.acquire_timeout())? {
                Admission::Granted(permit) => return Ok(permit),
                Admission::Queued(queued) => queued,
            }
        };
        let mut guard = QueuedGuard { shared, ticket: queued.ticket, settled: false };

        loop {
            let mut notified = std::pin::pin!(shared.async_wakeup.notified());
            notified.as_mut().enable();

            let step = {
                let mut state = shared.lock();
                shared.check(&mut state, &queued)
            };
            match step {
                Step::Done(outcome) => {
                    guard.settled = true;
                    return outcome;
                }
                Step::Wait(pause) => {
                    let _ = tokio::time::timeout(pause, notified).await;
                }
            }
        }
    }

    /// Current window state.
    pub fn snapshot(&self) -> GateSnapshot {
        let state = self.inner.lock();
        GateSnapshot {
            window_start_millis: state.window_start,
            granted: state.granted,
            waiting: state.waiters.len(),
            limit: self.inner.config.limit(),
        }
    }

    /// Wake every waiting caller so it re-reads the clock.
    ///
    /// Callers already wake on their own at window boundaries; this is needed when a
    /// virtual clock such as [`ManualClock`](crate::ManualClock) is advanced by hand.
    pub fn wake_waiters(&self) {
        let _state = self.inner.lock();
        self.inner.notify_all();
    }

    fn acquire_within(&self, budget: Duration) -> Result<Permit, AcquireTimeout> {
        let shared = &*self.inner;
        let mut state = shared.lock();
        let queued = match shared.admit(&mut state, budget)? {
            Admission::Granted(permit) => return Ok(permit),
            Admission::Queued(queued) => queued,
        };

        loop {
            match shared.check(&mut state, &queued) {
                Step::Done(outcome) => return outcome,
                Step::Wait(pause) => state = shared.park(state, pause),
            }
        }
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

impl fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("config", &self.inner.config)
            .field("clock", &self.inner.clock)
            .finish_non_exhaustive()
    }
}
