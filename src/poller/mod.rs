//! Status polling sessions
//!
//! A [`StatusPoller`] watches externally processed payments until they reach a
//! terminal status. Each watched payment gets one session: a spawned task that
//! checks immediately, then every [`PollOptions::interval`], and gives up with an
//! `expired` update after [`PollOptions::timeout`].
//!
//! Guarantees per session:
//!
//! - checks never overlap; the next tick waits for the previous check
//! - the callback fires only when the mapped status changes
//! - after a terminal status (`succeeded`, `failed`, `expired`) nothing else runs
//! - a failed check is logged and retried on the next tick; only the timeout ends
//!   an unresponsive session
//! - after [`PollHandle::stop`] no callback fires, even for a check already in flight
//!
//! Starting a session for a payment that already has one stops the old session
//! first.
//!
//! # Examples
//!
//! ```no_run
//! use rust_payintent::client::PaymentIntentClient;
//! use rust_payintent::poller::{PollOptions, StatusPoller};
//! use rust_payintent::types::ClientConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> rust_payintent::Result<()> {
//! let client = PaymentIntentClient::in_memory(ClientConfig::new("https://api.example.com"))?;
//! let poller = StatusPoller::new(Arc::new(client))
//!     .with_options(PollOptions::default().with_interval(Duration::from_secs(3)));
//!
//! let handle = poller.start("pay_123", |update| {
//!     println!("{} -> {}", update.payment_id, update.status);
//! });
//!
//! // On teardown
//! handle.stop();
//! poller.dispose();
//! # Ok(())
//! # }
//! ```

use crate::types::constants::{DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT};
use crate::types::{map_backend_status, PaymentIntent, PaymentStatus, StatusQueryResult};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;


/// Anything that can report the current status of a payment
///
/// Sources may hand back unmapped backend strings as [`PaymentStatus::Other`];
/// the poller runs them through [`map_backend_status`] before comparing or
/// reporting.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn query_status(&self, payment_id: &str) -> Result<StatusQueryResult>;
}

/// Shortest delay the poller will wait between two checks
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Timing of a poll session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay between checks, never shorter than [`MIN_POLL_INTERVAL`]
    pub interval: Duration,
    /// How long to wait for a terminal status before reporting `expired`
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl PollOptions {
    /// Set the check interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Interval actually used, clamped to [`MIN_POLL_INTERVAL`]
    pub fn effective_interval(&self) -> Duration {
        self.interval.max(MIN_POLL_INTERVAL)
    }

    /// Set the session timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A status change delivered to the session callback
#[derive(Debug, Clone)]
pub struct PollUpdate {
    /// Payment being watched
    pub payment_id: String,
    /// Newly observed canonical status
    pub status: PaymentStatus,
    /// Intent record from the status response, if it had one
    pub payment: Option<PaymentIntent>,
    /// Status response body; `Null` for timeout updates
    pub raw: Value,
    /// The session gave up waiting; `status` is `Expired`
    pub timed_out: bool,
}

/// Shared stop state of one session
#[derive(Debug, Default)]
struct SessionControl {
    stopped: AtomicBool,
    wake: Notify,
}

impl SessionControl {
    /// Flag the session stopped and wake its task; false if it already was
    fn stop(&self) -> bool {
        let first = !self.stopped.swap(true, Ordering::SeqCst);
        if first {
            self.wake.notify_one();
        }
        first
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

type Registry = Arc<Mutex<HashMap<String, Arc<SessionControl>>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<String, Arc<SessionControl>>> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to a running poll session
#[derive(Debug)]
pub struct PollHandle {
    payment_id: String,
    control: Arc<SessionControl>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop the session; a no-op once it has ended
    pub fn stop(&self) {
        if self.control.stop() {
            tracing::info!(payment_id = %self.payment_id, "Poll session stopped");
        }
    }

    /// Whether the session has ended, by stop, terminal status or timeout
    pub fn is_stopped(&self) -> bool {
        self.control.is_stopped()
    }

    /// Payment being watched
    pub fn payment_id(&self) -> &str {
        &self.payment_id
    }

    /// Wait for the session task to exit
    pub async fn finished(self) {
        if let Err(e) = self.task.await {
            tracing::error!(payment_id = %self.payment_id, "Poll session task failed: {}", e);
        }
    }
}

/// Owns the poll sessions of one caller
///
/// Construct one per consumer and [`dispose`](StatusPoller::dispose) it on
/// teardown. Sessions are spawned on the current Tokio runtime.
pub struct StatusPoller {
    source: Arc<dyn StatusSource>,
    options: PollOptions,
    sessions: Registry,
}

impl std::fmt::Debug for StatusPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusPoller")
            .field("options", &self.options)
            .field("active_sessions", &self.active_sessions())
            .finish()
    }
}

impl StatusPoller {
    /// Create a poller reading statuses from `source`
    pub fn new(source: Arc<dyn StatusSource>) -> Self {
        Self {
            source,
            options: PollOptions::default(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Set the default timing for sessions started with [`start`](StatusPoller::start)
    pub fn with_options(mut self, options: PollOptions) -> Self {
        self.options = options;
        self
    }

    /// Start watching `payment_id` with the default timing
    pub fn start<F>(&self, payment_id: &str, on_change: F) -> PollHandle
    where
        F: FnMut(&PollUpdate) + Send + 'static,
    {
        self.start_with(payment_id, self.options, on_change)
    }

    /// Start watching `payment_id` with explicit timing
    ///
    /// Any session already watching this payment is stopped first.
    pub fn start_with<F>(&self, payment_id: &str, options: PollOptions, on_change: F) -> PollHandle
    where
        F: FnMut(&PollUpdate) + Send + 'static,
    {
        let control = Arc::new(SessionControl::default());

        if let Some(previous) = lock(&self.sessions).insert(payment_id.to_string(), control.clone())
        {
            if previous.stop() {
                tracing::info!(payment_id, "Replaced existing poll session");
            }
        }

        tracing::info!(
            payment_id,
            interval = ?options.effective_interval(),
            timeout = ?options.timeout,
            "Poll session started"
        );

        let session = Session {
            payment_id: payment_id.to_string(),
            options,
            source: self.source.clone(),
            control: control.clone(),
            registry: self.sessions.clone(),
            on_change: Box::new(on_change),
            last_reported: None,
        };
        let task = tokio::spawn(session.run());

        PollHandle {
            payment_id: payment_id.to_string(),
            control,
            task,
        }
    }

    /// Stop the session watching `payment_id`; false if there was none
    pub fn stop(&self, payment_id: &str) -> bool {
        match lock(&self.sessions).remove(payment_id) {
            Some(control) => control.stop(),
            None => false,
        }
    }

    /// Whether a session is watching `payment_id`
    pub fn is_active(&self, payment_id: &str) -> bool {
        lock(&self.sessions)
            .get(payment_id)
            .map(|control| !control.is_stopped())
            .unwrap_or(false)
    }

    /// Number of running sessions
    pub fn active_sessions(&self) -> usize {
        lock(&self.sessions)
            .values()
            .filter(|control| !control.is_stopped())
            .count()
    }

    /// Stop every session
    pub fn dispose(&self) {
        let drained: Vec<_> = lock(&self.sessions).drain().collect();
        let count = drained.iter().filter(|(_, control)| control.stop()).count();
        if count > 0 {
            tracing::info!(sessions = count, "Poll sessions disposed");
        }
    }
}

enum Step<T> {
    Stop,
    Timeout,
    Ready(T),
}

struct Session {
    payment_id: String,
    options: PollOptions,
    source: Arc<dyn StatusSource>,
    control: Arc<SessionControl>,
    registry: Registry,
    on_change: Box<dyn FnMut(&PollUpdate) + Send>,
    last_reported: Option<PaymentStatus>,
}

impl Session {
    async fn run(mut self) {
        let control = self.control.clone();
        let source = self.source.clone();

        let deadline = tokio::time::sleep(self.options.timeout);
        tokio::pin!(deadline);

        // First tick completes immediately
        let mut ticker = tokio::time::interval(self.options.effective_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let step = tokio::select! {
                biased;
                _ = control.wake.notified() => Step::Stop,
                _ = &mut deadline => Step::Timeout,
                _ = ticker.tick() => Step::Ready(()),
            };
            match step {
                Step::Stop => break,
                Step::Timeout => {
                    self.expire();
                    break;
                }
                Step::Ready(()) => {}
            }
            if control.is_stopped() {
                break;
            }

            tracing::debug!(payment_id = %self.payment_id, "Checking payment status");
            let step = tokio::select! {
                biased;
                _ = control.wake.notified() => Step::Stop,
                _ = &mut deadline => Step::Timeout,
                outcome = source.query_status(&self.payment_id) => Step::Ready(outcome),
            };
            let outcome = match step {
                Step::Stop => break,
                Step::Timeout => {
                    self.expire();
                    break;
                }
                Step::Ready(outcome) => outcome,
            };

            // A response that raced a stop must not reach the caller
            if control.is_stopped() {
                break;
            }

            match outcome {
                Ok(result) => {
                    if self.observe(result) {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        payment_id = %self.payment_id,
                        "Status check failed, retrying on next tick: {}",
                        e
                    );
                }
            }
        }

        control.stopped.store(true, Ordering::SeqCst);
        let mut sessions = lock(&self.registry);
        if sessions
            .get(&self.payment_id)
            .is_some_and(|current| Arc::ptr_eq(current, &control))
        {
            sessions.remove(&self.payment_id);
        }
    }

    /// Record a check result; true once the status is terminal
    fn observe(&mut self, result: StatusQueryResult) -> bool {
        let status = match result.status {
            PaymentStatus::Other(raw) => map_backend_status(&raw),
            status => status,
        };

        if self.last_reported.as_ref() != Some(&status) {
            self.last_reported = Some(status.clone());
            self.report(PollUpdate {
                payment_id: self.payment_id.clone(),
                status: status.clone(),
                payment: result.payment,
                raw: result.raw,
                timed_out: false,
            });
        }

        if status.is_terminal() {
            tracing::info!(payment_id = %self.payment_id, %status, "Payment reached terminal status");
            return true;
        }
        false
    }

    fn expire(&mut self) {
        if self.control.is_stopped() {
            return;
        }
        tracing::info!(
            payment_id = %self.payment_id,
            timeout = ?self.options.timeout,
            "Poll session timed out"
        );
        self.last_reported = Some(PaymentStatus::Expired);
        self.report(PollUpdate {
            payment_id: self.payment_id.clone(),
            status: PaymentStatus::Expired,
            payment: None,
            raw: Value::Null,
            timed_out: true,
        });
    }

    fn report(&mut self, update: PollUpdate) {
        if self.control.is_stopped() {
            return;
        }
        (self.on_change)(&update);
    }
}
