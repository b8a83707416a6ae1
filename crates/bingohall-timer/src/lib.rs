//! Turn-deadline scheduling for Bingohall.
//!
//! Two pieces:
//!
//! - [`Scheduler`]: "deliver this payload after `delay`". There is no
//!   cancel: a newer deadline supersedes an older one, and whoever
//!   receives the payload checks whether it is still current before
//!   acting on it.
//! - [`Clock`]: unix-millisecond timestamps for deadlines that are
//!   stored on rooms and compared when a payload arrives.
//!
//! # Integration
//!
//! The engine arms a deadline whenever a turn begins and drains the
//! receiver in a single pump task:
//!
//! ```ignore
//! let (scheduler, mut fired) = TokioScheduler::new();
//! scheduler.schedule(Duration::from_secs(60), TurnTimeout { .. });
//!
//! while let Some(timeout) = fired.recv().await {
//!     engine.handle_timeout(timeout).await;
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::time::Instant as TokioInstant;
use tracing::trace;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Wall-clock milliseconds, advanced by Tokio's monotonic clock.
///
/// The unix time is read once at construction; after that the clock moves
/// with `tokio::time::Instant`. Under `#[tokio::test(start_paused = true)]`
/// it therefore follows virtual time, so stored deadlines and fired
/// timers agree with each other in tests as they do in production.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: TokioInstant,
    origin_unix_ms: u64,
}

impl Clock {
    /// A clock anchored at the current system time.
    pub fn new() -> Self {
        let unix_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self::starting_at(unix_ms)
    }

    /// A clock that reads `unix_ms` right now.
    pub fn starting_at(unix_ms: u64) -> Self {
        Self {
            origin: TokioInstant::now(),
            origin_unix_ms: unix_ms,
        }
    }

    /// Current time in unix milliseconds.
    pub fn now_millis(&self) -> u64 {
        self.origin_unix_ms + self.origin.elapsed().as_millis() as u64
    }

    /// The timestamp `delay` from now.
    pub fn deadline_after(&self, delay: Duration) -> u64 {
        self.now_millis() + delay.as_millis() as u64
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Delivers a payload after a delay.
///
/// Delivery may be at-most-once or at-least-once depending on the
/// implementation; receivers must treat every payload as advisory.
pub trait Scheduler<P>: Send + Sync + 'static {
    /// Arms a deadline `delay` from now carrying `payload`.
    fn schedule(&self, delay: Duration, payload: P);
}

/// Counters for a [`TokioScheduler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerMetrics {
    /// Deadlines armed.
    pub armed: u64,
    /// Payloads delivered to the receiver.
    pub fired: u64,
    /// Payloads discarded because the receiver was gone.
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    armed: AtomicU64,
    fired: AtomicU64,
    dropped: AtomicU64,
}

/// A [`Scheduler`] that spawns one sleeping Tokio task per deadline and
/// sends the payload down an unbounded channel when it wakes.
///
/// `schedule` must be called from inside a Tokio runtime.
pub struct TokioScheduler<P> {
    tx: mpsc::UnboundedSender<P>,
    counters: Arc<Counters>,
}

impl<P: Send + 'static> TokioScheduler<P> {
    /// Creates a scheduler and the receiver its payloads arrive on.
    ///
    /// Once the receiver is dropped, deadlines that fire are discarded.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<P>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            tx,
            counters: Arc::new(Counters::default()),
        };
        (scheduler, rx)
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> SchedulerMetrics {
        SchedulerMetrics {
            armed: self.counters.armed.load(Ordering::Relaxed),
            fired: self.counters.fired.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

impl<P: Send + 'static> Scheduler<P> for TokioScheduler<P> {
    fn schedule(&self, delay: Duration, payload: P) {
        self.counters.armed.fetch_add(1, Ordering::Relaxed);
        let tx = self.tx.clone();
        let counters = Arc::clone(&self.counters);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(payload).is_ok() {
                counters.fired.fetch_add(1, Ordering::Relaxed);
                trace!(delay_ms = delay.as_millis() as u64, "deadline fired");
            } else {
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                trace!("deadline fired after receiver closed, dropping");
            }
        });
    }
}

// ---------------------------------------------------------------------------
// ManualScheduler
// ---------------------------------------------------------------------------

/// A deadline recorded by [`ManualScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduled<P> {
    pub delay: Duration,
    pub payload: P,
}

/// A [`Scheduler`] that never fires on its own.
///
/// Deadlines are queued and handed back by [`take`](Self::take), so a
/// caller can deliver them whenever (and as often as) it likes. Useful
/// for driving timeouts by hand and for embedding without a runtime.
pub struct ManualScheduler<P> {
    pending: Mutex<Vec<Scheduled<P>>>,
}

impl<P> ManualScheduler<P> {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Removes and returns every deadline armed so far, oldest first.
    pub fn take(&self) -> Vec<Scheduled<P>> {
        match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// Number of deadlines waiting to be taken.
    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P> Default for ManualScheduler<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Send + 'static> Scheduler<P> for ManualScheduler<P> {
    fn schedule(&self, delay: Duration, payload: P) {
        let entry = Scheduled { delay, payload };
        match self.pending.lock() {
            Ok(mut pending) => pending.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}
