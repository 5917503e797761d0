//! Per-client admission control.
//!
//! # Algorithm
//!
//! Every client identity gets its own direct governor limiter, a Generic Cell
//! Rate Algorithm (GCRA) equivalent to a token bucket of capacity `burst`
//! refilled at `rps` tokens per second. A new client starts with a full
//! bucket.
//!
//! # Bounded growth
//!
//! Entries record the last time their client was seen. A background sweep
//! removes entries idle for longer than [`IDLE_TTL`] every
//! [`SWEEP_INTERVAL`], so the map only holds recently active clients.
//!
//! # Locking
//!
//! One mutex guards the map. Lookup-or-create, the token check and the
//! last-seen update happen under it, as does the sweep. Nothing awaits while
//! it is held.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use governor::clock::{Clock, DefaultClock, Reference};
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace};

use crate::metrics::{record_evictions, set_tracked_clients};

/// How often idle clients are swept.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Idle time after which a client entry is evicted.
pub const IDLE_TTL: Duration = Duration::from_secs(180);

/// Error type for limiter configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLimitError {
    /// Rate is zero, negative, not finite, or too small to express.
    InvalidRate(f64),
    /// Burst capacity cannot be zero.
    ZeroBurst,
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitError::InvalidRate(rps) => {
                write!(f, "limiter rate must be a finite number greater than 0, got {rps}")
            }
            RateLimitError::ZeroBurst => write!(f, "limiter burst must be greater than 0"),
        }
    }
}

impl std::error::Error for RateLimitError {}

/// Admission settings, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterSettings {
    /// Sustained tokens per second.
    pub rps: f64,
    /// Bucket capacity.
    pub burst: u32,
    pub enabled: bool,
}

impl LimiterSettings {
    /// Build the governor quota. A disabled limiter has none.
    fn quota(&self) -> Result<Option<Quota>, RateLimitError> {
        if !self.enabled {
            return Ok(None);
        }
        if !self.rps.is_finite() || self.rps <= 0.0 {
            return Err(RateLimitError::InvalidRate(self.rps));
        }
        let burst = NonZeroU32::new(self.burst).ok_or(RateLimitError::ZeroBurst)?;
        let period = Duration::try_from_secs_f64(1.0 / self.rps)
            .map_err(|_| RateLimitError::InvalidRate(self.rps))?;
        let quota = Quota::with_period(period).ok_or(RateLimitError::InvalidRate(self.rps))?;
        Ok(Some(quota.allow_burst(burst)))
    }
}

type DirectLimiter<C> = RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

struct ClientEntry<C: Clock> {
    limiter: DirectLimiter<C>,
    last_seen: C::Instant,
}

/// Registry of per-client token buckets.
///
/// Built once at startup and shared behind an `Arc`. The clock is generic so
/// tests can drive time with governor's `FakeRelativeClock`.
pub struct ClientRegistry<C: Clock = DefaultClock> {
    clients: Mutex<HashMap<String, ClientEntry<C>>>,
    quota: Option<Quota>,
    clock: C,
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl ClientRegistry<DefaultClock> {
    /// Create a registry on the monotonic system clock.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] when the limiter is enabled with a
    /// non-positive rate or a zero burst.
    pub fn new(settings: LimiterSettings) -> Result<Self, RateLimitError> {
        Self::with_clock(settings, DefaultClock::default())
    }
}

impl<C: Clock + Clone> ClientRegistry<C> {
    pub fn with_clock(settings: LimiterSettings, clock: C) -> Result<Self, RateLimitError> {
        let quota = settings.quota()?;
        if quota.is_some() {
            debug!(
                rps = settings.rps,
                burst = settings.burst,
                "Per-client rate limiting enabled"
            );
        }
        Ok(Self {
            clients: Mutex::new(HashMap::new()),
            quota,
            clock,
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.quota.is_some()
    }

    /// Spend one token for `client`, creating a full bucket on first sight.
    ///
    /// Always `true` when the limiter is disabled; no entry is recorded then.
    pub fn admit(&self, client: &str) -> bool {
        let Some(quota) = self.quota else {
            return true;
        };
        let now = self.clock.now();

        let mut clients = self.lock();
        let before = clients.len();
        let entry = clients
            .entry(client.to_owned())
            .or_insert_with(|| ClientEntry {
                limiter: RateLimiter::new(quota, InMemoryState::default(), self.clock.clone()),
                last_seen: now,
            });
        entry.last_seen = now;
        let admitted = entry.limiter.check().is_ok();

        if clients.len() != before {
            set_tracked_clients(clients.len());
        }
        admitted
    }

    /// Remove every client idle for longer than [`IDLE_TTL`].
    ///
    /// Returns the number of evicted entries.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut clients = self.lock();
        let before = clients.len();
        clients.retain(|_, entry| Duration::from(now.duration_since(entry.last_seen)) <= IDLE_TTL);
        let evicted = before - clients.len();

        if evicted > 0 {
            record_evictions(evicted);
            set_tracked_clients(clients.len());
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, client: &str) -> bool {
        self.lock().contains_key(client)
    }

    /// The map stays consistent across a panic in another holder: every
    /// mutation under the lock is a single insert, update or retain.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClientEntry<C>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gracefully stop the sweep task.
    ///
    /// Signals cancellation, closes the tracker and waits for the task to
    /// finish. Safe to call when no sweeper was spawned.
    pub async fn shutdown(&self) {
        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;
        debug!("Rate limiter sweep stopped");
    }
}

impl<C> ClientRegistry<C>
where
    C: Clock + Clone + Send + Sync + 'static,
    C::Instant: Send + Sync,
{
    /// Spawn the periodic eviction task on the current runtime.
    ///
    /// Does nothing for a disabled limiter.
    pub fn spawn_sweeper(self: &Arc<Self>) {
        if !self.is_enabled() {
            return;
        }

        let registry = Arc::clone(self);
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(SWEEP_INTERVAL);
            ticker.tick().await; // first tick completes immediately

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        debug!("Rate limiter sweep received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let evicted = registry.sweep();
                        if evicted > 0 {
                            info!(evicted, remaining = registry.len(), "Evicted idle rate limiter clients");
                        } else {
                            trace!("Rate limiter sweep found no idle clients");
                        }
                    }
                }
            }
        });
    }
}
