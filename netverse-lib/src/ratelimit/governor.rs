use dashmap::DashMap;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::{Instant, sleep};

use super::queue::{Job, OverflowQueue};
use crate::ratelimit::{
    Admission, GovernorConfig, GovernorKey, KeyConfigs, KeyLimits, KeyStats, KeyStatsMap,
    RateLimitError, RequestLog,
};
use crate::retry::RateLimitExt;
use crate::types::Result;

/// Shortest pause of a drain loop waiting for a window slot. A log entry
/// exactly `window` old still counts, so a zero reset time needs one more tick.
const MIN_SLOT_WAIT: Duration = Duration::from_millis(1);

/// State of a single key: its admission log, overflow queue and statistics.
#[derive(Debug)]
struct KeyState {
    key: GovernorKey,
    limits: KeyLimits,
    log: Mutex<RequestLog>,
    queue: Mutex<OverflowQueue>,
    stats: Mutex<KeyStats>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // The guarded data stays consistent even if a holder panicked
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl KeyState {
    fn new(key: GovernorKey, limits: KeyLimits) -> Self {
        Self {
            key,
            log: Mutex::new(RequestLog::new(limits.max_requests, limits.window)),
            queue: Mutex::new(OverflowQueue::new(limits.queue_size)),
            stats: Mutex::new(KeyStats::default()),
            limits,
        }
    }

    fn check(&self) -> Admission {
        let admission = lock(&self.log).check(Instant::now());
        self.record(|stats| match admission {
            Admission::Granted => stats.admitted += 1,
            Admission::Throttled { .. } => stats.throttled += 1,
        });
        admission
    }

    fn queue(&self) -> MutexGuard<'_, OverflowQueue> {
        lock(&self.queue)
    }

    fn record(&self, update: impl FnOnce(&mut KeyStats)) {
        update(&mut lock(&self.stats));
    }

    fn stats(&self) -> KeyStats {
        *lock(&self.stats)
    }

    /// Wait until the window has room and take the slot
    async fn wait_for_slot(&self) {
        loop {
            match self.check() {
                Admission::Granted => return,
                Admission::Throttled { reset_in } => {
                    log::debug!(
                        "Key {} draining: window full, next slot in {}ms",
                        self.key,
                        reset_in.as_millis()
                    );
                    sleep(reset_in.max(MIN_SLOT_WAIT)).await;
                }
            }
        }
    }
}

/// Admission controller for outbound operations, keyed by [`GovernorKey`].
///
/// The `Governor` guarantees that an operation is started at most
/// `max_requests` times within any rolling `window` per key. Operations
/// that find the window full, or that fail with an upstream rate-limit
/// signal (see [`RateLimitExt`]), are retried with capped exponential
/// backoff. Once `max_retries` is spent they are parked in a bounded FIFO
/// which a background task drains one by one at the nominal request
/// spacing.
///
/// # Architecture
///
/// - State for a key is created lazily on first use
/// - Keys never share state: windows, queues and drain loops are per key
/// - Thread-safe using `DashMap` for the key map and short-lived locks for
///   the per-key state; no lock is held while waiting
///
/// Cloning a `Governor` is cheap and the clones share all state.
#[derive(Debug, Clone)]
pub struct Governor {
    /// Map of key to its state, created on-demand
    keys: Arc<DashMap<GovernorKey, Arc<KeyState>>>,

    /// Global limits
    config: Arc<GovernorConfig>,

    /// Per-key overrides of the global limits
    key_configs: Arc<KeyConfigs>,
}

impl Default for Governor {
    fn default() -> Self {
        Self {
            keys: Arc::new(DashMap::new()),
            config: Arc::new(GovernorConfig::default()),
            key_configs: Arc::new(KeyConfigs::new()),
        }
    }
}

impl Governor {
    /// Create a new `Governor` applying `config` to every key
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::InvalidConfig`] if the limits are unusable
    /// (no request allowed or an empty window).
    ///
    /// # Examples
    ///
    /// ```
    /// use netverse_lib::{Governor, GovernorConfig};
    ///
    /// let governor = Governor::new(GovernorConfig::default()).unwrap();
    /// assert_eq!(governor.active_key_count(), 0);
    /// ```
    pub fn new(config: GovernorConfig) -> Result<Self> {
        Self::with_key_configs(config, KeyConfigs::new())
    }

    /// Create a new `Governor` with per-key overrides
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::InvalidConfig`] if the global limits or the
    /// limits of any overridden key are unusable.
    pub fn with_key_configs(config: GovernorConfig, key_configs: KeyConfigs) -> Result<Self> {
        config.validate()?;
        for (key, key_config) in &key_configs {
            key_config
                .limits(&config)
                .validate()
                .map_err(|e| RateLimitError::InvalidConfig {
                    reason: format!("key {key}: {e}"),
                })?;
        }

        Ok(Self {
            keys: Arc::new(DashMap::new()),
            config: Arc::new(config),
            key_configs: Arc::new(key_configs),
        })
    }

    /// Run `operation` once an admission slot for `key` is available.
    ///
    /// The operation is a re-invocable closure: it is called again for every
    /// retry. This method:
    /// 1. Takes a slot in the key's window, backing off while it is full
    /// 2. Invokes the operation and returns its value on success
    /// 3. Retries failures tagged as rate limited with backoff; any other
    ///    failure is returned right away
    /// 4. Queues the operation once `max_retries` is exhausted and waits for
    ///    the drain loop to run it
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The operation fails with an error that is not a rate-limit signal
    /// - The overflow queue of the key is full ([`RateLimitError::QueueFull`])
    /// - The queued operation eventually fails (its error is returned as is)
    /// - The drain loop was dropped before running the operation
    ///   ([`RateLimitError::QueueDropped`])
    ///
    /// # Examples
    ///
    /// ```
    /// # use netverse_lib::{Governor, Result};
    /// # #[tokio::main]
    /// # async fn main() -> Result<()> {
    /// let governor = Governor::default();
    /// let value = governor.execute("crawler", || async { Ok("page") }).await?;
    /// assert_eq!(value, "page");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute<T, F, Fut>(&self, key: impl Into<GovernorKey>, operation: F) -> Result<T>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let state = self.get_or_create(key.into());
        let limits = state.limits;
        let mut attempt = 0;

        loop {
            if let Admission::Throttled { reset_in } = state.check() {
                if attempt >= limits.max_retries {
                    log::debug!(
                        "Key {} still throttled after {attempt} retries, queuing",
                        state.key
                    );
                    break;
                }
                let delay = limits.backoff(attempt);
                log::debug!(
                    "Key {} throttled (slot free in {}ms), retrying in {}ms",
                    state.key,
                    reset_in.as_millis(),
                    delay.as_millis()
                );
                sleep(delay).await;
                attempt += 1;
                state.record(|stats| stats.retries += 1);
                continue;
            }

            let pending = operation();
            match pending.await {
                Ok(value) => {
                    Self::kick_drain(&state);
                    return Ok(value);
                }
                Err(e) if e.is_rate_limited() => {
                    state.record(|stats| stats.rate_limit_signals += 1);
                    if attempt >= limits.max_retries {
                        log::debug!(
                            "Key {} still rate limited upstream after {attempt} retries, queuing",
                            state.key
                        );
                        break;
                    }
                    let delay = limits.backoff(attempt);
                    log::debug!(
                        "Key {} rate limited upstream ({e}), retrying in {}ms",
                        state.key,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                    attempt += 1;
                    state.record(|stats| stats.retries += 1);
                }
                Err(e) => {
                    state.record(|stats| stats.failed += 1);
                    return Err(e);
                }
            }
        }

        Self::enqueue(state, operation).await
    }

    /// Park the operation in the key's overflow queue and wait for its result
    async fn enqueue<T, F, Fut>(state: Arc<KeyState>, operation: F) -> Result<T>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            let pending = operation();
            async move {
                let result = pending.await;
                let succeeded = result.is_ok();
                // The caller may have stopped waiting
                let _ = tx.send(result);
                succeeded
            }
            .boxed()
        });

        let spawn_drain = {
            let mut queue = state.queue();
            if queue.push(job).is_err() {
                let capacity = queue.capacity();
                drop(queue);
                state.record(|stats| stats.rejected += 1);
                log::warn!(
                    "Overflow queue for {} is full ({capacity} pending), rejecting operation",
                    state.key
                );
                return Err(RateLimitError::QueueFull {
                    key: state.key.clone(),
                    capacity,
                }
                .into());
            }
            log::debug!("Key {} queued operation ({} pending)", state.key, queue.len());
            queue.begin_drain()
        };
        state.record(|stats| stats.queued += 1);

        if spawn_drain {
            tokio::spawn(Self::process_queue(Arc::clone(&state)));
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(RateLimitError::QueueDropped {
                key: state.key.clone(),
            }
            .into()),
        }
    }

    /// Start a drain loop for the key unless one is running or there is
    /// nothing queued
    fn kick_drain(state: &Arc<KeyState>) {
        if state.queue().begin_drain() {
            tokio::spawn(Self::process_queue(Arc::clone(state)));
        }
    }

    /// Drain the key's queue in FIFO order. Every entry takes a slot in the
    /// key's window and consecutive entries are spaced by
    /// [`KeyLimits::spacing`]. Only one loop per key runs at a time.
    ///
    /// A panicking entry counts as failed; its caller receives
    /// [`RateLimitError::QueueDropped`] and the loop moves on.
    async fn process_queue(state: Arc<KeyState>) {
        let spacing = state.limits.spacing();
        loop {
            let Some(job) = state.queue().pop_or_finish() else {
                return;
            };

            state.wait_for_slot().await;
            let succeeded = AssertUnwindSafe(async move { job().await })
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    log::warn!("Queued operation for {} panicked", state.key);
                    false
                });
            state.record(|stats| {
                stats.drained += 1;
                if !succeeded {
                    stats.failed += 1;
                }
            });

            if state.queue().finish_if_empty() {
                log::debug!("Key {} queue drained", state.key);
                return;
            }
            sleep(spacing).await;
        }
    }

    /// Get an existing key state or create a new one
    fn get_or_create(&self, key: GovernorKey) -> Arc<KeyState> {
        if let Some(state) = self.keys.get(&key) {
            return Arc::clone(state.value());
        }

        let limits = self.limits(&key);
        // Another task may have created it in the meantime; keep theirs
        let entry = self
            .keys
            .entry(key.clone())
            .or_insert_with(|| Arc::new(KeyState::new(key, limits)));
        Arc::clone(entry.value())
    }

    /// The effective limits of a key, including its overrides
    #[must_use]
    pub fn limits(&self, key: &GovernorKey) -> KeyLimits {
        self.key_configs
            .get(key)
            .map_or_else(|| self.config.limits(), |c| c.limits(&self.config))
    }

    /// The global configuration
    #[must_use]
    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Get statistics for a specific key.
    ///
    /// Keys that have not been used yet report empty statistics.
    #[must_use]
    pub fn key_stats(&self, key: impl Into<GovernorKey>) -> KeyStats {
        self.keys
            .get(&key.into())
            .map(|state| state.stats())
            .unwrap_or_default()
    }

    /// Get statistics for all keys that have been used
    #[must_use]
    pub fn all_key_stats(&self) -> KeyStatsMap {
        self.keys
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().stats()))
            .collect::<std::collections::HashMap<_, _>>()
            .into()
    }

    /// Number of operations currently waiting in the key's overflow queue.
    /// An entry taken by the drain loop no longer counts.
    #[must_use]
    pub fn queued(&self, key: impl Into<GovernorKey>) -> usize {
        self.keys
            .get(&key.into())
            .map_or(0, |state| state.queue().len())
    }

    /// Number of keys with state
    #[must_use]
    pub fn active_key_count(&self) -> usize {
        self.keys.len()
    }

    /// Forget the state of a key. Returns `true` if the key was known.
    ///
    /// A drain loop already running for the key finishes its queue; the next
    /// call for the key starts from an empty window.
    pub fn remove_key(&self, key: impl Into<GovernorKey>) -> bool {
        self.keys.remove(&key.into()).is_some()
    }
}
