use std::time::Duration;

use crate::Priority;

/// Shortest wait an idle worker performs, so a zero timeout cannot spin.
pub(crate) const MIN_IDLE_TIMEOUT: Duration = Duration::from_millis(1);

/// Dispatcher-wide defaults applied to newly registered handlings.
///
/// Use the builder pattern to customize, or use [`Default`] for sensible
/// defaults. Individual handlings override these through
/// [`HandlingBuilder`](crate::HandlingBuilder).
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use kestrel::{DispatcherConfig, Priority};
///
/// let config = DispatcherConfig::default()
///     .with_default_queue_capacity(4096)    // Larger queues
///     .with_default_workers(2)              // Two workers per handling
///     .with_default_priority(Priority::High)
///     .with_idle_timeout(Duration::from_millis(50));
///
/// assert_eq!(config.default_queue_capacity(), 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DispatcherConfig {
    /// Capacity of each handling's queue.
    /// Default: 1024
    default_queue_capacity: usize,

    /// Worker threads spawned per handling.
    /// Default: 1
    default_workers: usize,

    /// Default: [`Priority::Medium`]
    default_priority: Priority,

    /// Longest time an idle worker waits on its queue before re-checking
    /// its handling's state.
    /// Default: 100ms
    idle_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            default_queue_capacity: 1024,
            default_workers: 1,
            default_priority: Priority::Medium,
            idle_timeout: Duration::from_millis(100),
        }
    }
}

impl DispatcherConfig {
    /// Set the queue capacity for new handlings.
    pub fn with_default_queue_capacity(mut self, capacity: usize) -> Self {
        self.default_queue_capacity = capacity;
        self
    }

    /// Returns the queue capacity for new handlings.
    pub fn default_queue_capacity(&self) -> usize {
        self.default_queue_capacity
    }

    /// Set the number of workers spawned for new handlings.
    ///
    /// Zero is treated as one when a handling is created.
    pub fn with_default_workers(mut self, workers: usize) -> Self {
        self.default_workers = workers;
        self
    }

    /// Returns the number of workers spawned for new handlings.
    pub fn default_workers(&self) -> usize {
        self.default_workers
    }

    pub fn with_default_priority(mut self, priority: Priority) -> Self {
        self.default_priority = priority;
        self
    }

    pub fn default_priority(&self) -> Priority {
        self.default_priority
    }

    /// Set how long idle workers wait before re-checking their state.
    ///
    /// Workers are woken immediately on new events and on stop, so this
    /// only bounds the latency of missed wake-ups. Values below 1ms are
    /// raised to 1ms.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout.max(MIN_IDLE_TIMEOUT);
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }
}
