use std::time::Duration;

use crate::{DispatcherConfig, Priority, config::MIN_IDLE_TIMEOUT};

/// Per-handling configuration.
///
/// Created automatically by [`Dispatcher::add_handling`] using the defaults
/// from [`DispatcherConfig`], or customized via [`HandlingBuilder`].
///
/// # Examples
///
/// ```rust
/// use kestrel::{DispatcherConfig, HandlingConfig, Priority};
///
/// let config = HandlingConfig::new(&DispatcherConfig::default())
///     .with_queue_capacity(64)
///     .with_workers(4)
///     .with_priority(Priority::High);
///
/// assert_eq!(config.queue_capacity(), 64);
/// assert_eq!(config.workers(), 4);
/// ```
///
/// [`Dispatcher::add_handling`]: crate::Dispatcher::add_handling
/// [`HandlingBuilder`]: crate::HandlingBuilder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HandlingConfig {
    queue_capacity: usize,
    workers: usize,
    priority: Priority,
    idle_timeout: Duration,
}

impl HandlingConfig {
    /// Create a new config inheriting defaults from the dispatcher's config.
    pub fn new(global_config: &DispatcherConfig) -> Self {
        Self {
            queue_capacity: global_config.default_queue_capacity(),
            workers: global_config.default_workers(),
            priority: global_config.default_priority(),
            idle_timeout: global_config.idle_timeout(),
        }
    }

    /// Set the capacity of the queue created for this handling.
    ///
    /// Ignored when an explicit queue is passed to
    /// [`HandlingBuilder::queue`](crate::HandlingBuilder::queue).
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Set the initial worker pool size. Zero is treated as one.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Values below 1ms are raised to 1ms.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout.max(MIN_IDLE_TIMEOUT);
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }
}

impl Default for HandlingConfig {
    fn default() -> Self {
        HandlingConfig::new(&DispatcherConfig::default())
    }
}

impl From<&DispatcherConfig> for HandlingConfig {
    fn from(config: &DispatcherConfig) -> Self {
        HandlingConfig::new(config)
    }
}
