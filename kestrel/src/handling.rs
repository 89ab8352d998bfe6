use std::{fmt, sync::Arc, thread::JoinHandle};

use parking_lot::Mutex;

use crate::{
    BoundedQueue, Event, HandlerRef, HandlingConfig, HandlingName, Priority, Result,
    internal::{HandlingState, spawn_worker},
};

/// A named consumer of one event type: a bounded queue drained by a pool of
/// worker threads that all run the same handler.
///
/// Workers compete for queued events. Each event is handed to exactly one
/// worker, but which worker gets which event is unspecified, and two
/// workers may finish out of enqueue order.
///
/// # Lifecycle
///
/// A handling starts running as soon as it is created. [`stop()`](Self::stop)
/// freezes consumption without touching the queue, and
/// [`start()`](Self::start) resumes it. Dropping the handling stops it and
/// joins every worker; a handler call already in progress always completes.
///
/// Handlings are usually owned by a [`Dispatcher`](crate::Dispatcher), but
/// can be used on their own:
///
/// ```rust
/// use kestrel::{BoundedQueue, Handling, HandlingConfig};
///
/// let handling = Handling::<String>::new(
///     "printer",
///     |line: String| println!("{line}"),
///     BoundedQueue::new(16)?,
///     &HandlingConfig::default().with_workers(2),
/// )?;
/// assert_eq!(handling.amount_handlers(), 2);
/// assert!(handling.add_event("hello".to_string()));
/// # Ok::<(), kestrel::Error>(())
/// ```
pub struct Handling<E: Event> {
    state: Arc<HandlingState<E>>,
    priority: Priority,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<E: Event> Handling<E> {
    /// Create a handling and spawn its workers.
    ///
    /// At least one worker is always spawned, even if the config asks for
    /// zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if a worker thread cannot be
    /// spawned. Workers spawned before the failure are stopped and joined.
    pub fn new<N, H>(
        name: N,
        handler: H,
        queue: BoundedQueue<E>,
        config: &HandlingConfig,
    ) -> Result<Self>
    where
        N: Into<HandlingName>,
        H: Into<HandlerRef<E>>,
    {
        let state = HandlingState::new(
            name.into(),
            handler.into(),
            queue,
            config.idle_timeout(),
        );
        let handling = Handling {
            state: Arc::new(state),
            priority: config.priority(),
            workers: Mutex::new(Vec::new()),
        };
        handling.add_handlers(config.workers().max(1))?;
        tracing::debug!(
            handling = %handling.name(),
            workers = handling.amount_handlers(),
            capacity = handling.capacity(),
            priority = %handling.priority,
            "handling created"
        );
        Ok(handling)
    }

    pub fn name(&self) -> &HandlingName {
        &self.state.name
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub(crate) fn handler(&self) -> &HandlerRef<E> {
        &self.state.handler
    }

    /// Enqueue an event for the workers.
    ///
    /// Succeeds while the handling is stopped: events accumulate and are
    /// processed after [`start()`](Self::start). Returns `false` if the
    /// queue is full, in which case the event is dropped.
    pub fn add_event(&self, event: E) -> bool {
        self.state.queue.push(event)
    }

    /// Stop pulling new events from the queue.
    ///
    /// Queued events stay queued. Calling `stop` on a stopped handling does
    /// nothing.
    pub fn stop(&self) {
        if self.state.is_running() {
            tracing::debug!(handling = %self.name(), "handling stopped");
        }
        self.state.set_running(false);
    }

    /// Resume pulling events after [`stop()`](Self::stop).
    pub fn start(&self) {
        if !self.state.is_running() {
            tracing::debug!(handling = %self.name(), "handling restarted");
        }
        self.state.set_running(true);
    }

    pub fn is_stopped(&self) -> bool {
        !self.state.is_running()
    }

    /// Grow the worker pool by `n` threads. Safe to call while running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if a thread cannot be
    /// spawned; workers spawned before the failure are kept.
    pub fn add_handlers(&self, n: usize) -> Result<()> {
        let mut workers = self.workers.lock();
        for _ in 0..n {
            let index = workers.len();
            workers.push(spawn_worker(self.state.clone(), index)?);
        }
        Ok(())
    }

    /// Number of worker threads in the pool.
    pub fn amount_handlers(&self) -> usize {
        self.workers.lock().len()
    }

    /// Number of events waiting in the queue.
    pub fn num_events(&self) -> usize {
        self.state.queue.occupied()
    }

    /// Capacity of the queue.
    pub fn capacity(&self) -> usize {
        self.state.queue.capacity()
    }

    /// Drop every queued, unprocessed event. The running state is unchanged.
    pub fn clear(&self) {
        self.state.queue.clear();
    }

    /// Handler invocations that returned normally.
    pub fn processed(&self) -> u64 {
        self.state.processed()
    }

    /// Handler invocations that panicked.
    pub fn panicked(&self) -> u64 {
        self.state.panicked()
    }
}

impl<E: Event> Drop for Handling<E> {
    fn drop(&mut self) {
        self.state.shutdown();
        let current = std::thread::current().id();
        for worker in self.workers.get_mut().drain(..) {
            if worker.thread().id() == current {
                tracing::warn!(handling = %self.state.name, "handling dropped from its own worker, not joining");
                continue;
            }
            if worker.join().is_err() {
                tracing::error!(handling = %self.state.name, "worker thread panicked");
            }
        }
        tracing::debug!(
            handling = %self.state.name,
            dropped_events = self.state.queue.occupied(),
            "handling shut down"
        );
    }
}

impl<E: Event> fmt::Debug for Handling<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handling")
            .field("name", &self.state.name)
            .field("priority", &self.priority)
            .field("workers", &self.amount_handlers())
            .field("queue", &self.state.queue)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}
