use crate::{
    BoundedQueue, Dispatcher, Event, HandlerRef, HandlingConfig, HandlingName, Priority, Result,
};

/// Builder for registering a handling with custom configuration.
///
/// Returned by [`Dispatcher::build_handling`]. Use this when you need to
/// override the dispatcher defaults (queue, worker count, priority) for a
/// single handling.
///
/// # Examples
///
/// ```rust
/// use kestrel::{BoundedQueue, Dispatcher, Priority};
///
/// #[derive(Clone, Debug)]
/// struct Tick(u64);
///
/// let dispatcher = Dispatcher::default();
///
/// // Four workers sharing a small queue, offered events first
/// dispatcher
///     .build_handling("ticks", |t: Tick| println!("{}", t.0))
///     .queue_capacity(32)
///     .workers(4)
///     .priority(Priority::High)
///     .add()?;
///
/// // Hand over a queue built elsewhere
/// dispatcher
///     .build_handling("audit", |_t: Tick| {})
///     .queue(BoundedQueue::with_reserved(100_000, 64)?)
///     .add()?;
///
/// assert_eq!(dispatcher.amount_handlers::<Tick>("ticks"), Some(4));
/// # Ok::<(), kestrel::Error>(())
/// ```
///
/// [`Dispatcher::build_handling`]: crate::Dispatcher::build_handling
pub struct HandlingBuilder<'a, E: Event> {
    dispatcher: &'a Dispatcher,
    name: HandlingName,
    handler: HandlerRef<E>,
    config: HandlingConfig,
    queue: Option<BoundedQueue<E>>,
}

impl<'a, E: Event> HandlingBuilder<'a, E> {
    pub(crate) fn new(dispatcher: &'a Dispatcher, name: HandlingName, handler: HandlerRef<E>) -> Self {
        let config = HandlingConfig::new(dispatcher.config());
        Self {
            dispatcher,
            name,
            handler,
            config,
            queue: None,
        }
    }

    /// Use `queue` instead of creating one from the configured capacity.
    pub fn queue(mut self, queue: BoundedQueue<E>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Set the capacity of the queue created for this handling.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config = self.config.with_queue_capacity(capacity);
        self
    }

    /// Set the initial worker pool size. Zero is treated as one.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config = self.config.with_workers(workers);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.config = self.config.with_priority(priority);
        self
    }

    /// Replace the entire [`HandlingConfig`] for this handling.
    pub fn config<C>(mut self, config: C) -> Self
    where
        C: Into<HandlingConfig>,
    {
        self.config = config.into();
        self
    }

    /// Transform the current [`HandlingConfig`] with a closure.
    ///
    /// Unlike [`config()`](Self::config) which replaces the entire config,
    /// this preserves inherited defaults and lets you tweak individual fields.
    pub fn with_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(HandlingConfig) -> HandlingConfig,
    {
        self.config = f(self.config);
        self
    }

    /// Register the handling with the dispatcher. Its workers start at once.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::add_handling`](crate::Dispatcher::add_handling).
    pub fn add(self) -> Result<()> {
        self.dispatcher
            .register(self.name, self.handler, self.queue, self.config)
    }
}
