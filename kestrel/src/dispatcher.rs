use std::{
    any::{TypeId, type_name},
    collections::HashMap,
    fmt,
};

use parking_lot::RwLock;

use crate::{
    BoundedQueue, Delivery, DispatcherConfig, Error, Event, HandlerRef, Handling, HandlingBuilder,
    HandlingConfig, HandlingName, HandlingSnapshot, Result,
    internal::{ErasedHandlings, HandlingSet},
};

type Registry = HashMap<TypeId, Box<dyn ErasedHandlings>>;

/// Routes published events to every handling registered for their type.
///
/// A dispatcher owns its registry: create one, share it by reference (or
/// inside an `Arc`) with producers and consumers, and drop it to stop and
/// join every worker. There is no global state, so independent dispatchers
/// never see each other's handlings.
///
/// # Handling Registration
///
/// ```rust
/// use kestrel::{Dispatcher, Priority};
///
/// #[derive(Clone, Debug)]
/// enum Job { Resize(u32) }
///
/// #[derive(Clone, Debug)]
/// struct Progress(u8);
///
/// let dispatcher = Dispatcher::default();
///
/// // One worker, default queue
/// dispatcher.add_handling("resizer", |job: Job| { let Job::Resize(_px) = job; })?;
///
/// // Several handlings may consume the same event type
/// dispatcher
///     .build_handling("progress-bar", |p: Progress| println!("{}%", p.0))
///     .priority(Priority::High)
///     .add()?;
/// dispatcher.add_handling("progress-log", |_p: Progress| {})?;
///
/// dispatcher.publish(Job::Resize(640))?;
/// assert_eq!(dispatcher.publish(Progress(50))?.queued(), 2);
/// # Ok::<(), kestrel::Error>(())
/// ```
///
/// # Backpressure
///
/// Publishing never blocks. A full queue rejects the event and
/// [`publish`](Self::publish) reports [`Error::QueueFull`]. Producers that
/// must not lose events poll [`occupied_in_queue`](Self::occupied_in_queue)
/// and [`queue_size`](Self::queue_size) to slow themselves down.
///
/// # Lifecycle
///
/// Every handling starts running on registration and moves between
/// running and stopped with [`stop`](Self::stop) and [`start`](Self::start).
/// A stopped handling still accepts events; they wait in its queue.
pub struct Dispatcher {
    config: DispatcherConfig,
    registry: RwLock<Registry>,
}

impl Dispatcher {
    /// Create a new dispatcher with the given defaults.
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the dispatcher's configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Register a handling for events of type `E` using the dispatcher
    /// defaults, and start its workers.
    ///
    /// # Errors
    ///
    /// - [`Error::HandlerAlreadyInUse`] if `handler` is already bound to a
    ///   handling of `E`.
    /// - [`Error::HandlingNameInUse`] if `name` is already registered for `E`.
    /// - [`Error::InvalidCapacity`] / [`Error::QueueAllocationFailed`] if the
    ///   queue cannot be created.
    /// - [`Error::Io`] if a worker thread cannot be spawned.
    pub fn add_handling<E, N, H>(&self, name: N, handler: H) -> Result<()>
    where
        E: Event,
        N: Into<HandlingName>,
        H: Into<HandlerRef<E>>,
    {
        let config = HandlingConfig::new(&self.config);
        self.register(name.into(), handler.into(), None, config)
    }

    /// Start building a handling registration with custom configuration.
    ///
    /// See [`HandlingBuilder`] for the available settings.
    pub fn build_handling<E, N, H>(&self, name: N, handler: H) -> HandlingBuilder<'_, E>
    where
        E: Event,
        N: Into<HandlingName>,
        H: Into<HandlerRef<E>>,
    {
        HandlingBuilder::new(self, name.into(), handler.into())
    }

    pub(crate) fn register<E: Event>(
        &self,
        name: HandlingName,
        handler: HandlerRef<E>,
        queue: Option<BoundedQueue<E>>,
        config: HandlingConfig,
    ) -> Result<()> {
        if let Some(set) = Self::lookup::<E>(&self.registry.read()) {
            Self::ensure_free(set, &name, &handler)?;
        }

        // Workers start outside the registry lock so a handler that
        // publishes never waits on its own registration.
        let queue = match queue {
            Some(queue) => queue,
            None => BoundedQueue::new(config.queue_capacity())?,
        };
        let handling = Handling::new(name, handler, queue, &config)?;

        let mut registry = self.registry.write();
        let entry = registry
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(HandlingSet::<E>::new()));
        let Some(set) = entry.as_any_mut().downcast_mut::<HandlingSet<E>>() else {
            unreachable!("handling sets are keyed by their event TypeId");
        };

        // Another registration may have won the race since the first check.
        if let Err(e) = Self::ensure_free(set, handling.name(), handling.handler()) {
            drop(registry);
            drop(handling);
            return Err(e);
        }

        tracing::info!(
            event_type = type_name::<E>(),
            handling = %handling.name(),
            workers = handling.amount_handlers(),
            "handling registered"
        );
        set.insert(handling);
        Ok(())
    }

    /// Unregister a handling, then stop it and join its workers.
    ///
    /// Events still queued in the handling are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandlingNotFound`] if `name` is not registered for `E`.
    pub fn remove_handling<E: Event>(&self, name: &str) -> Result<()> {
        let removed = {
            let mut registry = self.registry.write();
            let set = registry
                .get_mut(&TypeId::of::<E>())
                .and_then(|set| set.as_any_mut().downcast_mut::<HandlingSet<E>>());
            let removed = set.and_then(|set| set.remove(name));
            if registry
                .get(&TypeId::of::<E>())
                .is_some_and(|set| set.len() == 0)
            {
                registry.remove(&TypeId::of::<E>());
            }
            removed
        };
        match removed {
            Some(handling) => {
                tracing::info!(event_type = type_name::<E>(), handling = %name, "handling removed");
                drop(handling);
                Ok(())
            }
            None => Err(Error::HandlingNotFound(name.into())),
        }
    }

    /// Offer `event` to every handling registered for its type, highest
    /// priority first.
    ///
    /// Handlings accept events while stopped. Publishing never blocks.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueFull`] if one or more queues were full. Every
    /// other handling still received the event.
    pub fn publish<E: Event>(&self, event: E) -> Result<Delivery> {
        let registry = self.registry.read();
        let Some(set) = Self::lookup::<E>(&registry).filter(|set| !set.is_empty()) else {
            tracing::warn!(event_type = type_name::<E>(), "no handling registered, event dropped");
            return Ok(Delivery::Unrouted);
        };

        let mut accepted = 0;
        let mut rejected = Vec::new();
        let mut offer = |handling: &Handling<E>, event: E| {
            if handling.add_event(event) {
                accepted += 1;
            } else {
                rejected.push(handling.name().clone());
            }
        };

        let mut handlings = set.iter().peekable();
        while let Some(handling) = handlings.next() {
            if handlings.peek().is_some() {
                offer(handling, event.clone());
            } else {
                offer(handling, event);
                break;
            }
        }

        if rejected.is_empty() {
            tracing::trace!(event_type = type_name::<E>(), accepted, "event published");
            Ok(Delivery::Queued(accepted))
        } else {
            tracing::warn!(
                event_type = type_name::<E>(),
                accepted,
                rejected = ?rejected,
                "queue full, event rejected"
            );
            Err(Error::QueueFull { rejected, accepted })
        }
    }

    /// Build an `E` from `args` and [`publish`](Self::publish) it.
    ///
    /// ```rust
    /// # use kestrel::Dispatcher;
    /// #[derive(Clone, Debug)]
    /// struct Cell { row: u8, col: u8 }
    ///
    /// impl From<(u8, u8)> for Cell {
    ///     fn from((row, col): (u8, u8)) -> Self { Cell { row, col } }
    /// }
    ///
    /// let dispatcher = Dispatcher::default();
    /// dispatcher.add_handling("cells", |c: Cell| assert!(c.row < 9 && c.col < 9))?;
    /// dispatcher.publish_from::<Cell, _>((3, 4))?;
    /// # Ok::<(), kestrel::Error>(())
    /// ```
    pub fn publish_from<E, A>(&self, args: A) -> Result<Delivery>
    where
        E: Event,
        A: Into<E>,
    {
        self.publish(args.into())
    }

    /// Stop one handling. Its queue keeps accepting events.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandlingNotFound`] if `name` is not registered for `E`.
    pub fn stop<E: Event>(&self, name: &str) -> Result<()> {
        self.with_handling::<E, _>(name, Handling::stop)
            .ok_or_else(|| Error::HandlingNotFound(name.into()))
    }

    /// Stop every handling of `E`. Returns how many were stopped.
    pub fn stop_all<E: Event>(&self) -> usize {
        self.with_set::<E, _>(|set| set.stop_all()).unwrap_or(0)
    }

    /// Resume a stopped handling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandlingNotFound`] if `name` is not registered for `E`.
    pub fn start<E: Event>(&self, name: &str) -> Result<()> {
        self.with_handling::<E, _>(name, Handling::start)
            .ok_or_else(|| Error::HandlingNotFound(name.into()))
    }

    /// Resume every handling of `E`. Returns how many were started.
    pub fn start_all<E: Event>(&self) -> usize {
        self.with_set::<E, _>(|set| set.iter().inspect(|h| h.start()).count())
            .unwrap_or(0)
    }

    /// Returns `None` if `name` is not registered for `E`.
    pub fn is_stopped<E: Event>(&self, name: &str) -> Option<bool> {
        self.with_handling::<E, _>(name, Handling::is_stopped)
    }

    /// Size of a handling's worker pool, or `None` if `name` is not
    /// registered for `E`.
    pub fn amount_handlers<E: Event>(&self, name: &str) -> Option<usize> {
        self.with_handling::<E, _>(name, Handling::amount_handlers)
    }

    /// Grow a handling's worker pool by `n` threads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandlingNotFound`] if `name` is not registered for
    /// `E`, or [`Error::Io`] if a thread cannot be spawned.
    pub fn add_handlers<E: Event>(&self, name: &str, n: usize) -> Result<()> {
        self.with_handling::<E, _>(name, |h| h.add_handlers(n))
            .unwrap_or_else(|| Err(Error::HandlingNotFound(name.into())))
    }

    /// Drop every event queued for one handling without stopping it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandlingNotFound`] if `name` is not registered for `E`.
    pub fn clear<E: Event>(&self, name: &str) -> Result<()> {
        self.with_handling::<E, _>(name, Handling::clear)
            .ok_or_else(|| Error::HandlingNotFound(name.into()))
    }

    /// Drop every event queued for any handling of `E`. Returns how many
    /// handlings were cleared.
    pub fn clear_all<E: Event>(&self) -> usize {
        self.with_set::<E, _>(|set| set.iter().inspect(|h| h.clear()).count())
            .unwrap_or(0)
    }

    /// Events waiting in a handling's queue, or `None` if `name` is not
    /// registered for `E`.
    pub fn occupied_in_queue<E: Event>(&self, name: &str) -> Option<usize> {
        self.with_handling::<E, _>(name, Handling::num_events)
    }

    /// Capacity of a handling's queue, or `None` if `name` is not
    /// registered for `E`.
    pub fn queue_size<E: Event>(&self, name: &str) -> Option<usize> {
        self.with_handling::<E, _>(name, Handling::capacity)
    }

    /// Names of the handlings registered for `E`, highest priority first.
    pub fn handling_names<E: Event>(&self) -> Vec<HandlingName> {
        self.with_set::<E, _>(|set| set.iter().map(|h| h.name().clone()).collect())
            .unwrap_or_default()
    }

    /// Number of handlings registered for `E`.
    pub fn handling_count<E: Event>(&self) -> usize {
        self.with_set::<E, _>(|set| set.iter().count()).unwrap_or(0)
    }

    /// Point-in-time state of every handling of every event type.
    ///
    /// Entries are sorted by event type name, then by priority.
    pub fn snapshot(&self) -> Vec<HandlingSnapshot> {
        let registry = self.registry.read();
        let mut sets: Vec<Vec<HandlingSnapshot>> =
            registry.values().map(|set| set.snapshots()).collect();
        sets.sort_by(|a, b| {
            let a = a.first().map(|s| s.event_type.as_str());
            let b = b.first().map(|s| s.event_type.as_str());
            a.cmp(&b)
        });
        sets.into_iter().flatten().collect()
    }

    fn ensure_free<E: Event>(
        set: &HandlingSet<E>,
        name: &HandlingName,
        handler: &HandlerRef<E>,
    ) -> Result<()> {
        if let Some(bound) = set.bound_to(handler) {
            return Err(Error::HandlerAlreadyInUse(bound.name().clone()));
        }
        if set.get(name.as_str()).is_some() {
            return Err(Error::HandlingNameInUse(name.clone()));
        }
        Ok(())
    }

    fn lookup<E: Event>(registry: &Registry) -> Option<&HandlingSet<E>> {
        registry
            .get(&TypeId::of::<E>())
            .and_then(|set| set.as_any().downcast_ref::<HandlingSet<E>>())
    }

    fn with_set<E: Event, R>(&self, f: impl FnOnce(&HandlingSet<E>) -> R) -> Option<R> {
        let registry = self.registry.read();
        Self::lookup::<E>(&registry).map(f)
    }

    fn with_handling<E: Event, R>(&self, name: &str, f: impl FnOnce(&Handling<E>) -> R) -> Option<R> {
        self.with_set::<E, _>(|set| set.get(name).map(f)).flatten()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        let registry = std::mem::take(self.registry.get_mut());
        // Signal every worker first so pools wind down in parallel.
        let stopped: usize = registry.values().map(|set| set.stop_all()).sum();
        drop(registry);
        tracing::debug!(handlings = stopped, "dispatcher shut down");
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("event_types", &self.registry.read().len())
            .finish()
    }
}

#[cfg(feature = "serde")]
impl Dispatcher {
    /// Export every handling's state as pretty-printed JSON.
    ///
    /// The output is the list returned by [`snapshot`](Self::snapshot).
    ///
    /// # Errors
    ///
    /// Returns any serialization error produced by `serde_json`.
    #[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicI16, AtomicUsize, Ordering},
        },
        thread,
        time::{Duration, Instant},
    };

    use super::*;
    use crate::Priority;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Ev(i16);

    #[derive(Debug, Clone)]
    struct Other;

    impl From<i16> for Ev {
        fn from(v: i16) -> Self {
            Ev(v)
        }
    }

    fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_publish_reaches_handler() {
        let dispatcher = Dispatcher::default();
        let last = Arc::new(AtomicI16::new(0));
        let l = last.clone();
        dispatcher
            .add_handling("last", move |ev: Ev| l.store(ev.0, Ordering::SeqCst))
            .unwrap();

        assert_eq!(dispatcher.publish(Ev(53)).unwrap(), Delivery::Queued(1));
        assert!(wait_until(Duration::from_secs(2), || {
            last.load(Ordering::SeqCst) == 53
        }));
    }

    #[test]
    fn test_publish_without_handlings_is_unrouted() {
        let dispatcher = Dispatcher::default();
        assert_eq!(dispatcher.publish(Ev(1)).unwrap(), Delivery::Unrouted);
        assert_eq!(dispatcher.handling_count::<Ev>(), 0);
        assert!(dispatcher.snapshot().is_empty());
    }

    #[test]
    fn test_event_types_are_isolated() {
        let dispatcher = Dispatcher::default();
        dispatcher.add_handling("ev", |_: Ev| {}).unwrap();
        assert_eq!(dispatcher.publish(Other).unwrap(), Delivery::Unrouted);
        // Same name is fine for a different event type.
        dispatcher.add_handling("ev", |_: Other| {}).unwrap();
        assert_eq!(dispatcher.handling_count::<Other>(), 1);
    }

    #[test]
    fn test_worker_count_floor_and_growth() {
        let dispatcher = Dispatcher::default();
        dispatcher
            .build_handling("pool", |_: Ev| {})
            .workers(0)
            .add()
            .unwrap();
        assert_eq!(dispatcher.amount_handlers::<Ev>("pool"), Some(1));

        dispatcher.add_handlers::<Ev>("pool", 3).unwrap();
        assert_eq!(dispatcher.amount_handlers::<Ev>("pool"), Some(4));

        dispatcher
            .build_handling("wide", |_: Ev| {})
            .workers(6)
            .add()
            .unwrap();
        assert_eq!(dispatcher.amount_handlers::<Ev>("wide"), Some(6));
    }

    #[test]
    fn test_unknown_names_report_not_found() {
        let dispatcher = Dispatcher::default();
        dispatcher.add_handling("known", |_: Ev| {}).unwrap();

        assert_eq!(dispatcher.is_stopped::<Ev>("nope"), None);
        assert_eq!(dispatcher.amount_handlers::<Ev>("nope"), None);
        assert_eq!(dispatcher.occupied_in_queue::<Ev>("nope"), None);
        assert_eq!(dispatcher.queue_size::<Ev>("nope"), None);
        assert_eq!(
            dispatcher.add_handlers::<Ev>("nope", 1),
            Err(Error::HandlingNotFound("nope".into()))
        );
        assert_eq!(
            dispatcher.stop::<Ev>("nope"),
            Err(Error::HandlingNotFound("nope".into()))
        );
        assert_eq!(
            dispatcher.clear::<Other>("known"),
            Err(Error::HandlingNotFound("known".into()))
        );
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let dispatcher = Dispatcher::default();
        dispatcher.add_handling("dup", |_: Ev| {}).unwrap();
        assert_eq!(
            dispatcher.add_handling("dup", |_: Ev| {}),
            Err(Error::HandlingNameInUse("dup".into()))
        );
        assert_eq!(dispatcher.handling_count::<Ev>(), 1);
    }

    #[test]
    fn test_bound_handler_rejected() {
        let dispatcher = Dispatcher::default();
        let handler = HandlerRef::new(|_: Ev| {});
        dispatcher
            .add_handling::<Ev, _, _>("first", handler.clone())
            .unwrap();
        assert_eq!(
            dispatcher.add_handling::<Ev, _, _>("second", handler.clone()),
            Err(Error::HandlerAlreadyInUse("first".into()))
        );

        // Once the holder is gone the handler can be bound again.
        dispatcher.remove_handling::<Ev>("first").unwrap();
        dispatcher
            .add_handling::<Ev, _, _>("second", handler)
            .unwrap();
    }

    #[test]
    fn test_stopped_handling_accumulates() {
        let dispatcher = Dispatcher::default();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        dispatcher
            .add_handling("acc", move |_: Ev| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        dispatcher.stop::<Ev>("acc").unwrap();
        assert_eq!(dispatcher.is_stopped::<Ev>("acc"), Some(true));
        for i in 0..5 {
            dispatcher.publish(Ev(i)).unwrap();
        }
        thread::sleep(Duration::from_millis(100));
        assert_eq!(dispatcher.occupied_in_queue::<Ev>("acc"), Some(5));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        dispatcher.stop::<Ev>("acc").unwrap();
        assert_eq!(dispatcher.is_stopped::<Ev>("acc"), Some(true));

        dispatcher.start::<Ev>("acc").unwrap();
        assert!(wait_until(Duration::from_secs(2), || {
            count.load(Ordering::SeqCst) == 5
        }));
        assert_eq!(dispatcher.occupied_in_queue::<Ev>("acc"), Some(0));
    }

    #[test]
    fn test_stop_all_and_clear_all() {
        let dispatcher = Dispatcher::default();
        dispatcher.add_handling("a", |_: Ev| {}).unwrap();
        dispatcher.add_handling("b", |_: Ev| {}).unwrap();
        assert_eq!(dispatcher.stop_all::<Ev>(), 2);
        assert_eq!(dispatcher.stop_all::<Other>(), 0);

        dispatcher.publish(Ev(1)).unwrap();
        dispatcher.publish(Ev(2)).unwrap();
        assert_eq!(dispatcher.occupied_in_queue::<Ev>("a"), Some(2));

        dispatcher.clear::<Ev>("a").unwrap();
        assert_eq!(dispatcher.occupied_in_queue::<Ev>("a"), Some(0));
        assert_eq!(dispatcher.occupied_in_queue::<Ev>("b"), Some(2));
        assert_eq!(dispatcher.is_stopped::<Ev>("a"), Some(true));

        assert_eq!(dispatcher.clear_all::<Ev>(), 2);
        assert_eq!(dispatcher.occupied_in_queue::<Ev>("b"), Some(0));
        assert_eq!(dispatcher.start_all::<Ev>(), 2);
        assert_eq!(dispatcher.is_stopped::<Ev>("b"), Some(false));
    }

    #[test]
    fn test_full_queue_reports_backpressure() {
        let dispatcher = Dispatcher::default();
        dispatcher
            .build_handling("small", |_: Ev| {})
            .queue_capacity(2)
            .add()
            .unwrap();
        dispatcher
            .build_handling("large", |_: Ev| {})
            .queue(BoundedQueue::new(10).unwrap())
            .add()
            .unwrap();
        dispatcher.stop_all::<Ev>();

        assert_eq!(dispatcher.queue_size::<Ev>("small"), Some(2));
        assert_eq!(dispatcher.queue_size::<Ev>("large"), Some(10));

        dispatcher.publish(Ev(1)).unwrap();
        dispatcher.publish(Ev(2)).unwrap();
        let err = dispatcher.publish(Ev(3)).unwrap_err();
        assert_eq!(
            err,
            Error::QueueFull {
                rejected: vec!["small".into()],
                accepted: 1,
            }
        );
        assert_eq!(dispatcher.occupied_in_queue::<Ev>("large"), Some(3));
    }

    #[test]
    fn test_invalid_queue_capacity() {
        let dispatcher = Dispatcher::default();
        let err = dispatcher
            .build_handling("zero", |_: Ev| {})
            .queue_capacity(0)
            .add()
            .unwrap_err();
        assert_eq!(err, Error::InvalidCapacity);
        assert_eq!(dispatcher.handling_count::<Ev>(), 0);
        assert_eq!(dispatcher.registry.read().len(), 0);
    }

    #[test]
    fn test_handler_publishes_while_registering() {
        let dispatcher = Arc::new(Dispatcher::default());
        let relayed = Arc::new(AtomicUsize::new(0));
        let r = relayed.clone();
        dispatcher
            .add_handling("relayed", move |_: Other| {
                r.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let queue = BoundedQueue::new(64).unwrap();
        for i in 0..32 {
            assert!(queue.push(Ev(i)));
        }
        let weak = Arc::downgrade(&dispatcher);
        dispatcher
            .build_handling("relay", move |_: Ev| {
                if let Some(dispatcher) = weak.upgrade() {
                    dispatcher.publish(Other).unwrap();
                }
            })
            .queue(queue)
            .workers(8)
            .add()
            .unwrap();

        assert!(wait_until(Duration::from_secs(2), || {
            relayed.load(Ordering::SeqCst) == 32
        }));
    }

    #[test]
    fn test_single_worker_preserves_fifo_order() {
        let dispatcher = Dispatcher::default();
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let s = seen.clone();
        dispatcher
            .add_handling("ordered", move |ev: Ev| s.lock().push(ev.0))
            .unwrap();

        for i in 0..500 {
            dispatcher.publish(Ev(i)).unwrap();
        }
        assert!(wait_until(Duration::from_secs(5), || seen.lock().len() == 500));
        let expected: Vec<i16> = (0..500).collect();
        assert_eq!(*seen.lock(), expected);
    }

    #[test]
    fn test_lifecycle_races_publishers() {
        let dispatcher = Arc::new(Dispatcher::default());
        dispatcher
            .build_handling("busy", |_: Ev| thread::sleep(Duration::from_micros(50)))
            .workers(2)
            .queue_capacity(64)
            .add()
            .unwrap();
        dispatcher.add_handling("quiet", |_: Ev| {}).unwrap();

        let weak = Arc::downgrade(&dispatcher);
        let producers: Vec<_> = (0..4)
            .map(|_| {
                let weak = weak.clone();
                thread::spawn(move || {
                    let mut i = 0;
                    while let Some(dispatcher) = weak.upgrade() {
                        // Full queues are expected while handlings are stopped.
                        let _ = dispatcher.publish(Ev(i));
                        i = i.wrapping_add(1);
                    }
                })
            })
            .collect();

        for _ in 0..20 {
            dispatcher.stop_all::<Ev>();
            dispatcher.clear_all::<Ev>();
            dispatcher.start_all::<Ev>();
            thread::sleep(Duration::from_millis(2));
        }
        drop(dispatcher);

        for producer in producers {
            producer.join().unwrap();
        }
    }

    #[test]
    fn test_priority_orders_fan_out() {
        let dispatcher = Dispatcher::default();
        dispatcher
            .build_handling("low", |_: Ev| {})
            .priority(Priority::Low)
            .add()
            .unwrap();
        dispatcher
            .build_handling("top", |_: Ev| {})
            .priority(Priority::Highest)
            .add()
            .unwrap();
        dispatcher.add_handling("mid", |_: Ev| {}).unwrap();

        let names: Vec<_> = dispatcher
            .handling_names::<Ev>()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, ["top", "mid", "low"]);
    }

    #[test]
    fn test_publish_from_constructs_event() {
        let dispatcher = Dispatcher::default();
        let last = Arc::new(AtomicI16::new(0));
        let l = last.clone();
        dispatcher
            .add_handling("from", move |ev: Ev| l.store(ev.0, Ordering::SeqCst))
            .unwrap();
        dispatcher.publish_from::<Ev, _>(7_i16).unwrap();
        assert!(wait_until(Duration::from_secs(2), || {
            last.load(Ordering::SeqCst) == 7
        }));
    }

    #[test]
    fn test_remove_handling() {
        let dispatcher = Dispatcher::default();
        dispatcher.add_handling("gone", |_: Ev| {}).unwrap();
        dispatcher.remove_handling::<Ev>("gone").unwrap();
        assert_eq!(dispatcher.handling_count::<Ev>(), 0);
        assert_eq!(
            dispatcher.remove_handling::<Ev>("gone"),
            Err(Error::HandlingNotFound("gone".into()))
        );
        assert_eq!(dispatcher.publish(Ev(0)).unwrap(), Delivery::Unrouted);
    }

    #[test]
    fn test_snapshot_lists_every_handling() {
        let dispatcher = Dispatcher::default();
        dispatcher
            .build_handling("ev", |_: Ev| {})
            .workers(2)
            .add()
            .unwrap();
        dispatcher.add_handling("other", |_: Other| {}).unwrap();
        dispatcher.stop::<Ev>("ev").unwrap();

        let snapshot = dispatcher.snapshot();
        assert_eq!(snapshot.len(), 2);
        let ev = snapshot.iter().find(|s| s.name.as_str() == "ev").unwrap();
        assert_eq!(ev.workers, 2);
        assert!(ev.stopped);
        assert_eq!(ev.capacity, 1024);
        assert!(ev.event_type.ends_with("Ev"));
    }

    #[test]
    fn test_concurrent_publishers() {
        let dispatcher = Arc::new(Dispatcher::default());
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        dispatcher
            .build_handling("sink", move |_: Ev| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .workers(4)
            .queue_capacity(4000)
            .add()
            .unwrap();

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let dispatcher = dispatcher.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        dispatcher.publish(Ev(i)).unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }
        assert!(wait_until(Duration::from_secs(5), || {
            count.load(Ordering::SeqCst) == 2000
        }));
    }

    #[test]
    fn test_drop_joins_workers() {
        let finished = Arc::new(AtomicUsize::new(0));
        let f = finished.clone();
        let dispatcher = Dispatcher::default();
        dispatcher
            .add_handling("slow", move |_: Ev| {
                thread::sleep(Duration::from_millis(30));
                f.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        dispatcher.publish(Ev(0)).unwrap();
        assert!(wait_until(Duration::from_secs(1), || {
            dispatcher.occupied_in_queue::<Ev>("slow") == Some(0)
        }));
        drop(dispatcher);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_to_json_is_valid_json() {
        let dispatcher = Dispatcher::default();
        dispatcher.add_handling("json", |_: Ev| {}).unwrap();
        let json = dispatcher.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], "json");
        assert_eq!(parsed[0]["priority"], "medium");
    }
}
