use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

use crate::{BoundedQueue, Event, HandlerRef, HandlingName, config::MIN_IDLE_TIMEOUT};

/// State shared between a [`Handling`](crate::Handling) and its workers.
pub(crate) struct HandlingState<E: Event> {
    pub(crate) name: HandlingName,
    pub(crate) queue: BoundedQueue<E>,
    pub(crate) handler: HandlerRef<E>,
    pub(crate) idle_timeout: Duration,
    running: AtomicBool,
    alive: AtomicBool,
    processed: AtomicU64,
    panicked: AtomicU64,
}

impl<E: Event> HandlingState<E> {
    pub fn new(
        name: HandlingName,
        handler: HandlerRef<E>,
        queue: BoundedQueue<E>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            name,
            queue,
            handler,
            // Deserialized configs bypass the setters' floor.
            idle_timeout: idle_timeout.max(MIN_IDLE_TIMEOUT),
            running: AtomicBool::new(true),
            alive: AtomicBool::new(true),
            processed: AtomicU64::new(0),
            panicked: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
        self.queue.wake_all();
    }

    /// Stop consumption for good; workers exit at their next wake-up.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Release);
        self.alive.store(false, Ordering::Release);
        self.queue.wake_all();
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn panicked(&self) -> u64 {
        self.panicked.load(Ordering::Relaxed)
    }

    /// Run the handler on one event, containing any panic it raises.
    pub fn handle(&self, event: E) {
        match catch_unwind(AssertUnwindSafe(|| self.handler.call(event))) {
            Ok(()) => {
                self.processed.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                self.panicked.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    handling = %self.name,
                    panic = %panic_message(payload.as_ref()),
                    "handler panicked, worker continues"
                );
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
