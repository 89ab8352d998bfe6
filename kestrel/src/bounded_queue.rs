use std::{collections::VecDeque, fmt, time::Duration};

use parking_lot::{Condvar, Mutex};

use crate::{Error, Result};

/// Fixed-capacity FIFO queue shared between publishers and a worker pool.
///
/// `push` never blocks: when the queue is full the value is rejected and
/// the caller decides whether to retry, drop or slow down. Producers poll
/// [`occupied`](Self::occupied) and [`capacity`](Self::capacity) to apply
/// backpressure themselves.
///
/// Consumers inside the crate wait on the queue's condition variable with
/// a bounded timeout instead of spinning.
///
/// # Example
///
/// ```rust
/// use kestrel::BoundedQueue;
///
/// let queue = BoundedQueue::new(2)?;
/// assert!(queue.push(1));
/// assert!(queue.push(2));
/// assert!(!queue.push(3)); // full, rejected
/// assert_eq!(queue.pop(), Some(1));
/// assert_eq!(queue.occupied(), 1);
/// # Ok::<(), kestrel::Error>(())
/// ```
pub struct BoundedQueue<T> {
    items: Mutex<VecDeque<T>>,
    ready: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` values, reserving storage
    /// for all of them up front.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero and
    /// [`Error::QueueAllocationFailed`] if the storage cannot be reserved.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_reserved(capacity, capacity)
    }

    /// Create a queue holding at most `capacity` values, reserving storage
    /// for only `reserved` of them up front. The queue grows on demand up
    /// to `capacity`.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_reserved(capacity: usize, reserved: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }
        let mut items = VecDeque::new();
        items
            .try_reserve_exact(reserved.min(capacity))
            .map_err(|_| Error::QueueAllocationFailed(capacity))?;
        Ok(Self {
            items: Mutex::new(items),
            ready: Condvar::new(),
            capacity,
        })
    }

    /// Append `value` at the tail.
    ///
    /// Returns `false` and drops `value` if the queue is full. On success
    /// one waiting consumer is woken.
    pub fn push(&self, value: T) -> bool {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            return false;
        }
        if items.try_reserve(1).is_err() {
            tracing::error!(capacity = self.capacity, "queue failed to grow");
            return false;
        }
        items.push_back(value);
        drop(items);
        self.ready.notify_one();
        true
    }

    /// Remove and return the head, or `None` if the queue is empty.
    pub fn pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Pop the head if `gate` allows it, otherwise wait once for at most
    /// `timeout` and try again.
    ///
    /// `gate` is evaluated under the queue lock, so a state change followed
    /// by [`wake_all`](Self::wake_all) is never missed. Returns `None` on
    /// timeout, on a wake-up without work, or while the gate is closed.
    pub(crate) fn pop_when<G>(&self, timeout: Duration, gate: G) -> Option<T>
    where
        G: Fn() -> bool,
    {
        let mut items = self.items.lock();
        if gate() {
            if let Some(value) = items.pop_front() {
                return Some(value);
            }
        }
        self.ready.wait_for(&mut items, timeout);
        if gate() { items.pop_front() } else { None }
    }

    /// Wake every waiting consumer so it re-reads its state.
    pub(crate) fn wake_all(&self) {
        // Taking the lock orders this wake-up after any in-progress gate check.
        drop(self.items.lock());
        self.ready.notify_all();
    }

    /// Discard every queued value.
    pub fn clear(&self) {
        self.items.lock().clear();
    }

    /// Number of values currently queued.
    pub fn occupied(&self) -> usize {
        self.items.lock().len()
    }

    /// Maximum number of values the queue accepts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.lock().len() >= self.capacity
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("occupied", &self.occupied())
            .field("capacity", &self.capacity)
            .finish()
    }
}
