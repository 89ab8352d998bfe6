use std::{fmt, sync::Arc};

use crate::Event;

/// Shared handle to the callable that processes events of one handling.
///
/// Any `Fn(E) + Send + Sync + 'static` converts into a fresh `HandlerRef`,
/// so most registrations simply pass a closure. Create a `HandlerRef`
/// explicitly when the same handler value must be tracked across
/// registrations: a handler that is already bound to a live handling of
/// the same event type is rejected with
/// [`Error::HandlerAlreadyInUse`](crate::Error::HandlerAlreadyInUse).
///
/// Identity is the allocation behind the handle; clones share it.
///
/// # Example
///
/// ```rust
/// use kestrel::HandlerRef;
///
/// let handler = HandlerRef::new(|n: u32| println!("{n}"));
/// let same = handler.clone();
/// assert!(handler.ptr_eq(&same));
/// assert!(!handler.ptr_eq(&HandlerRef::new(|_n: u32| {})));
/// ```
pub struct HandlerRef<E: Event>(Arc<dyn Fn(E) + Send + Sync>);

impl<E: Event> HandlerRef<E> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Returns `true` if both handles point to the same handler value.
    pub fn ptr_eq(&self, other: &HandlerRef<E>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }

    #[inline]
    pub(crate) fn call(&self, event: E) {
        (self.0)(event)
    }
}

impl<E: Event> Clone for HandlerRef<E> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<E: Event> fmt::Debug for HandlerRef<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandlerRef")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

impl<E, F> From<F> for HandlerRef<E>
where
    E: Event,
    F: Fn(E) + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        HandlerRef::new(f)
    }
}
