use std::any::Any;

use crate::{Event, HandlerRef, Handling, HandlingSnapshot};

/// Type-erased view of a [`HandlingSet`], stored in the dispatcher's
/// registry under the event's `TypeId`.
pub(crate) trait ErasedHandlings: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn snapshots(&self) -> Vec<HandlingSnapshot>;
    fn stop_all(&self) -> usize;
    fn len(&self) -> usize;
}

/// Handlings of one event type, kept in descending priority order.
/// Handlings with equal priority keep their registration order.
pub(crate) struct HandlingSet<E: Event> {
    handlings: Vec<Handling<E>>,
}

impl<E: Event> HandlingSet<E> {
    pub fn new() -> Self {
        Self {
            handlings: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Handling<E>> {
        self.handlings.iter().find(|h| h.name().as_str() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Handling<E>> {
        self.handlings.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.handlings.is_empty()
    }

    /// Returns the handling currently bound to `handler`, if any.
    pub fn bound_to(&self, handler: &HandlerRef<E>) -> Option<&Handling<E>> {
        self.handlings.iter().find(|h| h.handler().ptr_eq(handler))
    }

    pub fn insert(&mut self, handling: Handling<E>) {
        let at = self
            .handlings
            .iter()
            .position(|h| h.priority() < handling.priority())
            .unwrap_or(self.handlings.len());
        self.handlings.insert(at, handling);
    }

    pub fn remove(&mut self, name: &str) -> Option<Handling<E>> {
        let at = self
            .handlings
            .iter()
            .position(|h| h.name().as_str() == name)?;
        Some(self.handlings.remove(at))
    }
}

impl<E: Event> ErasedHandlings for HandlingSet<E> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn snapshots(&self) -> Vec<HandlingSnapshot> {
        self.handlings
            .iter()
            .map(HandlingSnapshot::of::<E>)
            .collect()
    }

    fn stop_all(&self) -> usize {
        self.handlings.iter().for_each(Handling::stop);
        self.handlings.len()
    }

    fn len(&self) -> usize {
        self.handlings.len()
    }
}
