use crate::{Event, Handling, HandlingName, Priority};

/// Point-in-time view of one handling, as returned by
/// [`Dispatcher::snapshot`](crate::Dispatcher::snapshot).
///
/// Queue figures are read without stopping the workers, so they may be
/// stale by the time the snapshot is inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HandlingSnapshot {
    /// Rust type name of the event, for diagnostics only.
    pub event_type: String,
    pub name: HandlingName,
    pub priority: Priority,
    pub workers: usize,
    pub occupied: usize,
    pub capacity: usize,
    pub stopped: bool,
    pub processed: u64,
    pub panicked: u64,
}

impl HandlingSnapshot {
    pub(crate) fn of<E: Event>(handling: &Handling<E>) -> Self {
        Self {
            event_type: std::any::type_name::<E>().to_string(),
            name: handling.name().clone(),
            priority: handling.priority(),
            workers: handling.amount_handlers(),
            occupied: handling.num_events(),
            capacity: handling.capacity(),
            stopped: handling.is_stopped(),
            processed: handling.processed(),
            panicked: handling.panicked(),
        }
    }
}
