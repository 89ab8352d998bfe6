use std::fmt;

/// Successful outcome of [`Dispatcher::publish`](crate::Dispatcher::publish).
///
/// Publishing is fire-and-forget: an event with no registered handling is
/// not an error, it is reported as [`Unrouted`](Self::Unrouted) and
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delivery {
    /// No handling is registered for the event's type.
    Unrouted,
    /// The event was queued by this many handlings.
    Queued(usize),
}

impl Delivery {
    /// Returns `true` if no handling received the event.
    pub fn is_unrouted(&self) -> bool {
        matches!(self, Delivery::Unrouted)
    }

    /// Number of handlings that queued the event.
    pub fn queued(&self) -> usize {
        match self {
            Delivery::Unrouted => 0,
            Delivery::Queued(n) => *n,
        }
    }
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delivery::Unrouted => write!(f, "unrouted"),
            Delivery::Queued(n) => write!(f, "queued by {n}"),
        }
    }
}
