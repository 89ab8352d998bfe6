use std::sync::Arc;

use crate::HandlingName;

/// The single error type for all Kestrel operations.
///
/// Every fallible Kestrel API returns `kestrel::Result<T>` (alias for
/// `Result<T, kestrel::Error>`). Errors from lower layers (allocation,
/// thread spawning) are mapped into variants of this enum so callers only
/// need to handle one error type. None of them are fatal: each is reported
/// to the caller that triggered it and the dispatcher keeps running.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("Handler is already bound to handling '{0}'")]
    HandlerAlreadyInUse(HandlingName),

    #[error("Handling '{0}' already exists for this event type")]
    HandlingNameInUse(HandlingName),

    #[error("Handling '{0}' not found for this event type")]
    HandlingNotFound(HandlingName),

    /// One or more queues were full when publishing.
    ///
    /// Handlings that had room still received the event; `accepted` counts them.
    #[error("Queue full for {rejected:?} ({accepted} handling(s) accepted the event)")]
    QueueFull {
        rejected: Vec<HandlingName>,
        accepted: usize,
    },

    #[error("Failed to allocate a queue of capacity {0}")]
    QueueAllocationFailed(usize),

    #[error("Queue capacity must be greater than zero")]
    InvalidCapacity,

    #[error("Timer is already running")]
    TimerAlreadyRunning,

    #[error("Timer has no callback (it was moved out)")]
    TimerEmpty,

    #[error("IO error: {0}")]
    Io(#[source] Arc<std::io::Error>),
}

impl Error {
    /// Returns `true` if this error only reports backpressure.
    pub fn is_queue_full(&self) -> bool {
        matches!(self, Error::QueueFull { .. })
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::HandlerAlreadyInUse(a), Self::HandlerAlreadyInUse(b)) => a == b,
            (Self::HandlingNameInUse(a), Self::HandlingNameInUse(b)) => a == b,
            (Self::HandlingNotFound(a), Self::HandlingNotFound(b)) => a == b,
            (
                Self::QueueFull {
                    rejected: r1,
                    accepted: a1,
                },
                Self::QueueFull {
                    rejected: r2,
                    accepted: a2,
                },
            ) => r1 == r2 && a1 == a2,
            (Self::QueueAllocationFailed(a), Self::QueueAllocationFailed(b)) => a == b,
            (Self::InvalidCapacity, Self::InvalidCapacity) => true,
            (Self::TimerAlreadyRunning, Self::TimerAlreadyRunning) => true,
            (Self::TimerEmpty, Self::TimerEmpty) => true,
            (Self::Io(a), Self::Io(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_equality() {
        let name = HandlingName::new("printer");
        assert_eq!(
            Error::HandlingNameInUse(name.clone()),
            Error::HandlingNameInUse(name.clone())
        );
        assert_ne!(
            Error::HandlingNameInUse(name.clone()),
            Error::HandlingNotFound(name)
        );
    }

    #[test]
    fn test_io_errors_compare_by_identity() {
        let a: Error = std::io::Error::other("boom").into();
        let b: Error = std::io::Error::other("boom").into();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_queue_full_message() {
        let err = Error::QueueFull {
            rejected: vec![HandlingName::new("slow")],
            accepted: 2,
        };
        assert!(err.is_queue_full());
        assert!(err.to_string().contains("2 handling(s) accepted"));
    }
}
