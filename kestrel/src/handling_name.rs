use std::{borrow::Borrow, hash::Hash, sync::Arc};

/// Name of a [`Handling`](crate::Handling), unique per event type within one
/// [`Dispatcher`](crate::Dispatcher).
///
/// `HandlingName` is cheap to clone. Equality uses a fast-path for pointer
/// equality when two names share the same allocation and falls back to
/// string comparison otherwise.
///
/// # Example
///
/// ```rust
/// use kestrel::HandlingName;
///
/// let name = HandlingName::new("printer");
/// assert_eq!(name, HandlingName::from("printer"));
/// assert_eq!(name.as_str(), "printer");
/// ```
#[derive(Debug, Clone, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HandlingName(Arc<str>);

impl HandlingName {
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Returns the string representation of this name.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for HandlingName {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for HandlingName {}

impl PartialEq<str> for HandlingName {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl std::fmt::Display for HandlingName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Hash for HandlingName {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Borrow<str> for HandlingName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HandlingName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for HandlingName {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&HandlingName> for HandlingName {
    fn from(name: &HandlingName) -> Self {
        name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_across_allocations() {
        let a = HandlingName::new("worker");
        let b = HandlingName::from(String::from("worker"));
        assert_eq!(a, b);
        assert_eq!(a, a.clone());
        assert!(a == *"worker");
        assert_eq!(a.as_str(), "worker");
    }

    #[test]
    fn test_display() {
        assert_eq!(HandlingName::new("audit").to_string(), "audit");
    }
}
