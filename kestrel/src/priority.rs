use std::fmt;

/// Seven-level ordinal used for handling scheduling hints and event
/// significance.
///
/// Priority is advisory. The only guarantee is relative ordering: when an
/// event is published, handlings with a higher priority are offered the
/// event first, so their workers see it earlier under contention. No
/// operating-system thread priority is changed, since that is not portable.
///
/// # Example
///
/// ```rust
/// use kestrel::Priority;
///
/// assert!(Priority::Highest > Priority::Medium);
/// assert_eq!(Priority::default(), Priority::Medium);
/// assert_eq!(Priority::Low.to_string(), "low");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Priority {
    Lowest,
    VeryLow,
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
    Highest,
}

impl Priority {
    /// All levels, from lowest to highest.
    pub const ALL: [Priority; 7] = [
        Priority::Lowest,
        Priority::VeryLow,
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::VeryHigh,
        Priority::Highest,
    ];

    /// Zero-based rank, `0` for [`Lowest`](Self::Lowest).
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Lowest => write!(f, "lowest"),
            Priority::VeryLow => write!(f, "very_low"),
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::VeryHigh => write!(f, "very_high"),
            Priority::Highest => write!(f, "highest"),
        }
    }
}
