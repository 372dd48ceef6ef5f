//! Priority levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dispatch priority of a task. Higher wins among eligible tasks.
///
/// The discriminants are the numeric levels used for priority boosting.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
    Urgent = 3,
}

impl Priority {
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Inverse of [`Priority::level`], saturating at `Urgent`.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Priority::Low,
            1 => Priority::Normal,
            2 => Priority::High,
            _ => Priority::Urgent,
        }
    }

    /// Raise the priority by `steps` levels, capped at `Urgent`.
    pub fn boosted(self, steps: u32) -> Self {
        let steps = u8::try_from(steps).unwrap_or(u8::MAX);
        Self::from_level(self.level().saturating_add(steps))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "LOW",
            Priority::Normal => "NORMAL",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn ordering_follows_levels() {
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[rstest]
    #[case(Priority::Low, 0, Priority::Low)]
    #[case(Priority::Low, 1, Priority::Normal)]
    #[case(Priority::Low, 2, Priority::High)]
    #[case(Priority::Normal, 5, Priority::Urgent)]
    #[case(Priority::Urgent, 1, Priority::Urgent)]
    #[case(Priority::Low, u32::MAX, Priority::Urgent)]
    fn boost_saturates_at_urgent(
        #[case] base: Priority,
        #[case] steps: u32,
        #[case] expected: Priority,
    ) {
        assert_eq!(base.boosted(steps), expected);
    }

    #[test]
    fn serializes_as_upper_case_names() {
        assert_eq!(serde_json::to_string(&Priority::Urgent).unwrap(), "\"URGENT\"");
        let p: Priority = serde_json::from_str("\"LOW\"").unwrap();
        assert_eq!(p, Priority::Low);
    }
}
