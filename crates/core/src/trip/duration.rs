//! Trip duration and free-text duration parsing.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Length of the trip, which the traveler may leave open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TripDuration {
    Days(u32),
    #[default]
    Undecided,
}

// "2 nights 3 days" / "2泊3日": the day count wins.
static NIGHTS_DAYS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+)\s*(?:nights?|泊)\s*,?\s*(\d+)\s*(?:days?|日)").expect("valid regex")
});

// "3 days" / "3日間"
static DAYS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(?:days?|日間)").expect("valid regex"));

impl TripDuration {
    /// Parse a free-text duration. Anything unrecognized is `Undecided`.
    pub fn parse(text: &str) -> Self {
        if let Some(caps) = NIGHTS_DAYS.captures(text) {
            if let Ok(days) = caps[2].parse::<u32>() {
                return Self::from_days(days);
            }
        }
        if let Some(caps) = DAYS.captures(text) {
            if let Ok(days) = caps[1].parse::<u32>() {
                return Self::from_days(days);
            }
        }
        TripDuration::Undecided
    }

    fn from_days(days: u32) -> Self {
        if days == 0 {
            TripDuration::Undecided
        } else {
            TripDuration::Days(days)
        }
    }

    /// Number of days, or 0 when undecided.
    pub fn days(&self) -> u32 {
        match self {
            TripDuration::Days(n) => *n,
            TripDuration::Undecided => 0,
        }
    }

    pub fn is_decided(&self) -> bool {
        self.days() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_days() {
        assert_eq!(TripDuration::parse("3 days"), TripDuration::Days(3));
        assert_eq!(TripDuration::parse("1 day"), TripDuration::Days(1));
        assert_eq!(TripDuration::parse("3日間"), TripDuration::Days(3));
    }

    #[test]
    fn test_parse_nights_and_days() {
        assert_eq!(TripDuration::parse("2 nights 3 days"), TripDuration::Days(3));
        assert_eq!(TripDuration::parse("4 Nights, 5 Days"), TripDuration::Days(5));
        assert_eq!(TripDuration::parse("2泊3日"), TripDuration::Days(3));
    }

    #[test]
    fn test_parse_unrecognized_is_undecided() {
        assert_eq!(TripDuration::parse("sometime in June"), TripDuration::Undecided);
        assert_eq!(TripDuration::parse(""), TripDuration::Undecided);
        assert_eq!(TripDuration::parse("0 days"), TripDuration::Undecided);
    }

    #[test]
    fn test_days_and_serde() {
        assert_eq!(TripDuration::Days(4).days(), 4);
        assert_eq!(TripDuration::Undecided.days(), 0);
        assert!(!TripDuration::Undecided.is_decided());

        let json = serde_json::to_string(&TripDuration::Undecided).unwrap();
        assert_eq!(json, "\"undecided\"");
        let parsed: TripDuration = serde_json::from_str(r#"{"days":7}"#).unwrap();
        assert_eq!(parsed, TripDuration::Days(7));
    }
}
