use std::{fmt, str::FromStr};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Kind of membership a payment buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MembershipType {
    Normal,
    Full,
}

impl MembershipType {
    pub const ALL: [MembershipType; 2] = [MembershipType::Normal, MembershipType::Full];

    /// Length of one membership window, in days.
    pub const fn duration_days(self) -> i64 {
        match self {
            MembershipType::Normal => 15,
            MembershipType::Full => 30,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MembershipType::Normal => "normal",
            MembershipType::Full => "full",
        }
    }

    /// The window a renewal starting on `start` covers: `(start, end)`.
    pub fn window_from(self, start: NaiveDate) -> (NaiveDate, NaiveDate) {
        (start, start + Duration::days(self.duration_days()))
    }
}

impl fmt::Display for MembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised membership type {0:?}, expected \"normal\" or \"full\"")]
pub struct UnknownMembershipType(pub String);

impl FromStr for MembershipType {
    type Err = UnknownMembershipType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MembershipType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownMembershipType(s.to_string()))
    }
}

/// Days a member can still use.
///
/// The stored counter and the calendar can drift apart (an owner edit, a
/// skipped check-in), so when an end date exists the lower of the two
/// governs. Past end dates count as zero.
pub fn remaining_days(stored: i64, end_date: Option<NaiveDate>, today: NaiveDate) -> i64 {
    match end_date {
        Some(end) => stored.min((end - today).num_days().max(0)),
        None => stored,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_duration_policy() {
        assert_eq!(MembershipType::Normal.duration_days(), 15);
        assert_eq!(MembershipType::Full.duration_days(), 30);
    }

    #[test]
    fn test_window_from() {
        let (start, end) = MembershipType::Normal.window_from(date(2024, 2, 20));
        assert_eq!(start, date(2024, 2, 20));
        assert_eq!(end, date(2024, 3, 6));

        let (_, end) = MembershipType::Full.window_from(date(2024, 12, 15));
        assert_eq!(end, date(2025, 1, 14));
    }

    #[test]
    fn test_parse_membership_type() {
        assert_eq!("normal".parse::<MembershipType>(), Ok(MembershipType::Normal));
        assert_eq!("full".parse::<MembershipType>(), Ok(MembershipType::Full));
        assert_eq!(
            "gold".parse::<MembershipType>(),
            Err(UnknownMembershipType("gold".to_string()))
        );
        // matching is exact
        assert!("Normal".parse::<MembershipType>().is_err());
        assert!("".parse::<MembershipType>().is_err());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&MembershipType::Full).unwrap();
        assert_eq!(json, "\"full\"");
        let parsed: MembershipType = serde_json::from_str("\"normal\"").unwrap();
        assert_eq!(parsed, MembershipType::Normal);
    }

    #[test]
    fn test_remaining_days_without_end_date() {
        assert_eq!(remaining_days(7, None, date(2024, 1, 1)), 7);
    }

    #[test]
    fn test_remaining_days_capped_by_calendar() {
        let today = date(2024, 1, 1);
        assert_eq!(remaining_days(15, Some(date(2024, 1, 5)), today), 4);
    }

    #[test]
    fn test_remaining_days_capped_by_counter() {
        let today = date(2024, 1, 1);
        assert_eq!(remaining_days(3, Some(date(2024, 1, 31)), today), 3);
    }

    #[test]
    fn test_remaining_days_after_expiry() {
        let today = date(2024, 2, 1);
        assert_eq!(remaining_days(10, Some(date(2024, 1, 15)), today), 0);
        assert_eq!(remaining_days(10, Some(today), today), 0);
    }

    #[test]
    fn test_remaining_days_never_exceeds_either_bound() {
        let today = date(2024, 6, 1);
        for stored in [0, 1, 5, 15, 30, 90] {
            for offset in [-10, -1, 0, 1, 7, 30, 365] {
                let end = today + Duration::days(offset);
                let days = remaining_days(stored, Some(end), today);
                assert!(days <= stored);
                assert!(days <= offset.max(0));
                assert!(days >= 0);
            }
        }
    }
}
