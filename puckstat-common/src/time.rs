//! Timestamp and season utilities
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond precision, `Z` suffix)
//! so that SQLite string comparison orders them chronologically.

use crate::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};

/// Encode a timestamp for a TEXT column
pub fn to_db_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a timestamp written by [`to_db_timestamp`]
pub fn parse_db_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid stored timestamp '{}': {}", value, e)))
}

/// NHL season id (`YYYYYYYY`) containing the given date
///
/// A season starts in October; September still belongs to the previous season.
pub fn season_for_date(date: NaiveDate) -> String {
    let start = if date.month() >= 10 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}{}", start, start + 1)
}

/// Season id for today (UTC)
pub fn current_season() -> String {
    season_for_date(Utc::now().date_naive())
}

/// First calendar year of a season id (`"20242025"` -> 2024)
pub fn season_start_year(season: &str) -> Result<i32> {
    let invalid = || Error::InvalidInput(format!("Invalid season id '{}'", season));

    if season.len() != 8 || !season.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let start: i32 = season[..4].parse().map_err(|_| invalid())?;
    let end: i32 = season[4..].parse().map_err(|_| invalid())?;
    if end != start + 1 {
        return Err(invalid());
    }
    Ok(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_db_timestamp_is_fixed_width_and_roundtrips() {
        let ts = Utc.with_ymd_and_hms(2024, 10, 4, 9, 5, 0).unwrap();
        let encoded = to_db_timestamp(ts);
        assert_eq!(encoded, "2024-10-04T09:05:00.000000Z");
        assert_eq!(parse_db_timestamp(&encoded).unwrap(), ts);
    }

    #[test]
    fn test_db_timestamps_sort_lexically() {
        let earlier = to_db_timestamp(Utc.with_ymd_and_hms(2024, 9, 30, 23, 59, 59).unwrap());
        let later = to_db_timestamp(Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap());
        assert!(earlier < later);
    }

    #[test]
    fn test_parse_db_timestamp_rejects_garbage() {
        assert!(parse_db_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_season_rolls_over_in_october() {
        let sept = NaiveDate::from_ymd_opt(2024, 9, 30).unwrap();
        let oct = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();
        let feb = NaiveDate::from_ymd_opt(2025, 2, 14).unwrap();
        assert_eq!(season_for_date(sept), "20232024");
        assert_eq!(season_for_date(oct), "20242025");
        assert_eq!(season_for_date(feb), "20242025");
    }

    #[test]
    fn test_current_season_is_well_formed() {
        let season = current_season();
        assert_eq!(season.len(), 8);
        assert!(season_start_year(&season).is_ok());
    }

    #[test]
    fn test_season_start_year() {
        assert_eq!(season_start_year("20242025").unwrap(), 2024);
        assert!(season_start_year("2024").is_err());
        assert!(season_start_year("20242026").is_err());
        assert!(season_start_year("2024abcd").is_err());
    }
}
