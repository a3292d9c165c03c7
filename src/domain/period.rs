use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Format used for the `Pull Date` column.
pub const CAPTURE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const PERIOD_FORMAT: &str = "%Y-%m-%d";

/// Day zero of the 1900 spreadsheet date system (with the leap-year bug baked in).
const SPREADSHEET_EPOCH: (i32, u32, u32) = (1899, 12, 30);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeParseError {
    #[error("Invalid period '{0}': expected YYYY-MM-DD")]
    Period(String),
    #[error("Invalid capture time '{0}': expected YYYY-MM-DD HH:MM:SS")]
    CaptureTime(String),
    #[error("Spreadsheet date serial out of range: {0}")]
    Serial(f64),
}

/// A calendar month, stored as its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period(NaiveDate);

impl Period {
    /// Normalizes any date to the first day of its month.
    pub fn month_of(date: NaiveDate) -> Self {
        Self(date.with_day(1).unwrap_or(date))
    }

    pub fn from_ymd(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// Upstream timelines report each point as UTC epoch seconds.
    pub fn from_unix_seconds(seconds: i64) -> Option<Self> {
        DateTime::from_timestamp(seconds, 0).map(|dt| Self::month_of(dt.date_naive()))
    }

    pub fn from_spreadsheet_serial(serial: f64) -> Result<Self, TimeParseError> {
        serial_to_datetime(serial).map(|dt| Self::month_of(dt.date()))
    }

    /// Accepts a bare date or a full timestamp; the time part is ignored.
    pub fn parse(value: &str) -> Result<Self, TimeParseError> {
        let value = value.trim();
        if let Ok(date) = NaiveDate::parse_from_str(value, PERIOD_FORMAT) {
            return Ok(Self::month_of(date));
        }
        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .map(|dt| Self::month_of(dt.date()))
            .ok_or_else(|| TimeParseError::Period(value.to_string()))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(PERIOD_FORMAT))
    }
}

/// Wall-clock time a batch was fetched, truncated to whole seconds so that a
/// persisted value reads back equal to the in-memory one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaptureTime(NaiveDateTime);

impl CaptureTime {
    pub fn now() -> Self {
        Self::from_datetime(Local::now().naive_local())
    }

    pub fn from_datetime(datetime: NaiveDateTime) -> Self {
        Self(datetime.with_nanosecond(0).unwrap_or(datetime))
    }

    pub fn parse(value: &str) -> Result<Self, TimeParseError> {
        NaiveDateTime::parse_from_str(value.trim(), CAPTURE_TIME_FORMAT)
            .map(Self)
            .map_err(|_| TimeParseError::CaptureTime(value.to_string()))
    }

    pub fn from_spreadsheet_serial(serial: f64) -> Result<Self, TimeParseError> {
        serial_to_datetime(serial).map(Self::from_datetime)
    }

    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for CaptureTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CAPTURE_TIME_FORMAT))
    }
}

fn serial_to_datetime(serial: f64) -> Result<NaiveDateTime, TimeParseError> {
    if !serial.is_finite() || serial < 0.0 {
        return Err(TimeParseError::Serial(serial));
    }
    let (year, month, day) = SPREADSHEET_EPOCH;
    let whole_days = serial.trunc();
    let seconds = ((serial - whole_days) * 86_400.0).round() as i64;
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|epoch| epoch.checked_add_days(Days::new(whole_days as u64)))
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|midnight| midnight.checked_add_signed(chrono::Duration::seconds(seconds)))
        .ok_or(TimeParseError::Serial(serial))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_of_normalizes_to_first_day() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 17).unwrap();
        assert_eq!(Period::month_of(date), Period::from_ymd(2024, 3).unwrap());
    }

    #[test]
    fn unix_seconds_map_to_month() {
        // 2004-01-01T00:00:00Z
        let period = Period::from_unix_seconds(1_072_915_200).unwrap();
        assert_eq!(period.to_string(), "2004-01-01");
    }

    #[test]
    fn parse_accepts_date_and_timestamp_forms() {
        let expected = Period::from_ymd(2024, 1).unwrap();
        assert_eq!(Period::parse("2024-01-01").unwrap(), expected);
        assert_eq!(Period::parse("2024-01-15 00:00:00").unwrap(), expected);
        assert_eq!(Period::parse("2024-01-01T00:00:00").unwrap(), expected);
        assert!(Period::parse("January 2024").is_err());
    }

    #[test]
    fn spreadsheet_serial_round_trips_known_dates() {
        // 45292 is 2024-01-01 in the 1900 date system
        assert_eq!(
            Period::from_spreadsheet_serial(45292.0).unwrap(),
            Period::from_ymd(2024, 1).unwrap()
        );
        let noon = CaptureTime::from_spreadsheet_serial(45292.5).unwrap();
        assert_eq!(noon.to_string(), "2024-01-01 12:00:00");
        assert!(Period::from_spreadsheet_serial(-1.0).is_err());
    }

    #[test]
    fn capture_time_truncates_subseconds() {
        let dt = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_milli_opt(8, 30, 15, 999)
            .unwrap();
        let captured = CaptureTime::from_datetime(dt);
        assert_eq!(captured.to_string(), "2025-06-01 08:30:15");
        assert_eq!(CaptureTime::parse(&captured.to_string()).unwrap(), captured);
    }
}
