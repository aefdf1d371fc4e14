//! Date range handling for catalog searches.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CuboError, CuboResult};

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = CuboError;

    fn try_from(raw: RawDateRange) -> CuboResult<Self> {
        Self::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> CuboResult<Self> {
        if start > end {
            return Err(CuboError::InvalidDate(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse start and end strings.
    ///
    /// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, which is truncated
    /// to its UTC date.
    pub fn parse(start: &str, end: &str) -> CuboResult<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// STAC `datetime` interval string, from the first second of the start
    /// day to the last second of the end day.
    pub fn to_interval(&self) -> String {
        format!(
            "{}/{}",
            self.start_datetime().to_rfc3339_opts(SecondsFormat::Secs, true),
            self.end_datetime().to_rfc3339_opts(SecondsFormat::Secs, true)
        )
    }

    /// First instant of the range.
    pub fn start_datetime(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Last second of the range.
    pub fn end_datetime(&self) -> DateTime<Utc> {
        let last = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        self.end.and_time(last).and_utc()
    }
}

fn parse_date(s: &str) -> CuboResult<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }
    Err(CuboError::InvalidDate(s.to_string()))
}
