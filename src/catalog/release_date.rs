//! Release date normalization.
//!
//! The catalog reports release dates with year, month or day precision
//! (`2016`, `2016-10`, `2016-10-10`). All consumers go through
//! [`ReleaseDate::parse`]; a partial date never turns into a made-up
//! full date, it only exposes the components it actually has.

use chrono::NaiveDate;
use thiserror::Error;

use super::round2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed release date: {0:?}")]
pub struct MalformedDate(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ReleaseDate {
    year: i32,
    month: Option<u32>,
    day: Option<u32>,
}

impl ReleaseDate {
    pub fn parse(raw: &str) -> Result<Self, MalformedDate> {
        let malformed = || MalformedDate(raw.to_string());

        let trimmed = raw.trim();
        // timestamps: only the calendar part matters
        let date_part = trimmed.split('T').next().unwrap_or(trimmed);

        let mut parts = date_part.split('-');
        let year = parts
            .next()
            .filter(|p| p.len() == 4)
            .and_then(|p| parse_digits(p, 1..=9999))
            .ok_or_else(malformed)?;
        let month = match parts.next() {
            Some(p) => Some(parse_digits(p, 1..=12).ok_or_else(malformed)?),
            None => None,
        };
        let day = match parts.next() {
            Some(p) => Some(parse_digits(p, 1..=31).ok_or_else(malformed)?),
            None => None,
        };
        if parts.next().is_some() {
            return Err(malformed());
        }
        if let (Some(month), Some(day)) = (month, day) {
            NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(malformed)?;
        }

        Ok(Self {
            year: year as i32,
            month,
            day,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> Option<u32> {
        self.month
    }

    pub fn day(&self) -> Option<u32> {
        self.day
    }

    /// Calendar quarter (1-4), only when the month is known.
    pub fn quarter(&self) -> Option<u32> {
        self.month.map(|m| (m - 1) / 3 + 1)
    }

    /// First calendar day of the period the date describes.
    pub fn earliest_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month.unwrap_or(1), self.day.unwrap_or(1))
    }

    /// Age in years (days / 365, two decimals) at `reference`.
    pub fn age_years(&self, reference: NaiveDate) -> Option<f64> {
        let released = self.earliest_day()?;
        let days = (reference - released).num_days();
        Some(round2(days as f64 / 365.0))
    }
}

fn parse_digits(s: &str, range: std::ops::RangeInclusive<u32>) -> Option<u32> {
    if s.is_empty() || s.len() > 4 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse::<u32>().ok().filter(|v| range.contains(v))
}
