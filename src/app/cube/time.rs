//! Calendar-aware time units
//!
//! Time coordinates carry CF style units such as `days since 1850-01-01`
//! plus a calendar name. [`TimeUnit`] converts between those numbers and
//! [`CalendarDate`] values for the Gregorian calendars (through `chrono`)
//! and the fixed-length model calendars.

use crate::error::{DrsError, Result};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Calendars found in model output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    /// `standard`, `gregorian` and `proleptic_gregorian`
    Gregorian,
    /// `noleap` / `365_day`
    NoLeap,
    /// `all_leap` / `366_day`
    AllLeap,
    /// `360_day`
    Day360,
}

impl Calendar {
    pub fn parse(name: Option<&str>) -> Result<Self> {
        match name.map(|n| n.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("standard") | Some("gregorian") | Some("proleptic_gregorian") => {
                Ok(Calendar::Gregorian)
            }
            Some("noleap") | Some("365_day") => Ok(Calendar::NoLeap),
            Some("all_leap") | Some("366_day") => Ok(Calendar::AllLeap),
            Some("360_day") => Ok(Calendar::Day360),
            Some(other) => Err(DrsError::cube(format!("Unsupported calendar '{}'", other))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Calendar::Gregorian => "standard",
            Calendar::NoLeap => "365_day",
            Calendar::AllLeap => "366_day",
            Calendar::Day360 => "360_day",
        }
    }

    fn days_in_month(&self, year: i32, month: u32) -> u32 {
        match self {
            Calendar::Day360 => 30,
            _ => match month {
                1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
                4 | 6 | 9 | 11 => 30,
                _ => {
                    let leap = match self {
                        Calendar::AllLeap => true,
                        Calendar::NoLeap => false,
                        _ => (year % 4 == 0 && year % 100 != 0) || year % 400 == 0,
                    };
                    if leap { 29 } else { 28 }
                }
            },
        }
    }

    fn fixed_year_length(&self) -> Option<i64> {
        match self {
            Calendar::Gregorian => None,
            Calendar::NoLeap => Some(365),
            Calendar::AllLeap => Some(366),
            Calendar::Day360 => Some(360),
        }
    }

    /// Absolute day number of a date in this calendar
    fn day_number(&self, year: i32, month: u32, day: u32) -> Result<i64> {
        if month == 0 || month > 12 || day == 0 || day > self.days_in_month(year, month) {
            return Err(DrsError::cube(format!(
                "Invalid {} date {:04}-{:02}-{:02}",
                self.name(),
                year,
                month,
                day
            )));
        }
        match self.fixed_year_length() {
            None => NaiveDate::from_ymd_opt(year, month, day)
                .map(|d| d.num_days_from_ce() as i64)
                .ok_or_else(|| DrsError::cube(format!("Invalid date {}-{}-{}", year, month, day))),
            Some(year_length) => {
                let before_month: u32 = (1..month).map(|m| self.days_in_month(year, m)).sum();
                Ok(year as i64 * year_length + before_month as i64 + day as i64 - 1)
            }
        }
    }

    /// Inverse of [`Calendar::day_number`]
    fn from_day_number(&self, number: i64) -> Result<(i32, u32, u32)> {
        match self.fixed_year_length() {
            None => i32::try_from(number)
                .ok()
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .map(|d| (d.year(), d.month(), d.day()))
                .ok_or_else(|| DrsError::cube(format!("Day number {} out of range", number))),
            Some(year_length) => {
                let year = i32::try_from(number.div_euclid(year_length))
                    .map_err(|_| DrsError::cube(format!("Day number {} out of range", number)))?;
                let mut remaining = number.rem_euclid(year_length) as u32;
                let mut month = 1;
                while remaining >= self.days_in_month(year, month) {
                    remaining -= self.days_in_month(year, month);
                    month += 1;
                }
                Ok((year, month, remaining + 1))
            }
        }
    }
}

/// A point in time of some calendar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Seconds since midnight
    pub seconds: f64,
}

impl CalendarDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self {
            year,
            month,
            day,
            seconds: 0.0,
        }
    }

    pub fn with_time(mut self, hour: u32, minute: u32, second: f64) -> Self {
        self.seconds = hour as f64 * 3600.0 + minute as f64 * 60.0 + second;
        self
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.seconds.round() as u64;
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year,
            self.month,
            self.day,
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}

/// `<step> since <epoch>` in a given calendar
#[derive(Debug, Clone, PartialEq)]
pub struct TimeUnit {
    seconds_per_step: f64,
    epoch: CalendarDate,
    calendar: Calendar,
}

fn unit_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(\w+)\s+since\s+(-?\d{1,4})-(\d{1,2})-(\d{1,2})(?:[ T](\d{1,2}):(\d{1,2})(?::(\d{1,2}(?:\.\d*)?))?)?",
        )
        .expect("valid time unit regex")
    })
}

impl TimeUnit {
    pub fn parse(units: &str, calendar: Option<&str>) -> Result<Self> {
        let calendar = Calendar::parse(calendar)?;
        let caps = unit_regex()
            .captures(units)
            .ok_or_else(|| DrsError::cube(format!("'{}' is not a time unit", units)))?;

        let seconds_per_step = match caps[1].to_lowercase().as_str() {
            "days" | "day" | "d" => SECONDS_PER_DAY,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            other => {
                return Err(DrsError::cube(format!("Unknown time step '{}'", other)));
            }
        };

        let number = |i: usize| caps.get(i).map(|m| m.as_str());
        let parse_err = || DrsError::cube(format!("Malformed reference date in '{}'", units));
        let year: i32 = caps[2].parse().map_err(|_| parse_err())?;
        let month: u32 = caps[3].parse().map_err(|_| parse_err())?;
        let day: u32 = caps[4].parse().map_err(|_| parse_err())?;
        let hour = match number(5) {
            Some(text) => text.parse::<u32>().map_err(|_| parse_err())?,
            None => 0,
        };
        let minute = match number(6) {
            Some(text) => text.parse::<u32>().map_err(|_| parse_err())?,
            None => 0,
        };
        let second = match number(7) {
            Some(text) => text.parse::<f64>().map_err(|_| parse_err())?,
            None => 0.0,
        };

        // Validates the epoch against the calendar
        calendar.day_number(year, month, day)?;

        Ok(Self {
            seconds_per_step,
            epoch: CalendarDate::new(year, month, day).with_time(hour, minute, second),
            calendar,
        })
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    /// Convert a coordinate value to a date
    pub fn num2date(&self, value: f64) -> Result<CalendarDate> {
        if !value.is_finite() {
            return Err(DrsError::cube(format!("Non-finite time value {}", value)));
        }
        let epoch_day = self
            .calendar
            .day_number(self.epoch.year, self.epoch.month, self.epoch.day)?;
        let total_seconds = value * self.seconds_per_step + self.epoch.seconds;
        // Round to the millisecond to keep exact midnights exact
        let total_seconds = (total_seconds * 1000.0).round() / 1000.0;
        let days = total_seconds.div_euclid(SECONDS_PER_DAY);
        let seconds = total_seconds.rem_euclid(SECONDS_PER_DAY);

        let out_of_range = || DrsError::cube(format!("Time value {} out of range", value));
        if !days.is_finite() || days.abs() >= i64::MAX as f64 {
            return Err(out_of_range());
        }
        let day_number = epoch_day.checked_add(days as i64).ok_or_else(out_of_range)?;
        let (year, month, day) = self.calendar.from_day_number(day_number)?;
        Ok(CalendarDate {
            year,
            month,
            day,
            seconds,
        })
    }

    /// Convert a date to a coordinate value
    pub fn date2num(&self, date: &CalendarDate) -> Result<f64> {
        let epoch_day = self
            .calendar
            .day_number(self.epoch.year, self.epoch.month, self.epoch.day)?;
        let day = self.calendar.day_number(date.year, date.month, date.day)?;
        let seconds =
            (day - epoch_day) as f64 * SECONDS_PER_DAY + date.seconds - self.epoch.seconds;
        Ok(seconds / self.seconds_per_step)
    }

    /// One-based day of the year
    pub fn day_of_year(&self, date: &CalendarDate) -> Result<u32> {
        let first = self.calendar.day_number(date.year, 1, 1)?;
        let current = self.calendar.day_number(date.year, date.month, date.day)?;
        Ok((current - first + 1) as u32)
    }

    /// Length of one unit step in days
    pub fn days_per_step(&self) -> f64 {
        self.seconds_per_step / SECONDS_PER_DAY
    }
}
