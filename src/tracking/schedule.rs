use std::{collections::HashSet, fmt::Display, str::FromStr};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, TimeZone, Timelike, Weekday};

pub const DEFAULT_WORK_START: TimeOfDay = TimeOfDay { hour: 8, minute: 0 };
pub const DEFAULT_WORK_END: TimeOfDay = TimeOfDay { hour: 17, minute: 0 };

/// Hour and minute of a day. Ordering is lexicographic on (hour, minute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub fn new_opt(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    fn as_naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for TimeOfDay {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let time = NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map_err(|e| anyhow!("Can't parse {s} into time of day: {e}"))?;
        Ok(Self {
            hour: time.hour(),
            minute: time.minute(),
        })
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Decides whether a moment belongs to work hours.
///
/// A window whose start is after its end (for example 22:00-06:00) crosses midnight. Its late
/// segment belongs to the day it starts on, and the early segment may continue the previous
/// day's window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSchedule {
    workdays: HashSet<Weekday>,
    start: TimeOfDay,
    end: TimeOfDay,
}

impl Default for WorkSchedule {
    fn default() -> Self {
        Self::new(default_workdays(), DEFAULT_WORK_START, DEFAULT_WORK_END)
    }
}

impl WorkSchedule {
    pub fn new(workdays: HashSet<Weekday>, start: TimeOfDay, end: TimeOfDay) -> Self {
        Self {
            workdays,
            start,
            end,
        }
    }

    pub fn workdays(&self) -> &HashSet<Weekday> {
        &self.workdays
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    pub fn crosses_midnight(&self) -> bool {
        self.start > self.end
    }

    pub fn is_work_hour<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> bool {
        self.is_work_time(at.naive_local())
    }

    /// Same as [WorkSchedule::is_work_hour] but on wall-clock time.
    pub fn is_work_time(&self, at: NaiveDateTime) -> bool {
        let time = at.time();
        let start = self.start.as_naive();
        let end = self.end.as_naive();
        let today = self.workdays.contains(&at.weekday());

        if !self.crosses_midnight() {
            return today && start <= time && time < end;
        }

        if time >= start {
            return today;
        }
        let yesterday = self.workdays.contains(&at.weekday().pred());
        time < end && (today || yesterday)
    }
}

pub fn default_workdays() -> HashSet<Weekday> {
    HashSet::from([
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ])
}

/// Parses comma separated day names like `Mon,Tue,sat`. Unknown names are skipped. An empty input
/// means the default work week.
pub fn parse_workdays(input: &str) -> HashSet<Weekday> {
    if input.trim().is_empty() {
        return default_workdays();
    }
    input
        .split(',')
        .filter_map(|day| match day.trim().to_lowercase().as_str() {
            "mon" => Some(Weekday::Mon),
            "tue" => Some(Weekday::Tue),
            "wed" => Some(Weekday::Wed),
            "thu" => Some(Weekday::Thu),
            "fri" => Some(Weekday::Fri),
            "sat" => Some(Weekday::Sat),
            "sun" => Some(Weekday::Sun),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    // 2025-03-04 is a Tuesday.
    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn night_shift(workdays: HashSet<Weekday>) -> WorkSchedule {
        WorkSchedule::new(
            workdays,
            TimeOfDay::new_opt(22, 0).unwrap(),
            TimeOfDay::new_opt(6, 0).unwrap(),
        )
    }

    #[test]
    fn test_day_window_boundaries() {
        let schedule = WorkSchedule::default();
        assert!(schedule.is_work_time(at(4, 8, 0)));
        assert!(schedule.is_work_time(at(4, 16, 59)));
        assert!(!schedule.is_work_time(at(4, 17, 0)));
        assert!(!schedule.is_work_time(at(4, 7, 59)));
    }

    #[test]
    fn test_day_window_weekend() {
        let schedule = WorkSchedule::default();
        // Saturday
        assert!(!schedule.is_work_time(at(8, 10, 0)));
    }

    #[test]
    fn test_night_window() {
        let schedule = night_shift(default_workdays());
        assert!(schedule.crosses_midnight());
        assert!(schedule.is_work_time(at(4, 23, 59)));
        assert!(schedule.is_work_time(at(5, 5, 59)));
        assert!(schedule.is_work_time(at(4, 22, 0)));
        assert!(!schedule.is_work_time(at(5, 6, 0)));
        assert!(!schedule.is_work_time(at(4, 12, 0)));
    }

    #[test]
    fn test_night_window_continues_from_previous_workday() {
        let schedule = night_shift(default_workdays());
        // Saturday early morning continues Friday's shift, Saturday night does not start one.
        assert!(schedule.is_work_time(at(8, 3, 0)));
        assert!(!schedule.is_work_time(at(8, 23, 0)));
        // Sunday early morning follows a Saturday without work.
        assert!(!schedule.is_work_time(at(9, 3, 0)));
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(
            "09:30".parse::<TimeOfDay>().unwrap(),
            TimeOfDay::new_opt(9, 30).unwrap()
        );
        assert!("25:00".parse::<TimeOfDay>().is_err());
        assert!("nine".parse::<TimeOfDay>().is_err());
        assert_eq!(TimeOfDay::new_opt(7, 5).unwrap().to_string(), "07:05");
    }

    #[test]
    fn test_parse_workdays() {
        assert_eq!(parse_workdays(""), default_workdays());
        assert_eq!(
            parse_workdays("Sat, sun,xyz"),
            HashSet::from([Weekday::Sat, Weekday::Sun])
        );
        assert!(parse_workdays("nope").is_empty());
    }
}
