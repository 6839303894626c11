//! Tracker configuration. Every value can be passed as a flag or through the environment
//! (`IDLE_TIME`, `WORK_DAYS`, `WORK_START`, `WORK_END`, `LOG_PATH`). Values that can't be parsed
//! fall back to their defaults instead of preventing the tracker from starting.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use clap::Args;
use tracing::warn;

use crate::{
    tracking::{
        afk::AfkEvaluator,
        schedule::{parse_workdays, WorkSchedule, DEFAULT_WORK_END, DEFAULT_WORK_START},
    },
    utils::dir::absolute_path,
};

pub const DEFAULT_IDLE_THRESHOLD_S: u64 = 120;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Raw configuration as supplied by the user.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerArgs {
    #[arg(
        long = "idle-time",
        env = "IDLE_TIME",
        help = "Seconds without input after which the screen counts as locked. Defaults to 120"
    )]
    pub idle_time: Option<String>,
    #[arg(
        long = "work-days",
        env = "WORK_DAYS",
        help = "Comma separated work days, for example Mon,Tue,Wed. Defaults to Mon-Fri"
    )]
    pub work_days: Option<String>,
    #[arg(
        long = "work-start",
        env = "WORK_START",
        help = "Start of work hours as HH:MM. Defaults to 08:00"
    )]
    pub work_start: Option<String>,
    #[arg(
        long = "work-end",
        env = "WORK_END",
        help = "End of work hours as HH:MM. An end before the start crosses midnight. Defaults to 17:00"
    )]
    pub work_end: Option<String>,
    #[arg(
        long = "log-path",
        env = "LOG_PATH",
        help = "Directory for daily summaries. Defaults to the summaries directory inside the application directory"
    )]
    pub log_path: Option<PathBuf>,
    #[arg(
        long = "autosave-minutes",
        env = "AUTOSAVE_MINUTES",
        help = "How often summaries are saved while tracking. Defaults to 10"
    )]
    pub autosave_minutes: Option<String>,
}

impl TrackerArgs {
    /// Builds the configuration. `application_dir` hosts the summaries when no path is given. A
    /// relative summary path is resolved against the current directory.
    pub fn into_config(self, application_dir: &Path) -> TrackerConfig {
        let idle_threshold = parse_or(
            self.idle_time.as_deref(),
            "IDLE_TIME",
            DEFAULT_IDLE_THRESHOLD_S,
        );
        let start = parse_or(self.work_start.as_deref(), "WORK_START", DEFAULT_WORK_START);
        let end = parse_or(self.work_end.as_deref(), "WORK_END", DEFAULT_WORK_END);
        let workdays = parse_workdays(self.work_days.as_deref().unwrap_or_default());
        if workdays.is_empty() {
            warn!("No valid work days in {:?}, all time counts as outside", self.work_days);
        }
        let autosave_minutes =
            parse_or(self.autosave_minutes.as_deref(), "AUTOSAVE_MINUTES", 0u64);
        let autosave_every = match autosave_minutes {
            0 => DEFAULT_AUTOSAVE_INTERVAL,
            minutes => Duration::from_secs(minutes * 60),
        };

        TrackerConfig {
            afk_evaluator: AfkEvaluator::from_seconds(idle_threshold),
            schedule: WorkSchedule::new(workdays, start, end),
            summary_dir: self
                .log_path
                .map(absolute_path)
                .unwrap_or_else(|| default_summary_dir(application_dir)),
            poll_every: DEFAULT_POLL_INTERVAL,
            autosave_every,
        }
    }

    /// Converts arguments back into flags, used when spawning the daemon.
    pub fn to_flags(&self) -> Vec<String> {
        let mut flags = vec![];
        let mut push = |name: &str, value: Option<String>| {
            if let Some(value) = value {
                flags.push(format!("--{name}"));
                flags.push(value);
            }
        };
        push("idle-time", self.idle_time.clone());
        push("work-days", self.work_days.clone());
        push("work-start", self.work_start.clone());
        push("work-end", self.work_end.clone());
        push(
            "log-path",
            self.log_path.as_ref().map(|v| v.to_string_lossy().to_string()),
        );
        push("autosave-minutes", self.autosave_minutes.clone());
        flags
    }
}

pub fn default_summary_dir(application_dir: &Path) -> PathBuf {
    application_dir.join("summaries")
}

fn parse_or<T>(value: Option<&str>, name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => default,
        Some(value) => value.parse().unwrap_or_else(|e| {
            warn!("Could not parse {name} value {value:?}, using default: {e}");
            default
        }),
    }
}

/// Configuration of a tracking run. Built once at startup and handed to the components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub afk_evaluator: AfkEvaluator,
    pub schedule: WorkSchedule,
    pub summary_dir: PathBuf,
    pub poll_every: Duration,
    pub autosave_every: Duration,
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, path::Path, time::Duration};

    use chrono::Weekday;

    use super::*;
    use crate::tracking::schedule::{default_workdays, TimeOfDay};

    #[test]
    fn test_defaults() {
        let config = TrackerArgs::default().into_config(Path::new("/state"));
        assert_eq!(config.afk_evaluator.threshold_seconds(), 120);
        assert_eq!(config.schedule, WorkSchedule::default());
        assert_eq!(config.summary_dir, Path::new("/state/summaries"));
        assert_eq!(config.autosave_every, Duration::from_secs(600));
    }

    #[test]
    fn test_custom_values() {
        let args = TrackerArgs {
            idle_time: Some("300".into()),
            work_days: Some("sat,sun".into()),
            work_start: Some("22:00".into()),
            work_end: Some("06:30".into()),
            log_path: Some("/var/log/focus".into()),
            autosave_minutes: Some("1".into()),
        };
        let config = args.into_config(Path::new("/state"));
        assert_eq!(config.afk_evaluator.threshold_seconds(), 300);
        assert_eq!(
            config.schedule.workdays(),
            &HashSet::from([Weekday::Sat, Weekday::Sun])
        );
        assert_eq!(config.schedule.start(), TimeOfDay::new_opt(22, 0).unwrap());
        assert_eq!(config.schedule.end(), TimeOfDay::new_opt(6, 30).unwrap());
        assert!(config.schedule.crosses_midnight());
        assert_eq!(config.summary_dir, Path::new("/var/log/focus"));
        assert_eq!(config.autosave_every, Duration::from_secs(60));
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let args = TrackerArgs {
            idle_time: Some("two minutes".into()),
            work_days: Some("".into()),
            work_start: Some("8am".into()),
            work_end: Some("".into()),
            log_path: None,
            autosave_minutes: Some("-5".into()),
        };
        let config = args.into_config(Path::new("/state"));
        assert_eq!(config.afk_evaluator.threshold_seconds(), 120);
        assert_eq!(config.schedule.workdays(), &default_workdays());
        assert_eq!(config.schedule.start(), DEFAULT_WORK_START);
        assert_eq!(config.schedule.end(), DEFAULT_WORK_END);
        assert_eq!(config.autosave_every, DEFAULT_AUTOSAVE_INTERVAL);
    }

    #[test]
    fn test_relative_log_path_is_resolved() {
        let args = TrackerArgs {
            log_path: Some("logs".into()),
            ..Default::default()
        };
        let config = args.into_config(Path::new("/state"));
        assert!(config.summary_dir.is_absolute());
        assert_eq!(
            config.summary_dir,
            std::env::current_dir().unwrap().join("logs")
        );
    }

    #[test]
    fn test_flags_round_trip() {
        let args = TrackerArgs {
            idle_time: Some("60".into()),
            work_start: Some("09:00".into()),
            ..Default::default()
        };
        assert_eq!(
            args.to_flags(),
            vec!["--idle-time", "60", "--work-start", "09:00"]
        );
    }
}
