use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Local};
use tracing::{debug, info};

use crate::utils::time::clock_label;

use super::{
    afk::AfkEvaluator,
    duration::render_duration,
    schedule::WorkSchedule,
    summary::{AggregationTable, Bucket},
};

/// Application name under which locked or idle time is stored.
pub const LOCKED_SCREEN: &str = "Locked screen";

/// Identifies what has the user's attention.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FocusKey {
    pub application: Arc<str>,
    pub title: Arc<str>,
}

impl FocusKey {
    pub fn new(application: impl Into<Arc<str>>, title: impl Into<Arc<str>>) -> Self {
        Self {
            application: application.into(),
            title: title.into(),
        }
    }
}

/// One sample of the user's activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub at: DateTime<Local>,
    pub idle_seconds: u64,
    /// `None` when the foreground window couldn't be determined.
    pub window: Option<FocusKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusState {
    NoFocus,
    Focused(FocusKey),
    /// Screen is locked or the user is idle since `at`.
    Locked { at: DateTime<Local> },
}

impl FocusState {
    /// Key under which time spent in this state is stored.
    pub fn credited_key(&self) -> Option<FocusKey> {
        match self {
            FocusState::NoFocus => None,
            FocusState::Focused(key) => Some(key.clone()),
            FocusState::Locked { at } => Some(FocusKey::new(LOCKED_SCREEN, clock_label(at))),
        }
    }
}

/// Time credited to a key when a session closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    pub key: FocusKey,
    pub bucket: Bucket,
    pub duration: Duration,
}

/// Tracks the current focus session and accumulates the time of finished sessions into the work
/// and outside tables. A session is bucketed entirely by the moment it started.
#[derive(Debug)]
pub struct FocusAggregator {
    schedule: WorkSchedule,
    afk_evaluator: AfkEvaluator,
    state: FocusState,
    since: DateTime<Local>,
    work: AggregationTable,
    outside: AggregationTable,
    last_titles: HashMap<Arc<str>, Arc<str>>,
}

impl FocusAggregator {
    pub fn new(schedule: WorkSchedule, afk_evaluator: AfkEvaluator, started: DateTime<Local>) -> Self {
        Self {
            schedule,
            afk_evaluator,
            state: FocusState::NoFocus,
            since: started,
            work: AggregationTable::new(),
            outside: AggregationTable::new(),
            last_titles: HashMap::new(),
        }
    }

    pub fn state(&self) -> &FocusState {
        &self.state
    }

    pub fn since(&self) -> DateTime<Local> {
        self.since
    }

    pub fn table(&self, bucket: Bucket) -> &AggregationTable {
        match bucket {
            Bucket::Work => &self.work,
            Bucket::Outside => &self.outside,
        }
    }

    /// Gives access to a table for seeding it with previously saved data.
    pub fn table_mut(&mut self, bucket: Bucket) -> &mut AggregationTable {
        match bucket {
            Bucket::Work => &mut self.work,
            Bucket::Outside => &mut self.outside,
        }
    }

    /// Processes a sample. Returns the credit of the session that was closed by it, if any.
    pub fn observe(&mut self, observation: Observation) -> Option<Credit> {
        let Observation {
            at,
            idle_seconds,
            window,
        } = observation;

        if self.afk_evaluator.is_afk(idle_seconds) {
            if matches!(self.state, FocusState::Locked { .. }) {
                return None;
            }
            return self.transition(FocusState::Locked { at }, at);
        }

        let Some(candidate) = window else {
            debug!("No window observed at {at}");
            return None;
        };
        let candidate = self.with_known_title(candidate);

        if matches!(&self.state, FocusState::Focused(current) if *current == candidate) {
            return None;
        }
        self.transition(FocusState::Focused(candidate), at)
    }

    /// Credits the open session up to `now` while keeping it open.
    pub fn flush(&mut self, now: DateTime<Local>) -> Option<Credit> {
        let credit = self.credit(now);
        self.advance(now);
        credit
    }

    fn transition(&mut self, next: FocusState, at: DateTime<Local>) -> Option<Credit> {
        let credit = self.credit(at);
        self.state = next;
        self.advance(at);
        credit
    }

    fn advance(&mut self, to: DateTime<Local>) {
        self.since = self.since.max(to);
    }

    fn credit(&mut self, now: DateTime<Local>) -> Option<Credit> {
        let key = self.state.credited_key()?;
        let duration = (now - self.since).max(Duration::zero());
        let bucket = if self.schedule.is_work_hour(&self.since) {
            Bucket::Work
        } else {
            Bucket::Outside
        };

        self.table_mut(bucket)
            .credit(&key.application, &key.title, duration);
        info!(
            "{} [{}]: active for {}",
            key.application,
            key.title,
            render_duration(duration)
        );
        Some(Credit {
            key,
            bucket,
            duration,
        })
    }

    /// Window titles sometimes come back empty for a moment, for example during animations. In
    /// that case the last real title of the application is reused.
    fn with_known_title(&mut self, key: FocusKey) -> FocusKey {
        if key.title.is_empty() {
            match self.last_titles.get(&key.application) {
                Some(title) => FocusKey {
                    title: title.clone(),
                    ..key
                },
                None => key,
            }
        } else {
            self.last_titles
                .insert(key.application.clone(), key.title.clone());
            key
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone};

    use super::*;
    use crate::tracking::schedule::{default_workdays, TimeOfDay};

    // 2025-03-04 is a Tuesday.
    fn at(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Local> {
        let naive = NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap();
        Local.from_local_datetime(&naive).earliest().unwrap()
    }

    fn aggregator(started: DateTime<Local>) -> FocusAggregator {
        FocusAggregator::new(
            WorkSchedule::default(),
            AfkEvaluator::from_seconds(120),
            started,
        )
    }

    fn focus(at: DateTime<Local>, application: &str, title: &str) -> Observation {
        Observation {
            at,
            idle_seconds: 0,
            window: Some(FocusKey::new(application, title)),
        }
    }

    fn idle(at: DateTime<Local>, idle_seconds: u64) -> Observation {
        Observation {
            at,
            idle_seconds,
            window: None,
        }
    }

    #[test]
    fn test_work_day_example() {
        let start = at(4, 10, 0, 0);
        let mut aggregator = aggregator(start);
        aggregator.observe(focus(start, "Editor", "file.go"));
        aggregator.observe(focus(start + Duration::seconds(30), "Browser", "docs"));
        aggregator.flush(start + Duration::seconds(75));

        let mut expected = AggregationTable::new();
        expected.credit(&"Editor".into(), &"file.go".into(), Duration::seconds(30));
        expected.credit(&"Browser".into(), &"docs".into(), Duration::seconds(45));
        assert_eq!(aggregator.table(Bucket::Work), &expected);
        assert!(aggregator.table(Bucket::Outside).is_empty());
    }

    #[test]
    fn test_first_observation_credits_nothing() {
        let start = at(4, 10, 0, 0);
        let mut aggregator = aggregator(start - Duration::minutes(5));
        assert_eq!(aggregator.observe(focus(start, "Editor", "a")), None);
        assert_eq!(aggregator.since(), start);
        assert!(aggregator.table(Bucket::Work).is_empty());
    }

    #[test]
    fn test_title_change_closes_session() {
        let start = at(4, 10, 0, 0);
        let mut aggregator = aggregator(start);
        aggregator.observe(focus(start, "A", "X"));
        let credit = aggregator.observe(focus(start + Duration::seconds(10), "A", "Y"));

        assert_eq!(
            credit,
            Some(Credit {
                key: FocusKey::new("A", "X"),
                bucket: Bucket::Work,
                duration: Duration::seconds(10),
            })
        );
        assert_eq!(aggregator.state(), &FocusState::Focused(FocusKey::new("A", "Y")));
    }

    #[test]
    fn test_same_focus_accrues_silently() {
        let start = at(4, 10, 0, 0);
        let mut aggregator = aggregator(start);
        aggregator.observe(focus(start, "A", "X"));
        assert_eq!(aggregator.observe(focus(start + Duration::seconds(2), "A", "X")), None);
        assert_eq!(aggregator.since(), start);
    }

    #[test]
    fn test_idle_locks_screen() {
        let start = at(4, 10, 0, 0);
        let mut aggregator = aggregator(start);
        aggregator.observe(focus(start, "Editor", "a"));
        let credit = aggregator.observe(idle(start + Duration::seconds(5), 200));

        assert_eq!(credit.map(|v| v.duration), Some(Duration::seconds(5)));
        assert_eq!(
            aggregator.state(),
            &FocusState::Locked {
                at: start + Duration::seconds(5)
            }
        );

        // Staying idle keeps the same locked session.
        assert_eq!(aggregator.observe(idle(start + Duration::seconds(60), 255)), None);

        let credit = aggregator.observe(focus(start + Duration::seconds(65), "Editor", "a"));
        assert_eq!(
            credit,
            Some(Credit {
                key: FocusKey::new(LOCKED_SCREEN, "10-00-05"),
                bucket: Bucket::Work,
                duration: Duration::seconds(60),
            })
        );
    }

    #[test]
    fn test_idle_from_no_focus() {
        let start = at(4, 10, 0, 0);
        let mut aggregator = aggregator(start);
        assert_eq!(aggregator.observe(idle(start, 500)), None);
        assert!(matches!(aggregator.state(), FocusState::Locked { .. }));
    }

    #[test]
    fn test_missing_window_is_not_a_transition() {
        let start = at(4, 10, 0, 0);
        let mut aggregator = aggregator(start);
        aggregator.observe(focus(start, "Editor", "a"));
        assert_eq!(aggregator.observe(idle(start + Duration::seconds(3), 0)), None);
        assert_eq!(aggregator.state(), &FocusState::Focused(FocusKey::new("Editor", "a")));
        assert_eq!(aggregator.since(), start);
    }

    #[test]
    fn test_empty_title_reuses_last_known() {
        let start = at(4, 10, 0, 0);
        let mut aggregator = aggregator(start);
        aggregator.observe(focus(start, "Editor", "a"));
        assert_eq!(aggregator.observe(focus(start + Duration::seconds(1), "Editor", "")), None);

        // Applications without a known title keep the empty title.
        aggregator.observe(focus(start + Duration::seconds(2), "Finder", ""));
        assert_eq!(aggregator.state(), &FocusState::Focused(FocusKey::new("Finder", "")));
        assert_eq!(
            aggregator.table(Bucket::Work).get("Editor", "a"),
            Some(Duration::seconds(2))
        );
    }

    #[test]
    fn test_session_bucketed_by_start() {
        let start = at(4, 16, 59, 0);
        let mut aggregator = aggregator(start);
        aggregator.observe(focus(start, "Editor", "late"));
        aggregator.observe(focus(start + Duration::minutes(30), "Browser", "news"));
        aggregator.flush(start + Duration::minutes(40));

        assert_eq!(
            aggregator.table(Bucket::Work).get("Editor", "late"),
            Some(Duration::minutes(30))
        );
        assert_eq!(
            aggregator.table(Bucket::Outside).get("Browser", "news"),
            Some(Duration::minutes(10))
        );
    }

    #[test]
    fn test_night_session_crossing_midnight_is_work() {
        let schedule = WorkSchedule::new(
            default_workdays(),
            TimeOfDay::new_opt(22, 0).unwrap(),
            TimeOfDay::new_opt(6, 0).unwrap(),
        );
        let start = at(4, 23, 50, 0);
        let mut aggregator = FocusAggregator::new(schedule, AfkEvaluator::from_seconds(120), start);
        aggregator.observe(focus(start, "Terminal", "deploy"));
        aggregator.flush(at(5, 0, 10, 0));

        assert_eq!(
            aggregator.table(Bucket::Work).get("Terminal", "deploy"),
            Some(Duration::minutes(20))
        );
    }

    #[test]
    fn test_credits_cover_observed_time() {
        let start = at(4, 16, 58, 0);
        let mut aggregator = aggregator(start);
        let script = [
            focus(start, "A", "1"),
            focus(start + Duration::seconds(7), "A", "2"),
            focus(start + Duration::seconds(9), "A", "2"),
            idle(start + Duration::seconds(130), 121),
            idle(start + Duration::seconds(150), 141),
            focus(start + Duration::seconds(151), "B", ""),
            idle(start + Duration::seconds(160), 0),
            focus(start + Duration::seconds(170), "A", "1"),
        ];
        for observation in script {
            aggregator.observe(observation);
        }
        aggregator.flush(start + Duration::seconds(200));

        let total =
            aggregator.table(Bucket::Work).total() + aggregator.table(Bucket::Outside).total();
        assert_eq!(total, Duration::seconds(200));
    }

    #[test]
    fn test_clock_going_backwards_credits_nothing() {
        let start = at(4, 10, 0, 0);
        let mut aggregator = aggregator(start);
        aggregator.observe(focus(start, "A", "X"));
        let credit = aggregator.observe(focus(start - Duration::seconds(30), "A", "Y"));
        assert_eq!(credit.map(|v| v.duration), Some(Duration::zero()));
        assert_eq!(aggregator.since(), start);
    }

    #[test]
    fn test_flush_keeps_session_open() {
        let start = at(4, 10, 0, 0);
        let mut aggregator = aggregator(start);
        aggregator.observe(focus(start, "A", "X"));
        aggregator.flush(start + Duration::seconds(4));
        aggregator.flush(start + Duration::seconds(6));

        assert_eq!(aggregator.state(), &FocusState::Focused(FocusKey::new("A", "X")));
        assert_eq!(
            aggregator.table(Bucket::Work).get("A", "X"),
            Some(Duration::seconds(6))
        );
    }
}
