use std::{collections::BTreeMap, fmt::Write, sync::Arc};

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{debug, trace};

use crate::utils::time::date_to_summary_name;

use super::duration::{parse_duration, render_duration, round_to_seconds};

/// Shown in place of an empty window title.
pub const NO_TITLE: &str = "(no title)";

const SUMMARY_PREFIX: &str = "Focus Summary";
const SEPARATOR: &str = "----------------------------------------";
const APPLICATION_SEPARATOR: char = '—';

/// The two partitions of tracked time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Work,
    Outside,
}

impl Bucket {
    pub const ALL: [Bucket; 2] = [Bucket::Work, Bucket::Outside];

    pub fn suffix(&self) -> &'static str {
        match self {
            Bucket::Work => "",
            Bucket::Outside => "_outside",
        }
    }

    /// Name of the summary file that stores this bucket for `date`.
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!(
            "focus_tracker_{}{}.log",
            date_to_summary_name(date),
            self.suffix()
        )
    }
}

/// Accumulated time per application and window title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationTable {
    applications: BTreeMap<Arc<str>, BTreeMap<Arc<str>, Duration>>,
}

impl AggregationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `duration` to the entry, creating it if needed. Negative durations are ignored.
    pub fn credit(&mut self, application: &Arc<str>, title: &Arc<str>, duration: Duration) {
        let duration = duration.max(Duration::zero());
        let titles = self.applications.entry(application.clone()).or_default();
        *titles.entry(title.clone()).or_insert_with(Duration::zero) += duration;
    }

    pub fn get(&self, application: &str, title: &str) -> Option<Duration> {
        self.applications.get(application)?.get(title).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }

    /// Applications in lexicographic order with their titles, also ordered.
    pub fn applications(
        &self,
    ) -> impl Iterator<Item = (&Arc<str>, &BTreeMap<Arc<str>, Duration>)> + '_ {
        self.applications.iter()
    }

    pub fn total(&self) -> Duration {
        self.applications
            .values()
            .flat_map(|titles| titles.values())
            .fold(Duration::zero(), |sum, v| sum + *v)
    }
}

/// Sum of rounded title durations, so the header always agrees with the lines under it.
pub fn application_total(titles: &BTreeMap<Arc<str>, Duration>) -> Duration {
    titles
        .values()
        .fold(Duration::zero(), |sum, v| sum + round_to_seconds(*v))
}

pub fn display_title(title: &str) -> &str {
    if title.is_empty() {
        NO_TITLE
    } else {
        title
    }
}

/// Renders the daily summary file for one bucket.
pub fn render_summary(date: NaiveDate, bucket: Bucket, table: &AggregationTable) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "{SUMMARY_PREFIX} for {} ({})",
        date_to_summary_name(date),
        bucket.suffix()
    );
    let _ = writeln!(text, "{SEPARATOR}");
    for (application, titles) in table.applications() {
        let _ = writeln!(
            text,
            "{application} {APPLICATION_SEPARATOR} {}",
            render_duration(application_total(titles))
        );
        for (title, duration) in titles {
            let _ = writeln!(
                text,
                "  - {}: {}",
                display_title(title),
                render_duration(*duration)
            );
        }
    }
    text.push('\n');
    text
}

/// Adds the entries of a previously rendered summary into `into`. Application totals in the
/// text are ignored since they are derived from the entries. Lines that don't fit the format are
/// skipped. Returns the amount of merged entries.
///
/// Merging is additive, so each summary must be merged at most once per run.
pub fn merge_summary(blob: &str, into: &mut AggregationTable) -> usize {
    let mut current: Option<Arc<str>> = None;
    let mut merged = 0;

    for line in blob.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(SUMMARY_PREFIX) {
            continue;
        }

        if !line.starts_with('-') {
            if let Some((application, _)) = line.rsplit_once(APPLICATION_SEPARATOR) {
                let application = application.trim();
                current = (!application.is_empty()).then(|| application.into());
            } else {
                trace!("Skipping summary line {line:?}");
            }
            continue;
        }

        let Some((title, duration)) = line.trim_start_matches('-').rsplit_once(':') else {
            trace!("Skipping summary line {line:?}");
            continue;
        };
        let Some(application) = current.as_ref() else {
            debug!("Dropping entry without an application {line:?}");
            continue;
        };
        let title = match title.trim() {
            NO_TITLE => "",
            title => title,
        };
        into.credit(application, &title.into(), parse_duration(duration));
        merged += 1;
    }

    merged
}
