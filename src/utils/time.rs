use chrono::{DateTime, NaiveDate, TimeZone};

/// This is the standard way of converting a date to a string in focus-tracker.
pub fn date_to_summary_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Time of day usable inside file names and summary titles, for example `14-05-09`.
pub fn clock_label<Tz: TimeZone>(moment: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    moment.format("%H-%M-%S").to_string()
}
