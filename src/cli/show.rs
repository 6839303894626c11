use std::{
    fmt::{Display, Write},
    path::PathBuf,
};

use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::{Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use serde::Serialize;

use crate::{
    config::default_summary_dir,
    daemon::storage::summary_store::{FileSummaryStore, SummaryStore},
    tracking::{
        duration::{render_duration, round_to_seconds},
        summary::{application_total, display_title, merge_summary, AggregationTable, Bucket},
    },
    utils::{dir::application_default_path, time::date_to_summary_name},
};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct ShowCommand {
    #[arg(
        long,
        short,
        help = "Day to show. Examples are \"today\", \"yesterday\", \"15/03/2025\". Defaults to today"
    )]
    date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(long, short, help = "Show time spent outside work hours")]
    outside: bool,
    #[arg(long, help = "Print the summary as JSON")]
    json: bool,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long = "log-path", env = "LOG_PATH", help = "Directory with daily summaries")]
    log_path: Option<PathBuf>,
}

/// Prints a saved summary. The file is parsed back into a table, so hand edited summaries come out
/// normalized.
pub async fn process_show_command(
    ShowCommand {
        date,
        date_style,
        outside,
        json,
        dir,
        log_path,
    }: ShowCommand,
) -> Result<()> {
    let date = parse_day(date, date_style)?;
    let bucket = if outside { Bucket::Outside } else { Bucket::Work };

    let summary_dir = match log_path {
        Some(path) => path,
        None => default_summary_dir(&dir.map_or_else(application_default_path, Ok)?),
    };
    let store = FileSummaryStore::new(summary_dir);

    let mut table = AggregationTable::new();
    if let Some(summary) = store.load(date, bucket).await? {
        merge_summary(&summary, &mut table);
    }

    if json {
        println!("{}", format_summary_json(date, bucket, &table)?);
    } else {
        print!("{}", format_summary(date, bucket, &table));
    }
    Ok(())
}

fn parse_day(date: Option<String>, date_style: DateStyle) -> Result<NaiveDate> {
    let now = Local::now();
    match date.map(|s| parse_date_string(&s, now, date_style.into())) {
        Some(Ok(v)) => Ok(v.date_naive()),
        Some(Err(e)) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {e}"),
            )
            .into()),
        None => Ok(now.date_naive()),
    }
}

fn bucket_name(bucket: Bucket) -> &'static str {
    match bucket {
        Bucket::Work => "work hours",
        Bucket::Outside => "outside work hours",
    }
}

fn format_summary(date: NaiveDate, bucket: Bucket, table: &AggregationTable) -> String {
    let mut output = String::new();
    let heading = format!(
        "Focus for {} ({})",
        date_to_summary_name(date),
        bucket_name(bucket)
    );
    let _ = writeln!(output, "{}", Style::new().bold().paint(heading));

    if table.is_empty() {
        let _ = writeln!(output, "Nothing tracked.");
        return output;
    }

    for (application, titles) in table.applications() {
        let _ = writeln!(
            output,
            "{}  {}",
            Colour::Green.bold().paint(&**application),
            render_duration(application_total(titles))
        );
        for (title, duration) in titles {
            let _ = writeln!(
                output,
                "    {}  {}",
                Colour::Cyan.paint(render_duration(*duration)),
                display_title(title)
            );
        }
    }
    let _ = writeln!(
        output,
        "{}  {}",
        Style::new().bold().paint("Total"),
        render_duration(table.total())
    );
    output
}

#[derive(Debug, Serialize)]
struct JsonSummary<'a> {
    date: NaiveDate,
    bucket: Bucket,
    total_seconds: i64,
    applications: Vec<JsonApplication<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonApplication<'a> {
    name: &'a str,
    total_seconds: i64,
    titles: Vec<JsonTitle<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonTitle<'a> {
    title: &'a str,
    seconds: i64,
}

fn format_summary_json(date: NaiveDate, bucket: Bucket, table: &AggregationTable) -> Result<String> {
    let applications = table
        .applications()
        .map(|(name, titles)| JsonApplication {
            name,
            total_seconds: application_total(titles).num_seconds(),
            titles: titles
                .iter()
                .map(|(title, duration)| JsonTitle {
                    title,
                    seconds: round_to_seconds(*duration).num_seconds(),
                })
                .collect(),
        })
        .collect::<Vec<_>>();

    let summary = JsonSummary {
        date,
        bucket,
        total_seconds: applications.iter().map(|a| a.total_seconds).sum(),
        applications,
    };
    Ok(serde_json::to_string_pretty(&summary)?)
}
