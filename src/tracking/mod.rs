//! Focus tracking core. [aggregator::FocusAggregator] turns a stream of
//! [aggregator::Observation]s into per application and window title totals, split into work and
//! outside buckets by [schedule::WorkSchedule]. The totals are persisted as plain text
//! summaries through [summary::render_summary] and recovered with [summary::merge_summary].

pub mod afk;
pub mod aggregator;
pub mod duration;
pub mod schedule;
pub mod summary;
