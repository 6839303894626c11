//!  Storage is organized through [summary_store::FileSummaryStore].
//!  The basic idea is:
//!   - There is a directory with all the summaries.
//!   - Every local day has one summary file per bucket, rewritten in full on every save.
//!   - Summaries are plain text and can be edited by hand.

pub mod summary_store;
