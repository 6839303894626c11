use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::{error, info, instrument, warn};

use crate::{
    config::TrackerConfig,
    daemon::storage::summary_store::SummaryStore,
    tracking::{
        aggregator::{FocusAggregator, Observation},
        summary::{merge_summary, render_summary, Bucket},
    },
    utils::clock::Clock,
};

use super::module::EventProcessor;

/// Bridges [ProcessingModule](super::ProcessingModule) with [FocusAggregator] and a
/// [SummaryStore]. Summaries of a run are always written for the day the run started on, which is
/// also the day whose summaries were merged at startup.
pub struct FocusProcessor<S: SummaryStore> {
    aggregator: FocusAggregator,
    store: S,
    date: NaiveDate,
    clock: Box<dyn Clock>,
    /// Receives summaries that couldn't be saved. Stdout unless replaced.
    fallback: Box<dyn Write + Send>,
}

impl<S: SummaryStore> FocusProcessor<S> {
    /// Creates the processor and resumes today's totals from `store`. Summaries that can't be read
    /// are skipped, so tracking starts even with a broken summary directory.
    pub async fn start(config: &TrackerConfig, store: S, clock: Box<dyn Clock>) -> Self {
        let now = clock.time();
        let date = now.date_naive();
        let mut aggregator =
            FocusAggregator::new(config.schedule.clone(), config.afk_evaluator, now);

        for bucket in Bucket::ALL {
            match store.load(date, bucket).await {
                Ok(Some(summary)) => {
                    let merged = merge_summary(&summary, aggregator.table_mut(bucket));
                    info!("Loaded {merged} previous {bucket:?} entries for {date}");
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to load previous {bucket:?} summary {e:?}"),
            }
        }

        Self {
            aggregator,
            store,
            date,
            clock,
            fallback: Box::new(std::io::stdout()),
        }
    }

    pub fn with_fallback(mut self, fallback: impl Write + Send + 'static) -> Self {
        self.fallback = Box::new(fallback);
        self
    }

    pub fn aggregator(&self) -> &FocusAggregator {
        &self.aggregator
    }

    /// Saves both buckets. A failed save writes the summary to the fallback output instead, so the
    /// data is never lost silently.
    #[instrument(skip(self))]
    async fn persist(&mut self) {
        for bucket in Bucket::ALL {
            let table = self.aggregator.table(bucket);
            if table.is_empty() {
                continue;
            }
            let summary = render_summary(self.date, bucket, table);
            if let Err(e) = self.store.save(self.date, bucket, &summary).await {
                error!("Could not save {bucket:?} summary {e:?}");
                let printed = writeln!(
                    self.fallback,
                    "---- Printing summary to stdout instead ----"
                )
                .and_then(|_| self.fallback.write_all(summary.as_bytes()))
                .and_then(|_| self.fallback.flush());
                if let Err(e) = printed {
                    error!("Could not print {bucket:?} summary either {e:?}");
                }
            }
        }
    }
}

impl<S: SummaryStore> EventProcessor for FocusProcessor<S> {
    async fn process_next(&mut self, message: Observation) -> Result<()> {
        self.aggregator.observe(message);
        Ok(())
    }

    async fn checkpoint(&mut self) -> Result<()> {
        self.persist().await;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        self.aggregator.flush(self.clock.time());
        self.persist().await;
        Ok(())
    }
}
