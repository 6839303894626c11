use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, trace, warn, Instrument};

use crate::{
    tracking::{
        afk::AfkEvaluator,
        aggregator::{FocusKey, Observation},
    },
    utils::clock::Clock,
    window_api::FocusProbe,
};

/// Polls the [FocusProbe] and forwards [Observation]s to the processing module.
pub struct DataCollectionModule {
    next: mpsc::Sender<Observation>,
    producer: Box<dyn FocusProbe>,
    shutdown: CancellationToken,
    afk_evaluator: AfkEvaluator,
    collection_frequency: Duration,
    time_provider: Box<dyn Clock>,
}

impl DataCollectionModule {
    pub fn new(
        next: mpsc::Sender<Observation>,
        producer: Box<dyn FocusProbe>,
        shutdown: CancellationToken,
        afk_evaluator: AfkEvaluator,
        collection_frequency: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            producer,
            collection_frequency,
            afk_evaluator,
            time_provider,
            shutdown,
        }
    }

    /// Samples idle time and, unless the user is away, the focused window. Failed queries never
    /// abort a tick: idle time falls back to zero and a missing window is reported as `None`.
    fn collect_data(&mut self) -> Observation {
        let at = self.time_provider.time();
        let idle_seconds = self
            .producer
            .idle_seconds()
            .inspect_err(|e| warn!("Failed to query idle time {e:?}"))
            .unwrap_or(0);

        let window = if self.afk_evaluator.is_afk(idle_seconds) {
            None
        } else {
            self.collect_window()
        };

        Observation {
            at,
            idle_seconds,
            window,
        }
    }

    fn collect_window(&mut self) -> Option<FocusKey> {
        let identity = match self.producer.foreground_identity() {
            Ok(identity) if identity.application.is_empty() => {
                debug!("Foreground application has no name");
                return None;
            }
            Ok(identity) => identity,
            Err(e) => {
                error!("Encountered an error during collection {:?}", e);
                return None;
            }
        };

        let title = self
            .producer
            .window_title(&identity.process_name)
            .inspect_err(|e| trace!("No title for {} {e:?}", identity.process_name))
            .unwrap_or_default();

        Some(FocusKey::new(identity.application, title))
    }

    /// Executes the collector event loop.
    pub async fn run(mut self) -> Result<()> {
        let mut collection_point = self.time_provider.instant();
        loop {
            collection_point += self.collection_frequency;

            let record = self.collect_data();
            let span = info_span!("Processing collected data");
            debug!("Sending message {:?}", record);
            if let Err(e) = self.next.send(record).instrument(span).await {
                error!("Unexpected error during sending {e:?}");
                self.shutdown.cancel();
                return Err(e.into());
            }

            tokio::select! {
                // Cancelation means we stop execution of the event loop. Which means we also drop
                // the sender channel and consequently stop processing module.
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(collection_point) => ()
            }
        }
    }
}
