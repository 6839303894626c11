use std::time::Duration;

use anyhow::Result;
use module::EventProcessor;
use tokio::{
    sync::mpsc::Receiver,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, trace};

use crate::tracking::aggregator::Observation;

pub mod focus;
pub mod module;

/// Represents the consumer of observations. This module is responsible for receiving events and
/// periodically asking the processor to save its state.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<Observation>,
    processor: Processor,
    checkpoint_every: Duration,
}

impl<P: EventProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<Observation>, processor: P, checkpoint_every: Duration) -> Self {
        Self {
            receiver,
            processor,
            checkpoint_every,
        }
    }

    /// Runs until every sender is dropped, then finalizes the processor.
    pub async fn run(mut self) -> Result<()> {
        let mut checkpoint = interval_at(
            Instant::now() + self.checkpoint_every,
            self.checkpoint_every,
        );
        checkpoint.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                record = self.receiver.recv() => {
                    let Some(record) = record else {
                        break;
                    };
                    trace!("Processing event {:?}", record);
                    if let Err(e) = self.processor.process_next(record.clone()).await {
                        error!("Error processing event {:?}: {e:?}", record)
                    }
                }
                _ = checkpoint.tick() => {
                    debug!("Saving checkpoint");
                    if let Err(e) = self.processor.checkpoint().await {
                        error!("Error saving checkpoint {e:?}")
                    }
                }
            }
        }

        let result = self.processor.finalize().await;
        self.receiver.close();
        result
    }
}
