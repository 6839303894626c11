use anyhow::Result;
use collection::collector::DataCollectionModule;
use processing::{focus::FocusProcessor, ProcessingModule};
use storage::summary_store::FileSummaryStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    config::TrackerConfig,
    tracking::aggregator::Observation,
    utils::clock::{Clock, DefaultClock},
    window_api::{FocusProbe, GenericFocusProbe},
};

pub mod args;
pub mod collection;
pub mod processing;
pub mod shutdown;
pub mod storage;

/// Represents the starting point for the tracker. Returns once a shutdown signal arrives and the
/// summaries are written.
pub async fn start_tracker(config: TrackerConfig) -> Result<()> {
    std::env::set_current_dir("/")?;

    let (sender, receiver) = mpsc::channel::<Observation>(10);
    let probe = GenericFocusProbe::new()?;

    let shutdown_token = CancellationToken::new();

    let collector = create_collector(&config, sender, probe, &shutdown_token, DefaultClock);

    let processor = create_processor(&config, receiver, DefaultClock).await;

    info!("Tracking focus, summaries go to {:?}", config.summary_dir);

    let (_, collection_result, processing_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        collector.run(),
        processor.run(),
    );

    if let Err(collection_result) = collection_result {
        error!("Collection module got an error {:?}", collection_result);
    }

    if let Err(processing_result) = processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    Ok(())
}

fn create_collector(
    config: &TrackerConfig,
    sender: mpsc::Sender<Observation>,
    probe: impl FocusProbe + 'static,
    shutdown_token: &CancellationToken,
    clock: impl Clock,
) -> DataCollectionModule {
    DataCollectionModule::new(
        sender,
        Box::new(probe),
        shutdown_token.clone(),
        config.afk_evaluator,
        config.poll_every,
        Box::new(clock),
    )
}

/// Never fails: an unusable summary directory only shows up when saving, where the processor falls
/// back to printing.
async fn create_processor(
    config: &TrackerConfig,
    receiver: mpsc::Receiver<Observation>,
    clock: impl Clock,
) -> ProcessingModule<FocusProcessor<FileSummaryStore>> {
    let store = FileSummaryStore::new(config.summary_dir.clone());
    let processor = FocusProcessor::start(config, store, Box::new(clock)).await;
    ProcessingModule::new(receiver, processor, config.autosave_every)
}
