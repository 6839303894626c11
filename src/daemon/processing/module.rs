use anyhow::Result;

use crate::tracking::aggregator::Observation;

/// Represents an event processor. Everything a processor does happens on the processing task, so
/// it never needs to synchronize with itself.
pub trait EventProcessor {
    fn process_next(&mut self, message: Observation) -> impl std::future::Future<Output = Result<()>>;

    /// Called periodically while tracking.
    fn checkpoint(&mut self) -> impl std::future::Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl std::future::Future<Output = Result<()>>;
}
