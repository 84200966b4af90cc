use super::Task;
use super::TaskExecutor;

/// Runs tasks serially on the caller thread.
///
/// Sufficient for in-memory trees and for platforms whose attribute reads
/// are fast; hardware backends with slow transceiver/sensor I/O would swap
/// in a pooled implementation.
#[derive(Debug, Default)]
pub struct InlineExecutor;

impl TaskExecutor for InlineExecutor {
    fn run_all(
        &self,
        tasks: Vec<Task<'_>>,
    ) {
        for task in tasks {
            task();
        }
    }
}
