//! Work-scheduling facility injected into the attribute database.
//!
//! The schema tree uses the executor for attribute I/O during extraction and
//! mutation; the engine itself never parallelizes beyond what the tree does
//! internally.

mod inline;

pub use inline::*;


/// A unit of attribute I/O scheduled by the tree.
pub type Task<'a> = Box<dyn FnOnce() + Send + 'a>;

pub trait TaskExecutor: Send + Sync + 'static {
    /// Run every task to completion before returning.
    fn run_all(
        &self,
        tasks: Vec<Task<'_>>,
    );
}
