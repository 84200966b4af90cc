//! Attribute Database Error Hierarchy
//!
//! Defines error types for the attribute database engine, categorized by
//! boundary: schema validation, query registration and reads, subscriber
//! delivery, and scheduler lifecycle.

use std::time::Duration;

use config::ConfigError;

use crate::schema::Path;
use crate::schema::SchemaDescriptor;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Root schema validation failures, fatal at construction
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Query registration and attribute read failures
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Subscriber delivery failures
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    /// Scheduler lifecycle misuse
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The root of an attribute database must carry the expected schema type
    #[error("Root schema mismatch: expected {expected}, got {actual}")]
    Mismatch {
        expected: SchemaDescriptor,
        actual: SchemaDescriptor,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The query references a path that does not resolve against the schema
    #[error("Path does not resolve against the schema: {0}")]
    InvalidPath(Path),

    /// Underlying attribute read failed; may be transient (e.g. hardware I/O)
    #[error("Attribute read failed: {0}")]
    ReadError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// A subscriber channel reported backpressure. The flush is aborted and
    /// retried on the next scheduler pass; a closed channel is an ordinary
    /// unsubscribe and never surfaces here.
    #[error("Subscriber channel {subscriber_index} is full, flush aborted")]
    ChannelFull { subscriber_index: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("The polling scheduler is already running")]
    AlreadyRunning,

    #[error("The polling scheduler is not running")]
    NotRunning,

    #[error("The polling scheduler did not stop within {0:?}")]
    ShutdownTimeout(Duration),
}
