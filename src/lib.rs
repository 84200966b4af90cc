mod config;
mod engine;
mod errors;
mod executor;
mod metrics;
mod schema;

pub use config::*;
pub use engine::*;
pub use errors::*;
pub use executor::*;
pub use metrics::*;
pub use schema::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
