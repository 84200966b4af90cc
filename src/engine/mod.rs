mod database;
mod database_query;
mod event;
mod query;
mod scheduler;

pub use database::*;
pub use event::*;

pub(crate) use database_query::*;
pub(crate) use query::*;
pub(crate) use scheduler::*;

#[cfg(test)]
mod scheduler_test;
