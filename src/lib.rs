pub mod analysis;
pub mod command;
pub mod config;
pub mod datetime;
pub mod error;
pub mod filter;
pub mod json;
pub mod path;
pub mod query;
pub mod sales;
pub mod schema;
pub mod service;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
mod tests;

pub use command::{Batch, Command};
pub use error::{Error, Result};
pub use filter::{compile, Filter};
pub use service::Ledger;
pub use storage::{SqliteStorage, Storage};
