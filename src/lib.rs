//! AWS Device Farm runner library

pub mod app;
pub mod archive;
pub mod artifact;
pub mod config;
pub mod devicefarm;
pub mod error;
pub mod job_config;
pub mod list;
pub mod logger;
pub mod poll;
pub mod run;
pub mod schedule;
pub mod upload;
pub mod verdict;

#[cfg(test)]
mod http_stub;
mod local_logger;
mod prelude;
mod request_client;

pub use local_logger::clean_logger;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
