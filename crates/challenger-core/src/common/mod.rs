pub mod config;
pub mod constants;

pub use config::{FailurePolicy, RunConfig, default_concurrency};
