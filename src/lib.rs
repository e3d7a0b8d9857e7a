pub mod client;
pub mod config;
pub mod connection_pool;
pub mod dispatch;
pub mod errors;
pub mod event;
pub mod generator;
pub mod metrics;
pub mod ramp;
pub mod reporter;
pub mod scheduler;
pub mod stats;
pub mod targets;
pub mod utils;
pub mod worker;
