pub mod config;
pub mod decoder;
pub mod error;
pub mod events;
pub mod executor;
pub mod formatters;
pub mod log_query;
pub mod models;
pub mod rpc;
