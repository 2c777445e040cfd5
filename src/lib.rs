pub mod api;
pub mod batch;
pub mod clients;
pub mod config;
pub mod dedup;
pub mod error;
pub mod models;
pub mod runtime;
pub mod worker;
