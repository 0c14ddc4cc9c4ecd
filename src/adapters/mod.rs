//! Concrete adapter implementations for ports.

pub mod alphavantage_adapter;
pub mod clock;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod http;
pub mod memory_store;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
#[cfg(feature = "web")]
pub mod web;
pub mod yahoo_adapter;
