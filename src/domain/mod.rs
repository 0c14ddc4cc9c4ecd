//! Core domain types and logic.

pub mod acquisition;
pub mod cleaning;
pub mod comparison;
pub mod error;
pub mod indicator;
pub mod instrument;
pub mod metrics;
pub mod ohlcv;
pub mod service;
pub mod settings;
pub mod stats;
pub mod technicals;
