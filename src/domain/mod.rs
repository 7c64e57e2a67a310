//! Core domain types and logic.

pub mod ohlcv;
pub mod bar_series;
pub mod indicator;
pub mod trend_frame;
pub mod filter;
pub mod pipeline;
pub mod regime;
pub mod screener;
pub mod rolling;
pub mod calendar;
pub mod trade;
pub mod simulator;
pub mod share_class;
pub mod aggregator;
pub mod summary;
pub mod universe;
pub mod config;
pub mod config_validation;
pub mod runner;
pub mod error;
