//! Port traits the domain talks to: bar data, ticker universe, config, reports.

pub mod config_port;
pub mod data_port;
pub mod report_port;
pub mod universe_port;
