//! Core domain types and logic.

pub mod bar;
pub mod indicator;
pub mod pattern;
pub mod strategy;
pub mod signal_eval;
pub mod execution;
pub mod instrument_data;
pub mod universe;
pub mod config_validation;
pub mod backtest;
pub mod metrics;
pub mod screen;
pub mod error;
