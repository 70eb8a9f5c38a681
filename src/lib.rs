//! vixband Library
//!
//! Backtests volatility-implied price ranges against historical index candles

pub mod backtesting;
pub mod config;
pub mod error;
pub mod market_data;
pub mod persistence;
pub mod runner;
pub mod types;
