//! Siglab Core — domain types, indicators, signal engines, trade simulator.
//!
//! This crate contains the heart of the backtesting engine:
//! - Domain types (bars, trades, annotated series)
//! - Rolling indicator primitives (expanding windows, ATR, RSI)
//! - Pluggable signal engines behind the `SignalEngine` trait
//! - Bracket-order trade simulator with equity tracking and drawdown halt
//! - Strategy configuration with override merging and validation

pub mod config;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod report;
pub mod signal;
pub mod sim;
