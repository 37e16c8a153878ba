//! Trade simulation: sizing, brackets, and the per-bar equity fold.

pub mod bracket;
pub mod engine;
pub mod sizing;

pub use bracket::{bracket_prices, check_exit};
pub use engine::{run, BarOutcome, SimReport, Simulator};
pub use sizing::risk_size;
