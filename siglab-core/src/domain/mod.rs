//! Domain types shared by the signal engines and the simulator.

pub mod annotated;
pub mod bar;
pub mod trade;

pub use annotated::AnnotatedBar;
pub use bar::{validate_series, Bar};
pub use trade::{Direction, ExitReason, Trade, TradeExit};
