//! Run orchestration: attempts, retries and result capture.

mod attempt;
mod controller;
mod metadata;
mod state;

pub use attempt::*;
pub use controller::*;
pub use metadata::*;
pub use state::*;
