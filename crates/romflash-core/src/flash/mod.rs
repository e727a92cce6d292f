//! Bound flash context, operation flags and progress reporting

mod context;
mod progress;

pub use context::*;
pub use progress::*;
