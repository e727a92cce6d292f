//! Write protection support
//!
//! Flash chips implement write protection through a mode and a protected
//! range. This module covers the whole stack:
//!
//! - [`WpConfig`], [`WpMode`], [`WpRange`]: the transient configuration
//!   read from and written back to the chip
//! - [`regs`]: the status-register scheme most SPI chips use (BP, TB, SEC,
//!   CMP, SRP and SRL bits) and the read-merge-write-verify protocol for it
//! - [`WpRequest`] and [`run`]: the engine behind `wp` commands, with
//!   diagnosis of failed writes keyed on the previous mode
//! - [`describe_range`]: human-readable range rendering
//!
//! # Example
//!
//! ```ignore
//! use romflash_core::wp::{self, WpRequest, WpTarget, WpRange};
//!
//! let request = WpRequest {
//!     target: Some(WpTarget::Range(WpRange::new(0, 0x20000))),
//!     enable: true,
//!     ..Default::default()
//! };
//! let report = wp::run(&mut ctx, &request)?;
//! print!("{}", report);
//! ```

mod describe;
mod engine;
mod error;
mod ranges;
pub mod regs;
mod types;

pub use describe::*;
pub use engine::*;
pub use error::*;
pub use ranges::*;
pub use types::*;
