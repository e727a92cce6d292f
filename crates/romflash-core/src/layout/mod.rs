//! Flash layouts
//!
//! A layout names byte ranges of the chip. It can be loaded from a layout
//! file, parsed from an Intel Flash Descriptor or an fmap (on the chip or
//! in a file), or left out, in which case operations cover the whole chip.
//!
//! Regions are selected for an operation with include arguments, each
//! optionally carrying a file for partial I/O:
//!
//! ```ignore
//! let includes = IncludeArgs::parse_all(["bios:bios.bin"])?;
//! LayoutSource::Ifd { dump: None }.bind(&mut ctx, &includes)?;
//! ```

mod error;
pub mod fmap;
pub mod ifd;
mod include;
pub mod rom;
mod source;
mod text;
mod toml;
mod types;

pub use error::LayoutError;
pub use include::{IncludeArg, IncludeArgs};
pub use source::LayoutSource;
pub use self::toml::{format_size, parse_number, parse_size};
pub use types::*;
