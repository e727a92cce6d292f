//! CLI command implementations
//!
//! Hardware commands receive a [`FlashContext`](romflash_core::flash::FlashContext)
//! that is already probed, configured and carrying its layout; they only
//! run the operation and print the outcome.

mod erase;
pub mod layout;
mod list;
mod probe;
mod read;
mod verify;
pub mod wp;
mod write;

pub use erase::run_erase;
pub use list::{list_chips, list_programmers};
pub use probe::{run_flash_name, run_flash_size, run_probe};
pub use read::{run_extract, run_read};
pub use verify::run_verify;
pub use write::run_write;
