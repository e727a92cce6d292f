//! romflash-core - Core library for flash chip programming
//!
//! This crate holds everything between a programmer backend and a caller
//! that wants to read, write, verify or erase a flash chip:
//!
//! - [`chip`]: chip descriptors and the RON chip database
//! - [`programmer`]: the [`ProgrammerMaster`](programmer::ProgrammerMaster)
//!   trait implemented by backends
//! - [`probe`]: chip detection and disambiguation across several masters
//! - [`flash`]: the bound [`FlashContext`](flash::FlashContext), operation
//!   flags and progress reporting
//! - [`layout`]: named regions built from files, Intel Flash Descriptors or
//!   FMAP structures
//! - [`wp`]: write-protection configuration
//! - [`image`]: chip-sized buffer assembly for read/write/verify/erase
//!
//! # Example
//!
//! ```ignore
//! use romflash_core::{image, probe};
//!
//! match probe::probe_all(&mut masters, &db, None)? {
//!     probe::ProbeOutcome::Found(mut ctx) => {
//!         image::read_image(&mut ctx, Some(Path::new("backup.bin")))?;
//!     }
//!     probe::ProbeOutcome::NotFound => println!("No EEPROM/flash device found."),
//!     probe::ProbeOutcome::Ambiguous(names) => println!("Multiple matches: {:?}", names),
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod chip;
pub mod error;
pub mod flash;
pub mod image;
pub mod layout;
pub mod probe;
pub mod programmer;
pub mod wp;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
