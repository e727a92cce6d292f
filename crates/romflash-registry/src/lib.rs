//! romflash-registry - Programmer registration and dispatch
//!
//! Parses programmer strings (`name` or `name:key=value,...`), lists the
//! programmers enabled at compile time and opens them as
//! [`ProgrammerMaster`](romflash_core::programmer::ProgrammerMaster)s.

#![warn(missing_docs)]

mod catalog;
mod error;
mod open;
mod params;

pub use catalog::*;
pub use error::RegistryError;
pub use open::open_master;
pub use params::{parse_programmer_params, ProgrammerParams};
