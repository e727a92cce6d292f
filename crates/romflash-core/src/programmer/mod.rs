//! Programmer master abstraction
//!
//! A programmer master is one attached backend (USB dongle, chipset
//! controller, emulator). The core never talks to a bus directly; it calls
//! the primitives of [`ProgrammerMaster`].

mod traits;

pub use traits::*;
