//! romflash-dummy - In-memory flash emulator for testing
//!
//! This crate provides a programmer master that emulates a flash chip in
//! memory: contents, identification, erase-block granularity, ranges the
//! master cannot access, and status-register write protection gated by a
//! WP# pin. It's useful for testing and development without real hardware.

#![warn(missing_docs)]

mod config;
mod flash;
mod status;

pub use config::DummyConfig;
pub use flash::{DummyFlash, DummyStats};

#[cfg(test)]
mod scenarios;
