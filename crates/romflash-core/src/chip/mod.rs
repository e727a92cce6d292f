//! Flash chip types and database
//!
//! This module provides types for describing flash chips and their
//! capabilities, as well as a database of known chips loaded from RON files.

mod database;
mod features;
mod types;

pub use database::*;
pub use features::{BusType, Features};
pub use types::*;
