//! wmipf - WMI persistence finder
//!
//! Recovers FilterToConsumerBindings, and the consumers and filters they link,
//! from a raw WMI repository dump by keyword searching overlapping windows of
//! the file instead of parsing the repository structure.

pub mod cli;
pub mod config;
pub mod error;
pub mod patterns;
pub mod report;
pub mod scanner;
pub mod source;
pub mod window;

pub use error::{Result, WmipfError};
