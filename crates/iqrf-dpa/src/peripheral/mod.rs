// crates/iqrf-dpa/src/peripheral/mod.rs
//! Typed tasks for the embedded DPA peripherals.
//!
//! A task pairs a request builder with a parser for the matching response.
//! Tasks know nothing about transport or timing; the application submits
//! `task.request()` through the engine and feeds the captured response back
//! into `task.parse_response()`.

pub mod frc;
pub mod led;
pub mod os;
pub mod raw;
pub mod thermometer;

pub use frc::{Frc, FrcCommand, FrcDataType};
pub use led::{Led, LedColour, LedCommand};
pub use os::{ModuleInfo, OsRead, OsReset, OsRestart, OsSleep};
pub use raw::Raw;
pub use thermometer::{Temperature, Thermometer};

use crate::channel::DpaError;
use crate::frame::DpaFrame;

/// One peripheral operation: a request and the knowledge to digest its
/// response.
pub trait DpaTask {
    /// Builds the request frame this task submits.
    fn request(&self) -> Result<DpaFrame, DpaError>;

    /// Task-specific timeout in milliseconds; negative selects the engine
    /// default.
    fn timeout_ms(&self) -> i32 {
        -1
    }

    /// Digests the response captured by the transaction.
    fn parse_response(&mut self, response: &DpaFrame) -> Result<(), DpaError>;
}
