//! Transport layer module for electricity meter protocols
//!
//! This crate provides the request/response connection capability the
//! protocol codecs consume, a serial port implementation of it, and a
//! scripted virtual meter for offline work.

pub mod scripted;
pub mod serial;
pub mod stream;

pub use meter_core::{MeterError, MeterResult, TransportError};
pub use scripted::ScriptedConnection;
pub use serial::{SerialConnection, SerialSettings, CR, LF};
pub use stream::MeterConnection;
