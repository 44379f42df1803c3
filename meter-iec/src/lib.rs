//! IEC 62056-21 (formerly IEC 1107) data readout
//!
//! After the wake-up request `/?!` the meter answers with an identification
//! line and then sends its data block:
//!
//! ```text
//! /KAM5685-382-OK-10      identification
//! <STX>
//! 0.0(12345678)           customer number
//! 1.20(0009032*kWh)       energy register
//! ...
//! 1.6*1(000002,8)!        last line, marked by '!'
//! <ETX><BCC>
//! ```
//!
//! The block check character covers every data line plus the ETX byte.

pub mod block_check;
pub mod frame_reader;
pub mod identification;
pub mod line_parser;
pub mod protocol;

pub use block_check::BlockCheck;
pub use frame_reader::{IecFrameReader, IecTelegram, ReaderState, ETX, STX, WAKE_UP};
pub use identification::Identification;
pub use line_parser::DataLine;
pub use meter_core::{MeterError, MeterResult};
pub use protocol::IecProtocol;
