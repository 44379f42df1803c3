//! Kamstrup Meter Protocol (KMP)
//!
//! KMP is logically binary but travels as ASCII. Every frame starts with one
//! raw magic byte (`@` for requests, `H` for responses); every following
//! logical byte, the trailing 8-bit checksum included, is sent as two
//! "Kamstrup bytes" holding its high and low nibble as `0`-`9`/`A`-`F`.
//!
//! ```text
//! 40 46 45 39 30 37 32 30 30   "@ FE 90 72 00"
//!  |  |     |     |     |
//!  |  |     |     |     |_ checksum 0x00
//!  |  |     |     |_______ payload byte 0x72
//!  |  |     |_____________ payload byte 0x90
//!  |  |___________________ payload byte 0xFE (channel)
//!  |______________________ magic byte, sent raw
//! ```

pub mod frame;
pub mod lrc;
pub mod nibble;
pub mod protocol;
pub mod register_map;

pub use frame::{KmpFrame, REQUEST_MAGIC, RESPONSE_MAGIC};
pub use lrc::{checksum, LrcCalc};
pub use meter_core::{MeterError, MeterResult};
pub use protocol::KmpProtocol;
pub use register_map::{FetchCommandSpec, FieldFormat, FieldLayout, FieldSpec};
