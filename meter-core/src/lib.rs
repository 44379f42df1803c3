//! Core types and utilities for electricity meter protocols
//!
//! This crate provides the error taxonomy, byte-slice helpers and the
//! register/registration types shared by the KMP and IEC 62056-21 codecs.

pub mod byte_ops;
pub mod error;
pub mod protocol;
pub mod registration;

pub use error::{MeterError, MeterResult, TransportError};
pub use protocol::MeterProtocol;
pub use registration::{RegisterValue, RegistrationSet};
