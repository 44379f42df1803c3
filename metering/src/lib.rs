//! metering - electricity meter readout over a serial link
//!
//! # Architecture
//!
//! - `meter-core`: register types, byte helpers and error handling
//! - `meter-transport`: serial and scripted meter connections
//! - `meter-kmp`: Kamstrup Meter Protocol codec and register map
//! - `meter-iec`: IEC 62056-21 readout
//!
//! # Usage
//!
//! ```no_run
//! use metering::{MeterProtocol, ProtocolKind, SerialConnection};
//!
//! let kind = ProtocolKind::Kmp;
//! let connection = SerialConnection::new(kind.settings("/dev/ttyUSB0"));
//! let mut protocol = kind.protocol(connection);
//! for register in &protocol.all_registrations()? {
//!     println!("{register}");
//! }
//! # Ok::<(), metering::MeterError>(())
//! ```

use std::fmt;

pub use meter_core::{
    MeterError, MeterProtocol, MeterResult, RegisterValue, RegistrationSet, TransportError,
};
pub use meter_transport::{MeterConnection, ScriptedConnection, SerialConnection, SerialSettings};

pub mod kmp {
    pub use meter_kmp::*;
}

pub mod iec {
    pub use meter_iec::*;
}

/// Supported wire protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    Kmp,
    Iec,
}

impl ProtocolKind {
    /// Serial settings the protocol expects on `port_name`
    pub fn settings(&self, port_name: &str) -> SerialSettings {
        match self {
            ProtocolKind::Kmp => SerialSettings::kmp(port_name),
            ProtocolKind::Iec => SerialSettings::iec(port_name),
        }
    }

    /// Create the protocol driver on top of `connection`
    pub fn protocol<'a, C>(&self, connection: C) -> Box<dyn MeterProtocol + 'a>
    where
        C: MeterConnection + 'a,
    {
        match self {
            ProtocolKind::Kmp => Box::new(kmp::KmpProtocol::new(connection)),
            ProtocolKind::Iec => Box::new(iec::IecProtocol::new(connection)),
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolKind::Kmp => write!(f, "KMP"),
            ProtocolKind::Iec => write!(f, "IEC"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_presets() {
        let kmp = ProtocolKind::Kmp.settings("/dev/ttyUSB0");
        assert_eq!(kmp.baud_rate, 1200);
        assert_eq!(kmp.line_terminator, 0x0D);

        let iec = ProtocolKind::Iec.settings("/dev/ttyUSB0");
        assert_eq!(iec.baud_rate, 300);
        assert_eq!(iec.line_terminator, 0x0A);
    }

    #[test]
    fn test_protocol_names() {
        for kind in [ProtocolKind::Kmp, ProtocolKind::Iec] {
            let protocol = kind.protocol(ScriptedConnection::new());
            assert_eq!(protocol.name(), kind.to_string());
        }
    }

    #[test]
    fn test_iec_readout_through_facade() {
        let mut connection = ScriptedConnection::new()
            .with_line("/KAM5685-382-OK-10")
            .with_lines(["F.F(00)", "C.1(12345678)", "!"])
            .with_bytes(&[iec::STX, iec::ETX, 0x44]);

        let registrations = ProtocolKind::Iec
            .protocol(&mut connection)
            .all_registrations()
            .unwrap();
        assert_eq!(registrations.get("C.1"), Some("12345678"));
        assert!(connection.is_exhausted());
    }

    #[test]
    fn test_errors_surface_through_facade() {
        let mut protocol = ProtocolKind::Kmp.protocol(ScriptedConnection::new());
        assert!(matches!(
            protocol.all_registrations(),
            Err(MeterError::Transport(TransportError::Timeout))
        ));
    }
}
