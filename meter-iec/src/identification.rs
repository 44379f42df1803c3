//! Identification line sent by the meter after the wake-up request

use log::debug;
use meter_core::{MeterError, MeterResult};

/// Identification of an IEC 62056-21 meter
///
/// The line is shaped `/XXXZModel` where `XXX` is the manufacturer code and
/// `Z` the baud rate identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    pub manufacturer: String,
    pub baud_id: char,
    pub model: String,
}

impl Identification {
    /// Parse an identification line such as `/KAM5685-382-OK-10`
    pub fn parse(line: &str) -> MeterResult<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if !line.starts_with('/') {
            return Err(MeterError::MalformedFrame(format!(
                "identification line must start with '/': {line:?}"
            )));
        }

        let malformed =
            || MeterError::MalformedFrame(format!("identification line too short: {line:?}"));
        let manufacturer = line.get(1..4).ok_or_else(malformed)?;
        let baud_id = line.get(4..5).and_then(|id| id.chars().next()).ok_or_else(malformed)?;
        let model = line.get(5..).ok_or_else(malformed)?;

        debug!("Parsed identification - manufacturer: {manufacturer}, model: {model}");

        Ok(Self {
            manufacturer: manufacturer.to_string(),
            baud_id,
            model: model.to_string(),
        })
    }

    /// Baud rate advertised for protocol mode C, if the identifier is known
    pub fn baud_rate(&self) -> Option<u32> {
        match self.baud_id {
            '0' => Some(300),
            '1' => Some(600),
            '2' => Some(1200),
            '3' => Some(2400),
            '4' => Some(4800),
            '5' => Some(9600),
            '6' => Some(19200),
            _ => None,
        }
    }
}
