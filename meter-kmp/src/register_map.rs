//! KMP fetch commands and the layout of their responses
//!
//! Each [`FetchCommandSpec`] pairs the fixed bytes of one request with the
//! fields found in its response. Field offsets index the nibble-encoded
//! response body, i.e. the ASCII span between the magic byte and the
//! checksum, because register values are read straight from those hex
//! digits.

use crate::frame::{build_request, KmpFrame, RESPONSE_MAGIC};
use crate::nibble::decode_bytes;
use log::{debug, warn};
use meter_core::byte_ops;
use meter_core::{MeterError, MeterResult, RegistrationSet};
use meter_transport::MeterConnection;

/// Byte order of a field inside the encoded body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLayout {
    /// Digits are read as sent, most significant first
    Forward,
    /// Two-digit groups arrive least significant first and are put back in
    /// order with [`byte_ops::reverse_in_pairs`]
    ReversedPairs,
}

/// How the digits of a field are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    /// Base-16 unsigned integer of up to 32 bits, rendered in decimal
    Hex,
    /// Nibble-decoded ASCII text
    Text,
}

/// Location and format of one register inside a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub length: usize,
    pub layout: FieldLayout,
    pub format: FieldFormat,
}

impl FieldSpec {
    pub const fn hex(name: &'static str, offset: usize, length: usize) -> Self {
        Self {
            name,
            offset,
            length,
            layout: FieldLayout::Forward,
            format: FieldFormat::Hex,
        }
    }

    pub const fn hex_reversed(name: &'static str, offset: usize, length: usize) -> Self {
        Self {
            name,
            offset,
            length,
            layout: FieldLayout::ReversedPairs,
            format: FieldFormat::Hex,
        }
    }

    pub const fn text(name: &'static str, offset: usize, length: usize) -> Self {
        Self {
            name,
            offset,
            length,
            layout: FieldLayout::Forward,
            format: FieldFormat::Text,
        }
    }

    /// Extract this field from an encoded response body
    ///
    /// # Errors
    ///
    /// Returns [`MeterError::MalformedFrame`] if the body is too short or the
    /// digits do not form a valid value.
    pub fn decode(&self, encoded_body: &[u8]) -> MeterResult<String> {
        let digits = byte_ops::subset(encoded_body, self.offset, Some(self.length))
            .map_err(|e| self.malformed(e))?;

        let digits = match self.layout {
            FieldLayout::Forward => digits.to_vec(),
            FieldLayout::ReversedPairs => {
                byte_ops::reverse_in_pairs(digits).map_err(|e| self.malformed(e))?
            }
        };

        match self.format {
            FieldFormat::Hex => {
                if !digits.iter().all(u8::is_ascii_hexdigit) {
                    return Err(self.malformed(format!(
                        "not a hex number: {:?}",
                        String::from_utf8_lossy(&digits)
                    )));
                }
                let text = String::from_utf8_lossy(&digits);
                let value = u32::from_str_radix(&text, 16).map_err(|e| self.malformed(e))?;
                Ok(value.to_string())
            }
            FieldFormat::Text => {
                String::from_utf8(decode_bytes(&digits)?).map_err(|e| self.malformed(e))
            }
        }
    }

    fn malformed(&self, reason: impl std::fmt::Display) -> MeterError {
        MeterError::MalformedFrame(format!("Field {}: {}", self.name, reason))
    }
}

/// A named request and the fields of its response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchCommandSpec {
    pub name: &'static str,
    /// Request bytes, magic byte first, before nibble encoding
    pub request: &'static [u8],
    pub fields: &'static [FieldSpec],
}

impl FetchCommandSpec {
    /// Send the request and decode the validated response
    ///
    /// # Errors
    ///
    /// Fails on transport errors, malformed responses and checksum
    /// mismatches; no field is decoded before the checksum passed.
    pub fn execute<C: MeterConnection + ?Sized>(&self, connection: &mut C) -> MeterResult<RegistrationSet> {
        let frame = self.exchange(connection)?;
        self.decode(&frame)
    }

    /// Send the request and return the validated response frame
    pub fn exchange<C: MeterConnection + ?Sized>(&self, connection: &mut C) -> MeterResult<KmpFrame> {
        debug!("Sending KMP {} request", self.name);
        let response = connection.send_command(&build_request(self.request)?)?;

        let frame = KmpFrame::parse_response(&response)?;
        if frame.magic() != RESPONSE_MAGIC {
            warn!(
                "KMP {} response has magic byte 0x{:02X}, expected 0x{:02X}",
                self.name,
                frame.magic(),
                RESPONSE_MAGIC
            );
        }
        frame.validate()?;
        Ok(frame)
    }

    /// Decode every field of a validated response frame
    pub fn decode(&self, frame: &KmpFrame) -> MeterResult<RegistrationSet> {
        let mut result = RegistrationSet::new();
        for field in self.fields {
            result.insert(field.name, field.decode(frame.encoded_body())?);
        }
        Ok(result)
    }
}

/// Handshake request, answered with the meter's channel address
pub const HELLO: &[u8] = &[0x40, 0xFE, 0x00];

/// Meter type and identification numbers
pub const IDENTIFICATION: FetchCommandSpec = FetchCommandSpec {
    name: "IDENTIFICATION",
    // The last byte is the response size; 0x0A covers the meter type only
    request: &[0x40, 0xFE, 0x01, 0x00, 0x01, 0x00, 0x2C],
    fields: &[
        FieldSpec::text("METER_TYPE", 4, 20),
        FieldSpec::hex_reversed("METER_ID", 62, 8),
        FieldSpec::hex_reversed("CUSTOMER_NO", 70, 8),
    ],
};

/// Secondary identification block; validated, no fields known yet
pub const SECONDARY_IDENTIFICATION: FetchCommandSpec = FetchCommandSpec {
    name: "SECONDARY_IDENTIFICATION",
    request: &[0x40, 0xFE, 0x01, 0x03, 0x84, 0x03, 0x9B],
    fields: &[],
};

/// Energy, power and operating hours
pub const ENERGY: FetchCommandSpec = FetchCommandSpec {
    name: "ENERGY",
    request: &[0x40, 0xFE, 0x90, 0x72],
    fields: &[
        FieldSpec::hex("TOTAL_ENERGY", 4, 8),
        FieldSpec::hex("ENERGY_LOAD_WH", 12, 8),
        FieldSpec::hex("OPERATING_HOURS", 20, 8),
        FieldSpec::hex("RESET_COUNTER", 28, 8),
        FieldSpec::hex("PEAK_POWER", 36, 8),
        FieldSpec::hex("CUSTOMER_NO_2", 44, 8),
        FieldSpec::hex("PRODUCTION_NO", 68, 8),
    ],
};

/// Energy split by tariff
pub const TARIFF_ENERGY: FetchCommandSpec = FetchCommandSpec {
    name: "TARIFF_ENERGY",
    request: &[0x40, 0xFE, 0x95, 0x00, 0x6D],
    fields: &[
        FieldSpec::hex("ENERGY_TOTAL2", 6, 8),
        FieldSpec::hex("ENERGY_TARIF1", 14, 8),
        FieldSpec::hex("ENERGY_TARIF2", 22, 8),
    ],
};

/// Commands whose results make up the registrations, in merge order
pub const REGISTRATION_COMMANDS: &[&FetchCommandSpec] = &[&IDENTIFICATION, &ENERGY, &TARIFF_ENERGY];

#[cfg(test)]
pub(crate) mod fixtures {
    //! Responses captured from a Kamstrup 685-382-OK-10

    pub const IDENTIFICATION_RESPONSE: &[u8] =
        b"HFE013638353338324F4B31300000004000931000E8030000000000000000FE40E2010078CAA5000000FFFFFFFF00F4";

    pub const SECONDARY_IDENTIFICATION_RESPONSE: &[u8] =
        b"HFE01FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF19";

    pub const ENERGY_RESPONSE: &[u8] =
        b"HFE9000002348000000000000DECD000DC8410000061700A5CA780000000000000000100010938F";

    pub const TARIFF_RESPONSE: &[u8] = b"HFE950100002348000023470000000196";
}
