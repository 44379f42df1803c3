//! KMP frame encoding/decoding

use crate::lrc::checksum;
use crate::nibble::{decode_bytes, decode_pair, encode_bytes, encode_pair};
use log::info;
use meter_core::byte_ops;
use meter_core::{MeterError, MeterResult};

/// Length of the raw magic byte
pub const MAGIC_LENGTH: usize = 1;
/// Length of the nibble-encoded checksum
pub const CHECKSUM_LENGTH: usize = 2;

/// Magic byte of requests sent to the meter (`@`)
pub const REQUEST_MAGIC: u8 = 0x40;
/// Magic byte of responses sent by the meter (`H`)
pub const RESPONSE_MAGIC: u8 = 0x48;

/// Build the wire form of a request
///
/// `command[0]` is the magic byte and is sent raw; the remaining bytes and
/// their checksum are nibble-encoded.
///
/// # Errors
///
/// Returns [`MeterError::MalformedFrame`] if `command` is empty.
pub fn build_request(command: &[u8]) -> MeterResult<Vec<u8>> {
    let (magic, payload) = command
        .split_first()
        .ok_or_else(|| MeterError::MalformedFrame("Empty KMP command".to_string()))?;

    Ok(byte_ops::merge(
        &[*magic],
        &[&encode_bytes(payload), &encode_pair(checksum(payload))],
    ))
}

/// Verify that `declared` is the checksum of the decoded `body`
///
/// # Errors
///
/// Returns [`MeterError::ChecksumMismatch`] carrying the recomputed and the
/// declared value.
pub fn validate(body: &[u8], declared: u8) -> MeterResult<()> {
    let calculated = checksum(body);
    if calculated != declared {
        return Err(MeterError::ChecksumMismatch {
            expected: calculated,
            actual: declared,
        });
    }
    info!("Checksum validated: 0x{:02X}", calculated);
    Ok(())
}

/// A decoded KMP response frame
///
/// The body is kept both as received (nibble-encoded ASCII, which is what
/// register fields are sliced from) and decoded (which is what the
/// checksum covers). Nothing in a frame is trusted before [`validate`]
/// passes.
///
/// [`validate`]: KmpFrame::validate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmpFrame {
    magic: u8,
    encoded_body: Vec<u8>,
    body: Vec<u8>,
    checksum: u8,
}

impl KmpFrame {
    /// Split a response line into magic byte, body and declared checksum
    ///
    /// # Errors
    ///
    /// Returns [`MeterError::MalformedFrame`] if the line is too short, has
    /// an odd-length body, or contains bytes outside the Kamstrup alphabet.
    pub fn parse_response(wire: &[u8]) -> MeterResult<Self> {
        if wire.len() < MAGIC_LENGTH + CHECKSUM_LENGTH {
            return Err(MeterError::MalformedFrame(format!(
                "KMP frame too short: {} bytes",
                wire.len()
            )));
        }
        if byte_ops::is_even_length(wire) {
            return Err(MeterError::MalformedFrame(format!(
                "KMP frame must have odd length, got {} bytes",
                wire.len()
            )));
        }

        let body_length = wire.len() - MAGIC_LENGTH - CHECKSUM_LENGTH;
        let encoded_body = byte_ops::subset(wire, MAGIC_LENGTH, Some(body_length))?;
        let encoded_checksum = byte_ops::subset(wire, MAGIC_LENGTH + body_length, None)?;

        Ok(Self {
            magic: wire[0],
            body: decode_bytes(encoded_body)?,
            encoded_body: encoded_body.to_vec(),
            checksum: decode_pair(encoded_checksum)?,
        })
    }

    /// Recompute the body checksum and compare it with the declared one
    pub fn validate(&self) -> MeterResult<()> {
        validate(&self.body, self.checksum)
    }

    /// Get the raw magic byte
    pub fn magic(&self) -> u8 {
        self.magic
    }

    /// Get the decoded body
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Get the body as received, two Kamstrup bytes per logical byte
    pub fn encoded_body(&self) -> &[u8] {
        &self.encoded_body
    }

    /// Get the checksum declared by the sender
    pub fn checksum(&self) -> u8 {
        self.checksum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Captured reply to the tariff request `@FE95006D`
    const TARIFF_RESPONSE: &[u8] = b"HFE950100002348000023470000000196";

    #[test]
    fn test_build_hello_request() {
        let wire = build_request(&[0x40, 0xFE, 0x00]).unwrap();
        assert_eq!(wire, vec![0x40, 0x46, 0x45, 0x30, 0x30, 0x30, 0x32]);
        assert_eq!(wire, b"@FE0002".to_vec());
    }

    #[test]
    fn test_build_fetch_requests() {
        assert_eq!(
            build_request(&[0x40, 0xFE, 0x01, 0x00, 0x01, 0x00, 0x2C]).unwrap(),
            b"@FE010001002CD4".to_vec()
        );
        assert_eq!(build_request(&[0x40, 0xFE, 0x90, 0x72]).unwrap(), b"@FE907200".to_vec());
    }

    #[test]
    fn test_build_empty_request() {
        assert!(matches!(build_request(&[]), Err(MeterError::MalformedFrame(_))));
        assert_eq!(build_request(&[0x40]).unwrap(), b"@00".to_vec());
    }

    #[test]
    fn test_parse_response() {
        let frame = KmpFrame::parse_response(TARIFF_RESPONSE).unwrap();
        assert_eq!(frame.magic(), RESPONSE_MAGIC);
        assert_eq!(frame.checksum(), 0x96);
        assert_eq!(
            frame.body(),
            &[0xFE, 0x95, 0x01, 0x00, 0x00, 0x23, 0x48, 0x00, 0x00, 0x23, 0x47, 0x00, 0x00, 0x00, 0x01]
        );
        assert_eq!(frame.encoded_body(), b"FE9501000023480000234700000001");
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_corrupted_body_fails_validation() {
        let mut wire = TARIFF_RESPONSE.to_vec();
        wire[10] = b'9';
        let frame = KmpFrame::parse_response(&wire).unwrap();
        match frame.validate() {
            Err(MeterError::ChecksumMismatch { expected, actual }) => {
                assert_eq!(actual, 0x96);
                assert_ne!(expected, actual);
            }
            other => panic!("expected checksum mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_validate() {
        assert!(validate(&[0xFE, 0x00], 0x02).is_ok());
        assert!(matches!(
            validate(&[0xFE, 0x00], 0x03),
            Err(MeterError::ChecksumMismatch { expected: 0x02, actual: 0x03 })
        ));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(KmpFrame::parse_response(b"H0"), Err(MeterError::MalformedFrame(_))));
        assert!(matches!(KmpFrame::parse_response(b"HFE0"), Err(MeterError::MalformedFrame(_))));
        assert!(matches!(KmpFrame::parse_response(b"HFG0002"), Err(MeterError::MalformedFrame(_))));
        assert!(matches!(KmpFrame::parse_response(b"HFE00xx"), Err(MeterError::MalformedFrame(_))));
    }

    #[test]
    fn test_parse_empty_body() {
        let frame = KmpFrame::parse_response(b"H00").unwrap();
        assert!(frame.body().is_empty());
        assert!(frame.validate().is_ok());
    }
}
