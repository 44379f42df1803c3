//! "Kamstrup byte" nibble encoding
//!
//! A 4-bit value is carried as one ASCII character: `0x0..=0x9` map to
//! `'0'..='9'` (0x30..=0x39) and `0xA..=0xF` map to `'A'..='F'`
//! (0x41..=0x46), skipping the gap 0x3A..=0x40. Wider quantities are sent
//! high nibble first.

use meter_core::byte_ops;
use meter_core::{MeterError, MeterResult};

/// Encode a 4-bit value as a Kamstrup byte
///
/// `value` must be at most 0xF; larger values are a programming error.
pub fn encode_nibble(value: u8) -> u8 {
    debug_assert!(value <= 0x0F, "nibble out of range: 0x{:02X}", value);
    let value = value & 0x0F;
    value + if value < 10 { 0x30 } else { 0x37 }
}

/// Decode a Kamstrup byte into its 4-bit value
///
/// # Errors
///
/// Returns [`MeterError::MalformedFrame`] for bytes outside
/// `0x30..=0x39` and `0x41..=0x46`.
pub fn decode_nibble(byte: u8) -> MeterResult<u8> {
    match byte {
        0x30..=0x39 => Ok(byte - 0x30),
        0x41..=0x46 => Ok(byte - 0x37),
        _ => Err(MeterError::MalformedFrame(format!(
            "Invalid Kamstrup byte 0x{:02X}",
            byte
        ))),
    }
}

/// Encode one byte as two Kamstrup bytes
pub fn encode_pair(value: u8) -> [u8; 2] {
    [encode_nibble(value >> 4), encode_nibble(value & 0x0F)]
}

/// Decode two Kamstrup bytes into one byte
pub fn decode_pair(pair: &[u8]) -> MeterResult<u8> {
    match pair {
        [high, low] => Ok(decode_nibble(*high)? << 4 | decode_nibble(*low)?),
        _ => Err(MeterError::MalformedFrame(format!(
            "Expected 2 Kamstrup bytes, got {}",
            pair.len()
        ))),
    }
}

/// Encode a 16-bit value as four Kamstrup bytes
pub fn encode_quad(value: u16) -> [u8; 4] {
    let mut quad = [0u8; 4];
    encode_digits(value as u32, &mut quad);
    quad
}

/// Decode four Kamstrup bytes into a 16-bit value
pub fn decode_quad(quad: &[u8]) -> MeterResult<u16> {
    Ok(decode_digits(quad, 4)? as u16)
}

/// Encode a 32-bit value as eight Kamstrup bytes
pub fn encode_oct(value: u32) -> [u8; 8] {
    let mut oct = [0u8; 8];
    encode_digits(value, &mut oct);
    oct
}

/// Decode eight Kamstrup bytes into a 32-bit value
pub fn decode_oct(oct: &[u8]) -> MeterResult<u32> {
    decode_digits(oct, 8)
}

fn encode_digits(value: u32, out: &mut [u8]) {
    let width = out.len();
    for (i, digit) in out.iter_mut().enumerate() {
        let shift = 4 * (width - 1 - i);
        *digit = encode_nibble(((value >> shift) & 0x0F) as u8);
    }
}

fn decode_digits(digits: &[u8], width: usize) -> MeterResult<u32> {
    if digits.len() != width {
        return Err(MeterError::MalformedFrame(format!(
            "Expected {} Kamstrup bytes, got {}",
            width,
            digits.len()
        )));
    }
    digits
        .iter()
        .try_fold(0u32, |acc, &digit| -> MeterResult<u32> {
            Ok(acc << 4 | decode_nibble(digit)? as u32)
        })
}

/// Expand every byte of `data` into two Kamstrup bytes, high nibble first
pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    data.iter().flat_map(|&byte| encode_pair(byte)).collect()
}

/// Collapse Kamstrup byte pairs back into bytes
///
/// # Errors
///
/// Returns [`MeterError::MalformedFrame`] for odd-length input or any byte
/// outside the Kamstrup alphabet.
pub fn decode_bytes(encoded: &[u8]) -> MeterResult<Vec<u8>> {
    if byte_ops::is_odd_length(encoded) {
        return Err(MeterError::MalformedFrame(format!(
            "Odd number of Kamstrup bytes: {}",
            encoded.len()
        )));
    }
    encoded.chunks_exact(2).map(decode_pair).collect()
}
