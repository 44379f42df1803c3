//! Byte-slice helpers shared by the protocol codecs
//!
//! All functions are pure. Range violations are reported as
//! [`MeterError::Range`] instead of panicking.

use crate::error::{MeterError, MeterResult};

/// Check whether two byte sequences have the same length and content
pub fn equals(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// Get `data[start..start + length]`, or `data[start..]` when `length` is `None`
///
/// # Errors
///
/// Returns [`MeterError::Range`] if the requested span exceeds `data`.
pub fn subset(data: &[u8], start: usize, length: Option<usize>) -> MeterResult<&[u8]> {
    let end = match length {
        Some(length) => start.checked_add(length).ok_or_else(|| {
            MeterError::Range(format!("Subset {}+{} overflows", start, length))
        })?,
        None => data.len(),
    };

    if start > end || end > data.len() {
        return Err(MeterError::Range(format!(
            "Subset {}..{} out of range for {} bytes",
            start,
            end,
            data.len()
        )));
    }

    Ok(&data[start..end])
}

/// Concatenate `first` and every slice of `rest`, in argument order
pub fn merge(first: &[u8], rest: &[&[u8]]) -> Vec<u8> {
    let total = first.len() + rest.iter().map(|part| part.len()).sum::<usize>();
    let mut merged = Vec::with_capacity(total);
    merged.extend_from_slice(first);
    for part in rest {
        merged.extend_from_slice(part);
    }
    merged
}

/// Reverse the order of the two-byte pairs in `data`
///
/// The pair starting at input offset `i` lands at output offset
/// `len - i - 2`; the two bytes inside a pair keep their order. Applied to a
/// hex-ASCII rendering of a little-endian integer this yields the big-endian
/// digit string, e.g. `"40E20100"` becomes `"0001E240"`.
///
/// # Errors
///
/// Returns [`MeterError::Range`] if `data` has odd length.
pub fn reverse_in_pairs(data: &[u8]) -> MeterResult<Vec<u8>> {
    if is_odd_length(data) {
        return Err(MeterError::Range(format!(
            "Cannot reverse {} bytes in pairs",
            data.len()
        )));
    }

    Ok(data.chunks_exact(2).rev().flatten().copied().collect())
}

pub fn is_odd_length(data: &[u8]) -> bool {
    data.len() & 1 == 1
}

pub fn is_even_length(data: &[u8]) -> bool {
    data.len() & 1 == 0
}
