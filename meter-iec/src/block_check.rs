//! Additive block check used by the IEC readout

/// Value added to the block check for the end of every data line
pub const LINE_TERMINATOR_VALUE: u8 = 0x0A;

/// Mask keeping the 7 least significant bits
const BLOCK_CHECK_MASK: u32 = 0x7F;

/// Running block check over a readout
///
/// Sums every character of every data line, one [`LINE_TERMINATOR_VALUE`]
/// per line, and the closing ETX; the check value is that sum masked to
/// 7 bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCheck {
    sum: u32,
}

impl BlockCheck {
    pub fn new() -> Self {
        Self { sum: 0 }
    }

    pub fn reset(&mut self) {
        self.sum = 0;
    }

    /// Add a single byte
    pub fn update(&mut self, data: u8) {
        self.sum = self.sum.wrapping_add(data as u32);
    }

    /// Add a data line (without its terminator) and one terminator value
    pub fn update_line(&mut self, line: &str) {
        for byte in line.bytes() {
            self.update(byte);
        }
        self.update(LINE_TERMINATOR_VALUE);
    }

    /// Get the 7-bit check value
    pub fn value(&self) -> u8 {
        (self.sum & BLOCK_CHECK_MASK) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_includes_terminator() {
        let mut check = BlockCheck::new();
        check.update_line("!");
        assert_eq!(check.value(), (b'!' + LINE_TERMINATOR_VALUE) & 0x7F);
    }

    #[test]
    fn test_masked_to_seven_bits() {
        let mut check = BlockCheck::new();
        check.update(0xFF);
        check.update(0x03);
        assert_eq!(check.value(), 0x02);
    }

    #[test]
    fn test_reset() {
        let mut check = BlockCheck::new();
        check.update_line("0.0(12345678)");
        check.reset();
        assert_eq!(check, BlockCheck::new());
    }
}
