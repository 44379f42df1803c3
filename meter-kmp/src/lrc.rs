//! 8-bit longitudinal redundancy check used by KMP frames

/// LRC calculator
///
/// Sums every byte with 8-bit wraparound; the check value is the two's
/// complement of that sum, so a block followed by its own check sums to 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct LrcCalc {
    sum: u8,
}

impl LrcCalc {
    /// Create a new LRC calculator
    pub fn new() -> Self {
        Self { sum: 0 }
    }

    /// Reset the running sum
    pub fn reset(&mut self) {
        self.sum = 0;
    }

    /// Update the running sum with a single byte
    pub fn update(&mut self, data: u8) {
        self.sum = self.sum.wrapping_add(data);
    }

    /// Update the running sum with multiple bytes
    pub fn update_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Get the check value: `(sum ^ 0xFF) + 1`, wrapping
    pub fn value(&self) -> u8 {
        (self.sum ^ 0xFF).wrapping_add(1)
    }
}

/// Compute the KMP checksum of `data`
pub fn checksum(data: &[u8]) -> u8 {
    let mut calc = LrcCalc::new();
    calc.update_bytes(data);
    calc.value()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_commands() {
        assert_eq!(checksum(&[0xFE, 0x00]), 0x02);
        assert_eq!(checksum(&[0xFE, 0x01, 0x00, 0x01, 0x00, 0x2C]), 0xD4);
        assert_eq!(checksum(&[0xFE, 0x01, 0x03, 0x84, 0x03, 0x9B]), 0xDC);
        assert_eq!(checksum(&[0xFE, 0x90]), 0x72);
    }

    #[test]
    fn test_empty_and_wraparound() {
        assert_eq!(checksum(&[]), 0x00);
        assert_eq!(checksum(&[0x01]), 0xFF);
        assert_eq!(checksum(&[0xFF, 0x01]), 0x00);
    }

    #[test]
    fn test_block_with_own_check_sums_to_zero() {
        let data = [0xFE, 0x95, 0x01, 0x00, 0x00, 0x23, 0x48];
        let mut block = data.to_vec();
        block.push(checksum(&data));
        assert_eq!(checksum(&block), 0x00);
    }

    #[test]
    fn test_matches_formula() {
        let data: Vec<u8> = (0u8..=200).map(|i| i.wrapping_mul(37)).collect();
        let sum = data.iter().map(|&b| b as u32).sum::<u32>() % 256;
        let expected = ((sum as u8) ^ 0xFF).wrapping_add(1);
        assert_eq!(checksum(&data), expected);
    }

    #[test]
    fn test_single_bit_flip_changes_checksum() {
        let data: Vec<u8> = b"HFE9000002348000000000000DECD".to_vec();
        let reference = checksum(&data);
        for i in 0..data.len() {
            for bit in 0..8 {
                let mut flipped = data.clone();
                flipped[i] ^= 1 << bit;
                assert_ne!(checksum(&flipped), reference, "byte {} bit {}", i, bit);
            }
        }
    }

    #[test]
    fn test_reset() {
        let mut calc = LrcCalc::new();
        calc.update(0x42);
        calc.reset();
        assert_eq!(calc.value(), 0x00);
    }
}
