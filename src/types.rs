use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Lower bound of the normalized mantissa window.
pub const MANTISSA_MIN: u32 = 4096;
/// Exclusive upper bound of the normalized mantissa window.
pub const MANTISSA_LIMIT: u32 = 65536;
/// Hardest leading-zero count a retarget may produce.
pub const MAX_LEADING_ZEROS: u32 = 62;
/// Easiest leading-zero count a retarget may produce.
pub const MIN_LEADING_ZEROS: u32 = 2;

/// Nibble-granular difficulty target.
///
/// `leading_zeros` acts as the exponent and `mantissa` as the fraction. More
/// leading zeros is harder; with equal leading zeros a smaller mantissa is harder.
///
/// `Ord` follows hardness: `a > b` means `a` is the stricter target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Difficulty {
    pub leading_zeros: u32,
    pub mantissa: u32,
}

impl Difficulty {
    pub const fn new(leading_zeros: u32, mantissa: u32) -> Self {
        Self {
            leading_zeros,
            mantissa,
        }
    }

    /// Hardest value a retarget can produce.
    pub const HARDEST: Difficulty = Difficulty::new(MAX_LEADING_ZEROS, MANTISSA_MIN);
    /// Easiest value a retarget can produce.
    pub const EASIEST: Difficulty = Difficulty::new(MIN_LEADING_ZEROS, MANTISSA_LIMIT - 1);

    /// Whether `self` is a strictly easier target than `other`.
    pub fn is_easier_than(&self, other: &Difficulty) -> bool {
        *self < *other
    }

    /// Whether a hash with this difficulty satisfies `target`.
    ///
    /// The hash must have more leading zeros than the target, or the same number
    /// and a strictly smaller mantissa.
    pub fn meets(&self, target: &Difficulty) -> bool {
        *self > *target
    }
}

impl Ord for Difficulty {
    fn cmp(&self, other: &Self) -> Ordering {
        self.leading_zeros
            .cmp(&other.leading_zeros)
            .then_with(|| other.mantissa.cmp(&self.mantissa))
    }
}

impl PartialOrd for Difficulty {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn more_leading_zeros_is_harder() {
        let easy = Difficulty::new(5, 5000);
        let hard = Difficulty::new(10, 60000);
        assert!(easy.is_easier_than(&hard));
        assert!(hard > easy);
    }

    #[test]
    fn smaller_mantissa_is_harder_at_equal_zeros() {
        let easy = Difficulty::new(8, 40000);
        let hard = Difficulty::new(8, 5000);
        assert!(easy.is_easier_than(&hard));
        assert!(!hard.is_easier_than(&easy));
    }

    #[test]
    fn meets_requires_strictly_harder_hash() {
        let target = Difficulty::new(8, 20000);
        assert!(Difficulty::new(9, 65000).meets(&target));
        assert!(Difficulty::new(8, 19999).meets(&target));
        assert!(!Difficulty::new(8, 20000).meets(&target));
        assert!(!Difficulty::new(7, 4096).meets(&target));
    }
}
