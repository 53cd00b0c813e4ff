//! Conversion between raw hashes and [`Difficulty`] values.
use crate::types::{Difficulty, MANTISSA_MIN};

/// Value returned for a hash made only of zero bytes.
pub const SATURATED: Difficulty = Difficulty::new(32, 0);

/// Decode a hash into its difficulty.
///
/// Each leading zero byte counts two zero nibbles. At the first nonzero byte the
/// mantissa is read at nibble granularity: 2.5 bytes when the byte's high nibble
/// is zero (adding one more zero nibble), otherwise two plain bytes.
///
/// Bytes past the end of `hash` read as zero, so short inputs never panic.
pub fn decode(hash: &[u8]) -> Difficulty {
    let byte_at = |i: usize| u32::from(hash.get(i).copied().unwrap_or(0));
    let mut leading_zeros = 0u32;

    for (i, &chr) in hash.iter().enumerate() {
        if chr == 0 {
            leading_zeros += 2;
            continue;
        }

        let chr = u32::from(chr);
        if chr < 16 {
            let mantissa = chr * 4096 + byte_at(i + 1) * 16 + byte_at(i + 2) / 16;
            return Difficulty::new(leading_zeros + 1, mantissa);
        }
        return Difficulty::new(leading_zeros, chr * 256 + byte_at(i + 1));
    }

    SATURATED
}

/// Halve a difficulty target, renormalizing the mantissa into its window.
pub fn halve(a: Difficulty) -> Difficulty {
    let quotient = a.mantissa / 2;
    if quotient < MANTISSA_MIN {
        Difficulty::new(a.leading_zeros.saturating_add(1), quotient * 16)
    } else {
        Difficulty::new(a.leading_zeros, quotient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MANTISSA_LIMIT;
    use rand::{Rng, SeedableRng};

    #[test]
    fn decode_reads_half_byte_mantissa() {
        let mut hash = [0u8; 32];
        hash[1] = 0x0A;
        hash[2] = 0x1B;
        hash[3] = 0x2C;
        let d = decode(&hash);
        assert_eq!(d.leading_zeros, 3);
        assert_eq!(d.mantissa, 0x0A * 4096 + 0x1B * 16 + 0x2C / 16);
    }

    #[test]
    fn decode_reads_two_byte_mantissa() {
        let mut hash = [0xFFu8; 32];
        hash[0] = 0;
        hash[1] = 0;
        hash[2] = 0xAB;
        hash[3] = 0xCD;
        let d = decode(&hash);
        assert_eq!(d, Difficulty::new(4, 0xABCD));
    }

    #[test]
    fn decode_without_leading_zeros() {
        let hash = [0x80u8, 0x01, 0x02, 0x03];
        assert_eq!(decode(&hash), Difficulty::new(0, 0x8001));
    }

    #[test]
    fn decode_all_zero_saturates() {
        assert_eq!(decode(&[0u8; 32]), SATURATED);
        assert_eq!(decode(&[]), SATURATED);
    }

    #[test]
    fn decode_tolerates_truncated_hash() {
        assert_eq!(decode(&[0x00, 0x05]), Difficulty::new(3, 5 * 4096));
    }

    #[test]
    fn decode_is_monotonic_within_leading_zero_class() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let mut a = [0u8; 32];
            rng.fill(&mut a[..]);
            a[0] = 0;
            a[1] = 0;
            a[2] = rng.gen_range(16..=255);
            let mut b = a;
            b[3] = b[3].saturating_add(rng.gen_range(0..=255));
            let (da, db) = (decode(&a), decode(&b));
            assert_eq!(da.leading_zeros, db.leading_zeros);
            assert!(da.mantissa <= db.mantissa);
            assert_eq!(da.mantissa, u32::from(a[2]) * 256 + u32::from(a[3]));
        }
    }

    #[test]
    fn halve_keeps_window() {
        assert_eq!(halve(Difficulty::new(4, 20000)), Difficulty::new(4, 10000));
        assert_eq!(halve(Difficulty::new(4, 8000)), Difficulty::new(5, 64000));
        assert_eq!(halve(Difficulty::new(4, 8193)), Difficulty::new(4, 4096));
    }

    #[test]
    fn halve_saturates_leading_zeros() {
        let d = halve(Difficulty::new(u32::MAX, 0));
        assert_eq!(d, Difficulty::new(u32::MAX, 0));
    }

    #[test]
    fn repeated_halving_never_leaves_window_and_never_eases() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let mut d = Difficulty::new(rng.gen_range(2..40), rng.gen_range(4096..65536));
            for _ in 0..64 {
                let next = halve(d);
                assert!(next.leading_zeros >= d.leading_zeros);
                assert!(next.mantissa < MANTISSA_LIMIT);
                assert!(next >= d);
                d = next;
            }
        }
    }
}
