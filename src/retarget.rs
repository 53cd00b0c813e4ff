//! Epoch-boundary difficulty adjustment.
use crate::types::{Difficulty, MANTISSA_LIMIT, MAX_LEADING_ZEROS, MIN_LEADING_ZEROS};
use serde::{Deserialize, Serialize};

/// Ratio applied to a mantissa at an epoch boundary, kept unreduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub numerator: u64,
    pub denominator: u64,
}

impl Adjustment {
    /// Maximum tightening: the target shrinks to a quarter.
    pub const TIGHTEST: Adjustment = Adjustment {
        numerator: 1,
        denominator: 4,
    };
    /// Maximum loosening: the target grows fourfold.
    pub const LOOSEST: Adjustment = Adjustment {
        numerator: 4,
        denominator: 1,
    };
}

/// Ratio of the observed epoch duration to the target duration.
///
/// Clamps to `1/4` when `epoch_target / total` is at least four with a nonzero
/// remainder, and to `4/1` for the mirror case. Exact multiples are returned
/// unclamped, whatever their size. An elapsed time of zero is treated as
/// maximal tightening and a zero target as maximal loosening.
pub fn adjustment_ratio(total_epoch_time: u64, epoch_target: u64) -> Adjustment {
    if total_epoch_time == 0 {
        return Adjustment::TIGHTEST;
    }
    if epoch_target == 0 {
        return Adjustment::LOOSEST;
    }

    if epoch_target / total_epoch_time >= 4 && epoch_target % total_epoch_time > 0 {
        return Adjustment::TIGHTEST;
    }
    if total_epoch_time / epoch_target >= 4 && total_epoch_time % epoch_target > 0 {
        return Adjustment::LOOSEST;
    }
    Adjustment {
        numerator: total_epoch_time,
        denominator: epoch_target,
    }
}

/// Scale `a` by `numerator / denominator`, moving at most one nibble of exponent.
///
/// The mantissa is padded by one nibble before the integer division so that a
/// value dropping below the window keeps its sub-nibble precision. The result is
/// clamped to [`Difficulty::HARDEST`] and [`Difficulty::EASIEST`] at the edges.
/// A zero denominator is treated as one.
pub fn retarget(a: Difficulty, numerator: u64, denominator: u64) -> Difficulty {
    let limit = u128::from(MANTISSA_LIMIT);
    let padded = u128::from(a.mantissa) * 16 * u128::from(numerator)
        / u128::from(denominator.max(1));
    let unpadded = padded / 16;

    if padded / limit == 0 {
        if a.leading_zeros >= MAX_LEADING_ZEROS {
            return Difficulty::HARDEST;
        }
        return Difficulty::new(a.leading_zeros + 1, narrow(padded));
    }

    if unpadded / limit > 0 {
        if a.leading_zeros <= MIN_LEADING_ZEROS {
            return Difficulty::EASIEST;
        }
        return Difficulty::new(a.leading_zeros - 1, narrow(unpadded / 16));
    }

    Difficulty::new(a.leading_zeros, narrow(unpadded))
}

/// Apply [`retarget`] with a precomputed [`Adjustment`].
pub fn apply(a: Difficulty, adjustment: Adjustment) -> Difficulty {
    retarget(a, adjustment.numerator, adjustment.denominator)
}

fn narrow(value: u128) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
