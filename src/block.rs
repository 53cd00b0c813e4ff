//! Validator block state and its per-submission transition.
use crate::codec::decode;
use crate::datum::{Datum, DatumError};
use crate::interlink::{extend, CheckpointChain};
use crate::retarget::{adjustment_ratio, apply, Adjustment};
use crate::types::Difficulty;
use serde::{Deserialize, Serialize};

/// Blocks per difficulty epoch.
pub const EPOCH_LENGTH: u64 = 2016;
/// Target duration of one epoch, in milliseconds.
pub const EPOCH_TARGET_MS: u64 = 1_209_600_000;
/// Fixed block-time budget added to the aligned clock when recording a block.
pub const BLOCK_TIME_BUDGET_MS: u64 = 90_000;
/// How far behind wall clock the validity window starts.
pub const CLOCK_LAG_MS: u64 = 60_000;
/// Length of the transaction validity window.
pub const VALIDITY_WINDOW_MS: u64 = 180_000;
/// Reward minted per accepted block.
pub const ROUND_REWARD: u64 = 5_000_000_000;

/// State carried by the validator output between blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockState {
    pub block_number: u64,
    pub current_hash: Vec<u8>,
    pub difficulty: Difficulty,
    pub epoch_time: u64,
    pub current_time: u64,
    pub interlink: CheckpointChain,
}

/// Time bounds a submitted transaction is valid for, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub from: u64,
    pub to: u64,
}

/// Result of applying one proof to a prior block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: BlockState,
    /// Difficulty actually achieved by the submitted hash.
    pub achieved: Difficulty,
    /// Set when the new block closed an epoch.
    pub adjustment: Option<Adjustment>,
    pub validity: ValidityWindow,
}

impl BlockState {
    /// Compute the state following `self` once `hash` is accepted at `now_ms`.
    ///
    /// The clock is truncated to whole seconds and lagged by [`CLOCK_LAG_MS`];
    /// the recorded time is that instant plus [`BLOCK_TIME_BUDGET_MS`]. When the
    /// new block number is a positive multiple of [`EPOCH_LENGTH`] the prior
    /// difficulty is retargeted against [`EPOCH_TARGET_MS`] and the epoch time
    /// resets; otherwise difficulty carries forward and epoch time accumulates.
    pub fn advance(&self, hash: &[u8], now_ms: u64) -> Transition {
        let achieved = decode(hash);
        let interlink = extend(hash, achieved, self.difficulty, self.interlink.clone());

        let aligned = (now_ms / 1000 * 1000).saturating_sub(CLOCK_LAG_MS);
        let recorded = aligned + BLOCK_TIME_BUDGET_MS;
        let elapsed = recorded.saturating_sub(self.current_time);
        let mut epoch_time = self.epoch_time.saturating_add(elapsed);

        let block_number = self.block_number.saturating_add(1);
        let mut difficulty = self.difficulty;
        let mut adjustment = None;

        if block_number % EPOCH_LENGTH == 0 {
            let adj = adjustment_ratio(epoch_time, EPOCH_TARGET_MS);
            difficulty = apply(self.difficulty, adj);
            adjustment = Some(adj);
            epoch_time = 0;
        }

        Transition {
            state: BlockState {
                block_number,
                current_hash: hash.to_vec(),
                difficulty,
                epoch_time,
                current_time: recorded,
                interlink,
            },
            achieved,
            adjustment,
            validity: ValidityWindow {
                from: aligned,
                to: aligned + VALIDITY_WINDOW_MS,
            },
        }
    }

    /// Encode as the validator record
    /// `(block_number, hash, leading_zeros, mantissa, epoch_time, current_time, 0, interlink)`.
    pub fn to_datum(&self) -> Datum {
        Datum::constr(
            0,
            vec![
                Datum::int(self.block_number),
                Datum::bytes(self.current_hash.clone()),
                Datum::int(self.difficulty.leading_zeros),
                Datum::int(self.difficulty.mantissa),
                Datum::int(self.epoch_time),
                Datum::int(self.current_time),
                Datum::int(0),
                Datum::List(self.interlink.iter().cloned().map(Datum::Bytes).collect()),
            ],
        )
    }

    /// Decode a validator record. The extra-nonce field is accepted in any shape.
    pub fn from_datum(datum: &Datum) -> Result<Self, DatumError> {
        let fields = datum.expect_constr(0, 8, "block")?;
        let interlink = fields[7]
            .as_list("interlink")?
            .iter()
            .map(|d| d.as_bytes("interlink").map(<[u8]>::to_vec))
            .collect::<Result<CheckpointChain, _>>()?;

        Ok(BlockState {
            block_number: fields[0].as_uint("block_number")?,
            current_hash: fields[1].as_bytes("current_hash")?.to_vec(),
            difficulty: Difficulty::new(
                fields[2].as_uint("leading_zeros")?,
                fields[3].as_uint("difficulty_number")?,
            ),
            epoch_time: fields[4].as_uint("epoch_time")?,
            current_time: fields[5].as_uint("current_time")?,
            interlink,
        })
    }
}

/// Hex-encoded view of a [`BlockState`] for logs and API responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadableBlock {
    pub block_number: u64,
    pub current_hash: String,
    pub leading_zeroes: u32,
    pub difficulty_number: u32,
    pub epoch_time: u64,
    pub current_time: u64,
    pub interlink: Vec<String>,
}

impl From<&BlockState> for ReadableBlock {
    fn from(block: &BlockState) -> Self {
        ReadableBlock {
            block_number: block.block_number,
            current_hash: hex::encode(&block.current_hash),
            leading_zeroes: block.difficulty.leading_zeros,
            difficulty_number: block.difficulty.mantissa,
            epoch_time: block.epoch_time,
            current_time: block.current_time,
            interlink: block.interlink.iter().map(hex::encode).collect(),
        }
    }
}
