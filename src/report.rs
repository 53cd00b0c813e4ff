//! Inbound proof reports and outbound submission responses.
use crate::block::BlockState;
use crate::types::{Difficulty, MANTISSA_LIMIT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("missing field {0}")]
    Missing(&'static str),
    #[error("malformed field {field}: {reason}")]
    Malformed { field: &'static str, reason: String },
}

/// Byte string accepted either as hex text or as a raw byte array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ByteField {
    Hex(String),
    Raw(Vec<u8>),
}

impl ByteField {
    fn into_bytes(self, field: &'static str) -> Result<Vec<u8>, ReportError> {
        match self {
            ByteField::Raw(bytes) => Ok(bytes),
            ByteField::Hex(text) => hex::decode(&text).map_err(|err| ReportError::Malformed {
                field,
                reason: err.to_string(),
            }),
        }
    }
}

/// Prior block as reported by the pool, every field optional until validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorBlock {
    pub block_number: Option<u64>,
    pub current_hash: Option<ByteField>,
    pub leading_zeroes: Option<u32>,
    pub difficulty_number: Option<u32>,
    pub epoch_time: Option<u64>,
    pub current_time: Option<u64>,
    pub interlink: Option<Vec<ByteField>>,
}

/// Raw proof report as received from the pool front end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofReport {
    pub nonce: Option<String>,
    #[serde(alias = "sha", alias = "proofHash")]
    pub proof_hash: Option<String>,
    #[serde(alias = "current_block", alias = "priorBlock")]
    pub prior_block: Option<PriorBlock>,
    #[serde(alias = "new_zeroes", alias = "achievedZeros")]
    pub achieved_zeros: Option<u32>,
    #[serde(alias = "new_difficulty", alias = "achievedDifficulty")]
    pub achieved_difficulty: Option<u32>,
    #[serde(alias = "miner_payments")]
    pub payouts: Option<BTreeMap<String, u64>>,
}

/// A report with every required field present and decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedReport {
    pub nonce: Vec<u8>,
    pub proof_hash: Vec<u8>,
    pub prior: BlockState,
    /// Difficulty the miner claims the hash achieved.
    pub claimed: Difficulty,
    pub payouts: BTreeMap<String, u64>,
}

impl ValidatedReport {
    pub fn proof_hash_hex(&self) -> String {
        hex::encode(&self.proof_hash)
    }
}

/// Leading zero nibbles a 32-byte hash can carry.
const MAX_REPORTED_LEADING_ZEROS: u32 = 64;

fn out_of_range(field: &'static str, value: impl std::fmt::Display) -> ReportError {
    ReportError::Malformed {
        field,
        reason: format!("{value} out of range"),
    }
}

fn hex_field(value: Option<String>, field: &'static str) -> Result<Vec<u8>, ReportError> {
    let bytes = ByteField::Hex(value.ok_or(ReportError::Missing(field))?).into_bytes(field)?;
    if bytes.is_empty() {
        return Err(ReportError::Malformed {
            field,
            reason: "must not be empty".into(),
        });
    }
    Ok(bytes)
}

impl ProofReport {
    /// Parse a JSON request body.
    pub fn from_json(body: &[u8]) -> Result<Self, ReportError> {
        serde_json::from_slice(body).map_err(|err| ReportError::Malformed {
            field: "body",
            reason: err.to_string(),
        })
    }

    /// Check presence of every required field and decode the hex payloads.
    pub fn validate(self) -> Result<ValidatedReport, ReportError> {
        let nonce = hex_field(self.nonce, "nonce")?;
        let proof_hash = hex_field(self.proof_hash, "proof_hash")?;
        let block = self.prior_block.ok_or(ReportError::Missing("prior_block"))?;
        let achieved_zeros = self
            .achieved_zeros
            .ok_or(ReportError::Missing("achieved_zeros"))?;
        let achieved_difficulty = self
            .achieved_difficulty
            .ok_or(ReportError::Missing("achieved_difficulty"))?;
        let payouts = self.payouts.ok_or(ReportError::Missing("payouts"))?;

        let interlink = block
            .interlink
            .ok_or(ReportError::Missing("prior_block.interlink"))?
            .into_iter()
            .map(|h| h.into_bytes("prior_block.interlink"))
            .collect::<Result<Vec<_>, _>>()?;
        let current_hash = match block.current_hash {
            Some(h) => h.into_bytes("prior_block.current_hash")?,
            None => Vec::new(),
        };

        let block_number = block
            .block_number
            .ok_or(ReportError::Missing("prior_block.block_number"))?;
        if block_number == u64::MAX {
            return Err(out_of_range("prior_block.block_number", block_number));
        }
        let leading_zeroes = block
            .leading_zeroes
            .ok_or(ReportError::Missing("prior_block.leading_zeroes"))?;
        if leading_zeroes > MAX_REPORTED_LEADING_ZEROS {
            return Err(out_of_range("prior_block.leading_zeroes", leading_zeroes));
        }
        let difficulty_number = block
            .difficulty_number
            .ok_or(ReportError::Missing("prior_block.difficulty_number"))?;
        if difficulty_number >= MANTISSA_LIMIT {
            return Err(out_of_range("prior_block.difficulty_number", difficulty_number));
        }

        let prior = BlockState {
            block_number,
            current_hash,
            difficulty: Difficulty::new(leading_zeroes, difficulty_number),
            epoch_time: block
                .epoch_time
                .ok_or(ReportError::Missing("prior_block.epoch_time"))?,
            current_time: block
                .current_time
                .ok_or(ReportError::Missing("prior_block.current_time"))?,
            interlink,
        };

        Ok(ValidatedReport {
            nonce,
            proof_hash,
            prior,
            claimed: Difficulty::new(achieved_zeros, achieved_difficulty),
            payouts,
        })
    }
}

/// JSON body returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

/// Outcome of a submission, with an HTTP-style status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl SubmissionResponse {
    pub fn submitted(proof_hash_hex: &str, tx_hash: String) -> Self {
        Self {
            status: 200,
            body: ResponseBody {
                message: format!("Successful submission with hash {proof_hash_hex}"),
                tx_hash: Some(tx_hash),
            },
        }
    }

    pub fn failed(proof_hash_hex: &str) -> Self {
        Self {
            status: 500,
            body: ResponseBody {
                message: format!("Could not submit hash {proof_hash_hex}"),
                tx_hash: None,
            },
        }
    }

    pub fn bad_request() -> Self {
        Self {
            status: 400,
            body: ResponseBody {
                message: "sent a bad submission".into(),
                tx_hash: None,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}
