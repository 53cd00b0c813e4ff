//! Structured on-chain records.
//!
//! Only the shapes this crate reads and writes are modelled: tagged
//! constructors, integers, byte strings and lists. Serialization to the
//! ledger's binary encoding is left to the ledger client.
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DatumError {
    #[error("expected {expected} at {field}")]
    UnexpectedShape {
        field: &'static str,
        expected: &'static str,
    },
    #[error("expected constructor {expected}, found {found}")]
    WrongConstructor { expected: u64, found: u64 },
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("{0} is out of range")]
    OutOfRange(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Datum {
    Constr { tag: u64, fields: Vec<Datum> },
    Int(i128),
    Bytes(Vec<u8>),
    List(Vec<Datum>),
}

impl Datum {
    pub fn constr(tag: u64, fields: Vec<Datum>) -> Self {
        Datum::Constr { tag, fields }
    }

    /// Constructor with no fields, the usual unit redeemer.
    pub fn unit(tag: u64) -> Self {
        Datum::Constr {
            tag,
            fields: Vec::new(),
        }
    }

    pub fn int(value: impl Into<i128>) -> Self {
        Datum::Int(value.into())
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        Datum::Bytes(value.into())
    }

    /// Fields of constructor `tag`, checking the field count.
    pub fn expect_constr(
        &self,
        tag: u64,
        arity: usize,
        field: &'static str,
    ) -> Result<&[Datum], DatumError> {
        let Datum::Constr { tag: found, fields } = self else {
            return Err(DatumError::UnexpectedShape {
                field,
                expected: "constructor",
            });
        };
        if *found != tag {
            return Err(DatumError::WrongConstructor {
                expected: tag,
                found: *found,
            });
        }
        if fields.len() != arity {
            return Err(DatumError::FieldCount {
                expected: arity,
                found: fields.len(),
            });
        }
        Ok(fields)
    }

    pub fn as_int(&self, field: &'static str) -> Result<i128, DatumError> {
        match self {
            Datum::Int(v) => Ok(*v),
            _ => Err(DatumError::UnexpectedShape {
                field,
                expected: "integer",
            }),
        }
    }

    pub fn as_bytes(&self, field: &'static str) -> Result<&[u8], DatumError> {
        match self {
            Datum::Bytes(v) => Ok(v),
            _ => Err(DatumError::UnexpectedShape {
                field,
                expected: "bytes",
            }),
        }
    }

    pub fn as_list(&self, field: &'static str) -> Result<&[Datum], DatumError> {
        match self {
            Datum::List(v) => Ok(v),
            _ => Err(DatumError::UnexpectedShape {
                field,
                expected: "list",
            }),
        }
    }

    /// Integer field narrowed to `T`.
    pub fn as_uint<T: TryFrom<i128>>(&self, field: &'static str) -> Result<T, DatumError> {
        T::try_from(self.as_int(field)?).map_err(|_| DatumError::OutOfRange(field))
    }
}
