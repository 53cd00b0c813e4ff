use crate::ledger::{asset_id, OutputRef};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_HYDRATION_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(2);

const VALIDATOR_HASH_MAINNET: &str = "279f842c33eed9054b9e3c70cd6a3b32298259c24b78b895cb41d91a";
const VALIDATOR_HASH_PREVIEW: &str = "502fbfbdafc7ddada9c335bd1440781e5445d08bada77dc2032866a6";
const VALIDATOR_ADDRESS_MAINNET: &str =
    "addr1wynelppvx0hdjp2tnc78pnt28veznqjecf9h3wy4edqajxsg7hwsc";
const VALIDATOR_ADDRESS_PREVIEW: &str =
    "addr_test1wpgzl0aa4lramtdfcv6m69zq0q09g3ws3wk6wlwzqv5xdfsdcf2qa";

const AUTHORITY_TOKEN_NAME: &str = "lord tuna";
const REWARD_TOKEN_NAME: &str = "TUNA";
const POOL_TOKEN_NAME: &str = "POOL";

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Ledger network the pool submits to. Selects the validator constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Preview,
}

impl Network {
    pub fn validator_hash(&self) -> &'static str {
        match self {
            Network::Mainnet => VALIDATOR_HASH_MAINNET,
            Network::Preview => VALIDATOR_HASH_PREVIEW,
        }
    }

    pub fn validator_address(&self) -> &'static str {
        match self {
            Network::Mainnet => VALIDATOR_ADDRESS_MAINNET,
            Network::Preview => VALIDATOR_ADDRESS_PREVIEW,
        }
    }

    /// Singleton token marking the live validator output.
    pub fn authority_asset(&self) -> String {
        asset_id(self.validator_hash(), AUTHORITY_TOKEN_NAME)
    }

    /// Token minted as block reward and held in pool accounts.
    pub fn reward_asset(&self) -> String {
        asset_id(self.validator_hash(), REWARD_TOKEN_NAME)
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "Mainnet"),
            Network::Preview => write!(f, "Preview"),
        }
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "preview" => Ok(Network::Preview),
            _ => Err(ConfigError::Invalid {
                key: "NETWORK",
                reason: format!("unknown network {s:?}"),
            }),
        }
    }
}

/// Endpoints the ledger client connects to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEndpoints {
    pub kupo_url: String,
    pub ogmios_url: String,
}

/// Pool deployment settings. All but the intervals are required at startup.
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
#[builder(pattern = "owned", build_fn(error = "ConfigError", validate = "Self::validate"))]
pub struct PoolConfig {
    pub network: Network,
    pub endpoints: LedgerEndpoints,
    /// Address holding the pool-account outputs.
    #[builder(setter(into))]
    pub pool_address: String,
    /// Policy id of the pool authority token.
    #[builder(setter(into))]
    pub pool_script_hash: String,
    /// Output carrying the pool script as a reference script.
    pub pool_script_reference: OutputRef,
    #[builder(default = "DEFAULT_HYDRATION_INTERVAL")]
    pub hydration_interval: Duration,
    #[builder(default = "DEFAULT_SUBMIT_TIMEOUT")]
    pub submit_timeout: Duration,
}

impl From<derive_builder::UninitializedFieldError> for ConfigError {
    fn from(err: derive_builder::UninitializedFieldError) -> Self {
        ConfigError::Missing(err.field_name())
    }
}

impl PoolConfigBuilder {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_address.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Invalid {
                key: "POOL_CONTRACT_ADDRESS",
                reason: "must not be empty".into(),
            });
        }
        if let Some(hash) = &self.pool_script_hash {
            if hash.is_empty() || hex::decode(hash).is_err() {
                return Err(ConfigError::Invalid {
                    key: "POOL_SCRIPT_HASH",
                    reason: "must be a non-empty hex string".into(),
                });
            }
        }
        if self.hydration_interval.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::Invalid {
                key: "CACHE_HYDRATION_INTERVAL_MS",
                reason: "must be > 0".into(),
            });
        }
        if self.submit_timeout.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::Invalid {
                key: "submit_timeout",
                reason: "must be > 0".into(),
            });
        }
        Ok(())
    }
}

impl PoolConfig {
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }

    /// Asset id of the pool authority token.
    pub fn pool_authority_asset(&self) -> String {
        asset_id(&self.pool_script_hash, POOL_TOKEN_NAME)
    }

    /// Read the configuration from environment-style keys.
    ///
    /// Required: `NETWORK`, `KUPO_URL`, `OGMIOS_URL`, `POOL_CONTRACT_ADDRESS`,
    /// `POOL_SCRIPT_HASH`, `POOL_OUTPUT_REFERENCE` (`<tx>#<index>`).
    /// Optional: `CACHE_HYDRATION_INTERVAL_MS`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let network: Network = required("NETWORK")?.parse()?;
        let endpoints = LedgerEndpoints {
            kupo_url: required("KUPO_URL")?,
            ogmios_url: required("OGMIOS_URL")?,
        };
        let pool_script_reference: OutputRef = required("POOL_OUTPUT_REFERENCE")?
            .parse()
            .map_err(|err: crate::ledger::OutputRefParseError| ConfigError::Invalid {
                key: "POOL_OUTPUT_REFERENCE",
                reason: err.to_string(),
            })?;

        let mut builder = PoolConfig::builder()
            .network(network)
            .endpoints(endpoints)
            .pool_address(required("POOL_CONTRACT_ADDRESS")?)
            .pool_script_hash(required("POOL_SCRIPT_HASH")?)
            .pool_script_reference(pool_script_reference);

        if let Some(raw) = lookup("CACHE_HYDRATION_INTERVAL_MS") {
            let ms: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
                key: "CACHE_HYDRATION_INTERVAL_MS",
                reason: format!("not a number: {raw:?}"),
            })?;
            builder = builder.hydration_interval(Duration::from_millis(ms));
        }

        builder.build()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}
