use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::alias::apply_l1_to_l2_alias;
use crate::evm::EvmClientConfig;
use crate::policy::PollPolicy;
use crate::types::{Domain, GasBudget, LinkedPair};

/// Runner configuration
#[derive(Debug, Clone)]
pub struct UnlockConfig {
    pub l1: ChainEndpoint,
    pub l2: ChainEndpoint,
    pub unlock: UnlockSettings,
    /// Skips bridge discovery when set
    pub bridgehub_address: Option<Address>,
    pub artifacts: ArtifactDirs,
    /// Already-deployed pair; skips artifact loading and deployment when set
    pub existing_pair: Option<LinkedPair>,
}

/// RPC endpoint and signing key for one domain
#[derive(Clone)]
pub struct ChainEndpoint {
    pub domain: Domain,
    pub rpc_url: String,
    pub private_key: String,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for ChainEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainEndpoint")
            .field("domain", &self.domain)
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Gas budget and polling settings
#[derive(Debug, Clone)]
pub struct UnlockSettings {
    pub l2_gas_limit: u64,
    pub l2_pubdata_byte_limit: u64,
    pub poll_interval_ms: u64,
    pub poll_attempts: u32,
    pub inclusion_timeout_ms: u64,
}

/// Where compiled contracts are read from
#[derive(Debug, Clone)]
pub struct ArtifactDirs {
    /// Holds AccessKey
    pub l1: PathBuf,
    /// Holds Vault
    pub l2: PathBuf,
}

/// Default functions
fn default_l1_rpc_url() -> String {
    "http://127.0.0.1:8012".to_string()
}

fn default_l2_rpc_url() -> String {
    "http://127.0.0.1:8011".to_string()
}

fn default_l2_gas_limit() -> u64 {
    350_000
}

fn default_l2_pubdata_byte_limit() -> u64 {
    800
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_poll_attempts() -> u32 {
    30
}

fn default_inclusion_timeout_ms() -> u64 {
    120_000
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| eyre!("{} must be a valid number, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

fn optional_address(name: &str) -> Result<Option<Address>> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<Address>()
            .map(Some)
            .wrap_err_with(|| format!("{} must be a valid hex address", name)),
        _ => Ok(None),
    }
}

/// Pair deployed with the L2's own tooling. The Vault must have been built
/// with the aliased AccessKey as its unlocker.
fn existing_pair() -> Result<Option<LinkedPair>> {
    match (
        optional_address("ACCESS_KEY_ADDRESS")?,
        optional_address("VAULT_ADDRESS")?,
    ) {
        (Some(access_key), Some(vault)) => Ok(Some(LinkedPair {
            access_key,
            vault,
            unlocker: apply_l1_to_l2_alias(access_key),
        })),
        (None, None) => Ok(None),
        _ => Err(eyre!(
            "ACCESS_KEY_ADDRESS and VAULT_ADDRESS must be set together"
        )),
    }
}

/// Domain-specific key first, then the shared `PRIVATE_KEY`
fn private_key_for(domain: Domain) -> Result<String> {
    let specific = format!("{}_PRIVATE_KEY", domain);
    env::var(&specific)
        .or_else(|_| env::var("PRIVATE_KEY"))
        .map_err(|_| eyre!("{} or PRIVATE_KEY environment variable is required", specific))
}

impl UnlockConfig {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        let l1 = ChainEndpoint {
            domain: Domain::L1,
            rpc_url: env::var("L1_RPC_URL").unwrap_or_else(|_| default_l1_rpc_url()),
            private_key: private_key_for(Domain::L1)?,
        };

        let l2 = ChainEndpoint {
            domain: Domain::L2,
            rpc_url: env::var("L2_RPC_URL").unwrap_or_else(|_| default_l2_rpc_url()),
            private_key: private_key_for(Domain::L2)?,
        };

        let unlock = UnlockSettings {
            l2_gas_limit: parsed_or("L2_GAS_LIMIT", default_l2_gas_limit())?,
            l2_pubdata_byte_limit: parsed_or(
                "L2_PUBDATA_BYTE_LIMIT",
                default_l2_pubdata_byte_limit(),
            )?,
            poll_interval_ms: parsed_or("UNLOCK_POLL_INTERVAL_MS", default_poll_interval_ms())?,
            poll_attempts: parsed_or("UNLOCK_POLL_ATTEMPTS", default_poll_attempts())?,
            inclusion_timeout_ms: parsed_or(
                "INCLUSION_TIMEOUT_MS",
                default_inclusion_timeout_ms(),
            )?,
        };

        let bridgehub_address = optional_address("BRIDGEHUB_ADDRESS")?;

        let artifacts = ArtifactDirs {
            l1: env::var("L1_ARTIFACTS_DIR")
                .unwrap_or_else(|_| "artifacts".to_string())
                .into(),
            l2: env::var("L2_ARTIFACTS_DIR")
                .unwrap_or_else(|_| "artifacts-zk".to_string())
                .into(),
        };

        let config = UnlockConfig {
            l1,
            l2,
            unlock,
            bridgehub_address,
            artifacts,
            existing_pair: existing_pair()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        for endpoint in [&self.l1, &self.l2] {
            if endpoint.rpc_url.is_empty() {
                return Err(eyre!("{} rpc_url cannot be empty", endpoint.domain));
            }

            let key = endpoint.private_key.trim_start_matches("0x");
            if key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(eyre!(
                    "{} private_key must be 64 hex chars (optionally 0x-prefixed)",
                    endpoint.domain
                ));
            }
        }

        if self.unlock.poll_attempts == 0 {
            return Err(eyre!("UNLOCK_POLL_ATTEMPTS must be at least 1"));
        }

        if self.unlock.l2_gas_limit == 0 {
            return Err(eyre!("L2_GAS_LIMIT cannot be zero"));
        }

        Ok(())
    }

    pub fn gas_budget(&self) -> GasBudget {
        GasBudget::new(self.unlock.l2_gas_limit, self.unlock.l2_pubdata_byte_limit)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            Duration::from_millis(self.unlock.poll_interval_ms),
            self.unlock.poll_attempts,
        )
    }

    pub fn l1_client_config(&self) -> EvmClientConfig {
        self.client_config(&self.l1)
    }

    pub fn l2_client_config(&self) -> EvmClientConfig {
        self.client_config(&self.l2)
    }

    fn client_config(&self, endpoint: &ChainEndpoint) -> EvmClientConfig {
        EvmClientConfig {
            domain: endpoint.domain,
            rpc_url: endpoint.rpc_url.clone(),
            private_key: endpoint.private_key.clone(),
            inclusion_timeout: Duration::from_millis(self.unlock.inclusion_timeout_ms),
            ..Default::default()
        }
    }
}
