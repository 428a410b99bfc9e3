//! Compiled contract artifacts
//!
//! Reads the `{ contractName, abi, bytecode }` JSON written by hardhat (L1)
//! and hardhat-zksync (L2). Compilation itself happens elsewhere.

use alloy::primitives::Bytes;
use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Deployable contract artifact
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    pub contract_name: String,
    #[serde(default)]
    pub abi: serde_json::Value,
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// Build an artifact from raw creation bytecode
    pub fn new(contract_name: impl Into<String>, bytecode: Bytes) -> Self {
        Self {
            contract_name: contract_name.into(),
            abi: serde_json::Value::Null,
            bytecode,
        }
    }

    /// Hardhat layout: `<dir>/contracts/<Name>.sol/<Name>.json`
    pub fn path_in(dir: &Path, name: &str) -> PathBuf {
        dir.join("contracts")
            .join(format!("{}.sol", name))
            .join(format!("{}.json", name))
    }

    /// Load `name` from an artifacts directory
    pub fn load(dir: &Path, name: &str) -> Result<Self> {
        Self::from_file(&Self::path_in(dir, name))
    }

    /// Load from file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read artifact {}", path.display()))?;
        Self::from_json(&content).wrap_err_with(|| format!("Invalid artifact {}", path.display()))
    }

    /// Parse artifact JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: ContractArtifact = serde_json::from_str(json)?;
        if artifact.bytecode.is_empty() {
            return Err(eyre!(
                "Artifact '{}' has no bytecode (interface or abstract contract?)",
                artifact.contract_name
            ));
        }
        Ok(artifact)
    }
}
