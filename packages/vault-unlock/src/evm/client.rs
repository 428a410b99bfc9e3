//! EVM RPC Client
//!
//! alloy-backed [`ChainClient`] for one domain.
//!
//! # Transaction Building
//!
//! Providers are built with `ProviderBuilder::with_recommended_fillers()` so
//! nonce, gas limit and fee fields are filled from the node. A pinned gas
//! price on the request turns the transaction into a legacy one at exactly
//! that price.
//!
//! # Usage
//!
//! ```ignore
//! let l1 = EvmChainClient::new(EvmClientConfig {
//!     domain: Domain::L1,
//!     rpc_url: "http://127.0.0.1:8012".into(),
//!     private_key: key.into(),
//!     ..Default::default()
//! })?;
//! let chain_id = l1.chain_id().await?;
//! ```

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, TxHash},
    providers::{Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::{
        http::{reqwest::Url, Client, Http},
        TransportError,
    },
};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::artifact::ContractArtifact;
use crate::client::{ChainClient, ChainError, InclusionReceipt, TxRequest};
use crate::types::Domain;

/// L2 discovery RPC returning the bridge address
const BRIDGEHUB_DISCOVERY_METHOD: &str = "zks_getBridgehubContract";

/// EVM client configuration
#[derive(Clone)]
pub struct EvmClientConfig {
    pub domain: Domain,
    /// RPC URL (e.g., "http://127.0.0.1:8012")
    pub rpc_url: String,
    /// Private key for signing (hex, with or without 0x prefix)
    pub private_key: String,
    /// Upper bound on waiting for a receipt
    pub inclusion_timeout: Duration,
    /// Receipt poll interval
    pub receipt_poll_interval: Duration,
}

impl Default for EvmClientConfig {
    fn default() -> Self {
        Self {
            domain: Domain::L1,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            private_key: String::new(),
            inclusion_timeout: Duration::from_secs(120),
            receipt_poll_interval: Duration::from_millis(500),
        }
    }
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for EvmClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvmClientConfig")
            .field("domain", &self.domain)
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("inclusion_timeout", &self.inclusion_timeout)
            .field("receipt_poll_interval", &self.receipt_poll_interval)
            .finish()
    }
}

/// EVM RPC client with signing capabilities
pub struct EvmChainClient {
    domain: Domain,
    rpc_url: Url,
    signer: PrivateKeySigner,
    inclusion_timeout: Duration,
    receipt_poll_interval: Duration,
}

impl EvmChainClient {
    /// Create a new EVM client
    pub fn new(config: EvmClientConfig) -> Result<Self> {
        let signer: PrivateKeySigner = config
            .private_key
            .parse()
            .map_err(|e| eyre!("Invalid {} private key: {}", config.domain, e))?;
        let rpc_url: Url = config
            .rpc_url
            .parse()
            .wrap_err_with(|| format!("Invalid {} RPC URL", config.domain))?;

        info!(
            domain = %config.domain,
            rpc_url = %rpc_url,
            address = %signer.address(),
            "Created EVM client with signer"
        );

        Ok(Self {
            domain: config.domain,
            rpc_url,
            signer,
            inclusion_timeout: config.inclusion_timeout,
            receipt_poll_interval: config.receipt_poll_interval,
        })
    }

    /// Provider with wallet and recommended fillers
    fn provider(&self) -> impl Provider<Http<Client>> {
        let wallet = EthereumWallet::from(self.signer.clone());
        ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(self.rpc_url.clone())
    }

    /// JSON-RPC error responses are the node judging the request; anything
    /// else is the transport failing.
    fn classify(&self, err: TransportError) -> ChainError {
        match err.as_error_resp() {
            Some(payload) => ChainError::Rejected {
                domain: self.domain,
                reason: payload.message.to_string(),
            },
            None => ChainError::Unavailable {
                domain: self.domain,
                reason: err.to_string(),
            },
        }
    }

    async fn send_request(&self, tx: TransactionRequest) -> Result<TxHash, ChainError> {
        let pending = self
            .provider()
            .send_transaction(tx)
            .await
            .map_err(|e| self.classify(e))?;

        let tx_hash = *pending.tx_hash();
        info!(domain = %self.domain, tx_hash = %tx_hash, "Transaction sent");
        Ok(tx_hash)
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn signer_address(&self) -> Address {
        self.signer.address()
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider()
            .get_chain_id()
            .await
            .map_err(|e| self.classify(e))
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        self.provider()
            .get_gas_price()
            .await
            .map_err(|e| self.classify(e))
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash, ChainError> {
        let mut request = TransactionRequest::default()
            .with_to(tx.to)
            .with_input(tx.data)
            .with_value(tx.value);

        if let Some(gas_price) = tx.gas_price {
            request = request.with_gas_price(gas_price);
        }

        self.send_request(request).await
    }

    async fn wait_for_inclusion(&self, tx_hash: TxHash) -> Result<InclusionReceipt, ChainError> {
        let provider = self.provider();
        let start = Instant::now();

        while start.elapsed() < self.inclusion_timeout {
            let receipt = provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| self.classify(e))?;

            if let Some(receipt) = receipt {
                debug!(
                    domain = %self.domain,
                    tx_hash = %tx_hash,
                    block = ?receipt.block_number,
                    success = receipt.status(),
                    "Transaction included"
                );
                return Ok(InclusionReceipt {
                    tx_hash,
                    block_number: receipt.block_number,
                    success: receipt.status(),
                    contract_address: receipt.contract_address,
                });
            }
            tokio::time::sleep(self.receipt_poll_interval).await;
        }

        Err(ChainError::InclusionTimeout {
            domain: self.domain,
            tx_hash,
            timeout: self.inclusion_timeout,
        })
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        let request = TransactionRequest::default().with_to(to).with_input(data);
        self.provider()
            .call(&request)
            .await
            .map_err(|e| self.classify(e))
    }

    async fn deploy_contract(
        &self,
        artifact: &ContractArtifact,
        constructor_args: Bytes,
    ) -> Result<Address, ChainError> {
        let mut code = artifact.bytecode.to_vec();
        code.extend_from_slice(&constructor_args);

        debug!(
            domain = %self.domain,
            contract = %artifact.contract_name,
            code_len = code.len(),
            "Deploying contract"
        );

        let request = TransactionRequest::default().with_deploy_code(code);
        let tx_hash = self.send_request(request).await?;
        let receipt = self.wait_for_inclusion(tx_hash).await?;

        if !receipt.success {
            return Err(ChainError::Rejected {
                domain: self.domain,
                reason: format!("{} creation {} reverted", artifact.contract_name, tx_hash),
            });
        }

        receipt.contract_address.ok_or_else(|| ChainError::Rejected {
            domain: self.domain,
            reason: format!("{} creation receipt has no contract address", artifact.contract_name),
        })
    }

    async fn bridgehub_address(&self) -> Result<Address, ChainError> {
        self.provider()
            .raw_request::<_, Address>(BRIDGEHUB_DISCOVERY_METHOD.into(), Vec::<()>::new())
            .await
            .map_err(|e| self.classify(e))
    }
}
