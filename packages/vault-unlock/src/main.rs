use std::process::ExitCode;
use std::sync::Arc;

use eyre::WrapErr;
use vault_unlock::config::UnlockConfig;
use vault_unlock::discovery::resolve_bridgehub;
use vault_unlock::{
    CancelToken, ChainClient, ContractArtifact, Deployer, EvmChainClient, UnlockOrchestrator,
};

/// Unlocked
const EXIT_UNLOCKED: u8 = 0;
/// Any failure other than a pending unlock
const EXIT_FAILED: u8 = 1;
/// Dispatch broadcast on L1 but the Vault was not seen unlocked
const EXIT_PENDING: u8 = 2;

fn main() -> eyre::Result<ExitCode> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    // Run the async main
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<ExitCode> {
    init_logging();

    tracing::info!("Starting vault unlock");

    let config = UnlockConfig::load()?;
    tracing::info!(
        l1_rpc = %config.l1.rpc_url,
        l2_rpc = %config.l2.rpc_url,
        gas_limit = config.unlock.l2_gas_limit,
        pubdata_byte_limit = config.unlock.l2_pubdata_byte_limit,
        "Configuration loaded"
    );

    let l1: Arc<dyn ChainClient> = Arc::new(EvmChainClient::new(config.l1_client_config())?);
    let l2: Arc<dyn ChainClient> = Arc::new(EvmChainClient::new(config.l2_client_config())?);

    let l1_chain_id = l1.chain_id().await?;
    let l2_chain_id = l2.chain_id().await?;
    tracing::info!(l1_chain_id, l2_chain_id, "Connected to both domains");

    let pair = match config.existing_pair.clone() {
        Some(pair) => {
            tracing::info!(
                access_key = %pair.access_key,
                vault = %pair.vault,
                unlocker = %pair.unlocker,
                "Using existing linked pair"
            );
            pair
        }
        None => {
            let access_key = ContractArtifact::load(&config.artifacts.l1, "AccessKey")
                .wrap_err("Run the L1 compiler before unlocking")?;
            let vault = ContractArtifact::load(&config.artifacts.l2, "Vault")
                .wrap_err("Run the L2 compiler before unlocking")?;

            let deployer = Deployer::new(l1.clone(), l2.clone(), access_key, vault);
            let pair = deployer.deploy_linked_pair().await?;
            tracing::info!(
                access_key = %pair.access_key,
                vault = %pair.vault,
                unlocker = %pair.unlocker,
                "Linked pair deployed"
            );
            pair
        }
    };

    let bridgehub = resolve_bridgehub(l2.as_ref(), config.bridgehub_address).await?;
    let orchestrator = UnlockOrchestrator::new(l1, l2, &pair, bridgehub)
        .with_policy(config.poll_policy());

    tracing::info!(state = %orchestrator.vault_state().await?, "Vault state before unlock");

    let cancel = CancelToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, stopping polling");
            signal_cancel.cancel();
        }
    });

    let code = match orchestrator.unlock(&config.gas_budget(), &cancel).await {
        Ok(receipt) => {
            tracing::info!(
                tx_hash = %receipt.submitted_tx_hash,
                l1_block = ?receipt.l1_block,
                polls = receipt.polls,
                base_cost = %receipt.base_cost,
                "Vault unlocked"
            );
            EXIT_UNLOCKED
        }
        Err(e) if e.may_still_complete() => {
            tracing::warn!(
                error = %e,
                tx_hash = ?e.submitted_tx_hash(),
                "Unlock not observed yet; the message may still be relayed, do not resubmit"
            );
            EXIT_PENDING
        }
        Err(e) => {
            tracing::error!(error = %e, "Unlock failed");
            EXIT_FAILED
        }
    };

    match orchestrator.vault_state().await {
        Ok(state) => tracing::info!(state = %state, "Final vault state"),
        Err(e) => tracing::warn!(error = %e, "Could not read final vault state"),
    }

    Ok(ExitCode::from(code))
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vault_unlock=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}
