//! End-to-end unlock flow against the simulated L1/L2 pair
//!
//! Runs without nodes: `cargo test --test unlock_flow`

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use tokio_test::{assert_err, assert_ok};
use vault_unlock::testing::{OracleMode, SimConfig, SimNetwork};
use vault_unlock::{
    BaseCost, CancelToken, ChainClient, ChainError, ContractArtifact, Deployer, Domain, GasBudget,
    InclusionReceipt, LinkedPair, PollPolicy, TxRequest, UnlockError, UnlockOrchestrator,
    UnlockPhase,
};

const FAST_POLL: Duration = Duration::from_millis(5);

/// Simulated network plus a deployed, correctly bound pair
struct TestContext {
    sim: SimNetwork,
    pair: LinkedPair,
}

impl TestContext {
    async fn setup(config: SimConfig) -> Self {
        let sim = SimNetwork::new(config);
        let pair = deployer(&sim).deploy_linked_pair().await.unwrap();
        Self { sim, pair }
    }

    fn orchestrator(&self, max_attempts: u32) -> UnlockOrchestrator {
        orchestrator_for(&self.sim, &self.pair, max_attempts)
    }
}

fn deployer(sim: &SimNetwork) -> Deployer {
    Deployer::new(
        sim.l1_client(),
        sim.l2_client(),
        sim.access_key_artifact(),
        sim.vault_artifact(),
    )
}

fn orchestrator_for(sim: &SimNetwork, pair: &LinkedPair, max_attempts: u32) -> UnlockOrchestrator {
    UnlockOrchestrator::new(sim.l1_client(), sim.l2_client(), pair, sim.bridgehub())
        .with_policy(PollPolicy::new(FAST_POLL, max_attempts))
}

// ============================================================================
// Scenario A: correctly bound pair, default budget
// ============================================================================

#[tokio::test]
async fn test_scenario_a_unlocks_within_budget() {
    let ctx = TestContext::setup(SimConfig::default()).await;
    let orchestrator = ctx.orchestrator(30);

    assert!(!assert_ok!(orchestrator.is_unlocked().await));

    let receipt = assert_ok!(
        orchestrator
            .unlock(&GasBudget::new(350_000, 800), &CancelToken::new())
            .await
    );

    // Relay delivers on the third L2 read after the dispatch
    assert_eq!(receipt.polls, 3);
    assert!(receipt.l1_block.is_some());
    assert!(!receipt.base_cost.is_zero());
    assert!(assert_ok!(orchestrator.is_unlocked().await));
    assert!(ctx.sim.failed_deliveries().is_empty());
}

#[tokio::test]
async fn test_unlocked_on_first_poll_reports_one_poll() {
    let ctx = TestContext::setup(SimConfig {
        relay_delay: 0,
        ..SimConfig::default()
    })
    .await;

    let receipt = assert_ok!(
        ctx.orchestrator(30)
            .unlock(&GasBudget::default(), &CancelToken::new())
            .await
    );
    assert_eq!(receipt.polls, 1);
}

#[tokio::test]
async fn test_zero_attempts_observes_the_vault_once() {
    let ctx = TestContext::setup(SimConfig {
        relay_delay: 0,
        ..SimConfig::default()
    })
    .await;
    let reads_before = ctx.sim.l2_reads();

    let receipt = assert_ok!(
        ctx.orchestrator(0)
            .unlock(&GasBudget::default(), &CancelToken::new())
            .await
    );
    assert_eq!(receipt.polls, 1);
    assert_eq!(ctx.sim.l2_reads(), reads_before + 1);
}

#[tokio::test]
async fn test_is_unlocked_is_idempotent_after_unlock() {
    let ctx = TestContext::setup(SimConfig::default()).await;
    let orchestrator = ctx.orchestrator(30);

    assert_ok!(
        orchestrator
            .unlock(&GasBudget::default(), &CancelToken::new())
            .await
    );

    for _ in 0..10 {
        assert!(assert_ok!(orchestrator.is_unlocked().await));
    }
}

#[tokio::test]
async fn test_independent_pairs_unlock_concurrently() {
    let sim = SimNetwork::new(SimConfig::default());
    let first = deployer(&sim).deploy_linked_pair().await.unwrap();
    let second = deployer(&sim).deploy_linked_pair().await.unwrap();
    assert_ne!(first.vault, second.vault);

    let a = orchestrator_for(&sim, &first, 30);
    let b = orchestrator_for(&sim, &second, 30);
    let cancel = CancelToken::new();
    let budget = GasBudget::default();

    let (ra, rb) = tokio::join!(a.unlock(&budget, &cancel), b.unlock(&budget, &cancel));
    assert_ok!(ra);
    assert_ok!(rb);
    assert!(sim.peek_vault_unlocked(first.vault).unwrap());
    assert!(sim.peek_vault_unlocked(second.vault).unwrap());
}

/// L1 client whose node drops the connection while a receipt is awaited
struct ReceiptlessL1 {
    inner: Arc<dyn ChainClient>,
}

#[async_trait]
impl ChainClient for ReceiptlessL1 {
    fn domain(&self) -> Domain {
        self.inner.domain()
    }

    fn signer_address(&self) -> Address {
        self.inner.signer_address()
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.inner.chain_id().await
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        self.inner.gas_price().await
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash, ChainError> {
        self.inner.send_transaction(tx).await
    }

    async fn wait_for_inclusion(&self, _tx_hash: TxHash) -> Result<InclusionReceipt, ChainError> {
        Err(ChainError::Unavailable {
            domain: Domain::L1,
            reason: "connection reset".into(),
        })
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, ChainError> {
        self.inner.call(to, data).await
    }

    async fn deploy_contract(
        &self,
        artifact: &ContractArtifact,
        constructor_args: Bytes,
    ) -> Result<Address, ChainError> {
        self.inner.deploy_contract(artifact, constructor_args).await
    }

    async fn bridgehub_address(&self) -> Result<Address, ChainError> {
        self.inner.bridgehub_address().await
    }
}

#[tokio::test]
async fn test_lost_receipt_after_broadcast_keeps_tx_hash() {
    let ctx = TestContext::setup(SimConfig {
        relay_delay: 0,
        ..SimConfig::default()
    })
    .await;
    let l1: Arc<dyn ChainClient> = Arc::new(ReceiptlessL1 {
        inner: ctx.sim.l1_client(),
    });
    let orchestrator =
        UnlockOrchestrator::new(l1, ctx.sim.l2_client(), &ctx.pair, ctx.sim.bridgehub())
            .with_policy(PollPolicy::new(FAST_POLL, 30));

    let err = assert_err!(
        orchestrator
            .unlock(&GasBudget::default(), &CancelToken::new())
            .await
    );

    let mined = ctx.sim.l1_transactions();
    let dispatch = mined.last().unwrap();
    assert!(dispatch.success);
    assert_eq!(
        err,
        UnlockError::InclusionUnknown {
            tx_hash: dispatch.tx_hash,
            reason: "connection reset".into(),
        }
    );
    assert_eq!(err.submitted_tx_hash(), Some(dispatch.tx_hash));
    assert!(err.may_still_complete());

    // The paid message was queued and still lands without a second dispatch
    assert_eq!(ctx.sim.pending_messages(), 1);
    assert!(assert_ok!(orchestrator.is_unlocked().await));
    assert_eq!(ctx.sim.l1_transactions().len(), mined.len());
}

// ============================================================================
// Scenario B: underfunded dispatch
// ============================================================================

#[tokio::test]
async fn test_scenario_b_insufficient_value_is_rejected() {
    let ctx = TestContext::setup(SimConfig::default()).await;
    let orchestrator = ctx.orchestrator(30);

    let quote = assert_ok!(orchestrator.quote(&GasBudget::default()).await);
    let mut message = orchestrator.prepare_message(&quote);
    message.value = BaseCost(quote.base_cost.value() - U256::from(1));

    let err = assert_err!(orchestrator.submit(&quote, &message).await);
    assert!(matches!(err, UnlockError::SubmissionRejected { .. }));
    assert!(!err.may_still_complete());

    // Nothing was queued, so the vault never opens
    assert_eq!(ctx.sim.pending_messages(), 0);
    for _ in 0..10 {
        assert!(!assert_ok!(orchestrator.is_unlocked().await));
    }
}

#[tokio::test]
async fn test_mined_revert_carries_tx_hash() {
    let ctx = TestContext::setup(SimConfig {
        include_reverts: true,
        ..SimConfig::default()
    })
    .await;
    let orchestrator = ctx.orchestrator(30);

    let quote = assert_ok!(orchestrator.quote(&GasBudget::default()).await);
    let mut message = orchestrator.prepare_message(&quote);
    message.value = BaseCost(U256::from(1));

    match assert_err!(orchestrator.submit(&quote, &message).await) {
        UnlockError::SubmissionRejected {
            tx_hash: Some(hash),
            ..
        } => {
            let mined = ctx.sim.l1_transactions();
            let dispatch = mined.iter().find(|tx| tx.tx_hash == hash).unwrap();
            assert!(!dispatch.success);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!assert_ok!(orchestrator.is_unlocked().await));
}

#[tokio::test]
async fn test_gas_price_rise_after_quote_is_absorbed_by_pinned_price() {
    let ctx = TestContext::setup(SimConfig::default()).await;
    let orchestrator = ctx.orchestrator(30);

    let quote = assert_ok!(orchestrator.quote(&GasBudget::default()).await);
    ctx.sim.set_gas_price(Domain::L1, quote.gas_price * 3);

    let message = orchestrator.prepare_message(&quote);
    let mut attempt = assert_ok!(orchestrator.submit(&quote, &message).await);
    assert_ok!(
        orchestrator
            .await_unlock(&mut attempt, &CancelToken::new())
            .await
    );

    // A fresh quote at the new price costs more
    let requote = assert_ok!(orchestrator.quote(&GasBudget::default()).await);
    assert!(requote.base_cost > quote.base_cost);
}

#[tokio::test]
async fn test_budget_below_bridge_minimum_is_rejected() {
    let ctx = TestContext::setup(SimConfig::default()).await;

    let err = assert_err!(
        ctx.orchestrator(30)
            .unlock(&GasBudget::new(350_000, 100), &CancelToken::new())
            .await
    );
    assert!(matches!(err, UnlockError::SubmissionRejected { .. }));
}

#[tokio::test]
async fn test_dispatch_never_included_is_rejected() {
    let ctx = TestContext::setup(SimConfig::default()).await;
    ctx.sim.stall_inclusion(Domain::L1, true);

    let err = assert_err!(
        ctx.orchestrator(30)
            .unlock(&GasBudget::default(), &CancelToken::new())
            .await
    );
    assert!(matches!(
        err,
        UnlockError::SubmissionRejected {
            tx_hash: Some(_),
            ..
        }
    ));
}

// ============================================================================
// Scenario C: misbound vault
// ============================================================================

#[tokio::test]
async fn test_scenario_c_misbound_vault_stays_locked() {
    let sim = SimNetwork::new(SimConfig::default());
    let deployer = deployer(&sim);

    let access_key = deployer.deploy_access_key().await.unwrap();
    // Bound to the raw L1 address instead of its alias
    let vault = deployer.deploy_vault(access_key).await.unwrap();
    let pair = LinkedPair {
        access_key,
        vault,
        unlocker: access_key,
    };
    assert!(!pair.is_correctly_bound());

    let orchestrator = orchestrator_for(&sim, &pair, 10);
    let err = assert_err!(
        orchestrator
            .unlock(&GasBudget::default(), &CancelToken::new())
            .await
    );

    assert!(matches!(err, UnlockError::UnlockPending { polls: 10, .. }));
    let failed = sim.failed_deliveries();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].target, vault);
    assert_eq!(failed[0].sender, vault_unlock::apply_l1_to_l2_alias(access_key));
    assert!(!assert_ok!(orchestrator.is_unlocked().await));
}

// ============================================================================
// Fee phase failures
// ============================================================================

#[tokio::test]
async fn test_oracle_revert_sends_no_transaction() {
    let ctx = TestContext::setup(SimConfig::default()).await;
    let before = ctx.sim.l1_transactions().len();
    ctx.sim.set_oracle_mode(OracleMode::Revert);

    let err = assert_err!(
        ctx.orchestrator(30)
            .unlock(&GasBudget::default(), &CancelToken::new())
            .await
    );
    assert!(matches!(err, UnlockError::FeeUnavailable { .. }));
    assert_eq!(ctx.sim.l1_transactions().len(), before);
}

#[tokio::test]
async fn test_zero_quote_sends_no_transaction() {
    let ctx = TestContext::setup(SimConfig::default()).await;
    let before = ctx.sim.l1_transactions().len();
    ctx.sim.set_oracle_mode(OracleMode::Zero);

    let err = assert_err!(
        ctx.orchestrator(30)
            .unlock(&GasBudget::default(), &CancelToken::new())
            .await
    );
    assert!(matches!(err, UnlockError::FeeUnavailable { .. }));
    assert_eq!(ctx.sim.l1_transactions().len(), before);
}

#[tokio::test]
async fn test_quote_is_stable_and_monotone() {
    let ctx = TestContext::setup(SimConfig::default()).await;
    let orchestrator = ctx.orchestrator(30);

    let a = assert_ok!(orchestrator.quote(&GasBudget::new(350_000, 800)).await);
    let b = assert_ok!(orchestrator.quote(&GasBudget::new(350_000, 800)).await);
    assert_eq!(a, b);

    let more_gas = assert_ok!(orchestrator.quote(&GasBudget::new(400_000, 800)).await);
    let more_pubdata = assert_ok!(orchestrator.quote(&GasBudget::new(350_000, 900)).await);
    assert!(more_gas.base_cost >= a.base_cost);
    assert!(more_pubdata.base_cost >= a.base_cost);
}

#[tokio::test]
async fn test_unadvertised_bridge_is_fee_unavailable() {
    let ctx = TestContext::setup(SimConfig {
        advertise_bridgehub: false,
        ..SimConfig::default()
    })
    .await;

    let result =
        UnlockOrchestrator::discover(ctx.sim.l1_client(), ctx.sim.l2_client(), &ctx.pair).await;
    assert!(matches!(result, Err(UnlockError::FeeUnavailable { .. })));
}

// ============================================================================
// Polling outcomes
// ============================================================================

#[tokio::test]
async fn test_timeout_is_pending_and_completes_later() {
    let ctx = TestContext::setup(SimConfig {
        relay_delay: 20,
        ..SimConfig::default()
    })
    .await;
    let orchestrator = ctx.orchestrator(5);

    let err = assert_err!(
        orchestrator
            .unlock(&GasBudget::default(), &CancelToken::new())
            .await
    );
    assert!(matches!(err, UnlockError::UnlockPending { polls: 5, .. }));
    assert!(err.may_still_complete());

    // The relay keeps going; a later query observes the unlock
    let mut unlocked = false;
    for _ in 0..20 {
        if assert_ok!(orchestrator.is_unlocked().await) {
            unlocked = true;
            break;
        }
    }
    assert!(unlocked);
}

#[tokio::test]
async fn test_halted_relay_resumes_on_second_run() {
    let ctx = TestContext::setup(SimConfig::default()).await;
    let orchestrator = ctx.orchestrator(5);
    ctx.sim.halt_relay();

    let quote = assert_ok!(orchestrator.quote(&GasBudget::default()).await);
    let message = orchestrator.prepare_message(&quote);
    let mut attempt = assert_ok!(orchestrator.submit(&quote, &message).await);
    let cancel = CancelToken::new();

    assert_err!(orchestrator.await_unlock(&mut attempt, &cancel).await);
    assert_eq!(attempt.poll_count, 5);

    ctx.sim.resume_relay();
    let receipt = assert_ok!(orchestrator.await_unlock(&mut attempt, &cancel).await);
    assert_eq!(receipt.polls, 1);
    assert_eq!(attempt.poll_count, 6);
}

#[tokio::test]
async fn test_cancel_stops_polling() {
    let ctx = TestContext::setup(SimConfig::default()).await;
    ctx.sim.halt_relay();

    let orchestrator = orchestrator_for(&ctx.sim, &ctx.pair, 10_000)
        .with_policy(PollPolicy::new(Duration::from_millis(20), 10_000));
    let cancel = CancelToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        orchestrator.unlock(&GasBudget::default(), &cancel),
    )
    .await
    .expect("cancellation should end polling promptly");

    match result {
        Err(UnlockError::Cancelled { polls, .. }) => assert!(polls >= 1 && polls < 10_000),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_before_polling_reads_nothing() {
    let ctx = TestContext::setup(SimConfig::default()).await;
    let orchestrator = ctx.orchestrator(30);

    let quote = assert_ok!(orchestrator.quote(&GasBudget::default()).await);
    let message = orchestrator.prepare_message(&quote);
    let mut attempt = assert_ok!(orchestrator.submit(&quote, &message).await);

    let cancel = CancelToken::new();
    cancel.cancel();
    let reads = ctx.sim.l2_reads();

    let err = assert_err!(orchestrator.await_unlock(&mut attempt, &cancel).await);
    assert!(matches!(err, UnlockError::Cancelled { polls: 0, .. }));
    assert_eq!(ctx.sim.l2_reads(), reads);
}

#[tokio::test]
async fn test_l2_outage_during_polling_is_rpc_unavailable() {
    let ctx = TestContext::setup(SimConfig::default()).await;
    let orchestrator = ctx.orchestrator(4);

    let quote = assert_ok!(orchestrator.quote(&GasBudget::default()).await);
    let message = orchestrator.prepare_message(&quote);
    let mut attempt = assert_ok!(orchestrator.submit(&quote, &message).await);

    ctx.sim.set_offline(Domain::L2, true);
    let err = assert_err!(
        orchestrator
            .await_unlock(&mut attempt, &CancelToken::new())
            .await
    );
    assert_eq!(attempt.poll_count, 4);
    assert!(matches!(
        err,
        UnlockError::RpcUnavailable {
            domain: Domain::L2,
            phase: UnlockPhase::Submitted,
            ..
        }
    ));
}

#[tokio::test]
async fn test_l1_outage_at_quote_is_rpc_unavailable() {
    let ctx = TestContext::setup(SimConfig::default()).await;
    ctx.sim.set_offline(Domain::L1, true);

    let err = assert_err!(ctx.orchestrator(30).quote(&GasBudget::default()).await);
    assert!(matches!(
        err,
        UnlockError::RpcUnavailable {
            domain: Domain::L1,
            ..
        }
    ));
}
