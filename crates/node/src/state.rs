//! Node state machine.

use meridian_bft::{BftConfig, ConsensusService};
use meridian_core::{Action, Event, OutboundMessage, StateMachine, TransactionStatus};
use meridian_mempool::{ErrCode, MempoolConfig, TxPool};
use meridian_messages::{GetTransactionsRequest, TransactionGossip};
use meridian_types::{Block, Hash256, KeyPair, LedgerStore, Transaction, TransactionType};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, trace};

/// Combined node state machine.
///
/// Owns the transaction pool and the consensus service and routes every
/// event to one or both. Both read the same ledger; the runner writes it
/// when it executes `Action::PersistBlock`.
pub struct NodeStateMachine {
    ledger: Arc<dyn LedgerStore>,

    /// Shared with consensus, which reads proposal candidates from it.
    pool: Arc<TxPool>,

    consensus: ConsensusService,

    /// Current time.
    now: Duration,
}

impl std::fmt::Debug for NodeStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStateMachine")
            .field("pool_size", &self.pool.count())
            .field("consensus", &self.consensus)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

impl NodeStateMachine {
    /// Create a node state machine.
    ///
    /// # Arguments
    ///
    /// * `signing_key` - Signs consensus payloads; the node takes part in
    ///   consensus only if its public key is a current bookkeeper
    /// * `ledger` - Committed chain state
    /// * `seed` - Seeds consensus nonces
    pub fn new(
        signing_key: KeyPair,
        ledger: Arc<dyn LedgerStore>,
        mempool_config: MempoolConfig,
        bft_config: BftConfig,
        seed: u64,
    ) -> Self {
        let pool = Arc::new(TxPool::new(mempool_config, ledger.clone()));
        let consensus =
            ConsensusService::new(signing_key, ledger.clone(), pool.clone(), bft_config, seed);
        Self {
            ledger,
            pool,
            consensus,
            now: Duration::ZERO,
        }
    }

    pub fn pool(&self) -> &Arc<TxPool> {
        &self.pool
    }

    pub fn consensus(&self) -> &ConsensusService {
        &self.consensus
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerStore> {
        &self.ledger
    }

    /// Start consensus on top of the ledger tip.
    ///
    /// Returns the first round timer.
    pub fn start(&mut self) -> Vec<Action> {
        info!(height = self.ledger.current_height(), "Starting node");
        self.consensus.start()
    }

    /// Admit a transaction to the pool and relay it.
    ///
    /// Duplicates arriving by gossip are dropped silently; a local
    /// submission is always answered with a status.
    #[instrument(skip(self, tx), fields(tx_hash = %tx.hash()))]
    fn on_transaction(&mut self, tx: Arc<Transaction>, local: bool) -> Vec<Action> {
        let hash = tx.hash();
        let mut claimed: Vec<Hash256> = tx
            .utxo_inputs()
            .iter()
            .filter_map(|input| self.pool.spent_by(input))
            .collect();
        claimed.sort();
        claimed.dedup();

        let pooled = match self.pool.append(Arc::unwrap_or_clone(tx)) {
            Ok(pooled) => pooled,
            Err(ErrCode::DuplicatedTx) if !local => {
                trace!("Already pooled");
                return vec![];
            }
            Err(e) => {
                debug!(error = %e, "Transaction rejected");
                return vec![Action::EmitTransactionStatus {
                    tx_hash: hash,
                    status: TransactionStatus::Rejected {
                        reason: e.to_string(),
                    },
                }];
            }
        };

        let mut actions = vec![
            Action::Broadcast {
                message: OutboundMessage::TransactionGossip(Box::new(TransactionGossip::new(
                    pooled.clone(),
                ))),
            },
            Action::EmitTransactionStatus {
                tx_hash: hash,
                status: TransactionStatus::Pending,
            },
        ];
        for victim in claimed {
            if victim != hash && !self.pool.contains(&victim) {
                actions.push(Action::EmitTransactionStatus {
                    tx_hash: victim,
                    status: TransactionStatus::Evicted { by: hash },
                });
            }
        }
        actions.extend(self.consensus.on_transaction(pooled));
        actions
    }

    /// Answer a peer's request with every transaction we hold.
    fn on_transactions_requested(&self, request: &GetTransactionsRequest) -> Vec<Action> {
        let proposal = self.consensus.context().get_transaction_list();
        let mut actions = Vec::new();
        for hash in &request.tx_hashes {
            let found = self
                .pool
                .get(hash)
                .or_else(|| proposal.iter().find(|tx| tx.hash() == *hash).cloned());
            match found {
                Some(tx) => actions.push(Action::Broadcast {
                    message: OutboundMessage::TransactionGossip(Box::new(TransactionGossip::new(
                        tx,
                    ))),
                }),
                None => trace!(tx_hash = %hash, "Requested transaction not held"),
            }
        }
        debug!(
            requested = request.count(),
            answered = actions.len(),
            "Answered transaction request"
        );
        actions
    }

    /// A block is on chain: drop what it settled, report commits and move
    /// consensus to the next height.
    #[instrument(skip(self, block), fields(height = block.height(), block_hash = %block.hash()))]
    fn on_block_persisted(&mut self, block: &Block) -> Vec<Action> {
        self.pool.clean_submitted(block);

        let height = block.height();
        let mut actions: Vec<Action> = block
            .transactions
            .iter()
            .filter(|tx| tx.tx_type() != TransactionType::BookKeeping)
            .map(|tx| Action::EmitTransactionStatus {
                tx_hash: tx.hash(),
                status: TransactionStatus::Committed { height },
            })
            .collect();
        info!(
            committed = actions.len(),
            pool_size = self.pool.count(),
            "Block persisted"
        );

        actions.extend(self.consensus.on_block_persisted(block));
        actions
    }
}

impl StateMachine for NodeStateMachine {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        trace!(event = event.type_name(), "Handling event");
        match event {
            Event::ConsensusTimer { height, view } => self.consensus.on_timer(height, view),

            Event::ConsensusPayloadReceived { payload } => self.consensus.on_payload(&payload),

            Event::TransactionReceived { tx } => self.on_transaction(tx, false),

            Event::SubmitTransaction { tx } => self.on_transaction(tx, true),

            Event::TransactionsRequested { request } => self.on_transactions_requested(&request),

            Event::BlockPersisted { block } => self.on_block_persisted(&block),
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
        self.consensus.set_time(now);
    }

    fn now(&self) -> Duration {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::test_utils::{test_keypair, MemoryLedger};

    fn make_node(seed: u8, bookkeepers: &[u8]) -> NodeStateMachine {
        let keys = bookkeepers
            .iter()
            .map(|s| test_keypair(*s).public_key())
            .collect();
        let ledger = Arc::new(MemoryLedger::with_bookkeepers(keys));
        NodeStateMachine::new(
            test_keypair(seed),
            ledger,
            MempoolConfig::default(),
            BftConfig::default(),
            u64::from(seed),
        )
    }

    #[test]
    fn test_start_arms_round_timer() {
        let mut node = make_node(1, &[1]);
        let actions = node.start();
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], Action::SetTimer { .. }));
        assert_eq!(node.consensus().context().height(), 1);
    }

    #[test]
    fn test_set_time_reaches_consensus() {
        let mut node = make_node(1, &[1]);
        node.set_time(Duration::from_secs(42));
        assert_eq!(node.now(), Duration::from_secs(42));
        assert_eq!(node.consensus().now(), Duration::from_secs(42));
    }

    #[test]
    fn test_unknown_request_yields_nothing() {
        let mut node = make_node(1, &[1]);
        let request = GetTransactionsRequest::new(1, vec![Hash256::of(b"missing")]);
        assert!(node
            .handle(Event::TransactionsRequested { request })
            .is_empty());
    }
}
