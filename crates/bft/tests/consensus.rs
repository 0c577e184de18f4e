//! Multi-node consensus tests.
//!
//! Four bookkeepers run in one thread. Broadcasts are delivered in FIFO
//! order to every other node; timers only fire when a test fires them.

use meridian_bft::{BftConfig, ConsensusMessage, ConsensusPayload, ConsensusService};
use meridian_core::{Action, OutboundMessage};
use meridian_mempool::{MempoolConfig, TxPool};
use meridian_types::genesis::{self, GENESIS_TIMESTAMP};
use meridian_types::test_utils::{sign_transaction, test_keypair, MemoryLedger};
use meridian_types::{
    account_program_hash, Block, Fixed64, Hash256, LedgerStore, Output, Transaction, UtxoInput,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing_test::traced_test;

const SEEDS: [u8; 4] = [1, 2, 3, 4];

struct Node {
    service: ConsensusService,
    ledger: Arc<MemoryLedger>,
    pool: Arc<TxPool>,
    committed: Vec<Arc<Block>>,
    requested: Vec<Hash256>,
}

struct Network {
    nodes: Vec<Node>,
    queue: VecDeque<(usize, ConsensusPayload)>,
    /// Nodes that neither send nor receive.
    silent: Vec<usize>,
}

fn start_time() -> Duration {
    Duration::from_secs(u64::from(GENESIS_TIMESTAMP) + 1_000)
}

impl Network {
    fn new() -> Self {
        let keys: Vec<_> = SEEDS.iter().map(|s| test_keypair(*s).public_key()).collect();
        let nodes = SEEDS
            .iter()
            .map(|seed| {
                let ledger = Arc::new(MemoryLedger::with_bookkeepers(keys.clone()));
                let pool = Arc::new(TxPool::new(MempoolConfig::default(), ledger.clone()));
                let mut service = ConsensusService::new(
                    test_keypair(*seed),
                    ledger.clone(),
                    pool.clone(),
                    BftConfig::default(),
                    u64::from(*seed),
                );
                service.set_time(start_time());
                Node {
                    service,
                    ledger,
                    pool,
                    committed: Vec::new(),
                    requested: Vec::new(),
                }
            })
            .collect();
        Self {
            nodes,
            queue: VecDeque::new(),
            silent: Vec::new(),
        }
    }

    fn start(&mut self) {
        for i in 0..self.nodes.len() {
            let actions = self.nodes[i].service.start();
            self.apply(i, actions);
        }
    }

    fn set_time(&mut self, now: Duration) {
        for node in &mut self.nodes {
            node.service.set_time(now);
        }
    }

    /// Position of the node with the given bookkeeper index.
    fn by_index(&self, index: usize) -> usize {
        self.nodes
            .iter()
            .position(|n| n.service.context().bookkeeper_index() == Some(index))
            .unwrap()
    }

    fn primary(&self) -> usize {
        self.nodes
            .iter()
            .position(|n| n.service.context().is_primary())
            .unwrap()
    }

    fn fire_timer(&mut self, node: usize) {
        let ctx = self.nodes[node].service.context();
        let (height, view) = (ctx.height(), ctx.view_number());
        let actions = self.nodes[node].service.on_timer(height, view);
        self.apply(node, actions);
    }

    fn apply(&mut self, from: usize, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Broadcast {
                    message: OutboundMessage::Consensus(payload),
                } => {
                    if !self.silent.contains(&from) {
                        self.queue.push_back((from, *payload));
                    }
                }
                Action::PersistBlock { block } => {
                    let node = &mut self.nodes[from];
                    node.ledger.persist_block(&block);
                    node.pool.clean_submitted(&block);
                    node.committed.push(block.clone());
                    let follow_up = node.service.on_block_persisted(&block);
                    self.apply(from, follow_up);
                }
                Action::RequestTransactions { request } => {
                    self.nodes[from].requested.extend(request.tx_hashes);
                }
                _ => {}
            }
        }
    }

    fn deliver_all(&mut self) {
        while let Some((from, payload)) = self.queue.pop_front() {
            for to in 0..self.nodes.len() {
                if to == from || self.silent.contains(&to) {
                    continue;
                }
                let actions = self.nodes[to].service.on_payload(&payload);
                self.apply(to, actions);
            }
        }
    }
}

/// A signed transfer spending a freshly funded output. Funding is applied
/// to every node's ledger so all of them accept the transfer.
fn funded_transfer(net: &Network) -> Transaction {
    let owner_key = test_keypair(50);
    let owner = account_program_hash(&owner_key.public_key());
    let utility = genesis::utility_token_id();

    let mut funding = None;
    for node in &net.nodes {
        funding = Some(node.ledger.fund(owner, utility, Fixed64::from_decimal(10)));
    }
    let funding = funding.unwrap();

    let recipient = account_program_hash(&test_keypair(51).public_key());
    let mut tx = Transaction::transfer_asset(
        vec![UtxoInput::new(funding.hash(), 0)],
        vec![Output::new(utility, Fixed64::from_decimal(9), recipient)],
    );
    sign_transaction(&mut tx, &owner_key);
    tx
}

#[traced_test]
#[test]
fn test_four_bookkeepers_commit_same_block() {
    let mut net = Network::new();
    net.start();

    let primary = net.primary();
    assert_eq!(net.nodes[primary].service.context().primary_index(), 1);

    net.set_time(start_time() + Duration::from_secs(6));
    net.fire_timer(primary);
    net.deliver_all();

    let hashes: Vec<_> = net
        .nodes
        .iter()
        .map(|n| {
            assert_eq!(n.committed.len(), 1, "every node commits height 1");
            n.committed[0].hash()
        })
        .collect();
    assert!(hashes.iter().all(|h| *h == hashes[0]));

    for node in &net.nodes {
        assert_eq!(node.ledger.current_height(), 1);
        assert_eq!(node.service.context().height(), 2);
        assert_eq!(node.service.context().view_number(), 0);
    }

    // Height 2, view 0: primary is (2 - 0) mod 4.
    let next_primary = net.by_index(2);
    assert!(net.nodes[next_primary].service.context().is_primary());
}

#[traced_test]
#[test]
fn test_consecutive_heights() {
    let mut net = Network::new();
    net.start();

    for height in 1..=3u64 {
        net.set_time(start_time() + Duration::from_secs(6 * height));
        let primary = net.primary();
        net.fire_timer(primary);
        net.deliver_all();
    }

    for node in &net.nodes {
        assert_eq!(node.committed.len(), 3);
        assert_eq!(node.ledger.current_height(), 3);
    }
    for height in 0..3 {
        let first = net.nodes[0].committed[height].hash();
        assert!(net.nodes.iter().all(|n| n.committed[height].hash() == first));
    }
}

#[traced_test]
#[test]
fn test_silent_primary_triggers_view_change() {
    let mut net = Network::new();
    net.start();

    let primary = net.primary();
    net.silent.push(primary);

    net.set_time(start_time() + Duration::from_secs(12));
    for node in 0..net.nodes.len() {
        if node != primary {
            net.fire_timer(node);
        }
    }
    net.deliver_all();

    for node in 0..net.nodes.len() {
        if node == primary {
            continue;
        }
        let ctx = net.nodes[node].service.context();
        assert_eq!(ctx.view_number(), 1);
        // Height 1, view 1: primary is (1 - 1) mod 4.
        assert_eq!(ctx.primary_index(), 0);
    }
    assert_eq!(net.nodes[primary].service.context().view_number(), 0);
}

#[traced_test]
#[test]
fn test_view_change_then_commit() {
    let mut net = Network::new();
    net.start();

    let silent = net.primary();
    net.silent.push(silent);

    net.set_time(start_time() + Duration::from_secs(12));
    for node in 0..net.nodes.len() {
        if node != silent {
            net.fire_timer(node);
        }
    }
    net.deliver_all();

    // Three live bookkeepers are enough for a quorum at view 1.
    let new_primary = net.by_index(0);
    assert_ne!(new_primary, silent);
    net.set_time(start_time() + Duration::from_secs(20));
    net.fire_timer(new_primary);
    net.deliver_all();

    for node in 0..net.nodes.len() {
        if node == silent {
            assert!(net.nodes[node].committed.is_empty());
        } else {
            assert_eq!(net.nodes[node].committed.len(), 1);
        }
    }
}

#[traced_test]
#[test]
fn test_backup_fetches_missing_transaction() {
    let mut net = Network::new();
    let tx = funded_transfer(&net);
    let tx_hash = tx.hash();
    net.start();

    let primary = net.primary();
    let lagging = (primary + 1) % SEEDS.len();
    for (i, node) in net.nodes.iter().enumerate() {
        if i != lagging {
            node.pool.append(tx.clone()).unwrap();
        }
    }

    net.set_time(start_time() + Duration::from_secs(6));
    net.fire_timer(primary);
    net.deliver_all();

    // The other two backups reached quorum with the primary.
    assert_eq!(net.nodes[lagging].requested, vec![tx_hash]);
    assert!(net.nodes[lagging].committed.is_empty());
    for (i, node) in net.nodes.iter().enumerate() {
        if i != lagging {
            assert_eq!(node.committed.len(), 1);
            assert_eq!(node.committed[0].transactions.len(), 2);
            assert_eq!(node.committed[0].transactions[1].hash(), tx_hash);
        }
    }

    // The transaction arrives; the lagging backup signs and, already
    // holding the others' signatures, commits.
    let pooled = net.nodes[lagging].pool.append(tx).unwrap();
    let actions = net.nodes[lagging].service.on_transaction(pooled);
    assert!(actions.iter().any(|a| matches!(
        a,
        Action::Broadcast { message: OutboundMessage::Consensus(p) }
            if matches!(p.message(), Ok(ConsensusMessage::PrepareResponse(_)))
    )));
    net.apply(lagging, actions);
    assert_eq!(net.nodes[lagging].committed.len(), 1);
    assert_eq!(net.nodes[lagging].committed[0].hash(), net.nodes[primary].committed[0].hash());
}
