//! End-to-end tests for the node state machine.
//!
//! The test plays the runner: it feeds events, persists blocks the node
//! asks to persist and feeds the result back as `BlockPersisted`.

use meridian_bft::BftConfig;
use meridian_core::{Action, Event, OutboundMessage, StateMachine, TimerId, TransactionStatus};
use meridian_mempool::MempoolConfig;
use meridian_messages::GetTransactionsRequest;
use meridian_node::NodeStateMachine;
use meridian_types::genesis::{self, GENESIS_TIMESTAMP};
use meridian_types::test_utils::{sign_transaction, test_keypair, MemoryLedger};
use meridian_types::{
    account_program_hash, Block, Fixed64, Hash256, LedgerStore, Output, Transaction, UtxoInput,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_test::traced_test;

fn start_time() -> Duration {
    Duration::from_secs(u64::from(GENESIS_TIMESTAMP) + 100)
}

/// A single-bookkeeper node and its ledger.
fn solo_node() -> (NodeStateMachine, Arc<MemoryLedger>) {
    let key = test_keypair(1);
    let ledger = Arc::new(MemoryLedger::with_bookkeepers(vec![key.public_key()]));
    let mut node = NodeStateMachine::new(
        key,
        ledger.clone(),
        MempoolConfig::default(),
        BftConfig::default(),
        7,
    );
    node.set_time(start_time());
    (node, ledger)
}

/// A funded output owned by test key 20.
fn fund(ledger: &MemoryLedger) -> UtxoInput {
    let owner = account_program_hash(&test_keypair(20).public_key());
    let tx = ledger.fund(owner, genesis::utility_token_id(), Fixed64::from_decimal(10));
    UtxoInput::new(tx.hash(), 0)
}

/// Signed transfer of `input` to test key `recipient`, paying a fee of `fee`.
fn transfer(input: UtxoInput, recipient: u8, fee: i64) -> Arc<Transaction> {
    let to = account_program_hash(&test_keypair(recipient).public_key());
    let mut tx = Transaction::transfer_asset(
        vec![input],
        vec![Output::new(
            genesis::utility_token_id(),
            Fixed64::from_decimal(10 - fee),
            to,
        )],
    );
    sign_transaction(&mut tx, &test_keypair(20));
    Arc::new(tx)
}

fn statuses(actions: &[Action]) -> Vec<(Hash256, TransactionStatus)> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::EmitTransactionStatus { tx_hash, status } => Some((*tx_hash, status.clone())),
            _ => None,
        })
        .collect()
}

fn gossiped(actions: &[Action]) -> Vec<Hash256> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Broadcast {
                message: OutboundMessage::TransactionGossip(gossip),
            } => Some(gossip.transaction().hash()),
            _ => None,
        })
        .collect()
}

fn persisted(actions: &[Action]) -> Option<Arc<Block>> {
    actions.iter().find_map(|a| match a {
        Action::PersistBlock { block } => Some(block.clone()),
        _ => None,
    })
}

#[traced_test]
#[test]
fn test_submitted_transaction_is_committed() {
    let (mut node, ledger) = solo_node();
    let tx = transfer(fund(&ledger), 30, 1);
    let tx_hash = tx.hash();

    let actions = node.start();
    assert!(matches!(
        actions[..],
        [Action::SetTimer {
            id: TimerId::Consensus { height: 1, view: 0 },
            ..
        }]
    ));

    let actions = node.handle(Event::SubmitTransaction { tx });
    assert_eq!(statuses(&actions), vec![(tx_hash, TransactionStatus::Pending)]);
    assert_eq!(gossiped(&actions), vec![tx_hash]);
    assert_eq!(node.pool().count(), 1);

    node.set_time(start_time() + Duration::from_secs(6));
    let actions = node.handle(Event::ConsensusTimer { height: 1, view: 0 });
    let block = persisted(&actions).expect("solo bookkeeper commits immediately");
    assert_eq!(block.height(), 1);
    assert_eq!(block.transactions.len(), 2);
    assert_eq!(block.transactions[1].hash(), tx_hash);

    ledger.persist_block(&block);
    let actions = node.handle(Event::BlockPersisted { block });
    assert_eq!(
        statuses(&actions),
        vec![(tx_hash, TransactionStatus::Committed { height: 1 })]
    );
    assert!(actions.iter().any(|a| matches!(
        a,
        Action::SetTimer {
            id: TimerId::Consensus { height: 2, view: 0 },
            ..
        }
    )));
    assert_eq!(node.pool().count(), 0);
    assert_eq!(ledger.current_height(), 1);
    assert_eq!(node.consensus().context().height(), 2);
}

#[traced_test]
#[test]
fn test_unsigned_transaction_is_rejected() {
    let (mut node, ledger) = solo_node();
    let to = account_program_hash(&test_keypair(30).public_key());
    let tx = Arc::new(Transaction::transfer_asset(
        vec![fund(&ledger)],
        vec![Output::new(
            genesis::utility_token_id(),
            Fixed64::from_decimal(9),
            to,
        )],
    ));
    let tx_hash = tx.hash();

    let actions = node.handle(Event::SubmitTransaction { tx });
    let reported = statuses(&actions);
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].0, tx_hash);
    assert!(matches!(reported[0].1, TransactionStatus::Rejected { .. }));
    assert!(gossiped(&actions).is_empty());
    assert_eq!(node.pool().count(), 0);
}

#[test]
fn test_conflicting_transaction_reports_eviction() {
    let (mut node, ledger) = solo_node();
    let input = fund(&ledger);
    let first = transfer(input, 30, 1);
    let second = transfer(input, 31, 2);
    let (first_hash, second_hash) = (first.hash(), second.hash());

    node.handle(Event::SubmitTransaction { tx: first });
    let actions = node.handle(Event::TransactionReceived { tx: second });

    assert_eq!(
        statuses(&actions),
        vec![
            (second_hash, TransactionStatus::Pending),
            (first_hash, TransactionStatus::Evicted { by: second_hash }),
        ]
    );
    assert!(!node.pool().contains(&first_hash));
    assert!(node.pool().contains(&second_hash));
}

#[test]
fn test_gossip_duplicate_is_dropped() {
    let (mut node, ledger) = solo_node();
    let tx = transfer(fund(&ledger), 30, 1);

    assert!(!node
        .handle(Event::TransactionReceived { tx: tx.clone() })
        .is_empty());
    assert!(node
        .handle(Event::TransactionReceived { tx: tx.clone() })
        .is_empty());

    // A local resubmission still gets an answer.
    let actions = node.handle(Event::SubmitTransaction { tx });
    assert!(matches!(
        statuses(&actions)[..],
        [(_, TransactionStatus::Rejected { .. })]
    ));
}

#[test]
fn test_transaction_request_is_answered_from_pool() {
    let (mut node, ledger) = solo_node();
    let tx = transfer(fund(&ledger), 30, 1);
    let tx_hash = tx.hash();
    node.handle(Event::SubmitTransaction { tx });

    let request = GetTransactionsRequest::new(1, vec![tx_hash, Hash256::of(b"unknown")]);
    let actions = node.handle(Event::TransactionsRequested { request });
    assert_eq!(gossiped(&actions), vec![tx_hash]);
}
