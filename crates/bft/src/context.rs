//! Per-height, per-view consensus bookkeeping.
//!
//! The context holds everything one round needs: who the bookkeepers are,
//! which of them is primary, the proposal under discussion and the header
//! signatures gathered for it. It builds every outgoing consensus payload
//! but decides nothing; [`ConsensusService`](crate::ConsensusService) drives
//! it.

use crate::consensus_state::ConsensusState;
use meridian_messages::{
    BlockSignatures, ChangeView, ConsensusMessage, ConsensusPayload, PrepareRequest,
    PrepareResponse, CONSENSUS_PAYLOAD_VERSION,
};
use meridian_types::{
    bookkeeper_address, compute_merkle_root, multisig_redeem_script, quorum_threshold,
    signature_redeem_script, signatures_parameter, Block, BlockHeader, BookKeeperAction, Hash256,
    KeyPair, LedgerError, LedgerStore, Program, ProgramHash, PublicKey, Signature, Transaction,
};
use std::collections::HashMap;
use std::sync::Arc;

pub const BLOCK_VERSION: u32 = 0;

pub struct ConsensusContext {
    pub(crate) state: ConsensusState,
    pub(crate) prev_hash: Hash256,
    pub(crate) height: u32,
    pub(crate) view_number: u8,
    pub(crate) bookkeepers: Vec<PublicKey>,
    pub(crate) next_bookkeepers: Vec<PublicKey>,
    /// Own position in `bookkeepers`; `None` for a watch-only node.
    pub(crate) bookkeeper_index: Option<usize>,
    pub(crate) primary_index: usize,
    pub(crate) timestamp: u32,
    pub(crate) nonce: u64,
    pub(crate) next_bookkeeper: ProgramHash,
    /// Proposal order, BookKeeping transaction first.
    pub(crate) transaction_hashes: Vec<Hash256>,
    pub(crate) transactions: HashMap<Hash256, Arc<Transaction>>,
    pub(crate) signatures: Vec<Option<Signature>>,
    pub(crate) expected_view: Vec<u8>,
    header: Option<BlockHeader>,
    keypair: KeyPair,
}

impl std::fmt::Debug for ConsensusContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusContext")
            .field("state", &self.state)
            .field("height", &self.height)
            .field("view_number", &self.view_number)
            .field("bookkeepers", &self.bookkeepers.len())
            .field("bookkeeper_index", &self.bookkeeper_index)
            .field("primary_index", &self.primary_index)
            .field("transactions", &self.transaction_hashes.len())
            .field("signatures", &self.get_signatures_count())
            .finish_non_exhaustive()
    }
}

impl ConsensusContext {
    pub fn new(keypair: KeyPair) -> Self {
        Self {
            state: ConsensusState::INITIAL,
            prev_hash: Hash256::ZERO,
            height: 0,
            view_number: 0,
            bookkeepers: Vec::new(),
            next_bookkeepers: Vec::new(),
            bookkeeper_index: None,
            primary_index: 0,
            timestamp: 0,
            nonce: 0,
            next_bookkeeper: ProgramHash::default(),
            transaction_hashes: Vec::new(),
            transactions: HashMap::new(),
            signatures: Vec::new(),
            expected_view: Vec::new(),
            header: None,
            keypair,
        }
    }

    /// Start view 0 of the height after the ledger tip.
    pub fn reset(&mut self, ledger: &dyn LedgerStore) -> Result<(), LedgerError> {
        let mut bookkeepers = ledger.bookkeepers()?;
        bookkeepers.sort();
        let owner = self.keypair.public_key();

        self.prev_hash = ledger.current_block_hash();
        self.height = ledger.current_height() + 1;
        self.bookkeeper_index = bookkeepers.iter().position(|k| *k == owner);
        self.signatures = vec![None; bookkeepers.len()];
        self.expected_view = vec![0; bookkeepers.len()];
        self.next_bookkeepers = bookkeepers.clone();
        self.bookkeepers = bookkeepers;
        self.change_view(0);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn state(&self) -> ConsensusState {
        self.state
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn view_number(&self) -> u8 {
        self.view_number
    }

    pub fn prev_hash(&self) -> Hash256 {
        self.prev_hash
    }

    pub fn bookkeepers(&self) -> &[PublicKey] {
        &self.bookkeepers
    }

    pub fn next_bookkeepers(&self) -> &[PublicKey] {
        &self.next_bookkeepers
    }

    pub fn bookkeeper_index(&self) -> Option<usize> {
        self.bookkeeper_index
    }

    pub fn primary_index(&self) -> usize {
        self.primary_index
    }

    pub fn owner(&self) -> PublicKey {
        self.keypair.public_key()
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn transaction_hashes(&self) -> &[Hash256] {
        &self.transaction_hashes
    }

    pub fn signatures(&self) -> &[Option<Signature>] {
        &self.signatures
    }

    pub fn expected_view(&self) -> &[u8] {
        &self.expected_view
    }

    pub fn is_primary(&self) -> bool {
        self.bookkeeper_index == Some(self.primary_index)
    }

    /// Signatures needed to commit a block or move to a new view.
    pub fn m(&self) -> usize {
        quorum_threshold(self.bookkeepers.len())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Round transitions
    // ═══════════════════════════════════════════════════════════════════════

    /// Move to view `view_number` at the same height.
    ///
    /// Everything tied to the old view is discarded: the proposal, its
    /// header and the signatures over it. Height, previous hash and the
    /// bookkeeper set stay.
    pub fn change_view(&mut self, view_number: u8) {
        self.view_number = view_number;
        self.state = ConsensusState::INITIAL;

        let n = self.bookkeepers.len();
        self.primary_index = if n == 0 {
            0
        } else {
            (i64::from(self.height) - i64::from(view_number)).rem_euclid(n as i64) as usize
        };
        match self.bookkeeper_index {
            Some(i) if i == self.primary_index => self.state.insert(ConsensusState::PRIMARY),
            Some(_) => self.state.insert(ConsensusState::BACKUP),
            None => {}
        }

        self.clear_proposal();
        self.signatures = vec![None; n];
        if let Some(slot) = self.bookkeeper_index.and_then(|i| self.expected_view.get_mut(i)) {
            *slot = view_number;
        }
    }

    /// Install the proposal for this view. Drops any cached header.
    pub(crate) fn set_proposal(
        &mut self,
        timestamp: u32,
        nonce: u64,
        next_bookkeeper: ProgramHash,
        transaction_hashes: Vec<Hash256>,
    ) {
        self.timestamp = timestamp;
        self.nonce = nonce;
        self.next_bookkeeper = next_bookkeeper;
        self.transaction_hashes = transaction_hashes;
        self.transactions.clear();
        self.header = None;
    }

    /// Fix the bookkeeper set that signs the block after this one.
    pub(crate) fn set_next_bookkeepers(&mut self, next_bookkeepers: Vec<PublicKey>) {
        self.next_bookkeeper = bookkeeper_address(&next_bookkeepers);
        self.next_bookkeepers = next_bookkeepers;
        self.header = None;
    }

    /// Forget a proposal that failed verification.
    pub(crate) fn discard_proposal(&mut self) {
        self.clear_proposal();
        self.state.remove(ConsensusState::REQUEST_RECEIVED);
    }

    fn clear_proposal(&mut self) {
        self.nonce = 0;
        self.next_bookkeeper = ProgramHash::default();
        self.transaction_hashes.clear();
        self.transactions.clear();
        self.header = None;
    }

    /// Record a proposal transaction. Returns `false` if the proposal does
    /// not name it.
    pub(crate) fn add_transaction(&mut self, tx: Arc<Transaction>) -> bool {
        let hash = tx.hash();
        if !self.transaction_hashes.contains(&hash) {
            return false;
        }
        self.transactions.insert(hash, tx);
        true
    }

    pub fn missing_transactions(&self) -> Vec<Hash256> {
        self.transaction_hashes
            .iter()
            .filter(|h| !self.transactions.contains_key(h))
            .copied()
            .collect()
    }

    pub fn has_all_transactions(&self) -> bool {
        !self.transaction_hashes.is_empty()
            && self
                .transaction_hashes
                .iter()
                .all(|h| self.transactions.contains_key(h))
    }

    /// Bookkeeper set after applying the proposal's BookKeeper transactions.
    pub fn compute_next_bookkeepers(&self) -> Vec<PublicKey> {
        let mut next = self.bookkeepers.clone();
        for tx in self.get_transaction_list() {
            match tx.bookkeeper_change() {
                Some((key, BookKeeperAction::Add)) if !next.contains(&key) => next.push(key),
                Some((key, BookKeeperAction::Sub)) => next.retain(|k| *k != key),
                _ => {}
            }
        }
        next.sort();
        next
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Signatures
    // ═══════════════════════════════════════════════════════════════════════

    pub fn get_signatures_count(&self) -> usize {
        self.signatures.iter().filter(|s| s.is_some()).count()
    }

    /// Sign the proposed header and store the signature in our own slot.
    pub(crate) fn sign_header(&mut self) -> Option<Signature> {
        let index = self.bookkeeper_index?;
        let header = self.make_header()?;
        let signature = self.keypair.sign(&header.unsigned_bytes());
        if let Some(slot) = self.signatures.get_mut(index) {
            *slot = Some(signature);
        }
        Some(signature)
    }

    /// Whether `signature` is bookkeeper `index`'s signature over the
    /// proposed header. `false` while there is no header.
    pub fn verify_header_signature(&mut self, index: usize, signature: &Signature) -> bool {
        let Some(key) = self.bookkeepers.get(index).copied() else {
            return false;
        };
        match self.make_header() {
            Some(header) => key.verify(&header.unsigned_bytes(), signature),
            None => false,
        }
    }

    /// Drop stored signatures that do not verify against the current header.
    pub(crate) fn retain_valid_signatures(&mut self) -> usize {
        let mut dropped = 0;
        for index in 0..self.signatures.len() {
            let Some(signature) = self.signatures[index] else {
                continue;
            };
            if !self.verify_header_signature(index, &signature) {
                self.signatures[index] = None;
                dropped += 1;
            }
        }
        dropped
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Builders
    // ═══════════════════════════════════════════════════════════════════════

    /// Header for the current proposal, or `None` before one is installed.
    /// Cached until the proposal or view changes.
    pub fn make_header(&mut self) -> Option<BlockHeader> {
        if self.transaction_hashes.is_empty() {
            return None;
        }
        if self.header.is_none() {
            self.header = Some(BlockHeader {
                version: BLOCK_VERSION,
                prev_block_hash: self.prev_hash,
                transactions_root: compute_merkle_root(&self.transaction_hashes),
                timestamp: self.timestamp,
                height: self.height,
                consensus_data: self.nonce,
                next_bookkeeper: self.next_bookkeeper,
                program: None,
            });
        }
        self.header.clone()
    }

    /// Wrap `message` in an envelope signed by this node. `None` for a
    /// watch-only node.
    pub fn make_payload(&self, message: &ConsensusMessage) -> Option<ConsensusPayload> {
        let index = u16::try_from(self.bookkeeper_index?).ok()?;
        let mut payload = ConsensusPayload {
            version: CONSENSUS_PAYLOAD_VERSION,
            prev_hash: self.prev_hash,
            height: self.height,
            bookkeeper_index: index,
            timestamp: self.timestamp,
            data: message.to_bytes(),
            owner: self.keypair.public_key(),
            signature: Signature::zero(),
        };
        payload.sign(&self.keypair);
        Some(payload)
    }

    /// Ask to move one view past the one this node currently expects.
    ///
    /// Returns `None` once the expected view is `u8::MAX`; the round can
    /// only end by a block arriving at that point.
    pub fn make_change_view(&mut self) -> Option<ConsensusPayload> {
        let index = self.bookkeeper_index?;
        let slot = self.expected_view.get_mut(index)?;
        let new_view_number = slot.checked_add(1)?;
        *slot = new_view_number;
        self.make_payload(&ConsensusMessage::ChangeView(ChangeView {
            view_number: self.view_number,
            new_view_number,
        }))
    }

    /// The primary's proposal. Requires the BookKeeping transaction and our
    /// own header signature.
    pub fn make_prepare_request(&self) -> Option<ConsensusPayload> {
        let signature = (*self.signatures.get(self.bookkeeper_index?)?)?;
        let bookkeeping = self.transactions.get(self.transaction_hashes.first()?)?;
        self.make_payload(&ConsensusMessage::PrepareRequest(PrepareRequest {
            view_number: self.view_number,
            nonce: self.nonce,
            next_bookkeeper: self.next_bookkeeper,
            transaction_hashes: self.transaction_hashes.clone(),
            bookkeeping: Transaction::clone(bookkeeping),
            signature,
        }))
    }

    pub fn make_prepare_response(&self, signature: Signature) -> Option<ConsensusPayload> {
        self.make_payload(&ConsensusMessage::PrepareResponse(PrepareResponse {
            view_number: self.view_number,
            signature,
        }))
    }

    /// Every header signature held, with its bookkeeper index.
    pub fn make_block_signatures(&self) -> Option<ConsensusPayload> {
        let signatures = self
            .signatures
            .iter()
            .enumerate()
            .filter_map(|(i, s)| Some((u16::try_from(i).ok()?, (*s)?)))
            .collect();
        self.make_payload(&ConsensusMessage::BlockSignatures(BlockSignatures {
            view_number: self.view_number,
            signatures,
        }))
    }

    /// The proposed block with the bookkeepers' multisig witness attached.
    ///
    /// `None` until the header exists, every transaction is present and at
    /// least `m()` signatures are held.
    pub fn make_block(&mut self) -> Option<Block> {
        if !self.has_all_transactions() || self.get_signatures_count() < self.m() {
            return None;
        }
        let mut header = self.make_header()?;

        let m = self.m();
        let signatures: Vec<Signature> = self.signatures.iter().flatten().take(m).copied().collect();
        let code = match self.bookkeepers.as_slice() {
            [single] => signature_redeem_script(single),
            many => multisig_redeem_script(m, many),
        };
        header.program = Some(Program::new(signatures_parameter(&signatures), code));

        let transactions = self
            .get_transaction_list()
            .into_iter()
            .map(|tx| Transaction::clone(&tx))
            .collect();
        Some(Block::new(header, transactions))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Introspection
    // ═══════════════════════════════════════════════════════════════════════

    /// Proposal transactions held so far, in proposal order.
    pub fn get_transaction_list(&self) -> Vec<Arc<Transaction>> {
        self.transaction_hashes
            .iter()
            .filter_map(|h| self.transactions.get(h).cloned())
            .collect()
    }

    pub fn get_state_detail(&self) -> String {
        format!(
            "height={} view={} state={} primary={} index={} signatures={}/{} transactions={}/{}",
            self.height,
            self.view_number,
            self.state,
            self.primary_index,
            self.bookkeeper_index
                .map_or_else(|| "-".to_string(), |i| i.to_string()),
            self.get_signatures_count(),
            self.m(),
            self.transactions.len(),
            self.transaction_hashes.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::test_utils::{test_keypair, MemoryLedger};

    fn keys(n: u8) -> Vec<KeyPair> {
        (1..=n).map(test_keypair).collect()
    }

    /// Context for `keys[own]` at height 1 over `n` bookkeepers.
    fn context(n: u8, own: usize) -> (ConsensusContext, Vec<KeyPair>) {
        let keys = keys(n);
        let ledger = MemoryLedger::with_bookkeepers(keys.iter().map(KeyPair::public_key).collect());
        let mut ctx = ConsensusContext::new(keys[own].clone());
        ctx.reset(&ledger).unwrap();
        (ctx, keys)
    }

    fn install_proposal(ctx: &mut ConsensusContext) -> Arc<Transaction> {
        let bookkeeping = Arc::new(Transaction::bookkeeping(77));
        ctx.set_proposal(1_700_000_000, 77, ProgramHash::default(), vec![bookkeeping.hash()]);
        ctx.add_transaction(Arc::clone(&bookkeeping));
        let next = ctx.compute_next_bookkeepers();
        ctx.set_next_bookkeepers(next);
        bookkeeping
    }

    #[test]
    fn test_m_thresholds() {
        for (n, m) in [(1u8, 1usize), (4, 3), (7, 5), (10, 7)] {
            let (ctx, _) = context(n, 0);
            assert_eq!(ctx.m(), m, "n = {n}");
        }
    }

    #[test]
    fn test_reset_targets_next_height() {
        let (ctx, keys) = context(4, 2);
        assert_eq!(ctx.height(), 1);
        assert_eq!(ctx.view_number(), 0);
        assert_eq!(ctx.primary_index(), 1);
        let mut sorted: Vec<PublicKey> = keys.iter().map(KeyPair::public_key).collect();
        sorted.sort();
        assert_eq!(ctx.bookkeepers(), sorted.as_slice());
        assert_eq!(ctx.bookkeeper_index(), sorted.iter().position(|k| *k == keys[2].public_key()));
    }

    #[test]
    fn test_watch_only_node_has_no_role() {
        let ledger = MemoryLedger::with_bookkeepers(keys(4).iter().map(KeyPair::public_key).collect());
        let mut ctx = ConsensusContext::new(test_keypair(99));
        ctx.reset(&ledger).unwrap();
        assert_eq!(ctx.bookkeeper_index(), None);
        assert!(ctx.state().is_initial());
        assert!(ctx.make_change_view().is_none());
    }

    #[test]
    fn test_change_view_clears_round_state() {
        let (mut ctx, _) = context(4, 0);
        install_proposal(&mut ctx);
        ctx.state.insert(ConsensusState::REQUEST_SENT | ConsensusState::SIGNATURE_SENT);
        ctx.signatures[0] = Some(Signature::zero());
        let height = ctx.height();
        let prev_hash = ctx.prev_hash();

        ctx.change_view(2);

        assert_eq!(ctx.view_number(), 2);
        assert!(!ctx.state().has_flag(ConsensusState::REQUEST_SENT));
        assert!(!ctx.state().has_flag(ConsensusState::SIGNATURE_SENT));
        assert_eq!(ctx.get_signatures_count(), 0);
        assert!(ctx.transaction_hashes().is_empty());
        assert!(ctx.make_header().is_none());
        assert_eq!(ctx.height(), height);
        assert_eq!(ctx.prev_hash(), prev_hash);
        assert_eq!(ctx.bookkeepers().len(), 4);
    }

    #[test]
    fn test_change_view_rotates_primary() {
        let (mut ctx, _) = context(4, 0);
        // height 1: view 0 -> 1, view 1 -> 0, view 2 -> 3
        assert_eq!(ctx.primary_index(), 1);
        ctx.change_view(1);
        assert_eq!(ctx.primary_index(), 0);
        ctx.change_view(2);
        assert_eq!(ctx.primary_index(), 3);
    }

    #[test]
    fn test_make_header_waits_for_proposal() {
        let (mut ctx, _) = context(4, 0);
        assert!(ctx.make_header().is_none());

        let bookkeeping = install_proposal(&mut ctx);
        let header = ctx.make_header().unwrap();
        assert_eq!(header.height, 1);
        assert_eq!(header.consensus_data, 77);
        assert_eq!(header.transactions_root, compute_merkle_root(&[bookkeeping.hash()]));
        assert_eq!(header.next_bookkeeper, bookkeeper_address(ctx.bookkeepers()));
    }

    #[test]
    fn test_make_change_view_increments_expected_view() {
        let (mut ctx, keys) = context(4, 3);
        let payload = ctx.make_change_view().unwrap();
        assert!(payload.verify());
        assert_eq!(payload.owner, keys[3].public_key());
        assert_eq!(payload.height, 1);
        match payload.message().unwrap() {
            ConsensusMessage::ChangeView(cv) => {
                assert_eq!(cv.view_number, 0);
                assert_eq!(cv.new_view_number, 1);
            }
            other => panic!("unexpected message {other:?}"),
        }
        let index = ctx.bookkeeper_index().unwrap();
        assert_eq!(ctx.expected_view()[index], 1);
    }

    #[test]
    fn test_make_change_view_stops_at_last_view() {
        let (mut ctx, _) = context(4, 0);
        let index = ctx.bookkeeper_index().unwrap();
        ctx.expected_view[index] = u8::MAX - 1;

        let payload = ctx.make_change_view().unwrap();
        match payload.message().unwrap() {
            ConsensusMessage::ChangeView(cv) => assert_eq!(cv.new_view_number, u8::MAX),
            other => panic!("unexpected message {other:?}"),
        }

        assert!(ctx.make_change_view().is_none());
        assert_eq!(ctx.expected_view()[index], u8::MAX);
    }

    #[test]
    fn test_signature_count_and_verification() {
        let (mut ctx, keys) = context(4, 0);
        install_proposal(&mut ctx);
        let own = ctx.sign_header().unwrap();
        let own_index = ctx.bookkeeper_index().unwrap();
        assert!(ctx.verify_header_signature(own_index, &own));
        assert_eq!(ctx.get_signatures_count(), 1);

        let header = ctx.make_header().unwrap();
        let other = ctx
            .bookkeepers()
            .iter()
            .position(|k| *k == keys[1].public_key())
            .unwrap();
        let sig = keys[1].sign(&header.unsigned_bytes());
        assert!(ctx.verify_header_signature(other, &sig));
        assert!(!ctx.verify_header_signature(other, &own));
    }

    #[test]
    fn test_retain_valid_signatures_drops_forgeries() {
        let (mut ctx, _) = context(4, 0);
        install_proposal(&mut ctx);
        ctx.sign_header().unwrap();
        let forged = (0..4).find(|i| Some(*i) != ctx.bookkeeper_index()).unwrap();
        ctx.signatures[forged] = Some(Signature::zero());
        assert_eq!(ctx.retain_valid_signatures(), 1);
        assert_eq!(ctx.get_signatures_count(), 1);
    }

    #[test]
    fn test_make_block_needs_quorum() {
        let (mut ctx, keys) = context(4, 0);
        install_proposal(&mut ctx);
        ctx.sign_header().unwrap();
        assert!(ctx.make_block().is_none());

        let header = ctx.make_header().unwrap();
        for key in &keys[1..3] {
            let index = ctx.bookkeepers().iter().position(|k| *k == key.public_key()).unwrap();
            ctx.signatures[index] = Some(key.sign(&header.unsigned_bytes()));
        }
        let block = ctx.make_block().unwrap();
        assert_eq!(block.hash(), header.hash());
        assert_eq!(block.transactions.len(), 1);
        let program = block.header.program.as_ref().unwrap();
        assert_eq!(program.code, multisig_redeem_script(3, ctx.bookkeepers()));
    }

    #[test]
    fn test_block_signatures_carry_indices() {
        let (mut ctx, _) = context(4, 2);
        install_proposal(&mut ctx);
        ctx.sign_header().unwrap();
        let payload = ctx.make_block_signatures().unwrap();
        match payload.message().unwrap() {
            ConsensusMessage::BlockSignatures(msg) => {
                assert_eq!(msg.signatures.len(), 1);
                assert_eq!(usize::from(msg.signatures[0].0), ctx.bookkeeper_index().unwrap());
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_next_bookkeepers_apply_changes() {
        let (mut ctx, _) = context(4, 0);
        let removed = ctx.bookkeepers()[0];
        let added = test_keypair(50).public_key();
        let issuer = test_keypair(51).public_key();
        let add = Arc::new(Transaction::bookkeeper(added, BookKeeperAction::Add, vec![], issuer));
        let sub = Arc::new(Transaction::bookkeeper(removed, BookKeeperAction::Sub, vec![], issuer));
        let bookkeeping = Arc::new(Transaction::bookkeeping(1));
        ctx.set_proposal(
            0,
            1,
            ProgramHash::default(),
            vec![bookkeeping.hash(), add.hash(), sub.hash()],
        );
        for tx in [bookkeeping, add, sub] {
            assert!(ctx.add_transaction(tx));
        }
        let next = ctx.compute_next_bookkeepers();
        assert_eq!(next.len(), 4);
        assert!(next.contains(&added));
        assert!(!next.contains(&removed));
    }

    #[test]
    fn test_state_detail_mentions_round() {
        let (ctx, _) = context(4, 1);
        let detail = ctx.get_state_detail();
        assert!(detail.contains("height=1"));
        assert!(detail.contains("view=0"));
        assert!(detail.contains("signatures=0/3"));
    }
}
