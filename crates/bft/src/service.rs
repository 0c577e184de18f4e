//! dBFT round driver.

use crate::config::BftConfig;
use crate::consensus_state::ConsensusState;
use crate::context::ConsensusContext;
use crate::provider::TransactionProvider;
use meridian_core::{Action, OutboundMessage, TimerId};
use meridian_messages::{
    BlockSignatures, ChangeView, ConsensusMessage, ConsensusPayload, GetTransactionsRequest,
    PrepareRequest, PrepareResponse, CONSENSUS_PAYLOAD_VERSION,
};
use meridian_types::{
    bookkeeper_address, Block, KeyPair, LedgerStore, Transaction, TransactionType,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, trace, warn};

/// Runs the dBFT protocol for one node.
///
/// # Round flow
///
/// 1. **Start / block persisted** → reset the context for the next height,
///    view 0, and arm the round timer
/// 2. **Timer (primary)** → build the proposal, sign its header, broadcast
///    a PrepareRequest
/// 3. **PrepareRequest (backup)** → check it, gather the transactions, sign
///    and broadcast a PrepareResponse
/// 4. **PrepareResponse / BlockSignatures** → collect header signatures
/// 5. **Quorum** → assemble the block, broadcast BlockSignatures, persist
/// 6. **Timer (no progress)** → ask for a view change; `M` matching
///    requests move everyone to the new view
///
/// The service is synchronous. Every handler returns the actions the runner
/// must perform; time comes from [`ConsensusService::set_time`].
pub struct ConsensusService {
    context: ConsensusContext,
    config: BftConfig,
    ledger: Arc<dyn LedgerStore>,
    pool: Arc<dyn TransactionProvider>,
    rng: ChaCha8Rng,

    /// Current time (set by runner before each handle call).
    now: Duration,

    /// When the current height's round started.
    block_received_at: Duration,
}

impl std::fmt::Debug for ConsensusService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusService")
            .field("context", &self.context)
            .field("config", &self.config)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

impl ConsensusService {
    /// Create a consensus service.
    ///
    /// `seed` drives the proposal nonces so that runs are reproducible.
    pub fn new(
        keypair: KeyPair,
        ledger: Arc<dyn LedgerStore>,
        pool: Arc<dyn TransactionProvider>,
        config: BftConfig,
        seed: u64,
    ) -> Self {
        Self {
            context: ConsensusContext::new(keypair),
            config,
            ledger,
            pool,
            rng: ChaCha8Rng::seed_from_u64(seed),
            now: Duration::ZERO,
            block_received_at: Duration::ZERO,
        }
    }

    pub fn context(&self) -> &ConsensusContext {
        &self.context
    }

    pub fn config(&self) -> &BftConfig {
        &self.config
    }

    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    fn now_secs(&self) -> u32 {
        u32::try_from(self.now.as_secs()).unwrap_or(u32::MAX)
    }

    fn timer_id(&self) -> TimerId {
        TimerId::Consensus {
            height: self.context.height,
            view: self.context.view_number,
        }
    }

    fn broadcast(payload: ConsensusPayload) -> Action {
        Action::Broadcast {
            message: OutboundMessage::Consensus(Box::new(payload)),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Round lifecycle
    // ═══════════════════════════════════════════════════════════════════════

    /// Begin consensus on the height after the ledger tip.
    pub fn start(&mut self) -> Vec<Action> {
        self.block_received_at = self.now;
        self.initialize_consensus(0)
    }

    /// A block reached the ledger; move on to the next height.
    #[instrument(skip(self, block), fields(height = block.height()))]
    pub fn on_block_persisted(&mut self, block: &Block) -> Vec<Action> {
        if block.height() < self.context.height {
            trace!(current = self.context.height, "Ignoring persisted block below current round");
            return vec![];
        }
        self.block_received_at = self.now;
        self.initialize_consensus(0)
    }

    fn initialize_consensus(&mut self, view: u8) -> Vec<Action> {
        if view == 0 {
            if let Err(e) = self.context.reset(self.ledger.as_ref()) {
                warn!(error = %e, "Cannot read bookkeepers, consensus paused");
                return vec![];
            }
        } else {
            self.context.change_view(view);
        }
        self.context.timestamp = self.now_secs();

        let Some(index) = self.context.bookkeeper_index else {
            debug!(height = self.context.height, "Not a bookkeeper, watching only");
            return vec![];
        };

        let duration = if self.context.is_primary() {
            let elapsed = self.now.saturating_sub(self.block_received_at);
            self.config.block_time.saturating_sub(elapsed)
        } else {
            self.config.timeout(u32::from(view) + 1)
        };

        info!(
            height = self.context.height,
            view = view,
            index = index,
            primary = self.context.primary_index,
            role = if self.context.is_primary() { "Primary" } else { "Backup" },
            "Initialized consensus round"
        );

        vec![Action::SetTimer {
            id: self.timer_id(),
            duration,
        }]
    }

    /// Round timeout. The primary proposes; anyone else, or a primary whose
    /// proposal went nowhere, asks for a view change.
    #[instrument(skip(self))]
    pub fn on_timer(&mut self, height: u32, view: u8) -> Vec<Action> {
        if height != self.context.height || view != self.context.view_number {
            trace!(
                current_height = self.context.height,
                current_view = self.context.view_number,
                "Stale consensus timer"
            );
            return vec![];
        }
        if self.context.bookkeeper_index.is_none()
            || self.context.state.has_flag(ConsensusState::BLOCK_SENT)
        {
            return vec![];
        }

        let state = self.context.state;
        if state.has_flag(ConsensusState::PRIMARY) && !state.has_flag(ConsensusState::REQUEST_SENT)
        {
            return self.send_prepare_request();
        }
        if state.has_flag(ConsensusState::PRIMARY) || state.has_flag(ConsensusState::BACKUP) {
            return self.request_change_view();
        }
        vec![]
    }

    fn send_prepare_request(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();

        if !self.context.state.has_flag(ConsensusState::SIGNATURE_SENT) {
            let prev_timestamp = match self.ledger.get_header(&self.context.prev_hash) {
                Ok(header) => header.timestamp,
                Err(e) => {
                    warn!(error = %e, "Cannot read previous header, skipping proposal");
                    return vec![Action::SetTimer {
                        id: self.timer_id(),
                        duration: self.config.block_time,
                    }];
                }
            };
            let timestamp = self.now_secs().max(prev_timestamp.saturating_add(1));
            let nonce: u64 = self.rng.gen();

            let bookkeeping = Arc::new(Transaction::bookkeeping(nonce));
            let mut transactions = vec![bookkeeping];
            transactions.extend(
                self.pool
                    .proposal_transactions()
                    .into_iter()
                    .filter(|tx| tx.tx_type() != TransactionType::BookKeeping),
            );
            let hashes = transactions.iter().map(|tx| tx.hash()).collect();

            self.context
                .set_proposal(timestamp, nonce, Default::default(), hashes);
            for tx in transactions {
                self.context.add_transaction(tx);
            }
            let next = self.context.compute_next_bookkeepers();
            self.context.set_next_bookkeepers(next);

            if self.context.sign_header().is_none() {
                warn!("Failed to sign proposal header");
                return vec![];
            }
            self.context.state.insert(ConsensusState::SIGNATURE_SENT);
        }

        self.context.state.insert(ConsensusState::REQUEST_SENT);
        info!(
            height = self.context.height,
            view = self.context.view_number,
            tx_count = self.context.transaction_hashes.len(),
            "Sending PrepareRequest"
        );

        if let Some(payload) = self.context.make_prepare_request() {
            actions.push(Self::broadcast(payload));
        }
        actions.extend(self.check_signatures());
        actions.push(Action::SetTimer {
            id: self.timer_id(),
            duration: self.config.timeout(u32::from(self.context.view_number) + 1),
        });
        actions
    }

    fn request_change_view(&mut self) -> Vec<Action> {
        self.context.state.insert(ConsensusState::VIEW_CHANGING);
        let Some(payload) = self.context.make_change_view() else {
            if self.context.bookkeeper_index.is_some() {
                warn!(height = self.context.height, "View numbers exhausted");
            }
            return vec![];
        };
        let expected = self
            .context
            .bookkeeper_index
            .and_then(|i| self.context.expected_view.get(i).copied())
            .unwrap_or(self.context.view_number);

        info!(
            height = self.context.height,
            view = self.context.view_number,
            new_view = expected,
            state = %self.context.state,
            "Requesting view change"
        );

        let mut actions = vec![
            Action::SetTimer {
                id: self.timer_id(),
                duration: self.config.timeout(u32::from(expected) + 1),
            },
            Self::broadcast(payload),
        ];
        actions.extend(self.check_expected_view(expected));
        actions
    }

    fn check_expected_view(&mut self, view: u8) -> Vec<Action> {
        if self.context.view_number == view {
            return vec![];
        }
        let agreeing = self
            .context
            .expected_view
            .iter()
            .filter(|v| **v == view)
            .count();
        if agreeing >= self.context.m() {
            return self.initialize_consensus(view);
        }
        vec![]
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Inbound messages
    // ═══════════════════════════════════════════════════════════════════════

    /// Handle a consensus payload from a peer.
    ///
    /// Payloads for another round or sender, with a bad signature, or for a
    /// stale view are dropped. ChangeView is accepted from any view.
    #[instrument(skip(self, payload), fields(
        height = payload.height,
        sender = payload.bookkeeper_index
    ))]
    pub fn on_payload(&mut self, payload: &ConsensusPayload) -> Vec<Action> {
        let ctx = &self.context;
        if ctx.bookkeeper_index.is_none() || ctx.state.has_flag(ConsensusState::BLOCK_SENT) {
            return vec![];
        }
        if payload.version != CONSENSUS_PAYLOAD_VERSION
            || payload.prev_hash != ctx.prev_hash
            || payload.height != ctx.height
        {
            debug!(
                current_height = ctx.height,
                "Dropping payload for another round"
            );
            return vec![];
        }

        let index = usize::from(payload.bookkeeper_index);
        if index >= ctx.bookkeepers.len() || Some(index) == ctx.bookkeeper_index {
            debug!("Dropping payload with invalid sender index");
            return vec![];
        }
        if payload.owner != ctx.bookkeepers[index] || !payload.verify() {
            debug!("Dropping payload with bad signature");
            return vec![];
        }

        let message = match payload.message() {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "Dropping undecodable payload");
                return vec![];
            }
        };
        if message.view_number() != ctx.view_number
            && !matches!(message, ConsensusMessage::ChangeView(_))
        {
            debug!(
                msg_type = %message.message_type(),
                msg_view = message.view_number(),
                current_view = ctx.view_number,
                "Dropping message for stale view"
            );
            return vec![];
        }

        match message {
            ConsensusMessage::ChangeView(msg) => self.on_change_view(index, msg),
            ConsensusMessage::PrepareRequest(msg) => {
                self.on_prepare_request(index, payload.timestamp, msg)
            }
            ConsensusMessage::PrepareResponse(msg) => self.on_prepare_response(index, msg),
            ConsensusMessage::BlockSignatures(msg) => self.on_block_signatures(msg),
        }
    }

    fn on_change_view(&mut self, index: usize, msg: ChangeView) -> Vec<Action> {
        let Some(expected) = self.context.expected_view.get_mut(index) else {
            return vec![];
        };
        if msg.new_view_number <= *expected {
            return vec![];
        }
        *expected = msg.new_view_number;
        debug!(
            sender = index,
            new_view = msg.new_view_number,
            "Recorded ChangeView"
        );
        self.check_expected_view(msg.new_view_number)
    }

    fn on_prepare_request(
        &mut self,
        index: usize,
        timestamp: u32,
        msg: PrepareRequest,
    ) -> Vec<Action> {
        if self.context.state.has_flag(ConsensusState::REQUEST_RECEIVED) {
            return vec![];
        }
        if index != self.context.primary_index {
            debug!(
                sender = index,
                primary = self.context.primary_index,
                "PrepareRequest from non-primary"
            );
            return vec![];
        }

        let prev_timestamp = match self.ledger.get_header(&self.context.prev_hash) {
            Ok(header) => header.timestamp,
            Err(e) => {
                warn!(error = %e, "Cannot read previous header, ignoring PrepareRequest");
                return vec![];
            }
        };
        let latest = u64::from(self.now_secs()) + self.config.max_timestamp_drift.as_secs();
        if timestamp <= prev_timestamp || u64::from(timestamp) > latest {
            debug!(timestamp, prev_timestamp, "PrepareRequest timestamp out of range");
            return vec![];
        }

        let bookkeeping_hash = msg.bookkeeping.hash();
        let distinct: HashSet<_> = msg.transaction_hashes.iter().collect();
        if msg.bookkeeping.tx_type() != TransactionType::BookKeeping
            || msg.transaction_hashes.first() != Some(&bookkeeping_hash)
            || distinct.len() != msg.transaction_hashes.len()
        {
            debug!("PrepareRequest with malformed transaction list");
            return vec![];
        }

        self.context.state.insert(ConsensusState::REQUEST_RECEIVED);
        self.context.set_proposal(
            timestamp,
            msg.nonce,
            msg.next_bookkeeper,
            msg.transaction_hashes,
        );
        if !self.context.verify_header_signature(index, &msg.signature) {
            debug!("PrepareRequest header signature invalid");
            self.context.discard_proposal();
            return vec![];
        }
        self.context.signatures[index] = Some(msg.signature);
        let dropped = self.context.retain_valid_signatures();
        if dropped > 0 {
            debug!(dropped, "Discarded early responses that do not match the proposal");
        }

        self.context.add_transaction(Arc::new(msg.bookkeeping));
        for hash in self.context.missing_transactions() {
            if let Some(tx) = self.pool.get_transaction(&hash) {
                self.context.add_transaction(tx);
            }
        }

        info!(
            height = self.context.height,
            view = self.context.view_number,
            tx_count = self.context.transaction_hashes.len(),
            "Received PrepareRequest"
        );

        let missing = self.context.missing_transactions();
        if missing.is_empty() {
            return self.on_proposal_complete();
        }
        debug!(missing = missing.len(), "Requesting proposal transactions");
        vec![Action::RequestTransactions {
            request: GetTransactionsRequest::new(self.context.height, missing),
        }]
    }

    /// Every proposal transaction is present: check the proposed bookkeeper
    /// change and sign.
    fn on_proposal_complete(&mut self) -> Vec<Action> {
        let next = self.context.compute_next_bookkeepers();
        if bookkeeper_address(&next) != self.context.next_bookkeeper {
            warn!(
                height = self.context.height,
                view = self.context.view_number,
                "Proposal next bookkeeper does not match its transactions"
            );
            return self.request_change_view();
        }
        self.context.next_bookkeepers = next;

        let mut actions = Vec::new();
        let state = self.context.state;
        if state.has_flag(ConsensusState::BACKUP) && !state.has_flag(ConsensusState::SIGNATURE_SENT)
        {
            let Some(signature) = self.context.sign_header() else {
                return vec![];
            };
            self.context.state.insert(ConsensusState::SIGNATURE_SENT);
            if let Some(payload) = self.context.make_prepare_response(signature) {
                debug!(height = self.context.height, "Sending PrepareResponse");
                actions.push(Self::broadcast(payload));
            }
        }
        actions.extend(self.check_signatures());
        actions
    }

    fn on_prepare_response(&mut self, index: usize, msg: PrepareResponse) -> Vec<Action> {
        if self.context.signatures[index].is_some() {
            return vec![];
        }
        // Before the request arrives there is no header to check against;
        // such signatures are verified when it does.
        if self.context.make_header().is_some()
            && !self.context.verify_header_signature(index, &msg.signature)
        {
            debug!(sender = index, "PrepareResponse signature invalid");
            return vec![];
        }
        self.context.signatures[index] = Some(msg.signature);
        debug!(
            sender = index,
            signatures = self.context.get_signatures_count(),
            "Recorded PrepareResponse"
        );
        self.check_signatures()
    }

    fn on_block_signatures(&mut self, msg: BlockSignatures) -> Vec<Action> {
        if self.context.make_header().is_none() {
            return vec![];
        }
        for (index, signature) in msg.signatures {
            let index = usize::from(index);
            match self.context.signatures.get(index) {
                Some(None) => {}
                _ => continue,
            }
            if self.context.verify_header_signature(index, &signature) {
                self.context.signatures[index] = Some(signature);
            }
        }
        self.check_signatures()
    }

    /// Fill in a proposal transaction that arrived after the PrepareRequest.
    ///
    /// The caller is expected to have admitted `tx` to the pool already.
    pub fn on_transaction(&mut self, tx: Arc<Transaction>) -> Vec<Action> {
        let state = self.context.state;
        if !state.has_flag(ConsensusState::BACKUP)
            || !state.has_flag(ConsensusState::REQUEST_RECEIVED)
            || state.has_flag(ConsensusState::SIGNATURE_SENT)
            || state.has_flag(ConsensusState::VIEW_CHANGING)
        {
            return vec![];
        }
        let hash = tx.hash();
        if self.context.transactions.contains_key(&hash) || !self.context.add_transaction(tx) {
            return vec![];
        }
        trace!(tx_hash = %hash, "Filled proposal transaction");
        if self.context.has_all_transactions() {
            return self.on_proposal_complete();
        }
        vec![]
    }

    /// Commit once `M` header signatures and every transaction are held.
    fn check_signatures(&mut self) -> Vec<Action> {
        if self.context.state.has_flag(ConsensusState::BLOCK_SENT)
            || self.context.get_signatures_count() < self.context.m()
            || !self.context.has_all_transactions()
        {
            return vec![];
        }
        let Some(block) = self.context.make_block() else {
            return vec![];
        };
        self.context.state.insert(ConsensusState::BLOCK_SENT);

        info!(
            height = block.height(),
            block_hash = %block.hash(),
            tx_count = block.transactions.len(),
            signatures = self.context.get_signatures_count(),
            "Block signed by quorum"
        );

        let mut actions = Vec::with_capacity(2);
        if let Some(payload) = self.context.make_block_signatures() {
            actions.push(Self::broadcast(payload));
        }
        actions.push(Action::PersistBlock {
            block: Arc::new(block),
        });
        actions
    }
}
