//! UTXO transactions.

use crate::asset::Asset;
use crate::codec::{write_list, CodecError, Reader, Writer};
use crate::crypto::PublicKey;
use crate::fixed::Fixed64;
use crate::genesis;
use crate::hash::{to_code_hash, Hash256, ProgramHash};
use crate::ledger::{LedgerError, LedgerStore};
use crate::payload::{BookKeeperAction, DeployCode, Payload, TransactionType};
use crate::script::{signature_redeem_script, Program};
use crate::utxo::{Attribute, AttributeUsage, Output, UtxoInput};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;
use thiserror::Error;

/// Per-asset amounts keyed by asset id.
pub type AssetAmounts = BTreeMap<Hash256, Fixed64>;

/// Errors from queries that consult the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("output index {index} out of range for transaction {tx}")]
    OutputIndexOutOfRange { tx: Hash256, index: u16 },

    #[error("asset {0} is not registered by a RegisterAsset transaction")]
    NotRegisterAsset(Hash256),

    #[error("script attribute does not hold a program hash")]
    InvalidScriptAttribute,

    #[error("negative network fee {0}")]
    NegativeNetworkFee(Fixed64),
}

/// A transaction plus lazily computed caches.
///
/// Every field that feeds the hash is private and fixed at construction;
/// [`Transaction::set_programs`] is the only mutation and programs are not
/// hashed.
pub struct Transaction {
    payload_version: u8,
    payload: Payload,
    attributes: Vec<Attribute>,
    utxo_inputs: Vec<UtxoInput>,
    outputs: Vec<Output>,
    system_fee: Fixed64,
    programs: Vec<Program>,

    hash: OnceLock<Hash256>,
    references: OnceLock<Vec<Output>>,
}

// Caches are recomputed on demand
impl Clone for Transaction {
    fn clone(&self) -> Self {
        Self {
            payload_version: self.payload_version,
            payload: self.payload.clone(),
            attributes: self.attributes.clone(),
            utxo_inputs: self.utxo_inputs.clone(),
            outputs: self.outputs.clone(),
            system_fee: self.system_fee,
            programs: self.programs.clone(),
            hash: OnceLock::new(),
            references: OnceLock::new(),
        }
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash() && self.programs == other.programs
    }
}

impl Eq for Transaction {}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("hash", &self.hash())
            .field("tx_type", &self.tx_type())
            .field("inputs", &self.utxo_inputs)
            .field("outputs", &self.outputs)
            .field("system_fee", &self.system_fee)
            .finish_non_exhaustive()
    }
}

impl Transaction {
    pub fn new(
        payload: Payload,
        attributes: Vec<Attribute>,
        utxo_inputs: Vec<UtxoInput>,
        outputs: Vec<Output>,
        system_fee: Fixed64,
    ) -> Self {
        Self {
            payload_version: 0,
            payload,
            attributes,
            utxo_inputs,
            outputs,
            system_fee,
            programs: Vec::new(),
            hash: OnceLock::new(),
            references: OnceLock::new(),
        }
    }

    // ─── Constructors per payload type ───────────────────────────────────

    pub fn bookkeeping(nonce: u64) -> Self {
        Self::new(
            Payload::BookKeeping { nonce },
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Fixed64::ZERO,
        )
    }

    pub fn register_asset(
        asset: Asset,
        amount: Fixed64,
        issuer: PublicKey,
        controller: ProgramHash,
    ) -> Self {
        Self::new(
            Payload::RegisterAsset {
                asset,
                amount,
                issuer,
                controller,
            },
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Fixed64::ZERO,
        )
    }

    pub fn issue_asset(outputs: Vec<Output>) -> Self {
        Self::new(
            Payload::IssueAsset,
            Vec::new(),
            Vec::new(),
            outputs,
            Fixed64::ZERO,
        )
    }

    pub fn transfer_asset(utxo_inputs: Vec<UtxoInput>, outputs: Vec<Output>) -> Self {
        Self::new(
            Payload::TransferAsset,
            Vec::new(),
            utxo_inputs,
            outputs,
            Fixed64::ZERO,
        )
    }

    pub fn bookkeeper(
        pub_key: PublicKey,
        action: BookKeeperAction,
        cert: Vec<u8>,
        issuer: PublicKey,
    ) -> Self {
        Self::new(
            Payload::BookKeeper {
                pub_key,
                action,
                cert,
                issuer,
            },
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Fixed64::ZERO,
        )
    }

    pub fn claim(claims: Vec<UtxoInput>, outputs: Vec<Output>) -> Self {
        Self::new(
            Payload::Claim { claims },
            Vec::new(),
            Vec::new(),
            outputs,
            Fixed64::ZERO,
        )
    }

    pub fn enrollment(pub_key: PublicKey) -> Self {
        Self::new(
            Payload::Enrollment { pub_key },
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Fixed64::ZERO,
        )
    }

    pub fn vote(pub_keys: Vec<PublicKey>, account: ProgramHash) -> Self {
        Self::new(
            Payload::Vote { pub_keys, account },
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Fixed64::ZERO,
        )
    }

    pub fn data_file(ipfs_path: String, filename: String, note: String, issuer: PublicKey) -> Self {
        Self::new(
            Payload::DataFile {
                ipfs_path,
                filename,
                note,
                issuer,
            },
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Fixed64::ZERO,
        )
    }

    pub fn record(record_type: String, record_data: Vec<u8>) -> Self {
        Self::new(
            Payload::Record {
                record_type,
                record_data,
            },
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Fixed64::ZERO,
        )
    }

    pub fn deploy(code: DeployCode) -> Self {
        Self::new(
            Payload::Deploy(Box::new(code)),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Fixed64::ZERO,
        )
    }

    pub fn invoke(code: Vec<u8>, gas_limit: Fixed64) -> Self {
        Self::new(
            Payload::Invoke { code, gas_limit },
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Fixed64::ZERO,
        )
    }

    /// Replace the attributes before the transaction is shared.
    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = attributes;
        self.reset_caches();
        self
    }

    pub fn with_system_fee(mut self, system_fee: Fixed64) -> Self {
        self.system_fee = system_fee;
        self.reset_caches();
        self
    }

    pub fn with_programs(mut self, programs: Vec<Program>) -> Self {
        self.programs = programs;
        self
    }

    fn reset_caches(&mut self) {
        self.hash = OnceLock::new();
        self.references = OnceLock::new();
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn tx_type(&self) -> TransactionType {
        self.payload.tx_type()
    }

    pub fn payload_version(&self) -> u8 {
        self.payload_version
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn utxo_inputs(&self) -> &[UtxoInput] {
        &self.utxo_inputs
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn system_fee(&self) -> Fixed64 {
        self.system_fee
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    /// Attach witnesses. Does not change the hash.
    pub fn set_programs(&mut self, programs: Vec<Program>) {
        self.programs = programs;
    }

    /// Double SHA-256 of the unsigned serialization, cached.
    pub fn hash(&self) -> Hash256 {
        *self
            .hash
            .get_or_init(|| Hash256::of(&self.unsigned_bytes()))
    }

    /// Bytes a witness signs.
    pub fn hash_data(&self) -> Vec<u8> {
        self.unsigned_bytes()
    }

    // ─── Codec ───────────────────────────────────────────────────────────

    pub fn encode_unsigned(&self, w: &mut Writer) {
        w.write_u8(self.tx_type() as u8);
        w.write_u8(self.payload_version);
        self.payload.encode(w);
        write_list(w, &self.attributes, |a, w| a.encode(w));
        write_list(w, &self.utxo_inputs, |i, w| i.encode(w));
        write_list(w, &self.outputs, |o, w| o.encode(w));
        self.system_fee.encode(w);
    }

    pub fn unsigned_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        self.encode_unsigned(&mut w);
        w.into_bytes()
    }

    pub fn encode(&self, w: &mut Writer) {
        self.encode_unsigned(w);
        write_list(w, &self.programs, |p, w| p.encode(w));
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        self.encode(&mut w);
        w.into_bytes()
    }

    /// Parse the unsigned form; programs are left empty.
    pub fn decode_unsigned(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let tx_type = TransactionType::from_u8(r.read_u8()?)?;
        let payload_version = r.read_u8()?;
        let payload = Payload::decode(tx_type, r)?;
        let attributes = r.read_list(Attribute::decode)?;
        let utxo_inputs = r.read_list(UtxoInput::decode)?;
        let outputs = r.read_list(Output::decode)?;
        let system_fee = Fixed64::decode(r)?;
        let mut tx = Self::new(payload, attributes, utxo_inputs, outputs, system_fee);
        tx.payload_version = payload_version;
        Ok(tx)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let mut tx = Self::decode_unsigned(r)?;
        tx.programs = r.read_list(Program::decode)?;
        Ok(tx)
    }

    /// Decode a complete buffer, rejecting trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes);
        let tx = Self::decode(&mut r)?;
        r.finish()?;
        Ok(tx)
    }

    // ─── Ledger-backed queries ───────────────────────────────────────────

    /// Outputs spent by this transaction's inputs, in input order.
    ///
    /// Memoized on success only, so a transient ledger failure can be retried.
    pub fn references(&self, ledger: &dyn LedgerStore) -> Result<&[Output], TransactionError> {
        if let Some(cached) = self.references.get() {
            return Ok(cached);
        }
        let resolved = self
            .utxo_inputs
            .iter()
            .map(|input| resolve_output(ledger, input))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.references.get_or_init(|| resolved))
    }

    /// Sum of output values per asset.
    pub fn merged_outputs(&self) -> AssetAmounts {
        merge(self.outputs.iter())
    }

    /// Sum of referenced values per asset.
    pub fn merged_references(
        &self,
        ledger: &dyn LedgerStore,
    ) -> Result<AssetAmounts, TransactionError> {
        Ok(merge(self.references(ledger)?.iter()))
    }

    /// Per-asset `inputs - outputs`.
    pub fn transaction_results(
        &self,
        ledger: &dyn LedgerStore,
    ) -> Result<AssetAmounts, TransactionError> {
        let mut results = self.merged_references(ledger)?;
        for (asset, value) in self.merged_outputs() {
            *results.entry(asset).or_default() -= value;
        }
        Ok(results)
    }

    /// Utility-asset surplus left after outputs and system fee.
    pub fn network_fee(
        &self,
        ledger: &dyn LedgerStore,
        utility_asset: &Hash256,
    ) -> Result<Fixed64, TransactionError> {
        if matches!(
            self.tx_type(),
            TransactionType::BookKeeping | TransactionType::Claim
        ) || self.hash() == genesis::system_issue_id()
        {
            return Ok(Fixed64::ZERO);
        }

        let input: Fixed64 = self
            .references(ledger)?
            .iter()
            .filter(|o| o.asset_id == *utility_asset)
            .map(|o| o.value)
            .sum();
        let output: Fixed64 = self
            .outputs
            .iter()
            .filter(|o| o.asset_id == *utility_asset)
            .map(|o| o.value)
            .sum();

        let fee = input - output - self.system_fee;
        if fee.is_negative() {
            return Err(TransactionError::NegativeNetworkFee(fee));
        }
        Ok(fee)
    }

    /// Sorted, de-duplicated program hashes whose witnesses must be present.
    pub fn program_hashes(
        &self,
        ledger: &dyn LedgerStore,
    ) -> Result<Vec<ProgramHash>, TransactionError> {
        let mut hashes = BTreeSet::new();

        for output in self.references(ledger)? {
            hashes.insert(output.program_hash);
        }

        for attribute in &self.attributes {
            if attribute.usage == AttributeUsage::Script {
                let hash = ProgramHash::from_slice(&attribute.data)
                    .map_err(|_| TransactionError::InvalidScriptAttribute)?;
                hashes.insert(hash);
            }
        }

        match &self.payload {
            Payload::RegisterAsset { issuer, .. }
            | Payload::DataFile { issuer, .. }
            | Payload::BookKeeper { issuer, .. } => {
                hashes.insert(to_code_hash(&signature_redeem_script(issuer)));
            }
            Payload::IssueAsset => {
                for asset_id in self.merged_outputs().keys() {
                    if genesis::is_native_asset(asset_id) {
                        continue;
                    }
                    let registration = ledger.get_transaction(asset_id)?;
                    match registration.payload() {
                        Payload::RegisterAsset { controller, .. } => {
                            hashes.insert(*controller);
                        }
                        _ => return Err(TransactionError::NotRegisterAsset(*asset_id)),
                    }
                }
            }
            Payload::Claim { claims } => {
                for claim in claims {
                    hashes.insert(resolve_output(ledger, claim)?.program_hash);
                }
            }
            Payload::Vote { account, .. } => {
                hashes.insert(*account);
            }
            _ => {}
        }

        Ok(hashes.into_iter().collect())
    }

    /// Bookkeeper key changes carried by this transaction, if any.
    pub fn bookkeeper_change(&self) -> Option<(PublicKey, BookKeeperAction)> {
        match &self.payload {
            Payload::BookKeeper {
                pub_key, action, ..
            } => Some((*pub_key, *action)),
            _ => None,
        }
    }
}

fn resolve_output(ledger: &dyn LedgerStore, input: &UtxoInput) -> Result<Output, TransactionError> {
    let prev = ledger.get_transaction(&input.refer_tx_id)?;
    prev.outputs
        .get(usize::from(input.refer_output_index))
        .copied()
        .ok_or(TransactionError::OutputIndexOutOfRange {
            tx: input.refer_tx_id,
            index: input.refer_output_index,
        })
}

fn merge<'a>(outputs: impl Iterator<Item = &'a Output>) -> AssetAmounts {
    let mut merged = AssetAmounts::new();
    for output in outputs {
        *merged.entry(output.asset_id).or_default() += output.value;
    }
    merged
}
