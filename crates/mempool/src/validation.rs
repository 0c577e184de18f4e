//! Transaction validity checks that do not depend on pool contents.
//!
//! Gate 1 ([`verify_transaction`]) checks the transaction's own structure
//! and runs every witness through the VM. Gate 2
//! ([`verify_transaction_with_ledger`]) checks it against persisted chain
//! state. Pool-level conflicts are the pool's job.

use crate::error::ErrCode;
use meridian_engine::{
    DefaultCrypto, EngineConfig, ExecutionEngine, ScriptContainer, VmState,
};
use meridian_types::{
    genesis, AttributeUsage, Hash256, LedgerStore, Payload, ProgramHash, Transaction,
    TransactionType, MAX_PRECISION,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Gate 1: structure, precision and witnesses.
#[instrument(skip_all, fields(tx_hash = %tx.hash()))]
pub fn verify_transaction(tx: &Transaction, ledger: &dyn LedgerStore) -> Result<(), ErrCode> {
    check_duplicate_inputs(tx)?;
    check_attributes(tx)?;
    check_output_precision(tx, ledger)?;
    check_payload(tx)?;
    verify_witnesses(tx, ledger)
}

/// Gate 2: checks against ledger state.
#[instrument(skip_all, fields(tx_hash = %tx.hash()))]
pub fn verify_transaction_with_ledger(
    tx: &Transaction,
    ledger: &dyn LedgerStore,
    utility_asset: &Hash256,
) -> Result<(), ErrCode> {
    if ledger.contains_transaction(&tx.hash())? {
        return Err(ErrCode::TxHashDuplicate);
    }
    if ledger.is_double_spend(tx)? {
        return Err(ErrCode::DoubleSpend);
    }
    tx.references(ledger)?;

    if tx.tx_type() == TransactionType::IssueAsset {
        for asset_id in tx.merged_outputs().keys() {
            let registration = ledger.get_transaction(asset_id)?;
            if registration.tx_type() != TransactionType::RegisterAsset {
                return Err(ErrCode::TransactionPayload(format!(
                    "{asset_id} is not a registered asset"
                )));
            }
        }
    }

    check_balance(tx, ledger, utility_asset)?;

    if let Payload::Vote { account, .. } = tx.payload() {
        ledger
            .get_account(account)
            .map_err(|e| ErrCode::TransactionPayload(format!("voting account: {e}")))?;
    }
    Ok(())
}

fn check_duplicate_inputs(tx: &Transaction) -> Result<(), ErrCode> {
    let mut seen = HashSet::with_capacity(tx.utxo_inputs().len());
    for input in tx.utxo_inputs() {
        if !seen.insert(*input) {
            return Err(ErrCode::DuplicateInput);
        }
    }
    Ok(())
}

/// Script attributes must carry a program hash.
fn check_attributes(tx: &Transaction) -> Result<(), ErrCode> {
    for attribute in tx.attributes() {
        if attribute.usage == AttributeUsage::Script
            && ProgramHash::from_slice(&attribute.data).is_err()
        {
            return Err(ErrCode::AttributeProgram);
        }
    }
    Ok(())
}

fn check_output_precision(tx: &Transaction, ledger: &dyn LedgerStore) -> Result<(), ErrCode> {
    for output in tx.outputs() {
        if !output.value.is_positive() {
            debug!(asset = %output.asset_id, value = %output.value, "non-positive output");
            return Err(ErrCode::AssetPrecision);
        }
        let registration = ledger.get_transaction(&output.asset_id)?;
        let Payload::RegisterAsset { asset, .. } = registration.payload() else {
            return Err(ErrCode::TransactionPayload(format!(
                "output asset {} is not registered",
                output.asset_id
            )));
        };
        if !output.value.fits_precision(asset.precision) {
            return Err(ErrCode::AssetPrecision);
        }
    }
    Ok(())
}

fn check_payload(tx: &Transaction) -> Result<(), ErrCode> {
    if let Payload::RegisterAsset { asset, amount, .. } = tx.payload() {
        if asset.precision > MAX_PRECISION {
            return Err(ErrCode::AssetPrecision);
        }
        // A negative amount registers an unlimited supply.
        if amount.is_zero() {
            return Err(ErrCode::TransactionPayload("zero register amount".into()));
        }
        if amount.is_positive() && !amount.fits_precision(asset.precision) {
            return Err(ErrCode::AssetPrecision);
        }
    }
    Ok(())
}

/// Utility-asset surplus must cover fees; for transfers every other asset
/// must net to zero.
fn check_balance(
    tx: &Transaction,
    ledger: &dyn LedgerStore,
    utility_asset: &Hash256,
) -> Result<(), ErrCode> {
    tx.network_fee(ledger, utility_asset)?;

    if tx.tx_type() == TransactionType::TransferAsset {
        for (asset_id, surplus) in tx.transaction_results(ledger)? {
            let balanced = if asset_id == *utility_asset {
                surplus >= tx.system_fee()
            } else {
                surplus.is_zero()
            };
            if !balanced {
                debug!(asset = %asset_id, surplus = %surplus, "unbalanced transfer");
                return Err(ErrCode::TransactionBalance);
            }
        }
    }
    Ok(())
}

/// Each required program hash must be matched, in order, by a witness whose
/// code hashes to it and which halts with a true result.
fn verify_witnesses(tx: &Transaction, ledger: &dyn LedgerStore) -> Result<(), ErrCode> {
    if tx.hash() == genesis::system_issue_id() {
        return Ok(());
    }

    let hashes = tx.program_hashes(ledger)?;
    let programs = tx.programs();
    if hashes.len() != programs.len() {
        return Err(ErrCode::TransactionContracts(format!(
            "{} witnesses for {} program hashes",
            programs.len(),
            hashes.len()
        )));
    }

    let container: Arc<dyn ScriptContainer> = Arc::new(tx.clone());
    for (expected, program) in hashes.iter().zip(programs) {
        if program.code_hash() != *expected {
            return Err(ErrCode::TransactionContracts(format!(
                "witness code does not hash to {expected}"
            )));
        }

        let mut engine = ExecutionEngine::new(
            Some(Arc::clone(&container)),
            Arc::new(DefaultCrypto),
            None,
            EngineConfig::default(),
        );
        engine
            .load_code(&program.code, false)
            .and_then(|()| engine.load_code(&program.parameter, true))
            .map_err(|e| ErrCode::TransactionContracts(e.to_string()))?;

        let state = engine.execute();
        let accepted = state == VmState::Halt
            && engine
                .result_stack()
                .peek(0)
                .map(|item| item.to_bool())
                .unwrap_or(false);
        if !accepted {
            let reason = engine
                .fault()
                .map(ToString::to_string)
                .unwrap_or_else(|| format!("{state:?} without a true result"));
            debug!(program = %expected, %reason, "witness rejected");
            return Err(ErrCode::TransactionContracts(reason));
        }
    }
    Ok(())
}
