//! Native assets and the genesis block shape.

use crate::asset::{Asset, AssetRecordType, AssetType};
use crate::block::{bookkeeper_address, Block, BlockHeader};
use crate::crypto::PublicKey;
use crate::fixed::Fixed64;
use crate::hash::{compute_merkle_root, to_code_hash, Hash256, ProgramHash};
use crate::script::op;
use crate::transaction::Transaction;
use crate::utxo::Output;
use std::sync::OnceLock;

/// Units registered for each native asset.
pub const NATIVE_REGISTER_AMOUNT: i64 = 1_000_000_000;

/// Consensus data of the genesis header.
pub const GENESIS_NONCE: u64 = 2_083_236_893;

/// 2017-02-23T00:00:00Z.
pub const GENESIS_TIMESTAMP: u32 = 1_487_808_000;

/// Account that receives the genesis issuance.
pub const SYSTEM_ISSUE_ACCOUNT: ProgramHash = ProgramHash::from_bytes([
    0xde, 0x16, 0xa8, 0x9b, 0x7f, 0xed, 0x89, 0x74, 0xea, 0x63, 0x58, 0x67, 0xb2, 0x3f, 0xfe,
    0xd6, 0xea, 0x53, 0xef, 0x51,
]);

fn native_controller() -> ProgramHash {
    to_code_hash(&[op::PUSHF])
}

fn native_token(name: &str, description: &str, precision: u8, asset_type: AssetType) -> Transaction {
    Transaction::register_asset(
        Asset {
            name: name.to_string(),
            description: description.to_string(),
            precision,
            asset_type,
            record_type: AssetRecordType::Utxo,
        },
        Fixed64::from_decimal(NATIVE_REGISTER_AMOUNT),
        PublicKey::IDENTITY,
        native_controller(),
    )
}

/// Registration of the governing token (precision 0).
pub fn governing_token() -> Transaction {
    native_token("MRD", "Meridian governing token", 0, AssetType::GoverningToken)
}

/// Registration of the utility token (precision 8), the network-fee asset.
pub fn utility_token() -> Transaction {
    native_token("MRG", "Meridian utility token", 8, AssetType::UtilityToken)
}

/// Genesis issuance: the whole governing supply plus a tenth of it in
/// utility tokens, paid to [`SYSTEM_ISSUE_ACCOUNT`].
pub fn system_issue() -> Transaction {
    let governing = Fixed64::from_decimal(NATIVE_REGISTER_AMOUNT);
    Transaction::issue_asset(vec![
        Output::new(governing_token_id(), governing, SYSTEM_ISSUE_ACCOUNT),
        Output::new(
            utility_token_id(),
            Fixed64::from_raw(governing.raw() / 10),
            SYSTEM_ISSUE_ACCOUNT,
        ),
    ])
}

pub fn governing_token_id() -> Hash256 {
    static ID: OnceLock<Hash256> = OnceLock::new();
    *ID.get_or_init(|| governing_token().hash())
}

pub fn utility_token_id() -> Hash256 {
    static ID: OnceLock<Hash256> = OnceLock::new();
    *ID.get_or_init(|| utility_token().hash())
}

pub fn system_issue_id() -> Hash256 {
    static ID: OnceLock<Hash256> = OnceLock::new();
    *ID.get_or_init(|| system_issue().hash())
}

/// Whether `asset_id` is one of the two native assets.
pub fn is_native_asset(asset_id: &Hash256) -> bool {
    *asset_id == governing_token_id() || *asset_id == utility_token_id()
}

/// Height-0 block signed off by `bookkeepers`.
pub fn genesis_block(bookkeepers: &[PublicKey]) -> Block {
    let transactions = vec![governing_token(), utility_token(), system_issue()];
    let hashes: Vec<Hash256> = transactions.iter().map(Transaction::hash).collect();
    let header = BlockHeader {
        version: 0,
        prev_block_hash: Hash256::ZERO,
        transactions_root: compute_merkle_root(&hashes),
        timestamp: GENESIS_TIMESTAMP,
        height: 0,
        consensus_data: GENESIS_NONCE,
        next_bookkeeper: bookkeeper_address(bookkeepers),
        program: None,
    };
    Block::new(header, transactions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;

    #[test]
    fn test_native_ids_are_distinct_and_stable() {
        assert_ne!(governing_token_id(), utility_token_id());
        assert_eq!(governing_token_id(), governing_token().hash());
        assert!(is_native_asset(&utility_token_id()));
        assert!(!is_native_asset(&Hash256::of(b"other")));
    }

    #[test]
    fn test_native_token_shape() {
        match utility_token().payload() {
            Payload::RegisterAsset {
                asset,
                amount,
                controller,
                ..
            } => {
                assert_eq!(asset.precision, 8);
                assert_eq!(*amount, Fixed64::from_decimal(1_000_000_000));
                assert_eq!(*controller, to_code_hash(&[0x00]));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_genesis_block_root() {
        let block = genesis_block(&[]);
        assert_eq!(block.header.height, 0);
        assert_eq!(block.transactions.len(), 3);
        assert!(block.verify_transactions_root());
    }
}
