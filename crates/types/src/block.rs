//! Block and block header.

use crate::codec::{CodecError, Reader, Writer};
use crate::crypto::PublicKey;
use crate::hash::{compute_merkle_root, to_code_hash, Hash256, ProgramHash};
use crate::script::{multisig_redeem_script, signature_redeem_script, Program};
use crate::transaction::Transaction;
use crate::payload::TransactionType;

/// Signatures needed out of `n` bookkeepers: `n - (n - 1) / 3`.
pub fn quorum_threshold(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    n - (n - 1) / 3
}

/// Account that must co-sign the next block for a bookkeeper set.
///
/// A single bookkeeper signs alone; larger sets use an M-of-N multisig.
pub fn bookkeeper_address(bookkeepers: &[PublicKey]) -> ProgramHash {
    match bookkeepers {
        [] => ProgramHash::default(),
        [single] => to_code_hash(&signature_redeem_script(single)),
        many => to_code_hash(&multisig_redeem_script(quorum_threshold(many.len()), many)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: u32,
    pub prev_block_hash: Hash256,
    pub transactions_root: Hash256,
    pub timestamp: u32,
    pub height: u32,
    pub consensus_data: u64,
    pub next_bookkeeper: ProgramHash,
    /// Multisig witness, attached once the bookkeepers have signed.
    pub program: Option<Program>,
}

impl BlockHeader {
    pub fn encode_unsigned(&self, w: &mut Writer) {
        w.write_u32(self.version);
        w.write_bytes(self.prev_block_hash.as_bytes());
        w.write_bytes(self.transactions_root.as_bytes());
        w.write_u32(self.timestamp);
        w.write_u32(self.height);
        w.write_u64(self.consensus_data);
        w.write_bytes(self.next_bookkeeper.as_bytes());
    }

    /// Bytes the bookkeepers sign.
    pub fn unsigned_bytes(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(104);
        self.encode_unsigned(&mut w);
        w.into_bytes()
    }

    pub fn hash(&self) -> Hash256 {
        Hash256::of(&self.unsigned_bytes())
    }

    pub fn encode(&self, w: &mut Writer) {
        self.encode_unsigned(w);
        match &self.program {
            Some(program) => {
                w.write_u8(1);
                program.encode(w);
            }
            None => w.write_u8(0),
        }
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let version = r.read_u32()?;
        let prev_block_hash = Hash256::from_hash_bytes(r.read_array()?);
        let transactions_root = Hash256::from_hash_bytes(r.read_array()?);
        let timestamp = r.read_u32()?;
        let height = r.read_u32()?;
        let consensus_data = r.read_u64()?;
        let next_bookkeeper = ProgramHash::from_bytes(r.read_array()?);
        let program = match r.read_u8()? {
            0 => None,
            1 => Some(Program::decode(r)?),
            value => {
                return Err(CodecError::InvalidEnumValue {
                    what: "header program flag",
                    value,
                })
            }
        };
        Ok(Self {
            version,
            prev_block_hash,
            transactions_root,
            timestamp,
            height,
            consensus_data,
            next_bookkeeper,
            program,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    pub fn hash(&self) -> Hash256 {
        self.header.hash()
    }

    pub fn height(&self) -> u32 {
        self.header.height
    }

    /// Whether the header commits to exactly these transactions.
    pub fn verify_transactions_root(&self) -> bool {
        let hashes: Vec<Hash256> = self.transactions.iter().map(Transaction::hash).collect();
        compute_merkle_root(&hashes) == self.header.transactions_root
    }

    /// Transactions other than the leading BookKeeping entry.
    pub fn user_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions
            .iter()
            .filter(|tx| tx.tx_type() != TransactionType::BookKeeping)
    }

    pub fn encode(&self, w: &mut Writer) {
        self.header.encode(w);
        crate::codec::write_list(w, &self.transactions, |tx, w| tx.encode(w));
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        self.encode(&mut w);
        w.into_bytes()
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let header = BlockHeader::decode(r)?;
        let transactions = r.read_list(Transaction::decode)?;
        Ok(Self {
            header,
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn header() -> BlockHeader {
        BlockHeader {
            version: 0,
            prev_block_hash: Hash256::of(b"parent"),
            transactions_root: Hash256::ZERO,
            timestamp: 1_700_000_000,
            height: 12,
            consensus_data: 0xDEAD_BEEF,
            next_bookkeeper: ProgramHash::from_bytes([4u8; 20]),
            program: None,
        }
    }

    #[test]
    fn test_quorum_threshold() {
        assert_eq!(quorum_threshold(1), 1);
        assert_eq!(quorum_threshold(4), 3);
        assert_eq!(quorum_threshold(7), 5);
        assert_eq!(quorum_threshold(10), 7);
    }

    #[test]
    fn test_header_hash_ignores_program() {
        let mut h = header();
        let before = h.hash();
        h.program = Some(Program::new(vec![1], vec![2]));
        assert_eq!(h.hash(), before);
    }

    #[test]
    fn test_block_roundtrip() {
        let tx = Transaction::bookkeeping(1);
        let mut h = header();
        h.transactions_root = compute_merkle_root(&[tx.hash()]);
        h.program = Some(Program::new(vec![0xAA], vec![0xBB]));
        let block = Block::new(h, vec![tx]);

        let bytes = block.to_bytes();
        let decoded = Block::decode(&mut Reader::new(&bytes)).unwrap();
        assert_eq!(decoded, block);
        assert!(decoded.verify_transactions_root());
        assert_eq!(decoded.user_transactions().count(), 0);
    }

    #[test]
    fn test_bookkeeper_address_single_vs_many() {
        let a = KeyPair::from_seed([1u8; 32]).public_key();
        let b = KeyPair::from_seed([2u8; 32]).public_key();
        assert_eq!(
            bookkeeper_address(&[a]),
            to_code_hash(&signature_redeem_script(&a))
        );
        assert_eq!(bookkeeper_address(&[a, b]), bookkeeper_address(&[b, a]));
    }
}
