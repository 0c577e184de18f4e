//! Witness programs and the redeem scripts the ledger recognises.

use crate::codec::{CodecError, Reader, Writer};
use crate::crypto::{PublicKey, Signature};
use crate::hash::{to_code_hash, ProgramHash};

/// Opcode bytes the types crate needs to build scripts. The full table lives
/// in the engine.
pub mod op {
    pub const PUSH0: u8 = 0x00;
    pub const PUSHF: u8 = PUSH0;
    pub const PUSHBYTES1: u8 = 0x01;
    pub const PUSHBYTES75: u8 = 0x4B;
    pub const PUSHDATA1: u8 = 0x4C;
    pub const PUSHDATA2: u8 = 0x4D;
    pub const PUSHDATA4: u8 = 0x4E;
    pub const PUSHM1: u8 = 0x4F;
    pub const PUSH1: u8 = 0x51;
    pub const PUSHT: u8 = PUSH1;
    pub const PUSH16: u8 = 0x60;
    pub const CHECKSIG: u8 = 0xAC;
    pub const CHECKMULTISIG: u8 = 0xAE;
}

/// A witness: `parameter` pushes arguments, `code` is the redeem script
/// whose hash names the account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub parameter: Vec<u8>,
    pub code: Vec<u8>,
}

impl Program {
    pub fn new(parameter: Vec<u8>, code: Vec<u8>) -> Self {
        Self { parameter, code }
    }

    /// Program hash of the redeem script.
    pub fn code_hash(&self) -> ProgramHash {
        to_code_hash(&self.code)
    }

    pub fn encode(&self, w: &mut Writer) {
        w.write_var_bytes(&self.parameter);
        w.write_var_bytes(&self.code);
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let parameter = r.read_var_bytes()?;
        let code = r.read_var_bytes()?;
        Ok(Self { parameter, code })
    }
}

/// Incremental script assembler.
#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(mut self, opcode: u8) -> Self {
        self.script.push(opcode);
        self
    }

    /// Push `data` with the shortest push opcode that fits.
    pub fn push_data(mut self, data: &[u8]) -> Self {
        let len = data.len();
        if len <= usize::from(op::PUSHBYTES75) {
            self.script.push(len as u8);
        } else if len <= 0xFF {
            self.script.push(op::PUSHDATA1);
            self.script.push(len as u8);
        } else if len <= 0xFFFF {
            self.script.push(op::PUSHDATA2);
            self.script.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.script.push(op::PUSHDATA4);
            self.script.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.script.extend_from_slice(data);
        self
    }

    /// Push an integer, using PUSHM1/PUSH0..PUSH16 for small values.
    pub fn push_int(self, value: i64) -> Self {
        match value {
            -1 => self.emit(op::PUSHM1),
            0 => self.emit(op::PUSH0),
            1..=16 => self.emit(op::PUSH1 - 1 + value as u8),
            _ => {
                let bytes = int_to_le_bytes(value);
                self.push_data(&bytes)
            }
        }
    }

    pub fn into_script(self) -> Vec<u8> {
        self.script
    }
}

/// Minimal little-endian two's complement encoding.
fn int_to_le_bytes(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let mut bytes = value.to_le_bytes().to_vec();
    while bytes.len() > 1 {
        let last = bytes[bytes.len() - 1];
        let prev_sign = bytes[bytes.len() - 2] & 0x80;
        if (last == 0x00 && prev_sign == 0) || (last == 0xFF && prev_sign != 0) {
            bytes.pop();
        } else {
            break;
        }
    }
    bytes
}

/// `PUSHBYTES32 <pk> CHECKSIG`.
pub fn signature_redeem_script(public_key: &PublicKey) -> Vec<u8> {
    ScriptBuilder::new()
        .push_data(public_key.as_bytes())
        .emit(op::CHECKSIG)
        .into_script()
}

/// `m <pk..> n CHECKMULTISIG` over the sorted keys.
pub fn multisig_redeem_script(m: usize, public_keys: &[PublicKey]) -> Vec<u8> {
    let mut keys = public_keys.to_vec();
    keys.sort();
    let mut builder = ScriptBuilder::new().push_int(m as i64);
    for key in &keys {
        builder = builder.push_data(key.as_bytes());
    }
    builder
        .push_int(keys.len() as i64)
        .emit(op::CHECKMULTISIG)
        .into_script()
}

/// Parameter script pushing each signature in order.
pub fn signatures_parameter(signatures: &[Signature]) -> Vec<u8> {
    signatures
        .iter()
        .fold(ScriptBuilder::new(), |b, sig| b.push_data(sig.as_bytes()))
        .into_script()
}

/// Program hash of the single-signature account for `public_key`.
pub fn account_program_hash(public_key: &PublicKey) -> ProgramHash {
    to_code_hash(&signature_redeem_script(public_key))
}
