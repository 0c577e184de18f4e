use super::Instruction;
use crate::engine::ExecutionEngine;
use crate::error::VmError;
use crate::opcode;
use crate::stack_item::StackItem;
use sha1::{Digest, Sha1};

/// `SHA1`, `SHA256`, `HASH160`, `HASH256`.
pub(super) fn digest(engine: &mut ExecutionEngine, ins: Instruction) -> Result<(), VmError> {
    let data = engine.pop_bytes()?;
    let hash = match ins.opcode {
        opcode::SHA1 => Sha1::digest(&data).to_vec(),
        opcode::SHA256 => meridian_types::sha256(&data).to_vec(),
        opcode::HASH160 => engine.crypto().hash160(&data),
        _ => engine.crypto().hash256(&data),
    };
    engine.push(StackItem::ByteArray(hash))
}

fn container_message(engine: &ExecutionEngine) -> Result<Vec<u8>, VmError> {
    engine
        .script_container()
        .map(|c| c.message())
        .ok_or(VmError::NoScriptContainer)
}

pub(super) fn check_sig(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let public_key = engine.pop_bytes()?;
    let signature = engine.pop_bytes()?;
    let message = container_message(engine)?;
    let ok = engine
        .crypto()
        .verify_signature(&message, &signature, &public_key);
    engine.push(StackItem::Boolean(ok))
}

/// Pop either an array of byte strings or a count followed by that many
/// byte strings. The first popped item is last in the returned list.
fn pop_byte_list(engine: &mut ExecutionEngine, what: &str) -> Result<Vec<Vec<u8>>, VmError> {
    let item = engine.pop()?;
    if let StackItem::Array(list) | StackItem::Struct(list) = &item {
        let items = list.borrow();
        let mut out = Vec::with_capacity(items.len());
        for entry in items.iter() {
            out.push(entry.to_bytes()?);
        }
        if out.is_empty() {
            return Err(VmError::InvalidOperand(format!("empty {what} list")));
        }
        return Ok(out);
    }

    let count = item.to_bigint()?;
    let count = usize::try_from(&count)
        .ok()
        .filter(|n| *n >= 1)
        .ok_or_else(|| VmError::InvalidOperand(format!("{what} count {count}")))?;
    engine.check_array_size(count)?;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(engine.pop_bytes()?);
    }
    out.reverse();
    Ok(out)
}

/// m-of-n check: signatures must appear in the same order as the keys
/// they match.
pub(super) fn check_multisig(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let public_keys = pop_byte_list(engine, "public key")?;
    let signatures = pop_byte_list(engine, "signature")?;
    if signatures.len() > public_keys.len() {
        return Err(VmError::InvalidOperand(format!(
            "{} signatures for {} keys",
            signatures.len(),
            public_keys.len()
        )));
    }
    let message = container_message(engine)?;
    let crypto = engine.crypto();

    let (m, n) = (signatures.len(), public_keys.len());
    let (mut i, mut j) = (0, 0);
    let mut ok = true;
    while ok && i < m && j < n {
        if crypto.verify_signature(&message, &signatures[i], &public_keys[j]) {
            i += 1;
        }
        j += 1;
        if m - i > n - j {
            ok = false;
        }
    }
    engine.push(StackItem::Boolean(ok && i == m))
}
