//! Seams between the engine and the host: signed containers, crypto,
//! contract lookup and named system calls.

use crate::engine::ExecutionEngine;
use crate::error::VmError;
use crate::stack_item::StackItem;
use meridian_types::{hash160, hash256, ProgramHash, PublicKey, Signature, Transaction};
use std::collections::HashMap;
use std::sync::Arc;

/// The object whose witnesses are being checked.
pub trait ScriptContainer: Send + Sync {
    /// Bytes that `CHECKSIG`/`CHECKMULTISIG` verify signatures against.
    fn message(&self) -> Vec<u8>;
}

impl ScriptContainer for Transaction {
    fn message(&self) -> Vec<u8> {
        self.hash_data()
    }
}

/// Hashing and signature verification used by the crypto opcodes.
pub trait Crypto: Send + Sync {
    fn hash160(&self, data: &[u8]) -> Vec<u8>;

    fn hash256(&self, data: &[u8]) -> Vec<u8>;

    fn verify_signature(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

/// Ed25519 and the ledger's hash functions.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCrypto;

impl Crypto for DefaultCrypto {
    fn hash160(&self, data: &[u8]) -> Vec<u8> {
        hash160(data).to_vec()
    }

    fn hash256(&self, data: &[u8]) -> Vec<u8> {
        hash256(data).to_vec()
    }

    fn verify_signature(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(key_bytes) = <[u8; 32]>::try_from(public_key) else {
            return false;
        };
        let Ok(key) = PublicKey::from_bytes(key_bytes) else {
            return false;
        };
        let Some(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(message, &signature)
    }
}

/// Resolves `APPCALL`/`TAILCALL` targets.
pub trait ScriptTable: Send + Sync {
    fn get_script(&self, script_hash: &ProgramHash) -> Option<Vec<u8>>;
}

/// Dispatches `SYSCALL` by method name.
pub trait InteropService: Send + Sync {
    /// Run `method`. `Ok(false)` means the name is not registered.
    fn invoke(&self, method: &str, engine: &mut ExecutionEngine) -> Result<bool, VmError>;
}

pub type InteropFn = fn(&mut ExecutionEngine) -> Result<(), VmError>;

pub const GET_SCRIPT_CONTAINER: &str = "System.ExecutionEngine.GetScriptContainer";
pub const GET_EXECUTING_SCRIPT_HASH: &str = "System.ExecutionEngine.GetExecutingScriptHash";
pub const GET_CALLING_SCRIPT_HASH: &str = "System.ExecutionEngine.GetCallingScriptHash";
pub const GET_ENTRY_SCRIPT_HASH: &str = "System.ExecutionEngine.GetEntryScriptHash";

/// Name-keyed table of system calls, pre-populated with the engine
/// introspection calls.
#[derive(Clone)]
pub struct InteropRegistry {
    methods: HashMap<String, InteropFn>,
}

impl Default for InteropRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl InteropRegistry {
    /// Registry with no methods at all.
    pub fn empty() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(GET_SCRIPT_CONTAINER, get_script_container);
        registry.register(GET_EXECUTING_SCRIPT_HASH, get_executing_script_hash);
        registry.register(GET_CALLING_SCRIPT_HASH, get_calling_script_hash);
        registry.register(GET_ENTRY_SCRIPT_HASH, get_entry_script_hash);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, method: InteropFn) {
        self.methods.insert(name.into(), method);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

impl InteropService for InteropRegistry {
    fn invoke(&self, method: &str, engine: &mut ExecutionEngine) -> Result<bool, VmError> {
        match self.methods.get(method) {
            Some(f) => f(engine).map(|()| true),
            None => Ok(false),
        }
    }
}

fn push_hash(engine: &mut ExecutionEngine, hash: ProgramHash) -> Result<(), VmError> {
    engine.push(StackItem::ByteArray(hash.as_bytes().to_vec()))
}

fn get_script_container(engine: &mut ExecutionEngine) -> Result<(), VmError> {
    let container: Arc<dyn ScriptContainer> = engine
        .script_container()
        .cloned()
        .ok_or(VmError::NoScriptContainer)?;
    engine.push(StackItem::interop(container))
}

fn get_executing_script_hash(engine: &mut ExecutionEngine) -> Result<(), VmError> {
    let hash = engine.current_context()?.script_hash();
    push_hash(engine, hash)
}

fn get_calling_script_hash(engine: &mut ExecutionEngine) -> Result<(), VmError> {
    let hash = match engine.calling_context() {
        Some(ctx) => ctx.script_hash(),
        None => engine.caller(),
    };
    push_hash(engine, hash)
}

fn get_entry_script_hash(engine: &mut ExecutionEngine) -> Result<(), VmError> {
    let hash = engine.entry_context()?.script_hash();
    push_hash(engine, hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_types::KeyPair;

    #[test]
    fn test_default_crypto_verifies_ed25519() {
        let kp = KeyPair::from_seed([4u8; 32]);
        let sig = kp.sign(b"msg");
        let crypto = DefaultCrypto;
        assert!(crypto.verify_signature(b"msg", sig.as_bytes(), kp.public_key().as_bytes()));
        assert!(!crypto.verify_signature(b"msg", &sig.as_bytes()[..63], kp.public_key().as_bytes()));
        assert!(!crypto.verify_signature(b"msg", sig.as_bytes(), &[1, 2, 3]));
    }

    #[test]
    fn test_registry_builtins() {
        let registry = InteropRegistry::with_builtins();
        assert!(registry.contains(GET_CALLING_SCRIPT_HASH));
        assert!(!InteropRegistry::empty().contains(GET_CALLING_SCRIPT_HASH));
    }
}
