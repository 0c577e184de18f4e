//! Execution contexts and their stacks.

use crate::error::VmError;
use crate::stack_item::StackItem;
use meridian_types::{to_code_hash, ProgramHash};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Stack addressed from the top: index 0 is the most recently pushed item.
#[derive(Debug, Default, Clone)]
pub struct RandomAccessStack {
    items: Vec<StackItem>,
}

impl RandomAccessStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, item: StackItem) {
        self.items.push(item);
    }

    pub fn pop(&mut self) -> Result<StackItem, VmError> {
        self.items.pop().ok_or(VmError::StackUnderflow)
    }

    pub fn peek(&self, index: usize) -> Result<&StackItem, VmError> {
        let pos = self.position(index)?;
        Ok(&self.items[pos])
    }

    pub fn remove(&mut self, index: usize) -> Result<StackItem, VmError> {
        let pos = self.position(index)?;
        Ok(self.items.remove(pos))
    }

    /// Insert so that the new item ends up at `index` from the top.
    pub fn insert(&mut self, index: usize, item: StackItem) -> Result<(), VmError> {
        if index > self.items.len() {
            return Err(VmError::StackUnderflow);
        }
        let pos = self.items.len() - index;
        self.items.insert(pos, item);
        Ok(())
    }

    pub fn set(&mut self, index: usize, item: StackItem) -> Result<(), VmError> {
        let pos = self.position(index)?;
        self.items[pos] = item;
        Ok(())
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), VmError> {
        let pa = self.position(a)?;
        let pb = self.position(b)?;
        self.items.swap(pa, pb);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Move every item onto `other`, preserving order.
    pub fn move_to(&mut self, other: &mut RandomAccessStack) {
        other.items.append(&mut self.items);
    }

    /// Items from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &StackItem> {
        self.items.iter()
    }

    fn position(&self, index: usize) -> Result<usize, VmError> {
        if index >= self.items.len() {
            return Err(VmError::StackUnderflow);
        }
        Ok(self.items.len() - 1 - index)
    }
}

/// One frame of the invocation stack.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    script: Rc<[u8]>,
    script_hash: ProgramHash,
    pub(crate) instruction_pointer: usize,
    push_only: bool,
    pub(crate) break_points: BTreeSet<usize>,
    pub(crate) evaluation_stack: RandomAccessStack,
    pub(crate) alt_stack: RandomAccessStack,
}

impl ExecutionContext {
    pub fn new(script: Rc<[u8]>, push_only: bool) -> Self {
        let script_hash = to_code_hash(&script);
        Self {
            script,
            script_hash,
            instruction_pointer: 0,
            push_only,
            break_points: BTreeSet::new(),
            evaluation_stack: RandomAccessStack::new(),
            alt_stack: RandomAccessStack::new(),
        }
    }

    /// Fresh frame over the same script, used by `CALL`.
    pub(crate) fn fork(&self, instruction_pointer: usize) -> Self {
        Self {
            script: Rc::clone(&self.script),
            script_hash: self.script_hash,
            instruction_pointer,
            push_only: self.push_only,
            break_points: BTreeSet::new(),
            evaluation_stack: RandomAccessStack::new(),
            alt_stack: RandomAccessStack::new(),
        }
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }

    pub fn script_hash(&self) -> ProgramHash {
        self.script_hash
    }

    pub fn instruction_pointer(&self) -> usize {
        self.instruction_pointer
    }

    pub fn is_push_only(&self) -> bool {
        self.push_only
    }

    pub fn break_points(&self) -> &BTreeSet<usize> {
        &self.break_points
    }

    pub fn evaluation_stack(&self) -> &RandomAccessStack {
        &self.evaluation_stack
    }

    pub fn alt_stack(&self) -> &RandomAccessStack {
        &self.alt_stack
    }

    /// Opcode at the instruction pointer, `None` at end of script.
    pub fn next_instruction(&self) -> Option<u8> {
        self.script.get(self.instruction_pointer).copied()
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&[u8], VmError> {
        let start = self.instruction_pointer;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.script.len())
            .ok_or(VmError::ScriptOverrun { position: start })?;
        self.instruction_pointer = end;
        Ok(&self.script[start..end])
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, VmError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, VmError> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn read_i16(&mut self) -> Result<i16, VmError> {
        let b = self.read_bytes(2)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, VmError> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Var-uint length followed by that many bytes.
    pub(crate) fn read_var_bytes(&mut self) -> Result<Vec<u8>, VmError> {
        let len = match self.read_u8()? {
            0xFD => u64::from(self.read_u16()?),
            0xFE => u64::from(self.read_u32()?),
            0xFF => {
                let b = self.read_bytes(8)?;
                let mut arr = [0u8; 8];
                arr.copy_from_slice(b);
                u64::from_le_bytes(arr)
            }
            n => u64::from(n),
        };
        let len = usize::try_from(len).map_err(|_| VmError::ScriptOverrun {
            position: self.instruction_pointer,
        })?;
        Ok(self.read_bytes(len)?.to_vec())
    }
}
