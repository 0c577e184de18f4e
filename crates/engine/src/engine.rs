//! The execution engine: invocation stack, run loop and debugging controls.

use crate::config::EngineConfig;
use crate::context::{ExecutionContext, RandomAccessStack};
use crate::error::VmError;
use crate::interop::{Crypto, InteropRegistry, InteropService, ScriptContainer, ScriptTable};
use crate::opcode;
use crate::ops::{dispatch_table, Instruction};
use crate::stack_item::{bigint_to_bytes, StackItem};
use meridian_types::ProgramHash;
use num_bigint::BigInt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, trace};

/// Run state of the engine. `Halt` and `Fault` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    None,
    Halt,
    Fault,
    Break,
}

impl VmState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Halt | Self::Fault)
    }
}

/// Cross-thread stop signal checked at every instruction boundary.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Stack-based script interpreter.
///
/// Each invocation frame owns its evaluation and alt stacks. `RET` moves the
/// returning frame's evaluation stack onto the caller's, or onto the result
/// stack when the last frame returns, at which point the engine halts.
pub struct ExecutionEngine {
    config: EngineConfig,
    container: Option<Arc<dyn ScriptContainer>>,
    crypto: Arc<dyn Crypto>,
    service: Arc<dyn InteropService>,
    table: Option<Arc<dyn ScriptTable>>,

    invocation_stack: Vec<ExecutionContext>,
    result_stack: RandomAccessStack,
    state: VmState,
    fault: Option<VmError>,
    caller: ProgramHash,
    steps: u64,
    abort: AbortHandle,
    /// Frame depth and position the engine resumes from; a break point
    /// there is not hit again.
    resume_at: Option<(usize, usize)>,
}

impl ExecutionEngine {
    /// Build an engine. Without an interop service only the built-in
    /// engine introspection calls are available.
    pub fn new(
        container: Option<Arc<dyn ScriptContainer>>,
        crypto: Arc<dyn Crypto>,
        service: Option<Arc<dyn InteropService>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            config,
            container,
            crypto,
            service: service.unwrap_or_else(|| Arc::new(InteropRegistry::with_builtins())),
            table: None,
            invocation_stack: Vec::new(),
            result_stack: RandomAccessStack::new(),
            state: VmState::None,
            fault: None,
            caller: ProgramHash::default(),
            steps: 0,
            abort: AbortHandle::default(),
            resume_at: None,
        }
    }

    pub fn with_script_table(mut self, table: Arc<dyn ScriptTable>) -> Self {
        self.table = Some(table);
        self
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn state(&self) -> VmState {
        self.state
    }

    /// Why the engine faulted, if it did.
    pub fn fault(&self) -> Option<&VmError> {
        self.fault.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Hash reported as the calling script of the entry frame.
    pub fn caller(&self) -> ProgramHash {
        self.caller
    }

    pub fn script_container(&self) -> Option<&Arc<dyn ScriptContainer>> {
        self.container.as_ref()
    }

    pub fn crypto(&self) -> &dyn Crypto {
        self.crypto.as_ref()
    }

    pub(crate) fn script_table(&self) -> Option<&Arc<dyn ScriptTable>> {
        self.table.as_ref()
    }

    pub fn result_stack(&self) -> &RandomAccessStack {
        &self.result_stack
    }

    pub fn invocation_depth(&self) -> usize {
        self.invocation_stack.len()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn current_context(&self) -> Result<&ExecutionContext, VmError> {
        self.invocation_stack.last().ok_or(VmError::NoContext)
    }

    pub(crate) fn current_context_mut(&mut self) -> Result<&mut ExecutionContext, VmError> {
        self.invocation_stack.last_mut().ok_or(VmError::NoContext)
    }

    /// Frame directly below the current one.
    pub fn calling_context(&self) -> Option<&ExecutionContext> {
        let len = self.invocation_stack.len();
        if len < 2 {
            return None;
        }
        self.invocation_stack.get(len - 2)
    }

    /// Bottom-most frame.
    pub fn entry_context(&self) -> Result<&ExecutionContext, VmError> {
        self.invocation_stack.first().ok_or(VmError::NoContext)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Loading and running
    // ═══════════════════════════════════════════════════════════════════════

    /// Drop every frame and result and return to the initial state.
    pub fn reset(&mut self) {
        self.invocation_stack.clear();
        self.result_stack.clear();
        self.state = VmState::None;
        self.fault = None;
        self.steps = 0;
        self.resume_at = None;
    }

    /// Push a new frame for `code` without running it.
    pub fn load_code(&mut self, code: &[u8], push_only: bool) -> Result<(), VmError> {
        let context = ExecutionContext::new(Rc::from(code), push_only);
        self.push_context(context)
    }

    pub(crate) fn push_context(&mut self, context: ExecutionContext) -> Result<(), VmError> {
        if self.invocation_stack.len() >= self.config.max_invocation_depth {
            return Err(VmError::InvocationDepthExceeded(
                self.config.max_invocation_depth,
            ));
        }
        self.invocation_stack.push(context);
        Ok(())
    }

    /// Run `code` with `args` on its evaluation stack and return the
    /// serialized top result item. An empty result stack yields no bytes.
    pub fn call(
        &mut self,
        caller: ProgramHash,
        code: &[u8],
        args: Vec<StackItem>,
    ) -> Result<Vec<u8>, VmError> {
        self.call_with_break_points(caller, code, args, &[])
    }

    /// Like [`call`](Self::call), with break points installed on the entry
    /// frame before the first instruction runs.
    ///
    /// Reaching a break point returns `Err(VmError::Break)` and leaves the
    /// invocation stack in place; [`execute`](Self::execute) or a step
    /// resumes it and [`result`](Self::result) reads the outcome.
    #[instrument(
        skip(self, code, args, break_points),
        fields(caller = %caller, code_len = code.len())
    )]
    pub fn call_with_break_points(
        &mut self,
        caller: ProgramHash,
        code: &[u8],
        args: Vec<StackItem>,
        break_points: &[usize],
    ) -> Result<Vec<u8>, VmError> {
        self.reset();
        self.abort.clear();
        self.caller = caller;
        self.load_code(code, false)?;
        {
            let context = self.current_context_mut()?;
            context.break_points.extend(break_points.iter().copied());
            for arg in args {
                context.evaluation_stack.push(arg);
            }
        }

        self.execute();
        self.result()
    }

    /// Outcome of the current run: the serialized top result item once
    /// halted, the fault once faulted, `VmError::Break` while suspended.
    pub fn result(&self) -> Result<Vec<u8>, VmError> {
        match self.state {
            VmState::Halt => match self.result_stack.peek(0) {
                Ok(item) => item.serialize(),
                Err(_) => Ok(Vec::new()),
            },
            VmState::Fault => Err(self.fault.clone().unwrap_or(VmError::Aborted)),
            VmState::Break | VmState::None => Err(VmError::Break),
        }
    }

    /// Run until the engine halts, faults or reaches a break point.
    pub fn execute(&mut self) -> VmState {
        if self.state == VmState::Break {
            self.resume_at = self.position();
            self.state = VmState::None;
        }
        while self.state == VmState::None {
            self.execute_next();
        }
        self.state
    }

    /// Execute one instruction, descending into calls.
    pub fn step_into(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.resume_at = self.position();
        self.state = VmState::None;
        self.execute_next();
        if self.state == VmState::None {
            self.state = VmState::Break;
        }
    }

    /// Execute one instruction of the current frame, running any call it
    /// makes to completion.
    pub fn step_over(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.resume_at = self.position();
        self.state = VmState::None;
        let depth = self.invocation_stack.len();
        loop {
            self.execute_next();
            if self.state != VmState::None || self.invocation_stack.len() <= depth {
                break;
            }
        }
        if self.state == VmState::None {
            self.state = VmState::Break;
        }
    }

    /// Run until the current frame returns.
    pub fn step_out(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.resume_at = self.position();
        self.state = VmState::None;
        let depth = self.invocation_stack.len();
        while self.state == VmState::None && self.invocation_stack.len() >= depth {
            self.execute_next();
        }
        if self.state == VmState::None {
            self.state = VmState::Break;
        }
    }

    pub fn add_break_point(&mut self, position: usize) -> Result<(), VmError> {
        self.current_context_mut()?.break_points.insert(position);
        Ok(())
    }

    /// Returns whether a break point was present.
    pub fn remove_break_point(&mut self, position: usize) -> Result<bool, VmError> {
        Ok(self.current_context_mut()?.break_points.remove(&position))
    }

    /// Depth and instruction pointer of the current frame.
    fn position(&self) -> Option<(usize, usize)> {
        self.invocation_stack
            .last()
            .map(|context| (self.invocation_stack.len(), context.instruction_pointer))
    }

    fn execute_next(&mut self) {
        let Some(context) = self.invocation_stack.last() else {
            self.state = VmState::Halt;
            return;
        };
        if self.abort.is_aborted() {
            self.set_fault(VmError::Aborted);
            return;
        }

        let here = (self.invocation_stack.len(), context.instruction_pointer);
        let resuming = self.resume_at.take() == Some(here);
        if !resuming && context.break_points.contains(&here.1) {
            debug!(position = here.1, depth = here.0, "break point reached");
            self.state = VmState::Break;
            return;
        }

        if self.steps >= self.config.max_steps {
            self.set_fault(VmError::StepLimitExceeded(self.config.max_steps));
            return;
        }
        self.steps += 1;

        if let Err(e) = self.execute_op() {
            self.set_fault(e);
        }
    }

    fn execute_op(&mut self) -> Result<(), VmError> {
        let context = self.current_context_mut()?;
        let position = context.instruction_pointer;
        // Running off the end of a script is an implicit RET.
        let opcode = match context.next_instruction() {
            Some(op) => {
                context.instruction_pointer += 1;
                op
            }
            None => opcode::RET,
        };
        if context.is_push_only() && opcode > opcode::PUSH16 && opcode != opcode::RET {
            return Err(VmError::PushOnlyViolation { opcode, position });
        }

        trace!(position, op = opcode::name(opcode), "exec");

        let handler = dispatch_table()[usize::from(opcode)]
            .ok_or(VmError::UnknownOpcode { opcode, position })?;
        handler(self, Instruction { opcode, position })?;
        self.check_stack_size()
    }

    fn set_fault(&mut self, error: VmError) {
        debug!(error = %error, steps = self.steps, "vm fault");
        self.state = VmState::Fault;
        self.fault = Some(error);
    }

    pub(crate) fn halt(&mut self) {
        self.state = VmState::Halt;
    }

    fn check_stack_size(&self) -> Result<(), VmError> {
        let size = self.result_stack.len()
            + self
                .invocation_stack
                .iter()
                .map(|c| c.evaluation_stack.len() + c.alt_stack.len())
                .sum::<usize>();
        if size > self.config.max_stack_size {
            return Err(VmError::StackOverflow {
                size,
                limit: self.config.max_stack_size,
            });
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Frame transitions
    // ═══════════════════════════════════════════════════════════════════════

    /// Pop the current frame and hand its evaluation stack to the caller.
    pub(crate) fn return_from_context(&mut self) -> Result<(), VmError> {
        let mut returning = self.invocation_stack.pop().ok_or(VmError::NoContext)?;
        match self.invocation_stack.last_mut() {
            Some(caller) => returning
                .evaluation_stack
                .move_to(&mut caller.evaluation_stack),
            None => {
                returning.evaluation_stack.move_to(&mut self.result_stack);
                self.halt();
            }
        }
        Ok(())
    }

    /// Enter `context`, moving the current evaluation stack into it. With
    /// `replace` the current frame is discarded first.
    pub(crate) fn enter_context(
        &mut self,
        mut context: ExecutionContext,
        replace: bool,
    ) -> Result<(), VmError> {
        let current = self.current_context_mut()?;
        current
            .evaluation_stack
            .move_to(&mut context.evaluation_stack);
        if replace {
            self.invocation_stack.pop();
        }
        self.push_context(context)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Evaluation stack helpers
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn eval_stack(&mut self) -> Result<&mut RandomAccessStack, VmError> {
        Ok(&mut self.current_context_mut()?.evaluation_stack)
    }

    pub(crate) fn alt_stack(&mut self) -> Result<&mut RandomAccessStack, VmError> {
        Ok(&mut self.current_context_mut()?.alt_stack)
    }

    /// Push onto the current evaluation stack.
    pub fn push(&mut self, item: StackItem) -> Result<(), VmError> {
        if let StackItem::ByteArray(bytes) = &item {
            self.check_item_size(bytes.len())?;
        }
        self.eval_stack()?.push(item);
        Ok(())
    }

    /// Pop from the current evaluation stack.
    pub fn pop(&mut self) -> Result<StackItem, VmError> {
        self.eval_stack()?.pop()
    }

    pub(crate) fn peek(&mut self, index: usize) -> Result<StackItem, VmError> {
        Ok(self.eval_stack()?.peek(index)?.clone())
    }

    pub(crate) fn pop_bool(&mut self) -> Result<bool, VmError> {
        Ok(self.pop()?.to_bool())
    }

    pub(crate) fn pop_bytes(&mut self) -> Result<Vec<u8>, VmError> {
        self.pop()?.to_bytes()
    }

    /// Pop an integer operand, enforcing the integer size limit.
    pub(crate) fn pop_int(&mut self) -> Result<BigInt, VmError> {
        let value = self.pop()?.to_bigint()?;
        self.check_int(&value)?;
        Ok(value)
    }

    /// Pop a non-negative integer that fits in `usize`.
    pub(crate) fn pop_index(&mut self) -> Result<usize, VmError> {
        let value = self.pop_int()?;
        usize::try_from(&value).map_err(|_| VmError::InvalidOperand(format!("index {value}")))
    }

    pub(crate) fn push_int(&mut self, value: BigInt) -> Result<(), VmError> {
        self.check_int(&value)?;
        self.push(StackItem::Integer(value))
    }

    pub(crate) fn check_int(&self, value: &BigInt) -> Result<(), VmError> {
        let size = bigint_to_bytes(value).len();
        if size > self.config.max_integer_size {
            return Err(VmError::ItemTooLarge {
                size,
                limit: self.config.max_integer_size,
            });
        }
        Ok(())
    }

    pub(crate) fn check_item_size(&self, size: usize) -> Result<(), VmError> {
        if size > self.config.max_item_size {
            return Err(VmError::ItemTooLarge {
                size,
                limit: self.config.max_item_size,
            });
        }
        Ok(())
    }

    pub(crate) fn check_array_size(&self, size: usize) -> Result<(), VmError> {
        if size > self.config.max_array_size {
            return Err(VmError::ArrayTooLarge {
                size,
                limit: self.config.max_array_size,
            });
        }
        Ok(())
    }

    pub(crate) fn interop_service(&self) -> Arc<dyn InteropService> {
        Arc::clone(&self.service)
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("state", &self.state)
            .field("depth", &self.invocation_stack.len())
            .field("steps", &self.steps)
            .finish_non_exhaustive()
    }
}
