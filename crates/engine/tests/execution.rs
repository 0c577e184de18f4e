//! End-to-end script execution through the public engine API.

use meridian_engine::opcode::*;
use meridian_engine::{
    DefaultCrypto, EngineConfig, ExecutionEngine, InteropRegistry, InteropService, ScriptTable,
    StackItem, VmError, VmState,
};
use meridian_types::test_utils::{sign_transaction, test_keypair};
use meridian_types::{
    multisig_redeem_script, signature_redeem_script, signatures_parameter, to_code_hash,
    ProgramHash, ScriptBuilder, Transaction,
};
use num_bigint::BigInt;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_test::traced_test;

fn engine() -> ExecutionEngine {
    ExecutionEngine::new(None, Arc::new(DefaultCrypto), None, EngineConfig::default())
}

fn run(script: &[u8]) -> ExecutionEngine {
    let mut engine = engine();
    engine.load_code(script, false).unwrap();
    engine.execute();
    engine
}

fn top_int(engine: &ExecutionEngine) -> BigInt {
    engine.result_stack().peek(0).unwrap().to_bigint().unwrap()
}

fn top_bool(engine: &ExecutionEngine) -> bool {
    engine.result_stack().peek(0).unwrap().to_bool()
}

struct Contracts(HashMap<ProgramHash, Vec<u8>>);

impl ScriptTable for Contracts {
    fn get_script(&self, script_hash: &ProgramHash) -> Option<Vec<u8>> {
        self.0.get(script_hash).cloned()
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Basic execution
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_add_halts_with_sum() {
    let engine = run(&[PUSH1, PUSH2, ADD]);
    assert_eq!(engine.state(), VmState::Halt);
    assert_eq!(engine.result_stack().len(), 1);
    assert_eq!(top_int(&engine), BigInt::from(3));
}

#[test]
fn test_empty_engine_has_no_context() {
    let mut engine = engine();
    assert!(matches!(engine.current_context(), Err(VmError::NoContext)));
    assert_eq!(engine.add_break_point(0), Err(VmError::NoContext));
    assert_eq!(engine.execute(), VmState::Halt);
    assert!(engine.result_stack().is_empty());
}

#[test]
fn test_large_integer_comparison() {
    let big = BigInt::from(10).pow(33);
    let bigger: BigInt = &big + 1;
    let script = ScriptBuilder::new()
        .push_data(&big.to_signed_bytes_le())
        .push_data(&big.to_signed_bytes_le())
        .emit(NUMEQUAL)
        .push_data(&big.to_signed_bytes_le())
        .push_data(&bigger.to_signed_bytes_le())
        .emit(NUMNOTEQUAL)
        .emit(BOOLAND)
        .into_script();
    let engine = run(&script);
    assert_eq!(engine.state(), VmState::Halt);
    assert!(top_bool(&engine));
}

#[test]
fn test_integer_size_limit() {
    let huge = BigInt::from(1) << 300usize;
    let script = ScriptBuilder::new()
        .push_data(&huge.to_signed_bytes_le())
        .emit(PUSH1)
        .emit(ADD)
        .into_script();
    let engine = run(&script);
    assert_eq!(engine.state(), VmState::Fault);
    assert!(matches!(engine.fault(), Some(VmError::ItemTooLarge { .. })));
}

#[test]
fn test_pushdata_past_end_faults() {
    let engine = run(&[PUSHDATA1, 0x05, 0x01]);
    assert_eq!(engine.state(), VmState::Fault);
    assert!(matches!(engine.fault(), Some(VmError::ScriptOverrun { .. })));
}

#[test]
fn test_unknown_opcode_faults() {
    let engine = run(&[PUSH1, 0xFF]);
    assert_eq!(
        engine.fault(),
        Some(&VmError::UnknownOpcode {
            opcode: 0xFF,
            position: 1
        })
    );
}

#[test]
fn test_division_by_zero_faults() {
    let engine = run(&[PUSH1, PUSH0, DIV]);
    assert_eq!(engine.fault(), Some(&VmError::DivisionByZero));
}

#[test]
fn test_division_truncates_toward_zero() {
    let script = ScriptBuilder::new()
        .push_int(-7)
        .push_int(2)
        .emit(DIV)
        .push_int(-7)
        .push_int(2)
        .emit(MOD)
        .into_script();
    let engine = run(&script);
    assert_eq!(top_int(&engine), BigInt::from(-1));
    assert_eq!(
        engine.result_stack().peek(1).unwrap().to_bigint().unwrap(),
        BigInt::from(-3)
    );
}

#[test]
fn test_push_only_rejects_other_opcodes() {
    let mut engine = engine();
    engine.load_code(&[PUSH1, PUSH2, ADD], true).unwrap();
    engine.execute();
    assert_eq!(
        engine.fault(),
        Some(&VmError::PushOnlyViolation {
            opcode: ADD,
            position: 2
        })
    );
}

#[test]
fn test_throwifnot() {
    assert_eq!(run(&[PUSH0, THROWIFNOT]).fault(), Some(&VmError::Thrown));
    assert_eq!(run(&[PUSH1, THROWIFNOT]).state(), VmState::Halt);
}

#[test]
fn test_stack_size_limit() {
    let mut engine = ExecutionEngine::new(
        None,
        Arc::new(DefaultCrypto),
        None,
        EngineConfig::default().with_max_stack_size(2),
    );
    engine.load_code(&[PUSH1, PUSH1, PUSH1], false).unwrap();
    engine.execute();
    assert_eq!(
        engine.fault(),
        Some(&VmError::StackOverflow { size: 3, limit: 2 })
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Flow control
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_jmpif_skips_instruction() {
    // 0: PUSH1  1: JMPIF +4 -> 5  4: PUSH2  5: PUSH3
    let engine = run(&[PUSH1, JMPIF, 0x04, 0x00, PUSH2, PUSH3]);
    assert_eq!(engine.state(), VmState::Halt);
    assert_eq!(engine.result_stack().len(), 1);
    assert_eq!(top_int(&engine), BigInt::from(3));
}

#[test]
fn test_jump_out_of_bounds_faults() {
    let engine = run(&[JMP, 0x10, 0x00]);
    assert_eq!(
        engine.fault(),
        Some(&VmError::InvalidJump {
            target: 16,
            len: 3
        })
    );
}

#[test]
fn test_call_and_return() {
    // 0: PUSH2  1: CALL +4 -> 5  4: RET  5: PUSH3  6: ADD  7: RET
    let engine = run(&[PUSH2, CALL, 0x04, 0x00, RET, PUSH3, ADD, RET]);
    assert_eq!(engine.state(), VmState::Halt);
    assert_eq!(engine.result_stack().len(), 1);
    assert_eq!(top_int(&engine), BigInt::from(5));
}

#[test]
fn test_app_call_runs_contract() {
    let contract = vec![PUSH3, ADD];
    let hash = to_code_hash(&contract);
    let table = Contracts(HashMap::from([(hash, contract)]));

    let mut script = vec![PUSH2, APPCALL];
    script.extend_from_slice(hash.as_bytes());

    let mut engine = engine().with_script_table(Arc::new(table));
    engine.load_code(&script, false).unwrap();
    assert_eq!(engine.execute(), VmState::Halt);
    assert_eq!(top_int(&engine), BigInt::from(5));
}

#[test]
fn test_app_call_without_table_faults() {
    let mut script = vec![APPCALL];
    script.extend_from_slice(&[9u8; 20]);
    let engine = run(&script);
    assert!(matches!(engine.fault(), Some(VmError::NoScriptTable(_))));
}

#[test]
fn test_step_limit() {
    let mut engine = ExecutionEngine::new(
        None,
        Arc::new(DefaultCrypto),
        None,
        EngineConfig::default().with_max_steps(100),
    );
    engine.load_code(&[JMP, 0x00, 0x00], false).unwrap();
    assert_eq!(engine.execute(), VmState::Fault);
    assert_eq!(engine.fault(), Some(&VmError::StepLimitExceeded(100)));
    assert_eq!(engine.steps(), 100);
}

#[test]
fn test_abort_stops_execution() {
    let mut engine = engine();
    let handle = engine.abort_handle();
    engine.load_code(&[JMP, 0x00, 0x00], false).unwrap();
    handle.abort();
    assert_eq!(engine.execute(), VmState::Fault);
    assert_eq!(engine.fault(), Some(&VmError::Aborted));
}

// ═══════════════════════════════════════════════════════════════════════════
// Debugging
// ═══════════════════════════════════════════════════════════════════════════

#[test]
#[traced_test]
fn test_break_point_and_step_over() {
    let mut engine = engine();
    engine.load_code(&[PUSH1, PUSH2, ADD], false).unwrap();
    engine.add_break_point(2).unwrap();

    assert_eq!(engine.execute(), VmState::Break);
    assert_eq!(engine.current_context().unwrap().instruction_pointer(), 2);
    assert_eq!(engine.current_context().unwrap().evaluation_stack().len(), 2);

    engine.step_over();
    assert_eq!(engine.state(), VmState::Break);
    assert_eq!(engine.current_context().unwrap().instruction_pointer(), 3);

    assert_eq!(engine.execute(), VmState::Halt);
    assert_eq!(top_int(&engine), BigInt::from(3));
}

#[test]
fn test_step_into_and_out_of_call() {
    let mut engine = engine();
    engine
        .load_code(&[PUSH2, CALL, 0x04, 0x00, RET, PUSH3, ADD, RET], false)
        .unwrap();

    engine.step_into();
    engine.step_into();
    assert_eq!(engine.state(), VmState::Break);
    assert_eq!(engine.invocation_depth(), 2);

    engine.step_out();
    assert_eq!(engine.state(), VmState::Break);
    assert_eq!(engine.invocation_depth(), 1);
    assert_eq!(engine.current_context().unwrap().instruction_pointer(), 4);

    assert_eq!(engine.execute(), VmState::Halt);
    assert_eq!(top_int(&engine), BigInt::from(5));
}

#[test]
fn test_removed_break_point_is_not_hit() {
    let mut engine = engine();
    engine.load_code(&[PUSH1, PUSH2, ADD], false).unwrap();
    engine.add_break_point(1).unwrap();
    assert!(engine.remove_break_point(1).unwrap());
    assert_eq!(engine.execute(), VmState::Halt);
}

#[test]
#[traced_test]
fn test_call_suspends_at_break_point_once() {
    let mut engine = engine();
    let code = [PUSH1, PUSH2, ADD];

    assert_eq!(
        engine.call_with_break_points(ProgramHash::default(), &code, Vec::new(), &[2]),
        Err(VmError::Break)
    );
    assert_eq!(engine.state(), VmState::Break);
    assert_eq!(engine.invocation_depth(), 1);
    let context = engine.current_context().unwrap();
    assert_eq!(context.instruction_pointer(), 2);
    assert_eq!(context.evaluation_stack().len(), 2);

    // ADD runs; the break point is not hit a second time.
    engine.step_over();
    assert_eq!(engine.state(), VmState::Break);
    assert_eq!(engine.current_context().unwrap().instruction_pointer(), 3);
    engine.step_over();
    assert_eq!(engine.state(), VmState::Halt);

    let out = engine.result().unwrap();
    assert_eq!(
        StackItem::deserialize(&out).unwrap().to_bigint().unwrap(),
        BigInt::from(3)
    );
}

#[test]
fn test_call_resumes_with_execute() {
    let mut engine = engine();
    let result = engine.call_with_break_points(
        ProgramHash::default(),
        &[PUSH1, PUSH2, ADD],
        Vec::new(),
        &[1],
    );
    assert_eq!(result, Err(VmError::Break));
    assert_eq!(engine.current_context().unwrap().evaluation_stack().len(), 1);

    assert_eq!(engine.execute(), VmState::Halt);
    assert_eq!(top_int(&engine), BigInt::from(3));

    // A plain call starts clean.
    let out = engine
        .call(ProgramHash::default(), &[PUSH1, PUSH2, ADD], Vec::new())
        .unwrap();
    assert_eq!(
        StackItem::deserialize(&out).unwrap().to_bigint().unwrap(),
        BigInt::from(3)
    );
}

#[test]
fn test_break_point_at_entry() {
    let mut engine = engine();
    engine.load_code(&[PUSH1, PUSH2, ADD], false).unwrap();
    engine.add_break_point(0).unwrap();

    assert_eq!(engine.execute(), VmState::Break);
    assert_eq!(engine.current_context().unwrap().instruction_pointer(), 0);
    assert_eq!(engine.steps(), 0);

    assert_eq!(engine.execute(), VmState::Halt);
    assert_eq!(top_int(&engine), BigInt::from(3));
}

#[test]
fn test_break_point_in_called_frame() {
    let mut engine = engine();
    engine
        .load_code(&[PUSH2, CALL, 0x04, 0x00, RET, PUSH3, ADD, RET], false)
        .unwrap();
    engine.step_into();
    engine.step_into();
    assert_eq!(engine.invocation_depth(), 2);
    // The callee starts at offset 5 of the same script.
    engine.add_break_point(6).unwrap();
    engine.step_out();
    assert_eq!(engine.state(), VmState::Break);
    assert_eq!(engine.invocation_depth(), 2);
    assert_eq!(engine.current_context().unwrap().instruction_pointer(), 6);

    assert_eq!(engine.execute(), VmState::Halt);
    assert_eq!(top_int(&engine), BigInt::from(5));
}

// ═══════════════════════════════════════════════════════════════════════════
// Arrays
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_pack_and_pick_item() {
    // PACK puts the first popped item at index 0
    let engine = run(&[PUSH1, PUSH2, PUSH3, PUSH3, PACK, PUSH0, PICKITEM]);
    assert_eq!(top_int(&engine), BigInt::from(3));
}

#[test]
fn test_new_array_set_item_shares_list() {
    // SETITEM through a DUP is visible through the original handle
    let script = ScriptBuilder::new()
        .push_int(2)
        .emit(NEWARRAY)
        .emit(DUP)
        .push_int(1)
        .push_int(7)
        .emit(SETITEM)
        .emit(DUP)
        .push_int(1)
        .emit(PICKITEM)
        .into_script();
    let engine = run(&script);
    assert_eq!(engine.state(), VmState::Halt);
    assert_eq!(top_int(&engine), BigInt::from(7));
    let array = engine.result_stack().peek(1).unwrap();
    let list = array.as_list().unwrap().borrow();
    assert!(matches!(list[0], StackItem::Boolean(false)));
}

#[test]
fn test_pick_item_out_of_range() {
    let engine = run(&[PUSH1, NEWARRAY, PUSH2, PICKITEM]);
    assert!(matches!(
        engine.fault(),
        Some(VmError::IndexOutOfRange { index: 2, len: 1 })
    ));
}

// ═══════════════════════════════════════════════════════════════════════════
// Interop and call()
// ═══════════════════════════════════════════════════════════════════════════

const CODE: &str = "52c56b6153c56c766b00527ac46c766b00c35161682b53797374656d2e457865637574696f6e456e67696e652e47657443616c6c696e6753637269707448617368c46c766b00c35261682d53797374656d2e457865637574696f6e456e67696e652e476574457865637574696e6753637269707448617368c46c766b00c36c766b51527ac46203006c766b51c3616c7566";

#[test]
fn test_call_reports_calling_and_executing_hashes() {
    let code = hex::decode(CODE).unwrap();
    let caller = ProgramHash::from_bytes([7u8; 20]);
    let mut engine = engine();

    let bytes = engine.call(caller, &code, Vec::new()).unwrap();
    assert_eq!(engine.state(), VmState::Halt);

    let result = engine.result_stack().peek(0).unwrap();
    let items = result.as_list().unwrap().borrow();
    assert_eq!(items.len(), 3);
    assert!(matches!(items[0], StackItem::Boolean(false)));
    assert_eq!(items[1].to_bytes().unwrap(), caller.as_bytes().to_vec());
    assert_eq!(
        items[2].to_bytes().unwrap(),
        to_code_hash(&code).as_bytes().to_vec()
    );

    let decoded = StackItem::deserialize(&bytes).unwrap();
    assert_eq!(decoded.as_list().unwrap().borrow().len(), 3);
}

#[test]
fn test_call_passes_arguments_and_resets() {
    let mut engine = engine();
    let caller = ProgramHash::default();
    let out = engine
        .call(caller, &[ADD], vec![StackItem::from(40i64), StackItem::from(2i64)])
        .unwrap();
    assert_eq!(
        StackItem::deserialize(&out).unwrap().to_bigint().unwrap(),
        BigInt::from(42)
    );

    assert_eq!(
        engine.call(caller, &[THROW], Vec::new()),
        Err(VmError::Thrown)
    );
    // Reused after a fault
    let out = engine.call(caller, &[PUSH1], Vec::new()).unwrap();
    assert_eq!(
        StackItem::deserialize(&out).unwrap().to_bigint().unwrap(),
        BigInt::from(1)
    );
}

#[test]
fn test_call_with_empty_result() {
    let out = engine()
        .call(ProgramHash::default(), &[NOP], Vec::new())
        .unwrap();
    assert!(out.is_empty());
}

#[test]
fn test_custom_syscall() {
    let mut registry = InteropRegistry::with_builtins();
    registry.register("Test.Answer", |engine| engine.push(StackItem::from(42i64)));
    let service: Arc<dyn InteropService> = Arc::new(registry);
    let mut engine =
        ExecutionEngine::new(None, Arc::new(DefaultCrypto), Some(service), EngineConfig::default());

    let mut script = vec![SYSCALL, 11];
    script.extend_from_slice(b"Test.Answer");
    engine.load_code(&script, false).unwrap();
    assert_eq!(engine.execute(), VmState::Halt);
    assert_eq!(top_int(&engine), BigInt::from(42));
}

#[test]
fn test_unknown_syscall_faults() {
    let mut script = vec![SYSCALL, 3];
    script.extend_from_slice(b"Nop");
    let engine = run(&script);
    assert_eq!(
        engine.fault(),
        Some(&VmError::UnknownSyscall("Nop".to_string()))
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Signatures
// ═══════════════════════════════════════════════════════════════════════════

fn verify_witness(tx: &Transaction, parameter: &[u8], code: &[u8]) -> VmState {
    let mut engine = ExecutionEngine::new(
        Some(Arc::new(tx.clone())),
        Arc::new(DefaultCrypto),
        None,
        EngineConfig::default(),
    );
    engine.load_code(code, false).unwrap();
    engine.load_code(parameter, true).unwrap();
    let state = engine.execute();
    if state == VmState::Halt && !top_bool(&engine) {
        return VmState::Fault;
    }
    state
}

#[test]
fn test_checksig_with_signed_transaction() {
    let key = test_keypair(1);
    let mut tx = Transaction::bookkeeping(7);
    sign_transaction(&mut tx, &key);
    let program = tx.programs()[0].clone();
    assert_eq!(
        verify_witness(&tx, &program.parameter, &program.code),
        VmState::Halt
    );

    let other = test_keypair(2);
    let wrong_code = signature_redeem_script(&other.public_key());
    assert_eq!(
        verify_witness(&tx, &program.parameter, &wrong_code),
        VmState::Fault
    );
}

#[test]
fn test_checksig_without_container_faults() {
    let key = test_keypair(1);
    let sig = key.sign(b"anything");
    let mut script = signatures_parameter(&[sig]);
    script.extend(signature_redeem_script(&key.public_key()));
    let engine = run(&script);
    assert_eq!(engine.fault(), Some(&VmError::NoScriptContainer));
}

#[test]
fn test_checkmultisig_two_of_three() {
    let tx = Transaction::bookkeeping(9);
    let mut keys = vec![test_keypair(1), test_keypair(2), test_keypair(3)];
    keys.sort_by_key(|k| k.public_key());
    let public_keys: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
    let code = multisig_redeem_script(2, &public_keys);
    let message = tx.hash_data();

    let good = signatures_parameter(&[keys[0].sign(&message), keys[2].sign(&message)]);
    assert_eq!(verify_witness(&tx, &good, &code), VmState::Halt);

    let out_of_order = signatures_parameter(&[keys[2].sign(&message), keys[0].sign(&message)]);
    assert_eq!(verify_witness(&tx, &out_of_order, &code), VmState::Fault);

    let one_short = signatures_parameter(&[keys[1].sign(&message)]);
    let mut engine = ExecutionEngine::new(
        Some(Arc::new(tx.clone())),
        Arc::new(DefaultCrypto),
        None,
        EngineConfig::default(),
    );
    engine.load_code(&code, false).unwrap();
    engine.load_code(&one_short, true).unwrap();
    assert_eq!(engine.execute(), VmState::Fault);
}
