use super::*;
use crate::assembler::{self, Assembler};
use crate::store::Endianness;

fn fresh(capacity: usize) -> Store {
    Store::new(capacity, Endianness::Little)
}

#[test]
fn arithmetic_expression_halts_with_result() {
    let mut store = fresh(4096);
    let mut asm = Assembler::new();
    let entry = store.compiler_ptr();
    asm.gen(&mut store, Opcode::Push).unwrap();
    asm.gen_value(&mut store, 3).unwrap();
    asm.gen(&mut store, Opcode::Push).unwrap();
    asm.gen_value(&mut store, 4).unwrap();
    asm.gen(&mut store, Opcode::Add).unwrap();
    asm.gen(&mut store, Opcode::Halt).unwrap();
    let code_end = store.compiler_ptr();

    let result = run(&mut store, &[], entry, code_end).unwrap();
    assert_eq!(result, 7);
}

#[test]
fn global_store_then_fetch_round_trips() {
    let mut store = fresh(4096);
    let global_cell = Addr(4 * WORD_SIZE); // just past the reserved cp/dp/c0/d0 cells
    let mut asm = Assembler::new();
    let entry = store.compiler_ptr();
    asm.gen(&mut store, Opcode::Push).unwrap();
    asm.gen_value(&mut store, 41).unwrap();
    asm.gen(&mut store, Opcode::GlobalStore).unwrap();
    asm.gen_ushort(&mut store, global_cell.0).unwrap();
    asm.gen(&mut store, Opcode::Pop).unwrap();
    asm.gen(&mut store, Opcode::GlobalFetch).unwrap();
    asm.gen_ushort(&mut store, global_cell.0).unwrap();
    asm.gen(&mut store, Opcode::Push).unwrap();
    asm.gen_value(&mut store, 1).unwrap();
    asm.gen(&mut store, Opcode::Add).unwrap();
    asm.gen(&mut store, Opcode::Halt).unwrap();
    let code_end = store.compiler_ptr();

    let result = run(&mut store, &[], entry, code_end).unwrap();
    assert_eq!(result, 42);
}

/// A recursive countdown whose self-call sits directly before its `RETURN`.
/// With a store far too small to hold one stack frame per recursive level,
/// this only succeeds if `CALL` is rewritten to `TCALL` at runtime and the
/// frame is reused rather than grown.
#[test]
fn tail_recursive_call_does_not_grow_the_stack() {
    let mut store = fresh(512);
    let mut asm = Assembler::new();

    let proc_addr = store.compiler_ptr();
    asm.gen_ubyte(&mut store, 1).unwrap(); // arity
    asm.gen(&mut store, Opcode::LocalFetch0).unwrap();
    asm.gen(&mut store, Opcode::Branch).unwrap();
    let branch_ref = assembler::forward_ref(&mut store).unwrap();
    asm.gen(&mut store, Opcode::LocalFetch0).unwrap();
    asm.gen(&mut store, Opcode::Pushb).unwrap();
    asm.gen_sbyte(&mut store, 1).unwrap();
    asm.gen(&mut store, Opcode::Sub).unwrap();
    let recursive_call_site = store.compiler_ptr();
    asm.gen(&mut store, Opcode::Call).unwrap();
    asm.gen_ushort(&mut store, proc_addr.0).unwrap();
    asm.gen(&mut store, Opcode::Return).unwrap();
    assembler::resolve(&mut store, branch_ref);
    asm.gen(&mut store, Opcode::Pushb).unwrap();
    asm.gen_sbyte(&mut store, 0).unwrap();
    asm.gen(&mut store, Opcode::Return).unwrap();

    let entry = store.compiler_ptr();
    asm.gen(&mut store, Opcode::Push).unwrap();
    asm.gen_value(&mut store, 2000).unwrap();
    asm.gen(&mut store, Opcode::Call).unwrap();
    asm.gen_ushort(&mut store, proc_addr.0).unwrap();
    asm.gen(&mut store, Opcode::Halt).unwrap();
    let code_end = store.compiler_ptr();

    let result = run(&mut store, &[], entry, code_end).unwrap();
    assert_eq!(result, 0);
    assert_eq!(store.read_u8(recursive_call_site), Opcode::Tcall.as_u8());
}

#[test]
fn ccall_reaches_a_foreign_function() {
    fn double_it(args: &[i64]) -> i64 {
        args[0] * 2
    }
    let fns: [ForeignFn; 1] = [double_it];

    let mut store = fresh(4096);
    let binding = Addr(4 * WORD_SIZE);
    store.write_u8(binding, 1); // arity
    store.write_word(binding.offset(1), 0); // table index 0

    let mut asm = Assembler::new();
    let entry = store.compiler_ptr();
    asm.gen(&mut store, Opcode::Push).unwrap();
    asm.gen_value(&mut store, 21).unwrap();
    asm.gen(&mut store, Opcode::Ccall).unwrap();
    asm.gen_ushort(&mut store, binding.0).unwrap();
    asm.gen(&mut store, Opcode::Halt).unwrap();
    let code_end = store.compiler_ptr();

    let result = run(&mut store, &fns, entry, code_end).unwrap();
    assert_eq!(result, 42);
}

#[test]
fn peek_and_poke_round_trip_through_the_store() {
    let mut store = fresh(4096);
    let cell = Addr(4 * WORD_SIZE);
    store.write_word(cell, 0);

    let mut asm = Assembler::new();
    let entry = store.compiler_ptr();
    // poke(cell, 7): address pushed first (ends up sp[1]), value on top (sp[0]).
    asm.gen(&mut store, Opcode::Push).unwrap();
    asm.gen_value(&mut store, cell.0 as i64).unwrap();
    asm.gen(&mut store, Opcode::Push).unwrap();
    asm.gen_value(&mut store, 7).unwrap();
    asm.gen(&mut store, Opcode::Poke).unwrap();
    // poke leaves the address on top; drop it before peeking.
    asm.gen(&mut store, Opcode::Pop).unwrap();
    // peek(cell)
    asm.gen(&mut store, Opcode::Push).unwrap();
    asm.gen_value(&mut store, cell.0 as i64).unwrap();
    asm.gen(&mut store, Opcode::Peek).unwrap();
    asm.gen(&mut store, Opcode::Halt).unwrap();
    let code_end = store.compiler_ptr();

    let result = run(&mut store, &[], entry, code_end).unwrap();
    assert_eq!(result, 7);
    assert_eq!(store.read_word(cell), 7);
}
