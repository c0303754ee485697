//! Stack, control-flow, and call-convention opcode handlers.
//!
//! `CALL` is the interesting one: before building a frame it walks forward
//! past its own binding operand and through any chain of unconditional
//! `JUMP`s (the ones `if`/`then`/`else` emits to skip an else-branch). If
//! that walk lands on `RETURN`, the call is in tail position — even across
//! an intervening `if` — so the opcode byte is rewritten to `TCALL` in
//! place and the main loop re-dispatches from the same address. Following
//! the jump chain is safe either way: jumps have no side effects, so the
//! landing instruction is exactly where control would end up whether or not
//! the call is a tail call.

use crate::error::WrenError;
use crate::opcode::Opcode;
use crate::store::{Addr, Store, WORD_SIZE};

/// Check that `n` more words can be pushed without the stack colliding with
/// the code region.
pub fn need(sp: Addr, code_end: Addr, n: u16) -> Result<(), WrenError> {
    if (sp.diff(code_end)) < (n as i32) * (WORD_SIZE as i32) {
        Err(WrenError::StackOverflow)
    } else {
        Ok(())
    }
}

fn push(store: &mut Store, sp: Addr, code_end: Addr, value: i64) -> Result<Addr, WrenError> {
    need(sp, code_end, 1)?;
    let new_sp = sp.sub(WORD_SIZE);
    store.write_word(new_sp, value);
    Ok(new_sp)
}

pub fn push_literal(store: &mut Store, sp: Addr, code_end: Addr, pc: Addr) -> Result<(Addr, Addr), WrenError> {
    let value = store.read_word(pc);
    let new_sp = push(store, sp, code_end, value)?;
    Ok((new_sp, pc.offset(WORD_SIZE)))
}

pub fn push_short(store: &mut Store, sp: Addr, code_end: Addr, pc: Addr) -> Result<(Addr, Addr), WrenError> {
    let value = store.read_i16(pc) as i64;
    let new_sp = push(store, sp, code_end, value)?;
    Ok((new_sp, pc.offset(2)))
}

pub fn push_byte(store: &mut Store, sp: Addr, code_end: Addr, pc: Addr) -> Result<(Addr, Addr), WrenError> {
    let value = store.read_i8(pc) as i64;
    let new_sp = push(store, sp, code_end, value)?;
    Ok((new_sp, pc.offset(1)))
}

/// The operand is the address of the string's already-compiled bytes; the
/// value pushed is that address itself (a string is just where it lives).
pub fn push_string(store: &mut Store, sp: Addr, code_end: Addr, pc: Addr) -> Result<(Addr, Addr), WrenError> {
    let str_addr = pc;
    let new_sp = push(store, sp, code_end, str_addr.0 as i64)?;
    let len = store.read_cstr(str_addr).len();
    Ok((new_sp, pc.offset(len as u16 + 1)))
}

pub fn pop(sp: Addr) -> Addr {
    sp.offset(WORD_SIZE)
}

pub fn global_fetch(store: &mut Store, sp: Addr, code_end: Addr, pc: Addr) -> Result<(Addr, Addr), WrenError> {
    let addr = Addr(store.read_u16(pc));
    let value = store.read_word(addr);
    let new_sp = push(store, sp, code_end, value)?;
    Ok((new_sp, pc.offset(2)))
}

pub fn global_store(store: &mut Store, sp: Addr, pc: Addr) -> Addr {
    let addr = Addr(store.read_u16(pc));
    store.write_word(addr, store.read_word(sp));
    pc.offset(2)
}

pub fn local_fetch_n(store: &mut Store, sp: Addr, code_end: Addr, bp: Addr, n: u16) -> Result<Addr, WrenError> {
    let value = store.read_word(bp.sub(n * WORD_SIZE));
    push(store, sp, code_end, value)
}

pub fn local_fetch(store: &mut Store, sp: Addr, code_end: Addr, bp: Addr, pc: Addr) -> Result<(Addr, Addr), WrenError> {
    let idx = store.read_u8(pc) as u16;
    let new_sp = local_fetch_n(store, sp, code_end, bp, idx)?;
    Ok((new_sp, pc.offset(1)))
}

/// Walk forward through a chain of unconditional `JUMP`s starting at
/// `cont`, which points at the opcode byte of the instruction following a
/// `CALL`'s binding operand. Each `JUMP`'s own displacement is relative to
/// the address of its operand, not the byte after it, so advancing past the
/// opcode and adding the fetched displacement lands exactly on the target.
fn walk_jump_chain(store: &Store, mut cont: Addr) -> Addr {
    while store.read_u8(cont) == Opcode::Jump.as_u8() {
        let operand = cont.offset(1);
        let disp = store.read_u16(operand);
        cont = operand.offset(disp);
    }
    cont
}

/// Outcome of dispatching a `CALL` (or a `TCALL` produced by rewriting one).
pub enum CallOutcome {
    /// Rewritten to `TCALL` in place; re-dispatch from `instr_addr`.
    BecameTail { instr_addr: Addr },
    /// A genuine, frame-allocating call.
    Entered { sp: Addr, bp: Addr, pc: Addr },
}

/// `instr_addr` is the address `CALL`'s own opcode byte was read from;
/// `pc` is the address immediately after it, i.e. the 2-byte binding operand.
pub fn call(store: &mut Store, sp: Addr, code_end: Addr, bp: Addr, instr_addr: Addr, pc: Addr) -> Result<CallOutcome, WrenError> {
    let binding = Addr(store.read_u16(pc));
    let cont = walk_jump_chain(store, pc.offset(2));
    if store.read_u8(cont) == Opcode::Return.as_u8() {
        store.write_u8(instr_addr, Opcode::Tcall.as_u8());
        return Ok(CallOutcome::BecameTail { instr_addr });
    }
    let n = store.read_u8(binding) as u16;
    need(sp, code_end, 1)?;
    let new_sp = sp.sub(WORD_SIZE);
    let frame_word = (bp.0 as i64) | ((cont.0 as i64) << 16);
    store.write_word(new_sp, frame_word);
    Ok(CallOutcome::Entered { sp: new_sp, bp: new_sp.offset(n * WORD_SIZE), pc: binding.offset(1) })
}

/// `pc` here is the `TCALL`'s 2-byte binding operand, exactly as for `CALL`.
pub fn tcall(store: &mut Store, sp: Addr, bp: Addr, pc: Addr) -> (Addr, Addr) {
    let binding = Addr(store.read_u16(pc));
    let n = store.read_u8(binding) as u16;
    let frame_word = store.read_word(sp.offset(n * WORD_SIZE));
    // Source (`sp..`) and destination (`..bp`) can overlap when the callee's
    // arity exceeds the caller's by 2 or more, so this has to behave like
    // `memmove`, not a forward `memcpy`: walk high to low so a destination
    // word is always written only after its own value has been read.
    for i in (0..n).rev() {
        let value = store.read_word(sp.offset(i * WORD_SIZE));
        let dst = bp.sub((n - 1 - i) * WORD_SIZE);
        store.write_word(dst, value);
    }
    let new_sp = bp.sub(n * WORD_SIZE);
    store.write_word(new_sp, frame_word);
    (new_sp, binding.offset(1))
}

pub fn ret(store: &mut Store, sp: Addr, bp: Addr) -> (Addr, Addr, Addr) {
    let result = store.read_word(sp);
    let frame_word = store.read_word(sp.offset(WORD_SIZE));
    let caller_bp = Addr((frame_word & 0xffff) as u16);
    let return_pc = Addr(((frame_word >> 16) & 0xffff) as u16);
    let new_sp = bp;
    store.write_word(new_sp, result);
    (new_sp, caller_bp, return_pc)
}

pub fn branch(store: &Store, sp: Addr, pc: Addr) -> (Addr, Addr) {
    let cond = store.read_word(sp);
    let new_sp = sp.offset(WORD_SIZE);
    let new_pc = if cond == 0 { pc.offset(store.read_u16(pc)) } else { pc.offset(2) };
    (new_sp, new_pc)
}

pub fn jump(store: &Store, pc: Addr) -> Addr {
    pc.offset(store.read_u16(pc))
}

/// Foreign-function contract: arguments in natural left-to-right order,
/// one `i64` result. `ForeignFn` values live in an engine-owned table;
/// `CCALL`'s binding only ever holds a table index, never a raw pointer.
pub type ForeignFn = fn(&[i64]) -> i64;

/// Highest arity the calling convention bothers dispatching; matches the
/// original's fixed set of argument-count cases. Anything wider traps to 0
/// without invoking the foreign function.
pub const CCALL_MAX_ARITY: u8 = 7;

pub fn ccall(store: &mut Store, sp: Addr, pc: Addr, foreign_fns: &[ForeignFn]) -> (Addr, Addr) {
    let binding = Addr(store.read_u16(pc));
    let n = store.read_u8(binding) as u16;
    let table_index = store.read_word(binding.offset(1)) as usize;
    let result = if n as u8 > CCALL_MAX_ARITY {
        0
    } else {
        let mut args = vec![0i64; n as usize];
        for k in 0..n as usize {
            args[k] = store.read_word(sp.offset((n - 1 - k as u16) * WORD_SIZE));
        }
        foreign_fns.get(table_index).map(|f| f(&args)).unwrap_or(0)
    };
    let new_sp = if n == 0 { sp.sub(WORD_SIZE) } else { sp.offset((n - 1) * WORD_SIZE) };
    store.write_word(new_sp, result);
    (new_sp, pc.offset(2))
}

pub fn getc(store: &mut Store, sp: Addr, code_end: Addr) -> Result<Addr, WrenError> {
    use std::io::Read;
    let mut byte = [0u8; 1];
    let value = match std::io::stdin().read(&mut byte) {
        Ok(1) => byte[0] as i64,
        _ => -1,
    };
    push(store, sp, code_end, value)
}

/// Leaves the character on the stack (stack effect 0), matching the
/// original, which never pops it.
pub fn putc(store: &Store, sp: Addr) {
    use std::io::Write;
    let byte = store.read_word(sp) as u8;
    let _ = std::io::stdout().write_all(&[byte]);
}

pub fn fetch_byte(store: &mut Store, sp: Addr) {
    let addr = Addr(store.read_word(sp) as u16);
    let value = store.read_u8(addr) as i64;
    store.write_word(sp, value);
}

pub fn peek(store: &mut Store, sp: Addr) {
    let addr = Addr(store.read_word(sp) as u16);
    let value = store.read_word(addr);
    store.write_word(sp, value);
}

/// Writes `sp[0]` to the address in `sp[1]`, then pops once; the word left
/// on top is whatever was already sitting at the old `sp[1]` cell (the
/// address operand), which the pop exposes without needing a rewrite.
pub fn poke(store: &mut Store, sp: Addr) -> Addr {
    let value = store.read_word(sp);
    let addr = Addr(store.read_word(sp.offset(WORD_SIZE)) as u16);
    store.write_word(addr, value);
    sp.offset(WORD_SIZE)
}
