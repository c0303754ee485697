//! Arithmetic, comparison, and bitwise opcode handlers.
//!
//! Every handler here consumes its operands from the top of the stack and
//! leaves exactly one result in their place — `sp` always ends up one word
//! higher than it started (`sp[1] op sp[0]` collapses to one cell).
//! Signed operations use host two's-complement `i64` arithmetic, including
//! its overflow/trap behavior; `u*` variants reinterpret both operands as
//! `u64` first.

use crate::store::{Addr, Store};

/// Binary op: pop two words, push `f(left, right)`. `sp[1]` is `left` (the
/// operand pushed first), `sp[0]` is `right` (pushed second, topmost).
fn binary(store: &mut Store, sp: Addr, f: impl Fn(i64, i64) -> i64) -> Addr {
    let right = store.read_word(sp);
    let new_sp = sp.offset(8);
    let left = store.read_word(new_sp);
    store.write_word(new_sp, f(left, right));
    new_sp
}

fn binary_unsigned(store: &mut Store, sp: Addr, f: impl Fn(u64, u64) -> u64) -> Addr {
    binary(store, sp, |l, r| f(l as u64, r as u64) as i64)
}

pub fn add(store: &mut Store, sp: Addr) -> Addr {
    binary(store, sp, |l, r| l.wrapping_add(r))
}

pub fn sub(store: &mut Store, sp: Addr) -> Addr {
    binary(store, sp, |l, r| l.wrapping_sub(r))
}

pub fn mul(store: &mut Store, sp: Addr) -> Addr {
    binary(store, sp, |l, r| l.wrapping_mul(r))
}

/// Division and remainder trap on a zero divisor rather than surfacing a
/// recoverable error, matching the host's own trap behavior (the same way
/// the original C build crashes on an integer divide by zero) rather than
/// the language's own error categories, none of which cover this case.
pub fn div(store: &mut Store, sp: Addr) -> Addr {
    binary(store, sp, |l, r| l.wrapping_div(r))
}

pub fn modulo(store: &mut Store, sp: Addr) -> Addr {
    binary(store, sp, |l, r| l.wrapping_rem(r))
}

pub fn umul(store: &mut Store, sp: Addr) -> Addr {
    binary_unsigned(store, sp, |l, r| l.wrapping_mul(r))
}

pub fn udiv(store: &mut Store, sp: Addr) -> Addr {
    binary_unsigned(store, sp, |l, r| l.wrapping_div(r))
}

pub fn umod(store: &mut Store, sp: Addr) -> Addr {
    binary_unsigned(store, sp, |l, r| l.wrapping_rem(r))
}

pub fn negate(store: &mut Store, sp: Addr) {
    let v = store.read_word(sp);
    store.write_word(sp, v.wrapping_neg());
}

pub fn eq(store: &mut Store, sp: Addr) -> Addr {
    binary(store, sp, |l, r| (l == r) as i64)
}

pub fn lt(store: &mut Store, sp: Addr) -> Addr {
    binary(store, sp, |l, r| (l < r) as i64)
}

pub fn ult(store: &mut Store, sp: Addr) -> Addr {
    binary_unsigned(store, sp, |l, r| (l < r) as u64)
}

pub fn and(store: &mut Store, sp: Addr) -> Addr {
    binary(store, sp, |l, r| l & r)
}

pub fn or(store: &mut Store, sp: Addr) -> Addr {
    binary(store, sp, |l, r| l | r)
}

pub fn xor(store: &mut Store, sp: Addr) -> Addr {
    binary(store, sp, |l, r| l ^ r)
}

pub fn sla(store: &mut Store, sp: Addr) -> Addr {
    binary(store, sp, |l, r| l.wrapping_shl(r as u32))
}

pub fn sra(store: &mut Store, sp: Addr) -> Addr {
    binary(store, sp, |l, r| l.wrapping_shr(r as u32))
}

pub fn srl(store: &mut Store, sp: Addr) -> Addr {
    binary_unsigned(store, sp, |l, r| l.wrapping_shr(r as u32))
}
