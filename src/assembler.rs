//! # Assembler
//!
//! An append-only writer over the store's code region. Every `gen_*` call
//! writes at `compiler_ptr` and advances it; `gen` (an opcode byte) also
//! records `prev_instruc`, the address of the last-emitted *opcode* — never
//! an immediate operand byte — so the compiler's peephole optimizations
//! (literal negation, assignment rewriting) can find and rewind past it.
//!
//! Unlike [`crate::store::Store`], this doesn't own the store it writes
//! into: the compiler also needs a mutable borrow of the store for the
//! lexer (string literals land there too), so `Assembler` only carries the
//! one piece of state that must outlive any single borrow — `prev_instruc`
//! — and takes `&mut Store` as a parameter on every call, same as the
//! `dictionary`/`vm` modules.

use crate::error::WrenError;
use crate::opcode::Opcode;
use crate::store::{Addr, Store};

#[derive(Default)]
pub struct Assembler {
    prev_instruc: Option<Addr>,
}

impl Assembler {
    pub fn new() -> Self {
        Assembler { prev_instruc: None }
    }

    pub fn prev_instruc(&self) -> Option<Addr> {
        self.prev_instruc
    }

    /// A merge point in control flow (e.g. after an if/then/else) makes the
    /// peephole unsafe: forget the last-emitted opcode address.
    pub fn block_prev(&mut self) {
        self.prev_instruc = None;
    }

    /// Emit an opcode byte and record it as the new `prev_instruc`.
    pub fn gen(&mut self, store: &mut Store, opcode: Opcode) -> Result<(), WrenError> {
        store.available(1)?;
        let at = store.compiler_ptr();
        self.prev_instruc = Some(at);
        store.write_u8(at, opcode.as_u8());
        store.set_compiler_ptr(at.offset(1));
        Ok(())
    }

    pub fn gen_ubyte(&mut self, store: &mut Store, b: u8) -> Result<(), WrenError> {
        store.available(1)?;
        let at = store.compiler_ptr();
        store.write_u8(at, b);
        store.set_compiler_ptr(at.offset(1));
        Ok(())
    }

    pub fn gen_sbyte(&mut self, store: &mut Store, b: i8) -> Result<(), WrenError> {
        self.gen_ubyte(store, b as u8)
    }

    pub fn gen_ushort(&mut self, store: &mut Store, v: u16) -> Result<(), WrenError> {
        store.available(2)?;
        let at = store.compiler_ptr();
        store.write_u16(at, v);
        store.set_compiler_ptr(at.offset(2));
        Ok(())
    }

    pub fn gen_sshort(&mut self, store: &mut Store, v: i16) -> Result<(), WrenError> {
        self.gen_ushort(store, v as u16)
    }

    pub fn gen_value(&mut self, store: &mut Store, v: i64) -> Result<(), WrenError> {
        store.available(8)?;
        let at = store.compiler_ptr();
        store.write_word(at, v);
        store.set_compiler_ptr(at.offset(8));
        Ok(())
    }
}

/// Reserve 2 bytes for a forward displacement and return their address.
/// Doesn't touch `prev_instruc`, so it's a free function rather than a method.
pub fn forward_ref(store: &mut Store) -> Result<Addr, WrenError> {
    store.available(2)?;
    let at = store.compiler_ptr();
    store.set_compiler_ptr(at.offset(2));
    Ok(at)
}

/// Patch a previously reserved forward reference with the displacement
/// from `ref_addr` to the current `compiler_ptr`.
pub fn resolve(store: &mut Store, ref_addr: Addr) {
    let disp = store.compiler_ptr().diff(ref_addr) as u16;
    store.write_u16(ref_addr, disp);
}
