//! # Stack-Based Bytecode Virtual Machine (Runtime)
//!
//! The VM is a straight fetch-decode-execute loop over the store's code
//! region. There is no separate instruction-object representation: `pc` is a
//! store address, opcodes are single bytes, and operands are read directly
//! out of the bytes that follow. Every handler either returns the `pc` it
//! wants to resume at, or leaves `pc` for the caller to advance past a
//! fixed-width operand — there's no `advance_pc` flag, because (unlike a
//! pre-decoded instruction stream) each opcode here knows its own operand
//! width and decodes it inline.
//!
//! `sp` (stack pointer) and `bp` (frame base) are also store addresses. The
//! stack grows downward from just below the dictionary, toward the end of
//! the code region; [`ops_control::need`] is the only bounds check standing
//! between the two.

use crate::error::WrenError;
use crate::opcode::Opcode;
use crate::store::{Addr, Store, WORD_SIZE};

pub mod ops_arith;
pub mod ops_control;

pub use ops_control::ForeignFn;

/// Run the code region `[start, code_end)` to completion.
///
/// `code_end` doubles as the stack's lower bound: the operand stack and the
/// compiled code it's running never overlap. Returns the word left on top of
/// the stack when `HALT` executes.
pub fn run(store: &mut Store, foreign_fns: &[ForeignFn], start: Addr, code_end: Addr) -> Result<i64, WrenError> {
    let mut sp = Addr(store.dictionary_ptr().0 & !(WORD_SIZE - 1));
    let mut bp = sp;
    let mut pc = start;

    loop {
        let instr_addr = pc;
        let opcode = Opcode::try_from(store.read_u8(pc)).unwrap_or_else(|_| unreachable!("corrupt opcode byte at {:?}", pc));
        pc = pc.offset(1);

        match opcode {
            Opcode::Halt => return Ok(store.read_word(sp)),
            Opcode::Push => {
                let (new_sp, new_pc) = ops_control::push_literal(store, sp, code_end, pc)?;
                sp = new_sp;
                pc = new_pc;
            }
            Opcode::Pushw => {
                let (new_sp, new_pc) = ops_control::push_short(store, sp, code_end, pc)?;
                sp = new_sp;
                pc = new_pc;
            }
            Opcode::Pushb => {
                let (new_sp, new_pc) = ops_control::push_byte(store, sp, code_end, pc)?;
                sp = new_sp;
                pc = new_pc;
            }
            Opcode::PushString => {
                let (new_sp, new_pc) = ops_control::push_string(store, sp, code_end, pc)?;
                sp = new_sp;
                pc = new_pc;
            }
            Opcode::Pop => {
                sp = ops_control::pop(sp);
            }
            Opcode::GlobalFetch => {
                let (new_sp, new_pc) = ops_control::global_fetch(store, sp, code_end, pc)?;
                sp = new_sp;
                pc = new_pc;
            }
            Opcode::GlobalStore => {
                pc = ops_control::global_store(store, sp, pc);
            }
            Opcode::LocalFetch0 => {
                sp = ops_control::local_fetch_n(store, sp, code_end, bp, 0)?;
            }
            Opcode::LocalFetch1 => {
                sp = ops_control::local_fetch_n(store, sp, code_end, bp, 1)?;
            }
            Opcode::LocalFetch => {
                let (new_sp, new_pc) = ops_control::local_fetch(store, sp, code_end, bp, pc)?;
                sp = new_sp;
                pc = new_pc;
            }
            Opcode::Call => match ops_control::call(store, sp, code_end, bp, instr_addr, pc)? {
                ops_control::CallOutcome::BecameTail { instr_addr } => {
                    pc = instr_addr;
                }
                ops_control::CallOutcome::Entered { sp: new_sp, bp: new_bp, pc: new_pc } => {
                    sp = new_sp;
                    bp = new_bp;
                    pc = new_pc;
                }
            },
            Opcode::Tcall => {
                let (new_sp, new_pc) = ops_control::tcall(store, sp, bp, pc);
                sp = new_sp;
                pc = new_pc;
            }
            Opcode::Ccall => {
                let (new_sp, new_pc) = ops_control::ccall(store, sp, pc, foreign_fns);
                sp = new_sp;
                pc = new_pc;
            }
            Opcode::Return => {
                let (new_sp, new_bp, new_pc) = ops_control::ret(store, sp, bp);
                sp = new_sp;
                bp = new_bp;
                pc = new_pc;
            }
            Opcode::Branch => {
                let (new_sp, new_pc) = ops_control::branch(store, sp, pc);
                sp = new_sp;
                pc = new_pc;
            }
            Opcode::Jump => {
                pc = ops_control::jump(store, pc);
            }
            Opcode::Add => sp = ops_arith::add(store, sp),
            Opcode::Sub => sp = ops_arith::sub(store, sp),
            Opcode::Mul => sp = ops_arith::mul(store, sp),
            Opcode::Div => sp = ops_arith::div(store, sp),
            Opcode::Mod => sp = ops_arith::modulo(store, sp),
            Opcode::Umul => sp = ops_arith::umul(store, sp),
            Opcode::Udiv => sp = ops_arith::udiv(store, sp),
            Opcode::Umod => sp = ops_arith::umod(store, sp),
            Opcode::Negate => ops_arith::negate(store, sp),
            Opcode::Eq => sp = ops_arith::eq(store, sp),
            Opcode::Lt => sp = ops_arith::lt(store, sp),
            Opcode::Ult => sp = ops_arith::ult(store, sp),
            Opcode::And => sp = ops_arith::and(store, sp),
            Opcode::Or => sp = ops_arith::or(store, sp),
            Opcode::Xor => sp = ops_arith::xor(store, sp),
            Opcode::Sla => sp = ops_arith::sla(store, sp),
            Opcode::Sra => sp = ops_arith::sra(store, sp),
            Opcode::Srl => sp = ops_arith::srl(store, sp),
            Opcode::Getc => sp = ops_control::getc(store, sp, code_end)?,
            Opcode::Putc => ops_control::putc(store, sp),
            Opcode::FetchByte => ops_control::fetch_byte(store, sp),
            Opcode::Peek => ops_control::peek(store, sp),
            Opcode::Poke => sp = ops_control::poke(store, sp),
        }
    }
}

#[cfg(test)]
mod tests;
