//! # Compiler
//!
//! A single-pass, recursive-descent/precedence-climbing compiler. There is
//! no AST: every production emits directly into the store's code region as
//! it recognizes it, via [`Assembler`]. Two peephole optimizations fall out
//! of that directness for free — folding a unary minus into the literal it
//! precedes, and rewriting a `GLOBAL_FETCH` immediately followed by `:` into
//! a `GLOBAL_STORE` — both by inspecting (and sometimes rewinding past)
//! [`Assembler::prev_instruc`].
//!
//! Precedence table, ascending (`parse_arguments` uses 20, above everything
//! below so a call's arguments never swallow an enclosing operator):
//!
//! | token   | prec | op            |
//! |---------|------|---------------|
//! | `;`     | 1    | POP           |
//! | `:`     | 3    | GLOBAL_STORE  |
//! | `& \| ^`| 5    | AND/OR/XOR    |
//! | `< =`   | 7    | LT/EQ         |
//! | `+ -`   | 9    | ADD/SUB       |
//! | `* / %` | 11   | MUL/DIV/MOD   |

use crate::assembler::{self, Assembler};
use crate::dictionary::{self, Lookup};
use crate::error::WrenError;
use crate::header::NameKind;
use crate::lexer::{CharSource, Lexer, Token};
use crate::opcode::Opcode;
use crate::store::{Addr, Store, WORD_SIZE};
use crate::vm::{self, ForeignFn};

enum Rator {
    Pop,
    Store,
    Op(Opcode),
}

fn operator_for(token: &Token) -> Option<(i32, Rator)> {
    match token {
        Token::Punct(';') => Some((1, Rator::Pop)),
        Token::Punct(':') => Some((3, Rator::Store)),
        Token::Punct('&') => Some((5, Rator::Op(Opcode::And))),
        Token::Punct('|') => Some((5, Rator::Op(Opcode::Or))),
        Token::Punct('^') => Some((5, Rator::Op(Opcode::Xor))),
        Token::Punct('<') => Some((7, Rator::Op(Opcode::Lt))),
        Token::Punct('=') => Some((7, Rator::Op(Opcode::Eq))),
        Token::Punct('+') => Some((9, Rator::Op(Opcode::Add))),
        Token::Punct('-') => Some((9, Rator::Op(Opcode::Sub))),
        Token::Punct('*') => Some((11, Rator::Op(Opcode::Mul))),
        Token::Punct('/') => Some((11, Rator::Op(Opcode::Div))),
        Token::Punct('%') => Some((11, Rator::Op(Opcode::Mod))),
        _ => None,
    }
}

/// Argument lists parse at this precedence: above every operator, so a
/// bare identifier argument never accidentally swallows `+ x` as part of
/// itself.
const ARGUMENT_PRECEDENCE: i32 = 20;

pub struct Compiler<'src> {
    lexer: Lexer<'src>,
    asm: Assembler,
}

impl<'src> Compiler<'src> {
    pub fn new(source: &'src mut dyn CharSource) -> Self {
        Compiler { lexer: Lexer::new(source), asm: Assembler::new() }
    }

    pub fn token(&self) -> &Token {
        &self.lexer.token
    }

    pub fn next(&mut self, store: &mut Store) -> Result<(), WrenError> {
        self.lexer.next(store)
    }

    pub fn skip_newline(&mut self, store: &mut Store) -> Result<(), WrenError> {
        while self.lexer.token == Token::Newline {
            self.next(store)?;
        }
        Ok(())
    }

    /// Flush whatever's left of the current physical input line and prime
    /// the next token. Called by a host after printing an error, mirroring
    /// `skip_line(); next();` in the original's command-dispatch loop.
    pub fn recover(&mut self, store: &mut Store) -> Result<(), WrenError> {
        self.lexer.skip_line();
        self.next(store)
    }

    fn expect_punct(&self, c: char, err: WrenError) -> Result<(), WrenError> {
        if self.lexer.token == Token::Punct(c) {
            Ok(())
        } else {
            Err(err)
        }
    }

    fn expect_then(&self) -> Result<(), WrenError> {
        if self.lexer.token == Token::Then {
            Ok(())
        } else {
            Err(WrenError::ExpectedThen)
        }
    }

    fn expect_else(&self) -> Result<(), WrenError> {
        if self.lexer.token == Token::Else {
            Ok(())
        } else {
            Err(WrenError::ExpectedElse)
        }
    }

    fn expect_ident(&self) -> Result<String, WrenError> {
        match &self.lexer.token {
            Token::Ident(name) => Ok(name.clone()),
            _ => Err(WrenError::ExpectedIdentifier),
        }
    }

    fn parse_done(&self) -> Result<(), WrenError> {
        match self.lexer.token {
            Token::Eof | Token::Newline => Ok(()),
            _ => Err(WrenError::UnexpectedToken),
        }
    }

    fn parse_arguments(&mut self, store: &mut Store, arity: u8) -> Result<(), WrenError> {
        for _ in 0..arity {
            self.parse_expr(store, ARGUMENT_PRECEDENCE)?;
        }
        Ok(())
    }

    fn compile_ident(&mut self, store: &mut Store, name: &str) -> Result<(), WrenError> {
        let hit = dictionary::lookup(store, name.as_bytes()).ok_or(WrenError::UnknownIdentifier)?;
        self.next(store)?;
        match hit {
            Lookup::Dynamic(h) => match h.kind(store) {
                NameKind::Global => {
                    let binding = h.binding(store);
                    self.asm.gen(store, Opcode::GlobalFetch)?;
                    self.asm.gen_ushort(store, binding)?;
                }
                NameKind::Local => {
                    let binding = h.binding(store);
                    match binding {
                        0 => self.asm.gen(store, Opcode::LocalFetch0)?,
                        1 => self.asm.gen(store, Opcode::LocalFetch1)?,
                        n => {
                            self.asm.gen(store, Opcode::LocalFetch)?;
                            self.asm.gen_ubyte(store, n as u8)?;
                        }
                    }
                }
                NameKind::Procedure => {
                    let binding = h.binding(store);
                    let arity = store.read_u8(Addr(binding));
                    self.parse_arguments(store, arity)?;
                    self.asm.gen(store, Opcode::Call)?;
                    self.asm.gen_ushort(store, binding)?;
                }
                NameKind::CFunction => {
                    let binding = h.binding(store);
                    let arity = store.read_u8(Addr(binding));
                    self.parse_arguments(store, arity)?;
                    self.asm.gen(store, Opcode::Ccall)?;
                    self.asm.gen_ushort(store, binding)?;
                }
                NameKind::Primitive => unreachable!("dictionary never binds a dynamic name as primitive"),
            },
            Lookup::Primitive { .. } => {
                let arity = hit.prim_arity();
                self.parse_arguments(store, arity)?;
                let opcode = Opcode::try_from(hit.prim_opcode()).expect("primitive table holds a valid opcode");
                self.asm.gen(store, opcode)?;
            }
        }
        Ok(())
    }

    /// Negate the literal just emitted in place rather than emitting a
    /// `NEGATE` instruction, when the previous opcode was one of the push
    /// forms. Falls back to `NEGATE` for anything else (a call result, a
    /// fetched local, ...).
    fn fold_negate(&mut self, store: &mut Store) -> Result<(), WrenError> {
        if let Some(prev) = self.asm.prev_instruc() {
            let prev_op = store.read_u8(prev);
            if prev_op == Opcode::Push.as_u8() {
                let at = store.compiler_ptr().sub(WORD_SIZE);
                let v = store.read_word(at);
                store.write_word(at, v.wrapping_neg());
                return Ok(());
            }
            if prev_op == Opcode::Pushb.as_u8() {
                let at = store.compiler_ptr().sub(1);
                let v = store.read_i8(at);
                store.write_i8(at, v.wrapping_neg());
                return Ok(());
            }
            if prev_op == Opcode::Pushw.as_u8() {
                let at = store.compiler_ptr().sub(2);
                let v = store.read_i16(at);
                store.write_i16(at, v.wrapping_neg());
                return Ok(());
            }
        }
        self.asm.gen(store, Opcode::Negate)
    }

    fn parse_if(&mut self, store: &mut Store) -> Result<(), WrenError> {
        self.next(store)?; // consume 'if'
        self.parse_expr(store, 0)?;
        self.asm.gen(store, Opcode::Branch)?;
        let branch_ref = assembler::forward_ref(store)?;
        self.skip_newline(store)?;
        self.expect_then()?;
        self.next(store)?;
        self.parse_expr(store, 3)?;
        self.asm.gen(store, Opcode::Jump)?;
        let jump_ref = assembler::forward_ref(store)?;
        self.skip_newline(store)?;
        self.expect_else()?;
        self.next(store)?;
        assembler::resolve(store, branch_ref);
        self.parse_expr(store, 3)?;
        assembler::resolve(store, jump_ref);
        // The if/then/else merge point makes the previous instruction
        // ambiguous (it could be the end of either branch); block the
        // unary-minus/assignment peepholes from looking past it.
        self.asm.block_prev();
        Ok(())
    }

    fn parse_factor(&mut self, store: &mut Store) -> Result<(), WrenError> {
        self.skip_newline(store)?;
        match self.lexer.token.clone() {
            Token::IntLiteral(v) => {
                if (-128..128).contains(&v) {
                    self.asm.gen(store, Opcode::Pushb)?;
                    self.asm.gen_sbyte(store, v as i8)?;
                } else if (-32768..32768).contains(&v) {
                    self.asm.gen(store, Opcode::Pushw)?;
                    self.asm.gen_sshort(store, v as i16)?;
                } else {
                    self.asm.gen(store, Opcode::Push)?;
                    self.asm.gen_value(store, v)?;
                }
                self.next(store)
            }
            Token::StringLiteral => {
                self.asm.gen(store, Opcode::PushString)?;
                let start = store.compiler_ptr();
                let len = store.read_cstr(start).len();
                store.set_compiler_ptr(start.offset(len as u16 + 1));
                self.next(store)
            }
            Token::Ident(name) => self.compile_ident(store, &name),
            Token::If => self.parse_if(store),
            Token::Punct('*') => {
                self.next(store)?;
                self.parse_factor(store)?;
                self.asm.gen(store, Opcode::FetchByte)
            }
            Token::Punct('-') => {
                self.next(store)?;
                self.parse_factor(store)?;
                self.fold_negate(store)
            }
            Token::Punct('(') => {
                self.next(store)?;
                self.parse_expr(store, 0)?;
                self.expect_punct(')', WrenError::ExpectedCloseParen)?;
                self.next(store)
            }
            _ => Err(WrenError::ExpectedFactor),
        }
    }

    fn parse_expr(&mut self, store: &mut Store, precedence: i32) -> Result<(), WrenError> {
        self.parse_factor(store)?;
        loop {
            if precedence == 0 {
                self.skip_newline(store)?;
            }
            let (l, rator) = match operator_for(&self.lexer.token) {
                Some(hit) => hit,
                None => return Ok(()),
            };
            if l < precedence {
                return Ok(());
            }
            self.next(store)?;
            self.skip_newline(store)?;
            match rator {
                Rator::Pop => {
                    self.asm.gen(store, Opcode::Pop)?;
                    self.parse_expr(store, l + 1)?;
                }
                Rator::Store => {
                    let prev = self.asm.prev_instruc().filter(|&p| store.read_u8(p) == Opcode::GlobalFetch.as_u8());
                    let prev = match prev {
                        Some(p) => p,
                        None => return Err(WrenError::NotAnLvalue),
                    };
                    let addr = store.read_u16(prev.offset(1));
                    store.set_compiler_ptr(prev);
                    self.parse_expr(store, l)?;
                    self.asm.gen(store, Opcode::GlobalStore)?;
                    self.asm.gen_ushort(store, addr)?;
                }
                Rator::Op(op) => {
                    self.parse_expr(store, l + 1)?;
                    self.asm.gen(store, op)?;
                }
            }
        }
    }

    /// Compile and immediately run a single expression, then rewind the
    /// store to reclaim its bytes. Scratch expressions (a `let`'s
    /// initializer, a bare top-level expression) never permanently grow
    /// the store, win or lose.
    pub fn scratch_expr(&mut self, store: &mut Store, foreign_fns: &[ForeignFn]) -> Result<i64, WrenError> {
        let start = store.compiler_ptr();
        let outcome = self
            .parse_expr(store, -1)
            .and_then(|_| self.parse_done())
            .and_then(|_| self.asm.gen(store, Opcode::Halt));
        let end = store.compiler_ptr();
        store.set_compiler_ptr(start);
        outcome?;
        vm::run(store, foreign_fns, start, end)
    }

    fn run_let(&mut self, store: &mut Store, foreign_fns: &[ForeignFn]) -> Result<(), WrenError> {
        let name = self.expect_ident()?;
        let cell = store.compiler_ptr();
        self.asm.gen_value(store, 0)?;
        dictionary::bind(store, name.as_bytes(), NameKind::Global, cell.0)?;
        self.next(store)?;
        self.expect_punct('=', WrenError::ExpectedEquals)?;
        self.next(store)?;
        let v = self.scratch_expr(store, foreign_fns)?;
        store.write_word(cell, v);
        Ok(())
    }

    fn run_forget(&mut self, store: &mut Store) -> Result<(), WrenError> {
        let name = self.expect_ident()?;
        self.next(store)?;
        self.parse_done()?;
        dictionary::forget(store, name.as_bytes())
    }

    fn run_fun(&mut self, store: &mut Store) -> Result<(), WrenError> {
        let name = self.expect_ident()?;
        let dp_before = store.dictionary_ptr();
        let cp_before = store.compiler_ptr();
        dictionary::bind(store, name.as_bytes(), NameKind::Procedure, cp_before.0)?;
        self.next(store)?;

        let dp_params = store.dictionary_ptr();
        let mut arity: u8 = 0;
        let outcome: Result<(), WrenError> = (|| {
            while let Token::Ident(pname) = self.lexer.token.clone() {
                dictionary::bind(store, pname.as_bytes(), NameKind::Local, arity as u16)?;
                arity += 1;
                self.next(store)?;
            }
            self.expect_punct('=', WrenError::ExpectedEquals)?;
            self.next(store)?;
            // The function body's first byte is its arity, not an opcode:
            // write it raw so it can't be mistaken for one by the
            // unary-minus peephole.
            self.asm.gen_ubyte(store, arity)?;
            self.parse_expr(store, -1)?;
            self.parse_done()?;
            self.asm.gen(store, Opcode::Return)?;
            Ok(())
        })();

        store.set_dictionary_ptr(dp_params); // forget parameter names either way
        if outcome.is_err() {
            store.set_dictionary_ptr(dp_before); // forget the function and its code too
            store.set_compiler_ptr(cp_before);
        }
        outcome
    }

    /// Compile and run one top-level form. Returns the printable result of
    /// a bare expression, or `None` for a definition/forget (nothing to
    /// print).
    pub fn run_command(&mut self, store: &mut Store, foreign_fns: &[ForeignFn]) -> Result<Option<i64>, WrenError> {
        self.skip_newline(store)?;
        match self.lexer.token.clone() {
            Token::Fun => {
                self.next(store)?;
                self.run_fun(store)?;
                Ok(None)
            }
            Token::Let => {
                self.next(store)?;
                self.run_let(store, foreign_fns)?;
                Ok(None)
            }
            Token::Forget => {
                self.next(store)?;
                self.run_forget(store)?;
                Ok(None)
            }
            Token::Eof => Ok(None),
            _ => self.scratch_expr(store, foreign_fns).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::SliceSource;
    use crate::store::Endianness;

    fn compile_one(src: &str, store: &mut Store, foreign_fns: &[ForeignFn]) -> Result<Option<i64>, WrenError> {
        let mut source = SliceSource::new(src.as_bytes());
        let mut compiler = Compiler::new(&mut source);
        compiler.next(store)?;
        compiler.run_command(store, foreign_fns)
    }

    #[test]
    fn arithmetic_expression_evaluates() {
        let mut store = Store::new(4096, Endianness::Little);
        let result = compile_one("2 + 3 * 4\n", &mut store, &[]).unwrap();
        assert_eq!(result, Some(14));
    }

    #[test]
    fn unary_minus_folds_into_literal() {
        let mut store = Store::new(4096, Endianness::Little);
        let result = compile_one("-5 + 2\n", &mut store, &[]).unwrap();
        assert_eq!(result, Some(-3));
    }

    #[test]
    fn if_then_else_takes_the_right_branch() {
        let mut store = Store::new(4096, Endianness::Little);
        let result = compile_one("if 1 then 10 else 20\n", &mut store, &[]).unwrap();
        assert_eq!(result, Some(10));
        let mut store = Store::new(4096, Endianness::Little);
        let result = compile_one("if 0 then 10 else 20\n", &mut store, &[]).unwrap();
        assert_eq!(result, Some(20));
    }

    #[test]
    fn let_binds_a_global_and_survives_across_commands() {
        let mut store = Store::new(4096, Endianness::Little);
        let mut source = SliceSource::new(b"let x = 40\nx + 2\n");
        let mut compiler = Compiler::new(&mut source);
        compiler.next(&mut store).unwrap();
        assert_eq!(compiler.run_command(&mut store, &[]).unwrap(), None);
        compiler.next(&mut store).unwrap();
        assert_eq!(compiler.run_command(&mut store, &[]).unwrap(), Some(42));
    }

    #[test]
    fn global_fetch_followed_by_colon_rewrites_to_store() {
        let mut store = Store::new(4096, Endianness::Little);
        let mut source = SliceSource::new(b"let x = 1\nx : 9\nx\n");
        let mut compiler = Compiler::new(&mut source);
        compiler.next(&mut store).unwrap();
        compiler.run_command(&mut store, &[]).unwrap();
        compiler.next(&mut store).unwrap();
        compiler.run_command(&mut store, &[]).unwrap();
        compiler.next(&mut store).unwrap();
        assert_eq!(compiler.run_command(&mut store, &[]).unwrap(), Some(9));
    }

    #[test]
    fn assigning_to_a_non_lvalue_errors() {
        let mut store = Store::new(4096, Endianness::Little);
        assert_eq!(compile_one("1 : 2\n", &mut store, &[]), Err(WrenError::NotAnLvalue));
    }

    #[test]
    fn fun_defines_a_recursive_procedure() {
        let mut store = Store::new(4096, Endianness::Little);
        let mut source = SliceSource::new(b"fun fact n = if n then n * fact(n - 1) else 1\nfact 5\n");
        let mut compiler = Compiler::new(&mut source);
        compiler.next(&mut store).unwrap();
        assert_eq!(compiler.run_command(&mut store, &[]).unwrap(), None);
        compiler.next(&mut store).unwrap();
        assert_eq!(compiler.run_command(&mut store, &[]).unwrap(), Some(120));
    }

    #[test]
    fn forget_removes_a_global() {
        let mut store = Store::new(4096, Endianness::Little);
        let mut source = SliceSource::new(b"let x = 1\nforget x\nx\n");
        let mut compiler = Compiler::new(&mut source);
        compiler.next(&mut store).unwrap();
        compiler.run_command(&mut store, &[]).unwrap();
        compiler.next(&mut store).unwrap();
        compiler.run_command(&mut store, &[]).unwrap();
        compiler.next(&mut store).unwrap();
        assert_eq!(compiler.run_command(&mut store, &[]), Err(WrenError::UnknownIdentifier));
    }
}
