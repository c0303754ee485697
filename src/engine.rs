//! # Engine
//!
//! Glues the store, dictionary, and foreign-function table into the one
//! object a host embeds. [`Engine::new`] mirrors the original's `main()`
//! bootstrap: the four reserved cells (`cp`, `dp`, `c0`, `d0`) are bound as
//! globals before anything else runs, so Wren code can always read its own
//! cursors back.
//!
//! The engine doesn't own a [`crate::compiler::Compiler`] — that type
//! borrows whatever [`crate::lexer::CharSource`] the host is reading from
//! (stdin, a `&str`, a socket), and threading that lifetime through `Engine`
//! would force every embedder into one input source. Instead a host builds
//! its own `Compiler` and drives it with [`Engine::run_one`], which reaches
//! into `store` and `foreign_fns` as disjoint fields rather than through
//! two separate accessor calls (borrowing both at once through accessors
//! doesn't compile — one needs `&mut Engine`, the other `&Engine`).

use crate::compiler::Compiler;
use crate::dictionary;
use crate::error::WrenError;
use crate::header::NameKind;
use crate::lexer::CharSource;
use crate::store::{Endianness, Store, C0_CELL, CP_CELL, D0_CELL, DP_CELL};
use crate::vm::ForeignFn;

/// Tunable knobs for a new [`Engine`].
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Total size of the byte store backing this engine. Code, globals,
    /// the dictionary, and the runtime stack all share this one arena.
    pub store_capacity: usize,
    pub endianness: Endianness,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig { store_capacity: 32 * 1024, endianness: Endianness::Little }
    }
}

pub struct Engine {
    store: Store,
    foreign_fns: Vec<ForeignFn>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let mut store = Store::new(config.store_capacity, config.endianness);
        dictionary::bind(&mut store, b"cp", NameKind::Global, CP_CELL).expect("reserved cells always fit a fresh store");
        dictionary::bind(&mut store, b"dp", NameKind::Global, DP_CELL).expect("reserved cells always fit a fresh store");
        dictionary::bind(&mut store, b"c0", NameKind::Global, C0_CELL).expect("reserved cells always fit a fresh store");
        dictionary::bind(&mut store, b"d0", NameKind::Global, D0_CELL).expect("reserved cells always fit a fresh store");
        Engine { store, foreign_fns: Vec::new() }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn foreign_fns(&self) -> &[ForeignFn] {
        &self.foreign_fns
    }

    /// Register a foreign function and bind `name` to call it with `arity`
    /// arguments. The header's binding address ends up holding `[arity:u8]
    /// [table index: word]`, read back by `CCALL` at runtime — never a raw
    /// function pointer, since nothing in this engine ever materializes one.
    pub fn bind_c_function(&mut self, name: &str, arity: u8, f: ForeignFn) -> Result<usize, WrenError> {
        let index = self.foreign_fns.len();
        let at = self.store.compiler_ptr();
        self.store.available(9)?;
        dictionary::bind(&mut self.store, name.as_bytes(), NameKind::CFunction, at.0)?;
        self.store.write_u8(at, arity);
        self.store.write_word(at.offset(1), index as i64);
        self.store.set_compiler_ptr(at.offset(9));
        self.foreign_fns.push(f);
        Ok(index)
    }

    /// Drive one `run_command` against this engine's store and foreign
    /// function table. Field access keeps the two borrows disjoint, which
    /// `engine.store_mut()`/`engine.foreign_fns()` called side by side in
    /// the same argument list cannot: the former holds a mutable borrow of
    /// all of `Engine` for the call's duration, so a caller can't also take
    /// the latter's shared borrow at the same time.
    pub fn run_one(&mut self, compiler: &mut Compiler) -> Result<Option<i64>, WrenError> {
        compiler.run_command(&mut self.store, &self.foreign_fns)
    }

    /// Compile and run a single top-level form read from `source`: an
    /// expression, `let`, `fun`, or `forget`. Returns the result of a bare
    /// expression, or `None` for a definition. Each call starts a fresh
    /// lexer over `source`, so this is for one-shot embedding — a command
    /// spanning several lines needs its own persistent `Compiler`, as the
    /// interactive REPL in [`Engine::repl`] keeps.
    pub fn compile_and_run_one(&mut self, source: &mut dyn CharSource) -> Result<Option<i64>, WrenError> {
        let mut compiler = Compiler::new(source);
        compiler.next(&mut self.store)?;
        compiler.run_command(&mut self.store, &self.foreign_fns)
    }

    /// Run an interactive read-compile-run loop against stdin until EOF.
    pub fn repl(&mut self) {
        crate::repl::repl_interpret(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use crate::lexer::SliceSource;

    fn tstfn2(args: &[i64]) -> i64 {
        args[0] + args[1]
    }

    fn tstfn0(_args: &[i64]) -> i64 {
        7
    }

    #[test]
    fn reserved_globals_are_bound_at_construction() {
        let engine = Engine::new(EngineConfig::default());
        let hit = dictionary::lookup(engine.store(), b"cp").unwrap();
        assert_eq!(hit.binding(engine.store()), CP_CELL);
    }

    #[test]
    fn bound_c_function_is_callable_from_source() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.bind_c_function("tstfn2", 2, tstfn2).unwrap();
        engine.bind_c_function("tstfn0", 0, tstfn0).unwrap();

        let mut source = SliceSource::new(b"tstfn2 3 4 + tstfn0\n");
        let mut compiler = Compiler::new(&mut source);
        compiler.next(engine.store_mut()).unwrap();
        let result = engine.run_one(&mut compiler).unwrap();
        assert_eq!(result, Some(14));
    }

    #[test]
    fn compile_and_run_one_evaluates_a_single_form() {
        let mut engine = Engine::new(EngineConfig::default());
        let mut source = SliceSource::new(b"6 * 7\n");
        assert_eq!(engine.compile_and_run_one(&mut source).unwrap(), Some(42));
    }
}
