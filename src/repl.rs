//! # REPL
//!
//! An in-process read-compile-run loop over a persistent [`Engine`]. Each
//! line is fed straight into the [`Compiler`], which compiles one top-level
//! form at a time directly into the engine's store and runs it immediately
//! — there's no separate "parse the whole program first" pass, and no
//! subprocess: state (globals, procedures, the dictionary) lives in the
//! `Engine` for as long as the process runs.
//!
//! Mirrors the original's `read_eval_print_loop`: print a prompt, prime one
//! token, then alternate `run_command`/print-prompt/`skip_newline` until
//! `Eof`. A failed command prints its message and recovers by discarding
//! the rest of the input line, same as the original's `skip_line(); next();`.

use std::io::{self, Read, Write};

use crate::compiler::Compiler;
use crate::engine::Engine;
use crate::lexer::{CharSource, Token};

/// Pulls bytes from stdin one at a time, the same pull model as the
/// original's `ch()`/`next_char()` pair.
pub struct StdinSource {
    stdin: io::Stdin,
}

impl StdinSource {
    pub fn new() -> Self {
        StdinSource { stdin: io::stdin() }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CharSource for StdinSource {
    fn pull(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match self.stdin.lock().read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

/// Run an interactive REPL against `engine` until stdin reaches EOF.
pub fn repl_interpret(engine: &mut Engine) {
    prompt();
    let mut source = StdinSource::new();
    let mut compiler = Compiler::new(&mut source);
    if let Err(e) = compiler.next(engine.store_mut()) {
        println!("{}", e);
        return;
    }

    while compiler.token() != &Token::Eof {
        match engine.run_one(&mut compiler) {
            Ok(Some(v)) => println!("{}", v),
            Ok(None) => {}
            Err(e) => {
                println!("{}", e);
                if let Err(e) = compiler.recover(engine.store_mut()) {
                    println!("{}", e);
                }
            }
        }
        prompt();
        if let Err(e) = compiler.skip_newline(engine.store_mut()) {
            println!("{}", e);
        }
    }
    println!();
}
