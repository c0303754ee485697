//! # Wren
//!
//! An embeddable, tiny, interactive interpreter. Its entire runtime state —
//! compiled code, global cells, the name dictionary, and the operand stack —
//! lives inside one fixed-size byte [`Store`]; there is no heap allocator for
//! language values.
//!
//! A host embeds it through [`Engine`]: construct one with an
//! [`EngineConfig`], optionally register foreign functions with
//! [`Engine::bind_c_function`], then either drive it one form at a time with
//! [`Engine::compile_and_run_one`] or hand it an interactive terminal with
//! [`Engine::repl`].

mod assembler;
mod compiler;
mod dictionary;
mod engine;
mod error;
mod header;
mod lexer;
mod opcode;
mod repl;
mod store;
mod vm;

pub use compiler::Compiler;
pub use engine::{Engine, EngineConfig};
pub use error::WrenError;
pub use lexer::{CharSource, SliceSource, Token};
pub use store::{Addr, Endianness, Store};
pub use vm::ForeignFn;
