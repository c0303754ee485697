//! # Error Handling for the Wren Engine
//!
//! This module defines the single error type shared by every stage of the
//! engine: lexing, compiling, and running.
//!
//! ## Design
//! - [`WrenError`] is a flat enum of the error categories the store, lexer,
//!   compiler, dictionary, and VM can raise. Each variant carries the exact
//!   message text a host would show a user.
//! - Unlike the latched global error flag the language was originally built
//!   around, every fallible operation here returns `Result<T, WrenError>`.
//!   The REPL driver (`repl.rs`) is the only place that behaves like a
//!   latch: it prints the error, discards the rest of the line, and resumes.
//!
//! ## Display
//! - Implements [`fmt::Display`] with the exact message text a caller should
//!   show, and [`std::error::Error`] so `WrenError` composes with `?`.

use std::fmt;

/// Errors that can occur while lexing, compiling, or running Wren source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrenError {
    // --- Lexical ---
    LexicalError,
    IdentifierTooLong,
    NumericOverflow,
    InvalidHexNumber,
    UnterminatedString,

    // --- Syntactic ---
    ExpectedFactor,
    ExpectedThen,
    ExpectedElse,
    ExpectedEquals,
    ExpectedIdentifier,
    UnexpectedToken,
    ExpectedCloseParen,

    // --- Semantic ---
    UnknownIdentifier,
    NotAnLvalue,
    NotADefinition,

    // --- Resource ---
    StoreExhausted,
    StackOverflow,
    DictionaryCorrupted,
}

impl fmt::Display for WrenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            WrenError::LexicalError => "Lexical error",
            WrenError::IdentifierTooLong => "Identifier too long",
            WrenError::NumericOverflow => "Numeric overflow",
            WrenError::InvalidHexNumber => "Invalid Hex Number",
            WrenError::UnterminatedString => "Unterminated string",

            WrenError::ExpectedFactor => "Syntax error: expected a factor",
            WrenError::ExpectedThen => "Expected 'then'",
            WrenError::ExpectedElse => "Expected 'else'",
            WrenError::ExpectedEquals => "Expected '='",
            WrenError::ExpectedIdentifier => "Expected identifier",
            WrenError::UnexpectedToken => "Syntax error: unexpected token",
            WrenError::ExpectedCloseParen => "Syntax error: expected ')'",

            WrenError::UnknownIdentifier => "Unknown identifier",
            WrenError::NotAnLvalue => "Not an l-value",
            WrenError::NotADefinition => "Not a definition",

            WrenError::StoreExhausted => "Store exhausted",
            WrenError::StackOverflow => "Stack overflow",
            WrenError::DictionaryCorrupted => "Dictionary corrupted",
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for WrenError {}
