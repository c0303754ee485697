//! # Lexer
//!
//! Single-character lookahead over a pull input stream. The lexer owns no
//! buffering beyond one cached character (mirroring the original's `ch()`/
//! `next_char()` pair): callers that want line-buffered input implement
//! [`CharSource`] over whatever they like (stdin, a `&str`, a test fixture).
//!
//! String literals are the one place the lexer reaches outside itself: their
//! bytes are written directly into the store at `compiler_ptr + 1`, ahead of
//! where the forthcoming `PUSH_STRING` opcode will land, so the compiler
//! only needs to skip past them rather than copy them a second time.

use crate::error::WrenError;
use crate::store::{Addr, Store};

/// Maximum identifier length the lexer will accept (a 16-byte scratch buffer
/// holds at most 15 characters plus a conceptual terminator).
pub const IDENT_MAX_LEN: usize = 15;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// An integer literal; value already parsed.
    IntLiteral(i64),
    /// A string literal. Its bytes were already written into the store
    /// starting at `compiler_ptr + 1` by the time this token is produced.
    StringLiteral,
    /// A non-keyword identifier.
    Ident(String),
    Then,
    Forget,
    Let,
    If,
    Fun,
    Else,
    /// A single-character operator/punctuation token, e.g. `+`, `(`, `;`.
    Punct(char),
    Newline,
    Eof,
}

/// Pull source of raw bytes. `None` signals end of input.
pub trait CharSource {
    fn pull(&mut self) -> Option<u8>;
}

/// A `CharSource` over an in-memory byte slice, handy for tests and the
/// scratch-expression path.
pub struct SliceSource<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        SliceSource { bytes, pos: 0 }
    }
}

impl<'a> CharSource for SliceSource<'a> {
    fn pull(&mut self) -> Option<u8> {
        if self.pos < self.bytes.len() {
            let b = self.bytes[self.pos];
            self.pos += 1;
            Some(b)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Cached {
    Unread,
    Eof,
    Byte(u8),
}

pub struct Lexer<'src> {
    source: &'src mut dyn CharSource,
    input_char: Cached,
    pub token: Token,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src mut dyn CharSource) -> Self {
        Lexer { source, input_char: Cached::Unread, token: Token::Eof }
    }

    fn ch(&mut self) -> Cached {
        if self.input_char == Cached::Unread {
            self.input_char = match self.source.pull() {
                Some(b) => Cached::Byte(b),
                None => Cached::Eof,
            };
        }
        self.input_char
    }

    fn next_char(&mut self) {
        if self.input_char != Cached::Eof {
            self.input_char = Cached::Unread;
        }
    }

    /// Discard input up to (not including) the next newline or EOF.
    pub fn skip_line(&mut self) {
        loop {
            match self.ch() {
                Cached::Byte(b) if b != b'\n' => self.next_char(),
                _ => break,
            }
        }
    }

    /// Pull the next token into `self.token`. On lexical error, sets the
    /// token to `Newline` to aid recovery, matching the original's policy.
    pub fn next(&mut self, store: &mut Store) -> Result<(), WrenError> {
        loop {
            match self.ch() {
                Cached::Byte(b) if b.is_ascii_digit() => {
                    return self.lex_number();
                }
                Cached::Byte(b) if b.is_ascii_alphabetic() || b == b'_' => {
                    return self.lex_ident();
                }
                Cached::Byte(b'\'') => {
                    return self.lex_string(store);
                }
                Cached::Byte(b @ (b'+' | b'-' | b'*' | b'/' | b'%' | b'<' | b'&' | b'|' | b'^'
                | b'(' | b')' | b'=' | b':' | b';')) => {
                    self.next_char();
                    self.token = Token::Punct(b as char);
                    return Ok(());
                }
                Cached::Byte(b'\n') => {
                    self.next_char();
                    self.token = Token::Newline;
                    return Ok(());
                }
                Cached::Eof => {
                    self.token = Token::Eof;
                    return Ok(());
                }
                Cached::Byte(b' ') | Cached::Byte(b'\t') | Cached::Byte(b'\r') => {
                    self.next_char();
                    continue;
                }
                Cached::Byte(b'#') => {
                    self.skip_line();
                    continue;
                }
                Cached::Byte(_) => {
                    self.token = Token::Newline;
                    return Err(WrenError::LexicalError);
                }
                Cached::Unread => unreachable!("ch() always resolves Unread"),
            }
        }
    }

    fn lex_number(&mut self) -> Result<(), WrenError> {
        let mut value: i64 = 0;
        loop {
            match self.ch() {
                Cached::Byte(b) if b.is_ascii_digit() => {
                    value = 10i64.wrapping_mul(value).wrapping_add((b - b'0') as i64);
                    self.next_char();
                    if value == 0 {
                        if let Cached::Byte(b'x') = self.ch() {
                            return self.lex_hex();
                        }
                    }
                    if value < 0 {
                        self.token = Token::Newline;
                        return Err(WrenError::NumericOverflow);
                    }
                }
                _ => break,
            }
        }
        self.token = Token::IntLiteral(value);
        Ok(())
    }

    fn lex_hex(&mut self) -> Result<(), WrenError> {
        self.next_char(); // consume 'x'
        let mut value: i64 = 0;
        let mut digit_count = 0u32;
        while let Cached::Byte(b) = self.ch() {
            if !b.is_ascii_hexdigit() {
                break;
            }
            let d = hex_digit_value(b);
            value = 16i64.wrapping_mul(value).wrapping_add(d as i64);
            digit_count += 1;
            self.next_char();
        }
        if digit_count == 0 {
            self.token = Token::Newline;
            return Err(WrenError::InvalidHexNumber);
        }
        if digit_count > 16 {
            // 2 * SIZEOF_WVALUE hex digits, i.e. 2*8 for an 8-byte word.
            self.token = Token::Newline;
            return Err(WrenError::NumericOverflow);
        }
        self.token = Token::IntLiteral(value);
        Ok(())
    }

    fn lex_ident(&mut self) -> Result<(), WrenError> {
        let mut name = String::new();
        loop {
            match self.ch() {
                Cached::Byte(b) if b.is_ascii_alphanumeric() || b == b'_' => {
                    if name.len() == IDENT_MAX_LEN {
                        self.token = Token::Newline;
                        return Err(WrenError::IdentifierTooLong);
                    }
                    name.push(b as char);
                    self.next_char();
                }
                _ => break,
            }
        }
        self.token = match name.as_str() {
            "then" => Token::Then,
            "forget" => Token::Forget,
            "let" => Token::Let,
            "if" => Token::If,
            "fun" => Token::Fun,
            "else" => Token::Else,
            _ => Token::Ident(name),
        };
        Ok(())
    }

    /// String literals are written straight into the store, one byte past
    /// `compiler_ptr`, so the forthcoming `PUSH_STRING` opcode lands just
    /// before them. `compiler_ptr` itself is left untouched here; the
    /// compiler advances it past the bytes once it emits that opcode.
    fn lex_string(&mut self, store: &mut Store) -> Result<(), WrenError> {
        self.next_char(); // consume opening quote
        let start = store.compiler_ptr().offset(1);
        let mut cursor = start;
        loop {
            match self.ch() {
                Cached::Byte(b'\'') => break,
                Cached::Eof => {
                    self.token = Token::Eof;
                    return Err(WrenError::UnterminatedString);
                }
                Cached::Byte(b) => {
                    if store.available((cursor.diff(store.compiler_ptr()) + 2) as u16).is_err() {
                        self.token = Token::Newline;
                        return Ok(());
                    }
                    store.write_u8(cursor, b);
                    cursor = cursor.offset(1);
                    self.next_char();
                }
                Cached::Unread => unreachable!(),
            }
        }
        self.next_char(); // consume closing quote
        store.write_u8(cursor, 0);
        self.token = Token::StringLiteral;
        Ok(())
    }
}

fn hex_digit_value(b: u8) -> u8 {
    if b.is_ascii_digit() {
        b - b'0'
    } else {
        b.to_ascii_uppercase() - b'A' + 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Endianness;

    fn lex_all(src: &str) -> Vec<Token> {
        let mut source = SliceSource::new(src.as_bytes());
        let mut store = Store::new(4096, Endianness::Little);
        let mut lexer = Lexer::new(&mut source);
        let mut out = Vec::new();
        loop {
            lexer.next(&mut store).unwrap();
            let done = lexer.token == Token::Eof;
            out.push(lexer.token.clone());
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn keywords_and_identifiers() {
        let toks = lex_all("fun foo = if then else forget let");
        assert_eq!(
            toks,
            vec![
                Token::Fun,
                Token::Ident("foo".into()),
                Token::Punct('='),
                Token::If,
                Token::Then,
                Token::Else,
                Token::Forget,
                Token::Let,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn decimal_and_hex_literals() {
        let toks = lex_all("42 0x1f");
        assert_eq!(toks, vec![Token::IntLiteral(42), Token::IntLiteral(0x1f), Token::Eof]);
    }

    #[test]
    fn hex_with_no_digits_errors() {
        let mut source = SliceSource::new(b"0x ");
        let mut store = Store::new(4096, Endianness::Little);
        let mut lexer = Lexer::new(&mut source);
        assert_eq!(lexer.next(&mut store), Err(WrenError::InvalidHexNumber));
    }

    #[test]
    fn string_literal_lands_in_store() {
        let mut source = SliceSource::new(b"'hi'");
        let mut store = Store::new(4096, Endianness::Little);
        let start = store.compiler_ptr();
        let mut lexer = Lexer::new(&mut source);
        lexer.next(&mut store).unwrap();
        assert_eq!(lexer.token, Token::StringLiteral);
        assert_eq!(store.read_cstr(start.offset(1)), b"hi");
    }
}
