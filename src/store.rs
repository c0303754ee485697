//! # The Store
//!
//! The store is the single fixed-size byte arena every other component reads
//! from and writes into: compiled code and global cells grow up from
//! `compiler_ptr`, dictionary headers grow down from `dictionary_ptr`, and
//! the runtime stack is carved out of whatever gap remains between them.
//!
//! ## Design
//! - [`Addr`] is a newtype around `u16`, a store-relative byte offset. The
//!   original C implementation keeps raw `uint8_t *` pointers into a static
//!   array; this rewrite follows the redesign note and never materializes a
//!   real pointer for anything the language can observe.
//! - All multi-byte reads/writes go through [`Store::read_u16`]/`write_u16`
//!   and [`Store::read_word`]/`write_word`, which always decode byte-wise
//!   according to the configured [`Endianness`]. There is no unaligned-access
//!   toggle to carry over: byte-wise access is always safe, so that toggle
//!   becomes a no-op by construction.
//! - The four reserved word cells at the bottom of the store (`cp`, `dp`,
//!   `c0`, `d0`) are kept in sync with `compiler_ptr`/`dictionary_ptr` on
//!   every mutation, so Wren code that reads the `cp`/`dp` globals always
//!   observes the current cursors (data-model invariant 4).

use crate::error::WrenError;

/// A byte offset into the [`Store`]. Never a real pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Addr(pub u16);

impl Addr {
    pub const ZERO: Addr = Addr(0);

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub fn offset(self, n: u16) -> Addr {
        Addr(self.0.wrapping_add(n))
    }

    pub fn sub(self, n: u16) -> Addr {
        Addr(self.0.wrapping_sub(n))
    }

    pub fn diff(self, other: Addr) -> i32 {
        self.0 as i32 - other.0 as i32
    }
}

impl std::ops::Add<u16> for Addr {
    type Output = Addr;
    fn add(self, rhs: u16) -> Addr {
        self.offset(rhs)
    }
}

/// Byte order used to encode/decode multi-byte fields in the store.
///
/// Mirrors `WREN_BIG_ENDIAN_DATA` from the original configuration header.
/// Default is little-endian, the common case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl Default for Endianness {
    fn default() -> Self {
        Endianness::Little
    }
}

/// Number of bytes in a Wren value/address word. The original ties `wValue`
/// to `intptr_t`; this rewrite fixes it at 8 bytes (an `i64`) for a portable,
/// unambiguous width.
pub const WORD_SIZE: u16 = 8;

/// Offsets of the four reserved globals, in word-sized cells from the base.
pub const CP_CELL: u16 = 0 * WORD_SIZE;
pub const DP_CELL: u16 = 1 * WORD_SIZE;
pub const C0_CELL: u16 = 2 * WORD_SIZE;
pub const D0_CELL: u16 = 3 * WORD_SIZE;

/// The fixed-size byte arena backing an [`crate::engine::Engine`].
pub struct Store {
    bytes: Vec<u8>,
    compiler_ptr: Addr,
    dictionary_ptr: Addr,
    endianness: Endianness,
}

impl Store {
    /// Allocate a store of `capacity` bytes and install the four reserved
    /// globals (`cp`, `dp`, `c0`, `d0`) at offsets `0..4*WORD_SIZE`.
    ///
    /// `compiler_ptr` starts just past those four cells; `dictionary_ptr`
    /// starts at the very end (an empty dictionary).
    pub fn new(capacity: usize, endianness: Endianness) -> Self {
        assert!(capacity <= u16::MAX as usize, "store capacity must fit in a u16 offset");
        let mut store = Store {
            bytes: vec![0; capacity],
            compiler_ptr: Addr((4 * WORD_SIZE) as u16),
            dictionary_ptr: Addr(capacity as u16),
            endianness,
        };
        let base = store.base();
        let end = store.end();
        store.write_word_raw(Addr(C0_CELL), base.0 as i64);
        store.write_word_raw(Addr(D0_CELL), end.0 as i64);
        store.sync_reserved_cells();
        store
    }

    pub fn base(&self) -> Addr {
        Addr(0)
    }

    pub fn end(&self) -> Addr {
        Addr(self.bytes.len() as u16)
    }

    pub fn capacity(&self) -> u16 {
        self.bytes.len() as u16
    }

    pub fn compiler_ptr(&self) -> Addr {
        self.compiler_ptr
    }

    pub fn dictionary_ptr(&self) -> Addr {
        self.dictionary_ptr
    }

    /// Move `compiler_ptr` and keep the `cp` global cell in sync (invariant 4).
    pub fn set_compiler_ptr(&mut self, addr: Addr) {
        self.compiler_ptr = addr;
        self.sync_reserved_cells();
    }

    /// Move `dictionary_ptr` and keep the `dp` global cell in sync (invariant 4).
    pub fn set_dictionary_ptr(&mut self, addr: Addr) {
        self.dictionary_ptr = addr;
        self.sync_reserved_cells();
    }

    fn sync_reserved_cells(&mut self) {
        let cp = self.compiler_ptr.0 as i64;
        let dp = self.dictionary_ptr.0 as i64;
        self.write_word_raw(Addr(CP_CELL), cp);
        self.write_word_raw(Addr(DP_CELL), dp);
    }

    /// True iff `amount` more bytes can be appended to the code region
    /// without the two regions overlapping.
    pub fn available(&self, amount: u16) -> Result<(), WrenError> {
        if self.compiler_ptr.0.saturating_add(amount) <= self.dictionary_ptr.0 {
            Ok(())
        } else {
            Err(WrenError::StoreExhausted)
        }
    }

    // --- raw byte access -----------------------------------------------

    pub fn read_u8(&self, addr: Addr) -> u8 {
        self.bytes[addr.as_usize()]
    }

    pub fn write_u8(&mut self, addr: Addr, value: u8) {
        self.bytes[addr.as_usize()] = value;
    }

    pub fn read_i8(&self, addr: Addr) -> i8 {
        self.read_u8(addr) as i8
    }

    pub fn write_i8(&mut self, addr: Addr, value: i8) {
        self.write_u8(addr, value as u8);
    }

    /// Byte-wise decode of an unsigned 16-bit field. Always correct
    /// regardless of host alignment; the only knob is [`Endianness`].
    pub fn read_u16(&self, addr: Addr) -> u16 {
        let i = addr.as_usize();
        let b = [self.bytes[i], self.bytes[i + 1]];
        match self.endianness {
            Endianness::Little => u16::from_le_bytes(b),
            Endianness::Big => u16::from_be_bytes(b),
        }
    }

    pub fn write_u16(&mut self, addr: Addr, value: u16) {
        let b = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        let i = addr.as_usize();
        self.bytes[i] = b[0];
        self.bytes[i + 1] = b[1];
    }

    pub fn read_i16(&self, addr: Addr) -> i16 {
        self.read_u16(addr) as i16
    }

    pub fn write_i16(&mut self, addr: Addr, value: i16) {
        self.write_u16(addr, value as u16);
    }

    /// Byte-wise decode of a full-width (8-byte) value/address word.
    pub fn read_word(&self, addr: Addr) -> i64 {
        let i = addr.as_usize();
        let mut b = [0u8; 8];
        b.copy_from_slice(&self.bytes[i..i + 8]);
        match self.endianness {
            Endianness::Little => i64::from_le_bytes(b),
            Endianness::Big => i64::from_be_bytes(b),
        }
    }

    pub fn write_word(&mut self, addr: Addr, value: i64) {
        self.write_word_raw(addr, value);
    }

    fn write_word_raw(&mut self, addr: Addr, value: i64) {
        let b = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        let i = addr.as_usize();
        self.bytes[i..i + 8].copy_from_slice(&b);
    }

    pub fn read_bytes(&self, addr: Addr, len: usize) -> &[u8] {
        let i = addr.as_usize();
        &self.bytes[i..i + len]
    }

    pub fn write_bytes(&mut self, addr: Addr, data: &[u8]) {
        let i = addr.as_usize();
        self.bytes[i..i + data.len()].copy_from_slice(data);
    }

    /// Read a NUL-terminated byte string starting at `addr`, not including
    /// the terminator. Used by `PUSH_STRING`/string-literal factors.
    pub fn read_cstr(&self, addr: Addr) -> &[u8] {
        let i = addr.as_usize();
        let end = self.bytes[i..].iter().position(|&b| b == 0).map(|p| i + p).unwrap_or(self.bytes.len());
        &self.bytes[i..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_cells_track_cursors() {
        let mut store = Store::new(4096, Endianness::Little);
        assert_eq!(store.read_word(Addr(CP_CELL)), store.compiler_ptr().0 as i64);
        assert_eq!(store.read_word(Addr(DP_CELL)), store.dictionary_ptr().0 as i64);

        store.set_compiler_ptr(Addr(100));
        store.set_dictionary_ptr(Addr(4000));
        assert_eq!(store.read_word(Addr(CP_CELL)), 100);
        assert_eq!(store.read_word(Addr(DP_CELL)), 4000);
    }

    #[test]
    fn word_round_trips_little_endian() {
        let mut store = Store::new(256, Endianness::Little);
        store.write_word(Addr(64), -42);
        assert_eq!(store.read_word(Addr(64)), -42);
    }

    #[test]
    fn available_rejects_overlap() {
        let mut store = Store::new(64, Endianness::Little);
        store.set_dictionary_ptr(Addr(40));
        store.set_compiler_ptr(Addr(38));
        assert!(store.available(2).is_ok());
        assert_eq!(store.available(3), Err(WrenError::StoreExhausted));
    }
}
