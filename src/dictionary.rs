//! # Dictionary
//!
//! The dictionary is a stack of name headers growing downward from the top
//! of the store. Binding a name decrements `dictionary_ptr` and writes a new
//! header there; looking one up walks from `dictionary_ptr` up to the store
//! end; forgetting one truncates both the dictionary and the code region in
//! one LIFO step.
//!
//! A second, read-only table — [`PRIMITIVE_DICTIONARY`] — holds pre-formed
//! headers for the built-in integer/byte primitives (`umul`, `udiv`, ...).
//! It lives outside the store entirely and is searched only after the
//! dynamic dictionary misses, so a user definition can shadow a primitive
//! name until it's forgotten.

use crate::error::WrenError;
use crate::header::{write_header, HeaderView, NameKind, HEADER_FIXED_LEN, MAX_NAME_LEN};
use crate::opcode::Opcode;
use crate::store::{Addr, Store};

/// A lookup hit: either a header living in the store's dynamic dictionary,
/// or an entry in the constant primitive table.
#[derive(Debug, Clone, Copy)]
pub enum Lookup {
    Dynamic(HeaderView),
    Primitive { offset: usize },
}

impl Lookup {
    pub fn kind(self, store: &Store) -> NameKind {
        match self {
            Lookup::Dynamic(h) => h.kind(store),
            Lookup::Primitive { .. } => NameKind::Primitive,
        }
    }

    pub fn binding(self, store: &Store) -> u16 {
        match self {
            Lookup::Dynamic(h) => h.binding(store),
            Lookup::Primitive { .. } => 0,
        }
    }

    pub fn prim_arity(self) -> u8 {
        match self {
            Lookup::Primitive { offset } => PRIMITIVE_DICTIONARY[offset],
            Lookup::Dynamic(_) => unreachable!("prim_arity on a dynamic header"),
        }
    }

    pub fn prim_opcode(self) -> u8 {
        match self {
            Lookup::Primitive { offset } => PRIMITIVE_DICTIONARY[offset + 1],
            Lookup::Dynamic(_) => unreachable!("prim_opcode on a dynamic header"),
        }
    }
}

/// Bind `name` as `kind` with the given `binding`, allocating the header by
/// decrementing `dictionary_ptr`. Fails with [`WrenError::StoreExhausted`]
/// if the two regions would overlap.
pub fn bind(store: &mut Store, name: &[u8], kind: NameKind, binding: u16) -> Result<Addr, WrenError> {
    debug_assert!(!name.is_empty() && name.len() <= MAX_NAME_LEN);
    let size = HEADER_FIXED_LEN + name.len() as u16;
    store.available(size)?;
    let new_dp = Addr(store.dictionary_ptr().0 - size);
    store.set_dictionary_ptr(new_dp);
    write_header(store, new_dp, name, kind, binding);
    Ok(new_dp)
}

/// Scan `[dictionary_ptr, end)` for an exact-length, exact-byte match.
pub fn lookup_dynamic(store: &Store, name: &[u8]) -> Option<HeaderView> {
    let mut addr = store.dictionary_ptr();
    let end = store.end();
    while addr < end {
        let h = HeaderView::at(addr);
        if h.name_len(store) as usize == name.len() && h.name(store) == name {
            return Some(h);
        }
        addr = h.next(store);
    }
    None
}

/// Scan the constant primitive table for an exact-length, exact-byte match.
pub fn lookup_primitive(name: &[u8]) -> Option<usize> {
    let mut offset = 0usize;
    while offset < PRIMITIVE_DICTIONARY.len() {
        let kind_and_length = PRIMITIVE_DICTIONARY[offset + 2];
        let len = (kind_and_length & 0xf) as usize + 1;
        let entry_name = &PRIMITIVE_DICTIONARY[offset + 3..offset + 3 + len];
        if entry_name == name {
            return Some(offset);
        }
        offset += 3 + len;
    }
    None
}

/// Look up `name` in the dynamic dictionary first, falling back to the
/// primitive table. Matches the original's search order so a user
/// definition can shadow a primitive.
pub fn lookup(store: &Store, name: &[u8]) -> Option<Lookup> {
    if let Some(h) = lookup_dynamic(store, name) {
        return Some(Lookup::Dynamic(h));
    }
    lookup_primitive(name).map(|offset| Lookup::Primitive { offset })
}

/// Truncate both regions back to just before `name`'s binding. Valid only
/// for `global`, `procedure`, and `cfunction` kinds. The ordering check
/// happens before any mutation, so a failed forget leaves the store intact.
pub fn forget(store: &mut Store, name: &[u8]) -> Result<(), WrenError> {
    let h = match lookup_dynamic(store, name) {
        Some(h) => h,
        None => return Err(WrenError::UnknownIdentifier),
    };
    match h.kind(store) {
        NameKind::Global | NameKind::Procedure | NameKind::CFunction => {}
        _ => return Err(WrenError::NotADefinition),
    }
    let new_cp = Addr(h.binding(store));
    let new_dp = h.next(store);
    if store.base() <= new_cp && new_cp <= new_dp && new_dp <= store.end() {
        store.set_compiler_ptr(new_cp);
        store.set_dictionary_ptr(new_dp);
        Ok(())
    } else {
        Err(WrenError::DictionaryCorrupted)
    }
}

/// Pre-formed headers for the fixed set of integer/byte primitives, laid out
/// exactly like a dynamic header (`arity, opcode, kind_and_length, name...`
/// — for primitives the 2-byte `binding` field doubles as `(arity, opcode)`).
#[rustfmt::skip]
pub const PRIMITIVE_DICTIONARY: &[u8] = &[
    2, Opcode::Umul as u8, 3, b'u', b'm', b'u', b'l',
    2, Opcode::Udiv as u8, 3, b'u', b'd', b'i', b'v',
    2, Opcode::Umod as u8, 3, b'u', b'm', b'o', b'd',
    2, Opcode::Ult  as u8, 2, b'u', b'l', b't',
    2, Opcode::Sla  as u8, 2, b's', b'l', b'a',
    2, Opcode::Sra  as u8, 2, b's', b'r', b'a',
    2, Opcode::Srl  as u8, 2, b's', b'r', b'l',
    0, Opcode::Getc as u8, 3, b'g', b'e', b't', b'c',
    1, Opcode::Putc as u8, 3, b'p', b'u', b't', b'c',
    1, Opcode::Peek as u8, 3, b'p', b'e', b'e', b'k',
    2, Opcode::Poke as u8, 3, b'p', b'o', b'k', b'e',
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Endianness;

    #[test]
    fn bind_then_lookup_round_trips() {
        let mut store = Store::new(4096, Endianness::Little);
        let dp_before = store.dictionary_ptr();
        bind(&mut store, b"foo", NameKind::Global, 64).unwrap();
        let found = lookup_dynamic(&store, b"foo").unwrap();
        assert_eq!(found.kind(&store), NameKind::Global);
        assert_eq!(found.binding(&store), 64);
        assert_eq!(found.next(&store), dp_before);
    }

    #[test]
    fn dynamic_shadows_primitive() {
        let mut store = Store::new(4096, Endianness::Little);
        assert!(matches!(lookup(&store, b"getc"), Some(Lookup::Primitive { .. })));
        bind(&mut store, b"getc", NameKind::Global, 8).unwrap();
        assert!(matches!(lookup(&store, b"getc"), Some(Lookup::Dynamic(_))));
    }

    #[test]
    fn forget_is_lifo() {
        let mut store = Store::new(4096, Endianness::Little);
        let cp0 = store.compiler_ptr();
        let dp0 = store.dictionary_ptr();
        bind(&mut store, b"x", NameKind::Global, cp0.0).unwrap();
        store.set_compiler_ptr(Addr(cp0.0 + 8));
        forget(&mut store, b"x").unwrap();
        assert_eq!(store.compiler_ptr(), cp0);
        assert_eq!(store.dictionary_ptr(), dp0);
    }

    #[test]
    fn forget_rejects_local() {
        let mut store = Store::new(4096, Endianness::Little);
        bind(&mut store, b"p", NameKind::Local, 0).unwrap();
        assert_eq!(forget(&mut store, b"p"), Err(WrenError::NotADefinition));
    }
}
