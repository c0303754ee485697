//! # Instruction Set
//!
//! The opcode set executed by the VM and emitted by the assembler/compiler.
//! Ordering matches the original engine's enum exactly, since nothing else
//! depends on the numeric values — but keeping them lined up makes the two
//! easy to cross-check by eye.

/// One VM instruction selector. Each variant's discriminant is also its
/// on-the-wire byte value in the code region.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Halt = 0,
    Push,
    Pop,
    PushString,
    GlobalFetch,
    GlobalStore,
    LocalFetch,
    Tcall,
    Call,
    Return,
    Branch,
    Jump,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Umul,
    Udiv,
    Umod,
    Negate,
    Eq,
    Lt,
    Ult,
    And,
    Or,
    Xor,
    Sla,
    Sra,
    Srl,
    Getc,
    Putc,
    FetchByte,
    Peek,
    Poke,
    LocalFetch0,
    LocalFetch1,
    Pushw,
    Pushb,
    Ccall,
}

impl Opcode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ();

    fn try_from(v: u8) -> Result<Self, ()> {
        use Opcode::*;
        Ok(match v {
            0 => Halt,
            1 => Push,
            2 => Pop,
            3 => PushString,
            4 => GlobalFetch,
            5 => GlobalStore,
            6 => LocalFetch,
            7 => Tcall,
            8 => Call,
            9 => Return,
            10 => Branch,
            11 => Jump,
            12 => Add,
            13 => Sub,
            14 => Mul,
            15 => Div,
            16 => Mod,
            17 => Umul,
            18 => Udiv,
            19 => Umod,
            20 => Negate,
            21 => Eq,
            22 => Lt,
            23 => Ult,
            24 => And,
            25 => Or,
            26 => Xor,
            27 => Sla,
            28 => Sra,
            29 => Srl,
            30 => Getc,
            31 => Putc,
            32 => FetchByte,
            33 => Peek,
            34 => Poke,
            35 => LocalFetch0,
            36 => LocalFetch1,
            37 => Pushw,
            38 => Pushb,
            39 => Ccall,
            _ => return Err(()),
        })
    }
}
