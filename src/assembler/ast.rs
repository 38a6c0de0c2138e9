//! This AST describes one decoded instruction of the 16-bit instruction set.
//!
//! Every instruction is a single 16-bit word. The opcode always sits in the
//! low four bits; the operand fields are packed above it, most significant
//! first. Comments start with `;` or `#` and run to the end of the line.
//! Labels are a name followed by a colon on a line of their own.
//!
//! Supported Instructions:
//!
//! ```nasm
//! add    rd, rs1, rs2   ; rd <= rs1 + rs2
//! sub    rd, rs1, rs2   ; rd <= rs1 - rs2
//! str    rd, rs1, rs2   ; store
//! ldr    rd, rs1, rs2   ; load
//! and    rd, rs1, rs2   ; rd <= rs1 & rs2
//! or     rd, rs1, rs2   ; rd <= rs1 | rs2
//! not    rd, rs1        ; rd <= !rs1
//! cmp    rs1, rs2       ; set flags from rs1 - rs2
//! br     rd             ; jump to the address held in rd
//! b      label          ; jump to label
//! bl     label          ; jump to label, keeping the return address
//! loadil rd, CONST      ; lower 8 bits of rd <= CONST
//! loadiu rd, CONST      ; upper 8 bits of rd <= CONST
//! addi   rd, rs1, CONST ; rd <= rs1 + CONST (4-bit)
//! lsr    rd, rs1, rs2   ; rd <= rs1 >> rs2
//! lsl    rd, rs1, rs2   ; rd <= rs1 << rs2
//! ```
//!
//! `br`, `b` and `bl` take an optional `eq`, `lt` or `gt` suffix (`beq`,
//! `brgt`, `bllt`, ...). Register operands may be written `r5` or `5`, so the
//! shift amount of `lsl r0, r0, 10` lands in the rs2 field.
//!
//! Example source file:
//!
//! ```nasm
//! loadil  r0, 1
//! lsl     r0, r0, 10
//! loop:
//! loadiu  r3, 0x55      ; Constants may be decimal or hexadecimal.
//! cmp     r0, r3
//! blt     loop          # Either comment marker works.
//! ```

use std::convert::TryFrom;
use std::fmt;

use super::error::DecodeError;

/// Largest value of the 8-bit immediate field.
pub const IMM8_MAX: u16 = 0xFF;
/// Largest value of the 4-bit immediate field used by `addi`.
pub const IMM4_MAX: u16 = 0x0F;
/// Largest address a direct branch can reach.
pub const ADDRESS_MAX: u16 = 0x03FF;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Register(u8);

impl Register {
    pub const MAX: u16 = 15;

    pub fn to_u16(&self) -> u16 {
        self.0 as u16
    }

    fn from_field(word: u16, shift: u16) -> Register {
        Register(((word >> shift) & 0x0F) as u8)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl TryFrom<u16> for Register {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if value <= Register::MAX {
            Ok(Register(value as u8))
        } else {
            Err(format!("register r{} does not exist, registers run from r0 to r15", value))
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Opcode {
    Add    = 0,
    Sub    = 1,
    Str    = 2,
    Ldr    = 3,
    And    = 4,
    Or     = 5,
    Not    = 6,
    Cmp    = 7,
    Br     = 8,
    B      = 9,
    Bl     = 10,
    Loadil = 11,
    Loadiu = 12,
    Addi   = 13,
    Lsr    = 14,
    Lsl    = 15,
}

/// The operand layout an opcode packs above its low four bits.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Format {
    ThreeReg,
    RegRegImm,
    TwoReg,
    TwoRegImm,
    RegOnly,
    LabelOnly,
    TwoRegOnly,
}

impl Format {
    pub fn operand_count(&self) -> usize {
        match self {
            Format::ThreeReg | Format::RegRegImm                    => 3,
            Format::TwoReg | Format::TwoRegImm | Format::TwoRegOnly => 2,
            Format::RegOnly | Format::LabelOnly                     => 1,
        }
    }
}

impl Opcode {
    /// Every opcode, indexed by its numeric value.
    pub const ALL: [Opcode; 16] = [
        Opcode::Add, Opcode::Sub, Opcode::Str, Opcode::Ldr,
        Opcode::And, Opcode::Or, Opcode::Not, Opcode::Cmp,
        Opcode::Br, Opcode::B, Opcode::Bl, Opcode::Loadil,
        Opcode::Loadiu, Opcode::Addi, Opcode::Lsr, Opcode::Lsl,
    ];

    /// Opcodes that accept a condition suffix, longest mnemonic first.
    pub const BRANCHES: [Opcode; 3] = [Opcode::Br, Opcode::Bl, Opcode::B];

    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Add    => "add",
            Opcode::Sub    => "sub",
            Opcode::Str    => "str",
            Opcode::Ldr    => "ldr",
            Opcode::And    => "and",
            Opcode::Or     => "or",
            Opcode::Not    => "not",
            Opcode::Cmp    => "cmp",
            Opcode::Br     => "br",
            Opcode::B      => "b",
            Opcode::Bl     => "bl",
            Opcode::Loadil => "loadil",
            Opcode::Loadiu => "loadiu",
            Opcode::Addi   => "addi",
            Opcode::Lsr    => "lsr",
            Opcode::Lsl    => "lsl",
        }
    }

    /// Looks up an exact base mnemonic, without any condition suffix.
    pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
        Opcode::ALL.iter().copied().find(|op| op.mnemonic() == mnemonic)
    }

    /// Only the low four bits of `value` are considered.
    pub fn from_u16(value: u16) -> Opcode {
        Opcode::ALL[(value & 0x0F) as usize]
    }

    pub fn to_u16(&self) -> u16 {
        *self as u16
    }

    pub fn format(&self) -> Format {
        use Opcode::*;
        match self {
            Add | Sub | Str | Ldr |
            And | Or  | Lsr | Lsl => Format::ThreeReg,
            Addi                  => Format::RegRegImm,
            Not                   => Format::TwoReg,
            Cmp                   => Format::TwoRegOnly,
            Loadil | Loadiu       => Format::TwoRegImm,
            Br                    => Format::RegOnly,
            B | Bl                => Format::LabelOnly,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Condition {
    None,
    Eq,
    Lt,
    Gt,
}

impl Condition {
    pub const SUFFIXED: [Condition; 3] = [Condition::Eq, Condition::Lt, Condition::Gt];

    pub fn suffix(&self) -> &'static str {
        match self {
            Condition::None => "",
            Condition::Eq   => "eq",
            Condition::Lt   => "lt",
            Condition::Gt   => "gt",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Condition> {
        match suffix {
            ""   => Some(Condition::None),
            "eq" => Some(Condition::Eq),
            "lt" => Some(Condition::Lt),
            "gt" => Some(Condition::Gt),
            _    => None,
        }
    }

    pub fn to_u16(&self) -> u16 {
        match self {
            Condition::None => 0b00,
            Condition::Eq   => 0b01,
            Condition::Lt   => 0b10,
            Condition::Gt   => 0b11,
        }
    }

    /// Only the low two bits of `bits` are considered.
    pub fn from_u16(bits: u16) -> Condition {
        match bits & 0b11 {
            0b00 => Condition::None,
            0b01 => Condition::Eq,
            0b10 => Condition::Lt,
            _    => Condition::Gt,
        }
    }
}

/// A branch destination as written in the source, before pass 2 resolves it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Target {
    Label(String),
    Address(u16),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Target::Label(name)     => write!(f, "{}", name),
            Target::Address(addr)   => write!(f, "{}", addr),
        }
    }
}

/// Operands of an instruction, one variant per [`Format`].
///
/// `A` is the type of a direct branch destination: a [`Target`] while the
/// instruction still comes straight from the source, a resolved `u16`
/// address once the symbol table has been consulted.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OperandList<A = u16> {
    ThreeReg   { rd: Register, rs1: Register, rs2: Register },
    RegRegImm  { rd: Register, rs1: Register, imm4: u8 },
    TwoReg     { rd: Register, rs1: Register },
    TwoRegImm  { rd: Register, imm8: u8 },
    RegOnly    { rd: Register },
    LabelOnly  { address: A },
    TwoRegOnly { rs1: Register, rs2: Register },
}

impl<A> OperandList<A> {
    pub fn format(&self) -> Format {
        match self {
            OperandList::ThreeReg { .. }   => Format::ThreeReg,
            OperandList::RegRegImm { .. }  => Format::RegRegImm,
            OperandList::TwoReg { .. }     => Format::TwoReg,
            OperandList::TwoRegImm { .. }  => Format::TwoRegImm,
            OperandList::RegOnly { .. }    => Format::RegOnly,
            OperandList::LabelOnly { .. }  => Format::LabelOnly,
            OperandList::TwoRegOnly { .. } => Format::TwoRegOnly,
        }
    }

    /// Replaces the branch destination, if there is one, leaving every
    /// register and immediate untouched.
    pub fn try_map_address<B, E, F>(self, f: F) -> Result<OperandList<B>, E>
    where
        F: FnOnce(A) -> Result<B, E>,
    {
        use OperandList::*;
        Ok(match self {
            ThreeReg { rd, rs1, rs2 }  => ThreeReg { rd, rs1, rs2 },
            RegRegImm { rd, rs1, imm4 } => RegRegImm { rd, rs1, imm4 },
            TwoReg { rd, rs1 }         => TwoReg { rd, rs1 },
            TwoRegImm { rd, imm8 }     => TwoRegImm { rd, imm8 },
            RegOnly { rd }             => RegOnly { rd },
            LabelOnly { address }      => LabelOnly { address: f(address)? },
            TwoRegOnly { rs1, rs2 }    => TwoRegOnly { rs1, rs2 },
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Instruction<A = u16> {
    pub opcode: Opcode,
    pub condition: Condition,
    pub operands: OperandList<A>,
}

/// An instruction as decoded from source text, branch target unresolved.
pub type Statement = Instruction<Target>;

impl<A: fmt::Display> fmt::Display for Instruction<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use OperandList::*;
        write!(f, "{}{}", self.opcode.mnemonic(), self.condition.suffix())?;
        match &self.operands {
            ThreeReg { rd, rs1, rs2 }   => write!(f, " {}, {}, {}", rd, rs1, rs2),
            RegRegImm { rd, rs1, imm4 } => write!(f, " {}, {}, {}", rd, rs1, imm4),
            TwoReg { rd, rs1 }          => write!(f, " {}, {}", rd, rs1),
            TwoRegImm { rd, imm8 }      => write!(f, " {}, 0x{:02X}", rd, imm8),
            RegOnly { rd }              => write!(f, " {}", rd),
            LabelOnly { address }       => write!(f, " {}", address),
            TwoRegOnly { rs1, rs2 }     => write!(f, " {}, {}", rs1, rs2),
        }
    }
}

impl Instruction {
    /// Assembles the instruction to its 16-bit machine word.
    /// Unused fields assemble to zero.
    pub fn assemble(&self) -> u16 {
        use OperandList::*;
        let fields = match self.operands {
            ThreeReg { rd, rs1, rs2 } =>
                (rs2.to_u16() << 12) | (rs1.to_u16() << 8) | (rd.to_u16() << 4),
            RegRegImm { rd, rs1, imm4 } =>
                (((imm4 as u16) & IMM4_MAX) << 12) | (rs1.to_u16() << 8) | (rd.to_u16() << 4),
            TwoReg { rd, rs1 } =>
                (rs1.to_u16() << 8) | (rd.to_u16() << 4),
            TwoRegImm { rd, imm8 } =>
                ((imm8 as u16) << 8) | (rd.to_u16() << 4),
            RegOnly { rd } =>
                (self.condition.to_u16() << 12) | (rd.to_u16() << 4),
            LabelOnly { address } =>
                (self.condition.to_u16() << 14) | ((address & ADDRESS_MAX) << 4),
            TwoRegOnly { rs1, rs2 } =>
                (rs2.to_u16() << 8) | (rs1.to_u16() << 4),
        };
        fields | self.opcode.to_u16()
    }

    /// Recovers the instruction a machine word was assembled from.
    pub fn decode(word: u16) -> Result<Instruction, DecodeError> {
        let opcode = Opcode::from_u16(word);
        let reserved = match opcode.format() {
            Format::TwoReg | Format::TwoRegOnly => 0xF000,
            Format::RegOnly                     => 0xCF00,
            _                                   => 0x0000,
        };
        if word & reserved != 0 {
            return Err(DecodeError::ReservedBits { word, opcode: opcode.to_u16(), mask: word & reserved });
        }

        let mut condition = Condition::None;
        let operands = match opcode.format() {
            Format::ThreeReg => OperandList::ThreeReg {
                rd:  Register::from_field(word, 4),
                rs1: Register::from_field(word, 8),
                rs2: Register::from_field(word, 12),
            },
            Format::RegRegImm => OperandList::RegRegImm {
                rd:   Register::from_field(word, 4),
                rs1:  Register::from_field(word, 8),
                imm4: (word >> 12) as u8,
            },
            Format::TwoReg => OperandList::TwoReg {
                rd:  Register::from_field(word, 4),
                rs1: Register::from_field(word, 8),
            },
            Format::TwoRegImm => OperandList::TwoRegImm {
                rd:   Register::from_field(word, 4),
                imm8: (word >> 8) as u8,
            },
            Format::RegOnly => {
                condition = Condition::from_u16(word >> 12);
                OperandList::RegOnly { rd: Register::from_field(word, 4) }
            },
            Format::LabelOnly => {
                condition = Condition::from_u16(word >> 14);
                OperandList::LabelOnly { address: (word >> 4) & ADDRESS_MAX }
            },
            Format::TwoRegOnly => OperandList::TwoRegOnly {
                rs1: Register::from_field(word, 4),
                rs2: Register::from_field(word, 8),
            },
        };

        Ok(Instruction { opcode, condition, operands })
    }
}
