//! Diagnostics shared by every assembler stage.
//!
//! Nothing in the assembler aborts on a bad line. Each stage turns its
//! failures into a [`Diagnostic`] tagged with the source line, and the
//! driver hands all of them back to the caller at the end.
use thiserror::Error;

#[derive(Error, Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ErrorKind {
    #[error("unknown mnemonic")]
    UnknownMnemonic,
    #[error("wrong operand count")]
    WrongOperandCount,
    #[error("invalid register")]
    InvalidRegister,
    #[error("invalid operand")]
    InvalidOperand,
    #[error("invalid label")]
    InvalidLabel,
    #[error("operand out of range")]
    OperandOutOfRange,
    #[error("undefined label")]
    UndefinedLabel,
    #[error("duplicate label")]
    DuplicateLabel,
}

impl ErrorKind {
    /// Fatal diagnostics mean the line they belong to produced no word
    /// or no label. A redefined label still leaves every instruction
    /// encodable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ErrorKind::DuplicateLabel)
    }
}

/// A problem found on one source line.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
#[error("line {line_number}: {message}")]
pub struct Diagnostic {
    pub line_number: u32,
    pub kind: ErrorKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new<S: Into<String>>(line_number: u32, kind: ErrorKind, message: S) -> Self {
        Diagnostic { line_number, kind, message: message.into() }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

/// Returned by [`decode`](super::ast::Instruction::decode) for words that no
/// instruction assembles to.
#[derive(Error, Copy, Clone, PartialEq, Eq, Debug)]
pub enum DecodeError {
    #[error("word 0x{word:04X} sets reserved bits 0x{mask:04X} for opcode {opcode}")]
    ReservedBits { word: u16, opcode: u16, mask: u16 },
}
