//! The Parser module turns a lexed instruction line (a mnemonic plus raw
//! operand strings) into a [`Statement`].
//!
//! All operand validation happens here: by the time a statement reaches the
//! encoder every register is 0-15 and every constant fits its field. Only
//! label references are left for pass 2 to resolve.
use std::convert::TryFrom;

use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::*;
use super::error::{Diagnostic, ErrorKind};

static REGISTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^r([0-9]+)$").expect("register pattern is valid")
});

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-)?(?:0[xX]([0-9A-Fa-f]+)|([0-9]+))$").expect("number pattern is valid")
});

/// Maps a mnemonic to its opcode and branch condition.
///
/// Plain mnemonics match exactly. Otherwise the branch mnemonics are tried
/// longest first, and the first one whose leftover text is a condition
/// suffix wins: `bleq` is `bl` + `eq`, while `blt` is `b` + `lt` since `t`
/// is no suffix.
pub fn classify(mnemonic: &str) -> Result<(Opcode, Condition), ErrorKind> {
    if let Some(op) = Opcode::from_mnemonic(mnemonic) {
        return Ok((op, Condition::None));
    }

    for op in Opcode::BRANCHES.iter() {
        if let Some(suffix) = mnemonic.strip_prefix(op.mnemonic()) {
            if let Some(cond) = Condition::from_suffix(suffix) {
                return Ok((*op, cond));
            }
        }
    }

    Err(ErrorKind::UnknownMnemonic)
}

/// Decodes one instruction line, checking the operand count and every
/// operand against the instruction's format.
pub fn parse_instruction(line_number: u32, mnemonic: &str, operands: &[String]) -> Result<Statement, Diagnostic> {
    let (opcode, condition) = classify(mnemonic).map_err(|kind| {
        Diagnostic::new(line_number, kind, format!("unknown mnemonic `{}`", mnemonic))
    })?;

    let format = opcode.format();
    if operands.len() != format.operand_count() {
        return Err(Diagnostic::new(
            line_number,
            ErrorKind::WrongOperandCount,
            format!("`{}` takes {} operand(s), found {}", mnemonic, format.operand_count(), operands.len()),
        ));
    }

    let mut parser = Parser::new(line_number, operands);
    let operands = match format {
        Format::ThreeReg => {
            let rd = parser.register()?;
            let rs1 = parser.register()?;
            let rs2 = parser.register()?;
            OperandList::ThreeReg { rd, rs1, rs2 }
        },
        Format::RegRegImm => {
            let rd = parser.register()?;
            let rs1 = parser.register()?;
            let imm4 = parser.immediate(IMM4_MAX)? as u8;
            OperandList::RegRegImm { rd, rs1, imm4 }
        },
        Format::TwoReg => {
            let rd = parser.register()?;
            let rs1 = parser.register()?;
            OperandList::TwoReg { rd, rs1 }
        },
        Format::TwoRegImm => {
            let rd = parser.register()?;
            let imm8 = parser.immediate(IMM8_MAX)? as u8;
            OperandList::TwoRegImm { rd, imm8 }
        },
        Format::RegOnly => OperandList::RegOnly { rd: parser.register()? },
        Format::LabelOnly => OperandList::LabelOnly { address: parser.target()? },
        Format::TwoRegOnly => {
            let rs1 = parser.register()?;
            let rs2 = parser.register()?;
            OperandList::TwoRegOnly { rs1, rs2 }
        },
    };

    Ok(Instruction { opcode, condition, operands })
}

/// Parses a decimal or `0x` hexadecimal constant.
/// Negative values and values too large for any field are out of range.
pub fn parse_constant(text: &str) -> Result<u16, ErrorKind> {
    let caps = NUMBER.captures(text).ok_or(ErrorKind::InvalidOperand)?;
    let value = if let Some(hex) = caps.get(2) {
        u16::from_str_radix(hex.as_str(), 16)
    } else if let Some(dec) = caps.get(3) {
        dec.as_str().parse::<u16>()
    } else {
        return Err(ErrorKind::InvalidOperand);
    };

    match value {
        Ok(0) => Ok(0),
        Ok(_) if caps.get(1).is_some() => Err(ErrorKind::OperandOutOfRange),
        Ok(v) => Ok(v),
        // The digits matched, so the only way to fail is overflow.
        Err(_) => Err(ErrorKind::OperandOutOfRange),
    }
}

/// True when a branch operand is read as an address rather than a label.
/// Label names that would pass this test can never be referenced.
pub fn is_literal(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_digit() || c == '-')
}

/// Walks the operands of a single line.
struct Parser<'a> {
    line_number: u32,
    operands: std::slice::Iter<'a, String>,
}

impl<'a> Parser<'a> {
    fn new(line_number: u32, operands: &'a [String]) -> Self {
        Parser { line_number, operands: operands.iter() }
    }

    /// `r<N>` or a bare constant, either way 0-15.
    fn register(&mut self) -> Result<Register, Diagnostic> {
        let text = self.consume()?;

        let id = if let Some(caps) = REGISTER.captures(text) {
            caps[1].parse::<u16>().ok()
        } else if text.starts_with('-') {
            None
        } else {
            parse_constant(text).ok()
        };

        match id {
            Some(id) => Register::try_from(id).map_err(|e| self.error(ErrorKind::InvalidRegister, e)),
            None => Err(self.error(ErrorKind::InvalidRegister, format!("`{}` is not a register", text))),
        }
    }

    fn immediate(&mut self, max: u16) -> Result<u16, Diagnostic> {
        let text = self.consume()?;
        match parse_constant(text) {
            Ok(v) if v <= max => Ok(v),
            Ok(_) | Err(ErrorKind::OperandOutOfRange) => Err(self.error(
                ErrorKind::OperandOutOfRange,
                format!("constant `{}` does not fit in {} bits (0-{})", text, bit_width(max), max),
            )),
            Err(kind) => Err(self.error(kind, format!("`{}` is not a decimal or hexadecimal constant", text))),
        }
    }

    /// A literal address when the operand starts like a number, otherwise a
    /// label reference for pass 2.
    fn target(&mut self) -> Result<Target, Diagnostic> {
        let text = self.consume()?;
        if !is_literal(text) {
            return Ok(Target::Label(text.to_owned()));
        }

        match parse_constant(text) {
            Ok(addr) if addr <= ADDRESS_MAX => Ok(Target::Address(addr)),
            Ok(_) | Err(ErrorKind::OperandOutOfRange) => Err(self.error(
                ErrorKind::OperandOutOfRange,
                format!("address `{}` is beyond the branch range (0-{})", text, ADDRESS_MAX),
            )),
            Err(kind) => Err(self.error(kind, format!("`{}` is neither an address nor a label", text))),
        }
    }

    fn consume(&mut self) -> Result<&'a str, Diagnostic> {
        match self.operands.next() {
            Some(text) => Ok(text.as_str()),
            None => Err(self.error(ErrorKind::WrongOperandCount, "expected another operand")),
        }
    }

    fn error<S: Into<String>>(&self, kind: ErrorKind, message: S) -> Diagnostic {
        Diagnostic::new(self.line_number, kind, message)
    }
}

fn bit_width(max: u16) -> u32 {
    16 - max.leading_zeros()
}
