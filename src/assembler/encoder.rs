//! Pass 2: resolves branch targets against the finished symbol table and
//! packs each statement into its machine word.
use super::ast::*;
use super::error::{Diagnostic, ErrorKind};
use super::symbols::SymbolTable;

/// Replaces a statement's branch target with an absolute address.
pub fn resolve(line_number: u32, statement: &Statement, symbols: &SymbolTable) -> Result<Instruction, Diagnostic> {
    let operands = statement.operands.clone().try_map_address(|target| match target {
        Target::Address(address) => Ok(address),
        Target::Label(name) => match symbols.address_of(&name) {
            Some(address) if address <= ADDRESS_MAX => Ok(address),
            Some(address) => Err(Diagnostic::new(
                line_number,
                ErrorKind::OperandOutOfRange,
                format!("label `{}` is at 0x{:04X}, beyond the branch range (0-{})", name, address, ADDRESS_MAX),
            )),
            None => Err(Diagnostic::new(
                line_number,
                ErrorKind::UndefinedLabel,
                format!("undefined label `{}`", name),
            )),
        },
    })?;

    Ok(Instruction {
        opcode: statement.opcode,
        condition: statement.condition,
        operands,
    })
}

/// Encodes one statement into a machine word.
pub fn encode(line_number: u32, statement: &Statement, symbols: &SymbolTable) -> Result<u16, Diagnostic> {
    let instruction = resolve(line_number, statement, symbols)?;
    let word = instruction.assemble();
    trace!("line {}: {} => 0x{:04X}", line_number, instruction, word);
    Ok(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::lexer::{tokenize, LineKind};
    use super::super::parser::parse_instruction;
    use super::super::symbols::build_symbols;

    fn table(src: &str) -> SymbolTable {
        let lines: Vec<(u32, LineKind)> = src.lines().enumerate().map(|(i, l)| (i as u32 + 1, tokenize(l))).collect();
        build_symbols(&lines).0
    }

    fn statement(line: &str) -> Statement {
        match tokenize(line) {
            LineKind::Instruction { mnemonic, operands } => parse_instruction(1, &mnemonic, &operands).unwrap(),
            other => panic!("not an instruction: {:?}", other),
        }
    }

    #[test]
    fn test_encode_registers() {
        let symbols = SymbolTable::default();
        assert_eq!(encode(1, &statement("add r0, r0, r1"), &symbols), Ok(0x1000));
        assert_eq!(encode(1, &statement("lsl r0, r0, 10"), &symbols), Ok(0xA00F));
        assert_eq!(encode(1, &statement("loadil r1, 12"), &symbols), Ok(0x0C1B));
        assert_eq!(encode(1, &statement("not r2, r2"), &symbols), Ok(0x0226));
        assert_eq!(encode(1, &statement("cmp r1, r2"), &symbols), Ok(0x0217));
        assert_eq!(encode(1, &statement("breq r3"), &symbols), Ok(0x1038));
    }

    #[test]
    fn test_encode_labels() {
        let symbols = table("start:\nadd r0,r0,r0\nadd r0,r0,r0\nnext:");
        assert_eq!(encode(1, &statement("b start"), &symbols), Ok(0x0009));
        assert_eq!(encode(1, &statement("blgt next"), &symbols), Ok(0b11_0000000010_1010));
        assert_eq!(encode(1, &statement("b 0x3FF"), &symbols), Ok(0x3FF9));
    }

    #[test]
    fn test_undefined_label() {
        let symbols = table("start:");
        let err = encode(4, &statement("beq target"), &symbols).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedLabel);
        assert_eq!(err.line_number, 4);
        assert_eq!(err.message, "undefined label `target`");
    }

    #[test]
    fn test_label_out_of_range() {
        let mut src = String::from("add r0, r0, r0\n").repeat(1024);
        src.push_str("far:\n");
        let symbols = table(&src);
        assert_eq!(symbols.address_of("far"), Some(1024));

        let err = encode(1, &statement("b far"), &symbols).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OperandOutOfRange);
    }

    #[test]
    fn test_resolve_keeps_opcode_and_condition() {
        let symbols = table("x:\nadd r0,r0,r0");
        let i = resolve(1, &statement("bllt x"), &symbols).unwrap();
        assert_eq!(i.opcode, Opcode::Bl);
        assert_eq!(i.condition, Condition::Lt);
        assert_eq!(i.operands, OperandList::LabelOnly { address: 0 });
    }
}
