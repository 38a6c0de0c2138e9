//! Pass 1: binds every label to the address of the instruction it precedes.
//!
//! The table is only ever filled in here. Everything outside this module
//! sees it through `&SymbolTable`, so pass 2 cannot observe a table that is
//! still being built.
use std::collections::HashMap;

use super::error::{Diagnostic, ErrorKind};
use super::lexer::LineKind;
use super::parser::is_literal;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Label {
    pub name: String,
    pub address: u16,
    pub line_number: u32,
}

#[derive(Clone, Default, Debug)]
pub struct SymbolTable {
    labels: HashMap<String, Label>,
}

impl SymbolTable {
    pub fn get(&self, name: &str) -> Option<&Label> {
        self.labels.get(name)
    }

    pub fn address_of(&self, name: &str) -> Option<u16> {
        self.labels.get(name).map(|label| label.address)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels ordered by address, then by name.
    pub fn sorted(&self) -> Vec<&Label> {
        let mut labels: Vec<&Label> = self.labels.values().collect();
        labels.sort_by(|a, b| a.address.cmp(&b.address).then_with(|| a.name.cmp(&b.name)));
        labels
    }
}

/// Runs pass 1 over lexed lines.
///
/// The word counter only advances on instruction lines. A redefined label
/// is reported once per redefinition and the first definition is kept.
/// A name that a branch operand would read as an address is rejected.
pub fn build_symbols(lines: &[(u32, LineKind)]) -> (SymbolTable, Vec<Diagnostic>) {
    let mut table = SymbolTable::default();
    let mut diagnostics = Vec::new();
    let mut counter: usize = 0;

    for (line_number, kind) in lines.iter() {
        match kind {
            LineKind::Instruction { .. } => counter += 1,
            LineKind::Label(name) => {
                if is_literal(name) {
                    let diag = Diagnostic::new(
                        *line_number,
                        ErrorKind::InvalidLabel,
                        format!("label `{}` looks like an address and could never be branched to", name),
                    );
                    debug!("{}", diag);
                    diagnostics.push(diag);
                    continue;
                }

                if let Some(first) = table.labels.get(name) {
                    let diag = Diagnostic::new(
                        *line_number,
                        ErrorKind::DuplicateLabel,
                        format!("label `{}` is already defined on line {}", name, first.line_number),
                    );
                    debug!("{}", diag);
                    diagnostics.push(diag);
                    continue;
                }

                // Addresses past the u16 range can never be branched to anyway;
                // pin them to the maximum so the encoder reports the overflow.
                let address = if counter > u16::MAX as usize { u16::MAX } else { counter as u16 };
                trace!("label `{}` => 0x{:04X}", name, address);
                table.labels.insert(name.clone(), Label {
                    name: name.clone(),
                    address,
                    line_number: *line_number,
                });
            },
            LineKind::Blank => {},
        }
    }

    debug!("pass 1: {} label(s), {} instruction(s)", table.len(), counter);
    (table, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::lexer::tokenize;

    fn lex(src: &str) -> Vec<(u32, LineKind)> {
        src.lines().enumerate().map(|(i, l)| (i as u32 + 1, tokenize(l))).collect()
    }

    #[test]
    fn test_addresses_skip_labels_and_blanks() {
        let (table, diags) = build_symbols(&lex("
            start:
            loadil r0, 1   ; 0
            ; comment

            loop:
            add r0, r0, r0 ; 1
            inner:
            sub r0, r0, r0 ; 2
            end:
        "));

        assert!(diags.is_empty());
        assert_eq!(table.len(), 4);
        assert_eq!(table.address_of("start"), Some(0));
        assert_eq!(table.address_of("loop"), Some(1));
        assert_eq!(table.address_of("inner"), Some(2));
        assert_eq!(table.address_of("end"), Some(3));
        assert_eq!(table.get("loop").map(|l| l.line_number), Some(6));
        assert_eq!(table.address_of("missing"), None);
    }

    #[test]
    fn test_adjacent_labels_share_an_address() {
        let (table, _) = build_symbols(&lex("a:\nb:\nadd r0, r0, r0"));
        assert_eq!(table.address_of("a"), Some(0));
        assert_eq!(table.address_of("b"), Some(0));
    }

    #[test]
    fn test_invalid_instructions_still_count() {
        let (table, _) = build_symbols(&lex("bogus r0\nhere:\nadd r0, r0, r0"));
        assert_eq!(table.address_of("here"), Some(1));
    }

    #[test]
    fn test_duplicate_label() {
        let (table, diags) = build_symbols(&lex("x:\nadd r0,r0,r0\nx:\nsub r0,r0,r0\nx:"));

        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.kind == ErrorKind::DuplicateLabel));
        assert_eq!(diags[0].line_number, 3);
        assert_eq!(diags[1].line_number, 5);
        assert_eq!(diags[0].message, "label `x` is already defined on line 1");
        assert_eq!(table.address_of("x"), Some(0));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_numeric_label_names() {
        let (table, diags) = build_symbols(&lex("add r0,r0,r0\n5:\n-0:\n0x3:\nok5:\nadd r0,r0,r0"));

        assert_eq!(diags.len(), 3);
        assert!(diags.iter().all(|d| d.kind == ErrorKind::InvalidLabel));
        let lines: Vec<u32> = diags.iter().map(|d| d.line_number).collect();
        assert_eq!(lines, vec![2, 3, 4]);
        assert_eq!(table.address_of("5"), None);
        assert_eq!(table.address_of("0x3"), None);
        assert_eq!(table.address_of("ok5"), Some(1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_sorted() {
        let (table, _) = build_symbols(&lex("b:\nadd r0,r0,r0\nz:\na:\nadd r0,r0,r0"));
        let names: Vec<&str> = table.sorted().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "z"]);
    }
}
