//! The Assembler module is in charge of taking assembly
//! source text and producing the machine words it stands for.
//!
//! It does this in two passes over lexed lines. Pass 1 assigns
//! every label its address; pass 2 decodes and encodes each
//! instruction with the finished symbol table in hand, so a
//! branch may name a label that only appears further down.
//!
//! Errors never stop assembly. Every problem found is returned
//! as a [`Diagnostic`] next to whatever words could be built.

pub mod ast;
pub mod encoder;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod symbols;

pub use self::error::{Diagnostic, ErrorKind};
pub use self::symbols::SymbolTable;

use self::lexer::LineKind;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AssemblerOptions {
    /// Characters that start a comment running to the end of the line.
    pub comment_markers: Vec<char>,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        AssemblerOptions { comment_markers: lexer::DEFAULT_COMMENT_MARKERS.to_vec() }
    }
}

/// One encoded instruction, with where it came from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ListingEntry {
    pub line_number: u32,
    pub address: u16,
    pub word: u16,
    pub source: String,
}

#[derive(Clone, Debug)]
pub struct AssemblyResult {
    /// One word per successfully encoded instruction, in source order.
    pub words: Vec<u16>,
    /// Pass 1 diagnostics, then pass 2 diagnostics, each in line order.
    pub diagnostics: Vec<Diagnostic>,
    pub listing: Vec<ListingEntry>,
    pub symbols: SymbolTable,
}

impl AssemblyResult {
    /// True if any line failed to encode. Duplicate labels alone don't count.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_fatal)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_fatal()).count()
    }
}

pub struct Assembler {
    options: AssemblerOptions,
}

impl Assembler {
    pub fn new(options: AssemblerOptions) -> Self {
        Assembler { options }
    }

    /// Runs both passes over `source`.
    pub fn assemble(&self, source: &str) -> AssemblyResult {
        let lines = lexer::source_lines(source);
        let lexed: Vec<(u32, LineKind)> = lines
            .iter()
            .map(|line| (line.line_number, lexer::tokenize_with(&line.raw_text, &self.options.comment_markers)))
            .collect();

        // Pass 1 runs to completion before anything is encoded.
        let (symbols, mut diagnostics) = symbols::build_symbols(&lexed);

        let mut words = Vec::with_capacity(lexed.len());
        let mut listing = Vec::with_capacity(lexed.len());
        let mut address: u16 = 0;

        for (line, (line_number, kind)) in lines.iter().zip(lexed.iter()) {
            let (mnemonic, operands) = match kind {
                LineKind::Instruction { mnemonic, operands } => (mnemonic, operands),
                LineKind::Label(_) | LineKind::Blank => continue,
            };

            let encoded = parser::parse_instruction(*line_number, mnemonic, operands)
                .and_then(|statement| encoder::encode(*line_number, &statement, &symbols));

            match encoded {
                Ok(word) => {
                    words.push(word);
                    listing.push(ListingEntry {
                        line_number: *line_number,
                        address,
                        word,
                        source: line.raw_text.trim().to_owned(),
                    });
                },
                Err(diag) => {
                    debug!("{}", diag);
                    diagnostics.push(diag);
                },
            }
            // Addresses follow pass 1, which counts every instruction line.
            address = address.wrapping_add(1);
        }

        info!("assembled {} word(s) with {} diagnostic(s)", words.len(), diagnostics.len());
        AssemblyResult { words, diagnostics, listing, symbols }
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Assembler::new(AssemblerOptions::default())
    }
}

/// Assembles `source` with the default options.
pub fn assemble(source: &str) -> AssemblyResult {
    Assembler::default().assemble(source)
}
