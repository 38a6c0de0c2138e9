//! This lexer splits assembly source into classified lines.
//!
//! The instruction set allows one instruction or one label per line, so the
//! lexer never looks past a newline. It knows nothing about mnemonics or
//! operand syntax; that is the parser's job.
use once_cell::sync::Lazy;
use regex::Regex;

/// The comment markers used when the caller does not pick its own.
pub const DEFAULT_COMMENT_MARKERS: [char; 2] = [';', '#'];

// A label is a single word, free of commas and further colons, closed by the
// line's last colon.
static LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^\s,:]+):$").expect("label pattern is valid")
});

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SourceLine {
    pub line_number: u32,
    pub raw_text: String,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LineKind {
    Blank,
    Label(String),
    Instruction { mnemonic: String, operands: Vec<String> },
}

/// Splits source text into numbered lines. Numbering starts at 1.
pub fn source_lines(source: &str) -> Vec<SourceLine> {
    source
        .lines()
        .enumerate()
        .map(|(index, text)| SourceLine {
            line_number: index as u32 + 1,
            raw_text: text.to_owned(),
        })
        .collect()
}

/// Classifies one line using the default comment markers.
pub fn tokenize(raw_text: &str) -> LineKind {
    tokenize_with(raw_text, &DEFAULT_COMMENT_MARKERS)
}

pub fn tokenize_with(raw_text: &str, comment_markers: &[char]) -> LineKind {
    let text = strip_comment(raw_text, comment_markers);
    let text = text.trim();

    if text.is_empty() {
        return LineKind::Blank;
    }

    if let Some(caps) = LABEL.captures(text) {
        return LineKind::Label(caps[1].to_owned());
    }

    let mut words = split_words(text).into_iter();
    match words.next() {
        Some(mnemonic) => LineKind::Instruction { mnemonic, operands: words.collect() },
        // Only separators were left, e.g. a line holding nothing but commas.
        None => LineKind::Blank,
    }
}

/// Drops everything from the first unescaped comment marker onwards.
/// A marker preceded by a backslash is kept as a literal character.
fn strip_comment(raw_text: &str, comment_markers: &[char]) -> String {
    let mut out = String::with_capacity(raw_text.len());
    let mut chars = raw_text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(next) if comment_markers.contains(next) => {
                    out.push(*next);
                    chars.next();
                },
                _ => out.push(c),
            },
            c if comment_markers.contains(&c) => break,
            _ => out.push(c),
        }
    }
    out
}

/// Splits on runs of whitespace and commas. Empty words are never produced,
/// so `r0,,r1` and `r0 , r1` both give two operands.
fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::with_capacity(4);
    let mut sb = String::new();

    for c in text.chars() {
        if c.is_whitespace() || c == ',' {
            if !sb.is_empty() {
                words.push(sb.clone());
                sb.clear();
            }
        } else {
            sb.push(c);
        }
    }
    if !sb.is_empty() {
        words.push(sb);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instruction(mnemonic: &str, operands: &[&str]) -> LineKind {
        LineKind::Instruction {
            mnemonic: mnemonic.to_owned(),
            operands: operands.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_tokenize_blank() {
        assert_eq!(tokenize(""), LineKind::Blank);
        assert_eq!(tokenize("   \t  "), LineKind::Blank);
        assert_eq!(tokenize("; only a comment"), LineKind::Blank);
        assert_eq!(tokenize("   # another comment"), LineKind::Blank);
        assert_eq!(tokenize(" , ,"), LineKind::Blank);
    }

    #[test]
    fn test_tokenize_label() {
        assert_eq!(tokenize("start:"), LineKind::Label("start".to_owned()));
        assert_eq!(tokenize("  loop_2:   ; comment"), LineKind::Label("loop_2".to_owned()));
        assert_eq!(tokenize("\tend:\t"), LineKind::Label("end".to_owned()));

        // Whitespace before the colon means it's not a label.
        assert_eq!(tokenize("two words:"), instruction("two", &["words:"]));
        // Neither is a label followed by an instruction.
        assert_eq!(tokenize("x: add r0, r0, r0"), instruction("x:", &["add", "r0", "r0", "r0"]));
        assert_eq!(tokenize(":"), instruction(":", &[]));
    }

    #[test]
    fn test_tokenize_instruction() {
        assert_eq!(tokenize("add r0, r0, r1"), instruction("add", &["r0", "r0", "r1"]));
        assert_eq!(tokenize("add r0,r0,r1"), instruction("add", &["r0", "r0", "r1"]));
        assert_eq!(tokenize("loadil \t r0 ,,  0x56"), instruction("loadil", &["r0", "0x56"]));
        assert_eq!(tokenize("  b   loop  ; back to the top"), instruction("b", &["loop"]));
        assert_eq!(tokenize("cmp r1 r2 # compare"), instruction("cmp", &["r1", "r2"]));
        assert_eq!(tokenize("not"), instruction("not", &[]));
        // Surplus operands are the parser's problem, not the lexer's.
        assert_eq!(tokenize("not r1, r2, r3, r4"), instruction("not", &["r1", "r2", "r3", "r4"]));
    }

    #[test]
    fn test_custom_comment_markers() {
        assert_eq!(tokenize_with("b x // jump", &['/']), instruction("b", &["x"]));
        // `#` is an ordinary character once it's not a marker.
        assert_eq!(tokenize_with("b #x", &[';']), instruction("b", &["#x"]));
        assert_eq!(tokenize_with("b x ; comment", &[]), instruction("b", &["x", ";", "comment"]));
    }

    #[test]
    fn test_escaped_comment_marker() {
        assert_eq!(tokenize(r"b a\;b ; real comment"), instruction("b", &["a;b"]));
        assert_eq!(tokenize(r"b a\b"), instruction("b", &[r"a\b"]));
    }

    #[test]
    fn test_source_lines() {
        let lines = source_lines("start:\r\nadd r0,r0,r0\n\nb start");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], SourceLine { line_number: 1, raw_text: "start:".to_owned() });
        assert_eq!(lines[1].raw_text, "add r0,r0,r0");
        assert_eq!(lines[2].raw_text, "");
        assert_eq!(lines[3].line_number, 4);
    }
}
