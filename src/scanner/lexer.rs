//! Lazy tokenizer for C#-style script source
//!
//! Comments and preprocessor lines are skipped. Malformed fragments are
//! recorded as diagnostics and lexing resumes after them.

use crate::domain::violations::ScanDiagnostic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Char,
    Punct,
}

/// A token borrowed from the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub line: u32,
    pub column: u32,
    /// Byte offset of the start of the line the token begins on
    pub line_start: usize,
}

impl<'a> Token<'a> {
    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == text
    }

    pub fn is_word(&self, text: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == text
    }
}

const THREE_CHAR_PUNCT: &[&str] = &["??="];

// `>>` and `<<` are deliberately absent so nested generic arguments close one at a time
const TWO_CHAR_PUNCT: &[&str] = &[
    "==", "!=", "?.", "??", "=>", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "::", "->",
];

const ONE_CHAR_PUNCT: &[u8] = b"{}()[];,.:=<>!?+-*/%&|^~";

/// Tokenizer over a source string; yields tokens lazily
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    line_start: usize,
    diagnostics: Vec<ScanDiagnostic>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let pos = if source.starts_with('\u{feff}') { '\u{feff}'.len_utf8() } else { 0 };
        Self {
            source,
            bytes: source.as_bytes(),
            pos,
            line: 1,
            line_start: pos,
            diagnostics: Vec::new(),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn diagnostics(&self) -> &[ScanDiagnostic] {
        &self.diagnostics
    }

    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn column_at(&self, pos: usize) -> u32 {
        (pos - self.line_start) as u32 + 1
    }

    fn diagnose(&mut self, line: u32, column: u32, message: impl Into<String>) {
        let diagnostic = ScanDiagnostic::new(line, column, message);
        tracing::debug!("Recovered scan error at {}:{}: {}", line, column, diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    fn newline(&mut self) {
        self.pos += 1;
        self.line += 1;
        self.line_start = self.pos;
    }

    /// Whether only whitespace precedes `pos` on its line
    fn at_line_start(&self, pos: usize) -> bool {
        self.source[self.line_start..pos].trim().is_empty()
    }

    fn skip_trivia(&mut self) {
        while let Some(byte) = self.peek_byte(0) {
            match byte {
                b'\n' => self.newline(),
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => self.pos += 1,
                b'/' if self.peek_byte(1) == Some(b'/') => self.skip_to_line_end(),
                b'/' if self.peek_byte(1) == Some(b'*') => self.skip_block_comment(),
                b'#' if self.at_line_start(self.pos) => self.skip_to_line_end(),
                _ => break,
            }
        }
    }

    fn skip_to_line_end(&mut self) {
        while let Some(byte) = self.peek_byte(0) {
            if byte == b'\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) {
        let (line, column) = (self.line, self.column_at(self.pos));
        self.pos += 2;
        loop {
            match self.peek_byte(0) {
                None => {
                    self.diagnose(line, column, "unterminated block comment");
                    return;
                }
                Some(b'*') if self.peek_byte(1) == Some(b'/') => {
                    self.pos += 2;
                    return;
                }
                Some(b'\n') => self.newline(),
                Some(_) => self.pos += 1,
            }
        }
    }

    /// The character starting at byte `pos`, if `pos` is on a char boundary
    fn char_at(&self, pos: usize) -> Option<char> {
        self.source.get(pos..)?.chars().next()
    }

    /// Byte length of the identifier character at `pos`. Non-ASCII letters count, U+FFFD and symbols do not.
    fn ident_char_len(&self, pos: usize, first: bool) -> Option<usize> {
        let byte = *self.bytes.get(pos)?;
        if byte.is_ascii() {
            let ok = byte.is_ascii_alphabetic() || byte == b'_' || (!first && byte.is_ascii_digit());
            return ok.then_some(1);
        }
        let c = self.char_at(pos)?;
        let ok = if first { c.is_alphabetic() } else { c.is_alphanumeric() };
        ok.then(|| c.len_utf8())
    }

    fn lex_ident(&mut self) {
        while let Some(len) = self.ident_char_len(self.pos, false) {
            self.pos += len;
        }
    }

    fn lex_number(&mut self) {
        if self.peek_byte(0) == Some(b'0') && matches!(self.peek_byte(1), Some(b'x' | b'X' | b'b' | b'B')) {
            self.pos += 2;
            while self.peek_byte(0).is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_') {
                self.pos += 1;
            }
            return;
        }

        let digits = |lexer: &mut Self| {
            while lexer.peek_byte(0).is_some_and(|b| b.is_ascii_digit() || b == b'_') {
                lexer.pos += 1;
            }
        };

        digits(self);
        if self.peek_byte(0) == Some(b'.') && self.peek_byte(1).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
            digits(self);
        }
        if matches!(self.peek_byte(0), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(self.peek_byte(1), Some(b'+' | b'-')));
            if self.peek_byte(1 + sign).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1 + sign;
                digits(self);
            }
        }
        while matches!(
            self.peek_byte(0),
            Some(b'f' | b'F' | b'd' | b'D' | b'm' | b'M' | b'u' | b'U' | b'l' | b'L')
        ) {
            self.pos += 1;
        }
    }

    /// Skip a backslash escape without swallowing a line break
    fn skip_escape(&mut self) {
        self.pos += 1;
        if self.peek_byte(0).is_some_and(|b| b != b'\n') {
            self.pos += 1;
        }
    }

    /// Regular string body; the opening quote is already consumed
    fn lex_string(&mut self, line: u32, column: u32) {
        loop {
            match self.peek_byte(0) {
                None | Some(b'\n') => {
                    self.diagnose(line, column, "unterminated string literal");
                    return;
                }
                Some(b'\\') => self.skip_escape(),
                Some(b'"') => {
                    self.pos += 1;
                    return;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Verbatim string body (`@"..."`); may span lines, `""` escapes a quote
    fn lex_verbatim_string(&mut self, line: u32, column: u32) {
        loop {
            match self.peek_byte(0) {
                None => {
                    self.diagnose(line, column, "unterminated verbatim string literal");
                    return;
                }
                Some(b'"') if self.peek_byte(1) == Some(b'"') => self.pos += 2,
                Some(b'"') => {
                    self.pos += 1;
                    return;
                }
                Some(b'\n') => self.newline(),
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Interpolated string body (`$"..."`), skipping nested strings inside holes
    fn lex_interpolated_string(&mut self, line: u32, column: u32, verbatim: bool) {
        let mut holes = 0usize;
        loop {
            match self.peek_byte(0) {
                None => {
                    self.diagnose(line, column, "unterminated interpolated string literal");
                    return;
                }
                Some(b'\n') if !verbatim && holes == 0 => {
                    self.diagnose(line, column, "unterminated interpolated string literal");
                    return;
                }
                Some(b'\n') => self.newline(),
                Some(b'{') if holes == 0 && self.peek_byte(1) == Some(b'{') => self.pos += 2,
                Some(b'}') if holes == 0 && self.peek_byte(1) == Some(b'}') => self.pos += 2,
                Some(b'{') => {
                    holes += 1;
                    self.pos += 1;
                }
                Some(b'}') if holes > 0 => {
                    holes -= 1;
                    self.pos += 1;
                }
                Some(b'"') if holes > 0 => {
                    let (l, c) = (self.line, self.column_at(self.pos));
                    self.pos += 1;
                    self.lex_string(l, c);
                }
                Some(b'"') if verbatim && self.peek_byte(1) == Some(b'"') => self.pos += 2,
                Some(b'"') => {
                    self.pos += 1;
                    return;
                }
                Some(b'\\') if !verbatim => self.skip_escape(),
                Some(_) => self.pos += 1,
            }
        }
    }

    fn lex_char(&mut self, line: u32, column: u32) {
        loop {
            match self.peek_byte(0) {
                None | Some(b'\n') => {
                    self.diagnose(line, column, "unterminated character literal");
                    return;
                }
                Some(b'\\') => self.skip_escape(),
                Some(b'\'') => {
                    self.pos += 1;
                    return;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn lex_punct(&mut self) -> bool {
        let rest = &self.source[self.pos..];
        if let Some(op) = THREE_CHAR_PUNCT.iter().find(|op| rest.starts_with(**op)) {
            self.pos += op.len();
            return true;
        }
        if let Some(op) = TWO_CHAR_PUNCT.iter().find(|op| rest.starts_with(**op)) {
            // `a ? .5f : b` is a conditional, not a null-conditional access
            let digit_follows = self.peek_byte(2).is_some_and(|b| b.is_ascii_digit());
            if !(*op == "?." && digit_follows) {
                self.pos += op.len();
                return true;
            }
        }
        if self.peek_byte(0).is_some_and(|b| ONE_CHAR_PUNCT.contains(&b)) {
            self.pos += 1;
            return true;
        }
        false
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        loop {
            self.skip_trivia();
            let byte = self.peek_byte(0)?;
            let start = self.pos;
            let (line, line_start) = (self.line, self.line_start);
            let column = self.column_at(start);

            let mut text_start = start;
            let kind = match byte {
                b'@' if self.ident_char_len(self.pos + 1, true).is_some() => {
                    self.pos += 1;
                    text_start = self.pos;
                    self.lex_ident();
                    TokenKind::Ident
                }
                b'@' if self.peek_byte(1) == Some(b'"') => {
                    self.pos += 2;
                    self.lex_verbatim_string(line, column);
                    TokenKind::Str
                }
                b'$' | b'@' if matches!(self.peek_byte(1), Some(b'$' | b'@')) && self.peek_byte(2) == Some(b'"') => {
                    self.pos += 3;
                    self.lex_interpolated_string(line, column, true);
                    TokenKind::Str
                }
                b'$' if self.peek_byte(1) == Some(b'"') => {
                    self.pos += 2;
                    self.lex_interpolated_string(line, column, false);
                    TokenKind::Str
                }
                b'"' => {
                    self.pos += 1;
                    self.lex_string(line, column);
                    TokenKind::Str
                }
                b'\'' => {
                    self.pos += 1;
                    self.lex_char(line, column);
                    TokenKind::Char
                }
                b if b.is_ascii_digit() => {
                    self.lex_number();
                    TokenKind::Number
                }
                b'.' if self.peek_byte(1).is_some_and(|b| b.is_ascii_digit()) => {
                    self.lex_number();
                    TokenKind::Number
                }
                _ if self.ident_char_len(self.pos, true).is_some() => {
                    self.lex_ident();
                    TokenKind::Ident
                }
                _ => {
                    if self.lex_punct() {
                        TokenKind::Punct
                    } else {
                        let unexpected = self.char_at(start).unwrap_or(char::REPLACEMENT_CHARACTER);
                        self.pos += self.char_at(start).map_or(1, char::len_utf8);
                        self.diagnose(line, column, format!("unexpected character `{unexpected}`"));
                        continue;
                    }
                }
            };

            return Some(Token {
                kind,
                text: &self.source[text_start..self.pos],
                line,
                column,
                line_start,
            });
        }
    }
}

/// The trimmed text of the line starting at `line_start`
pub fn line_text(source: &str, line_start: usize) -> &str {
    let rest = &source[line_start..];
    let end = rest.find('\n').unwrap_or(rest.len());
    rest[..end].trim()
}
