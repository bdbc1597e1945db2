//! Source scanning: turns script text into a lazy sequence of checked constructs
//!
//! Architectural Principle: Service Layer - The scanner recognizes declarations without a full parser
//! - The lexer supplies tokens on demand; the recognizer keeps a scope stack and a small lookahead
//! - Declared names (types, members, parameters, locals) and code shapes (braces, literals,
//!   null checks, hot-path calls) come out as `Identifier` values in source order
//! - Malformed fragments are skipped and recorded as diagnostics, never propagated as failures

pub mod lexer;

use crate::domain::identifiers::{ConstructKind, Identifier, Visibility};
use crate::domain::violations::ScanDiagnostic;
use lexer::{line_text, Lexer, Token, TokenKind};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Reserved words that can never be a declared name
const KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked", "class",
    "const", "continue", "decimal", "default", "delegate", "do", "double", "else", "enum", "event",
    "explicit", "extern", "false", "finally", "fixed", "float", "for", "foreach", "goto", "if",
    "implicit", "in", "int", "interface", "internal", "is", "lock", "long", "namespace", "new",
    "null", "object", "operator", "out", "override", "params", "private", "protected", "public",
    "readonly", "ref", "return", "sbyte", "sealed", "short", "sizeof", "stackalloc", "static",
    "string", "struct", "switch", "this", "throw", "true", "try", "typeof", "uint", "ulong",
    "unchecked", "unsafe", "ushort", "using", "virtual", "void", "volatile", "while",
];

/// Keywords that name a type and may therefore precede a declared name
const BUILTIN_TYPES: &[&str] = &[
    "bool", "byte", "char", "decimal", "double", "float", "int", "long", "object", "sbyte", "short",
    "string", "uint", "ulong", "ushort", "void",
];

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "readonly", "const", "volatile",
    "virtual", "override", "abstract", "sealed", "extern", "unsafe", "new", "partial", "async",
    "event", "fixed", "required", "ref",
];

const TYPE_KEYWORDS: &[&str] = &["class", "struct", "interface", "enum", "record"];

/// Statement openers that rule out a local declaration
const NON_DECLARATION_STARTS: &[&str] = &[
    "return", "yield", "await", "throw", "goto", "else", "case", "new", "break", "continue",
    "typeof", "default", "if", "while", "switch", "lock",
];

/// Tokens after which `{` opens a control-flow block
const BLOCK_KEYWORDS: &[&str] = &["else", "try", "finally", "do", "checked", "unchecked", "unsafe"];

/// Statement heads whose parenthesized part starts a fresh declaration context
const HEADER_KEYWORDS: &[&str] = &["for", "foreach", "using", "fixed", "catch"];

const ACCESSOR_KEYWORDS: &[&str] = &["get", "set", "init", "add", "remove"];

fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

/// An identifier token usable as a declared name
fn is_name(token: &Token<'_>) -> bool {
    token.is_ident() && !is_keyword(token.text)
}

/// Whether `token` can end a type in a declaration (`int`, `Foo`, `List<T>`, `T[]`, `T?`)
fn ends_type(token: &Token<'_>) -> bool {
    if token.is_ident() {
        return !is_keyword(token.text) || BUILTIN_TYPES.contains(&token.text);
    }
    token.kind == TokenKind::Punct && matches!(token.text, ">" | "]" | "?")
}

/// Options controlling what the scanner reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerOptions {
    /// Method names treated as per-frame callbacks
    #[serde(default = "default_hot_methods")]
    pub hot_methods: Vec<String>,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self { hot_methods: default_hot_methods() }
    }
}

fn default_hot_methods() -> Vec<String> {
    ["Update", "FixedUpdate", "LateUpdate", "OnGUI"].iter().map(|s| s.to_string()).collect()
}

/// Extracts identifiers and code shapes from source text
#[derive(Debug, Clone, Default)]
pub struct SourceScanner {
    options: ScannerOptions,
}

impl SourceScanner {
    pub fn new(options: ScannerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ScannerOptions {
        &self.options
    }

    /// Start a lazy scan of `source`; scanning the same text again yields the same sequence
    pub fn scan<'a>(&'a self, source: &'a str) -> Scan<'a> {
        Scan::new(source, &self.options)
    }

    /// Scan to completion, returning identifiers and diagnostics
    pub fn scan_all(&self, source: &str) -> (Vec<Identifier>, Vec<ScanDiagnostic>) {
        let mut scan = self.scan(source);
        let identifiers: Vec<_> = scan.by_ref().collect();
        (identifiers, scan.diagnostics())
    }
}

/// Lexer with arbitrary lookahead
struct TokenStream<'a> {
    lexer: Lexer<'a>,
    buffer: VecDeque<Token<'a>>,
}

impl<'a> TokenStream<'a> {
    fn next(&mut self) -> Option<Token<'a>> {
        self.buffer.pop_front().or_else(|| self.lexer.next())
    }

    fn peek(&mut self, n: usize) -> Option<Token<'a>> {
        while self.buffer.len() <= n {
            let token = self.lexer.next()?;
            self.buffer.push_back(token);
        }
        self.buffer.get(n).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Scope {
    /// File root or namespace body
    Namespace,
    /// Class, struct, interface or record body
    Type { name: String, interface: bool },
    Enum { expect_member: bool },
    /// Property or event accessor list
    Accessors,
    /// Outermost block of a method or accessor
    Body { hot: bool },
    /// Nested block, lambda body or object initializer inside a body
    Block,
    /// Braces inside a field initializer; contents are not reported
    Initializer,
}

#[derive(Debug, Clone)]
struct Frame {
    scope: Scope,
    line: u32,
    column: u32,
}

#[derive(Debug, Clone, Copy)]
enum Terminator {
    Semicolon,
    Brace,
    Arrow,
}

/// What a member header turned out to declare
#[derive(Debug, Clone, PartialEq)]
enum Member {
    Nothing,
    Namespace,
    Type { name: String, kind: ConstructKind },
    Method { name: String },
    Property,
}

/// Expression body (`=> expr;`) being scanned as method code
#[derive(Debug, Clone, Copy)]
struct ExpressionBody {
    depth: usize,
    hot: bool,
}

/// In-progress statement inside a body, used to spot local declarations
#[derive(Debug, Default)]
struct Statement<'a> {
    tokens: Vec<Token<'a>>,
    paren_depth: usize,
    decided: bool,
}

impl<'a> Statement<'a> {
    fn reset(&mut self) {
        self.tokens.clear();
        self.paren_depth = 0;
        self.decided = false;
    }

    fn is_const(&self) -> bool {
        self.tokens.first().is_some_and(|t| t.is_word("const"))
    }
}

/// A lazy, restartable scan over one source text
pub struct Scan<'a> {
    tokens: TokenStream<'a>,
    source: &'a str,
    options: &'a ScannerOptions,
    frames: Vec<Frame>,
    pending: VecDeque<Identifier>,
    diagnostics: Vec<ScanDiagnostic>,
    /// Member header tokens at namespace/type scope
    decl: Vec<Token<'a>>,
    decl_paren_depth: usize,
    decl_has_assign: bool,
    attribute_depth: usize,
    expression: Option<ExpressionBody>,
    statement: Statement<'a>,
    /// Open parens inside bodies; `true` marks a `new T(` argument list
    parens: Vec<bool>,
    after_new: bool,
    closed_new_call: bool,
    last: Option<Token<'a>>,
    last2: Option<Token<'a>>,
    finished: bool,
}

impl<'a> Scan<'a> {
    fn new(source: &'a str, options: &'a ScannerOptions) -> Self {
        Self {
            tokens: TokenStream { lexer: Lexer::new(source), buffer: VecDeque::new() },
            source,
            options,
            frames: vec![Frame { scope: Scope::Namespace, line: 1, column: 1 }],
            pending: VecDeque::new(),
            diagnostics: Vec::new(),
            decl: Vec::new(),
            decl_paren_depth: 0,
            decl_has_assign: false,
            attribute_depth: 0,
            expression: None,
            statement: Statement::default(),
            parens: Vec::new(),
            after_new: false,
            closed_new_call: false,
            last: None,
            last2: None,
            finished: false,
        }
    }

    /// Diagnostics recorded so far, ordered by position
    pub fn diagnostics(&self) -> Vec<ScanDiagnostic> {
        let mut all: Vec<_> = self.tokens.lexer.diagnostics().to_vec();
        all.extend(self.diagnostics.iter().cloned());
        all.sort_by_key(|d| (d.line, d.column));
        all
    }

    fn diagnose(&mut self, line: u32, column: u32, message: impl Into<String>) {
        let diagnostic = ScanDiagnostic::new(line, column, message);
        tracing::debug!("Recovered scan error at {}:{}: {}", line, column, diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    fn emit(&mut self, token: &Token<'a>, name: impl Into<String>, kind: ConstructKind, visibility: Option<Visibility>) {
        let mut identifier = Identifier::new(name, kind, token.line, token.column)
            .with_context(line_text(self.source, token.line_start));
        identifier.visibility = visibility;
        self.pending.push_back(identifier);
    }

    fn emit_brace(&mut self, brace: &Token<'a>) {
        let text = line_text(self.source, brace.line_start).to_string();
        self.emit(brace, text, ConstructKind::Brace, None);
    }

    fn top(&self) -> &Scope {
        // The root frame is never popped
        &self.frames[self.frames.len() - 1].scope
    }

    fn push(&mut self, scope: Scope, token: &Token<'a>) {
        self.frames.push(Frame { scope, line: token.line, column: token.column });
    }

    fn pop(&mut self, token: &Token<'a>) -> Option<Scope> {
        if self.frames.len() == 1 {
            self.diagnose(token.line, token.column, "unmatched `}`");
            return None;
        }
        self.frames.pop().map(|frame| frame.scope)
    }

    fn enclosing_type(&self) -> Option<(&str, bool)> {
        self.frames.iter().rev().find_map(|frame| match &frame.scope {
            Scope::Type { name, interface } => Some((name.as_str(), *interface)),
            _ => None,
        })
    }

    fn in_hot_method(&self) -> bool {
        for frame in self.frames.iter().rev() {
            match frame.scope {
                Scope::Body { hot } => return hot,
                Scope::Block => continue,
                _ => break,
            }
        }
        self.expression.is_some_and(|e| e.hot)
    }

    fn is_hot(&self, method: &str) -> bool {
        self.options.hot_methods.iter().any(|m| m == method)
    }

    fn process(&mut self, token: Token<'a>) {
        if self.attribute_depth > 0 {
            if token.is_punct("[") {
                self.attribute_depth += 1;
            } else if token.is_punct("]") {
                self.attribute_depth -= 1;
            }
        } else if self.expression.is_some_and(|e| e.depth == self.frames.len()) {
            self.expression_token(token);
        } else {
            match self.top() {
                Scope::Namespace | Scope::Type { .. } => self.member_token(token),
                Scope::Enum { .. } => self.enum_token(token),
                Scope::Accessors => self.accessor_token(token),
                Scope::Body { .. } | Scope::Block => self.body_token(token),
                Scope::Initializer => self.initializer_token(token),
            }
        }

        self.last2 = self.last;
        self.last = Some(token);
    }

    fn clear_decl(&mut self) {
        self.decl.clear();
        self.decl_paren_depth = 0;
        self.decl_has_assign = false;
    }

    fn member_token(&mut self, token: Token<'a>) {
        if token.kind != TokenKind::Punct {
            self.decl.push(token);
            return;
        }

        match token.text {
            "[" if self.decl.is_empty() => self.attribute_depth = 1,
            "(" => {
                self.decl_paren_depth += 1;
                self.decl.push(token);
            }
            ")" => {
                self.decl_paren_depth = self.decl_paren_depth.saturating_sub(1);
                self.decl.push(token);
            }
            "=" if self.decl_paren_depth == 0 && !self.decl_has_assign => {
                self.decl_has_assign = true;
                self.decl.push(token);
            }
            "=>" if self.decl_paren_depth == 0 && !self.decl_has_assign => {
                let member = self.classify_member(Terminator::Arrow);
                let hot = matches!(&member, Member::Method { name } if self.is_hot(name));
                self.expression = Some(ExpressionBody { depth: self.frames.len(), hot });
                self.statement.reset();
            }
            ";" => {
                self.classify_member(Terminator::Semicolon);
            }
            "{" if self.decl_has_assign => self.push(Scope::Initializer, &token),
            "{" => self.open_member(token),
            "}" => {
                if !self.decl.is_empty() {
                    let first = self.decl[0];
                    self.diagnose(first.line, first.column, "incomplete declaration before `}`");
                    self.clear_decl();
                }
                self.pop(&token);
            }
            _ => self.decl.push(token),
        }
    }

    fn open_member(&mut self, brace: Token<'a>) {
        match self.classify_member(Terminator::Brace) {
            Member::Namespace => {
                self.emit_brace(&brace);
                self.push(Scope::Namespace, &brace);
            }
            Member::Type { name, kind } => {
                self.emit_brace(&brace);
                let scope = match kind {
                    ConstructKind::Enum => Scope::Enum { expect_member: true },
                    _ => Scope::Type { name, interface: kind == ConstructKind::Interface },
                };
                self.push(scope, &brace);
            }
            Member::Method { name } => {
                self.emit_brace(&brace);
                let hot = self.is_hot(&name);
                self.begin_body();
                self.push(Scope::Body { hot }, &brace);
            }
            Member::Property => self.push(Scope::Accessors, &brace),
            Member::Nothing => {
                self.begin_body();
                self.push(Scope::Block, &brace);
            }
        }
    }

    fn begin_body(&mut self) {
        self.statement.reset();
        self.parens.clear();
        self.after_new = false;
        self.closed_new_call = false;
    }

    /// Classify the buffered member header, emitting the names it declares
    fn classify_member(&mut self, terminator: Terminator) -> Member {
        let tokens = std::mem::take(&mut self.decl);
        self.clear_decl();

        let modifier_count = tokens
            .iter()
            .take_while(|t| t.is_ident() && MODIFIERS.contains(&t.text))
            .count();
        let (modifiers, rest) = tokens.split_at(modifier_count);
        let Some(first) = rest.first() else {
            return Member::Nothing;
        };

        if first.is_word("using") || first.is_word("extern") || first.is_word("delegate") {
            return Member::Nothing;
        }
        if first.is_word("namespace") {
            return Member::Namespace;
        }

        let enclosing = self.enclosing_type().map(|(name, interface)| (name.to_string(), interface));
        let at_type = matches!(self.top(), Scope::Type { .. });
        let in_interface = enclosing.as_ref().is_some_and(|(_, interface)| *interface);
        let modifier_texts = || modifiers.iter().map(|t| t.text);

        if first.is_ident() && TYPE_KEYWORDS.contains(&first.text) {
            return self.classify_type(modifiers, rest, at_type);
        }
        if !at_type {
            return Member::Nothing;
        }

        let default_visibility = if in_interface { Visibility::Public } else { Visibility::Private };
        let visibility = Visibility::from_modifiers(modifier_texts(), default_visibility);

        let header_end = top_level_assign(rest).unwrap_or(rest.len());
        let header = &rest[..header_end];

        if let Some(open) = find_call_paren(header) {
            let name_index = method_name_index(header, open);
            let name = name_index.map(|i| header[i]);
            let is_operator = header[..open].iter().any(|t| t.is_word("operator"));
            let is_destructor = name_index.is_some_and(|i| i > 0 && header[i - 1].is_punct("~"));
            let is_constructor = match (&name, &enclosing) {
                (Some(name), Some((type_name, _))) => name.text == type_name.as_str(),
                _ => false,
            };

            let method_name = name.map(|t| t.text.to_string()).unwrap_or_default();
            if let Some(name) = name.filter(|n| is_name(n)) {
                if !is_operator && !is_destructor && !is_constructor {
                    self.emit(&name, name.text, ConstructKind::Method, Some(visibility));
                }
            }
            for parameter in parameter_names(header, open) {
                self.emit(&parameter, parameter.text, ConstructKind::Parameter, None);
            }
            return Member::Method { name: method_name };
        }

        // Indexer: `this[...]`
        if header.windows(2).any(|w| w[0].is_word("this") && w[1].is_punct("[")) {
            return Member::Property;
        }

        match terminator {
            Terminator::Brace | Terminator::Arrow => {
                if let Some(name) = header.last().filter(|t| is_name(t)) {
                    if header.len() >= 2 {
                        self.emit(name, name.text, ConstructKind::Property, Some(visibility));
                    }
                }
                Member::Property
            }
            Terminator::Semicolon => {
                let kind = if modifier_texts().any(|m| m == "const") {
                    ConstructKind::Constant
                } else {
                    ConstructKind::Field
                };
                for (index, declarator) in split_top_level(rest, ",").into_iter().enumerate() {
                    let end = top_level_assign(declarator).unwrap_or(declarator.len());
                    let names = &declarator[..end];
                    let minimum = if index == 0 { 2 } else { 1 };
                    if names.len() < minimum {
                        continue;
                    }
                    if let Some(name) = names.last().filter(|t| is_name(t)) {
                        self.emit(name, name.text, kind, Some(visibility));
                    }
                }
                Member::Nothing
            }
        }
    }

    fn classify_type(&mut self, modifiers: &[Token<'a>], rest: &[Token<'a>], nested: bool) -> Member {
        let keyword_count = rest
            .iter()
            .take_while(|t| t.is_ident() && TYPE_KEYWORDS.contains(&t.text))
            .count();
        let keywords: Vec<&str> = rest[..keyword_count].iter().map(|t| t.text).collect();
        let kind = match keywords.as_slice() {
            ["enum", ..] => ConstructKind::Enum,
            ["interface", ..] => ConstructKind::Interface,
            ["struct", ..] | ["record", "struct", ..] => ConstructKind::Struct,
            _ => ConstructKind::Class,
        };

        let Some(name) = rest.get(keyword_count).filter(|t| is_name(t)) else {
            let first = rest[0];
            self.diagnose(first.line, first.column, format!("`{}` without a name", first.text));
            return Member::Nothing;
        };

        let default_visibility = if nested { Visibility::Private } else { Visibility::Internal };
        let visibility = Visibility::from_modifiers(modifiers.iter().map(|t| t.text), default_visibility);
        self.emit(name, name.text, kind, Some(visibility));
        Member::Type { name: name.text.to_string(), kind }
    }

    fn enum_token(&mut self, token: Token<'a>) {
        let Some(Frame { scope: Scope::Enum { expect_member }, .. }) = self.frames.last_mut() else {
            return;
        };

        if token.is_punct(",") {
            *expect_member = true;
        } else if token.is_punct("[") && *expect_member {
            self.attribute_depth = 1;
        } else if token.is_punct("}") {
            self.pop(&token);
        } else if *expect_member && is_name(&token) {
            *expect_member = false;
            self.emit(&token, token.text, ConstructKind::EnumMember, Some(Visibility::Public));
        }
    }

    fn accessor_token(&mut self, token: Token<'a>) {
        match token.text {
            "{" if token.kind == TokenKind::Punct => {
                if self.last.is_some_and(|t| t.is_ident() && ACCESSOR_KEYWORDS.contains(&t.text)) {
                    self.emit_brace(&token);
                }
                self.begin_body();
                self.push(Scope::Body { hot: false }, &token);
            }
            "=>" if token.kind == TokenKind::Punct => {
                self.begin_body();
                self.expression = Some(ExpressionBody { depth: self.frames.len(), hot: false });
            }
            "[" if token.kind == TokenKind::Punct => self.attribute_depth = 1,
            "}" if token.kind == TokenKind::Punct => {
                self.pop(&token);
            }
            _ => {}
        }
    }

    fn initializer_token(&mut self, token: Token<'a>) {
        if token.is_punct("{") {
            self.push(Scope::Initializer, &token);
        } else if token.is_punct("}") {
            self.pop(&token);
        }
    }

    fn expression_token(&mut self, token: Token<'a>) {
        if token.is_punct(";") {
            self.expression = None;
            self.statement.reset();
            return;
        }
        self.body_token(token);
    }

    fn body_token(&mut self, token: Token<'a>) {
        match token.kind {
            TokenKind::Number => self.number_literal(token),
            TokenKind::Ident => self.body_word(token),
            TokenKind::Punct => self.body_punct(token),
            TokenKind::Str | TokenKind::Char => {}
        }

        if !token.is_punct(")") {
            self.closed_new_call = false;
        }
        // a closed `case`/`default` label leaves the statement empty
        let label_end = token.is_punct(":") && self.statement.tokens.is_empty();
        if (!matches!(token.text, ";" | "{" | "}") || token.kind != TokenKind::Punct) && !label_end {
            if !(token.is_punct("(") && self.last.is_some_and(|t| t.is_ident() && HEADER_KEYWORDS.contains(&t.text))) {
                self.statement.tokens.push(token);
            }
        }
    }

    fn number_literal(&mut self, token: Token<'a>) {
        if self.statement.is_const() {
            return;
        }

        let unary_minus = self.last.is_some_and(|t| t.is_punct("-"))
            && match self.last2 {
                None => true,
                Some(t) if t.kind == TokenKind::Punct => !matches!(t.text, ")" | "]"),
                Some(t) if t.is_ident() => is_keyword(t.text),
                Some(_) => false,
            };

        match (unary_minus, self.last) {
            (true, Some(minus)) => {
                let text = format!("-{}", token.text);
                self.emit(&minus, text, ConstructKind::NumericLiteral, None);
            }
            _ => self.emit(&token, token.text, ConstructKind::NumericLiteral, None),
        }
    }

    fn body_word(&mut self, token: Token<'a>) {
        match token.text {
            "new" => {
                self.after_new = true;
                return;
            }
            "is" => {
                let next = self.tokens.peek(0);
                if next.is_some_and(|t| t.is_word("null")) {
                    self.emit(&token, "is null", ConstructKind::NullCheck, None);
                } else if next.is_some_and(|t| t.is_word("not"))
                    && self.tokens.peek(1).is_some_and(|t| t.is_word("null"))
                {
                    self.emit(&token, "is not null", ConstructKind::NullCheck, None);
                }
                return;
            }
            "in" if self.statement.paren_depth == 0 => {
                self.detect_local();
                return;
            }
            _ => {}
        }

        if token.text == "tag" {
            if let Some(op) = self.tokens.peek(0).filter(|t| t.is_punct("==") || t.is_punct("!=")) {
                self.emit(&token, format!("tag {}", op.text), ConstructKind::TagComparison, None);
            }
        }

        if is_keyword(token.text) || !self.is_call(0) {
            return;
        }

        if token.text == "CompareTag" {
            self.emit(&token, "CompareTag", ConstructKind::TagComparison, None);
        }

        let constructed = self.last.is_some_and(|t| t.is_word("new"));
        if self.in_hot_method() && !constructed {
            let qualified = match (self.last2, self.last) {
                (Some(owner), Some(dot)) if dot.is_punct(".") && owner.is_ident() => {
                    format!("{}.{}", owner.text, token.text)
                }
                _ => token.text.to_string(),
            };
            self.emit(&token, qualified, ConstructKind::HotPathCall, None);
        }
    }

    /// Whether the identifier just consumed is called: `name(` or `name<T, U>(`
    fn is_call(&mut self, offset: usize) -> bool {
        match self.tokens.peek(offset) {
            Some(t) if t.is_punct("(") => true,
            Some(t) if t.is_punct("<") => {
                let mut depth = 0usize;
                for n in offset..offset + 16 {
                    let Some(t) = self.tokens.peek(n) else {
                        return false;
                    };
                    match t.text {
                        "<" => depth += 1,
                        ">" => {
                            depth -= 1;
                            if depth == 0 {
                                return self.tokens.peek(n + 1).is_some_and(|t| t.is_punct("("));
                            }
                        }
                        "," | "." | "[" | "]" | "?" => {}
                        _ if t.is_ident() => {}
                        _ => return false,
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn body_punct(&mut self, token: Token<'a>) {
        match token.text {
            "==" | "!=" => {
                if self.tokens.peek(0).is_some_and(|t| t.is_word("null")) {
                    self.emit(&token, format!("{} null", token.text), ConstructKind::NullCheck, None);
                } else if self.last.is_some_and(|t| t.is_word("null")) {
                    let null = self.last.unwrap_or(token);
                    self.emit(&null, format!("null {}", token.text), ConstructKind::NullCheck, None);
                } else if !self.last.is_some_and(|t| t.is_word("tag")) && self.compares_tag_member() {
                    self.emit(&token, format!("{} tag", token.text), ConstructKind::TagComparison, None);
                }
            }
            "?." | "??" | "??=" => self.emit(&token, token.text, ConstructKind::NullCheck, None),
            "=" if self.statement.paren_depth == 0 => self.detect_local(),
            ":" if self.statement.paren_depth == 0 && self.is_switch_label() => self.statement.reset(),
            ";" => {
                if self.statement.paren_depth == 0 {
                    self.detect_local();
                }
                self.statement.reset();
                self.after_new = false;
            }
            "," | ")" => {
                if token.text == ")" {
                    let was_new = self.parens.pop().unwrap_or(false);
                    self.closed_new_call = was_new;
                    if self.statement.paren_depth == 0 {
                        self.statement.reset();
                        self.statement.decided = true;
                    } else {
                        self.statement.paren_depth -= 1;
                    }
                }
                self.after_new = false;
            }
            "(" => {
                self.parens.push(self.after_new);
                self.after_new = false;
                if self.last.is_some_and(|t| t.is_ident() && HEADER_KEYWORDS.contains(&t.text)) {
                    self.statement.reset();
                } else {
                    self.statement.paren_depth += 1;
                }
            }
            "{" => self.open_block(token),
            "}" => {
                self.statement.reset();
                self.after_new = false;
                self.pop(&token);
            }
            _ => {}
        }
    }

    /// Whether the operand after `==`/`!=` is `tag` or a member path ending in `.tag`
    fn compares_tag_member(&mut self) -> bool {
        let mut n = 0;
        loop {
            match self.tokens.peek(n) {
                Some(t) if t.is_ident() => {}
                _ => return false,
            }
            match self.tokens.peek(n + 1) {
                Some(t) if t.is_punct(".") => n += 2,
                next => {
                    return self.tokens.peek(n).is_some_and(|t| t.text == "tag")
                        && !next.is_some_and(|t| t.is_punct("("));
                }
            }
        }
    }

    /// Whether the statement so far is a `case ...` or `default` switch label
    fn is_switch_label(&self) -> bool {
        match self.statement.tokens.first() {
            Some(t) if t.is_word("case") => true,
            Some(t) if t.is_word("default") => self.statement.tokens.len() == 1,
            _ => false,
        }
    }

    fn open_block(&mut self, brace: Token<'a>) {
        let initializer = self.after_new || self.closed_new_call;
        let is_code = !initializer
            && match self.last {
                None => true,
                Some(t) if t.kind == TokenKind::Punct => matches!(t.text, ")" | ";" | "{" | "}" | ":"),
                Some(t) => t.is_ident() && BLOCK_KEYWORDS.contains(&t.text),
            };

        if is_code {
            self.emit_brace(&brace);
        }
        self.statement.reset();
        self.after_new = false;
        self.push(Scope::Block, &brace);
    }

    /// Report a local declaration if the current statement reads `Type name` so far
    fn detect_local(&mut self) {
        if self.statement.decided {
            return;
        }
        self.statement.decided = true;

        let tokens = &self.statement.tokens;
        let (is_const, tokens) = match tokens.first() {
            Some(t) if t.is_word("const") => (true, &tokens[1..]),
            _ => (false, &tokens[..]),
        };
        if tokens.len() < 2 {
            return;
        }
        if tokens[0].is_ident() && NON_DECLARATION_STARTS.contains(&tokens[0].text) {
            return;
        }

        let name = tokens[tokens.len() - 1];
        let type_end = tokens[tokens.len() - 2];
        if !is_name(&name) || !ends_type(&type_end) {
            return;
        }
        // `a < b` style comparisons have no type start
        if !(tokens[0].is_ident()) {
            return;
        }

        let kind = if is_const { ConstructKind::Constant } else { ConstructKind::Local };
        self.emit(&name, name.text, kind, None);
    }

    fn finish(&mut self) {
        self.finished = true;
        if !self.decl.is_empty() {
            let first = self.decl[0];
            self.diagnose(first.line, first.column, "incomplete declaration at end of input");
            self.clear_decl();
        }
        while self.frames.len() > 1 {
            if let Some(frame) = self.frames.pop() {
                self.diagnostics.push(ScanDiagnostic::new(
                    frame.line,
                    frame.column,
                    format!("unclosed `{{` opened at line {}", frame.line),
                ));
            }
        }
    }
}

impl Iterator for Scan<'_> {
    type Item = Identifier;

    fn next(&mut self) -> Option<Identifier> {
        loop {
            if let Some(identifier) = self.pending.pop_front() {
                return Some(identifier);
            }
            if self.finished {
                return None;
            }
            match self.tokens.next() {
                Some(token) => self.process(token),
                None => self.finish(),
            }
        }
    }
}

/// Index of the first `=` outside brackets
fn top_level_assign(tokens: &[Token<'_>]) -> Option<usize> {
    let mut depth = 0isize;
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Punct {
            continue;
        }
        match token.text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => depth -= 1,
            "=" if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Index of the `(` that opens a method's parameter list
fn find_call_paren(header: &[Token<'_>]) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in header.iter().enumerate() {
        if token.is_punct("(") {
            let named = i > 0 && (header[i - 1].is_ident() || header[i - 1].is_punct(">"));
            let operator = header[..i].iter().any(|t| t.is_word("operator"));
            if depth == 0 && (named || operator) {
                return Some(i);
            }
            depth += 1;
        } else if token.is_punct(")") {
            depth = depth.saturating_sub(1);
        }
    }
    None
}

/// Index of the method name before `open`, skipping generic parameters
fn method_name_index(header: &[Token<'_>], open: usize) -> Option<usize> {
    let mut index = open.checked_sub(1)?;
    if header[index].is_punct(">") {
        let mut depth = 0usize;
        loop {
            if header[index].is_punct(">") {
                depth += 1;
            } else if header[index].is_punct("<") {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            index = index.checked_sub(1)?;
        }
        index = index.checked_sub(1)?;
    }
    header[index].is_ident().then_some(index)
}

/// Split tokens at top-level occurrences of `separator`
fn split_top_level<'t, 'a>(tokens: &'t [Token<'a>], separator: &str) -> Vec<&'t [Token<'a>]> {
    let mut parts = Vec::new();
    let mut depth = 0isize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Punct {
            continue;
        }
        match token.text {
            "(" | "[" | "<" | "{" => depth += 1,
            ")" | "]" | ">" | "}" => depth -= 1,
            text if text == separator && depth == 0 => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// Parameter name tokens of the list opened at `open`
fn parameter_names<'a>(header: &[Token<'a>], open: usize) -> Vec<Token<'a>> {
    let mut depth = 0usize;
    let mut close = header.len();
    for (i, token) in header.iter().enumerate().skip(open) {
        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            depth -= 1;
            if depth == 0 {
                close = i;
                break;
            }
        }
    }

    let inner = &header[open + 1..close];
    if inner.is_empty() {
        return Vec::new();
    }

    split_top_level(inner, ",")
        .into_iter()
        .filter_map(|parameter| {
            let mut parameter = parameter;
            while parameter.first().is_some_and(|t| t.is_punct("[")) {
                let end = parameter.iter().position(|t| t.is_punct("]"))?;
                parameter = &parameter[end + 1..];
            }
            let end = parameter.iter().position(|t| t.is_punct("=")).unwrap_or(parameter.len());
            let parameter = &parameter[..end];
            let name = parameter.last()?;
            (parameter.len() >= 2 && is_name(name)).then_some(*name)
        })
        .collect()
}
