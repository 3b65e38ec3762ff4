//! Recursive descent parser for `.proto` schema text.
//!
//! Covers the subset chat schemas use: packages, imports (recorded only),
//! nested messages and enums, `oneof` groups, and field options. Options,
//! `reserved`, `extensions`, `extend` and `service` blocks are skipped.
//! Type references are resolved against the declaring scope once the whole
//! file has been read.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::ast::{
    EnumDescriptor, EnumValue, FieldDescriptor, FieldKind, Label, MessageDescriptor, ScalarType, Syntax,
};
use super::{Schema, SchemaError};

/// Highest field number protobuf allows.
const MAX_FIELD_NUMBER: i64 = 536_870_911;

/// Parse `.proto` source text into a resolved [`Schema`].
///
/// # Errors
///
/// Returns [`SchemaError::Parse`] with the offending 1-based line for syntax
/// errors, and [`SchemaError::UnresolvedType`] when a field names a type that
/// is not declared in the file.
pub fn parse(source: &str) -> Result<Schema, SchemaError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0, file: RawFile::default() };
    parser.parse_file()?;
    resolve(parser.file)
}

// =============================================================================
// TOKENIZER
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
enum Token {
    /// Identifier, keyword, or dotted name (`a.b.C`, `.a.b.C`).
    Ident(String),
    /// Numeric literal kept verbatim; converted on demand.
    Number(String),
    Str(String),
    Sym(char),
}

#[derive(Clone, Debug)]
struct Spanned {
    token: Token,
    line: usize,
}

fn tokenize(source: &str) -> Result<Vec<Spanned>, SchemaError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        // Comments.
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            let start_line = line;
            i += 2;
            loop {
                match chars.get(i) {
                    None => return Err(parse_error(start_line, "unterminated block comment")),
                    Some('*') if chars.get(i + 1) == Some(&'/') => {
                        i += 2;
                        break;
                    }
                    Some('\n') => {
                        line += 1;
                        i += 1;
                    }
                    Some(_) => i += 1,
                }
            }
            continue;
        }

        if starts_ident(&chars, i) {
            let end = scan_ident(&chars, i);
            tokens.push(Spanned { token: Token::Ident(chars[i..end].iter().collect()), line });
            i = end;
            continue;
        }

        if starts_number(&chars, i) {
            let end = scan_number(&chars, i);
            tokens.push(Spanned { token: Token::Number(chars[i..end].iter().collect()), line });
            i = end;
            continue;
        }

        if c == '"' || c == '\'' {
            let (value, end) = scan_string(&chars, i, line)?;
            tokens.push(Spanned { token: Token::Str(value), line });
            i = end;
            continue;
        }

        if "{}[]()<>;=,:+-".contains(c) {
            tokens.push(Spanned { token: Token::Sym(c), line });
            i += 1;
            continue;
        }

        return Err(parse_error(line, format!("unexpected character `{c}`")));
    }

    Ok(tokens)
}

fn starts_ident(chars: &[char], i: usize) -> bool {
    let ident_start = |c: &char| c.is_ascii_alphabetic() || *c == '_';
    match chars.get(i) {
        Some('.') => chars.get(i + 1).is_some_and(ident_start),
        Some(c) => ident_start(c),
        None => false,
    }
}

/// End index of the identifier or dotted name starting at `i`.
fn scan_ident(chars: &[char], mut i: usize) -> usize {
    i += 1;
    while chars.get(i).is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.') {
        i += 1;
    }
    i
}

fn starts_number(chars: &[char], i: usize) -> bool {
    match chars.get(i) {
        Some('-') => chars.get(i + 1).is_some_and(char::is_ascii_digit),
        Some(c) => c.is_ascii_digit(),
        None => false,
    }
}

/// End index of the numeric literal starting at `i`; hex digits, exponents
/// and fractions are kept for [`parse_integer`] to judge.
fn scan_number(chars: &[char], mut i: usize) -> usize {
    i += 1;
    while chars.get(i).is_some_and(|c| c.is_ascii_alphanumeric() || *c == '.') {
        i += 1;
    }
    i
}

/// Unescaped value of the quoted literal opening at `i`, and the index after
/// its closing quote.
fn scan_string(chars: &[char], mut i: usize, line: usize) -> Result<(String, usize), SchemaError> {
    let quote = chars[i];
    let mut value = String::new();
    i += 1;
    loop {
        match chars.get(i) {
            None | Some('\n') => return Err(parse_error(line, "unterminated string literal")),
            Some(ch) if *ch == quote => return Ok((value, i + 1)),
            Some('\\') => {
                let escaped =
                    chars.get(i + 1).ok_or_else(|| parse_error(line, "unterminated string literal"))?;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => *other,
                });
                i += 2;
            }
            Some(ch) => {
                value.push(*ch);
                i += 1;
            }
        }
    }
}

// =============================================================================
// PARSER
// =============================================================================

#[derive(Debug, Default)]
struct RawFile {
    syntax: Option<String>,
    package: Option<String>,
    imports: Vec<String>,
    messages: Vec<RawMessage>,
    enums: Vec<(EnumDescriptor, usize)>,
}

#[derive(Debug)]
struct RawMessage {
    full_name: String,
    name: String,
    fields: Vec<RawField>,
    line: usize,
}

#[derive(Debug)]
struct RawField {
    name: String,
    number: u32,
    label: Label,
    type_name: String,
    packed: Option<bool>,
    line: usize,
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    file: RawFile,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    /// Line of the current token, or of the last token at end of input.
    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |s| s.line)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_sym(&mut self, sym: char) -> bool {
        if self.peek() == Some(&Token::Sym(sym)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_sym(&mut self, sym: char) -> Result<(), SchemaError> {
        if self.eat_sym(sym) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{sym}`")))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, SchemaError> {
        match self.peek() {
            Some(Token::Ident(word)) => {
                let word = word.clone();
                self.pos += 1;
                Ok(word)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn expect_str(&mut self, what: &str) -> Result<String, SchemaError> {
        match self.peek() {
            Some(Token::Str(value)) => {
                let value = value.clone();
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn expect_integer(&mut self, what: &str) -> Result<i64, SchemaError> {
        let line = self.line();
        match self.advance() {
            Some(Token::Number(literal)) => {
                parse_integer(&literal).ok_or_else(|| parse_error(line, format!("invalid integer `{literal}`")))
            }
            _ => Err(parse_error(line, format!("expected {what}"))),
        }
    }

    fn unexpected(&self, expected: &str) -> SchemaError {
        let found = match self.peek() {
            Some(Token::Ident(w)) => format!("`{w}`"),
            Some(Token::Number(n)) => format!("`{n}`"),
            Some(Token::Str(s)) => format!("\"{s}\""),
            Some(Token::Sym(c)) => format!("`{c}`"),
            None => "end of input".to_owned(),
        };
        parse_error(self.line(), format!("expected {expected}, found {found}"))
    }

    /// Skip tokens through the next `;` that is not nested in brackets.
    fn skip_statement(&mut self) -> Result<(), SchemaError> {
        let start = self.line();
        let mut depth = 0_usize;
        while let Some(token) = self.advance() {
            match token {
                Token::Sym('{' | '[' | '(') => depth += 1,
                Token::Sym('}' | ']' | ')') => depth = depth.saturating_sub(1),
                Token::Sym(';') if depth == 0 => return Ok(()),
                _ => {}
            }
        }
        Err(parse_error(start, "unterminated statement"))
    }

    /// Skip a `{ ... }` block, including the braces.
    fn skip_block(&mut self) -> Result<(), SchemaError> {
        let start = self.line();
        while !self.eat_sym('{') {
            if self.advance().is_none() {
                return Err(parse_error(start, "expected `{`"));
            }
        }
        let mut depth = 1_usize;
        while depth > 0 {
            match self.advance() {
                Some(Token::Sym('{')) => depth += 1,
                Some(Token::Sym('}')) => depth -= 1,
                Some(_) => {}
                None => return Err(parse_error(start, "unterminated block")),
            }
        }
        Ok(())
    }

    fn parse_file(&mut self) -> Result<(), SchemaError> {
        while let Some(token) = self.peek().cloned() {
            match token {
                Token::Sym(';') => self.pos += 1,
                Token::Ident(word) => match word.as_str() {
                    "syntax" | "edition" => {
                        let line = self.line();
                        self.pos += 1;
                        self.expect_sym('=')?;
                        let value = self.expect_str("syntax string")?;
                        if value != "proto2" && value != "proto3" {
                            return Err(parse_error(line, format!("unsupported syntax \"{value}\"")));
                        }
                        self.expect_sym(';')?;
                        self.file.syntax = Some(value);
                    }
                    "package" => {
                        self.pos += 1;
                        let name = self.expect_ident("package name")?;
                        self.expect_sym(';')?;
                        self.file.package = Some(name);
                    }
                    "import" => {
                        self.pos += 1;
                        if matches!(self.peek(), Some(Token::Ident(w)) if w == "public" || w == "weak") {
                            self.pos += 1;
                        }
                        let path = self.expect_str("import path")?;
                        self.expect_sym(';')?;
                        self.file.imports.push(path);
                    }
                    "option" => self.skip_statement()?,
                    "message" => {
                        self.pos += 1;
                        let scope = self.file.package.clone().unwrap_or_default();
                        self.parse_message(&scope)?;
                    }
                    "enum" => {
                        self.pos += 1;
                        let scope = self.file.package.clone().unwrap_or_default();
                        self.parse_enum(&scope)?;
                    }
                    "service" | "extend" => self.skip_block()?,
                    _ => return Err(self.unexpected("top-level declaration")),
                },
                _ => return Err(self.unexpected("top-level declaration")),
            }
        }
        Ok(())
    }

    fn parse_message(&mut self, scope: &str) -> Result<(), SchemaError> {
        let line = self.line();
        let name = self.expect_ident("message name")?;
        let full_name = qualify(scope, &name);
        self.expect_sym('{')?;

        let mut fields = Vec::new();
        loop {
            let Some(token) = self.peek().cloned() else {
                return Err(parse_error(line, format!("unterminated message `{name}`")));
            };
            match token {
                Token::Sym('}') => {
                    self.pos += 1;
                    break;
                }
                Token::Sym(';') => self.pos += 1,
                Token::Ident(word) => match word.as_str() {
                    "message" => {
                        self.pos += 1;
                        self.parse_message(&full_name)?;
                    }
                    "enum" => {
                        self.pos += 1;
                        self.parse_enum(&full_name)?;
                    }
                    "option" | "reserved" | "extensions" => self.skip_statement()?,
                    "extend" => self.skip_block()?,
                    "oneof" => {
                        self.pos += 1;
                        self.parse_oneof(&mut fields)?;
                    }
                    "map" if self.peek_at(1) == Some(&Token::Sym('<')) => {
                        return Err(parse_error(self.line(), "map fields are not supported"));
                    }
                    "group" => return Err(parse_error(self.line(), "groups are not supported")),
                    _ => fields.push(self.parse_field(true)?),
                },
                _ => return Err(self.unexpected("field declaration")),
            }
        }

        self.file.messages.push(RawMessage { full_name, name, fields, line });
        Ok(())
    }

    fn parse_oneof(&mut self, fields: &mut Vec<RawField>) -> Result<(), SchemaError> {
        let line = self.line();
        self.expect_ident("oneof name")?;
        self.expect_sym('{')?;
        loop {
            match self.peek() {
                Some(Token::Sym('}')) => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(Token::Sym(';')) => self.pos += 1,
                Some(Token::Ident(w)) if w == "option" => self.skip_statement()?,
                Some(_) => {
                    let mut field = self.parse_field(false)?;
                    // Oneof members have explicit presence.
                    field.label = Label::Optional;
                    fields.push(field);
                }
                None => return Err(parse_error(line, "unterminated oneof")),
            }
        }
    }

    fn parse_field(&mut self, allow_label: bool) -> Result<RawField, SchemaError> {
        let line = self.line();
        let mut label = Label::Singular;
        if allow_label {
            if let Some(Token::Ident(word)) = self.peek() {
                let parsed = match word.as_str() {
                    "repeated" => Some(Label::Repeated),
                    "optional" => Some(Label::Optional),
                    "required" => Some(Label::Required),
                    _ => None,
                };
                if let Some(parsed) = parsed {
                    label = parsed;
                    self.pos += 1;
                }
            }
        }

        let type_name = self.expect_ident("field type")?;
        if type_name == "map" && self.peek() == Some(&Token::Sym('<')) {
            return Err(parse_error(line, "map fields are not supported"));
        }
        let name = self.expect_ident("field name")?;
        self.expect_sym('=')?;
        let number = self.expect_integer("field number")?;
        if !(1..=MAX_FIELD_NUMBER).contains(&number) {
            return Err(parse_error(line, format!("field number {number} out of range for `{name}`")));
        }
        let packed = if self.peek() == Some(&Token::Sym('[')) {
            self.parse_field_options()?
        } else {
            None
        };
        self.expect_sym(';')?;

        Ok(RawField {
            name,
            number: u32::try_from(number).map_err(|_| parse_error(line, "field number out of range"))?,
            label,
            type_name,
            packed,
            line,
        })
    }

    /// Read a `[ ... ]` option list and return the `packed` option if present.
    fn parse_field_options(&mut self) -> Result<Option<bool>, SchemaError> {
        let line = self.line();
        self.expect_sym('[')?;
        let mut packed = None;
        let mut depth = 1_usize;
        while depth > 0 {
            let Some(token) = self.advance() else {
                return Err(parse_error(line, "unterminated field options"));
            };
            match token {
                Token::Sym('[') => depth += 1,
                Token::Sym(']') => depth -= 1,
                Token::Ident(word) if word == "packed" && depth == 1 => {
                    if self.eat_sym('=') {
                        packed = match self.advance() {
                            Some(Token::Ident(v)) if v == "true" => Some(true),
                            Some(Token::Ident(v)) if v == "false" => Some(false),
                            _ => return Err(parse_error(line, "`packed` expects true or false")),
                        };
                    }
                }
                _ => {}
            }
        }
        Ok(packed)
    }

    fn parse_enum(&mut self, scope: &str) -> Result<(), SchemaError> {
        let line = self.line();
        let name = self.expect_ident("enum name")?;
        let full_name = qualify(scope, &name);
        self.expect_sym('{')?;

        let mut values = Vec::new();
        loop {
            match self.peek().cloned() {
                Some(Token::Sym('}')) => {
                    self.pos += 1;
                    break;
                }
                Some(Token::Sym(';')) => self.pos += 1,
                Some(Token::Ident(word)) if word == "option" || word == "reserved" => self.skip_statement()?,
                Some(Token::Ident(value_name)) => {
                    let value_line = self.line();
                    self.pos += 1;
                    self.expect_sym('=')?;
                    let number = self.expect_integer("enum value")?;
                    let number = i32::try_from(number)
                        .map_err(|_| parse_error(value_line, format!("enum value {number} out of range")))?;
                    if self.peek() == Some(&Token::Sym('[')) {
                        self.parse_field_options()?;
                    }
                    self.expect_sym(';')?;
                    values.push(EnumValue { name: value_name, number });
                }
                Some(_) => return Err(self.unexpected("enum value")),
                None => return Err(parse_error(line, format!("unterminated enum `{name}`"))),
            }
        }

        self.file.enums.push((EnumDescriptor { full_name, name, values }, line));
        Ok(())
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

fn resolve(file: RawFile) -> Result<Schema, SchemaError> {
    let syntax = match file.syntax.as_deref() {
        Some("proto3") => Syntax::Proto3,
        _ => Syntax::Proto2,
    };

    let mut declared = HashSet::new();
    for message in &file.messages {
        if !declared.insert(message.full_name.clone()) {
            return Err(parse_error(message.line, format!("duplicate type `{}`", message.full_name)));
        }
    }
    for (e, line) in &file.enums {
        if !declared.insert(e.full_name.clone()) {
            return Err(parse_error(*line, format!("duplicate type `{}`", e.full_name)));
        }
    }

    let enum_names: HashSet<&str> = file.enums.iter().map(|(e, _)| e.full_name.as_str()).collect();
    let message_names: HashSet<&str> = file.messages.iter().map(|m| m.full_name.as_str()).collect();

    let mut messages = BTreeMap::new();
    for raw in &file.messages {
        let mut numbers = HashSet::new();
        let mut fields = Vec::with_capacity(raw.fields.len());
        for field in &raw.fields {
            if !numbers.insert(field.number) {
                return Err(parse_error(
                    field.line,
                    format!("duplicate field number {} in `{}`", field.number, raw.full_name),
                ));
            }
            let kind = if let Some(scalar) = ScalarType::from_keyword(&field.type_name) {
                FieldKind::Scalar(scalar)
            } else {
                let resolved = resolve_type_name(&raw.full_name, &field.type_name, |candidate| {
                    message_names.contains(candidate) || enum_names.contains(candidate)
                })
                .ok_or_else(|| SchemaError::UnresolvedType {
                    line: field.line,
                    field: field.name.clone(),
                    type_name: field.type_name.clone(),
                })?;
                if enum_names.contains(resolved.as_str()) {
                    FieldKind::Enum(resolved)
                } else {
                    FieldKind::Message(resolved)
                }
            };
            fields.push(FieldDescriptor {
                name: field.name.clone(),
                number: field.number,
                label: field.label,
                kind,
                packed: field.packed,
            });
        }
        messages.insert(
            raw.full_name.clone(),
            Arc::new(MessageDescriptor { full_name: raw.full_name.clone(), name: raw.name.clone(), fields }),
        );
    }

    let enums = file.enums.into_iter().map(|(e, _)| (e.full_name.clone(), e)).collect();

    Ok(Schema { syntax, package: file.package, imports: file.imports, messages, enums })
}

/// Resolve a type reference the way protoc does: innermost scope first,
/// walking outward to the root. A leading `.` means fully qualified.
fn resolve_type_name(scope: &str, name: &str, exists: impl Fn(&str) -> bool) -> Option<String> {
    if let Some(absolute) = name.strip_prefix('.') {
        return exists(absolute).then(|| absolute.to_owned());
    }

    let mut current = scope;
    loop {
        let candidate = qualify(current, name);
        if exists(&candidate) {
            return Some(candidate);
        }
        if current.is_empty() {
            return None;
        }
        current = current.rsplit_once('.').map_or("", |(parent, _)| parent);
    }
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() { name.to_owned() } else { format!("{scope}.{name}") }
}

fn parse_integer(literal: &str) -> Option<i64> {
    let (negative, digits) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -value } else { value })
}

fn parse_error(line: usize, message: impl Into<String>) -> SchemaError {
    SchemaError::Parse { line, message: message.into() }
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
