//! Test selection filters.
//!
//! ```text
//! filter    := and ('|' and)*
//! and       := unary ('&' unary)*
//! unary     := '!' unary | '(' filter ')' | condition
//! condition := field op value | value
//! op        := '=' | '!=' | '~' | '!~'
//! ```
//!
//! `field` is `FullyQualifiedName`, `Name`, `TestCategory` (or `Category`);
//! any other word names a property, so `Priority = High` tests the
//! `Priority` property. `~` means "contains". A bare value selects tests
//! whose full name contains it. Values may carry balanced parentheses, so
//! `Name=TestCaseSucceeds(2,2,4)` is one value.
//!
//! ```rust
//! use verdict::filter::Filter;
//! let filter: Filter = "TestCategory=Urgent & !(Name~Slow | Priority=Low)".parse().unwrap();
//! assert_eq!(
//!     filter.to_string(),
//!     "(TestCategory=Urgent & !(Name~Slow | Priority=Low))"
//! );
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use miette::NamedSource;

use crate::descriptor::TestDescriptor;
use crate::errors::FilterError;

// ============================================================================
// FILTER TREE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    FullyQualifiedName,
    Name,
    Category,
    Property(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Equals,
    NotEquals,
    Contains,
    NotContains,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Condition { field: Field, op: Op, value: String },
    Not(Box<Filter>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Field {
    fn from_word(word: &str) -> Self {
        match word {
            "FullyQualifiedName" => Field::FullyQualifiedName,
            "Name" => Field::Name,
            "TestCategory" | "Category" => Field::Category,
            other => Field::Property(other.to_string()),
        }
    }
}

impl Filter {
    /// Parses a filter expression.
    pub fn parse(input: &str) -> Result<Filter, FilterError> {
        if input.trim().is_empty() {
            return Err(FilterError::Empty);
        }
        let mut parser = Parser::new(input);
        let filter = parser.parse_or()?;
        let trailing = parser.next();
        if trailing.kind != TokenKind::Eof {
            return Err(parser.unexpected(&trailing, "end of filter"));
        }
        Ok(filter)
    }

    /// Evaluates the filter against one test.
    pub fn matches(&self, test: &TestDescriptor) -> bool {
        match self {
            Filter::Condition { field, op, value } => {
                let candidates: Vec<&str> = match field {
                    Field::FullyQualifiedName => vec![test.full_name.as_str()],
                    Field::Name => vec![test.name.as_str()],
                    Field::Category => test.categories.iter().map(String::as_str).collect(),
                    Field::Property(key) => {
                        test.properties.get(key).iter().map(String::as_str).collect()
                    }
                };
                let equals = || candidates.iter().any(|c| *c == value);
                let contains = || candidates.iter().any(|c| c.contains(value.as_str()));
                match op {
                    Op::Equals => equals(),
                    Op::NotEquals => !equals(),
                    Op::Contains => contains(),
                    Op::NotContains => !contains(),
                }
            }
            Filter::Not(inner) => !inner.matches(test),
            Filter::And(all) => all.iter().all(|f| f.matches(test)),
            Filter::Or(any) => any.iter().any(|f| f.matches(test)),
        }
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::parse(s)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::FullyQualifiedName => f.write_str("FullyQualifiedName"),
            Field::Name => f.write_str("Name"),
            Field::Category => f.write_str("TestCategory"),
            Field::Property(key) => f.write_str(key),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Op::Equals => "=",
            Op::NotEquals => "!=",
            Op::Contains => "~",
            Op::NotContains => "!~",
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, parts: &[Filter], sep: &str| {
            write!(f, "(")?;
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, " {sep} ")?;
                }
                write!(f, "{part}")?;
            }
            write!(f, ")")
        };
        match self {
            Filter::Condition { field, op, value } => write!(f, "{field}{op}{value}"),
            Filter::Not(inner) => match inner.as_ref() {
                Filter::Condition { .. } => write!(f, "!({inner})"),
                _ => write!(f, "!{inner}"),
            },
            Filter::And(parts) => join(f, parts, "&"),
            Filter::Or(parts) => join(f, parts, "|"),
        }
    }
}

// ============================================================================
// TOKENIZER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Word,
    Symbol,
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    text: String,
    pos: usize,
}

impl Token {
    fn is_symbol(&self, symbol: &str) -> bool {
        self.kind == TokenKind::Symbol && self.text == symbol
    }

    fn len(&self) -> usize {
        self.text.len().max(1)
    }

    fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of filter".to_string(),
            _ => format!("'{}'", self.text),
        }
    }
}

const WORD_BREAK: &str = "=~!()&|";

struct Tokenizer<'a> {
    input: &'a str,
    index: usize,
}

impl<'a> Tokenizer<'a> {
    fn peek_char(&self) -> Option<char> {
        self.input[self.index..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.index += c.len_utf8();
        Some(c)
    }

    fn is_word_char(c: char) -> bool {
        !c.is_whitespace() && !WORD_BREAK.contains(c)
    }

    fn next_token(&mut self) -> Token {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.bump();
        }
        let pos = self.index;
        let symbol = |text: &str| Token {
            kind: TokenKind::Symbol,
            text: text.to_string(),
            pos,
        };
        match self.peek_char() {
            None => Token {
                kind: TokenKind::Eof,
                text: String::new(),
                pos,
            },
            Some(c @ ('(' | ')' | '~' | '&' | '|' | '=')) => {
                self.bump();
                symbol(&c.to_string())
            }
            Some('!') => {
                self.bump();
                match self.peek_char() {
                    Some(next @ ('=' | '~')) => {
                        self.bump();
                        symbol(&format!("!{next}"))
                    }
                    _ => symbol("!"),
                }
            }
            Some(_) => self.word(pos),
        }
    }

    /// A word, extended over balanced parentheses and the `.`/`+` separated
    /// segments that follow them, so `Fixture(1,2).Method("a)")` is one word.
    fn word(&mut self, pos: usize) -> Token {
        let mut text = String::new();
        self.collect_word_chars(&mut text);
        if self.peek_char() == Some('(') {
            self.collect_parenthesized(&mut text);
            while let Some(sep @ ('.' | '+')) = self.peek_char() {
                self.bump();
                text.push(sep);
                self.collect_word_chars(&mut text);
                if self.peek_char() == Some('(') {
                    self.collect_parenthesized(&mut text);
                }
            }
        }
        Token {
            kind: TokenKind::Word,
            text,
            pos,
        }
    }

    fn collect_word_chars(&mut self, text: &mut String) {
        while let Some(c) = self.peek_char().filter(|c| Self::is_word_char(*c)) {
            self.bump();
            text.push(c);
        }
    }

    fn collect_parenthesized(&mut self, text: &mut String) {
        let mut depth = 0usize;
        while let Some(c) = self.bump() {
            text.push(c);
            match c {
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                '"' => self.collect_quoted(text),
                _ => {}
            }
            if depth == 0 {
                break;
            }
        }
    }

    /// Copies a quoted string verbatim, escapes included, so the value
    /// compares equal to the rendered case name.
    fn collect_quoted(&mut self, text: &mut String) {
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    text.push(c);
                    if let Some(escaped) = self.bump() {
                        text.push(escaped);
                    }
                }
                '"' => break,
                other => text.push(other),
            }
        }
        text.push('"');
    }
}

// ============================================================================
// PARSER
// ============================================================================

struct Parser<'a> {
    tokens: Tokenizer<'a>,
    lookahead: Option<Token>,
    src: Arc<NamedSource<String>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            tokens: Tokenizer { input, index: 0 },
            lookahead: None,
            src: Arc::new(NamedSource::new("filter", input.to_string())),
        }
    }

    fn peek(&mut self) -> &Token {
        let tokens = &mut self.tokens;
        self.lookahead.get_or_insert_with(|| tokens.next_token())
    }

    fn next(&mut self) -> Token {
        match self.lookahead.take() {
            Some(token) => token,
            None => self.tokens.next_token(),
        }
    }

    fn unexpected(&self, token: &Token, expected: &str) -> FilterError {
        FilterError::UnexpectedToken {
            found: token.describe(),
            src: self.src.clone(),
            span: (token.pos, token.len()).into(),
            expected: expected.to_string(),
        }
    }

    fn parse_or(&mut self) -> Result<Filter, FilterError> {
        let mut parts = vec![self.parse_and()?];
        while self.peek().is_symbol("|") {
            self.next();
            parts.push(self.parse_and()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Filter::Or(parts)
        })
    }

    fn parse_and(&mut self) -> Result<Filter, FilterError> {
        let mut parts = vec![self.parse_unary()?];
        while self.peek().is_symbol("&") {
            self.next();
            parts.push(self.parse_unary()?);
        }
        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            Filter::And(parts)
        })
    }

    fn parse_unary(&mut self) -> Result<Filter, FilterError> {
        let token = self.next();
        if token.is_symbol("!") {
            return Ok(Filter::Not(Box::new(self.parse_unary()?)));
        }
        if token.is_symbol("(") {
            let inner = self.parse_or()?;
            let close = self.next();
            if !close.is_symbol(")") {
                return Err(if close.kind == TokenKind::Eof {
                    FilterError::Unbalanced {
                        src: self.src.clone(),
                        span: (token.pos, 1).into(),
                    }
                } else {
                    self.unexpected(&close, "')'")
                });
            }
            return Ok(inner);
        }
        if token.kind != TokenKind::Word {
            return Err(self.unexpected(&token, "a condition"));
        }
        self.parse_condition(token)
    }

    fn parse_condition(&mut self, word: Token) -> Result<Filter, FilterError> {
        let op = match self.peek() {
            t if t.is_symbol("=") => Op::Equals,
            t if t.is_symbol("!=") => Op::NotEquals,
            t if t.is_symbol("~") => Op::Contains,
            t if t.is_symbol("!~") => Op::NotContains,
            t if t.is_symbol("!") => {
                let bang = self.next();
                return Err(FilterError::UnknownOperator {
                    operator: bang.text,
                    src: self.src.clone(),
                    span: (bang.pos, 1).into(),
                });
            }
            _ => {
                return Ok(Filter::Condition {
                    field: Field::FullyQualifiedName,
                    op: Op::Contains,
                    value: word.text,
                })
            }
        };
        self.next();
        let value = self.next();
        if value.kind != TokenKind::Word {
            return Err(self.unexpected(&value, "a value"));
        }
        Ok(Filter::Condition {
            field: Field::from_word(&word.text),
            op,
            value: value.text,
        })
    }
}
