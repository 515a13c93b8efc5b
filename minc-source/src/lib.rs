//! Source code representation and error management.

use std::fmt;
use thiserror::Error;

/// Represents source code.
#[derive(Debug, Clone, Copy)]
pub struct Source<'a> {
    /// Original source code.
    pub content: &'a str,
}

impl<'a> Source<'a> {
    /// Create a new `Source` with the specified `content`.
    pub fn new(content: &'a str) -> Self {
        Self { content }
    }

    /// Returns the text of the 1-based `line`, without its line terminator.
    pub fn line_text(&self, line: usize) -> Option<&'a str> {
        self.content
            .split('\n')
            .nth(line.checked_sub(1)?)
            .map(|text| text.trim_end_matches('\r'))
    }

    /// Renders the source around `pos`: a `line:column` header, the offending line and a caret
    /// under the offending column.
    pub fn context(&self, pos: Position) -> String {
        let line_count = self.content.split('\n').count();
        let text = match self.line_text(pos.line) {
            Some(text) => text,
            None => return format!("want {}, but only have {} lines", pos, line_count),
        };
        let gutter = pos.line.to_string();
        // keep tabs so the caret lines up with the offending column
        let width = pos.column.saturating_sub(1);
        let mut caret: String = text
            .chars()
            .take(width)
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        let padded = caret.chars().count();
        caret.push_str(&" ".repeat(width - padded));
        format!(
            "{pad} --> {pos}\n{gutter} | {text}\n{pad} | {caret}^",
            pad = " ".repeat(gutter.len()),
            pos = pos,
            gutter = gutter,
            text = text,
            caret = caret,
        )
    }

    /// Wraps `error` with the rendered context of its position.
    pub fn diagnose(&self, error: CompileError) -> Diagnostic {
        Diagnostic {
            context: self.context(error.pos),
            error,
        }
    }
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(content: &'a str) -> Self {
        Source::new(content)
    }
}

/// Location of the first character of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
    /// Byte offset into the source.
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1, 0)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Every way a compilation can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("illegal character '{0}'")]
    IllegalCharacter(String),
    #[error("invalid token: {found}, expecting {expected}")]
    UnexpectedToken { found: String, expected: String },
    #[error("integer literal {0} is out of range")]
    IntegerOverflow(String),
    #[error("nesting is deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("more than {0} binary operators in one statement")]
    TooManyOperators(usize),
    #[error("undefined: {0}")]
    UndefinedName(String),
    #[error("{0} used before its declaration")]
    UseBeforeDeclaration(String),
    #[error("{0} already declared")]
    DuplicateDeclaration(String),
    #[error("cannot assign to {0}")]
    InvalidAssignmentTarget(String),
    #[error("{0} not inside loop")]
    OutsideLoop(&'static str),
    #[error("{name} declared with {expected} parameters, but got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("function {0} already defined")]
    DuplicateFunctionDefinition(String),
    #[error("function {0} already has a prototype")]
    DuplicateFunctionPrototype(String),
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("invalid operator: {0}")]
    InvalidOperator(String),
}

/// A compile time error anchored at a source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{pos}: {kind}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub pos: Position,
}

impl CompileError {
    /// Create a new error with the specified `kind` at `pos`.
    pub fn new(kind: ErrorKind, pos: Position) -> Self {
        Self { kind, pos }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// The first error of a compilation, together with the rendered source around it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}:\n{context}")]
pub struct Diagnostic {
    pub error: CompileError,
    pub context: String,
}

impl Diagnostic {
    pub fn kind(&self) -> &ErrorKind {
        &self.error.kind
    }
}
