use crate::ast::{Block, Expr, FuncDec, Program, Stmt};
use crate::lexer::{Lexeme, Token, Tokenizer};
use minc_source::{CompileError, CompileResult, Diagnostic, ErrorKind, Source};

mod expr;
mod stmt;

/// Statements and prefix expressions nested deeper than this are rejected instead of recursing further.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Binary operators allowed in the expressions of a single statement. Operator chains build
/// left-deep trees, so this bounds their depth.
pub const MAX_STMT_OPERATORS: usize = 1024;

/// Parses `source` into a [`Program`]. The first error is wrapped with the rendered source around it.
pub fn parse(source: &Source<'_>) -> Result<Program, Diagnostic> {
    Parser::new(source)
        .parse_program()
        .map_err(|error| source.diagnose(error))
}

pub struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    /// Token being parsed.
    current: Lexeme<'a>,
    /// One token of lookahead beyond `current`.
    peek: Lexeme<'a>,
    /// Current statement/expression nesting.
    depth: usize,
    /// Binary operators parsed since the start of the current statement.
    operators: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &Source<'a>) -> Self {
        let mut tokenizer = Tokenizer::new(source.content);
        let current = tokenizer.next_lexeme();
        let peek = tokenizer.next_lexeme();
        Self {
            tokenizer,
            current,
            peek,
            depth: 0,
            operators: 0,
        }
    }
}

impl<'a> Parser<'a> {
    /// Parses zero or more function declarations followed by the end of input.
    pub fn parse_program(&mut self) -> CompileResult<Program> {
        self.check_illegal()?;
        let pos = self.current.pos;
        let mut functions = Vec::new();
        while self.current.token != Token::Eof {
            functions.push(self.parse_fn_declaration()?);
        }
        Ok(Program { pos, functions })
    }
}

/// Parse utilities
impl<'a> Parser<'a> {
    /// Shifts `peek` into `current` and pulls a fresh token.
    fn next(&mut self) -> CompileResult<()> {
        self.current = self.peek;
        self.peek = self.tokenizer.next_lexeme();
        self.check_illegal()
    }

    fn check_illegal(&self) -> CompileResult<()> {
        if self.current.token == Token::Error {
            Err(CompileError::new(
                ErrorKind::IllegalCharacter(self.current.text.to_string()),
                self.current.pos,
            ))
        } else {
            Ok(())
        }
    }

    /// Predicate that tests whether the current token is `tok` and eats it if yes as a side effect.
    fn eat(&mut self, tok: Token) -> CompileResult<bool> {
        if self.current.token == tok {
            self.next()?; // eat token
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, tok: Token) -> CompileResult<()> {
        if self.eat(tok)? {
            Ok(())
        } else {
            Err(self.unexpected(format!("{:?}", tok)))
        }
    }

    /// Eats an identifier and returns its text.
    fn expect_ident(&mut self) -> CompileResult<String> {
        if self.current.token == Token::Identifier {
            let ident = self.current.text.to_string();
            self.next()?;
            Ok(ident)
        } else {
            Err(self.unexpected("Identifier"))
        }
    }

    /// Creates an unexpected token error at the current token.
    fn unexpected(&self, expected: impl Into<String>) -> CompileError {
        CompileError::new(
            ErrorKind::UnexpectedToken {
                found: self.current.describe(),
                expected: expected.into(),
            },
            self.current.pos,
        )
    }

    /// Runs `f` one nesting level deeper, failing once [`MAX_NESTING_DEPTH`] is exceeded.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> CompileResult<T>) -> CompileResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CompileError::new(
                ErrorKind::NestingTooDeep(MAX_NESTING_DEPTH),
                self.current.pos,
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Counts one more binary operator against [`MAX_STMT_OPERATORS`].
    fn count_operator(&mut self) -> CompileResult<()> {
        if self.operators >= MAX_STMT_OPERATORS {
            return Err(CompileError::new(
                ErrorKind::TooManyOperators(MAX_STMT_OPERATORS),
                self.current.pos,
            ));
        }
        self.operators += 1;
        Ok(())
    }
}
