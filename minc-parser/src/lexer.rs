use logos::Logos;
use minc_source::Position;

#[derive(Debug, Logos, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    // literals
    #[regex("[0-9]+")]
    IntLit,

    // identifiers
    #[regex("[a-zA-Z_][a-zA-Z0-9_]*")]
    Identifier,

    // unary operators
    #[token("!")]
    LogicalNot,
    #[token("~")]
    Tilde,

    // binary operators
    // - arithmetics
    #[token("+")]
    Plus,
    #[token("-")]
    Minus, // NOTE: can also be unary
    #[token("*")]
    Asterisk,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    // - assignment
    #[token("=")]
    Equals,
    // - equality
    #[token("==")]
    EqualsEquals,
    #[token("!=")]
    NotEquals,
    // - ordering
    #[token(">")]
    GreaterThan,
    #[token(">=")]
    GreaterThanEquals,
    #[token("<")]
    LessThan,
    #[token("<=")]
    LessThanEquals,
    // - logical
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    // - ternary
    #[token("?")]
    Question,
    #[token(":")]
    Colon,

    // punctuation
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,

    // keywords
    #[token("int")]
    Int,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("for")]
    For,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,

    // misc
    #[regex(r"[ \t\n\r\f]+", logos::skip)]
    #[regex(r"//[^\n]*", logos::skip)] // single line comments
    #[error]
    Error,

    /// Only generated by [`Tokenizer`] once the underlying lexer is exhausted.
    Eof,
}

impl Token {
    /// Returns the binary binding power or `None` if invalid binop token.
    /// Binding power `0` and `1` is reserved for accepting any expression.
    /// Assignment and the ternary operator are not part of this table, they are parsed above it.
    pub fn binop_bp(&self) -> Option<(u8, u8)> {
        match self {
            /* Logical */
            Token::OrOr => Some((2, 3)),
            Token::AndAnd => Some((4, 5)),
            /* Equality */
            Token::EqualsEquals | Token::NotEquals => Some((6, 7)),
            /* Relational */
            Token::GreaterThan
            | Token::GreaterThanEquals
            | Token::LessThan
            | Token::LessThanEquals => Some((8, 9)),
            /* Additive */
            Token::Plus | Token::Minus => Some((10, 11)),
            /* Multiplicative */
            Token::Asterisk | Token::Slash | Token::Percent => Some((12, 13)),
            _ => None,
        }
    }

    /// Returns `true` if the token is a prefix operator.
    pub fn is_unary_op(&self) -> bool {
        matches!(self, Token::Minus | Token::Tilde | Token::LogicalNot)
    }

    /// The source spelling of punctuation and keywords, or the kind name for tokens with
    /// variable text.
    pub fn symbol(&self) -> &'static str {
        match self {
            Token::IntLit => "integer literal",
            Token::Identifier => "identifier",
            Token::LogicalNot => "!",
            Token::Tilde => "~",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Asterisk => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::Equals => "=",
            Token::EqualsEquals => "==",
            Token::NotEquals => "!=",
            Token::GreaterThan => ">",
            Token::GreaterThanEquals => ">=",
            Token::LessThan => "<",
            Token::LessThanEquals => "<=",
            Token::AndAnd => "&&",
            Token::OrOr => "||",
            Token::Question => "?",
            Token::Colon => ":",
            Token::OpenParen => "(",
            Token::CloseParen => ")",
            Token::OpenBrace => "{",
            Token::CloseBrace => "}",
            Token::Comma => ",",
            Token::Semi => ";",
            Token::Int => "int",
            Token::Return => "return",
            Token::If => "if",
            Token::Else => "else",
            Token::While => "while",
            Token::Do => "do",
            Token::For => "for",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Error => "illegal character",
            Token::Eof => "end of input",
        }
    }
}

/// A token together with its source text and the position of its first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'a> {
    pub token: Token,
    pub text: &'a str,
    pub pos: Position,
}

impl<'a> Lexeme<'a> {
    /// Human-friendly description used in diagnostics, e.g. `Identifier("foo")`.
    pub fn describe(&self) -> String {
        match self.token {
            Token::Eof => "EOF".to_string(),
            token => format!("{:?}(\"{}\")", token, self.text),
        }
    }
}

/// Produces [`Lexeme`]s on demand, tracking line and column information.
pub struct Tokenizer<'a> {
    lexer: logos::Lexer<'a, Token>,
    source: &'a str,
    /// Bytes before this offset have already been scanned for line breaks.
    scanned: usize,
    line: usize,
    line_start: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: Token::lexer(source),
            source,
            scanned: 0,
            line: 1,
            line_start: 0,
        }
    }

    /// Returns the next lexeme. Keeps returning [`Token::Eof`] once the input is exhausted.
    pub fn next_lexeme(&mut self) -> Lexeme<'a> {
        match self.lexer.next() {
            Some(token) => {
                let span = self.lexer.span();
                Lexeme {
                    token,
                    text: self.lexer.slice(),
                    pos: self.position_of(span.start),
                }
            }
            None => Lexeme {
                token: Token::Eof,
                text: "",
                pos: self.position_of(self.source.len()),
            },
        }
    }

    fn position_of(&mut self, offset: usize) -> Position {
        let bytes = self.source.as_bytes();
        while self.scanned < offset {
            if bytes[self.scanned] == b'\n' {
                self.line += 1;
                self.line_start = self.scanned + 1;
            }
            self.scanned += 1;
        }
        let column = self.source[self.line_start..offset].chars().count() + 1;
        Position::new(self.line, column, offset)
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Lexeme<'a>;

    /// Yields every lexeme up to, but not including, [`Token::Eof`].
    fn next(&mut self) -> Option<Self::Item> {
        let lexeme = self.next_lexeme();
        if lexeme.token == Token::Eof {
            None
        } else {
            Some(lexeme)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        Tokenizer::new(source).map(|lexeme| lexeme.token).collect()
    }

    #[test]
    fn test_return_2() {
        assert_eq!(
            tokens("int main() {\n    return 2;\n}"),
            vec![
                Token::Int,
                Token::Identifier,
                Token::OpenParen,
                Token::CloseParen,
                Token::OpenBrace,
                Token::Return,
                Token::IntLit,
                Token::Semi,
                Token::CloseBrace,
            ]
        );
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            tokens("a&&b||c==d!=e<=f>=g<h>i=j!k"),
            vec![
                Token::Identifier,
                Token::AndAnd,
                Token::Identifier,
                Token::OrOr,
                Token::Identifier,
                Token::EqualsEquals,
                Token::Identifier,
                Token::NotEquals,
                Token::Identifier,
                Token::LessThanEquals,
                Token::Identifier,
                Token::GreaterThanEquals,
                Token::Identifier,
                Token::LessThan,
                Token::Identifier,
                Token::GreaterThan,
                Token::Identifier,
                Token::Equals,
                Token::Identifier,
                Token::LogicalNot,
                Token::Identifier,
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            tokens("int integer return returns _do do9 for while else if"),
            vec![
                Token::Int,
                Token::Identifier,
                Token::Return,
                Token::Identifier,
                Token::Identifier,
                Token::Identifier,
                Token::For,
                Token::While,
                Token::Else,
                Token::If,
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            tokens("1 // a comment\n2"),
            vec![Token::IntLit, Token::IntLit]
        );
    }

    #[test]
    fn test_text_and_positions() {
        let mut tokenizer = Tokenizer::new("int x;\n  x = 100;");
        let expected = [
            (Token::Int, "int", Position::new(1, 1, 0)),
            (Token::Identifier, "x", Position::new(1, 5, 4)),
            (Token::Semi, ";", Position::new(1, 6, 5)),
            (Token::Identifier, "x", Position::new(2, 3, 9)),
            (Token::Equals, "=", Position::new(2, 5, 11)),
            (Token::IntLit, "100", Position::new(2, 7, 13)),
            (Token::Semi, ";", Position::new(2, 10, 16)),
            (Token::Eof, "", Position::new(2, 11, 17)),
        ];
        for (token, text, pos) in expected {
            let lexeme = tokenizer.next_lexeme();
            assert_eq!(lexeme, Lexeme { token, text, pos });
        }
        // stays at the end
        assert_eq!(tokenizer.next_lexeme().token, Token::Eof);
    }

    #[test]
    fn test_illegal_character() {
        let mut tokenizer = Tokenizer::new("1 $ 2");
        assert_eq!(tokenizer.next_lexeme().token, Token::IntLit);
        let illegal = tokenizer.next_lexeme();
        assert_eq!(illegal.token, Token::Error);
        assert_eq!(illegal.text, "$");
        assert_eq!(illegal.pos, Position::new(1, 3, 2));
        assert_eq!(tokenizer.next_lexeme().token, Token::IntLit);
    }

    #[test]
    fn test_binop_bp() {
        assert!(Token::Asterisk.binop_bp() > Token::Plus.binop_bp());
        assert!(Token::Plus.binop_bp() > Token::LessThan.binop_bp());
        assert!(Token::LessThan.binop_bp() > Token::EqualsEquals.binop_bp());
        assert!(Token::EqualsEquals.binop_bp() > Token::AndAnd.binop_bp());
        assert!(Token::AndAnd.binop_bp() > Token::OrOr.binop_bp());
        assert_eq!(Token::Equals.binop_bp(), None);
        assert_eq!(Token::Question.binop_bp(), None);
    }
}
