use super::*;

impl<'a> Parser<'a> {
    /* Expressions */
    /// Parses any expression. An elided expression is an error here, see [`Self::parse_nullable_expr`].
    pub fn parse_expr(&mut self) -> CompileResult<Expr> {
        if self.current.token == Token::Semi {
            return Err(self.unexpected("expression"));
        }
        self.parse_assign_expr()
    }

    /// Parses an expression, or produces [`Expr::Null`] if the current token terminates the statement.
    pub fn parse_nullable_expr(&mut self) -> CompileResult<Expr> {
        if self.current.token == Token::Semi {
            Ok(Expr::Null {
                pos: self.current.pos,
            })
        } else {
            self.parse_assign_expr()
        }
    }

    /// Assignment is right associative and only accepts a bare variable on its left.
    fn parse_assign_expr(&mut self) -> CompileResult<Expr> {
        let lhs = self.parse_ternary_expr()?;
        if self.current.token != Token::Equals {
            return Ok(lhs);
        }

        let pos = self.current.pos;
        self.next()?;
        match lhs {
            Expr::Var { ident, .. } => {
                let value = Box::new(self.nested(|this| this.parse_expr())?);
                Ok(Expr::Assign { pos, ident, value })
            }
            lhs => Err(CompileError::new(
                ErrorKind::InvalidAssignmentTarget(lhs.to_string()),
                pos,
            )),
        }
    }

    fn parse_ternary_expr(&mut self) -> CompileResult<Expr> {
        let condition = self.parse_expr_bp(0)?; // 0 to accept any binary expression
        if self.current.token != Token::Question {
            return Ok(condition);
        }

        let pos = self.current.pos;
        self.next()?;
        let then = self.nested(|this| this.parse_expr())?;
        self.expect(Token::Colon)?;
        let otherwise = self.nested(|this| this.parse_ternary_expr())?;
        Ok(Expr::Ternary {
            pos,
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    /// Parses a binary expression with the specified `min_bp`.
    fn parse_expr_bp(&mut self, min_bp: u8) -> CompileResult<Expr> {
        let mut lhs = self.parse_unary_expr()?;

        loop {
            let (l_bp, r_bp) = match self.current.token.binop_bp() {
                Some(bp) => bp,
                None => break, // not a valid binop, stop parsing
            };
            if l_bp < min_bp {
                break; // less than the min_bp, stop parsing
            }

            // self.current is a valid binop
            let pos = self.current.pos;
            let op = self.current.token;
            self.count_operator()?;
            self.next()?;

            let rhs = self.parse_expr_bp(r_bp)?;

            lhs = Expr::BinaryOp {
                pos,
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }
        }

        Ok(lhs)
    }

    /// Parses a prefix operator chain followed by a primary expression.
    fn parse_unary_expr(&mut self) -> CompileResult<Expr> {
        self.nested(|this| {
            if !this.current.token.is_unary_op() {
                return this.parse_primary_expr();
            }
            let pos = this.current.pos;
            let op = this.current.token;
            this.next()?;
            let arg = Box::new(this.parse_unary_expr()?);
            Ok(Expr::UnaryOp { pos, op, arg })
        })
    }

    /// Parses a primary (atom) expression.
    fn parse_primary_expr(&mut self) -> CompileResult<Expr> {
        match self.current.token {
            Token::IntLit => self.parse_int_lit_expr(),
            Token::Identifier => self.parse_identifier_or_call_expr(),
            Token::OpenParen => {
                self.next()?;
                let expr = self.parse_expr()?;
                self.expect(Token::CloseParen)?;
                Ok(expr)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /* Expressions.Literals */
    fn parse_int_lit_expr(&mut self) -> CompileResult<Expr> {
        let pos = self.current.pos;
        let text = self.current.text;
        let value = text.parse::<i32>().map_err(|_| {
            CompileError::new(ErrorKind::IntegerOverflow(text.to_string()), pos)
        })?;
        self.next()?;
        Ok(Expr::IntLit { pos, value })
    }

    /* Expressions.Identifier */
    /// Parses an identifier or a call expression.
    fn parse_identifier_or_call_expr(&mut self) -> CompileResult<Expr> {
        let pos = self.current.pos;
        let is_call = self.peek.token == Token::OpenParen;
        let ident = self.expect_ident()?;

        if !is_call {
            return Ok(Expr::Var { pos, ident });
        }

        self.expect(Token::OpenParen)?;
        let mut args = Vec::new();
        if !self.eat(Token::CloseParen)? {
            loop {
                args.push(self.parse_expr()?);

                if self.eat(Token::CloseParen)? {
                    break;
                }
                self.expect(Token::Comma)?;
            }
        }

        Ok(Expr::Call { pos, ident, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    fn expr(source: &str) -> String {
        let source = Source::new(source);
        Parser::new(&source).parse_expr().unwrap().to_string()
    }

    fn error(source: &str) -> ErrorKind {
        let source = Source::new(source);
        Parser::new(&source).parse_expr().unwrap_err().kind
    }

    #[test]
    fn test_literal() {
        assert_snapshot!(expr("1"), @"1");
        assert_snapshot!(expr("2147483647"), @"2147483647");
    }

    #[test]
    fn test_binary_expr() {
        assert_snapshot!(expr("1 + 1"), @"(+ 1 1)");
        assert_snapshot!(expr("1 == 2 - 1"), @"(== 1 (- 2 1))");
        assert_snapshot!(expr("2 * 2 * 2"), @"(* (* 2 2) 2)"); // should be (2 * 2) * 2
        assert_snapshot!(expr("1 - 2 - 3"), @"(- (- 1 2) 3)");
        assert_snapshot!(expr("(1 + 2) % 3"), @"(% (+ 1 2) 3)");
    }

    #[test]
    fn test_precedence() {
        assert_snapshot!(expr("2 + 3 * 4"), @"(+ 2 (* 3 4))");
        assert_snapshot!(expr("1 || 0 && 2"), @"(|| 1 (&& 0 2))");
        assert_snapshot!(expr("a < b == c > d"), @"(== (< a b) (> c d))");
        assert_snapshot!(expr("a + 1 <= b / 2 != 0 || c"), @"(|| (!= (<= (+ a 1) (/ b 2)) 0) c)");
    }

    #[test]
    fn test_unary_expr() {
        assert_snapshot!(expr("-a * !b"), @"(* (- a) (! b))");
        assert_snapshot!(expr("~-1"), @"(~ (- 1))");
        assert_snapshot!(expr("!(a == b)"), @"(! (== a b))");
    }

    #[test]
    fn test_assignment() {
        assert_snapshot!(expr("a = b = c"), @"(= a (= b c))"); // should be a = (b = c)
        assert_snapshot!(expr("a = b ? c : d"), @"(= a (? b c d))");
        assert_eq!(
            error("1 + 1 = 2"),
            ErrorKind::InvalidAssignmentTarget("(+ 1 1)".to_string())
        );
        assert_eq!(
            error("f() = 2"),
            ErrorKind::InvalidAssignmentTarget("(call f)".to_string())
        );
    }

    #[test]
    fn test_ternary() {
        assert_snapshot!(expr("a ? b : c ? d : e"), @"(? a b (? c d e))");
        assert_snapshot!(expr("a ? b = 1 : c"), @"(? a (= b 1) c)");
        assert_snapshot!(expr("a || b ? c + 1 : d"), @"(? (|| a b) (+ c 1) d)");
    }

    #[test]
    fn test_identifier() {
        assert_snapshot!(expr("foo"), @"foo");
    }

    #[test]
    fn test_fn_call() {
        assert_snapshot!(expr("foo()"), @"(call foo)");
        assert_snapshot!(expr("foo(1, bar)"), @"(call foo 1 bar)");
        assert_snapshot!(expr("foo(1, bar, baz())"), @"(call foo 1 bar (call baz))");
        assert_snapshot!(expr("foo(a = 1, b + 2)"), @"(call foo (= a 1) (+ b 2))");
    }

    #[test]
    fn test_invalid_expr() {
        assert_eq!(
            error(")"),
            ErrorKind::UnexpectedToken {
                found: "CloseParen(\")\")".to_string(),
                expected: "expression".to_string(),
            }
        );
        assert_eq!(
            error("foo(1 2)"),
            ErrorKind::UnexpectedToken {
                found: "IntLit(\"2\")".to_string(),
                expected: "Comma".to_string(),
            }
        );
        assert_eq!(
            error("a ? b"),
            ErrorKind::UnexpectedToken {
                found: "EOF".to_string(),
                expected: "Colon".to_string(),
            }
        );
    }
}
