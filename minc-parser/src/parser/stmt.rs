use super::*;

impl<'a> Parser<'a> {
    /// Parses a function definition or prototype.
    pub fn parse_fn_declaration(&mut self) -> CompileResult<FuncDec> {
        let pos = self.current.pos;
        self.expect(Token::Int)?;
        let ident = self.expect_ident()?;

        self.expect(Token::OpenParen)?;
        let mut params = Vec::new();
        if !self.eat(Token::CloseParen)? {
            loop {
                self.expect(Token::Int)?;
                params.push(self.expect_ident()?);

                if self.eat(Token::CloseParen)? {
                    break;
                }
                self.expect(Token::Comma)?;
            }
        }

        let body = if self.current.token == Token::OpenBrace {
            Some(self.parse_block()?)
        } else {
            self.expect(Token::Semi)?;
            None
        };

        Ok(FuncDec {
            pos,
            ident,
            params,
            body,
        })
    }

    /// Parses a declaration (or statement).
    pub fn parse_declaration(&mut self) -> CompileResult<Stmt> {
        self.operators = 0;
        match self.current.token {
            Token::Int => self.parse_var_declaration(),
            _ => self.parse_stmt(),
        }
    }

    /// Parses a statement.
    pub fn parse_stmt(&mut self) -> CompileResult<Stmt> {
        self.operators = 0;
        self.nested(|this| match this.current.token {
            Token::OpenBrace => Ok(Stmt::Block(this.parse_block()?)),
            Token::If => this.parse_if_stmt(),
            Token::Return => this.parse_return_stmt(),
            Token::While => this.parse_while_stmt(),
            Token::Do => this.parse_do_stmt(),
            Token::For => this.parse_for_stmt(),
            Token::Break => {
                let pos = this.current.pos;
                this.next()?;
                this.expect(Token::Semi)?;
                Ok(Stmt::Break { pos })
            }
            Token::Continue => {
                let pos = this.current.pos;
                this.next()?;
                this.expect(Token::Semi)?;
                Ok(Stmt::Continue { pos })
            }
            _ => this.parse_expr_stmt(),
        })
    }

    pub fn parse_block(&mut self) -> CompileResult<Block> {
        let pos = self.current.pos;
        self.expect(Token::OpenBrace)?;

        let mut stmts = Vec::new();
        while !matches!(self.current.token, Token::CloseBrace | Token::Eof) {
            stmts.push(self.parse_declaration()?);
        }
        self.expect(Token::CloseBrace)?;

        Ok(Block { pos, stmts })
    }

    fn parse_var_declaration(&mut self) -> CompileResult<Stmt> {
        let pos = self.current.pos;
        self.expect(Token::Int)?;
        let ident = self.expect_ident()?;
        let initializer = if self.eat(Token::Equals)? {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(Token::Semi)?;
        Ok(Stmt::VarDec {
            pos,
            ident,
            initializer,
        })
    }

    /// An expression statement. The expression may be elided (`;`).
    fn parse_expr_stmt(&mut self) -> CompileResult<Stmt> {
        let pos = self.current.pos;
        let expr = self.parse_nullable_expr()?;
        self.expect(Token::Semi)?;
        Ok(Stmt::ExprStmt { pos, expr })
    }

    fn parse_if_stmt(&mut self) -> CompileResult<Stmt> {
        let pos = self.current.pos;
        self.expect(Token::If)?;
        self.expect(Token::OpenParen)?;
        let condition = self.parse_expr()?;
        self.expect(Token::CloseParen)?;
        let then = Box::new(self.parse_stmt()?);
        let otherwise = if self.eat(Token::Else)? {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };
        Ok(Stmt::If {
            pos,
            condition,
            then,
            otherwise,
        })
    }

    fn parse_while_stmt(&mut self) -> CompileResult<Stmt> {
        let pos = self.current.pos;
        self.expect(Token::While)?;
        self.expect(Token::OpenParen)?;
        let condition = self.parse_expr()?;
        self.expect(Token::CloseParen)?;
        let body = Box::new(self.parse_stmt()?);
        Ok(Stmt::While {
            pos,
            condition,
            body,
        })
    }

    fn parse_do_stmt(&mut self) -> CompileResult<Stmt> {
        let pos = self.current.pos;
        self.expect(Token::Do)?;
        let body = Box::new(self.parse_stmt()?);
        self.expect(Token::While)?;
        self.expect(Token::OpenParen)?;
        let condition = self.parse_expr()?;
        self.expect(Token::CloseParen)?;
        self.expect(Token::Semi)?;
        Ok(Stmt::Do {
            pos,
            body,
            condition,
        })
    }

    fn parse_for_stmt(&mut self) -> CompileResult<Stmt> {
        let pos = self.current.pos;
        self.expect(Token::For)?;
        self.expect(Token::OpenParen)?;

        // both forms consume the first `;`
        let setup = Box::new(match self.current.token {
            Token::Int => self.parse_var_declaration()?,
            _ => self.parse_expr_stmt()?,
        });
        let condition = self.parse_nullable_expr()?;
        self.expect(Token::Semi)?;
        let increment = if self.current.token == Token::CloseParen {
            Expr::Null {
                pos: self.current.pos,
            }
        } else {
            self.parse_expr()?
        };
        self.expect(Token::CloseParen)?;
        let body = Box::new(self.parse_stmt()?);

        Ok(Stmt::For {
            pos,
            setup,
            condition,
            increment,
            body,
        })
    }

    fn parse_return_stmt(&mut self) -> CompileResult<Stmt> {
        let pos = self.current.pos;
        self.expect(Token::Return)?;
        let value = self.parse_expr()?;
        self.expect(Token::Semi)?;
        Ok(Stmt::Ret { pos, value })
    }
}
