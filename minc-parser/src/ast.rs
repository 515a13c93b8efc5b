use crate::lexer::Token;
use minc_source::Position;
use std::fmt;

/// The root of the tree: every top-level function declaration in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub pos: Position,
    pub functions: Vec<FuncDec>,
}

/// A function definition, or a prototype when `body` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncDec {
    pub pos: Position,
    pub ident: String,
    pub params: Vec<String>,
    pub body: Option<Block>,
}

impl FuncDec {
    pub fn is_prototype(&self) -> bool {
        self.body.is_none()
    }
}

/// A `{ ... }` block. Introduces a new lexical scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub pos: Position,
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// A local variable declaration (e.g. `int x = 1;`).
    VarDec {
        pos: Position,
        ident: String,
        initializer: Option<Expr>,
    },
    Block(Block),
    If {
        pos: Position,
        condition: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    While {
        pos: Position,
        condition: Expr,
        body: Box<Stmt>,
    },
    Do {
        pos: Position,
        body: Box<Stmt>,
        condition: Expr,
    },
    /// `setup` is either a [`Stmt::VarDec`] or a [`Stmt::ExprStmt`]. An omitted condition or
    /// increment is an [`Expr::Null`].
    For {
        pos: Position,
        setup: Box<Stmt>,
        condition: Expr,
        increment: Expr,
        body: Box<Stmt>,
    },
    Break {
        pos: Position,
    },
    Continue {
        pos: Position,
    },
    Ret {
        pos: Position,
        value: Expr,
    },
    ExprStmt {
        pos: Position,
        expr: Expr,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A binary expression (e.g. `1+1`).
    BinaryOp {
        pos: Position,
        op: Token,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// A prefix expression (e.g. `-x`).
    UnaryOp {
        pos: Position,
        op: Token,
        arg: Box<Expr>,
    },
    /// A variable reference (e.g. `foo`).
    Var { pos: Position, ident: String },
    Assign {
        pos: Position,
        ident: String,
        value: Box<Expr>,
    },
    /// `condition ? then : otherwise`
    Ternary {
        pos: Position,
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Call {
        pos: Position,
        ident: String,
        args: Vec<Expr>,
    },
    IntLit { pos: Position, value: i32 },
    /// An elided expression. Evaluates to a non-zero constant.
    Null { pos: Position },
}

/* Display renders a compact s-expression form. */

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, func) in self.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", func)?;
        }
        Ok(())
    }
}

impl fmt::Display for FuncDec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(fn {} ({})", self.ident, self.params.join(" "))?;
        if let Some(body) = &self.body {
            write!(f, " {}", body)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for stmt in &self.stmts {
            write!(f, " {}", stmt)?;
        }
        write!(f, " }}")
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::VarDec {
                ident,
                initializer: Some(initializer),
                ..
            } => write!(f, "(int {} {})", ident, initializer),
            Stmt::VarDec { ident, .. } => write!(f, "(int {})", ident),
            Stmt::Block(block) => write!(f, "{}", block),
            Stmt::If {
                condition,
                then,
                otherwise: Some(otherwise),
                ..
            } => write!(f, "(if {} {} {})", condition, then, otherwise),
            Stmt::If {
                condition, then, ..
            } => write!(f, "(if {} {})", condition, then),
            Stmt::While {
                condition, body, ..
            } => write!(f, "(while {} {})", condition, body),
            Stmt::Do {
                body, condition, ..
            } => write!(f, "(do {} {})", body, condition),
            Stmt::For {
                setup,
                condition,
                increment,
                body,
                ..
            } => write!(f, "(for {} {} {} {})", setup, condition, increment, body),
            Stmt::Break { .. } => write!(f, "(break)"),
            Stmt::Continue { .. } => write!(f, "(continue)"),
            Stmt::Ret { value, .. } => write!(f, "(return {})", value),
            Stmt::ExprStmt { expr, .. } => write!(f, "(expr {})", expr),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::BinaryOp { op, lhs, rhs, .. } => write!(f, "({} {} {})", op.symbol(), lhs, rhs),
            Expr::UnaryOp { op, arg, .. } => write!(f, "({} {})", op.symbol(), arg),
            Expr::Var { ident, .. } => write!(f, "{}", ident),
            Expr::Assign { ident, value, .. } => write!(f, "(= {} {})", ident, value),
            Expr::Ternary {
                condition,
                then,
                otherwise,
                ..
            } => write!(f, "(? {} {} {})", condition, then, otherwise),
            Expr::Call { ident, args, .. } => {
                write!(f, "(call {}", ident)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
            Expr::IntLit { value, .. } => write!(f, "{}", value),
            Expr::Null { .. } => write!(f, "null"),
        }
    }
}
