//! Lowers AST into an [`Assembly`] listing.
//!
//! Every expression leaves its value in `%eax`. Binary operators save the left operand on the
//! stack while the right one is evaluated, then pop it into `%ecx`. Locals and parameters are
//! addressed relative to `%ebp`.

use crate::functions::FunctionTable;
use crate::labels::{LabelAllocator, LoopLabels};
use crate::scope::{ScopeStack, SLOT_SIZE};
use crate::CodegenOptions;
use minc_asm::{Assembly, Cond, Instr, Line, Operand, Reg};
use minc_parser::ast::{Block, Expr, FuncDec, Program, Stmt};
use minc_parser::lexer::Token;
use minc_source::{CompileError, CompileResult, ErrorKind, Position};

const EAX: Operand = Operand::Reg(Reg::Eax);
const ECX: Operand = Operand::Reg(Reg::Ecx);
const ESP: Operand = Operand::Reg(Reg::Esp);

/// Generate assembly from an abstract syntax tree.
pub struct Codegen {
    asm: Assembly,
    scopes: ScopeStack,
    labels: LabelAllocator,
    functions: FunctionTable,
    options: CodegenOptions,
}

impl Codegen {
    pub fn new(options: CodegenOptions) -> Self {
        Self {
            asm: Assembly::new(),
            scopes: ScopeStack::new(),
            labels: LabelAllocator::new(),
            functions: FunctionTable::new(),
            options,
        }
    }

    /// Consumes `self` and returns the generated [`Assembly`].
    #[must_use]
    pub fn into_inner_assembly(self) -> Assembly {
        self.asm
    }

    /// Generates every function of `program` in source order.
    pub fn codegen_program(&mut self, program: &Program) -> CompileResult<()> {
        self.asm.push(Line::Text);
        for func in &program.functions {
            self.codegen_function(func)?;
        }
        Ok(())
    }

    /// Registers `func` in the function table and, if it has a body, emits it.
    /// Calls can only target functions registered before them.
    pub fn codegen_function(&mut self, func: &FuncDec) -> CompileResult<()> {
        self.functions.register(func)?;
        let body = match &func.body {
            Some(body) => body,
            None => return Ok(()), // prototype
        };

        self.scopes.enter_function(&func.params, func.pos)?;

        let symbol = self.symbol(&func.ident);
        self.asm.push(Line::Globl(symbol.clone()));
        self.asm.label(symbol);
        self.asm.emit(Instr::Push(Operand::Reg(Reg::Ebp)));
        self.asm.emit(Instr::Mov(ESP, Operand::Reg(Reg::Ebp)));

        self.codegen_block(body)?;

        // falling off the end returns 0
        self.asm.emit(Instr::Mov(Operand::Imm(0), EAX));
        self.emit_epilogue();
        Ok(())
    }

    fn symbol(&self, ident: &str) -> String {
        format!("{}{}", self.options.symbol_prefix, ident)
    }

    fn emit_epilogue(&mut self) {
        self.asm.emit(Instr::Mov(Operand::Reg(Reg::Ebp), ESP));
        self.asm.emit(Instr::Pop(Reg::Ebp));
        self.asm.emit(Instr::Ret);
    }

    fn reserve(&mut self, bytes: i32) {
        if bytes > 0 {
            self.asm.emit(Instr::Sub(Operand::Imm(bytes), ESP));
        }
    }

    fn release(&mut self, bytes: i32) {
        if bytes > 0 {
            self.asm.emit(Instr::Add(Operand::Imm(bytes), ESP));
        }
    }

    /// Emits `je label` taken when `%eax` is zero.
    fn jump_if_zero(&mut self, label: &str) {
        self.asm.emit(Instr::Cmp(Operand::Imm(0), EAX));
        self.asm.emit(Instr::Jcc(Cond::E, label.to_string()));
    }

    fn codegen_block(&mut self, block: &Block) -> CompileResult<()> {
        self.scopes.enter_scope(None);
        // Every declaration of the block gets its slot up front.
        for stmt in &block.stmts {
            if let Stmt::VarDec { pos, ident, .. } = stmt {
                self.scopes.register(ident, *pos)?;
            }
        }
        let reserved = self.scopes.reserved();
        self.reserve(reserved);

        for stmt in &block.stmts {
            self.codegen_stmt(stmt)?;
        }

        let reserved = self.scopes.exit_scope();
        self.release(reserved);
        Ok(())
    }

    /// Generates a loop body in a scope carrying the loop's labels.
    fn codegen_loop_body(&mut self, body: &Stmt, labels: LoopLabels) -> CompileResult<()> {
        self.scopes.enter_scope(Some(labels));
        self.codegen_stmt(body)?;
        let reserved = self.scopes.exit_scope();
        self.release(reserved);
        Ok(())
    }

    /// Emits the jump of a `break` or `continue`, releasing the stack of blocks left on the way.
    fn codegen_loop_jump(&mut self, pos: Position, is_break: bool) -> CompileResult<()> {
        let keyword = if is_break { "break" } else { "continue" };
        let (label, unwind) = match self.scopes.loop_target() {
            Some((labels, unwind)) if is_break => (labels.break_label.clone(), unwind),
            Some((labels, unwind)) => (labels.continue_label.clone(), unwind),
            None => {
                return Err(CompileError::new(ErrorKind::OutsideLoop(keyword), pos));
            }
        };
        self.release(unwind);
        self.asm.emit(Instr::Jmp(label));
        Ok(())
    }

    fn codegen_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match stmt {
            Stmt::VarDec {
                pos,
                ident,
                initializer,
            } => {
                match initializer {
                    Some(initializer) => self.codegen_expr(initializer)?,
                    None => self.asm.emit(Instr::Mov(Operand::Imm(0), EAX)),
                }
                let offset = self.scopes.declare(ident, *pos)?;
                self.asm.emit(Instr::Mov(EAX, Operand::frame(offset)));
            }
            Stmt::Block(block) => self.codegen_block(block)?,
            Stmt::If {
                condition,
                then,
                otherwise,
                ..
            } => {
                let else_label = self.labels.fresh("if_else");
                let end_label = self.labels.fresh("if_end");

                self.codegen_expr(condition)?;
                self.jump_if_zero(&else_label);
                self.codegen_stmt(then)?;
                self.asm.emit(Instr::Jmp(end_label.clone()));
                self.asm.label(else_label);
                if let Some(otherwise) = otherwise {
                    self.codegen_stmt(otherwise)?;
                }
                self.asm.label(end_label);
            }
            Stmt::While {
                condition, body, ..
            } => {
                let start_label = self.labels.fresh("while_start");
                let end_label = self.labels.fresh("while_end");

                self.asm.label(start_label.clone());
                self.codegen_expr(condition)?;
                self.jump_if_zero(&end_label);
                self.codegen_loop_body(
                    body,
                    LoopLabels {
                        break_label: end_label.clone(),
                        continue_label: start_label.clone(),
                    },
                )?;
                self.asm.emit(Instr::Jmp(start_label));
                self.asm.label(end_label);
            }
            Stmt::Do {
                body, condition, ..
            } => {
                let start_label = self.labels.fresh("do_start");
                let continue_label = self.labels.fresh("do_continue");
                let end_label = self.labels.fresh("do_end");

                self.asm.label(start_label.clone());
                self.codegen_loop_body(
                    body,
                    LoopLabels {
                        break_label: end_label.clone(),
                        continue_label: continue_label.clone(),
                    },
                )?;
                self.asm.label(continue_label);
                self.codegen_expr(condition)?;
                self.jump_if_zero(&end_label);
                self.asm.emit(Instr::Jmp(start_label));
                self.asm.label(end_label);
            }
            Stmt::For {
                setup,
                condition,
                increment,
                body,
                ..
            } => {
                let condition_label = self.labels.fresh("for_cond");
                let continue_label = self.labels.fresh("for_continue");
                let break_label = self.labels.fresh("for_break");

                self.scopes.enter_scope(Some(LoopLabels {
                    break_label: break_label.clone(),
                    continue_label: continue_label.clone(),
                }));
                if let Stmt::VarDec { pos, ident, .. } = setup.as_ref() {
                    self.scopes.register(ident, *pos)?;
                }
                let reserved = self.scopes.reserved();
                self.reserve(reserved);
                self.codegen_stmt(setup)?;

                self.asm.emit(Instr::Jmp(condition_label.clone()));
                self.asm.label(continue_label.clone());
                self.codegen_expr(increment)?;
                self.asm.label(condition_label);
                self.codegen_expr(condition)?;
                self.jump_if_zero(&break_label);
                self.codegen_stmt(body)?;
                self.asm.emit(Instr::Jmp(continue_label));
                self.asm.label(break_label);

                let reserved = self.scopes.exit_scope();
                self.release(reserved);
            }
            Stmt::Break { pos } => self.codegen_loop_jump(*pos, true)?,
            Stmt::Continue { pos } => self.codegen_loop_jump(*pos, false)?,
            Stmt::Ret { value, .. } => {
                self.codegen_expr(value)?;
                self.emit_epilogue();
            }
            Stmt::ExprStmt { expr, .. } => self.codegen_expr(expr)?,
        }
        Ok(())
    }

    fn codegen_expr(&mut self, expr: &Expr) -> CompileResult<()> {
        match expr {
            Expr::IntLit { value, .. } => self.asm.emit(Instr::Mov(Operand::Imm(*value), EAX)),
            Expr::Null { .. } => self.asm.emit(Instr::Mov(Operand::Imm(1), EAX)),
            Expr::Var { pos, ident } => {
                let offset = self.scopes.resolve(ident, *pos)?;
                self.asm.emit(Instr::Mov(Operand::frame(offset), EAX));
            }
            Expr::Assign { pos, ident, value } => {
                self.codegen_expr(value)?;
                let offset = self.scopes.resolve(ident, *pos)?;
                self.asm.emit(Instr::Mov(EAX, Operand::frame(offset)));
            }
            Expr::UnaryOp { pos, op, arg } => {
                self.codegen_expr(arg)?;
                self.codegen_unary_op(*op, *pos)?;
            }
            Expr::BinaryOp { .. } => self.codegen_binary_chain(expr)?,
            Expr::Ternary {
                condition,
                then,
                otherwise,
                ..
            } => {
                let else_label = self.labels.fresh("ternary_else");
                let end_label = self.labels.fresh("ternary_end");

                self.codegen_expr(condition)?;
                self.jump_if_zero(&else_label);
                self.codegen_expr(then)?;
                self.asm.emit(Instr::Jmp(end_label.clone()));
                self.asm.label(else_label);
                self.codegen_expr(otherwise)?;
                self.asm.label(end_label);
            }
            Expr::Call { pos, ident, args } => {
                self.functions.resolve_call(ident, args.len(), *pos)?;

                // Right to left, so the first argument ends up on top of the stack.
                for arg in args.iter().rev() {
                    self.codegen_expr(arg)?;
                    self.asm.emit(Instr::Push(EAX));
                }
                let symbol = self.symbol(ident);
                self.asm.emit(Instr::Call(symbol));
                self.release(args.len() as i32 * SLOT_SIZE);
            }
        }
        Ok(())
    }

    /// Generates a chain of binary operators by walking down its left spine, so long
    /// left-associative chains do not recurse once per operator.
    fn codegen_binary_chain(&mut self, expr: &Expr) -> CompileResult<()> {
        let mut spine = Vec::new();
        let mut leftmost = expr;
        while let Expr::BinaryOp { pos, op, lhs, rhs } = leftmost {
            spine.push((*pos, *op, rhs.as_ref()));
            leftmost = lhs.as_ref();
        }

        self.codegen_expr(leftmost)?;
        for (pos, op, rhs) in spine.into_iter().rev() {
            self.asm.emit(Instr::Push(EAX));
            self.codegen_expr(rhs)?;
            self.asm.emit(Instr::Pop(Reg::Ecx));
            self.codegen_binary_op(op, pos)?;
        }
        Ok(())
    }

    /// Applies `op` to `%eax`.
    fn codegen_unary_op(&mut self, op: Token, pos: Position) -> CompileResult<()> {
        match op {
            Token::Minus => self.asm.emit(Instr::Neg(Reg::Eax)),
            Token::Tilde => self.asm.emit(Instr::Not(Reg::Eax)),
            Token::LogicalNot => {
                self.asm.emit(Instr::Cmp(Operand::Imm(0), EAX));
                self.asm.emit(Instr::Mov(Operand::Imm(0), EAX));
                self.asm.emit(Instr::Set(Cond::E, Reg::Al));
            }
            _ => return Err(invalid_operator(op, pos)),
        }
        Ok(())
    }

    /// Combines the left operand in `%ecx` with the right operand in `%eax`, leaving the result
    /// in `%eax`.
    fn codegen_binary_op(&mut self, op: Token, pos: Position) -> CompileResult<()> {
        let cond = match op {
            Token::Plus => {
                self.asm.emit(Instr::Add(ECX, EAX));
                return Ok(());
            }
            Token::Minus => {
                self.asm.emit(Instr::Sub(EAX, ECX));
                self.asm.emit(Instr::Mov(ECX, EAX));
                return Ok(());
            }
            Token::Asterisk => {
                self.asm.emit(Instr::Imul(ECX, Reg::Eax));
                return Ok(());
            }
            Token::Slash | Token::Percent => {
                // dividend in %eax, divisor in %ecx
                self.asm.emit(Instr::Xchg(Reg::Eax, Reg::Ecx));
                self.asm.emit(Instr::Cltd);
                self.asm.emit(Instr::Idiv(Reg::Ecx));
                if op == Token::Percent {
                    self.asm.emit(Instr::Mov(Operand::Reg(Reg::Edx), EAX));
                }
                return Ok(());
            }
            // Both operands are always evaluated: `||` and `&&` combine them bitwise.
            Token::OrOr => {
                self.asm.emit(Instr::Or(ECX, EAX));
                self.asm.emit(Instr::Cmp(Operand::Imm(0), EAX));
                Cond::Ne
            }
            Token::AndAnd => {
                self.asm.emit(Instr::Cmp(Operand::Imm(0), ECX));
                self.asm.emit(Instr::Set(Cond::Ne, Reg::Cl));
                self.asm.emit(Instr::Cmp(Operand::Imm(0), EAX));
                self.asm.emit(Instr::Set(Cond::Ne, Reg::Al));
                self.asm.emit(Instr::And(
                    Operand::Reg(Reg::Cl),
                    Operand::Reg(Reg::Al),
                ));
                self.asm.emit(Instr::Movzb(Reg::Al, Reg::Eax));
                return Ok(());
            }
            Token::EqualsEquals => Cond::E,
            Token::NotEquals => Cond::Ne,
            Token::LessThan => Cond::L,
            Token::LessThanEquals => Cond::Le,
            Token::GreaterThan => Cond::G,
            Token::GreaterThanEquals => Cond::Ge,
            _ => return Err(invalid_operator(op, pos)),
        };

        if op != Token::OrOr {
            self.asm.emit(Instr::Cmp(EAX, ECX));
        }
        self.asm.emit(Instr::Set(cond, Reg::Al));
        self.asm.emit(Instr::Movzb(Reg::Al, Reg::Eax));
        Ok(())
    }
}

fn invalid_operator(op: Token, pos: Position) -> CompileError {
    CompileError::new(ErrorKind::InvalidOperator(op.symbol().to_string()), pos)
}

#[cfg(test)]
mod tests {
    use crate::{generate, CodegenOptions};
    use minc_asm::{Instr, Line};
    use minc_parser::parse;
    use minc_source::{CompileResult, ErrorKind, Source};
    use std::collections::HashSet;

    fn compile_with(source: &str, options: CodegenOptions) -> CompileResult<minc_asm::Assembly> {
        let program = parse(&Source::new(source)).unwrap();
        generate(&program, options)
    }

    fn compile(source: &str) -> CompileResult<String> {
        compile_with(source, CodegenOptions::default()).map(|asm| asm.to_string())
    }

    fn error_kind(source: &str) -> ErrorKind {
        compile(source).unwrap_err().kind
    }

    #[test]
    fn test_return_constant() {
        assert_eq!(
            compile("int main() { return 2; }").unwrap(),
            "\t.text\n\t.globl _main\n_main:\n\tpushl %ebp\n\tmovl %esp, %ebp\n\tmovl $2, %eax\n\tmovl %ebp, %esp\n\tpopl %ebp\n\tret\n\tmovl $0, %eax\n\tmovl %ebp, %esp\n\tpopl %ebp\n\tret\n"
        );
    }

    #[test]
    fn test_locals_reserve_stack() {
        let asm = compile("int main() { int a = 1; return a; }").unwrap();
        let body: Vec<_> = asm.lines().skip(5).collect();
        assert_eq!(
            body,
            [
                "\tsubl $4, %esp",
                "\tmovl $1, %eax",
                "\tmovl %eax, -4(%ebp)",
                "\tmovl -4(%ebp), %eax",
                "\tmovl %ebp, %esp",
                "\tpopl %ebp",
                "\tret",
                "\taddl $4, %esp",
                "\tmovl $0, %eax",
                "\tmovl %ebp, %esp",
                "\tpopl %ebp",
                "\tret",
            ]
        );
    }

    #[test]
    fn test_call_pushes_arguments_right_to_left() {
        let asm = compile_with(
            "int f(int a, int b); int main() { return f(1, 2); }",
            CodegenOptions::elf(),
        )
        .unwrap();
        let text = asm.to_string();
        assert!(text.contains(
            "\tmovl $2, %eax\n\tpushl %eax\n\tmovl $1, %eax\n\tpushl %eax\n\tcall f\n\taddl $8, %esp\n"
        ));
        assert!(text.contains("\t.globl main\nmain:\n"));
        // prototypes emit nothing
        assert!(!asm.lines.contains(&Line::Label("f".to_string())));
    }

    #[test]
    fn test_params_read_above_frame() {
        let text = compile("int add(int a, int b) { return a + b; }").unwrap();
        assert!(text.contains(
            "\tmovl 8(%ebp), %eax\n\tpushl %eax\n\tmovl 12(%ebp), %eax\n\tpopl %ecx\n\taddl %ecx, %eax\n"
        ));
    }

    #[test]
    fn test_long_operator_chain() {
        let source = format!("int main() {{ return 1{}; }}", " + 1".repeat(1000));
        let asm = compile_with(&source, CodegenOptions::default()).unwrap();
        let pushes = asm.instrs().filter(|instr| matches!(instr, Instr::Push(_))).count();
        let adds = asm
            .instrs()
            .filter(|instr| instr.to_string() == "addl %ecx, %eax")
            .count();
        // one push for the frame pointer
        assert_eq!(pushes, 1001);
        assert_eq!(adds, 1000);
    }

    #[test]
    fn test_chain_keeps_left_to_right_order() {
        let text = compile("int main() { return 8 - 3 - 2; }").unwrap();
        assert!(text.contains(
            "\tmovl $8, %eax\n\tpushl %eax\n\tmovl $3, %eax\n\tpopl %ecx\n\tsubl %eax, %ecx\n\tmovl %ecx, %eax\n\tpushl %eax\n\tmovl $2, %eax\n\tpopl %ecx\n\tsubl %eax, %ecx\n\tmovl %ecx, %eax\n"
        ));
    }

    #[test]
    fn test_labels_are_unique() {
        let asm = compile_with(
            "int main() {
                int i = 0;
                if (i) i = 1; else i = 2;
                if (i) i = 3;
                while (i < 10) { i = i + 1; }
                do { i = i - 1; } while (i);
                for (int j = 0; j < 3; j = j + 1) { if (j == 1) continue; else break; }
                return i ? 1 : 0;
            }",
            CodegenOptions::default(),
        )
        .unwrap();
        let labels: Vec<_> = asm
            .lines
            .iter()
            .filter_map(|line| match line {
                Line::Label(label) => Some(label),
                _ => None,
            })
            .collect();
        let unique: HashSet<_> = labels.iter().collect();
        assert_eq!(labels.len(), unique.len());

        // every jump lands on an emitted label
        for instr in asm.instrs() {
            if let Instr::Jmp(target) | Instr::Jcc(_, target) = instr {
                assert!(unique.contains(&target), "{} has no label", target);
            }
        }
    }

    #[test]
    fn test_break_releases_nested_locals() {
        let text = compile(
            "int main() { while (1) { int a = 1; break; } return 0; }",
        )
        .unwrap();
        assert!(text.contains("\taddl $4, %esp\n\tjmp .Lwhile_end_1\n"));
    }

    #[test]
    fn test_semantic_errors() {
        assert_eq!(
            error_kind("int main() { break; }"),
            ErrorKind::OutsideLoop("break")
        );
        assert_eq!(
            error_kind("int main() { if (1) continue; return 0; }"),
            ErrorKind::OutsideLoop("continue")
        );
        assert_eq!(
            error_kind("int main() { int a; int a; return 0; }"),
            ErrorKind::DuplicateDeclaration("a".to_string())
        );
        assert_eq!(
            error_kind("int main() { a = 1; int a; return a; }"),
            ErrorKind::UseBeforeDeclaration("a".to_string())
        );
        assert_eq!(
            error_kind("int main() { return b; }"),
            ErrorKind::UndefinedName("b".to_string())
        );
        assert_eq!(
            error_kind("int main() { return f(); } int f() { return 1; }"),
            ErrorKind::UnknownFunction("f".to_string())
        );
        assert_eq!(
            error_kind("int f(int a); int main() { return f(); }"),
            ErrorKind::ArityMismatch {
                name: "f".to_string(),
                expected: 1,
                found: 0,
            }
        );
        assert_eq!(
            error_kind("int f() { return 1; } int f() { return 2; }"),
            ErrorKind::DuplicateFunctionDefinition("f".to_string())
        );
    }
}
