//! Definitions for [`Assembly`] and [`Instr`]: the 32-bit x86 subset emitted by the code generator.

pub mod listing;

use std::fmt;

/// Registers used by generated code. `Al` and `Cl` are the low bytes of `Eax` and `Ecx`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    Eax,
    Ecx,
    Edx,
    Esp,
    Ebp,
    Al,
    Cl,
}

impl Reg {
    pub fn is_byte(self) -> bool {
        matches!(self, Reg::Al | Reg::Cl)
    }

    pub fn name(self) -> &'static str {
        match self {
            Reg::Eax => "eax",
            Reg::Ecx => "ecx",
            Reg::Edx => "edx",
            Reg::Esp => "esp",
            Reg::Ebp => "ebp",
            Reg::Al => "al",
            Reg::Cl => "cl",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Imm(i32),
    Reg(Reg),
    /// `disp(%base)`
    Mem { disp: i32, base: Reg },
}

impl Operand {
    /// A stack slot addressed relative to the frame pointer.
    pub fn frame(disp: i32) -> Self {
        Operand::Mem {
            disp,
            base: Reg::Ebp,
        }
    }

    fn is_byte(&self) -> bool {
        matches!(self, Operand::Reg(reg) if reg.is_byte())
    }
}

/// Condition codes, evaluated against the operands of the last `cmp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    E,
    Ne,
    L,
    Le,
    G,
    Ge,
}

impl Cond {
    pub fn suffix(self) -> &'static str {
        match self {
            Cond::E => "e",
            Cond::Ne => "ne",
            Cond::L => "l",
            Cond::Le => "le",
            Cond::G => "g",
            Cond::Ge => "ge",
        }
    }
}

/// An instruction. Two operand forms are `(src, dst)` as in AT&T syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    Push(Operand),
    Pop(Reg),
    Mov(Operand, Operand),
    /// Zero extends a byte register into a full register.
    Movzb(Reg, Reg),
    Add(Operand, Operand),
    Sub(Operand, Operand),
    Imul(Operand, Reg),
    And(Operand, Operand),
    Or(Operand, Operand),
    Xchg(Reg, Reg),
    Neg(Reg),
    Not(Reg),
    /// Sign extends `%eax` into `%edx:%eax`.
    Cltd,
    /// Divides `%edx:%eax`, quotient in `%eax`, remainder in `%edx`.
    Idiv(Reg),
    Cmp(Operand, Operand),
    Set(Cond, Reg),
    Jmp(String),
    Jcc(Cond, String),
    Call(String),
    Ret,
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        /// `b` suffix for byte sized destinations, `l` otherwise.
        fn size(dst: &Operand) -> &'static str {
            if dst.is_byte() {
                "b"
            } else {
                "l"
            }
        }

        match self {
            Instr::Push(op) => write!(f, "pushl {}", op),
            Instr::Pop(reg) => write!(f, "popl %{}", reg.name()),
            Instr::Mov(src, dst) => write!(f, "movl {}, {}", src, dst),
            Instr::Movzb(src, dst) => write!(f, "movzbl %{}, %{}", src.name(), dst.name()),
            Instr::Add(src, dst) => write!(f, "addl {}, {}", src, dst),
            Instr::Sub(src, dst) => write!(f, "subl {}, {}", src, dst),
            Instr::Imul(src, dst) => write!(f, "imull {}, %{}", src, dst.name()),
            Instr::And(src, dst) => write!(f, "and{} {}, {}", size(dst), src, dst),
            Instr::Or(src, dst) => write!(f, "or{} {}, {}", size(dst), src, dst),
            Instr::Xchg(a, b) => write!(f, "xchgl %{}, %{}", a.name(), b.name()),
            Instr::Neg(reg) => write!(f, "negl %{}", reg.name()),
            Instr::Not(reg) => write!(f, "notl %{}", reg.name()),
            Instr::Cltd => write!(f, "cltd"),
            Instr::Idiv(reg) => write!(f, "idivl %{}", reg.name()),
            Instr::Cmp(src, dst) => write!(f, "cmpl {}, {}", src, dst),
            Instr::Set(cond, reg) => write!(f, "set{} %{}", cond.suffix(), reg.name()),
            Instr::Jmp(label) => write!(f, "jmp {}", label),
            Instr::Jcc(cond, label) => write!(f, "j{} {}", cond.suffix(), label),
            Instr::Call(label) => write!(f, "call {}", label),
            Instr::Ret => write!(f, "ret"),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Imm(value) => write!(f, "${}", value),
            Operand::Reg(reg) => write!(f, "%{}", reg.name()),
            Operand::Mem { disp, base } => write!(f, "{}(%{})", disp, base.name()),
        }
    }
}

/// One line of an assembly listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// `.text` section directive.
    Text,
    /// `.globl` directive exporting a symbol.
    Globl(String),
    Label(String),
    Instr(Instr),
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Text => write!(f, "\t.text"),
            Line::Globl(symbol) => write!(f, "\t.globl {}", symbol),
            Line::Label(label) => write!(f, "{}:", label),
            Line::Instr(instr) => write!(f, "\t{}", instr),
        }
    }
}

/// An assembly listing for a whole compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub lines: Vec<Line>,
}

impl Assembly {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: Line) {
        self.lines.push(line);
    }

    pub fn emit(&mut self, instr: Instr) {
        self.lines.push(Line::Instr(instr));
    }

    pub fn label(&mut self, label: impl Into<String>) {
        self.lines.push(Line::Label(label.into()));
    }

    /// Iterates over the instructions only, skipping labels and directives.
    pub fn instrs(&self) -> impl Iterator<Item = &Instr> {
        self.lines.iter().filter_map(|line| match line {
            Line::Instr(instr) => Some(instr),
            _ => None,
        })
    }
}

/// Renders the listing as GNU assembler (AT&T syntax) source.
impl fmt::Display for Assembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
