use minc_asm::{Assembly, Cond, Instr, Line, Operand, Reg};
use std::collections::HashMap;
use thiserror::Error;

/// Size of the stack, in 32-bit words.
pub const STACK_WORDS: usize = 1 << 16;

pub const DEFAULT_STEP_LIMIT: u64 = 50_000_000;

/// Return address pushed for the entry call. Returning to it halts the machine.
const RETURN_SENTINEL: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("undefined symbol: {0}")]
    UndefinedSymbol(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("quotient does not fit in 32 bits")]
    DivisionOverflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("exceeded the limit of {0} steps")]
    StepLimitExceeded(u64),
    /// A memory access outside the stack, or a jump outside the code.
    #[error("invalid address: {0}")]
    InvalidAddress(i32),
    #[error("cannot write to {0}")]
    InvalidDestination(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Register file slot of `reg`. Byte registers alias the low byte of their parent.
fn slot(reg: Reg) -> usize {
    match reg {
        Reg::Eax | Reg::Al => 0,
        Reg::Ecx | Reg::Cl => 1,
        Reg::Edx => 2,
        Reg::Esp => 3,
        Reg::Ebp => 4,
    }
}

/// Executes an [`Assembly`] listing.
pub struct Vm<'a> {
    lines: &'a [Line],
    labels: HashMap<&'a str, usize>,
    regs: [i32; 5],
    /// The stack. Addresses are byte offsets, `%esp` starts one past the end.
    memory: Vec<i32>,
    /// Operands of the last `cmp` as `(dst, src)`. Conditions compare `dst` against `src`.
    flags: (i32, i32),
    /// Index of the next line.
    pc: usize,
    step_limit: u64,
}

impl<'a> Vm<'a> {
    pub fn new(asm: &'a Assembly) -> Self {
        let labels = asm
            .lines
            .iter()
            .enumerate()
            .filter_map(|(i, line)| match line {
                Line::Label(label) => Some((label.as_str(), i)),
                _ => None,
            })
            .collect();

        Self {
            lines: &asm.lines,
            labels,
            regs: [0; 5],
            memory: vec![0; STACK_WORDS],
            flags: (0, 0),
            pc: 0,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Sets the maximum number of instructions a single [`Vm::run`] may execute.
    #[must_use]
    pub fn with_step_limit(mut self, step_limit: u64) -> Self {
        self.step_limit = step_limit;
        self
    }

    /// Calls the function labelled `entry` without arguments and returns the value it leaves in
    /// `%eax`.
    pub fn run(&mut self, entry: &str) -> RuntimeResult<i32> {
        let top = (STACK_WORDS * 4) as i32;
        self.regs = [0; 5];
        self.set(Reg::Esp, top);
        self.set(Reg::Ebp, top);
        self.push(RETURN_SENTINEL)?;
        self.pc = self.resolve(entry)?;

        let lines = self.lines;
        let mut steps = 0;
        loop {
            let instr = match lines.get(self.pc) {
                Some(Line::Instr(instr)) => instr,
                Some(_) => {
                    self.pc += 1;
                    continue;
                }
                None => return Err(RuntimeError::InvalidAddress(self.pc as i32)),
            };
            if steps == self.step_limit {
                return Err(RuntimeError::StepLimitExceeded(self.step_limit));
            }
            steps += 1;
            self.pc += 1;

            if let Some(result) = self.step(instr)? {
                return Ok(result);
            }
        }
    }

    /// Executes one instruction. Returns the result once the entry function returns.
    fn step(&mut self, instr: &Instr) -> RuntimeResult<Option<i32>> {
        match instr {
            Instr::Push(op) => {
                let value = self.read(op)?;
                self.push(value)?;
            }
            Instr::Pop(reg) => {
                let value = self.pop()?;
                self.set(*reg, value);
            }
            Instr::Mov(src, dst) => {
                let value = self.read(src)?;
                self.write(dst, value)?;
            }
            Instr::Movzb(src, dst) => self.set(*dst, self.get(*src) & 0xff),
            Instr::Add(src, dst) => self.binary(src, dst, i32::wrapping_add)?,
            Instr::Sub(src, dst) => self.binary(src, dst, i32::wrapping_sub)?,
            Instr::Imul(src, dst) => {
                let value = self.read(src)?;
                self.set(*dst, self.get(*dst).wrapping_mul(value));
            }
            Instr::And(src, dst) => self.binary(src, dst, |a, b| a & b)?,
            Instr::Or(src, dst) => self.binary(src, dst, |a, b| a | b)?,
            Instr::Xchg(a, b) => {
                let (va, vb) = (self.get(*a), self.get(*b));
                self.set(*a, vb);
                self.set(*b, va);
            }
            Instr::Neg(reg) => self.set(*reg, self.get(*reg).wrapping_neg()),
            Instr::Not(reg) => self.set(*reg, !self.get(*reg)),
            Instr::Cltd => {
                let sign = if self.get(Reg::Eax) < 0 { -1 } else { 0 };
                self.set(Reg::Edx, sign);
            }
            Instr::Idiv(reg) => {
                let divisor = i64::from(self.get(*reg));
                if divisor == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                let dividend =
                    (i64::from(self.get(Reg::Edx)) << 32) | i64::from(self.get(Reg::Eax) as u32);
                let quotient = i32::try_from(dividend / divisor)
                    .map_err(|_| RuntimeError::DivisionOverflow)?;
                self.set(Reg::Eax, quotient);
                self.set(Reg::Edx, (dividend % divisor) as i32);
            }
            Instr::Cmp(src, dst) => self.flags = (self.read(dst)?, self.read(src)?),
            Instr::Set(cond, reg) => self.set(*reg, i32::from(self.holds(*cond))),
            Instr::Jmp(label) => self.pc = self.resolve(label)?,
            Instr::Jcc(cond, label) => {
                if self.holds(*cond) {
                    self.pc = self.resolve(label)?;
                }
            }
            Instr::Call(label) => {
                let target = self.resolve(label)?;
                self.push(self.pc as i32)?;
                self.pc = target;
            }
            Instr::Ret => {
                let addr = self.pop()?;
                if addr == RETURN_SENTINEL {
                    return Ok(Some(self.get(Reg::Eax)));
                }
                self.pc = usize::try_from(addr).map_err(|_| RuntimeError::InvalidAddress(addr))?;
            }
        }
        Ok(None)
    }

    fn resolve(&self, label: &str) -> RuntimeResult<usize> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| RuntimeError::UndefinedSymbol(label.to_string()))
    }

    fn holds(&self, cond: Cond) -> bool {
        let (dst, src) = self.flags;
        match cond {
            Cond::E => dst == src,
            Cond::Ne => dst != src,
            Cond::L => dst < src,
            Cond::Le => dst <= src,
            Cond::G => dst > src,
            Cond::Ge => dst >= src,
        }
    }

    fn get(&self, reg: Reg) -> i32 {
        let value = self.regs[slot(reg)];
        if reg.is_byte() {
            value & 0xff
        } else {
            value
        }
    }

    fn set(&mut self, reg: Reg, value: i32) {
        let current = &mut self.regs[slot(reg)];
        if reg.is_byte() {
            *current = (*current & !0xff) | (value & 0xff);
        } else {
            *current = value;
        }
    }

    /// `dst = f(dst, src)`
    fn binary(
        &mut self,
        src: &Operand,
        dst: &Operand,
        f: impl Fn(i32, i32) -> i32,
    ) -> RuntimeResult<()> {
        let value = f(self.read(dst)?, self.read(src)?);
        self.write(dst, value)
    }

    fn read(&self, op: &Operand) -> RuntimeResult<i32> {
        match *op {
            Operand::Imm(value) => Ok(value),
            Operand::Reg(reg) => Ok(self.get(reg)),
            Operand::Mem { disp, base } => self.load(self.get(base).wrapping_add(disp)),
        }
    }

    fn write(&mut self, op: &Operand, value: i32) -> RuntimeResult<()> {
        match *op {
            Operand::Imm(_) => return Err(RuntimeError::InvalidDestination(op.to_string())),
            Operand::Reg(reg) => self.set(reg, value),
            Operand::Mem { disp, base } => self.store(self.get(base).wrapping_add(disp), value)?,
        }
        Ok(())
    }

    fn word(&self, addr: i32) -> RuntimeResult<usize> {
        if addr < 0 || addr % 4 != 0 || addr as usize / 4 >= self.memory.len() {
            return Err(RuntimeError::InvalidAddress(addr));
        }
        Ok(addr as usize / 4)
    }

    fn load(&self, addr: i32) -> RuntimeResult<i32> {
        Ok(self.memory[self.word(addr)?])
    }

    fn store(&mut self, addr: i32, value: i32) -> RuntimeResult<()> {
        let word = self.word(addr)?;
        self.memory[word] = value;
        Ok(())
    }

    fn push(&mut self, value: i32) -> RuntimeResult<()> {
        let esp = self.get(Reg::Esp) - 4;
        if esp < 0 {
            return Err(RuntimeError::StackOverflow);
        }
        self.set(Reg::Esp, esp);
        self.store(esp, value)
    }

    fn pop(&mut self) -> RuntimeResult<i32> {
        let esp = self.get(Reg::Esp);
        let value = self.load(esp)?;
        self.set(Reg::Esp, esp + 4);
        Ok(value)
    }
}
