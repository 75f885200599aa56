use std::collections::HashMap;
use serde::Serialize;

use crate::config::Config;

pub type Reg = usize;
pub type Addr = usize;

#[derive(Debug, thiserror::Error)]
pub enum VmError {
    #[error("program of {len} instructions does not fit below address {limit}")]
    ProgramTooLarge { len: usize, limit: Addr },
    #[error("program does not end with halt")]
    MissingHalt,
    #[error("heap exhausted: allocating {count} at {heap} would reach the stack at {stack}")]
    HeapExhausted { count: usize, heap: Addr, stack: Addr },
}

type VmResult<T> = Result<T, VmError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn from_char(c: char) -> Option<ArithOp> {
        match c {
            '+' => Some(ArithOp::Add),
            '-' => Some(ArithOp::Sub),
            '*' => Some(ArithOp::Mul),
            '/' => Some(ArithOp::Div),
            _ => None,
        }
    }

    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            ArithOp::Add => '+',
            ArithOp::Sub => '-',
            ArithOp::Mul => '*',
            ArithOp::Div => '/',
        }
    }

    fn mnemonic(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
        }
    }
}

// ── Instructions ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instr {
    /// R[reg] = value
    LoadImm { reg: Reg, value: f64 },
    /// R[reg] = M[addr]
    Load { reg: Reg, addr: Addr },
    /// M[addr] = R[reg]
    Store { addr: Addr, reg: Reg },
    /// M[addr] = value
    StoreImm { addr: Addr, value: f64 },
    /// R[dst] = R[src]
    Move { src: Reg, dst: Reg },
    /// R[dest] = R[left] op R[right]
    Binary { op: ArithOp, left: Reg, right: Reg, dest: Reg },
    Halt,
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instr::LoadImm { reg, value } => write!(f, "loadi  r{} {}", reg, value),
            Instr::Load { reg, addr } => write!(f, "load   r{} @{}", reg, addr),
            Instr::Store { addr, reg } => write!(f, "store  @{} r{}", addr, reg),
            Instr::StoreImm { addr, value } => write!(f, "storei @{} {}", addr, value),
            Instr::Move { src, dst } => write!(f, "mov    r{} r{}", src, dst),
            Instr::Binary { op, left, right, dest } => {
                write!(f, "{:<6} r{} r{} r{}", op.mnemonic(), left, right, dest)
            }
            Instr::Halt => write!(f, "halt"),
        }
    }
}

/// Render a program one instruction per line, prefixed with its load address.
pub fn disassemble(code: &[Instr]) -> String {
    let width = code.len().saturating_sub(1).to_string().len();
    let mut out = String::new();
    for (pc, inst) in code.iter().enumerate() {
        out.push_str(&format!("{pc:>width$}  {inst}\n"));
    }
    out
}

// ── Memory ───────────────────────────────────────────────────────────

/// One cell of the unified address space: code at low addresses, variable
/// storage from the heap base upward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Word {
    Code(Instr),
    Data(f64),
}

// ── VM ───────────────────────────────────────────────────────────────

/// Register machine with a von Neumann memory. Registers live for one
/// evaluation; memory and the heap pointer live as long as the VM.
#[derive(Debug)]
pub struct VirtualMachine {
    registers: Vec<f64>,
    next_reg: Reg,
    memory: HashMap<Addr, Word>,
    code_len: usize,
    pc: Addr,
    heap_base: Addr,
    heap: Addr,
    stack: Addr,
}

impl Default for VirtualMachine {
    fn default() -> Self {
        VirtualMachine::new(&Config::default())
    }
}

impl VirtualMachine {
    pub fn new(config: &Config) -> Self {
        VirtualMachine {
            registers: Vec::with_capacity(16),
            next_reg: 0,
            memory: HashMap::new(),
            code_len: 0,
            pc: 0,
            heap_base: config.heap_base,
            heap: config.heap_base,
            stack: config.stack_top,
        }
    }

    /// Whether `code` fits in the code region and ends with `halt`.
    pub fn check(&self, code: &[Instr]) -> VmResult<()> {
        if code.len() > self.heap_base {
            return Err(VmError::ProgramTooLarge { len: code.len(), limit: self.heap_base });
        }
        if code.last() != Some(&Instr::Halt) {
            return Err(VmError::MissingHalt);
        }
        Ok(())
    }

    /// Copy a program into the code region starting at address 0.
    pub fn load(&mut self, code: &[Instr]) -> VmResult<()> {
        self.check(code)?;
        for (addr, inst) in code.iter().enumerate() {
            self.memory.insert(addr, Word::Code(*inst));
        }
        self.code_len = code.len();
        self.pc = 0;
        Ok(())
    }

    /// Run the loaded program until `halt` and return register 0.
    pub fn execute(&mut self) -> f64 {
        self.pc = 0;
        while self.pc < self.code_len {
            let word = self.memory.get(&self.pc).copied();
            tracing::trace!(pc = self.pc, ?word, "step");
            match word {
                Some(Word::Code(inst)) => match inst {
                    Instr::LoadImm { reg, value } => self.set_reg(reg, value),
                    Instr::Load { reg, addr } => {
                        let v = self.read(addr).unwrap_or(f64::NAN);
                        self.set_reg(reg, v);
                    }
                    Instr::Store { addr, reg } => {
                        let v = self.reg(reg);
                        self.memory.insert(addr, Word::Data(v));
                    }
                    Instr::StoreImm { addr, value } => {
                        self.memory.insert(addr, Word::Data(value));
                    }
                    Instr::Move { src, dst } => {
                        let v = self.reg(src);
                        self.set_reg(dst, v);
                    }
                    Instr::Binary { op, left, right, dest } => {
                        let v = op.apply(self.reg(left), self.reg(right));
                        self.set_reg(dest, v);
                    }
                    Instr::Halt => break,
                },
                // Data or an empty cell in the code region: nothing to do.
                _ => {}
            }
            self.pc += 1;
        }
        self.reg(0)
    }

    /// Reserve `count` consecutive cells and return the first address.
    pub fn allocate(&mut self, count: usize) -> VmResult<Addr> {
        let base = self.next_heap_address(count)?;
        self.heap += count;
        tracing::debug!(addr = base, count, "allocated heap storage");
        Ok(base)
    }

    /// The address the next `allocate(count)` would return, without moving
    /// the heap pointer.
    pub fn next_heap_address(&self, count: usize) -> VmResult<Addr> {
        match self.heap.checked_add(count) {
            Some(end) if end <= self.stack => Ok(self.heap),
            _ => Err(VmError::HeapExhausted { count, heap: self.heap, stack: self.stack }),
        }
    }

    pub fn heap_pointer(&self) -> Addr {
        self.heap
    }

    pub fn new_register(&mut self) -> Reg {
        let r = self.next_reg;
        self.next_reg += 1;
        r
    }

    pub fn registers_in_use(&self) -> usize {
        self.next_reg
    }

    pub fn reset_registers(&mut self) {
        self.registers.clear();
        self.next_reg = 0;
    }

    /// The numeric value stored at `addr`, if that cell holds data.
    pub fn read(&self, addr: Addr) -> Option<f64> {
        match self.memory.get(&addr) {
            Some(Word::Data(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn word(&self, addr: Addr) -> Option<Word> {
        self.memory.get(&addr).copied()
    }

    #[inline]
    fn reg(&self, r: Reg) -> f64 {
        self.registers.get(r).copied().unwrap_or(f64::NAN)
    }

    #[inline]
    fn set_reg(&mut self, r: Reg, v: f64) {
        if r >= self.registers.len() {
            self.registers.resize(r + 1, f64::NAN);
        }
        self.registers[r] = v;
    }
}
