use crate::config::Config;
use crate::console::Console;
use crate::error::{ImageError, VmError};
use crate::operand::{self, Operand, OutOfRange, Target};
use crate::register::{Register, R};
use crate::{wrap, MEMORY_SIZE};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u16)]
pub enum OpCode {
    HALT, // 0
    SET,  // 1  a b
    PUSH, // 2  a
    POP,  // 3  a
    EQ,   // 4  a b c
    GT,   // 5  a b c
    JMP,  // 6  a
    JT,   // 7  a b
    JF,   // 8  a b
    ADD,  // 9  a b c
    MULT, // 10 a b c
    MOD,  // 11 a b c
    AND,  // 12 a b c
    OR,   // 13 a b c
    NOT,  // 14 a b
    RMEM, // 15 a b
    WMEM, // 16 a b
    CALL, // 17 a
    RET,  // 18
    OUT,  // 19 a
    IN,   // 20 a
    NOOP, // 21
}

impl OpCode {
    /// Number of operand cells following the opcode.
    pub fn arity(self) -> usize {
        match self {
            OpCode::HALT | OpCode::RET | OpCode::NOOP => 0,
            OpCode::PUSH | OpCode::POP | OpCode::JMP | OpCode::CALL | OpCode::OUT | OpCode::IN => 1,
            OpCode::SET | OpCode::JT | OpCode::JF | OpCode::NOT | OpCode::RMEM | OpCode::WMEM => 2,
            OpCode::EQ
            | OpCode::GT
            | OpCode::ADD
            | OpCode::MULT
            | OpCode::MOD
            | OpCode::AND
            | OpCode::OR => 3,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::HALT => "halt",
            OpCode::SET => "set",
            OpCode::PUSH => "push",
            OpCode::POP => "pop",
            OpCode::EQ => "eq",
            OpCode::GT => "gt",
            OpCode::JMP => "jmp",
            OpCode::JT => "jt",
            OpCode::JF => "jf",
            OpCode::ADD => "add",
            OpCode::MULT => "mult",
            OpCode::MOD => "mod",
            OpCode::AND => "and",
            OpCode::OR => "or",
            OpCode::NOT => "not",
            OpCode::RMEM => "rmem",
            OpCode::WMEM => "wmem",
            OpCode::CALL => "call",
            OpCode::RET => "ret",
            OpCode::OUT => "out",
            OpCode::IN => "in",
            OpCode::NOOP => "noop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// `halt` executed.
    Opcode,
    /// `ret` with an empty stack.
    EmptyReturn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    Halted(HaltReason),
}

/// What the loop does with the instruction pointer after a handler returns.
enum Flow {
    Next,
    Jump(u16),
    Halt(HaltReason),
}

type Args = [u16; 3];

pub struct Machine {
    pub(crate) memory: Vec<u16>,
    pub(crate) register: Register,
    pub(crate) stack: Vec<u16>,
    pub(crate) ip: usize,
    pub(crate) input: VecDeque<u16>,
    pub(crate) running: bool,
    pub(crate) config: Config,
}

impl Machine {
    /// Loads `image` at address 0; the rest of memory is zero.
    pub fn boot(image: &[u16], config: Config) -> Result<Machine, ImageError> {
        if image.len() > MEMORY_SIZE {
            return Err(ImageError::TooLarge(image.len()));
        }
        let mut memory = vec![0; MEMORY_SIZE];
        memory[..image.len()].copy_from_slice(image);

        log::info!(
            "booting {} words, operand policy {:?}",
            image.len(),
            config.operand_policy
        );
        Ok(Machine {
            memory,
            register: Register::new(),
            stack: Vec::new(),
            ip: 0,
            input: VecDeque::new(),
            running: true,
            config,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn abort(&mut self) {
        self.running = false
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn register(&self, r: R) -> u16 {
        self.register.read(r)
    }

    pub fn set_register(&mut self, r: R, val: u16) {
        self.register.write(r, wrap(val as u32));
    }

    /// Bottom first.
    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn memory(&self) -> &[u16] {
        &self.memory
    }

    pub fn read_memory(&self, addr: u16) -> Option<u16> {
        self.memory.get(addr as usize).copied()
    }

    /// Stores a raw word, as the loader would.
    pub fn write_memory(&mut self, addr: u16, val: u16) -> Result<(), VmError> {
        self.memory
            .get_mut(addr as usize)
            .map(|cell| *cell = val)
            .ok_or(VmError::InvalidAddress(addr as usize))
    }

    /// Runs until the machine halts or faults.
    pub fn run<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<HaltReason, VmError> {
        loop {
            if let Status::Halted(reason) = self.step(console)? {
                return Ok(reason);
            }
        }
    }

    /// Executes one instruction. A fault halts the machine.
    pub fn step<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<Status, VmError> {
        if !self.running {
            return Err(VmError::MachineHalted);
        }

        match self.next(console) {
            Ok(Status::Halted(reason)) => {
                self.abort();
                log::info!("halted at ip {}: {:?}", self.ip, reason);
                Ok(Status::Halted(reason))
            }
            Ok(status) => Ok(status),
            Err(err) => {
                self.abort();
                log::error!("{}, halting", err);
                Err(err)
            }
        }
    }

    fn next<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<Status, VmError> {
        let ip = self.ip;
        let raw = self.fetch(ip)?;
        let opcode = OpCode::from_u16(raw).ok_or(VmError::InvalidOpcode { ip, opcode: raw })?;

        let arity = opcode.arity();
        let mut args: Args = [0; 3];
        for (i, arg) in args.iter_mut().take(arity).enumerate() {
            *arg = self.fetch(ip + 1 + i)?;
        }

        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", self.trace_line(opcode, &args[..arity]));
        }

        let flow = match opcode {
            OpCode::HALT => Flow::Halt(HaltReason::Opcode),
            OpCode::SET => self.mnemonic_set(args)?,
            OpCode::PUSH => self.mnemonic_push(args)?,
            OpCode::POP => self.mnemonic_pop(args)?,
            OpCode::EQ => self.mnemonic_binary(args, |b, c| (b == c) as u32)?,
            OpCode::GT => self.mnemonic_binary(args, |b, c| (b > c) as u32)?,
            OpCode::JMP => Flow::Jump(self.value(args[0])?),
            OpCode::JT => self.mnemonic_branch(args, |cond| cond != 0)?,
            OpCode::JF => self.mnemonic_branch(args, |cond| cond == 0)?,
            OpCode::ADD => self.mnemonic_binary(args, |b, c| b + c)?,
            OpCode::MULT => self.mnemonic_binary(args, |b, c| b * c)?,
            OpCode::MOD => self.mnemonic_mod(args)?,
            OpCode::AND => self.mnemonic_binary(args, |b, c| b & c)?,
            OpCode::OR => self.mnemonic_binary(args, |b, c| b | c)?,
            OpCode::NOT => self.mnemonic_not(args)?,
            OpCode::RMEM => self.mnemonic_rmem(args)?,
            OpCode::WMEM => self.mnemonic_wmem(args)?,
            OpCode::CALL => self.mnemonic_call(args)?,
            OpCode::RET => self.mnemonic_ret(),
            OpCode::OUT => self.mnemonic_out(args, console)?,
            OpCode::IN => self.mnemonic_in(args, console)?,
            OpCode::NOOP => Flow::Next,
        };

        match flow {
            Flow::Next => {
                self.ip = ip + 1 + arity;
                Ok(Status::Running)
            }
            Flow::Jump(addr) => {
                self.ip = addr as usize;
                Ok(Status::Running)
            }
            Flow::Halt(reason) => Ok(Status::Halted(reason)),
        }
    }

    fn fetch(&self, addr: usize) -> Result<u16, VmError> {
        self.memory
            .get(addr)
            .copied()
            .ok_or(VmError::InvalidAddress(addr))
    }

    fn operand(&self, raw: u16) -> Result<Operand, VmError> {
        let policy = self.config.operand_policy;
        let operand = Operand::decode(raw, policy).map_err(|OutOfRange(value)| {
            VmError::InvalidOperand { ip: self.ip, value }
        })?;
        if operand::out_of_range(raw) {
            log::warn!("operand {} at ip {} normalized to {:?}", raw, self.ip, operand);
        }
        Ok(operand)
    }

    fn value(&self, raw: u16) -> Result<u16, VmError> {
        Ok(match self.operand(raw)? {
            Operand::Literal(val) => val,
            Operand::Register(r) => self.register.read(r),
        })
    }

    fn target(&self, raw: u16) -> Result<Target, VmError> {
        Ok(self.operand(raw)?.target())
    }

    fn store(&mut self, target: Target, val: u32) {
        let val = wrap(val);
        match target {
            Target::Register(r) => self.register.write(r, val),
            Target::Memory(addr) => self.memory[addr as usize] = val,
        }
    }

    fn mnemonic_set(&mut self, [a, b, _]: Args) -> Result<Flow, VmError> {
        let r = match self.operand(a)? {
            Operand::Register(r) => r,
            Operand::Literal(_) => {
                return Err(VmError::InvalidWriteTarget {
                    ip: self.ip,
                    operand: a,
                })
            }
        };
        let val = self.value(b)?;
        self.store(Target::Register(r), val as u32);
        Ok(Flow::Next)
    }

    fn mnemonic_push(&mut self, [a, _, _]: Args) -> Result<Flow, VmError> {
        let val = self.value(a)?;
        self.stack.push(val);
        Ok(Flow::Next)
    }

    fn mnemonic_pop(&mut self, [a, _, _]: Args) -> Result<Flow, VmError> {
        let target = self.target(a)?;
        let val = self
            .stack
            .pop()
            .ok_or(VmError::StackUnderflow { ip: self.ip })?;
        self.store(target, val as u32);
        Ok(Flow::Next)
    }

    fn mnemonic_binary<F>(&mut self, [a, b, c]: Args, func: F) -> Result<Flow, VmError>
    where
        F: Fn(u32, u32) -> u32,
    {
        let target = self.target(a)?;
        let b = self.value(b)? as u32;
        let c = self.value(c)? as u32;
        self.store(target, func(b, c));
        Ok(Flow::Next)
    }

    fn mnemonic_branch<F>(&mut self, [a, b, _]: Args, taken: F) -> Result<Flow, VmError>
    where
        F: Fn(u16) -> bool,
    {
        if taken(self.value(a)?) {
            return Ok(Flow::Jump(self.value(b)?));
        }
        Ok(Flow::Next)
    }

    fn mnemonic_mod(&mut self, args: Args) -> Result<Flow, VmError> {
        if self.value(args[2])? == 0 {
            return Err(VmError::DivisionByZero { ip: self.ip });
        }
        self.mnemonic_binary(args, |b, c| b % c)
    }

    fn mnemonic_not(&mut self, [a, b, _]: Args) -> Result<Flow, VmError> {
        let target = self.target(a)?;
        let val = !self.value(b)? & 0x7fff;
        self.store(target, val as u32);
        Ok(Flow::Next)
    }

    fn mnemonic_rmem(&mut self, [a, b, _]: Args) -> Result<Flow, VmError> {
        let target = self.target(a)?;
        let addr = self.value(b)?;
        let val = self.fetch(addr as usize)?;
        self.store(target, val as u32);
        Ok(Flow::Next)
    }

    fn mnemonic_wmem(&mut self, [a, b, _]: Args) -> Result<Flow, VmError> {
        let addr = self.value(a)?;
        let val = self.value(b)?;
        self.store(Target::Memory(addr), val as u32);
        Ok(Flow::Next)
    }

    fn mnemonic_call(&mut self, [a, _, _]: Args) -> Result<Flow, VmError> {
        let dest = self.value(a)?;
        self.stack.push(wrap(self.ip as u32 + 2));
        Ok(Flow::Jump(dest))
    }

    fn mnemonic_ret(&mut self) -> Flow {
        match self.stack.pop() {
            Some(addr) => Flow::Jump(addr),
            None => Flow::Halt(HaltReason::EmptyReturn),
        }
    }

    fn mnemonic_out<C: Console + ?Sized>(
        &mut self,
        [a, _, _]: Args,
        console: &mut C,
    ) -> Result<Flow, VmError> {
        console.write_char(self.value(a)?)?;
        Ok(Flow::Next)
    }

    fn mnemonic_in<C: Console + ?Sized>(
        &mut self,
        [a, _, _]: Args,
        console: &mut C,
    ) -> Result<Flow, VmError> {
        let target = self.target(a)?;
        while self.input.is_empty() {
            match console.read_line()? {
                Some(line) => self.input.extend(line),
                None => return Err(VmError::InputExhausted { ip: self.ip }),
            }
        }
        if let Some(code) = self.input.pop_front() {
            self.store(target, code as u32);
        }
        Ok(Flow::Next)
    }

    /// One line of the execution log: position, instruction, registers and stack.
    pub fn trace_line(&self, opcode: OpCode, args: &[u16]) -> String {
        let operands: Vec<String> = (0..3)
            .map(|i| args.get(i).map_or_else(|| " ".repeat(5), |v| format!("{:>5}", v)))
            .collect();

        let printed = match (opcode, args.first()) {
            (OpCode::OUT, Some(&a)) => Operand::decode(a, self.config.operand_policy)
                .ok()
                .map(|operand| match operand {
                    Operand::Literal(val) => val,
                    Operand::Register(r) => self.register.read(r),
                })
                .and_then(|code| char::from_u32(code as u32))
                .map_or(' ', |ch| if ch.is_control() { ' ' } else { ch }),
            _ => ' ',
        };

        let columns = |values: &[u16]| {
            values
                .iter()
                .map(|v| format!("{:>5}", v))
                .collect::<Vec<_>>()
                .join(" ")
        };

        format!(
            "{:>5} {:>4}: {} {}  |  {}  |  {}",
            self.ip,
            opcode.mnemonic(),
            operands.join(" "),
            printed,
            columns(self.register.values()),
            columns(&self.stack)
        )
    }
}
