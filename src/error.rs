use std::io;
use thiserror::Error;

/// A fault raised while executing. The machine is halted before it is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error("stack underflow at ip {ip}")]
    StackUnderflow { ip: usize },

    #[error("operand {operand} at ip {ip} does not denote a register")]
    InvalidWriteTarget { ip: usize, operand: u16 },

    #[error("division by zero at ip {ip}")]
    DivisionByZero { ip: usize },

    /// Only raised under `OperandPolicy::Strict`.
    #[error("invalid operand value {value} at ip {ip}")]
    InvalidOperand { ip: usize, value: u16 },

    #[error("unknown opcode `{opcode}` at ip {ip}")]
    InvalidOpcode { ip: usize, opcode: u16 },

    #[error("address {0} is outside memory")]
    InvalidAddress(usize),

    #[error("input exhausted at ip {ip}")]
    InputExhausted { ip: usize },

    #[error("console error: {0}")]
    Io(String),

    #[error("machine is halted")]
    MachineHalted,
}

impl From<io::Error> for VmError {
    fn from(err: io::Error) -> Self {
        VmError::Io(err.to_string())
    }
}

/// Failures reading a program image or a snapshot.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("image has an odd number of bytes ({0})")]
    OddLength(usize),

    #[error("image holds {0} words, memory has room for 32768")]
    TooLarge(usize),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}
