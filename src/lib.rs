pub mod config;
pub mod console;
pub mod error;
pub mod loader;
pub mod operand;
pub mod register;
pub mod snapshot;
pub mod vm;

pub use config::{Config, OperandPolicy};
pub use console::{Console, MemoryConsole, StdConsole};
pub use error::{ImageError, VmError};
pub use register::R;
pub use vm::{HaltReason, Machine, OpCode, Status};

/// Number of addressable memory cells.
pub const MEMORY_SIZE: usize = 32768;

/// Every stored value lives in `0..MODULUS`.
pub const MODULUS: u32 = 32768;

/// Raw operand value of register 0.
pub const REGISTER_BASE: u16 = 32768;

pub const REGISTER_COUNT: usize = 8;

/// Reduces an intermediate result into the 15-bit value space.
pub fn wrap(val: u32) -> u16 {
    (val % MODULUS) as u16
}
