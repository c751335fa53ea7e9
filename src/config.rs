//! Machine configuration.

/// How operand cells above the register range (`32776..=65535`) are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperandPolicy {
    /// Reduce modulo 32768 and use the result as a literal.
    #[default]
    Wrap,
    /// Fault with `VmError::InvalidOperand`.
    Strict,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub operand_policy: OperandPolicy,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Config {
            operand_policy: OperandPolicy::Strict,
        }
    }
}
