//! Operand decoding.
//!
//! A raw operand cell is either a literal (`0..=32767`) or a register
//! reference (`32768..=32775`). Whether it is read as a value or used as a
//! write target is decided by the opcode, so decoding happens at every read.

use crate::config::OperandPolicy;
use crate::register::R;
use crate::{wrap, MODULUS, REGISTER_BASE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Literal(u16),
    Register(R),
}

/// Where a result is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Register(R),
    Memory(u16),
}

/// Raw value that failed to decode under `OperandPolicy::Strict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfRange(pub u16);

impl Operand {
    pub fn decode(raw: u16, policy: OperandPolicy) -> Result<Operand, OutOfRange> {
        if (raw as u32) < MODULUS {
            return Ok(Operand::Literal(raw));
        }
        if let Some(r) = R::from_operand(raw) {
            return Ok(Operand::Register(r));
        }
        match policy {
            OperandPolicy::Wrap => Ok(Operand::Literal(wrap(raw as u32))),
            OperandPolicy::Strict => Err(OutOfRange(raw)),
        }
    }

    pub fn target(self) -> Target {
        match self {
            Operand::Literal(addr) => Target::Memory(addr),
            Operand::Register(r) => Target::Register(r),
        }
    }
}

/// Whether `raw` needs normalizing, i.e. lies above the register range.
pub fn out_of_range(raw: u16) -> bool {
    raw >= REGISTER_BASE && R::from_operand(raw).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_and_register_ranges() {
        let p = OperandPolicy::Wrap;
        assert_eq!(Operand::decode(0, p), Ok(Operand::Literal(0)));
        assert_eq!(Operand::decode(32767, p), Ok(Operand::Literal(32767)));
        assert_eq!(Operand::decode(32768, p), Ok(Operand::Register(R::_0)));
        assert_eq!(Operand::decode(32775, p), Ok(Operand::Register(R::_7)));
    }

    #[test]
    fn wrap_policy_normalizes() {
        let p = OperandPolicy::Wrap;
        assert_eq!(Operand::decode(32776, p), Ok(Operand::Literal(8)));
        assert_eq!(Operand::decode(65535, p), Ok(Operand::Literal(32767)));
    }

    #[test]
    fn strict_policy_rejects() {
        let p = OperandPolicy::Strict;
        assert_eq!(Operand::decode(32776, p), Err(OutOfRange(32776)));
        assert_eq!(Operand::decode(32775, p), Ok(Operand::Register(R::_7)));
    }

    #[test]
    fn targets() {
        assert_eq!(Operand::Literal(42).target(), Target::Memory(42));
        assert_eq!(Operand::Register(R::_2).target(), Target::Register(R::_2));
        assert!(out_of_range(40000));
        assert!(!out_of_range(32770));
        assert!(!out_of_range(12));
    }
}
