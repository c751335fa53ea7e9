use crate::{REGISTER_BASE, REGISTER_COUNT};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u16)]
pub enum R {
    _0,
    _1,
    _2,
    _3,
    _4,
    _5,
    _6,
    _7,
}

impl R {
    pub const ALL: [R; REGISTER_COUNT] = [R::_0, R::_1, R::_2, R::_3, R::_4, R::_5, R::_6, R::_7];

    /// Decodes a raw operand in `32768..=32775`.
    pub fn from_operand(raw: u16) -> Option<R> {
        raw.checked_sub(REGISTER_BASE)
            .and_then(|i| i.try_into().ok())
    }

    /// The raw operand encoding of this register.
    pub fn operand(self) -> u16 {
        REGISTER_BASE + self as u16
    }
}

impl TryFrom<u16> for R {
    type Error = String;

    fn try_from(val: u16) -> Result<Self, Self::Error> {
        R::from_u16(val).ok_or(format!("register index out of bound: {}", val))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Register([u16; REGISTER_COUNT]);

impl Register {
    pub fn new() -> Self {
        Register([0; REGISTER_COUNT])
    }

    pub fn write(&mut self, r: R, val: u16) {
        self.0[r as usize] = val;
    }

    pub fn read(&self, r: R) -> u16 {
        self.0[r as usize]
    }

    pub fn values(&self) -> &[u16; REGISTER_COUNT] {
        &self.0
    }
}

impl From<[u16; REGISTER_COUNT]> for Register {
    fn from(values: [u16; REGISTER_COUNT]) -> Self {
        Register(values)
    }
}
