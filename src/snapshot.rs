//! Saving and resuming a machine.
//!
//! A snapshot holds everything `Machine` owns, including the unread rest of
//! the current input line, and is stored as JSON.

use crate::config::Config;
use crate::error::ImageError;
use crate::register::Register;
use crate::vm::Machine;
use crate::{MEMORY_SIZE, MODULUS, REGISTER_COUNT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub memory: Vec<u16>,
    pub registers: Vec<u16>,
    pub stack: Vec<u16>,
    pub ip: usize,
    pub running: bool,
    #[serde(default)]
    pub input: Vec<u16>,
}

impl Snapshot {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageError> {
        fs::write(path.as_ref(), serde_json::to_vec(self)?)?;
        log::info!("saved snapshot to {}", path.as_ref().display());
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Snapshot, ImageError> {
        let bytes = fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn validate(&self) -> Result<(), ImageError> {
        let invalid = |msg: String| -> Result<(), ImageError> { Err(ImageError::InvalidSnapshot(msg)) };

        if self.version != SNAPSHOT_VERSION {
            return invalid(format!("unsupported version {}", self.version));
        }
        if self.memory.len() != MEMORY_SIZE {
            return invalid(format!("memory holds {} cells", self.memory.len()));
        }
        if self.registers.len() != REGISTER_COUNT {
            return invalid(format!("{} registers", self.registers.len()));
        }
        if let Some(v) = self
            .registers
            .iter()
            .chain(self.stack.iter())
            .find(|&&v| v as u32 >= MODULUS)
        {
            return invalid(format!("value {} out of range", v));
        }
        Ok(())
    }
}

impl Machine {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            memory: self.memory.clone(),
            registers: self.register.values().to_vec(),
            stack: self.stack.clone(),
            ip: self.ip,
            running: self.running,
            input: self.input.iter().copied().collect(),
        }
    }

    pub fn restore(snapshot: Snapshot, config: Config) -> Result<Machine, ImageError> {
        snapshot.validate()?;

        let mut registers = [0; REGISTER_COUNT];
        registers.copy_from_slice(&snapshot.registers);

        log::info!("resuming at ip {}", snapshot.ip);
        Ok(Machine {
            memory: snapshot.memory,
            register: Register::from(registers),
            stack: snapshot.stack,
            ip: snapshot.ip,
            input: snapshot.input.into_iter().collect(),
            running: snapshot.running,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::MemoryConsole;
    use crate::register::R;
    use crate::vm::HaltReason;

    #[test]
    fn restore_continues_where_snapshot_was_taken() {
        // push 7; set r0 'x'; out r0; pop r1; halt
        let program = [2, 7, 1, 32768, 120, 19, 32768, 3, 32769, 0];
        let mut vm = Machine::boot(&program, Config::default()).unwrap();
        let mut console = MemoryConsole::new();
        vm.step(&mut console).unwrap();
        vm.step(&mut console).unwrap();

        let snapshot = vm.snapshot();
        assert_eq!(snapshot.ip, 5);
        assert_eq!(snapshot.stack, vec![7]);

        let mut resumed = Machine::restore(snapshot, Config::default()).unwrap();
        let mut console = MemoryConsole::new();
        assert_eq!(resumed.run(&mut console), Ok(HaltReason::Opcode));
        assert_eq!(console.output_string(), "x");
        assert_eq!(resumed.register(R::_1), 7);
    }

    #[test]
    fn pending_input_survives() {
        let program = [20, 32768, 20, 32769, 0];
        let mut vm = Machine::boot(&program, Config::default()).unwrap();
        let mut console = MemoryConsole::with_input(["q"]);
        vm.step(&mut console).unwrap();

        let snapshot = vm.snapshot();
        assert_eq!(snapshot.input, vec![10]);

        let mut resumed = Machine::restore(snapshot, Config::default()).unwrap();
        let mut console = MemoryConsole::new();
        assert_eq!(resumed.run(&mut console), Ok(HaltReason::Opcode));
        assert_eq!(resumed.register(R::_1), 10);
    }

    #[test]
    fn json_round_trip_preserves_state() {
        let vm = Machine::boot(&[19, 72, 0], Config::default()).unwrap();
        let json = serde_json::to_string(&vm.snapshot()).unwrap();
        let snapshot: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, vm.snapshot());
    }

    #[test]
    fn malformed_snapshots_are_rejected() {
        let vm = Machine::boot(&[0], Config::default()).unwrap();

        let mut short = vm.snapshot();
        short.memory.truncate(10);
        assert!(matches!(
            Machine::restore(short, Config::default()),
            Err(ImageError::InvalidSnapshot(_))
        ));

        let mut bad_stack = vm.snapshot();
        bad_stack.stack.push(40000);
        assert!(matches!(
            Machine::restore(bad_stack, Config::default()),
            Err(ImageError::InvalidSnapshot(_))
        ));

        let mut future = vm.snapshot();
        future.version = 2;
        assert!(Machine::restore(future, Config::default()).is_err());
    }
}
