use synacor::snapshot::Snapshot;
use synacor::{loader, Config, HaltReason, Machine, MemoryConsole, VmError, R};
use tempfile::tempdir;

fn to_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

fn run_image(bytes: &[u8], input: &[&str]) -> (Result<HaltReason, VmError>, String) {
    let image = loader::decode(bytes).unwrap();
    let mut vm = Machine::boot(&image, Config::default()).unwrap();
    let mut console = MemoryConsole::with_input(input.iter().copied());
    let result = vm.run(&mut console);
    (result, console.output_string())
}

/// Echoes every line back upper-cased, forever.
fn shout() -> Vec<u16> {
    vec![
        20, 32768, // 0: in r0
        4, 32769, 32768, 10, // 2: eq r1 r0 '\n'
        7, 32769, 22, // 6: jt r1 22
        5, 32770, 32768, 96, // 9: gt r2 r0 '`'
        8, 32770, 20, // 13: jf r2 20
        9, 32768, 32768, 32736, // 16: add r0 r0 -32
        19, 32768, // 20: out r0
        6, 0, // 22: jmp 0
    ]
}

#[test]
fn hello() {
    let (result, output) = run_image(&to_bytes(&[19, 72, 0]), &[]);
    assert_eq!(result, Ok(HaltReason::Opcode));
    assert_eq!(output, "H");
}

#[test]
fn arithmetic_program() {
    // push 6; push 5; pop r1; pop r0; add r0 r0 r1; out r0; halt
    let program = [2, 6, 2, 5, 3, 32769, 3, 32768, 9, 32768, 32768, 32769, 19, 32768, 0];
    let (result, output) = run_image(&to_bytes(&program), &[]);
    assert_eq!(result, Ok(HaltReason::Opcode));
    assert_eq!(output, "\u{b}");
}

#[test]
fn register_words_survive_loading() {
    // add r0 r1 'D'; out r0; halt
    let (result, output) = run_image(&to_bytes(&[9, 32768, 32769, 68, 19, 32768, 0]), &[]);
    assert_eq!(result, Ok(HaltReason::Opcode));
    assert_eq!(output, "D");
}

#[test]
fn underflow_stops_output() {
    let (result, output) = run_image(&to_bytes(&[3, 32768, 19, 65, 0]), &[]);
    assert_eq!(result, Err(VmError::StackUnderflow { ip: 0 }));
    assert!(output.is_empty());
}

#[test]
fn interactive_program() {
    let program = to_bytes(&shout());
    let (result, output) = run_image(&program, &["hello, vm", "ok"]);
    assert!(matches!(result, Err(VmError::InputExhausted { .. })));
    assert_eq!(output, "HELLO, VMOK");
}

#[test]
fn execution_is_deterministic() {
    let program = to_bytes(&shout());
    let first = run_image(&program, &["abc", "xyz"]);
    for _ in 0..3 {
        assert_eq!(run_image(&program, &["abc", "xyz"]), first);
    }
}

#[test]
fn resume_from_saved_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("vm.json");

    let image = shout();
    let mut vm = Machine::boot(&image, Config::default()).unwrap();
    let mut console = MemoryConsole::with_input(["ab"]);
    while console.output().is_empty() {
        vm.step(&mut console).unwrap();
    }
    assert_eq!(console.output_string(), "A");
    vm.snapshot().save(&path).unwrap();

    let mut resumed = Machine::restore(Snapshot::load(&path).unwrap(), Config::default()).unwrap();
    let mut console = MemoryConsole::with_input(["c"]);
    assert!(resumed.run(&mut console).is_err());
    assert_eq!(console.output_string(), "BC");
    assert_eq!(resumed.register(R::_0), 10);
}

#[test]
fn image_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("challenge.bin");
    std::fs::write(&path, to_bytes(&[19, 72, 19, 105, 0])).unwrap();

    let image = loader::load_file(&path).unwrap();
    let mut vm = Machine::boot(&image, Config::default()).unwrap();
    let mut console = MemoryConsole::new();
    assert_eq!(vm.run(&mut console), Ok(HaltReason::Opcode));
    assert_eq!(console.output_string(), "Hi");
}
