//! Terminal plumbing for the `in` and `out` opcodes.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

const NEWLINE: u16 = b'\n' as u16;

pub trait Console {
    /// Emits the character with code `code`.
    fn write_char(&mut self, code: u16) -> io::Result<()>;

    /// Blocks until a full line is available. The returned codes end with a
    /// newline. `None` means there is no more input.
    fn read_line(&mut self) -> io::Result<Option<Vec<u16>>>;
}

fn encode_line(line: &str) -> Vec<u16> {
    let mut codes: Vec<u16> = line
        .trim_end_matches(&['\n', '\r'][..])
        .encode_utf16()
        .collect();
    codes.push(NEWLINE);
    codes
}

/// Process stdin/stdout.
#[derive(Default)]
pub struct StdConsole;

impl StdConsole {
    pub fn new() -> Self {
        StdConsole
    }
}

impl Console for StdConsole {
    fn write_char(&mut self, code: u16) -> io::Result<()> {
        let ch = char::from_u32(code as u32).unwrap_or(char::REPLACEMENT_CHARACTER);
        let mut buf = [0; 4];
        io::stdout().write_all(ch.encode_utf8(&mut buf).as_bytes())
    }

    fn read_line(&mut self) -> io::Result<Option<Vec<u16>>> {
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(encode_line(&line)))
    }
}

/// Scripted input and captured output.
#[derive(Debug, Default, Clone)]
pub struct MemoryConsole {
    input: VecDeque<String>,
    output: Vec<u16>,
}

impl MemoryConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MemoryConsole {
            input: lines.into_iter().map(Into::into).collect(),
            output: Vec::new(),
        }
    }

    pub fn push_line(&mut self, line: impl Into<String>) {
        self.input.push_back(line.into());
    }

    pub fn output(&self) -> &[u16] {
        &self.output
    }

    pub fn output_string(&self) -> String {
        self.output
            .iter()
            .map(|&c| char::from_u32(c as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

impl Console for MemoryConsole {
    fn write_char(&mut self, code: u16) -> io::Result<()> {
        self.output.push(code);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<Vec<u16>>> {
        Ok(self.input.pop_front().map(|line| encode_line(&line)))
    }
}
