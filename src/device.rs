//! Character I/O capabilities consumed by the `getc`, `putc` and `print`
//! rules. The engine sees nothing but this trait; the process streams and
//! the in-memory test double both live here.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

pub trait Device {
    /// Read one byte; `None` signals end of stream. Blocks as long as the
    /// underlying stream does.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Write one byte to the output stream.
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Diagnostic sink for `print`: one line of text, line break supplied
    /// by the device.
    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

/// Process stdin/stdout.
pub struct StdDevice;

impl Device for StdDevice {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match io::stdin().lock().read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(&[byte])?;
        // The next reduction step may block on stdin; don't sit on output.
        out.flush()
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

/// Scripted input and captured output, for tests and embedders.
#[derive(Debug, Default)]
pub struct MemoryDevice {
    input: VecDeque<u8>,
    pub output: Vec<u8>,
    pub lines: Vec<String>,
}

impl MemoryDevice {
    pub fn new(input: &[u8]) -> Self {
        MemoryDevice {
            input: input.iter().copied().collect(),
            output: Vec::new(),
            lines: Vec::new(),
        }
    }
}

impl Device for MemoryDevice {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.output.push(byte);
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.lines.push(line.to_string());
        Ok(())
    }
}
