//! Standard I/O for the running VM.
//!
//! Input is line-buffered: `inc` takes the first character of a line,
//! `ini` requires a whole line of decimal digits. Prompts go to stderr
//! so program output on stdout stays clean. Each write emits one line.

use colorvm_core::vm::{Channel, ChannelIo};
use std::io::{self, BufRead, Write};

pub struct StdIo;

impl StdIo {
    pub fn new() -> StdIo {
        StdIo
    }

    /// Prompt on stderr, then read one line (newline stripped).
    /// `None` on EOF or a read error.
    fn read_line(&mut self, prompt: &str) -> Option<String> {
        eprint!("{prompt}");
        let _ = io::stderr().flush();
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Some(line)
            }
        }
    }
}

impl ChannelIo for StdIo {
    fn read_char(&mut self, ch: Channel) -> Option<char> {
        let line = self.read_line(&format!("Char input for channel '{ch}': "))?;
        line.chars().next()
    }

    fn read_int(&mut self, ch: Channel) -> Option<i64> {
        let line = self.read_line(&format!("Integer input for channel '{ch}': "))?;
        // Unsigned decimal only; anything else (including values past
        // i64) pushes nothing.
        if !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit()) {
            line.parse().ok()
        } else {
            None
        }
    }

    fn write_char(&mut self, c: char) {
        println!("{c}");
    }

    fn write_int(&mut self, n: i64) {
        println!("{n}");
    }
}
