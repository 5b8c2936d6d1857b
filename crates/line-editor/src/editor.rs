//! Single-line raw-mode edit loop (§4.4.3) and the shared editor error type.

use std::fmt;

use crate::history::History;
use crate::keys::{parse_key, Key};
use crate::terminal::Terminal;

/// Errors surfaced to the REPL driver (§6, §7).
#[derive(Debug)]
pub enum EditorError {
    /// Ctrl-C, at any point in the buffer.
    Interrupted,
    /// Ctrl-D on an empty buffer.
    Eof,
    Io(std::io::Error),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorError::Interrupted => write!(f, "interrupted"),
            EditorError::Eof => write!(f, "end of input"),
            EditorError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EditorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EditorError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EditorError {
    fn from(e: std::io::Error) -> Self {
        EditorError::Io(e)
    }
}

/// A single-line readline-style editor over a raw-mode [`Terminal`].
pub struct LineEditor<T: Terminal> {
    term: T,
    history: History,
    buffer: Vec<char>,
    cursor: usize,
}

impl<T: Terminal> LineEditor<T> {
    pub fn new(term: T) -> Self {
        Self::with_history(term, History::from_env())
    }

    pub fn with_history(term: T, history: History) -> Self {
        Self {
            term,
            history,
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn close(&mut self) {
        let _ = self.term.disable_raw_mode();
    }

    /// Read one line. Raw mode is entered on start and unconditionally
    /// restored on every return path (§4.4.3, §5). If raw mode cannot be
    /// entered, falls back to unedited line-buffered input.
    pub fn read_line(&mut self, prompt: &str) -> Result<String, EditorError> {
        if self.term.enable_raw_mode().is_err() {
            tracing::warn!("raw mode unavailable, falling back to line-buffered input");
            return self.read_line_fallback(prompt);
        }

        let result = self.read_line_raw(prompt);
        let _ = self.term.disable_raw_mode();
        result
    }

    fn read_line_fallback(&mut self, prompt: &str) -> Result<String, EditorError> {
        self.term.write_string(prompt)?;
        let mut line = String::new();
        loop {
            let mut byte = [0u8; 1];
            let n = self.term.read(&mut byte)?;
            if n == 0 {
                return if line.is_empty() {
                    Err(EditorError::Eof)
                } else {
                    Ok(line)
                };
            }
            match byte[0] {
                b'\n' => break,
                b'\r' => {}
                b => line.push(b as char),
            }
        }
        self.history.add(line.clone());
        Ok(line)
    }

    fn read_line_raw(&mut self, prompt: &str) -> Result<String, EditorError> {
        self.buffer.clear();
        self.cursor = 0;
        self.term.write_string(prompt)?;

        let mut chunk = [0u8; 32];
        loop {
            let n = self.term.read(&mut chunk)?;
            if n == 0 {
                return Err(EditorError::Eof);
            }
            let mut pos = 0;
            while pos < n {
                let (key, consumed) = parse_key(&chunk[pos..n], n - pos);
                pos += consumed.max(1);
                if let Some(line) = self.handle_key(prompt, key)? {
                    return Ok(line);
                }
            }
        }
    }

    fn handle_key(&mut self, prompt: &str, key: Key) -> Result<Option<String>, EditorError> {
        match key {
            Key::Enter => {
                self.term.write_string("\r\n")?;
                let line: String = self.buffer.iter().collect();
                self.history.add(line.clone());
                return Ok(Some(line));
            }
            Key::CtrlC => {
                self.term.write_string("^C\r\n")?;
                return Err(EditorError::Interrupted);
            }
            Key::CtrlD => {
                if self.buffer.is_empty() {
                    self.term.write_string("\r\n")?;
                    return Err(EditorError::Eof);
                }
                self.delete_at_cursor()?;
            }
            Key::CtrlL => {
                self.term.write_string("\x1b[H\x1b[2J")?;
                self.term.write_string(prompt)?;
                self.redraw_buffer()?;
            }
            Key::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.buffer.remove(self.cursor);
                    self.redraw_tail()?;
                }
            }
            Key::Delete => self.delete_at_cursor()?,
            Key::Left => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.term.write_string("\x1b[D")?;
                }
            }
            Key::Right => {
                if self.cursor < self.buffer.len() {
                    self.cursor += 1;
                    self.term.write_string("\x1b[C")?;
                }
            }
            Key::Home => {
                if self.cursor > 0 {
                    self.term.write_string(&format!("\x1b[{}D", self.cursor))?;
                    self.cursor = 0;
                }
            }
            Key::End => {
                let remaining = self.buffer.len() - self.cursor;
                if remaining > 0 {
                    self.term.write_string(&format!("\x1b[{remaining}C"))?;
                    self.cursor = self.buffer.len();
                }
            }
            Key::Up => {
                let current: String = self.buffer.iter().collect();
                if let Some(entry) = self.history.previous(&current) {
                    self.replace_buffer(prompt, &entry)?;
                }
            }
            Key::Down => {
                if let Some(entry) = self.history.next() {
                    self.replace_buffer(prompt, &entry)?;
                }
            }
            Key::Tab => {
                self.buffer.splice(self.cursor..self.cursor, [' ', ' ']);
                let from = self.cursor;
                self.cursor += 2;
                self.redraw_tail_from(from)?;
            }
            Key::Char(c) => {
                self.buffer.insert(self.cursor, c);
                let from = self.cursor;
                self.cursor += 1;
                self.redraw_tail_from(from)?;
            }
            Key::Unknown => {}
        }
        Ok(None)
    }

    fn delete_at_cursor(&mut self) -> Result<(), EditorError> {
        if self.cursor < self.buffer.len() {
            self.buffer.remove(self.cursor);
            self.redraw_tail()?;
        }
        Ok(())
    }

    fn redraw_tail(&mut self) -> Result<(), EditorError> {
        self.redraw_tail_from(self.cursor)
    }

    fn redraw_tail_from(&mut self, from: usize) -> Result<(), EditorError> {
        let tail: String = self.buffer[from..].iter().collect();
        self.term.write_string(&tail)?;
        self.term.write_string(" \x08")?;
        let back = self.buffer.len().saturating_sub(self.cursor);
        if back > 0 {
            self.term.write_string(&format!("\x1b[{back}D"))?;
        }
        Ok(())
    }

    fn redraw_buffer(&mut self) -> Result<(), EditorError> {
        let text: String = self.buffer.iter().collect();
        self.term.write_string(&text)?;
        let back = self.buffer.len().saturating_sub(self.cursor);
        if back > 0 {
            self.term.write_string(&format!("\x1b[{back}D"))?;
        }
        Ok(())
    }

    fn replace_buffer(&mut self, prompt: &str, entry: &str) -> Result<(), EditorError> {
        self.term.write_string("\r\x1b[K")?;
        self.term.write_string(prompt)?;
        self.term.write_string(entry)?;
        self.buffer = entry.chars().collect();
        self.cursor = self.buffer.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::Terminal;
    use std::collections::VecDeque;

    /// An in-memory terminal double: feeds scripted input bytes and
    /// records every byte written, so the edit loop can be driven without
    /// a real tty.
    struct FakeTerminal {
        input: VecDeque<u8>,
        output: Vec<u8>,
        raw: bool,
    }

    impl FakeTerminal {
        fn scripted(bytes: &[u8]) -> Self {
            Self {
                input: bytes.iter().copied().collect(),
                output: Vec::new(),
                raw: false,
            }
        }

        fn output(&self) -> String {
            String::from_utf8_lossy(&self.output).into_owned()
        }
    }

    impl Terminal for FakeTerminal {
        fn enable_raw_mode(&mut self) -> Result<(), EditorError> {
            self.raw = true;
            Ok(())
        }

        fn disable_raw_mode(&mut self) -> Result<(), EditorError> {
            self.raw = false;
            Ok(())
        }

        fn is_raw(&self) -> bool {
            self.raw
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, EditorError> {
            let mut n = 0;
            while n < buf.len() {
                match self.input.pop_front() {
                    Some(b) => {
                        buf[n] = b;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> Result<(), EditorError> {
            self.output.extend_from_slice(buf);
            Ok(())
        }

        fn get_size(&self) -> (u16, u16) {
            (80, 24)
        }
    }

    #[test]
    fn enter_returns_the_typed_line_and_records_history() {
        let term = FakeTerminal::scripted(b"hi\r");
        let mut editor = LineEditor::with_history(term, History::new(10));
        let result = editor.read_line("> ").unwrap();
        assert_eq!(result, "hi");
        assert_eq!(editor.history().entries(), vec!["hi".to_string()]);
    }

    #[test]
    fn ctrl_c_fails_with_interrupted() {
        let term = FakeTerminal::scripted(&[0x03]);
        let mut editor = LineEditor::with_history(term, History::new(10));
        assert!(matches!(editor.read_line("> "), Err(EditorError::Interrupted)));
    }

    #[test]
    fn ctrl_d_on_empty_buffer_fails_with_eof() {
        let term = FakeTerminal::scripted(&[0x04]);
        let mut editor = LineEditor::with_history(term, History::new(10));
        assert!(matches!(editor.read_line("> "), Err(EditorError::Eof)));
    }

    #[test]
    fn ctrl_d_on_nonempty_buffer_deletes_like_delete() {
        // "ab" then Left (move onto 'b'), then Ctrl-D deletes 'b', then Enter.
        let term = FakeTerminal::scripted(&[b'a', b'b', 0x1b, b'[', b'D', 0x04, b'\r']);
        let mut editor = LineEditor::with_history(term, History::new(10));
        let result = editor.read_line("> ").unwrap();
        assert_eq!(result, "a");
    }

    #[test]
    fn backspace_at_cursor_zero_is_a_noop() {
        let term = FakeTerminal::scripted(&[0x7f, b'x', b'\r']);
        let mut editor = LineEditor::with_history(term, History::new(10));
        let result = editor.read_line("> ").unwrap();
        assert_eq!(result, "x");
    }

    #[test]
    fn delete_at_end_is_a_noop() {
        let term = FakeTerminal::scripted(&[b'x', 0x1b, b'[', b'3', b'~', b'\r']);
        let mut editor = LineEditor::with_history(term, History::new(10));
        let result = editor.read_line("> ").unwrap();
        assert_eq!(result, "x");
    }

    #[test]
    fn tab_inserts_two_spaces() {
        let term = FakeTerminal::scripted(&[0x09, b'\r']);
        let mut editor = LineEditor::with_history(term, History::new(10));
        let result = editor.read_line("> ").unwrap();
        assert_eq!(result, "  ");
    }

    #[test]
    fn up_then_down_round_trips_through_history() {
        let mut history = History::new(10);
        history.add("first");
        // type "x", Up (recall "first"), Down (back to "x"), Enter.
        let term = FakeTerminal::scripted(&[b'x', 0x1b, b'[', b'A', 0x1b, b'[', b'B', b'\r']);
        let mut editor = LineEditor::with_history(term, history);
        let result = editor.read_line("> ").unwrap();
        assert_eq!(result, "x");
    }
}
