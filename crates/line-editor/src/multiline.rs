//! Multi-line raw-mode edit loop (§4.4.4): same key vocabulary as the
//! single-line loop, extended to a vector of lines.

use crate::editor::EditorError;
use crate::history::History;
use crate::keys::{parse_key, Key};
use crate::terminal::Terminal;

fn brace_balance(lines: &[Vec<char>]) -> i64 {
    let mut balance = 0i64;
    for line in lines {
        for &c in line {
            match c {
                '{' => balance += 1,
                '}' => balance -= 1,
                _ => {}
            }
        }
    }
    balance
}

/// A multi-line readline-style editor over a raw-mode [`Terminal`].
pub struct MultiLineEditor<T: Terminal> {
    term: T,
    history: History,
    lines: Vec<Vec<char>>,
    cur_line: usize,
    cur_col: usize,
}

impl<T: Terminal> MultiLineEditor<T> {
    pub fn new(term: T) -> Self {
        Self::with_history(term, History::from_env())
    }

    pub fn with_history(term: T, history: History) -> Self {
        Self {
            term,
            history,
            lines: vec![Vec::new()],
            cur_line: 0,
            cur_col: 0,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn close(&mut self) {
        let _ = self.term.disable_raw_mode();
    }

    /// Read a (possibly multi-line) block. `prompt` is shown on the first
    /// line, `continue_prompt` on every continuation line. `initial`
    /// seeds the first line's text.
    pub fn read_multi_line(
        &mut self,
        prompt: &str,
        continue_prompt: &str,
        initial: &str,
    ) -> Result<String, EditorError> {
        if self.term.enable_raw_mode().is_err() {
            tracing::warn!("raw mode unavailable, falling back to line-buffered input");
            return self.read_multi_line_fallback(prompt, continue_prompt, initial);
        }
        let result = self.read_multi_line_raw(prompt, continue_prompt, initial);
        let _ = self.term.disable_raw_mode();
        result
    }

    fn read_multi_line_fallback(
        &mut self,
        prompt: &str,
        continue_prompt: &str,
        initial: &str,
    ) -> Result<String, EditorError> {
        self.term.write_string(prompt)?;
        let mut lines: Vec<String> = vec![initial.to_string()];
        loop {
            let mut line = String::new();
            loop {
                let mut byte = [0u8; 1];
                let n = self.term.read(&mut byte)?;
                if n == 0 {
                    let joined = lines.join("\n");
                    return if joined.is_empty() {
                        Err(EditorError::Eof)
                    } else {
                        Ok(joined)
                    };
                }
                match byte[0] {
                    b'\n' => break,
                    b'\r' => {}
                    b => line.push(b as char),
                }
            }
            let had_initial = lines.len() == 1 && lines[0] == initial;
            if had_initial {
                lines[0].push_str(&line);
            } else {
                lines.push(line);
            }
            let char_lines: Vec<Vec<char>> = lines.iter().map(|l| l.chars().collect()).collect();
            if brace_balance(&char_lines) == 0 {
                let joined = lines.join("\n");
                self.history.add(joined.clone());
                return Ok(joined);
            }
            self.term.write_string(continue_prompt)?;
        }
    }

    fn read_multi_line_raw(
        &mut self,
        prompt: &str,
        continue_prompt: &str,
        initial: &str,
    ) -> Result<String, EditorError> {
        self.lines = vec![initial.chars().collect()];
        self.cur_line = 0;
        self.cur_col = self.lines[0].len();
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
                if let Some(text) = self.handle_key(continue_prompt, key)? {
                    return Ok(text);
                }
            }
        }
    }

    fn current_line_len(&self) -> usize {
        self.lines[self.cur_line].len()
    }

    fn is_buffer_empty(&self) -> bool {
        self.lines.len() == 1 && self.lines[0].is_empty()
    }

    fn handle_key(
        &mut self,
        continue_prompt: &str,
        key: Key,
    ) -> Result<Option<String>, EditorError> {
        match key {
            Key::Enter => {
                if brace_balance(&self.lines) == 0 {
                    self.term.write_string("\r\n")?;
                    let joined = self.joined_text();
                    self.history.add(joined.clone());
                    return Ok(Some(joined));
                }
                self.term.write_string("\r\n")?;
                self.term.write_string(continue_prompt)?;
                let rest = self.lines[self.cur_line].split_off(self.cur_col);
                self.lines.insert(self.cur_line + 1, rest);
                self.cur_line += 1;
                self.cur_col = 0;
            }
            Key::CtrlC => {
                self.term.write_string("^C\r\n")?;
                return Err(EditorError::Interrupted);
            }
            Key::CtrlD => {
                if self.is_buffer_empty() {
                    self.term.write_string("\r\n")?;
                    return Err(EditorError::Eof);
                }
                self.delete_at_cursor()?;
            }
            Key::CtrlL => {
                self.term.write_string("\x1b[H\x1b[2J")?;
            }
            Key::Backspace => {
                if self.cur_col > 0 {
                    self.cur_col -= 1;
                    self.lines[self.cur_line].remove(self.cur_col);
                    self.redraw_current_line()?;
                }
                // no-op at column 0: no merge with the previous line (§9).
            }
            Key::Delete => self.delete_at_cursor()?,
            Key::Left => {
                if self.cur_col > 0 {
                    self.cur_col -= 1;
                    self.term.write_string("\x1b[D")?;
                }
            }
            Key::Right => {
                if self.cur_col < self.current_line_len() {
                    self.cur_col += 1;
                    self.term.write_string("\x1b[C")?;
                }
            }
            Key::Home => {
                self.cur_col = 0;
                self.term.write_string("\x1b[1G")?;
            }
            Key::End => {
                self.cur_col = self.current_line_len();
                self.term
                    .write_string(&format!("\x1b[{}G", self.cur_col + 1))?;
            }
            Key::Up => {
                if self.cur_line > 0 {
                    self.cur_line -= 1;
                    self.cur_col = self.cur_col.min(self.current_line_len());
                    self.term.write_string("\x1b[A")?;
                    self.term
                        .write_string(&format!("\x1b[{}G", self.cur_col + 1))?;
                }
            }
            Key::Down => {
                if self.cur_line + 1 < self.lines.len() {
                    self.cur_line += 1;
                    self.cur_col = self.cur_col.min(self.current_line_len());
                    self.term.write_string("\x1b[B")?;
                    self.term
                        .write_string(&format!("\x1b[{}G", self.cur_col + 1))?;
                }
            }
            Key::Tab => {
                self.lines[self.cur_line].splice(self.cur_col..self.cur_col, [' ', ' ']);
                self.cur_col += 2;
                self.redraw_current_line()?;
            }
            Key::Char(c) => {
                self.lines[self.cur_line].insert(self.cur_col, c);
                self.cur_col += 1;
                self.redraw_current_line()?;
            }
            Key::Unknown => {}
        }
        Ok(None)
    }

    fn delete_at_cursor(&mut self) -> Result<(), EditorError> {
        if self.cur_col < self.current_line_len() {
            self.lines[self.cur_line].remove(self.cur_col);
            self.redraw_current_line()?;
        }
        // no-op at the line's end: no merge with the next line (§9).
        Ok(())
    }

    fn redraw_current_line(&mut self) -> Result<(), EditorError> {
        let tail: String = self.lines[self.cur_line][self.cur_col..].iter().collect();
        self.term.write_string(&tail)?;
        self.term.write_string(" \x08")?;
        let back = self.current_line_len().saturating_sub(self.cur_col);
        if back > 0 {
            self.term.write_string(&format!("\x1b[{back}D"))?;
        }
        Ok(())
    }

    fn joined_text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

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
    fn multi_line_brace_balance_ends_session_when_balanced() {
        // "do f() {" Enter "return 1" Enter "}" Enter
        let mut script = Vec::new();
        script.extend_from_slice(b"do f() {\r");
        script.extend_from_slice(b"return 1\r");
        script.extend_from_slice(b"}\r");
        let term = FakeTerminal::scripted(&script);
        let mut editor = MultiLineEditor::with_history(term, History::new(10));
        let result = editor.read_multi_line("> ", ".. ", "").unwrap();
        assert_eq!(result, "do f() {\nreturn 1\n}");
    }

    #[test]
    fn enter_with_unbalanced_braces_continues_the_session() {
        let term = FakeTerminal::scripted(b"{\r}\r");
        let mut editor = MultiLineEditor::with_history(term, History::new(10));
        let result = editor.read_multi_line("> ", ".. ", "").unwrap();
        assert_eq!(result, "{\n}");
    }

    #[test]
    fn backspace_at_column_zero_does_not_merge_lines() {
        let term = FakeTerminal::scripted(b"{\r\x7f}\r");
        let mut editor = MultiLineEditor::with_history(term, History::new(10));
        let result = editor.read_multi_line("> ", ".. ", "").unwrap();
        assert_eq!(result, "{\n}");
    }

    #[test]
    fn delete_at_line_end_does_not_merge_lines() {
        let term = FakeTerminal::scripted(&[
            b'{', b'\r', 0x1b, b'[', b'3', b'~', b'}', b'\r',
        ]);
        let mut editor = MultiLineEditor::with_history(term, History::new(10));
        let result = editor.read_multi_line("> ", ".. ", "").unwrap();
        assert_eq!(result, "{\n}");
    }
}
