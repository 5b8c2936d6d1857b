//! Black-box scenarios against `ez_line_editor`'s public API (spec §8
//! scenarios 5-6).

use std::collections::VecDeque;

use ez_line_editor::{parse_key, EditorError, History, Key, MultiLineEditor, Terminal};

#[test]
fn scenario_5_utf8_and_escape_keystrokes() {
    let emoji = [0xF0, 0x9F, 0x98, 0x80];
    assert_eq!(parse_key(&emoji, 4), (Key::Char('\u{1F600}'), 4));

    let up_arrow = [0x1b, 0x5b, 0x41];
    assert_eq!(parse_key(&up_arrow, 3), (Key::Up, 3));
}

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
fn scenario_6_multi_line_brace_balance_ends_session() {
    let mut script = Vec::new();
    script.extend_from_slice(b"do f() {\r");
    script.extend_from_slice(b"return 1\r");
    script.extend_from_slice(b"}\r");
    let term = FakeTerminal::scripted(&script);

    let mut editor = MultiLineEditor::with_history(term, History::new(10));
    let result = editor.read_multi_line("> ", ".. ", "").unwrap();

    assert_eq!(result, "do f() {\nreturn 1\n}");
}
