//! Non-Unix fallback terminal: raw mode is unsupported, so the editor
//! falls back to line-buffered input (§4.4.5).

use std::io::Read;

use super::Terminal;
use crate::EditorError;

pub struct FallbackTerminal {
    raw: bool,
}

impl FallbackTerminal {
    pub fn new() -> Self {
        Self { raw: false }
    }
}

impl Default for FallbackTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for FallbackTerminal {
    fn enable_raw_mode(&mut self) -> Result<(), EditorError> {
        Err(EditorError::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "raw mode is not supported on this platform",
        )))
    }

    fn disable_raw_mode(&mut self) -> Result<(), EditorError> {
        self.raw = false;
        Ok(())
    }

    fn is_raw(&self) -> bool {
        self.raw
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EditorError> {
        std::io::stdin()
            .read(buf)
            .map_err(EditorError::Io)
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), EditorError> {
        use std::io::Write;
        std::io::stdout().write_all(buf).map_err(EditorError::Io)
    }

    fn get_size(&self) -> (u16, u16) {
        (80, 24)
    }
}
