//! Platform-specific raw-mode terminal adapter (§4.4.5).

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::UnixTerminal as PlatformTerminal;

#[cfg(not(unix))]
mod fallback;
#[cfg(not(unix))]
pub use fallback::FallbackTerminal as PlatformTerminal;

use crate::EditorError;

/// A terminal capable of entering/leaving raw mode and doing unbuffered
/// byte I/O. Implementations never buffer input, to preserve exact byte
/// boundaries for the keystroke parser (§5 "Scoped acquisition").
pub trait Terminal {
    fn enable_raw_mode(&mut self) -> Result<(), EditorError>;
    fn disable_raw_mode(&mut self) -> Result<(), EditorError>;
    fn is_raw(&self) -> bool;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EditorError>;
    fn write(&mut self, buf: &[u8]) -> Result<(), EditorError>;
    fn write_string(&mut self, s: &str) -> Result<(), EditorError> {
        self.write(s.as_bytes())
    }
    fn get_size(&self) -> (u16, u16);
}
