//! Unix (Linux/macOS) termios-based raw-mode terminal (§4.4.5).
//!
//! The flag set is identical across both targets; `libc::TIOCGWINSZ` is
//! already the correct ioctl request number per target, so Linux and
//! macOS share this one implementation rather than duplicating it behind
//! a `cfg(target_os = ...)` split.

use std::os::unix::io::RawFd;

use super::Terminal;
use crate::EditorError;

pub struct UnixTerminal {
    fd: RawFd,
    original: Option<libc::termios>,
}

impl UnixTerminal {
    pub fn new() -> Self {
        Self {
            fd: libc::STDIN_FILENO,
            original: None,
        }
    }

    fn last_os_error() -> EditorError {
        EditorError::Io(std::io::Error::last_os_error())
    }
}

impl Default for UnixTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal for UnixTerminal {
    fn enable_raw_mode(&mut self) -> Result<(), EditorError> {
        if self.original.is_some() {
            return Ok(());
        }

        let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
        // SAFETY: fd is a valid terminal descriptor (stdin); termios is a
        // properly sized out-param for tcgetattr.
        if unsafe { libc::tcgetattr(self.fd, &mut termios) } != 0 {
            return Err(Self::last_os_error());
        }
        let original = termios;

        let mut raw = termios;
        raw.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
        raw.c_oflag &= !libc::OPOST;
        raw.c_cflag |= libc::CS8;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;

        // SAFETY: fd and raw are both valid; TCSAFLUSH discards unread
        // input rather than racing with it.
        if unsafe { libc::tcsetattr(self.fd, libc::TCSAFLUSH, &raw) } != 0 {
            return Err(Self::last_os_error());
        }
        self.original = Some(original);
        Ok(())
    }

    fn disable_raw_mode(&mut self) -> Result<(), EditorError> {
        let Some(original) = self.original.take() else {
            return Ok(());
        };
        // SAFETY: fd is valid; original was captured from a prior
        // successful tcgetattr.
        if unsafe { libc::tcsetattr(self.fd, libc::TCSAFLUSH, &original) } != 0 {
            let err = Self::last_os_error();
            tracing::warn!(%err, "failed to restore terminal mode");
            return Err(err);
        }
        Ok(())
    }

    fn is_raw(&self) -> bool {
        self.original.is_some()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, EditorError> {
        // SAFETY: buf is a valid, uniquely-borrowed buffer of the given
        // length; this is a direct, unbuffered read to preserve byte
        // boundaries for the keystroke parser.
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            return Err(Self::last_os_error());
        }
        Ok(n as usize)
    }

    fn write(&mut self, buf: &[u8]) -> Result<(), EditorError> {
        let mut written = 0;
        while written < buf.len() {
            // SAFETY: buf[written..] is a valid slice of the remaining
            // length for this write.
            let n = unsafe {
                libc::write(
                    libc::STDOUT_FILENO,
                    buf[written..].as_ptr() as *const libc::c_void,
                    buf.len() - written,
                )
            };
            if n < 0 {
                return Err(Self::last_os_error());
            }
            written += n as usize;
        }
        Ok(())
    }

    fn get_size(&self) -> (u16, u16) {
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        // SAFETY: stdout is a valid fd; ws is a properly sized out-param.
        let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
        if rc != 0 || ws.ws_col == 0 {
            return (80, 24);
        }
        (ws.ws_col, ws.ws_row)
    }
}

impl Drop for UnixTerminal {
    fn drop(&mut self) {
        // Best-effort restore on every exit path, including unwinding
        // panics (§5 "Scoped acquisition").
        let _ = self.disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_terminal_is_not_raw() {
        let term = UnixTerminal::new();
        assert!(!term.is_raw());
    }

    #[test]
    fn get_size_never_reports_zero_columns() {
        let term = UnixTerminal::new();
        let (cols, rows) = term.get_size();
        assert!(cols > 0);
        assert!(rows > 0);
    }
}
