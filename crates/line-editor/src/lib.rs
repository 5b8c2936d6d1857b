pub mod editor;
pub mod history;
pub mod keys;
pub mod multiline;
pub mod terminal;

pub use editor::{EditorError, LineEditor};
pub use history::History;
pub use keys::{parse_key, Key};
pub use multiline::MultiLineEditor;
pub use terminal::{PlatformTerminal, Terminal};
