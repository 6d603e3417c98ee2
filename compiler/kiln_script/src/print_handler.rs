//! Print handler for configurable output.
//!
//! `print(x)` output goes to stdout in the interactive front end and to a
//! buffer in tests, so the engine writes through a shared handler.

use std::sync::Arc;

use parking_lot::Mutex;

/// Destination of `print` output.
pub enum PrintHandler {
    /// Writes to stdout (default).
    Stdout,
    /// Captures to a buffer.
    Buffer(Mutex<String>),
    /// Discards all output.
    Silent,
}

impl PrintHandler {
    /// Print a line (with newline).
    pub fn println(&self, msg: &str) {
        match self {
            Self::Stdout => println!("{msg}"),
            Self::Buffer(buf) => {
                let mut buf = buf.lock();
                buf.push_str(msg);
                buf.push('\n');
            }
            Self::Silent => {}
        }
    }

    /// Captured output; empty for handlers that don't capture.
    pub fn output(&self) -> String {
        match self {
            Self::Buffer(buf) => buf.lock().clone(),
            Self::Stdout | Self::Silent => String::new(),
        }
    }

    /// Clear captured output.
    pub fn clear(&self) {
        if let Self::Buffer(buf) = self {
            buf.lock().clear();
        }
    }
}

/// Shared print handler that can be passed around.
pub type SharedPrintHandler = Arc<PrintHandler>;

pub fn stdout_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Stdout)
}

pub fn buffer_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Buffer(Mutex::new(String::new())))
}

pub fn silent_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Silent)
}
