//! Diagnostics sink — the append-only audit trail for a run.
//!
//! Column discovery, validation warnings, and load failures are recorded
//! here rather than surfaced interactively. A sink must never fail the
//! run: the file-backed implementation swallows write errors.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

pub trait DiagnosticsSink {
    fn record(&self, message: &str);
}

/// Appends timestamped lines to a text file, creating the parent
/// directory on first use. Write failures are ignored.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DiagnosticsSink for FileSink {
    fn record(&self, message: &str) {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(file, "{stamp} - {message}");
        }
    }
}

/// Collects entries in memory, for test inspection.
#[derive(Default)]
pub struct MemorySink {
    entries: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

impl DiagnosticsSink for MemorySink {
    fn record(&self, message: &str) {
        self.entries.lock().unwrap().push(message.to_string());
    }
}

/// Discards everything.
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn record(&self, _message: &str) {}
}
