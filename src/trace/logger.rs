use std::{fs::OpenOptions, io::Write, path::Path};

use parking_lot::Mutex;
use tracing::warn;

use crate::trace::trace::TraceEvent;

/// Appends trace events as JSON lines. A file that cannot be opened disables
/// tracing instead of failing the run.
pub struct TraceLogger {
    file: Option<Mutex<std::fs::File>>,
}

impl TraceLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path);

        match file {
            Ok(f) => Self {
                file: Some(Mutex::new(f)),
            },
            Err(error) => {
                warn!(path = %path.display(), %error, "could not open trace file");
                Self { file: None }
            }
        }
    }

    pub fn disabled() -> Self {
        Self { file: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn log(&self, event: &TraceEvent) {
        let Some(file) = &self.file else {
            return;
        };

        let json = match serde_json::to_string(event) {
            Ok(j) => j,
            Err(error) => {
                warn!(%error, "failed to serialize trace event");
                return;
            }
        };

        if let Err(error) = writeln!(file.lock(), "{}", json) {
            warn!(%error, "failed to write trace event");
        }
    }
}
