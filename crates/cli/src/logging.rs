//! Tracing setup for the `descent` binary.
//!
//! The console gets `RUST_LOG` (default `info`). With `--verbose` a second
//! layer writes debug records of the workspace crates to a file that is
//! opened later, once the run directory exists.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const DEBUG_TARGETS: &str = "descent=debug,descent_core=debug,descent_engine=debug,\
descent_storage=debug,descent_llm=debug,descent_domains=debug";

/// Debug log file, attached once its directory is known. Writes before that
/// are dropped.
#[derive(Clone, Default)]
pub struct DebugLog {
    file: Arc<Mutex<Option<File>>>,
}

impl DebugLog {
    /// Start writing to `path`.
    pub fn open(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        let mut slot = self
            .file
            .lock()
            .map_err(|_| io::Error::other("debug log lock poisoned"))?;
        *slot = Some(file);
        Ok(())
    }
}

impl Write for DebugLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut slot = self
            .file
            .lock()
            .map_err(|_| io::Error::other("debug log lock poisoned"))?;
        match slot.as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut slot = self
            .file
            .lock()
            .map_err(|_| io::Error::other("debug log lock poisoned"))?;
        match slot.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Install the global subscriber. Returns the debug log handle when `verbose`.
pub fn init_tracing(verbose: bool) -> Option<DebugLog> {
    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = fmt::layer().with_target(false).with_filter(console_filter);

    let debug_log = verbose.then(DebugLog::default);
    let file_layer = debug_log.clone().map(|log| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(move || log.clone())
            .with_filter(EnvFilter::new(DEBUG_TARGETS))
    });

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .ok();

    debug_log
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_debug_log_drops_until_opened() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("debug.log");
        let mut log = DebugLog::default();

        log.write_all(b"before\n").unwrap();
        log.open(&path).unwrap();
        log.clone().write_all(b"after\n").unwrap();
        log.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "after\n");
    }
}
