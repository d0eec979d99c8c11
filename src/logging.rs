//! Tracing subscriber setup.
//!
//! Logs go to stderr, or to `chat.log` in a log directory. Previous log files
//! are rotated on startup (`chat.log` → `chat.log.1` → … → `.3`).

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "alfred_chat=info,warn";

/// Log files kept besides the current one.
const KEEP_LOGS: u32 = 3;

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Write `chat.log` here instead of stderr.
    pub dir: Option<PathBuf>,
    /// One JSON object per line instead of plain text.
    pub json: bool,
}

/// Install the global subscriber.
///
/// Returns the log file path when logging to a file. Installing twice is not
/// an error; the first subscriber stays.
pub fn init_tracing(options: &LogOptions) -> io::Result<Option<PathBuf>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (writer, log_path) = match &options.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let path = dir.join("chat.log");
            rotate_log_file(&path, KEEP_LOGS);
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            (BoxMakeWriter::new(FlushingWriter::new(file)), Some(path))
        }
        None => (BoxMakeWriter::new(io::stderr), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_path.is_none())
        .with_target(true);

    let installed = if options.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        return Ok(log_path);
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = ?log_path,
        pid = std::process::id(),
        "alfred-chat starting"
    );
    Ok(log_path)
}

/// Shift `base`, `base.1`, … up by one; the file past `keep` is deleted.
///
/// Missing files in the chain are skipped.
pub fn rotate_log_file(base: &Path, keep: u32) {
    let numbered = |n: u32| PathBuf::from(format!("{}.{n}", base.display()));

    let _ = std::fs::remove_file(numbered(keep));
    for i in (1..keep).rev() {
        let _ = std::fs::rename(numbered(i), numbered(i + 1));
    }
    if base.exists() {
        let _ = std::fs::rename(base, numbered(1));
    }
}

/// A file writer that flushes after every write, so log lines survive a crash.
#[derive(Clone)]
struct FlushingWriter {
    file: Arc<Mutex<File>>,
}

impl FlushingWriter {
    fn new(file: File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }

    fn locked(&self) -> io::Result<std::sync::MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|e| io::Error::other(format!("log file lock poisoned: {e}")))
    }
}

impl Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.locked()?;
        let n = file.write(buf)?;
        file.flush()?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.locked()?.flush()
    }
}

impl<'a> MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
