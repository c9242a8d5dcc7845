//! Change log writer module
//!
//! Appends timestamped lines (`<ISO-8601> - <message>`) to a file or stdout.
//! Write failures are reported on stderr and never propagate to the caller.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

/// Append-only request/mutation log capability
pub trait ChangeLog: Send + Sync {
    /// Record one line; must not fail the caller
    fn record(&self, message: &str);
}

/// Log output target
enum LogTarget {
    /// Write to stdout
    Stdout,
    /// Append to file
    File(Mutex<File>),
}

/// Thread-safe change log writer
pub struct LogWriter {
    target: LogTarget,
}

impl LogWriter {
    /// Open (or create) `path` for appending
    pub fn open(path: &str) -> io::Result<Self> {
        let file = open_log_file(path)?;
        Ok(Self {
            target: LogTarget::File(Mutex::new(file)),
        })
    }

    /// Writer that prints to stdout
    pub const fn stdout() -> Self {
        Self {
            target: LogTarget::Stdout,
        }
    }

    /// Use `path` when given and openable, stdout otherwise
    pub fn open_or_stdout(path: Option<&str>) -> Self {
        let Some(path) = path else {
            return Self::stdout();
        };
        match Self::open(path) {
            Ok(writer) => writer,
            Err(e) => {
                super::log_warning(&format!(
                    "Cannot open change log '{path}': {e}. Falling back to stdout"
                ));
                Self::stdout()
            }
        }
    }
}

impl ChangeLog for LogWriter {
    fn record(&self, message: &str) {
        let line = format_line(Utc::now(), message);
        match &self.target {
            LogTarget::Stdout => println!("{line}"),
            LogTarget::File(file) => {
                let result = match file.lock() {
                    Ok(mut f) => writeln!(f, "{line}"),
                    Err(_) => Err(io::Error::other("log file mutex poisoned")),
                };
                if let Err(e) = result {
                    super::log_error(&format!("Failed to write to log file: {e}"));
                }
            }
        }
    }
}

/// Format a change log line
pub fn format_line(time: DateTime<Utc>, message: &str) -> String {
    format!(
        "{} - {message}",
        time.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

/// In-memory change log for tests
#[cfg(test)]
#[derive(Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<String>>,
}

#[cfg(test)]
impl MemoryLog {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl ChangeLog for MemoryLog {
    fn record(&self, message: &str) {
        self.lines.lock().unwrap().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_format_line() {
        let time = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(
            format_line(time, "Article created: ID 3"),
            "2025-03-04T05:06:07.000Z - Article created: ID 3"
        );
    }

    #[test]
    fn test_file_writer_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("changes.log");
        let path_str = path.to_str().unwrap();

        LogWriter::open(path_str).unwrap().record("first");
        // A second writer on the same file keeps earlier lines
        LogWriter::open(path_str).unwrap().record("second");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" - first"));
        assert!(lines[1].ends_with(" - second"));
    }

    #[test]
    fn test_unopenable_path_falls_back_to_stdout() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let path = blocker.join("changes.log");

        let writer = LogWriter::open_or_stdout(path.to_str());
        assert!(matches!(writer.target, LogTarget::Stdout));
        // Recording must not panic
        writer.record("still works");
    }

    #[test]
    fn test_memory_log() {
        let log = MemoryLog::default();
        log.record("a");
        log.record("b");
        assert_eq!(log.lines(), vec!["a".to_string(), "b".to_string()]);
    }
}
