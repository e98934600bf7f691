//! Side-channel log capture.
//!
//! The toolkit writes its diagnostics to the file named by its `-log`
//! argument, not to the channel. When the caller did not choose a log file,
//! each connection gets its own file in a private temporary directory. The
//! file is emptied before every method call and whatever the call left in it
//! is forwarded to a [`DiagnosticSink`] afterwards.

use crate::config::LaunchConfig;
use crate::error::{BridgeError, IoResultExt, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Receiver of toolkit diagnostics captured around each call.
pub trait DiagnosticSink: Send + Sync {
    /// Called at most once per call, with the text that call produced.
    ///
    /// Runs on the calling thread after the channel lock is released.
    fn forward(&self, text: &str);
}

/// Print diagnostics to stdout, the way the toolkit would in a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl DiagnosticSink for StdoutSink {
    fn forward(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }
}

impl<F> DiagnosticSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn forward(&self, text: &str) {
        self(text)
    }
}

/// Log file owned by one connection.
#[derive(Debug)]
pub struct SideChannelLog {
    path: PathBuf,
    /// Removed together with the log when the connection goes away.
    _dir: TempDir,
}

impl SideChannelLog {
    /// Create an empty log in a fresh directory under `parent`, or under the
    /// system temp directory.
    pub fn create(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(LaunchConfig::TEMP_DIR_PREFIX);
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent).with_path(parent)?,
            None => builder.tempdir().with_path(std::env::temp_dir())?,
        };

        let path = dir.path().join(LaunchConfig::LOG_FILE_NAME);
        fs::File::create(&path).with_path(&path)?;

        Ok(Self { path, _dir: dir })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Empty the log if it holds anything. Returns whether it was truncated.
    pub fn truncate_if_nonempty(&self) -> Result<bool> {
        let len = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(BridgeError::io_with_path(e, &self.path)),
        };
        if len == 0 {
            return Ok(false);
        }
        OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .with_path(&self.path)?;
        Ok(true)
    }

    /// Current contents, lossily decoded.
    pub fn read(&self) -> Result<String> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(BridgeError::io_with_path(e, &self.path)),
        }
    }
}

/// Whether `arg` tells the toolkit where to log.
pub(crate) fn is_log_directive(arg: &str) -> bool {
    arg == LaunchConfig::LOG_DIRECTIVE
        || arg
            .strip_prefix(LaunchConfig::LOG_DIRECTIVE)
            .is_some_and(|rest| rest.starts_with('='))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_log_directive_detection() {
        assert!(is_log_directive("-log"));
        assert!(is_log_directive("-log=/tmp/cubit.log"));
        assert!(!is_log_directive("-logfile"));
        assert!(!is_log_directive("-nographics"));
        assert!(!is_log_directive("log=/tmp/x"));
    }

    #[test]
    fn test_logs_are_scoped_per_instance() {
        let parent = TempDir::new().unwrap();
        let a = SideChannelLog::create(Some(parent.path())).unwrap();
        let b = SideChannelLog::create(Some(parent.path())).unwrap();

        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(parent.path()));
        assert!(a.path().exists());
        assert_eq!(a.read().unwrap(), "");
    }

    #[test]
    fn test_truncate_only_when_nonempty() {
        let log = SideChannelLog::create(None).unwrap();
        assert!(!log.truncate_if_nonempty().unwrap());

        fs::write(log.path(), "Journaling: brick x 1\n").unwrap();
        assert_eq!(log.read().unwrap(), "Journaling: brick x 1\n");
        assert!(log.truncate_if_nonempty().unwrap());
        assert_eq!(log.read().unwrap(), "");
    }

    #[test]
    fn test_log_directory_removed_on_drop() {
        let log = SideChannelLog::create(None).unwrap();
        let dir = log.path().parent().unwrap().to_path_buf();
        assert!(dir.exists());
        drop(log);
        assert!(!dir.exists());
    }

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = seen.clone();
        let sink = move |text: &str| captured.lock().unwrap().push(text.to_string());
        sink.forward("hello");
        assert_eq!(*seen.lock().unwrap(), vec!["hello".to_string()]);
    }
}
