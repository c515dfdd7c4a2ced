//! Persisted "user explicitly disconnected" flag.
//!
//! The only state that survives a restart. It suppresses auto-reconnect and
//! is cleared by an explicit connect.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    disconnected: bool,
}

/// File-backed disconnect flag. Without a path it is always clear.
#[derive(Debug, Clone, Default)]
pub struct DisconnectFlag {
    path: Option<PathBuf>,
}

impl DisconnectFlag {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// A flag that is never persisted.
    pub fn ephemeral() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether the user explicitly disconnected last time.
    ///
    /// A missing or unreadable file counts as "not set".
    pub fn is_set(&self) -> bool {
        let Some(path) = &self.path else {
            return false;
        };
        if !path.exists() {
            return false;
        }
        let parsed = File::open(path)
            .map_err(|e| e.to_string())
            .and_then(|file| {
                serde_json::from_reader::<_, SessionFile>(BufReader::new(file))
                    .map_err(|e| e.to_string())
            });
        match parsed {
            Ok(file) => file.disconnected,
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Ignoring unreadable session file");
                false
            }
        }
    }

    pub fn set(&self) -> std::io::Result<()> {
        self.write(true)
    }

    pub fn clear(&self) -> std::io::Result<()> {
        self.write(false)
    }

    fn write(&self, disconnected: bool) -> std::io::Result<()> {
        if let Some(path) = &self.path {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer(writer, &SessionFile { disconnected })?;
            tracing::debug!(path = ?path, disconnected, "Session flag saved");
        }
        Ok(())
    }
}
