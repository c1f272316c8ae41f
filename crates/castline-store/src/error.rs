//! State store errors

use std::path::PathBuf;

/// Error loading or persisting the state file.
#[derive(Debug)]
pub enum StateError {
    /// The state file exists but cannot be trusted. Callers must not
    /// treat this as an empty state.
    Corrupt { path: PathBuf, reason: String },
    /// Reading or writing the backing file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Corrupt { path, reason } => {
                write!(f, "corrupt state file {}: {reason}", path.display())
            }
            Self::Io { path, source } => write!(f, "state file {}: {source}", path.display()),
        }
    }
}

impl std::error::Error for StateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Corrupt { .. } => None,
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl StateError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn corrupt(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}
