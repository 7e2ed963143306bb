use std::fmt;

/// Result of handing one file to the downloader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was fetched and written in full
    Done {
        /// Number of bytes written
        bytes: u64,
    },

    /// A non-empty file already existed at the destination
    Skipped,

    /// Every attempt failed, or the destination could not be written
    Failed {
        /// Description of the last error
        reason: String,
    },
}

impl DownloadOutcome {
    /// Returns true if this is a terminal failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done { bytes } => write!(f, "done ({} bytes)", bytes),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}
