use serde::{Serialize, Serializer};
use std::fmt;

/// Classified outcome of trying one backend during a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptStatus {
    Ok,
    Http(u16),
    Expired,
    NoManifest,
    Timeout,
    Error,
}

impl AttemptStatus {
    /// Hard failures are worth one forced retry of the whole procedure.
    #[must_use]
    pub fn is_hard(&self) -> bool {
        matches!(self, Self::Http(403) | Self::Http(404))
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Http(code) => write!(f, "http_{code}"),
            Self::Expired => write!(f, "expired"),
            Self::NoManifest => write!(f, "no_manifest"),
            Self::Timeout => write!(f, "timeout"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl Serialize for AttemptStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One backend tried during a resolution, in try order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    pub source: String,
    pub status: AttemptStatus,
}

impl Attempt {
    pub fn new(source: impl Into<String>, status: AttemptStatus) -> Self {
        Self {
            source: source.into(),
            status,
        }
    }
}
