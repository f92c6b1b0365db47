//! Value types for catalog entries
//!
//! Defines:
//! - Task identifiers restricted to the fixed range
//! - Media kinds as a closed set of tags
//! - Opaque media references held by the delivery platform

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of one of the fixed catalog slots
///
/// Always within [`TaskId::MIN`]..=[`TaskId::MAX`]; construction outside the
/// range is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u8);

impl TaskId {
    /// Lowest task number
    pub const MIN: u8 = 1;
    /// Highest task number
    pub const MAX: u8 = 19;

    /// Create task id from a number
    ///
    /// # Errors
    /// `ValidationError::TaskOutOfRange` if `n` is outside 1..=19
    #[inline]
    pub fn new(n: u64) -> Result<Self, ValidationError> {
        match u8::try_from(n) {
            Ok(v) if (Self::MIN..=Self::MAX).contains(&v) => Ok(Self(v)),
            _ => Err(ValidationError::TaskOutOfRange(n)),
        }
    }

    /// Numeric value
    #[inline]
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }

    /// All task ids in ascending order
    pub fn all() -> impl Iterator<Item = TaskId> {
        (Self::MIN..=Self::MAX).map(TaskId)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = ValidationError;

    /// Parse a plain decimal task number
    ///
    /// Signs, whitespace and empty input are malformed; a digit string that
    /// does not fit the range (including overflow) is out of range.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::MalformedTask(s.to_string()));
        }
        let n = s.parse::<u64>().unwrap_or(u64::MAX);
        Self::new(n)
    }
}

impl TryFrom<u64> for TaskId {
    type Error = ValidationError;

    fn try_from(n: u64) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

/// Kind of a media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Document (PDF and similar)
    Document,
    /// Video
    Video,
    /// Audio
    Audio,
}

impl MediaKind {
    /// Storage tag
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document" => Ok(Self::Document),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            other => Err(ValidationError::UnknownMediaKind(other.to_string())),
        }
    }
}

/// Opaque handle to content held by the delivery platform
///
/// The external id is never inspected; it is stored and handed back as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MediaReference {
    kind: MediaKind,
    external_id: String,
}

impl MediaReference {
    /// Create reference
    #[inline]
    #[must_use]
    pub fn new(kind: MediaKind, external_id: impl Into<String>) -> Self {
        Self {
            kind,
            external_id: external_id.into(),
        }
    }

    /// Document reference
    #[inline]
    #[must_use]
    pub fn document(external_id: impl Into<String>) -> Self {
        Self::new(MediaKind::Document, external_id)
    }

    /// Video reference
    #[inline]
    #[must_use]
    pub fn video(external_id: impl Into<String>) -> Self {
        Self::new(MediaKind::Video, external_id)
    }

    /// Audio reference
    #[inline]
    #[must_use]
    pub fn audio(external_id: impl Into<String>) -> Self {
        Self::new(MediaKind::Audio, external_id)
    }

    /// Media kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Platform file identifier
    #[inline]
    #[must_use]
    pub fn external_id(&self) -> &str {
        &self.external_id
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.external_id)
    }
}
