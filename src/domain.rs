use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Suffix carried by every whole-slide image file on the portal.
pub const SLIDE_SUFFIX: &str = ".svs";

/// Substring the portal uses to mark diagnostic slides, as opposed to
/// frozen-tissue scans.
pub const DIAGNOSTIC_MARKER: &str = "DX";

/// TCGA cohort label, e.g. `blca` or `brca`. Names the manifest files and
/// the download directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetLabel(String);

impl DatasetLabel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DatasetLabel {
    type Err = FetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_');
        if !is_valid {
            return Err(FetchError::InvalidDatasetLabel(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Opaque GDC file identifier, used as the URL path segment of a download.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(String);

impl FileId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = FetchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_string();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| !ch.is_whitespace() && ch != '/');
        if !is_valid {
            return Err(FetchError::InvalidFileId(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Slide identifier as used by the split tables: a slide filename with its
/// image suffix stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlideId(String);

impl SlideId {
    pub fn new(value: &str) -> Self {
        Self(value.trim().to_string())
    }

    /// Derive the identifier from a slide filename. Returns `None` when the
    /// filename does not carry the image suffix.
    pub fn from_filename(filename: &str) -> Option<Self> {
        filename
            .strip_suffix(SLIDE_SUFFIX)
            .map(|stem| Self(stem.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a manifest filename refers to a diagnostic whole-slide image.
pub fn is_diagnostic_slide(filename: &str) -> bool {
    filename.contains(DIAGNOSTIC_MARKER) && filename.ends_with(SLIDE_SUFFIX)
}
