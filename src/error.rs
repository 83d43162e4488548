use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("invalid dataset label: {0}")]
    InvalidDatasetLabel(String),

    #[error("invalid file id: {0}")]
    InvalidFileId(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read manifest at {0}: {1}")]
    ManifestRead(Utf8PathBuf, String),

    #[error("manifest at {0} has no header row")]
    ManifestEmpty(Utf8PathBuf),

    #[error("manifest is missing required column: {0}")]
    MissingColumn(String),

    #[error("failed to write filtered manifest: {0}")]
    ManifestWrite(String),

    #[error("failed to read split file at {0}: {1}")]
    SplitRead(Utf8PathBuf, String),

    #[error("split file {0} has no slide_id column")]
    MissingSlideColumn(Utf8PathBuf),

    #[error("split lists {expected} slides but the filtered manifest holds {actual}")]
    CohortMismatch { expected: usize, actual: usize },

    #[error("GDC request failed: {0}")]
    GdcHttp(String),

    #[error("GDC returned status {status}: {message}")]
    GdcStatus { status: u16, message: String },

    #[error("no filename in Content-Disposition for file {0}")]
    MissingFilename(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
