use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::DatasetLabel;
use crate::error::FetchError;

/// Filesystem layout for one working directory: raw and filtered manifests
/// next to the binary, downloads in a per-dataset directory.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, FetchError> {
        let cwd = std::env::current_dir().map_err(|err| FetchError::Filesystem(err.to_string()))?;
        let root = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| FetchError::Filesystem("invalid working directory path".to_string()))?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn raw_manifest_path(&self, dataset: &DatasetLabel) -> Utf8PathBuf {
        self.root.join(format!("manifest_{dataset}.txt"))
    }

    pub fn filtered_manifest_path(&self, dataset: &DatasetLabel) -> Utf8PathBuf {
        self.root.join(format!("manifest_{dataset}_filtered.csv"))
    }

    pub fn dataset_dir(&self, dataset: &DatasetLabel) -> Utf8PathBuf {
        self.root.join(format!("{dataset}_dataset"))
    }

    pub fn slide_path(&self, dataset: &DatasetLabel, filename: &str) -> Utf8PathBuf {
        self.dataset_dir(dataset).join(filename)
    }

    pub fn ensure_dataset_dir(&self, dataset: &DatasetLabel) -> Result<Utf8PathBuf, FetchError> {
        let dir = self.dataset_dir(dataset);
        fs::create_dir_all(dir.as_std_path())
            .map_err(|err| FetchError::Filesystem(err.to_string()))?;
        Ok(dir)
    }
}
