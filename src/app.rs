use std::time::Duration;

use camino::Utf8Path;
use serde::Serialize;

use crate::domain::DatasetLabel;
use crate::error::FetchError;
use crate::gdc::GdcClient;
use crate::manifest::{self, RawManifest};
use crate::splits;
use crate::store::Store;

#[derive(Debug, Clone, Serialize)]
pub struct FilterResult {
    pub dataset: String,
    pub requested: usize,
    pub kept: usize,
    pub output_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub dataset: String,
    pub started_at: String,
    pub finished_at: String,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub items: Vec<FetchItemResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchItemResult {
    pub file_id: String,
    pub filename: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<G: GdcClient> {
    store: Store,
    gdc: G,
}

impl<G: GdcClient> App<G> {
    pub fn new(store: Store, gdc: G) -> Self {
        Self { store, gdc }
    }

    /// Filter stage: intersect the raw manifest with the split's slide ids
    /// and write the filtered manifest. Fails loudly when the filtered set
    /// does not cover the split exactly.
    pub fn filter(
        &self,
        dataset: &DatasetLabel,
        splits_dir: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<FilterResult, FetchError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; reading splits from {splits_dir}"),
            elapsed: None,
        });
        let slide_ids = splits::read_slide_ids(splits_dir)?;
        tracing::info!(dataset = %dataset, slides = slide_ids.len(), "split loaded");

        let manifest_path = self.store.raw_manifest_path(dataset);
        sink.event(ProgressEvent {
            message: format!("phase=Filter; reading manifest {manifest_path}"),
            elapsed: None,
        });
        let raw = RawManifest::load(&manifest_path)?;
        let filtered = manifest::filter_manifest(&raw, &slide_ids)?;

        let output_path = self.store.filtered_manifest_path(dataset);
        manifest::write_filtered(&output_path, &filtered)?;
        sink.event(ProgressEvent {
            message: format!("phase=Store; wrote {output_path}"),
            elapsed: None,
        });

        Ok(FilterResult {
            dataset: dataset.to_string(),
            requested: slide_ids.len(),
            kept: filtered.rows.len(),
            output_path: output_path.to_string(),
        })
    }

    /// Download stage: fetch every filtered manifest record whose target
    /// file is not already on disk. Per-item failures are logged and
    /// counted; only manifest-structure errors abort the run.
    pub fn download(
        &self,
        dataset: &DatasetLabel,
        sink: &dyn ProgressSink,
    ) -> Result<FetchResult, FetchError> {
        let manifest_path = self.store.filtered_manifest_path(dataset);
        let records = manifest::load_records(&manifest_path)?;
        let dir = self.store.ensure_dataset_dir(dataset)?;

        let started_at = iso_timestamp();
        let mut items = Vec::with_capacity(records.len());
        for record in &records {
            let target = dir.join(&record.filename);
            if target.as_std_path().is_file() {
                tracing::info!(filename = %record.filename, "already on disk, skipping");
                sink.event(ProgressEvent {
                    message: format!("phase=Store; skip {}", record.filename),
                    elapsed: None,
                });
                items.push(FetchItemResult {
                    file_id: record.file_id.to_string(),
                    filename: record.filename.clone(),
                    action: "skipped".to_string(),
                    error: None,
                });
                continue;
            }

            sink.event(ProgressEvent {
                message: format!("phase=Fetch; obtaining {}", record.filename),
                elapsed: None,
            });
            let start = std::time::Instant::now();
            match self.gdc.download_file(&record.file_id, &dir) {
                Ok(downloaded) => {
                    sink.event(ProgressEvent {
                        message: format!("gdc.response file={}", downloaded.filename),
                        elapsed: Some(start.elapsed()),
                    });
                    if downloaded.filename != record.filename {
                        tracing::warn!(
                            manifest = %record.filename,
                            portal = %downloaded.filename,
                            "portal filename differs from manifest entry"
                        );
                    }
                    items.push(FetchItemResult {
                        file_id: record.file_id.to_string(),
                        filename: downloaded.filename,
                        action: "downloaded".to_string(),
                        error: None,
                    });
                }
                Err(err) => {
                    tracing::warn!(file_id = %record.file_id, error = %err, "download failed, continuing");
                    items.push(FetchItemResult {
                        file_id: record.file_id.to_string(),
                        filename: record.filename.clone(),
                        action: "failed".to_string(),
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        let downloaded = items.iter().filter(|item| item.action == "downloaded").count();
        let skipped = items.iter().filter(|item| item.action == "skipped").count();
        let failed = items.iter().filter(|item| item.action == "failed").count();

        Ok(FetchResult {
            dataset: dataset.to_string(),
            started_at,
            finished_at: iso_timestamp(),
            downloaded,
            skipped,
            failed,
            items,
        })
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
