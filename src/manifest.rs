use std::collections::HashSet;
use std::fs;

use camino::Utf8Path;

use crate::domain::{FileId, SlideId, is_diagnostic_slide};
use crate::error::FetchError;

/// Raw portal manifest: tab-separated, header row first, one row per
/// remotely available file.
#[derive(Debug, Clone)]
pub struct RawManifest {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawManifest {
    pub fn load(path: &Utf8Path) -> Result<Self, FetchError> {
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| FetchError::ManifestRead(path.to_owned(), err.to_string()))?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Utf8Path) -> Result<Self, FetchError> {
        let mut lines = content.lines();
        let header = lines
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or_else(|| FetchError::ManifestEmpty(path.to_owned()))?;
        let columns = split_row(header);
        let rows = lines
            .filter(|line| !line.trim().is_empty())
            .map(split_row)
            .collect();
        Ok(Self { columns, rows })
    }

    fn filename_index(&self) -> Result<usize, FetchError> {
        self.columns
            .iter()
            .position(|column| column == "filename")
            .ok_or_else(|| FetchError::MissingColumn("filename".to_string()))
    }
}

/// Subset of the raw manifest selected for download, source columns intact.
#[derive(Debug, Clone)]
pub struct FilteredManifest {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One entry of the filtered manifest as consumed by the download stage.
#[derive(Debug, Clone)]
pub struct ManifestRecord {
    pub file_id: FileId,
    pub filename: String,
}

/// Reduce the raw manifest to the slides requested by the split.
///
/// Two passes: keep diagnostic `.svs` rows, then keep rows whose
/// suffix-stripped filename appears in `slide_ids`. The result must cover
/// every requested slide exactly once; any shortfall or duplicate aborts the
/// run before a single byte is downloaded.
pub fn filter_manifest(
    manifest: &RawManifest,
    slide_ids: &[SlideId],
) -> Result<FilteredManifest, FetchError> {
    let filename_index = manifest.filename_index()?;
    let requested: HashSet<&str> = slide_ids.iter().map(|id| id.as_str()).collect();

    let rows: Vec<Vec<String>> = manifest
        .rows
        .iter()
        .filter(|row| {
            row.get(filename_index)
                .is_some_and(|filename| is_diagnostic_slide(filename))
        })
        .filter(|row| {
            SlideId::from_filename(&row[filename_index])
                .is_some_and(|slide| requested.contains(slide.as_str()))
        })
        .cloned()
        .collect();

    if rows.len() != slide_ids.len() {
        return Err(FetchError::CohortMismatch {
            expected: slide_ids.len(),
            actual: rows.len(),
        });
    }

    Ok(FilteredManifest {
        columns: manifest.columns.clone(),
        rows,
    })
}

/// Write the filtered manifest as comma-separated text, header first. The
/// file is staged in a temp file and renamed into place, so an interrupted
/// run never leaves a truncated manifest.
pub fn write_filtered(path: &Utf8Path, manifest: &FilteredManifest) -> Result<(), FetchError> {
    let parent = path
        .parent()
        .ok_or_else(|| FetchError::ManifestWrite("invalid output path".to_string()))?;
    let temp = tempfile::Builder::new()
        .prefix("manifest")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| FetchError::ManifestWrite(err.to_string()))?;

    let mut writer = csv::Writer::from_writer(temp);
    writer
        .write_record(&manifest.columns)
        .map_err(|err| FetchError::ManifestWrite(err.to_string()))?;
    for row in &manifest.rows {
        writer
            .write_record(row)
            .map_err(|err| FetchError::ManifestWrite(err.to_string()))?;
    }
    let temp = writer
        .into_inner()
        .map_err(|err| FetchError::ManifestWrite(err.to_string()))?;

    if path.as_std_path().exists() {
        fs::remove_file(path.as_std_path())
            .map_err(|err| FetchError::ManifestWrite(err.to_string()))?;
    }
    temp.persist(path.as_std_path())
        .map_err(|err| FetchError::ManifestWrite(err.to_string()))?;
    Ok(())
}

/// Load download records from a filtered manifest. Both the `id` and the
/// `filename` columns are required; their absence is fatal before any
/// network activity.
pub fn load_records(path: &Utf8Path) -> Result<Vec<ManifestRecord>, FetchError> {
    let mut reader = csv::Reader::from_path(path.as_std_path())
        .map_err(|err| FetchError::ManifestRead(path.to_owned(), err.to_string()))?;
    let headers = reader
        .headers()
        .map_err(|err| FetchError::ManifestRead(path.to_owned(), err.to_string()))?
        .clone();
    let id_index = headers
        .iter()
        .position(|header| header == "id")
        .ok_or_else(|| FetchError::MissingColumn("id".to_string()))?;
    let filename_index = headers
        .iter()
        .position(|header| header == "filename")
        .ok_or_else(|| FetchError::MissingColumn("filename".to_string()))?;

    let mut records = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|err| FetchError::ManifestRead(path.to_owned(), err.to_string()))?;
        let file_id = record
            .get(id_index)
            .unwrap_or_default()
            .parse::<FileId>()?;
        let filename = record.get(filename_index).unwrap_or_default().to_string();
        records.push(ManifestRecord { file_id, filename });
    }
    Ok(records)
}

fn split_row(line: &str) -> Vec<String> {
    line.split('\t').map(|field| field.to_string()).collect()
}
