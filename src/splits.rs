use camino::Utf8Path;

use crate::domain::SlideId;
use crate::error::FetchError;

/// Split tables read from the splits directory, in this order.
pub const SPLIT_FILES: [&str; 2] = ["train.csv", "test.csv"];

/// Concatenated `slide_id` column of both split tables, file order,
/// duplicates preserved. Either file missing or lacking the column is fatal.
pub fn read_slide_ids(dir: &Utf8Path) -> Result<Vec<SlideId>, FetchError> {
    let mut slide_ids = Vec::new();
    for name in SPLIT_FILES {
        let path = dir.join(name);
        let mut reader = csv::Reader::from_path(path.as_std_path())
            .map_err(|err| FetchError::SplitRead(path.clone(), err.to_string()))?;
        let column = reader
            .headers()
            .map_err(|err| FetchError::SplitRead(path.clone(), err.to_string()))?
            .iter()
            .position(|header| header == "slide_id")
            .ok_or_else(|| FetchError::MissingSlideColumn(path.clone()))?;
        for record in reader.records() {
            let record =
                record.map_err(|err| FetchError::SplitRead(path.clone(), err.to_string()))?;
            if let Some(value) = record.get(column) {
                slide_ids.push(SlideId::new(value));
            }
        }
    }
    Ok(slide_ids)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;

    use super::*;

    fn splits_dir(train: &str, test: &str) -> (tempfile::TempDir, Utf8PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::write(dir.join("train.csv").as_std_path(), train).unwrap();
        fs::write(dir.join("test.csv").as_std_path(), test).unwrap();
        (temp, dir)
    }

    #[test]
    fn reads_both_tables_in_order() {
        let (_temp, dir) = splits_dir(
            "slide_id,case_id\nTCGA-AA-0001.DX1,c1\nTCGA-AA-0002.DX1,c2\n",
            "slide_id,case_id\nTCGA-AA-0003.DX1,c3\n",
        );

        let ids = read_slide_ids(&dir).unwrap();
        let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["TCGA-AA-0001.DX1", "TCGA-AA-0002.DX1", "TCGA-AA-0003.DX1"]
        );
    }

    #[test]
    fn duplicates_are_preserved() {
        let (_temp, dir) = splits_dir(
            "slide_id\nTCGA-AA-0001.DX1\n",
            "slide_id\nTCGA-AA-0001.DX1\n",
        );

        let ids = read_slide_ids(&dir).unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn missing_table_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::write(dir.join("train.csv").as_std_path(), "slide_id\n").unwrap();

        let err = read_slide_ids(&dir).unwrap_err();
        assert_matches!(err, FetchError::SplitRead(path, _) if path.ends_with("test.csv"));
    }

    #[test]
    fn missing_slide_column_is_fatal() {
        let (_temp, dir) = splits_dir("case_id\nc1\n", "slide_id\n");

        let err = read_slide_ids(&dir).unwrap_err();
        assert_matches!(err, FetchError::MissingSlideColumn(path) if path.ends_with("train.csv"));
    }
}
