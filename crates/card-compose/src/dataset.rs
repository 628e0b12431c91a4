//! Dataset loading: a header row plus one record per data row

use crate::types::{ComposeError, DataRecord, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub id: String,
    pub headers: Vec<String>,
    pub records: Vec<DataRecord>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
pub trait DatasetProvider: Send + Sync {
    async fn load(&self, dataset_id: &str) -> Result<Dataset>;
}

/// Datasets stored as `<root>/<id>.csv`
#[derive(Debug, Clone)]
pub struct CsvDirectory {
    root: PathBuf,
}

impl CsvDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl DatasetProvider for CsvDirectory {
    async fn load(&self, dataset_id: &str) -> Result<Dataset> {
        if dataset_id.is_empty() || dataset_id.contains(['/', '\\']) || dataset_id.starts_with('.') {
            return Err(ComposeError::DatasetNotFound(dataset_id.to_string()));
        }
        let path = self.root.join(format!("{}.csv", dataset_id));
        let mut dataset = match load_from_csv(&path).await {
            Err(ComposeError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ComposeError::DatasetNotFound(dataset_id.to_string()));
            }
            other => other?,
        };
        dataset.id = dataset_id.to_string();
        Ok(dataset)
    }
}

/// Read a CSV file; the dataset id is the file stem
pub async fn load_from_csv(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref().to_owned();
    let contents = tokio::fs::read_to_string(&path).await?;

    let mut dataset = tokio::task::spawn_blocking(move || parse_csv(&contents)).await??;
    dataset.id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    log::debug!(
        "Loaded dataset {} with {} records from {}",
        dataset.id,
        dataset.len(),
        path.display()
    );
    Ok(dataset)
}

/// Parse CSV text; every cell becomes a string value
///
/// Short rows simply lack the trailing columns.
pub fn parse_csv(contents: &str) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(contents.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: DataRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| (header.clone(), cell.to_string()))
            .collect();
        records.push(record);
    }

    Ok(Dataset {
        id: String::new(),
        headers,
        records,
    })
}
