//! Append-only JSON-lines store.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{PersistenceAdapter, StorageError};
use crate::schema::finite;

/// One line of a JSON-lines store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreRecord {
    Generation {
        index: usize,
        genomes: Vec<Vec<f64>>,
        /// NaN scores are written as `null`.
        scores: Vec<Option<f64>>,
    },
    DefaultParams {
        params: BTreeMap<String, f64>,
    },
}

/// Writes one JSON object per call to a file.
pub struct JsonLinesStore {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl JsonLinesStore {
    /// Create (or truncate) the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    /// Open `path` for appending, creating it if missing.
    pub fn append<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&mut self, record: &StoreRecord) -> Result<(), StorageError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl PersistenceAdapter for JsonLinesStore {
    fn add_generation(
        &mut self,
        index: usize,
        genomes: &[Vec<f64>],
        scores: &[f64],
    ) -> Result<(), StorageError> {
        let record = StoreRecord::Generation {
            index,
            genomes: genomes.to_vec(),
            scores: scores.iter().map(|&s| finite(s)).collect(),
        };
        self.write_record(&record)
    }

    fn add_default_params(&mut self, params: &BTreeMap<String, f64>) -> Result<(), StorageError> {
        self.write_record(&StoreRecord::DefaultParams {
            params: params.clone(),
        })
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        self.writer.flush()?;
        Ok(())
    }
}
