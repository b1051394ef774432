//! Persisted face dataset: index-aligned encodings and names in one JSON file.
//!
//! The whole dataset is held in memory and rewritten after every mutation.

use crate::types::{Encoding, Matcher};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write dataset {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("malformed dataset {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("corrupt dataset {path}: {encodings} encodings but {names} names")]
    LengthMismatch {
        path: PathBuf,
        encodings: usize,
        names: usize,
    },
    #[error("corrupt dataset {path}: encoding {index} has {actual} values, expected {expected}")]
    BadEncoding {
        path: PathBuf,
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("encoding has {actual} values, dataset stores {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("index {index} out of range (dataset has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Encodings and names; `encodings[i]` belongs to `names[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub encodings: Vec<Encoding>,
    pub names: Vec<String>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name of the gallery entry chosen by `matcher`, if any.
    pub fn identify(&self, probe: &Encoding, matcher: &dyn Matcher, tolerance: f32) -> Option<&str> {
        matcher
            .find(probe, &self.encodings, tolerance)
            .map(|m| self.names[m.index].as_str())
    }
}

/// Owns the in-memory dataset and its file; every mutation is saved immediately.
#[derive(Debug)]
pub struct DatasetStore {
    path: PathBuf,
    dataset: Dataset,
}

impl DatasetStore {
    /// Load the dataset at `path`, or start empty if the file does not exist.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, DatasetError> {
        let path = path.into();
        let dataset = match fs::read(&path) {
            Ok(bytes) => parse(&path, &bytes)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no dataset file, starting empty");
                Dataset::default()
            }
            Err(source) => return Err(DatasetError::Read { path, source }),
        };

        tracing::info!(path = %path.display(), entries = dataset.len(), "dataset loaded");
        Ok(Self { path, dataset })
    }

    /// Load the dataset, creating an empty file if none exists yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DatasetError> {
        let store = Self::load(path)?;
        if !store.path.exists() {
            store.save()?;
        }
        Ok(store)
    }

    /// Overwrite the file with the current in-memory dataset.
    ///
    /// Writes a sibling temporary file first and renames it over the target.
    pub fn save(&self) -> Result<(), DatasetError> {
        let json = serde_json::to_vec(&self.dataset)?;
        let tmp = tmp_path(&self.path);

        fs::write(&tmp, &json)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|source| DatasetError::Write {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(path = %self.path.display(), entries = self.dataset.len(), "dataset saved");
        Ok(())
    }

    /// Append an identity and persist.
    ///
    /// The encoding must be non-empty and match the dimension already stored.
    pub fn add(&mut self, encoding: Encoding, name: impl Into<String>) -> Result<(), DatasetError> {
        let expected = self.dataset.encodings.first().map_or(encoding.dim(), Encoding::dim);
        if encoding.dim() == 0 || encoding.dim() != expected {
            return Err(DatasetError::DimensionMismatch {
                expected,
                actual: encoding.dim(),
            });
        }

        let name = name.into();
        self.dataset.encodings.push(encoding);
        self.dataset.names.push(name.clone());

        if let Err(e) = self.save() {
            self.dataset.encodings.pop();
            self.dataset.names.pop();
            return Err(e);
        }

        tracing::info!(name = %name, entries = self.dataset.len(), "identity enrolled");
        Ok(())
    }

    /// Remove the entry at the 0-based `index` and persist. Returns the removed name.
    pub fn remove(&mut self, index: usize) -> Result<String, DatasetError> {
        let len = self.dataset.len();
        if index >= len {
            return Err(DatasetError::IndexOutOfRange { index, len });
        }

        let name = self.dataset.names.remove(index);
        let encoding = self.dataset.encodings.remove(index);

        if let Err(e) = self.save() {
            self.dataset.names.insert(index, name);
            self.dataset.encodings.insert(index, encoding);
            return Err(e);
        }

        tracing::info!(name = %name, index, entries = self.dataset.len(), "identity removed");
        Ok(name)
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn names(&self) -> &[String] {
        &self.dataset.names
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse(path: &Path, bytes: &[u8]) -> Result<Dataset, DatasetError> {
    let dataset: Dataset = serde_json::from_slice(bytes).map_err(|source| DatasetError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if dataset.encodings.len() != dataset.names.len() {
        return Err(DatasetError::LengthMismatch {
            path: path.to_path_buf(),
            encodings: dataset.encodings.len(),
            names: dataset.names.len(),
        });
    }

    let expected = dataset.encodings.first().map_or(0, Encoding::dim);
    for (index, encoding) in dataset.encodings.iter().enumerate() {
        if encoding.dim() == 0 || encoding.dim() != expected {
            return Err(DatasetError::BadEncoding {
                path: path.to_path_buf(),
                index,
                expected,
                actual: encoding.dim(),
            });
        }
    }

    Ok(dataset)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
