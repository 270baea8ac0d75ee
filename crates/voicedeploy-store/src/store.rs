use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::Document;
use crate::error::StoreError;

/// Load a document from an explicit path.
///
/// Fails with [`StoreError::NotFound`] when the file is absent and with
/// [`StoreError::MissingField`] when a required key is not present.
pub fn load_from<D: Document>(path: &Path) -> Result<D, StoreError> {
    let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;

    let value: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    let object = value
        .as_object()
        .ok_or_else(|| StoreError::NotAnObject(path.to_path_buf()))?;

    for &field in D::REQUIRED_FIELDS {
        if !object.contains_key(field) {
            return Err(StoreError::MissingField {
                document: D::FILE_NAME,
                field,
            });
        }
    }

    serde_json::from_value(value).map_err(|source| StoreError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a document to an explicit path, replacing whatever was there.
pub fn save_to<D: Document>(document: &D, path: &Path) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(document).map_err(StoreError::Serialize)?;
    fs::write(path, json).map_err(|e| StoreError::io(path, e))?;
    debug!(path = %path.display(), "Saved document");
    Ok(())
}

/// Documents of one deployment, rooted at its working directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The working directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of an arbitrary file inside the working directory.
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Path of a document's file.
    pub fn path_of<D: Document>(&self) -> PathBuf {
        self.path(D::FILE_NAME)
    }

    pub fn exists<D: Document>(&self) -> bool {
        self.path_of::<D>().exists()
    }

    pub fn load<D: Document>(&self) -> Result<D, StoreError> {
        load_from(&self.path_of::<D>())
    }

    /// Like [`ConfigStore::load`] but an absent file is `Ok(None)`.
    pub fn load_optional<D: Document>(&self) -> Result<Option<D>, StoreError> {
        match self.load::<D>() {
            Ok(document) => Ok(Some(document)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn save<D: Document>(&self, document: &D) -> Result<PathBuf, StoreError> {
        let path = self.path_of::<D>();
        save_to(document, &path)?;
        Ok(path)
    }

    /// Remove a document's file. Returns whether a file was removed.
    pub fn remove<D: Document>(&self) -> Result<bool, StoreError> {
        remove_if_exists(&self.path_of::<D>())
    }

    /// Copy a file from outside into the working directory under `file_name`.
    pub fn copy_in(&self, source: &Path, file_name: &str) -> Result<PathBuf, StoreError> {
        let destination = self.path(file_name);
        fs::copy(source, &destination).map_err(|e| StoreError::io(source, e))?;
        debug!(
            source = %source.display(),
            destination = %destination.display(),
            "Copied file into working directory"
        );
        Ok(destination)
    }

    /// Read a raw text file from the working directory.
    pub fn read_raw(&self, file_name: &str) -> Result<String, StoreError> {
        let path = self.path(file_name);
        fs::read_to_string(&path).map_err(|e| StoreError::io(path, e))
    }

    /// Write a raw text file into the working directory.
    pub fn write_raw(&self, file_name: &str, content: &str) -> Result<PathBuf, StoreError> {
        let path = self.path(file_name);
        fs::write(&path, content).map_err(|e| StoreError::io(&path, e))?;
        Ok(path)
    }
}

pub(crate) fn remove_if_exists(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
