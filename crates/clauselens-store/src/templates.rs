//! Canonical template clauses.
//!
//! The on-disk store is a flat directory of `.txt` files. Each file holds one
//! template clause and its stem is the template label, so `Payment.txt` yields
//! the `Payment` template. Files are read in file-name order.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::StoreError;

/// One canonical template clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub label: String,
    pub text: String,
}

impl Template {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// Anything that can hand over an ordered template corpus.
pub trait TemplateSource {
    fn list_templates(&self) -> Result<Vec<Template>, StoreError>;
}

impl TemplateSource for Vec<Template> {
    fn list_templates(&self) -> Result<Vec<Template>, StoreError> {
        Ok(self.clone())
    }
}

/// Directory-backed template store.
#[derive(Debug, Clone)]
pub struct TemplateDir {
    dir: PathBuf,
}

impl TemplateDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl TemplateSource for TemplateDir {
    fn list_templates(&self) -> Result<Vec<Template>, StoreError> {
        if !self.dir.is_dir() {
            return Err(StoreError::TemplateDirNotFound(self.dir.clone()));
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut templates = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(label) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            templates.push(Template::new(label, text));
        }

        info!(count = templates.len(), dir = %self.dir.display(), "loaded templates");
        Ok(templates)
    }
}
