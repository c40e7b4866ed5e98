//! Discovery of model files and the cursor over them.

use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extension of loadable models.
pub const MODEL_EXTENSION: &str = "gguf";

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Error: Directory not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Error: cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// One model file found in the model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFile {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
}

impl ModelFile {
    /// Size rendered the way the model list shows it, e.g. `4.07 GB`.
    pub fn size_label(&self) -> String {
        format!("{:.2} GB", self.size_bytes as f64 / BYTES_PER_GB)
    }
}

impl fmt::Display for ModelFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.size_label())
    }
}

/// List the model files directly inside `dir`, sorted by file name.
pub fn scan_models(dir: &Path) -> Result<Vec<ModelFile>, RegistryError> {
    if !dir.is_dir() {
        return Err(RegistryError::NotFound(dir.to_path_buf()));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| RegistryError::Unreadable {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(MODEL_EXTENSION) {
            continue;
        }
        let size_bytes = entry.metadata().map(|meta| meta.len()).unwrap_or(0);
        // canonical so it compares equal to the supervisor's running model path
        let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        files.push(ModelFile {
            name: entry.file_name().to_string_lossy().into_owned(),
            path,
            size_bytes,
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    debug!("models scanned (dir={}, count={})", dir.display(), files.len());
    Ok(files)
}

/// Ordered model list with a selection cursor and scroll window.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    files: Vec<ModelFile>,
    selected: usize,
    offset: usize,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with the contents of `dir`.
    ///
    /// On error the current list and cursor are kept.
    pub fn refresh(&mut self, dir: &Path) -> Result<usize, RegistryError> {
        let files = scan_models(dir)?;
        self.files = files;
        self.selected = 0;
        self.offset = 0;
        Ok(self.files.len())
    }

    pub fn files(&self) -> &[ModelFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn selected(&self) -> Option<&ModelFile> {
        self.files.get(self.selected)
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.files.len() {
            self.selected += 1;
        }
    }

    /// Move the window so the cursor is one of `rows` visible rows.
    pub fn scroll_into_view(&mut self, rows: usize) {
        let rows = rows.max(1);
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + rows {
            self.offset = self.selected + 1 - rows;
        }
    }

    /// Files in the current window, with their absolute indices.
    pub fn visible(&self, rows: usize) -> impl Iterator<Item = (usize, &ModelFile)> {
        self.files
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(rows)
    }
}
