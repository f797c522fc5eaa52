//! Source files and the ordered source file list.

use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// Kind of source file, inferred from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceKind {
    /// `.usfm` / `.sfm` marker source
    Markup,
    /// `.txt` plain text (parsed as marker source as well)
    PlainText,
}

impl SourceKind {
    /// Infers the kind from a path extension (case-insensitive).
    /// Returns None for unsupported extensions.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "usfm" | "sfm" => Some(SourceKind::Markup),
            "txt" => Some(SourceKind::PlainText),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Markup => write!(f, "USFM"),
            SourceKind::PlainText => write!(f, "Text"),
        }
    }
}

/// A convertible source file, identified by its normalized absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceFile {
    path: PathBuf,
    kind: SourceKind,
}

impl SourceFile {
    /// Creates a source file from a path with a supported extension.
    /// Returns None when the extension is not supported.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        let kind = SourceKind::from_path(path)?;
        Some(Self {
            path: normalize(path),
            kind,
        })
    }

    /// Normalized absolute path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inferred kind of the file.
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// File name for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Makes a path absolute and removes `.` and `..` components lexically.
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// A row as shown by the UI file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row<'a> {
    /// A real source file
    File(&'a SourceFile),
    /// The trailing "no file yet" row; never a file
    Placeholder,
}

/// Ordered list of source files.
///
/// The UI placeholder row is not stored: `rows()` yields it at the trailing
/// position, so every counting and processing operation sees real files only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceFileList {
    files: Vec<SourceFile>,
}

impl SourceFileList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of real files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if there is no real file.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Appends a file at the end.
    pub fn push(&mut self, file: SourceFile) {
        self.files.push(file);
    }

    /// Appends every file of `other`, keeping its order. Duplicates are kept.
    pub fn extend(&mut self, other: SourceFileList) {
        self.files.extend(other.files);
    }

    /// Iterates over the real files in order.
    pub fn iter(&self) -> std::slice::Iter<'_, SourceFile> {
        self.files.iter()
    }

    /// Returns the file at a row index, None for the placeholder or out of range.
    pub fn get(&self, row: usize) -> Option<&SourceFile> {
        self.files.get(row)
    }

    /// Iterates over the UI rows: every file, then the placeholder.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.files
            .iter()
            .map(Row::File)
            .chain(std::iter::once(Row::Placeholder))
    }

    /// Index of the placeholder row.
    pub fn placeholder_row(&self) -> usize {
        self.files.len()
    }

    /// Counts the selected rows that are real files.
    pub fn removal_count(&self, selected_rows: &[usize]) -> usize {
        let mut rows: Vec<usize> = selected_rows
            .iter()
            .copied()
            .filter(|&row| row < self.files.len())
            .collect();
        rows.sort_unstable();
        rows.dedup();
        rows.len()
    }

    /// Removes the selected rows, ignoring the placeholder and unknown rows.
    /// Returns the number of files removed.
    pub fn remove_rows(&mut self, selected_rows: &[usize]) -> usize {
        let mut rows: Vec<usize> = selected_rows
            .iter()
            .copied()
            .filter(|&row| row < self.files.len())
            .collect();
        rows.sort_unstable();
        rows.dedup();
        for &row in rows.iter().rev() {
            self.files.remove(row);
        }
        rows.len()
    }

    /// Removes all files.
    pub fn clear(&mut self) {
        self.files.clear();
    }
}

impl<'a> IntoIterator for &'a SourceFileList {
    type Item = &'a SourceFile;
    type IntoIter = std::slice::Iter<'a, SourceFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

impl FromIterator<SourceFile> for SourceFileList {
    fn from_iter<I: IntoIterator<Item = SourceFile>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}
