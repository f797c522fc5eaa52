//! Source file discovery from directories, selections and drops.

use crate::error::{Error, Result};
use crate::model::{normalize, SourceFile, SourceFileList};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions accepted as convertible sources (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["usfm", "txt", "sfm"];

/// Returns true if the path has a supported source extension.
pub fn is_supported(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

/// Recursively discovers source files under a directory.
///
/// Each directory lists its entries in file-name order; the files of a
/// directory come before the contents of its subdirectories. Unsupported
/// files are skipped without error.
pub fn discover(root: impl AsRef<Path>) -> Result<SourceFileList> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(Error::Selection(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut seen = HashSet::new();
    let mut files = SourceFileList::new();
    walk(root, &mut seen, &mut files)?;
    Ok(files)
}

fn walk(dir: &Path, seen: &mut HashSet<PathBuf>, files: &mut SourceFileList) -> Result<()> {
    // Files sort before directories, so each directory's own files precede
    // the contents of its subdirectories. Links are not followed.
    let walker = WalkDir::new(dir).min_depth(1).sort_by(|a, b| {
        a.file_type()
            .is_dir()
            .cmp(&b.file_type().is_dir())
            .then_with(|| a.file_name().cmp(b.file_name()))
    });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => return Err(Error::Io(err.into())),
            Err(_) => continue,
        };
        let path = entry.path();
        if !entry.file_type().is_dir() && is_supported(path) && path.is_file() {
            push_unique(path, seen, files);
        }
    }

    Ok(())
}

fn push_unique(path: &Path, seen: &mut HashSet<PathBuf>, files: &mut SourceFileList) {
    if seen.insert(normalize(path)) {
        if let Some(file) = SourceFile::new(path) {
            files.push(file);
        }
    }
}

/// Builds a source list from an explicit selection, in selection order.
///
/// Files are filtered by extension; a selected directory is expanded with
/// the directory walk. Paths that do not exist are skipped.
pub fn discover_selection<I, P>(paths: I) -> Result<SourceFileList>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut seen = HashSet::new();
    let mut files = SourceFileList::new();

    for path in paths {
        let path = path.as_ref();
        if path.is_dir() {
            walk(path, &mut seen, &mut files)?;
        } else if path.is_file() && is_supported(path) {
            push_unique(path, &mut seen, &mut files);
        }
    }

    Ok(files)
}

/// Validates a drag-and-drop payload.
///
/// Only a single item that is a directory is accepted; anything else is a
/// selection failure with no effect on the caller's state.
pub fn accept_drop<P: AsRef<Path>>(items: &[P]) -> Result<PathBuf> {
    match items {
        [item] if item.as_ref().is_dir() => Ok(item.as_ref().to_path_buf()),
        [item] => Err(Error::Selection(format!(
            "dropped item {} is not a directory",
            item.as_ref().display()
        ))),
        [] => Err(Error::Selection("nothing was dropped".into())),
        _ => Err(Error::Selection(format!(
            "only a single directory can be dropped ({} items)",
            items.len()
        ))),
    }
}
