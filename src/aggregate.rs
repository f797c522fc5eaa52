//! Merging per-file marker trees into one composite document.

use crate::error::{Error, Result};
use crate::model::{Document, SourceFile, SourceFileList};
use crate::parse_options::ParseOptions;
use crate::usfm::MarkerParser;
use encoding_rs::{Encoding, UTF_8};
use rayon::prelude::*;
use std::path::Path;

/// Parses every file in order and inserts each tree into one composite.
///
/// `progress` receives `completed * 100 / total` after each file has been
/// parsed and inserted, so it never decreases and reaches 100 only after the
/// last file. On failure the partial composite is dropped.
pub fn aggregate(
    files: &SourceFileList,
    parser: &dyn MarkerParser,
    options: &ParseOptions,
    mut progress: impl FnMut(u8),
) -> Result<Document> {
    if files.is_empty() {
        return Err(Error::EmptyFileList);
    }

    let total = files.len();
    let mut composite = Document::new();

    if options.parallel {
        let parsed: Vec<Result<Document>> = files
            .iter()
            .as_slice()
            .par_iter()
            .map(|file| parse_file(file, parser))
            .collect();

        for (index, tree) in parsed.into_iter().enumerate() {
            composite.insert(tree?);
            progress(percent(index + 1, total));
        }
    } else {
        for (index, file) in files.iter().enumerate() {
            composite.insert(parse_file(file, parser)?);
            progress(percent(index + 1, total));
        }
    }

    Ok(composite)
}

fn percent(completed: usize, total: usize) -> u8 {
    (completed * 100 / total) as u8
}

fn parse_file(file: &SourceFile, parser: &dyn MarkerParser) -> Result<Document> {
    let text = read_source(file.path())?;
    parser.parse(&text).map_err(|e| e.in_file(file.path()))
}

/// Reads a source file as text.
///
/// A byte order mark selects UTF-8, UTF-16LE or UTF-16BE; without one the
/// content must be valid UTF-8.
pub fn read_source(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&bytes).ok_or_else(|| Error::Encoding {
        path: path.to_path_buf(),
        message: "content is not valid UTF-8 and has no byte order mark".to_string(),
    })
}

fn decode(bytes: &[u8]) -> Option<String> {
    match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => {
            let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
            (!had_errors).then(|| text.into_owned())
        }
        None => UTF_8
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::usfm::UsfmParser;
    use std::fs;
    use tempfile::TempDir;

    fn write_files(dir: &TempDir, files: &[(&str, &[u8])]) -> SourceFileList {
        files
            .iter()
            .map(|(name, content)| {
                let path = dir.path().join(name);
                fs::write(&path, content).unwrap();
                SourceFile::new(path).unwrap()
            })
            .collect()
    }

    fn book(code: &str) -> String {
        format!("\\id {code}\n\\c 1\n\\p\n\\v 1 Text of {code}.\n")
    }

    #[test]
    fn test_composite_preserves_file_order() {
        let dir = TempDir::new().unwrap();
        let files = write_files(
            &dir,
            &[
                ("b.usfm", book("MAT").as_bytes()),
                ("a.usfm", book("GEN").as_bytes()),
                ("c.usfm", book("REV").as_bytes()),
            ],
        );

        let doc = aggregate(&files, &UsfmParser::new(), &ParseOptions::new(), |_| {}).unwrap();
        assert_eq!(doc.book_codes(), vec!["MAT", "GEN", "REV"]);
        assert_eq!(doc.chapter_count(), 3);
    }

    #[test]
    fn test_progress_is_monotonic_and_ends_at_100() {
        let dir = TempDir::new().unwrap();
        let files = write_files(
            &dir,
            &[
                ("1.usfm", book("GEN").as_bytes()),
                ("2.usfm", book("EXO").as_bytes()),
                ("3.usfm", book("LEV").as_bytes()),
            ],
        );

        let mut updates = Vec::new();
        aggregate(&files, &UsfmParser::new(), &ParseOptions::new(), |p| updates.push(p)).unwrap();
        assert_eq!(updates, vec![33, 66, 100]);
    }

    #[test]
    fn test_parallel_mode_matches_sequential() {
        let dir = TempDir::new().unwrap();
        let names: Vec<String> = (0..8).map(|i| format!("{i:02}.usfm")).collect();
        let contents: Vec<String> = (0..8).map(|i| book(&format!("B{i:02}"))).collect();
        let pairs: Vec<(&str, &[u8])> = names
            .iter()
            .zip(&contents)
            .map(|(n, c)| (n.as_str(), c.as_bytes()))
            .collect();
        let files = write_files(&dir, &pairs);

        let parser = UsfmParser::new();
        let sequential = aggregate(&files, &parser, &ParseOptions::new(), |_| {}).unwrap();

        let mut updates = Vec::new();
        let parallel = aggregate(&files, &parser, &ParseOptions::new().parallel(), |p| {
            updates.push(p)
        })
        .unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(updates.len(), 8);
        assert!(updates.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(updates.last(), Some(&100));
    }

    #[test]
    fn test_parse_failure_names_the_file() {
        let dir = TempDir::new().unwrap();
        let files = write_files(
            &dir,
            &[
                ("good.usfm", book("GEN").as_bytes()),
                ("bad.usfm", b"\\c 1\n\\p\n\\v oops\n"),
                ("later.usfm", book("EXO").as_bytes()),
            ],
        );

        let mut updates = Vec::new();
        let err = aggregate(&files, &UsfmParser::new(), &ParseOptions::new(), |p| {
            updates.push(p)
        })
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ParseFailure);
        match err {
            Error::Parse { path, line, .. } => {
                assert!(path.unwrap().ends_with("bad.usfm"));
                assert_eq!(line, 3);
            }
            other => panic!("Expected Parse error, got {:?}", other),
        }
        assert_eq!(updates, vec![33]);
    }

    #[test]
    fn test_missing_file_is_io_failure() {
        let dir = TempDir::new().unwrap();
        let files = write_files(&dir, &[("gone.usfm", book("GEN").as_bytes())]);
        fs::remove_file(dir.path().join("gone.usfm")).unwrap();

        let err = aggregate(&files, &UsfmParser::new(), &ParseOptions::new(), |_| {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert!(matches!(&err, Error::Read { path, .. } if path.ends_with("gone.usfm")));
        assert!(err.to_string().contains("gone.usfm"), "{}", err);
    }

    #[test]
    fn test_empty_list_is_rejected() {
        let err = aggregate(
            &SourceFileList::new(),
            &UsfmParser::new(),
            &ParseOptions::new(),
            |_| panic!("no progress expected"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyFileList));
    }

    #[test]
    fn test_decodes_byte_order_marks() {
        assert_eq!(decode(b"\xEF\xBB\xBF\\id GEN").as_deref(), Some("\\id GEN"));

        let utf16le: Vec<u8> = [0xFF, 0xFE]
            .into_iter()
            .chain("\\id GEN".encode_utf16().flat_map(|u| u.to_le_bytes()))
            .collect();
        assert_eq!(decode(&utf16le).as_deref(), Some("\\id GEN"));

        let utf16be: Vec<u8> = [0xFE, 0xFF]
            .into_iter()
            .chain("\\id GEN".encode_utf16().flat_map(|u| u.to_be_bytes()))
            .collect();
        assert_eq!(decode(&utf16be).as_deref(), Some("\\id GEN"));
    }

    #[test]
    fn test_invalid_utf8_is_encoding_error() {
        let dir = TempDir::new().unwrap();
        let files = write_files(&dir, &[("latin1.usfm", b"\\p caf\xE9")]);

        let err = aggregate(&files, &UsfmParser::new(), &ParseOptions::new(), |_| {}).unwrap_err();
        assert!(matches!(err, Error::Encoding { .. }));
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }
}
