//! Error types for usfmconv library.

use serde::Serialize;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for usfmconv operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for usfmconv library.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading sources or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A source file could not be read.
    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Source file bytes could not be decoded as text.
    #[error("Text encoding error in {}: {message}", .path.display())]
    Encoding { path: PathBuf, message: String },

    /// Malformed marker content reported by the parser.
    #[error("Parse error{} (line {line}): {message}", location(.path))]
    Parse {
        path: Option<PathBuf>,
        line: usize,
        message: String,
    },

    /// The output renderer failed.
    #[error("Render error: {0}")]
    Render(String),

    /// Invalid or cancelled user selection (destination, dropped items).
    #[error("Invalid selection: {0}")]
    Selection(String),

    /// A conversion was requested without any real source file.
    #[error("No source files loaded")]
    EmptyFileList,

    /// A conversion is already running on this session.
    #[error("A conversion is already running")]
    SessionBusy,

    /// The requested session transition is not allowed from the current state.
    #[error("Invalid session state: {0}")]
    InvalidState(String),
}

fn location(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" in {}", path.display()),
        None => String::new(),
    }
}

impl Error {
    /// Creates a parse error that is not yet attributed to a file.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            path: None,
            line,
            message: message.into(),
        }
    }

    /// Attaches the source file path to a parse error; other errors pass through.
    pub fn in_file(self, file: impl Into<PathBuf>) -> Self {
        match self {
            Error::Parse {
                path: None,
                line,
                message,
            } => Error::Parse {
                path: Some(file.into()),
                line,
                message,
            },
            other => other,
        }
    }

    /// Classifies the error into the pipeline failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::Read { .. } | Error::Encoding { .. } => ErrorKind::IoFailure,
            Error::Parse { .. } => ErrorKind::ParseFailure,
            Error::Render(_) => ErrorKind::RenderFailure,
            Error::Selection(_)
            | Error::EmptyFileList
            | Error::SessionBusy
            | Error::InvalidState(_) => ErrorKind::SelectionFailure,
        }
    }
}

/// Failure taxonomy surfaced to the UI collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Read/write/permission/lock issues.
    IoFailure,
    /// Malformed source content.
    ParseFailure,
    /// Renderer error.
    RenderFailure,
    /// Invalid or cancelled input, filtered at the boundary.
    SelectionFailure,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::IoFailure => write!(f, "I/O failure"),
            ErrorKind::ParseFailure => write!(f, "parse failure"),
            ErrorKind::RenderFailure => write!(f, "render failure"),
            ErrorKind::SelectionFailure => write!(f, "selection failure"),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Render(format!("DOCX container: {}", err))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Render(format!("DOCX XML: {}", err))
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io(err.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_attribution() {
        let err = Error::parse(3, "verse marker without number").in_file("/tmp/a.usfm");
        let message = err.to_string();
        assert!(message.contains("/tmp/a.usfm"), "{}", message);
        assert!(message.contains("line 3"), "{}", message);
        assert_eq!(err.kind(), ErrorKind::ParseFailure);
    }

    #[test]
    fn test_parse_error_without_path() {
        let err = Error::parse(1, "bad");
        assert_eq!(err.to_string(), "Parse error (line 1): bad");
    }

    #[test]
    fn test_in_file_keeps_existing_path() {
        let err = Error::parse(1, "bad").in_file("first.usfm").in_file("second.usfm");
        match err {
            Error::Parse { path, .. } => assert_eq!(path, Some(PathBuf::from("first.usfm"))),
            _ => panic!("Expected Parse error"),
        }
    }

    #[test]
    fn test_error_kinds() {
        let io = Error::Io(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
        assert_eq!(io.kind(), ErrorKind::IoFailure);
        assert_eq!(Error::Render("boom".into()).kind(), ErrorKind::RenderFailure);
        assert_eq!(Error::Selection("cancelled".into()).kind(), ErrorKind::SelectionFailure);
        assert_eq!(Error::SessionBusy.kind(), ErrorKind::SelectionFailure);
        let read = Error::Read {
            path: PathBuf::from("locked.usfm"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        };
        assert_eq!(read.kind(), ErrorKind::IoFailure);
        assert_eq!(read.to_string(), "Cannot read locked.usfm: access denied");
        let enc = Error::Encoding {
            path: PathBuf::from("x.txt"),
            message: "invalid UTF-8".into(),
        };
        assert_eq!(enc.kind(), ErrorKind::IoFailure);
    }
}
