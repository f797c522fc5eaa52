//! # usfmconv
//!
//! Merge USFM scripture sources into one document and publish it as styled
//! HTML or as a DOCX word-processor document.
//!
//! ## Pipeline
//!
//! 1. [`discover`] finds `.usfm`, `.sfm` and `.txt` sources in a stable order.
//! 2. [`aggregate`] parses every file and merges the trees in file order.
//! 3. [`toggles::resolve`] turns the user's [`ToggleSet`] into the HTML and
//!    DOCX configurations.
//! 4. [`render::RenderDispatcher`] renders to the destination and provisions
//!    `style.css` next to HTML output.
//!
//! [`ConversionSession`] wraps the pipeline in a state machine for
//! interactive front ends.
//!
//! ## Quick Start
//!
//! ```no_run
//! use usfmconv::{Converter, Toggle, LineSpacing};
//!
//! fn main() -> usfmconv::Result<()> {
//!     let kind = Converter::new()
//!         .with_toggle(Toggle::LineSpacing(LineSpacing::Double))
//!         .convert_paths(["./usfm"], "bible.html")?;
//!     println!("Wrote {}", kind);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `async`: Async conversion API with Tokio

pub mod aggregate;
pub mod discover;
pub mod error;
pub mod model;
pub mod parse_options;
pub mod render;
pub mod session;
pub mod toggles;
pub mod usfm;

#[cfg(feature = "async")]
pub mod async_api;

// Re-exports
pub use aggregate::{aggregate, read_source};
pub use discover::{accept_drop, discover, discover_selection};
pub use error::{Error, ErrorKind, Result};
pub use model::{Document, Marker, MarkerKind, Node, SourceFile, SourceFileList, SourceKind};
pub use parse_options::{ErrorMode, ParseOptions};
pub use render::{
    AssetOptions, DocumentConfig, DocumentRenderer, HypertextConfig, HypertextRenderer,
    OutputKind, RenderDispatcher,
};
pub use session::{
    ConversionJob, ConversionSession, Outcome, Pipeline, SessionEvent, SessionStatus, View,
};
pub use toggles::{
    resolve, ColumnCount, FontSize, LineSpacing, TextAlignment, TextDirection, Toggle, ToggleSet,
};
pub use usfm::{MarkerParser, UsfmParser};

use std::path::{Path, PathBuf};

/// Parses one source file with the bundled parser.
///
/// # Example
///
/// ```no_run
/// let document = usfmconv::parse_file("01-GEN.usfm")?;
/// println!("Chapters: {}", document.chapter_count());
/// # Ok::<(), usfmconv::Error>(())
/// ```
pub fn parse_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let text = read_source(path)?;
    UsfmParser::new().parse(&text).map_err(|e| e.in_file(path))
}

/// Parses source text with the bundled parser.
pub fn parse_str(text: &str) -> Result<Document> {
    UsfmParser::new().parse(text)
}

/// Converts every source under `root` to `destination` with default formatting.
///
/// # Example
///
/// ```no_run
/// usfmconv::convert_dir("./usfm", "bible.docx")?;
/// # Ok::<(), usfmconv::Error>(())
/// ```
pub fn convert_dir(root: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<OutputKind> {
    Converter::new().convert_paths([root], destination)
}

/// Builder for one-shot conversions.
///
/// # Example
///
/// ```no_run
/// use usfmconv::{Converter, FontSize, Toggle};
///
/// let kind = Converter::new()
///     .with_toggle(Toggle::FontSize(Some(FontSize::Large)))
///     .with_asset_dir("./assets")
///     .lenient()
///     .convert_paths(["01-GEN.usfm", "02-EXO.usfm"], "out.html")?;
/// # Ok::<(), usfmconv::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Converter {
    toggles: ToggleSet,
    parse_options: ParseOptions,
    assets: AssetOptions,
}

impl Converter {
    /// Creates a converter with default toggles and options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the toggle set.
    pub fn with_toggles(mut self, toggles: ToggleSet) -> Self {
        self.toggles = toggles;
        self
    }

    /// Applies one toggle.
    pub fn with_toggle(mut self, toggle: Toggle) -> Self {
        self.toggles.set(toggle);
        self
    }

    /// Replaces the parse options.
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    /// Recovers from malformed markers instead of failing.
    pub fn lenient(mut self) -> Self {
        self.parse_options = self.parse_options.lenient();
        self
    }

    /// Parses files concurrently.
    pub fn parallel(mut self) -> Self {
        self.parse_options = self.parse_options.parallel();
        self
    }

    /// Sets the directory holding the license file and stylesheet.
    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets = self.assets.with_asset_dir(dir);
        self
    }

    /// Sets the stylesheet copied next to HTML output.
    pub fn with_stylesheet(mut self, path: impl Into<PathBuf>) -> Self {
        self.assets = self.assets.with_stylesheet_source(path);
        self
    }

    /// Toggle set in effect.
    pub fn toggles(&self) -> &ToggleSet {
        &self.toggles
    }

    /// Builds the pipeline for these settings.
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.parse_options.clone())
            .with_dispatcher(RenderDispatcher::new(self.assets.clone()))
    }

    /// Converts an already discovered file list.
    pub fn convert(
        &self,
        files: &SourceFileList,
        destination: impl AsRef<Path>,
    ) -> Result<OutputKind> {
        self.pipeline()
            .run(files, &self.toggles, destination.as_ref(), |_| {})
    }

    /// Discovers sources among `paths` (files or directories) and converts them.
    pub fn convert_paths<I, P>(&self, paths: I, destination: impl AsRef<Path>) -> Result<OutputKind>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let files = discover_selection(paths)?;
        self.convert(&files, destination)
    }
}
