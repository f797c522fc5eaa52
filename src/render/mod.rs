//! Rendering of composite documents to HTML and DOCX.
//!
//! [`RenderDispatcher`] picks the renderer for a destination, runs it, and
//! performs the finalization each format needs. Output is written to a
//! temporary file next to the destination and moved into place, so a failed
//! conversion never leaves a half-written file behind.

mod assets;
mod docx;
mod html;
mod options;

pub use assets::{
    footer_html, load_front_matter, provision_stylesheet, AssetOptions, DEFAULT_STYLESHEET,
    FOOTER_TIMESTAMP_FORMAT, LICENSE_NAME, STYLESHEET_NAME,
};
pub use docx::DocxRenderer;
pub use html::{escape_html, HtmlRenderer};
pub use options::{DocumentConfig, HypertextConfig};

use crate::error::{Error, Result};
use crate::model::Document;
use bytes::Bytes;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Produces hypertext output.
pub trait HypertextRenderer: Send + Sync {
    /// Renders the document; `front_matter` and `footer` are inserted verbatim.
    fn render(
        &self,
        document: &Document,
        config: &HypertextConfig,
        front_matter: &str,
        footer: &str,
    ) -> Result<String>;
}

/// Produces word-processor output.
pub trait DocumentRenderer: Send + Sync {
    /// Renders the document to the bytes of a complete package.
    fn render(&self, document: &Document, config: &DocumentConfig) -> Result<Bytes>;
}

/// Output format, chosen by the destination's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputKind {
    /// `.html` / `.htm`
    Hypertext,
    /// `.docx`
    DocumentFormat,
}

impl OutputKind {
    /// Infers the output kind from a destination path (case-insensitive).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("html") | Some("htm") => Ok(OutputKind::Hypertext),
            Some("docx") => Ok(OutputKind::DocumentFormat),
            _ => Err(Error::Selection(format!(
                "unsupported output type: {} (expected .html or .docx)",
                path.display()
            ))),
        }
    }

    /// Canonical file extension.
    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Hypertext => "html",
            OutputKind::DocumentFormat => "docx",
        }
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputKind::Hypertext => write!(f, "HTML"),
            OutputKind::DocumentFormat => write!(f, "DOCX"),
        }
    }
}

/// Routes a composite document to the renderer for its destination.
#[derive(Clone)]
pub struct RenderDispatcher {
    hypertext: Arc<dyn HypertextRenderer>,
    document: Arc<dyn DocumentRenderer>,
    assets: AssetOptions,
}

impl Default for RenderDispatcher {
    fn default() -> Self {
        Self::new(AssetOptions::default())
    }
}

impl std::fmt::Debug for RenderDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderDispatcher")
            .field("assets", &self.assets)
            .finish_non_exhaustive()
    }
}

impl RenderDispatcher {
    /// Creates a dispatcher using the bundled HTML and DOCX renderers.
    pub fn new(assets: AssetOptions) -> Self {
        Self {
            hypertext: Arc::new(HtmlRenderer::new()),
            document: Arc::new(DocxRenderer::new()),
            assets,
        }
    }

    /// Replaces the hypertext renderer.
    pub fn with_hypertext_renderer(mut self, renderer: impl HypertextRenderer + 'static) -> Self {
        self.hypertext = Arc::new(renderer);
        self
    }

    /// Replaces the word-processor renderer.
    pub fn with_document_renderer(mut self, renderer: impl DocumentRenderer + 'static) -> Self {
        self.document = Arc::new(renderer);
        self
    }

    /// Asset options in effect.
    pub fn assets(&self) -> &AssetOptions {
        &self.assets
    }

    /// Renders `document` to `destination`.
    ///
    /// The output kind is taken from the destination's extension. Hypertext
    /// output also gets the stylesheet provisioned next to it, before the
    /// page itself is persisted.
    pub fn dispatch(
        &self,
        document: &Document,
        configs: &(HypertextConfig, DocumentConfig),
        destination: &Path,
    ) -> Result<OutputKind> {
        let kind = OutputKind::from_path(destination)?;
        match kind {
            OutputKind::Hypertext => {
                let front_matter = load_front_matter(&self.assets)?;
                let footer = footer_html(chrono::Local::now());
                let html = self
                    .hypertext
                    .render(document, &configs.0, &front_matter, &footer)?;
                provision_stylesheet(output_dir(destination), &self.assets)?;
                write_atomic(destination, html.as_bytes())?;
            }
            OutputKind::DocumentFormat => {
                let bytes = self.document.render(document, &configs.1)?;
                write_atomic(destination, &bytes)?;
            }
        }
        Ok(kind)
    }
}

/// Renders a document to an HTML string with the bundled renderer.
pub fn render_html(document: &Document, config: &HypertextConfig) -> Result<String> {
    let footer = footer_html(chrono::Local::now());
    HtmlRenderer::new().render(document, config, "", &footer)
}

/// Renders a document to DOCX bytes with the bundled renderer.
pub fn render_docx(document: &Document, config: &DocumentConfig) -> Result<Bytes> {
    DocxRenderer::new().render(document, config)
}

fn output_dir(destination: &Path) -> &Path {
    match destination.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Writes `data` to a temporary file beside `destination`, then moves it into place.
pub fn write_atomic(destination: &Path, data: &[u8]) -> Result<()> {
    let mut file = NamedTempFile::new_in(output_dir(destination))?;
    file.write_all(data)?;
    file.flush()?;
    file.persist(destination)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::toggles::{resolve, ToggleSet};
    use crate::usfm::{MarkerParser, UsfmParser};
    use std::fs;
    use tempfile::TempDir;

    struct FailingRenderer;

    impl DocumentRenderer for FailingRenderer {
        fn render(&self, _: &Document, _: &DocumentConfig) -> Result<Bytes> {
            Err(Error::Render("out of paper".into()))
        }
    }

    fn sample() -> Document {
        UsfmParser::new()
            .parse("\\id GEN\n\\c 1\n\\p\n\\v 1 In the beginning.")
            .unwrap()
    }

    fn dispatcher(assets: &TempDir) -> RenderDispatcher {
        RenderDispatcher::new(AssetOptions::new().with_asset_dir(assets.path()))
    }

    #[test]
    fn test_output_kind_from_extension() {
        assert_eq!(OutputKind::from_path("out.html").unwrap(), OutputKind::Hypertext);
        assert_eq!(OutputKind::from_path("out.HTM").unwrap(), OutputKind::Hypertext);
        assert_eq!(OutputKind::from_path("Out.DocX").unwrap(), OutputKind::DocumentFormat);

        let err = OutputKind::from_path("out.pdf").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SelectionFailure);
        assert!(OutputKind::from_path("out").is_err());
    }

    #[test]
    fn test_html_dispatch_writes_page_and_stylesheet() {
        let assets = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let destination = out.path().join("out.html");

        let kind = dispatcher(&assets)
            .dispatch(&sample(), &resolve(&ToggleSet::default()), &destination)
            .unwrap();

        assert_eq!(kind, OutputKind::Hypertext);
        let html = fs::read_to_string(&destination).unwrap();
        assert!(html.contains("In the beginning."));
        assert!(html.contains("<div>\n"));
        assert!(html.contains("FooterSection"));
        assert!(out.path().join(STYLESHEET_NAME).is_file());
    }

    #[test]
    fn test_html_dispatch_includes_license() {
        let assets = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(assets.path().join(LICENSE_NAME), "<p>Unlocked Literal Bible</p>").unwrap();
        let destination = out.path().join("out.html");

        dispatcher(&assets)
            .dispatch(&sample(), &resolve(&ToggleSet::default()), &destination)
            .unwrap();
        let html = fs::read_to_string(&destination).unwrap();
        assert!(html.contains("<p>Unlocked Literal Bible</p>"));
    }

    #[test]
    fn test_docx_dispatch_writes_package_only() {
        let assets = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let destination = out.path().join("out.docx");

        let kind = dispatcher(&assets)
            .dispatch(&sample(), &resolve(&ToggleSet::default()), &destination)
            .unwrap();

        assert_eq!(kind, OutputKind::DocumentFormat);
        let bytes = fs::read(&destination).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        assert!(!out.path().join(STYLESHEET_NAME).exists());
    }

    #[test]
    fn test_render_failure_leaves_no_file() {
        let assets = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let destination = out.path().join("out.docx");

        let err = dispatcher(&assets)
            .with_document_renderer(FailingRenderer)
            .dispatch(&sample(), &resolve(&ToggleSet::default()), &destination)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RenderFailure);
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_stylesheet_failure_leaves_no_page() {
        let assets = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let destination = out.path().join("out.html");
        let dispatcher = RenderDispatcher::new(
            AssetOptions::new()
                .with_asset_dir(assets.path())
                .with_stylesheet_name("css/style.css"),
        );

        let err = dispatcher
            .dispatch(&sample(), &resolve(&ToggleSet::default()), &destination)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert!(!destination.exists());
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_destination_directory_is_io_failure() {
        let assets = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let destination = out.path().join("missing").join("out.html");

        let err = dispatcher(&assets)
            .dispatch(&sample(), &resolve(&ToggleSet::default()), &destination)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[test]
    fn test_overwrites_existing_destination() {
        let out = TempDir::new().unwrap();
        let destination = out.path().join("out.html");
        fs::write(&destination, "old").unwrap();

        write_atomic(&destination, b"new").unwrap();
        assert_eq!(fs::read_to_string(&destination).unwrap(), "new");
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 1);
    }
}
