//! Side-car assets for hypertext output: stylesheet, front matter and footer.

use crate::error::Result;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Stylesheet shipped with the library, used when no source file is configured.
pub const DEFAULT_STYLESHEET: &str = include_str!("../../assets/style.css");

/// Default stylesheet file name, linked from every rendered page.
pub const STYLESHEET_NAME: &str = "style.css";

/// Default license file inserted as front matter.
pub const LICENSE_NAME: &str = "insert_ULB_License.html";

/// Footer timestamp format (`MM/dd/yyyy HH:mm`).
pub const FOOTER_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M";

/// Where hypertext assets come from.
#[derive(Debug, Clone)]
pub struct AssetOptions {
    /// Directory searched for the license file and a stylesheet to copy.
    pub asset_dir: PathBuf,

    /// Explicit stylesheet to copy. Takes precedence over the asset directory.
    pub stylesheet_source: Option<PathBuf>,

    /// File name of the stylesheet next to the output.
    pub stylesheet_name: String,

    /// File name of the license front matter in the asset directory.
    pub license_name: String,
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("."),
            stylesheet_source: None,
            stylesheet_name: STYLESHEET_NAME.to_string(),
            license_name: LICENSE_NAME.to_string(),
        }
    }
}

impl AssetOptions {
    /// Creates new options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the asset directory.
    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = dir.into();
        self
    }

    /// Sets an explicit stylesheet source file.
    pub fn with_stylesheet_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.stylesheet_source = Some(path.into());
        self
    }

    /// Sets the stylesheet file name.
    pub fn with_stylesheet_name(mut self, name: impl Into<String>) -> Self {
        self.stylesheet_name = name.into();
        self
    }

    /// Sets the license file name.
    pub fn with_license_name(mut self, name: impl Into<String>) -> Self {
        self.license_name = name.into();
        self
    }

    /// Path of the license file.
    pub fn license_path(&self) -> PathBuf {
        self.asset_dir.join(&self.license_name)
    }
}

/// Reads the license front matter, or an empty string when there is none.
pub fn load_front_matter(options: &AssetOptions) -> Result<String> {
    let path = options.license_path();
    if path.is_file() {
        Ok(std::fs::read_to_string(path)?)
    } else {
        Ok(String::new())
    }
}

/// Builds the page footer for the given local time.
pub fn footer_html(now: DateTime<Local>) -> String {
    let timestamp = now.format(FOOTER_TIMESTAMP_FORMAT);
    format!(
        r#"<div class="FooterSection">
<table id="hrdftrtbl" border="0" cellspacing="0" cellpadding="0">
<tr><td>
<div style="mso-element:footer" id="f1">
<p class="MsoFooter">
{timestamp}
<span style="mso-tab-count:1"></span>
<span style="mso-field-code: PAGE "></span>
<span style="mso-tab-count:1"></span>
<img alt="Creative Commons License" style="border-width:0" src="https://i.creativecommons.org/l/by-sa/4.0/88x31.png" />
</p>
</div>
</td></tr>
</table>
</div>
"#
    )
}

/// Ensures the stylesheet exists in `output_dir`.
///
/// An existing file is never touched. Otherwise the stylesheet is copied from
/// the explicit source, then from the asset directory, and finally written
/// from the bundled default. Returns whether a file was created.
pub fn provision_stylesheet(output_dir: &Path, options: &AssetOptions) -> Result<bool> {
    let target = output_dir.join(&options.stylesheet_name);
    if target.exists() {
        return Ok(false);
    }

    let asset_copy = options.asset_dir.join(&options.stylesheet_name);
    let source = options
        .stylesheet_source
        .iter()
        .chain(std::iter::once(&asset_copy))
        .find(|path| path.is_file() && !same_file(path, &target));

    match source {
        Some(path) => {
            std::fs::copy(path, &target)?;
        }
        None => std::fs::write(&target, DEFAULT_STYLESHEET)?,
    }
    Ok(true)
}

fn same_file(a: &Path, b: &Path) -> bool {
    crate::model::normalize(a) == crate::model::normalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_front_matter_is_empty_without_license() {
        let dir = TempDir::new().unwrap();
        let options = AssetOptions::new().with_asset_dir(dir.path());
        assert_eq!(load_front_matter(&options).unwrap(), "");
    }

    #[test]
    fn test_front_matter_reads_license() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(LICENSE_NAME), "<p>CC BY-SA 4.0</p>").unwrap();
        let options = AssetOptions::new().with_asset_dir(dir.path());
        assert_eq!(load_front_matter(&options).unwrap(), "<p>CC BY-SA 4.0</p>");
    }

    #[test]
    fn test_footer_embeds_timestamp() {
        let now = Local.with_ymd_and_hms(2019, 6, 13, 11, 42, 0).unwrap();
        let footer = footer_html(now);
        assert!(footer.contains("06/13/2019 11:42"));
        assert!(footer.contains("mso-field-code: PAGE"));
        assert!(footer.contains("Creative Commons License"));
    }

    #[test]
    fn test_bundled_stylesheet_written_when_absent() {
        let assets = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let options = AssetOptions::new().with_asset_dir(assets.path());

        assert!(provision_stylesheet(out.path(), &options).unwrap());
        let css = fs::read_to_string(out.path().join(STYLESHEET_NAME)).unwrap();
        assert_eq!(css, DEFAULT_STYLESHEET);
        assert!(css.contains(".two-column"));
    }

    #[test]
    fn test_stylesheet_copied_from_asset_dir() {
        let assets = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(assets.path().join(STYLESHEET_NAME), "body { color: red; }").unwrap();
        let options = AssetOptions::new().with_asset_dir(assets.path());

        provision_stylesheet(out.path(), &options).unwrap();
        let css = fs::read_to_string(out.path().join(STYLESHEET_NAME)).unwrap();
        assert_eq!(css, "body { color: red; }");
    }

    #[test]
    fn test_explicit_source_wins() {
        let assets = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(assets.path().join(STYLESHEET_NAME), "asset").unwrap();
        let custom = assets.path().join("custom.css");
        fs::write(&custom, "custom").unwrap();
        let options = AssetOptions::new()
            .with_asset_dir(assets.path())
            .with_stylesheet_source(&custom);

        provision_stylesheet(out.path(), &options).unwrap();
        assert_eq!(fs::read_to_string(out.path().join(STYLESHEET_NAME)).unwrap(), "custom");
    }

    #[test]
    fn test_existing_stylesheet_is_untouched() {
        let out = TempDir::new().unwrap();
        let target = out.path().join(STYLESHEET_NAME);
        fs::write(&target, "/* edited by hand */").unwrap();

        let options = AssetOptions::new().with_asset_dir(out.path());
        assert!(!provision_stylesheet(out.path(), &options).unwrap());
        assert!(!provision_stylesheet(out.path(), &options).unwrap());
        assert_eq!(fs::read_to_string(&target).unwrap(), "/* edited by hand */");
    }
}
