//! Format-specific render configurations.
//!
//! Both are produced by [`crate::toggles::resolve`] from the same toggle set
//! and are never cached between conversions.

use serde::Serialize;

/// Configuration for hypertext output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypertextConfig {
    /// Style classes applied to the content wrapper, in resolution order.
    pub div_classes: Vec<String>,

    /// Whether each chapter after the first starts on a new page.
    pub separate_chapters: bool,

    /// Whether each verse is its own paragraph.
    pub separate_verses: bool,
}

impl Default for HypertextConfig {
    fn default() -> Self {
        Self {
            div_classes: Vec::new(),
            separate_chapters: true,
            separate_verses: false,
        }
    }
}

impl HypertextConfig {
    /// Value of the wrapper's `class` attribute, `None` when there are no classes.
    pub fn class_attribute(&self) -> Option<String> {
        if self.div_classes.is_empty() {
            None
        } else {
            Some(self.div_classes.join(" "))
        }
    }
}

/// Configuration for word-processor output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentConfig {
    /// Line spacing multiplier (1.0 or 2.0).
    pub line_spacing: f64,

    /// Number of text columns per page.
    pub column_count: u8,

    /// Whether paragraphs and runs are laid out right to left.
    pub right_to_left: bool,

    /// Whether each chapter after the first starts on a new page.
    pub separate_chapters: bool,

    /// Whether each verse is its own paragraph.
    pub separate_verses: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            line_spacing: 1.0,
            column_count: 1,
            right_to_left: false,
            separate_chapters: true,
            separate_verses: false,
        }
    }
}

impl DocumentConfig {
    /// Line spacing in the word-processor unit (240ths of a line).
    pub fn line_twips(&self) -> u32 {
        (self.line_spacing * 240.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_attribute() {
        let mut config = HypertextConfig::default();
        assert_eq!(config.class_attribute(), None);

        config.div_classes = vec!["double-space".into(), "justified".into()];
        assert_eq!(config.class_attribute().as_deref(), Some("double-space justified"));
    }

    #[test]
    fn test_line_twips() {
        let mut config = DocumentConfig::default();
        assert_eq!(config.line_twips(), 240);
        config.line_spacing = 2.0;
        assert_eq!(config.line_twips(), 480);
    }
}
