//! Parsing options for marker sources.

/// Markers dropped by default: chunk markers that carry no readable content.
pub const DEFAULT_IGNORED_MARKERS: &[&str] = &["s5", "ts"];

/// Options for controlling source parsing and aggregation.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// How to handle malformed marker content.
    pub error_mode: ErrorMode,

    /// Markers removed from the tree together with their text.
    pub ignored_markers: Vec<String>,

    /// Whether to apply Unicode NFC normalization before parsing.
    pub normalize_unicode: bool,

    /// Whether to read and parse files concurrently.
    /// Insertion and progress still follow file order.
    pub parallel: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            error_mode: ErrorMode::Strict,
            ignored_markers: DEFAULT_IGNORED_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            normalize_unicode: true,
            parallel: false,
        }
    }
}

impl ParseOptions {
    /// Creates new options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets lenient error handling (recover from malformed markers).
    pub fn lenient(mut self) -> Self {
        self.error_mode = ErrorMode::Lenient;
        self
    }

    /// Sets strict error handling (fail on malformed markers).
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Adds a marker to the ignore list.
    pub fn with_ignored_marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        let marker = marker.trim_start_matches('\\').to_string();
        if !self.ignored_markers.contains(&marker) {
            self.ignored_markers.push(marker);
        }
        self
    }

    /// Clears the ignore list.
    pub fn without_ignored_markers(mut self) -> Self {
        self.ignored_markers.clear();
        self
    }

    /// Disables Unicode normalization.
    pub fn without_normalization(mut self) -> Self {
        self.normalize_unicode = false;
        self
    }

    /// Enables concurrent parsing.
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Disables concurrent parsing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Returns true if malformed content should be recovered from.
    pub fn is_lenient(&self) -> bool {
        matches!(self.error_mode, ErrorMode::Lenient)
    }

    /// Returns true if the marker tag is ignored.
    pub fn is_ignored(&self, tag: &str) -> bool {
        self.ignored_markers.iter().any(|m| m == tag)
    }
}

/// How to handle malformed marker content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Fail immediately on malformed content.
    #[default]
    Strict,
    /// Recover and keep parsing.
    Lenient,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ParseOptions::default();
        assert_eq!(options.error_mode, ErrorMode::Strict);
        assert!(options.is_ignored("s5"));
        assert!(options.is_ignored("ts"));
        assert!(!options.is_ignored("s1"));
        assert!(options.normalize_unicode);
        assert!(!options.parallel);
    }

    #[test]
    fn test_builder_chain() {
        let options = ParseOptions::new()
            .lenient()
            .with_ignored_marker("\\rem")
            .with_ignored_marker("rem")
            .parallel()
            .without_normalization();

        assert!(options.is_lenient());
        assert!(options.is_ignored("rem"));
        assert_eq!(options.ignored_markers, vec!["s5", "ts", "rem"]);
        assert!(options.parallel);
        assert!(!options.normalize_unicode);

        let options = options.strict().sequential().without_ignored_markers();
        assert!(!options.is_lenient());
        assert!(!options.parallel);
        assert!(options.ignored_markers.is_empty());
    }
}
