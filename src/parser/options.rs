//! Adapter options.

use serde::{Deserialize, Serialize};

/// Default minimum width and height, in pixels, for a PDF image to be kept.
pub const DEFAULT_MIN_IMAGE_SIZE: u32 = 50;

/// Options shared by all format adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// What to extract from the document
    pub extract_mode: ExtractMode,

    /// Images narrower or shorter than this are treated as decorative and dropped
    pub min_image_size: u32,

    /// Whether PDF pages are processed in parallel
    pub parallel: bool,
}

impl ParseOptions {
    /// Create new parse options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set extract mode.
    pub fn with_extract_mode(mut self, mode: ExtractMode) -> Self {
        self.extract_mode = mode;
        self
    }

    /// Extract text and tables only.
    pub fn text_only(mut self) -> Self {
        self.extract_mode = ExtractMode::TextOnly;
        self
    }

    /// Set the decorative-image threshold.
    pub fn with_min_image_size(mut self, pixels: u32) -> Self {
        self.min_image_size = pixels;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Whether images should be extracted at all.
    pub fn wants_images(&self) -> bool {
        self.extract_mode == ExtractMode::Full
    }

    /// Check an image's pixel size against the threshold.
    pub fn keeps_image(&self, width: u32, height: u32) -> bool {
        width >= self.min_image_size && height >= self.min_image_size
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            extract_mode: ExtractMode::Full,
            min_image_size: DEFAULT_MIN_IMAGE_SIZE,
            parallel: true,
        }
    }
}

/// What content to extract from the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    /// Text, tables and images
    #[default]
    Full,
    /// Text and tables only
    TextOnly,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_builder() {
        let options = ParseOptions::new()
            .text_only()
            .with_min_image_size(10)
            .sequential();

        assert_eq!(options.extract_mode, ExtractMode::TextOnly);
        assert_eq!(options.min_image_size, 10);
        assert!(!options.parallel);
        assert!(!options.wants_images());
    }

    #[test]
    fn test_default_threshold() {
        let options = ParseOptions::default();
        assert_eq!(options.min_image_size, 50);
        assert!(options.keeps_image(50, 50));
        assert!(!options.keeps_image(49, 400));
        assert!(!options.keeps_image(400, 12));
    }
}
