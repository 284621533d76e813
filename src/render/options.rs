//! Rendering options and configuration.

use serde::{Deserialize, Serialize};

use super::{CleanupOptions, CleanupPreset};

/// How the element sequence is turned into Markdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkdownMode {
    /// Every element in sequence order, images at their original position
    #[default]
    FullContent,
    /// Image references only, as a flat list
    Simple,
    /// Image references grouped under one heading per page, slide or sheet
    Grouped,
    /// Image references only, each followed by a blank line
    Inline,
}

impl MarkdownMode {
    /// Whether the mode renders text and tables.
    pub fn includes_text(&self) -> bool {
        matches!(self, MarkdownMode::FullContent)
    }
}

impl std::str::FromStr for MarkdownMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "full_content" | "full" => Ok(MarkdownMode::FullContent),
            "simple" => Ok(MarkdownMode::Simple),
            "grouped" => Ok(MarkdownMode::Grouped),
            "inline" => Ok(MarkdownMode::Inline),
            other => Err(format!("unknown markdown mode: {}", other)),
        }
    }
}

/// Options for rendering document content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Rendering mode
    pub mode: MarkdownMode,

    /// Emit `## Page N` / `## Slide N` / `## <sheet>` when the container changes
    pub container_headings: bool,

    /// Emit `---` between containers
    pub container_separators: bool,

    /// Maximum heading level (1-6)
    pub max_heading_level: u8,

    /// Escape special Markdown characters in text and cells
    pub escape_special_chars: bool,

    /// Text cleanup options
    pub cleanup: Option<CleanupOptions>,
}

impl RenderOptions {
    /// Create new render options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rendering mode.
    pub fn with_mode(mut self, mode: MarkdownMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable container headings.
    pub fn with_container_headings(mut self, enabled: bool) -> Self {
        self.container_headings = enabled;
        self
    }

    /// Enable or disable separators between containers.
    pub fn with_container_separators(mut self, enabled: bool) -> Self {
        self.container_separators = enabled;
        self
    }

    /// Set the maximum heading level.
    pub fn with_max_heading(mut self, level: u8) -> Self {
        self.max_heading_level = level.clamp(1, 6);
        self
    }

    /// Enable or disable Markdown escaping.
    pub fn with_escaping(mut self, escape: bool) -> Self {
        self.escape_special_chars = escape;
        self
    }

    /// Set cleanup options.
    pub fn with_cleanup(mut self, cleanup: CleanupOptions) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    /// Set cleanup preset.
    pub fn with_cleanup_preset(mut self, preset: CleanupPreset) -> Self {
        self.cleanup = Some(CleanupOptions::from_preset(preset));
        self
    }

    /// Disable cleanup.
    pub fn without_cleanup(mut self) -> Self {
        self.cleanup = None;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            mode: MarkdownMode::FullContent,
            container_headings: true,
            container_separators: true,
            max_heading_level: 6,
            escape_special_chars: false,
            cleanup: Some(CleanupOptions::standard()),
        }
    }
}
