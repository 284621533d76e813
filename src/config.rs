//! JSON configuration file.
//!
//! ```json
//! {
//!   "enable_image_extraction": true,
//!   "min_image_size": 50,
//!   "markdown_mode": "full_content",
//!   "container_headings": true,
//!   "deduplicate_images": false,
//!   "cleanup": "standard"
//! }
//! ```
//!
//! Missing keys take their defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extract::ExtractOptions;
use crate::parser::{ParseOptions, DEFAULT_MIN_IMAGE_SIZE};
use crate::render::{CleanupOptions, CleanupPreset, MarkdownMode, RenderOptions};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enable_image_extraction: bool,
    pub min_image_size: u32,
    pub markdown_mode: MarkdownMode,
    pub container_headings: bool,
    pub deduplicate_images: bool,
    /// `null` disables text cleanup
    pub cleanup: Option<CleanupPreset>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_image_extraction: true,
            min_image_size: DEFAULT_MIN_IMAGE_SIZE,
            markdown_mode: MarkdownMode::FullContent,
            container_headings: true,
            deduplicate_images: false,
            cleanup: Some(CleanupPreset::Standard),
        }
    }
}

impl Config {
    /// Read a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config = serde_json::from_str(&text)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Extraction options carrying these settings.
    pub fn to_options(&self) -> ExtractOptions {
        let mut render = RenderOptions::default()
            .with_mode(self.markdown_mode)
            .with_container_headings(self.container_headings);
        render.cleanup = self.cleanup.map(CleanupOptions::from_preset);

        ExtractOptions {
            parse: ParseOptions::default().with_min_image_size(self.min_image_size),
            render,
            images_enabled: self.enable_image_extraction,
            deduplicate_images: self.deduplicate_images,
            ..ExtractOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docmark.json");
        fs::write(&path, r#"{ "min_image_size": 10, "markdown_mode": "grouped" }"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.min_image_size, 10);
        assert_eq!(config.markdown_mode, MarkdownMode::Grouped);
        assert!(config.enable_image_extraction);
        assert_eq!(config.cleanup, Some(CleanupPreset::Standard));
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("docmark.json");
        let config = Config {
            enable_image_extraction: false,
            cleanup: None,
            ..Config::default()
        };
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_to_options() {
        let config = Config {
            min_image_size: 0,
            markdown_mode: MarkdownMode::Inline,
            deduplicate_images: true,
            cleanup: None,
            ..Config::default()
        };
        let options = config.to_options();
        assert_eq!(options.parse.min_image_size, 0);
        assert_eq!(options.render.mode, MarkdownMode::Inline);
        assert!(options.render.cleanup.is_none());
        assert!(options.deduplicate_images);
        assert!(options.images_enabled);
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(Error::Config(_))));
        assert!(matches!(
            Config::load(dir.path().join("missing.json")),
            Err(Error::Config(_))
        ));
    }
}
