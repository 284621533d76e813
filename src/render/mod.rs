//! Markdown serialization of ordered content elements.

mod cleanup;
mod markdown;
mod options;
mod result;

pub use cleanup::{CleanupOptions, CleanupPipeline, CleanupPreset};
pub use markdown::{alt_text, image_reference, render, to_markdown_with_stats, MarkdownRenderer};
pub use options::{MarkdownMode, RenderOptions};
pub use result::{ExtractionStats, RenderResult};
