//! Asset store: writes extracted images and computes their Markdown links.
//!
//! File names are derived from the adapter's origin label and made unique by
//! probing the output directory itself, so two runs against the same
//! directory never overwrite each other's files. Links are relative to the
//! directory the Markdown file will live in and always use `/`.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use md5::{Digest, Md5};

use crate::error::{Error, Result};
use crate::model::{
    ContainerContext, Diagnostic, DiagnosticKind, ImageAsset, StoredAsset,
};

/// Writes [`ImageAsset`]s under one output directory.
///
/// A store is scoped to a single extraction; it keeps no naming state
/// between calls other than what is on disk.
#[derive(Debug)]
pub struct AssetStore {
    output_dir: PathBuf,
    markdown_dir: PathBuf,
    document_stem: String,
    deduplicate: bool,
    by_hash: HashMap<String, StoredAsset>,
    diagnostics: Vec<Diagnostic>,
}

impl AssetStore {
    /// Create a store writing into `output_dir`, linking from `markdown_dir`.
    ///
    /// Both directories are made absolute against the current directory.
    /// Nothing is created on disk until the first image is persisted.
    pub fn new(
        output_dir: impl AsRef<Path>,
        markdown_dir: impl AsRef<Path>,
        document_stem: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            output_dir: normalize(&absolutize(output_dir.as_ref())?),
            markdown_dir: normalize(&absolutize(markdown_dir.as_ref())?),
            document_stem: document_stem.into(),
            deduplicate: false,
            by_hash: HashMap::new(),
            diagnostics: Vec::new(),
        })
    }

    /// Reuse the first stored file when identical image bytes are persisted again.
    pub fn with_deduplication(mut self, enabled: bool) -> Self {
        self.deduplicate = enabled;
        self
    }

    /// Absolute output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Absolute Markdown directory.
    pub fn markdown_dir(&self) -> &Path {
        &self.markdown_dir
    }

    /// Write one image and describe where it went.
    ///
    /// The file name is the sanitized label plus the format's extension. If
    /// that name is taken, `_1`, `_2`, ... are appended until a free name is
    /// found.
    pub fn persist(
        &mut self,
        asset: &ImageAsset,
        container: &ContainerContext,
    ) -> Result<StoredAsset> {
        if asset.is_empty() {
            return Err(Error::asset(asset.label(), "image data is empty"));
        }

        let content_hash = format!("{:x}", Md5::digest(asset.bytes()));
        if self.deduplicate {
            if let Some(existing) = self.by_hash.get(&content_hash) {
                log::debug!(
                    "Reusing {} for duplicate image {}",
                    existing.filename,
                    asset.label()
                );
                return Ok(StoredAsset {
                    container: container.clone(),
                    ..existing.clone()
                });
            }
        }

        fs::create_dir_all(&self.output_dir).map_err(|e| Error::asset(asset.label(), e))?;

        let stem = sanitize_label(asset.label());
        let extension = asset.format().extension();
        let (absolute_path, filename) =
            write_unique(&self.output_dir, &stem, extension, asset.bytes())
                .map_err(|e| Error::asset(asset.label(), e))?;

        let relative_path = match relativize(&absolute_path, &self.markdown_dir) {
            Ok(rel) => rel,
            Err(err) => {
                let fallback = format!("images/{}/{}", self.document_stem, filename);
                log::warn!("{}; using {}", err, fallback);
                self.diagnostics.push(
                    Diagnostic::new(
                        DiagnosticKind::RelativizationFailed,
                        format!("{}; linked as {}", err, fallback),
                    )
                    .in_container(container),
                );
                fallback
            }
        };

        let filename_stem = filename
            .strip_suffix(&format!(".{}", extension))
            .unwrap_or(&filename)
            .to_string();

        let stored = StoredAsset {
            absolute_path,
            filename,
            filename_stem,
            extension: extension.to_string(),
            relative_path,
            container: container.clone(),
            width: asset.width(),
            height: asset.height(),
            byte_size: asset.len() as u64,
            format: asset.format(),
            content_hash: content_hash.clone(),
        };

        if self.deduplicate {
            self.by_hash.insert(content_hash, stored.clone());
        }
        Ok(stored)
    }

    /// Drain the notes recorded while persisting.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

/// Create `stem.ext`, or the first free `stem_N.ext`, and write `bytes` into it.
fn write_unique(dir: &Path, stem: &str, extension: &str, bytes: &[u8]) -> io::Result<(PathBuf, String)> {
    let mut filename = format!("{}.{}", stem, extension);
    let mut counter = 1u32;
    loop {
        let path = dir.join(&filename);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(bytes).and_then(|_| file.flush()) {
                    drop(file);
                    let _ = fs::remove_file(&path);
                    return Err(e);
                }
                return Ok((path, filename));
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                filename = format!("{}_{}.{}", stem, counter, extension);
                counter += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Reduce a label to a safe file stem.
///
/// Keeps alphanumerics, spaces, hyphens and underscores, trims trailing
/// whitespace and turns spaces into underscores.
///
/// ```
/// use docmark::assets::sanitize_label;
///
/// assert_eq!(sanitize_label("page 3 image 2"), "page_3_image_2");
/// assert_eq!(sanitize_label("sheet_Q1/Q2: totals"), "sheet_Q1Q2_totals");
/// ```
pub fn sanitize_label(label: &str) -> String {
    let kept: String = label
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let stem = kept.trim_end().replace(' ', "_");
    if stem.is_empty() {
        "image".to_string()
    } else {
        stem
    }
}

/// Path from `base` to `path`, joined with `/` on every platform.
///
/// Both paths are made absolute and normalized lexically first. Paths on
/// different roots (for example two Windows drives) have no relative form
/// and yield [`Error::RelativizationFailed`].
pub fn relativize(path: &Path, base: &Path) -> Result<String> {
    let failed = || Error::RelativizationFailed {
        path: path.display().to_string(),
        base: base.display().to_string(),
    };
    let path = normalize(&absolutize(path).map_err(|_| failed())?);
    let base = normalize(&absolutize(base).map_err(|_| failed())?);

    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    fn root<'a>(parts: &[Component<'a>]) -> Vec<Component<'a>> {
        parts
            .iter()
            .take_while(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
            .cloned()
            .collect()
    }
    if root(&path_parts) != root(&base_parts) {
        return Err(failed());
    }

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for _ in common..base_parts.len() {
        segments.push("..".to_string());
    }
    for part in &path_parts[common..] {
        match part {
            Component::Normal(s) => segments.push(s.to_string_lossy().into_owned()),
            _ => return Err(failed()),
        }
    }

    if segments.is_empty() {
        Ok(".".to_string())
    } else {
        Ok(segments.join("/"))
    }
}

fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(
                    out.components().next_back(),
                    Some(Component::RootDir) | Some(Component::Prefix(_)) | None
                ) {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
