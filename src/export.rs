use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::data_uri::SVG_MIME;
use crate::error::ExportError;
use crate::normalize::normalize_content;
use crate::surface::FileSink;

/// Saves canonical markup for `content` through `sink`, whatever form it
/// arrived in. Best effort: failures are logged and swallowed.
pub fn export_as_file(
    content: &str,
    filename: Option<&str>,
    sink: &mut dyn FileSink,
    config: &EngineConfig,
) {
    if let Err(err) = try_export_as_file(content, filename, sink, config) {
        tracing::warn!(%err, "SVG export failed");
    }
}

/// Like [`export_as_file`], but reports the failure. Returns the filename used.
pub fn try_export_as_file(
    content: &str,
    filename: Option<&str>,
    sink: &mut dyn FileSink,
    config: &EngineConfig,
) -> Result<String, ExportError> {
    let filename = filename
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(config.default_filename.as_str());
    let markup = normalize_content(content, config);

    sink.save(filename, SVG_MIME, markup.as_bytes())?;
    tracing::debug!(filename, bytes = markup.as_str().len(), "exported SVG");
    Ok(filename.to_string())
}

/// Text a host should place on the clipboard for "copy SVG".
pub fn clipboard_text(content: &str, config: &EngineConfig) -> String {
    normalize_content(content, config).into_string()
}

/// [`FileSink`] writing into a directory.
#[derive(Debug, Clone)]
pub struct FsSink {
    dir: PathBuf,
}

impl FsSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSink for FsSink {
    fn save(&mut self, filename: &str, _mime: &str, bytes: &[u8]) -> Result<(), ExportError> {
        if filename.contains(['/', '\\']) || filename == ".." || filename == "." {
            return Err(ExportError::InvalidFilename(filename.to_string()));
        }
        if !self.dir.is_dir() {
            return Err(ExportError::Unavailable(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        std::fs::write(self.dir.join(filename), bytes)?;
        Ok(())
    }
}
