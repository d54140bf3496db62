/// Failures while turning a data-uri payload back into markup text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("input does not start with 'data:'")]
    NotDataUri,
    #[error("missing comma in data URI")]
    MissingComma,
    #[error("invalid base64 payload: {reason}")]
    InvalidBase64 { reason: String },
    #[error("incomplete percent-escape at byte {offset}")]
    IncompletePercentEscape { offset: usize },
    #[error("invalid percent-escape at byte {offset}")]
    InvalidPercentEscape { offset: usize },
    #[error("decoded payload is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    #[error("malformed markup: {0}")]
    Xml(String),
    #[error("markup has no root element")]
    MissingRoot,
    #[error("root element is <{0}>, expected <svg>")]
    UnexpectedRoot(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("refusing to write to '{0}': filename must not contain path separators")]
    InvalidFilename(String),
    #[error("file save is unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("failed to parse SVG: {0}")]
    Parse(String),
    #[error("failed to allocate {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },
    #[error("failed to encode PNG: {0}")]
    Encode(String),
    #[error("failed to convert SVG to PDF: {0}")]
    Pdf(String),
    #[error("invalid raster scale: {0}")]
    Scale(f32),
}
