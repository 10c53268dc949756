use thiserror::Error;

/// Failures at the edges of the engine: loading pages, parsing, config and
/// serialization. DOM reads never fail and are not represented here.
#[derive(Debug, Error)]
pub enum AutofillError {
    /// Reading a local page or config file failed.
    #[error("Failed to read {path}: {source}")]
    Io { path: String, source: std::io::Error },

    /// Fetching a page over HTTP failed.
    #[error("Failed to fetch {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    /// The HTML parser could not consume the input.
    #[error("HTML parse error ({context}): {source}")]
    HtmlParse { context: String, source: std::io::Error },

    /// The page URL could not be parsed.
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl { url: String, source: url::ParseError },

    /// JSON (de)serialization failed.
    #[error("JSON error ({context}): {source}")]
    Json { context: String, source: serde_json::Error },

    /// Transport-level failure while talking to a frame or port.
    #[error(transparent)]
    Transport(#[from] crate::transport::TransportError),
}

pub type Result<T> = std::result::Result<T, AutofillError>;
