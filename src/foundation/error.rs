/// Convenience result type used across wareplay.
pub type ViewerResult<T> = Result<T, ViewerError>;

/// Top-level error taxonomy used by viewer APIs.
#[derive(thiserror::Error, Debug)]
pub enum ViewerError {
    /// Invalid user-provided or trace data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while painting a scene onto a surface.
    #[error("render error: {0}")]
    Render(String),

    /// Errors while writing frames to an image or video sink.
    #[error("encode error: {0}")]
    Encode(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// The trace could not be loaded.
    #[error(transparent)]
    TraceLoad(#[from] TraceLoadError),

    /// A playback operation was rejected.
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ViewerError {
    /// Build a [`ViewerError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ViewerError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`ViewerError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`ViewerError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

/// Failure to fetch, decompress or parse a trace. Fatal for the session.
#[derive(thiserror::Error, Debug)]
pub enum TraceLoadError {
    /// Reading the raw payload failed.
    #[error("failed to fetch trace '{source_uri}'")]
    Fetch {
        /// Source the payload was requested from.
        source_uri: String,
        /// Underlying IO or transport error.
        #[source]
        cause: anyhow::Error,
    },

    /// The payload is not a valid gzip stream.
    #[error("failed to decompress trace payload")]
    Decompress(#[source] std::io::Error),

    /// The decompressed payload is not UTF-8 text.
    #[error("trace payload is not valid UTF-8")]
    Utf8(#[source] std::string::FromUtf8Error),

    /// The text is not a trace document.
    #[error("failed to parse trace JSON")]
    Parse(#[source] serde_json::Error),

    /// The document parsed but violates a model invariant.
    #[error("invalid trace: {0}")]
    Invalid(String),
}

/// Rejected playback operation. Never fatal.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// No frames are available to seek into.
    #[error("no trace frames are loaded")]
    NotLoaded,

    /// Frame rate outside the supported range.
    #[error("frame rate {0} is outside 1..=10")]
    FrameRate(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ViewerError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(ViewerError::render("x").to_string().contains("render error:"));
        assert!(ViewerError::encode("x").to_string().contains("encode error:"));
        assert!(
            ViewerError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ViewerError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn trace_load_error_keeps_cause_chain() {
        let cause = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ViewerError::from(TraceLoadError::Parse(cause));
        assert!(err.to_string().contains("parse trace JSON"));
        let source = std::error::Error::source(&err).expect("parse error has a source");
        assert!(!source.to_string().is_empty());
    }

    #[test]
    fn playback_errors_name_the_offending_value() {
        assert!(PlaybackError::FrameRate(11).to_string().contains("11"));
    }
}
