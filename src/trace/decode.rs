use std::{
    io::Read as _,
    path::{Path, PathBuf},
};

use crate::{
    foundation::error::TraceLoadError,
    trace::model::{Frame, Layout, RawLayout, Trace},
};

/// Path the viewer loads when no source is given.
pub const DEFAULT_TRACE_SOURCE: &str = "run_dump.json.gz";

/// Where a trace payload is fetched from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceSource {
    /// Local file.
    File(PathBuf),
    /// Remote resource (requires the `http` feature to fetch).
    Http(String),
}

impl TraceSource {
    /// Interpret a CLI argument or URI: `http(s)://`, `file://`, or a plain path.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Http(raw.to_string())
        } else if let Some(rest) = raw.strip_prefix("file://") {
            Self::File(PathBuf::from(rest))
        } else {
            Self::File(PathBuf::from(raw))
        }
    }

    /// Compression implied by the source name.
    pub fn compression(&self) -> Compression {
        let name = match self {
            Self::File(p) => p.to_string_lossy().into_owned(),
            Self::Http(u) => u.split(['?', '#']).next().unwrap_or(u).to_string(),
        };
        if name.ends_with(".json") {
            Compression::None
        } else {
            Compression::Gzip
        }
    }
}

impl Default for TraceSource {
    fn default() -> Self {
        Self::File(PathBuf::from(DEFAULT_TRACE_SOURCE))
    }
}

impl std::fmt::Display for TraceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(p) => write!(f, "{}", p.display()),
            Self::Http(u) => f.write_str(u),
        }
    }
}

/// Payload encoding ahead of the JSON text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    /// gzip stream.
    Gzip,
    /// Plain UTF-8 JSON.
    None,
}

/// Fetch, decompress and parse a trace. Runs once, before the first render.
#[tracing::instrument(skip_all, fields(source = %source))]
pub async fn load(source: &TraceSource) -> Result<Trace, TraceLoadError> {
    let bytes = fetch(source).await?;
    tracing::debug!(bytes = bytes.len(), "fetched trace payload");

    let trace = decode_bytes(&bytes, source.compression())?;
    tracing::info!(
        zones = trace.layout.len(),
        frames = trace.frame_count(),
        "trace loaded"
    );

    let unresolved = trace.unresolved_workers();
    if unresolved > 0 {
        tracing::warn!(
            unresolved,
            "workers reference zones missing from the layout; they will not be drawn"
        );
    }
    Ok(trace)
}

/// Synchronous decode core: decompress, UTF-8 decode, parse.
pub fn decode_bytes(bytes: &[u8], compression: Compression) -> Result<Trace, TraceLoadError> {
    let raw = match compression {
        Compression::Gzip => gunzip(bytes)?,
        Compression::None => bytes.to_vec(),
    };
    let text = String::from_utf8(raw).map_err(TraceLoadError::Utf8)?;
    parse_trace_json(&text)
}

/// Parse trace JSON text. Layout validation failures map to [`TraceLoadError::Invalid`].
pub fn parse_trace_json(text: &str) -> Result<Trace, TraceLoadError> {
    #[derive(serde::Deserialize)]
    struct TraceDoc {
        layout: RawLayout,
        #[serde(default)]
        frames: Vec<Frame>,
    }

    let doc: TraceDoc = serde_json::from_str(text).map_err(TraceLoadError::Parse)?;
    let layout = Layout::new(doc.layout.into_zones())
        .map_err(|e| TraceLoadError::Invalid(e.to_string()))?;
    Ok(Trace {
        layout,
        frames: doc.frames,
    })
}

fn gunzip(bytes: &[u8]) -> Result<Vec<u8>, TraceLoadError> {
    let mut out = Vec::with_capacity(bytes.len().saturating_mul(4));
    flate2::read::GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(TraceLoadError::Decompress)?;
    Ok(out)
}

async fn fetch(source: &TraceSource) -> Result<Vec<u8>, TraceLoadError> {
    match source {
        TraceSource::File(path) => read_file(path).await,
        TraceSource::Http(url) => fetch_http(url).await,
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, TraceLoadError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| TraceLoadError::Fetch {
            source_uri: path.display().to_string(),
            cause: anyhow::Error::new(e),
        })
}

#[cfg(feature = "http")]
async fn fetch_http(url: &str) -> Result<Vec<u8>, TraceLoadError> {
    let fetch_err = |e: reqwest::Error| TraceLoadError::Fetch {
        source_uri: url.to_string(),
        cause: anyhow::Error::new(e),
    };
    let resp = reqwest::get(url)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(fetch_err)?;
    let body = resp.bytes().await.map_err(fetch_err)?;
    Ok(body.to_vec())
}

#[cfg(not(feature = "http"))]
async fn fetch_http(url: &str) -> Result<Vec<u8>, TraceLoadError> {
    Err(TraceLoadError::Fetch {
        source_uri: url.to_string(),
        cause: anyhow::anyhow!("http sources require the `http` feature"),
    })
}
