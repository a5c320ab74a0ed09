use std::path::Path;

use anyhow::Context as _;

use crate::{
    foundation::core::Rgba8,
    foundation::error::ViewerResult,
    trace::model::ZoneKind,
};

/// Colors used to paint a scene. Every key is optional in a theme file.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Theme {
    /// Canvas fill behind everything else.
    pub background: Rgba8,
    /// Inbound dock fill.
    pub dock_in: Rgba8,
    /// Outbound dock fill.
    pub dock_out: Rgba8,
    /// Buffer zone fill.
    pub buffer: Rgba8,
    /// Outline around every zone.
    pub zone_border: Rgba8,
    /// Zone id text.
    pub zone_label: Rgba8,
    /// Worker dot.
    pub worker: Rgba8,
    /// Worker id text.
    pub worker_label: Rgba8,
    /// Backdrop behind a worker id.
    pub worker_tile: Rgba8,
    /// Outline of the worker id backdrop.
    pub worker_tile_border: Rgba8,
    /// Incident marker strokes.
    pub incident: Rgba8,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Rgba8::rgb(0xff, 0xff, 0xff),
            dock_in: Rgba8::rgb(0x81, 0xd4, 0xfa),
            dock_out: Rgba8::rgb(0xa5, 0xd6, 0xa7),
            buffer: Rgba8::rgb(0xff, 0xe0, 0x82),
            zone_border: Rgba8::rgba(0x33, 0x33, 0x33, 0x22),
            zone_label: Rgba8::rgb(0x11, 0x11, 0x11),
            worker: Rgba8::rgb(0xe5, 0x39, 0x35),
            worker_label: Rgba8::rgb(0, 0, 0),
            worker_tile: Rgba8::rgb(0xff, 0xff, 0xff),
            worker_tile_border: Rgba8::rgba(0, 0, 0, 0x11),
            incident: Rgba8::rgb(0xd3, 0x2f, 0x2f),
        }
    }
}

impl Theme {
    /// Read a JSON theme file; missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> ViewerResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read theme '{}'", path.display()))?;
        let theme = serde_json::from_str(&text)
            .with_context(|| format!("parse theme '{}'", path.display()))?;
        Ok(theme)
    }

    /// Fixed fill of a non-storage zone. Storage fills come from occupancy.
    pub fn role_color(&self, kind: ZoneKind) -> Option<Rgba8> {
        match kind {
            ZoneKind::Storage => None,
            ZoneKind::DockIn => Some(self.dock_in),
            ZoneKind::DockOut => Some(self.dock_out),
            ZoneKind::Buffer => Some(self.buffer),
        }
    }
}
