//! Wareplay replays recorded warehouse-simulation runs frame by frame.
//!
//! A run dump (gzip-compressed JSON holding a zone layout and a time series of frames) is
//! decoded once, then every frame can be painted to pixels, played back on a timer, or
//! exported as an animation.
//!
//! # Pipeline overview
//!
//! 1. **Decode**: `TraceSource -> Trace` (fetch, gunzip, parse, validate the layout)
//! 2. **Compose**: `Layout + Frame -> ScenePlan` (pure geometry and colors, no pixels)
//! 3. **Render**: `ScenePlan -> FrameRGBA` (CPU backend, premultiplied RGBA8)
//! 4. **Present**: a [`FrameSink`] shows the pixels and the metrics panel, or the frames are
//!    encoded into a looping GIF
//!
//! Playback is driven by a [`Controller`]: seek, step, play/pause and frame-rate changes
//! all pass through it, and at most one [`PlaybackTimer`] is live at a time.
#![forbid(unsafe_code)]

mod encode;
mod foundation;
mod metrics;
mod pipeline;
mod playback;
mod render;
mod scene;
mod trace;

pub use encode::gif::GifWriter;
pub use foundation::core::{Affine, BezPath, Canvas, Point, Rect, Rgba8, Vec2};
pub use foundation::error::{PlaybackError, TraceLoadError, ViewerError, ViewerResult};
pub use metrics::{
    MetricField, MetricFormat, MetricsDisplay, MetricsPanel, PLACEHOLDER, format_metric, update,
};
pub use pipeline::{
    ExportOpts, ExportStats, PngFrameSink, export_gif, export_trace, plan_frame, render_frame,
    render_frame_png, write_png,
};
pub use playback::controller::{Controller, FrameSink, PlayerCommand, run_player};
pub use playback::state::{FrameRate, ViewerState};
pub use playback::timer::{PlaybackTimer, Tick};
pub use render::cpu::CpuRenderer;
pub use render::text::{
    FONT_ENV, FontBytes, TextBrushRgba8, TextEngine, estimate_text_width, resolve_font,
};
pub use render::{FrameRGBA, RenderSettings};
pub use scene::compile::{
    DrawOp, LabelTile, PlacedWorker, ScenePlan, WORKER_DOT_RADIUS, WORKER_RING_FACTOR, ZoneFill,
    compose_scene, fit_scale, ring_positions, storage_fill, zone_fill, zone_label_px,
};
pub use scene::theme::Theme;
pub use trace::decode::{
    Compression, DEFAULT_TRACE_SOURCE, TraceSource, decode_bytes, load, parse_trace_json,
};
pub use trace::model::{Frame, Layout, Metrics, Trace, Worker, Zone, ZoneKind};
