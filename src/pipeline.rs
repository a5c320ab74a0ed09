use std::{
    io::Write,
    ops::Range,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::{
    encode::{ensure_parent_dir, gif::GifWriter},
    foundation::error::{PlaybackError, ViewerError, ViewerResult},
    metrics::MetricsPanel,
    playback::{controller::FrameSink, state::FrameRate},
    render::{FrameRGBA, cpu::CpuRenderer},
    scene::compile::{ScenePlan, compose_scene},
    trace::model::{Frame, Trace},
};

/// Build the draw list for frame `index` using the renderer's canvas and theme.
pub fn plan_frame(trace: &Trace, index: usize, renderer: &CpuRenderer) -> ViewerResult<ScenePlan> {
    let frame = trace.frame(index).ok_or_else(|| {
        ViewerError::validation(format!(
            "frame {index} is out of range (trace has {} frames)",
            trace.frame_count()
        ))
    })?;
    let settings = renderer.settings();
    Ok(compose_scene(
        &trace.layout,
        frame,
        settings.canvas,
        &settings.theme,
    ))
}

/// Compose + paint a single frame.
///
/// Returns a [`FrameRGBA`] containing **premultiplied** RGBA8 pixels.
pub fn render_frame(
    trace: &Trace,
    index: usize,
    renderer: &mut CpuRenderer,
) -> ViewerResult<FrameRGBA> {
    let plan = plan_frame(trace, index, renderer)?;
    if plan.skipped_workers > 0 {
        tracing::debug!(
            frame = index,
            skipped = plan.skipped_workers,
            "workers with unknown zones not drawn"
        );
    }
    renderer.render(&plan)
}

/// Write a frame as PNG. The file is replaced atomically so watchers never see a partial image.
pub fn write_png(frame: &FrameRGBA, path: &Path) -> ViewerResult<()> {
    ensure_parent_dir(path)?;
    let tmp = path.with_extension("png.partial");
    image::save_buffer_with_format(
        &tmp,
        &frame.to_straight_rgba8(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("move png into place at '{}'", path.display()))?;
    Ok(())
}

/// Render frame `index` (clamped into the trace) straight to a PNG file.
pub fn render_frame_png(
    trace: &Trace,
    index: usize,
    renderer: &mut CpuRenderer,
    path: &Path,
) -> ViewerResult<usize> {
    let last = trace
        .frame_count()
        .checked_sub(1)
        .ok_or(PlaybackError::NotLoaded)?;
    let index = index.min(last);
    let frame = render_frame(trace, index, renderer)?;
    write_png(&frame, path)?;
    Ok(index)
}

/// Options for [`export_trace`].
#[derive(Clone, Debug)]
pub struct ExportOpts {
    /// Frames to export (start inclusive, end exclusive); `None` exports all.
    pub range: Option<Range<usize>>,
    pub fps: FrameRate,
    /// Whether an existing output file may be replaced.
    pub overwrite: bool,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self {
            range: None,
            fps: FrameRate::default(),
            overwrite: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub frames_written: usize,
    pub workers_skipped: usize,
}

/// Render a frame range of `trace` into an animated GIF; the path must end in `.gif`.
pub fn export_trace(
    trace: &Trace,
    out_path: &Path,
    opts: &ExportOpts,
    renderer: &mut CpuRenderer,
) -> ViewerResult<ExportStats> {
    let is_gif = out_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gif"));
    if !is_gif {
        return Err(ViewerError::validation(format!(
            "unsupported export target '{}' (expected .gif)",
            out_path.display()
        )));
    }
    export_gif(trace, out_path, opts, renderer)
}

/// Looping GIF, one frame every `1000/fps` ms.
#[tracing::instrument(skip_all, fields(out = %out_path.display()))]
pub fn export_gif(
    trace: &Trace,
    out_path: &Path,
    opts: &ExportOpts,
    renderer: &mut CpuRenderer,
) -> ViewerResult<ExportStats> {
    let range = export_range(trace, out_path, opts)?;
    let mut gif = GifWriter::create(out_path, opts.fps.get(), opaque_background(renderer))?;

    let mut stats = ExportStats::default();
    for idx in range {
        let plan = plan_frame(trace, idx, renderer)?;
        stats.workers_skipped += plan.skipped_workers;
        let frame = renderer.render(&plan)?;
        gif.push(&frame)?;
        stats.frames_written += 1;
    }
    // The GIF trailer is written when the encoder drops.
    drop(gif);

    tracing::info!(
        frames = stats.frames_written,
        skipped_workers = stats.workers_skipped,
        "export finished"
    );
    Ok(stats)
}

fn export_range(trace: &Trace, out_path: &Path, opts: &ExportOpts) -> ViewerResult<Range<usize>> {
    let range = opts.range.clone().unwrap_or(0..trace.frame_count());
    if range.is_empty() {
        return Err(ViewerError::validation("export range must be non-empty"));
    }
    if range.end > trace.frame_count() {
        return Err(ViewerError::validation(format!(
            "export range {}..{} exceeds trace length {}",
            range.start,
            range.end,
            trace.frame_count()
        )));
    }
    if !opts.overwrite && out_path.exists() {
        return Err(ViewerError::validation(format!(
            "output file '{}' already exists",
            out_path.display()
        )));
    }
    Ok(range)
}

fn opaque_background(renderer: &CpuRenderer) -> [u8; 4] {
    let bg = renderer.settings().theme.background;
    [bg.r, bg.g, bg.b, 255]
}

/// Player sink: paints the frame into a PNG and prints the position and metrics panel.
pub struct PngFrameSink<W> {
    renderer: CpuRenderer,
    out_path: PathBuf,
    console: W,
    presented: usize,
}

impl<W: Write> PngFrameSink<W> {
    pub fn new(renderer: CpuRenderer, out_path: impl Into<PathBuf>, console: W) -> Self {
        Self {
            renderer,
            out_path: out_path.into(),
            console,
            presented: 0,
        }
    }

    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    /// Frames presented so far.
    pub fn presented(&self) -> usize {
        self.presented
    }

    pub fn console(&self) -> &W {
        &self.console
    }
}

impl<W: Write> FrameSink for PngFrameSink<W> {
    fn present(&mut self, trace: &Trace, index: usize, frame: &Frame) -> ViewerResult<()> {
        let pixels = render_frame(trace, index, &mut self.renderer)?;
        write_png(&pixels, &self.out_path)?;
        self.presented += 1;

        let panel = MetricsPanel::from_metrics(&frame.metrics);
        let incident = if frame.metrics.has_incident() {
            "  [incident]"
        } else {
            ""
        };
        write!(
            self.console,
            "frame {}/{}{incident}\n{}",
            index + 1,
            trace.frame_count(),
            panel.render_text()
        )
        .and_then(|_| self.console.flush())
        .context("write metrics panel")?;
        Ok(())
    }
}
