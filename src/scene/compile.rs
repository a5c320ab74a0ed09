use std::collections::HashMap;

use crate::{
    foundation::core::{BezPath, Canvas, Point, Rect, Rgba8, channel_from_f64},
    scene::theme::Theme,
    trace::model::{Frame, Layout, Worker, Zone, ZoneKind},
};

/// Pixel radius of a worker dot.
pub const WORKER_DOT_RADIUS: f64 = 4.0;
/// Worker placement radius as a share of the zone's smaller side.
pub const WORKER_RING_FACTOR: f64 = 0.4;
const WORKER_LABEL_PX: f32 = 10.0;
const ZONE_LABEL_MIN_PX: f64 = 8.0;
const ZONE_LABEL_MAX_PX: f64 = 28.0;
const INCIDENT_INSET_PX: f64 = 24.0;
const INCIDENT_HALF_PX: f64 = 6.0;

#[derive(Clone, Debug)]
/// Backend-agnostic draw list for one frame.
///
/// Besides the ordered `ops`, the plan keeps what it decided about zones and workers so
/// callers can inspect a frame without rasterizing it.
pub struct ScenePlan {
    pub canvas: Canvas,
    pub background: Rgba8,
    /// Layout units to pixels.
    pub scale: f64,
    pub zones: Vec<ZoneFill>,
    pub workers: Vec<PlacedWorker>,
    /// Workers dropped because their zone id is not in the layout.
    pub skipped_workers: usize,
    pub incident: bool,
    pub ops: Vec<DrawOp>,
}

#[derive(Clone, Debug, PartialEq)]
/// Resolved fill of one zone.
pub struct ZoneFill {
    pub id: String,
    pub ratio: f64,
    pub fill: Rgba8,
    pub rect: Rect,
}

#[derive(Clone, Debug, PartialEq)]
/// Pixel position chosen for one worker.
pub struct PlacedWorker {
    pub id: String,
    pub zone_id: String,
    pub position: Point,
}

#[derive(Clone, Debug, PartialEq)]
/// Opaque backing tile drawn behind a label, sized by the measured text width.
pub struct LabelTile {
    pub fill: Rgba8,
    pub border: Rgba8,
    /// Horizontal padding on each side of the text.
    pub pad_x: f64,
    pub top: f64,
    pub height: f64,
}

#[derive(Clone, Debug, PartialEq)]
/// A single paint operation in pixel space.
pub enum DrawOp {
    FillRect {
        rect: Rect,
        color: Rgba8,
    },
    StrokeRect {
        rect: Rect,
        color: Rgba8,
        width: f64,
    },
    FillCircle {
        center: Point,
        radius: f64,
        color: Rgba8,
    },
    StrokePath {
        path: BezPath,
        color: Rgba8,
        width: f64,
    },
    /// Text centered horizontally and vertically on `center`.
    Label {
        text: String,
        center: Point,
        size_px: f32,
        color: Rgba8,
        tile: Option<LabelTile>,
    },
}

/// Uniform scale that fits the whole layout (plus a one-unit margin) without cropping.
pub fn fit_scale(extent: (f64, f64), canvas: Canvas) -> f64 {
    let (max_x, max_y) = extent;
    let sx = f64::from(canvas.width) / (max_x + 1.0);
    let sy = f64::from(canvas.height) / (max_y + 1.0);
    sx.min(sy)
}

/// White at ratio 0 to saturated blue at ratio 1.
pub fn storage_fill(ratio: f64) -> Rgba8 {
    let c = channel_from_f64(255.0 * (1.0 - ratio.clamp(0.0, 1.0)));
    Rgba8::rgb(c, c, 255)
}

/// Fill color of a zone at the given occupancy ratio.
pub fn zone_fill(zone: &Zone, ratio: f64, theme: &Theme) -> Rgba8 {
    match zone.kind {
        ZoneKind::Storage => storage_fill(ratio),
        kind => theme.role_color(kind).unwrap_or(theme.buffer),
    }
}

/// Zone label size: 60% of the pixel width, kept within a readable range.
pub fn zone_label_px(width_px: f64) -> f32 {
    (width_px * 0.6).clamp(ZONE_LABEL_MIN_PX, ZONE_LABEL_MAX_PX) as f32
}

/// Positions of `count` workers spread evenly on a circle, starting on the +x axis.
pub fn ring_positions(center: Point, radius: f64, count: usize) -> Vec<Point> {
    (0..count)
        .map(|j| {
            let angle = std::f64::consts::TAU * (j as f64) / (count as f64);
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

/// Build the draw list for `frame` over `layout`.
pub fn compose_scene(layout: &Layout, frame: &Frame, canvas: Canvas, theme: &Theme) -> ScenePlan {
    let sc = fit_scale(layout.extent(), canvas);
    let mut ops = Vec::with_capacity(layout.len() * 3 + frame.workers.len() * 2 + 2);
    let mut zones = Vec::with_capacity(layout.len());

    for z in layout.zones() {
        let ratio = z.occupancy_ratio(frame.quantity(&z.id));
        let fill = zone_fill(z, ratio, theme);
        let rect = Rect::new(z.x * sc, z.y * sc, (z.x + z.w) * sc, (z.y + z.h) * sc);

        ops.push(DrawOp::FillRect { rect, color: fill });
        ops.push(DrawOp::StrokeRect {
            rect,
            color: theme.zone_border,
            width: 1.0,
        });
        ops.push(DrawOp::Label {
            text: z.id.clone(),
            center: rect.center(),
            size_px: zone_label_px(z.w * sc),
            color: theme.zone_label,
            tile: None,
        });

        zones.push(ZoneFill {
            id: z.id.clone(),
            ratio,
            fill,
            rect,
        });
    }

    let (groups, skipped_workers) = group_workers(layout, &frame.workers);
    let mut workers = Vec::with_capacity(frame.workers.len() - skipped_workers);
    for (z, members) in groups {
        let center = Point::new((z.x + z.w / 2.0) * sc, (z.y + z.h / 2.0) * sc);
        let radius = z.w.min(z.h) * sc * WORKER_RING_FACTOR;

        for (w, pos) in members
            .iter()
            .zip(ring_positions(center, radius, members.len()))
        {
            ops.push(DrawOp::FillCircle {
                center: pos,
                radius: WORKER_DOT_RADIUS,
                color: theme.worker,
            });
            ops.push(DrawOp::Label {
                text: w.id.clone(),
                center: Point::new(pos.x, pos.y - 10.0),
                size_px: WORKER_LABEL_PX,
                color: theme.worker_label,
                tile: Some(LabelTile {
                    fill: theme.worker_tile,
                    border: theme.worker_tile_border,
                    pad_x: 2.0,
                    top: pos.y - 16.0,
                    height: 12.0,
                }),
            });
            workers.push(PlacedWorker {
                id: w.id.clone(),
                zone_id: w.zone_id.clone(),
                position: pos,
            });
        }
    }

    let incident = frame.metrics.has_incident();
    if incident {
        let c = Point::new(f64::from(canvas.width) - INCIDENT_INSET_PX, INCIDENT_INSET_PX);
        let mut path = BezPath::new();
        path.move_to((c.x - INCIDENT_HALF_PX, c.y - INCIDENT_HALF_PX));
        path.line_to((c.x + INCIDENT_HALF_PX, c.y + INCIDENT_HALF_PX));
        path.move_to((c.x + INCIDENT_HALF_PX, c.y - INCIDENT_HALF_PX));
        path.line_to((c.x - INCIDENT_HALF_PX, c.y + INCIDENT_HALF_PX));
        ops.push(DrawOp::StrokePath {
            path,
            color: theme.incident,
            width: 3.0,
        });
    }

    ScenePlan {
        canvas,
        background: theme.background,
        scale: sc,
        zones,
        workers,
        skipped_workers,
        incident,
        ops,
    }
}

/// Group workers by zone, in order of first appearance. Unknown zones are counted, not drawn.
fn group_workers<'a>(
    layout: &'a Layout,
    workers: &'a [Worker],
) -> (Vec<(&'a Zone, Vec<&'a Worker>)>, usize) {
    let mut groups: Vec<(&Zone, Vec<&Worker>)> = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut skipped = 0usize;

    for w in workers {
        let Some(zone) = layout.get(&w.zone_id) else {
            tracing::debug!(worker = %w.id, zone = %w.zone_id, "worker zone not in layout; skipped");
            skipped += 1;
            continue;
        };
        match slot.get(w.zone_id.as_str()) {
            Some(&idx) => groups[idx].1.push(w),
            None => {
                slot.insert(w.zone_id.as_str(), groups.len());
                groups.push((zone, vec![w]));
            }
        }
    }
    (groups, skipped)
}
