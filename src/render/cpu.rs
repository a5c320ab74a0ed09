use vello_cpu::kurbo::Shape as _;

use crate::{
    foundation::core::{Affine, BezPath, Point, Rect, Rgba8},
    foundation::error::{ViewerError, ViewerResult},
    render::{
        FrameRGBA, RenderSettings,
        text::{TextEngine, estimate_text_width, resolve_font},
    },
    scene::compile::{DrawOp, LabelTile, ScenePlan},
};

/// Paints a [`ScenePlan`] onto a reusable CPU surface.
pub struct CpuRenderer {
    settings: RenderSettings,
    text: Option<TextEngine>,
    surface: Option<CpuSurface>,
}

struct CpuSurface {
    width: u16,
    height: u16,
    pixmap: vello_cpu::Pixmap,
}

impl CpuRenderer {
    /// Build a renderer, resolving the label font once.
    pub fn new(settings: RenderSettings) -> ViewerResult<Self> {
        let text = match resolve_font(settings.font.as_deref())? {
            Some(font) => Some(TextEngine::new(&font)?),
            None => {
                tracing::warn!("no label font found; zone and worker labels will not be drawn");
                None
            }
        };
        Ok(Self {
            settings,
            text,
            surface: None,
        })
    }

    /// Renderer that never draws glyphs. Label tiles still use estimated widths.
    pub fn without_text(settings: RenderSettings) -> Self {
        Self {
            settings,
            text: None,
            surface: None,
        }
    }

    /// Settings this renderer was built with.
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// True when labels are shaped with a real font.
    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }

    /// Clear the surface and paint every op of `plan`.
    pub fn render(&mut self, plan: &ScenePlan) -> ViewerResult<FrameRGBA> {
        let width_u16: u16 = plan
            .canvas
            .width
            .try_into()
            .map_err(|_| ViewerError::render("surface width exceeds u16"))?;
        let height_u16: u16 = plan
            .canvas
            .height
            .try_into()
            .map_err(|_| ViewerError::render("surface height exceeds u16"))?;
        if width_u16 == 0 || height_u16 == 0 {
            return Err(ViewerError::render("surface width/height must be > 0"));
        }

        let mut surface = match self.surface.take() {
            Some(s) if s.width == width_u16 && s.height == height_u16 => s,
            _ => CpuSurface {
                width: width_u16,
                height: height_u16,
                pixmap: vello_cpu::Pixmap::new(width_u16, height_u16),
            },
        };
        let mut ctx = vello_cpu::RenderContext::new(surface.width, surface.height);
        // The rasterized scene replaces the whole pixmap, so the background is the first fill.
        ctx.set_paint(paint(plan.background));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(surface.width),
            f64::from(surface.height),
        ));
        let drawn = plan
            .ops
            .iter()
            .try_for_each(|op| draw_op(&mut self.text, &mut ctx, op));
        if let Err(e) = drawn {
            self.surface = Some(surface);
            return Err(e);
        }
        ctx.flush();
        ctx.render_to_pixmap(&mut surface.pixmap);

        let frame = FrameRGBA {
            width: plan.canvas.width,
            height: plan.canvas.height,
            data: surface.pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        };
        self.surface = Some(surface);
        Ok(frame)
    }
}

fn paint(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn draw_op(
    text: &mut Option<TextEngine>,
    ctx: &mut vello_cpu::RenderContext,
    op: &DrawOp,
) -> ViewerResult<()> {
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);

    match op {
        DrawOp::FillRect { rect, color } => {
            ctx.set_paint(paint(*color));
            ctx.fill_rect(&rect_to_cpu(*rect));
            Ok(())
        }
        DrawOp::StrokeRect { rect, color, width } => {
            ctx.set_paint(paint(*color));
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(*width));
            ctx.stroke_rect(&rect_to_cpu(*rect));
            Ok(())
        }
        DrawOp::FillCircle {
            center,
            radius,
            color,
        } => {
            let circle = vello_cpu::kurbo::Circle::new(point_to_cpu(*center), *radius);
            ctx.set_paint(paint(*color));
            ctx.fill_path(&circle.to_path(0.1));
            Ok(())
        }
        DrawOp::StrokePath { path, color, width } => {
            ctx.set_paint(paint(*color));
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(*width));
            ctx.stroke_path(&bezpath_to_cpu(path));
            Ok(())
        }
        DrawOp::Label {
            text: label,
            center,
            size_px,
            color,
            tile,
        } => match text {
            Some(engine) => {
                let layout = engine.layout_line(label, *size_px, (*color).into())?;
                let w = f64::from(layout.width());
                let h = f64::from(layout.height());
                if let Some(tile) = tile {
                    draw_tile(ctx, tile, center.x, w);
                }
                let origin = Affine::translate((center.x - w / 2.0, center.y - h / 2.0));
                ctx.set_transform(affine_to_cpu(origin));
                let font = engine.font().clone();
                for line in layout.lines() {
                    for item in line.items() {
                        let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                            continue;
                        };
                        let brush = run.style().brush;
                        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                            brush.r, brush.g, brush.b, brush.a,
                        ));
                        let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                            id: g.id,
                            x: g.x,
                            y: g.y,
                        });
                        ctx.glyph_run(&font)
                            .font_size(run.run().font_size())
                            .fill_glyphs(glyphs);
                    }
                }
                Ok(())
            }
            None => {
                if let Some(tile) = tile {
                    draw_tile(ctx, tile, center.x, estimate_text_width(label, *size_px));
                }
                Ok(())
            }
        },
    }
}

fn draw_tile(ctx: &mut vello_cpu::RenderContext, tile: &LabelTile, center_x: f64, text_w: f64) {
    let rect = Rect::new(
        center_x - text_w / 2.0 - tile.pad_x,
        tile.top,
        center_x + text_w / 2.0 + tile.pad_x,
        tile.top + tile.height,
    );
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint(paint(tile.fill));
    ctx.fill_rect(&rect_to_cpu(rect));
    ctx.set_paint(paint(tile.border));
    ctx.set_stroke(vello_cpu::kurbo::Stroke::new(1.0));
    ctx.stroke_rect(&rect_to_cpu(rect));
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Canvas;

    fn plan(ops: Vec<DrawOp>) -> ScenePlan {
        ScenePlan {
            canvas: Canvas {
                width: 16,
                height: 16,
            },
            background: Rgba8::rgb(255, 255, 255),
            scale: 1.0,
            zones: vec![],
            workers: vec![],
            skipped_workers: 0,
            incident: false,
            ops,
        }
    }

    fn pixel(frame: &FrameRGBA, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * frame.width + x) * 4) as usize;
        [
            frame.data[i],
            frame.data[i + 1],
            frame.data[i + 2],
            frame.data[i + 3],
        ]
    }

    #[test]
    fn empty_plan_clears_to_background() {
        let mut r = CpuRenderer::without_text(RenderSettings::default());
        let frame = r.render(&plan(vec![])).unwrap();
        assert_eq!((frame.width, frame.height), (16, 16));
        assert!(frame.premultiplied);
        assert!(frame.data.chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
    }

    #[test]
    fn fill_rect_paints_interior_pixels() {
        let mut r = CpuRenderer::without_text(RenderSettings::default());
        let frame = r
            .render(&plan(vec![DrawOp::FillRect {
                rect: Rect::new(0.0, 0.0, 8.0, 8.0),
                color: Rgba8::rgb(0, 0, 255),
            }]))
            .unwrap();
        assert_eq!(pixel(&frame, 3, 3), [0, 0, 255, 255]);
        assert_eq!(pixel(&frame, 12, 12), [255, 255, 255, 255]);
    }

    #[test]
    fn surface_is_repainted_from_scratch_each_render() {
        let mut r = CpuRenderer::without_text(RenderSettings::default());
        r.render(&plan(vec![DrawOp::FillRect {
            rect: Rect::new(0.0, 0.0, 16.0, 16.0),
            color: Rgba8::rgb(0, 0, 0),
        }]))
        .unwrap();
        let frame = r.render(&plan(vec![])).unwrap();
        assert_eq!(pixel(&frame, 8, 8), [255, 255, 255, 255]);
    }

    #[test]
    fn zero_sized_canvas_is_rejected() {
        let mut r = CpuRenderer::without_text(RenderSettings::default());
        let mut p = plan(vec![]);
        p.canvas.width = 0;
        assert!(r.render(&p).is_err());
    }
}
