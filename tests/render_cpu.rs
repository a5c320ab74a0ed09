use std::path::PathBuf;

use wareplay::{
    Canvas, CpuRenderer, DrawOp, ExportOpts, FrameRGBA, FrameRate, FrameSink, Layout, Metrics,
    MetricField, MetricsPanel, PngFrameSink, Point, RenderSettings, Rgba8, Theme, Trace, Worker,
    Zone, ZoneKind, compose_scene, export_trace, render_frame,
};

fn storage_zone(id: &str, x: f64, y: f64) -> Zone {
    Zone {
        id: id.to_string(),
        kind: ZoneKind::Storage,
        x,
        y,
        w: 2.0,
        h: 2.0,
        capacity: Some(10.0),
    }
}

fn worker(id: &str, zone_id: &str) -> Worker {
    Worker {
        id: id.to_string(),
        zone_id: zone_id.to_string(),
    }
}

/// One storage zone `A` at half capacity with a single worker.
fn example_trace() -> Trace {
    let frame = wareplay::Frame {
        zones: [("A".to_string(), 5.0)].into_iter().collect(),
        workers: vec![worker("W1", "A")],
        metrics: Metrics {
            load_pct: Some(0.5),
            otif_pct: Some(1.0),
            util_workers: Some(0.8),
            stockouts: Some(0.0),
            incidents: Some(0.0),
            ..Metrics::default()
        },
    };
    Trace {
        layout: Layout::new(vec![storage_zone("A", 0.0, 0.0)]).unwrap(),
        frames: vec![frame],
    }
}

fn renderer(width: u32, height: u32) -> CpuRenderer {
    CpuRenderer::without_text(RenderSettings {
        canvas: Canvas::new(width, height).unwrap(),
        ..RenderSettings::default()
    })
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

fn assert_close(got: [u8; 4], want: Rgba8) {
    let want = [want.r, want.g, want.b, want.a];
    let close = got
        .iter()
        .zip(want.iter())
        .all(|(g, w)| g.abs_diff(*w) <= 2);
    assert!(close, "pixel {got:?} != {want:?}");
}

#[test]
fn half_full_storage_zone_with_one_worker() {
    let trace = example_trace();
    let theme = Theme::default();
    let canvas = Canvas::new(960, 640).unwrap();
    let plan = compose_scene(&trace.layout, &trace.frames[0], canvas, &theme);

    assert_eq!(plan.zones[0].ratio, 0.5);
    assert_eq!(plan.zones[0].fill, Rgba8::rgb(128, 128, 255));
    assert_eq!(plan.zones[0].fill.css_rgb(), "rgb(128,128,255)");
    assert!(!plan.incident);

    // Layout extent is 2x2, so the scale is min(960/3, 640/3).
    let sc = 640.0 / 3.0;
    assert!((plan.scale - sc).abs() < 1e-9);

    let center = Point::new(sc, sc);
    let radius = 2.0 * sc * 0.4;
    assert_eq!(plan.workers.len(), 1);
    let p = plan.workers[0].position;
    assert!((p.x - (center.x + radius)).abs() < 1e-9);
    assert!((p.y - center.y).abs() < 1e-9);

    let panel = MetricsPanel::from_metrics(&trace.frames[0].metrics);
    assert_eq!(panel.text(MetricField::Load), Some("50.0%"));
    assert_eq!(panel.text(MetricField::Otif), Some("100.0%"));
    assert_eq!(panel.text(MetricField::Utilization), Some("80.0%"));
    assert_eq!(panel.text(MetricField::Stockouts), Some("0"));
    assert_eq!(panel.text(MetricField::Incidents), Some("0"));
    assert_eq!(panel.text(MetricField::DockQueue), Some("-"));
}

#[test]
fn cpu_render_paints_zone_worker_and_background() {
    let trace = example_trace();
    let mut r = renderer(960, 640);
    let frame = render_frame(&trace, 0, &mut r).unwrap();

    assert_eq!((frame.width, frame.height), (960, 640));
    assert!(frame.premultiplied);

    let theme = Theme::default();
    assert_close(pixel(&frame, 100, 100), Rgba8::rgb(128, 128, 255));
    assert_close(pixel(&frame, 700, 100), theme.background);
    // Worker dot sits at (384, 213.3); its label tile ends just above.
    assert_close(pixel(&frame, 384, 214), theme.worker);
    // No incident marker.
    assert_close(pixel(&frame, 936, 24), theme.background);
}

#[test]
fn themed_background_fills_every_untouched_pixel() {
    let trace = example_trace();
    let theme = Theme {
        background: Rgba8::rgb(20, 40, 60),
        ..Theme::default()
    };
    let mut r = CpuRenderer::without_text(RenderSettings {
        canvas: Canvas::new(96, 64).unwrap(),
        theme: theme.clone(),
        ..RenderSettings::default()
    });
    let frame = render_frame(&trace, 0, &mut r).unwrap();

    for (x, y) in [(95, 0), (95, 63), (70, 40)] {
        assert_close(pixel(&frame, x, y), theme.background);
    }
    // Rendering again into the reused surface gives the same opaque corners.
    let again = render_frame(&trace, 0, &mut r).unwrap();
    assert_eq!(pixel(&again, 95, 63), pixel(&frame, 95, 63));
    assert_eq!(pixel(&again, 95, 63)[3], 255);
}

#[test]
fn incident_marker_is_drawn_in_the_top_right() {
    let mut trace = example_trace();
    trace.frames[0].metrics.incidents = Some(2.0);

    let mut r = renderer(960, 640);
    let frame = render_frame(&trace, 0, &mut r).unwrap();
    let [red, green, blue, _] = pixel(&frame, 936, 24);
    assert!(red > 150 && green < 120 && blue < 120, "got {red},{green},{blue}");
}

#[test]
fn worker_in_unknown_zone_is_skipped() {
    let mut trace = example_trace();
    trace.frames[0].workers.push(worker("W9", "GHOST"));

    let plan = compose_scene(
        &trace.layout,
        &trace.frames[0],
        Canvas::default(),
        &Theme::default(),
    );
    assert_eq!(plan.skipped_workers, 1);
    assert_eq!(plan.workers.len(), 1);
    assert_eq!(
        plan.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::FillCircle { .. }))
            .count(),
        1
    );

    let mut r = renderer(96, 64);
    assert!(render_frame(&trace, 0, &mut r).is_ok());
}

#[test]
fn workers_in_one_zone_share_a_ring() {
    let mut trace = example_trace();
    trace.frames[0].workers = vec![
        worker("W1", "A"),
        worker("W2", "A"),
        worker("W3", "A"),
        worker("W4", "A"),
    ];
    let plan = compose_scene(
        &trace.layout,
        &trace.frames[0],
        Canvas::default(),
        &Theme::default(),
    );
    let sc = plan.scale;
    let (cx, cy, radius) = (sc, sc, 2.0 * sc * 0.4);
    for w in &plan.workers {
        let d = ((w.position.x - cx).powi(2) + (w.position.y - cy).powi(2)).sqrt();
        assert!((d - radius).abs() < 1e-9);
    }
    // Quarter turns, starting on +x.
    assert!((plan.workers[1].position.y - (cy + radius)).abs() < 1e-9);
    assert!((plan.workers[2].position.x - (cx - radius)).abs() < 1e-9);
}

#[test]
fn gif_export_writes_every_frame_in_range() {
    let mut trace = example_trace();
    let mut second = trace.frames[0].clone();
    second.zones.insert("A".to_string(), 10.0);
    trace.frames.push(second);
    trace.frames.push(wareplay::Frame::default());

    let dir = PathBuf::from("target").join("render_cpu");
    let out = dir.join("run.gif");
    let _ = std::fs::remove_file(&out);

    let mut r = renderer(96, 64);
    let opts = ExportOpts {
        range: Some(1..3),
        fps: FrameRate::new(5).unwrap(),
        overwrite: true,
    };
    let stats = export_trace(&trace, &out, &opts, &mut r).unwrap();
    assert_eq!(stats.frames_written, 2);

    let img = image::open(&out).unwrap();
    assert_eq!((img.width(), img.height()), (96, 64));

    let bad_range = ExportOpts {
        range: Some(2..9),
        ..opts.clone()
    };
    assert!(export_trace(&trace, &out, &bad_range, &mut r).is_err());
    assert!(export_trace(&trace, &dir.join("run.avi"), &opts, &mut r).is_err());
}

#[test]
fn png_sink_writes_image_and_panel() {
    let trace = example_trace();
    let out = PathBuf::from("target").join("render_cpu").join("player.png");
    let _ = std::fs::remove_file(&out);

    let mut sink = PngFrameSink::new(renderer(96, 64), &out, Vec::new());
    sink.present(&trace, 0, &trace.frames[0]).unwrap();
    assert_eq!(sink.presented(), 1);

    let img = image::open(&out).unwrap();
    assert_eq!((img.width(), img.height()), (96, 64));

    let console = String::from_utf8(sink.console().clone()).unwrap();
    assert!(console.starts_with("frame 1/1\n"));
    assert!(console.contains("50.0%"));
    assert!(console.contains("Dock queue"));
}
