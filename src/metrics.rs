//! Projection of a frame's metrics onto display text.

use std::collections::BTreeMap;

use crate::trace::model::Metrics;

/// Text shown for a metric the frame does not report.
pub const PLACEHOLDER: &str = "-";

/// How a metric value is turned into text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricFormat {
    /// Fraction shown as `value*100` with one decimal and a `%` suffix.
    Percent,
    /// One decimal place.
    Fixed1,
    /// Shortest round-trip representation.
    Plain,
}

/// The display fields of the metrics panel, in panel order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricField {
    Load,
    Otif,
    Utilization,
    Stockouts,
    Incidents,
    DockQueue,
    DockBusySec,
    Throughput,
    DoneLines,
    AvgLineLatency,
    WaitingLines,
    WavesActive,
    BuildingWaveSize,
}

impl MetricField {
    /// Every field, in panel order.
    pub const ALL: [MetricField; 13] = [
        MetricField::Load,
        MetricField::Otif,
        MetricField::Utilization,
        MetricField::Stockouts,
        MetricField::Incidents,
        MetricField::DockQueue,
        MetricField::DockBusySec,
        MetricField::Throughput,
        MetricField::DoneLines,
        MetricField::AvgLineLatency,
        MetricField::WaitingLines,
        MetricField::WavesActive,
        MetricField::BuildingWaveSize,
    ];

    /// Human-readable caption.
    pub fn label(self) -> &'static str {
        match self {
            MetricField::Load => "Load",
            MetricField::Otif => "OTIF",
            MetricField::Utilization => "Worker utilization",
            MetricField::Stockouts => "Stockouts",
            MetricField::Incidents => "Incidents",
            MetricField::DockQueue => "Dock queue",
            MetricField::DockBusySec => "Dock busy (s)",
            MetricField::Throughput => "Throughput (lines/h)",
            MetricField::DoneLines => "Completed lines",
            MetricField::AvgLineLatency => "Avg line latency (s)",
            MetricField::WaitingLines => "Waiting lines",
            MetricField::WavesActive => "Active waves",
            MetricField::BuildingWaveSize => "Building wave size",
        }
    }

    pub fn format(self) -> MetricFormat {
        match self {
            MetricField::Load | MetricField::Otif | MetricField::Utilization => {
                MetricFormat::Percent
            }
            MetricField::Throughput => MetricFormat::Fixed1,
            _ => MetricFormat::Plain,
        }
    }

    /// The field's value in `m`.
    pub fn value(self, m: &Metrics) -> Option<f64> {
        match self {
            MetricField::Load => m.load_pct,
            MetricField::Otif => m.otif_pct,
            MetricField::Utilization => m.util_workers,
            MetricField::Stockouts => m.stockouts,
            MetricField::Incidents => m.incidents,
            MetricField::DockQueue => m.dock_queue,
            MetricField::DockBusySec => m.dock_busy_sec,
            MetricField::Throughput => m.throughput_lph,
            MetricField::DoneLines => m.done_lines,
            MetricField::AvgLineLatency => m.avg_line_latency_sec,
            MetricField::WaitingLines => m.waiting_lines,
            MetricField::WavesActive => m.waves_active,
            MetricField::BuildingWaveSize => m.building_wave_size,
        }
    }
}

/// Format one metric; absent values become `placeholder`.
pub fn format_metric(value: Option<f64>, format: MetricFormat, placeholder: &str) -> String {
    let Some(v) = value else {
        return placeholder.to_string();
    };
    match format {
        MetricFormat::Percent => format!("{}%", one_decimal(v * 100.0)),
        MetricFormat::Fixed1 => one_decimal(v),
        MetricFormat::Plain => format!("{v}"),
    }
}

/// One decimal place, exact ties rounded away from zero.
///
/// `{:.1}` rounds the exact binary value but breaks ties to even. A tie at one decimal
/// only exists when `v` is an odd multiple of 0.25, where `v * 10.0` is exact.
fn one_decimal(v: f64) -> String {
    let quarters = v * 4.0;
    if quarters.fract() == 0.0 && quarters % 2.0 != 0.0 {
        format!("{:.1}", (v * 10.0).round() / 10.0)
    } else {
        format!("{v:.1}")
    }
}

/// Receives formatted metric text, one field at a time.
pub trait MetricsDisplay {
    fn set_text(&mut self, field: MetricField, text: &str);
}

/// Write every field of `metrics` to `display`.
pub fn update(display: &mut dyn MetricsDisplay, metrics: &Metrics) {
    for field in MetricField::ALL {
        let text = format_metric(field.value(metrics), field.format(), PLACEHOLDER);
        display.set_text(field, &text);
    }
}

/// In-memory panel; the stock [`MetricsDisplay`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsPanel {
    fields: BTreeMap<MetricField, String>,
}

impl MetricsPanel {
    /// Panel populated from `metrics`.
    pub fn from_metrics(metrics: &Metrics) -> Self {
        let mut panel = Self::default();
        update(&mut panel, metrics);
        panel
    }

    /// Current text of `field`, if it was ever set.
    pub fn text(&self, field: MetricField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Aligned `label: value` lines, one per field.
    pub fn render_text(&self) -> String {
        let width = MetricField::ALL
            .iter()
            .map(|f| f.label().len())
            .max()
            .unwrap_or(0);
        let mut out = String::new();
        for (field, text) in &self.fields {
            out.push_str(&format!("{:<width$}  {}\n", field.label(), text));
        }
        out
    }
}

impl MetricsDisplay for MetricsPanel {
    fn set_text(&mut self, field: MetricField, text: &str) {
        self.fields.insert(field, text.to_string());
    }
}
