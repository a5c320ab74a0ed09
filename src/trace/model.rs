use std::collections::{BTreeMap, HashMap};

use crate::foundation::error::{ViewerError, ViewerResult};

/// Role of a zone in the warehouse layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    /// Storage area; its fill tracks occupancy.
    Storage,
    /// Inbound dock.
    #[serde(alias = "inbound")]
    DockIn,
    /// Outbound dock.
    #[serde(alias = "outbound")]
    DockOut,
    /// Staging buffer.
    Buffer,
}

fn default_extent() -> f64 {
    1.0
}

/// Fixed rectangular region of the layout, in layout units.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Zone {
    /// Identifier, unique within a layout.
    pub id: String,
    /// Role classification.
    #[serde(rename = "type")]
    pub kind: ZoneKind,
    /// Left edge.
    #[serde(default)]
    pub x: f64,
    /// Top edge.
    #[serde(default)]
    pub y: f64,
    /// Width.
    #[serde(default = "default_extent")]
    pub w: f64,
    /// Height.
    #[serde(default = "default_extent")]
    pub h: f64,
    /// Maximum quantity the zone holds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
}

impl Zone {
    /// Occupancy ratio for `qty`, clamped to `[0, 1]`. Zero without a positive capacity.
    pub fn occupancy_ratio(&self, qty: f64) -> f64 {
        match self.capacity {
            Some(cap) if cap > 0.0 && qty.is_finite() => (qty / cap).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

/// Immutable zone collection with id lookup and cached extent.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    zones: Vec<Zone>,
    by_id: HashMap<String, usize>,
    extent: (f64, f64),
}

impl Layout {
    /// Build a layout, rejecting empty zone lists and duplicate ids.
    pub fn new(zones: Vec<Zone>) -> ViewerResult<Self> {
        if zones.is_empty() {
            return Err(ViewerError::validation("layout must contain at least one zone"));
        }

        let mut by_id = HashMap::with_capacity(zones.len());
        for (idx, z) in zones.iter().enumerate() {
            if by_id.insert(z.id.clone(), idx).is_some() {
                return Err(ViewerError::validation(format!(
                    "duplicate zone id '{}'",
                    z.id
                )));
            }
            if ![z.x, z.y, z.w, z.h].iter().all(|v| v.is_finite()) {
                return Err(ViewerError::validation(format!(
                    "zone '{}' has non-finite bounds",
                    z.id
                )));
            }
        }

        let extent = zones.iter().fold((f64::MIN, f64::MIN), |(mx, my), z| {
            (mx.max(z.x + z.w), my.max(z.y + z.h))
        });

        Ok(Self {
            zones,
            by_id,
            extent,
        })
    }

    /// Zones in document order.
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Look up a zone by id.
    pub fn get(&self, id: &str) -> Option<&Zone> {
        self.by_id.get(id).map(|&idx| &self.zones[idx])
    }

    /// `(max x+w, max y+h)` over all zones.
    pub fn extent(&self) -> (f64, f64) {
        self.extent
    }

    /// Number of zones.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Always false: a layout has at least one zone.
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl serde::Serialize for Layout {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        struct Wrapped<'a> {
            zones: &'a [Zone],
        }
        serde::Serialize::serialize(&Wrapped { zones: &self.zones }, serializer)
    }
}

/// Zone array as it appears in a dump, before validation.
#[derive(serde::Deserialize)]
#[serde(untagged)]
pub(crate) enum RawLayout {
    // Older dumps carry the zone array directly; newer ones wrap it.
    Wrapped { zones: Vec<Zone> },
    Bare(Vec<Zone>),
}

impl RawLayout {
    pub(crate) fn into_zones(self) -> Vec<Zone> {
        match self {
            Self::Wrapped { zones } | Self::Bare(zones) => zones,
        }
    }
}

impl<'de> serde::Deserialize<'de> for Layout {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <RawLayout as serde::Deserialize>::deserialize(deserializer)?;
        Layout::new(raw.into_zones()).map_err(serde::de::Error::custom)
    }
}

/// Worker position at one instant.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Worker {
    /// Worker identifier; `null` or missing reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub id: String,
    /// Zone the worker currently occupies.
    pub zone_id: String,
}

/// Aggregate metrics of one frame. Every field may be absent.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Metrics {
    /// Storage load as a fraction of total capacity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_pct: Option<f64>,
    /// On-time-in-full share of completed orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otif_pct: Option<f64>,
    /// Fraction of workers busy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub util_workers: Option<f64>,
    /// Stockout count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stockouts: Option<f64>,
    /// Incident count; any positive value raises the marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incidents: Option<f64>,
    /// Trucks waiting for a dock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dock_queue: Option<f64>,
    /// Cumulative dock busy time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dock_busy_sec: Option<f64>,
    /// Completed lines per hour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_lph: Option<f64>,
    /// Order lines completed so far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_lines: Option<f64>,
    /// Mean line latency in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_line_latency_sec: Option<f64>,
    /// Order lines not yet picked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waiting_lines: Option<f64>,
    /// Pick waves in progress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waves_active: Option<f64>,
    /// Lines collected in the wave being built.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building_wave_size: Option<f64>,
}

impl Metrics {
    /// True when the frame reports at least one incident.
    pub fn has_incident(&self) -> bool {
        self.incidents.is_some_and(|n| n > 0.0)
    }
}

/// One sampled instant of simulation state.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Frame {
    /// Quantity per zone id; missing or `null` entries hold 0.
    #[serde(deserialize_with = "null_as_zero")]
    pub zones: BTreeMap<String, f64>,
    /// Worker positions.
    pub workers: Vec<Worker>,
    /// Aggregate metrics.
    pub metrics: Metrics,
}

impl Frame {
    /// Occupancy quantity of a zone, 0 when unreported.
    pub fn quantity(&self, zone_id: &str) -> f64 {
        self.zones.get(zone_id).copied().unwrap_or(0.0)
    }
}

/// Decoded simulation run: static layout plus ordered frames.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Trace {
    /// Static zone layout.
    pub layout: Layout,
    /// Frames in time order; the index is the only time handle.
    #[serde(default)]
    pub frames: Vec<Frame>,
}

impl Trace {
    /// Frame at `index`, if in range.
    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Workers across all frames whose zone id does not resolve against the layout.
    pub fn unresolved_workers(&self) -> usize {
        self.frames
            .iter()
            .flat_map(|f| f.workers.iter())
            .filter(|w| self.layout.get(&w.zone_id).is_none())
            .count()
    }
}

fn null_as_empty<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(<Option<String> as serde::Deserialize>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_zero<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, f64>, D::Error> {
    let raw = <BTreeMap<String, Option<f64>> as serde::Deserialize>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(id, qty)| (id, qty.unwrap_or(0.0)))
        .collect())
}
