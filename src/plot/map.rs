use std::collections::BTreeMap;

use plotly::common::{Marker, Mode, SizeMode, Title};
use plotly::layout::{Center, HoverMode, Layout, Mapbox};
use plotly::{Plot, ScatterMapbox};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

use crate::capacity::CapacityRecord;
use crate::plot::palette::category_color;
use crate::plot::{BubbleStyle, DEFAULT_MARKER_SIZE, marker_sizes};

/// Standard deviation, in degrees, of the jitter that keeps stacked layers visible
pub const JITTER_DEGREES: f64 = 0.005;

/// Mapbox view shared by every bubble map
#[derive(Debug, Clone)]
pub struct MapSettings {
    pub access_token: String,
    pub center: (f64, f64),
    pub zoom: u8,
}

impl MapSettings {
    /// Continental US view
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            center: (38.0, -94.0),
            zoom: 3,
        }
    }

    pub fn layout(&self, title: &str) -> Layout {
        Layout::new()
            .title(Title::with_text(title))
            .show_legend(true)
            .auto_size(true)
            .hover_mode(HoverMode::Closest)
            .mapbox(
                Mapbox::new()
                    .access_token(self.access_token.as_str())
                    .bearing(0.0)
                    .center(Center::new(self.center.0, self.center.1))
                    .pitch(0.0)
                    .zoom(self.zoom),
            )
    }
}

/// One data set drawn as its own legend entry
#[derive(Debug, Clone)]
pub struct BubbleLayer {
    pub records: Vec<CapacityRecord>,
    pub style: BubbleStyle,
}

fn hover_text(records: &[CapacityRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.label.clone().unwrap_or_default())
        .collect()
}

fn styled_marker(records: &[CapacityRecord], style: &BubbleStyle) -> Marker {
    let mut marker = Marker::new()
        .size_array(marker_sizes(records, style.scale, style.relative))
        .size_mode(SizeMode::Area)
        .size_min(1)
        .opacity(style.color.opacity())
        .reverse_scale(style.color.reverse_scale());

    if let Some(rgb) = style.color.rgb() {
        marker = marker.color(rgb).show_scale(false);
    }
    if let Some(scale) = style.color.color_scale() {
        let capacities: Vec<f64> = records.iter().map(|r| r.capacity).collect();
        marker = marker.color_array(capacities).color_scale(scale).show_scale(true);
    }
    marker
}

fn bubble_trace(
    lat: Vec<f64>,
    lon: Vec<f64>,
    records: &[CapacityRecord],
    style: &BubbleStyle,
) -> Box<ScatterMapbox<f64, f64>> {
    ScatterMapbox::new(lat, lon)
        .mode(Mode::Markers)
        .name(style.legend.as_str())
        .text_array(hover_text(records))
        .marker(styled_marker(records, style))
}

/// One bubble per record, sized and colored by capacity
pub fn capacity_bubbleplot(
    records: &[CapacityRecord],
    title: &str,
    style: &BubbleStyle,
    map: &MapSettings,
) -> Plot {
    let lat = records.iter().map(|r| r.lat).collect();
    let lon = records.iter().map(|r| r.lon).collect();

    let mut plot = Plot::new();
    plot.add_trace(bubble_trace(lat, lon, records, style));
    plot.set_layout(map.layout(title));
    plot
}

/// One legend entry per category, each with its own palette color
pub fn capacity_bubbleplot_multicolor<F>(
    records: &[CapacityRecord],
    title: &str,
    scale: Option<f64>,
    relative: bool,
    split: F,
    map: &MapSettings,
) -> Plot
where
    F: Fn(&CapacityRecord) -> String,
{
    // sizes are normalized over the whole set, not per category
    let sizes = marker_sizes(records, scale, relative);

    let mut categories: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        categories.entry(split(record)).or_default().push(idx);
    }

    let count = categories.len();
    let mut plot = Plot::new();
    for (i, (category, members)) in categories.iter().enumerate() {
        let subset: Vec<CapacityRecord> = members.iter().map(|&m| records[m].clone()).collect();
        let marker = Marker::new()
            .size_array(
                members
                    .iter()
                    .map(|&m| sizes.get(m).copied().unwrap_or(DEFAULT_MARKER_SIZE))
                    .collect(),
            )
            .color(category_color(i, count))
            .show_scale(false)
            .reverse_scale(false)
            .size_mode(SizeMode::Area)
            .opacity(0.75)
            .size_min(2);

        let trace = ScatterMapbox::new(
            subset.iter().map(|r| r.lat).collect(),
            subset.iter().map(|r| r.lon).collect(),
        )
        .mode(Mode::Markers)
        .name(category.as_str())
        .text_array(hover_text(&subset))
        .marker(marker);
        plot.add_trace(trace);
    }

    plot.set_layout(map.layout(title));
    plot
}

/// Several data sets on one map, each nudged by a small seeded jitter
pub fn capacity_bubbleplot_multi(
    layers: &[BubbleLayer],
    title: &str,
    map: &MapSettings,
    jitter_seed: u64,
) -> Plot {
    let mut rng = StdRng::seed_from_u64(jitter_seed);
    let mut plot = Plot::new();

    for layer in layers {
        let lat = layer
            .records
            .iter()
            .map(|r| r.lat + JITTER_DEGREES * jitter(&mut rng))
            .collect();
        let lon = layer
            .records
            .iter()
            .map(|r| r.lon + JITTER_DEGREES * jitter(&mut rng))
            .collect();
        plot.add_trace(bubble_trace(lat, lon, &layer.records, &layer.style));
    }

    plot.set_layout(map.layout(title));
    plot
}

fn jitter(rng: &mut StdRng) -> f64 {
    StandardNormal.sample(rng)
}
