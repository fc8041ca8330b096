pub(crate) mod histogram;
pub(crate) mod map;
pub(crate) mod palette;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use once_cell::sync::Lazy;
use plotly::Plot;
use plotly::color::Rgb;
use plotly::common::{ColorScale, ColorScalePalette};
use regex::Regex;
use thiserror::Error;

use crate::capacity::CapacityRecord;

/// Marker size when no scale is given
pub const DEFAULT_MARKER_SIZE: usize = 10;

static RGB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^rgb\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*\)$")
        .expect("rgb pattern is valid")
});

static FILE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s/]+").expect("file name pattern is valid"));

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("unknown marker color '{0}': expected rgb(r,g,b) or a color scale name")]
    InvalidColor(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Solid marker color, or a named color scale mapped over capacity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerColor {
    Solid(u8, u8, u8),
    Scale(String),
}

const SCALE_NAMES: [&str; 18] = [
    "Greys", "YlGnBu", "Greens", "YlOrRd", "Bluered", "RdBu", "Reds", "Blues", "Picnic",
    "Rainbow", "Portland", "Jet", "Hot", "Blackbody", "Earth", "Electric", "Viridis", "Cividis",
];

impl FromStr for MarkerColor {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(caps) = RGB_RE.captures(s) {
            let channel = |i: usize| {
                caps[i]
                    .parse::<u8>()
                    .map_err(|_| PlotError::InvalidColor(s.to_string()))
            };
            return Ok(MarkerColor::Solid(channel(1)?, channel(2)?, channel(3)?));
        }
        if SCALE_NAMES.contains(&s) {
            return Ok(MarkerColor::Scale(s.to_string()));
        }
        Err(PlotError::InvalidColor(s.to_string()))
    }
}

impl MarkerColor {
    pub fn is_solid(&self) -> bool {
        matches!(self, MarkerColor::Solid(..))
    }

    pub fn rgb(&self) -> Option<Rgb> {
        match self {
            MarkerColor::Solid(r, g, b) => Some(Rgb::new(*r, *g, *b)),
            MarkerColor::Scale(_) => None,
        }
    }

    pub fn color_scale(&self) -> Option<ColorScale> {
        let MarkerColor::Scale(name) = self else {
            return None;
        };
        let palette = match name.as_str() {
            "Greys" => ColorScalePalette::Greys,
            "YlGnBu" => ColorScalePalette::YlGnBu,
            "Greens" => ColorScalePalette::Greens,
            "YlOrRd" => ColorScalePalette::YlOrRd,
            "Bluered" => ColorScalePalette::Bluered,
            "RdBu" => ColorScalePalette::RdBu,
            "Reds" => ColorScalePalette::Reds,
            "Blues" => ColorScalePalette::Blues,
            "Picnic" => ColorScalePalette::Picnic,
            "Rainbow" => ColorScalePalette::Rainbow,
            "Portland" => ColorScalePalette::Portland,
            "Jet" => ColorScalePalette::Jet,
            "Hot" => ColorScalePalette::Hot,
            "Blackbody" => ColorScalePalette::Blackbody,
            "Earth" => ColorScalePalette::Earth,
            "Electric" => ColorScalePalette::Electric,
            "Viridis" => ColorScalePalette::Viridis,
            _ => ColorScalePalette::Cividis,
        };
        Some(ColorScale::Palette(palette))
    }

    /// Plotly's Greens runs dark to light, so it is flipped to make high values dark
    pub fn reverse_scale(&self) -> bool {
        matches!(self, MarkerColor::Scale(name) if name == "Greens")
    }

    pub fn opacity(&self) -> f64 {
        if self.is_solid() { 0.5 } else { 0.8 }
    }
}

/// Styling for one set of bubbles
#[derive(Debug, Clone)]
pub struct BubbleStyle {
    pub legend: String,
    pub color: MarkerColor,
    /// Capacity units per marker size unit; `None` draws every marker at the default size
    pub scale: Option<f64>,
    /// Size by min-max normalized capacity instead of raw capacity
    pub relative: bool,
}

impl BubbleStyle {
    pub fn new(legend: impl Into<String>, color: MarkerColor) -> Self {
        Self {
            legend: legend.into(),
            color,
            scale: None,
            relative: false,
        }
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn relative(mut self) -> Self {
        self.relative = true;
        self
    }
}

/// Min-max normalize capacities into [0, 1]
pub fn relative_capacities(records: &[CapacityRecord]) -> Vec<f64> {
    let min = records.iter().map(|r| r.capacity).fold(f64::INFINITY, f64::min);
    let max = records
        .iter()
        .map(|r| r.capacity)
        .fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    records
        .iter()
        .map(|r| if span > 0.0 { (r.capacity - min) / span } else { 0.0 })
        .collect()
}

pub fn marker_sizes(records: &[CapacityRecord], scale: Option<f64>, relative: bool) -> Vec<usize> {
    let Some(scale) = scale else {
        return vec![DEFAULT_MARKER_SIZE; records.len()];
    };

    let values: Vec<f64> = if relative {
        relative_capacities(records)
    } else {
        records.iter().map(|r| r.capacity).collect()
    };

    values
        .into_iter()
        .map(|v| (v / scale).round().max(1.0) as usize)
        .collect()
}

/// Turn a figure title into a file name
pub fn plot_file_name(title: &str) -> String {
    FILE_NAME_RE.replace_all(title, "-").into_owned()
}

/// A finished figure together with the name it is published under
pub struct Figure {
    pub name: String,
    pub title: String,
    pub plot: Plot,
}

impl Figure {
    /// Name defaults to the title with whitespace and slashes collapsed
    pub fn new(title: impl Into<String>, file_name: Option<&str>, plot: Plot) -> Self {
        let title = title.into();
        let name = file_name
            .map(str::to_string)
            .unwrap_or_else(|| plot_file_name(&title));
        Self { name, title, plot }
    }

    pub fn to_json(&self) -> String {
        self.plot.to_json()
    }

    /// Write a standalone HTML page into `dir`
    pub fn write_html(&self, dir: &Path) -> Result<PathBuf, PlotError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.html", self.name));
        std::fs::write(&path, self.plot.to_html())?;
        Ok(path)
    }
}
