use anyhow::{Context, Result};
use tracing::info;

use crate::capacity::bucket::{apply_scaling, limit_records, wind_scaling_factor};
use crate::capacity::extract::{
    WindRegion, extract_power_plant_capacities, extract_wind_capacities, read_solar_capacities,
    technology_of,
};
use crate::capacity::{CapacityRecord, at_least, drop_zero_capacity, top_n};
use crate::config::{AppConfig, StyleConfig};
use crate::plot::histogram::{HistogramPanel, capacity_histograms};
use crate::plot::map::{
    BubbleLayer, MapSettings, capacity_bubbleplot, capacity_bubbleplot_multi,
    capacity_bubbleplot_multicolor,
};
use crate::plot::{BubbleStyle, Figure, MarkerColor, PlotError};

const JITTER_SEED: u64 = 42;

/// Marker colors for each data set, parsed from the `[style]` section
#[derive(Debug, Clone)]
pub struct FigureColors {
    pub plant: MarkerColor,
    pub solar: MarkerColor,
    pub wind: MarkerColor,
    pub solar_gradient: MarkerColor,
    pub wind_gradient: MarkerColor,
}

impl FigureColors {
    pub fn from_style(style: &StyleConfig) -> Result<Self, PlotError> {
        Ok(Self {
            plant: style.plant_color.parse()?,
            solar: style.solar_color.parse()?,
            wind: style.wind_color.parse()?,
            solar_gradient: style.solar_gradient.parse()?,
            wind_gradient: style.wind_gradient.parse()?,
        })
    }
}

pub fn plant_hover(record: &CapacityRecord) -> String {
    format!(
        "{}<br>Production Capacity: {:.1} MW",
        record.label.as_deref().unwrap_or_default(),
        record.capacity
    )
}

pub fn solar_hover(record: &CapacityRecord) -> String {
    format!(
        "Global Horizontal Irradiance: {:.1} kWh/m^2/day",
        record.capacity
    )
}

pub fn wind_hover(record: &CapacityRecord) -> String {
    format!("Capacity Factor: {:.2}", record.capacity)
}

/// Copies of `records` labelled for hovering
pub fn with_hover<F>(records: &[CapacityRecord], hover: F) -> Vec<CapacityRecord>
where
    F: Fn(&CapacityRecord) -> String,
{
    records
        .iter()
        .map(|r| r.clone().with_label(hover(r)))
        .collect()
}

/// West and east wind sites with east rescaled onto the west's capacity factors
pub struct WindData {
    pub west: Vec<CapacityRecord>,
    pub east: Vec<CapacityRecord>,
    pub factor: f64,
}

impl WindData {
    pub fn load(config: &AppConfig) -> Result<Self> {
        let west = extract_wind_capacities(&config.data.wind_west, WindRegion::West)
            .context("Failed to read west wind sites")?;
        let east = extract_wind_capacities(&config.data.wind_east, WindRegion::East)
            .context("Failed to read east wind sites")?;
        let factor = wind_scaling_factor(&west, &east, config.processing.scaling_precision)?;
        info!("wind scaling factor east -> west: {:.4}", factor);
        Ok(Self { west, east, factor })
    }

    /// Both regions on the west's scale
    pub fn combined(&self) -> Vec<CapacityRecord> {
        let mut all = self.west.clone();
        all.extend(apply_scaling(&self.east, self.factor));
        all
    }

    /// Every raw site, unscaled
    pub fn sites(&self) -> Vec<CapacityRecord> {
        let mut all = self.west.clone();
        all.extend(self.east.iter().cloned());
        all
    }
}

pub fn load_plants(config: &AppConfig) -> Result<Vec<CapacityRecord>> {
    extract_power_plant_capacities(&config.data.power_plants)
        .context("Failed to read power plant spreadsheet")
}

/// Build every map and histogram from the configured inputs
pub fn build_figures(config: &AppConfig) -> Result<Vec<Figure>> {
    let map = MapSettings::new(config.credentials.mapbox_access_token.clone());
    let colors = FigureColors::from_style(&config.style).context("Invalid [style] color")?;
    let precision = config.processing.display_precision;
    let policy = config.processing.dedup;

    let plants = with_hover(&load_plants(config)?, plant_hover);

    let solar = drop_zero_capacity(
        read_solar_capacities(&config.data.solar_csv).context("Failed to read solar capacities")?,
    );
    let solar = with_hover(
        &limit_records(&solar, precision, policy)?,
        solar_hover,
    );

    let wind = WindData::load(config)?;
    let wind = with_hover(
        &limit_records(&wind.combined(), precision, policy)?,
        wind_hover,
    );

    Ok(assemble_figures(&plants, &solar, &wind, &colors, &map))
}

pub fn assemble_figures(
    plants: &[CapacityRecord],
    solar: &[CapacityRecord],
    wind: &[CapacityRecord],
    colors: &FigureColors,
    map: &MapSettings,
) -> Vec<Figure> {
    let mut figures = Vec::new();

    let title = "Power Plant Capacities in MW By Type";
    let plot = capacity_bubbleplot_multicolor(
        plants,
        title,
        Some(10.0),
        false,
        |r| {
            r.label
                .as_deref()
                .and_then(technology_of)
                .unwrap_or_else(|| "Unknown".to_string())
        },
        map,
    );
    figures.push(Figure::new(title, None, plot));

    let title = "Solar Capacities in kWh/m^2/day";
    let style = BubbleStyle::new("Solar Capacity", colors.solar.clone())
        .scale(0.0035)
        .relative();
    figures.push(Figure::new(
        title,
        None,
        capacity_bubbleplot(solar, title, &style, map),
    ));
    let style = BubbleStyle::new("Solar Capacity", colors.solar_gradient.clone());
    figures.push(Figure::new(
        title,
        Some("Gradient-Solar-Capacities"),
        capacity_bubbleplot(solar, title, &style, map),
    ));

    let title = "Wind Capacity Factors";
    let style = BubbleStyle::new("Wind Capacity", colors.wind.clone())
        .scale(0.01)
        .relative();
    figures.push(Figure::new(
        title,
        None,
        capacity_bubbleplot(wind, title, &style, map),
    ));
    let style = BubbleStyle::new("Wind Capacity", colors.wind_gradient.clone());
    figures.push(Figure::new(
        title,
        Some("Gradient-Wind-Capacities"),
        capacity_bubbleplot(wind, title, &style, map),
    ));

    let title = "Wind and Solar Capacity Factors with Power Plant Capacities";
    let layers = vec![
        BubbleLayer {
            records: solar.to_vec(),
            style: BubbleStyle::new("Solar Capacity Factor", colors.solar_gradient.clone()),
        },
        BubbleLayer {
            records: wind.to_vec(),
            style: BubbleStyle::new("Wind Capacity Factor", colors.wind_gradient.clone()),
        },
        BubbleLayer {
            records: plants.to_vec(),
            style: BubbleStyle::new("Power Plant Capacities", colors.plant.clone()).scale(10.0),
        },
    ];
    figures.push(Figure::new(
        title,
        None,
        capacity_bubbleplot_multi(&layers, title, map, JITTER_SEED),
    ));

    let title = "Limited Wind and Solar Capacity Factors with Power Plant Capacities";
    let layers = vec![
        BubbleLayer {
            records: top_n(solar, 100),
            style: BubbleStyle::new("Solar Capacity Factor", colors.solar.clone()).scale(0.05),
        },
        BubbleLayer {
            records: top_n(wind, 100),
            style: BubbleStyle::new("Wind Capacity Factor", colors.wind.clone()).scale(0.225),
        },
        BubbleLayer {
            records: at_least(plants, 100.0),
            style: BubbleStyle::new("Power Plant Capacities", colors.plant.clone()).scale(20.0),
        },
    ];
    figures.push(Figure::new(
        title,
        None,
        capacity_bubbleplot_multi(&layers, title, map, JITTER_SEED),
    ));

    let capacities = |records: &[CapacityRecord]| -> Vec<f64> {
        records.iter().map(|r| r.capacity).collect()
    };
    let panels = vec![
        HistogramPanel::new(
            capacities(plants),
            "blue",
            "Histogram of Power Plant Capacity",
            "Capacity (MW)",
        ),
        HistogramPanel::new(
            capacities(solar),
            "red",
            "Histogram of Solar Capacity",
            "Capacity (kW/m^2/hr)",
        ),
        HistogramPanel::new(
            capacities(wind),
            "green",
            "Histogram of Wind Capacity Factors",
            "Capacity Factor",
        ),
    ];
    figures.push(Figure::new(
        "Capacity Histograms",
        None,
        capacity_histograms(&panels),
    ));

    figures
}
