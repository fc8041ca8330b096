use plotly::common::{Marker, Title};
use plotly::layout::{Axis, GridPattern, Layout, LayoutGrid};
use plotly::{Histogram, Plot};
use tracing::warn;

pub const HISTOGRAM_BINS: usize = 20;

/// Panels side by side in one row
pub const MAX_PANELS: usize = 3;

#[derive(Debug, Clone)]
pub struct HistogramPanel {
    pub values: Vec<f64>,
    pub color: String,
    pub title: String,
    pub x_label: String,
}

impl HistogramPanel {
    pub fn new(
        values: Vec<f64>,
        color: impl Into<String>,
        title: impl Into<String>,
        x_label: impl Into<String>,
    ) -> Self {
        Self {
            values,
            color: color.into(),
            title: title.into(),
            x_label: x_label.into(),
        }
    }
}

fn axis(label: &str) -> Axis {
    Axis::new().title(Title::with_text(label))
}

/// Frequency histograms of up to three capacity distributions
pub fn capacity_histograms(panels: &[HistogramPanel]) -> Plot {
    if panels.len() > MAX_PANELS {
        warn!(
            "{} histogram panels given, only the first {} are drawn",
            panels.len(),
            MAX_PANELS
        );
    }
    let panels = &panels[..panels.len().min(MAX_PANELS)];

    let mut plot = Plot::new();
    let mut layout = Layout::new()
        .show_legend(false)
        .grid(
            LayoutGrid::new()
                .rows(1)
                .columns(panels.len().max(1))
                .pattern(GridPattern::Independent),
        );

    for (i, panel) in panels.iter().enumerate() {
        let (x_ref, y_ref) = match i {
            0 => ("x".to_string(), "y".to_string()),
            n => (format!("x{}", n + 1), format!("y{}", n + 1)),
        };
        let trace = Histogram::new(panel.values.clone())
            .name(panel.title.as_str())
            .n_bins_x(HISTOGRAM_BINS)
            .marker(Marker::new().color(panel.color.clone()))
            .x_axis(x_ref.as_str())
            .y_axis(y_ref.as_str());
        plot.add_trace(trace);

        let x_axis = axis(&panel.x_label);
        let y_axis = axis("Frequency");
        layout = match i {
            0 => layout.x_axis(x_axis).y_axis(y_axis),
            1 => layout.x_axis2(x_axis).y_axis2(y_axis),
            _ => layout.x_axis3(x_axis).y_axis3(y_axis),
        };
    }

    let title = panels
        .iter()
        .map(|p| p.title.as_str())
        .collect::<Vec<_>>()
        .join(" | ");
    plot.set_layout(layout.title(Title::with_text(title)));
    plot
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn panels() -> Vec<HistogramPanel> {
        vec![
            HistogramPanel::new(
                vec![50.0, 80.0, 1200.0],
                "blue",
                "Histogram of Power Plant Capacity",
                "Capacity (MW)",
            ),
            HistogramPanel::new(
                vec![4.5, 5.5],
                "red",
                "Histogram of Solar Capacity",
                "Capacity (kW/m^2/hr)",
            ),
            HistogramPanel::new(
                vec![0.3, 0.35],
                "green",
                "Histogram of Wind Capacity Factors",
                "Capacity Factor",
            ),
        ]
    }

    #[test]
    fn test_panels_get_their_own_axes() {
        let json: Value = serde_json::from_str(&capacity_histograms(&panels()).to_json()).unwrap();
        let data = json["data"].as_array().unwrap();

        assert_eq!(data.len(), 3);
        assert_eq!(data[0]["type"], "histogram");
        assert_eq!(data[0]["nbinsx"], 20);
        assert_eq!(data[1]["xaxis"], "x2");
        assert_eq!(data[2]["yaxis"], "y3");
        assert_eq!(data[2]["marker"]["color"], "green");
        assert_eq!(json["layout"]["grid"]["columns"], 3);
        assert_eq!(json["layout"]["xaxis3"]["title"]["text"], "Capacity Factor");
    }

    #[test]
    fn test_extra_panels_are_dropped() {
        let mut many = panels();
        many.push(many[0].clone());
        let json: Value = serde_json::from_str(&capacity_histograms(&many).to_json()).unwrap();
        assert_eq!(json["data"].as_array().unwrap().len(), MAX_PANELS);
    }
}
