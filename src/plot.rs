//! Chart payload types and the host renderer seam
//!
//! The host owns the actual chart rendering (HTML/JS); the plugins only
//! assemble category-labeled numeric series and configuration objects and
//! hand them to a [`Renderer`]. [`JsonRenderer`] is the default: it
//! serializes the payload so tests and headless exports can inspect it.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-sample bar-chart data: sample name -> category id -> count.
pub type BarData = BTreeMap<String, BTreeMap<String, u64>>;

/// One line-chart series: sample name -> x -> y.
pub type Series = BTreeMap<String, BTreeMap<u64, u64>>;

/// One labeled bar-chart category.
#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Bar-chart configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BarConfig {
    pub id: String,
    pub title: String,
    pub ylab: String,
    pub hide_zero_cats: bool,
    pub cpswitch_counts_label: String,
}

/// Display label for one line-chart series.
#[derive(Debug, Clone, Serialize)]
pub struct DataLabel {
    pub name: String,
    pub ylab: String,
}

/// Line-chart configuration.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LineConfig {
    pub id: String,
    pub title: String,
    pub ylab: String,
    pub xlab: String,
    pub x_decimals: bool,
    pub ymin: u64,
    pub tt_label: String,
    pub data_labels: Vec<DataLabel>,
}

/// Host-provided chart rendering functions.
pub trait Renderer {
    fn bargraph(&self, data: &BarData, cats: &[Category], config: &BarConfig) -> Result<String>;
    fn linegraph(&self, series: &[Series], config: &LineConfig) -> Result<String>;
}

/// Renderer that emits the chart payload as JSON.
#[derive(Debug, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn bargraph(&self, data: &BarData, cats: &[Category], config: &BarConfig) -> Result<String> {
        let payload = serde_json::json!({
            "plot_type": "bargraph",
            "data": data,
            "categories": cats,
            "config": config,
        });
        Ok(payload.to_string())
    }

    fn linegraph(&self, series: &[Series], config: &LineConfig) -> Result<String> {
        let payload = serde_json::json!({
            "plot_type": "linegraph",
            "series": series,
            "config": config,
        });
        Ok(payload.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bargraph_payload_round_trips() {
        let mut counts = BTreeMap::new();
        counts.insert("aligned".to_string(), 80u64);
        counts.insert("unaligned".to_string(), 20u64);
        let mut data = BarData::new();
        data.insert("sample_1".to_string(), counts);

        let cats = vec![
            Category::new("aligned", "with adapter"),
            Category::new("unaligned", "without adapter"),
        ];
        let config = BarConfig {
            id: "test_plot".to_string(),
            title: "Test".to_string(),
            ylab: "# Reads".to_string(),
            hide_zero_cats: false,
            cpswitch_counts_label: "Number of Reads".to_string(),
        };

        let content = JsonRenderer.bargraph(&data, &cats, &config).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["plot_type"], "bargraph");
        assert_eq!(parsed["data"]["sample_1"]["aligned"], 80);
        assert_eq!(parsed["config"]["id"], "test_plot");
    }

    #[test]
    fn test_linegraph_payload_keeps_series_order() {
        let mut lengths = BTreeMap::new();
        lengths.insert(30u64, 12u64);
        let mut series = Series::new();
        series.insert("sample_1".to_string(), lengths);

        let config = LineConfig {
            id: "test_lengths".to_string(),
            data_labels: vec![DataLabel {
                name: "Mate1".to_string(),
                ylab: "Count".to_string(),
            }],
            ..LineConfig::default()
        };

        let content = JsonRenderer
            .linegraph(std::slice::from_ref(&series), &config)
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["series"][0]["sample_1"]["30"], 12);
        assert_eq!(parsed["config"]["data_labels"][0]["name"], "Mate1");
    }
}
