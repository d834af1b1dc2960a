use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::NumberFormat;
use crate::error::Result;

/// Space reserved around the projected map, in canvas dots
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 8.0,
            right: 4.0,
            bottom: 8.0,
            left: 4.0,
        }
    }
}

/// Layout constants for the size legend.
/// Text metrics are expressed in canvas dots; a terminal cell is 2x4 dots.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LegendConfig {
    pub ticks: usize,
    pub min_label_gap: f64,
    pub char_width: f64,
    pub line_height: f64,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            ticks: 5,
            min_label_gap: 12.0,
            char_width: 2.0,
            line_height: 4.0,
        }
    }
}

/// One selectable metric, read from a numeric column of the table
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MetricConfig {
    pub field: String,
    pub name: String,
    #[serde(default)]
    pub format: NumberFormat,
}

/// Renderer tuning shared by the map and its zoom behavior
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub margin: Margin,
    /// Longitude rotation applied before projecting, in degrees
    pub rotate: f64,
    pub scale_extent: [f64; 2],
    pub zoom_step: f64,
    /// Maximum bubble radius is the bounded width divided by this
    pub radius_divisor: f64,
    pub transition_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            margin: Margin::default(),
            rotate: -10.0,
            scale_extent: [1.0, 32.0],
            zoom_step: 1.5,
            radius_divisor: 16.0,
            transition_ms: 250,
        }
    }
}

/// Top-level configuration, optionally read from a TOML file
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub geography: PathBuf,
    pub data: PathBuf,
    /// Name of the topology object holding the country geometries
    pub object: String,
    /// Region removed from both geography and data at load time (Antarctica)
    pub excluded_id: String,
    /// Feature whose center is the plain centroid of its full geometry (Russia)
    pub antimeridian_id: String,
    pub id_field: String,
    pub name_field: String,
    pub render: RenderConfig,
    pub legend: LegendConfig,
    pub metrics: Vec<MetricConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geography: PathBuf::from("data/110m.json"),
            data: PathBuf::from("data/110m.tsv"),
            object: "countries".to_string(),
            excluded_id: "010".to_string(),
            antimeridian_id: "643".to_string(),
            id_field: "id".to_string(),
            name_field: "name".to_string(),
            render: RenderConfig::default(),
            legend: LegendConfig::default(),
            metrics: vec![
                MetricConfig {
                    field: "pop_est".to_string(),
                    name: "Population".to_string(),
                    format: NumberFormat::Grouped,
                },
                MetricConfig {
                    field: "gdp_md_est".to_string(),
                    name: "GDP (million USD)".to_string(),
                    format: NumberFormat::Si,
                },
            ],
        }
    }
}

impl Config {
    /// Load a config file; keys missing from the file keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            excluded_id = "999"

            [render]
            radius_divisor = 8.0

            [render.margin]
            top = 2.0
            "#,
        )
        .unwrap();

        assert_eq!(config.excluded_id, "999");
        assert_eq!(config.render.radius_divisor, 8.0);
        assert_eq!(config.render.margin.top, 2.0);
        assert_eq!(config.render.margin.left, 4.0);
        assert_eq!(config.render.scale_extent, [1.0, 32.0]);
        assert_eq!(config.metrics.len(), 2);
    }

    #[test]
    fn test_metric_list() {
        let config = Config::from_toml(
            r#"
            [[metrics]]
            field = "pop_est"
            name = "Population"
            format = "si"
            "#,
        )
        .unwrap();

        assert_eq!(config.metrics.len(), 1);
        assert_eq!(config.metrics[0].format, NumberFormat::Si);
    }
}
