use thiserror::Error;

/// Errors raised while loading geography, tabular data or configuration.
///
/// All of these are fatal at startup: the map refuses to initialise rather
/// than draw a partially broken canvas.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] simd_json::Error),

    #[error("malformed GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("malformed table: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("topology has no object named '{0}'")]
    MissingObject(String),

    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("geography contains no drawable features")]
    EmptyGeography,

    #[error("table has no column named '{0}'")]
    MissingColumn(String),
}

pub type Result<T> = std::result::Result<T, MapError>;
