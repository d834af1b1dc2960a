use std::fs;
use std::path::Path;

use geo::Geometry;
use geojson::feature::Id;
use geojson::{FeatureCollection, GeoJson};
use serde::Deserialize;
use tracing::{info, warn};

use crate::data::topology::Topology;
use crate::error::{MapError, Result};

/// One drawable geographic unit. Geometry is a Polygon or MultiPolygon in lon/lat.
#[derive(Clone, Debug)]
pub struct Feature {
    pub id: String,
    pub name: Option<String>,
    pub geometry: Geometry<f64>,
}

/// A geography snapshot as loaded from disk, before conversion to features
pub enum Geography {
    Topology(Topology),
    GeoJson(FeatureCollection),
}

#[derive(Deserialize)]
struct TypeProbe {
    #[serde(rename = "type")]
    kind: String,
}

impl Geography {
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let geography = Self::from_bytes(bytes)?;
        info!(path = %path.display(), "loaded geography");
        Ok(geography)
    }

    /// Parse either a TopoJSON topology or a GeoJSON FeatureCollection
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        // simd-json parses in place, so each pass gets its own buffer
        let probe: TypeProbe = simd_json::serde::from_slice(&mut bytes.clone())?;
        match probe.kind.as_str() {
            "Topology" => {
                let mut bytes = bytes;
                Ok(Geography::Topology(simd_json::serde::from_slice(&mut bytes)?))
            }
            "FeatureCollection" => {
                let text = String::from_utf8(bytes)
                    .map_err(|e| MapError::InvalidTopology(e.to_string()))?;
                match text.parse::<GeoJson>()? {
                    GeoJson::FeatureCollection(fc) => Ok(Geography::GeoJson(fc)),
                    _ => Err(MapError::InvalidTopology("expected a FeatureCollection".into())),
                }
            }
            other => Err(MapError::InvalidTopology(format!(
                "unsupported geography type '{other}'"
            ))),
        }
    }

    /// Remove the feature with identifier `id` before conversion
    pub fn remove(&mut self, object: &str, id: &str) -> Result<usize> {
        match self {
            Geography::Topology(topo) => topo.remove(object, id),
            Geography::GeoJson(fc) => {
                let before = fc.features.len();
                fc.features
                    .retain(|f| f.id.as_ref().map(id_string).as_deref() != Some(id));
                Ok(before - fc.features.len())
            }
        }
    }

    pub fn into_features(self, object: &str) -> Result<Vec<Feature>> {
        match self {
            Geography::Topology(topo) => topo.features(object),
            Geography::GeoJson(fc) => {
                let mut features = Vec::with_capacity(fc.features.len());
                for (position, feature) in fc.features.into_iter().enumerate() {
                    let id = feature
                        .id
                        .as_ref()
                        .map(id_string)
                        .unwrap_or_else(|| format!("#{position}"));
                    let name = feature
                        .properties
                        .as_ref()
                        .and_then(|p| p.get("name"))
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    let Some(gj) = feature.geometry else {
                        warn!(id = %id, "skipping feature without geometry");
                        continue;
                    };
                    let geometry: Geometry<f64> = gj.value.try_into()?;
                    match geometry {
                        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => {
                            features.push(Feature { id, name, geometry })
                        }
                        _ => warn!(id = %id, "skipping non-areal geometry"),
                    }
                }
                Ok(features)
            }
        }
    }
}

fn id_string(id: &Id) -> String {
    match id {
        Id::String(s) => s.clone(),
        Id::Number(n) => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": "250", "properties": {"name": "France"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[4,0],[4,4],[0,4],[0,0]]]}},
            {"type": "Feature", "id": "010", "properties": {"name": "Antarctica"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,-80],[4,-80],[4,-70],[0,-80]]]}},
            {"type": "Feature", "id": "999", "properties": {},
             "geometry": {"type": "Point", "coordinates": [1, 1]}}
        ]
    }"#;

    #[test]
    fn test_geojson_source() {
        let mut geography = Geography::from_bytes(GEOJSON.as_bytes().to_vec()).unwrap();
        assert_eq!(geography.remove("countries", "010").unwrap(), 1);
        let features = geography.into_features("countries").unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, "250");
        assert_eq!(features[0].name.as_deref(), Some("France"));
    }

    #[test]
    fn test_topology_source() {
        let bytes = crate::test_support::TOPOLOGY.as_bytes().to_vec();
        let geography = Geography::from_bytes(bytes).unwrap();
        assert!(matches!(geography, Geography::Topology(_)));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = Geography::from_bytes(br#"{"type": "Point"}"#.to_vec());
        assert!(matches!(err, Err(MapError::InvalidTopology(_))));
    }
}
