//! TopoJSON decoding.
//!
//! A topology stores each shared boundary once as an arc; polygons reference
//! arcs by index, with `!i` (i.e. `-i - 1`) meaning arc `i` reversed. When a
//! `transform` is present the arcs are quantized and delta-encoded.

use std::collections::HashMap;

use geo::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use tracing::warn;

use crate::data::geography::Feature;
use crate::error::{MapError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Text(String),
    Number(f64),
}

impl FeatureId {
    pub fn into_string(self) -> String {
        match self {
            FeatureId::Text(s) => s,
            FeatureId::Number(n) if n.fract() == 0.0 => format!("{}", n as i64),
            FeatureId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Properties {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArcRefs {
    Multi(Vec<Vec<Vec<i64>>>),
    Single(Vec<Vec<i64>>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopoGeometry {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub id: Option<FeatureId>,
    pub arcs: Option<ArcRefs>,
    pub properties: Option<Properties>,
    #[serde(default)]
    pub geometries: Vec<TopoGeometry>,
}

impl TopoGeometry {
    pub fn id_string(&self) -> Option<String> {
        self.id.clone().map(FeatureId::into_string)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    pub transform: Option<Transform>,
    pub arcs: Vec<Vec<Vec<f64>>>,
    pub objects: HashMap<String, TopoGeometry>,
}

impl Topology {
    /// Drop every geometry of `object` whose id equals `id`
    pub fn remove(&mut self, object: &str, id: &str) -> Result<usize> {
        let collection = self
            .objects
            .get_mut(object)
            .ok_or_else(|| MapError::MissingObject(object.to_string()))?;
        let before = collection.geometries.len();
        collection
            .geometries
            .retain(|g| g.id_string().as_deref() != Some(id));
        Ok(before - collection.geometries.len())
    }

    /// Convert a named object into polygon features
    pub fn features(&self, object: &str) -> Result<Vec<Feature>> {
        let collection = self
            .objects
            .get(object)
            .ok_or_else(|| MapError::MissingObject(object.to_string()))?;

        let arcs = self.decode_arcs();
        let members: Vec<&TopoGeometry> = match collection.kind.as_deref() {
            Some("GeometryCollection") => collection.geometries.iter().collect(),
            _ => vec![collection],
        };

        let mut features = Vec::with_capacity(members.len());
        for (position, member) in members.into_iter().enumerate() {
            let id = member
                .id_string()
                .unwrap_or_else(|| format!("#{position}"));
            let Some(geometry) = geometry(member, &arcs)? else {
                warn!(id = %id, kind = ?member.kind, "skipping non-areal geometry");
                continue;
            };
            let name = member.properties.as_ref().and_then(|p| p.name.clone());
            features.push(Feature { id, name, geometry });
        }
        Ok(features)
    }

    /// Absolute coordinates of every arc
    fn decode_arcs(&self) -> Vec<Vec<Coord<f64>>> {
        self.arcs
            .iter()
            .map(|arc| match &self.transform {
                Some(t) => {
                    let (mut x, mut y) = (0.0, 0.0);
                    arc.iter()
                        .filter(|p| p.len() >= 2)
                        .map(|p| {
                            x += p[0];
                            y += p[1];
                            Coord {
                                x: x * t.scale[0] + t.translate[0],
                                y: y * t.scale[1] + t.translate[1],
                            }
                        })
                        .collect()
                }
                None => arc
                    .iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| Coord { x: p[0], y: p[1] })
                    .collect(),
            })
            .collect()
    }
}

fn geometry(member: &TopoGeometry, arcs: &[Vec<Coord<f64>>]) -> Result<Option<Geometry<f64>>> {
    let geometry = match (member.kind.as_deref(), &member.arcs) {
        (Some("Polygon"), Some(ArcRefs::Single(rings))) => {
            Some(Geometry::Polygon(polygon(rings, arcs)?))
        }
        (Some("MultiPolygon"), Some(ArcRefs::Multi(polys))) => {
            let polys = polys
                .iter()
                .map(|rings| polygon(rings, arcs))
                .collect::<Result<Vec<_>>>()?;
            Some(Geometry::MultiPolygon(MultiPolygon(polys)))
        }
        // An empty arc list deserializes as the deeper variant
        (Some("Polygon"), Some(ArcRefs::Multi(empty))) if empty.is_empty() => None,
        (Some("MultiPolygon"), Some(ArcRefs::Single(empty))) if empty.is_empty() => None,
        (Some("Polygon" | "MultiPolygon"), _) => {
            return Err(MapError::InvalidTopology(format!(
                "{:?} has malformed arcs",
                member.kind
            )))
        }
        _ => None,
    };
    Ok(geometry)
}

fn polygon(rings: &[Vec<i64>], arcs: &[Vec<Coord<f64>>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|r| ring(r, arcs));
    let exterior = match rings.next() {
        Some(r) => r?,
        None => LineString::new(Vec::new()),
    };
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Stitch arcs into a closed ring, dropping the shared point between arcs
fn ring(refs: &[i64], arcs: &[Vec<Coord<f64>>]) -> Result<LineString<f64>> {
    let mut points: Vec<Coord<f64>> = Vec::new();
    for &r in refs {
        let (index, reversed) = if r < 0 { ((!r) as usize, true) } else { (r as usize, false) };
        let arc = arcs
            .get(index)
            .ok_or_else(|| MapError::InvalidTopology(format!("arc {index} out of range")))?;
        if !points.is_empty() {
            points.pop();
        }
        if reversed {
            points.extend(arc.iter().rev());
        } else {
            points.extend(arc.iter());
        }
    }
    // Degenerate rings are padded so every ring has at least four points
    if let Some(&first) = points.first() {
        while points.len() < 4 {
            points.push(first);
        }
    }
    Ok(LineString::new(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn test_decode_fixture() {
        let topo = test_support::topology();
        let features = topo.features("countries").unwrap();
        let ids: Vec<&str> = features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["004", "008", "010"]);
        assert_eq!(features[0].name.as_deref(), Some("Afghanistan"));
        assert!(matches!(features[1].geometry, Geometry::MultiPolygon(_)));
    }

    #[test]
    fn test_reversed_arc_stitching() {
        // Arc 0 runs (0,0)->(1,0)->(1,1); arc 1 runs (0,0)->(0,1)->(1,1).
        // Ring [0, ~1] walks arc 0 then arc 1 backwards, sharing (1,1).
        let arcs = vec![
            vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }],
            vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 0.0, y: 1.0 }, Coord { x: 1.0, y: 1.0 }],
        ];
        let ring = ring(&[0, !1], &arcs).unwrap();
        let xy: Vec<(f64, f64)> = ring.0.iter().map(|c| (c.x, c.y)).collect();
        assert_eq!(
            xy,
            vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]
        );
    }

    #[test]
    fn test_quantized_delta_arcs() {
        let json = r#"{
            "type": "Topology",
            "transform": {"scale": [0.5, 2.0], "translate": [10.0, -5.0]},
            "arcs": [[[0, 0], [2, 0], [0, 1], [-2, -1]]],
            "objects": {"countries": {"type": "GeometryCollection", "geometries": [
                {"type": "Polygon", "arcs": [[0]], "id": 7}
            ]}}
        }"#;
        let mut bytes = json.as_bytes().to_vec();
        let topo: Topology = simd_json::serde::from_slice(&mut bytes).unwrap();
        let features = topo.features("countries").unwrap();
        assert_eq!(features[0].id, "7");
        let Geometry::Polygon(poly) = &features[0].geometry else {
            panic!("expected polygon");
        };
        let xy: Vec<(f64, f64)> = poly.exterior().0.iter().map(|c| (c.x, c.y)).collect();
        assert_eq!(xy, vec![(10.0, -5.0), (11.0, -5.0), (11.0, -3.0), (10.0, -5.0)]);
    }

    #[test]
    fn test_remove_and_missing_object() {
        let mut topo = test_support::topology();
        assert_eq!(topo.remove("countries", "010").unwrap(), 1);
        assert_eq!(topo.features("countries").unwrap().len(), 2);
        assert!(matches!(
            topo.features("land"),
            Err(MapError::MissingObject(name)) if name == "land"
        ));
    }

    #[test]
    fn test_null_geometry_is_skipped() {
        let json = r#"{
            "type": "Topology",
            "arcs": [],
            "objects": {"countries": {"type": "GeometryCollection", "geometries": [
                {"type": null, "id": "900"}
            ]}}
        }"#;
        let mut bytes = json.as_bytes().to_vec();
        let topo: Topology = simd_json::serde::from_slice(&mut bytes).unwrap();
        assert!(topo.features("countries").unwrap().is_empty());
    }
}
