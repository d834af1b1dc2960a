use std::collections::HashMap;

use geo::{Centroid, ChamberlainDuquetteArea, CoordsIter, Geometry, LineString, Point, Polygon};
use tracing::{debug, info};

use crate::data::{Feature, Geography};
use crate::error::{MapError, Result};

/// Features of one geography snapshot, keyed by identifier, with a
/// representative interior point per feature kept in a side table.
#[derive(Clone, Debug)]
pub struct GeoIndex {
    features: Vec<Feature>,
    by_id: HashMap<String, usize>,
    centers: HashMap<String, Point<f64>>,
}

impl GeoIndex {
    /// Remove `excluded_id`, convert `object` to features and compute centers.
    /// `antimeridian_id` names the feature whose center is the plain vertex
    /// centroid of its full geometry.
    pub fn build(
        mut geography: Geography,
        object: &str,
        excluded_id: &str,
        antimeridian_id: &str,
    ) -> Result<Self> {
        let removed = geography.remove(object, excluded_id)?;
        let features = geography.into_features(object)?;
        if features.is_empty() {
            return Err(MapError::EmptyGeography);
        }

        let mut by_id = HashMap::with_capacity(features.len());
        let mut centers = HashMap::with_capacity(features.len());
        for (idx, feature) in features.iter().enumerate() {
            if let Some(center) = representative_point(feature, antimeridian_id) {
                centers.insert(feature.id.clone(), center);
            } else {
                debug!(id = %feature.id, "feature has no center");
            }
            // Identifiers are unique upstream; on collision the last one wins
            by_id.insert(feature.id.clone(), idx);
        }

        info!(features = features.len(), removed, "built geo index");
        Ok(Self {
            features,
            by_id,
            centers,
        })
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.by_id.get(id).map(|&idx| &self.features[idx])
    }

    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Representative point (lon, lat) of a feature
    pub fn center(&self, id: &str) -> Option<Point<f64>> {
        self.centers.get(id).copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.features.len()
    }
}

/// Anchor for a feature's bubble:
/// - the antimeridian feature uses the mean of all its vertices
/// - multi-part features use the center of mass of their largest part
/// - single polygons use their own center of mass
pub fn representative_point(feature: &Feature, antimeridian_id: &str) -> Option<Point<f64>> {
    if feature.id == antimeridian_id {
        return vertex_mean(&feature.geometry);
    }
    match &feature.geometry {
        Geometry::MultiPolygon(mp) => {
            let largest = largest_polygon(&mp.0)?;
            largest.centroid()
        }
        Geometry::Polygon(poly) => poly.centroid(),
        other => other.centroid(),
    }
}

/// Part with the greatest spherical area; the first one wins ties
pub fn largest_polygon(polygons: &[Polygon<f64>]) -> Option<&Polygon<f64>> {
    let mut best: Option<(&Polygon<f64>, f64)> = None;
    for poly in polygons {
        let area = poly.chamberlain_duquette_unsigned_area();
        if best.map_or(area > 0.0, |(_, max)| area > max) {
            best = Some((poly, area));
        }
    }
    best.map(|(poly, _)| poly).or_else(|| polygons.first())
}

/// Mean of ring vertices, skipping each ring's closing point
fn vertex_mean(geometry: &Geometry<f64>) -> Option<Point<f64>> {
    let rings: Vec<&LineString<f64>> = match geometry {
        Geometry::Polygon(p) => std::iter::once(p.exterior()).chain(p.interiors()).collect(),
        Geometry::MultiPolygon(mp) => mp
            .0
            .iter()
            .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
            .collect(),
        _ => return geometry.centroid(),
    };

    let (mut sx, mut sy, mut n) = (0.0, 0.0, 0usize);
    for ring in rings {
        let count = ring.coords_count();
        let open = if ring.is_closed() { count.saturating_sub(1) } else { count };
        for coord in ring.coords_iter().take(open) {
            sx += coord.x;
            sy += coord.y;
            n += 1;
        }
    }
    (n > 0).then(|| Point::new(sx / n as f64, sy / n as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use geo::{ConvexHull, Intersects, MultiPolygon};

    #[test]
    fn test_excluded_region_removed() {
        let index = test_support::index();
        assert_eq!(index.len(), 2);
        assert!(!index.contains("010"));
        assert!(index.features().iter().all(|f| f.id != "010"));
        assert!(index.center("010").is_none());
    }

    #[test]
    fn test_single_polygon_center_of_mass() {
        let index = test_support::index();
        let center = index.center("004").unwrap();
        assert!((center.x() - 65.0).abs() < 1e-9);
        assert!((center.y() - 34.0).abs() < 1e-9);
    }

    #[test]
    fn test_multipolygon_uses_largest_part() {
        let index = test_support::index();
        let Geometry::MultiPolygon(mp) = &index.get("008").unwrap().geometry else {
            panic!("expected multipolygon");
        };
        let largest = largest_polygon(&mp.0).unwrap();
        let hull = largest.convex_hull();
        let center = index.center("008").unwrap();
        assert!(hull.intersects(&center));
        // The small island listed first is never chosen
        assert!(!mp.0[0].convex_hull().intersects(&center));
    }

    #[test]
    fn test_antimeridian_feature_uses_vertex_mean() {
        // Two parts: a big square and a sliver; the vertex mean sits between them
        let big = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![],
        );
        let sliver = Polygon::new(
            LineString::from(vec![(100.0, 0.0), (101.0, 0.0), (101.0, 1.0), (100.0, 1.0), (100.0, 0.0)]),
            vec![],
        );
        let feature = Feature {
            id: "643".to_string(),
            name: None,
            geometry: Geometry::MultiPolygon(MultiPolygon(vec![big, sliver])),
        };

        let center = representative_point(&feature, "643").unwrap();
        assert!((center.x() - 52.75).abs() < 1e-9);
        assert!((center.y() - 2.75).abs() < 1e-9);

        let other = representative_point(&feature, "000").unwrap();
        assert!((other.x() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_object_is_fatal() {
        let err = GeoIndex::build(test_support::geography(), "land", "010", "643");
        assert!(matches!(err, Err(MapError::MissingObject(_))));
    }
}
