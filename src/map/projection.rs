use geo::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use glam::DVec2;
use rayon::prelude::*;

use crate::data::Feature;

/// Natural Earth I pseudo-cylindrical projection with a longitude rotation.
/// Screen space: x grows right, y grows down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    /// Rotation in degrees added to every longitude before projecting
    pub rotate: f64,
    pub scale: f64,
    pub translate: DVec2,
}

/// Axis-aligned box in screen space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl Bounds {
    pub const EMPTY: Bounds = Bounds {
        min: DVec2::splat(f64::INFINITY),
        max: DVec2::splat(f64::NEG_INFINITY),
    };

    pub fn extend(&mut self, p: DVec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.min.x <= self.max.x && self.min.y <= self.max.y)
    }
}

/// Unscaled Natural Earth I, inputs in radians
#[inline(always)]
fn natural_earth1_raw(lambda: f64, phi: f64) -> (f64, f64) {
    let phi2 = phi * phi;
    let phi4 = phi2 * phi2;
    (
        lambda
            * (0.8707 - 0.131979 * phi2
                + phi4 * (-0.013791 + phi4 * (0.003971 * phi2 - 0.001529 * phi4))),
        phi * (1.007226 + phi2 * (0.015085 + phi4 * (-0.044475 + 0.028874 * phi2 - 0.005916 * phi4))),
    )
}

/// Wrap a longitude in degrees into [-180, 180]
#[inline(always)]
fn wrap_lon(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

impl Projection {
    pub fn natural_earth(rotate: f64) -> Self {
        Self {
            rotate,
            scale: 150.0,
            translate: DVec2::ZERO,
        }
    }

    /// Project a geographic point (lon, lat in degrees) to screen pixels
    #[inline]
    pub fn project(&self, lon: f64, lat: f64) -> DVec2 {
        let lambda = wrap_lon(lon + self.rotate).to_radians();
        let phi = lat.clamp(-90.0, 90.0).to_radians();
        let (x, y) = natural_earth1_raw(lambda, phi);
        DVec2::new(self.translate.x + self.scale * x, self.translate.y - self.scale * y)
    }

    pub fn project_point(&self, point: Point<f64>) -> DVec2 {
        self.project(point.x(), point.y())
    }

    /// Screen bounds of features under the reference scale (150, no translation)
    fn reference_bounds(&self, features: &[Feature]) -> Bounds {
        let reference = Projection::natural_earth(self.rotate);
        PathGenerator::new(reference).bounds(features)
    }

    /// Scale and translate so the features span exactly `width` pixels,
    /// with the top edge at y = 0. A feature crossing the antimeridian
    /// spans the whole world width, see [`PathGenerator::bounds`].
    pub fn fit_width(&mut self, width: f64, features: &[Feature]) {
        let b = self.reference_bounds(features);
        if b.is_empty() {
            return;
        }
        let k = width / (b.max.x - b.min.x);
        let x = (width - k * (b.max.x + b.min.x)) / 2.0;
        let y = -k * b.min.y;
        self.scale = 150.0 * k;
        self.translate = DVec2::new(x, y);
    }

    /// Scale and translate so the features fit inside `[min, max]`, centered
    pub fn fit_extent(&mut self, min: DVec2, max: DVec2, features: &[Feature]) {
        let b = self.reference_bounds(features);
        if b.is_empty() {
            return;
        }
        let size = max - min;
        let k = (size.x / (b.max.x - b.min.x)).min(size.y / (b.max.y - b.min.y));
        let x = min.x + (size.x - k * (b.max.x + b.min.x)) / 2.0;
        let y = min.y + (size.y - k * (b.max.y + b.min.y)) / 2.0;
        self.scale = 150.0 * k;
        self.translate = DVec2::new(x, y);
    }
}

/// Turns lon/lat geometry into screen-space polygons through a projection
#[derive(Clone, Copy, Debug)]
pub struct PathGenerator {
    pub projection: Projection,
}

impl PathGenerator {
    pub fn new(projection: Projection) -> Self {
        Self { projection }
    }

    fn ring(&self, ring: &LineString<f64>) -> LineString<f64> {
        ring.0
            .iter()
            .map(|c| {
                let p = self.projection.project(c.x, c.y);
                Coord { x: p.x, y: p.y }
            })
            .collect()
    }

    fn polygon(&self, poly: &Polygon<f64>) -> Polygon<f64> {
        Polygon::new(
            self.ring(poly.exterior()),
            poly.interiors().iter().map(|r| self.ring(r)).collect(),
        )
    }

    /// Projected outline of a feature, always as a MultiPolygon
    pub fn path(&self, geometry: &Geometry<f64>) -> MultiPolygon<f64> {
        match geometry {
            Geometry::Polygon(p) => MultiPolygon(vec![self.polygon(p)]),
            Geometry::MultiPolygon(mp) => MultiPolygon(mp.0.iter().map(|p| self.polygon(p)).collect()),
            _ => MultiPolygon(Vec::new()),
        }
    }

    /// Project every feature; the work is split across threads
    pub fn paths(&self, features: &[Feature]) -> Vec<(String, MultiPolygon<f64>)> {
        features
            .par_iter()
            .map(|f| (f.id.clone(), self.path(&f.geometry)))
            .collect()
    }

    /// Screen position of a geographic point
    pub fn centroid(&self, point: Point<f64>) -> DVec2 {
        self.projection.project_point(point)
    }

    /// Screen bounds of the features, as if rings were clipped at the
    /// antimeridian: a ring crossing it reaches both edges of the world at
    /// the crossing latitude.
    pub fn bounds(&self, features: &[Feature]) -> Bounds {
        features
            .par_iter()
            .map(|f| {
                let mut b = Bounds::EMPTY;
                for_each_ring(&f.geometry, |ring| self.extend_ring(&mut b, ring));
                b
            })
            .reduce(|| Bounds::EMPTY, Bounds::union)
    }

    fn extend_ring(&self, b: &mut Bounds, ring: &LineString<f64>) {
        let rotate = self.projection.rotate;
        for c in &ring.0 {
            b.extend(self.projection.project(c.x, c.y));
        }
        for pair in ring.0.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let (la, lb) = (wrap_lon(from.x + rotate), wrap_lon(to.x + rotate));
            if (la - lb).abs() <= 180.0 {
                continue;
            }
            let edge = 180f64.copysign(la);
            let t = (edge - la) / (lb + 360f64.copysign(la) - la);
            let lat = from.y + t * (to.y - from.y);
            b.extend(self.projection.project(edge - rotate, lat));
            b.extend(self.projection.project(-edge - rotate, lat));
        }
    }
}

fn for_each_ring(geometry: &Geometry<f64>, mut f: impl FnMut(&LineString<f64>)) {
    let polygons: &[Polygon<f64>] = match geometry {
        Geometry::Polygon(p) => std::slice::from_ref(p),
        Geometry::MultiPolygon(mp) => &mp.0,
        _ => return,
    };
    for poly in polygons {
        f(poly.exterior());
        poly.interiors().iter().for_each(&mut f);
    }
}
