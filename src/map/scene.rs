use std::time::{Duration, Instant};

use geo::{BoundingRect, Contains, MultiPolygon, Point, Rect};
use glam::DVec2;

/// A country outline in projected (untransformed) screen space
#[derive(Clone, Debug)]
pub struct CountryShape {
    pub path: MultiPolygon<f64>,
    pub bbox: Option<Rect<f64>>,
    /// Set once on enter: only countries present in the data react to hover
    pub hoverable: bool,
    pub active: bool,
}

impl CountryShape {
    pub fn new(hoverable: bool) -> Self {
        Self {
            path: MultiPolygon(Vec::new()),
            bbox: None,
            hoverable,
            active: false,
        }
    }

    pub fn set_path(&mut self, path: MultiPolygon<f64>) {
        self.bbox = path.bounding_rect();
        self.path = path;
    }

    /// Point-in-polygon test in projected space
    pub fn hit(&self, p: DVec2) -> bool {
        let Some(bbox) = self.bbox else {
            return false;
        };
        let (min, max) = (bbox.min(), bbox.max());
        if p.x < min.x || p.x > max.x || p.y < min.y || p.y > max.y {
            return false;
        }
        self.path.contains(&Point::new(p.x, p.y))
    }
}

/// Cubic in-out easing
fn ease_cubic(t: f64) -> f64 {
    let t = t * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

/// Animated presentation of a radius change between two values
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween {
    pub from: f64,
    pub to: f64,
    pub start: Instant,
    pub duration: Duration,
}

impl Tween {
    pub fn value_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.start);
        if self.duration.is_zero() || elapsed >= self.duration {
            return self.to;
        }
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        self.from + (self.to - self.from) * ease_cubic(t)
    }

    pub fn finished(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.start) >= self.duration
    }
}

/// A bubble anchored at its feature's projected center.
/// `radius` is the committed value in transformed space (already divided
/// by the zoom scale); the tween only affects what is presented.
#[derive(Clone, Debug)]
pub struct Bubble {
    pub position: DVec2,
    pub radius: f64,
    pub tween: Option<Tween>,
    pub active: bool,
}

impl Bubble {
    /// Entering bubbles start at radius 0
    pub fn new(position: DVec2) -> Self {
        Self {
            position,
            radius: 0.0,
            tween: None,
            active: false,
        }
    }

    pub fn presented_radius(&self, now: Instant) -> f64 {
        self.tween.map_or(self.radius, |t| t.value_at(now))
    }

    /// Commit `target` and animate from whatever is on screen now
    pub fn transition_to(&mut self, target: f64, now: Instant, duration: Duration) {
        let from = self.presented_radius(now);
        self.radius = target;
        self.tween = Some(Tween {
            from,
            to: target,
            start: now,
            duration,
        });
    }

    /// Commit `target` immediately, cancelling any running animation
    pub fn set_radius(&mut self, target: f64) {
        self.radius = target;
        self.tween = None;
    }

    /// Drop finished animations; returns true while still animating
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.tween.is_some_and(|t| t.finished(now)) {
            self.tween = None;
        }
        self.tween.is_some()
    }

    pub fn hit(&self, p: DVec2) -> bool {
        self.radius > 0.0 && p.distance(self.position) <= self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};

    #[test]
    fn test_tween_endpoints() {
        let start = Instant::now();
        let tween = Tween {
            from: 0.0,
            to: 10.0,
            start,
            duration: Duration::from_millis(250),
        };
        assert_eq!(tween.value_at(start), 0.0);
        assert!((tween.value_at(start + Duration::from_millis(125)) - 5.0).abs() < 1e-9);
        assert_eq!(tween.value_at(start + Duration::from_millis(300)), 10.0);
    }

    #[test]
    fn test_interrupted_transition_keeps_logical_radius() {
        let start = Instant::now();
        let duration = Duration::from_millis(250);
        let mut bubble = Bubble::new(DVec2::ZERO);
        bubble.transition_to(10.0, start, duration);

        let mid = start + Duration::from_millis(100);
        let shown = bubble.presented_radius(mid);
        bubble.transition_to(4.0, mid, duration);
        assert_eq!(bubble.radius, 4.0);
        assert_eq!(bubble.presented_radius(mid), shown);

        bubble.set_radius(2.0);
        assert_eq!(bubble.presented_radius(mid), 2.0);
        assert!(!bubble.tick(mid));
    }

    #[test]
    fn test_country_hit() {
        let mut shape = CountryShape::new(true);
        shape.set_path(MultiPolygon(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            vec![],
        )]));
        assert!(shape.hit(DVec2::new(5.0, 5.0)));
        assert!(!shape.hit(DVec2::new(15.0, 5.0)));
    }
}
