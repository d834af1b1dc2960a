use glam::DVec2;

/// Uniform scale `k` followed by translation `t`: screen = p * k + t
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomTransform {
    pub k: f64,
    pub t: DVec2,
}

impl ZoomTransform {
    pub const IDENTITY: ZoomTransform = ZoomTransform { k: 1.0, t: DVec2::ZERO };

    #[inline]
    pub fn apply(&self, p: DVec2) -> DVec2 {
        p * self.k + self.t
    }

    #[inline]
    pub fn invert(&self, screen: DVec2) -> DVec2 {
        (screen - self.t) / self.k
    }

    /// Translate in the transformed space (offset is multiplied by k)
    fn translate(&self, offset: DVec2) -> ZoomTransform {
        ZoomTransform {
            k: self.k,
            t: self.t + offset * self.k,
        }
    }
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Pan/zoom gesture state: the current transform plus its constraints
#[derive(Clone, Debug, PartialEq)]
pub struct ZoomBehavior {
    transform: ZoomTransform,
    scale_extent: [f64; 2],
    /// Visible canvas (min, max)
    extent: (DVec2, DVec2),
    /// Region the translation may never leave (min, max)
    translate_extent: (DVec2, DVec2),
}

impl ZoomBehavior {
    pub fn new(scale_extent: [f64; 2]) -> Self {
        Self {
            transform: ZoomTransform::IDENTITY,
            scale_extent,
            extent: (DVec2::ZERO, DVec2::ZERO),
            translate_extent: (DVec2::splat(f64::NEG_INFINITY), DVec2::splat(f64::INFINITY)),
        }
    }

    pub fn transform(&self) -> ZoomTransform {
        self.transform
    }

    /// Canvas size; translation is kept within [0, size]
    pub fn set_bounds(&mut self, size: DVec2) {
        self.extent = (DVec2::ZERO, size);
        self.translate_extent = (DVec2::ZERO, size);
    }

    pub fn reset(&mut self) -> ZoomTransform {
        self.transform = ZoomTransform::IDENTITY;
        self.transform
    }

    /// Multiply the scale by `factor`, keeping the point under `anchor` fixed
    pub fn scale_by(&mut self, factor: f64, anchor: DVec2) -> ZoomTransform {
        let k = (self.transform.k * factor).clamp(self.scale_extent[0], self.scale_extent[1]);
        let focus = self.transform.invert(anchor);
        let next = ZoomTransform {
            k,
            t: anchor - focus * k,
        };
        self.transform = self.constrain(next);
        self.transform
    }

    /// Move by a screen-space delta
    pub fn pan(&mut self, delta: DVec2) -> ZoomTransform {
        let next = ZoomTransform {
            k: self.transform.k,
            t: self.transform.t + delta,
        };
        self.transform = self.constrain(next);
        self.transform
    }

    /// Keep the visible extent inside the translate extent; when the content
    /// is smaller than the view it is centered instead
    fn constrain(&self, transform: ZoomTransform) -> ZoomTransform {
        let (view_min, view_max) = self.extent;
        let (limit_min, limit_max) = self.translate_extent;
        let d0 = transform.invert(view_min) - limit_min;
        let d1 = transform.invert(view_max) - limit_max;
        let axis = |d0: f64, d1: f64| {
            if d1 > d0 {
                (d0 + d1) / 2.0
            } else {
                let m = d0.min(0.0);
                if m != 0.0 {
                    m
                } else {
                    d1.max(0.0)
                }
            }
        };
        transform.translate(DVec2::new(axis(d0.x, d1.x), axis(d0.y, d1.y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn behavior() -> ZoomBehavior {
        let mut zoom = ZoomBehavior::new([1.0, 32.0]);
        zoom.set_bounds(DVec2::new(400.0, 200.0));
        zoom
    }

    #[test]
    fn test_scale_extent_clamped() {
        let mut zoom = behavior();
        for _ in 0..20 {
            zoom.scale_by(1.5, DVec2::new(200.0, 100.0));
        }
        assert_eq!(zoom.transform().k, 32.0);
        for _ in 0..40 {
            zoom.scale_by(1.0 / 1.5, DVec2::new(10.0, 10.0));
        }
        assert_eq!(zoom.transform().k, 1.0);
        assert_eq!(zoom.transform().t, DVec2::ZERO);
    }

    #[test]
    fn test_anchor_stays_fixed() {
        let mut zoom = behavior();
        let anchor = DVec2::new(120.0, 80.0);
        let before = zoom.transform().invert(anchor);
        let t = zoom.scale_by(2.0, anchor);
        assert!((t.apply(before) - anchor).length() < 1e-9);
    }

    #[test]
    fn test_pan_constrained_to_canvas() {
        let mut zoom = behavior();
        // At k = 1 the content exactly fills the view, so panning is a no-op
        assert_eq!(zoom.pan(DVec2::new(50.0, 20.0)), ZoomTransform::IDENTITY);

        zoom.scale_by(2.0, DVec2::ZERO);
        let t = zoom.pan(DVec2::new(1000.0, 1000.0));
        assert_eq!(t.t, DVec2::ZERO);
        let t = zoom.pan(DVec2::new(-5000.0, -5000.0));
        assert!((t.t - DVec2::new(-400.0, -200.0)).length() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let mut zoom = behavior();
        zoom.scale_by(4.0, DVec2::new(100.0, 100.0));
        assert_eq!(zoom.reset(), ZoomTransform::IDENTITY);
    }
}
