use glam::DVec2;
use tracing::debug;

use crate::config::LegendConfig;
use crate::map::ScaleChange;

/// Horizontal offsets from the largest circle's edge, in dots
const LEADER_BEND: f64 = 16.0;
const LEADER_END: f64 = 32.0;
const LABEL_OFFSET: f64 = 36.0;

/// One stacked circle with its leader line and label.
/// Circles share the baseline y = 0 and are centered on x = 0.
#[derive(Clone, Debug, PartialEq)]
pub struct LegendItem {
    pub value: f64,
    pub label: String,
    pub circle_r: f64,
    pub circle_y: f64,
    pub label_x: f64,
    pub label_y: f64,
    pub leader: [DVec2; 3],
}

/// Axis-aligned box in legend coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

/// Size legend explaining the bubble radius scale
#[derive(Clone, Debug, Default)]
pub struct SizeLegend {
    config: LegendConfig,
    title: String,
    items: Vec<LegendItem>,
    view_box: ViewBox,
}

impl SizeLegend {
    pub fn new(config: LegendConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn items(&self) -> &[LegendItem] {
        &self.items
    }

    pub fn view_box(&self) -> ViewBox {
        self.view_box
    }

    /// Re-layout from a scale snapshot
    pub fn update(&mut self, change: &ScaleChange) {
        self.title = change.title.clone();
        self.items = self.layout(change);
        self.view_box = self.auto_view_box();
        debug!(title = %self.title, items = self.items.len(), "legend updated");
    }

    fn layout(&self, change: &ScaleChange) -> Vec<LegendItem> {
        let scale = change.scale;
        // The smallest tick is dropped; it is usually 0
        let mut items: Vec<LegendItem> = scale
            .ticks(self.config.ticks)
            .into_iter()
            .skip(1)
            .map(|value| {
                let r = scale.map(value);
                LegendItem {
                    value,
                    label: change.format.format(value),
                    circle_r: r,
                    circle_y: -r,
                    label_x: 0.0,
                    label_y: -2.0 * r,
                    leader: [DVec2::ZERO; 3],
                }
            })
            .collect();

        let gap = self.config.min_label_gap;
        for i in 1..items.len() {
            let previous = items[i - 1].label_y;
            if previous - items[i].label_y < gap {
                items[i].label_y = previous - gap;
            }
        }

        let max_r = items.last().map_or(0.0, |item| item.circle_r);
        for item in &mut items {
            item.label_x = max_r + LABEL_OFFSET;
            item.leader = [
                DVec2::new(0.0, item.circle_y * 2.0),
                DVec2::new(max_r + LEADER_BEND, item.label_y),
                DVec2::new(max_r + LEADER_END, item.label_y),
            ];
        }
        items
    }

    /// Extent of the label text box, vertically centered on `label_y`
    pub fn label_extent(&self, item: &LegendItem) -> (DVec2, DVec2) {
        let width = item.label.chars().count() as f64 * self.config.char_width;
        let half = self.config.line_height / 2.0;
        (
            DVec2::new(item.label_x, item.label_y - half),
            DVec2::new(item.label_x + width, item.label_y + half),
        )
    }

    /// Tight bounds of everything drawn, floored/ceiled with one unit of
    /// stroke margin on every side
    fn auto_view_box(&self) -> ViewBox {
        let mut min = DVec2::splat(f64::INFINITY);
        let mut max = DVec2::splat(f64::NEG_INFINITY);
        for item in &self.items {
            let r = item.circle_r;
            min = min.min(DVec2::new(-r, item.circle_y - r));
            max = max.max(DVec2::new(r, item.circle_y + r));
            for p in item.leader {
                min = min.min(p);
                max = max.max(p);
            }
            let (lo, hi) = self.label_extent(item);
            min = min.min(lo);
            max = max.max(hi);
        }
        if !min.is_finite() || !max.is_finite() {
            return ViewBox::default();
        }
        let size = max - min;
        ViewBox {
            x: min.x.floor() - 1.0,
            y: min.y.floor() - 1.0,
            width: size.x.ceil() + 2.0,
            height: size.y.ceil() + 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NumberFormat;
    use crate::map::SqrtScale;
    use proptest::prelude::*;

    fn change(domain_max: f64, range_max: f64) -> ScaleChange {
        ScaleChange {
            title: "Population".to_string(),
            scale: SqrtScale::new(domain_max, range_max),
            format: NumberFormat::Grouped,
        }
    }

    #[test]
    fn test_layout() {
        let mut legend = SizeLegend::new(LegendConfig::default());
        legend.update(&change(100.0, 25.0));

        assert_eq!(legend.title(), "Population");
        let values: Vec<f64> = legend.items().iter().map(|i| i.value).collect();
        assert_eq!(values, vec![20.0, 40.0, 60.0, 80.0, 100.0]);

        let last = legend.items().last().unwrap();
        assert_eq!(last.circle_r, 25.0);
        assert_eq!(last.circle_y, -25.0);
        assert_eq!(last.label_x, 61.0);
        assert_eq!(last.leader[2], DVec2::new(57.0, last.label_y));
        assert_eq!(last.label, "100");
    }

    #[test]
    fn test_crowded_labels_pushed_up() {
        let mut legend = SizeLegend::new(LegendConfig::default());
        legend.update(&change(100.0, 10.0));
        let items = legend.items();
        // 2r for the first tick is about 8.9, so it keeps its raw position
        assert!((items[0].label_y + 2.0 * items[0].circle_r).abs() < 1e-9);
        for pair in items.windows(2) {
            assert!(pair[0].label_y - pair[1].label_y >= 12.0 - 1e-9);
        }
    }

    #[test]
    fn test_empty_scale_has_title_only() {
        let mut legend = SizeLegend::new(LegendConfig::default());
        legend.update(&change(0.0, 25.0));
        assert_eq!(legend.title(), "Population");
        assert!(legend.items().is_empty());
        assert_eq!(legend.view_box(), ViewBox::default());
    }

    #[test]
    fn test_view_box_contains_everything() {
        let mut legend = SizeLegend::new(LegendConfig::default());
        legend.update(&change(1_400_000_000.0, 40.0));
        let vb = legend.view_box();
        for item in legend.items() {
            assert!(vb.contains(DVec2::new(-item.circle_r - 1.0, item.circle_y)));
            assert!(vb.contains(DVec2::new(0.0, item.circle_y * 2.0 - 1.0)));
            for p in item.leader {
                assert!(vb.contains(p));
            }
            let (lo, hi) = legend.label_extent(item);
            assert!(vb.contains(lo - DVec2::ONE));
            assert!(vb.contains(hi));
        }
    }

    proptest! {
        #[test]
        fn prop_label_gap(max in 1.0f64..1e10, range in 1.0f64..120.0) {
            let mut legend = SizeLegend::new(LegendConfig::default());
            legend.update(&change(max, range));
            for pair in legend.items().windows(2) {
                prop_assert!(pair[0].label_y - pair[1].label_y >= 12.0 - 1e-9);
            }
        }
    }
}
