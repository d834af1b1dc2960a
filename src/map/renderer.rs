use std::rc::Rc;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use glam::DVec2;
use tracing::{debug, warn};

use crate::config::{Margin, RenderConfig};
use crate::data::{Accessor, DataRow, Metric};
use crate::map::index::GeoIndex;
use crate::map::interaction::{Activation, JoinView};
use crate::map::join::{KeyedIndex, Layer};
use crate::map::projection::{PathGenerator, Projection};
use crate::map::scale::{ScaleChange, ScaleModel, SqrtScale};
use crate::map::scene::{Bubble, CountryShape};
use crate::map::zoom::{ZoomBehavior, ZoomTransform};

/// Canvas geometry derived on every resize, in dots
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportBox {
    pub width: f64,
    pub height: f64,
    pub bounded_width: f64,
    pub bounded_height: f64,
    pub margin: Margin,
}

/// Lifecycle of the projection/zoom pipeline
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RenderState {
    /// Geography indexed; nothing can be drawn until the first resize
    GeographyReady,
    /// Projection fitted and scale range set, layers not yet drawn
    Sized(ViewportBox),
    /// Layers reflect the current data, geometry and zoom
    Drawn(ViewportBox),
    /// A pan/zoom gesture has been applied since the last full draw
    Zoomed(ViewportBox),
}

impl RenderState {
    pub fn viewport(&self) -> Option<ViewportBox> {
        match *self {
            RenderState::GeographyReady => None,
            RenderState::Sized(v) | RenderState::Drawn(v) | RenderState::Zoomed(v) => Some(v),
        }
    }

    pub fn is_drawn(&self) -> bool {
        matches!(self, RenderState::Drawn(_) | RenderState::Zoomed(_))
    }
}

/// Owns the projection, zoom transform and the two drawn layers
pub struct Renderer {
    config: RenderConfig,
    index: GeoIndex,
    rows: Vec<DataRow>,
    accessor: Accessor,
    metric: Option<Rc<Metric>>,
    data_by_id: Option<KeyedIndex<DataRow>>,
    projection: Projection,
    zoom: ZoomBehavior,
    scale: ScaleModel,
    countries: Layer<CountryShape>,
    bubbles: Layer<Bubble>,
    state: RenderState,
}

impl Renderer {
    /// Rows whose identifier equals `excluded_id` are dropped here, matching
    /// the geography filter in [`GeoIndex::build`].
    pub fn new(
        index: GeoIndex,
        mut rows: Vec<DataRow>,
        accessor: Accessor,
        excluded_id: &str,
        config: RenderConfig,
    ) -> Self {
        rows.retain(|row| accessor.id(row) != excluded_id);
        Self {
            projection: Projection::natural_earth(config.rotate),
            zoom: ZoomBehavior::new(config.scale_extent),
            config,
            index,
            rows,
            accessor,
            metric: None,
            data_by_id: None,
            scale: ScaleModel::new(),
            countries: Layer::new(),
            bubbles: Layer::new(),
            state: RenderState::GeographyReady,
        }
    }

    /// Receive a [`ScaleChange`] on every scale recomputation
    pub fn subscribe(&mut self) -> Receiver<ScaleChange> {
        self.scale.subscribe()
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn viewport(&self) -> Option<ViewportBox> {
        self.state.viewport()
    }

    pub fn transform(&self) -> ZoomTransform {
        self.zoom.transform()
    }

    pub fn scale(&self) -> SqrtScale {
        self.scale.scale()
    }

    pub fn metric(&self) -> Option<&Rc<Metric>> {
        self.metric.as_ref()
    }

    pub fn index(&self) -> &GeoIndex {
        &self.index
    }

    pub fn countries(&self) -> &Layer<CountryShape> {
        &self.countries
    }

    pub fn bubbles(&self) -> &Layer<Bubble> {
        &self.bubbles
    }

    pub fn data(&self) -> Option<&KeyedIndex<DataRow>> {
        self.data_by_id.as_ref()
    }

    pub fn join_view(&self) -> JoinView<'_> {
        JoinView {
            countries: &self.countries,
            bubbles: &self.bubbles,
            data: self.data_by_id.as_ref(),
            accessor: &self.accessor,
            metric: self.metric.as_deref(),
        }
    }

    /// Refit everything to a canvas `width` x `max_height` dots. The map is
    /// fitted to the width; when that makes it taller than the canvas it is
    /// shrunk until it fits and centered horizontally. Degenerate sizes are
    /// skipped and leave the previous state untouched.
    pub fn resize(&mut self, width: f64, max_height: f64, now: Instant) -> bool {
        let margin = self.config.margin;
        let full_width = width - margin.left - margin.right;
        let available_height = (max_height - margin.top - margin.bottom).floor();
        if !full_width.is_finite() || full_width <= 0.0 || available_height <= 0.0 {
            warn!(width, max_height, "skipping resize: no room for the map");
            return false;
        }

        let mut bounded_width = full_width;
        let mut bounded_height = self.measure_height(bounded_width);
        if bounded_height > available_height {
            bounded_width *= available_height / bounded_height;
            bounded_height = self.measure_height(bounded_width).min(available_height);
        }
        let height = bounded_height + margin.top + margin.bottom;

        let left = margin.left + (full_width - bounded_width) / 2.0;
        self.projection.fit_extent(
            DVec2::new(left, margin.top),
            DVec2::new(left + bounded_width, margin.top + bounded_height),
            self.index.features(),
        );

        let viewport = ViewportBox {
            width,
            height,
            bounded_width,
            bounded_height,
            margin,
        };
        debug!(width, height, "resized");

        self.scale
            .set_range_from_width((bounded_width / self.config.radius_divisor).round());
        self.zoom.set_bounds(DVec2::new(width, height));
        self.state = RenderState::Sized(viewport);

        if self.data_by_id.is_some() {
            self.zoom.reset();
            self.draw(now);
        }
        true
    }

    /// Fit the projection to `bounded_width` and measure the map height
    fn measure_height(&mut self, bounded_width: f64) -> f64 {
        let features = self.index.features();
        self.projection.fit_width(bounded_width, features);
        let bounds = PathGenerator::new(self.projection).bounds(features);
        (bounds.max.y - bounds.min.y).ceil()
    }

    /// Switch the current metric: rescale the domain, rebuild the data
    /// index and redraw with a grow-in transition.
    pub fn update_metric(&mut self, metric: Rc<Metric>, now: Instant) {
        self.scale.set_domain_from_data(&self.rows, &metric);
        self.data_by_id = Some(KeyedIndex::from_entries(
            self.rows
                .iter()
                .map(|row| (self.accessor.id(row).to_string(), row.clone())),
        ));
        self.metric = Some(metric);

        if self.state.viewport().is_some() {
            self.draw(now);
        }
    }

    /// Full redraw: country outlines plus bubbles with transitions
    fn draw(&mut self, now: Instant) {
        let Some(viewport) = self.state.viewport() else {
            return;
        };
        self.render_countries();
        self.render_bubbles(Some(now));
        self.state = RenderState::Drawn(viewport);
    }

    fn render_countries(&mut self) {
        let paths = PathGenerator::new(self.projection).paths(self.index.features());
        let data = self.data_by_id.as_ref();
        let summary = self.countries.join(
            paths,
            |id, _| CountryShape::new(data.is_some_and(|d| d.contains(id))),
            |_, path, shape| shape.set_path(path),
        );
        debug!(entered = summary.entered.len(), exited = summary.exited.len(), "joined countries");
    }

    /// Reposition every bubble and recompute its radius divided by the zoom
    /// scale, so bubbles keep the same size on screen at any zoom level.
    /// `transition` is set on full redraws and absent on pure zoom.
    fn render_bubbles(&mut self, transition: Option<Instant>) {
        let (Some(data), Some(metric)) = (self.data_by_id.as_ref(), self.metric.as_ref()) else {
            return;
        };
        let k = self.zoom.transform().k;
        let path = PathGenerator::new(self.projection);
        let duration = Duration::from_millis(self.config.transition_ms);
        let index = &self.index;
        let scale = &self.scale;

        // Rows without a feature have nowhere to go and are not joined
        let entries = data.iter().filter_map(|(id, row)| {
            index.center(id).map(|center| (id, (path.centroid(center), row)))
        });
        let summary = self.bubbles.join(
            entries,
            |_, (position, _)| Bubble::new(*position),
            |_, (position, row), bubble| {
                bubble.position = position;
                let target = scale.map(metric.value(row)) / k;
                match transition {
                    Some(now) => bubble.transition_to(target, now, duration),
                    None => bubble.set_radius(target),
                }
            },
        );
        debug!(entered = summary.entered.len(), exited = summary.exited.len(), k, "joined bubbles");
    }

    fn zoomed(&mut self) {
        let Some(viewport) = self.state.viewport() else {
            return;
        };
        if !self.state.is_drawn() {
            return;
        }
        self.render_bubbles(None);
        self.state = RenderState::Zoomed(viewport);
    }

    /// Wheel zoom anchored at a canvas point
    pub fn zoom_by(&mut self, factor: f64, anchor: DVec2) {
        if self.state.is_drawn() {
            self.zoom.scale_by(factor, anchor);
            self.zoomed();
        }
    }

    pub fn zoom_step(&self) -> f64 {
        self.config.zoom_step
    }

    pub fn pan(&mut self, delta: DVec2) {
        if self.state.is_drawn() {
            self.zoom.pan(delta);
            self.zoomed();
        }
    }

    pub fn reset_zoom(&mut self) {
        if self.state.is_drawn() {
            self.zoom.reset();
            self.zoomed();
        }
    }

    /// Advance transitions; returns true while any bubble is animating
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut animating = false;
        self.bubbles.for_each_mut(|_, bubble| animating |= bubble.tick(now));
        animating
    }

    /// Identifier under a canvas point. Bubbles paint over countries and are
    /// tested first; countries absent from the data never match.
    pub fn hit_test(&self, canvas: DVec2) -> Option<&str> {
        if !self.state.is_drawn() {
            return None;
        }
        let p = self.zoom.transform().invert(canvas);
        let bubble = self
            .bubbles
            .iter()
            .rev()
            .find(|(_, b)| b.hit(p))
            .map(|(id, _)| id);
        bubble.or_else(|| {
            self.countries
                .iter()
                .rev()
                .find(|(_, c)| c.hoverable && c.hit(p))
                .map(|(id, _)| id)
        })
    }

    /// Mark exactly the activated elements and raise the active country
    pub fn apply_activation(&mut self, activation: &Activation) {
        let country = activation.country.as_deref();
        let bubble = activation.bubble.as_deref();
        self.countries
            .for_each_mut(|id, shape| shape.active = Some(id) == country);
        self.bubbles
            .for_each_mut(|id, b| b.active = Some(id) == bubble);
        if let Some(id) = country {
            self.countries.raise(id);
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.config.transition_ms)
    }
}
