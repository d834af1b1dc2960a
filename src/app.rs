use std::rc::Rc;
use std::sync::mpsc::Receiver;
use std::time::Instant;

use glam::DVec2;
use ratatui::layout::{Position, Rect};
use tracing::info;

use crate::config::LegendConfig;
use crate::data::Metric;
use crate::legend::SizeLegend;
use crate::map::{InteractionController, PointerEvent, Renderer, ScaleChange};
use crate::ui::{self, TerminalTooltip};

/// Application state
pub struct App {
    pub renderer: Renderer,
    pub legend: SizeLegend,
    pub interaction: InteractionController<TerminalTooltip>,
    scale_changes: Receiver<ScaleChange>,
    metrics: Vec<Rc<Metric>>,
    current_metric: usize,
    /// Identifier under the pointer, if any
    pub hovered: Option<String>,
    pub should_quit: bool,
    /// Set when the last resize left no room for the map
    pub too_small: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for hover
    pub mouse_pos: Option<(u16, u16)>,
    /// Map area in characters, inside the border
    map_cells: (u16, u16),
}

impl App {
    /// `width`/`height` are the terminal size; the first metric is applied
    pub fn new(
        mut renderer: Renderer,
        legend: LegendConfig,
        metrics: Vec<Rc<Metric>>,
        width: u16,
        height: u16,
        now: Instant,
    ) -> Self {
        let scale_changes = renderer.subscribe();
        let mut app = Self {
            renderer,
            legend: SizeLegend::new(legend),
            interaction: InteractionController::new(TerminalTooltip::default()),
            scale_changes,
            metrics,
            current_metric: 0,
            hovered: None,
            should_quit: false,
            too_small: false,
            last_mouse: None,
            mouse_pos: None,
            map_cells: (0, 0),
        };
        app.resize(width, height, now);
        if let Some(metric) = app.metrics.first().cloned() {
            app.renderer.update_metric(metric, now);
        }
        app.sync_legend();
        app
    }

    /// Update the map size when the terminal resizes
    pub fn resize(&mut self, width: u16, height: u16, now: Instant) {
        // Account for border (2 chars horizontal, 2 vertical plus the status bar)
        let inner_width = width.saturating_sub(2);
        let inner_height = height.saturating_sub(3);
        self.map_cells = (inner_width, inner_height);
        // Braille gives 2x4 resolution per character
        let resized = self
            .renderer
            .resize(inner_width as f64 * 2.0, inner_height as f64 * 4.0, now);
        self.too_small = !resized;
        self.sync_legend();
        self.refresh_hover();
    }

    /// Feed pending scale notifications to the legend
    fn sync_legend(&mut self) {
        while let Ok(change) = self.scale_changes.try_recv() {
            self.legend.update(&change);
        }
    }

    /// Advance animations; returns true while something is still moving
    pub fn tick(&mut self, now: Instant) -> bool {
        self.sync_legend();
        self.renderer.tick(now)
    }

    pub fn metric_name(&self) -> &str {
        self.renderer.metric().map_or("no metric", |m| m.name.as_str())
    }

    /// Switch to the next configured metric
    pub fn cycle_metric(&mut self, now: Instant) {
        if self.metrics.is_empty() {
            return;
        }
        self.current_metric = (self.current_metric + 1) % self.metrics.len();
        let metric = Rc::clone(&self.metrics[self.current_metric]);
        info!(metric = %metric.name, "switching metric");
        self.renderer.update_metric(metric, now);
        self.sync_legend();
        self.refresh_hover();
    }

    /// Convert terminal coords to canvas dots at the center of the cell.
    /// Each terminal cell is 2 braille pixels wide, 4 tall; the border
    /// offsets the map by one cell.
    pub fn canvas_point(&self, col: u16, row: u16) -> Option<DVec2> {
        let (cols, rows) = self.map_cells;
        if col == 0 || row == 0 || col > cols || row > rows {
            return None;
        }
        Some(DVec2::new(
            (col - 1) as f64 * 2.0 + 1.0,
            (row - 1) as f64 * 4.0 + 2.0,
        ))
    }

    /// Hover: leave the previous element, enter the new one, or just
    /// follow the pointer while staying on the same element
    pub fn pointer_moved(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
        let target = self.target_at(col, row);
        let event = PointerEvent::new(col as f64, row as f64);

        if target == self.hovered {
            if self.hovered.is_some() {
                self.interaction.pointer_move(&event);
            }
            return;
        }
        if self.hovered.is_some() {
            let cleared = self.interaction.pointer_leave();
            self.renderer.apply_activation(&cleared);
        }
        if let Some(id) = &target {
            let activation = self.interaction.pointer_enter(id, &self.renderer.join_view(), &event);
            self.renderer.apply_activation(&activation);
        }
        self.hovered = target;
    }

    /// Map area in terminal cells, inside the border
    fn map_area(&self) -> Rect {
        Rect::new(1, 1, self.map_cells.0, self.map_cells.1)
    }

    /// Screen box covered by the legend, if it is drawn
    pub fn legend_area(&self) -> Option<Rect> {
        ui::legend_rect(&self.legend, self.map_area())
    }

    /// Hoverable element under a terminal cell; the legend hides the map
    fn target_at(&self, col: u16, row: u16) -> Option<String> {
        if self.too_small {
            return None;
        }
        if self
            .legend_area()
            .is_some_and(|legend| legend.contains(Position::new(col, row)))
        {
            return None;
        }
        let point = self.canvas_point(col, row)?;
        self.renderer.hit_test(point).map(str::to_string)
    }

    /// Re-run hover at the last pointer position after the map moved
    fn refresh_hover(&mut self) {
        if let Some((col, row)) = self.mouse_pos {
            self.pointer_moved(col, row);
        }
    }

    pub fn hovered_name(&self) -> Option<&str> {
        let id = self.hovered.as_deref()?;
        self.renderer.index().get(id)?.name.as_deref()
    }

    /// Pan the map by a canvas delta
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.renderer.pan(DVec2::new(dx, dy));
        self.refresh_hover();
    }

    fn map_center(&self) -> DVec2 {
        self.renderer
            .viewport()
            .map_or(DVec2::ZERO, |v| DVec2::new(v.width, v.height) / 2.0)
    }

    /// Zoom in on the map center
    pub fn zoom_in(&mut self) {
        let (factor, anchor) = (self.renderer.zoom_step(), self.map_center());
        self.renderer.zoom_by(factor, anchor);
        self.refresh_hover();
    }

    /// Zoom out from the map center
    pub fn zoom_out(&mut self) {
        let (factor, anchor) = (1.0 / self.renderer.zoom_step(), self.map_center());
        self.renderer.zoom_by(factor, anchor);
        self.refresh_hover();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some(anchor) = self.canvas_point(col, row) {
            self.renderer.zoom_by(self.renderer.zoom_step(), anchor);
            self.refresh_hover();
        }
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some(anchor) = self.canvas_point(col, row) {
            self.renderer.zoom_by(1.0 / self.renderer.zoom_step(), anchor);
            self.refresh_hover();
        }
    }

    /// Programmatic reset to the identity transform
    pub fn reset_zoom(&mut self) {
        self.renderer.reset_zoom();
        self.refresh_hover();
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.renderer.transform().k)
    }

    /// Handle mouse drag: the map follows the pointer
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = (x as f64 - last_x as f64) * 2.0;
            let dy = (y as f64 - last_y as f64) * 4.0;
            self.pan(dx, dy);
        }
        self.last_mouse = Some((x, y));
    }

    /// Reset drag state when mouse button released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }
}
