use crate::app::App;
use crate::braille::BrailleCanvas;
use crate::legend::SizeLegend;
use crate::map::geometry::{draw_circle, draw_path, draw_polyline, fill_circle};
use crate::map::{PointerEvent, Renderer, Tooltip, TooltipContent};
use glam::DVec2;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};
use std::time::Instant;

/// Tooltip popup state, drawn on top of the map by [`render`]
#[derive(Clone, Debug, Default)]
pub struct TerminalTooltip {
    content: Option<TooltipContent>,
    position: (u16, u16),
    visible: bool,
}

impl TerminalTooltip {
    pub fn content(&self) -> Option<&TooltipContent> {
        self.content.as_ref().filter(|_| self.visible)
    }

    pub fn position(&self) -> (u16, u16) {
        self.position
    }
}

impl Tooltip for TerminalTooltip {
    fn show(&mut self, content: &TooltipContent) {
        self.content = Some(content.clone());
        self.visible = true;
    }

    fn move_to(&mut self, event: &PointerEvent) {
        self.position = (event.x.max(0.0) as u16, event.y.max(0.0) as u16);
    }

    fn hide(&mut self) {
        self.visible = false;
    }
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Split into map area and status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_map(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);
    if let Some(content) = app.interaction.tooltip().content() {
        render_tooltip(frame, content, app.interaction.tooltip().position(), chunks[0]);
    }
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Bubble Map ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.too_small {
        let message = Paragraph::new("Terminal too small for the map")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Red));
        frame.render_widget(message, inner);
        return;
    }

    let layers = map_layers(&app.renderer, inner.width as usize, inner.height as usize, Instant::now());
    frame.render_widget(MapWidget { layers }, inner);
    render_legend(frame, &app.legend, inner);
}

/// Rasterize the renderer's layers, back to front
fn map_layers(renderer: &Renderer, width: usize, height: usize, now: Instant) -> Vec<(BrailleCanvas, Color)> {
    let mut outlines = BrailleCanvas::new(width, height);
    let mut data_outlines = BrailleCanvas::new(width, height);
    let mut active_outline = BrailleCanvas::new(width, height);
    let mut bubbles = BrailleCanvas::new(width, height);
    let mut active_bubble = BrailleCanvas::new(width, height);

    let Some(viewport) = renderer.viewport() else {
        return Vec::new();
    };
    let transform = renderer.transform();
    let max_jump = viewport.bounded_width / 2.0;

    for (_, shape) in renderer.countries().iter() {
        let canvas = if shape.active {
            &mut active_outline
        } else if shape.hoverable {
            &mut data_outlines
        } else {
            &mut outlines
        };
        draw_path(canvas, &shape.path, &transform, max_jump);
    }

    for (_, bubble) in renderer.bubbles().iter() {
        let center = transform.apply(bubble.position);
        let radius = (bubble.presented_radius(now) * transform.k).round() as i32;
        if radius <= 0 {
            continue;
        }
        let (cx, cy) = (center.x.round() as i32, center.y.round() as i32);
        if bubble.active {
            fill_circle(&mut active_bubble, cx, cy, radius);
        } else {
            draw_circle(&mut bubbles, cx, cy, radius);
        }
    }

    vec![
        (outlines, Color::DarkGray),
        (data_outlines, Color::Gray),
        (active_outline, Color::Yellow),
        (bubbles, Color::LightRed),
        (active_bubble, Color::Yellow),
    ]
}

/// Braille layers painted over each other; later layers win a cell
struct MapWidget {
    layers: Vec<(BrailleCanvas, Color)>,
}

fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
    for (col, row, ch) in canvas.glyphs() {
        if col >= area.width as usize || row >= area.height as usize {
            continue;
        }
        let (x, y) = (area.x + col as u16, area.y + row as u16);
        buf[(x, y)].set_char(ch).set_fg(color);
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for (canvas, color) in &self.layers {
            render_layer(canvas, *color, area, buf);
        }
    }
}

/// Legend size in cells, without the border
fn legend_cells(legend: &SizeLegend) -> (u16, u16) {
    let vb = legend.view_box();
    ((vb.width / 2.0).ceil() as u16, (vb.height / 4.0).ceil() as u16)
}

/// Box the legend occupies, anchored bottom-left of the map area.
/// None when there is no legend or it does not fit.
pub fn legend_rect(legend: &SizeLegend, area: Rect) -> Option<Rect> {
    let (cols, rows) = legend_cells(legend);
    let width = (cols + 2).max(legend.title().chars().count() as u16 + 4);
    let height = rows + 2;
    if legend.title().is_empty() || width > area.width || height > area.height {
        return None;
    }
    Some(Rect::new(area.x, area.y + area.height - height, width, height))
}

fn render_legend(frame: &mut Frame, legend: &SizeLegend, area: Rect) {
    let Some(rect) = legend_rect(legend, area) else {
        return;
    };
    let vb = legend.view_box();
    let (cols, rows) = legend_cells(legend);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" {} ", legend.title()),
            Style::default().fg(Color::White),
        ));
    let inner = block.inner(rect);
    frame.render_widget(Clear, rect);
    frame.render_widget(block, rect);

    let origin = DVec2::new(vb.x, vb.y);
    let mut canvas = BrailleCanvas::new(cols as usize, rows as usize);
    for item in legend.items() {
        let center = DVec2::new(0.0, item.circle_y) - origin;
        draw_circle(
            &mut canvas,
            center.x.round() as i32,
            center.y.round() as i32,
            item.circle_r.round() as i32,
        );
        let leader: Vec<DVec2> = item.leader.iter().map(|&p| p - origin).collect();
        draw_polyline(&mut canvas, &leader);
    }
    let buf = frame.buffer_mut();
    render_layer(&canvas, Color::Gray, inner, buf);

    for item in legend.items() {
        let (lo, _) = legend.label_extent(item);
        let col = ((lo.x - vb.x) / 2.0).floor().max(0.0) as u16;
        let row = ((item.label_y - vb.y) / 4.0).floor().max(0.0) as u16;
        if row >= inner.height {
            continue;
        }
        for (i, ch) in item.label.chars().enumerate() {
            let x = inner.x + col + i as u16;
            if x < inner.x + inner.width {
                buf[(x, inner.y + row)].set_char(ch).set_fg(Color::White);
            }
        }
    }
}

/// Popup next to the pointer, kept inside `area`
fn render_tooltip(frame: &mut Frame, content: &TooltipContent, position: (u16, u16), area: Rect) {
    let width = content.name.chars().count().max(content.value.chars().count()) as u16 + 4;
    let height = 4;
    if width > area.width || height > area.height {
        return;
    }
    let x = position.0.saturating_add(2).min(area.x + area.width - width).max(area.x);
    let y = position.1.saturating_add(1).min(area.y + area.height - height).max(area.y);
    let rect = Rect::new(x, y, width, height);

    let text = vec![
        Line::from(Span::styled(
            content.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(content.value.clone(), Style::default().fg(Color::Yellow))),
    ];
    let popup = Paragraph::new(text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(Clear, rect);
    frame.render_widget(popup, rect);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = Line::from(vec![
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.metric_name(), Style::default().fg(Color::Magenta)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.hovered_name().unwrap_or("-"), Style::default().fg(Color::Cyan)),
        Span::styled(
            " | hjkl:pan +/-:zoom m:metric r:reset q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::data::{Metric, NumberFormat};
    use crate::test_support;
    use std::rc::Rc;

    #[test]
    fn test_tooltip_hides_content() {
        let mut tooltip = TerminalTooltip::default();
        tooltip.show(&TooltipContent {
            name: "Albania".to_string(),
            value: "50".to_string(),
        });
        tooltip.move_to(&PointerEvent::new(4.0, 7.0));
        assert_eq!(tooltip.content().map(|c| c.name.as_str()), Some("Albania"));
        assert_eq!(tooltip.position(), (4, 7));
        tooltip.hide();
        assert!(tooltip.content().is_none());
    }

    #[test]
    fn test_map_layers_draw_every_country() {
        let mut renderer = Renderer::new(
            test_support::index(),
            test_support::rows(),
            test_support::accessor(),
            "010",
            RenderConfig::default(),
        );
        let now = Instant::now();
        renderer.resize(408.0, 400.0, now);
        renderer.update_metric(
            Rc::new(Metric::field("Population", "pop_est", NumberFormat::Grouped)),
            now,
        );
        let layers = map_layers(&renderer, 204, 40, now + renderer.duration());
        assert_eq!(layers.len(), 5);
        // Both fixture countries have data, so they land on the data layer
        assert_eq!(layers[0].0.glyphs().count(), 0);
        assert!(layers[1].0.glyphs().count() > 0);
        assert!(layers[3].0.glyphs().count() > 0);
    }
}
