use geo::{LineString, MultiPolygon};
use glam::DVec2;

use crate::braille::BrailleCanvas;
use crate::map::zoom::ZoomTransform;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Rough visibility check for a segment against a w x h canvas
fn segment_might_be_visible(a: DVec2, b: DVec2, width: f64, height: f64) -> bool {
    let min = a.min(b);
    let max = a.max(b);
    max.x >= 0.0 && min.x < width && max.y >= 0.0 && min.y < height
}

/// Draw a ring through the zoom transform. Segments longer than
/// `max_jump` (untransformed) are antimeridian wraps and are skipped.
pub fn draw_ring(
    canvas: &mut BrailleCanvas,
    ring: &LineString<f64>,
    transform: &ZoomTransform,
    max_jump: f64,
) {
    let (width, height) = (canvas.pixel_width() as f64, canvas.pixel_height() as f64);
    for seg in ring.0.windows(2) {
        let a = DVec2::new(seg[0].x, seg[0].y);
        let b = DVec2::new(seg[1].x, seg[1].y);
        if (a.x - b.x).abs() > max_jump {
            continue;
        }
        let (sa, sb) = (transform.apply(a), transform.apply(b));
        if !segment_might_be_visible(sa, sb, width, height) {
            continue;
        }
        draw_line(
            canvas,
            sa.x.round() as i32,
            sa.y.round() as i32,
            sb.x.round() as i32,
            sb.y.round() as i32,
        );
    }
}

/// Draw every exterior and interior ring of a projected outline
pub fn draw_path(
    canvas: &mut BrailleCanvas,
    path: &MultiPolygon<f64>,
    transform: &ZoomTransform,
    max_jump: f64,
) {
    for poly in &path.0 {
        draw_ring(canvas, poly.exterior(), transform, max_jump);
        for ring in poly.interiors() {
            draw_ring(canvas, ring, transform, max_jump);
        }
    }
}

/// Circle outline (midpoint algorithm)
pub fn draw_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    if radius <= 0 {
        canvas.set_pixel_signed(cx, cy);
        return;
    }
    let mut x = radius;
    let mut y = 0;
    let mut err = 1 - radius;
    while x >= y {
        for (px, py) in [
            (x, y),
            (y, x),
            (-y, x),
            (-x, y),
            (-x, -y),
            (-y, -x),
            (y, -x),
            (x, -y),
        ] {
            canvas.set_pixel_signed(cx + px, cy + py);
        }
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

/// Draw a filled circle (for the active bubble)
pub fn fill_circle(canvas: &mut BrailleCanvas, cx: i32, cy: i32, radius: i32) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                canvas.set_pixel_signed(cx + dx, cy + dy);
            }
        }
    }
}

/// Connect consecutive points
pub fn draw_polyline(canvas: &mut BrailleCanvas, points: &[DVec2]) {
    for seg in points.windows(2) {
        draw_line(
            canvas,
            seg[0].x.round() as i32,
            seg[0].y.round() as i32,
            seg[1].x.round() as i32,
            seg[1].y.round() as i32,
        );
    }
}
