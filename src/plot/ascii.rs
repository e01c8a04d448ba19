//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - series points: `o`, spaced evenly in label order
//! - connecting line: `-`

use crate::domain::{Metric, SeriesPoint, TimeSeries};

/// Render one metric series as a line chart.
pub fn render_series_plot(metric: Metric, series: &TimeSeries, width: usize, height: usize) -> String {
    let points = series.points();
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return format!("Plot: {metric} | no data\n");
    };

    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(points).unwrap_or((first.value - 0.5, first.value + 0.5));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    let coords: Vec<(usize, usize)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            (
                map_x(i, points.len(), width),
                map_y(p.value, y_min, y_max, height),
            )
        })
        .collect();

    // Draw the line first so points can overlay.
    for pair in coords.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        draw_line(&mut grid, x0, y0, x1, y1, '-');
    }
    for &(x, y) in &coords {
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {metric} | labels=[{}, {}] | y=[{y_min:.2}, {y_max:.2}]\n",
        first.label, last.label
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn y_range(points: &[SeriesPoint]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in points {
        min_y = min_y.min(p.value);
        max_y = max_y.max(p.value);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(idx: usize, n: usize, width: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let u = idx as f64 / (n as f64 - 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[(&str, f64)]) -> TimeSeries {
        TimeSeries::from_points(
            values
                .iter()
                .map(|(label, value)| SeriesPoint {
                    label: label.to_string(),
                    value: *value,
                })
                .collect(),
        )
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let s = series(&[("d1", 100.0), ("d2", 110.0), ("d3", 100.0)]);
        let txt = render_series_plot(Metric::Sales, &s, 11, 5);
        let expected = concat!(
            "Plot: sales | labels=[d1, d3] | y=[99.50, 110.50]\n",
            "     o     \n",
            "    - -    \n",
            "  --   --  \n",
            " -       - \n",
            "o         o\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn flat_and_single_point_series_render() {
        let txt = render_series_plot(Metric::Quantity, &series(&[("only", 3.0)]), 10, 5);
        let expected = concat!(
            "Plot: quantity | labels=[only, only] | y=[2.45, 3.55]\n",
            "          \n",
            "          \n",
            "o         \n",
            "          \n",
            "          \n",
        );
        assert_eq!(txt, expected);

        let empty = render_series_plot(Metric::Sales, &TimeSeries::default(), 10, 5);
        assert_eq!(empty, "Plot: sales | no data\n");
    }
}
