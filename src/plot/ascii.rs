//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid, deterministic output. Each series gets its own
//! mark; where lines cross, the series drawn first keeps the cell.

use chrono::NaiveDate;

use crate::math::rebase;

/// Marks assigned to series in order (cycled).
pub const MARKS: [char; 8] = ['*', '+', 'x', 'o', '#', '@', '%', '&'];

/// A named series aligned to the plot's dates.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub name: String,
    pub values: Vec<f64>,
}

impl PlotSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Rebase every series to 100 at its first value and render them together.
pub fn render_rebased_plot(dates: &[NaiveDate], series: &[PlotSeries], width: usize, height: usize) -> String {
    let rebased: Vec<PlotSeries> = series
        .iter()
        .map(|s| PlotSeries::new(s.name.clone(), rebase(&s.values, 100.0)))
        .collect();
    render_plot(dates, &rebased, width, height, "rebased=100")
}

fn render_plot(dates: &[NaiveDate], series: &[PlotSeries], width: usize, height: usize, label: &str) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (y_min, y_max) = y_range(series).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);
    let x_max = dates.len().saturating_sub(1).max(1) as f64;

    let mut grid = vec![vec![' '; width]; height];
    for (i, s) in series.iter().enumerate() {
        let mark = MARKS[i % MARKS.len()];
        draw_series(&mut grid, &s.values, x_max, y_min, y_max, mark);
    }

    let mut out = String::new();
    let span = match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => format!("{first} .. {last}"),
        _ => "no dates".to_string(),
    };
    out.push_str(&format!("Plot: {span} | {label} | y=[{y_min:.2}, {y_max:.2}]\n"));

    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }

    for (i, s) in series.iter().enumerate() {
        let last = s.values.iter().rev().find(|v| v.is_finite());
        match last {
            Some(v) => out.push_str(&format!("  {} {} ({v:.1})\n", MARKS[i % MARKS.len()], s.name)),
            None => out.push_str(&format!("  {} {} (no data)\n", MARKS[i % MARKS.len()], s.name)),
        }
    }

    out
}

fn y_range(series: &[PlotSeries]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &y in series.iter().flat_map(|s| &s.values) {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
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

fn map_x(t: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = (t / t_max).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Connect consecutive finite points; gaps break the line.
fn draw_series(grid: &mut [Vec<char>], values: &[f64], x_max: f64, y_min: f64, y_max: f64, mark: char) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for (i, &y) in values.iter().enumerate() {
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let x = map_x(i as f64, x_max, width);
        let yy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, yy, mark),
            None if grid[yy][x] == ' ' => grid[yy][x] = mark,
            None => {}
        }
        prev = Some((x, yy));
    }
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
