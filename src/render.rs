//! ASCII preview of a panel layout, for the CLI `--layout` flag.

use crate::types::{Layout, Params};

const MAX_COLS: f64 = 80.0;
const MAX_ROWS: f64 = 40.0;

/// An item footprint on a panel, in panel coordinates, with its label.
pub struct PlacedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
}

/// Footprints (rotation applied) of every placement on panel `panel`,
/// labelled by item id.
pub fn placements_on_panel(params: &Params, layout: &Layout, panel: usize) -> Vec<PlacedRect> {
    layout
        .used
        .iter()
        .filter(|u| u.panel == panel)
        .map(|u| {
            let item = &params.items[u.item];
            let (width, height) = if u.rotate {
                (item.height, item.width)
            } else {
                (item.width, item.height)
            };
            PlacedRect {
                x: u.x,
                y: u.y,
                width,
                height,
                label: item.id.clone(),
            }
        })
        .collect()
}

pub fn render_panel(panel_width: f64, panel_height: f64, rects: &[PlacedRect]) -> String {
    let scale = f64::min(MAX_COLS / panel_width, MAX_ROWS / panel_height);
    let grid_w = (panel_width * scale).round() as usize;
    let grid_h = (panel_height * scale).round() as usize;

    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; grid_h + 1];

    draw_rect(&mut grid, 0, 0, grid_w, grid_h);

    for r in rects {
        let sx = (r.x * scale).round() as usize;
        let sy = (r.y * scale).round() as usize;
        let sw = (r.width * scale).round() as usize;
        let sh = (r.height * scale).round() as usize;

        if sw == 0 || sh == 0 {
            continue;
        }

        draw_rect(&mut grid, sx, sy, sw, sh);

        let label: Vec<char> = r.label.chars().collect();
        if sw > 2 && sh > 0 {
            let cx = sx + sw / 2;
            let cy = sy + sh / 2;
            let start_x = cx.saturating_sub(label.len() / 2);
            for (i, &ch) in label.iter().enumerate() {
                let x = start_x + i;
                if x > sx && x < sx + sw && cy > sy && cy < sy + sh {
                    grid[cy][x] = ch;
                }
            }
        }
    }

    // Row 0 is the panel's bottom edge; print top-down.
    let mut out = String::new();
    for row in grid.iter().rev() {
        let line: String = row.iter().collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn draw_rect(grid: &mut [Vec<char>], x: usize, y: usize, w: usize, h: usize) {
    let rows = grid.len();
    let cols = if rows > 0 { grid[0].len() } else { return };

    for i in x..=x + w {
        if i < cols {
            if y < rows {
                grid[y][i] = edge(grid[y][i], '-');
            }
            if y + h < rows {
                grid[y + h][i] = edge(grid[y + h][i], '-');
            }
        }
    }

    for j in y..=y + h {
        if j < rows {
            if x < cols {
                grid[j][x] = edge(grid[j][x], '|');
            }
            if x + w < cols {
                grid[j][x + w] = edge(grid[j][x + w], '|');
            }
        }
    }

    for &cx in &[x, x + w] {
        for &cy in &[y, y + h] {
            if cy < rows && cx < cols {
                grid[cy][cx] = '+';
            }
        }
    }
}

fn edge(existing: char, ch: char) -> char {
    let crossing = match ch {
        '-' => existing == '|',
        _ => existing == '-',
    };
    if crossing || existing == '+' { '+' } else { ch }
}
