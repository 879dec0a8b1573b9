use crate::config::ShapeGridConfig;

use super::{Bounds, GridCell, ShapeInstance, ShapeKind, ValueItem};

/// Rows and columns for `count` items. A fixed table, not a packing search.
pub fn grid_dimensions(count: usize) -> (usize, usize) {
    let rows = match count {
        0 => return (0, 0),
        1..=3 => 1,
        4..=8 => 2,
        9..=12 => 3,
        _ => 4,
    };
    (rows, count.div_ceil(rows))
}

/// Items in `row`: full rows hold `cols`, the last one holds the remainder.
pub fn row_item_count(count: usize, row: usize) -> usize {
    let (rows, cols) = grid_dimensions(count);
    if row >= rows {
        return 0;
    }
    count.saturating_sub(row * cols).min(cols)
}

/// Cells in row-major order, one per item, inside `area`.
pub fn allocate_grid(count: usize, area: &Bounds, config: &ShapeGridConfig) -> Vec<GridCell> {
    let (rows, cols) = grid_dimensions(count);
    if rows == 0 || area.width() <= 0.0 || area.height() <= 0.0 {
        return Vec::new();
    }
    let cell_width = area.width() / cols as f64;
    let cell_height = area.height() / rows as f64;
    let max_radius = cell_max_radius(cell_width, cell_height, config);

    let mut cells = Vec::with_capacity(count);
    for row in 0..rows {
        let in_row = row_item_count(count, row);
        let row_offset = (cols - in_row) as f64 * cell_width / 2.0;
        for col in 0..in_row {
            cells.push(GridCell {
                row,
                col,
                center_x: area.x1 + row_offset + (col as f64 + 0.5) * cell_width,
                center_y: area.y1 + (row as f64 + 0.5) * cell_height,
                cell_width,
                cell_height,
                max_radius,
            });
        }
    }
    cells
}

fn cell_max_radius(cell_width: f64, cell_height: f64, config: &ShapeGridConfig) -> f64 {
    let keep = (1.0 - config.spacing_ratio).clamp(0.0, 1.0);
    let inner_width = cell_width * keep;
    let inner_height = cell_height * keep;
    let room = config.label_room_factor.max(1.0);
    (inner_width.min(inner_height / room) / 2.0 - config.padding).max(0.0)
}

/// `max_size · √(value / max_value)`, so area tracks value. Non-zero sizes
/// below `floor` are raised to it.
pub fn proportional_size(value: f64, max_value: f64, max_size: f64, floor: f64) -> f64 {
    if value <= 0.0 || max_value <= 0.0 || max_size <= 0.0 {
        return 0.0;
    }
    let size = max_size * (value / max_value).min(1.0).sqrt();
    if size > 0.0 && size < floor {
        floor
    } else {
        size
    }
}

pub fn size_shapes(
    items: &[ValueItem],
    area: &Bounds,
    kind: ShapeKind,
    config: &ShapeGridConfig,
) -> Vec<ShapeInstance> {
    let cells = allocate_grid(items.len(), area, config);
    let max_value = items
        .iter()
        .map(|item| item.raw_value)
        .fold(0.0f64, f64::max);
    items
        .iter()
        .zip(cells)
        .map(|(item, cell)| {
            let max_size = match kind {
                ShapeKind::Circle => cell.max_radius,
                ShapeKind::Triangle => cell.max_radius * 2.0,
            };
            ShapeInstance {
                item: item.clone(),
                cell,
                kind,
                size: proportional_size(
                    item.raw_value,
                    max_value,
                    max_size,
                    config.min_visible_size,
                ),
            }
        })
        .collect()
}

/// Equilateral triangle, apex up, centroid on `(cx, cy)`.
pub fn triangle_points(cx: f64, cy: f64, side: f64) -> [(f64, f64); 3] {
    let height = side * 3f64.sqrt() / 2.0;
    [
        (cx, cy - height * 2.0 / 3.0),
        (cx + side / 2.0, cy + height / 3.0),
        (cx - side / 2.0, cy + height / 3.0),
    ]
}
