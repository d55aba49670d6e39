//! Mapping between terminal cells and the lot's logical coordinate space.

use parklot_core::geometry::{Point, Rect as LogicalRect};
use ratatui::layout::Rect;

/// Scales a `logical_width × logical_height` space onto a terminal area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    area: Rect,
    logical_width: i32,
    logical_height: i32,
}

impl Viewport {
    pub fn new(area: Rect, logical_width: i32, logical_height: i32) -> Self {
        Self {
            area,
            logical_width: logical_width.max(1),
            logical_height: logical_height.max(1),
        }
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    /// Logical point under the centre of the cell at `column`, `row`.
    pub fn to_logical(&self, column: u16, row: u16) -> Point {
        Point::new(
            scale_to_logical(column, self.area.x, self.area.width, self.logical_width),
            scale_to_logical(row, self.area.y, self.area.height, self.logical_height),
        )
    }

    /// Cells covering a logical rectangle, at least one cell in each
    /// direction and clipped to the terminal area.
    pub fn to_cells(&self, rect: LogicalRect) -> Rect {
        let x0 = self.cell_x(rect.x);
        let y0 = self.cell_y(rect.y);
        let x1 = self.cell_x(rect.right()).max(x0 + 1);
        let y1 = self.cell_y(rect.bottom()).max(y0 + 1);

        let left = i64::from(self.area.x);
        let top = i64::from(self.area.y);
        let right = left + i64::from(self.area.width);
        let bottom = top + i64::from(self.area.height);

        let cx0 = (left + x0).clamp(left, right);
        let cy0 = (top + y0).clamp(top, bottom);
        let cx1 = (left + x1).clamp(left, right);
        let cy1 = (top + y1).clamp(top, bottom);
        Rect::new(
            cx0 as u16,
            cy0 as u16,
            (cx1 - cx0) as u16,
            (cy1 - cy0) as u16,
        )
    }

    fn cell_x(&self, x: i32) -> i64 {
        scale_to_cells(x, self.area.width, self.logical_width)
    }

    fn cell_y(&self, y: i32) -> i64 {
        scale_to_cells(y, self.area.height, self.logical_height)
    }
}

fn scale_to_cells(value: i32, cells: u16, logical: i32) -> i64 {
    (i64::from(value) * i64::from(cells)).div_euclid(i64::from(logical))
}

fn scale_to_logical(cell: u16, origin: u16, cells: u16, logical: i32) -> i32 {
    if cells == 0 {
        return 0;
    }
    let offset = cell.saturating_sub(origin).min(cells - 1);
    let fraction = (f64::from(offset) + 0.5) / f64::from(cells);
    ((fraction * f64::from(logical)).floor() as i32).min(logical - 1)
}
