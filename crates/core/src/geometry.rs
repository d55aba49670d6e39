//! Integer geometry in the lot's logical coordinate space.
//!
//! The origin is the top-left corner of the window and `y` grows downwards.

use serde::{Deserialize, Serialize};

/// A point in logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal offset from the left edge.
    pub x: i32,
    /// Vertical offset from the top edge.
    pub y: i32,
}

impl Point {
    /// Build a point from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub w: i32,
    /// Height.
    pub h: i32,
}

impl Rect {
    /// Build a rectangle from origin and size.
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Right edge (`x + w`).
    pub const fn right(&self) -> i32 {
        self.x + self.w
    }

    /// Bottom edge (`y + h`).
    pub const fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// Containment test; all four edges count as inside.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Shrink the rectangle by `amount` on every side, never below zero size.
    pub fn inset(&self, amount: i32) -> Self {
        Self {
            x: self.x + amount,
            y: self.y + amount,
            w: (self.w - 2 * amount).max(0),
            h: (self.h - 2 * amount).max(0),
        }
    }

    /// Grow the rectangle by `amount` on every side.
    pub fn outset(&self, amount: i32) -> Self {
        Self {
            x: self.x - amount,
            y: self.y - amount,
            w: self.w + 2 * amount,
            h: self.h + 2 * amount,
        }
    }

    /// Largest rectangle with the aspect ratio `width:height` that fits inside
    /// `self`, centred on both axes.
    pub fn fit_aspect(&self, width: u32, height: u32) -> Self {
        if self.w <= 0 || self.h <= 0 {
            return *self;
        }
        let content_aspect = if height == 0 {
            1.0
        } else {
            width as f64 / height as f64
        };
        let box_aspect = self.w as f64 / self.h as f64;
        let (draw_w, draw_h) = if content_aspect > box_aspect {
            (self.w, (self.w as f64 / content_aspect) as i32)
        } else {
            ((self.h as f64 * content_aspect) as i32, self.h)
        };
        Self {
            x: self.x + (self.w - draw_w) / 2,
            y: self.y + (self.h - draw_h) / 2,
            w: draw_w,
            h: draw_h,
        }
    }

    /// Rectangle of the given size centred inside `self`.
    pub fn centered(&self, w: i32, h: i32) -> Self {
        Self {
            x: self.x + (self.w - w) / 2,
            y: self.y + (self.h - h) / 2,
            w,
            h,
        }
    }
}

/// Lay out `rows × cols` cells of `cell` size separated by `gap`, centred
/// inside `bounds`. Cells are returned row-major.
pub fn centered_grid(bounds: Rect, rows: u32, cols: u32, cell: (i32, i32), gap: (i32, i32)) -> Vec<Rect> {
    let (cell_w, cell_h) = cell;
    let (gap_x, gap_y) = gap;
    let cols_i = cols as i32;
    let rows_i = rows as i32;
    let total_w = cols_i * cell_w + (cols_i - 1).max(0) * gap_x;
    let total_h = rows_i * cell_h + (rows_i - 1).max(0) * gap_y;
    let start_x = bounds.x + (bounds.w - total_w) / 2;
    let start_y = bounds.y + (bounds.h - total_h) / 2;

    let mut cells = Vec::with_capacity((rows * cols) as usize);
    for row in 0..rows_i {
        for col in 0..cols_i {
            cells.push(Rect::new(
                start_x + col * (cell_w + gap_x),
                start_y + row * (cell_h + gap_y),
                cell_w,
                cell_h,
            ));
        }
    }
    cells
}
