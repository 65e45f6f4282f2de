/// Window rectangle in the platform's native screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from edge coordinates, clamping inverted edges to an empty rect.
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            x: left,
            y: top,
            width: (i64::from(right) - i64::from(left)).max(0) as u32,
            height: (i64::from(bottom) - i64::from(top)).max(0) as u32,
        }
    }

    /// Half-open containment: `[x, x + width) × [y, y + height)`.
    pub fn contains(&self, px: i32, py: i32) -> bool {
        let (px, py) = (i64::from(px), i64::from(py));
        let (x, y) = (i64::from(self.x), i64::from(self.y));
        px >= x && px < x + i64::from(self.width) && py >= y && py < y + i64::from(self.height)
    }

    /// Clamp a point onto the closed area of this rect.
    pub fn clamp(&self, px: i32, py: i32) -> (i32, i32) {
        let right = (i64::from(self.x) + i64::from(self.width) - 1).max(i64::from(self.x)) as i32;
        let bottom = (i64::from(self.y) + i64::from(self.height) - 1).max(i64::from(self.y)) as i32;
        (px.clamp(self.x, right), py.clamp(self.y, bottom))
    }
}

/// Convert `(x, y)` from a frame with origin `(from_x, from_y)` into one with
/// origin `(to_x, to_y)`. Wrapping arithmetic keeps it total.
pub fn map_coordinates(from_x: i32, from_y: i32, to_x: i32, to_y: i32, x: i32, y: i32) -> (i32, i32) {
    (
        x.wrapping_sub(to_x.wrapping_sub(from_x)),
        y.wrapping_sub(to_y.wrapping_sub(from_y)),
    )
}
