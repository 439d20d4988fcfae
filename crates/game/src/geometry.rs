use engine::Vec2;

/// Axis-aligned rectangle in world pixels, y grows downward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_center(center: Vec2, w: f32, h: f32) -> Self {
        Self::new(center.x - w * 0.5, center.y - h * 0.5, w, h)
    }

    pub fn tile(grid_x: i32, grid_y: i32, tile_size: f32) -> Self {
        Self::new(
            grid_x as f32 * tile_size,
            grid_y as f32 * tile_size,
            tile_size,
            tile_size,
        )
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Strict overlap; touching edges do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn inflate(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.x - dx, self.y - dy, self.w + dx * 2.0, self.h + dy * 2.0)
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.w, self.h)
    }

    pub fn with_center(&self, center: Vec2) -> Rect {
        Rect::from_center(center, self.w, self.h)
    }
}

/// Liang-Barsky clip of the segment `a -> b` against `rect`.
pub fn segment_intersects_rect(a: Vec2, b: Vec2, rect: &Rect) -> bool {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let p = [-dx, dx, -dy, dy];
    let q = [
        a.x - rect.x,
        rect.right() - a.x,
        a.y - rect.y,
        rect.bottom() - a.y,
    ];
    let mut t0 = 0.0_f32;
    let mut t1 = 1.0_f32;
    for (pi, qi) in p.into_iter().zip(q) {
        if pi.abs() <= f32::EPSILON {
            if qi < 0.0 {
                return false;
            }
            continue;
        }
        let t = qi / pi;
        if pi < 0.0 {
            if t > t1 {
                return false;
            }
            t0 = t0.max(t);
        } else {
            if t < t0 {
                return false;
            }
            t1 = t1.min(t);
        }
    }
    t0 <= t1
}
