use std::collections::HashMap;

use engine::Vec2;

use crate::geometry::{segment_intersects_rect, Rect};

/// Anything that can answer "is this rectangle blocked by terrain".
pub trait Obstacles {
    fn blocks(&self, rect: &Rect) -> bool;

    /// Rectangles that could block a segment between `a` and `b`.
    fn blocking_rects_along(&self, a: Vec2, b: Vec2) -> Vec<Rect>;
}

impl Obstacles for [Rect] {
    fn blocks(&self, rect: &Rect) -> bool {
        self.iter().any(|obstacle| obstacle.intersects(rect))
    }

    fn blocking_rects_along(&self, _a: Vec2, _b: Vec2) -> Vec<Rect> {
        self.to_vec()
    }
}

impl Obstacles for Vec<Rect> {
    fn blocks(&self, rect: &Rect) -> bool {
        self.as_slice().blocks(rect)
    }

    fn blocking_rects_along(&self, a: Vec2, b: Vec2) -> Vec<Rect> {
        self.as_slice().blocking_rects_along(a, b)
    }
}

pub fn snap_to_tile(pos: Vec2, tile_size: f32) -> (i32, i32) {
    (
        (pos.x / tile_size).floor() as i32,
        (pos.y / tile_size).floor() as i32,
    )
}

pub fn tile_center(grid_x: i32, grid_y: i32, tile_size: f32) -> Vec2 {
    Vec2::new(
        (grid_x as f32 + 0.5) * tile_size,
        (grid_y as f32 + 0.5) * tile_size,
    )
}

/// Searches square rings around `origin` out to `max_radius` tiles and
/// returns the center of the first tile clear of obstacles and `occupied`.
pub fn find_free_tile(
    origin: Vec2,
    max_radius: i32,
    tile_size: f32,
    obstacles: &(impl Obstacles + ?Sized),
    occupied: &[Rect],
) -> Option<Vec2> {
    let (cx, cy) = snap_to_tile(origin, tile_size);
    for radius in 0..=max_radius {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs() != radius && dy.abs() != radius {
                    continue;
                }
                let rect = Rect::tile(cx + dx, cy + dy, tile_size);
                if obstacles.blocks(&rect) || occupied.iter().any(|other| other.intersects(&rect)) {
                    continue;
                }
                return Some(rect.center());
            }
        }
    }
    None
}

pub fn line_of_sight(from: Vec2, to: Vec2, obstacles: &(impl Obstacles + ?Sized)) -> bool {
    !obstacles
        .blocking_rects_along(from, to)
        .iter()
        .any(|rect| segment_intersects_rect(from, to, rect))
}

/// Zombie spawn markers bucketed into coarse cells for respawns near the player.
#[derive(Debug, Clone, Default)]
pub struct SpawnGrid {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<Vec2>>,
}

impl SpawnGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(1.0),
            cells: HashMap::new(),
        }
    }

    pub fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, pos: Vec2) {
        let cell = self.cell_of(pos);
        self.cells.entry(cell).or_default().push(pos);
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Markers in the player's cell and the eight around it.
    pub fn near(&self, pos: Vec2) -> Vec<Vec2> {
        let (cx, cy) = self.cell_of(pos);
        let mut out = Vec::new();
        for dy in -1..=1 {
            for dx in -1..=1 {
                if let Some(markers) = self.cells.get(&(cx + dx, cy + dy)) {
                    out.extend_from_slice(markers);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_tile_prefers_origin_then_rings() {
        let obstacles: Vec<Rect> = Vec::new();
        let spot = find_free_tile(Vec2::new(40.0, 40.0), 2, 32.0, &obstacles, &[]);
        assert_eq!(spot, Some(Vec2::new(48.0, 48.0)));

        let occupied = [Rect::tile(1, 1, 32.0)];
        let spot = find_free_tile(Vec2::new(40.0, 40.0), 2, 32.0, &obstacles, &occupied)
            .expect("ring one");
        assert_ne!(spot, Vec2::new(48.0, 48.0));
        assert!(spot.distance(Vec2::new(48.0, 48.0)) < 32.0 * 1.5);
    }

    #[test]
    fn fully_obstructed_area_has_no_free_tile() {
        let mut walls = Vec::new();
        for y in -2..=2 {
            for x in -2..=2 {
                walls.push(Rect::tile(x, y, 32.0));
            }
        }
        assert!(find_free_tile(Vec2::new(16.0, 16.0), 2, 32.0, &walls, &[]).is_none());
    }

    #[test]
    fn wall_between_breaks_sight() {
        let walls = vec![Rect::tile(2, 0, 32.0)];
        assert!(!line_of_sight(Vec2::new(16.0, 16.0), Vec2::new(150.0, 16.0), &walls));
        assert!(line_of_sight(Vec2::new(16.0, 80.0), Vec2::new(150.0, 80.0), &walls));
    }

    #[test]
    fn spawn_grid_reads_neighbouring_cells_only() {
        let mut grid = SpawnGrid::new(512.0);
        grid.insert(Vec2::new(10.0, 10.0));
        grid.insert(Vec2::new(600.0, 10.0));
        grid.insert(Vec2::new(2_000.0, 2_000.0));
        assert_eq!(grid.len(), 3);
        assert_eq!(grid.near(Vec2::new(100.0, 100.0)).len(), 2);
        assert_eq!(grid.near(Vec2::new(1_900.0, 1_900.0)).len(), 1);
    }
}
