use engine::Vec2;

use crate::geometry::Rect;

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub pos: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub damage: u32,
}

impl Projectile {
    pub fn new(origin: Vec2, angle: f32, speed: f32, damage: u32) -> Self {
        Self {
            pos: origin,
            velocity: Vec2::from_angle(angle) * speed,
            radius: 2.0,
            damage,
        }
    }

    pub fn advance(&mut self) {
        self.pos = self.pos + self.velocity;
    }

    pub fn rect(&self) -> Rect {
        Rect::from_center(self.pos, self.radius * 2.0, self.radius * 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_along_heading() {
        let mut projectile = Projectile::new(Vec2::ZERO, 0.0, 10.0, 4);
        projectile.advance();
        projectile.advance();
        assert!((projectile.pos.x - 20.0).abs() < 1e-4);
        assert!(projectile.pos.y.abs() < 1e-4);
    }
}
