use std::ops::{Add, Mul, Sub};

use super::input::{ActionStates, InputAction};
use super::rendering::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    cursor_position_px: Option<Vec2>,
    left_click_pressed: bool,
    left_click_released: bool,
    left_button_down: bool,
    right_click_pressed: bool,
    wheel_steps: i32,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        cursor_position_px: Option<Vec2>,
        left_click_pressed: bool,
        left_click_released: bool,
        left_button_down: bool,
        right_click_pressed: bool,
        wheel_steps: i32,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            quit_requested,
            actions,
            cursor_position_px,
            left_click_pressed,
            left_click_released,
            left_button_down,
            right_click_pressed,
            wheel_steps,
            window_width,
            window_height,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.actions.was_pressed(action)
    }

    pub fn shift_held(&self) -> bool {
        self.actions.is_down(InputAction::Shift)
    }

    pub fn ctrl_held(&self) -> bool {
        self.actions.is_down(InputAction::Ctrl)
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    /// Marks a key as pressed this tick without leaving it held.
    pub fn with_action_pressed(mut self, action: InputAction) -> Self {
        self.actions.set_pressed(action, true);
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_left_click_pressed(mut self, left_click_pressed: bool) -> Self {
        self.left_click_pressed = left_click_pressed;
        if left_click_pressed {
            self.left_button_down = true;
        }
        self
    }

    pub fn with_left_click_released(mut self, left_click_released: bool) -> Self {
        self.left_click_released = left_click_released;
        if left_click_released {
            self.left_button_down = false;
        }
        self
    }

    pub fn with_left_button_down(mut self, left_button_down: bool) -> Self {
        self.left_button_down = left_button_down;
        self
    }

    pub fn with_right_click_pressed(mut self, right_click_pressed: bool) -> Self {
        self.right_click_pressed = right_click_pressed;
        self
    }

    pub fn with_wheel_steps(mut self, wheel_steps: i32) -> Self {
        self.wheel_steps = wheel_steps;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    pub fn left_click_pressed(&self) -> bool {
        self.left_click_pressed
    }

    pub fn left_click_released(&self) -> bool {
        self.left_click_released
    }

    pub fn left_button_down(&self) -> bool {
        self.left_button_down
    }

    pub fn right_click_pressed(&self) -> bool {
        self.right_click_pressed
    }

    pub fn wheel_steps(&self) -> i32 {
        self.wheel_steps
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len <= f32::EPSILON {
            return Vec2::ZERO;
        }
        Vec2 {
            x: self.x / len,
            y: self.y / len,
        }
    }

    pub fn from_angle(radians: f32) -> Vec2 {
        Vec2 {
            x: radians.cos(),
            y: radians.sin(),
        }
    }

    pub fn angle_to(self, target: Vec2) -> f32 {
        (target.y - self.y).atan2(target.x - self.x)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2 {
            x: self.x * rhs,
            y: self.y * rhs,
        }
    }
}

/// Axis-aligned rectangle in screen pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl ScreenRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.x as f32
            && point.y >= self.y as f32
            && point.x < (self.x + self.width) as f32
            && point.y < (self.y + self.height) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCommand {
    pub rect: ScreenRect,
    pub color: [u8; 4],
}

#[derive(Debug, Clone, Default)]
pub struct DrawList {
    pub clear_color: [u8; 4],
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn clear(&mut self, clear_color: [u8; 4]) {
        self.clear_color = clear_color;
        self.commands.clear();
    }

    pub fn push_rect(&mut self, rect: ScreenRect, color: [u8; 4]) {
        if color[3] == 0 || rect.width <= 0 || rect.height <= 0 {
            return;
        }
        self.commands.push(DrawCommand { rect, color });
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

pub trait Scene {
    fn load(&mut self);
    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand;
    fn render(&mut self, viewport: Viewport, out: &mut DrawList);
    fn unload(&mut self);
    fn debug_title(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_builder_sets_click_state() {
        let snapshot = InputSnapshot::empty()
            .with_left_click_pressed(true)
            .with_cursor_position_px(Some(Vec2::new(10.0, 20.0)))
            .with_window_size((800, 600));
        assert!(snapshot.left_click_pressed());
        assert!(snapshot.left_button_down());
        assert_eq!(snapshot.cursor_position_px(), Some(Vec2::new(10.0, 20.0)));
        assert_eq!(snapshot.window_size(), (800, 600));

        let released = snapshot.with_left_click_released(true);
        assert!(!released.left_button_down());
    }

    #[test]
    fn modifiers_follow_held_actions() {
        let snapshot = InputSnapshot::empty().with_action_down(InputAction::Shift, true);
        assert!(snapshot.shift_held());
        assert!(!snapshot.ctrl_held());
    }

    #[test]
    fn vec2_normalizes_and_measures() {
        let v = Vec2::new(3.0, 4.0);
        assert_eq!(v.length(), 5.0);
        let n = v.normalized();
        assert!((n.length() - 1.0).abs() < 1e-6);
        assert_eq!(Vec2::ZERO.normalized(), Vec2::ZERO);
        assert_eq!(Vec2::new(1.0, 1.0).distance(Vec2::new(4.0, 5.0)), 5.0);
    }

    #[test]
    fn draw_list_skips_invisible_commands() {
        let mut list = DrawList::default();
        list.clear([0, 0, 0, 255]);
        list.push_rect(ScreenRect::new(0, 0, 10, 10), [255, 0, 0, 0]);
        list.push_rect(ScreenRect::new(0, 0, 0, 10), [255, 0, 0, 255]);
        list.push_rect(ScreenRect::new(0, 0, 4, 4), [255, 0, 0, 128]);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn screen_rect_contains_is_half_open() {
        let rect = ScreenRect::new(10, 10, 5, 5);
        assert!(rect.contains(Vec2::new(10.0, 10.0)));
        assert!(rect.contains(Vec2::new(14.9, 14.9)));
        assert!(!rect.contains(Vec2::new(15.0, 12.0)));
    }
}
