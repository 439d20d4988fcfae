use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::input::ActionStates;
use super::metrics::MetricsAccumulator;
use super::{DrawList, InputAction, InputSnapshot, MetricsHandle, Renderer, Scene, SceneCommand, Vec2};

pub const SLOW_FRAME_ENV_VAR: &str = "BITROT_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Bit Rot".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    run_app_with_metrics(config, scene, MetricsHandle::default())
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    mut scene: Box<dyn Scene>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let render_frame_target = target_frame_duration(config.max_render_fps.filter(|fps| *fps > 0));
    let initial_size = window.inner_size();
    let mut input_collector = InputCollector::new(initial_size.width, initial_size.height);

    scene.load();
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;
    let mut draw_list = DrawList::default();

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    input_collector.set_window_size(new_size.width, new_size.height);
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    input_collector.set_cursor_position_px(position.x as f32, position.y as f32);
                }
                WindowEvent::CursorLeft { .. } => input_collector.clear_cursor_position(),
                WindowEvent::MouseInput { state, button, .. } => {
                    input_collector.handle_mouse_input(button, state);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    input_collector.handle_mouse_wheel(delta);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let is_pressed = event.state == ElementState::Pressed;
                    input_collector.handle_physical_key(event.physical_key, is_pressed);
                }
                WindowEvent::RedrawRequested => {
                    if slow_frame_delay > Duration::ZERO {
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;
                    accumulator = accumulator.saturating_add(raw_frame_dt.min(max_frame_delta));

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        let command = scene.update(fixed_dt_seconds, &input_snapshot);
                        metrics_accumulator.record_tick();
                        if command == SceneCommand::Quit {
                            info!(reason = "scene_quit", "shutdown_requested");
                            window_target.exit();
                            break;
                        }
                    }
                    accumulator = step_plan.remaining_accumulator;
                    if step_plan.dropped_backlog > Duration::ZERO {
                        metrics_accumulator.record_dropped_backlog(step_plan.dropped_backlog);
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    let elapsed_since_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep = compute_cap_sleep(elapsed_since_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    scene.render(renderer.viewport(), &mut draw_list);
                    if let Err(error) = renderer.render(&draw_list) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let next_title = scene.debug_title();
                    if next_title != last_applied_title {
                        window.set_title(next_title.as_deref().unwrap_or(&config.window_title));
                        last_applied_title = next_title;
                    }

                    metrics_accumulator.record_frame(raw_frame_dt);
                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            draw_commands = draw_list.len(),
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => window.request_redraw(),
            Event::LoopExiting => {
                scene.unload();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    cursor_position_px: Option<Vec2>,
    left_mouse_is_down: bool,
    left_click_pressed_edge: bool,
    left_click_released_edge: bool,
    right_mouse_is_down: bool,
    right_click_pressed_edge: bool,
    pending_wheel_steps: i32,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.action_states,
            self.cursor_position_px,
            self.left_click_pressed_edge,
            self.left_click_released_edge,
            self.left_mouse_is_down,
            self.right_click_pressed_edge,
            self.pending_wheel_steps,
            self.window_width,
            self.window_height,
        );
        self.action_states.clear_edges();
        self.left_click_pressed_edge = false;
        self.left_click_released_edge = false;
        self.right_click_pressed_edge = false;
        self.pending_wheel_steps = 0;
        snapshot
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        if let Some(action) = action_for_key(code) {
            self.action_states.set(action, is_pressed);
        }
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    fn set_cursor_position_px(&mut self, x: f32, y: f32) {
        self.cursor_position_px = Some(Vec2 { x, y });
    }

    fn clear_cursor_position(&mut self) {
        self.cursor_position_px = None;
    }

    fn handle_mouse_wheel(&mut self, delta: MouseScrollDelta) {
        let steps = wheel_steps_from_scroll_delta(delta);
        self.pending_wheel_steps = self.pending_wheel_steps.saturating_add(steps);
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        match (button, state) {
            (MouseButton::Left, ElementState::Pressed) => {
                if !self.left_mouse_is_down {
                    self.left_click_pressed_edge = true;
                }
                self.left_mouse_is_down = true;
            }
            (MouseButton::Left, ElementState::Released) => {
                if self.left_mouse_is_down {
                    self.left_click_released_edge = true;
                }
                self.left_mouse_is_down = false;
            }
            (MouseButton::Right, ElementState::Pressed) => {
                if !self.right_mouse_is_down {
                    self.right_click_pressed_edge = true;
                }
                self.right_mouse_is_down = true;
            }
            (MouseButton::Right, ElementState::Released) => self.right_mouse_is_down = false,
            _ => {}
        }
    }
}

fn action_for_key(code: KeyCode) -> Option<InputAction> {
    let action = match code {
        KeyCode::KeyW | KeyCode::ArrowUp => InputAction::MoveUp,
        KeyCode::KeyS | KeyCode::ArrowDown => InputAction::MoveDown,
        KeyCode::KeyA | KeyCode::ArrowLeft => InputAction::MoveLeft,
        KeyCode::KeyD | KeyCode::ArrowRight => InputAction::MoveRight,
        KeyCode::Digit1 => InputAction::Belt1,
        KeyCode::Digit2 => InputAction::Belt2,
        KeyCode::Digit3 => InputAction::Belt3,
        KeyCode::Digit4 => InputAction::Belt4,
        KeyCode::Digit5 => InputAction::Belt5,
        KeyCode::KeyE => InputAction::Grab,
        KeyCode::KeyR => InputAction::Reload,
        KeyCode::KeyI => InputAction::ToggleInventory,
        KeyCode::KeyH => InputAction::ToggleStatus,
        KeyCode::KeyN => InputAction::ToggleNearby,
        KeyCode::KeyM => InputAction::ToggleMessages,
        KeyCode::F2 => InputAction::Pause,
        KeyCode::Escape => InputAction::Escape,
        KeyCode::ShiftLeft | KeyCode::ShiftRight => InputAction::Shift,
        KeyCode::ControlLeft | KeyCode::ControlRight => InputAction::Ctrl,
        _ => return None,
    };
    Some(action)
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(_) => Duration::from_millis(config_slow_frame_ms),
    }
}

fn wheel_steps_from_scroll_delta(delta: MouseScrollDelta) -> i32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => {
            if y > 0.0 {
                1
            } else if y < 0.0 {
                -1
            } else {
                0
            }
        }
        MouseScrollDelta::PixelDelta(position) => (position.y / 40.0).round() as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_plan_runs_whole_ticks_and_keeps_remainder() {
        let plan = plan_sim_steps(Duration::from_millis(40), Duration::from_millis(16), 5);
        assert_eq!(plan.ticks_to_run, 2);
        assert_eq!(plan.remaining_accumulator, Duration::from_millis(8));
        assert_eq!(plan.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn step_plan_drops_backlog_past_tick_cap() {
        let plan = plan_sim_steps(Duration::from_millis(200), Duration::from_millis(16), 3);
        assert_eq!(plan.ticks_to_run, 3);
        assert_eq!(plan.remaining_accumulator, Duration::ZERO);
        assert_eq!(plan.dropped_backlog, Duration::from_millis(152));
    }

    #[test]
    fn cap_sleep_only_when_under_target() {
        let target = Some(Duration::from_millis(16));
        assert_eq!(
            compute_cap_sleep(Duration::from_millis(10), target),
            Duration::from_millis(6)
        );
        assert_eq!(compute_cap_sleep(Duration::from_millis(20), target), Duration::ZERO);
        assert_eq!(compute_cap_sleep(Duration::from_millis(1), None), Duration::ZERO);
    }

    #[test]
    fn collector_edges_clear_after_snapshot() {
        let mut collector = InputCollector::new(800, 600);
        collector.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        collector.handle_physical_key(PhysicalKey::Code(KeyCode::KeyR), true);
        collector.handle_mouse_wheel(MouseScrollDelta::LineDelta(0.0, 1.0));

        let first = collector.snapshot_for_tick();
        assert!(first.left_click_pressed());
        assert!(first.left_button_down());
        assert!(first.was_pressed(InputAction::Reload));
        assert_eq!(first.wheel_steps(), 1);

        let second = collector.snapshot_for_tick();
        assert!(!second.left_click_pressed());
        assert!(second.left_button_down());
        assert!(!second.was_pressed(InputAction::Reload));
        assert!(second.is_down(InputAction::Reload));
        assert_eq!(second.wheel_steps(), 0);

        collector.handle_mouse_input(MouseButton::Left, ElementState::Released);
        let third = collector.snapshot_for_tick();
        assert!(third.left_click_released());
        assert!(!third.left_button_down());
    }

    #[test]
    fn key_map_covers_movement_and_belt() {
        assert_eq!(action_for_key(KeyCode::ArrowUp), Some(InputAction::MoveUp));
        assert_eq!(action_for_key(KeyCode::KeyD), Some(InputAction::MoveRight));
        assert_eq!(action_for_key(KeyCode::Digit3), Some(InputAction::Belt3));
        assert_eq!(action_for_key(KeyCode::F2), Some(InputAction::Pause));
        assert_eq!(action_for_key(KeyCode::KeyZ), None);
    }
}
