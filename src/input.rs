//! Per-frame keyboard and mouse snapshot.
//!
//! winit events are folded into [`Input`] as they arrive. Edge queries such as
//! [`KeyInput::key_down`] compare against the state at the end of the previous
//! frame, so [`Input::update_frame`] has to run once after every frame.

use std::collections::HashSet;

use winit::{
    event::{DeviceEvent, ElementState, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::math::{NormalizeOrZero, Vector2f};

#[derive(Debug, Default, Clone)]
pub struct KeyInput {
    pressed: HashSet<KeyCode>,
    previous: HashSet<KeyCode>,
}

impl KeyInput {
    pub fn press(&mut self, key: KeyCode) {
        self.pressed.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.pressed.remove(&key);
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    /// Pressed this frame but not in the previous one.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key) && !self.previous.contains(&key)
    }

    /// Released this frame.
    pub fn key_up(&self, key: KeyCode) -> bool {
        !self.pressed.contains(&key) && self.previous.contains(&key)
    }

    fn roll(&mut self) {
        self.previous.clone_from(&self.pressed);
    }
}

#[derive(Debug, Clone)]
pub struct MouseInput {
    position: Vector2f,
    delta: Vector2f,
    pressed: HashSet<MouseButton>,
    previous: HashSet<MouseButton>,
}

impl Default for MouseInput {
    fn default() -> Self {
        Self {
            position: Vector2f::new(0.0, 0.0),
            delta: Vector2f::new(0.0, 0.0),
            pressed: HashSet::new(),
            previous: HashSet::new(),
        }
    }
}

impl MouseInput {
    /// Cursor position in window pixels.
    pub fn position(&self) -> Vector2f {
        self.position
    }

    /// Raw motion accumulated since the last frame.
    pub fn delta(&self) -> Vector2f {
        self.delta
    }

    pub fn set_position(&mut self, position: Vector2f) {
        self.position = position;
    }

    pub fn add_delta(&mut self, dx: f32, dy: f32) {
        self.delta += Vector2f::new(dx, dy);
    }

    pub fn press(&mut self, button: MouseButton) {
        self.pressed.insert(button);
    }

    pub fn release(&mut self, button: MouseButton) {
        self.pressed.remove(&button);
    }

    pub fn is_pressed(&self, button: MouseButton) -> bool {
        self.pressed.contains(&button)
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.pressed.contains(&button) && !self.previous.contains(&button)
    }

    fn roll(&mut self) {
        self.previous.clone_from(&self.pressed);
        self.delta = Vector2f::new(0.0, 0.0);
    }
}

#[derive(Debug, Default, Clone)]
pub struct Input {
    pub keys: KeyInput,
    pub mouse: MouseInput,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.keys.press(code),
                        ElementState::Released => self.keys.release(code),
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse
                    .set_position(Vector2f::new(position.x as f32, position.y as f32));
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => self.mouse.press(*button),
                ElementState::Released => self.mouse.release(*button),
            },
            // Keys held while the window loses focus never report a release.
            WindowEvent::Focused(false) => {
                self.keys.pressed.clear();
                self.mouse.pressed.clear();
            }
            _ => (),
        }
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.mouse.add_delta(*dx as f32, *dy as f32);
        }
    }

    /// WASD as a unit vector: `x` is right (D) minus left (A), `y` is forward (W) minus back (S).
    pub fn navigation(&self) -> Vector2f {
        let axis = |positive: KeyCode, negative: KeyCode| {
            let pressed = |key| self.keys.is_pressed(key) as i32 as f32;
            pressed(positive) - pressed(negative)
        };
        Vector2f::new(axis(KeyCode::KeyD, KeyCode::KeyA), axis(KeyCode::KeyW, KeyCode::KeyS))
            .normalize_or_zero()
    }

    /// Ends the frame: the current state becomes the previous state and the mouse delta resets.
    pub fn update_frame(&mut self) {
        self.keys.roll();
        self.mouse.roll();
    }
}
