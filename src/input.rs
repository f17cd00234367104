//! Translation of winit window events into diorama input.

use cgmath::Vector2;
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollStep {
    Advance,
    Retreat,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputEvent {
    /// Pointer position in normalized device coordinates (y up).
    PointerMoved(Vector2<f32>),
    PointerDown(Vector2<f32>),
    Scroll(ScrollStep),
    Resized {
        width: u32,
        height: u32,
        device_pixel_ratio: f32,
    },
}

pub fn to_ndc(position: PhysicalPosition<f64>, size: PhysicalSize<u32>) -> Vector2<f32> {
    if size.width == 0 || size.height == 0 {
        return Vector2::new(0.0, 0.0);
    }
    Vector2::new(
        (position.x / size.width as f64 * 2.0 - 1.0) as f32,
        -(position.y / size.height as f64 * 2.0 - 1.0) as f32,
    )
}

/// Scrolling down (away from the surface) advances.
pub fn scroll_step(delta: &MouseScrollDelta) -> Option<ScrollStep> {
    let y = match delta {
        MouseScrollDelta::LineDelta(_, y) => *y as f64,
        MouseScrollDelta::PixelDelta(position) => position.y,
    };
    if y < 0.0 {
        Some(ScrollStep::Advance)
    } else if y > 0.0 {
        Some(ScrollStep::Retreat)
    } else {
        None
    }
}

#[derive(Debug)]
pub struct InputTranslator {
    size: PhysicalSize<u32>,
    scale_factor: f64,
    pointer: Vector2<f32>,
}

impl InputTranslator {
    pub fn new(size: PhysicalSize<u32>, scale_factor: f64) -> Self {
        Self {
            size,
            scale_factor,
            pointer: Vector2::new(0.0, 0.0),
        }
    }

    pub fn pointer(&self) -> Vector2<f32> {
        self.pointer
    }

    pub fn translate(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.pointer = to_ndc(*position, self.size);
                Some(InputEvent::PointerMoved(self.pointer))
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => Some(InputEvent::PointerDown(self.pointer)),
            WindowEvent::MouseWheel { delta, .. } => scroll_step(delta).map(InputEvent::Scroll),
            WindowEvent::Resized(size) => {
                self.size = *size;
                Some(self.resized())
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = *scale_factor;
                Some(self.resized())
            }
            _ => None,
        }
    }

    fn resized(&self) -> InputEvent {
        InputEvent::Resized {
            width: self.size.width,
            height: self.size.height,
            device_pixel_ratio: self.scale_factor as f32,
        }
    }
}
