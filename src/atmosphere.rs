//! Distance fog that thickens and turns green below the water line.

use cgmath::{Vector3, VectorSpace};

use crate::{data_structures::material::colour_from_hex, render::RenderBackend};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fog {
    pub colour: Vector3<f32>,
    pub near: f32,
    pub far: f32,
}

impl Fog {
    pub fn new(colour: Vector3<f32>, near: f32, far: f32) -> Self {
        Self { colour, near, far }
    }

    pub fn lerp(&self, target: &Fog, factor: f32) -> Fog {
        Fog {
            colour: self.colour.lerp(target.colour, factor),
            near: self.near + (target.near - self.near) * factor,
            far: self.far + (target.far - self.far) * factor,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FogConfig {
    pub surface: Fog,
    pub submerged: Fog,
    pub lerp_factor: f32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            surface: Fog::new(colour_from_hex(0xd6cfc7), 80.0, 200.0),
            submerged: Fog::new(colour_from_hex(0x228b22), 20.0, 80.0),
            lerp_factor: 0.02,
        }
    }
}

#[derive(Debug)]
pub struct FogController {
    config: FogConfig,
    current: Fog,
}

impl FogController {
    pub fn new(config: FogConfig) -> Self {
        Self {
            current: config.surface,
            config,
        }
    }

    pub fn current(&self) -> &Fog {
        &self.current
    }

    pub fn update<R: RenderBackend + ?Sized>(&mut self, submerged: bool, backend: &mut R) {
        let target = if submerged {
            self.config.submerged
        } else {
            self.config.surface
        };
        self.current = self.current.lerp(&target, self.config.lerp_factor);
        backend.set_fog(&self.current);
    }
}
