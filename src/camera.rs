//! Camera navigation.
//!
//! The navigator rests at one of a list of waypoints, or focuses one entity
//! through an exclusive [`FocusOverride`]. Either way it computes a target
//! pose each frame and moves the smoothed pose a fixed fraction toward it.
//! Pointer-driven parallax is layered on top of the smoothed pose while no
//! override is open.

use cgmath::{Deg, InnerSpace, Rad, Vector2, Vector3, VectorSpace};

use crate::{context::Context, pick::Ray, resources::AssetId};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraPose {
    pub position: Vector3<f32>,
    pub look_at: Vector3<f32>,
}

impl CameraPose {
    pub fn new(position: Vector3<f32>, look_at: Vector3<f32>) -> Self {
        Self { position, look_at }
    }

    pub fn lerp(&self, target: &CameraPose, factor: f32) -> CameraPose {
        CameraPose {
            position: self.position.lerp(target.position, factor),
            look_at: self.look_at.lerp(target.look_at, factor),
        }
    }

    /// Orthonormal (forward, right, up) basis of the view.
    pub fn basis(&self) -> (Vector3<f32>, Vector3<f32>, Vector3<f32>) {
        let delta = self.look_at - self.position;
        let forward = if delta.magnitude2() > f32::EPSILON {
            delta.normalize()
        } else {
            -Vector3::unit_z()
        };
        let right = forward.cross(Vector3::unit_y());
        // looking straight up or down
        let right = if right.magnitude2() > f32::EPSILON {
            right.normalize()
        } else {
            Vector3::unit_x()
        };
        let up = right.cross(forward).normalize();
        (forward, right, up)
    }
}

pub type Waypoint = CameraPose;

#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub waypoints: Vec<Waypoint>,
    /// Waypoint the camera returns to when an override closes.
    pub reentry_waypoint: usize,
    pub lerp_factor: f32,
    pub fov_y: Deg<f32>,
    pub z_near: f32,
    pub z_far: f32,
    pub parallax_enabled: bool,
    pub parallax_intensity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            waypoints: vec![
                Waypoint::new(Vector3::new(0.0, 0.0, 30.0), Vector3::new(0.0, -5.0, 0.0)),
                Waypoint::new(Vector3::new(7.0, -18.0, 45.0), Vector3::new(-8.0, -20.0, 0.0)),
            ],
            reentry_waypoint: 1,
            lerp_factor: 0.05,
            fov_y: Deg(75.0),
            z_near: 0.1,
            z_far: 1000.0,
            parallax_enabled: true,
            parallax_intensity: 0.2,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FocusOverride {
    pub entity: AssetId,
    pub camera_offset: Vector3<f32>,
    pub look_at_offset: Vector3<f32>,
}

#[derive(Debug)]
pub struct CameraNavigator {
    config: CameraConfig,
    waypoint_index: usize,
    focus: Option<FocusOverride>,
    smoothed: CameraPose,
    rendered: CameraPose,
    pointer: Vector2<f32>,
}

impl CameraNavigator {
    pub fn new(config: CameraConfig) -> Self {
        let start = config
            .waypoints
            .first()
            .copied()
            .unwrap_or_else(|| CameraPose::new(Vector3::new(0.0, 0.0, 30.0), Vector3::new(0.0, 0.0, 0.0)));
        Self {
            config,
            waypoint_index: 0,
            focus: None,
            smoothed: start,
            rendered: start,
            pointer: Vector2::new(0.0, 0.0),
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn waypoint_index(&self) -> usize {
        self.waypoint_index
    }

    pub fn waypoint_count(&self) -> usize {
        self.config.waypoints.len()
    }

    pub fn active_override(&self) -> Option<&FocusOverride> {
        self.focus.as_ref()
    }

    pub fn is_override_open(&self, entity: &AssetId) -> bool {
        self.focus.as_ref().is_some_and(|f| &f.entity == entity)
    }

    /// Deeper waypoints sit below the water line.
    pub fn is_submerged(&self) -> bool {
        self.waypoint_index >= 1 && self.focus.is_none()
    }

    /// Moves one waypoint deeper. Ignored while an override is open.
    pub fn advance(&mut self) -> bool {
        if self.focus.is_some() || self.waypoint_index + 1 >= self.waypoint_count() {
            return false;
        }
        self.waypoint_index += 1;
        true
    }

    pub fn retreat(&mut self) -> bool {
        if self.focus.is_some() || self.waypoint_index == 0 {
            return false;
        }
        self.waypoint_index -= 1;
        true
    }

    /// Opens an override for `focus.entity`, closing any other one first.
    /// Returns the entity whose override was closed.
    pub fn select(&mut self, focus: FocusOverride) -> Option<AssetId> {
        let previous = self.focus.take().map(|prev| prev.entity);
        let previous = previous.filter(|prev| prev != &focus.entity);
        if let Some(prev) = &previous {
            log::debug!("Closing focus on {} before focusing {}", prev, focus.entity);
        }
        self.focus = Some(focus);
        previous
    }

    /// Returns to the re-entry waypoint. `false` if nothing was open.
    pub fn close_override(&mut self) -> bool {
        if self.focus.take().is_none() {
            return false;
        }
        self.waypoint_index = self
            .config
            .reentry_waypoint
            .min(self.waypoint_count().saturating_sub(1));
        true
    }

    pub fn set_pointer(&mut self, ndc: Vector2<f32>) {
        self.pointer = ndc;
    }

    pub fn reset_pointer(&mut self) {
        self.pointer = Vector2::new(0.0, 0.0);
    }

    /// The pose the camera is moving toward this frame.
    pub fn target(&self, ctx: &Context) -> CameraPose {
        if let Some(focus) = &self.focus {
            match ctx.entity_world_position(&focus.entity) {
                Some(origin) => {
                    return CameraPose::new(
                        origin + focus.camera_offset,
                        origin + focus.look_at_offset,
                    );
                }
                None => log::warn!("Focused entity {} is not loaded", focus.entity),
            }
        }
        self.config
            .waypoints
            .get(self.waypoint_index)
            .copied()
            .unwrap_or(self.smoothed)
    }

    pub fn update(&mut self, ctx: &Context) {
        let target = self.target(ctx);
        self.smoothed = self.smoothed.lerp(&target, self.config.lerp_factor);
        self.rendered = self.smoothed;
        if self.config.parallax_enabled && self.focus.is_none() {
            let (_, right, up) = self.smoothed.basis();
            let intensity = self.config.parallax_intensity;
            self.rendered.position +=
                right * (self.pointer.x * intensity) + up * (self.pointer.y * intensity);
        }
    }

    /// Smoothed pose without parallax.
    pub fn smoothed(&self) -> &CameraPose {
        &self.smoothed
    }

    /// Pose handed to the renderer and used for picking.
    pub fn pose(&self) -> &CameraPose {
        &self.rendered
    }

    /// Ray from the rendered camera through `ndc` (x right, y up, both in [-1, 1]).
    pub fn ray(&self, ndc: Vector2<f32>, aspect: f32) -> Ray {
        let (forward, right, up) = self.rendered.basis();
        let half_height = (Rad::from(self.config.fov_y).0 * 0.5).tan();
        let half_width = half_height * aspect;
        let direction =
            (forward + right * (ndc.x * half_width) + up * (ndc.y * half_height)).normalize();
        Ray::new(self.rendered.position, direction)
    }
}
