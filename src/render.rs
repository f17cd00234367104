//! The seam to the rendering backend.
//!
//! The core never issues draw calls. It pushes configuration through
//! [`RenderBackend`] whenever the quality tier, the fog or the viewport changes
//! and hands the backend a read-only [`FrameView`] once per tick, after every
//! subsystem has finished mutating the frame's state.

use std::collections::HashMap;

use cgmath::Vector3;
use instant::Duration;

use crate::{
    atmosphere::Fog,
    camera::CameraPose,
    data_structures::{material::MaterialStore, texture::TextureStore},
    quality::{BloomParams, QualityTier, ReflectionParams},
    resources::{AssetId, texture::EnvironmentMap},
    surface::{ClipPlayback, DisplacementChannel},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PostPass {
    AntiAliasing,
    Reflections,
    Bloom,
}

#[derive(Clone, Copy, Debug)]
pub enum BackgroundSource<'a> {
    Environment(&'a EnvironmentMap),
    Solid(Vector3<f32>),
}

/// Everything the backend needs to draw one frame.
pub struct FrameView<'a> {
    pub tier: QualityTier,
    pub camera: &'a CameraPose,
    pub fog: &'a Fog,
    pub materials: &'a MaterialStore,
    pub textures: &'a TextureStore,
    /// `None` while displacement is gated off.
    pub displacement: Option<&'a DisplacementChannel>,
    pub playback: &'a HashMap<AssetId, ClipPlayback>,
}

pub trait RenderBackend {
    fn resize(&mut self, width: u32, height: u32);

    fn set_pixel_ratio(&mut self, ratio: f32);

    fn set_pass_enabled(&mut self, pass: PostPass, enabled: bool);

    fn configure_bloom(&mut self, params: BloomParams);

    fn configure_reflections(&mut self, params: ReflectionParams);

    /// Shadow casting of the primary light.
    fn set_light_shadows(&mut self, enabled: bool);

    fn set_shadow_map(&mut self, enabled: bool);

    fn set_background(&mut self, source: BackgroundSource<'_>);

    /// `None` removes image based lighting.
    fn set_environment(&mut self, environment: Option<&EnvironmentMap>);

    fn set_fog(&mut self, fog: &Fog);

    fn submit_frame(&mut self, dt: Duration, frame: &FrameView<'_>);
}
