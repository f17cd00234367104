//! Procedural surface animation.
//!
//! Scrolls the texture offsets of the water surface, drifts the shared
//! displacement map and advances the clip playback clocks of animated
//! entities. Displacement and clip playback cost GPU time and are skipped at
//! [`QualityTier::Performance`]; texture scrolling always runs.

use cgmath::{InnerSpace, Vector2, Vector3};
use image::GrayImage;
use instant::Duration;

use crate::{
    context::Context,
    data_structures::{
        material::TextureSlot,
        scene_graph::SceneAsset,
        texture::{TextureKey, TextureStore, WrapMode},
    },
    quality::QualityTier,
    resources::{AssetId, texture::generate_noise_texture},
};

/// Wraps into `[0, 1)`, also for negative input.
pub fn wrap_unit(value: f32) -> f32 {
    let wrapped = value.rem_euclid(1.0);
    // rem_euclid rounds tiny negative values up to exactly 1.0
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChannelDef {
    pub name: String,
    pub slot: TextureSlot,
    pub speed: Vector3<f32>,
    pub loops: [bool; 3],
}

impl ChannelDef {
    pub fn looping(name: &str, slot: TextureSlot, speed_x: f32, speed_y: f32) -> Self {
        Self {
            name: name.to_string(),
            slot,
            speed: Vector3::new(speed_x, speed_y, 0.0),
            loops: [true; 3],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DisplacementConfig {
    pub speed: f32,
    pub direction: Vector2<f32>,
    pub effect_scale: f32,
    pub texture_scale: f32,
    pub loops: bool,
    pub noise_size: u32,
    pub noise_seed: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceConfig {
    pub channels: Vec<ChannelDef>,
    pub displacement: DisplacementConfig,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            channels: vec![
                ChannelDef::looping("map", TextureSlot::Color, 0.01, 0.015),
                ChannelDef::looping("metalness", TextureSlot::Metallic, 0.005, 0.002),
                ChannelDef::looping("roughness", TextureSlot::Roughness, 0.005, 0.005),
                ChannelDef::looping("normal", TextureSlot::Normal, 0.02, 0.01),
                ChannelDef::looping("emissive", TextureSlot::Emission, 0.008, 0.0),
            ],
            displacement: DisplacementConfig {
                speed: 0.05,
                direction: Vector2::new(0.1, 0.05),
                effect_scale: 0.15,
                texture_scale: 2.0,
                loops: true,
                noise_size: 256,
                noise_seed: 0x5eed,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextureAnimationChannel {
    pub name: String,
    pub slot: TextureSlot,
    pub bound: Option<TextureKey>,
    pub offset: Vector3<f32>,
    pub speed: Vector3<f32>,
    pub loops: [bool; 3],
}

impl TextureAnimationChannel {
    fn from_def(def: &ChannelDef) -> Self {
        Self {
            name: def.name.clone(),
            slot: def.slot,
            bound: None,
            offset: Vector3::new(0.0, 0.0, 0.0),
            speed: def.speed,
            loops: def.loops,
        }
    }

    pub fn is_active(&self) -> bool {
        self.bound.is_some() && self.speed != Vector3::new(0.0, 0.0, 0.0)
    }

    /// `offset += speed * dt`, wrapping looping axes.
    pub fn advance(&mut self, dt: f32) {
        self.offset += self.speed * dt;
        for axis in 0..3 {
            if self.loops[axis] {
                self.offset[axis] = wrap_unit(self.offset[axis]);
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct DisplacementChannel {
    pub enabled: bool,
    pub speed: f32,
    /// Unit length, or zero when the configured direction is degenerate.
    pub direction: Vector2<f32>,
    pub effect_scale: f32,
    pub texture_scale: f32,
    pub loops: bool,
    pub offset: Vector2<f32>,
    pub map: GrayImage,
}

impl DisplacementChannel {
    fn new(config: &DisplacementConfig) -> Self {
        let direction = if config.direction.magnitude() < 1e-4 {
            Vector2::new(0.0, 0.0)
        } else {
            config.direction.normalize()
        };
        Self {
            enabled: false,
            speed: config.speed,
            direction,
            effect_scale: config.effect_scale,
            texture_scale: config.texture_scale,
            loops: config.loops,
            offset: Vector2::new(0.0, 0.0),
            map: generate_noise_texture(config.noise_size, config.noise_seed),
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.offset += self.direction * (self.speed * dt);
        if self.loops {
            self.offset.x = wrap_unit(self.offset.x);
            self.offset.y = wrap_unit(self.offset.y);
        }
    }
}

/// Looping playback clock of one entity's animation clips.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipPlayback {
    pub time: f32,
    pub duration: f32,
    pub time_scale: f32,
}

impl ClipPlayback {
    pub fn new(duration: f32) -> Self {
        Self {
            time: 0.0,
            duration,
            time_scale: 1.0,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        if self.duration <= 0.0 {
            return;
        }
        self.time = (self.time + dt * self.time_scale).rem_euclid(self.duration);
    }
}

#[derive(Debug)]
pub struct SurfaceAnimator {
    channels: Vec<TextureAnimationChannel>,
    displacement: DisplacementChannel,
    bound_surface: Option<AssetId>,
}

impl SurfaceAnimator {
    pub fn new(config: &SurfaceConfig) -> Self {
        Self {
            channels: config.channels.iter().map(TextureAnimationChannel::from_def).collect(),
            displacement: DisplacementChannel::new(&config.displacement),
            bound_surface: None,
        }
    }

    pub fn channels(&self) -> &[TextureAnimationChannel] {
        &self.channels
    }

    pub fn displacement(&self) -> &DisplacementChannel {
        &self.displacement
    }

    /// The displacement channel if it is currently being applied.
    pub fn active_displacement(&self) -> Option<&DisplacementChannel> {
        Some(&self.displacement).filter(|d| d.enabled)
    }

    /// Binds every channel to the first texture of `scene` in its slot and
    /// switches the bound textures to repeat wrapping.
    pub fn bind_surface(&mut self, id: &AssetId, scene: &SceneAsset, textures: &mut TextureStore) {
        if self.bound_surface.is_some() {
            log::warn!("Surface channels are already bound, ignoring {}", id);
            return;
        }
        for channel in self.channels.iter_mut() {
            let texture = scene
                .materials
                .iter()
                .find_map(|material| material.texture(channel.slot));
            match texture {
                Some(index) => {
                    let key = TextureKey::Asset {
                        asset: id.clone(),
                        index,
                    };
                    textures.entry(key.clone()).wrap = WrapMode::Repeat;
                    channel.bound = Some(key);
                }
                None => log::debug!("{} has no {:?} texture for channel {}", id, channel.slot, channel.name),
            }
        }
        let sampling = textures.entry(TextureKey::Displacement);
        sampling.wrap = WrapMode::Repeat;
        sampling.repeat = Vector2::new(self.displacement.texture_scale, self.displacement.texture_scale);
        self.bound_surface = Some(id.clone());
    }

    /// Advances every animation by the already clamped `dt`.
    pub fn update(&mut self, dt: Duration, tier: QualityTier, ctx: &mut Context) {
        let dt = dt.as_secs_f32();
        for channel in self.channels.iter_mut().filter(|c| c.is_active()) {
            channel.advance(dt);
            if let Some(key) = &channel.bound {
                let sampling = ctx.textures.entry(key.clone());
                sampling.offset = Vector2::new(channel.offset.x, channel.offset.y);
            }
        }

        let expensive = tier > QualityTier::Performance;
        self.displacement.enabled = expensive && self.bound_surface.is_some();
        if self.displacement.enabled {
            self.displacement.advance(dt);
            ctx.textures.entry(TextureKey::Displacement).offset = self.displacement.offset;
        }
        if expensive {
            ctx.playback.values_mut().for_each(|playback| playback.advance(dt));
        }
    }
}
