//! Quality tiers and their application to the render backend.
//!
//! # User-facing types
//!
//! - [`QualityTier`] is the discrete cost/quality level
//! - [`TierConfig`] is the static bundle of settings derived from a tier
//! - [`QualityController`] resolves a tier against the currently loaded
//!   environment maps and pushes the result to a [`RenderBackend`]
//!
//! Resolution happens on every call because environment maps load
//! asynchronously, possibly after the first application. The controller
//! remembers what it pushed last and only forwards differences, which makes
//! repeated application of the same tier a no-op for the backend.

use cgmath::Vector3;

use crate::{
    context::Context,
    render::{BackgroundSource, PostPass, RenderBackend},
    resources::{AssetId, texture::EnvironmentResolution},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QualityTier {
    Performance,
    Medium,
    Max,
}

impl QualityTier {
    pub fn level(&self) -> u8 {
        match self {
            QualityTier::Performance => 0,
            QualityTier::Medium => 1,
            QualityTier::Max => 2,
        }
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(QualityTier::Performance),
            1 => Some(QualityTier::Medium),
            2 => Some(QualityTier::Max),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloomParams {
    pub strength: f32,
    pub radius: f32,
    pub threshold: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReflectionParams {
    pub opacity: f32,
    pub thickness: f32,
    pub max_distance: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PixelRatioPolicy {
    Fixed(f32),
    Device,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TierConfig {
    pub pixel_ratio: PixelRatioPolicy,
    pub anti_aliasing: bool,
    pub reflections: Option<ReflectionParams>,
    pub bloom: Option<BloomParams>,
    pub shadows: bool,
    /// Tried in order; the first loaded map wins.
    pub environment_preference: Vec<EnvironmentResolution>,
}

const BLOOM: BloomParams = BloomParams {
    strength: 0.1,
    radius: 0.3,
    threshold: 0.5,
};

const REFLECTIONS: ReflectionParams = ReflectionParams {
    opacity: 0.3,
    thickness: 0.01,
    max_distance: 30.0,
};

impl TierConfig {
    pub fn for_tier(tier: QualityTier) -> Self {
        use EnvironmentResolution::*;
        match tier {
            QualityTier::Performance => TierConfig {
                pixel_ratio: PixelRatioPolicy::Fixed(1.0),
                anti_aliasing: true,
                reflections: None,
                bloom: None,
                shadows: false,
                environment_preference: vec![Low, High],
            },
            QualityTier::Medium => TierConfig {
                pixel_ratio: PixelRatioPolicy::Fixed(1.0),
                anti_aliasing: true,
                reflections: None,
                bloom: Some(BLOOM),
                shadows: true,
                environment_preference: vec![Low, High],
            },
            QualityTier::Max => TierConfig {
                pixel_ratio: PixelRatioPolicy::Device,
                anti_aliasing: true,
                reflections: Some(REFLECTIONS),
                bloom: Some(BLOOM),
                shadows: true,
                environment_preference: vec![High, Low],
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BackgroundChoice {
    Environment(AssetId),
    Solid(Vector3<f32>),
}

/// Concrete backend state for one tier under the current asset availability.
#[derive(Clone, Debug, PartialEq)]
pub struct BackendSettings {
    pub pixel_ratio: f32,
    pub anti_aliasing: bool,
    pub reflections: Option<ReflectionParams>,
    pub bloom: Option<BloomParams>,
    pub shadows: bool,
    pub background: BackgroundChoice,
}

impl BackendSettings {
    pub fn resolve(tier: QualityTier, ctx: &Context) -> Self {
        let config = TierConfig::for_tier(tier);
        let pixel_ratio = match config.pixel_ratio {
            PixelRatioPolicy::Fixed(ratio) => ratio,
            PixelRatioPolicy::Device => ctx.viewport.device_pixel_ratio,
        };
        let background = config
            .environment_preference
            .iter()
            .filter_map(|resolution| ctx.manifest.environment(*resolution))
            .find(|def| ctx.assets.handle(&def.id).is_some())
            .map(|def| BackgroundChoice::Environment(def.id.clone()))
            .unwrap_or(BackgroundChoice::Solid(ctx.config.solid_background));
        BackendSettings {
            pixel_ratio,
            anti_aliasing: config.anti_aliasing,
            reflections: config.reflections,
            bloom: config.bloom,
            shadows: config.shadows,
            background,
        }
    }
}

#[derive(Debug, Default)]
pub struct QualityController {
    applied: Option<BackendSettings>,
}

impl QualityController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&self) -> Option<&BackendSettings> {
        self.applied.as_ref()
    }

    /// Pushes `tier` to `backend`. Returns `true` if any backend call was made.
    pub fn apply_tier<R: RenderBackend + ?Sized>(
        &mut self,
        tier: QualityTier,
        ctx: &Context,
        backend: &mut R,
    ) -> bool {
        let next = BackendSettings::resolve(tier, ctx);
        let prev = self.applied.take();
        let mut changed = false;
        let differs = |f: &dyn Fn(&BackendSettings) -> bool| prev.as_ref().is_none_or(|p| f(p));

        if differs(&|p| p.pixel_ratio != next.pixel_ratio) {
            backend.set_pixel_ratio(next.pixel_ratio);
            changed = true;
        }
        if differs(&|p| p.anti_aliasing != next.anti_aliasing) {
            backend.set_pass_enabled(PostPass::AntiAliasing, next.anti_aliasing);
            changed = true;
        }
        if differs(&|p| p.reflections != next.reflections) {
            if let Some(params) = next.reflections {
                backend.configure_reflections(params);
            }
            if differs(&|p| p.reflections.is_some() != next.reflections.is_some()) {
                backend.set_pass_enabled(PostPass::Reflections, next.reflections.is_some());
            }
            changed = true;
        }
        if differs(&|p| p.bloom != next.bloom) {
            if let Some(params) = next.bloom {
                backend.configure_bloom(params);
            }
            if differs(&|p| p.bloom.is_some() != next.bloom.is_some()) {
                backend.set_pass_enabled(PostPass::Bloom, next.bloom.is_some());
            }
            changed = true;
        }
        if differs(&|p| p.shadows != next.shadows) {
            backend.set_light_shadows(next.shadows);
            backend.set_shadow_map(next.shadows);
            changed = true;
        }
        if differs(&|p| p.background != next.background) {
            match &next.background {
                BackgroundChoice::Environment(id) => {
                    match ctx.assets.handle(id).and_then(|asset| asset.as_environment()) {
                        Some(map) => {
                            backend.set_background(BackgroundSource::Environment(map));
                            backend.set_environment(Some(map));
                        }
                        None => log::error!("Environment map {} vanished while applying tier", id),
                    }
                }
                BackgroundChoice::Solid(colour) => {
                    backend.set_background(BackgroundSource::Solid(*colour));
                    backend.set_environment(None);
                }
            }
            changed = true;
        }

        if changed {
            log::info!("Applied quality tier {:?}: {:?}", tier, next);
        }
        self.applied = Some(next);
        changed
    }
}
