use std::collections::HashMap;

use cgmath::Vector3;
use instant::Duration;

use crate::{
    atmosphere::FogConfig,
    audio::AudioConfig,
    camera::CameraConfig,
    data_structures::{
        instance::Instance,
        material::{MaterialStore, colour_from_hex},
        scene_graph::SceneAsset,
        texture::TextureStore,
    },
    error::DioramaError,
    pick::HighlightConfig,
    quality::QualityTier,
    resources::{
        Asset, AssetId,
        manifest::{EntityRole, SceneManifest},
        slot::AssetRegistry,
    },
    surface::{ClipPlayback, SurfaceConfig},
};

/// Every tunable of a diorama session. `Default` is the pond diorama.
#[derive(Clone, Debug)]
pub struct DioramaConfig {
    /// Per attempt; a fallback attempt gets the same budget.
    pub load_timeout: Duration,
    /// Frame deltas are clamped to this before any animation uses them.
    pub max_frame_delta: Duration,
    /// How long the startup ramp renders at the cheapest tier.
    pub settle_dwell: Duration,
    /// Tier applied while assets are still loading.
    pub initial_tier: QualityTier,
    pub solid_background: Vector3<f32>,
    pub camera: CameraConfig,
    pub highlight: HighlightConfig,
    pub surface: SurfaceConfig,
    pub audio: AudioConfig,
    pub fog: FogConfig,
}

impl Default for DioramaConfig {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_secs(10),
            max_frame_delta: Duration::from_millis(100),
            settle_dwell: Duration::from_millis(1500),
            initial_tier: QualityTier::Medium,
            solid_background: colour_from_hex(0x1a1a1a),
            camera: CameraConfig::default(),
            highlight: HighlightConfig::default(),
            surface: SurfaceConfig::default(),
            audio: AudioConfig::default(),
            fog: FogConfig::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn aspect(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            device_pixel_ratio: 1.0,
        }
    }
}

/// State shared by all subsystems of one session.
///
/// The frame driver owns it exclusively during a tick; load completions get
/// exclusive access between ticks and only touch their own slot and the
/// records derived from it.
#[derive(Debug)]
pub struct Context {
    pub config: DioramaConfig,
    pub manifest: SceneManifest,
    pub assets: AssetRegistry<Asset>,
    pub placements: HashMap<AssetId, Instance>,
    pub materials: MaterialStore,
    pub textures: TextureStore,
    pub playback: HashMap<AssetId, ClipPlayback>,
    pub tier: QualityTier,
    pub viewport: Viewport,
}

impl Context {
    pub fn new(config: DioramaConfig, manifest: SceneManifest) -> Self {
        let mut assets = AssetRegistry::new();
        let mut placements = HashMap::new();
        for def in &manifest.assets {
            assets.register_slot(def.id.clone(), def.kind);
            placements.insert(def.id.clone(), def.placement.clone());
        }
        let tier = config.initial_tier;
        Self {
            config,
            manifest,
            assets,
            placements,
            materials: MaterialStore::new(),
            textures: TextureStore::new(),
            playback: HashMap::new(),
            tier,
            viewport: Viewport::default(),
        }
    }

    pub fn scene(&self, id: &AssetId) -> Option<&SceneAsset> {
        self.assets.handle(id).and_then(Asset::as_scene)
    }

    /// Origin of a loaded entity in world space.
    pub fn entity_world_position(&self, id: &AssetId) -> Option<Vector3<f32>> {
        self.scene(id)?;
        self.placements.get(id).map(|placement| placement.position)
    }

    /// Registers the per-entity records derived from a freshly loaded visual
    /// asset: world transforms, baseline materials and clip playback.
    pub(crate) fn index_scene(&mut self, id: &AssetId) {
        let placement = self.placements.get(id).cloned().unwrap_or_default();
        let intensity = match self.manifest.get(id).map(|def| &def.role) {
            Some(EntityRole::Glowing { intensity }) => Some(*intensity),
            _ => None,
        };
        let Some(scene) = self
            .assets
            .get_mut(id)
            .and_then(|slot| slot.handle.as_mut())
            .and_then(Asset::as_scene_mut)
        else {
            return;
        };
        scene.graph.update_world_transforms(&placement);
        self.materials.capture(id, &scene.materials, intensity);
        let duration = scene.clips.iter().map(|clip| clip.duration).fold(0.0, f32::max);
        if duration > 0.0 {
            self.playback.insert(id.clone(), ClipPlayback::new(duration));
        }
    }

    /// Moves an entity. Focus overrides anchored to it follow from the next frame on.
    pub fn set_placement(&mut self, id: &AssetId, placement: Instance) -> Result<(), DioramaError> {
        let Some(slot) = self.placements.get_mut(id) else {
            return Err(DioramaError::UnknownAsset(id.clone()));
        };
        *slot = placement.clone();
        if let Some(scene) = self
            .assets
            .get_mut(id)
            .and_then(|slot| slot.handle.as_mut())
            .and_then(Asset::as_scene_mut)
        {
            scene.graph.update_world_transforms(&placement);
        }
        Ok(())
    }

    pub fn set_time_scale(&mut self, id: &AssetId, scale: f32) {
        if let Some(playback) = self.playback.get_mut(id) {
            playback.time_scale = scale;
        }
    }
}
