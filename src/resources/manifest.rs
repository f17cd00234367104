//! Declarative description of a diorama's resources.
//!
//! The manifest names every asset slot, where to load it from, where it is
//! placed and which interactive role it plays. [`SceneManifest::pond`] is the
//! night-time pond diorama the crate ships with.

use cgmath::Vector3;

use crate::{
    data_structures::{instance::Instance, material::colour_from_hex},
    resources::{AssetId, AssetKind, pipeline::LoadRequest, texture::EnvironmentResolution},
};

/// Hover and focus settings of an entity that can be highlighted and selected.
#[derive(Clone, Debug, PartialEq)]
pub struct HighlightDef {
    /// Lower is tested first when several entities overlap.
    pub priority: u8,
    pub hover_colour: Vector3<f32>,
    pub camera_offset: Vector3<f32>,
    pub look_at_offset: Vector3<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EntityRole {
    Scenery,
    Highlightable(HighlightDef),
    /// Plays its animation clips faster while pointed at.
    SpeedReactive,
    /// Receives the scrolling texture channels and the displacement map.
    Surface,
    /// Baseline emissive intensity forced to the given value.
    Glowing { intensity: f32 },
    Environment(EnvironmentResolution),
    AmbientTrack,
    SubmergedTrack,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssetDef {
    pub id: AssetId,
    pub kind: AssetKind,
    pub primary: String,
    pub fallback: Option<String>,
    pub placement: Instance,
    pub role: EntityRole,
}

impl AssetDef {
    pub fn visual(id: &str, path: &str, placement: Vector3<f32>, role: EntityRole) -> Self {
        Self {
            id: id.into(),
            kind: AssetKind::Visual,
            primary: path.to_string(),
            fallback: None,
            placement: Instance::from(placement),
            role,
        }
    }

    pub fn environment(id: &str, path: &str, resolution: EnvironmentResolution) -> Self {
        Self {
            id: id.into(),
            kind: AssetKind::Environment,
            primary: path.to_string(),
            fallback: None,
            placement: Instance::new(),
            role: EntityRole::Environment(resolution),
        }
    }

    pub fn audio(id: &str, primary: &str, fallback: &str, role: EntityRole) -> Self {
        Self {
            id: id.into(),
            kind: AssetKind::Audio,
            primary: primary.to_string(),
            fallback: Some(fallback.to_string()),
            placement: Instance::new(),
            role,
        }
    }

    pub fn request(&self) -> LoadRequest {
        LoadRequest {
            id: self.id.clone(),
            kind: self.kind,
            primary: self.primary.clone(),
            fallback: self.fallback.clone(),
        }
    }

    pub fn highlight(&self) -> Option<&HighlightDef> {
        match &self.role {
            EntityRole::Highlightable(def) => Some(def),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneManifest {
    pub assets: Vec<AssetDef>,
}

impl SceneManifest {
    pub fn new(assets: Vec<AssetDef>) -> Self {
        Self { assets }
    }

    pub fn get(&self, id: &AssetId) -> Option<&AssetDef> {
        self.assets.iter().find(|def| &def.id == id)
    }

    pub fn requests(&self) -> Vec<LoadRequest> {
        self.assets.iter().map(AssetDef::request).collect()
    }

    /// Highlightable entities in hit-test priority order.
    pub fn highlightables(&self) -> Vec<(&AssetDef, &HighlightDef)> {
        let mut entities: Vec<_> = self
            .assets
            .iter()
            .filter_map(|def| def.highlight().map(|h| (def, h)))
            .collect();
        entities.sort_by_key(|(_, h)| h.priority);
        entities
    }

    pub fn speed_reactive(&self) -> impl Iterator<Item = &AssetDef> {
        self.assets
            .iter()
            .filter(|def| def.role == EntityRole::SpeedReactive)
    }

    pub fn surface(&self) -> Option<&AssetDef> {
        self.assets.iter().find(|def| def.role == EntityRole::Surface)
    }

    pub fn environment(&self, resolution: EnvironmentResolution) -> Option<&AssetDef> {
        self.assets
            .iter()
            .find(|def| def.role == EntityRole::Environment(resolution))
    }

    pub fn track(&self, role: &EntityRole) -> Option<&AssetDef> {
        self.assets.iter().find(|def| &def.role == role)
    }

    pub fn pond() -> Self {
        let ground = Vector3::new(0.0, -13.0, 0.0);
        Self::new(vec![
            AssetDef::visual(
                "water",
                "models/WATER_REFRACTED.glb",
                ground,
                EntityRole::Surface,
            ),
            AssetDef::visual("walls", "models/WALLS.glb", ground, EntityRole::SpeedReactive),
            AssetDef::visual("asset_1", "models/ASSET_1.glb", ground, EntityRole::Scenery),
            AssetDef::visual(
                "plushie",
                "models/PLUSHIE_DAMAGED.glb",
                Vector3::new(0.0, -13.3, 0.0),
                EntityRole::Highlightable(HighlightDef {
                    priority: 1,
                    hover_colour: colour_from_hex(0xffffff),
                    camera_offset: Vector3::new(25.0, -8.0, 12.0),
                    look_at_offset: Vector3::new(22.0, -10.0, 0.0),
                }),
            ),
            AssetDef::visual("vines1", "models/VINES1.glb", ground, EntityRole::SpeedReactive),
            AssetDef::visual("vines2", "models/VINES2.glb", ground, EntityRole::SpeedReactive),
            AssetDef::visual(
                "lily_frog",
                "models/LILY_FROG.glb",
                Vector3::new(0.0, -12.5, 0.0),
                EntityRole::SpeedReactive,
            ),
            AssetDef::visual("greens1", "models/GREENS1.glb", ground, EntityRole::SpeedReactive),
            AssetDef::visual(
                "god_rays",
                "models/GOD_RAYS.glb",
                Vector3::new(0.0, -10.0, 0.0),
                EntityRole::Glowing { intensity: 1.0 },
            ),
            AssetDef::visual(
                "adult_frogana",
                "models/ADULT_FROGANA.glb",
                ground,
                EntityRole::Highlightable(HighlightDef {
                    priority: 0,
                    hover_colour: colour_from_hex(0x00ff00),
                    camera_offset: Vector3::new(-25.0, -7.0, 20.0),
                    look_at_offset: Vector3::new(-35.0, -5.0, 0.0),
                }),
            ),
            AssetDef::visual(
                "moon",
                "models/MOON.glb",
                ground,
                EntityRole::Glowing { intensity: 30.0 },
            ),
            AssetDef::environment(
                "night_sky_1k",
                "hdri/rogland_clear_night_1k.hdr",
                EnvironmentResolution::Low,
            ),
            AssetDef::environment(
                "night_sky_4k",
                "hdri/rogland_clear_night_4k.hdr",
                EnvironmentResolution::High,
            ),
            AssetDef::audio(
                "pond_ambience",
                "audio/NewPondAmbience.mp3",
                "audio/NewPondAmbience.wav",
                EntityRole::AmbientTrack,
            ),
            AssetDef::audio(
                "underwater",
                "audio/UNDERWATER_S.mp3",
                "audio/UNDERWATER_S.wav",
                EntityRole::SubmergedTrack,
            ),
        ])
    }
}
