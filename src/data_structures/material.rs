//! Emissive material state shared between the highlight step and the renderer.
//!
//! Baselines are captured once when an entity's asset finishes loading and
//! are never touched afterwards. The highlight step only writes `current`.

use std::collections::HashMap;

use cgmath::{Vector3, VectorSpace};

use crate::resources::AssetId;

/// Converts `0xRRGGBB` into an rgb vector in `[0, 1]`.
pub fn colour_from_hex(hex: u32) -> Vector3<f32> {
    Vector3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmissiveParams {
    pub colour: Vector3<f32>,
    pub intensity: f32,
}

impl EmissiveParams {
    pub fn new(colour: Vector3<f32>, intensity: f32) -> Self {
        Self { colour, intensity }
    }

    pub fn lerp(&self, target: &EmissiveParams, factor: f32) -> EmissiveParams {
        EmissiveParams {
            colour: self.colour.lerp(target.colour, factor),
            intensity: self.intensity + (target.intensity - self.intensity) * factor,
        }
    }
}

impl Default for EmissiveParams {
    fn default() -> Self {
        Self {
            colour: Vector3::new(0.0, 0.0, 0.0),
            intensity: 1.0,
        }
    }
}

/// Texture slots of a PBR material that procedural channels can bind to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Color,
    Metallic,
    Roughness,
    Normal,
    Emission,
}

/// A material as parsed from a visual asset.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialDesc {
    pub name: Option<String>,
    pub emissive: EmissiveParams,
    /// Slot to texture index (within the asset).
    pub textures: Vec<(TextureSlot, usize)>,
}

impl MaterialDesc {
    pub fn texture(&self, slot: TextureSlot) -> Option<usize> {
        self.textures
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, idx)| *idx)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    pub entity: AssetId,
    pub index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialState {
    baseline: EmissiveParams,
    pub current: EmissiveParams,
}

impl MaterialState {
    pub fn baseline(&self) -> &EmissiveParams {
        &self.baseline
    }
}

#[derive(Debug, Default)]
pub struct MaterialStore {
    entries: HashMap<MaterialKey, MaterialState>,
    order: HashMap<AssetId, Vec<MaterialKey>>,
}

impl MaterialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the at-rest emissive parameters of every material of `entity`.
    /// A second capture for the same entity is ignored.
    pub fn capture(
        &mut self,
        entity: &AssetId,
        materials: &[MaterialDesc],
        intensity_override: Option<f32>,
    ) {
        if self.order.contains_key(entity) {
            log::warn!("Materials of {} were already captured", entity);
            return;
        }
        let keys = materials
            .iter()
            .enumerate()
            .map(|(index, desc)| {
                let mut baseline = desc.emissive;
                if let Some(intensity) = intensity_override {
                    baseline.intensity = intensity;
                }
                let key = MaterialKey {
                    entity: entity.clone(),
                    index,
                };
                self.entries.insert(
                    key.clone(),
                    MaterialState {
                        baseline,
                        current: baseline,
                    },
                );
                key
            })
            .collect();
        self.order.insert(entity.clone(), keys);
    }

    pub fn get(&self, key: &MaterialKey) -> Option<&MaterialState> {
        self.entries.get(key)
    }

    pub fn materials_of(&self, entity: &AssetId) -> impl Iterator<Item = &MaterialState> {
        self.order
            .get(entity)
            .into_iter()
            .flatten()
            .filter_map(|key| self.entries.get(key))
    }

    pub fn materials_of_mut(
        &mut self,
        entity: &AssetId,
    ) -> impl Iterator<Item = &mut MaterialState> {
        let keys = self.order.get(entity);
        self.entries
            .iter_mut()
            .filter(move |(key, _)| keys.is_some_and(|keys| keys.contains(*key)))
            .map(|(_, state)| state)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}
