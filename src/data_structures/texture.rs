//! Texture sampling state.
//!
//! The renderer owns texel data; the core only owns the part of a texture that
//! animates: its UV offset, repeat and wrap mode. Entries are keyed by the
//! asset that owns the texture, or by the shared displacement map.

use std::collections::HashMap;

use cgmath::Vector2;

use crate::resources::AssetId;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureKey {
    Asset { asset: AssetId, index: usize },
    Displacement,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureSampling {
    pub offset: Vector2<f32>,
    pub repeat: Vector2<f32>,
    pub wrap: WrapMode,
}

impl Default for TextureSampling {
    fn default() -> Self {
        Self {
            offset: Vector2::new(0.0, 0.0),
            repeat: Vector2::new(1.0, 1.0),
            wrap: WrapMode::ClampToEdge,
        }
    }
}

#[derive(Debug, Default)]
pub struct TextureStore {
    entries: HashMap<TextureKey, TextureSampling>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sampling state, creating a default one on first use.
    pub fn entry(&mut self, key: TextureKey) -> &mut TextureSampling {
        self.entries.entry(key).or_default()
    }

    pub fn get(&self, key: &TextureKey) -> Option<&TextureSampling> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TextureKey, &TextureSampling)> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
