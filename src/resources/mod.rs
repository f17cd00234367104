use std::{fmt, future::Future, pin::Pin};

use crate::{
    data_structures::scene_graph::SceneAsset,
    resources::{
        audio::{AudioClip, decode_audio},
        gltf_scene::load_scene_gltf,
        texture::{EnvironmentMap, decode_environment, load_binary},
    },
};

/**
 * This module contains everything about getting resources from external files into
 * asset slots: the loader seam, the concurrent load pipeline and the manifest of the diorama.
 */
pub mod audio;
pub mod gltf_scene;
pub mod manifest;
pub mod pipeline;
pub mod slot;
pub mod texture;

/// Name of a resource, unique within a diorama.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(String);

impl AssetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Visual,
    Environment,
    Audio,
}

/// A successfully loaded resource.
#[derive(Clone, Debug)]
pub enum Asset {
    Visual(SceneAsset),
    Environment(EnvironmentMap),
    Audio(AudioClip),
}

impl Asset {
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Visual(_) => AssetKind::Visual,
            Asset::Environment(_) => AssetKind::Environment,
            Asset::Audio(_) => AssetKind::Audio,
        }
    }

    pub fn as_scene(&self) -> Option<&SceneAsset> {
        match self {
            Asset::Visual(scene) => Some(scene),
            _ => None,
        }
    }

    pub fn as_scene_mut(&mut self) -> Option<&mut SceneAsset> {
        match self {
            Asset::Visual(scene) => Some(scene),
            _ => None,
        }
    }

    pub fn as_environment(&self) -> Option<&EnvironmentMap> {
        match self {
            Asset::Environment(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioClip> {
        match self {
            Asset::Audio(clip) => Some(clip),
            _ => None,
        }
    }
}

pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<Asset>> + 'a>>;

/// Black-box source of assets. Each call resolves independently of all others.
pub trait AssetLoader {
    fn load<'a>(&'a self, path: &'a str, kind: AssetKind) -> LoadFuture<'a>;
}

/// Loads assets from `./assets` (native) or the page's `/assets` (wasm).
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl AssetLoader for FileLoader {
    fn load<'a>(&'a self, path: &'a str, kind: AssetKind) -> LoadFuture<'a> {
        Box::pin(async move {
            let asset = match kind {
                AssetKind::Visual => Asset::Visual(load_scene_gltf(path).await?),
                AssetKind::Environment => {
                    Asset::Environment(decode_environment(&load_binary(path).await?)?)
                }
                AssetKind::Audio => Asset::Audio(decode_audio(path, load_binary(path).await?)?),
            };
            log::debug!("Loaded {:?} asset {}", kind, path);
            Ok(asset)
        })
    }
}
