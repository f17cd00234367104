//! glTF/GLB parsing into a [`SceneAsset`].
//!
//! Only what the orchestration core needs is extracted: the node hierarchy
//! with local transforms, per-mesh bounds, emissive material parameters with
//! their texture slots, and animation clip lengths.

use cgmath::Vector3;

use crate::{
    data_structures::{
        instance::Instance,
        material::{EmissiveParams, MaterialDesc, TextureSlot},
        scene_graph::{Aabb, ClipDesc, NodeIndex, SceneAsset, SceneGraph},
    },
    resources::texture::load_binary,
};

pub async fn load_scene_gltf(file_name: &str) -> anyhow::Result<SceneAsset> {
    let bytes = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&bytes)?;

    // Load buffers
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                if let Some(blob) = gltf.blob.as_deref() {
                    buffer_data.push(blob.to_vec());
                };
            }
            gltf::buffer::Source::Uri(uri) => {
                let bin = load_binary(uri).await?;
                buffer_data.push(bin);
            }
        }
    }

    Ok(to_scene_asset(&gltf, &buffer_data))
}

pub fn to_scene_asset(gltf: &gltf::Gltf, buffers: &[Vec<u8>]) -> SceneAsset {
    let materials = gltf.materials().map(to_material_desc).collect();
    let clips = gltf
        .animations()
        .map(|animation| ClipDesc {
            name: animation.name().unwrap_or("Default").to_string(),
            duration: clip_duration(&animation, buffers),
        })
        .collect();

    let mut graph = SceneGraph::new();
    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                add_node(&mut graph, None, node);
            }
        }
        None => log::warn!("glTF document has no scene, the asset will not be hit-testable"),
    }
    graph.update_world_transforms(&Instance::new());

    SceneAsset {
        graph,
        materials,
        clips,
    }
}

fn add_node(graph: &mut SceneGraph, parent: Option<NodeIndex>, node: gltf::scene::Node) {
    let (translation, rotation, scale) = node.transform().decomposed();
    let local = Instance {
        position: translation.into(),
        rotation: rotation.into(),
        scale: scale.into(),
    };
    let (bounds, materials) = match node.mesh() {
        Some(mesh) => {
            let bounds = mesh
                .primitives()
                .map(|primitive| {
                    let bb = primitive.bounding_box();
                    Aabb::new(Vector3::from(bb.min), Vector3::from(bb.max))
                })
                .reduce(|a, b| a.union(&b));
            let mut materials: Vec<usize> = mesh
                .primitives()
                .filter_map(|primitive| primitive.material().index())
                .collect();
            materials.dedup();
            (bounds, materials)
        }
        None => (None, Vec::new()),
    };
    let idx = graph.add_node(
        parent,
        node.name().map(str::to_string),
        local,
        bounds,
        materials,
    );
    for child in node.children() {
        add_node(graph, Some(idx), child);
    }
}

fn to_material_desc(material: gltf::Material) -> MaterialDesc {
    let pbr = material.pbr_metallic_roughness();
    let mut textures = Vec::new();
    if let Some(info) = pbr.base_color_texture() {
        textures.push((TextureSlot::Color, info.texture().index()));
    }
    // glTF packs metalness and roughness into one texture
    if let Some(info) = pbr.metallic_roughness_texture() {
        textures.push((TextureSlot::Metallic, info.texture().index()));
        textures.push((TextureSlot::Roughness, info.texture().index()));
    }
    if let Some(normal) = material.normal_texture() {
        textures.push((TextureSlot::Normal, normal.texture().index()));
    }
    if let Some(info) = material.emissive_texture() {
        textures.push((TextureSlot::Emission, info.texture().index()));
    }
    MaterialDesc {
        name: material.name().map(str::to_string),
        emissive: EmissiveParams::new(Vector3::from(material.emissive_factor()), 1.0),
        textures,
    }
}

fn clip_duration(animation: &gltf::Animation, buffers: &[Vec<u8>]) -> f32 {
    animation
        .channels()
        .filter_map(|channel| {
            let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
            match reader.read_inputs() {
                Some(times) => times.fold(None, |max: Option<f32>, t| {
                    Some(max.map_or(t, |m| m.max(t)))
                }),
                None => {
                    log::warn!("No timestamps found in channel {}", channel.index());
                    None
                }
            }
        })
        .fold(0.0, f32::max)
}
