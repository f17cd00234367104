//! Scene graph of a loaded visual asset.
//!
//! Nodes live in a flat arena and reference each other by [`NodeIndex`]. Each
//! node keeps its local transform, its world transform (relative to the
//! owning entity's placement) and, for mesh nodes, the axis-aligned bounds of
//! its geometry in node-local space. The bounds are what the pointer
//! hit-tester intersects against.

use cgmath::Vector3;
use log::warn;

use crate::data_structures::{instance::Instance, material::MaterialDesc};

pub type NodeIndex = usize;

/// Axis-aligned bounding box in the space of the node that owns it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: Vector3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Vector3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: Option<String>,
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
    pub local: Instance,
    pub world: Instance,
    /// Present for nodes that carry a mesh.
    pub bounds: Option<Aabb>,
    /// Indices into the asset's material list.
    pub materials: Vec<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    roots: Vec<NodeIndex>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(
        &mut self,
        parent: Option<NodeIndex>,
        name: Option<String>,
        local: Instance,
        bounds: Option<Aabb>,
        materials: Vec<usize>,
    ) -> NodeIndex {
        let idx = self.nodes.len();
        let parent = match parent {
            Some(p) if p < idx => Some(p),
            Some(p) => {
                warn!("Parent node {} does not exist, attaching {} as root", p, idx);
                None
            }
            None => None,
        };
        self.nodes.push(SceneNode {
            name,
            parent,
            children: Vec::new(),
            world: local.clone(),
            local,
            bounds,
            materials,
        });
        match parent {
            Some(p) => self.nodes[p].children.push(idx),
            None => self.roots.push(idx),
        }
        idx
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&SceneNode> {
        self.nodes.get(idx)
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Recomputes every world transform as `placement * ... * parent * local`.
    pub fn update_world_transforms(&mut self, placement: &Instance) {
        let roots = self.roots.clone();
        for root in roots {
            self.update_subtree(root, placement);
        }
    }

    fn update_subtree(&mut self, idx: NodeIndex, parent: &Instance) {
        let world = parent * &self.nodes[idx].local;
        let children = self.nodes[idx].children.clone();
        self.nodes[idx].world = world.clone();
        for child in children {
            self.update_subtree(child, &world);
        }
    }

    /// Ownership test: is `node` the node `ancestor` or one of its descendants.
    pub fn is_part_of(&self, node: NodeIndex, ancestor: NodeIndex) -> bool {
        let mut current = Some(node);
        while let Some(idx) = current {
            if idx == ancestor {
                return true;
            }
            current = self.nodes.get(idx).and_then(|n| n.parent);
        }
        false
    }

    /// True if `node` belongs to any root subtree of this graph.
    pub fn contains(&self, node: NodeIndex) -> bool {
        self.roots.iter().any(|root| self.is_part_of(node, *root))
    }

    pub fn mesh_nodes(&self) -> impl Iterator<Item = (NodeIndex, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.bounds.is_some())
    }
}

/// A clip's name and loop length in seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipDesc {
    pub name: String,
    pub duration: f32,
}

/// Handle of a loaded visual asset.
#[derive(Clone, Debug, Default)]
pub struct SceneAsset {
    pub graph: SceneGraph,
    pub materials: Vec<MaterialDesc>,
    pub clips: Vec<ClipDesc>,
}
