//! Pointer hit-testing and hover highlighting.
//!
//! Picking is done on the CPU: a ray from the camera through the pointer is
//! intersected with the node-local bounds of every candidate entity's mesh
//! nodes and only the nearest hit counts. The hit is then attributed to the
//! interactive groups by an ownership test against each entity's scene graph:
//!
//! - highlightable entities (tested in priority order) become the hover target
//!   unless their own focus override is open
//! - speed-reactive entities become the speed target and play their clips
//!   faster until the pointer leaves them
//!
//! A pointer press re-tests only the highlightable entities and opens the
//! focus override of the one that was hit.

use cgmath::Vector3;

use crate::{
    camera::{CameraNavigator, FocusOverride},
    context::Context,
    data_structures::{
        instance::Instance,
        material::EmissiveParams,
        scene_graph::{Aabb, NodeIndex},
    },
    resources::AssetId,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vector3<f32>,
    pub direction: Vector3<f32>,
}

impl Ray {
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }
}

/// Slab test of a ray against an axis-aligned box. Returns the distance along
/// the ray (in units of `ray_direction`) of the first intersection in front of
/// the origin.
pub fn ray_aabb_hit_t(
    ray_origin: Vector3<f32>,
    ray_direction: Vector3<f32>,
    min: Vector3<f32>,
    max: Vector3<f32>,
) -> Option<f32> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    for axis in 0..3 {
        let (o, d) = (ray_origin[axis], ray_direction[axis]);
        if d.abs() < f32::EPSILON {
            // parallel to this slab
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (mut t0, mut t1) = ((min[axis] - o) * inv, (max[axis] - o) * inv);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }
    if t_max < 0.0 {
        return None;
    }
    Some(if t_min >= 0.0 { t_min } else { t_max })
}

/// Intersects `ray` (world space) with `bounds` given in the space of a node
/// whose world transform is `world`.
pub fn ray_hits_node(ray: &Ray, world: &Instance, bounds: &Aabb) -> Option<f32> {
    let inv = world.inverse_matrix()?;
    let origin = inv * ray.origin.extend(1.0);
    let direction = inv * ray.direction.extend(0.0);
    // an affine map keeps the ray parameter, so t is valid in world space too
    ray_aabb_hit_t(origin.truncate(), direction.truncate(), bounds.min, bounds.max)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub entity: AssetId,
    pub node: NodeIndex,
    pub distance: f32,
}

/// Nearest intersection among the mesh nodes of `candidates`.
pub fn nearest_hit<'a>(
    ray: &Ray,
    ctx: &Context,
    candidates: impl IntoIterator<Item = &'a AssetId>,
) -> Option<Hit> {
    let mut best: Option<Hit> = None;
    for entity in candidates {
        let Some(scene) = ctx.scene(entity) else {
            continue;
        };
        for (node, scene_node) in scene.graph.mesh_nodes() {
            let Some(bounds) = &scene_node.bounds else {
                continue;
            };
            if let Some(distance) = ray_hits_node(ray, &scene_node.world, bounds) {
                if best.as_ref().is_none_or(|b| distance < b.distance) {
                    best = Some(Hit {
                        entity: entity.clone(),
                        node,
                        distance,
                    });
                }
            }
        }
    }
    best
}

#[derive(Clone, Debug, PartialEq)]
pub struct HighlightConfig {
    pub hovered_intensity: f32,
    pub lerp_factor: f32,
    /// Distance to the baseline intensity below which a fading highlight snaps back.
    pub snap_epsilon: f32,
    pub speed_multiplier: f32,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            hovered_intensity: 0.3,
            lerp_factor: 0.1,
            snap_epsilon: 0.01,
            speed_multiplier: 2.5,
        }
    }
}

#[derive(Debug, Default)]
pub struct HitTester {
    config: HighlightConfig,
    hover: Option<AssetId>,
    speed_target: Option<AssetId>,
}

impl HitTester {
    pub fn new(config: HighlightConfig) -> Self {
        Self {
            config,
            hover: None,
            speed_target: None,
        }
    }

    pub fn hover(&self) -> Option<&AssetId> {
        self.hover.as_ref()
    }

    pub fn speed_target(&self) -> Option<&AssetId> {
        self.speed_target.as_ref()
    }

    fn owner_among<'a>(
        ctx: &Context,
        hit: &Hit,
        group: impl IntoIterator<Item = &'a AssetId>,
    ) -> Option<AssetId> {
        group
            .into_iter()
            .find(|id| {
                *id == &hit.entity
                    && ctx.scene(id).is_some_and(|scene| scene.graph.contains(hit.node))
            })
            .cloned()
    }

    fn highlight_candidates(ctx: &Context, navigator: &CameraNavigator) -> Vec<AssetId> {
        ctx.manifest
            .highlightables()
            .into_iter()
            .map(|(def, _)| def.id.clone())
            .filter(|id| !navigator.is_override_open(id))
            .collect()
    }

    /// Re-evaluates the hover and speed targets for the pointer ray.
    pub fn on_pointer_move(&mut self, ray: &Ray, ctx: &mut Context, navigator: &CameraNavigator) {
        let highlightable = Self::highlight_candidates(ctx, navigator);
        let speed_reactive: Vec<AssetId> =
            ctx.manifest.speed_reactive().map(|def| def.id.clone()).collect();

        let hit = nearest_hit(ray, ctx, highlightable.iter().chain(speed_reactive.iter()));
        let (hover, speed) = match &hit {
            Some(hit) => (
                Self::owner_among(ctx, hit, &highlightable),
                Self::owner_among(ctx, hit, &speed_reactive),
            ),
            None => (None, None),
        };

        if hover != self.hover {
            log::debug!("Hover {:?} -> {:?}", self.hover, hover);
            self.hover = hover;
        }
        if speed != self.speed_target {
            if let Some(prev) = &self.speed_target {
                ctx.set_time_scale(prev, 1.0);
            }
            if let Some(next) = &speed {
                ctx.set_time_scale(next, self.config.speed_multiplier);
            }
            self.speed_target = speed;
        }
    }

    /// Opens the focus override of the highlightable entity under the pointer.
    pub fn on_pointer_down(
        &mut self,
        ray: &Ray,
        ctx: &Context,
        navigator: &mut CameraNavigator,
    ) -> Option<AssetId> {
        let highlightable = Self::highlight_candidates(ctx, navigator);
        let hit = nearest_hit(ray, ctx, &highlightable)?;
        let entity = Self::owner_among(ctx, &hit, &highlightable)?;
        let def = ctx.manifest.get(&entity).and_then(|def| def.highlight())?;
        navigator.select(FocusOverride {
            entity: entity.clone(),
            camera_offset: def.camera_offset,
            look_at_offset: def.look_at_offset,
        });
        if self.hover.as_ref() == Some(&entity) {
            self.hover = None;
        }
        log::info!("Focused {}", entity);
        Some(entity)
    }

    /// Moves each highlightable entity's emissive parameters toward the hover
    /// preset or back toward the captured baseline.
    pub fn converge_highlights(&self, ctx: &mut Context, navigator: &CameraNavigator) {
        let entities: Vec<(AssetId, Vector3<f32>)> = ctx
            .manifest
            .highlightables()
            .into_iter()
            .map(|(def, h)| (def.id.clone(), h.hover_colour))
            .collect();
        for (entity, hover_colour) in entities {
            let hovered =
                self.hover.as_ref() == Some(&entity) && !navigator.is_override_open(&entity);
            let hovered_params = EmissiveParams::new(hover_colour, self.config.hovered_intensity);
            for material in ctx.materials.materials_of_mut(&entity) {
                let baseline = *material.baseline();
                if hovered {
                    material.current = material.current.lerp(&hovered_params, self.config.lerp_factor);
                } else if material.current != baseline {
                    let next = material.current.lerp(&baseline, self.config.lerp_factor);
                    material.current = if (next.intensity - baseline.intensity).abs()
                        < self.config.snap_epsilon
                    {
                        baseline
                    } else {
                        next
                    };
                }
            }
        }
    }
}
