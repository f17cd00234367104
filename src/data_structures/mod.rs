//! Core data models: transforms, scene graphs of loaded assets, and the
//! material/texture stores the per-frame subsystems write into.

pub mod instance;
pub mod material;
pub mod scene_graph;
pub mod texture;
