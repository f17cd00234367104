//! flow-diorama
//!
//! Orchestration core of an interactive 3D diorama that runs natively and in
//! the browser. The crate decides what is loaded, what the camera looks at,
//! which quality tier is active and how surfaces and audio evolve over time;
//! drawing pixels and producing sound are delegated to a [`render::RenderBackend`]
//! and an [`audio::AudioBackend`] supplied by the embedder.
//!
//! High-level modules
//! - `atmosphere`: distance fog that follows the camera above and below water
//! - `audio`: adaptive two-track mixer on top of an audio backend
//! - `camera`: waypoint navigation, focus overrides and pointer parallax
//! - `context`: configuration and the shared per-session state
//! - `data_structures`: transforms, scene graphs, materials and texture sampling
//! - `error`: load and runtime error types
//! - `flow`: the per-frame driver tying every subsystem together
//! - `input`: translation of window events into diorama input
//! - `pick`: ray casting, hover highlights and click-to-focus
//! - `quality`: quality tiers and their render settings
//! - `render`: the render backend interface and per-frame view
//! - `resources`: asset slots, manifests and the loading pipeline
//! - `startup`: the progressive quality ramp after loading
//! - `surface`: procedural texture scrolling, displacement and clip playback
//!

pub mod atmosphere;
pub mod audio;
pub mod camera;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod input;
pub mod pick;
pub mod quality;
pub mod render;
pub mod resources;
pub mod startup;
pub mod surface;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use flow::Diorama;
pub use winit::dpi::PhysicalPosition;
pub use winit::event::WindowEvent;
