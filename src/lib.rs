//! emberblock
//!
//! A small voxel scene renderer with mouse picking and an entity inspector.
//! A tile map is turned into textured blocks, plants and animated fires which
//! can be selected with the mouse and edited from the keyboard.
//!
//! High-level modules
//! - `map`: tile map file parsing and vegetation scattering
//! - `entity` / `world`: scene entities, their update callbacks and the lights
//! - `scene`: tile codes to entities
//! - `fire`: the shared fire frame animation
//! - `pick` / `editor`: GPU picking and the inspector fed by it
//! - `camera`: camera types, controller and uniforms for view/projection
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: meshes, instances, textures
//! - `pipelines`: render pipelines per shader kind plus the pick pipeline
//! - `resources`: asset loading and the handle registry
//! - `render`: per-entity draw batching
//! - `flow`: the event loop
//! - `config`: `config.json` settings
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod editor;
pub mod entity;
pub mod fire;
pub mod flow;
pub mod map;
pub mod pick;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod world;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit::dpi::PhysicalPosition;
