//! Engine data structures: models, textures and instances.
//!
//! - `model` contains mesh definitions and the GPU resources of loaded models
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds entity transforms and their per-instance GPU layout

pub mod instance;
pub mod model;
pub mod texture;
