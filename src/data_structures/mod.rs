//! Engine data structures: sheets, actors, lights, and textures.
//!
//! - `sheet` is the immutable per-family resource model (atlas grid,
//!   animation table, pixel payloads)
//! - `actor` is a positioned, layered, animated instance of a sheet
//! - `light` holds point lights and their GPU record
//! - `texture` wraps GPU texture creation and the neutral placeholders

pub mod actor;
pub mod light;
pub mod sheet;
pub mod texture;
