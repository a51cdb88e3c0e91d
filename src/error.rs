//! Engine error taxonomy.
//!
//! Everything here is an unrecoverable-in-place condition: resource and
//! shader failures abort startup, and the per-frame paths never retry.
//! All fallible work is front-loaded into loading and pipeline
//! construction, so a running frame loop is not expected to see these.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A required metadata or texture file is missing from a sprite
    /// family directory.
    #[error("resource not found: {path}")]
    ResourceNotFound { path: PathBuf },

    /// A metadata or texture file exists but could not be parsed or
    /// decoded.
    #[error("invalid resource {path}: {reason}")]
    InvalidResource { path: PathBuf, reason: String },

    /// An animation name was requested that the sheet does not define.
    #[error("unknown animation: {name}")]
    UnknownAnimation { name: String },

    /// An animation sequence violates the sheet contract: no drawable
    /// frame, or a hold sentinel somewhere other than the final slot.
    #[error("malformed animation: {name}: {reason}")]
    MalformedAnimation { name: String, reason: String },

    /// Shader compilation or pipeline linking failed. Fatal at pipeline
    /// construction; the diagnostic is the validation message verbatim.
    #[error("shader compilation failed: {0}")]
    ShaderCompile(String),

    /// A projection was requested over a degenerate viewport.
    #[error("invalid viewport: {width}x{height}")]
    InvalidViewport { width: f32, height: f32 },
}
