//! Loading sprite families from disk.
//!
//! A sprite family is a directory holding a `sprite.json` metadata
//! record next to its image maps: a required `color.<image>` atlas and
//! optional `normal.<image>`/`bump.<image>` siblings. Missing required
//! files fail the load immediately; missing optional maps are replaced
//! with flat neutral buffers so the shading path never special-cases
//! their absence.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::data_structures::sheet::{SheetMetadata, SpriteSheet};
use crate::error::Error;

const MAP_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Load a sprite family from its directory.
pub fn load_sheet(dir: impl AsRef<Path>) -> Result<SpriteSheet, Error> {
    let dir = dir.as_ref();

    let metadata_path = dir.join("sprite.json");
    let metadata_text =
        fs::read_to_string(&metadata_path).map_err(|_| Error::ResourceNotFound {
            path: metadata_path.clone(),
        })?;
    let metadata: SheetMetadata =
        serde_json::from_str(&metadata_text).map_err(|e| Error::InvalidResource {
            path: metadata_path.clone(),
            reason: e.to_string(),
        })?;

    let color_path = find_map(dir, "color").ok_or_else(|| Error::ResourceNotFound {
        path: dir.join("color.png"),
    })?;
    let color = decode_rgba(&color_path)?;

    let normal = match find_map(dir, "normal") {
        Some(path) => Some(decode_rgba(&path)?),
        None => {
            log::debug!("{}: no normal map, using the neutral one", dir.display());
            None
        }
    };
    let bump = match find_map(dir, "bump") {
        Some(path) => Some(decode_rgba(&path)?),
        None => {
            log::debug!("{}: no bump map, using the neutral one", dir.display());
            None
        }
    };

    SpriteSheet::from_metadata(metadata, color, normal, bump)
}

fn find_map(dir: &Path, stem: &str) -> Option<PathBuf> {
    MAP_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|path| path.is_file())
}

fn decode_rgba(path: &Path) -> Result<RgbaImage, Error> {
    let img = image::open(path).map_err(|e| Error::InvalidResource {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(img.to_rgba8())
}
