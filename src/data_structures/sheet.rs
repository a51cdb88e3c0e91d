//! Sprite sheets: the immutable per-family resource model.
//!
//! A [`SpriteSheet`] bundles everything one sprite family needs to
//! animate and texture itself: the pixel size of a single frame, the
//! atlas grid packing the frames, the named animation table, and the
//! decoded color/normal/bump payloads. Sheets are loaded once per
//! resource path and shared between actors through an `Arc`; the GPU
//! textures are realized lazily on first draw and memoized.

use std::collections::HashMap;
use std::sync::OnceLock;

use image::RgbaImage;
use serde::Deserialize;

use crate::data_structures::texture::{neutral_bump_map, neutral_normal_map};
use crate::error::Error;
use crate::pipelines::sprite::SheetBinding;

/// The animation every sheet is guaranteed to define.
pub const DEFAULT_ANIMATION: &str = "default";

/// One entry of an animation sequence: either an atlas cell to draw, or
/// the hold sentinel meaning "freeze on the previous frame and stop".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameRef {
    Coord { x: u32, y: u32 },
    Hold,
}

impl FrameRef {
    pub fn is_hold(&self) -> bool {
        matches!(self, FrameRef::Hold)
    }
}

/// On-disk metadata record of a sprite family (`sprite.json`).
///
/// Animation sequences are ordered lists of `[col, row]` atlas cells; a
/// `null` entry is the terminal hold sentinel.
#[derive(Debug, Deserialize)]
pub struct SheetMetadata {
    pub frame: FrameMetadata,
    #[serde(default)]
    pub animations: HashMap<String, Vec<Option<[u32; 2]>>>,
}

#[derive(Debug, Deserialize)]
pub struct FrameMetadata {
    pub size: FrameSize,
    pub count: FrameCount,
}

#[derive(Debug, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Deserialize)]
pub struct FrameCount {
    pub x: u32,
    pub y: u32,
}

/// Immutable sprite-family resource shared by all of its actors.
pub struct SpriteSheet {
    frame_size: (u32, u32),
    frame_grid: (u32, u32),
    animations: HashMap<String, Vec<FrameRef>>,
    color: RgbaImage,
    normal: RgbaImage,
    bump: RgbaImage,
    pub(crate) gpu: OnceLock<SheetBinding>,
}

impl SpriteSheet {
    /// Build a sheet from decoded payloads and an animation table.
    ///
    /// Missing normal/bump maps are substituted with flat neutral
    /// buffers matching the color map's dimensions. A `default`
    /// animation is injected as `[(0,0)]` when the table omits one.
    /// Every sequence is validated eagerly: at least one drawable
    /// frame, hold sentinel only in the final slot, all cells inside
    /// the frame grid.
    pub fn new(
        frame_size: (u32, u32),
        frame_grid: (u32, u32),
        mut animations: HashMap<String, Vec<FrameRef>>,
        color: RgbaImage,
        normal: Option<RgbaImage>,
        bump: Option<RgbaImage>,
    ) -> Result<Self, Error> {
        animations
            .entry(DEFAULT_ANIMATION.to_string())
            .or_insert_with(|| vec![FrameRef::Coord { x: 0, y: 0 }]);

        for (name, frames) in &animations {
            validate_sequence(name, frames, frame_grid)?;
        }

        let (width, height) = color.dimensions();
        let normal = normal.unwrap_or_else(|| neutral_normal_map(width, height));
        let bump = bump.unwrap_or_else(|| neutral_bump_map(width, height));

        Ok(Self {
            frame_size,
            frame_grid,
            animations,
            color,
            normal,
            bump,
            gpu: OnceLock::new(),
        })
    }

    /// Build a sheet from a parsed metadata record.
    pub fn from_metadata(
        metadata: SheetMetadata,
        color: RgbaImage,
        normal: Option<RgbaImage>,
        bump: Option<RgbaImage>,
    ) -> Result<Self, Error> {
        let animations = metadata
            .animations
            .into_iter()
            .map(|(name, frames)| {
                let frames = frames
                    .into_iter()
                    .map(|frame| match frame {
                        Some([x, y]) => FrameRef::Coord { x, y },
                        None => FrameRef::Hold,
                    })
                    .collect();
                (name, frames)
            })
            .collect();
        Self::new(
            (metadata.frame.size.width, metadata.frame.size.height),
            (metadata.frame.count.x, metadata.frame.count.y),
            animations,
            color,
            normal,
            bump,
        )
    }

    /// Pixel size of a single animation frame.
    pub fn frame_size(&self) -> (u32, u32) {
        self.frame_size
    }

    /// Number of frame columns and rows packed into the atlas.
    pub fn frame_grid(&self) -> (u32, u32) {
        self.frame_grid
    }

    /// Look up the frame sequence of a named animation.
    pub fn animation(&self, name: &str) -> Result<&[FrameRef], Error> {
        self.animations
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownAnimation {
                name: name.to_string(),
            })
    }

    /// Names of all animations this sheet defines.
    pub fn animation_names(&self) -> impl Iterator<Item = &str> {
        self.animations.keys().map(String::as_str)
    }

    pub fn color_map(&self) -> &RgbaImage {
        &self.color
    }

    pub fn normal_map(&self) -> &RgbaImage {
        &self.normal
    }

    pub fn bump_map(&self) -> &RgbaImage {
        &self.bump
    }
}

impl std::fmt::Debug for SpriteSheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpriteSheet")
            .field("frame_size", &self.frame_size)
            .field("frame_grid", &self.frame_grid)
            .field("animations", &self.animations.keys())
            .finish()
    }
}

fn validate_sequence(name: &str, frames: &[FrameRef], grid: (u32, u32)) -> Result<(), Error> {
    let malformed = |reason: &str| Error::MalformedAnimation {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if !frames.iter().any(|f| !f.is_hold()) {
        return Err(malformed("no drawable frame"));
    }
    if let Some(position) = frames.iter().position(FrameRef::is_hold) {
        if position != frames.len() - 1 {
            return Err(malformed("hold sentinel must be the final entry"));
        }
    }
    for frame in frames {
        if let FrameRef::Coord { x, y } = frame {
            if *x >= grid.0 || *y >= grid.1 {
                return Err(malformed("frame coordinate outside the atlas grid"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(x: u32, y: u32) -> FrameRef {
        FrameRef::Coord { x, y }
    }

    fn sheet_with(animations: HashMap<String, Vec<FrameRef>>) -> Result<SpriteSheet, Error> {
        SpriteSheet::new(
            (32, 32),
            (4, 10),
            animations,
            RgbaImage::new(128, 320),
            None,
            None,
        )
    }

    #[test]
    fn injects_default_animation_when_missing() {
        let sheet = sheet_with(HashMap::new()).unwrap();
        assert_eq!(sheet.animation(DEFAULT_ANIMATION).unwrap(), &[coord(0, 0)]);
    }

    #[test]
    fn unknown_animation_is_an_error() {
        let sheet = sheet_with(HashMap::new()).unwrap();
        assert!(matches!(
            sheet.animation("moonwalk"),
            Err(Error::UnknownAnimation { .. })
        ));
    }

    #[test]
    fn rejects_hold_only_sequence() {
        let mut animations = HashMap::new();
        animations.insert("bad".to_string(), vec![FrameRef::Hold]);
        assert!(matches!(
            sheet_with(animations),
            Err(Error::MalformedAnimation { .. })
        ));
    }

    #[test]
    fn rejects_hold_before_final_slot() {
        let mut animations = HashMap::new();
        animations.insert(
            "bad".to_string(),
            vec![coord(0, 0), FrameRef::Hold, coord(1, 0)],
        );
        assert!(matches!(
            sheet_with(animations),
            Err(Error::MalformedAnimation { .. })
        ));
    }

    #[test]
    fn rejects_frame_outside_grid() {
        let mut animations = HashMap::new();
        animations.insert("bad".to_string(), vec![coord(4, 0)]);
        assert!(matches!(
            sheet_with(animations),
            Err(Error::MalformedAnimation { .. })
        ));
    }

    #[test]
    fn trailing_hold_is_accepted() {
        let mut animations = HashMap::new();
        animations.insert("die".to_string(), vec![coord(1, 2), FrameRef::Hold]);
        let sheet = sheet_with(animations).unwrap();
        assert_eq!(
            sheet.animation("die").unwrap(),
            &[coord(1, 2), FrameRef::Hold]
        );
    }

    #[test]
    fn substitutes_neutral_maps_with_color_dimensions() {
        let sheet = sheet_with(HashMap::new()).unwrap();
        assert_eq!(sheet.normal_map().dimensions(), (128, 320));
        assert_eq!(sheet.bump_map().dimensions(), (128, 320));
        assert_eq!(sheet.normal_map().get_pixel(0, 0).0, [127, 127, 255, 255]);
    }

    #[test]
    fn metadata_record_parses_coords_and_sentinels() {
        let json = r#"{
            "frame": {
                "size": { "width": 32, "height": 64 },
                "count": { "x": 4, "y": 10 }
            },
            "animations": {
                "walking": [[1, 0], [2, 0]],
                "duck": [[1, 2], null]
            }
        }"#;
        let metadata: SheetMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.frame.size.width, 32);
        assert_eq!(metadata.frame.size.height, 64);
        assert_eq!(metadata.frame.count.x, 4);

        let sheet =
            SpriteSheet::from_metadata(metadata, RgbaImage::new(128, 640), None, None).unwrap();
        assert_eq!(sheet.frame_size(), (32, 64));
        assert_eq!(sheet.frame_grid(), (4, 10));
        assert_eq!(
            sheet.animation("walking").unwrap(),
            &[coord(1, 0), coord(2, 0)]
        );
        assert_eq!(
            sheet.animation("duck").unwrap(),
            &[coord(1, 2), FrameRef::Hold]
        );
        // the injected fallback
        assert_eq!(sheet.animation("default").unwrap(), &[coord(0, 0)]);
    }
}
