//! Actors: positioned, animated sprite instances.
//!
//! An [`Actor`] is one on-screen entity: a shared reference to its
//! [`SpriteSheet`], a world position, a draw-order layer, and the
//! playback state of its current animation. Actors own no GPU resources;
//! geometry and shaders live in the sprite pipeline, textures on the
//! sheet.
//!
//! Playback is a two-state machine. While playing, `update` accumulates
//! elapsed time and derives the frame index from it; when the derived
//! entry is the hold sentinel, the actor freezes on the last drawable
//! frame and ignores further updates until `set_animation` restarts it.

use std::sync::Arc;

use cgmath::Vector2;

use crate::data_structures::sheet::{DEFAULT_ANIMATION, FrameRef, SpriteSheet};
use crate::error::Error;
use crate::pipelines::sprite::{SpriteDraw, SpritePipeline};

/// Seconds each animation frame stays on screen unless overridden.
pub const DEFAULT_FRAME_SECS: f32 = 0.15;

#[derive(Debug)]
pub struct Actor {
    sheet: Arc<SpriteSheet>,
    position: Vector2<f32>,
    layer: i32,
    animation: String,
    elapsed: f32,
    frame: usize,
    playing: bool,
    frame_secs: f32,
}

impl Actor {
    /// Create an actor at the origin on layer 0, playing the sheet's
    /// `default` animation from frame 0.
    pub fn new(sheet: Arc<SpriteSheet>) -> Self {
        Self {
            sheet,
            position: Vector2::new(0.0, 0.0),
            layer: 0,
            animation: DEFAULT_ANIMATION.to_string(),
            elapsed: 0.0,
            frame: 0,
            playing: true,
            frame_secs: DEFAULT_FRAME_SECS,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Vector2::new(x, y);
        self
    }

    pub fn on_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_frame_secs(mut self, frame_secs: f32) -> Self {
        self.frame_secs = frame_secs;
        self
    }

    pub fn sheet(&self) -> &Arc<SpriteSheet> {
        &self.sheet
    }

    pub fn position(&self) -> Vector2<f32> {
        self.position
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = Vector2::new(x, y);
    }

    pub fn layer(&self) -> i32 {
        self.layer
    }

    pub fn set_layer(&mut self, layer: i32) {
        self.layer = layer;
    }

    pub fn animation(&self) -> &str {
        &self.animation
    }

    /// Names of the animations available on this actor's sheet.
    pub fn animations(&self) -> impl Iterator<Item = &str> {
        self.sheet.animation_names()
    }

    pub fn frame_index(&self) -> usize {
        self.frame
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Switch to the named animation, restarting playback at frame 0.
    ///
    /// Validation happens here rather than at draw time: an unknown
    /// name or a sequence without a drawable frame is refused and the
    /// current animation keeps running.
    pub fn set_animation(&mut self, name: &str) -> Result<(), Error> {
        let frames = self.sheet.animation(name)?;
        if !frames.iter().any(|f| !f.is_hold()) {
            return Err(Error::MalformedAnimation {
                name: name.to_string(),
                reason: "no drawable frame".to_string(),
            });
        }
        self.animation = name.to_string();
        self.frame = 0;
        self.elapsed = 0.0;
        self.playing = true;
        Ok(())
    }

    /// Advance playback by `dt` seconds.
    ///
    /// The frame index is derived, not incremented: large deltas land on
    /// the same frame a series of small ones would. Once the hold
    /// sentinel is reached this is a no-op until the next
    /// `set_animation`.
    pub fn update(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        self.elapsed += dt;
        let len = self.current_frames().len();
        if len == 0 {
            return;
        }
        self.frame = (self.elapsed / self.frame_secs) as usize % len;
        if self.current_frames()[self.frame].is_hold() {
            self.playing = false;
            self.frame = len - 2;
        }
    }

    /// Atlas cell of the frame currently on screen.
    pub fn frame_coord(&self) -> Result<(u32, u32), Error> {
        let frames = self.sheet.animation(&self.animation)?;
        match frames.get(self.frame) {
            Some(FrameRef::Coord { x, y }) => Ok((*x, *y)),
            _ => Err(Error::MalformedAnimation {
                name: self.animation.clone(),
                reason: "current frame is not drawable".to_string(),
            }),
        }
    }

    /// Draw this actor through the sprite pipeline.
    pub fn draw(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        pipeline: &SpritePipeline,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        slot: u32,
    ) -> Result<(), Error> {
        let frame = self.frame_coord()?;
        pipeline.draw(
            render_pass,
            device,
            queue,
            &self.sheet,
            SpriteDraw {
                position: self.position,
                layer: self.layer,
                frame,
            },
            slot,
        );
        Ok(())
    }

    fn current_frames(&self) -> &[FrameRef] {
        self.sheet.animation(&self.animation).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use image::RgbaImage;

    use super::*;

    fn coord(x: u32, y: u32) -> FrameRef {
        FrameRef::Coord { x, y }
    }

    fn test_sheet() -> Arc<SpriteSheet> {
        let mut animations = HashMap::new();
        animations.insert("walking".to_string(), vec![coord(1, 0), coord(2, 0)]);
        animations.insert(
            "die".to_string(),
            vec![coord(1, 0), coord(1, 2), coord(2, 2), FrameRef::Hold],
        );
        animations.insert(
            "whip".to_string(),
            vec![coord(0, 3), coord(1, 3), coord(2, 3)],
        );
        Arc::new(
            SpriteSheet::new(
                (32, 32),
                (4, 10),
                animations,
                RgbaImage::new(128, 320),
                None,
                None,
            )
            .unwrap(),
        )
    }

    #[test]
    fn starts_on_default_animation_at_frame_zero() {
        let actor = Actor::new(test_sheet());
        assert_eq!(actor.animation(), "default");
        assert_eq!(actor.frame_index(), 0);
        assert!(actor.is_playing());
        assert_eq!(actor.frame_coord().unwrap(), (0, 0));
    }

    #[test]
    fn walking_steps_through_frames_and_wraps() {
        let mut actor = Actor::new(test_sheet());
        actor.set_animation("walking").unwrap();

        actor.update(0.0);
        assert_eq!(actor.frame_index(), 0);
        actor.update(0.15);
        assert_eq!(actor.frame_index(), 1);
        actor.update(0.15);
        assert_eq!(actor.frame_index(), 0);
        assert_eq!(actor.frame_coord().unwrap(), (1, 0));
    }

    #[test]
    fn three_frame_sequence_cycles_in_bounds() {
        let mut actor = Actor::new(test_sheet());
        actor.set_animation("whip").unwrap();

        let mut seen = Vec::new();
        for _ in 0..10 {
            actor.update(0.15);
            seen.push(actor.frame_index());
        }
        assert!(seen.iter().all(|&f| f < 3));
        assert_eq!(&seen[..6], &[1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn hold_sentinel_freezes_on_last_drawable_frame() {
        let mut actor = Actor::new(test_sheet());
        actor.set_animation("die").unwrap();

        actor.update(0.15);
        assert_eq!(actor.frame_index(), 1);
        actor.update(0.15);
        assert_eq!(actor.frame_index(), 2);
        // the sentinel slot: pin to the frame before it and stop
        actor.update(0.15);
        assert_eq!(actor.frame_index(), 2);
        assert!(!actor.is_playing());

        // held: any further delta is ignored
        for _ in 0..5 {
            actor.update(10.0);
            assert_eq!(actor.frame_index(), 2);
            assert!(!actor.is_playing());
        }
        assert_eq!(actor.frame_coord().unwrap(), (2, 2));
    }

    #[test]
    fn one_large_delta_also_lands_on_the_hold() {
        let mut actor = Actor::new(test_sheet());
        actor.set_animation("die").unwrap();

        actor.update(0.46);
        assert_eq!(actor.frame_index(), 2);
        assert!(!actor.is_playing());
    }

    #[test]
    fn set_animation_restarts_playback_from_held() {
        let mut actor = Actor::new(test_sheet());
        actor.set_animation("die").unwrap();
        actor.update(1.0);
        assert!(!actor.is_playing());

        actor.set_animation("walking").unwrap();
        assert!(actor.is_playing());
        assert_eq!(actor.frame_index(), 0);
        assert_eq!(actor.animation(), "walking");

        actor.update(0.15);
        assert_eq!(actor.frame_index(), 1);
    }

    #[test]
    fn unknown_animation_leaves_state_untouched() {
        let mut actor = Actor::new(test_sheet());
        actor.set_animation("walking").unwrap();
        actor.update(0.15);

        let err = actor.set_animation("moonwalk").unwrap_err();
        assert!(matches!(err, Error::UnknownAnimation { .. }));
        assert_eq!(actor.animation(), "walking");
        assert_eq!(actor.frame_index(), 1);
    }

    #[test]
    fn custom_frame_secs_changes_cadence() {
        let mut actor = Actor::new(test_sheet()).with_frame_secs(0.5);
        actor.set_animation("walking").unwrap();

        actor.update(0.15);
        assert_eq!(actor.frame_index(), 0);
        actor.update(0.4);
        assert_eq!(actor.frame_index(), 1);
    }
}
