//! The stage: scene composition and frame rendering.
//!
//! A [`Stage`] owns the drawable actors and the point lights for a
//! scene. Each frame runs two strictly separated passes: `update`
//! advances every light and then every actor, and `render` draws the
//! actors back-to-front by layer through the sprite pipeline.
//!
//! The draw order is computed as a stable sort over indices while the
//! storage keeps insertion order, so actors on equal layers render in
//! the order they were added — on every frame, no matter how layers
//! change later.

use std::iter;

use crate::data_structures::actor::Actor;
use crate::data_structures::light::PointLight;
use crate::display::Display;
use crate::pipelines::sprite::SpritePipeline;

#[derive(Debug, Default)]
pub struct Stage {
    actors: Vec<Actor>,
    lights: Vec<PointLight>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a drawable actor; returns its stage index.
    pub fn add(&mut self, actor: Actor) -> usize {
        self.actors.push(actor);
        self.actors.len() - 1
    }

    pub fn add_light(&mut self, light: PointLight) {
        self.lights.push(light);
    }

    /// Drop every actor the predicate rejects.
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&Actor) -> bool,
    {
        self.actors.retain(f);
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actors_mut(&mut self) -> &mut [Actor] {
        &mut self.actors
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    pub fn lights_mut(&mut self) -> &mut [PointLight] {
        &mut self.lights
    }

    /// Advance the scene by `dt` seconds: all lights first, then all
    /// actors. Both passes complete before any draw call of the frame.
    pub fn update(&mut self, dt: f32) {
        for light in &mut self.lights {
            light.update(dt);
        }
        for actor in &mut self.actors {
            actor.update(dt);
        }
    }

    /// Indices of the actors in draw order: ascending layer, equal
    /// layers in insertion order.
    pub(crate) fn draw_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.actors.len()).collect();
        order.sort_by_key(|&index| self.actors[index].layer());
        order
    }

    /// Render one frame: fetch projection and view from the display,
    /// upload the frame-shared state, and issue one draw per actor in
    /// layer order.
    pub fn render(&self, display: &Display, pipeline: &mut SpritePipeline) -> anyhow::Result<()> {
        if !display.is_configured() {
            return Ok(());
        }

        let projection = display.projection()?;
        let view = display.view();
        let order = self.draw_order();
        pipeline.prepare_frame(
            &display.device,
            &display.queue,
            projection,
            view,
            &self.lights,
            order.len(),
        );

        let output = display.acquire_frame()?;
        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = display
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(display.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &display.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            pipeline.attach(&mut render_pass);
            for (slot, &index) in order.iter().enumerate() {
                self.actors[index].draw(
                    &mut render_pass,
                    pipeline,
                    &display.device,
                    &display.queue,
                    slot as u32,
                )?;
            }
        }

        display.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use image::RgbaImage;

    use crate::data_structures::sheet::{FrameRef, SpriteSheet};

    use super::*;

    fn test_sheet() -> Arc<SpriteSheet> {
        let mut animations = HashMap::new();
        animations.insert(
            "walking".to_string(),
            vec![FrameRef::Coord { x: 1, y: 0 }, FrameRef::Coord { x: 2, y: 0 }],
        );
        Arc::new(
            SpriteSheet::new(
                (16, 16),
                (4, 4),
                animations,
                RgbaImage::new(64, 64),
                None,
                None,
            )
            .unwrap(),
        )
    }

    #[test]
    fn draw_order_sorts_by_layer_ascending() {
        let sheet = test_sheet();
        let mut stage = Stage::new();
        stage.add(Actor::new(sheet.clone()).on_layer(5));
        stage.add(Actor::new(sheet.clone()).on_layer(1));
        stage.add(Actor::new(sheet.clone()).on_layer(3));

        assert_eq!(stage.draw_order(), vec![1, 2, 0]);
    }

    #[test]
    fn equal_layers_keep_insertion_order_across_frames() {
        let sheet = test_sheet();
        let mut stage = Stage::new();
        stage.add(Actor::new(sheet.clone()).on_layer(2));
        stage.add(Actor::new(sheet.clone()).on_layer(1));
        stage.add(Actor::new(sheet.clone()).on_layer(2));
        stage.add(Actor::new(sheet.clone()).on_layer(1));

        let first = stage.draw_order();
        assert_eq!(first, vec![1, 3, 0, 2]);
        // a second frame with no membership change repeats the order
        assert_eq!(stage.draw_order(), first);
    }

    #[test]
    fn layer_change_reorders_but_ties_stay_deterministic() {
        let sheet = test_sheet();
        let mut stage = Stage::new();
        stage.add(Actor::new(sheet.clone()).on_layer(2));
        stage.add(Actor::new(sheet.clone()).on_layer(1));
        assert_eq!(stage.draw_order(), vec![1, 0]);

        stage.actors_mut()[0].set_layer(1);
        assert_eq!(stage.draw_order(), vec![0, 1]);
    }

    #[test]
    fn update_advances_every_actor() {
        let sheet = test_sheet();
        let mut stage = Stage::new();
        for _ in 0..3 {
            let mut actor = Actor::new(sheet.clone());
            actor.set_animation("walking").unwrap();
            stage.add(actor);
        }
        stage.add_light(PointLight::default());

        stage.update(0.15);
        for actor in stage.actors() {
            assert_eq!(actor.frame_index(), 1);
        }
    }

    #[test]
    fn retain_removes_actors() {
        let sheet = test_sheet();
        let mut stage = Stage::new();
        stage.add(Actor::new(sheet.clone()).on_layer(0));
        stage.add(Actor::new(sheet.clone()).on_layer(7));
        stage.retain(|actor| actor.layer() < 5);
        assert_eq!(stage.actors().len(), 1);
        assert_eq!(stage.actors()[0].layer(), 0);
    }
}
