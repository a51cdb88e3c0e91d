//! Reference app: a handful of animated actors on different layers,
//! one point light, arrow-key movement.
//!
//! Expects a sprite family at `assets/sprites/bimon_selmont` (a
//! `sprite.json` with `default`, `walking`, `die` and `climb_up`
//! animations next to its `color.png`).

use std::sync::Arc;

use anyhow::Context;
use lumen2d::display::Display;
use lumen2d::resources::load_sheet;
use lumen2d::{Actor, Game, KeyCode, PointLight, Stage, Vector3, app};

const SPRITE_DIR: &str = "assets/sprites/bimon_selmont";

#[derive(Default)]
struct Demo {
    player: usize,
    heading: f32,
    quit: bool,
}

impl Game for Demo {
    fn on_ready(&mut self, display: &mut Display, stage: &mut Stage) -> anyhow::Result<()> {
        display.set_clear_color(0.3, 0.3, 0.3);

        let sheet = Arc::new(
            load_sheet(SPRITE_DIR).with_context(|| format!("loading {}", SPRITE_DIR))?,
        );

        stage.add(Actor::new(sheet.clone()).at(25.0, 25.0).on_layer(1));

        let mut walker = Actor::new(sheet.clone()).at(120.0, 25.0).on_layer(1);
        walker.set_animation("walking")?;
        self.player = stage.add(walker);

        let mut dying = Actor::new(sheet.clone()).at(50.0, 50.0).on_layer(2);
        dying.set_animation("die")?;
        stage.add(dying);

        let mut climber = Actor::new(sheet).at(250.0, 250.0).on_layer(2);
        climber.set_animation("climb_up")?;
        stage.add(climber);

        stage.add_light(PointLight::new(Vector3::new(400.0, 300.0, 60.0)).with_power(80.0));

        Ok(())
    }

    fn on_key(&mut self, _stage: &mut Stage, key: KeyCode, pressed: bool) {
        match key {
            KeyCode::Escape => self.quit = true,
            KeyCode::ArrowLeft => self.heading = if pressed { -60.0 } else { 0.0 },
            KeyCode::ArrowRight => self.heading = if pressed { 60.0 } else { 0.0 },
            _ => {}
        }
    }

    fn on_update(&mut self, stage: &mut Stage, dt: f32) {
        if self.heading != 0.0 {
            let player = &mut stage.actors_mut()[self.player];
            let position = player.position();
            player.set_position(position.x + self.heading * dt, position.y);
        }
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }
}

fn main() -> anyhow::Result<()> {
    app::run(Demo::default())
}
