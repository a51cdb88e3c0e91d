//! The application event loop.
//!
//! A [`Game`] implementation supplies the gameplay hooks; [`run`] owns
//! the winit event loop, the [`Display`](crate::display::Display), the
//! sprite pipeline, and the [`Stage`](crate::stage::Stage), and drives
//! the frame cycle: measure the wall-clock delta, advance the stage
//! (lights, then actors), let the game react, then render. Frame pacing
//! is left entirely to the surface's present mode.
//!
//! All fallible setup happens before the first frame; a failed display,
//! pipeline, or resource load aborts startup with its diagnostic.

use std::sync::Arc;

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::Window,
};

pub use winit::keyboard::KeyCode;

use crate::display::Display;
use crate::pipelines::sprite::SpritePipeline;
use crate::stage::Stage;

/// Gameplay hooks called by the engine loop.
pub trait Game {
    /// Called once after the display is up: load sheets, populate the
    /// stage, configure the display. An error aborts startup.
    fn on_ready(&mut self, display: &mut Display, stage: &mut Stage) -> anyhow::Result<()>;

    /// Called for every non-repeat key press and release.
    fn on_key(&mut self, stage: &mut Stage, key: KeyCode, pressed: bool) {
        let _ = (stage, key, pressed);
    }

    /// Called every frame after the stage's own update pass.
    fn on_update(&mut self, stage: &mut Stage, dt: f32) {
        let _ = (stage, dt);
    }

    /// Polled every frame; returning true ends the loop.
    fn quit_requested(&self) -> bool {
        false
    }
}

struct EngineState {
    display: Display,
    pipeline: SpritePipeline,
    stage: Stage,
}

struct App<G: Game> {
    game: G,
    state: Option<EngineState>,
    last_time: Instant,
}

impl<G: Game> ApplicationHandler for App<G> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let window_attributes = Window::default_attributes().with_title("lumen2d");
        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());

        let display = pollster::block_on(Display::new(window));
        let mut display = match display {
            Ok(display) => display,
            Err(e) => panic!("App initialization failed. Cannot create the display: {}", e),
        };
        let pipeline = match SpritePipeline::new(&display.device, &display.config) {
            Ok(pipeline) => pipeline,
            Err(e) => panic!("App initialization failed. Cannot build the sprite pipeline: {}", e),
        };

        let mut stage = Stage::new();
        if let Err(e) = self.game.on_ready(&mut display, &mut stage) {
            panic!("App initialization failed: {}", e);
        }

        self.state = Some(EngineState {
            display,
            pipeline,
            stage,
        });
        self.last_time = Instant::now();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.display.resize(size.width, size.height),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.game
                    .on_key(&mut state.stage, code, key_state.is_pressed());
                if self.game.quit_requested() {
                    event_loop.exit();
                }
            }
            WindowEvent::RedrawRequested => {
                state.display.window().request_redraw();

                let dt = self.last_time.elapsed().as_secs_f32();
                self.last_time = Instant::now();

                // updates finish for the whole scene before any draw
                state.stage.update(dt);
                self.game.on_update(&mut state.stage, dt);
                if self.game.quit_requested() {
                    event_loop.exit();
                    return;
                }

                match state.stage.render(&state.display, &mut state.pipeline) {
                    Ok(()) => {}
                    Err(e) => match e.downcast_ref::<crate::display::SurfaceAcquireError>() {
                        // Reconfigure the surface if it's lost or outdated
                        Some(
                            crate::display::SurfaceAcquireError::Lost
                            | crate::display::SurfaceAcquireError::Outdated,
                        ) => {
                            let size = state.display.window().inner_size();
                            state.display.resize(size.width, size.height);
                        }
                        _ => log::error!("Unable to render {}", e),
                    },
                }
            }
            _ => {}
        }
    }
}

/// Run the engine loop until the window closes or the game requests to
/// quit.
pub fn run<G: Game>(game: G) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }

    let event_loop = EventLoop::new()?;
    let mut app = App {
        game,
        state: None,
        last_time: Instant::now(),
    };
    event_loop.run_app(&mut app)?;

    Ok(())
}
