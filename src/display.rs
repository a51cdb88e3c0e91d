//! The display service: window surface, GPU handles, and the viewport
//! transforms.
//!
//! `Display` owns everything tied to the window: the wgpu surface,
//! device and queue, the surface configuration, the depth texture, and
//! the clear color. It also answers for the current viewport's
//! orthographic projection and the scroll-offset view matrix, which the
//! stage fetches every frame before drawing.

use std::sync::Arc;

use cgmath::Matrix4;
use winit::window::Window;

use crate::data_structures::texture::Texture;
use crate::error::Error;
use crate::transform;

pub struct Display {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub clear_colour: wgpu::Color,
    configured: bool,
    scroll: (f32, f32),
}

impl Display {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("wgpu setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        log::info!("surface");
        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders assume an sRGB surface; fall back to whatever the
        // adapter offers first otherwise.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let configured = size.width > 0 && size.height > 0;
        if configured {
            surface.configure(&device, &config);
        }

        let depth_texture =
            Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            clear_colour: wgpu::Color {
                r: 0.3,
                g: 0.3,
                b: 0.3,
                a: 1.0,
            },
            configured,
            scroll: (0.0, 0.0),
        })
    }

    /// Reconfigure the surface for a new window size. Zero-sized
    /// windows (minimized) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.configured = true;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture =
                Texture::create_depth_texture(&self.device, [width, height], "depth_texture");
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub(crate) fn is_configured(&self) -> bool {
        self.configured
    }

    pub(crate) fn window(&self) -> &Window {
        &self.window
    }

    /// Orthographic projection over the current viewport.
    pub fn projection(&self) -> Result<Matrix4<f32>, Error> {
        transform::projection(
            0.0,
            self.config.width as f32,
            0.0,
            self.config.height as f32,
        )
    }

    /// View matrix: the scroll offset applied at layer 1.
    pub fn view(&self) -> Matrix4<f32> {
        transform::model_matrix(1.0, 1.0, self.scroll.0, self.scroll.1, 1.0)
    }

    pub fn set_scroll(&mut self, x: f32, y: f32) {
        self.scroll = (x, y);
    }

    pub fn set_clear_color(&mut self, r: f64, g: f64, b: f64) {
        self.clear_colour = wgpu::Color { r, g, b, a: 1.0 };
    }

    pub(crate) fn acquire_frame(&self) -> Result<wgpu::SurfaceTexture, SurfaceAcquireError> {
        match self.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(texture) => Ok(texture),
            wgpu::CurrentSurfaceTexture::Suboptimal(texture) => Ok(texture),
            wgpu::CurrentSurfaceTexture::Timeout => Err(SurfaceAcquireError::Timeout),
            wgpu::CurrentSurfaceTexture::Occluded => Err(SurfaceAcquireError::Occluded),
            wgpu::CurrentSurfaceTexture::Outdated => Err(SurfaceAcquireError::Outdated),
            wgpu::CurrentSurfaceTexture::Lost => Err(SurfaceAcquireError::Lost),
            wgpu::CurrentSurfaceTexture::Validation => Err(SurfaceAcquireError::Validation),
        }
    }
}

/// Mirrors the frame-acquisition outcomes the render loop needs to
/// distinguish, since `wgpu::Surface::get_current_texture` no longer
/// returns a `Result<_, wgpu::SurfaceError>`.
#[derive(Debug, thiserror::Error)]
pub(crate) enum SurfaceAcquireError {
    #[error("surface acquire timed out")]
    Timeout,
    #[error("surface occluded")]
    Occluded,
    #[error("surface outdated")]
    Outdated,
    #[error("surface lost")]
    Lost,
    #[error("surface validation error")]
    Validation,
}

impl std::fmt::Debug for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Display")
            .field("width", &self.config.width)
            .field("height", &self.config.height)
            .field("configured", &self.configured)
            .finish()
    }
}
