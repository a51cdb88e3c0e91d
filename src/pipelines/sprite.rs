//! The sprite render pipeline.
//!
//! One pipeline serves every sprite in the engine: a single unit-quad
//! vertex buffer, a single shader, and per-draw state delivered through
//! an instance buffer slot (model matrix + atlas sub-rect matrix) plus a
//! frame-shared uniform block (view, projection, ambient color, point
//! lights). Lighting variants are a property of the data, not the
//! pipeline: with no lights the fragment path degrades to plain
//! ambient-modulated texturing, and the neutral normal/bump placeholders
//! make the lit path safe for sheets that ship only a color map.
//!
//! Per-family GPU textures are created on first draw and memoized on the
//! sheet, so repeated frames rebind rather than re-upload.

use bytemuck::Zeroable;
use cgmath::Matrix4;
use wgpu::util::DeviceExt;

use crate::data_structures::light::{LightRaw, PointLight};
use crate::data_structures::sheet::SpriteSheet;
use crate::data_structures::texture::Texture;
use crate::error::Error;
use crate::transform;

/// Upper bound of point lights honoured per frame; extras are dropped.
pub const MAX_LIGHTS: usize = 8;

const INITIAL_INSTANCE_CAPACITY: usize = 64;

/// Per-draw inputs an actor hands to [`SpritePipeline::draw`].
#[derive(Clone, Copy, Debug)]
pub struct SpriteDraw {
    pub position: cgmath::Vector2<f32>,
    pub layer: i32,
    pub frame: (u32, u32),
}

/// One vertex of the shared unit quad.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct QuadVertex {
    position: [f32; 3],
    tex_coords: [f32; 2],
}

impl QuadVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

// Two CCW triangles spanning (0,0)..(1,1), texture space flipped so the
// top image row lands on the top of the quad.
const QUAD_VERTICES: [QuadVertex; 6] = [
    QuadVertex {
        position: [0.0, 0.0, 0.0],
        tex_coords: [0.0, 1.0],
    },
    QuadVertex {
        position: [1.0, 0.0, 0.0],
        tex_coords: [1.0, 1.0],
    },
    QuadVertex {
        position: [1.0, 1.0, 0.0],
        tex_coords: [1.0, 0.0],
    },
    QuadVertex {
        position: [0.0, 1.0, 0.0],
        tex_coords: [0.0, 0.0],
    },
    QuadVertex {
        position: [0.0, 0.0, 0.0],
        tex_coords: [0.0, 1.0],
    },
    QuadVertex {
        position: [1.0, 1.0, 0.0],
        tex_coords: [1.0, 0.0],
    },
];

/// The per-draw instance record as stored on the GPU: the model matrix
/// across vertex locations 5-8 and the texture sub-rect matrix across
/// locations 9-11.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SpriteInstanceRaw {
    model: [[f32; 4]; 4],
    sub_rect: [[f32; 3]; 3],
}

impl SpriteInstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<SpriteInstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 7,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 12]>() as wgpu::BufferAddress,
                    shader_location: 8,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 16]>() as wgpu::BufferAddress,
                    shader_location: 9,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 19]>() as wgpu::BufferAddress,
                    shader_location: 10,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 22]>() as wgpu::BufferAddress,
                    shader_location: 11,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Frame-shared uniform block, written once per frame.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniformsRaw {
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
    ambient: [f32; 4],
    light_count: u32,
    _padding: [u32; 3],
    lights: [LightRaw; MAX_LIGHTS],
}

/// The memoized GPU bundle of one sprite sheet: its three texture maps
/// and the bind group referencing them. Created on first draw, reused
/// for every frame after.
#[derive(Debug)]
pub struct SheetBinding {
    #[allow(unused)]
    color: Texture,
    #[allow(unused)]
    normal: Texture,
    #[allow(unused)]
    bump: Texture,
    bind_group: wgpu::BindGroup,
}

#[derive(Debug)]
pub struct SpritePipeline {
    render_pipeline: wgpu::RenderPipeline,
    quad_buffer: wgpu::Buffer,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    sheet_layout: wgpu::BindGroupLayout,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    ambient: [f32; 4],
}

impl SpritePipeline {
    /// Build the pipeline. Shader or pipeline validation failures are
    /// fatal and surface with the compiler diagnostic attached.
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> Result<Self, Error> {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("sprite_frame_bind_group_layout"),
        });
        let sheet_layout = sheet_maps_layout(device);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sprite Pipeline Layout"),
            bind_group_layouts: &[Some(&frame_layout), Some(&sheet_layout)],
            immediate_size: 0,
        });

        let error_scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sprite Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sprite.wgsl").into()),
        });
        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            cache: None,
            label: Some("Sprite Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[QuadVertex::desc(), SpriteInstanceRaw::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // LessEqual so equal layers resolve to paint order
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Texture::DEPTH_FORMAT,
                depth_write_enabled: Some(true),
                depth_compare: Some(wgpu::CompareFunction::LessEqual),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview_mask: None,
        });
        if let Some(err) = pollster::block_on(error_scope.pop()) {
            return Err(Error::ShaderCompile(err.to_string()));
        }

        let quad_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sprite Quad Buffer"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sprite Frame Uniforms"),
            contents: bytemuck::cast_slice(&[FrameUniformsRaw::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
            label: Some("sprite_frame_bind_group"),
        });

        let instance_capacity = INITIAL_INSTANCE_CAPACITY;
        let instance_buffer = create_instance_buffer(device, instance_capacity);

        Ok(Self {
            render_pipeline,
            quad_buffer,
            frame_buffer,
            frame_bind_group,
            sheet_layout,
            instance_buffer,
            instance_capacity,
            ambient: [1.0, 1.0, 1.0, 1.0],
        })
    }

    /// Ambient term applied to every drawable; defaults to full white,
    /// which makes a light-free scene plain flat texturing.
    pub fn set_ambient_color(&mut self, r: f32, g: f32, b: f32) {
        self.ambient = [r, g, b, 1.0];
    }

    /// Upload the frame-shared state and make room for this frame's
    /// drawables. Must run before the render pass that draws them.
    pub fn prepare_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        projection: Matrix4<f32>,
        view: Matrix4<f32>,
        lights: &[PointLight],
        drawable_count: usize,
    ) {
        if lights.len() > MAX_LIGHTS {
            log::warn!(
                "frame has {} point lights, only the first {} are used",
                lights.len(),
                MAX_LIGHTS
            );
        }
        let mut raw_lights = [LightRaw::OFF; MAX_LIGHTS];
        for (raw, light) in raw_lights.iter_mut().zip(lights.iter()) {
            *raw = light.to_raw();
        }

        let uniforms = FrameUniformsRaw {
            view: view.into(),
            proj: (transform::OPENGL_TO_WGPU_MATRIX * projection).into(),
            ambient: self.ambient,
            light_count: lights.len().min(MAX_LIGHTS) as u32,
            _padding: [0; 3],
            lights: raw_lights,
        };
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        if drawable_count > self.instance_capacity {
            self.instance_capacity = drawable_count.next_power_of_two();
            self.instance_buffer = create_instance_buffer(device, self.instance_capacity);
        }
    }

    /// Bind the pipeline-wide state at the start of a render pass.
    pub fn attach(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&self.render_pipeline);
        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.quad_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
    }

    /// Issue one sprite draw: stage the instance slot, bind the sheet's
    /// (memoized) textures, draw the six quad vertices once.
    pub fn draw(
        &self,
        render_pass: &mut wgpu::RenderPass<'_>,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        sheet: &SpriteSheet,
        params: SpriteDraw,
        slot: u32,
    ) {
        let (width, height) = sheet.frame_size();
        let model = transform::model_matrix(
            width as f32,
            height as f32,
            params.position.x,
            params.position.y,
            params.layer as f32,
        );
        let sub_rect = transform::frame_matrix(sheet.frame_grid(), params.frame.0, params.frame.1);
        let raw = SpriteInstanceRaw {
            model: model.into(),
            sub_rect: sub_rect.into(),
        };
        let offset = slot as wgpu::BufferAddress
            * std::mem::size_of::<SpriteInstanceRaw>() as wgpu::BufferAddress;
        queue.write_buffer(&self.instance_buffer, offset, bytemuck::cast_slice(&[raw]));

        let binding = self.sheet_binding(device, queue, sheet);
        render_pass.set_bind_group(1, &binding.bind_group, &[]);
        render_pass.draw(0..QUAD_VERTICES.len() as u32, slot..slot + 1);
    }

    fn sheet_binding<'s>(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        sheet: &'s SpriteSheet,
    ) -> &'s SheetBinding {
        sheet.gpu.get_or_init(|| {
            let color = Texture::from_rgba(device, queue, sheet.color_map(), "sheet color", true);
            let normal =
                Texture::from_rgba(device, queue, sheet.normal_map(), "sheet normal", false);
            let bump = Texture::from_rgba(device, queue, sheet.bump_map(), "sheet bump", false);
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &self.sheet_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&color.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&color.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(&normal.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(&normal.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 4,
                        resource: wgpu::BindingResource::TextureView(&bump.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 5,
                        resource: wgpu::BindingResource::Sampler(&bump.sampler),
                    },
                ],
                label: Some("sprite_sheet_bind_group"),
            });
            SheetBinding {
                color,
                normal,
                bump,
                bind_group,
            }
        })
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Sprite Instance Buffer"),
        size: (capacity * std::mem::size_of::<SpriteInstanceRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Bind group layout of a sheet's three texture maps with their
/// samplers.
fn sheet_maps_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    };
    let sampler_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            texture_entry(0),
            sampler_entry(1),
            texture_entry(2),
            sampler_entry(3),
            texture_entry(4),
            sampler_entry(5),
        ],
        label: Some("sprite_sheet_bind_group_layout"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_record_is_twenty_five_floats() {
        assert_eq!(std::mem::size_of::<SpriteInstanceRaw>(), 25 * 4);
    }

    #[test]
    fn frame_uniforms_match_wgsl_layout() {
        // view + proj + ambient + count/padding + 8 lights of 32 bytes
        assert_eq!(
            std::mem::size_of::<FrameUniformsRaw>(),
            64 + 64 + 16 + 16 + MAX_LIGHTS * 32
        );
    }

    #[test]
    fn quad_covers_unit_square_with_flipped_texture_rows() {
        for vertex in &QUAD_VERTICES {
            let [x, y, _] = vertex.position;
            let [u, v] = vertex.tex_coords;
            assert_eq!(u, x);
            assert_eq!(v, 1.0 - y);
        }
    }
}
