//! GPU textures and texture creation utilities.
//!
//! Sprite sheets keep their pixel payloads on the CPU as decoded
//! [`image::RgbaImage`] buffers; this module turns those buffers into
//! bound GPU textures. Atlas textures sample with nearest filtering so
//! neighbouring frame cells never bleed into each other.

use image::RgbaImage;

/// A GPU texture with its view and sampler.
#[derive(Debug)]
pub struct Texture {
    #[allow(unused)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Upload a decoded RGBA buffer as a 2D texture.
    ///
    /// `srgb` selects the sRGB texture format for color maps; normal and
    /// bump maps carry linear data and pass `false`.
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &RgbaImage,
        label: &str,
        srgb: bool,
    ) -> Self {
        let dimensions = rgba.dimensions();
        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_atlas_sampler(device);
        Self {
            texture,
            view,
            sampler,
        }
    }

    /// Create a depth texture matching the surface size, used to resolve
    /// layer ordering against the quads' z positions.
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_atlas_sampler(device);

        Self {
            texture,
            view,
            sampler,
        }
    }
}

/// Nearest-filtering sampler shared by all sprite maps.
pub fn create_atlas_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    })
}

/// A flat normal map (the neutral blue that means "no deformation").
///
/// Substituted when a sprite family ships no normal map, so the lit
/// shading path never has to care whether one existed.
pub fn neutral_normal_map(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, image::Rgba([127, 127, 255, 255]))
}

/// A flat mid-gray bump map, the no-op counterpart for the gloss term.
pub fn neutral_bump_map(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, image::Rgba([127, 127, 127, 255]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_maps_match_requested_dimensions() {
        let normal = neutral_normal_map(16, 8);
        assert_eq!(normal.dimensions(), (16, 8));
        assert_eq!(normal.get_pixel(3, 3).0, [127, 127, 255, 255]);

        let bump = neutral_bump_map(4, 4);
        assert_eq!(bump.dimensions(), (4, 4));
        assert_eq!(bump.get_pixel(0, 0).0, [127, 127, 127, 255]);
    }
}
