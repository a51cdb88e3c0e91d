//! Transform math for axis-aligned sprite quads.
//!
//! All sprite geometry in this engine is a single unit quad with corners
//! at (0,0) and (1,1). A sprite reaches its on-screen position and size
//! purely through the matrices built here: a model matrix scaling the
//! quad to pixel extents and translating it into world space, a 3x3
//! texture matrix selecting one atlas cell, and an orthographic
//! projection over the viewport. There is no rotation term anywhere.

use cgmath::{Matrix3, Matrix4, Vector3};

use crate::error::Error;

/// Fixed depth bounds of the orthographic volume. Layers live well
/// inside this range.
pub const PROJECTION_NEAR: f32 = -25.0;
pub const PROJECTION_FAR: f32 = 25.0;

/// wgpu clips z to [0,1] where classical GL used [-1,1]. Applied once at
/// upload time; the matrices returned by [`projection`] keep the GL
/// convention.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Build the model matrix placing the unit quad in world space:
/// scaled to `scale_x` x `scale_y` pixels, translated to
/// `(trans_x, trans_y, trans_z)`. `trans_z` carries the layer.
pub fn model_matrix(
    scale_x: f32,
    scale_y: f32,
    trans_x: f32,
    trans_y: f32,
    trans_z: f32,
) -> Matrix4<f32> {
    Matrix4::from_translation(Vector3::new(trans_x, trans_y, trans_z))
        * Matrix4::from_nonuniform_scale(scale_x, scale_y, 1.0)
}

/// Build the 3x3 texture matrix mapping the quad's full [0,1]x[0,1]
/// texture space onto atlas cell `(frame_x, frame_y)` of a
/// `grid.0` x `grid.1` frame grid: scale by the reciprocal grid count,
/// then step `frame * scale` along each axis.
pub fn frame_matrix(grid: (u32, u32), frame_x: u32, frame_y: u32) -> Matrix3<f32> {
    let scale_x = 1.0 / grid.0 as f32;
    let scale_y = 1.0 / grid.1 as f32;
    let trans_x = frame_x as f32 * scale_x;
    let trans_y = frame_y as f32 * scale_y;
    #[rustfmt::skip]
    let m = Matrix3::new(
        scale_x, 0.0,     0.0,
        0.0,     scale_y, 0.0,
        trans_x, trans_y, 1.0,
    );
    m
}

/// Build the classical glOrtho projection over the given extents with
/// the engine's fixed near/far bounds: `(left, bottom)` maps to NDC
/// `(-1,-1)` and `(right, top)` to `(1,1)`.
///
/// Degenerate extents are a caller error and refused outright rather
/// than producing a non-invertible matrix.
pub fn projection(left: f32, right: f32, bottom: f32, top: f32) -> Result<Matrix4<f32>, Error> {
    if right <= left || top <= bottom {
        return Err(Error::InvalidViewport {
            width: right - left,
            height: top - bottom,
        });
    }
    Ok(ortho(left, right, bottom, top, PROJECTION_NEAR, PROJECTION_FAR))
}

fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Matrix4<f32> {
    let inv_x = 1.0 / (right - left);
    let inv_y = 1.0 / (top - bottom);
    let inv_z = 1.0 / (far - near);
    #[rustfmt::skip]
    let m = Matrix4::new(
        2.0 * inv_x, 0.0, 0.0, 0.0,
        0.0, 2.0 * inv_y, 0.0, 0.0,
        0.0, 0.0, -2.0 * inv_z, 0.0,
        -(right + left) * inv_x, -(top + bottom) * inv_y, -(far + near) * inv_z, 1.0,
    );
    m
}

#[cfg(test)]
mod tests {
    use cgmath::Vector4;

    use super::*;

    fn transform_point(m: &Matrix4<f32>, x: f32, y: f32, z: f32) -> Vector4<f32> {
        *m * Vector4::new(x, y, z, 1.0)
    }

    #[test]
    fn model_matrix_scales_and_translates_unit_quad() {
        let m = model_matrix(64.0, 32.0, 100.0, 50.0, 3.0);
        let origin = transform_point(&m, 0.0, 0.0, 0.0);
        let far_corner = transform_point(&m, 1.0, 1.0, 0.0);
        assert_eq!(origin, Vector4::new(100.0, 50.0, 3.0, 1.0));
        assert_eq!(far_corner, Vector4::new(164.0, 82.0, 3.0, 1.0));
    }

    #[test]
    fn frame_matrix_selects_atlas_cell() {
        let m = frame_matrix((3, 10), 1, 4);
        assert!((m.x.x - 1.0 / 3.0).abs() < f32::EPSILON);
        assert!((m.y.y - 1.0 / 10.0).abs() < f32::EPSILON);
        assert!((m.z.x - 1.0 / 3.0).abs() < f32::EPSILON);
        assert!((m.z.y - 4.0 / 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn frame_matrix_maps_quad_texture_corners() {
        let m = frame_matrix((4, 4), 2, 1);
        let lo = m * Vector3::new(0.0, 0.0, 1.0);
        let hi = m * Vector3::new(1.0, 1.0, 1.0);
        assert_eq!(lo, Vector3::new(0.5, 0.25, 1.0));
        assert_eq!(hi, Vector3::new(0.75, 0.5, 1.0));
    }

    #[test]
    fn frame_zero_is_plain_reciprocal_scale() {
        let m = frame_matrix((8, 2), 0, 0);
        assert_eq!(m.z.x, 0.0);
        assert_eq!(m.z.y, 0.0);
        assert_eq!(m * Vector3::new(1.0, 1.0, 1.0), Vector3::new(0.125, 0.5, 1.0));
    }

    #[test]
    fn projection_maps_viewport_corners_to_ndc() {
        let p = projection(0.0, 800.0, 0.0, 600.0).unwrap();
        let lo = transform_point(&p, 0.0, 0.0, 0.0);
        let hi = transform_point(&p, 800.0, 600.0, 0.0);
        assert!((lo.x + 1.0).abs() < 1e-6);
        assert!((lo.y + 1.0).abs() < 1e-6);
        assert!((hi.x - 1.0).abs() < 1e-6);
        assert!((hi.y - 1.0).abs() < 1e-6);
        assert!(lo.z >= -1.0 && lo.z <= 1.0);
    }

    #[test]
    fn projection_keeps_layers_inside_depth_range() {
        let p = projection(0.0, 640.0, 0.0, 480.0).unwrap();
        for layer in [-10.0, 0.0, 10.0] {
            let v = transform_point(&p, 320.0, 240.0, layer);
            assert!(v.z >= -1.0 && v.z <= 1.0, "layer {layer} left the volume");
        }
    }

    #[test]
    fn projection_rejects_degenerate_viewport() {
        assert!(matches!(
            projection(0.0, 0.0, 0.0, 600.0),
            Err(Error::InvalidViewport { .. })
        ));
        assert!(matches!(
            projection(0.0, 800.0, 600.0, 600.0),
            Err(Error::InvalidViewport { .. })
        ));
        assert!(matches!(
            projection(800.0, 0.0, 0.0, 600.0),
            Err(Error::InvalidViewport { .. })
        ));
    }

    #[test]
    fn wgpu_correction_moves_ndc_depth_into_unit_range() {
        let p = OPENGL_TO_WGPU_MATRIX * projection(0.0, 800.0, 0.0, 600.0).unwrap();
        let near = transform_point(&p, 0.0, 0.0, PROJECTION_NEAR);
        let far = transform_point(&p, 0.0, 0.0, PROJECTION_FAR);
        assert!(near.z >= 0.0 && near.z <= 1.0);
        assert!(far.z >= 0.0 && far.z <= 1.0);
    }
}
