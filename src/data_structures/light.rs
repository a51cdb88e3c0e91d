//! Point lights.
//!
//! Lights are passive scene data: the stage updates them once per frame
//! (the hook exists for future motion) and hands the whole list to the
//! sprite pipeline, which packs them into the frame uniform block.

use cgmath::Vector3;

/// A point light in world space.
#[derive(Clone, Debug)]
pub struct PointLight {
    pub position: Vector3<f32>,
    pub color: Vector3<f32>,
    pub power: f32,
}

impl PointLight {
    pub fn new(position: Vector3<f32>) -> Self {
        Self {
            position,
            color: Vector3::new(1.0, 1.0, 1.0),
            power: 40.0,
        }
    }

    pub fn with_color(mut self, r: f32, g: f32, b: f32) -> Self {
        self.color = Vector3::new(r, g, b);
        self
    }

    pub fn with_power(mut self, power: f32) -> Self {
        self.power = power;
        self
    }

    /// Per-frame update hook. Lights are currently static.
    pub fn update(&mut self, _dt: f32) {}

    pub(crate) fn to_raw(&self) -> LightRaw {
        LightRaw {
            position: self.position.into(),
            power: self.power,
            color: self.color.into(),
            _padding: 0.0,
        }
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self::new(Vector3::new(0.0, 0.0, 0.0))
    }
}

/// GPU-side light record. Uniform blocks require 16 byte spacing, so
/// power and an explicit pad fill the vec3 gaps.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct LightRaw {
    position: [f32; 3],
    power: f32,
    color: [f32; 3],
    _padding: f32,
}

impl LightRaw {
    pub(crate) const OFF: LightRaw = LightRaw {
        position: [0.0; 3],
        power: 0.0,
        color: [0.0; 3],
        _padding: 0.0,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_record_is_two_vec4s() {
        assert_eq!(std::mem::size_of::<LightRaw>(), 32);
    }

    #[test]
    fn defaults_are_white_at_power_forty() {
        let light = PointLight::default();
        assert_eq!(light.color, Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(light.power, 40.0);
    }
}
