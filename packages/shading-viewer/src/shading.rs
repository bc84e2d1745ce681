//! Shading-stage dispatch.
//!
//! Two stages run the same [`shade`] function:
//!
//! - **Gouraud**: lighting per vertex, color interpolated across the triangle.
//! - **Phong**: position and normal interpolated, lighting per pixel.
//!
//! The GPU programs live in `gpu/`; [`ShadingDispatcher::shade_triangle`] is
//! the CPU reference of both stages and is what the tests compare against.

use glam::{Mat4, Vec3, Vec4};

use crate::lighting::{active_count, shade, EyeLight};
use crate::light::MAX_LIGHTS;
use crate::material::Material;
use crate::space::DrawableMatrices;
use crate::uniforms::{light_slot, ParamValue, UniformBlock};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShadingMode {
    /// Per-fragment lighting.
    #[default]
    Phong,
    /// Per-vertex lighting.
    Gouraud,
}

impl ShadingMode {
    pub const ALL: [ShadingMode; 2] = [ShadingMode::Phong, ShadingMode::Gouraud];

    pub fn toggled(self) -> Self {
        match self {
            ShadingMode::Phong => ShadingMode::Gouraud,
            ShadingMode::Gouraud => ShadingMode::Phong,
        }
    }

    /// Value for `u_shadingMode` in a combined program.
    pub fn code(self) -> i32 {
        match self {
            ShadingMode::Phong => 0,
            ShadingMode::Gouraud => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            ShadingMode::Phong => 0,
            ShadingMode::Gouraud => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShadingMode::Phong => "phong",
            ShadingMode::Gouraud => "gouraud",
        }
    }
}

/// One triangle corner in eye space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceVertex {
    pub position: Vec3,
    pub normal: Vec3,
}

impl SurfaceVertex {
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self { position, normal }
    }
}

fn interpolate<T>(values: [T; 3], bary: Vec3) -> T
where
    T: std::ops::Mul<f32, Output = T> + std::ops::Add<Output = T>,
{
    let [a, b, c] = values;
    a * bary.x + b * bary.y + c * bary.z
}

/// Selects the active stage and feeds it parameters. Holds nothing but the
/// mode; a switch takes effect on the next frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShadingDispatcher {
    mode: ShadingMode,
}

impl ShadingDispatcher {
    pub fn new(mode: ShadingMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ShadingMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ShadingMode) {
        if mode != self.mode {
            log::debug!("Shading mode: {} -> {}", self.mode.name(), mode.name());
            self.mode = mode;
        }
    }

    /// Color at barycentric point `bary` of an eye-space triangle, as the
    /// active stage would produce it.
    pub fn shade_triangle(
        &self,
        vertices: &[SurfaceVertex; 3],
        bary: Vec3,
        lights: &[EyeLight],
        material: &Material,
    ) -> Vec4 {
        match self.mode {
            ShadingMode::Gouraud => {
                let colors = vertices.map(|v| shade(lights, v.position, v.normal, material));
                interpolate(colors, bary)
            }
            ShadingMode::Phong => {
                let position = interpolate(vertices.map(|v| v.position), bary);
                let normal = interpolate(vertices.map(|v| v.normal), bary);
                shade(lights, position, normal, material)
            }
        }
    }

    /// Fill the per-frame block: projection, light count and every light
    /// slot. Colors are uploaded in 0-255; the shader scales them.
    pub fn upload_frame(&self, block: &mut UniformBlock, projection: &Mat4, lights: &[EyeLight]) {
        block.set("u_projectionMatrix", ParamValue::Mat4(*projection));
        block.set("u_shadingMode", ParamValue::Int(self.mode.code()));

        let lights = &lights[..lights.len().min(MAX_LIGHTS)];
        block.set("u_n_lights", ParamValue::Int(active_count(lights) as i32));

        for (i, light) in lights.iter().enumerate() {
            block.set(&light_slot("enabled", i), ParamValue::Int(light.enabled as i32));
            block.set(&light_slot("type", i), ParamValue::Int(light.kind.code()));
            block.set(&light_slot("position", i), ParamValue::Vec4(light.position.to_array()));
            block.set(&light_slot("axis", i), ParamValue::Vec3(light.axis.to_array()));
            block.set(&light_slot("aperture", i), ParamValue::Float(light.aperture));
            block.set(&light_slot("cutoff", i), ParamValue::Float(light.cutoff));
            block.set(&light_slot("ambient", i), ParamValue::Vec3(light.ambient.to_array()));
            block.set(&light_slot("diffuse", i), ParamValue::Vec3(light.diffuse.to_array()));
            block.set(&light_slot("specular", i), ParamValue::Vec3(light.specular.to_array()));
        }
    }

    /// Fill the per-draw block: matrices and material.
    pub fn upload_draw(&self, block: &mut UniformBlock, matrices: &DrawableMatrices, material: &Material) {
        block.set("u_modelViewMatrix", ParamValue::Mat4(matrices.model_view));
        block.set("u_normalMatrix", ParamValue::Mat3(matrices.normal));
        block.set("u_material.Ka", ParamValue::Vec3(material.ka.to_array()));
        block.set("u_material.Kd", ParamValue::Vec3(material.kd.to_array()));
        block.set("u_material.Ks", ParamValue::Vec3(material.ks.to_array()));
        block.set("u_material.shininess", ParamValue::Float(material.shininess()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::{Light, LightKind, LightRig};
    use crate::material::Color;

    fn lights() -> Vec<EyeLight> {
        let mut rig = LightRig::default();
        for i in 0..3 {
            if let Some(l) = rig.get_mut(i) {
                l.enabled = true;
            }
        }
        rig.iter().map(EyeLight::from_authored).collect()
    }

    fn triangle() -> [SurfaceVertex; 3] {
        [
            SurfaceVertex::new(Vec3::new(-1.0, 0.0, -4.0), Vec3::new(-0.2, 1.0, 0.1)),
            SurfaceVertex::new(Vec3::new(1.0, 0.0, -4.0), Vec3::new(0.2, 1.0, 0.1)),
            SurfaceVertex::new(Vec3::new(0.0, 0.5, -6.0), Vec3::new(0.0, 1.0, -0.3)),
        ]
    }

    #[test]
    fn test_stages_agree_at_vertices() {
        let lights = lights();
        let material = Material::default();
        let phong = ShadingDispatcher::new(ShadingMode::Phong);
        let gouraud = ShadingDispatcher::new(ShadingMode::Gouraud);

        for bary in [Vec3::X, Vec3::Y, Vec3::Z] {
            let a = phong.shade_triangle(&triangle(), bary, &lights, &material);
            let b = gouraud.shade_triangle(&triangle(), bary, &lights, &material);
            assert!(a.abs_diff_eq(b, 1e-5), "{:?} vs {:?}", a, b);
        }
    }

    #[test]
    fn test_stages_differ_inside_triangle() {
        // Light placed so the mirror reflection hits the eye exactly at the
        // centroid. Per-vertex shading misses the tight highlight.
        let light = EyeLight::from_authored(
            &Light::point(Vec3::new(0.0, 0.0, -28.0 / 3.0))
                .with_colors(Color::BLACK, Color::BLACK, Color::WHITE)
                .enabled(),
        );
        let material = Material::new(Color::BLACK, Color::BLACK, Color::WHITE, 200.0);
        let flat = [
            SurfaceVertex::new(Vec3::new(-3.0, -2.0, -2.0), Vec3::Y),
            SurfaceVertex::new(Vec3::new(3.0, -2.0, -2.0), Vec3::Y),
            SurfaceVertex::new(Vec3::new(0.0, -2.0, -10.0), Vec3::Y),
        ];
        let center = Vec3::splat(1.0 / 3.0);

        let phong = ShadingDispatcher::new(ShadingMode::Phong);
        let gouraud = ShadingDispatcher::new(ShadingMode::Gouraud);
        let a = phong.shade_triangle(&flat, center, &[light.clone()], &material);
        let b = gouraud.shade_triangle(&flat, center, &[light], &material);
        assert!(a.x > 0.9 && b.x < 0.1, "phong {:?} gouraud {:?}", a, b);
    }

    #[test]
    fn test_upload_frame_writes_slots() {
        let lights = lights();
        let dispatcher = ShadingDispatcher::default();
        let mut block = UniformBlock::frame();
        dispatcher.upload_frame(&mut block, &Mat4::IDENTITY, &lights);

        assert_eq!(block.read_i32("u_n_lights"), Some(3));
        assert_eq!(block.read_i32("u_light_type[2]"), Some(LightKind::Spotlight.code()));
        assert_eq!(block.read_i32("u_light_enabled[3]"), Some(0));
        assert_eq!(block.read_f32("u_light_aperture[2]", 0), Some(40.0));
        assert_eq!(block.read_f32("u_light_position[1]", 3), Some(0.0));
        assert_eq!(block.read_f32("u_projectionMatrix", 0), Some(1.0));
    }

    #[test]
    fn test_upload_draw_writes_material() {
        let dispatcher = ShadingDispatcher::new(ShadingMode::Gouraud);
        let mut block = UniformBlock::draw();
        let matrices = DrawableMatrices::new(&Mat4::IDENTITY, &Mat4::from_scale(Vec3::splat(2.0)));
        let material = Material::default();
        dispatcher.upload_draw(&mut block, &matrices, &material);

        assert_eq!(block.read_f32("u_material.Kd", 0), Some(material.kd.r));
        assert_eq!(block.read_f32("u_material.shininess", 0), Some(32.0));
        assert_eq!(block.read_f32("u_modelViewMatrix", 0), Some(2.0));
    }

    #[test]
    fn test_mode_toggle() {
        let mut dispatcher = ShadingDispatcher::default();
        assert_eq!(dispatcher.mode(), ShadingMode::Phong);
        dispatcher.set_mode(dispatcher.mode().toggled());
        assert_eq!(dispatcher.mode(), ShadingMode::Gouraud);
    }
}
