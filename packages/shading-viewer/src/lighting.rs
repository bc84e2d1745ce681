//! The light model.
//!
//! One pure function evaluates the contribution of every enabled light at a
//! surface sample. Both shading stages (per-vertex and per-fragment) call the
//! same code, and the WGSL in `gpu/lighting.wgsl` mirrors it line for line.
//!
//! All inputs are in eye space: the camera sits at the origin and the view
//! vector is `-P`.
//!
//! ## Per-light terms
//!
//! - ambient: `Ka * La`
//! - diffuse: `Kd * Ld * max(0, N.L)`
//! - specular: `Ks * Ls * max(0, R.V)^shininess`, only when `N.L > 0`
//!
//! The sum is scaled by the spotlight attenuation `s`. Ambient is gated by the
//! cone as well: outside a spotlight's cone nothing at all is added.

use std::sync::Once;

use glam::{Vec3, Vec4};

use crate::light::{Light, LightKind};
use crate::material::{Color, Material};

static DEGENERATE_LIGHT_DIR: Once = Once::new();
static DEGENERATE_SPOT_AXIS: Once = Once::new();

/// A light slot resolved into eye space, ready for evaluation or upload.
#[derive(Clone, Debug, PartialEq)]
pub struct EyeLight {
    pub enabled: bool,
    pub kind: LightKind,
    /// Eye-space position (w = 1) or travel direction (w = 0).
    pub position: Vec4,
    /// Eye-space cone axis, unit length.
    pub axis: Vec3,
    /// Full cone angle in degrees.
    pub aperture: f32,
    pub cutoff: f32,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
}

impl EyeLight {
    /// Copy a slot as-is, treating its authored values as eye space.
    pub fn from_authored(light: &Light) -> Self {
        Self {
            enabled: light.enabled,
            kind: light.kind(),
            position: light.position(),
            axis: light.axis(),
            aperture: light.aperture,
            cutoff: light.cutoff,
            ambient: light.ambient,
            diffuse: light.diffuse,
            specular: light.specular,
        }
    }

    /// Cosine of the half aperture, the cone boundary in `cos` space.
    pub fn cos_aperture(&self) -> f32 {
        (self.aperture * 0.5).to_radians().cos()
    }
}

/// Individual terms of one light's contribution, before attenuation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LightTerms {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    /// Spotlight attenuation `s` (1 for other kinds).
    pub attenuation: f32,
}

impl LightTerms {
    /// `(ambient + diffuse + specular) * s`.
    pub fn total(&self) -> Vec3 {
        (self.ambient + self.diffuse + self.specular) * self.attenuation
    }
}

/// Reflect incident vector `i` about unit normal `n`.
pub fn reflect(i: Vec3, n: Vec3) -> Vec3 {
    i - 2.0 * n.dot(i) * n
}

/// Unit direction from the surface point toward the light.
///
/// Returns `None` for a degenerate direction (point light sitting on the
/// sample, or a zero travel direction).
pub fn direction_to_light(light: &EyeLight, p: Vec3) -> Option<Vec3> {
    let to_light = match light.kind {
        LightKind::Directional => -light.position.truncate(),
        LightKind::Point | LightKind::Spotlight => light.position.truncate() - p,
    };
    to_light.try_normalize()
}

/// Spotlight attenuation given `cos_alpha = dot(L, -axis)`.
///
/// The cone boundary is inclusive. Samples facing away from the axis
/// (`cos_alpha <= 0`) get exactly zero, independent of `cutoff`.
pub fn spot_attenuation(cos_alpha: f32, cos_aperture: f32, cutoff: f32) -> f32 {
    if cos_alpha >= cos_aperture && cos_alpha > 0.0 {
        cos_alpha.powf(cutoff)
    } else {
        0.0
    }
}

/// Terms contributed by a single light. Disabled lights return all zeros
/// without reading any other field.
pub fn light_terms(light: &EyeLight, p: Vec3, n: Vec3, material: &Material) -> LightTerms {
    if !light.enabled {
        return LightTerms::default();
    }

    let Some(l) = direction_to_light(light, p) else {
        DEGENERATE_LIGHT_DIR.call_once(|| {
            log::warn!("Degenerate light direction at {:?}; light contributes black", p);
        });
        return LightTerms::default();
    };

    let attenuation = match light.kind {
        LightKind::Spotlight => match (-light.axis).try_normalize() {
            Some(light_dir) => spot_attenuation(l.dot(light_dir), light.cos_aperture(), light.cutoff),
            None => {
                DEGENERATE_SPOT_AXIS.call_once(|| {
                    log::warn!("Degenerate spotlight axis; light contributes black");
                });
                0.0
            }
        },
        LightKind::Point | LightKind::Directional => 1.0,
    };

    if attenuation == 0.0 {
        return LightTerms::default();
    }

    let ambient = material.ka.unit() * light.ambient.unit();

    let n_dot_l = n.dot(l).max(0.0);
    let diffuse = material.kd.unit() * light.diffuse.unit() * n_dot_l;

    let specular = if n_dot_l > 0.0 {
        // A sample at the eye has no view vector; look along the normal instead.
        let v = (-p).try_normalize().unwrap_or(n);
        let r = reflect(-l, n);
        let r_dot_v = r.dot(v).max(0.0);
        material.ks.unit() * light.specular.unit() * r_dot_v.powf(material.shininess())
    } else {
        Vec3::ZERO
    };

    LightTerms {
        ambient,
        diffuse,
        specular,
        attenuation,
    }
}

/// Unclamped contribution of a single light.
pub fn light_contribution(light: &EyeLight, p: Vec3, n: Vec3, material: &Material) -> Vec3 {
    light_terms(light, p, n, material).total()
}

/// Number of slots to evaluate: highest enabled index + 1.
pub fn active_count(lights: &[EyeLight]) -> usize {
    lights.iter().rposition(|l| l.enabled).map_or(0, |i| i + 1)
}

/// Shade a surface sample: sum all enabled lights, clamp to [0, 1], alpha 1.
///
/// `p` and `n` are eye space; `n` is normalized here so interpolated normals
/// can be passed directly.
pub fn shade(lights: &[EyeLight], p: Vec3, n: Vec3, material: &Material) -> Vec4 {
    let n = n.try_normalize().unwrap_or(Vec3::Z);
    let count = active_count(lights);

    let color = lights[..count]
        .iter()
        .filter(|l| l.enabled)
        .fold(Vec3::ZERO, |acc, l| acc + light_contribution(l, p, n, material));

    color.clamp(Vec3::ZERO, Vec3::ONE).extend(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray_light(kind: LightKind, position: Vec4) -> EyeLight {
        EyeLight {
            enabled: true,
            kind,
            position,
            axis: Vec3::NEG_Z,
            aperture: 60.0,
            cutoff: 1.0,
            ambient: Color::gray(120.0),
            diffuse: Color::gray(120.0),
            specular: Color::gray(120.0),
        }
    }

    fn white_material() -> Material {
        Material::uniform(Color::WHITE, 1.0)
    }

    #[test]
    fn test_reflect() {
        let r = reflect(Vec3::new(1.0, -1.0, 0.0), Vec3::Y);
        assert_eq!(r, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_direction_to_point_light() {
        let light = gray_light(LightKind::Point, Vec4::new(0.0, 0.0, 10.0, 1.0));
        let l = direction_to_light(&light, Vec3::new(0.0, 0.0, 5.0)).unwrap();
        assert_eq!(l, Vec3::Z);
    }

    #[test]
    fn test_direction_to_directional_light_is_flipped() {
        let light = gray_light(LightKind::Directional, Vec4::new(0.0, -2.0, 0.0, 0.0));
        let l = direction_to_light(&light, Vec3::new(3.0, 4.0, 5.0)).unwrap();
        assert_eq!(l, Vec3::Y);
    }

    #[test]
    fn test_direction_degenerate() {
        let light = gray_light(LightKind::Point, Vec4::new(1.0, 2.0, 3.0, 1.0));
        assert!(direction_to_light(&light, Vec3::new(1.0, 2.0, 3.0)).is_none());
    }

    #[test]
    fn test_degenerate_direction_is_black() {
        let light = gray_light(LightKind::Point, Vec4::new(1.0, 2.0, 3.0, 1.0));
        let c = light_contribution(&light, Vec3::new(1.0, 2.0, 3.0), Vec3::Z, &white_material());
        assert_eq!(c, Vec3::ZERO);
        assert!(!c.is_nan());
    }

    #[test]
    fn test_spot_attenuation_boundary_inclusive() {
        let cos_ap = 0.75;
        let s = spot_attenuation(cos_ap, cos_ap, 3.0);
        assert_eq!(s, 0.75f32.powf(3.0));
        assert_eq!(spot_attenuation(0.7499, cos_ap, 3.0), 0.0);
    }

    #[test]
    fn test_spot_attenuation_behind_is_zero() {
        // Full-sphere cone and zero cutoff would give 0^0 = 1 without the guard
        assert_eq!(spot_attenuation(-1.0, -1.0, 0.0), 0.0);
        assert_eq!(spot_attenuation(0.0, -1.0, 0.0), 0.0);
    }

    #[test]
    fn test_spotlight_gates_ambient() {
        let mut light = gray_light(LightKind::Spotlight, Vec4::new(0.0, 0.0, 10.0, 1.0));
        light.axis = Vec3::NEG_Z;
        light.aperture = 10.0;

        // Sample far off-axis: fully outside the cone
        let terms = light_terms(&light, Vec3::new(50.0, 0.0, 0.0), Vec3::Z, &white_material());
        assert_eq!(terms.total(), Vec3::ZERO);
        assert_eq!(terms.ambient, Vec3::ZERO);
    }

    #[test]
    fn test_back_facing_has_ambient_only() {
        let light = gray_light(LightKind::Point, Vec4::new(0.0, 0.0, 10.0, 1.0));
        let terms = light_terms(&light, Vec3::ZERO, Vec3::NEG_Z, &white_material());
        assert_eq!(terms.diffuse, Vec3::ZERO);
        assert_eq!(terms.specular, Vec3::ZERO);
        assert!(terms.ambient.x > 0.0);
    }

    #[test]
    fn test_disabled_lights_are_skipped() {
        let mut broken = gray_light(LightKind::Spotlight, Vec4::splat(f32::NAN));
        broken.enabled = false;
        broken.axis = Vec3::splat(f32::NAN);
        broken.cutoff = f32::NAN;

        let c = light_contribution(&broken, Vec3::ZERO, Vec3::Z, &white_material());
        assert_eq!(c, Vec3::ZERO);

        let lit = shade(&[broken], Vec3::ZERO, Vec3::Z, &white_material());
        assert_eq!(lit, Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_active_count() {
        let mut lights = vec![gray_light(LightKind::Point, Vec4::W); 4];
        for l in &mut lights {
            l.enabled = false;
        }
        assert_eq!(active_count(&lights), 0);
        lights[2].enabled = true;
        assert_eq!(active_count(&lights), 3);
    }

    #[test]
    fn test_shade_clamps_and_sets_alpha() {
        let light = gray_light(LightKind::Point, Vec4::new(0.0, 0.0, 10.0, 1.0));
        let c = shade(&[light.clone(), light], Vec3::ZERO, Vec3::Z, &white_material());
        assert_eq!(c, Vec4::ONE);
    }
}
