//! Light slots.
//!
//! The viewer owns a fixed array of [`MAX_LIGHTS`] slots for its whole
//! lifetime. Slots are never added or removed, only enabled, disabled and
//! edited. `position.w` is always derived from the light kind and the
//! spotlight axis is always unit length; both invariants are enforced by the
//! setters, which is why those fields are private.

use glam::{Vec3, Vec4};

use crate::material::Color;

/// Number of light slots (matches the array length in the shaders).
pub const MAX_LIGHTS: usize = 8;

/// Number of slots the control panel exposes.
pub const EDITABLE_LIGHTS: usize = 3;

/// Light type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LightKind {
    #[default]
    Point,
    Directional,
    Spotlight,
}

impl LightKind {
    pub const ALL: [LightKind; 3] = [LightKind::Point, LightKind::Directional, LightKind::Spotlight];

    /// Homogeneous w for `position`: 0 for directions, 1 for positions.
    pub fn w(self) -> f32 {
        match self {
            LightKind::Directional => 0.0,
            LightKind::Point | LightKind::Spotlight => 1.0,
        }
    }

    /// Integer code uploaded as `u_light_type[i]`.
    pub fn code(self) -> i32 {
        match self {
            LightKind::Point => 0,
            LightKind::Directional => 1,
            LightKind::Spotlight => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            LightKind::Point => 0,
            LightKind::Directional => 1,
            LightKind::Spotlight => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LightKind::Point => "point",
            LightKind::Directional => "directional",
            LightKind::Spotlight => "spotlight",
        }
    }
}

/// One light slot, authored in whatever space the light-space mode selects.
#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub enabled: bool,
    kind: LightKind,
    /// xyz is a position (point/spot) or travel direction (directional).
    position: Vec4,
    axis: Vec3,
    /// Full cone angle in degrees.
    pub aperture: f32,
    /// Angular falloff exponent inside the cone.
    pub cutoff: f32,
    pub ambient: Color,
    pub diffuse: Color,
    pub specular: Color,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: LightKind::Point,
            position: Vec4::new(0.0, 5.0, 5.0, 1.0),
            axis: Vec3::NEG_Y,
            aperture: 30.0,
            cutoff: 4.0,
            ambient: Color::gray(30.0),
            diffuse: Color::gray(200.0),
            specular: Color::gray(255.0),
        }
    }
}

impl Light {
    pub fn point(position: Vec3) -> Self {
        let mut light = Self::default();
        light.set_position(position);
        light
    }

    pub fn directional(direction: Vec3) -> Self {
        let mut light = Self::default();
        light.set_kind(LightKind::Directional);
        light.set_position(direction);
        light
    }

    pub fn spotlight(position: Vec3, axis: Vec3, aperture: f32, cutoff: f32) -> Self {
        let mut light = Self::default();
        light.set_kind(LightKind::Spotlight);
        light.set_position(position);
        light.set_axis(axis);
        light.aperture = aperture;
        light.cutoff = cutoff;
        light
    }

    /// Builder: enable the slot.
    pub fn enabled(mut self) -> Self {
        self.enabled = true;
        self
    }

    /// Builder: set all three colors.
    pub fn with_colors(mut self, ambient: Color, diffuse: Color, specular: Color) -> Self {
        self.ambient = ambient;
        self.diffuse = diffuse;
        self.specular = specular;
        self
    }

    pub fn kind(&self) -> LightKind {
        self.kind
    }

    /// Change the light type; `position.w` follows.
    pub fn set_kind(&mut self, kind: LightKind) {
        self.kind = kind;
        self.position.w = kind.w();
    }

    pub fn position(&self) -> Vec4 {
        self.position
    }

    /// Set the xyz part of `position`; w stays derived from the kind.
    pub fn set_position(&mut self, xyz: Vec3) {
        self.position = xyz.extend(self.kind.w());
    }

    pub fn axis(&self) -> Vec3 {
        self.axis
    }

    /// Set the cone axis. Zero-length or non-finite input is rejected and
    /// the previous axis kept; returns whether the axis changed.
    pub fn set_axis(&mut self, axis: Vec3) -> bool {
        match axis.try_normalize() {
            Some(unit) => {
                self.axis = unit;
                true
            }
            None => false,
        }
    }
}

/// The process-lifetime array of light slots.
#[derive(Clone, Debug, PartialEq)]
pub struct LightRig {
    slots: [Light; MAX_LIGHTS],
}

impl Default for LightRig {
    fn default() -> Self {
        let mut slots: [Light; MAX_LIGHTS] = std::array::from_fn(|_| Light::default());

        slots[0] = Light::point(Vec3::new(4.0, 6.0, 6.0))
            .with_colors(Color::gray(40.0), Color::gray(210.0), Color::WHITE)
            .enabled();
        slots[1] = Light::directional(Vec3::new(0.5, -1.0, -0.3)).with_colors(
            Color::new(20.0, 20.0, 30.0),
            Color::new(120.0, 130.0, 170.0),
            Color::new(150.0, 150.0, 200.0),
        );
        slots[2] = Light::spotlight(Vec3::new(0.0, 6.0, 0.0), Vec3::NEG_Y, 40.0, 8.0).with_colors(
            Color::new(60.0, 50.0, 20.0),
            Color::new(255.0, 220.0, 120.0),
            Color::new(255.0, 240.0, 200.0),
        );

        Self { slots }
    }
}

impl LightRig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rig with every slot disabled.
    pub fn dark() -> Self {
        Self {
            slots: std::array::from_fn(|_| Light::default()),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Light> {
        self.slots.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Light> {
        self.slots.get_mut(index)
    }

    pub fn slots(&self) -> &[Light; MAX_LIGHTS] {
        &self.slots
    }

    pub fn iter(&self) -> impl Iterator<Item = &Light> {
        self.slots.iter()
    }

    /// Highest enabled index + 1, the value uploaded as `u_n_lights`.
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .rposition(|l| l.enabled)
            .map_or(0, |i| i + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_w_follows_kind() {
        let mut light = Light::point(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(light.position().w, 1.0);

        light.set_kind(LightKind::Directional);
        assert_eq!(light.position().w, 0.0);
        assert_eq!(light.position().truncate(), Vec3::new(1.0, 2.0, 3.0));

        light.set_kind(LightKind::Spotlight);
        assert_eq!(light.position().w, 1.0);

        light.set_position(Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(light.position(), Vec4::new(4.0, 5.0, 6.0, 1.0));
    }

    #[test]
    fn test_axis_always_unit() {
        let mut light = Light::default();
        assert!(light.set_axis(Vec3::new(0.0, 0.0, -5.0)));
        assert!((light.axis().length() - 1.0).abs() < 1e-6);
        assert_eq!(light.axis(), Vec3::NEG_Z);

        // Zero vector is rejected and the old axis kept
        assert!(!light.set_axis(Vec3::ZERO));
        assert_eq!(light.axis(), Vec3::NEG_Z);

        assert!(!light.set_axis(Vec3::new(f32::NAN, 0.0, 1.0)));
        assert_eq!(light.axis(), Vec3::NEG_Z);
    }

    #[test]
    fn test_default_rig() {
        let rig = LightRig::default();
        assert_eq!(rig.slots().len(), MAX_LIGHTS);
        assert!(rig.get(0).unwrap().enabled);
        assert!(rig.iter().skip(1).all(|l| !l.enabled));
        assert_eq!(rig.get(1).unwrap().kind(), LightKind::Directional);
        assert_eq!(rig.get(2).unwrap().kind(), LightKind::Spotlight);
    }

    #[test]
    fn test_active_count() {
        let mut rig = LightRig::dark();
        assert_eq!(rig.active_count(), 0);

        rig.get_mut(0).unwrap().enabled = true;
        assert_eq!(rig.active_count(), 1);

        rig.get_mut(5).unwrap().enabled = true;
        assert_eq!(rig.active_count(), 6);

        rig.get_mut(0).unwrap().enabled = false;
        assert_eq!(rig.active_count(), 6);
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(LightKind::Point.code(), 0);
        assert_eq!(LightKind::Directional.code(), 1);
        assert_eq!(LightKind::Spotlight.code(), 2);
        for kind in LightKind::ALL {
            assert_eq!(LightKind::from_index(kind.index()), Some(kind));
        }
        assert_eq!(LightKind::from_index(3), None);
    }
}
