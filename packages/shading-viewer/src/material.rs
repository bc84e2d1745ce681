//! Surface materials for the lighting model.
//!
//! A material is the classic four-tuple consumed by the light model:
//! ambient, diffuse and specular reflectance plus a shininess exponent.
//! Colors are authored in 0-255 channels (the range the control panel edits)
//! and only converted to unit range at evaluation time.

use glam::Vec3;

/// Smallest shininess exponent a material accepts.
pub const MIN_SHININESS: f32 = 0.01;

/// RGB color with channels in the 0-255 range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::new(255.0, 255.0, 255.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Same value in all three channels.
    pub const fn gray(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// Build from a `[r, g, b]` array (config files and panel values).
    pub fn from_array(rgb: [f32; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Color scaled to unit range (channel / 255).
    pub fn unit(self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b) / 255.0
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Reflectance properties of a drawable instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Ambient reflectance.
    pub ka: Color,
    /// Diffuse reflectance.
    pub kd: Color,
    /// Specular reflectance.
    pub ks: Color,
    /// Specular exponent, always > 0.
    shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ka: Color::new(80.0, 40.0, 40.0),
            kd: Color::new(200.0, 80.0, 80.0),
            ks: Color::WHITE,
            shininess: 32.0,
        }
    }
}

impl Material {
    pub fn new(ka: Color, kd: Color, ks: Color, shininess: f32) -> Self {
        let mut material = Self {
            ka,
            kd,
            ks,
            shininess: MIN_SHININESS,
        };
        material.set_shininess(shininess);
        material
    }

    /// Matte gray used for the ground plane.
    pub fn ground() -> Self {
        Self::new(
            Color::gray(60.0),
            Color::gray(170.0),
            Color::gray(30.0),
            4.0,
        )
    }

    /// Bright, mostly ambient material for the spotlight footprint disc.
    pub fn overlay() -> Self {
        Self::new(
            Color::new(255.0, 230.0, 90.0),
            Color::new(255.0, 230.0, 90.0),
            Color::BLACK,
            1.0,
        )
    }

    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    /// Set the specular exponent. Non-positive and NaN values are raised to
    /// [`MIN_SHININESS`].
    pub fn set_shininess(&mut self, shininess: f32) {
        self.shininess = if shininess.is_nan() {
            MIN_SHININESS
        } else {
            shininess.max(MIN_SHININESS)
        };
    }

    /// Copy with all three reflectances set to the same color.
    pub fn uniform(color: Color, shininess: f32) -> Self {
        Self::new(color, color, color, shininess)
    }
}
