//! Coordinate-space bookkeeping.
//!
//! The light model always evaluates in eye space. This module produces the
//! eye-space inputs it needs: the view matrix, per-drawable model-view and
//! normal matrices, and eye-space lights.
//!
//! Lights can be authored in either space (see [`LightSpace`]). The branch on
//! the authoring space lives only in [`derive_eye_space`].

use glam::{Mat3, Mat4, Vec3, Vec4};

use crate::light::{Light, LightKind};
use crate::lighting::EyeLight;

/// Determinant below which the model-view 3x3 is treated as singular.
const SINGULAR_DETERMINANT: f32 = 1e-8;

/// Space in which light positions and axes are authored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LightSpace {
    /// Authored values are already eye space; lights move with the camera.
    Camera,
    /// Authored values are world space and go through the view matrix.
    #[default]
    World,
}

impl LightSpace {
    pub fn toggled(self) -> Self {
        match self {
            LightSpace::Camera => LightSpace::World,
            LightSpace::World => LightSpace::Camera,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(LightSpace::Camera),
            1 => Some(LightSpace::World),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            LightSpace::Camera => 0,
            LightSpace::World => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LightSpace::Camera => "camera",
            LightSpace::World => "world",
        }
    }
}

/// Right-handed look-at view matrix. `up` is normalized before use and
/// falls back to +Y when it has no length.
pub fn view_matrix(eye: Vec3, at: Vec3, up: Vec3) -> Mat4 {
    let up = up.try_normalize().unwrap_or(Vec3::Y);
    Mat4::look_at_rh(eye, at, up)
}

/// Inverse-transpose of the upper 3x3 of `model_view`.
///
/// Singular transforms (e.g. a zero scale axis) fall back to identity so no
/// NaN reaches the shaders.
pub fn normal_matrix(model_view: &Mat4) -> Mat3 {
    let upper = Mat3::from_mat4(*model_view);
    if upper.determinant().abs() < SINGULAR_DETERMINANT {
        Mat3::IDENTITY
    } else {
        upper.inverse().transpose()
    }
}

/// Per-drawable matrices, recomputed every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawableMatrices {
    pub model_view: Mat4,
    pub normal: Mat3,
}

impl DrawableMatrices {
    pub fn new(view: &Mat4, model: &Mat4) -> Self {
        let model_view = *view * *model;
        Self {
            model_view,
            normal: normal_matrix(&model_view),
        }
    }

    /// Eye-space position of an object-space point.
    pub fn eye_position(&self, p: Vec3) -> Vec3 {
        self.model_view.transform_point3(p)
    }

    /// Eye-space unit normal of an object-space normal.
    pub fn eye_normal(&self, n: Vec3) -> Vec3 {
        (self.normal * n).try_normalize().unwrap_or(Vec3::Z)
    }
}

/// Resolve an authored light into eye space.
///
/// - `Camera`: authored values are used as-is. With `headlamp` set, a
///   spotlight is pinned to the eye looking straight ahead.
/// - `World`: position goes through `view` with its own w (directions are
///   never translated); the axis goes through with w = 0.
pub fn derive_eye_space(light: &Light, view: &Mat4, space: LightSpace, headlamp: bool) -> EyeLight {
    let mut eye = EyeLight::from_authored(light);

    match space {
        LightSpace::Camera => {
            if headlamp && light.kind() == LightKind::Spotlight {
                eye.position = Vec4::new(0.0, 0.0, 0.0, 1.0);
                eye.axis = Vec3::NEG_Z;
            }
        }
        LightSpace::World => {
            eye.position = *view * light.position();
            eye.axis = view
                .transform_vector3(light.axis())
                .try_normalize()
                .unwrap_or(light.axis());
        }
    }

    eye
}

/// Resolve every slot of a rig.
pub fn derive_all<'a>(
    lights: impl IntoIterator<Item = &'a Light>,
    view: &Mat4,
    space: LightSpace,
    headlamp: bool,
) -> Vec<EyeLight> {
    lights
        .into_iter()
        .map(|l| derive_eye_space(l, view, space, headlamp))
        .collect()
}

/// World-space position and axis of an eye-space light.
pub fn eye_to_world(light: &EyeLight, view: &Mat4) -> (Vec4, Vec3) {
    let inverse = view.inverse();
    let position = inverse * light.position;
    let axis = inverse
        .transform_vector3(light.axis)
        .try_normalize()
        .unwrap_or(light.axis);
    (position, axis)
}
