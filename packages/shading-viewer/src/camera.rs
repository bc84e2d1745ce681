//! Camera and camera controller.
//!
//! The camera is an eye/at/up triple plus perspective parameters. The
//! controller owns it together with a snapshot of the startup pose (for
//! reset) and exactly one active [`ControlMode`]:
//!
//! - **Orbit**: pointer drag rotates eye and up about `at`
//! - **FreeFly**: W/A/S/D + Space/Shift translate eye and at together
//! - **Look**: pointer drag accumulates yaw/pitch and re-aims `at`
//!
//! Every mutation recomputes the view matrix immediately, so the matrix
//! handed to the frame is never stale.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Quat, Vec2, Vec3};

use crate::input::{InputState, Key};
use crate::space::view_matrix;

/// Smallest near-plane distance.
pub const MIN_NEAR: f32 = 1e-3;

/// Smallest allowed `far - near`.
pub const MIN_DEPTH_RANGE: f32 = 1e-3;

/// Allowed vertical field of view, degrees.
pub const FOVY_RANGE: (f32, f32) = (1.0, 179.0);

/// Pitch stays this far away from straight up/down.
const PITCH_MARGIN: f32 = 0.01;

// ============================================================================
// Camera
// ============================================================================

/// Camera pose and projection parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub at: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 3.0, 9.0),
            at: Vec3::new(0.0, 0.5, 0.0),
            up: Vec3::Y,
            fovy: 45.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    /// Canonical pose: eye at the origin looking down -Z with +Y up. The
    /// view matrix of this pose is the identity.
    pub fn canonical() -> Self {
        Self {
            eye: Vec3::ZERO,
            at: Vec3::NEG_Z,
            up: Vec3::Y,
            ..Self::default()
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        view_matrix(self.eye, self.at, self.up)
    }

    /// Perspective projection with wgpu's 0..1 depth range.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fovy.to_radians(), aspect, self.near, self.far)
    }

    /// Unit vector from eye toward at.
    pub fn forward(&self) -> Option<Vec3> {
        (self.at - self.eye).try_normalize()
    }

    /// Copy with `fovy`, `near` and `far` pulled into the ranges the
    /// setters enforce. Non-finite values take the default.
    pub fn clamped(&self) -> Self {
        let defaults = Camera::default();
        let finite_or = |v: f32, fallback: f32| if v.is_finite() { v } else { fallback };

        let fovy = finite_or(self.fovy, defaults.fovy).clamp(FOVY_RANGE.0, FOVY_RANGE.1);
        let near = finite_or(self.near, defaults.near).max(MIN_NEAR);
        let far = finite_or(self.far, defaults.far).max(near + MIN_DEPTH_RANGE);
        Self {
            fovy,
            near,
            far,
            ..self.clone()
        }
    }
}

// ============================================================================
// Control Modes
// ============================================================================

/// Which input drives the camera. Exactly one mode is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ControlMode {
    #[default]
    Orbit,
    FreeFly,
    Look,
}

impl ControlMode {
    pub const ALL: [ControlMode; 3] = [ControlMode::Orbit, ControlMode::FreeFly, ControlMode::Look];

    pub fn next(self) -> Self {
        match self {
            ControlMode::Orbit => ControlMode::FreeFly,
            ControlMode::FreeFly => ControlMode::Look,
            ControlMode::Look => ControlMode::Orbit,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            ControlMode::Orbit => 0,
            ControlMode::FreeFly => 1,
            ControlMode::Look => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ControlMode::Orbit => "orbit",
            ControlMode::FreeFly => "free-fly",
            ControlMode::Look => "look",
        }
    }
}

/// Tuning constants for the controller.
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerSettings {
    /// Radians of orbit per pixel of drag.
    pub orbit_sensitivity: f32,
    /// Units per second in free-fly.
    pub fly_speed: f32,
    /// Radians of yaw/pitch per pixel of drag.
    pub look_sensitivity: f32,
    /// Eye height floor for free-fly (e.g. ground plane), if any.
    pub min_eye_height: Option<f32>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            orbit_sensitivity: 0.01,
            fly_speed: 4.0,
            look_sensitivity: 0.005,
            min_eye_height: Some(0.2),
        }
    }
}

/// Unit forward vector for yaw/pitch; yaw = pitch = 0 looks down -Z.
pub fn forward_from_angles(yaw: f32, pitch: f32) -> Vec3 {
    Vec3::new(
        yaw.sin() * pitch.cos(),
        pitch.sin(),
        -yaw.cos() * pitch.cos(),
    )
}

/// Yaw/pitch of a unit direction (inverse of [`forward_from_angles`]).
pub fn angles_from_forward(forward: Vec3) -> (f32, f32) {
    let pitch = forward.y.clamp(-1.0, 1.0).asin();
    let yaw = forward.x.atan2(-forward.z);
    (yaw, pitch)
}

// ============================================================================
// Controller
// ============================================================================

/// Owns the camera and applies the active control mode each frame.
#[derive(Clone, Debug)]
pub struct CameraController {
    /// Current pose.
    camera: Camera,
    /// Startup pose restored by `reset`.
    initial: Camera,
    mode: ControlMode,
    settings: ControllerSettings,
    /// Look-mode angles in radians, kept in sync with `at - eye`.
    yaw: f32,
    pitch: f32,
    /// View matrix of `camera`, recomputed on every mutation.
    view: Mat4,
    /// Bumped on every mutation.
    revision: u64,
}

impl CameraController {
    /// The startup pose is clamped first, so `reset` never restores an
    /// out-of-range projection.
    pub fn new(camera: Camera, settings: ControllerSettings) -> Self {
        let clamped = camera.clamped();
        if clamped != camera {
            log::warn!(
                "Startup camera clamped: fovy {} -> {}, near {} -> {}, far {} -> {}",
                camera.fovy,
                clamped.fovy,
                camera.near,
                clamped.near,
                camera.far,
                clamped.far
            );
        }
        let camera = clamped;
        let mut controller = Self {
            initial: camera.clone(),
            camera,
            mode: ControlMode::default(),
            settings,
            yaw: 0.0,
            pitch: 0.0,
            view: Mat4::IDENTITY,
            revision: 0,
        };
        controller.sync_angles();
        controller.refresh();
        controller
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn initial(&self) -> &Camera {
        &self.initial
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Cached view matrix, current as of the last mutation.
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// Incremented on every camera mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn yaw_pitch(&self) -> (f32, f32) {
        (self.yaw, self.pitch)
    }

    pub fn set_mode(&mut self, mode: ControlMode) {
        if mode != self.mode {
            log::debug!("Camera mode: {} -> {}", self.mode.name(), mode.name());
            self.mode = mode;
            self.sync_angles();
        }
    }

    /// Cycle to the next control mode.
    pub fn next_mode(&mut self) -> ControlMode {
        self.set_mode(self.mode.next());
        self.mode
    }

    /// Run the active mode against this frame's input.
    ///
    /// The pointer drag is consumed whether or not the active mode uses it,
    /// so switching modes never replays a stale drag.
    pub fn update(&mut self, input: &mut InputState, dt: f32) {
        let drag = input.take_drag();
        match self.mode {
            ControlMode::Orbit => self.orbit(drag),
            ControlMode::FreeFly => {
                let direction = fly_direction(input);
                self.fly(direction, dt);
            }
            ControlMode::Look => self.look(drag),
        }
    }

    /// Rotate eye and up about `at` for a screen-space drag.
    pub fn orbit(&mut self, drag: Vec2) {
        let angle = self.settings.orbit_sensitivity * drag.length();
        if angle == 0.0 {
            return;
        }

        let Some(forward) = self.camera.forward() else {
            log::warn!("Orbit skipped: eye and at coincide");
            return;
        };
        let Some(right) = forward.cross(self.camera.up).try_normalize() else {
            log::warn!("Orbit skipped: up is parallel to the view direction");
            return;
        };
        let true_up = right.cross(forward);

        // Camera-local axis (-dy, -dx, 0) expressed in world space
        let local = Vec3::new(-drag.y, -drag.x, 0.0);
        let Some(axis) = (right * local.x + true_up * local.y - forward * local.z).try_normalize()
        else {
            return;
        };

        let rotation = Quat::from_axis_angle(axis, angle);
        let offset = self.camera.eye - self.camera.at;
        self.camera.eye = self.camera.at + rotation * offset;
        self.camera.up = rotation * self.camera.up;

        log::trace!("Orbit by {:.4} rad about {:?}", angle, axis);
        self.sync_angles();
        self.refresh();
    }

    /// Translate eye and at together.
    ///
    /// `direction` is in camera terms: x = strafe right, y = world up,
    /// z = forward. It is normalized, so diagonals are not faster.
    pub fn fly(&mut self, direction: Vec3, dt: f32) {
        let Some(forward) = self.camera.forward() else {
            return;
        };
        let strafe = forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::ZERO);

        let movement = forward * direction.z + strafe * direction.x + Vec3::Y * direction.y;
        let Some(movement) = movement.try_normalize() else {
            return;
        };

        let mut delta = movement * self.settings.fly_speed * dt;
        if let Some(floor) = self.settings.min_eye_height {
            let new_height = self.camera.eye.y + delta.y;
            if new_height < floor {
                delta.y += floor - new_height;
            }
        }

        self.camera.eye += delta;
        self.camera.at += delta;
        self.refresh();
    }

    /// Accumulate yaw/pitch from a drag and re-aim `at` from the eye.
    pub fn look(&mut self, drag: Vec2) {
        if drag == Vec2::ZERO {
            return;
        }
        let limit = FRAC_PI_2 - PITCH_MARGIN;
        self.yaw += drag.x * self.settings.look_sensitivity;
        self.pitch = (self.pitch - drag.y * self.settings.look_sensitivity).clamp(-limit, limit);

        let distance = (self.camera.at - self.camera.eye).length().max(1.0);
        self.camera.at = self.camera.eye + forward_from_angles(self.yaw, self.pitch) * distance;
        self.refresh();
    }

    /// Restore the startup pose exactly.
    pub fn reset(&mut self) {
        log::debug!("Camera reset");
        self.camera = self.initial.clone();
        self.sync_angles();
        self.refresh();
    }

    pub fn set_eye(&mut self, eye: Vec3) {
        self.camera.eye = eye;
        self.sync_angles();
        self.refresh();
    }

    pub fn set_at(&mut self, at: Vec3) {
        self.camera.at = at;
        self.sync_angles();
        self.refresh();
    }

    pub fn set_up(&mut self, up: Vec3) {
        self.camera.up = up;
        self.refresh();
    }

    /// Field of view in degrees, clamped to [`FOVY_RANGE`].
    pub fn set_fovy(&mut self, fovy: f32) {
        self.camera.fovy = fovy.clamp(FOVY_RANGE.0, FOVY_RANGE.1);
        self.refresh();
    }

    /// Near plane, clamped so that `near < far` always holds.
    pub fn set_near(&mut self, near: f32) {
        let max = (self.camera.far - MIN_DEPTH_RANGE).max(MIN_NEAR);
        self.camera.near = near.clamp(MIN_NEAR, max);
        self.refresh();
    }

    /// Far plane, clamped so that `near < far` always holds.
    pub fn set_far(&mut self, far: f32) {
        self.camera.far = far.max(self.camera.near + MIN_DEPTH_RANGE);
        self.refresh();
    }

    fn sync_angles(&mut self) {
        if let Some(forward) = self.camera.forward() {
            let (yaw, pitch) = angles_from_forward(forward);
            self.yaw = yaw;
            self.pitch = pitch;
        }
    }

    fn refresh(&mut self) {
        self.view = self.camera.view_matrix();
        self.revision = self.revision.wrapping_add(1);
    }
}

/// Movement request from the held keys: x strafe, y vertical, z forward.
fn fly_direction(input: &InputState) -> Vec3 {
    let axis = |pos: bool, neg: bool| (pos as i8 - neg as i8) as f32;
    Vec3::new(
        axis(input.is_down(Key::D), input.is_down(Key::A)),
        axis(input.is_down(Key::Space), input.is_down(Key::Shift)),
        axis(input.is_down(Key::W), input.is_down(Key::S)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::PointerEvent;

    fn controller() -> CameraController {
        CameraController::new(Camera::default(), ControllerSettings::default())
    }

    #[test]
    fn test_startup_projection_is_clamped() {
        let camera = Camera {
            fovy: 0.0,
            near: -2.0,
            far: f32::NAN,
            ..Camera::default()
        };
        let mut c = CameraController::new(camera, ControllerSettings::default());
        assert_eq!(c.camera().fovy, FOVY_RANGE.0);
        assert_eq!(c.camera().near, MIN_NEAR);
        assert_eq!(c.camera().far, Camera::default().far);
        assert!(c.camera().projection_matrix(1.5).is_finite());

        c.set_fovy(90.0);
        c.reset();
        assert_eq!(c.camera(), c.initial());
        assert_eq!(c.camera().near, MIN_NEAR);
    }

    #[test]
    fn test_view_matrix_is_eager() {
        let mut c = controller();
        let before = c.view_matrix();
        let rev = c.revision();
        c.set_eye(Vec3::new(5.0, 5.0, 5.0));
        assert_ne!(c.view_matrix(), before);
        assert_eq!(c.view_matrix(), c.camera().view_matrix());
        assert!(c.revision() > rev);
    }

    #[test]
    fn test_orbit_keeps_at_and_distance() {
        let mut c = controller();
        let at = c.camera().at;
        let distance = (c.camera().eye - at).length();

        c.orbit(Vec2::new(40.0, -25.0));

        assert_eq!(c.camera().at, at);
        assert!(((c.camera().eye - at).length() - distance).abs() < 1e-4);
        assert!((c.camera().up.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_orbit_horizontal_drag_stays_level() {
        let mut c = CameraController::new(
            Camera {
                eye: Vec3::new(0.0, 0.0, 5.0),
                at: Vec3::ZERO,
                ..Camera::default()
            },
            ControllerSettings::default(),
        );
        c.orbit(Vec2::new(100.0, 0.0));
        assert!(c.camera().eye.y.abs() < 1e-5);
        assert!(c.camera().up.abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn test_orbit_zero_drag_is_noop() {
        let mut c = controller();
        let rev = c.revision();
        c.orbit(Vec2::ZERO);
        assert_eq!(c.revision(), rev);
    }

    #[test]
    fn test_fly_translates_eye_and_at() {
        let mut c = controller();
        let offset = c.camera().at - c.camera().eye;
        c.fly(Vec3::new(1.0, 0.0, 1.0), 0.5);
        let after = c.camera().at - c.camera().eye;
        assert!(offset.abs_diff_eq(after, 1e-5));

        let moved = c.camera().eye - Camera::default().eye;
        let expected = c.settings().fly_speed * 0.5;
        assert!((moved.length() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_fly_respects_min_height() {
        let mut c = controller();
        for _ in 0..100 {
            c.fly(Vec3::new(0.0, -1.0, 0.0), 0.1);
        }
        assert!(c.camera().eye.y >= 0.2 - 1e-5);
    }

    #[test]
    fn test_update_uses_only_active_mode() {
        let mut c = controller();
        let mut input = InputState::new();

        // Orbit mode ignores keys
        input.key_down(Key::W);
        c.update(&mut input, 0.1);
        assert_eq!(c.camera(), &Camera::default());

        // FreeFly ignores drag and consumes it
        c.set_mode(ControlMode::FreeFly);
        input.pointer(PointerEvent::Down { x: 0.0, y: 0.0 });
        input.pointer(PointerEvent::Move { x: 50.0, y: 0.0 });
        let at_offset = c.camera().at - c.camera().eye;
        c.update(&mut input, 0.1);
        assert!((c.camera().at - c.camera().eye).abs_diff_eq(at_offset, 1e-5));
        assert_eq!(input.take_drag(), Vec2::ZERO);
    }

    #[test]
    fn test_look_clamps_pitch() {
        let mut c = controller();
        c.set_mode(ControlMode::Look);
        c.look(Vec2::new(0.0, -100_000.0));
        let (_, pitch) = c.yaw_pitch();
        assert!(pitch <= FRAC_PI_2 - PITCH_MARGIN + 1e-6);
        assert!(c.camera().forward().is_some());
        assert!(c.view_matrix().is_finite());
    }

    #[test]
    fn test_angles_round_trip() {
        let dir = Vec3::new(0.3, -0.4, -0.8).normalize();
        let (yaw, pitch) = angles_from_forward(dir);
        assert!(forward_from_angles(yaw, pitch).abs_diff_eq(dir, 1e-5));
        assert!(forward_from_angles(0.0, 0.0).abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }

    #[test]
    fn test_reset_is_exact() {
        let mut c = controller();
        c.orbit(Vec2::new(13.0, 7.0));
        c.fly(Vec3::new(1.0, 1.0, 1.0), 0.3);
        c.set_mode(ControlMode::Look);
        c.look(Vec2::new(-20.0, 9.0));
        c.set_fovy(90.0);
        c.reset();

        let initial = Camera::default();
        assert_eq!(c.camera().eye.to_array(), initial.eye.to_array());
        assert_eq!(c.camera().at.to_array(), initial.at.to_array());
        assert_eq!(c.camera().up.to_array(), initial.up.to_array());
        assert_eq!(c.view_matrix(), initial.view_matrix());
    }

    #[test]
    fn test_near_far_clamping() {
        let mut c = controller();
        c.set_near(500.0);
        assert!(c.camera().near < c.camera().far);

        c.set_far(0.0);
        assert!(c.camera().near < c.camera().far);

        c.set_near(-1.0);
        assert_eq!(c.camera().near, MIN_NEAR);
    }

    #[test]
    fn test_fovy_clamping() {
        let mut c = controller();
        c.set_fovy(0.0);
        assert_eq!(c.camera().fovy, FOVY_RANGE.0);
        c.set_fovy(400.0);
        assert_eq!(c.camera().fovy, FOVY_RANGE.1);
    }

    #[test]
    fn test_mode_cycle() {
        let mut c = controller();
        assert_eq!(c.mode(), ControlMode::Orbit);
        assert_eq!(c.next_mode(), ControlMode::FreeFly);
        assert_eq!(c.next_mode(), ControlMode::Look);
        assert_eq!(c.next_mode(), ControlMode::Orbit);
    }
}
