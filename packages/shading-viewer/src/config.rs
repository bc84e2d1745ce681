//! Viewer configuration file.
//!
//! A JSON document; every field is optional. Panel settings are expressed as
//! `name=value` overrides so they go through the same validation as live
//! edits:
//!
//! ```json
//! {
//!   "width": 1280,
//!   "camera": { "eye": [0, 3, 9], "fovy": 50 },
//!   "controls": { "flySpeed": 6 },
//!   "overrides": ["options.shading=gouraud", "light2.enabled=true"]
//! }
//! ```

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, ControllerSettings};
use crate::error::{SetupPhase, ViewerError, ViewerResult};
use crate::panel::ControlPanel;
use crate::scene::SceneState;

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_title() -> String {
    "Shading Viewer".to_string()
}

/// Initial camera pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraConfig {
    pub eye: [f32; 3],
    pub at: [f32; 3],
    pub up: [f32; 3],
    pub fovy: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let camera = Camera::default();
        Self {
            eye: camera.eye.to_array(),
            at: camera.at.to_array(),
            up: camera.up.to_array(),
            fovy: camera.fovy,
            near: camera.near,
            far: camera.far,
        }
    }
}

impl CameraConfig {
    pub fn to_camera(&self) -> Camera {
        Camera {
            eye: Vec3::from_array(self.eye),
            at: Vec3::from_array(self.at),
            up: Vec3::from_array(self.up),
            fovy: self.fovy,
            near: self.near,
            far: self.far,
        }
    }
}

/// Camera controller tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControlsConfig {
    pub orbit_sensitivity: f32,
    pub fly_speed: f32,
    pub look_sensitivity: f32,
    /// `null` disables the floor clamp.
    pub min_eye_height: Option<f32>,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        let settings = ControllerSettings::default();
        Self {
            orbit_sensitivity: settings.orbit_sensitivity,
            fly_speed: settings.fly_speed,
            look_sensitivity: settings.look_sensitivity,
            min_eye_height: settings.min_eye_height,
        }
    }
}

impl ControlsConfig {
    pub fn to_settings(&self) -> ControllerSettings {
        ControllerSettings {
            orbit_sensitivity: self.orbit_sensitivity,
            fly_speed: self.fly_speed,
            look_sensitivity: self.look_sensitivity,
            min_eye_height: self.min_eye_height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub controls: ControlsConfig,

    /// Panel assignments applied in order after the state is built.
    #[serde(default)]
    pub overrides: Vec<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            overrides: Vec::new(),
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> ViewerResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ViewerError::with_source(
                SetupPhase::Config,
                format!("Failed to read config {:?}", path),
                e,
            )
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> ViewerResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            ViewerError::with_source(SetupPhase::Config, "Failed to parse config", e)
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ViewerResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ViewerError::new(
                SetupPhase::Config,
                "Width and height must be positive",
            ));
        }
        let camera = &self.camera;
        let mut values = camera
            .eye
            .iter()
            .chain(&camera.at)
            .chain(&camera.up)
            .chain([&camera.fovy, &camera.near, &camera.far]);
        if values.any(|v| !v.is_finite()) {
            return Err(ViewerError::new(
                SetupPhase::Config,
                "Camera values must be finite",
            ));
        }
        let camera = camera.to_camera();
        let Some(forward) = camera.forward() else {
            return Err(ViewerError::new(
                SetupPhase::Config,
                format!("Camera eye and at coincide ({:?})", camera.eye),
            ));
        };
        if forward.cross(camera.up).try_normalize().is_none() {
            return Err(ViewerError::new(
                SetupPhase::Config,
                format!("Camera up {:?} is zero or parallel to the view direction", camera.up),
            ));
        }
        if self.camera.near >= self.camera.far {
            return Err(ViewerError::new(
                SetupPhase::Config,
                format!(
                    "Camera near ({}) must be less than far ({})",
                    self.camera.near, self.camera.far
                ),
            ));
        }
        Ok(())
    }

    /// Build the scene state and its panel, then apply the config overrides
    /// followed by `extra` (command-line `--set` values).
    pub fn build_state(&self, extra: &[String]) -> ViewerResult<(SceneState, ControlPanel)> {
        let mut state = SceneState::new(self.camera.to_camera(), self.controls.to_settings());
        let mut panel = ControlPanel::new(&state);

        for assignment in self.overrides.iter().chain(extra) {
            let (name, value) = panel.parse_assignment(assignment).map_err(|e| {
                ViewerError::with_source(SetupPhase::Config, "Invalid override", e)
            })?;
            panel.apply(&mut state, &name, value).map_err(|e| {
                ViewerError::with_source(
                    SetupPhase::Config,
                    format!("Override '{}' rejected", assignment),
                    e,
                )
            })?;
        }

        log::info!(
            "Scene ready: {} instances, {} lights active, {} shading",
            state.scene.len(),
            state.lights.active_count(),
            state.dispatcher.mode().name()
        );
        Ok((state, panel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shading::ShadingMode;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ViewerConfig::from_json("{}").unwrap();
        assert_eq!(config, ViewerConfig::default());
        assert_eq!(config.camera.to_camera(), Camera::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = ViewerConfig::from_json(
            r#"{ "camera": { "fovy": 60 }, "controls": { "flySpeed": 9, "minEyeHeight": null } }"#,
        )
        .unwrap();
        assert_eq!(config.camera.fovy, 60.0);
        assert_eq!(config.camera.eye, CameraConfig::default().eye);
        assert_eq!(config.controls.fly_speed, 9.0);
        assert_eq!(config.controls.min_eye_height, None);
    }

    #[test]
    fn test_invalid_config_is_config_phase() {
        let err = ViewerConfig::from_json(r#"{ "width": 0 }"#).unwrap_err();
        assert_eq!(err.phase, SetupPhase::Config);

        let err = ViewerConfig::from_json("not json").unwrap_err();
        assert_eq!(err.phase, SetupPhase::Config);

        let err = ViewerConfig::from_json(r#"{ "camera": { "near": 5, "far": 1 } }"#).unwrap_err();
        assert_eq!(err.phase, SetupPhase::Config);
    }

    #[test]
    fn test_degenerate_camera_pose_is_rejected() {
        let err = ViewerConfig::from_json(r#"{ "camera": { "eye": [1, 1, 1], "at": [1, 1, 1] } }"#)
            .unwrap_err();
        assert_eq!(err.phase, SetupPhase::Config);

        let err = ViewerConfig::from_json(r#"{ "camera": { "eye": [0, 5, 0], "at": [0, 0, 0], "up": [0, 1, 0] } }"#)
            .unwrap_err();
        assert_eq!(err.phase, SetupPhase::Config);

        let err = ViewerConfig::from_json(r#"{ "camera": { "up": [0, 0, 0] } }"#).unwrap_err();
        assert_eq!(err.phase, SetupPhase::Config);
    }

    #[test]
    fn test_out_of_range_projection_is_clamped_at_startup() {
        let config =
            ViewerConfig::from_json(r#"{ "camera": { "near": -2, "far": 1, "fovy": 0 } }"#).unwrap();
        let (mut state, _) = config.build_state(&[]).unwrap();

        let camera = state.camera.camera().clone();
        assert_eq!(camera.near, crate::camera::MIN_NEAR);
        assert_eq!(camera.far, 1.0);
        assert_eq!(camera.fovy, crate::camera::FOVY_RANGE.0);
        assert!(camera.projection_matrix(16.0 / 9.0).is_finite());
        assert!(state.camera.view_matrix().is_finite());

        state.camera.reset();
        assert_eq!(state.camera.camera(), &camera);
    }

    #[test]
    fn test_overrides_are_applied_in_order() {
        let config = ViewerConfig {
            overrides: vec![
                "options.shading=gouraud".into(),
                "light2.enabled=true".into(),
            ],
            ..ViewerConfig::default()
        };
        let (state, _) = config
            .build_state(&["options.shading=phong".to_string()])
            .unwrap();
        assert_eq!(state.dispatcher.mode(), ShadingMode::Phong);
        assert!(state.lights.get(2).unwrap().enabled);
    }

    #[test]
    fn test_bad_override_fails() {
        let config = ViewerConfig::default();
        let err = config
            .build_state(&["light0.nonsense=1".to_string()])
            .unwrap_err();
        assert_eq!(err.phase, SetupPhase::Config);
    }
}
