//! Control panel binding.
//!
//! Every editable field of the scene state is a named, range-bounded
//! control. The panel validates a value against the control's declared
//! kind, clamps it to range, writes it into [`SceneState`], and notifies
//! subscribers so they can re-trigger the matching upload.
//!
//! Names:
//!
//! | control | kind |
//! |---|---|
//! | `camera.{eye,at,up}` | vec3 |
//! | `camera.{fovy,near,far}` | float |
//! | `light{0..2}.enabled` | bool |
//! | `light{0..2}.kind` | choice: point, directional, spotlight |
//! | `light{0..2}.{position,axis}` | vec3 |
//! | `light{0..2}.{aperture,cutoff}` | float |
//! | `light{0..2}.{ambient,diffuse,specular}` | vec3, 0-255 |
//! | `material.target` | choice: scene instance names |
//! | `material.{ka,kd,ks}` | vec3, 0-255 |
//! | `material.shininess` | float |
//! | `options.{culling,depth_test,headlamp,footprint}` | bool |
//! | `options.light_space` | choice: camera, world |
//! | `options.shading` | choice: phong, gouraud |
//! | `options.camera_mode` | choice: orbit, free-fly, look |
//! | `options.primitive` | choice: triangles, points |

use std::fmt;

use glam::Vec3;

use crate::camera::{ControlMode, FOVY_RANGE, MIN_NEAR};
use crate::light::{LightKind, EDITABLE_LIGHTS};
use crate::material::{Color, MIN_SHININESS};
use crate::scene::{PrimitiveMode, SceneState};
use crate::shading::ShadingMode;
use crate::space::LightSpace;

// ============================================================================
// Controls
// ============================================================================

/// Value carried by a control edit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ControlValue {
    Float(f32),
    Bool(bool),
    Choice(usize),
    Vec3(Vec3),
}

/// What a control accepts.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlKind {
    Float { min: f32, max: f32 },
    Bool,
    Choice { options: Vec<String> },
    Vec3 { min: f32, max: f32 },
}

impl ControlKind {
    fn choice(options: &[&str]) -> Self {
        ControlKind::Choice {
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ControlKind::Float { .. } => "float",
            ControlKind::Bool => "bool",
            ControlKind::Choice { .. } => "choice",
            ControlKind::Vec3 { .. } => "vec3",
        }
    }
}

/// Which part of the state an edit touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Change {
    Camera,
    Light(usize),
    Material(usize),
    Options,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControlSpec {
    /// Dotted path, e.g. `light1.aperture`.
    pub name: String,
    /// Accepted value type and range.
    pub kind: ControlKind,
}

// ============================================================================
// Errors
// ============================================================================

/// Rejected control edit.
#[derive(Clone, Debug, PartialEq)]
pub enum PanelError {
    UnknownControl(String),
    TypeMismatch { control: String, expected: &'static str },
    InvalidChoice { control: String, index: usize, count: usize },
    NonFinite(String),
    DegenerateAxis(String),
    Parse { input: String, reason: String },
}

impl fmt::Display for PanelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelError::UnknownControl(name) => write!(f, "unknown control '{}'", name),
            PanelError::TypeMismatch { control, expected } => {
                write!(f, "control '{}' expects a {} value", control, expected)
            }
            PanelError::InvalidChoice {
                control,
                index,
                count,
            } => write!(
                f,
                "choice {} out of range for '{}' ({} options)",
                index, control, count
            ),
            PanelError::NonFinite(name) => write!(f, "non-finite value for '{}'", name),
            PanelError::DegenerateAxis(name) => {
                write!(f, "axis for '{}' has zero length", name)
            }
            PanelError::Parse { input, reason } => {
                write!(f, "cannot parse '{}': {}", input, reason)
            }
        }
    }
}

impl std::error::Error for PanelError {}

type Listener = Box<dyn FnMut(&str, Change)>;

// ============================================================================
// Control Panel
// ============================================================================

/// The control table plus change subscribers.
pub struct ControlPanel {
    /// Fixed once built, in display order.
    controls: Vec<ControlSpec>,
    /// Called in subscription order after each accepted edit.
    listeners: Vec<Listener>,
}

impl fmt::Debug for ControlPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlPanel")
            .field("controls", &self.controls.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ControlPanel {
    /// Build the control table. `material.target` lists the instances of
    /// the scene, which is fixed once built.
    pub fn new(state: &SceneState) -> Self {
        let mut controls = Vec::new();
        let mut add = |name: String, kind: ControlKind| controls.push(ControlSpec { name, kind });

        let position = ControlKind::Vec3 { min: -100.0, max: 100.0 };
        let color = ControlKind::Vec3 { min: 0.0, max: 255.0 };

        add("camera.eye".into(), position.clone());
        add("camera.at".into(), position.clone());
        add("camera.up".into(), ControlKind::Vec3 { min: -1.0, max: 1.0 });
        add(
            "camera.fovy".into(),
            ControlKind::Float {
                min: FOVY_RANGE.0,
                max: FOVY_RANGE.1,
            },
        );
        add("camera.near".into(), ControlKind::Float { min: MIN_NEAR, max: 100.0 });
        add("camera.far".into(), ControlKind::Float { min: 0.01, max: 10_000.0 });

        let kinds: Vec<&str> = LightKind::ALL.iter().map(|k| k.name()).collect();
        for i in 0..EDITABLE_LIGHTS {
            add(format!("light{}.enabled", i), ControlKind::Bool);
            add(format!("light{}.kind", i), ControlKind::choice(&kinds));
            add(format!("light{}.position", i), position.clone());
            add(format!("light{}.axis", i), ControlKind::Vec3 { min: -1.0, max: 1.0 });
            add(format!("light{}.aperture", i), ControlKind::Float { min: 0.0, max: 180.0 });
            add(format!("light{}.cutoff", i), ControlKind::Float { min: 0.0, max: 128.0 });
            add(format!("light{}.ambient", i), color.clone());
            add(format!("light{}.diffuse", i), color.clone());
            add(format!("light{}.specular", i), color.clone());
        }

        let targets: Vec<&str> = state.scene.instances.iter().map(|i| i.name.as_str()).collect();
        add("material.target".into(), ControlKind::choice(&targets));
        add("material.ka".into(), color.clone());
        add("material.kd".into(), color.clone());
        add("material.ks".into(), color);
        add(
            "material.shininess".into(),
            ControlKind::Float {
                min: MIN_SHININESS,
                max: 512.0,
            },
        );

        add("options.culling".into(), ControlKind::Bool);
        add("options.depth_test".into(), ControlKind::Bool);
        add("options.headlamp".into(), ControlKind::Bool);
        add("options.footprint".into(), ControlKind::Bool);
        let spaces = [LightSpace::Camera.name(), LightSpace::World.name()];
        add("options.light_space".into(), ControlKind::choice(&spaces));
        let shading: Vec<&str> = ShadingMode::ALL.iter().map(|m| m.name()).collect();
        add("options.shading".into(), ControlKind::choice(&shading));
        let modes: Vec<&str> = ControlMode::ALL.iter().map(|m| m.name()).collect();
        add("options.camera_mode".into(), ControlKind::choice(&modes));
        let primitives: Vec<&str> = PrimitiveMode::ALL.iter().map(|p| p.name()).collect();
        add("options.primitive".into(), ControlKind::choice(&primitives));

        Self {
            controls,
            listeners: Vec::new(),
        }
    }

    pub fn controls(&self) -> &[ControlSpec] {
        &self.controls
    }

    pub fn spec(&self, name: &str) -> Option<&ControlSpec> {
        self.controls.iter().find(|c| c.name == name)
    }

    /// Register a callback run after every accepted edit.
    pub fn subscribe(&mut self, listener: impl FnMut(&str, Change) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Validate, clamp and apply one edit.
    pub fn apply(
        &mut self,
        state: &mut SceneState,
        name: &str,
        value: ControlValue,
    ) -> Result<Change, PanelError> {
        let spec = self
            .spec(name)
            .ok_or_else(|| PanelError::UnknownControl(name.to_string()))?;
        let value = validate(spec, value)?;
        let change = write(state, name, value)?;

        log::debug!("Control {} = {:?}", name, value);
        for listener in &mut self.listeners {
            listener(name, change);
        }
        Ok(change)
    }

    /// Parse `name=value` against the control table.
    ///
    /// Values: `true`/`false` (or `on`/`off`) for bool, a number for float,
    /// `x,y,z` for vec3, an option name or index for choice.
    pub fn parse_assignment(&self, input: &str) -> Result<(String, ControlValue), PanelError> {
        let parse_err = |reason: &str| PanelError::Parse {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (name, raw) = input
            .split_once('=')
            .ok_or_else(|| parse_err("expected name=value"))?;
        let name = name.trim();
        let raw = raw.trim();
        let spec = self
            .spec(name)
            .ok_or_else(|| PanelError::UnknownControl(name.to_string()))?;

        let value = match &spec.kind {
            ControlKind::Bool => match raw {
                "true" | "on" | "1" => ControlValue::Bool(true),
                "false" | "off" | "0" => ControlValue::Bool(false),
                _ => return Err(parse_err("expected true or false")),
            },
            ControlKind::Float { .. } => ControlValue::Float(
                raw.parse::<f32>()
                    .map_err(|e| parse_err(&e.to_string()))?,
            ),
            ControlKind::Vec3 { .. } => {
                let parts = raw
                    .split(',')
                    .map(|p| p.trim().parse::<f32>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| parse_err(&e.to_string()))?;
                match parts.as_slice() {
                    [x, y, z] => ControlValue::Vec3(Vec3::new(*x, *y, *z)),
                    _ => return Err(parse_err("expected three comma-separated numbers")),
                }
            }
            ControlKind::Choice { options } => match options.iter().position(|o| o == raw) {
                Some(index) => ControlValue::Choice(index),
                None => ControlValue::Choice(
                    raw.parse::<usize>()
                        .map_err(|_| parse_err(&format!("expected one of {}", options.join(", "))))?,
                ),
            },
        };
        Ok((name.to_string(), value))
    }
}

// ============================================================================
// Validation and Writes
// ============================================================================

/// Check the value's kind and clamp it to the declared range.
fn validate(spec: &ControlSpec, value: ControlValue) -> Result<ControlValue, PanelError> {
    let mismatch = || PanelError::TypeMismatch {
        control: spec.name.clone(),
        expected: spec.kind.type_name(),
    };
    let non_finite = || PanelError::NonFinite(spec.name.clone());

    match (&spec.kind, value) {
        (ControlKind::Float { min, max }, ControlValue::Float(v)) => {
            if !v.is_finite() {
                return Err(non_finite());
            }
            Ok(ControlValue::Float(v.clamp(*min, *max)))
        }
        (ControlKind::Vec3 { min, max }, ControlValue::Vec3(v)) => {
            if !v.is_finite() {
                return Err(non_finite());
            }
            Ok(ControlValue::Vec3(v.clamp(Vec3::splat(*min), Vec3::splat(*max))))
        }
        (ControlKind::Bool, ControlValue::Bool(_)) => Ok(value),
        (ControlKind::Choice { options }, ControlValue::Choice(index)) => {
            if index < options.len() {
                Ok(value)
            } else {
                Err(PanelError::InvalidChoice {
                    control: spec.name.clone(),
                    index,
                    count: options.len(),
                })
            }
        }
        _ => Err(mismatch()),
    }
}

/// Write an already validated value into the state.
fn write(state: &mut SceneState, name: &str, value: ControlValue) -> Result<Change, PanelError> {
    let unknown = || PanelError::UnknownControl(name.to_string());
    let (group, field) = name.split_once('.').ok_or_else(unknown)?;

    match (group, value) {
        ("camera", value) => {
            let camera = &mut state.camera;
            match (field, value) {
                ("eye", ControlValue::Vec3(v)) => camera.set_eye(v),
                ("at", ControlValue::Vec3(v)) => camera.set_at(v),
                ("up", ControlValue::Vec3(v)) => {
                    if v.try_normalize().is_none() {
                        return Err(PanelError::DegenerateAxis(name.to_string()));
                    }
                    camera.set_up(v)
                }
                ("fovy", ControlValue::Float(v)) => camera.set_fovy(v),
                ("near", ControlValue::Float(v)) => camera.set_near(v),
                ("far", ControlValue::Float(v)) => camera.set_far(v),
                _ => return Err(unknown()),
            }
            Ok(Change::Camera)
        }
        ("material", ControlValue::Choice(index)) if field == "target" => {
            state.material_target = index;
            Ok(Change::Material(index))
        }
        ("material", value) => {
            let target = state.material_target;
            let material = state.target_material_mut().ok_or_else(unknown)?;
            match (field, value) {
                ("ka", ControlValue::Vec3(v)) => material.ka = Color::from_array(v.to_array()),
                ("kd", ControlValue::Vec3(v)) => material.kd = Color::from_array(v.to_array()),
                ("ks", ControlValue::Vec3(v)) => material.ks = Color::from_array(v.to_array()),
                ("shininess", ControlValue::Float(v)) => material.set_shininess(v),
                _ => return Err(unknown()),
            }
            Ok(Change::Material(target))
        }
        ("options", value) => {
            let options = &mut state.options;
            match (field, value) {
                ("culling", ControlValue::Bool(v)) => options.culling = v,
                ("depth_test", ControlValue::Bool(v)) => options.depth_test = v,
                ("headlamp", ControlValue::Bool(v)) => options.headlamp = v,
                ("footprint", ControlValue::Bool(v)) => options.footprint = v,
                ("light_space", ControlValue::Choice(i)) => {
                    options.light_space = LightSpace::from_index(i).ok_or_else(unknown)?;
                }
                ("shading", ControlValue::Choice(i)) => {
                    let mode = ShadingMode::from_index(i).ok_or_else(unknown)?;
                    state.dispatcher.set_mode(mode);
                }
                ("camera_mode", ControlValue::Choice(i)) => {
                    let mode = ControlMode::from_index(i).ok_or_else(unknown)?;
                    state.camera.set_mode(mode);
                }
                ("primitive", ControlValue::Choice(i)) => {
                    options.primitive = PrimitiveMode::from_index(i).ok_or_else(unknown)?;
                }
                _ => return Err(unknown()),
            }
            Ok(Change::Options)
        }
        (group, value) => {
            let index = group
                .strip_prefix("light")
                .and_then(|i| i.parse::<usize>().ok())
                .filter(|i| *i < EDITABLE_LIGHTS)
                .ok_or_else(unknown)?;
            let light = state.lights.get_mut(index).ok_or_else(unknown)?;
            match (field, value) {
                ("enabled", ControlValue::Bool(v)) => light.enabled = v,
                ("kind", ControlValue::Choice(i)) => {
                    light.set_kind(LightKind::from_index(i).ok_or_else(unknown)?)
                }
                ("position", ControlValue::Vec3(v)) => light.set_position(v),
                ("axis", ControlValue::Vec3(v)) => {
                    if !light.set_axis(v) {
                        return Err(PanelError::DegenerateAxis(name.to_string()));
                    }
                }
                ("aperture", ControlValue::Float(v)) => light.aperture = v,
                ("cutoff", ControlValue::Float(v)) => light.cutoff = v,
                ("ambient", ControlValue::Vec3(v)) => light.ambient = Color::from_array(v.to_array()),
                ("diffuse", ControlValue::Vec3(v)) => light.diffuse = Color::from_array(v.to_array()),
                ("specular", ControlValue::Vec3(v)) => light.specular = Color::from_array(v.to_array()),
                _ => return Err(unknown()),
            }
            Ok(Change::Light(index))
        }
    }
}
