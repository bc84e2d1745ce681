//! Scene composition and per-frame planning.
//!
//! [`SceneState`] is the single owned struct holding everything the panel
//! can edit: camera, light rig, drawables and render options. Nothing here
//! is global, so any number of independent states can coexist (the tests
//! rely on that).
//!
//! Each frame, [`SceneState::plan_frame`] turns the state into a
//! [`FramePlan`]: the view and projection matrices, eye-space lights, and
//! one draw call per instance with fresh model-view and normal matrices.
//! The GPU renderer consumes the plan without looking at the state.

use glam::{Mat4, Quat, Vec3};

use crate::camera::{Camera, CameraController, ControllerSettings};
use crate::input::InputState;
use crate::light::{LightKind, LightRig, EDITABLE_LIGHTS};
use crate::lighting::EyeLight;
use crate::material::{Color, Material};
use crate::shading::ShadingDispatcher;
use crate::space::{derive_all, eye_to_world, DrawableMatrices, LightSpace};

/// Height the footprint disc floats above the ground to avoid z-fighting.
const FOOTPRINT_LIFT: f32 = 0.01;

// ============================================================================
// Scene Content
// ============================================================================

/// Geometry a drawable instance refers to. The GPU side owns the buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Unit square in XZ, normal +Y.
    Plane,
    /// Unit cube centered at the origin.
    Cube,
    /// Unit-radius sphere.
    Sphere,
    /// Unit-radius disc in XZ, normal +Y.
    Disc,
}

impl Shape {
    pub const ALL: [Shape; 4] = [Shape::Plane, Shape::Cube, Shape::Sphere, Shape::Disc];
}

/// How drawables are rasterized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    #[default]
    Triangles,
    Points,
}

impl PrimitiveMode {
    pub const ALL: [PrimitiveMode; 2] = [PrimitiveMode::Triangles, PrimitiveMode::Points];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveMode::Triangles => "triangles",
            PrimitiveMode::Points => "points",
        }
    }
}

/// A shape placed in the world with its own material.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawableInstance {
    /// Label shown in the panel's material target list.
    pub name: String,
    pub shape: Shape,
    /// Model matrix, fixed at scene-build time.
    pub transform: Mat4,
    pub material: Material,
}

impl DrawableInstance {
    pub fn new(name: impl Into<String>, shape: Shape, transform: Mat4, material: Material) -> Self {
        Self {
            name: name.into(),
            shape,
            transform,
            material,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub instances: Vec<DrawableInstance>,
}

impl Scene {
    /// Ground plane plus three objects, one with a non-uniform scale.
    pub fn demo() -> Self {
        let instances = vec![
            DrawableInstance::new(
                "ground",
                Shape::Plane,
                Mat4::from_scale(Vec3::new(20.0, 1.0, 20.0)),
                Material::ground(),
            ),
            DrawableInstance::new(
                "sphere",
                Shape::Sphere,
                Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)),
                Material::default(),
            ),
            DrawableInstance::new(
                "box",
                Shape::Cube,
                Mat4::from_scale_rotation_translation(
                    Vec3::new(1.2, 1.5, 0.8),
                    Quat::from_rotation_y(30f32.to_radians()),
                    Vec3::new(-2.5, 0.75, 1.0),
                ),
                Material::new(
                    Color::new(30.0, 50.0, 80.0),
                    Color::new(70.0, 120.0, 220.0),
                    Color::gray(180.0),
                    16.0,
                ),
            ),
            DrawableInstance::new(
                "ball",
                Shape::Sphere,
                Mat4::from_scale_rotation_translation(
                    Vec3::splat(0.6),
                    Quat::IDENTITY,
                    Vec3::new(2.5, 0.6, -1.0),
                ),
                Material::new(
                    Color::new(40.0, 70.0, 40.0),
                    Color::new(90.0, 200.0, 90.0),
                    Color::WHITE,
                    96.0,
                ),
            ),
        ];
        Self { instances }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

// ============================================================================
// Render Options
// ============================================================================

/// Global render switches edited from the panel.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    pub culling: bool,
    pub depth_test: bool,
    pub light_space: LightSpace,
    /// Pin spotlights to the eye (camera light space only).
    pub headlamp: bool,
    pub primitive: PrimitiveMode,
    /// Draw the footprint disc of the first enabled spotlight.
    pub footprint: bool,
    pub ground_y: f32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            culling: true,
            depth_test: true,
            light_space: LightSpace::World,
            headlamp: false,
            primitive: PrimitiveMode::Triangles,
            footprint: true,
            ground_y: 0.0,
        }
    }
}

// ============================================================================
// Spotlight Footprint
// ============================================================================

/// Disc where a spotlight's cone axis meets the ground.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    pub center: Vec3,
    pub radius: f32,
}

impl Footprint {
    /// Model matrix placing the unit disc on the ground.
    pub fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::new(self.radius, 1.0, self.radius),
            Quat::IDENTITY,
            self.center + Vec3::new(0.0, FOOTPRINT_LIFT, 0.0),
        )
    }
}

/// World-space footprint of a cone on the plane `y = ground_y`.
///
/// `None` when the axis does not point down toward the plane, the light is
/// at or below it, or the cone is 180 degrees or wider.
pub fn spot_footprint(position: Vec3, axis: Vec3, aperture: f32, ground_y: f32) -> Option<Footprint> {
    let axis = axis.try_normalize()?;
    if axis.y >= 0.0 || !(0.0..180.0).contains(&aperture) {
        return None;
    }
    let t = (ground_y - position.y) / axis.y;
    if t <= 0.0 || !t.is_finite() {
        return None;
    }
    Some(Footprint {
        center: position + axis * t,
        radius: t * (aperture * 0.5).to_radians().tan(),
    })
}

// ============================================================================
// Frame Planning
// ============================================================================

/// One draw: geometry, fresh matrices and the material to upload.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub shape: Shape,
    pub matrices: DrawableMatrices,
    pub material: Material,
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug)]
pub struct FramePlan {
    pub view: Mat4,
    pub projection: Mat4,
    pub lights: Vec<EyeLight>,
    pub draws: Vec<DrawCall>,
    pub footprint: Option<Footprint>,
}

/// The owned viewer state.
#[derive(Clone, Debug)]
pub struct SceneState {
    pub camera: CameraController,
    pub lights: LightRig,
    pub scene: Scene,
    pub options: RenderOptions,
    pub dispatcher: ShadingDispatcher,
    /// Instance whose material the panel edits.
    pub material_target: usize,
}

impl Default for SceneState {
    fn default() -> Self {
        Self::new(Camera::default(), ControllerSettings::default())
    }
}

impl SceneState {
    pub fn new(camera: Camera, settings: ControllerSettings) -> Self {
        Self {
            camera: CameraController::new(camera, settings),
            lights: LightRig::default(),
            scene: Scene::demo(),
            options: RenderOptions::default(),
            dispatcher: ShadingDispatcher::default(),
            material_target: 1,
        }
    }

    /// Material the panel currently edits, if the target is valid.
    pub fn target_material_mut(&mut self) -> Option<&mut Material> {
        self.scene
            .instances
            .get_mut(self.material_target)
            .map(|i| &mut i.material)
    }

    /// Run one frame of camera control against the polled input.
    pub fn advance(&mut self, input: &mut InputState, dt: f32) {
        self.camera.update(input, dt);
    }

    /// Eye-space lights for the current camera and light-space mode.
    pub fn eye_lights(&self) -> Vec<EyeLight> {
        derive_all(
            self.lights.iter(),
            &self.camera.view_matrix(),
            self.options.light_space,
            self.options.headlamp,
        )
    }

    /// Footprint of the first enabled editable spotlight.
    pub fn footprint(&self, view: &Mat4, lights: &[EyeLight]) -> Option<Footprint> {
        let light = lights
            .iter()
            .take(EDITABLE_LIGHTS)
            .find(|l| l.enabled && l.kind == LightKind::Spotlight)?;
        let (position, axis) = eye_to_world(light, view);
        spot_footprint(position.truncate(), axis, light.aperture, self.options.ground_y)
    }

    pub fn plan_frame(&self, aspect: f32) -> FramePlan {
        let view = self.camera.view_matrix();
        let projection = self.camera.camera().projection_matrix(aspect);
        let lights = self.eye_lights();

        let mut draws: Vec<DrawCall> = self
            .scene
            .instances
            .iter()
            .map(|instance| DrawCall {
                shape: instance.shape,
                matrices: DrawableMatrices::new(&view, &instance.transform),
                material: instance.material.clone(),
            })
            .collect();

        let footprint = if self.options.footprint {
            self.footprint(&view, &lights)
        } else {
            None
        };
        if let Some(footprint) = footprint.filter(|f| f.radius > 0.0) {
            draws.push(DrawCall {
                shape: Shape::Disc,
                matrices: DrawableMatrices::new(&view, &footprint.transform()),
                material: Material::overlay(),
            });
        }

        log::trace!(
            "Planned frame: {} draws, {} lights active",
            draws.len(),
            self.lights.active_count()
        );

        FramePlan {
            view,
            projection,
            lights,
            draws,
            footprint,
        }
    }
}
