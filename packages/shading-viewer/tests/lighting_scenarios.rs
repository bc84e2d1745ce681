//! End-to-end lighting checks through the public API.

use approx::assert_relative_eq;
use glam::{Vec2, Vec3, Vec4};

use shading_viewer::camera::{Camera, CameraController, ControlMode, ControllerSettings};
use shading_viewer::light::{Light, LightKind};
use shading_viewer::lighting::{self, EyeLight};
use shading_viewer::material::{Color, Material};
use shading_viewer::scene::SceneState;
use shading_viewer::shading::{ShadingDispatcher, ShadingMode, SurfaceVertex};
use shading_viewer::space::LightSpace;

fn assert_color_eq(a: Vec4, b: Vec4, epsilon: f32) {
    for i in 0..4 {
        assert_relative_eq!(a[i], b[i], epsilon = epsilon);
    }
}

fn eye(light: Light) -> EyeLight {
    EyeLight::from_authored(&light.enabled())
}

#[test]
fn disabled_light_contributes_nothing_even_when_malformed() {
    let mut light = EyeLight::from_authored(&Light::spotlight(Vec3::ZERO, Vec3::NEG_Z, 30.0, 2.0));
    light.enabled = false;
    light.position = Vec4::new(f32::NAN, 0.0, f32::INFINITY, 1.0);
    light.axis = Vec3::ZERO;
    light.aperture = f32::NAN;
    light.cutoff = -5.0;

    let c = lighting::light_contribution(&light, Vec3::new(0.0, 0.0, -3.0), Vec3::Z, &Material::default());
    assert_eq!(c, Vec3::ZERO);

    let shaded = lighting::shade(&[light], Vec3::new(0.0, 0.0, -3.0), Vec3::Z, &Material::default());
    assert_eq!(shaded, Vec4::new(0.0, 0.0, 0.0, 1.0));
}

#[test]
fn directional_light_ignores_surface_position() {
    let light = eye(Light::directional(Vec3::new(0.3, -1.0, -0.5)));
    let material = Material::new(Color::gray(50.0), Color::gray(200.0), Color::BLACK, 16.0);
    let n = Vec3::Y;

    let a = lighting::shade(std::slice::from_ref(&light), Vec3::new(0.0, 0.0, -2.0), n, &material);
    let b = lighting::shade(std::slice::from_ref(&light), Vec3::new(40.0, -7.0, -90.0), n, &material);
    assert_color_eq(a, b, 1e-6);
}

#[test]
fn spot_boundary_is_inclusive() {
    let cos_aperture = 20.0_f32.to_radians().cos();
    let s = lighting::spot_attenuation(cos_aperture, cos_aperture, 3.0);
    assert_relative_eq!(s, cos_aperture.powf(3.0), epsilon = 1e-6);
    assert!(s > 0.0);
}

#[test]
fn spot_facing_away_is_exactly_zero() {
    // Sample at origin, light above it pointing further away
    let light = eye(Light::spotlight(Vec3::new(0.0, 0.0, 10.0), Vec3::Z, 359.0, 0.5));
    let terms = lighting::light_terms(&light, Vec3::ZERO, Vec3::Z, &Material::default());
    assert_eq!(terms.attenuation, 0.0);
    assert_eq!(terms.total(), Vec3::ZERO);
}

#[test]
fn gouraud_and_phong_agree_at_vertices() {
    let lights = vec![
        eye(Light::point(Vec3::new(2.0, 3.0, 1.0))),
        eye(Light::spotlight(Vec3::new(0.0, 4.0, -4.0), Vec3::NEG_Y, 60.0, 2.0)),
        eye(Light::directional(Vec3::new(-0.2, -1.0, -0.4))),
    ];
    let material = Material::default();
    let triangle = [
        SurfaceVertex::new(Vec3::new(-1.0, 0.0, -5.0), Vec3::new(-0.3, 1.0, 0.1)),
        SurfaceVertex::new(Vec3::new(1.0, 0.0, -5.0), Vec3::new(0.3, 1.0, 0.1)),
        SurfaceVertex::new(Vec3::new(0.0, 0.5, -6.0), Vec3::new(0.0, 1.0, -0.4)),
    ];

    let phong = ShadingDispatcher::new(ShadingMode::Phong);
    let gouraud = ShadingDispatcher::new(ShadingMode::Gouraud);
    for corner in [Vec3::X, Vec3::Y, Vec3::Z] {
        let a = phong.shade_triangle(&triangle, corner, &lights, &material);
        let b = gouraud.shade_triangle(&triangle, corner, &lights, &material);
        assert_color_eq(a, b, 1e-5);
    }
}

#[test]
fn light_space_is_irrelevant_at_canonical_pose() {
    let mut state = SceneState::new(Camera::canonical(), ControllerSettings::default());
    state.options.headlamp = false;
    for i in 0..3 {
        if let Some(light) = state.lights.get_mut(i) {
            light.enabled = true;
        }
    }

    state.options.light_space = LightSpace::World;
    let world = state.plan_frame(1.0);
    state.options.light_space = LightSpace::Camera;
    let camera = state.plan_frame(1.0);

    for (a, b) in world.lights.iter().zip(&camera.lights) {
        assert!(a.position.abs_diff_eq(b.position, 1e-6));
        assert!(a.axis.abs_diff_eq(b.axis, 1e-6));
    }

    let samples = [
        (Vec3::new(0.0, -1.0, -4.0), Vec3::Y),
        (Vec3::new(1.5, 0.5, -6.0), Vec3::new(0.2, 0.4, 1.0)),
    ];
    for (p, n) in samples {
        for draw in &world.draws {
            let a = lighting::shade(&world.lights, p, n, &draw.material);
            let b = lighting::shade(&camera.lights, p, n, &draw.material);
            assert_color_eq(a, b, 1e-6);
        }
    }
}

#[test]
fn reset_restores_bit_identical_pose() {
    let mut controller = CameraController::new(Camera::default(), ControllerSettings::default());
    let start = controller.camera().clone();

    controller.orbit(Vec2::new(37.0, -12.5));
    controller.set_mode(ControlMode::FreeFly);
    controller.fly(Vec3::new(1.0, 0.3, 1.0), 0.7);
    controller.set_mode(ControlMode::Look);
    controller.look(Vec2::new(-80.0, 22.0));
    controller.orbit(Vec2::new(3.0, 90.0));
    assert_ne!(controller.camera().eye, start.eye);

    controller.reset();
    let end = controller.camera();
    assert_eq!(end.eye.to_array().map(f32::to_bits), start.eye.to_array().map(f32::to_bits));
    assert_eq!(end.at.to_array().map(f32::to_bits), start.at.to_array().map(f32::to_bits));
    assert_eq!(end.up.to_array().map(f32::to_bits), start.up.to_array().map(f32::to_bits));
}

#[test]
fn head_on_point_light_saturates() {
    let gray = Color::gray(120.0);
    let light = eye(Light::point(Vec3::new(0.0, 0.0, 10.0)).with_colors(gray, gray, gray));
    let material = Material::uniform(Color::WHITE, 1.0);

    let terms = lighting::light_terms(&light, Vec3::ZERO, Vec3::Z, &material);
    assert_relative_eq!(terms.ambient.x, 120.0 / 255.0, epsilon = 1e-5);
    assert_relative_eq!(terms.diffuse.x, 120.0 / 255.0, epsilon = 1e-5);
    assert_relative_eq!(terms.specular.x, 120.0 / 255.0, epsilon = 1e-5);

    let shaded = lighting::shade(&[light], Vec3::ZERO, Vec3::Z, &material);
    assert_eq!(shaded, Vec4::ONE);
}

#[test]
fn zero_aperture_spot_lights_only_its_axis() {
    let light = eye(Light::spotlight(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z, 0.0, 1.0));
    assert_eq!(light.kind, LightKind::Spotlight);
    let material = Material::default();

    let on_axis = lighting::light_terms(&light, Vec3::ZERO, Vec3::Z, &material);
    assert_eq!(on_axis.attenuation, 1.0);

    for p in [Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.0, -0.1, 0.0), Vec3::new(3.0, 3.0, 0.0)] {
        let c = lighting::light_contribution(&light, p, Vec3::Z, &material);
        assert_eq!(c, Vec3::ZERO, "off-axis sample {:?} was lit", p);
    }
}
