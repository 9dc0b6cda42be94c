use crate::galaxy::GalaxyParameters;
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy_egui::EguiContexts;

const MIN_DISTANCE: f32 = 200.0;
const MAX_DISTANCE: f32 = 4000.0;
const ROTATE_SPEED: f32 = 0.005;

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, spawn_camera)
            .add_systems(PostUpdate, camera_control_system);
    }
}

fn spawn_camera(mut commands: Commands, mut clearcolor: ResMut<ClearColor>) {
    *clearcolor = ClearColor(Color::srgb(0.0, 0.0, 0.063));
    let camera_main = CameraMain::default();
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            near: 1.0,
            far: 20000.0,
            ..default()
        }),
        camera_main.transform(),
        camera_main,
    ));
}

/// Orbit camera around `target_pos`
#[derive(Component, Clone)]
pub struct CameraMain {
    target_pos: Vec3,
    yaw: f32,
    pitch: f32,
    /// 0 = closest, 1 = furthest
    zoom: f32,
    smooth_zoom_buffer: f32,
}

impl Default for CameraMain {
    fn default() -> Self {
        Self {
            target_pos: Vec3::ZERO,
            yaw: std::f32::consts::FRAC_PI_2,
            pitch: std::f32::consts::FRAC_PI_6,
            zoom: Self::zoom_for_distance(2500.0),
            smooth_zoom_buffer: 0.0,
        }
    }
}

impl CameraMain {
    fn zoom_for_distance(distance: f32) -> f32 {
        ((distance - MIN_DISTANCE) / (MAX_DISTANCE - MIN_DISTANCE)).clamp(0.0, 1.0)
    }

    fn distance(&self) -> f32 {
        MIN_DISTANCE + (MAX_DISTANCE - MIN_DISTANCE) * self.zoom
    }

    fn translation(&self) -> Vec3 {
        let offset = Quat::from_euler(EulerRot::YXZ, self.yaw, -self.pitch, 0.0) * Vec3::Z;
        self.target_pos + offset * self.distance()
    }

    fn transform(&self) -> Transform {
        Transform::from_translation(self.translation()).looking_at(self.target_pos, Vec3::Y)
    }
}

pub fn camera_control_system(
    mut query: Query<(&mut Transform, &mut CameraMain)>,
    keys: Res<ButtonInput<KeyCode>>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    time: Res<Time>,
    params: Res<GalaxyParameters>,
    mut scroll_evr: EventReader<MouseWheel>,
    mut motion_evr: EventReader<MouseMotion>,
    mut contexts: EguiContexts,
) {
    let Ok((mut transform, mut camera_main)) = query.single_mut() else {
        return;
    };

    // the config panel owns the pointer while hovered
    let pointer_on_ui = contexts
        .try_ctx_mut()
        .is_some_and(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area());
    if pointer_on_ui {
        scroll_evr.clear();
        motion_evr.clear();
    }

    if mouse_buttons.pressed(MouseButton::Left) {
        for ev in motion_evr.read() {
            camera_main.yaw -= ev.delta.x * ROTATE_SPEED;
            camera_main.pitch += ev.delta.y * ROTATE_SPEED;
        }
        camera_main.pitch = camera_main.pitch.clamp(-1.5, 1.5);
    } else {
        motion_evr.clear();
    }

    // key delta, relative to the camera heading
    let mut key_delta = Vec3::ZERO;
    if keys.pressed(KeyCode::KeyW) {
        key_delta.z -= 1.0;
    }
    if keys.pressed(KeyCode::KeyA) {
        key_delta.x -= 1.0;
    }
    if keys.pressed(KeyCode::KeyS) {
        key_delta.z += 1.0;
    }
    if keys.pressed(KeyCode::KeyD) {
        key_delta.x += 1.0;
    }
    let heading = Quat::from_rotation_y(camera_main.yaw);

    // scroll delta is cached to a buffer
    // buffer is converted to actual zoom over time for a smooth zooming effect
    for ev in scroll_evr.read() {
        let step = match ev.unit {
            MouseScrollUnit::Line => 0.05,
            MouseScrollUnit::Pixel => 0.002,
        };
        camera_main.smooth_zoom_buffer += ev.y * step;
    }

    let smooth_zoom_min = 0.001f32;
    let smooth_zoom_factor = 0.2f32;

    let smooth_zoom_amount = if camera_main.smooth_zoom_buffer < 0.0 {
        f32::min(
            camera_main.smooth_zoom_buffer * smooth_zoom_factor,
            (-smooth_zoom_min).max(camera_main.smooth_zoom_buffer),
        )
    } else {
        f32::max(
            camera_main.smooth_zoom_buffer * smooth_zoom_factor,
            smooth_zoom_min.min(camera_main.smooth_zoom_buffer),
        )
    };
    camera_main.zoom -= smooth_zoom_amount;
    camera_main.smooth_zoom_buffer -= smooth_zoom_amount;
    camera_main.zoom = camera_main.zoom.clamp(0., 1.);

    let speed = camera_main.distance() * 0.5 * time.delta_secs();
    camera_main.target_pos += heading * key_delta * speed;

    // keep the pivot inside the galaxy
    let d = camera_main.target_pos.length();
    if d > params.radius {
        camera_main.target_pos *= params.radius / d;
    }

    *transform = camera_main.transform();
}
