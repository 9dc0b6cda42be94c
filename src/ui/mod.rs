use bevy::prelude::*;

mod camera;
mod config_egui;
mod status_widget;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            camera::CameraPlugin,
            config_egui::ConfigEguiPlugin,
            status_widget::StatusWidgetPlugin,
        ));
    }
}
