use crate::galaxy::{GalaxyBuilder, GalaxyBuilt, StarBuildTask};
use crate::overlay::OverlayStatus;
use bevy::diagnostic::DiagnosticsStore;
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;

pub struct StatusWidgetPlugin;

impl Plugin for StatusWidgetPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LastBuild>()
            .add_systems(Startup, setup_widget)
            .add_systems(Update, (track_builds, update_widget_system).chain())
            .add_plugins(FrameTimeDiagnosticsPlugin::default());
    }
}

#[derive(Component, Clone, Copy)]
enum StatusLine {
    Fps,
    Stars,
    Overlay,
}

#[derive(Resource, Default)]
struct LastBuild(Option<GalaxyBuilt>);

fn setup_widget(mut commands: Commands) {
    commands
        .spawn((
            Node {
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::FlexStart,
                position_type: PositionType::Absolute,
                justify_content: JustifyContent::FlexStart,
                width: Val::Px(260.),
                right: Val::Percent(1.),
                top: Val::Percent(1.),
                bottom: Val::Auto,
                left: Val::Auto,
                padding: UiRect::all(Val::Px(4.0)),
                ..default()
            },
            BackgroundColor(Color::linear_rgba(0.0, 0.03, 0.08, 0.5)),
            GlobalZIndex(i32::MAX - 1),
        ))
        .with_children(|parent| {
            for line in [StatusLine::Fps, StatusLine::Stars, StatusLine::Overlay] {
                parent.spawn((
                    line,
                    Text(" N/A".to_string()),
                    TextFont {
                        font_size: 14.0,
                        ..default()
                    },
                    Node {
                        padding: UiRect::all(Val::Px(2.0)),
                        ..default()
                    },
                ));
            }
        });
}

fn track_builds(mut built: EventReader<GalaxyBuilt>, mut last: ResMut<LastBuild>) {
    if let Some(build) = built.read().last() {
        last.0 = Some(*build);
    }
}

fn stars_line(builder: &GalaxyBuilder, last: Option<&GalaxyBuilt>, building: bool) -> String {
    let generation = last.map_or("-".to_string(), |b| b.generation.to_string());
    let suffix = if building { " (rebuilding)" } else { "" };
    format!(
        "Stars: {} + {} overlay  gen {}{}",
        builder.structural_len(),
        builder.overlay_len(),
        generation,
        suffix
    )
}

fn update_widget_system(
    diagnostics: Res<DiagnosticsStore>,
    builder: Res<GalaxyBuilder>,
    build_task: Res<StarBuildTask>,
    last: Res<LastBuild>,
    overlay: Res<OverlayStatus>,
    mut query: Query<(&mut Text, &StatusLine)>,
) {
    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|fps| fps.smoothed())
        .unwrap_or(0.0);
    let frame_time = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FRAME_TIME)
        .and_then(|fps| fps.smoothed())
        .unwrap_or(0.0);

    for (mut text, line) in &mut query {
        text.0 = match line {
            StatusLine::Fps => format!("FPS: {fps:.1} ({frame_time:.2} ms)"),
            StatusLine::Stars => stars_line(&builder, last.0.as_ref(), build_task.in_flight()),
            StatusLine::Overlay => match &*overlay {
                OverlayStatus::Applied { appended, .. } => format!("Overlay: {appended} points"),
                OverlayStatus::Absent(_) => "Overlay: none".to_string(),
                _ => "Overlay: pending".to_string(),
            },
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::galaxy::GalaxyParameters;

    #[test]
    fn stars_line_reports_both_layers() {
        let mut builder = GalaxyBuilder::default();
        let params = GalaxyParameters {
            star_count: 500,
            ..default()
        };
        builder.regenerate(&params).unwrap();
        let built = GalaxyBuilt {
            generation: 1,
            star_count: 500,
        };

        assert_eq!(
            stars_line(&builder, Some(&built), false),
            "Stars: 500 + 0 overlay  gen 1"
        );
        assert!(stars_line(&builder, None, true).ends_with("gen - (rebuilding)"));
    }
}
