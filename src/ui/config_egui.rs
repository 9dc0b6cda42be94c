use crate::galaxy::{GalaxyParameters, ParamEffect, RenderBackend, PARAM_SCHEMA};
use crate::overlay::OverlayStatus;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};
use rand::prelude::*;

pub struct ConfigEguiPlugin;

impl Plugin for ConfigEguiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, configure_visuals_system)
            .add_systems(Update, ui_system);
    }
}

fn configure_visuals_system(mut contexts: EguiContexts) {
    contexts.ctx_mut().set_visuals(egui::Visuals {
        window_corner_radius: 0.0.into(),
        ..Default::default()
    });
}

fn section_heading(effect: ParamEffect) -> &'static str {
    match effect {
        ParamEffect::Regenerate => "Structure",
        ParamEffect::Material => "Appearance",
        ParamEffect::PerFrame => "Motion",
    }
}

/// One slider per schema entry of the given effect. Only writes back on change
/// so an idle panel doesn't trip change detection.
fn schema_sliders(effect: ParamEffect, params: &mut ResMut<GalaxyParameters>, ui: &mut egui::Ui) {
    egui::CollapsingHeader::new(section_heading(effect))
        .default_open(true)
        .show(ui, |ui| {
            for spec in PARAM_SCHEMA.iter().filter(|spec| spec.effect == effect) {
                let mut value = params.get(spec.key);
                let slider = egui::Slider::new(&mut value, spec.min..=spec.max)
                    .step_by(spec.step)
                    .text(spec.label);
                if ui.add(slider).changed() {
                    params.set(spec.key, value);
                }
            }
        });
    ui.separator();
}

fn overlay_label(status: &OverlayStatus) -> String {
    match status {
        OverlayStatus::NotStarted => "not requested".to_string(),
        OverlayStatus::Loading => "loading...".to_string(),
        OverlayStatus::WaitingForGalaxy => "waiting for galaxy".to_string(),
        OverlayStatus::Applied { appended, skipped } if *skipped > 0 => {
            format!("{appended} points ({skipped} skipped)")
        }
        OverlayStatus::Applied { appended, .. } => format!("{appended} points"),
        OverlayStatus::Absent(_) => "none (procedural only)".to_string(),
    }
}

fn ui_system(
    mut contexts: EguiContexts,
    mut params: ResMut<GalaxyParameters>,
    overlay: Res<OverlayStatus>,
) {
    let ctx = contexts.ctx_mut();

    egui::SidePanel::left("side_panel")
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.heading("Galaxy");

            for effect in [ParamEffect::Regenerate, ParamEffect::Material, ParamEffect::PerFrame] {
                schema_sliders(effect, &mut params, ui);
            }

            let mut backend = params.backend;
            egui::ComboBox::from_label("Renderer")
                .selected_text(backend.label())
                .show_ui(ui, |ui| {
                    for option in RenderBackend::ALL {
                        ui.selectable_value(&mut backend, option, option.label());
                    }
                });
            if backend != params.backend {
                params.backend = backend;
            }

            ui.horizontal(|ui| {
                ui.label(format!("Seed {:#x}", params.seed));
                if ui.button("Reseed").clicked() {
                    params.seed = rand::rng().random();
                }
            });

            if let Err(err) = params.validate() {
                ui.colored_label(egui::Color32::LIGHT_RED, err.to_string());
            }

            ui.separator();
            ui.label(format!("Overlay: {}", overlay_label(&overlay)));
            if let OverlayStatus::Absent(reason) = &*overlay {
                ui.small(reason.as_str());
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_effect_has_a_section() {
        for spec in PARAM_SCHEMA.iter() {
            assert!(!section_heading(spec.effect).is_empty());
        }
    }

    #[test]
    fn overlay_label_mentions_skipped_records() {
        let label = overlay_label(&OverlayStatus::Applied {
            appended: 3,
            skipped: 1,
        });
        assert_eq!(label, "3 points (1 skipped)");
        assert_eq!(
            overlay_label(&OverlayStatus::Applied {
                appended: 3,
                skipped: 0
            }),
            "3 points"
        );
    }
}
