use super::error::{GalaxyError, Result};
use bevy::prelude::*;

/// Which backend turns the point collection into renderables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderBackend {
    /// Additive camera-facing billboards, one instanced quad per point.
    #[default]
    Points,
    /// One small emissive sphere mesh per point.
    Spheres,
}

impl RenderBackend {
    pub const ALL: [RenderBackend; 2] = [RenderBackend::Points, RenderBackend::Spheres];

    pub fn label(self) -> &'static str {
        match self {
            RenderBackend::Points => "Points",
            RenderBackend::Spheres => "Spheres",
        }
    }
}

#[derive(Resource, Clone, Debug, PartialEq)]
pub struct GalaxyParameters {
    pub star_count: u32,
    pub radius: f32,
    /// Vertical thickness of the disk at its centre
    pub depth: f32,
    pub arms: u32,
    pub twist: f32,
    pub point_size: f32,
    pub brightness: f32,
    /// Radians added to the galaxy yaw each frame
    pub rotation_speed: f32,
    /// Azimuthal spread around each arm
    pub density: f32,

    pub seed: u64,
    pub backend: RenderBackend,
}

impl Default for GalaxyParameters {
    fn default() -> Self {
        Self {
            star_count: 2000,
            radius: 1500.0,
            depth: 600.0,
            arms: 6,
            twist: 5.0,
            point_size: 10.0,
            brightness: 1.2,
            rotation_speed: 0.0003,
            density: 0.25,
            seed: 0x5EED_6A1A,
            backend: RenderBackend::Points,
        }
    }
}

impl GalaxyParameters {
    /// Rejects structural values that would produce degenerate geometry.
    pub fn validate(&self) -> Result<()> {
        if self.arms == 0 {
            return Err(GalaxyError::invalid("arms", "at least one spiral arm is required"));
        }
        let finite_non_negative = [
            ("radius", self.radius),
            ("depth", self.depth),
            ("density", self.density),
        ];
        for (name, value) in finite_non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(GalaxyError::invalid(
                    name,
                    format!("expected a finite value >= 0, got {value}"),
                ));
            }
        }
        if !self.twist.is_finite() {
            return Err(GalaxyError::invalid("twist", "expected a finite value"));
        }
        Ok(())
    }

    pub fn get(&self, key: ParamKey) -> f64 {
        match key {
            ParamKey::StarCount => self.star_count as f64,
            ParamKey::Radius => self.radius as f64,
            ParamKey::Depth => self.depth as f64,
            ParamKey::Arms => self.arms as f64,
            ParamKey::Twist => self.twist as f64,
            ParamKey::PointSize => self.point_size as f64,
            ParamKey::Brightness => self.brightness as f64,
            ParamKey::RotationSpeed => self.rotation_speed as f64,
            ParamKey::Density => self.density as f64,
        }
    }

    pub fn set(&mut self, key: ParamKey, value: f64) {
        match key {
            ParamKey::StarCount => self.star_count = value.round().max(0.0) as u32,
            ParamKey::Radius => self.radius = value as f32,
            ParamKey::Depth => self.depth = value as f32,
            ParamKey::Arms => self.arms = value.round().max(0.0) as u32,
            ParamKey::Twist => self.twist = value as f32,
            ParamKey::PointSize => self.point_size = value as f32,
            ParamKey::Brightness => self.brightness = value as f32,
            ParamKey::RotationSpeed => self.rotation_speed = value as f32,
            ParamKey::Density => self.density = value as f32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKey {
    StarCount,
    Radius,
    Depth,
    Arms,
    Twist,
    PointSize,
    Brightness,
    RotationSpeed,
    Density,
}

/// What has to happen when a parameter changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamEffect {
    /// Geometry changes, the whole point set is rebuilt
    Regenerate,
    /// Only the shared display material is touched
    Material,
    /// Read by the frame loop, nothing to do on change
    PerFrame,
}

#[derive(Clone, Copy, Debug)]
pub struct ParamSpec {
    pub key: ParamKey,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub effect: ParamEffect,
}

pub const PARAM_SCHEMA: [ParamSpec; 9] = [
    ParamSpec {
        key: ParamKey::StarCount,
        label: "Star Count",
        min: 500.0,
        max: 10000.0,
        step: 500.0,
        effect: ParamEffect::Regenerate,
    },
    ParamSpec {
        key: ParamKey::Radius,
        label: "Radius",
        min: 500.0,
        max: 3000.0,
        step: 100.0,
        effect: ParamEffect::Regenerate,
    },
    ParamSpec {
        key: ParamKey::Depth,
        label: "Depth",
        min: 100.0,
        max: 1200.0,
        step: 50.0,
        effect: ParamEffect::Regenerate,
    },
    ParamSpec {
        key: ParamKey::Arms,
        label: "Spiral Arms",
        min: 2.0,
        max: 12.0,
        step: 1.0,
        effect: ParamEffect::Regenerate,
    },
    ParamSpec {
        key: ParamKey::Twist,
        label: "Twist",
        min: 0.0,
        max: 10.0,
        step: 0.5,
        effect: ParamEffect::Regenerate,
    },
    ParamSpec {
        key: ParamKey::PointSize,
        label: "Point Size",
        min: 2.0,
        max: 20.0,
        step: 1.0,
        effect: ParamEffect::Material,
    },
    ParamSpec {
        key: ParamKey::Brightness,
        label: "Brightness",
        min: 0.5,
        max: 2.0,
        step: 0.1,
        effect: ParamEffect::Material,
    },
    ParamSpec {
        key: ParamKey::RotationSpeed,
        label: "Rotation Speed",
        min: 0.0,
        max: 0.002,
        step: 0.0001,
        effect: ParamEffect::PerFrame,
    },
    ParamSpec {
        key: ParamKey::Density,
        label: "Density",
        min: 0.05,
        max: 0.6,
        step: 0.05,
        effect: ParamEffect::Regenerate,
    },
];

impl ParamKey {
    pub fn spec(self) -> &'static ParamSpec {
        PARAM_SCHEMA
            .iter()
            .find(|spec| spec.key == self)
            .unwrap_or_else(|| unreachable!("every ParamKey has a schema entry"))
    }
}

/// Outcome of diffing two parameter sets against the schema.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParamChanges {
    pub regenerate: bool,
    pub material: bool,
}

impl ParamChanges {
    pub const ALL: Self = Self {
        regenerate: true,
        material: true,
    };

    pub fn between(old: &GalaxyParameters, new: &GalaxyParameters) -> Self {
        let mut changes = Self {
            regenerate: old.seed != new.seed,
            material: false,
        };
        for spec in PARAM_SCHEMA.iter() {
            if old.get(spec.key) == new.get(spec.key) {
                continue;
            }
            match spec.effect {
                ParamEffect::Regenerate => changes.regenerate = true,
                ParamEffect::Material => changes.material = true,
                ParamEffect::PerFrame => {}
            }
        }
        changes
    }
}

/// Sent when a structural parameter changed and the point set must be rebuilt.
#[derive(Event, Clone, Copy, Debug)]
pub struct RegenerateRequested;

/// Sent when only visual parameters (point size, brightness) changed.
#[derive(Event, Clone, Copy, Debug)]
pub struct VisualParamsChanged;

#[derive(Resource, Default)]
struct GalaxyParametersOld(Option<GalaxyParameters>);

pub struct GalaxyParamsPlugin;

impl Plugin for GalaxyParamsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GalaxyParameters>()
            .init_resource::<GalaxyParametersOld>()
            .add_event::<RegenerateRequested>()
            .add_event::<VisualParamsChanged>()
            .add_systems(Update, apply_param_updates.in_set(super::GalaxySet::Params));
    }
}

fn apply_param_updates(
    params: Res<GalaxyParameters>,
    mut params_old: ResMut<GalaxyParametersOld>,
    mut regenerate: EventWriter<RegenerateRequested>,
    mut visual: EventWriter<VisualParamsChanged>,
) {
    if !params.is_changed() {
        return;
    }
    let changes = match &params_old.0 {
        Some(old) if *old == *params => return,
        Some(old) => ParamChanges::between(old, &params),
        None => ParamChanges::ALL,
    };

    if changes.regenerate {
        regenerate.write(RegenerateRequested);
    }
    if changes.material {
        visual.write(VisualParamsChanged);
    }
    params_old.0 = Some(params.clone());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_lists_every_key_once() {
        let keys = [
            ParamKey::StarCount,
            ParamKey::Radius,
            ParamKey::Depth,
            ParamKey::Arms,
            ParamKey::Twist,
            ParamKey::PointSize,
            ParamKey::Brightness,
            ParamKey::RotationSpeed,
            ParamKey::Density,
        ];
        for key in keys {
            let hits = PARAM_SCHEMA.iter().filter(|spec| spec.key == key).count();
            assert_eq!(hits, 1, "{key:?}");
        }
    }

    #[test]
    fn defaults_sit_inside_declared_ranges() {
        let params = GalaxyParameters::default();
        for spec in PARAM_SCHEMA.iter() {
            let value = params.get(spec.key);
            assert!(
                value >= spec.min && value <= spec.max,
                "{} = {value} outside {}..={}",
                spec.label,
                spec.min,
                spec.max
            );
        }
        assert!(params.validate().is_ok());
    }

    #[test]
    fn set_rounds_integer_fields() {
        let mut params = GalaxyParameters::default();
        params.set(ParamKey::Arms, 6.6);
        params.set(ParamKey::StarCount, 1499.5);
        assert_eq!(params.arms, 7);
        assert_eq!(params.star_count, 1500);
        assert_eq!(params.get(ParamKey::Arms), 7.0);
    }

    #[test]
    fn structural_and_visual_changes_are_classified() {
        let old = GalaxyParameters::default();

        let mut new = old.clone();
        new.twist = 7.5;
        assert_eq!(
            ParamChanges::between(&old, &new),
            ParamChanges {
                regenerate: true,
                material: false
            }
        );

        let mut new = old.clone();
        new.point_size = 4.0;
        new.brightness = 2.0;
        assert_eq!(
            ParamChanges::between(&old, &new),
            ParamChanges {
                regenerate: false,
                material: true
            }
        );

        let mut new = old.clone();
        new.rotation_speed = 0.001;
        new.backend = RenderBackend::Spheres;
        assert_eq!(ParamChanges::between(&old, &new), ParamChanges::default());

        let mut new = old.clone();
        new.seed += 1;
        assert!(ParamChanges::between(&old, &new).regenerate);
    }

    #[test]
    fn zero_arms_is_rejected() {
        let params = GalaxyParameters {
            arms: 0,
            ..default()
        };
        assert!(matches!(
            params.validate(),
            Err(GalaxyError::InvalidParameter { name: "arms", .. })
        ));
    }

    #[test]
    fn negative_or_nan_extent_is_rejected() {
        let params = GalaxyParameters {
            radius: -1.0,
            ..default()
        };
        assert!(params.validate().is_err());

        let params = GalaxyParameters {
            depth: f32::NAN,
            ..default()
        };
        assert!(params.validate().is_err());

        let params = GalaxyParameters {
            radius: 0.0,
            ..default()
        };
        assert!(params.validate().is_ok());
    }
}
