use super::error::Result;
use super::GalaxyParameters;
use bevy::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::f32::consts::{PI, TAU};

/// Exponent applied to the uniform radial draw. Below 1 the distribution
/// leans outward, leaving a dense but not collapsed core.
pub const RADIAL_CONCENTRATION: f32 = 0.8;

/// Azimuthal spread (radians) around an arm at density 1.0
const ARM_SPREAD: f32 = PI * 0.5;

/// Shifts the arm assignment of overlaid clusters so they don't line up.
const CLUSTER_ARM_STRIDE: i64 = 137;

pub const STAR_PALETTE: [Vec3; 4] = [
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(0.85, 0.9, 1.0),
    Vec3::new(0.8, 0.85, 1.0),
    Vec3::new(1.0, 0.95, 0.9),
];

/// Per-channel darkening at the rim. Red fades least, so the outskirts trend blue-grey.
pub const RADIAL_FALLOFF: Vec3 = Vec3::new(0.15, 0.25, 0.45);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StarPoint {
    pub position: Vec3,
    pub color: Vec4,
    /// Overlay cluster id, `None` for procedural stars
    pub cluster: Option<i64>,
}

/// Validated view of the structural parameters, shared by every point of one build.
#[derive(Clone, Copy, Debug)]
pub struct SpiralLayout {
    arms: u32,
    radius: f32,
    depth: f32,
    twist: f32,
    density: f32,
}

impl SpiralLayout {
    pub fn new(params: &GalaxyParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            arms: params.arms,
            radius: params.radius,
            depth: params.depth,
            twist: params.twist,
            density: params.density,
        })
    }

    /// Any index and cluster id is valid; the sum is taken in i128 so it can't overflow.
    pub fn arm_index(&self, index: u32, cluster: Option<i64>) -> u32 {
        let shifted = index as i128 + cluster.unwrap_or(0) as i128 * CLUSTER_ARM_STRIDE as i128;
        shifted.rem_euclid(self.arms as i128) as u32
    }

    pub fn base_angle(&self, arm_index: u32) -> f32 {
        arm_index as f32 / self.arms as f32 * TAU
    }

    /// Radial distance scaled to the unit galaxy. Zero radius maps everything to the centre.
    pub fn normalized_radius(&self, r: f32) -> f32 {
        if self.radius > 0.0 {
            (r / self.radius).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn winding(&self, t: f32) -> f32 {
        t * self.twist * PI
    }

    pub fn place<R: Rng + ?Sized>(&self, index: u32, cluster: Option<i64>, rng: &mut R) -> StarPoint {
        let arm = self.arm_index(index, cluster);

        let r = rng.random::<f32>().powf(RADIAL_CONCENTRATION) * self.radius;
        let t = self.normalized_radius(r);

        let jitter = (rng.random::<f32>() - 0.5) * self.density * ARM_SPREAD;
        let theta = self.base_angle(arm) + self.winding(t) + jitter;

        // thinner toward the rim
        let height = (rng.random::<f32>() - 0.5) * self.depth * (1.0 - t);

        let position = vec3(theta.cos() * r, height, theta.sin() * r);
        let color = star_color(STAR_PALETTE[rng.random_range(0..STAR_PALETTE.len())], t);

        StarPoint {
            position,
            color,
            cluster,
        }
    }
}

pub fn star_color(base: Vec3, t: f32) -> Vec4 {
    let t = t.clamp(0.0, 1.0);
    let shade = (Vec3::ONE - RADIAL_FALLOFF * t).clamp(Vec3::ZERO, Vec3::ONE);
    (base * shade).clamp(Vec3::ZERO, Vec3::ONE).extend(1.0)
}

/// Places a single star. Prefer [`SpiralLayout::place`] in loops, this re-validates every call.
pub fn generate_star<R: Rng + ?Sized>(
    index: u32,
    cluster: Option<i64>,
    params: &GalaxyParameters,
    rng: &mut R,
) -> Result<StarPoint> {
    Ok(SpiralLayout::new(params)?.place(index, cluster, rng))
}

/// Independent random stream for one point, so parallel builds stay reproducible.
pub fn point_rng(seed: u64, index: u32) -> StdRng {
    StdRng::seed_from_u64(seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::galaxy::error::GalaxyError;

    fn params() -> GalaxyParameters {
        GalaxyParameters {
            star_count: 500,
            arms: 6,
            radius: 1500.0,
            twist: 5.0,
            depth: 600.0,
            density: 0.25,
            ..default()
        }
    }

    #[test]
    fn same_seed_same_point() {
        let params = params();
        for index in [0, 1, 17, 4096] {
            let a = generate_star(index, None, &params, &mut point_rng(42, index)).unwrap();
            let b = generate_star(index, None, &params, &mut point_rng(42, index)).unwrap();
            assert_eq!(a.position.to_array().map(f32::to_bits), b.position.to_array().map(f32::to_bits));
            assert_eq!(a.color.to_array().map(f32::to_bits), b.color.to_array().map(f32::to_bits));
        }
    }

    #[test]
    fn points_stay_inside_the_disk() {
        let params = params();
        let layout = SpiralLayout::new(&params).unwrap();
        for index in 0..5000 {
            let star = layout.place(index, None, &mut point_rng(7, index));
            let planar = star.position.xz().length();
            assert!(planar <= params.radius * (1.0 + 1e-5), "r = {planar}");
            assert!(star.position.y.abs() <= params.depth * 0.5);
        }
    }

    #[test]
    fn arm_index_is_in_range() {
        let layout = SpiralLayout::new(&params()).unwrap();
        for index in 0..1000 {
            assert_eq!(layout.arm_index(index, None), index % 6);
        }
        for cluster in [-5, -1, 0, 3, 1_000_000] {
            for index in 0..50 {
                assert!(layout.arm_index(index, Some(cluster)) < 6);
            }
        }
    }

    #[test]
    fn extreme_cluster_ids_do_not_overflow() {
        let params = params();
        let layout = SpiralLayout::new(&params).unwrap();
        for cluster in [i64::MAX, i64::MIN, i64::MIN + 1] {
            for index in [0, 200, u32::MAX] {
                assert!(layout.arm_index(index, Some(cluster)) < 6);
                let star = generate_star(index, Some(cluster), &params, &mut point_rng(3, index)).unwrap();
                assert!(star.position.is_finite());
            }
        }
        // (1 + 137 * -1) mod 6 = -136 mod 6 = 2
        assert_eq!(layout.arm_index(1, Some(-1)), 2);
    }

    #[test]
    fn colors_stay_in_range_across_the_radius() {
        for base in STAR_PALETTE {
            for step in 0..=100 {
                let color = star_color(base, step as f32 / 100.0);
                for channel in color.to_array() {
                    assert!((0.0..=1.0).contains(&channel));
                }
                assert_eq!(color.w, 1.0);
            }
        }
        // outer stars are dimmer than the core
        let core = star_color(Vec3::ONE, 0.0);
        let rim = star_color(Vec3::ONE, 1.0);
        assert!(rim.z < rim.x && rim.x < core.x);
    }

    #[test]
    fn zero_radius_collapses_to_centre() {
        let params = GalaxyParameters {
            radius: 0.0,
            ..params()
        };
        let layout = SpiralLayout::new(&params).unwrap();
        assert_eq!(layout.normalized_radius(0.0), 0.0);
        let star = layout.place(3, None, &mut point_rng(1, 3));
        assert!(star.position.is_finite());
        assert_eq!(star.position.xz(), Vec2::ZERO);
    }

    #[test]
    fn zero_arms_fails() {
        let params = GalaxyParameters { arms: 0, ..params() };
        let result = generate_star(0, None, &params, &mut point_rng(0, 0));
        assert!(matches!(result, Err(GalaxyError::InvalidParameter { .. })));
    }

    #[test]
    fn no_jitter_lands_on_the_spiral_curve() {
        let params = GalaxyParameters {
            depth: 0.0,
            density: 0.0,
            ..params()
        };
        let layout = SpiralLayout::new(&params).unwrap();
        for index in 0..200 {
            let star = layout.place(index, None, &mut point_rng(9, index));
            let r = star.position.xz().length();
            let t = layout.normalized_radius(r);
            let expected = layout.base_angle(layout.arm_index(index, None)) + layout.winding(t);
            let actual = f32::atan2(star.position.z, star.position.x);
            let diff = (actual - expected).rem_euclid(TAU);
            assert!(diff < 1e-2 || diff > TAU - 1e-2, "index {index}: {diff}");
            assert_eq!(star.position.y, 0.0);
        }
    }
}
