//! Front-to-back volume ray marching.
//!
//! Rays are marched in unit-cube coordinates (the outermost occupancy level
//! spans `[0, 1]^3`). Each ray runs a small state machine:
//!
//! ```text
//! Enter -> SkipEmpty <-> SampleOccupied -> Terminated
//! ```
//!
//! At depth `d` (see [`mip_from_pos`](crate::occupancy::mip_from_pos)) steps
//! are scaled by `2^-d`, so inner levels are sampled more finely. Empty space
//! is crossed with a longer stride; only occupied samples count against the
//! iteration budget. Every step, skip or sample, counts against
//! [`MAX_MARCH_STEPS`], and a step too small to move `t` ends the ray.

use glam::{Vec3, Vec4};

use super::camera::Ray;
use super::settings::RenderSettings;
use crate::network::NeuralFieldEvaluator;
use crate::occupancy::OccupancyGrid;
use crate::util::Aabb;

/// Hard bound on loop iterations per ray, skips included.
pub const MAX_MARCH_STEPS: usize = 1 << 16;

/// Marcher state, as reported to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarchState {
    Enter,
    SkipEmpty,
    SampleOccupied,
    Terminated,
}

/// Why a ray stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The ray never enters the unit cube.
    Missed,
    /// Marched past the far side of the cube or the far plane.
    Exited,
    /// Iteration budget spent.
    BudgetExhausted,
    /// Transmittance fell below the cutoff.
    Opaque,
    /// The step fell below the float resolution of `t`, or the hard step
    /// bound was reached.
    Stalled,
}

/// One step of a ray, for debugging and tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarchEvent {
    pub state: MarchState,
    /// Ray parameter where the step started.
    pub t: f32,
    pub depth: usize,
    /// Transmittance after the step.
    pub transmittance: f32,
}

/// Result of marching one ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarchOutcome {
    /// Accumulated color, premultiplied by opacity.
    pub rgb: Vec3,
    /// `1 - transmittance`.
    pub opacity: f32,
    pub termination: Termination,
    pub samples: usize,
    pub skips: usize,
}

impl MarchOutcome {
    fn missed() -> Self {
        Self {
            rgb: Vec3::ZERO,
            opacity: 0.0,
            termination: Termination::Missed,
            samples: 0,
            skips: 0,
        }
    }

    /// Premultiplied RGBA.
    pub fn rgba(&self) -> Vec4 {
        self.rgb.extend(self.opacity)
    }
}

/// Marches rays through one scene.
#[derive(Clone, Copy)]
pub struct VolumeRayMarcher<'a> {
    evaluator: &'a NeuralFieldEvaluator,
    grid: &'a OccupancyGrid,
    render_step: f32,
    settings: &'a RenderSettings,
}

impl<'a> VolumeRayMarcher<'a> {
    pub fn new(
        evaluator: &'a NeuralFieldEvaluator,
        grid: &'a OccupancyGrid,
        render_step: f32,
        settings: &'a RenderSettings,
    ) -> Self {
        Self {
            evaluator,
            grid,
            render_step,
            settings,
        }
    }

    /// March `ray` and return its premultiplied color and opacity.
    pub fn march(&self, ray: &Ray) -> MarchOutcome {
        self.march_observed(ray, |_| {})
    }

    /// March `ray`, reporting every step to `observer`.
    pub fn march_observed(&self, ray: &Ray, mut observer: impl FnMut(&MarchEvent)) -> MarchOutcome {
        let dir = ray.dir.normalize_or_zero();
        let (t0, t1) = Aabb::UNIT.intersect_ray(ray.origin, dir);
        let t_end = t1.min(ray.t_max);
        let t_start = t0.max(ray.t_min).max(0.0);
        // NaN bounds (zero direction) fail the comparison and count as a miss.
        if dir == Vec3::ZERO || !(t0 <= t1) || !(t_start < t_end) {
            observer(&MarchEvent {
                state: MarchState::Terminated,
                t: t_start,
                depth: 0,
                transmittance: 1.0,
            });
            return MarchOutcome::missed();
        }
        observer(&MarchEvent {
            state: MarchState::Enter,
            t: t_start,
            depth: self.grid.depth_at(ray.origin + dir * t_start),
            transmittance: 1.0,
        });

        let view = self.evaluator.view_conditioning(dir);
        let mips = self.grid.mips();
        let scene_scale = self.grid.aabb_scale();
        let skip_step = self.render_step * mips.min(self.settings.max_skip).max(1) as f32;
        let budget = self.settings.max_iterations as f32;
        let threshold = self.grid.threshold();
        let dt = self.render_step;

        let mut rgb = Vec3::ZERO;
        let mut transmittance = 1.0f32;
        let mut spent = 0.0f32;
        let mut samples = 0;
        let mut skips = 0;
        let mut t = t_start;
        let mut steps = 0usize;

        let termination = loop {
            if t >= t_end {
                break Termination::Exited;
            }
            if spent >= budget {
                break Termination::BudgetExhausted;
            }
            if steps >= MAX_MARCH_STEPS {
                break Termination::Stalled;
            }
            steps += 1;

            let p = ray.origin + dir * t;
            let depth = self.grid.depth_at(p);
            let scale = 1.0 / (1u64 << depth) as f32;

            if self.grid.sample_depth(p, depth) < threshold {
                observer(&MarchEvent {
                    state: MarchState::SkipEmpty,
                    t,
                    depth,
                    transmittance,
                });
                let next = t + skip_step * scale;
                if next <= t {
                    break Termination::Stalled;
                }
                t = next;
                skips += 1;
                continue;
            }

            let sample = self.evaluator.evaluate_with((p - 0.5) * scene_scale + 0.5, &view);
            let alpha = 1.0 - (-sample.density * dt).exp();
            rgb += sample.rgb * (alpha * transmittance);
            transmittance *= 1.0 - alpha;
            samples += 1;

            observer(&MarchEvent {
                state: MarchState::SampleOccupied,
                t,
                depth,
                transmittance,
            });

            if transmittance < self.settings.transmittance_cutoff {
                break Termination::Opaque;
            }
            let next = t + self.render_step * scale;
            if next <= t {
                break Termination::Stalled;
            }
            t = next;
            spent += scale;
        };

        observer(&MarchEvent {
            state: MarchState::Terminated,
            t,
            depth: 0,
            transmittance,
        });
        MarchOutcome {
            rgb,
            opacity: 1.0 - transmittance,
            termination,
            samples,
            skips,
        }
    }
}
