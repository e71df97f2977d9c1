//! # MPPI optimiser
//!
//! Model predictive path integral optimisation of the guidance parameter
//! series. Candidate series are sampled around the current series, each is
//! rolled out through a point-mass pursuit model of the vehicle, and the
//! candidates are averaged with weights `exp(-(J - J_min) / lambda)`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::{MppiParams, MppiSeries};
use crate::{
    state_cache::VehicleState,
    waypoints::{look_ahead_point, WaypointSeq}
};
use util::maths::{dist_to_segment, planar_dist};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// An optimiser producing new guidance parameter series.
pub trait GuidanceOptimiser: Send {
    /// Optimise the series. The returned series must have the same length as
    /// `input.prev`.
    fn optimise(&mut self, input: &OptimInput) -> MppiSeries;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct OptimInput<'a> {
    pub state: &'a VehicleState,
    pub waypoints: &'a WaypointSeq,
    pub wp_index: usize,

    /// Disturbance acceleration over the horizon.
    pub forecast: &'a [Vector3<f64>],

    /// Series from the previous optimisation, the sampling mean.
    pub prev: &'a MppiSeries,

    /// Units: seconds
    pub dt_s: f64
}

pub struct Mppi {
    params: MppiParams,
    rng: StdRng
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Mppi {
    pub fn new(params: MppiParams) -> Self {
        Self {
            rng: StdRng::seed_from_u64(params.seed),
            params
        }
    }

    fn sample(&mut self, prev: &MppiSeries) -> MppiSeries {
        let ds = self.params.speed_noise_ms;
        let dl = self.params.look_ahead_noise_m;

        let mut cand = prev.clone();
        for u in cand.speed_ms.iter_mut() {
            if ds > 0.0 {
                *u = (*u + self.rng.gen_range(-ds..ds)).max(0.0);
            }
        }
        for u in cand.look_ahead_m.iter_mut() {
            if dl > 0.0 {
                *u = (*u + self.rng.gen_range(-dl..dl)).max(0.0);
            }
        }

        cand
    }

    /// Cost of flying the candidate series from the current state.
    fn rollout_cost(&self, cand: &MppiSeries, input: &OptimInput) -> f64 {
        let p = &self.params;
        let mut pos = input.state.position_m;
        let mut vel = input.state.velocity_ms;
        let mut index = input.wp_index;
        let origin = input.state.position_m;
        let mut cost = 0.0;

        for i in 0..cand.len() {
            let (start, end) = match input.waypoints.segment(index, &origin) {
                Some(s) => s,
                None => break
            };

            let target = look_ahead_point(&pos, &start, &end, cand.look_ahead_m[i]);
            let vel_des = match (target - pos).try_normalize(1e-6) {
                Some(dir) => dir * cand.speed_ms[i],
                None => Vector3::zeros()
            };
            let dist = input.forecast.get(i).copied().unwrap_or_else(Vector3::zeros);

            vel += ((vel_des - vel) / p.vel_tau_s + dist) * input.dt_s;
            pos += vel * input.dt_s;

            if planar_dist(&pos, &end) < p.acceptance_radius_m {
                index += 1;
            }

            let (cross_track_m, _) = dist_to_segment(&pos, &start, &end);
            cost += p.path_weight * cross_track_m.powi(2)
                + p.speed_weight * (cand.speed_ms[i] - p.ref_speed_ms).powi(2);
        }

        cost
    }
}

impl GuidanceOptimiser for Mppi {
    fn optimise(&mut self, input: &OptimInput) -> MppiSeries {
        let n = input.prev.len();
        if n == 0 || self.params.num_samples == 0 {
            return input.prev.clone()
        }

        let cands: Vec<MppiSeries> = (0..self.params.num_samples)
            .map(|_| self.sample(input.prev))
            .collect();
        let costs: Vec<f64> = cands.iter()
            .map(|c| self.rollout_cost(c, input))
            .collect();

        let min_cost = costs.iter().cloned().fold(std::f64::INFINITY, f64::min);
        let lambda = self.params.lambda.max(std::f64::EPSILON);
        let weights: Vec<f64> = costs.iter()
            .map(|c| (-(c - min_cost) / lambda).exp())
            .collect();
        let total: f64 = weights.iter().sum();

        // All rollouts non-finite, keep the previous series
        if !total.is_finite() || total <= 0.0 {
            return input.prev.clone()
        }

        let mut out = MppiSeries::new(n, 0.0, 0.0);
        for (cand, w) in cands.iter().zip(weights.iter()) {
            for i in 0..n {
                out.speed_ms[i] += w / total * cand.speed_ms[i];
                out.look_ahead_m[i] += w / total * cand.look_ahead_m[i];
            }
        }

        out
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn params(seed: u64) -> MppiParams {
        MppiParams {
            num_samples: 64,
            lambda: 1.0,
            speed_noise_ms: 1.0,
            look_ahead_noise_m: 1.0,
            path_weight: 1.0,
            speed_weight: 1.0,
            ref_speed_ms: 5.0,
            vel_tau_s: 0.5,
            acceptance_radius_m: 3.0,
            seed
        }
    }

    fn optimise(seed: u64, prev: &MppiSeries) -> MppiSeries {
        let wps = WaypointSeq::new(vec![
            Vector3::new(20.0, 0.0, -5.0), 
            Vector3::new(20.0, 20.0, -5.0)
        ]);
        let state = VehicleState {
            position_m: Vector3::new(0.0, 0.0, -5.0),
            ..Default::default()
        };
        let forecast = vec![Vector3::new(0.0, 0.2, 0.0); prev.len()];

        Mppi::new(params(seed)).optimise(&OptimInput {
            state: &state,
            waypoints: &wps,
            wp_index: 0,
            forecast: &forecast,
            prev,
            dt_s: 0.1
        })
    }

    #[test]
    fn test_output_length_and_determinism() {
        let prev = MppiSeries::new(10, 3.0, 4.0);

        let a = optimise(7, &prev);
        let b = optimise(7, &prev);

        assert_eq!(a.len(), 10);
        assert_eq!(a, b);
        assert!(a.speed_ms.iter().all(|u| u.is_finite() && *u >= 0.0));
    }

    #[test]
    fn test_moves_towards_reference_speed() {
        // Far below the reference speed, the weighted mean should rise
        let prev = MppiSeries::new(10, 1.0, 4.0);
        let out = optimise(3, &prev);

        let mean: f64 = out.speed_ms.iter().sum::<f64>() / out.len() as f64;
        assert!(mean > 1.0);
    }

    #[test]
    fn test_empty_series() {
        let prev = MppiSeries::new(0, 1.0, 4.0);
        assert!(optimise(3, &prev).is_empty());
    }
}
