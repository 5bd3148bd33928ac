// Final-state sampling for spline-tabulated deep-inelastic processes.
//
// Bjorken x and y are drawn with a Metropolis-Hastings chain whose proposals
// are uniform in (log10 x, log10 y); the target density is therefore the
// tabulated d²σ/dxdy weighted by the Jacobian x*y. The momentum transfer is
// then rebuilt in the target rest frame around the beam direction.

use crate::config::SamplerSettings;
use crate::error::{Result, XsError};
use crate::kinematics::{azimuthal_rotation, beam_frame_rotation, FourMomentum};
use crate::spline::SplineTable;
use crate::validation::kinematically_allowed;
use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Bjorken variables and Q² of one sampled interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampledKinematics {
    pub x: f64,
    pub y: f64,
    pub q2: f64,
    /// Accepted chain transitions, for diagnostics.
    pub accepted: usize,
}

/// Samples (x, y) from a 3-D `(log10 E, log10 x, log10 y)` differential table.
#[derive(Debug)]
pub struct KinematicSampler<'a> {
    spline: &'a SplineTable,
    target_mass: f64,
    minimum_q2: f64,
    lepton_mass: f64,
    settings: &'a SamplerSettings,
}

/// Uniform proposal region in log space for one beam energy.
struct ProposalRegion {
    log_energy: f64,
    log_x: Uniform<f64>,
    log_y: Uniform<f64>,
    /// 2 E1 E2, so that Q² = scale * x * y.
    q2_scale: f64,
    energy: f64,
}

impl<'a> KinematicSampler<'a> {
    pub fn new(
        spline: &'a SplineTable,
        target_mass: f64,
        minimum_q2: f64,
        lepton_mass: f64,
        settings: &'a SamplerSettings,
    ) -> Result<Self> {
        if spline.ndim() != 3 {
            return Err(XsError::DimensionMismatch {
                expected: 3,
                got: spline.ndim(),
            });
        }
        Ok(Self {
            spline,
            target_mass,
            minimum_q2,
            lepton_mass,
            settings,
        })
    }

    fn region(&self, beam_energy: f64, target_energy: f64) -> Result<ProposalRegion> {
        let log_energy = beam_energy.log10();
        if !self.spline.within_extent(0, log_energy) {
            return Err(XsError::EnergyOutOfRange {
                energy: beam_energy,
                min: 10f64.powf(self.spline.lower_extent(0)),
                max: 10f64.powf(self.spline.upper_extent(0)),
            });
        }

        let q2_scale = 2.0 * beam_energy * target_energy;
        // the outgoing lepton keeps at least its rest energy
        let y_max = 1.0 - self.lepton_mass / beam_energy;
        // smallest y at x = 1 and Q² = Q²min
        let y_min = self.minimum_q2 / q2_scale;
        // smallest x at y = y_max and Q² = Q²min
        let x_min = self.minimum_q2 / (q2_scale * y_max);

        let (log_x_min, log_y_min, log_y_max) = (x_min.log10(), y_min.log10(), y_max.log10());
        let finite = log_x_min.is_finite() && log_y_min.is_finite() && log_y_max.is_finite();
        if !finite || !(log_x_min < 0.0) || !(log_y_min < log_y_max) {
            return Err(XsError::NoFeasiblePoint { attempts: 0 });
        }

        Ok(ProposalRegion {
            log_energy,
            log_x: Uniform::new(log_x_min, 0.0),
            log_y: Uniform::new(log_y_min, log_y_max),
            q2_scale,
            energy: beam_energy,
        })
    }

    /// Rejection-sample a point above Q²min that is kinematically allowed.
    fn propose<R: Rng + ?Sized>(&self, region: &ProposalRegion, attempts: &mut usize, rng: &mut R) -> Result<[f64; 3]> {
        loop {
            if *attempts >= self.settings.max_proposal_attempts {
                return Err(XsError::NoFeasiblePoint { attempts: *attempts });
            }
            *attempts += 1;

            let log_x = region.log_x.sample(rng);
            let log_y = region.log_y.sample(rng);
            let q2 = region.q2_scale * 10f64.powf(log_x + log_y);
            if q2 < self.minimum_q2 {
                continue;
            }
            if !kinematically_allowed(
                10f64.powf(log_x),
                10f64.powf(log_y),
                region.energy,
                self.target_mass,
                self.lepton_mass,
            ) {
                continue;
            }
            return Ok([region.log_energy, log_x, log_y]);
        }
    }

    /// Centers of a proposed point, if it lies inside the table on x and y.
    fn locate(&self, point: &[f64; 3]) -> Option<Vec<usize>> {
        if !self.spline.within_extent(1, point[1]) || !self.spline.within_extent(2, point[2]) {
            return None;
        }
        self.spline.search_centers(point)
    }

    /// Jacobian-weighted density `x * y * d²σ/dxdy`, NaN for degenerate tables.
    fn weight(&self, point: &[f64; 3], centers: &[usize]) -> f64 {
        let eval = self.spline.evaluate_at_centers(point, centers);
        10f64.powf(point[1] + point[2]) * 10f64.powf(eval)
    }

    /// Run the chain for a beam of `beam_energy` on a target of energy
    /// `target_energy`, both in the target rest frame.
    pub fn sample<R: Rng + ?Sized>(&self, beam_energy: f64, target_energy: f64, rng: &mut R) -> Result<SampledKinematics> {
        let region = self.region(beam_energy, target_energy)?;

        let mut attempts = 0;
        let (mut point, centers) = loop {
            let candidate = self.propose(&region, &mut attempts, rng)?;
            if let Some(centers) = self.locate(&candidate) {
                break (candidate, centers);
            }
        };
        let mut weight = self.weight(&point, &centers);
        if weight.is_nan() {
            weight = 0.0;
        }

        let mut accepted = 0;
        for _ in 0..=self.settings.burn_in {
            let mut attempts = 0;
            let test = self.propose(&region, &mut attempts, rng)?;
            let Some(test_centers) = self.locate(&test) else {
                continue;
            };
            let test_weight = self.weight(&test, &test_centers);
            if test_weight.is_nan() {
                continue;
            }

            let odds = test_weight / weight;
            if weight == 0.0 || odds > 1.0 || rng.gen::<f64>() < odds {
                point = test;
                weight = test_weight;
                accepted += 1;
            }
        }
        tracing::trace!(accepted, burn_in = self.settings.burn_in, "metropolis-hastings chain finished");

        let x = 10f64.powf(point[1]);
        let y = 10f64.powf(point[2]);
        Ok(SampledKinematics {
            x,
            y,
            q2: region.q2_scale * 10f64.powf(point[1] + point[2]),
            accepted,
        })
    }
}

/// Build the outgoing lepton and hadronic system in the target rest frame.
///
/// The momentum transfer is first laid out with its longitudinal component
/// along +x, then rotated onto the beam direction and by `phi` about it.
/// Returns `(lepton, hadrons)`; the lepton is on shell with `lepton_mass`.
pub fn reconstruct_final_state(
    beam: &FourMomentum,
    target: &FourMomentum,
    lepton_mass: f64,
    y: f64,
    q2: f64,
    phi: f64,
) -> Result<(FourMomentum, FourMomentum)> {
    let e1 = beam.e;
    let p1 = beam.momentum_magnitude();
    if !(p1 > 0.0) {
        return Err(XsError::MalformedRecord("primary has no momentum".to_string()));
    }

    let energy_transfer = e1 * y;
    // |q|² from Q² = |q|² - q0²
    let q_mag2 = q2 + energy_transfer * energy_transfer;
    // component along the beam fixed by the outgoing lepton's mass shell
    let q_par = (lepton_mass * lepton_mass - e1 * e1 + 2.0 * e1 * e1 * y + p1 * p1 + q2) / (2.0 * p1);
    let mut radicand = q_mag2 - q_par * q_par;
    if radicand < 0.0 {
        if radicand < -1e-9 * q_mag2.max(1.0) {
            return Err(XsError::Reconstruction { radicand });
        }
        radicand = 0.0;
    }

    let transfer = FourMomentum::new(energy_transfer, Vector3::new(q_par, radicand.sqrt(), 0.0));
    let rotation = azimuthal_rotation(&beam.p, phi) * beam_frame_rotation(&beam.p);
    let transfer = transfer.rotated(&rotation);

    let lepton = FourMomentum::on_shell((*beam - transfer).p, lepton_mass);
    let hadrons = *target + transfer;
    Ok((lepton, hadrons))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::MUON_MASS;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const M: f64 = 0.938;

    fn flat_table(ndim: usize) -> SplineTable {
        let mut axes = vec![vec![1.0, 4.0]];
        for _ in 1..ndim {
            axes.push(vec![-5.0, 0.0]);
        }
        let n = 1 << ndim;
        SplineTable::linear_from_grid(axes, vec![-1.0; n]).unwrap()
    }

    /// Table over (log E, log x, log y) whose value depends only on log x.
    fn table_over_x(log_x: Vec<f64>, values: &[f64]) -> SplineTable {
        let mut coefficients = Vec::new();
        for _ in 0..2 {
            for &v in values {
                coefficients.extend_from_slice(&[v, v]);
            }
        }
        SplineTable::linear_from_grid(vec![vec![1.0, 4.0], log_x, vec![-5.0, 0.0]], coefficients).unwrap()
    }

    #[test]
    fn test_nan_proposals_are_rejected() {
        // NaN below log x = -2.5, finite above
        let table = table_over_x(vec![-5.0, -2.5, 0.0], &[f64::NAN, -1.0, -1.0]);
        let settings = SamplerSettings::default();
        let sampler = KinematicSampler::new(&table, M, 1.0, MUON_MASS, &settings).unwrap();
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..20 {
            let k = sampler.sample(5000.0, M, &mut rng).unwrap();
            assert!(k.x.log10() >= -2.5, "chain ended in the NaN region at x = {}", k.x);
        }
    }

    #[test]
    fn test_all_nan_table_keeps_initial_point() {
        let table = table_over_x(vec![-5.0, 0.0], &[f64::NAN, f64::NAN]);
        let settings = SamplerSettings::default();
        let sampler = KinematicSampler::new(&table, M, 1.0, MUON_MASS, &settings).unwrap();
        let k = sampler.sample(100.0, M, &mut StdRng::seed_from_u64(2)).unwrap();
        assert_eq!(k.accepted, 0);
        assert!(k.q2 >= 1.0);
        assert!(kinematically_allowed(k.x, k.y, 100.0, M, MUON_MASS));
    }

    #[test]
    fn test_zero_weight_accepts_next_proposal() {
        // 10^-400 underflows to zero everywhere
        let table = table_over_x(vec![-5.0, 0.0], &[-400.0, -400.0]);
        let settings = SamplerSettings::default();
        let sampler = KinematicSampler::new(&table, M, 1.0, MUON_MASS, &settings).unwrap();
        let k = sampler.sample(100.0, M, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(k.accepted, settings.burn_in + 1);
    }

    #[test]
    fn test_chain_leaves_zero_weight_region() {
        // zero weight below log x = -0.5, positive near log x = 0
        let table = table_over_x(vec![-5.0, -0.5, -0.4, 0.0], &[-400.0, -400.0, -1.0, -1.0]);
        let settings = SamplerSettings {
            burn_in: 200,
            ..SamplerSettings::default()
        };
        let sampler = KinematicSampler::new(&table, M, 1.0, MUON_MASS, &settings).unwrap();
        let mut rng = StdRng::seed_from_u64(23);
        for _ in 0..10 {
            let k = sampler.sample(100.0, M, &mut rng).unwrap();
            assert!(k.x.log10() > -0.5, "chain stuck at zero weight, x = {}", k.x);
            assert!(k.accepted > 0);
        }
    }

    #[test]
    fn test_rejects_two_dimensional_table() {
        let table = flat_table(2);
        let settings = SamplerSettings::default();
        let err = KinematicSampler::new(&table, M, 1.0, 0.0, &settings).unwrap_err();
        assert!(matches!(err, XsError::DimensionMismatch { expected: 3, got: 2 }));
    }

    #[test]
    fn test_energy_outside_table() {
        let table = flat_table(3);
        let settings = SamplerSettings::default();
        let sampler = KinematicSampler::new(&table, M, 1.0, MUON_MASS, &settings).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let err = sampler.sample(5.0, M, &mut rng).unwrap_err();
        assert!(matches!(err, XsError::EnergyOutOfRange { .. }), "got {:?}", err);
    }

    #[test]
    fn test_sampled_point_is_physical() {
        let table = flat_table(3);
        let settings = SamplerSettings::default();
        let sampler = KinematicSampler::new(&table, M, 1.0, MUON_MASS, &settings).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let k = sampler.sample(100.0, M, &mut rng).unwrap();
            assert!(k.x > 0.0 && k.x < 1.0, "x = {}", k.x);
            assert!(k.y > 0.0 && k.y < 1.0, "y = {}", k.y);
            assert!(k.q2 >= 1.0, "Q2 = {}", k.q2);
            assert!(kinematically_allowed(k.x, k.y, 100.0, M, MUON_MASS));
            assert!((k.q2 - 2.0 * 100.0 * M * k.x * k.y).abs() < 1e-9 * k.q2);
        }
    }

    #[test]
    fn test_same_seed_same_sample() {
        let table = flat_table(3);
        let settings = SamplerSettings::default();
        let sampler = KinematicSampler::new(&table, M, 1.0, MUON_MASS, &settings).unwrap();
        let a = sampler.sample(300.0, M, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = sampler.sample(300.0, M, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_region_fails_instead_of_looping() {
        let table = flat_table(3);
        let settings = SamplerSettings {
            burn_in: 40,
            max_proposal_attempts: 1000,
        };
        // Q²min far above 2ME: no point can pass
        let sampler = KinematicSampler::new(&table, M, 1e6, 0.0, &settings).unwrap();
        let err = sampler.sample(100.0, M, &mut StdRng::seed_from_u64(3)).unwrap_err();
        assert!(matches!(err, XsError::NoFeasiblePoint { .. }), "got {:?}", err);

        // Q² window only reachable above the kinematic bound on y
        let tight = KinematicSampler::new(&table, M, 187.0, 0.0, &settings).unwrap();
        let err = tight.sample(100.0, M, &mut StdRng::seed_from_u64(3)).unwrap_err();
        assert!(matches!(err, XsError::NoFeasiblePoint { attempts: 1000 }), "got {:?}", err);
    }

    #[test]
    fn test_reconstruction_conserves_four_momentum() {
        let beam = FourMomentum::on_shell(Vector3::new(0.0, 0.0, 100.0), 0.0);
        let target = FourMomentum::new(M, Vector3::zeros());
        let (x, y) = (0.2, 0.4);
        let q2 = 2.0 * beam.e * target.e * x * y;
        for &phi in &[0.0, 1.0, 4.0] {
            let (lepton, hadrons) = reconstruct_final_state(&beam, &target, MUON_MASS, y, q2, phi).unwrap();
            let total_in = beam + target;
            let total_out = lepton + hadrons;
            assert!((total_in.e - total_out.e).abs() < 1e-9, "energy {} vs {}", total_in.e, total_out.e);
            assert!((total_in.p - total_out.p).norm() < 1e-9);
            assert!((lepton.mass() - MUON_MASS).abs() < 1e-6);

            // the invariants come back out
            let q = beam - lepton;
            let q2_out = -q.dot(&q);
            assert!((q2_out - q2).abs() < 1e-8 * q2, "Q2 {} vs {}", q2_out, q2);
            let y_out = 1.0 - target.dot(&lepton) / target.dot(&beam);
            assert!((y_out - y).abs() < 1e-10);
        }
    }
}
