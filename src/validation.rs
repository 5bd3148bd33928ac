//! Physical realizability of deep-inelastic phase-space points.
//!
//! Bounds follow S. Kretzer and M. H. Reno, "Tau neutrino deep inelastic
//! charged current interactions", Phys. Rev. D 66, 113007, equations 6-8.

/// Allowed range of Bjorken y at fixed Bjorken x.
///
/// `energy` is the beam energy in the target rest frame, `target_mass` the
/// nucleon (or electron) mass and `lepton_mass` the outgoing lepton mass, all
/// in GeV. Returns `None` when no y is allowed, including when the
/// discriminant of the energy-momentum constraint is negative.
pub fn y_bounds(x: f64, energy: f64, target_mass: f64, lepton_mass: f64) -> Option<(f64, f64)> {
    let (e, big_m, m) = (energy, target_mass, lepton_mass);
    if !(x > 0.0 && x <= 1.0) || e <= m {
        return None;
    }
    if x < minimum_x(energy, target_mass, lepton_mass) {
        return None;
    }

    let m2 = m * m;
    let d = 2.0 * (1.0 + (big_m * x) / (2.0 * e));
    let ad = 1.0 - m2 * ((1.0 / (2.0 * big_m * e * x)) + (1.0 / (2.0 * e * e)));
    let term = 1.0 - m2 / (2.0 * big_m * e * x);
    let discriminant = term * term - m2 / (e * e);
    if !(discriminant >= 0.0) {
        return None;
    }
    let bd = discriminant.sqrt();
    Some(((ad - bd) / d, (ad + bd) / d))
}

/// Smallest Bjorken x at which the outgoing lepton can be produced.
pub fn minimum_x(energy: f64, target_mass: f64, lepton_mass: f64) -> f64 {
    (lepton_mass * lepton_mass) / (2.0 * target_mass * (energy - lepton_mass))
}

/// Whether `(x, y)` is reachable for the given beam energy and masses.
pub fn kinematically_allowed(x: f64, y: f64, energy: f64, target_mass: f64, lepton_mass: f64) -> bool {
    match y_bounds(x, energy, target_mass, lepton_mass) {
        Some((lo, hi)) => lo <= y && y <= hi,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::{MUON_MASS, TAU_MASS};

    const M: f64 = 0.938;

    #[test]
    fn test_massless_lepton_bounds() {
        // term = 1, bd = 1: y runs from 0 to 1 / (1 + Mx/2E)
        let (lo, hi) = y_bounds(0.5, 100.0, M, 0.0).unwrap();
        assert!(lo.abs() < 1e-15);
        let expected = 1.0 / (1.0 + M * 0.5 / 200.0);
        assert!((hi - expected).abs() < 1e-12, "hi = {}, expected {}", hi, expected);
    }

    #[test]
    fn test_typical_point_allowed() {
        assert!(kinematically_allowed(0.2, 0.5, 100.0, M, MUON_MASS));
        assert!(kinematically_allowed(0.01, 0.3, 100.0, M, 0.0));
    }

    #[test]
    fn test_x_out_of_range_rejected() {
        assert!(!kinematically_allowed(1.5, 0.5, 100.0, M, MUON_MASS));
        assert!(!kinematically_allowed(0.0, 0.5, 100.0, M, MUON_MASS));
        assert!(!kinematically_allowed(-0.1, 0.5, 100.0, M, MUON_MASS));
    }

    #[test]
    fn test_tau_threshold_on_x() {
        let e = 10.0;
        let x_min = minimum_x(e, M, TAU_MASS);
        assert!(x_min > 0.1, "tau x threshold should be sizeable, got {}", x_min);
        assert!(!kinematically_allowed(0.5 * x_min, 0.5, e, M, TAU_MASS));
    }

    #[test]
    fn test_below_lepton_mass_rejected() {
        assert!(!kinematically_allowed(0.5, 0.5, 1.0, M, TAU_MASS));
    }

    #[test]
    fn test_large_y_rejected_for_heavy_lepton() {
        // The lepton must keep at least its rest energy
        assert!(!kinematically_allowed(0.5, 0.999, 20.0, M, TAU_MASS));
    }

    #[test]
    fn test_nan_inputs_rejected() {
        assert!(!kinematically_allowed(f64::NAN, 0.5, 100.0, M, MUON_MASS));
        assert!(!kinematically_allowed(0.5, f64::NAN, 100.0, M, MUON_MASS));
    }
}
