// Shared fixtures for the integration tests.
#![allow(dead_code)]

use nu_xsec::{
    InteractionChannel, InteractionRecord, InteractionSignature, ModelParameters, ModelVariant, ParticleType,
    SplineCrossSection, SplineTable, Units,
};

pub const TARGET_MASS: f64 = 0.938;

/// log10(d²σ/dxdy) over log10 E in [1, 4], log10 x and log10 y in [-5, 0].
///
/// Mildly sloped in x and y and always below the total table, so that the
/// ratio of the two is a probability.
pub fn differential_table() -> SplineTable {
    let energies = vec![1.0, 4.0];
    let xs = vec![-5.0, -2.5, 0.0];
    let ys = vec![-5.0, -2.5, 0.0];
    let mut values = Vec::new();
    for &log_e in &energies {
        for &log_x in &xs {
            for &log_y in &ys {
                values.push(-40.0 + 0.1 * log_e - 0.1 * log_x + 0.05 * log_y);
            }
        }
    }
    SplineTable::linear_from_grid(vec![energies, xs, ys], values).unwrap()
}

/// log10 σ running from -38 at 10 GeV to -35 at 10 TeV.
pub fn total_table() -> SplineTable {
    SplineTable::linear_from_grid(vec![vec![1.0, 4.0]], vec![-38.0, -35.0]).unwrap()
}

pub fn parameters(channel: InteractionChannel) -> ModelParameters {
    ModelParameters {
        channel,
        target_mass: TARGET_MASS,
        minimum_q2: 1.0,
    }
}

pub fn model_with(variant: ModelVariant, channel: InteractionChannel) -> SplineCrossSection {
    SplineCrossSection::new(
        variant,
        differential_table(),
        total_table(),
        parameters(channel),
        [ParticleType::NuMu, ParticleType::NuMuBar],
        [ParticleType::Nucleon],
        Units::Centimeters,
    )
    .unwrap()
}

pub fn cc_model() -> SplineCrossSection {
    model_with(ModelVariant::Dis, InteractionChannel::ChargedCurrent)
}

/// A muon neutrino of `energy` GeV along +z on a nucleon at rest.
pub fn numu_record(energy: f64) -> InteractionRecord {
    let signature = InteractionSignature::new(
        ParticleType::NuMu,
        ParticleType::Nucleon,
        vec![ParticleType::MuMinus, ParticleType::Hadrons],
    );
    InteractionRecord::new(signature, [energy, 0.0, 0.0, energy], 0.0, TARGET_MASS)
}

pub fn total_four_momentum(momenta: &[[f64; 4]]) -> [f64; 4] {
    let mut sum = [0.0; 4];
    for p in momenta {
        for i in 0..4 {
            sum[i] += p[i];
        }
    }
    sum
}
