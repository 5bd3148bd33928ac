//! The capability interface every interaction model exposes to the
//! interaction collection that selects processes and drives sampling.

use crate::error::Result;
use crate::model::SplineCrossSection;
use crate::particle::ParticleType;
use crate::record::{InteractionRecord, InteractionSignature};
use rand::RngCore;
use std::fmt;

/// Tag identifying the concrete model family behind a `dyn CrossSection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrossSectionKind {
    Dis,
    Hnl,
    DipoleDis,
}

pub trait CrossSection: fmt::Debug + Send + Sync {
    fn kind(&self) -> CrossSectionKind;

    /// Total cross section for the record's primary, target and energy.
    fn total_cross_section(&self, record: &InteractionRecord) -> Result<f64>;

    /// Total cross section from explicit parameters.
    fn total_cross_section_for_target(&self, primary: ParticleType, energy: f64, target: ParticleType) -> Result<f64>;

    /// Differential cross section at the kinematics stored in the record.
    fn differential_cross_section(&self, record: &InteractionRecord) -> Result<f64>;

    /// Beam energy below which the process cannot happen.
    fn interaction_threshold(&self, _record: &InteractionRecord) -> f64 {
        0.0
    }

    /// Fill the record's secondary kinematics. On error the record is untouched.
    fn sample_final_state(&self, record: &mut InteractionRecord, rng: &mut dyn RngCore) -> Result<()>;

    /// Differential over total cross section; zero whenever the differential is.
    fn final_state_probability(&self, record: &InteractionRecord) -> Result<f64> {
        let dxs = self.differential_cross_section(record)?;
        if dxs == 0.0 {
            return Ok(0.0);
        }
        let txs = self.total_cross_section(record)?;
        Ok(dxs / txs)
    }

    fn possible_primaries(&self) -> Vec<ParticleType>;
    fn possible_targets(&self) -> Vec<ParticleType>;
    fn possible_targets_from_primary(&self, primary: ParticleType) -> Vec<ParticleType>;
    fn possible_signatures(&self) -> Vec<InteractionSignature>;
    fn possible_signatures_from_parents(&self, primary: ParticleType, target: ParticleType) -> Vec<InteractionSignature>;

    /// Names of the sampled kinematic variables.
    fn density_variables(&self) -> Vec<String>;

    /// Access to the spline-backed implementation, if this is one.
    fn as_spline_model(&self) -> Option<&SplineCrossSection> {
        None
    }

    /// Same model family and identical parameters and tables.
    fn equals(&self, other: &dyn CrossSection) -> bool;
}

impl PartialEq for dyn CrossSection {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}
