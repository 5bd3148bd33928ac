use crate::error::{Result, XsError};
use crate::particle::ParticleType;
use crate::record::InteractionSignature;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Interaction channel selector stored in spline metadata as `INTERACTION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum InteractionChannel {
    /// W exchange, charged lepton in the final state.
    ChargedCurrent = 1,
    /// Z exchange, neutral lepton in the final state.
    NeutralCurrent = 2,
    /// Resonant scattering on electrons, purely hadronic final state.
    GlashowResonance = 3,
}

impl InteractionChannel {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<InteractionChannel> for i32 {
    fn from(c: InteractionChannel) -> i32 {
        c.code()
    }
}

impl TryFrom<i32> for InteractionChannel {
    type Error = XsError;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            1 => Ok(InteractionChannel::ChargedCurrent),
            2 => Ok(InteractionChannel::NeutralCurrent),
            3 => Ok(InteractionChannel::GlashowResonance),
            other => Err(XsError::Configuration(format!(
                "interaction channel must be 1, 2 or 3, got {}",
                other
            ))),
        }
    }
}

/// Every signature a model can produce, indexed by its parents.
///
/// Built once from the primary and target sets and never mutated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SignatureRegistry {
    signatures: Vec<InteractionSignature>,
    by_parents: BTreeMap<(ParticleType, ParticleType), Vec<InteractionSignature>>,
}

impl SignatureRegistry {
    /// Pair every primary with every target, with the secondaries given by
    /// `secondaries_for(primary)`.
    pub fn build<F>(
        primaries: &BTreeSet<ParticleType>,
        targets: &BTreeSet<ParticleType>,
        mut secondaries_for: F,
    ) -> Result<Self>
    where
        F: FnMut(ParticleType) -> Result<Vec<ParticleType>>,
    {
        let mut registry = SignatureRegistry::default();
        for &primary in primaries {
            let secondaries = secondaries_for(primary)?;
            for &target in targets {
                let signature = InteractionSignature::new(primary, target, secondaries.clone());
                registry
                    .by_parents
                    .entry((primary, target))
                    .or_default()
                    .push(signature.clone());
                registry.signatures.push(signature);
            }
        }
        Ok(registry)
    }

    pub fn signatures(&self) -> &[InteractionSignature] {
        &self.signatures
    }

    /// Signatures for a parent pair; empty when the pair is not covered.
    pub fn from_parents(&self, primary: ParticleType, target: ParticleType) -> Vec<InteractionSignature> {
        self.by_parents
            .get(&(primary, target))
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_codes() {
        assert_eq!(InteractionChannel::try_from(1).unwrap(), InteractionChannel::ChargedCurrent);
        assert_eq!(InteractionChannel::try_from(3).unwrap().code(), 3);
        assert!(InteractionChannel::try_from(0).is_err());
        assert!(InteractionChannel::try_from(4).is_err());
    }

    #[test]
    fn test_build_pairs_every_parent() {
        let primaries = BTreeSet::from([ParticleType::NuMu, ParticleType::NuMuBar]);
        let targets = BTreeSet::from([ParticleType::PPlus, ParticleType::Neutron]);
        let registry = SignatureRegistry::build(&primaries, &targets, |p| {
            Ok(vec![p.charged_partner().unwrap(), ParticleType::Hadrons])
        })
        .unwrap();

        assert_eq!(registry.len(), 4);
        let sigs = registry.from_parents(ParticleType::NuMuBar, ParticleType::Neutron);
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].secondary_types, vec![ParticleType::MuPlus, ParticleType::Hadrons]);
        assert!(registry.from_parents(ParticleType::NuE, ParticleType::PPlus).is_empty());
    }

    #[test]
    fn test_build_propagates_rule_errors() {
        let primaries = BTreeSet::from([ParticleType::EMinus]);
        let targets = BTreeSet::from([ParticleType::PPlus]);
        let result = SignatureRegistry::build(&primaries, &targets, |p| {
            Err(XsError::Configuration(format!("{:?} is not a neutrino", p)))
        });
        assert!(result.is_err());
    }
}
