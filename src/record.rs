use crate::kinematics::FourMomentum;
use crate::particle::ParticleType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which particles go in and come out of an interaction.
///
/// Ordered and compared as the tuple `(primary, target, secondaries)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InteractionSignature {
    pub primary_type: ParticleType,
    pub target_type: ParticleType,
    pub secondary_types: Vec<ParticleType>,
}

impl InteractionSignature {
    pub fn new(primary_type: ParticleType, target_type: ParticleType, secondary_types: Vec<ParticleType>) -> Self {
        Self {
            primary_type,
            target_type,
            secondary_types,
        }
    }

    /// Index of the outgoing lepton: the first secondary if it is a lepton,
    /// otherwise the second.
    pub fn lepton_index(&self) -> usize {
        match self.secondary_types.first() {
            Some(p) if p.is_lepton() => 0,
            _ => 1,
        }
    }
}

impl Default for InteractionSignature {
    fn default() -> Self {
        Self::new(ParticleType::Unknown, ParticleType::Unknown, Vec::new())
    }
}

/// One candidate interaction.
///
/// The caller fills the primary and target kinematics and the signature;
/// final-state sampling fills the secondary fields and
/// `interaction_parameters` in one go. Four-momenta are `[E, px, py, pz]` in
/// GeV.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub signature: InteractionSignature,
    pub primary_mass: f64,
    pub primary_momentum: [f64; 4],
    pub primary_helicity: f64,
    pub target_mass: f64,
    pub target_momentum: [f64; 4],
    pub target_helicity: f64,
    pub interaction_vertex: [f64; 3],
    pub secondary_momenta: Vec<[f64; 4]>,
    pub secondary_masses: Vec<f64>,
    pub secondary_helicities: Vec<f64>,
    /// Named sampled quantities, e.g. `"bjorken_x"`.
    pub interaction_parameters: BTreeMap<String, f64>,
}

impl InteractionRecord {
    /// Record for a beam hitting a target at rest.
    pub fn new(signature: InteractionSignature, primary_momentum: [f64; 4], primary_mass: f64, target_mass: f64) -> Self {
        Self {
            signature,
            primary_mass,
            primary_momentum,
            target_mass,
            target_momentum: [target_mass, 0.0, 0.0, 0.0],
            ..Default::default()
        }
    }

    /// Primary four-momentum rebuilt on shell from its 3-momentum and mass.
    pub fn primary_four_momentum(&self) -> FourMomentum {
        FourMomentum::on_shell(FourMomentum::from_array(self.primary_momentum).p, self.primary_mass)
    }

    /// Target four-momentum rebuilt on shell from its 3-momentum and mass.
    pub fn target_four_momentum(&self) -> FourMomentum {
        FourMomentum::on_shell(FourMomentum::from_array(self.target_momentum).p, self.target_mass)
    }

    pub fn target_at_rest(&self) -> bool {
        let t = &self.target_momentum;
        t[1] == 0.0 && t[2] == 0.0 && t[3] == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_ordering_is_tuple_order() {
        let a = InteractionSignature::new(ParticleType::NuE, ParticleType::Nucleon, vec![ParticleType::EMinus]);
        let b = InteractionSignature::new(ParticleType::NuMu, ParticleType::PPlus, vec![ParticleType::EMinus]);
        let c = InteractionSignature::new(ParticleType::NuMu, ParticleType::Nucleon, vec![]);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn test_lepton_index() {
        let cc = InteractionSignature::new(
            ParticleType::NuMu,
            ParticleType::Nucleon,
            vec![ParticleType::MuMinus, ParticleType::Hadrons],
        );
        assert_eq!(cc.lepton_index(), 0);
        let flipped = InteractionSignature::new(
            ParticleType::NuMu,
            ParticleType::Nucleon,
            vec![ParticleType::Hadrons, ParticleType::MuMinus],
        );
        assert_eq!(flipped.lepton_index(), 1);
    }

    #[test]
    fn test_record_equality_field_by_field() {
        let mut a = InteractionRecord::default();
        let mut b = InteractionRecord::default();
        assert_eq!(a, b);

        a.signature.primary_type = ParticleType::EMinus;
        assert_ne!(a, b);
        b.signature.primary_type = ParticleType::EMinus;
        assert_eq!(a, b);

        a.primary_momentum = [1.0, 2.0, 3.0, 4.0];
        assert_ne!(a, b);
        b.primary_momentum = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(a, b);

        a.interaction_parameters.insert("bjorken_x".to_string(), 0.1);
        assert_ne!(a, b);
        b.interaction_parameters.insert("bjorken_x".to_string(), 0.1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_new_puts_target_at_rest() {
        let sig = InteractionSignature::new(ParticleType::NuMu, ParticleType::Nucleon, vec![]);
        let record = InteractionRecord::new(sig, [10.0, 0.0, 0.0, 10.0], 0.0, 0.938);
        assert!(record.target_at_rest());
        assert_eq!(record.target_four_momentum().e, 0.938);
        assert_eq!(record.primary_four_momentum().e, 10.0);
    }

    #[test]
    fn test_record_json_round_trip() {
        let sig = InteractionSignature::new(
            ParticleType::NuMu,
            ParticleType::Nucleon,
            vec![ParticleType::MuMinus, ParticleType::Hadrons],
        );
        let record = InteractionRecord::new(sig, [10.0, 0.0, 0.0, 10.0], 0.0, 0.938);
        let json = serde_json::to_string(&record).unwrap();
        let back: InteractionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
