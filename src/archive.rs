// Versioned binary archive of a complete model.
//
// The archive carries every parameter plus both spline tables as their raw
// encoded bytes, so a restored model is identical to the saved one.

use crate::config::Units;
use crate::error::{Result, XsError};
use crate::model::{ModelParameters, ModelVariant, SplineCrossSection};
use crate::particle::{ParticleRegistry, ParticleType};
use crate::signatures::InteractionChannel;
use crate::spline::SplineTable;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Schema version written by this build.
pub const ARCHIVE_VERSION: u32 = 0;

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    payload: Vec<u8>,
}

/// Serialized form of a [`SplineCrossSection`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArchive {
    pub variant: ModelVariant,
    pub primary_types: Vec<ParticleType>,
    pub target_types: Vec<ParticleType>,
    pub interaction_channel: InteractionChannel,
    pub target_mass: f64,
    pub minimum_q2: f64,
    pub units: Units,
    pub threshold_energy: f64,
    pub differential_spline: Vec<u8>,
    pub total_spline: Vec<u8>,
}

impl ModelArchive {
    pub fn from_model(model: &SplineCrossSection) -> Result<Self> {
        Ok(Self {
            variant: model.variant().clone(),
            primary_types: model.primary_types().iter().copied().collect(),
            target_types: model.target_types().iter().copied().collect(),
            interaction_channel: model.interaction_channel(),
            target_mass: model.target_mass(),
            minimum_q2: model.minimum_q2(),
            units: model.units(),
            threshold_energy: model.threshold_energy(),
            differential_spline: model.differential_spline().to_bytes()?,
            total_spline: model.total_spline().to_bytes()?,
        })
    }

    /// Rebuild the model; signatures are derived again from the particle sets.
    pub fn into_model(self, registry: &ParticleRegistry) -> Result<SplineCrossSection> {
        let params = ModelParameters {
            channel: self.interaction_channel,
            target_mass: self.target_mass,
            minimum_q2: self.minimum_q2,
        };
        let model = SplineCrossSection::new(
            self.variant,
            SplineTable::from_bytes(&self.differential_spline)?,
            SplineTable::from_bytes(&self.total_spline)?,
            params,
            self.primary_types,
            self.target_types,
            self.units,
        )?;
        Ok(model
            .with_registry(registry.clone())
            .with_interaction_threshold(self.threshold_energy))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let envelope = Envelope {
            version: ARCHIVE_VERSION,
            payload: bincode::serialize(self)?,
        };
        Ok(bincode::serialize(&envelope)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let envelope: Envelope = bincode::deserialize(bytes)?;
        if envelope.version != ARCHIVE_VERSION {
            return Err(XsError::UnknownArchiveVersion(envelope.version));
        }
        Ok(bincode::deserialize(&envelope.payload)?)
    }
}

impl SplineCrossSection {
    /// Encode the full model into a versioned archive.
    pub fn save(&self) -> Result<Vec<u8>> {
        ModelArchive::from_model(self)?.to_bytes()
    }

    /// Restore a model written by [`SplineCrossSection::save`].
    pub fn load(bytes: &[u8], registry: &ParticleRegistry) -> Result<Self> {
        ModelArchive::from_bytes(bytes)?.into_model(registry)
    }

    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.save()?)?;
        tracing::debug!(path = %path.display(), "saved cross section archive");
        Ok(())
    }

    pub fn load_file(path: impl AsRef<Path>, registry: &ParticleRegistry) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::load(&bytes, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(variant: ModelVariant) -> SplineCrossSection {
        let differential = SplineTable::linear_from_grid(
            vec![vec![1.0, 4.0], vec![-5.0, 0.0], vec![-5.0, 0.0]],
            vec![-1.0, -1.5, -0.5, -1.0, -2.0, -2.5, -1.5, -2.0],
        )
        .unwrap()
        .with_key("INTERACTION", 1);
        let total = SplineTable::linear_from_grid(vec![vec![1.0, 4.0]], vec![-38.0, -35.0]).unwrap();
        let params = ModelParameters {
            channel: InteractionChannel::ChargedCurrent,
            target_mass: 0.938,
            minimum_q2: 1.0,
        };
        SplineCrossSection::new(
            variant,
            differential,
            total,
            params,
            [ParticleType::NuE, ParticleType::NuEBar],
            [ParticleType::Nucleon],
            Units::Meters,
        )
        .unwrap()
    }

    #[test]
    fn test_round_trip_preserves_model() {
        let registry = ParticleRegistry::standard();
        for variant in [
            ModelVariant::Dis,
            ModelVariant::Hnl { hnl_mass: 0.3 },
            ModelVariant::DipoleDis {
                hnl_mass: 0.3,
                dipole_coupling: [1e-6, 0.0, 2e-6],
            },
        ] {
            let original = model(variant).with_interaction_threshold(15.0);
            let restored = SplineCrossSection::load(&original.save().unwrap(), &registry).unwrap();
            assert_eq!(restored, original);
            assert_eq!(restored.differential_spline().read_key::<i32>("INTERACTION"), Some(1));
        }
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let archive = ModelArchive::from_model(&model(ModelVariant::Dis)).unwrap();
        let envelope = Envelope {
            version: ARCHIVE_VERSION + 1,
            payload: bincode::serialize(&archive).unwrap(),
        };
        let bytes = bincode::serialize(&envelope).unwrap();
        assert!(matches!(
            ModelArchive::from_bytes(&bytes),
            Err(XsError::UnknownArchiveVersion(v)) if v == ARCHIVE_VERSION + 1
        ));
    }

    #[test]
    fn test_truncated_archive_is_an_encoding_error() {
        let bytes = model(ModelVariant::Dis).save().unwrap();
        let err = SplineCrossSection::load(&bytes[..bytes.len() / 2], &ParticleRegistry::standard()).unwrap_err();
        assert!(matches!(err, XsError::Encoding(_)), "unexpected error {:?}", err);
    }
}
