// Model configuration: which spline files to load, which particles the model
// covers and how final states are sampled. Read from JSON; no global state.
use crate::error::{Result, XsError};
use crate::model::{ModelParameters, ModelVariant, SplineCrossSection};
use crate::particle::ParticleRegistry;
use crate::signatures::InteractionChannel;
use crate::spline::SplineTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Area unit the cross-section tables are converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Units {
    /// Tables are in cm², returned unchanged.
    #[default]
    #[serde(rename = "cm")]
    Centimeters,
    #[serde(rename = "m")]
    Meters,
}

impl Units {
    /// Factor applied to every tabulated cross section.
    pub fn scale(self) -> f64 {
        match self {
            Units::Centimeters => 1.0,
            Units::Meters => 1e-4,
        }
    }
}

impl FromStr for Units {
    type Err = XsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cm" => Ok(Units::Centimeters),
            "m" => Ok(Units::Meters),
            other => Err(XsError::Configuration(format!(
                "cannot set units to '{}', acceptable units are: cm, m",
                other
            ))),
        }
    }
}

/// Tuning of the Metropolis-Hastings final-state sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    /// Chain transitions before the point is accepted as a sample.
    pub burn_in: usize,
    /// Cap on rejection draws while looking for one allowed point.
    pub max_proposal_attempts: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            burn_in: 40,
            max_proposal_attempts: 1_000_000,
        }
    }
}

/// Everything needed to build a [`SplineCrossSection`] from disk.
///
/// Channel, target mass and minimum Q² are optional; when absent they are
/// taken from the differential spline's metadata (keys `INTERACTION`,
/// `TARGETMASS`, `Q2MIN`) with the usual fallbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub differential_spline: PathBuf,
    pub total_spline: PathBuf,
    /// Particle names, e.g. `["NuMu", "NuMuBar"]`.
    pub primary_types: Vec<String>,
    pub target_types: Vec<String>,
    #[serde(default)]
    pub interaction_channel: Option<i32>,
    #[serde(default)]
    pub target_mass: Option<f64>,
    #[serde(default)]
    pub minimum_q2: Option<f64>,
    #[serde(default)]
    pub units: Units,
    #[serde(default)]
    pub variant: ModelVariant,
    #[serde(default)]
    pub sampler: SamplerSettings,
}

impl ModelConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Explicit values override whatever the spline metadata says.
    pub fn resolve_parameters(&self, differential: &SplineTable, registry: &ParticleRegistry) -> Result<ModelParameters> {
        let mut params = ModelParameters::from_spline_metadata(differential, registry)?;
        if let Some(code) = self.interaction_channel {
            params.channel = InteractionChannel::try_from(code)?;
        }
        if let Some(mass) = self.target_mass {
            params.target_mass = mass;
        }
        if let Some(q2) = self.minimum_q2 {
            params.minimum_q2 = q2;
        }
        Ok(params)
    }

    /// Load both spline tables and build the model.
    pub fn build(&self, registry: &ParticleRegistry) -> Result<SplineCrossSection> {
        let differential = SplineTable::from_file(&self.differential_spline)?;
        let total = SplineTable::from_file(&self.total_spline)?;
        let params = self.resolve_parameters(&differential, registry)?;
        let primaries = registry.resolve_all(&self.primary_types)?;
        let targets = registry.resolve_all(&self.target_types)?;

        Ok(SplineCrossSection::new(
            self.variant.clone(),
            differential,
            total,
            params,
            primaries,
            targets,
            self.units,
        )?
        .with_registry(registry.clone())
        .with_sampler_settings(self.sampler.clone()))
    }
}
