// Spline-backed deep-inelastic cross sections.
//
// One implementation serves every model family: the tables, kinematic
// checks and final-state sampler are shared, and `ModelVariant` supplies the
// per-family rules (which secondaries appear, their masses, extra scaling).

use crate::config::{SamplerSettings, Units};
use crate::cross_section::{CrossSection, CrossSectionKind};
use crate::error::{Result, XsError};
use crate::kinematics::FourMomentum;
use crate::particle::{ParticleRegistry, ParticleType};
use crate::record::{InteractionRecord, InteractionSignature};
use crate::sampler::{reconstruct_final_state, KinematicSampler};
use crate::signatures::{InteractionChannel, SignatureRegistry};
use crate::spline::SplineTable;
use crate::validation::kinematically_allowed;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Model family and its family-specific parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// Standard neutrino deep-inelastic scattering.
    #[default]
    Dis,
    /// Neutral-current production of a heavy neutral lepton of mass `hnl_mass` (GeV).
    Hnl { hnl_mass: f64 },
    /// Heavy neutral lepton production through a transition magnetic moment;
    /// tables are for unit coupling and scaled by `dipole_coupling[flavour]²`.
    DipoleDis { hnl_mass: f64, dipole_coupling: [f64; 3] },
}

impl ModelVariant {
    pub fn kind(&self) -> CrossSectionKind {
        match self {
            ModelVariant::Dis => CrossSectionKind::Dis,
            ModelVariant::Hnl { .. } => CrossSectionKind::Hnl,
            ModelVariant::DipoleDis { .. } => CrossSectionKind::DipoleDis,
        }
    }

    /// Secondaries produced by `primary` in `channel`, lepton first.
    pub fn secondaries(&self, primary: ParticleType, channel: InteractionChannel) -> Result<Vec<ParticleType>> {
        let charged = primary.charged_partner().ok_or_else(|| {
            XsError::Configuration(format!(
                "{:?} is not a neutrino; this model only supports neutrinos as primaries",
                primary
            ))
        })?;
        let heavy = if primary.is_antiparticle() {
            ParticleType::NuF4Bar
        } else {
            ParticleType::NuF4
        };

        let lepton = match (self, channel) {
            (ModelVariant::DipoleDis { .. }, _) => heavy,
            (_, InteractionChannel::ChargedCurrent) => charged,
            (ModelVariant::Dis, InteractionChannel::NeutralCurrent) => primary,
            (ModelVariant::Hnl { .. }, InteractionChannel::NeutralCurrent) => heavy,
            (_, InteractionChannel::GlashowResonance) => ParticleType::Hadrons,
        };
        Ok(vec![lepton, ParticleType::Hadrons])
    }

    /// Mass of the outgoing lepton.
    pub fn secondary_mass(&self, lepton: ParticleType, registry: &ParticleRegistry) -> Result<f64> {
        match (self, lepton) {
            (
                ModelVariant::Hnl { hnl_mass } | ModelVariant::DipoleDis { hnl_mass, .. },
                ParticleType::NuF4 | ParticleType::NuF4Bar,
            ) => Ok(*hnl_mass),
            _ => registry.lepton_mass(lepton),
        }
    }

    /// Family-specific factor on top of the unit conversion.
    pub fn scale(&self, primary: ParticleType) -> f64 {
        match self {
            ModelVariant::DipoleDis { dipole_coupling, .. } => primary
                .flavor_index()
                .map(|i| dipole_coupling[i] * dipole_coupling[i])
                .unwrap_or(0.0),
            _ => 1.0,
        }
    }
}

/// Scalar parameters of a model that spline files may carry as metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParameters {
    pub channel: InteractionChannel,
    /// Target mass in GeV.
    pub target_mass: f64,
    /// Minimum Q² in GeV² below which the tables are not defined.
    pub minimum_q2: f64,
}

impl ModelParameters {
    /// Read `INTERACTION`, `TARGETMASS` and `Q2MIN` from the differential
    /// table, falling back to neutral current, 1 GeV² and a target mass
    /// implied by the channel (or by the table dimensionality).
    pub fn from_spline_metadata(differential: &SplineTable, registry: &ParticleRegistry) -> Result<Self> {
        let channel_key = differential.read_key::<i32>("INTERACTION");
        let channel = match channel_key {
            Some(code) => InteractionChannel::try_from(code)?,
            None => {
                tracing::warn!("spline has no INTERACTION key, assuming neutral current");
                InteractionChannel::NeutralCurrent
            }
        };

        let minimum_q2 = differential.read_key::<f64>("Q2MIN").unwrap_or_else(|| {
            tracing::warn!("spline has no Q2MIN key, assuming 1 GeV^2");
            1.0
        });

        let electron_mass = registry.mass(ParticleType::EMinus).unwrap_or(crate::particle::ELECTRON_MASS);
        let target_mass = match differential.read_key::<f64>("TARGETMASS") {
            Some(mass) => mass,
            None if channel_key.is_some() => match channel {
                InteractionChannel::ChargedCurrent | InteractionChannel::NeutralCurrent => {
                    registry.isoscalar_nucleon_mass()
                }
                InteractionChannel::GlashowResonance => electron_mass,
            },
            None => match differential.ndim() {
                3 => registry.isoscalar_nucleon_mass(),
                2 => electron_mass,
                got => return Err(XsError::DimensionMismatch { expected: 3, got }),
            },
        };

        Ok(Self {
            channel,
            target_mass,
            minimum_q2,
        })
    }
}

/// Deep-inelastic cross section from a differential and a total spline table.
///
/// The differential table is `log10(d²σ/dxdy)` over
/// `(log10 E, log10 x, log10 y)` (or `(log10 E, log10 x)`), the total table
/// is `log10 σ` over `log10 E`. Immutable once built; share it across
/// threads and give every sampling call its own RNG.
#[derive(Debug, Clone)]
pub struct SplineCrossSection {
    variant: ModelVariant,
    differential: SplineTable,
    total: SplineTable,
    primary_types: BTreeSet<ParticleType>,
    target_types: BTreeSet<ParticleType>,
    channel: InteractionChannel,
    target_mass: f64,
    minimum_q2: f64,
    units: Units,
    signatures: SignatureRegistry,
    registry: ParticleRegistry,
    sampler: SamplerSettings,
    /// Rest-frame beam energy (GeV) below which the total cross section is zero.
    threshold: f64,
}

impl SplineCrossSection {
    pub fn new<P, T>(
        variant: ModelVariant,
        differential: SplineTable,
        total: SplineTable,
        params: ModelParameters,
        primary_types: P,
        target_types: T,
        units: Units,
    ) -> Result<Self>
    where
        P: IntoIterator<Item = ParticleType>,
        T: IntoIterator<Item = ParticleType>,
    {
        let ndim = differential.ndim();
        if ndim != 2 && ndim != 3 {
            return Err(XsError::Configuration(format!(
                "cross section spline has {} dimensions, should have either 3 (log10(E), log10(x), log10(y)) or 2 (log10(E), log10(x))",
                ndim
            )));
        }
        if total.ndim() != 1 {
            return Err(XsError::Configuration(format!(
                "total cross section spline has {} dimensions, should have 1, log10(E)",
                total.ndim()
            )));
        }

        let primary_types: BTreeSet<ParticleType> = primary_types.into_iter().collect();
        let target_types: BTreeSet<ParticleType> = target_types.into_iter().collect();
        let signatures = SignatureRegistry::build(&primary_types, &target_types, |primary| {
            variant.secondaries(primary, params.channel)
        })?;

        tracing::debug!(
            kind = ?variant.kind(),
            differential_dims = ndim,
            channel = params.channel.code(),
            target_mass = params.target_mass,
            minimum_q2 = params.minimum_q2,
            signatures = signatures.len(),
            "built spline cross section"
        );

        Ok(Self {
            variant,
            differential,
            total,
            primary_types,
            target_types,
            channel: params.channel,
            target_mass: params.target_mass,
            minimum_q2: params.minimum_q2,
            units,
            signatures,
            registry: ParticleRegistry::standard(),
            sampler: SamplerSettings::default(),
            threshold: 0.0,
        })
    }

    /// Build from tables, taking channel, target mass and Q²min from the
    /// differential table's metadata.
    pub fn from_tables<P, T>(
        variant: ModelVariant,
        differential: SplineTable,
        total: SplineTable,
        primary_types: P,
        target_types: T,
        units: Units,
    ) -> Result<Self>
    where
        P: IntoIterator<Item = ParticleType>,
        T: IntoIterator<Item = ParticleType>,
    {
        let params = ModelParameters::from_spline_metadata(&differential, &ParticleRegistry::standard())?;
        Self::new(variant, differential, total, params, primary_types, target_types, units)
    }

    /// Build from encoded tables held in memory.
    pub fn from_bytes<P, T>(
        variant: ModelVariant,
        differential: &[u8],
        total: &[u8],
        params: ModelParameters,
        primary_types: P,
        target_types: T,
        units: Units,
    ) -> Result<Self>
    where
        P: IntoIterator<Item = ParticleType>,
        T: IntoIterator<Item = ParticleType>,
    {
        let differential = SplineTable::from_bytes(differential)?;
        let total = SplineTable::from_bytes(total)?;
        Self::new(variant, differential, total, params, primary_types, target_types, units)
    }

    /// Build from table files, taking parameters from the metadata.
    pub fn from_files<P, T>(
        variant: ModelVariant,
        differential: impl AsRef<Path>,
        total: impl AsRef<Path>,
        primary_types: P,
        target_types: T,
        units: Units,
    ) -> Result<Self>
    where
        P: IntoIterator<Item = ParticleType>,
        T: IntoIterator<Item = ParticleType>,
    {
        let differential = SplineTable::from_file(differential)?;
        let total = SplineTable::from_file(total)?;
        Self::from_tables(variant, differential, total, primary_types, target_types, units)
    }

    /// Use `registry` for lepton-mass lookups.
    pub fn with_registry(mut self, registry: ParticleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Zero the total cross section below `energy` GeV in the target rest frame.
    pub fn with_interaction_threshold(mut self, energy: f64) -> Self {
        self.threshold = energy;
        self
    }

    pub fn with_sampler_settings(mut self, settings: SamplerSettings) -> Self {
        self.sampler = settings;
        self
    }

    pub fn variant(&self) -> &ModelVariant {
        &self.variant
    }

    pub fn differential_spline(&self) -> &SplineTable {
        &self.differential
    }

    pub fn total_spline(&self) -> &SplineTable {
        &self.total
    }

    pub fn primary_types(&self) -> &BTreeSet<ParticleType> {
        &self.primary_types
    }

    pub fn target_types(&self) -> &BTreeSet<ParticleType> {
        &self.target_types
    }

    pub fn interaction_channel(&self) -> InteractionChannel {
        self.channel
    }

    pub fn target_mass(&self) -> f64 {
        self.target_mass
    }

    pub fn minimum_q2(&self) -> f64 {
        self.minimum_q2
    }

    pub fn units(&self) -> Units {
        self.units
    }

    pub fn threshold_energy(&self) -> f64 {
        self.threshold
    }

    pub fn sampler_settings(&self) -> &SamplerSettings {
        &self.sampler
    }

    pub fn parameters(&self) -> ModelParameters {
        ModelParameters {
            channel: self.channel,
            target_mass: self.target_mass,
            minimum_q2: self.minimum_q2,
        }
    }

    fn scale(&self, primary: ParticleType) -> f64 {
        self.units.scale() * self.variant.scale(primary)
    }

    /// Beam energy in the target rest frame, from the on-shell primary as
    /// the sampler sees it.
    fn rest_frame_energy(record: &InteractionRecord) -> f64 {
        if record.target_at_rest() {
            record.primary_four_momentum().e
        } else {
            let target = record.target_four_momentum();
            target.rest_boost().apply(&record.primary_four_momentum()).e
        }
    }

    /// Total cross section for a primary of `energy` GeV.
    ///
    /// Energies outside the total table are an error, not a zero.
    pub fn total_cross_section_for(&self, primary: ParticleType, energy: f64) -> Result<f64> {
        if !self.primary_types.contains(&primary) {
            return Err(XsError::UnsupportedPrimary(primary));
        }
        let log_energy = energy.log10();
        let out_of_range = || XsError::EnergyOutOfRange {
            energy,
            min: 10f64.powf(self.total.lower_extent(0)),
            max: 10f64.powf(self.total.upper_extent(0)),
        };
        if !self.total.within_extent(0, log_energy) {
            return Err(out_of_range());
        }
        let point = [log_energy];
        let centers = self.total.search_centers(&point).ok_or_else(out_of_range)?;
        let log_xs = self.total.evaluate_at_centers(&point, &centers);
        Ok(self.scale(primary) * 10f64.powf(log_xs))
    }

    /// d²σ/dxdy at explicit kinematics; zero wherever the tables are not
    /// defined or the point is unphysical.
    ///
    /// `q2` defaults to `2 E M x y` for a target at rest.
    pub fn differential_cross_section_at(
        &self,
        primary: ParticleType,
        energy: f64,
        x: f64,
        y: f64,
        secondary_mass: f64,
        q2: Option<f64>,
    ) -> Result<f64> {
        if !self.primary_types.contains(&primary) {
            return Err(XsError::UnsupportedPrimary(primary));
        }
        let log_energy = energy.log10();
        if !self.differential.within_extent(0, log_energy) {
            return Ok(0.0);
        }
        if !(x > 0.0 && x < 1.0) || !(y > 0.0 && y < 1.0) {
            return Ok(0.0);
        }

        let q2 = match q2 {
            Some(q2) if !q2.is_nan() => q2,
            _ => 2.0 * energy * self.target_mass * x * y,
        };
        if !(q2 >= self.minimum_q2) {
            return Ok(0.0);
        }
        // the tables themselves do not encode the kinematic boundary
        if !kinematically_allowed(x, y, energy, self.target_mass, secondary_mass) {
            return Ok(0.0);
        }

        let point: Vec<f64> = if self.differential.ndim() == 3 {
            vec![log_energy, x.log10(), y.log10()]
        } else {
            vec![log_energy, x.log10()]
        };
        if point
            .iter()
            .enumerate()
            .any(|(axis, &v)| !self.differential.within_extent(axis, v))
        {
            return Ok(0.0);
        }
        let Some(centers) = self.differential.search_centers(&point) else {
            return Ok(0.0);
        };
        let value = self.differential.evaluate_at_centers(&point, &centers);
        if value.is_nan() {
            return Ok(0.0);
        }
        Ok(self.scale(primary) * 10f64.powf(value))
    }
}

impl PartialEq for SplineCrossSection {
    fn eq(&self, other: &Self) -> bool {
        self.variant == other.variant
            && self.channel == other.channel
            && self.target_mass == other.target_mass
            && self.minimum_q2 == other.minimum_q2
            && self.units == other.units
            && self.signatures == other.signatures
            && self.primary_types == other.primary_types
            && self.target_types == other.target_types
            && self.differential == other.differential
            && self.total == other.total
            && self.threshold == other.threshold
    }
}

impl CrossSection for SplineCrossSection {
    fn kind(&self) -> CrossSectionKind {
        self.variant.kind()
    }

    fn total_cross_section(&self, record: &InteractionRecord) -> Result<f64> {
        let energy = Self::rest_frame_energy(record);
        if energy < self.interaction_threshold(record) {
            return Ok(0.0);
        }
        self.total_cross_section_for(record.signature.primary_type, energy)
    }

    fn total_cross_section_for_target(&self, primary: ParticleType, energy: f64, _target: ParticleType) -> Result<f64> {
        self.total_cross_section_for(primary, energy)
    }

    fn interaction_threshold(&self, _record: &InteractionRecord) -> f64 {
        self.threshold
    }

    fn differential_cross_section(&self, record: &InteractionRecord) -> Result<f64> {
        let signature = &record.signature;
        if signature.secondary_types.len() != 2
            || record.secondary_momenta.len() != 2
            || record.secondary_masses.len() != 2
        {
            return Err(XsError::MalformedRecord(
                "expected exactly two secondaries with momenta and masses".to_string(),
            ));
        }

        let energy = Self::rest_frame_energy(record);
        let lepton_index = signature.lepton_index();
        let p1 = record.primary_four_momentum();
        let p2 = record.target_four_momentum();
        let p3 = FourMomentum::on_shell(
            FourMomentum::from_array(record.secondary_momenta[lepton_index]).p,
            record.secondary_masses[lepton_index],
        );

        let q = p1 - p3;
        let q2 = -q.dot(&q);
        let y = 1.0 - p2.dot(&p3) / p2.dot(&p1);
        let x = q2 / (2.0 * p2.dot(&q));
        let lepton_mass = self
            .variant
            .secondary_mass(signature.secondary_types[lepton_index], &self.registry)?;

        self.differential_cross_section_at(signature.primary_type, energy, x, y, lepton_mass, Some(q2))
    }

    fn sample_final_state(&self, record: &mut InteractionRecord, rng: &mut dyn RngCore) -> Result<()> {
        if self.differential.ndim() != 3 {
            return Err(XsError::DimensionMismatch {
                expected: 3,
                got: self.differential.ndim(),
            });
        }
        let signature = &record.signature;
        if signature.secondary_types.len() != 2 {
            return Err(XsError::MalformedRecord(format!(
                "expected two secondary types, got {}",
                signature.secondary_types.len()
            )));
        }

        let p1 = record.primary_four_momentum();
        let p2 = record.target_four_momentum();
        // the target rest frame is the frame the tables are defined in
        let (p1_rest, p2_rest, to_start) = if record.target_at_rest() {
            (p1, p2, None)
        } else {
            let to_rest = p2.rest_boost();
            (to_rest.apply(&p1), to_rest.apply(&p2), Some(p2.lab_boost()))
        };

        let lepton_index = signature.lepton_index();
        let other_index = 1 - lepton_index;
        let lepton_mass = self
            .variant
            .secondary_mass(signature.secondary_types[lepton_index], &self.registry)?;

        let sampler = KinematicSampler::new(
            &self.differential,
            self.target_mass,
            self.minimum_q2,
            lepton_mass,
            &self.sampler,
        )?;
        let kin = sampler.sample(p1_rest.e, p2_rest.e, &mut *rng)?;

        let phi = rng.gen_range(0.0..2.0 * std::f64::consts::PI);
        let (p3_rest, p4_rest) = reconstruct_final_state(&p1_rest, &p2_rest, lepton_mass, kin.y, kin.q2, phi)?;
        let (p3, p4) = match to_start {
            Some(boost) => (boost.apply(&p3_rest), boost.apply(&p4_rest)),
            None => (p3_rest, p4_rest),
        };

        let mut momenta = vec![[0.0; 4]; 2];
        let mut masses = vec![0.0; 2];
        let mut helicities = vec![0.0; 2];
        momenta[lepton_index] = p3.to_array();
        masses[lepton_index] = p3.mass();
        helicities[lepton_index] = record.primary_helicity;
        momenta[other_index] = p4.to_array();
        masses[other_index] = p4.mass();
        helicities[other_index] = record.target_helicity;

        record.secondary_momenta = momenta;
        record.secondary_masses = masses;
        record.secondary_helicities = helicities;
        record.interaction_parameters.clear();
        record.interaction_parameters.insert("energy".to_string(), p1_rest.e);
        record.interaction_parameters.insert("bjorken_x".to_string(), kin.x);
        record.interaction_parameters.insert("bjorken_y".to_string(), kin.y);
        Ok(())
    }

    fn possible_primaries(&self) -> Vec<ParticleType> {
        self.primary_types.iter().copied().collect()
    }

    fn possible_targets(&self) -> Vec<ParticleType> {
        self.target_types.iter().copied().collect()
    }

    fn possible_targets_from_primary(&self, primary: ParticleType) -> Vec<ParticleType> {
        if self.primary_types.contains(&primary) {
            self.possible_targets()
        } else {
            Vec::new()
        }
    }

    fn possible_signatures(&self) -> Vec<InteractionSignature> {
        self.signatures.signatures().to_vec()
    }

    fn possible_signatures_from_parents(&self, primary: ParticleType, target: ParticleType) -> Vec<InteractionSignature> {
        self.signatures.from_parents(primary, target)
    }

    fn density_variables(&self) -> Vec<String> {
        vec!["Bjorken x".to_string(), "Bjorken y".to_string()]
    }

    fn as_spline_model(&self) -> Option<&SplineCrossSection> {
        Some(self)
    }

    fn equals(&self, other: &dyn CrossSection) -> bool {
        other.kind() == self.kind() && other.as_spline_model().map_or(false, |o| o == self)
    }
}
