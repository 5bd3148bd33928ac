use crate::error::{Result, XsError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Electron mass in GeV.
pub const ELECTRON_MASS: f64 = 0.000_510_998_950;
/// Muon mass in GeV.
pub const MUON_MASS: f64 = 0.105_658_375_5;
/// Tau mass in GeV.
pub const TAU_MASS: f64 = 1.776_86;
/// Proton mass in GeV.
pub const PROTON_MASS: f64 = 0.938_272_088_16;
/// Neutron mass in GeV.
pub const NEUTRON_MASS: f64 = 0.939_565_420_52;

/// Particle species, identified by PDG Monte Carlo code.
///
/// Codes outside the PDG scheme (`Nucleon`, `Hadrons`) follow the usual
/// event-generator conventions for an isoscalar target and an unresolved
/// hadronic shower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
#[repr(i32)]
pub enum ParticleType {
    Unknown = 0,
    EMinus = 11,
    EPlus = -11,
    NuE = 12,
    NuEBar = -12,
    MuMinus = 13,
    MuPlus = -13,
    NuMu = 14,
    NuMuBar = -14,
    TauMinus = 15,
    TauPlus = -15,
    NuTau = 16,
    NuTauBar = -16,
    /// Heavy neutral lepton.
    NuF4 = 5914,
    NuF4Bar = -5914,
    PPlus = 2212,
    PMinus = -2212,
    Neutron = 2112,
    NeutronBar = -2112,
    Nucleon = 2_000_002_112,
    Hadrons = -2_000_001_006,
}

const ALL_TYPES: [(ParticleType, &str); 21] = [
    (ParticleType::Unknown, "unknown"),
    (ParticleType::EMinus, "EMinus"),
    (ParticleType::EPlus, "EPlus"),
    (ParticleType::NuE, "NuE"),
    (ParticleType::NuEBar, "NuEBar"),
    (ParticleType::MuMinus, "MuMinus"),
    (ParticleType::MuPlus, "MuPlus"),
    (ParticleType::NuMu, "NuMu"),
    (ParticleType::NuMuBar, "NuMuBar"),
    (ParticleType::TauMinus, "TauMinus"),
    (ParticleType::TauPlus, "TauPlus"),
    (ParticleType::NuTau, "NuTau"),
    (ParticleType::NuTauBar, "NuTauBar"),
    (ParticleType::NuF4, "NuF4"),
    (ParticleType::NuF4Bar, "NuF4Bar"),
    (ParticleType::PPlus, "PPlus"),
    (ParticleType::PMinus, "PMinus"),
    (ParticleType::Neutron, "Neutron"),
    (ParticleType::NeutronBar, "NeutronBar"),
    (ParticleType::Nucleon, "Nucleon"),
    (ParticleType::Hadrons, "Hadrons"),
];

impl ParticleType {
    /// PDG Monte Carlo code.
    #[inline]
    pub fn pdg_code(self) -> i32 {
        self as i32
    }

    pub fn is_antiparticle(self) -> bool {
        self.pdg_code() < 0
    }

    /// Standard-model neutrinos and antineutrinos.
    pub fn is_neutrino(self) -> bool {
        matches!(self.pdg_code().abs(), 12 | 14 | 16)
    }

    pub fn is_charged_lepton(self) -> bool {
        matches!(self.pdg_code().abs(), 11 | 13 | 15)
    }

    /// Charged leptons, neutrinos and the heavy neutral lepton.
    pub fn is_lepton(self) -> bool {
        self.is_charged_lepton() || self.is_neutrino() || self.pdg_code().abs() == 5914
    }

    /// Lepton flavour index: 0 for e, 1 for mu, 2 for tau.
    pub fn flavor_index(self) -> Option<usize> {
        match self.pdg_code().abs() {
            11 | 12 => Some(0),
            13 | 14 => Some(1),
            15 | 16 => Some(2),
            _ => None,
        }
    }

    /// Charged lepton of the same flavour and lepton number as a neutrino.
    pub fn charged_partner(self) -> Option<ParticleType> {
        match self {
            ParticleType::NuE => Some(ParticleType::EMinus),
            ParticleType::NuEBar => Some(ParticleType::EPlus),
            ParticleType::NuMu => Some(ParticleType::MuMinus),
            ParticleType::NuMuBar => Some(ParticleType::MuPlus),
            ParticleType::NuTau => Some(ParticleType::TauMinus),
            ParticleType::NuTauBar => Some(ParticleType::TauPlus),
            _ => None,
        }
    }
}

// Ordered by PDG code so that sets and signatures sort the same way
// regardless of declaration order.
impl Ord for ParticleType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pdg_code().cmp(&other.pdg_code())
    }
}

impl PartialOrd for ParticleType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<ParticleType> for i32 {
    fn from(p: ParticleType) -> i32 {
        p.pdg_code()
    }
}

impl TryFrom<i32> for ParticleType {
    type Error = XsError;

    fn try_from(code: i32) -> Result<Self> {
        ALL_TYPES
            .iter()
            .map(|(p, _)| *p)
            .find(|p| p.pdg_code() == code)
            .ok_or_else(|| XsError::Configuration(format!("unknown particle code {}", code)))
    }
}

/// Immutable lookup tables for particle names and masses.
///
/// Built once by the caller and handed to whatever needs name resolution or
/// mass lookups; there is no process-wide instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleRegistry {
    by_name: BTreeMap<String, ParticleType>,
    names: BTreeMap<ParticleType, String>,
    masses: BTreeMap<ParticleType, f64>,
}

impl ParticleRegistry {
    /// Registry with every known particle type and PDG masses (GeV).
    pub fn standard() -> Self {
        let mut by_name = BTreeMap::new();
        let mut names = BTreeMap::new();
        for (particle, name) in ALL_TYPES.iter() {
            by_name.insert(name.to_string(), *particle);
            names.insert(*particle, name.to_string());
        }

        let masses = BTreeMap::from([
            (ParticleType::EMinus, ELECTRON_MASS),
            (ParticleType::EPlus, ELECTRON_MASS),
            (ParticleType::MuMinus, MUON_MASS),
            (ParticleType::MuPlus, MUON_MASS),
            (ParticleType::TauMinus, TAU_MASS),
            (ParticleType::TauPlus, TAU_MASS),
            (ParticleType::NuE, 0.0),
            (ParticleType::NuEBar, 0.0),
            (ParticleType::NuMu, 0.0),
            (ParticleType::NuMuBar, 0.0),
            (ParticleType::NuTau, 0.0),
            (ParticleType::NuTauBar, 0.0),
            (ParticleType::PPlus, PROTON_MASS),
            (ParticleType::PMinus, PROTON_MASS),
            (ParticleType::Neutron, NEUTRON_MASS),
            (ParticleType::NeutronBar, NEUTRON_MASS),
            (ParticleType::Nucleon, 0.5 * (PROTON_MASS + NEUTRON_MASS)),
        ]);

        Self {
            by_name,
            names,
            masses,
        }
    }

    /// Resolve a particle by name (e.g. `"NuMu"`).
    pub fn by_name(&self, name: &str) -> Option<ParticleType> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, particle: ParticleType) -> Option<&str> {
        self.names.get(&particle).map(String::as_str)
    }

    /// Resolve a list of names, failing on the first unknown one.
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<ParticleType>> {
        names
            .iter()
            .map(|n| {
                self.by_name(n.as_ref()).ok_or_else(|| {
                    XsError::Configuration(format!("unknown particle name '{}'", n.as_ref()))
                })
            })
            .collect()
    }

    pub fn mass(&self, particle: ParticleType) -> Option<f64> {
        self.masses.get(&particle).copied()
    }

    /// Mass of a standard-model lepton; neutrinos are massless.
    pub fn lepton_mass(&self, lepton: ParticleType) -> Result<f64> {
        if !(lepton.is_charged_lepton() || lepton.is_neutrino()) {
            return Err(XsError::UnknownLeptonType(lepton));
        }
        self.mass(lepton).ok_or(XsError::UnknownLeptonType(lepton))
    }

    /// Average of proton and neutron masses.
    pub fn isoscalar_nucleon_mass(&self) -> f64 {
        0.5 * (PROTON_MASS + NEUTRON_MASS)
    }
}

impl Default for ParticleRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
