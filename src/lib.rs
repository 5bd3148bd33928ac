//! Neutrino deep-inelastic scattering cross sections from spline tables.
//!
//! Total and differential cross sections are read from tensor-product
//! B-spline tables fitted in log space. The crate evaluates them, rejects
//! kinematically forbidden points, and samples complete final states
//! (outgoing lepton and hadronic system) into an [`InteractionRecord`].

pub mod archive;
pub mod config;
pub mod cross_section;
pub mod error;
pub mod kinematics;
pub mod model;
pub mod particle;
pub mod record;
pub mod sampler;
pub mod signatures;
pub mod spline;
pub mod validation;

pub use archive::{ModelArchive, ARCHIVE_VERSION};
pub use config::{ModelConfig, SamplerSettings, Units};
pub use cross_section::{CrossSection, CrossSectionKind};
pub use error::{Result, XsError};
pub use kinematics::{Boost, FourMomentum};
pub use model::{ModelParameters, ModelVariant, SplineCrossSection};
pub use particle::{ParticleRegistry, ParticleType};
pub use record::{InteractionRecord, InteractionSignature};
pub use sampler::{KinematicSampler, SampledKinematics};
pub use signatures::{InteractionChannel, SignatureRegistry};
pub use spline::SplineTable;
pub use validation::{kinematically_allowed, minimum_x, y_bounds};
