//! Error types for cross-section evaluation and final-state sampling.

use crate::particle::ParticleType;

/// Errors raised while building, evaluating or sampling a cross-section model.
///
/// Kinematically forbidden points are not errors: they evaluate to a cross
/// section of exactly `0.0`.
#[derive(Debug, thiserror::Error)]
pub enum XsError {
    /// Malformed model parameters (bad particle types, channel, spline shape).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Beam energy (GeV) outside the energy axis of a spline table.
    #[error("interaction energy ({energy} GeV) out of cross section table range: [{min} GeV, {max} GeV]")]
    EnergyOutOfRange { energy: f64, min: f64, max: f64 },

    /// A spline table has the wrong number of axes for the requested operation.
    #[error("dimension mismatch: expected {expected} spline dimensions, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A spline coordinate lies outside the declared extent of its axis.
    #[error("coordinate {value} on axis {axis} outside table extent [{lower}, {upper}]")]
    OutOfDomain {
        axis: usize,
        value: f64,
        lower: f64,
        upper: f64,
    },

    /// The primary is not one the model was built for.
    #[error("primary {0:?} is not supported by this cross section")]
    UnsupportedPrimary(ParticleType),

    /// Mass lookup for a secondary that is not a known lepton.
    #[error("unknown lepton type {0:?}")]
    UnknownLeptonType(ParticleType),

    /// The rejection sampler could not find an allowed kinematic point.
    #[error("no feasible kinematic point found after {attempts} proposals")]
    NoFeasiblePoint { attempts: usize },

    /// Momentum-transfer reconstruction hit a negative transverse radicand.
    #[error("kinematic reconstruction failed: negative transverse radicand {radicand}")]
    Reconstruction { radicand: f64 },

    /// The interaction record does not carry what the operation needs.
    #[error("malformed interaction record: {0}")]
    MalformedRecord(String),

    /// Archive written with a schema version this build cannot read.
    #[error("unsupported archive version {0}")]
    UnknownArchiveVersion(u32),

    #[error("binary encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, XsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_out_of_range_message() {
        let err = XsError::EnergyOutOfRange {
            energy: 5.0,
            min: 10.0,
            max: 1e4,
        };
        let msg = err.to_string();
        assert!(msg.contains("5 GeV"), "unexpected message: {}", msg);
        assert!(msg.contains("[10 GeV, 10000 GeV]"), "unexpected message: {}", msg);
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.bin");
        let err: XsError = io.into();
        assert!(matches!(err, XsError::Io(_)));
    }
}
