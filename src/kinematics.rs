// Relativistic four-vector algebra used by cross-section evaluation and
// final-state reconstruction. Units are GeV throughout, metric (+,-,-,-).

use nalgebra::{Rotation3, Unit, Vector3};
use std::ops::{Add, Sub};

/// Energy-momentum four-vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FourMomentum {
    pub e: f64,
    pub p: Vector3<f64>,
}

impl FourMomentum {
    pub fn new(e: f64, p: Vector3<f64>) -> Self {
        Self { e, p }
    }

    /// On-shell four-vector: energy recomputed from momentum and mass.
    pub fn on_shell(p: Vector3<f64>, mass: f64) -> Self {
        Self {
            e: (p.norm_squared() + mass * mass).sqrt(),
            p,
        }
    }

    /// `[E, px, py, pz]` layout used by interaction records.
    pub fn from_array(v: [f64; 4]) -> Self {
        Self::new(v[0], Vector3::new(v[1], v[2], v[3]))
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.e, self.p.x, self.p.y, self.p.z]
    }

    /// Minkowski product.
    #[inline]
    pub fn dot(&self, other: &FourMomentum) -> f64 {
        self.e * other.e - self.p.dot(&other.p)
    }

    /// Invariant mass; space-like vectors report zero.
    pub fn mass(&self) -> f64 {
        self.dot(self).max(0.0).sqrt()
    }

    pub fn momentum_magnitude(&self) -> f64 {
        self.p.norm()
    }

    pub fn is_at_rest(&self) -> bool {
        self.p.x == 0.0 && self.p.y == 0.0 && self.p.z == 0.0
    }

    pub fn rotated(&self, rotation: &Rotation3<f64>) -> Self {
        Self::new(self.e, rotation * self.p)
    }

    /// Boost taking this four-vector's frame to its rest frame.
    pub fn rest_boost(&self) -> Boost {
        Boost::new(self.p / self.e)
    }

    /// Inverse of [`FourMomentum::rest_boost`].
    pub fn lab_boost(&self) -> Boost {
        Boost::new(-self.p / self.e)
    }
}

impl Add for FourMomentum {
    type Output = FourMomentum;
    fn add(self, rhs: FourMomentum) -> FourMomentum {
        FourMomentum::new(self.e + rhs.e, self.p + rhs.p)
    }
}

impl Sub for FourMomentum {
    type Output = FourMomentum;
    fn sub(self, rhs: FourMomentum) -> FourMomentum {
        FourMomentum::new(self.e - rhs.e, self.p - rhs.p)
    }
}

/// Pure Lorentz boost into a frame moving with velocity `beta` (units of c).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boost {
    beta: Vector3<f64>,
}

impl Boost {
    pub fn new(beta: Vector3<f64>) -> Self {
        Self { beta }
    }

    pub fn beta(&self) -> Vector3<f64> {
        self.beta
    }

    pub fn inverse(&self) -> Boost {
        Boost::new(-self.beta)
    }

    pub fn apply(&self, v: &FourMomentum) -> FourMomentum {
        let b2 = self.beta.norm_squared();
        if b2 == 0.0 {
            return *v;
        }
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let bp = self.beta.dot(&v.p);
        let e = gamma * (v.e - bp);
        let p = v.p + ((gamma - 1.0) * bp / b2 - gamma * v.e) * self.beta;
        FourMomentum::new(e, p)
    }
}

/// Rotation taking the +x axis onto `direction`.
///
/// The anti-parallel case has no unique minimal rotation; a half turn about
/// +z is used.
pub fn beam_frame_rotation(direction: &Vector3<f64>) -> Rotation3<f64> {
    Rotation3::rotation_between(&Vector3::x(), direction).unwrap_or_else(|| {
        Rotation3::from_axis_angle(&Vector3::z_axis(), std::f64::consts::PI)
    })
}

/// Rotation by `phi` about `axis`.
pub fn azimuthal_rotation(axis: &Vector3<f64>, phi: f64) -> Rotation3<f64> {
    Rotation3::from_axis_angle(&Unit::new_normalize(*axis), phi)
}
