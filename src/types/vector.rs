//! Four-vectors for positions and momenta.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A Lorentz four-vector.
///
/// Used both for vertex positions `(x, y, z, t)` and particle momenta
/// `(px, py, pz, e)`; the accessors are named for both readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FourVector {
    /// x or px.
    pub x: f64,
    /// y or py.
    pub y: f64,
    /// z or pz.
    pub z: f64,
    /// t or e.
    pub t: f64,
}

impl FourVector {
    /// Create a new four-vector.
    pub fn new(x: f64, y: f64, z: f64, t: f64) -> Self {
        Self { x, y, z, t }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Whether all four components are exactly zero.
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0 && self.t == 0.0
    }

    /// Momentum x component.
    pub fn px(&self) -> f64 {
        self.x
    }

    /// Momentum y component.
    pub fn py(&self) -> f64 {
        self.y
    }

    /// Momentum z component.
    pub fn pz(&self) -> f64 {
        self.z
    }

    /// Energy component.
    pub fn e(&self) -> f64 {
        self.t
    }

    /// Invariant mass, negative for space-like vectors.
    pub fn m(&self) -> f64 {
        let m2 = self.t * self.t - self.x * self.x - self.y * self.y - self.z * self.z;
        if m2 < 0.0 {
            -(-m2).sqrt()
        } else {
            m2.sqrt()
        }
    }
}

impl fmt::Display for FourVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.x, self.y, self.z, self.t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mass_of_timelike_vector() {
        let p = FourVector::new(0.0, 0.0, 3.0, 5.0);
        assert!((p.m() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero() {
        assert!(FourVector::zero().is_zero());
        assert!(!FourVector::new(0.0, 0.0, 0.0, 1.0).is_zero());
    }
}
