//! Log semiring: (−log(e⁻ˣ + e⁻ʸ), +) over the reals.

use super::{Semiring, COMMUTATIVE, LEFT_SEMIRING, RIGHT_SEMIRING};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};

/// A weight in the log semiring.
///
/// Weights are negated natural logarithms of probabilities; ⊕ sums the
/// underlying probabilities and ⊗ multiplies them, so **0** is `+∞` and
/// **1** is `0.0`. Unlike the tropical semiring, ⊕ here is neither
/// idempotent nor path-forming.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct LogWeight(f32);

impl LogWeight {
    /// Creates a log weight from its value.
    pub fn new(value: f32) -> Self {
        LogWeight(value)
    }

    /// The underlying value.
    pub fn value(self) -> f32 {
        self.0
    }
}

// log(1 + e^-x) for x >= 0, numerically stable near x = 0.
fn log_exp(x: f32) -> f32 {
    (-x).exp().ln_1p()
}

impl Semiring for LogWeight {
    fn zero() -> Self {
        LogWeight(f32::INFINITY)
    }

    fn one() -> Self {
        LogWeight(0.0)
    }

    fn no_weight() -> Self {
        LogWeight(f32::NAN)
    }

    fn is_member(&self) -> bool {
        !self.0.is_nan()
    }

    fn plus(&self, rhs: &Self) -> Self {
        if !self.is_member() || !rhs.is_member() {
            return Self::no_weight();
        }
        if *self == Self::zero() {
            *rhs
        } else if *rhs == Self::zero() {
            *self
        } else if self.0 < rhs.0 {
            LogWeight(self.0 - log_exp(rhs.0 - self.0))
        } else {
            LogWeight(rhs.0 - log_exp(self.0 - rhs.0))
        }
    }

    fn times(&self, rhs: &Self) -> Self {
        if !self.is_member() || !rhs.is_member() {
            return Self::no_weight();
        }
        if *self == Self::zero() || *rhs == Self::zero() {
            return Self::zero();
        }
        LogWeight(self.0 + rhs.0)
    }

    fn hash_value(&self) -> u64 {
        (self.0 + 0.0).to_bits() as u64
    }

    fn approx_equal(&self, rhs: &Self, delta: f32) -> bool {
        if !self.is_member() || !rhs.is_member() {
            return false;
        }
        self.0 == rhs.0 || (self.0 - rhs.0).abs() < delta
    }

    fn properties() -> u64 {
        LEFT_SEMIRING | RIGHT_SEMIRING | COMMUTATIVE
    }

    fn weight_type() -> &'static str {
        "log"
    }

    fn arc_type() -> &'static str {
        "log"
    }

    fn write_binary<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.0.to_le_bytes())
    }

    fn read_binary<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(LogWeight(f32::from_le_bytes(buf)))
    }
}

impl Eq for LogWeight {}

impl fmt::Display for LogWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_nan() {
            write!(f, "BadNumber")
        } else if self.0 == f32::INFINITY {
            write!(f, "Infinity")
        } else if self.0 == f32::NEG_INFINITY {
            write!(f, "-Infinity")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_sums_probabilities() {
        // e^-0.5 + e^-0.5 = 2 e^-0.5, so plus(0.5, 0.5) = 0.5 - ln 2.
        let half = LogWeight::new(0.5);
        let sum = half.plus(&half);
        let expected = 0.5 - 2f32.ln();
        assert!((sum.value() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_zero_is_plus_identity() {
        let a = LogWeight::new(1.25);
        assert_eq!(LogWeight::zero().plus(&a), a);
        assert_eq!(a.plus(&LogWeight::zero()), a);
    }

    #[test]
    fn test_times_is_sum() {
        let a = LogWeight::new(1.0);
        let b = LogWeight::new(2.0);
        assert_eq!(a.times(&b), LogWeight::new(3.0));
        assert_eq!(LogWeight::zero().times(&b), LogWeight::zero());
    }

    #[test]
    fn test_plus_commutes() {
        let a = LogWeight::new(0.25);
        let b = LogWeight::new(1.75);
        assert!(a.plus(&b).approx_equal(&b.plus(&a), 1e-6));
    }
}
