//! Tropical semiring: (min, +) over the reals.

use super::{Semiring, COMMUTATIVE, IDEMPOTENT, LEFT_SEMIRING, PATH, RIGHT_SEMIRING};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};

/// A weight in the tropical semiring.
///
/// ⊕ is `min`, ⊗ is `+`, **0** is `+∞` and **1** is `0.0`. This is the
/// semiring of shortest-path problems and the weight type behind the
/// `standard` arc family.
///
/// # Example
///
/// ```rust,ignore
/// use libwfst::prelude::*;
///
/// let a = TropicalWeight::new(1.0);
/// let b = TropicalWeight::new(3.0);
/// assert_eq!(a.plus(&b), TropicalWeight::new(1.0));
/// assert_eq!(a.times(&b), TropicalWeight::new(4.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct TropicalWeight(f32);

impl TropicalWeight {
    /// Creates a tropical weight from its value.
    pub fn new(value: f32) -> Self {
        TropicalWeight(value)
    }

    /// The underlying value.
    pub fn value(self) -> f32 {
        self.0
    }
}

impl Semiring for TropicalWeight {
    fn zero() -> Self {
        TropicalWeight(f32::INFINITY)
    }

    fn one() -> Self {
        TropicalWeight(0.0)
    }

    fn no_weight() -> Self {
        TropicalWeight(f32::NAN)
    }

    fn is_member(&self) -> bool {
        !self.0.is_nan()
    }

    fn plus(&self, rhs: &Self) -> Self {
        if !self.is_member() || !rhs.is_member() {
            return Self::no_weight();
        }
        if self.0 < rhs.0 {
            *self
        } else {
            *rhs
        }
    }

    fn times(&self, rhs: &Self) -> Self {
        if !self.is_member() || !rhs.is_member() {
            return Self::no_weight();
        }
        if *self == Self::zero() || *rhs == Self::zero() {
            return Self::zero();
        }
        TropicalWeight(self.0 + rhs.0)
    }

    fn hash_value(&self) -> u64 {
        // +0.0 and -0.0 compare equal, so they must hash alike.
        (self.0 + 0.0).to_bits() as u64
    }

    fn approx_equal(&self, rhs: &Self, delta: f32) -> bool {
        if !self.is_member() || !rhs.is_member() {
            return false;
        }
        self.0 == rhs.0 || (self.0 - rhs.0).abs() < delta
    }

    fn properties() -> u64 {
        LEFT_SEMIRING | RIGHT_SEMIRING | COMMUTATIVE | IDEMPOTENT | PATH
    }

    fn weight_type() -> &'static str {
        "tropical"
    }

    fn arc_type() -> &'static str {
        "standard"
    }

    fn write_binary<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.0.to_le_bytes())
    }

    fn read_binary<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; 4];
        reader.read_exact(&mut buf)?;
        Ok(TropicalWeight(f32::from_le_bytes(buf)))
    }
}

// No-weight sentinels never enter hash tables, so total equality over
// member weights is all the table key needs.
impl Eq for TropicalWeight {}

impl fmt::Display for TropicalWeight {
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
