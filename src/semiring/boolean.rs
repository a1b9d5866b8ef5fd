//! Boolean semiring: (∨, ∧) over {false, true}.

use super::{Semiring, COMMUTATIVE, IDEMPOTENT, LEFT_SEMIRING, PATH, RIGHT_SEMIRING};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};

const FALSE: u8 = 0;
const TRUE: u8 = 1;
const BAD: u8 = 2;

/// A weight in the boolean semiring.
///
/// ⊕ is logical or, ⊗ is logical and; **0** is `false`, **1** is
/// `true`. All laws hold exactly, which makes this the semiring of
/// plain acceptance testing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BooleanWeight(u8);

impl BooleanWeight {
    /// Creates a boolean weight.
    pub fn new(value: bool) -> Self {
        BooleanWeight(if value { TRUE } else { FALSE })
    }

    /// The underlying value. The error sentinel reads as `false`.
    pub fn value(self) -> bool {
        self.0 == TRUE
    }
}

impl Semiring for BooleanWeight {
    fn zero() -> Self {
        BooleanWeight(FALSE)
    }

    fn one() -> Self {
        BooleanWeight(TRUE)
    }

    fn no_weight() -> Self {
        BooleanWeight(BAD)
    }

    fn is_member(&self) -> bool {
        self.0 != BAD
    }

    fn plus(&self, rhs: &Self) -> Self {
        if !self.is_member() || !rhs.is_member() {
            return Self::no_weight();
        }
        BooleanWeight::new(self.value() || rhs.value())
    }

    fn times(&self, rhs: &Self) -> Self {
        if !self.is_member() || !rhs.is_member() {
            return Self::no_weight();
        }
        BooleanWeight::new(self.value() && rhs.value())
    }

    fn hash_value(&self) -> u64 {
        self.0 as u64
    }

    fn approx_equal(&self, rhs: &Self, _delta: f32) -> bool {
        self.is_member() && rhs.is_member() && self.0 == rhs.0
    }

    fn properties() -> u64 {
        LEFT_SEMIRING | RIGHT_SEMIRING | COMMUTATIVE | IDEMPOTENT | PATH
    }

    fn weight_type() -> &'static str {
        "boolean"
    }

    fn arc_type() -> &'static str {
        "boolean"
    }

    fn write_binary<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&[self.0])
    }

    fn read_binary<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf)?;
        Ok(BooleanWeight(buf[0]))
    }
}

impl fmt::Display for BooleanWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            FALSE => write!(f, "false"),
            TRUE => write!(f, "true"),
            _ => write!(f, "BadNumber"),
        }
    }
}
