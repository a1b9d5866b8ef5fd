//! Weight semirings for arc and final weights.
//!
//! Every algorithm in this crate is parameterized over a [`Semiring`]:
//! a set of weights with two operations ⊕ (plus) and ⊗ (times), an
//! additive identity [`zero`](Semiring::zero) that annihilates ⊗, and a
//! multiplicative identity [`one`](Semiring::one). Algorithms rely only
//! on this contract and on the static [property flags](Semiring::properties)
//! a semiring declares, never on a concrete weight representation.

mod boolean;
mod log;
mod tropical;

pub use boolean::BooleanWeight;
pub use log::LogWeight;
pub use tropical::TropicalWeight;

use std::fmt::{Debug, Display};
use std::io::{self, Read, Write};

/// Left division is well defined: for all `a`, `b` there is a `c` with
/// `a ⊗ c = b` whenever `b` is reachable from `a`.
pub const LEFT_SEMIRING: u64 = 0x1;

/// Right division is well defined.
pub const RIGHT_SEMIRING: u64 = 0x2;

/// ⊗ is commutative.
pub const COMMUTATIVE: u64 = 0x4;

/// ⊕ is idempotent: `a ⊕ a = a`.
pub const IDEMPOTENT: u64 = 0x8;

/// The path property: `a ⊕ b` is always `a` or `b`.
pub const PATH: u64 = 0x10;

/// A commutative-monoid-pair algebra over which transducer weights are
/// combined.
///
/// Implementations must satisfy the semiring laws: ⊕ and ⊗ associative,
/// ⊕ commutative, [`zero`](Self::zero) the identity of ⊕ and annihilator
/// of ⊗, [`one`](Self::one) the identity of ⊗, and ⊗ distributing over
/// ⊕ on both sides. Floating-point semirings satisfy the laws up to
/// [`approx_equal`](Self::approx_equal).
///
/// A semiring also carries a sentinel [`no_weight`](Self::no_weight)
/// value, distinct from both identities, used only for error
/// signalling. No arithmetic is defined on sentinels: `plus` and
/// `times` return the sentinel when either operand is not a
/// [member](Self::is_member).
pub trait Semiring:
    Clone + Debug + Display + PartialEq + Send + Sync + Sized + 'static
{
    /// The additive identity ⊕-identity and ⊗-annihilator.
    fn zero() -> Self;

    /// The multiplicative identity.
    fn one() -> Self;

    /// The "no weight" error sentinel.
    fn no_weight() -> Self;

    /// False only for the error sentinel.
    fn is_member(&self) -> bool;

    /// Semiring addition ⊕.
    fn plus(&self, rhs: &Self) -> Self;

    /// Semiring multiplication ⊗.
    fn times(&self, rhs: &Self) -> Self;

    /// A hash of this weight, stable across runs and consistent with
    /// equality.
    fn hash_value(&self) -> u64;

    /// Approximate equality within `delta`, used when testing algebraic
    /// laws on floating-point semirings. Exact semirings may ignore
    /// `delta`.
    fn approx_equal(&self, rhs: &Self, delta: f32) -> bool;

    /// Static properties of this semiring, a union of
    /// [`LEFT_SEMIRING`], [`RIGHT_SEMIRING`], [`COMMUTATIVE`],
    /// [`IDEMPOTENT`] and [`PATH`].
    fn properties() -> u64;

    /// Stable textual name of the weight type.
    fn weight_type() -> &'static str;

    /// Stable textual tag of the arc family over this weight type, used
    /// as the registry key component.
    fn arc_type() -> &'static str;

    /// Writes the binary serialization of this weight (little-endian).
    fn write_binary<W: Write>(&self, writer: &mut W) -> io::Result<()>;

    /// Reads a weight from its binary serialization.
    fn read_binary<R: Read>(reader: &mut R) -> io::Result<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identities<W: Semiring>() {
        let zero = W::zero();
        let one = W::one();
        assert!(zero.is_member());
        assert!(one.is_member());
        assert_ne!(zero, one);
        assert!(!W::no_weight().is_member());
    }

    #[test]
    fn test_identities_distinct() {
        identities::<TropicalWeight>();
        identities::<LogWeight>();
        identities::<BooleanWeight>();
    }

    #[test]
    fn test_sentinel_absorbs() {
        let w = TropicalWeight::new(1.5);
        assert!(!w.plus(&TropicalWeight::no_weight()).is_member());
        assert!(!TropicalWeight::no_weight().times(&w).is_member());
    }

    #[test]
    fn test_hash_consistent_with_equality() {
        let a = TropicalWeight::new(2.25);
        let b = TropicalWeight::new(2.25);
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), b.hash_value());
    }
}
