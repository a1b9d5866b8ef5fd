//! The transition record and its label/state conventions.

use crate::semiring::{LogWeight, Semiring, TropicalWeight};
use serde::{Deserialize, Serialize};

/// An arc or state label. Labels are signed: `0` is reserved for
/// epsilon, `-1` for "no label", and labels ≤ −2 for internal
/// sentinels. User labels are positive. Ordering is numeric.
pub type Label = i32;

/// A state identifier. Non-negative for real states; `-1` denotes
/// "no state".
pub type StateId = i32;

/// The epsilon label: matches nothing on the tape but consumes a
/// transition.
pub const EPSILON: Label = 0;

/// The "no label" sentinel.
pub const NO_LABEL: Label = -1;

/// The "no state" sentinel.
pub const NO_STATE_ID: StateId = -1;

/// Arc-iterator flag: the caller needs `ilabel`.
pub const ARC_I_LABEL_VALUE: u32 = 0x1;
/// Arc-iterator flag: the caller needs `olabel`.
pub const ARC_O_LABEL_VALUE: u32 = 0x2;
/// Arc-iterator flag: the caller needs `weight`.
pub const ARC_WEIGHT_VALUE: u32 = 0x4;
/// Arc-iterator flag: the caller needs `nextstate`.
pub const ARC_NEXT_STATE_VALUE: u32 = 0x8;
/// All arc-value flags.
pub const ARC_VALUE_FLAGS: u32 =
    ARC_I_LABEL_VALUE | ARC_O_LABEL_VALUE | ARC_WEIGHT_VALUE | ARC_NEXT_STATE_VALUE;
/// Arc-iterator flag: do not cache the arcs this iterator produces.
pub const ARC_NO_CACHE: u32 = 0x10;
/// All arc-iterator flags.
pub const ARC_FLAGS: u32 = ARC_VALUE_FLAGS | ARC_NO_CACHE;

/// A transition: input label, output label, weight and destination
/// state.
///
/// Equality is field-wise. The weight type selects the arc family; the
/// family's stable textual tag comes from
/// [`Semiring::arc_type`](crate::semiring::Semiring::arc_type).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Arc<W: Semiring> {
    /// Input label.
    pub ilabel: Label,
    /// Output label.
    pub olabel: Label,
    /// Arc weight.
    pub weight: W,
    /// Destination state.
    pub nextstate: StateId,
}

impl<W: Semiring> Arc<W> {
    /// Creates an arc from its four fields.
    pub fn new(ilabel: Label, olabel: Label, weight: W, nextstate: StateId) -> Self {
        Arc {
            ilabel,
            olabel,
            weight,
            nextstate,
        }
    }
}

/// Arc over the tropical semiring: the `standard` arc family.
pub type StdArc = Arc<TropicalWeight>;

/// Arc over the log semiring.
pub type LogArc = Arc<LogWeight>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fieldwise_equality() {
        let a = StdArc::new(1, 2, TropicalWeight::new(0.5), 3);
        let b = StdArc::new(1, 2, TropicalWeight::new(0.5), 3);
        let c = StdArc::new(1, 2, TropicalWeight::new(0.5), 4);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_label_conventions() {
        assert_eq!(EPSILON, 0);
        assert_eq!(NO_LABEL, -1);
        assert!(NO_LABEL > -2); // internal sentinels sort below no-label
    }
}
