//! Structural property flags and their pure propagation rules.
//!
//! A transducer carries a 64-bit property word. Three bits are binary
//! (their value is always known); the rest come in known-true /
//! known-false pairs, where neither bit set means "unknown". Algorithms
//! maintain these words by pure propagation instead of rescanning; a
//! bit set to true must in fact hold, a bit set to false must in fact
//! not hold, and unknown permits either.

use super::arc::EPSILON;
use super::{ArcIter as _, Fst, StateIter as _};
use crate::semiring::Semiring;
use rustc_hash::FxHashSet;

/// The state count is known in O(1).
pub const EXPANDED: u64 = 0x1;
/// The transducer supports in-place mutation.
pub const MUTABLE: u64 = 0x2;
/// The transducer is in the sticky error state.
pub const ERROR: u64 = 0x4;

/// Every arc has `ilabel == olabel`.
pub const ACCEPTOR: u64 = 0x8;
/// Some arc has `ilabel != olabel`.
pub const NOT_ACCEPTOR: u64 = 0x10;

/// Per state, input labels are pairwise distinct and never epsilon.
pub const I_DETERMINISTIC: u64 = 0x20;
/// Some state has duplicate or epsilon input labels.
pub const NON_I_DETERMINISTIC: u64 = 0x40;

/// Per state, output labels are pairwise distinct and never epsilon.
pub const O_DETERMINISTIC: u64 = 0x80;
/// Some state has duplicate or epsilon output labels.
pub const NON_O_DETERMINISTIC: u64 = 0x100;

/// Some arc has an epsilon input or output label.
pub const EPSILONS: u64 = 0x200;
/// No arc has an epsilon input or output label.
pub const NO_EPSILONS: u64 = 0x400;

/// Some arc has an epsilon input label.
pub const I_EPSILONS: u64 = 0x800;
/// No arc has an epsilon input label.
pub const NO_I_EPSILONS: u64 = 0x1000;

/// Some arc has an epsilon output label.
pub const O_EPSILONS: u64 = 0x2000;
/// No arc has an epsilon output label.
pub const NO_O_EPSILONS: u64 = 0x4000;

/// Per state, arcs are sorted by input label.
pub const I_LABEL_SORTED: u64 = 0x8000;
/// Some state's arcs are not sorted by input label.
pub const NOT_I_LABEL_SORTED: u64 = 0x10000;

/// Per state, arcs are sorted by output label.
pub const O_LABEL_SORTED: u64 = 0x20000;
/// Some state's arcs are not sorted by output label.
pub const NOT_O_LABEL_SORTED: u64 = 0x40000;

/// Some arc or final weight is neither **0** nor **1**.
pub const WEIGHTED: u64 = 0x80000;
/// Every arc and final weight is **0** or **1**.
pub const UNWEIGHTED: u64 = 0x100000;

/// Every state is reachable from the start state.
pub const ACCESSIBLE: u64 = 0x200000;
/// Some state is unreachable from the start state.
pub const NOT_ACCESSIBLE: u64 = 0x400000;

/// The binary (always-known) property bits.
pub const BINARY_PROPERTIES: u64 = EXPANDED | MUTABLE | ERROR;

/// The known-true sides of all trinary pairs.
pub const POS_TRINARY_PROPERTIES: u64 = ACCEPTOR
    | I_DETERMINISTIC
    | O_DETERMINISTIC
    | EPSILONS
    | I_EPSILONS
    | O_EPSILONS
    | I_LABEL_SORTED
    | O_LABEL_SORTED
    | WEIGHTED
    | ACCESSIBLE;

/// The known-false sides of all trinary pairs.
pub const NEG_TRINARY_PROPERTIES: u64 = NOT_ACCEPTOR
    | NON_I_DETERMINISTIC
    | NON_O_DETERMINISTIC
    | NO_EPSILONS
    | NO_I_EPSILONS
    | NO_O_EPSILONS
    | NOT_I_LABEL_SORTED
    | NOT_O_LABEL_SORTED
    | UNWEIGHTED
    | NOT_ACCESSIBLE;

/// All trinary property bits.
pub const TRINARY_PROPERTIES: u64 = POS_TRINARY_PROPERTIES | NEG_TRINARY_PROPERTIES;

/// All property bits.
pub const FST_PROPERTIES: u64 = BINARY_PROPERTIES | TRINARY_PROPERTIES;

/// Properties a copy or a lazy view carries over unchanged. The
/// representation bits [`EXPANDED`] and [`MUTABLE`] describe the
/// concrete type, not the language, and are never copied through.
pub const COPY_PROPERTIES: u64 = ERROR | TRINARY_PROPERTIES;

/// Properties that survive arbitrary changes to input labels.
pub const I_LABEL_INVARIANT_PROPERTIES: u64 = BINARY_PROPERTIES
    | O_DETERMINISTIC
    | NON_O_DETERMINISTIC
    | O_EPSILONS
    | NO_O_EPSILONS
    | O_LABEL_SORTED
    | NOT_O_LABEL_SORTED
    | WEIGHTED
    | UNWEIGHTED
    | ACCESSIBLE
    | NOT_ACCESSIBLE;

/// Properties that survive arbitrary changes to output labels.
pub const O_LABEL_INVARIANT_PROPERTIES: u64 = BINARY_PROPERTIES
    | I_DETERMINISTIC
    | NON_I_DETERMINISTIC
    | I_EPSILONS
    | NO_I_EPSILONS
    | I_LABEL_SORTED
    | NOT_I_LABEL_SORTED
    | WEIGHTED
    | UNWEIGHTED
    | ACCESSIBLE
    | NOT_ACCESSIBLE;

/// Properties that survive arbitrary changes to weights.
pub const WEIGHT_INVARIANT_PROPERTIES: u64 = BINARY_PROPERTIES
    | ACCEPTOR
    | NOT_ACCEPTOR
    | I_DETERMINISTIC
    | NON_I_DETERMINISTIC
    | O_DETERMINISTIC
    | NON_O_DETERMINISTIC
    | EPSILONS
    | NO_EPSILONS
    | I_EPSILONS
    | NO_I_EPSILONS
    | O_EPSILONS
    | NO_O_EPSILONS
    | I_LABEL_SORTED
    | NOT_I_LABEL_SORTED
    | O_LABEL_SORTED
    | NOT_O_LABEL_SORTED
    | ACCESSIBLE
    | NOT_ACCESSIBLE;

/// Properties that survive adding a superfinal state (final weights
/// turned into arcs leading to a new final state). Adding arcs cannot
/// repair a known-false universal property, and the acceptor, weighted
/// and accessibility pairs are unaffected by how finality is
/// represented.
pub const ADD_SUPERFINAL_PROPERTIES: u64 = BINARY_PROPERTIES
    | ACCEPTOR
    | NOT_ACCEPTOR
    | WEIGHTED
    | UNWEIGHTED
    | ACCESSIBLE
    | NON_I_DETERMINISTIC
    | NON_O_DETERMINISTIC
    | EPSILONS
    | I_EPSILONS
    | O_EPSILONS
    | NOT_I_LABEL_SORTED
    | NOT_O_LABEL_SORTED;

/// Properties that survive removing a superfinal state. The mirror of
/// [`ADD_SUPERFINAL_PROPERTIES`]: removing arcs cannot break a
/// known-true universal property.
pub const RM_SUPERFINAL_PROPERTIES: u64 = BINARY_PROPERTIES
    | ACCEPTOR
    | NOT_ACCEPTOR
    | WEIGHTED
    | UNWEIGHTED
    | ACCESSIBLE
    | I_DETERMINISTIC
    | O_DETERMINISTIC
    | NO_EPSILONS
    | NO_I_EPSILONS
    | NO_O_EPSILONS
    | I_LABEL_SORTED
    | O_LABEL_SORTED;

/// Properties that survive adding an arc to an existing state:
/// existential positives and universal negatives.
pub(crate) const ADD_ARC_PROPERTIES: u64 = BINARY_PROPERTIES
    | NOT_ACCEPTOR
    | NON_I_DETERMINISTIC
    | NON_O_DETERMINISTIC
    | EPSILONS
    | I_EPSILONS
    | O_EPSILONS
    | NOT_I_LABEL_SORTED
    | NOT_O_LABEL_SORTED
    | WEIGHTED;

/// Properties that survive deleting states or arcs: universal
/// positives.
pub(crate) const DELETE_PROPERTIES: u64 = BINARY_PROPERTIES
    | ACCEPTOR
    | I_DETERMINISTIC
    | O_DETERMINISTIC
    | NO_EPSILONS
    | NO_I_EPSILONS
    | NO_O_EPSILONS
    | I_LABEL_SORTED
    | O_LABEL_SORTED
    | UNWEIGHTED;

/// The subset of trinary pairs [`compute_properties`] can resolve by a
/// single scan. Accessibility needs reachability analysis and is left
/// to the algorithms that establish it.
pub const SCAN_PROPERTIES: u64 = TRINARY_PROPERTIES & !(ACCESSIBLE | NOT_ACCESSIBLE);

/// The bits of `props` whose value is known: all binary bits plus
/// every trinary pair with at least one side set.
pub fn known_properties(props: u64) -> u64 {
    let mut known = BINARY_PROPERTIES;
    let mut pos = ACCEPTOR;
    while pos <= ACCESSIBLE {
        let pair = pos | (pos << 1);
        if props & pair != 0 {
            known |= pair;
        }
        pos <<= 2;
    }
    known
}

/// Properties of the lazy complement of a deterministic unweighted
/// epsilon-free acceptor.
///
/// Completion by a rho sink preserves input determinism, and the rho
/// label sorts below every user label while being prepended, so label
/// ordering survives from the operand.
pub fn complement_properties(inprops: u64) -> u64 {
    let mut outprops = ACCEPTOR
        | UNWEIGHTED
        | NO_EPSILONS
        | NO_I_EPSILONS
        | NO_O_EPSILONS
        | I_DETERMINISTIC
        | O_DETERMINISTIC
        | ACCESSIBLE;
    outprops |= inprops & (ERROR | I_LABEL_SORTED | O_LABEL_SORTED);
    outprops
}

/// Scans `fst` and resolves every pair in [`SCAN_PROPERTIES`], plus the
/// current [`ERROR`] bit.
pub fn compute_properties<W: Semiring, F: Fst<W> + ?Sized>(fst: &F) -> u64 {
    let mut acceptor = true;
    let mut ideterministic = true;
    let mut odeterministic = true;
    let mut epsilons = false;
    let mut iepsilons = false;
    let mut oepsilons = false;
    let mut isorted = true;
    let mut osorted = true;
    let mut weighted = false;

    let one = W::one();
    let zero = W::zero();
    let mut ilabels: FxHashSet<i32> = FxHashSet::default();
    let mut olabels: FxHashSet<i32> = FxHashSet::default();

    let mut siter = fst.states();
    while !siter.done() {
        let s = siter.value();
        let fw = fst.final_weight(s);
        if fw != one && fw != zero {
            weighted = true;
        }
        ilabels.clear();
        olabels.clear();
        let mut prev_ilabel = i32::MIN;
        let mut prev_olabel = i32::MIN;
        let mut aiter = fst.arcs(s);
        while !aiter.done() {
            let arc = aiter.value();
            if arc.ilabel != arc.olabel {
                acceptor = false;
            }
            if arc.ilabel == EPSILON {
                iepsilons = true;
                epsilons = true;
                ideterministic = false;
            }
            if arc.olabel == EPSILON {
                oepsilons = true;
                epsilons = true;
                odeterministic = false;
            }
            if arc.ilabel < prev_ilabel {
                isorted = false;
            }
            if arc.olabel < prev_olabel {
                osorted = false;
            }
            if !ilabels.insert(arc.ilabel) {
                ideterministic = false;
            }
            if !olabels.insert(arc.olabel) {
                odeterministic = false;
            }
            if arc.weight != one && arc.weight != zero {
                weighted = true;
            }
            prev_ilabel = arc.ilabel;
            prev_olabel = arc.olabel;
            aiter.next();
        }
        siter.next();
    }

    let mut props = fst.properties(ERROR, false) & ERROR;
    props |= if acceptor { ACCEPTOR } else { NOT_ACCEPTOR };
    props |= if ideterministic {
        I_DETERMINISTIC
    } else {
        NON_I_DETERMINISTIC
    };
    props |= if odeterministic {
        O_DETERMINISTIC
    } else {
        NON_O_DETERMINISTIC
    };
    props |= if epsilons { EPSILONS } else { NO_EPSILONS };
    props |= if iepsilons { I_EPSILONS } else { NO_I_EPSILONS };
    props |= if oepsilons { O_EPSILONS } else { NO_O_EPSILONS };
    props |= if isorted {
        I_LABEL_SORTED
    } else {
        NOT_I_LABEL_SORTED
    };
    props |= if osorted {
        O_LABEL_SORTED
    } else {
        NOT_O_LABEL_SORTED
    };
    props |= if weighted { WEIGHTED } else { UNWEIGHTED };
    props
}

/// Counts the states of `fst`, in O(1) when the state count is known
/// and by iteration otherwise.
pub fn count_states<W: Semiring, F: Fst<W> + ?Sized>(fst: &F) -> usize {
    if let Some(n) = fst.num_states_if_known() {
        return n;
    }
    let mut n = 0;
    let mut siter = fst.states();
    while !siter.done() {
        n += 1;
        siter.next();
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_disjoint() {
        assert_eq!(POS_TRINARY_PROPERTIES & NEG_TRINARY_PROPERTIES, 0);
        assert_eq!(BINARY_PROPERTIES & TRINARY_PROPERTIES, 0);
    }

    #[test]
    fn test_known_properties() {
        assert_eq!(known_properties(0) & TRINARY_PROPERTIES, 0);
        let known = known_properties(ACCEPTOR | NO_EPSILONS);
        assert_ne!(known & NOT_ACCEPTOR, 0);
        assert_ne!(known & EPSILONS, 0);
        assert_eq!(known & (WEIGHTED | UNWEIGHTED), 0);
    }

    #[test]
    fn test_complement_properties_fixed_point() {
        let inprops = ACCEPTOR | UNWEIGHTED | NO_EPSILONS | I_DETERMINISTIC | I_LABEL_SORTED;
        let outprops = complement_properties(inprops);
        assert_ne!(outprops & ACCEPTOR, 0);
        assert_ne!(outprops & UNWEIGHTED, 0);
        assert_ne!(outprops & I_DETERMINISTIC, 0);
        assert_ne!(outprops & I_LABEL_SORTED, 0);
        assert_eq!(outprops & ERROR, 0);
    }

    #[test]
    fn test_complement_properties_carries_error() {
        assert_ne!(complement_properties(ERROR) & ERROR, 0);
    }
}
