//! Removal of superfinal states.
//!
//! The inverse of the superfinal construction: epsilon arcs leading
//! into final states with no outgoing arcs are folded back into the
//! source state's final weight, and superfinal states left without
//! incoming arcs are deleted.

use crate::fst::{Arc, ArcIter as _, ExpandedFst, MutableFst, StateId, EPSILON};
use crate::semiring::Semiring;

/// Folds epsilon arcs into superfinal states back into final weights,
/// in place, then deletes the superfinal states nothing reaches any
/// more.
///
/// A state counts as superfinal when it is final and has no outgoing
/// arcs. For every epsilon arc `s → t` into such a `t`, the final
/// weight of `s` becomes `Final(s) ⊕ (w ⊗ Final(t))` and the arc is
/// removed.
pub fn rm_final_epsilon<W, F>(fst: &mut F)
where
    W: Semiring,
    F: MutableFst<W> + ExpandedFst<W>,
{
    let nstates = fst.num_states();
    let mut superfinal = vec![false; nstates];
    for (s, flag) in superfinal.iter_mut().enumerate() {
        *flag = fst.final_weight(s as StateId) != W::zero() && fst.num_arcs(s as StateId) == 0;
    }

    for s in 0..nstates as StateId {
        if superfinal[s as usize] {
            continue;
        }
        let mut kept: Vec<Arc<W>> = Vec::with_capacity(fst.num_arcs(s));
        let mut weight = fst.final_weight(s);
        let mut folded = false;
        {
            let mut aiter = fst.arcs(s);
            while !aiter.done() {
                let arc = aiter.value();
                if arc.ilabel == EPSILON
                    && arc.olabel == EPSILON
                    && superfinal[arc.nextstate as usize]
                {
                    let final_weight = fst.final_weight(arc.nextstate);
                    weight = weight.plus(&arc.weight.times(&final_weight));
                    folded = true;
                } else {
                    kept.push(arc.clone());
                }
                aiter.next();
            }
        }
        if folded {
            fst.delete_arcs(s);
            fst.reserve_arcs(s, kept.len());
            for arc in kept {
                fst.add_arc(s, arc);
            }
            fst.set_final(s, weight);
        }
    }

    // Superfinal states no arc reaches any more are deleted; ones still
    // targeted by non-epsilon arcs stay.
    let mut reached = vec![false; nstates];
    for s in 0..nstates as StateId {
        let mut aiter = fst.arcs(s);
        while !aiter.done() {
            reached[aiter.value().nextstate as usize] = true;
            aiter.next();
        }
    }
    let start = fst.start();
    let dead: Vec<StateId> = (0..nstates as StateId)
        .filter(|&s| superfinal[s as usize] && !reached[s as usize] && s != start)
        .collect();
    fst.delete_states(&dead);
}
