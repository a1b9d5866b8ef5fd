//! Lazy complement of a deterministic unweighted epsilon-free
//! acceptor.
//!
//! The algorithm completes the acceptor and then exchanges final and
//! non-final states. Completion, ensuring every label can be read from
//! every state, uses rho transitions, which stand for all labels not
//! otherwise found leaving a state. State 0 of the view is a new state,
//! the destination of every rho transition; each remaining view state
//! `s` corresponds to operand state `s - 1`, with the rho arc prepended
//! to the operand's arcs.

use crate::fst::properties::{
    complement_properties, compute_properties, known_properties, ACCEPTOR, COPY_PROPERTIES, ERROR,
    FST_PROPERTIES, I_DETERMINISTIC, I_LABEL_SORTED, NO_EPSILONS, O_LABEL_SORTED, SCAN_PROPERTIES,
    UNWEIGHTED,
};
use crate::fst::{
    Arc, ArcIter, Fst, Label, MutableFst, StateId, StateIter, SymbolTable, VectorFst, NO_STATE_ID,
};
use crate::semiring::Semiring;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc as Shared;

/// The rho transition label: "any label not otherwise leaving this
/// state".
///
/// The value is negative and thus private to the library: user labels
/// are positive, so rho never collides with them and sorts below every
/// user label, preserving label sort order. It is consumed by the
/// set-difference operation and never observed by callers, nor
/// persisted in any on-disk format.
pub const RHO_LABEL: Label = -2;

struct ComplementImpl<W: Semiring, F: Fst<W>> {
    fst: F,
    properties: AtomicU64,
    _weight: PhantomData<W>,
}

impl<W: Semiring, F: Fst<W>> ComplementImpl<W, F> {
    fn properties(&self, mask: u64, test: bool) -> u64 {
        let mut props = self.properties.load(Ordering::Relaxed);
        // The error bit propagates lazily from the operand.
        if mask & ERROR != 0 && self.fst.properties(ERROR, false) & ERROR != 0 {
            self.properties.fetch_or(ERROR, Ordering::Relaxed);
            props |= ERROR;
        }
        props & mask
    }

    fn in_error(&self) -> bool {
        self.properties(ERROR, false) & ERROR != 0
    }
}

/// Lazy complement of a deterministic unweighted epsilon-free
/// acceptor.
///
/// This is a library-internal view: it introduces the negative
/// [`RHO_LABEL`], which the set-difference operation consumes. The
/// operand must assert `UNWEIGHTED ∧ NO_EPSILONS ∧ I_DETERMINISTIC ∧
/// ACCEPTOR`; a failing precondition puts the view permanently in the
/// error state.
///
/// Copies are O(1) and share the underlying implementation.
///
/// # Example
///
/// ```rust,ignore
/// use libwfst::prelude::*;
///
/// // An acceptor for the single string "a" (label 1).
/// let mut a = VectorFst::<TropicalWeight>::new();
/// let s0 = a.add_state();
/// let s1 = a.add_state();
/// a.set_start(s0);
/// a.set_final(s1, TropicalWeight::one());
/// a.add_arc(s0, Arc::new(1, 1, TropicalWeight::one(), s1));
///
/// let comp = ComplementFst::new(a);
/// assert_eq!(comp.start(), 1);
/// ```
pub struct ComplementFst<W: Semiring, F: Fst<W>> {
    shared: Shared<ComplementImpl<W, F>>,
}

impl<W: Semiring, F: Fst<W>> ComplementFst<W, F> {
    /// Wraps `fst` in its lazy complement.
    ///
    /// The precondition is checked here, scanning the operand if its
    /// property bits are unknown. On failure the view is permanently
    /// in error.
    pub fn new(fst: F) -> Self {
        let required = UNWEIGHTED | NO_EPSILONS | I_DETERMINISTIC | ACCEPTOR;
        let mut props =
            complement_properties(fst.properties(I_LABEL_SORTED | O_LABEL_SORTED | ERROR, false));
        if fst.properties(required, true) & required != required {
            log::error!(
                "ComplementFst: argument is not an unweighted epsilon-free \
                 deterministic acceptor"
            );
            props |= ERROR;
        }
        ComplementFst {
            shared: Shared::new(ComplementImpl {
                fst,
                properties: AtomicU64::new(props),
                _weight: PhantomData,
            }),
        }
    }

    /// A copy safe for use from another thread. The view keeps no
    /// mutable cache, so this shares the implementation just like
    /// [`Clone`].
    pub fn safe_copy(&self) -> Self {
        self.clone()
    }
}

impl<W: Semiring, F: Fst<W>> Clone for ComplementFst<W, F> {
    fn clone(&self) -> Self {
        ComplementFst {
            shared: Shared::clone(&self.shared),
        }
    }
}

impl<W: Semiring, F: Fst<W>> Fst<W> for ComplementFst<W, F> {
    fn start(&self) -> StateId {
        if self.shared.in_error() {
            return NO_STATE_ID;
        }
        let start = self.shared.fst.start();
        if start != NO_STATE_ID {
            start + 1
        } else {
            0
        }
    }

    // Exchange final and non-final states; the rho sink is final
    // because strings the operand rejected must now be accepted.
    fn final_weight(&self, state: StateId) -> W {
        if state == 0 || self.shared.fst.final_weight(state - 1) == W::zero() {
            W::one()
        } else {
            W::zero()
        }
    }

    fn num_arcs(&self, state: StateId) -> usize {
        if state == 0 {
            1
        } else {
            self.shared.fst.num_arcs(state - 1) + 1
        }
    }

    fn num_input_epsilons(&self, state: StateId) -> usize {
        // Rho is negative, not epsilon, so operand counts carry over.
        if state == 0 {
            0
        } else {
            self.shared.fst.num_input_epsilons(state - 1)
        }
    }

    fn num_output_epsilons(&self, state: StateId) -> usize {
        if state == 0 {
            0
        } else {
            self.shared.fst.num_output_epsilons(state - 1)
        }
    }

    fn properties(&self, mask: u64, test: bool) -> u64 {
        if test {
            let props = self.shared.properties.load(Ordering::Relaxed);
            let unknown = mask & SCAN_PROPERTIES & !known_properties(props);
            if unknown != 0 {
                let computed = compute_properties(self) & SCAN_PROPERTIES;
                self.shared.properties.fetch_or(computed, Ordering::Relaxed);
            }
        }
        self.shared.properties(mask, test)
    }

    fn input_symbols(&self) -> Option<&SymbolTable> {
        self.shared.fst.input_symbols()
    }

    fn output_symbols(&self) -> Option<&SymbolTable> {
        self.shared.fst.output_symbols()
    }

    fn num_states_if_known(&self) -> Option<usize> {
        self.shared.fst.num_states_if_known().map(|n| n + 1)
    }

    fn states(&self) -> Box<dyn StateIter + '_> {
        Box::new(ComplementStateIter {
            inner: self.shared.fst.states(),
            state: 0,
        })
    }

    fn arcs(&self, state: StateId) -> Box<dyn ArcIter<W> + '_> {
        let inner = if state != 0 {
            Some(self.shared.fst.arcs(state - 1))
        } else {
            None
        };
        let mut iter = ComplementArcIter {
            inner,
            pos: 0,
            arc: Arc::new(RHO_LABEL, RHO_LABEL, W::one(), 0),
        };
        iter.update_arc();
        Box::new(iter)
    }
}

struct ComplementStateIter<'a> {
    inner: Box<dyn StateIter + 'a>,
    state: StateId,
}

impl StateIter for ComplementStateIter<'_> {
    fn done(&self) -> bool {
        self.state > 0 && self.inner.done()
    }

    fn value(&self) -> StateId {
        self.state
    }

    fn next(&mut self) {
        if self.state != 0 {
            self.inner.next();
        }
        self.state += 1;
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.state = 0;
    }
}

struct ComplementArcIter<'a, W: Semiring> {
    inner: Option<Box<dyn ArcIter<W> + 'a>>,
    pos: usize,
    arc: Arc<W>,
}

impl<W: Semiring> ComplementArcIter<'_, W> {
    // Position 0 is the prepended rho arc into the sink; position k > 0
    // is the operand's arc k - 1 with its destination shifted by one.
    fn update_arc(&mut self) {
        if self.pos == 0 {
            self.arc = Arc::new(RHO_LABEL, RHO_LABEL, W::one(), 0);
        } else if let Some(inner) = &self.inner {
            if !inner.done() {
                let mut arc = inner.value().clone();
                arc.nextstate += 1;
                self.arc = arc;
            }
        }
    }
}

impl<W: Semiring> ArcIter<W> for ComplementArcIter<'_, W> {
    fn done(&self) -> bool {
        match &self.inner {
            Some(inner) => self.pos > 0 && inner.done(),
            None => self.pos > 0,
        }
    }

    fn value(&self) -> &Arc<W> {
        &self.arc
    }

    fn next(&mut self) {
        if self.inner.is_some() && self.pos > 0 {
            self.inner.as_mut().unwrap().next();
        }
        self.pos += 1;
        self.update_arc();
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn reset(&mut self) {
        if let Some(inner) = &mut self.inner {
            inner.reset();
        }
        self.pos = 0;
        self.update_arc();
    }

    fn seek(&mut self, pos: usize) {
        if let Some(inner) = &mut self.inner {
            if pos == 0 {
                inner.reset();
            } else {
                inner.seek(pos - 1);
            }
        }
        self.pos = pos;
        self.update_arc();
    }
}

/// Materializes the complement of `ifst` into `ofst`.
///
/// The output contains [`RHO_LABEL`] arcs; it is meant for consumption
/// by the set-difference operation, not for direct user iteration.
pub fn complement<W: Semiring, F: Fst<W> + Clone>(ifst: &F, ofst: &mut VectorFst<W>) {
    use super::visit::{visit, AnyArcFilter, CopyVisitor, FifoQueue};

    let view = ComplementFst::new(ifst.clone());
    let mut visitor = CopyVisitor::new(ofst);
    let mut queue = FifoQueue::new();
    visit(&view, &mut visitor, &mut queue, AnyArcFilter, false);
    let props = view.properties(COPY_PROPERTIES, false);
    ofst.set_properties(props, FST_PROPERTIES);
}
