//! Materialized mutable transducer backed by per-state arc vectors.

use super::arc::{Arc, StateId, EPSILON, NO_STATE_ID};
use super::properties::{
    compute_properties, known_properties, ACCESSIBLE, ADD_ARC_PROPERTIES, DELETE_PROPERTIES,
    EPSILONS, ERROR, EXPANDED, FST_PROPERTIES, I_EPSILONS, MUTABLE, NOT_ACCEPTOR, NOT_ACCESSIBLE,
    O_EPSILONS, SCAN_PROPERTIES, UNWEIGHTED, WEIGHTED,
};
use super::symbol_table::SymbolTable;
use super::{ArcIter, ExpandedFst, Fst, MutableFst, StateIter};
use crate::semiring::Semiring;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc as Shared;

// Most states carry only a handful of arcs; keep those inline.
type ArcVec<W> = SmallVec<[Arc<W>; 4]>;

#[derive(Clone, Debug)]
struct VectorState<W: Semiring> {
    final_weight: W,
    arcs: ArcVec<W>,
    niepsilons: usize,
    noepsilons: usize,
}

impl<W: Semiring> VectorState<W> {
    fn new() -> Self {
        VectorState {
            final_weight: W::zero(),
            arcs: SmallVec::new(),
            niepsilons: 0,
            noepsilons: 0,
        }
    }

    fn recount_epsilons(&mut self) {
        self.niepsilons = self.arcs.iter().filter(|a| a.ilabel == EPSILON).count();
        self.noepsilons = self.arcs.iter().filter(|a| a.olabel == EPSILON).count();
    }
}

/// A materialized mutable transducer.
///
/// States are contiguous ids starting at 0 and own their arcs.
/// Structural property bits are maintained incrementally across
/// mutations (degrading to unknown where a mutation could change them)
/// and resolved by scanning when a caller passes `test = true` to
/// [`properties`](Fst::properties).
///
/// # Example
///
/// ```rust,ignore
/// use libwfst::prelude::*;
///
/// let mut fst = VectorFst::<TropicalWeight>::new();
/// let s0 = fst.add_state();
/// let s1 = fst.add_state();
/// fst.set_start(s0);
/// fst.set_final(s1, TropicalWeight::one());
/// fst.add_arc(s0, Arc::new(1, 1, TropicalWeight::one(), s1));
/// ```
#[derive(Debug)]
pub struct VectorFst<W: Semiring> {
    states: Vec<VectorState<W>>,
    start: StateId,
    properties: AtomicU64,
    isymbols: Option<Shared<SymbolTable>>,
    osymbols: Option<Shared<SymbolTable>>,
}

impl<W: Semiring> VectorFst<W> {
    /// Creates an empty transducer.
    pub fn new() -> Self {
        VectorFst {
            states: Vec::new(),
            start: NO_STATE_ID,
            properties: AtomicU64::new(EXPANDED | MUTABLE),
            isymbols: None,
            osymbols: None,
        }
    }

    /// Reserves capacity for `n` additional states.
    pub fn reserve_states(&mut self, n: usize) {
        self.states.reserve(n);
    }

    /// Marks this transducer as being in the sticky error state.
    pub fn set_error(&mut self) {
        self.properties.fetch_or(ERROR, Ordering::Relaxed);
    }

    fn state(&self, state: StateId) -> &VectorState<W> {
        &self.states[state as usize]
    }
}

impl<W: Semiring> Default for VectorFst<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Semiring> Clone for VectorFst<W> {
    fn clone(&self) -> Self {
        VectorFst {
            states: self.states.clone(),
            start: self.start,
            properties: AtomicU64::new(self.properties.load(Ordering::Relaxed)),
            isymbols: self.isymbols.clone(),
            osymbols: self.osymbols.clone(),
        }
    }
}

impl<W: Semiring> Fst<W> for VectorFst<W> {
    fn start(&self) -> StateId {
        self.start
    }

    fn final_weight(&self, state: StateId) -> W {
        self.state(state).final_weight.clone()
    }

    fn num_arcs(&self, state: StateId) -> usize {
        self.state(state).arcs.len()
    }

    fn num_input_epsilons(&self, state: StateId) -> usize {
        self.state(state).niepsilons
    }

    fn num_output_epsilons(&self, state: StateId) -> usize {
        self.state(state).noepsilons
    }

    fn properties(&self, mask: u64, test: bool) -> u64 {
        let mut props = self.properties.load(Ordering::Relaxed);
        if test {
            let unknown = mask & SCAN_PROPERTIES & !known_properties(props);
            if unknown != 0 {
                let computed = compute_properties(self);
                props = (props & !SCAN_PROPERTIES) | (computed & SCAN_PROPERTIES);
                self.properties.store(props, Ordering::Relaxed);
            }
        }
        props & mask
    }

    fn input_symbols(&self) -> Option<&SymbolTable> {
        self.isymbols.as_deref()
    }

    fn output_symbols(&self) -> Option<&SymbolTable> {
        self.osymbols.as_deref()
    }

    fn num_states_if_known(&self) -> Option<usize> {
        Some(self.states.len())
    }

    fn states(&self) -> Box<dyn StateIter + '_> {
        Box::new(VectorStateIter {
            nstates: self.states.len(),
            state: 0,
        })
    }

    fn arcs(&self, state: StateId) -> Box<dyn ArcIter<W> + '_> {
        Box::new(VectorArcIter {
            arcs: &self.state(state).arcs,
            pos: 0,
        })
    }
}

impl<W: Semiring> ExpandedFst<W> for VectorFst<W> {
    fn num_states(&self) -> usize {
        self.states.len()
    }
}

impl<W: Semiring> MutableFst<W> for VectorFst<W> {
    fn set_start(&mut self, state: StateId) {
        self.start = state;
        let props = self.properties.get_mut();
        *props &= !(ACCESSIBLE | NOT_ACCESSIBLE);
    }

    fn set_final(&mut self, state: StateId, weight: W) {
        let trivial = weight == W::one() || weight == W::zero();
        self.states[state as usize].final_weight = weight;
        let props = self.properties.get_mut();
        if trivial {
            // A trivial final weight removes a potential witness for
            // WEIGHTED, so that side degrades to unknown.
            *props &= !WEIGHTED;
        } else {
            *props &= !UNWEIGHTED;
            *props |= WEIGHTED;
        }
    }

    fn add_state(&mut self) -> StateId {
        self.states.push(VectorState::new());
        let props = self.properties.get_mut();
        *props &= !ACCESSIBLE;
        (self.states.len() - 1) as StateId
    }

    fn add_arc(&mut self, state: StateId, arc: Arc<W>) {
        let mut facts = 0;
        if arc.ilabel != arc.olabel {
            facts |= NOT_ACCEPTOR;
        }
        if arc.ilabel == EPSILON {
            facts |= I_EPSILONS | EPSILONS;
        }
        if arc.olabel == EPSILON {
            facts |= O_EPSILONS | EPSILONS;
        }
        if arc.weight != W::one() && arc.weight != W::zero() {
            facts |= WEIGHTED;
        }
        let st = &mut self.states[state as usize];
        if arc.ilabel == EPSILON {
            st.niepsilons += 1;
        }
        if arc.olabel == EPSILON {
            st.noepsilons += 1;
        }
        st.arcs.push(arc);
        let props = self.properties.get_mut();
        *props = (*props & ADD_ARC_PROPERTIES) | facts;
    }

    fn delete_states(&mut self, states: &[StateId]) {
        if states.is_empty() {
            return;
        }
        let nstates = self.states.len();
        let mut dead = vec![false; nstates];
        for &s in states {
            if s >= 0 && (s as usize) < nstates {
                dead[s as usize] = true;
            }
        }
        let mut newid = vec![NO_STATE_ID; nstates];
        let mut next: StateId = 0;
        for (i, id) in newid.iter_mut().enumerate() {
            if !dead[i] {
                *id = next;
                next += 1;
            }
        }
        let old = std::mem::take(&mut self.states);
        for (i, mut st) in old.into_iter().enumerate() {
            if dead[i] {
                continue;
            }
            st.arcs.retain(|arc| newid[arc.nextstate as usize] != NO_STATE_ID);
            for arc in st.arcs.iter_mut() {
                arc.nextstate = newid[arc.nextstate as usize];
            }
            st.recount_epsilons();
            self.states.push(st);
        }
        self.start = if self.start == NO_STATE_ID {
            NO_STATE_ID
        } else {
            newid[self.start as usize]
        };
        let props = self.properties.get_mut();
        *props &= DELETE_PROPERTIES;
    }

    fn delete_all_states(&mut self) {
        self.states.clear();
        self.start = NO_STATE_ID;
        let props = self.properties.get_mut();
        *props = (*props & ERROR) | EXPANDED | MUTABLE;
    }

    fn delete_arcs(&mut self, state: StateId) {
        let st = &mut self.states[state as usize];
        st.arcs.clear();
        st.niepsilons = 0;
        st.noepsilons = 0;
        let props = self.properties.get_mut();
        *props &= DELETE_PROPERTIES;
    }

    fn set_properties(&mut self, props: u64, mask: u64) {
        let cur = self.properties.get_mut();
        *cur = (*cur & !(mask & FST_PROPERTIES)) | (props & mask & FST_PROPERTIES)
            | EXPANDED
            | MUTABLE;
    }

    fn set_input_symbols(&mut self, symbols: Option<SymbolTable>) {
        self.isymbols = symbols.map(Shared::new);
    }

    fn set_output_symbols(&mut self, symbols: Option<SymbolTable>) {
        self.osymbols = symbols.map(Shared::new);
    }

    fn reserve_arcs(&mut self, state: StateId, n: usize) {
        self.states[state as usize].arcs.reserve(n);
    }
}

struct VectorStateIter {
    nstates: usize,
    state: usize,
}

impl StateIter for VectorStateIter {
    fn done(&self) -> bool {
        self.state >= self.nstates
    }

    fn value(&self) -> StateId {
        self.state as StateId
    }

    fn next(&mut self) {
        self.state += 1;
    }

    fn reset(&mut self) {
        self.state = 0;
    }
}

struct VectorArcIter<'a, W: Semiring> {
    arcs: &'a [Arc<W>],
    pos: usize,
}

impl<W: Semiring> ArcIter<W> for VectorArcIter<'_, W> {
    fn done(&self) -> bool {
        self.pos >= self.arcs.len()
    }

    fn value(&self) -> &Arc<W> {
        &self.arcs[self.pos]
    }

    fn next(&mut self) {
        self.pos += 1;
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn reset(&mut self) {
        self.pos = 0;
    }

    fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }
}
