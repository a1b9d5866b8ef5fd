//! Queue-dependent visitation of transducers.
//!
//! [`visit`] traverses a transducer under an externally supplied queue
//! discipline, marking states white (undiscovered), grey (enqueued,
//! unfinished) or black (finished) and reporting every examined arc to
//! a [`Visitor`] according to the colour of its destination. If any
//! visitor method returns `false` the visit is aborted by first calling
//! [`finish_state`](Visitor::finish_state) on every grey state and then
//! [`finish_visit`](Visitor::finish_visit).

use crate::fst::properties::{count_states, EXPANDED};
use crate::fst::{
    Arc, ArcIter, ExpandedFst, Fst, MutableFst, StateId, StateIter as _, VectorFst, EPSILON,
    NO_STATE_ID,
};
use crate::semiring::Semiring;
use std::collections::VecDeque;

/// Actions taken during a visit. Boolean methods continue the visit
/// while they return `true`.
pub trait Visitor<'a, W: Semiring> {
    /// Invoked once before the visit.
    fn init_visit(&mut self, fst: &'a dyn Fst<W>);

    /// Invoked when a state is discovered; the second argument is the
    /// root of the current visitation tree.
    fn init_state(&mut self, state: StateId, root: StateId) -> bool;

    /// Invoked when an arc to an undiscovered state is examined.
    fn white_arc(&mut self, state: StateId, arc: &Arc<W>) -> bool;

    /// Invoked when an arc to a discovered, unfinished state is
    /// examined.
    fn grey_arc(&mut self, state: StateId, arc: &Arc<W>) -> bool;

    /// Invoked when an arc to a finished state is examined.
    fn black_arc(&mut self, state: StateId, arc: &Arc<W>) -> bool;

    /// Invoked when a state is finished.
    fn finish_state(&mut self, state: StateId);

    /// Invoked once after the visit.
    fn finish_visit(&mut self);
}

/// The queue discipline driving a visit.
pub trait Queue {
    /// Inserts a state.
    fn enqueue(&mut self, state: StateId);
    /// Removes the head state.
    fn dequeue(&mut self);
    /// The head state. Undefined when empty.
    fn head(&self) -> StateId;
    /// Whether the queue holds no states.
    fn is_empty(&self) -> bool;
    /// Removes every state.
    fn clear(&mut self);
}

/// First-in first-out discipline: breadth-first visitation order.
#[derive(Debug, Default)]
pub struct FifoQueue {
    states: VecDeque<StateId>,
}

impl FifoQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Queue for FifoQueue {
    fn enqueue(&mut self, state: StateId) {
        self.states.push_back(state);
    }

    fn dequeue(&mut self) {
        self.states.pop_front();
    }

    fn head(&self) -> StateId {
        self.states.front().copied().unwrap_or(NO_STATE_ID)
    }

    fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn clear(&mut self) {
        self.states.clear();
    }
}

/// Last-in first-out discipline: depth-first-flavoured visitation
/// order.
#[derive(Debug, Default)]
pub struct LifoQueue {
    states: Vec<StateId>,
}

impl LifoQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Queue for LifoQueue {
    fn enqueue(&mut self, state: StateId) {
        self.states.push(state);
    }

    fn dequeue(&mut self) {
        self.states.pop();
    }

    fn head(&self) -> StateId {
        self.states.last().copied().unwrap_or(NO_STATE_ID)
    }

    fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn clear(&mut self) {
        self.states.clear();
    }
}

/// Predicate selecting which arcs a visit examines.
pub trait ArcFilter<W: Semiring> {
    /// Whether `arc` is considered.
    fn keep(&self, arc: &Arc<W>) -> bool;
}

/// Keeps every arc.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyArcFilter;

impl<W: Semiring> ArcFilter<W> for AnyArcFilter {
    fn keep(&self, _arc: &Arc<W>) -> bool {
        true
    }
}

/// Keeps arcs with epsilon input and output labels.
#[derive(Clone, Copy, Debug, Default)]
pub struct EpsilonArcFilter;

impl<W: Semiring> ArcFilter<W> for EpsilonArcFilter {
    fn keep(&self, arc: &Arc<W>) -> bool {
        arc.ilabel == EPSILON && arc.olabel == EPSILON
    }
}

/// Keeps arcs with an epsilon input label.
#[derive(Clone, Copy, Debug, Default)]
pub struct InputEpsilonArcFilter;

impl<W: Semiring> ArcFilter<W> for InputEpsilonArcFilter {
    fn keep(&self, arc: &Arc<W>) -> bool {
        arc.ilabel == EPSILON
    }
}

/// Keeps arcs with an epsilon output label.
#[derive(Clone, Copy, Debug, Default)]
pub struct OutputEpsilonArcFilter;

impl<W: Semiring> ArcFilter<W> for OutputEpsilonArcFilter {
    fn keep(&self, arc: &Arc<W>) -> bool {
        arc.olabel == EPSILON
    }
}

// State visit colours, plus a marker for a destroyed arc iterator.
const WHITE: u8 = 0x1;
const GREY: u8 = 0x2;
const BLACK: u8 = 0x4;
const ARC_ITER_DONE: u8 = 0x8;

/// Performs queue-dependent visitation of `fst`.
///
/// The visitor determines the actions taken and carries any result
/// data; the queue determines the traversal order; the filter selects
/// the arcs considered. With `access_only`, only states accessible from
/// the start state are visited; otherwise the visit continues from the
/// lowest remaining undiscovered state until every state has been
/// visited.
///
/// Arc iterators are created lazily when a state first reaches the
/// queue head and destroyed as soon as they are exhausted, bounding the
/// concurrent live iterators to one per grey state.
pub fn visit<'a, W, F, V, Q, A>(
    fst: &'a F,
    visitor: &mut V,
    queue: &mut Q,
    filter: A,
    access_only: bool,
) where
    W: Semiring,
    F: Fst<W>,
    V: Visitor<'a, W>,
    Q: Queue,
    A: ArcFilter<W>,
{
    visitor.init_visit(fst);

    let start = fst.start();
    if start == NO_STATE_ID {
        visitor.finish_visit();
        return;
    }

    // Number of known states; grows on demand in the general case and
    // is fetched once for expanded operands.
    let expanded = fst.properties(EXPANDED, false) & EXPANDED != 0;
    let mut nstates = if expanded {
        count_states(fst)
    } else {
        start as usize + 1
    };

    let mut state_status: Vec<u8> = vec![WHITE; nstates];
    let mut arc_iter: Vec<Option<Box<dyn ArcIter<W> + 'a>>> = Vec::new();
    arc_iter.resize_with(nstates, || None);

    // Companion iterator discovering states unreachable from any root
    // visited so far.
    let mut siter = fst.states();

    let mut visiting;
    let mut root = start;
    loop {
        visiting = visitor.init_state(root, root);
        state_status[root as usize] = GREY;
        queue.enqueue(root);
        while !queue.is_empty() {
            let s = queue.head();
            let s_idx = s as usize;
            if s_idx >= nstates {
                nstates = s_idx + 1;
                state_status.resize(nstates, WHITE);
                arc_iter.resize_with(nstates, || None);
            }
            // Creates the arc iterator if needed.
            if arc_iter[s_idx].is_none() && state_status[s_idx] & ARC_ITER_DONE == 0 && visiting {
                arc_iter[s_idx] = Some(fst.arcs(s));
            }
            // Destroys the iterator once exhausted, or on abort.
            let exhausted = arc_iter[s_idx].as_ref().map_or(false, |it| it.done());
            if exhausted || !visiting {
                arc_iter[s_idx] = None;
                state_status[s_idx] |= ARC_ITER_DONE;
            }
            // Dequeues the state and marks it black if finished.
            if state_status[s_idx] & ARC_ITER_DONE != 0 {
                queue.dequeue();
                visitor.finish_state(s);
                state_status[s_idx] = BLACK;
                continue;
            }

            let arc = arc_iter[s_idx].as_ref().unwrap().value().clone();
            if arc.nextstate as usize >= nstates {
                nstates = arc.nextstate as usize + 1;
                state_status.resize(nstates, WHITE);
                arc_iter.resize_with(nstates, || None);
            }
            if filter.keep(&arc) {
                let ns = arc.nextstate as usize;
                if state_status[ns] == WHITE {
                    visiting = visitor.white_arc(s, &arc);
                    if !visiting {
                        continue;
                    }
                    visiting = visitor.init_state(arc.nextstate, root);
                    state_status[ns] = GREY;
                    queue.enqueue(arc.nextstate);
                } else if state_status[ns] == BLACK {
                    visiting = visitor.black_arc(s, &arc);
                } else {
                    visiting = visitor.grey_arc(s, &arc);
                }
            }
            let it = arc_iter[s_idx].as_mut().unwrap();
            it.next();
            if it.done() {
                arc_iter[s_idx] = None;
                state_status[s_idx] |= ARC_ITER_DONE;
            }
        }

        if !visiting || access_only {
            break;
        }

        // Finds the next tree root: the lowest remaining white state.
        root = if root == start { 0 } else { root + 1 };
        while (root as usize) < nstates && state_status[root as usize] != WHITE {
            root += 1;
        }

        // Checks for a state beyond the largest known one.
        if !expanded && root as usize == nstates {
            while !siter.done() {
                if siter.value() as usize == nstates {
                    nstates += 1;
                    state_status.push(WHITE);
                    arc_iter.push(None);
                    break;
                }
                siter.next();
            }
        }

        if root as usize >= nstates {
            break;
        }
    }
    visitor.finish_visit();
}

/// Copies the visited forest into a mutable transducer in queue order.
pub struct CopyVisitor<'a, 'o, W: Semiring> {
    ifst: Option<&'a dyn Fst<W>>,
    ofst: &'o mut VectorFst<W>,
}

impl<'a, 'o, W: Semiring> CopyVisitor<'a, 'o, W> {
    /// Creates a visitor copying into `ofst`.
    pub fn new(ofst: &'o mut VectorFst<W>) -> Self {
        CopyVisitor { ifst: None, ofst }
    }
}

impl<'a, W: Semiring> Visitor<'a, W> for CopyVisitor<'a, '_, W> {
    fn init_visit(&mut self, fst: &'a dyn Fst<W>) {
        self.ifst = Some(fst);
        self.ofst.delete_all_states();
        self.ofst.set_start(fst.start());
    }

    fn init_state(&mut self, state: StateId, _root: StateId) -> bool {
        while self.ofst.num_states() <= state as usize {
            self.ofst.add_state();
        }
        true
    }

    fn white_arc(&mut self, state: StateId, arc: &Arc<W>) -> bool {
        self.ofst.add_arc(state, arc.clone());
        true
    }

    fn grey_arc(&mut self, state: StateId, arc: &Arc<W>) -> bool {
        self.ofst.add_arc(state, arc.clone());
        true
    }

    fn black_arc(&mut self, state: StateId, arc: &Arc<W>) -> bool {
        self.ofst.add_arc(state, arc.clone());
        true
    }

    fn finish_state(&mut self, state: StateId) {
        let weight = self.ifst.expect("visit started").final_weight(state);
        self.ofst.set_final(state, weight);
    }

    fn finish_visit(&mut self) {}
}

/// Visits up to a state limit, counting discovered and finished
/// states.
pub struct PartialVisitor<'a, W: Semiring> {
    fst: Option<&'a dyn Fst<W>>,
    max_visit: usize,
    ninit: usize,
    nfinish: usize,
}

impl<'a, W: Semiring> PartialVisitor<'a, W> {
    /// Creates a visitor stopping after `max_visit` discovered states.
    pub fn new(max_visit: usize) -> Self {
        PartialVisitor {
            fst: None,
            max_visit,
            ninit: 0,
            nfinish: 0,
        }
    }

    /// States discovered so far.
    pub fn num_initialized(&self) -> usize {
        self.ninit
    }

    /// States finished so far.
    pub fn num_finished(&self) -> usize {
        self.nfinish
    }
}

impl<'a, W: Semiring> Visitor<'a, W> for PartialVisitor<'a, W> {
    fn init_visit(&mut self, fst: &'a dyn Fst<W>) {
        self.fst = Some(fst);
        self.ninit = 0;
        self.nfinish = 0;
    }

    fn init_state(&mut self, _state: StateId, _root: StateId) -> bool {
        self.ninit += 1;
        self.ninit <= self.max_visit
    }

    fn white_arc(&mut self, _state: StateId, _arc: &Arc<W>) -> bool {
        true
    }

    fn grey_arc(&mut self, _state: StateId, _arc: &Arc<W>) -> bool {
        true
    }

    fn black_arc(&mut self, _state: StateId, _arc: &Arc<W>) -> bool {
        true
    }

    fn finish_state(&mut self, state: StateId) {
        // Touches the final weight so the super-final arc is visited.
        if let Some(fst) = self.fst {
            fst.final_weight(state);
        }
        self.nfinish += 1;
    }

    fn finish_visit(&mut self) {}
}
