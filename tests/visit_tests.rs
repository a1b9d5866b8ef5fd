//! Coverage and abort-cleanup tests for the visitation engine.

use libwfst::prelude::*;
use rustc_hash::FxHashMap;

type W = TropicalWeight;

/// Records every callback the engine makes.
#[derive(Default)]
struct RecordingVisitor {
    init_order: Vec<StateId>,
    finish_order: Vec<StateId>,
    arc_colours: FxHashMap<(StateId, Label, StateId), (usize, usize, usize)>,
    finish_visit_calls: usize,
    abort_after_inits: Option<usize>,
    arcs_after_abort: usize,
    aborted: bool,
}

impl RecordingVisitor {
    fn with_abort(limit: usize) -> Self {
        RecordingVisitor {
            abort_after_inits: Some(limit),
            ..Default::default()
        }
    }

    fn record_arc(&mut self, state: StateId, arc: &Arc<W>, colour: usize) -> bool {
        if self.aborted {
            self.arcs_after_abort += 1;
        }
        let entry = self
            .arc_colours
            .entry((state, arc.ilabel, arc.nextstate))
            .or_insert((0, 0, 0));
        match colour {
            0 => entry.0 += 1,
            1 => entry.1 += 1,
            _ => entry.2 += 1,
        }
        true
    }
}

impl<'a> Visitor<'a, W> for RecordingVisitor {
    fn init_visit(&mut self, _fst: &'a dyn Fst<W>) {}

    fn init_state(&mut self, state: StateId, _root: StateId) -> bool {
        self.init_order.push(state);
        if let Some(limit) = self.abort_after_inits {
            if self.init_order.len() >= limit {
                self.aborted = true;
                return false;
            }
        }
        true
    }

    fn white_arc(&mut self, state: StateId, arc: &Arc<W>) -> bool {
        self.record_arc(state, arc, 0)
    }

    fn grey_arc(&mut self, state: StateId, arc: &Arc<W>) -> bool {
        self.record_arc(state, arc, 1)
    }

    fn black_arc(&mut self, state: StateId, arc: &Arc<W>) -> bool {
        self.record_arc(state, arc, 2)
    }

    fn finish_state(&mut self, state: StateId) {
        self.finish_order.push(state);
    }

    fn finish_visit(&mut self) {
        self.finish_visit_calls += 1;
    }
}

/// 0 → 1 → 2 with a back arc 2 → 0 and a shortcut 0 → 2.
fn cyclic_fst() -> VectorFst<W> {
    let mut fst = VectorFst::new();
    for _ in 0..3 {
        fst.add_state();
    }
    fst.set_start(0);
    fst.set_final(2, W::one());
    fst.add_arc(0, Arc::new(1, 1, W::one(), 1));
    fst.add_arc(0, Arc::new(2, 2, W::one(), 2));
    fst.add_arc(1, Arc::new(3, 3, W::one(), 2));
    fst.add_arc(2, Arc::new(4, 4, W::one(), 0));
    fst
}

#[test]
fn every_state_visited_exactly_once() {
    let fst = cyclic_fst();
    let mut visitor = RecordingVisitor::default();
    let mut queue = FifoQueue::new();
    visit(&fst, &mut visitor, &mut queue, AnyArcFilter, false);

    let mut inits = visitor.init_order.clone();
    inits.sort_unstable();
    assert_eq!(inits, vec![0, 1, 2]);
    let mut finishes = visitor.finish_order.clone();
    finishes.sort_unstable();
    assert_eq!(finishes, vec![0, 1, 2]);
    assert_eq!(visitor.finish_visit_calls, 1);
}

#[test]
fn every_arc_reported_under_exactly_one_colour() {
    let fst = cyclic_fst();
    let mut visitor = RecordingVisitor::default();
    let mut queue = FifoQueue::new();
    visit(&fst, &mut visitor, &mut queue, AnyArcFilter, false);

    assert_eq!(visitor.arc_colours.len(), 4);
    for (key, (white, grey, black)) in &visitor.arc_colours {
        assert_eq!(white + grey + black, 1, "arc {:?}", key);
    }
}

#[test]
fn abort_finishes_grey_states_then_finish_visit() {
    // A chain long enough that the abort happens mid-traversal.
    let mut fst = VectorFst::<W>::new();
    for _ in 0..5 {
        fst.add_state();
    }
    fst.set_start(0);
    fst.set_final(4, W::one());
    for s in 0..4 {
        fst.add_arc(s, Arc::new(s + 1, s + 1, W::one(), s + 1));
    }

    let mut visitor = RecordingVisitor::with_abort(3);
    let mut queue = FifoQueue::new();
    visit(&fst, &mut visitor, &mut queue, AnyArcFilter, false);

    // The third discovery aborts: three InitState calls, a FinishState
    // for each grey state, one FinishVisit, and no arcs afterwards.
    assert_eq!(visitor.init_order.len(), 3);
    assert_eq!(visitor.finish_order.len(), 3);
    assert_eq!(visitor.finish_visit_calls, 1);
    assert_eq!(visitor.arcs_after_abort, 0);
}

#[test]
fn fifo_and_lifo_orders_differ() {
    // Diamond: 0 → {1, 2} → 3.
    let mut fst = VectorFst::<W>::new();
    for _ in 0..4 {
        fst.add_state();
    }
    fst.set_start(0);
    fst.set_final(3, W::one());
    fst.add_arc(0, Arc::new(1, 1, W::one(), 1));
    fst.add_arc(0, Arc::new(2, 2, W::one(), 2));
    fst.add_arc(1, Arc::new(3, 3, W::one(), 3));
    fst.add_arc(2, Arc::new(4, 4, W::one(), 3));

    let mut fifo_visitor = RecordingVisitor::default();
    visit(
        &fst,
        &mut fifo_visitor,
        &mut FifoQueue::new(),
        AnyArcFilter,
        false,
    );
    assert_eq!(fifo_visitor.init_order, vec![0, 1, 2, 3]);

    let mut lifo_visitor = RecordingVisitor::default();
    visit(
        &fst,
        &mut lifo_visitor,
        &mut LifoQueue::new(),
        AnyArcFilter,
        false,
    );
    assert_eq!(lifo_visitor.init_order, vec![0, 1, 3, 2]);
}

#[test]
fn access_only_skips_unreachable_states() {
    let mut fst = cyclic_fst();
    // State 3 is unreachable from the start.
    fst.add_state();
    fst.set_final(3, W::one());

    let mut visitor = RecordingVisitor::default();
    visit(
        &fst,
        &mut visitor,
        &mut FifoQueue::new(),
        AnyArcFilter,
        true,
    );
    assert!(!visitor.init_order.contains(&3));

    let mut full_visitor = RecordingVisitor::default();
    visit(
        &fst,
        &mut full_visitor,
        &mut FifoQueue::new(),
        AnyArcFilter,
        false,
    );
    assert!(full_visitor.init_order.contains(&3));
    assert_eq!(full_visitor.init_order.len(), 4);
}

#[test]
fn filtered_arcs_are_skipped() {
    let mut fst = VectorFst::<W>::new();
    for _ in 0..3 {
        fst.add_state();
    }
    fst.set_start(0);
    fst.set_final(2, W::one());
    fst.add_arc(0, Arc::new(EPSILON, EPSILON, W::one(), 1));
    fst.add_arc(0, Arc::new(5, 5, W::one(), 2));

    // Only epsilon arcs pass the filter, so state 2 is not discovered
    // from the tree; it still gets visited as a later root.
    let mut visitor = RecordingVisitor::default();
    visit(
        &fst,
        &mut visitor,
        &mut FifoQueue::new(),
        libwfst::algorithm::EpsilonArcFilter,
        true,
    );
    let mut inits = visitor.init_order.clone();
    inits.sort_unstable();
    assert_eq!(inits, vec![0, 1]);
    assert_eq!(visitor.arc_colours.len(), 1);
}

#[test]
fn complement_view_visits_lazily() {
    // The lazy complement is not expanded; the engine discovers its
    // states through arcs and the companion state iterator.
    let mut fst = VectorFst::<W>::new();
    let s0 = fst.add_state();
    let s1 = fst.add_state();
    fst.set_start(s0);
    fst.set_final(s1, W::one());
    fst.add_arc(s0, Arc::new(1, 1, W::one(), s1));

    let comp = ComplementFst::new(fst);
    let mut visitor = RecordingVisitor::default();
    visit(
        &comp,
        &mut visitor,
        &mut FifoQueue::new(),
        AnyArcFilter,
        false,
    );
    let mut inits = visitor.init_order.clone();
    inits.sort_unstable();
    assert_eq!(inits, vec![0, 1, 2]);
    assert_eq!(visitor.finish_order.len(), 3);
}
