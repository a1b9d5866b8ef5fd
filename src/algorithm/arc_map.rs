//! Arc-mapped transducers, eager and lazy.
//!
//! An [`ArcMapper`] rewrites arcs one at a time. Final weights travel
//! through the mapper as pseudo-arcs `(0, 0, final_weight, NO_STATE_ID)`,
//! which lets a mapper turn non-trivial final weights into real arcs
//! leading to a superfinal state when its
//! [`final_action`](ArcMapper::final_action) demands one.

use crate::fst::properties::{
    compute_properties, known_properties, ERROR, FST_PROPERTIES, SCAN_PROPERTIES,
};
use crate::fst::{
    Arc, ArcIter, ExpandedFst, Fst, MutableFst, StateId, StateIter, SymbolTable, EPSILON,
    NO_STATE_ID,
};
use crate::semiring::Semiring;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc as Shared;

/// How a mapper's output represents final weights.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapFinalAction {
    /// A final weight is mapped into a final weight.
    NoSuperfinal,
    /// Non-trivial mapped final weights become arcs into a single new
    /// superfinal state with final weight **1**.
    RequireSuperfinal,
}

/// A per-arc rewriting function applied by [`arc_map`] and
/// [`ArcMapFst`].
///
/// Mappers use interior mutability for any state they accumulate (such
/// as an encode table), so a shared reference suffices to map arcs.
pub trait ArcMapper<W: Semiring> {
    /// Maps one arc. Final weights arrive as pseudo-arcs with
    /// `nextstate == NO_STATE_ID`.
    fn map_arc(&self, arc: &Arc<W>) -> Arc<W>;

    /// The superfinal policy of this mapper's output.
    fn final_action(&self) -> MapFinalAction;

    /// Derives the output property word from the input property word.
    fn map_properties(&self, inprops: u64) -> u64;

    /// Whether this mapper has entered its sticky error state.
    fn error(&self) -> bool {
        false
    }
}

/// Applies `mapper` to every arc and final weight of `fst`, in place.
///
/// Complexity is O(states + arcs). When the mapper requires a
/// superfinal state, one is appended and every non-trivial mapped
/// final weight becomes an arc into it.
pub fn arc_map<W, F, M>(fst: &mut F, mapper: &M)
where
    W: Semiring,
    F: MutableFst<W> + ExpandedFst<W>,
    M: ArcMapper<W>,
{
    if fst.start() == NO_STATE_ID {
        return;
    }
    let inprops = fst.properties(FST_PROPERTIES, false);
    let final_action = mapper.final_action();
    let nstates = fst.num_states();
    let superfinal = if final_action == MapFinalAction::RequireSuperfinal {
        let s = fst.add_state();
        fst.set_final(s, W::one());
        s
    } else {
        NO_STATE_ID
    };

    for s in 0..nstates as StateId {
        let mut mapped = Vec::with_capacity(fst.num_arcs(s));
        {
            let mut aiter = fst.arcs(s);
            while !aiter.done() {
                mapped.push(mapper.map_arc(aiter.value()));
                aiter.next();
            }
        }
        fst.delete_arcs(s);
        fst.reserve_arcs(s, mapped.len());
        for arc in mapped {
            fst.add_arc(s, arc);
        }

        let final_arc = mapper.map_arc(&Arc::new(EPSILON, EPSILON, fst.final_weight(s), NO_STATE_ID));
        match final_action {
            MapFinalAction::NoSuperfinal => {
                if final_arc.ilabel != EPSILON || final_arc.olabel != EPSILON {
                    log::error!("arc_map: mapper requires a superfinal state");
                    fst.set_properties(ERROR, ERROR);
                    fst.set_final(s, W::zero());
                } else {
                    fst.set_final(s, final_arc.weight);
                }
            }
            MapFinalAction::RequireSuperfinal => {
                if final_arc.ilabel != EPSILON
                    || final_arc.olabel != EPSILON
                    || final_arc.weight != W::zero()
                {
                    fst.add_arc(
                        s,
                        Arc::new(final_arc.ilabel, final_arc.olabel, final_arc.weight, superfinal),
                    );
                }
                fst.set_final(s, W::zero());
            }
        }
    }

    let mut outprops = mapper.map_properties(inprops);
    if mapper.error() {
        outprops |= ERROR;
    }
    fst.set_properties(outprops, FST_PROPERTIES);
}

struct CachedState<W: Semiring> {
    arcs: Shared<Vec<Arc<W>>>,
    final_weight: W,
    niepsilons: usize,
    noepsilons: usize,
}

struct ArcMapImpl<W: Semiring, F: Fst<W>, M: ArcMapper<W>> {
    fst: Shared<F>,
    mapper: M,
    cache: RwLock<FxHashMap<StateId, CachedState<W>>>,
    properties: AtomicU64,
    superfinal: StateId,
    _weight: PhantomData<W>,
}

impl<W: Semiring, F: Fst<W>, M: ArcMapper<W>> ArcMapImpl<W, F, M> {
    // Materializes state `s`, invoking the mapper at most once per
    // operand arc across repeated iteration.
    fn ensure_cached(&self, s: StateId) {
        {
            let cache = self.cache.read();
            if cache.contains_key(&s) {
                return;
            }
        }
        let entry = self.materialize(s);
        self.cache.write().entry(s).or_insert(entry);
        if self.mapper.error() {
            self.properties.fetch_or(ERROR, Ordering::Relaxed);
        }
    }

    fn materialize(&self, s: StateId) -> CachedState<W> {
        if s == self.superfinal {
            return CachedState {
                arcs: Shared::new(Vec::new()),
                final_weight: W::one(),
                niepsilons: 0,
                noepsilons: 0,
            };
        }
        let mut arcs = Vec::with_capacity(self.fst.num_arcs(s));
        let mut aiter = self.fst.arcs(s);
        while !aiter.done() {
            arcs.push(self.mapper.map_arc(aiter.value()));
            aiter.next();
        }
        let final_arc = self
            .mapper
            .map_arc(&Arc::new(EPSILON, EPSILON, self.fst.final_weight(s), NO_STATE_ID));
        let final_weight = match self.mapper.final_action() {
            MapFinalAction::NoSuperfinal => {
                if final_arc.ilabel != EPSILON || final_arc.olabel != EPSILON {
                    log::error!("ArcMapFst: mapper requires a superfinal state");
                    self.properties.fetch_or(ERROR, Ordering::Relaxed);
                    W::no_weight()
                } else {
                    final_arc.weight
                }
            }
            MapFinalAction::RequireSuperfinal => {
                if self.superfinal != NO_STATE_ID
                    && (final_arc.ilabel != EPSILON
                        || final_arc.olabel != EPSILON
                        || final_arc.weight != W::zero())
                {
                    arcs.push(Arc::new(
                        final_arc.ilabel,
                        final_arc.olabel,
                        final_arc.weight,
                        self.superfinal,
                    ));
                }
                W::zero()
            }
        };
        let niepsilons = arcs.iter().filter(|a| a.ilabel == EPSILON).count();
        let noepsilons = arcs.iter().filter(|a| a.olabel == EPSILON).count();
        CachedState {
            arcs: Shared::new(arcs),
            final_weight,
            niepsilons,
            noepsilons,
        }
    }

    fn with_cached<R>(&self, s: StateId, f: impl FnOnce(&CachedState<W>) -> R) -> R {
        self.ensure_cached(s);
        let cache = self.cache.read();
        f(cache.get(&s).expect("state just cached"))
    }
}

/// Lazy arc-mapped view of a transducer.
///
/// Construction is O(1); traversal costs O(states visited + arcs
/// visited) with constant per-item overhead, and materialized states
/// are cached so repeated iteration does not re-invoke the mapper.
/// Copies are O(1) and share the implementation;
/// [`safe_copy`](ArcMapFst::safe_copy) instead deep-copies the cache
/// while still sharing the operand.
///
/// When the mapper requires a superfinal state the operand must know
/// its state count, so the new state can be assigned the next id;
/// otherwise the view enters the error state.
pub struct ArcMapFst<W: Semiring, F: Fst<W>, M: ArcMapper<W>> {
    shared: Shared<ArcMapImpl<W, F, M>>,
}

impl<W: Semiring, F: Fst<W>, M: ArcMapper<W>> ArcMapFst<W, F, M> {
    /// Wraps `fst` in a lazy view applying `mapper`.
    pub fn new(fst: F, mapper: M) -> Self {
        use crate::fst::properties::COPY_PROPERTIES;
        let mut props =
            mapper.map_properties(fst.properties(FST_PROPERTIES, false)) & COPY_PROPERTIES;
        let mut superfinal = NO_STATE_ID;
        if mapper.final_action() == MapFinalAction::RequireSuperfinal {
            match fst.num_states_if_known() {
                Some(n) => superfinal = n as StateId,
                None => {
                    log::error!(
                        "ArcMapFst: mapper requires a superfinal state but the \
                         operand state count is unknown"
                    );
                    props |= ERROR;
                }
            }
        }
        ArcMapFst {
            shared: Shared::new(ArcMapImpl {
                fst: Shared::new(fst),
                mapper,
                cache: RwLock::new(FxHashMap::default()),
                properties: AtomicU64::new(props),
                superfinal,
                _weight: PhantomData,
            }),
        }
    }

    /// The mapper driving this view.
    pub fn mapper(&self) -> &M {
        &self.shared.mapper
    }
}

impl<W: Semiring, F: Fst<W>, M: ArcMapper<W> + Clone> ArcMapFst<W, F, M> {
    /// A copy whose mutable cache is deep-copied, for use from another
    /// thread; the operand stays shared.
    pub fn safe_copy(&self) -> Self {
        let src = &self.shared;
        let cache: FxHashMap<StateId, CachedState<W>> = src
            .cache
            .read()
            .iter()
            .map(|(&s, c)| {
                (
                    s,
                    CachedState {
                        arcs: Shared::clone(&c.arcs),
                        final_weight: c.final_weight.clone(),
                        niepsilons: c.niepsilons,
                        noepsilons: c.noepsilons,
                    },
                )
            })
            .collect();
        ArcMapFst {
            shared: Shared::new(ArcMapImpl {
                fst: Shared::clone(&src.fst),
                mapper: src.mapper.clone(),
                cache: RwLock::new(cache),
                properties: AtomicU64::new(src.properties.load(Ordering::Relaxed)),
                superfinal: src.superfinal,
                _weight: PhantomData,
            }),
        }
    }
}

impl<W: Semiring, F: Fst<W>, M: ArcMapper<W>> Clone for ArcMapFst<W, F, M> {
    fn clone(&self) -> Self {
        ArcMapFst {
            shared: Shared::clone(&self.shared),
        }
    }
}

impl<W: Semiring, F: Fst<W>, M: ArcMapper<W>> Fst<W> for ArcMapFst<W, F, M> {
    fn start(&self) -> StateId {
        if self.properties(ERROR, false) & ERROR != 0 {
            return NO_STATE_ID;
        }
        self.shared.fst.start()
    }

    fn final_weight(&self, state: StateId) -> W {
        self.shared.with_cached(state, |c| c.final_weight.clone())
    }

    fn num_arcs(&self, state: StateId) -> usize {
        self.shared.with_cached(state, |c| c.arcs.len())
    }

    fn num_input_epsilons(&self, state: StateId) -> usize {
        self.shared.with_cached(state, |c| c.niepsilons)
    }

    fn num_output_epsilons(&self, state: StateId) -> usize {
        self.shared.with_cached(state, |c| c.noepsilons)
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
        if mask & ERROR != 0
            && (self.shared.fst.properties(ERROR, false) & ERROR != 0 || self.shared.mapper.error())
        {
            self.shared.properties.fetch_or(ERROR, Ordering::Relaxed);
        }
        self.shared.properties.load(Ordering::Relaxed) & mask
    }

    fn input_symbols(&self) -> Option<&SymbolTable> {
        self.shared.fst.input_symbols()
    }

    fn output_symbols(&self) -> Option<&SymbolTable> {
        self.shared.fst.output_symbols()
    }

    fn num_states_if_known(&self) -> Option<usize> {
        let extra = usize::from(self.shared.superfinal != NO_STATE_ID);
        self.shared.fst.num_states_if_known().map(|n| n + extra)
    }

    fn states(&self) -> Box<dyn StateIter + '_> {
        Box::new(ArcMapStateIter {
            inner: self.shared.fst.states(),
            superfinal: if self.shared.superfinal != NO_STATE_ID {
                Some(self.shared.superfinal)
            } else {
                None
            },
            emitted_superfinal: false,
        })
    }

    fn arcs(&self, state: StateId) -> Box<dyn ArcIter<W> + '_> {
        let arcs = self.shared.with_cached(state, |c| Shared::clone(&c.arcs));
        Box::new(ArcMapArcIter { arcs, pos: 0 })
    }
}

struct ArcMapStateIter<'a> {
    inner: Box<dyn StateIter + 'a>,
    superfinal: Option<StateId>,
    emitted_superfinal: bool,
}

impl StateIter for ArcMapStateIter<'_> {
    fn done(&self) -> bool {
        self.inner.done() && (self.superfinal.is_none() || self.emitted_superfinal)
    }

    fn value(&self) -> StateId {
        if !self.inner.done() {
            self.inner.value()
        } else {
            self.superfinal.expect("superfinal pending")
        }
    }

    fn next(&mut self) {
        if !self.inner.done() {
            self.inner.next();
        } else {
            self.emitted_superfinal = true;
        }
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.emitted_superfinal = false;
    }
}

struct ArcMapArcIter<W: Semiring> {
    arcs: Shared<Vec<Arc<W>>>,
    pos: usize,
}

impl<W: Semiring> ArcIter<W> for ArcMapArcIter<W> {
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
