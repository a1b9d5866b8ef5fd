//! Language-level tests of the lazy complement.

use libwfst::algorithm::RHO_LABEL;
use libwfst::fst::properties::{
    ACCEPTOR, ERROR, I_DETERMINISTIC, NO_EPSILONS, UNWEIGHTED,
};
use libwfst::prelude::*;

type W = TropicalWeight;

/// Builds a deterministic trie-shaped acceptor for a set of words.
fn acceptor(words: &[&[Label]]) -> VectorFst<W> {
    let mut fst = VectorFst::new();
    let start = fst.add_state();
    fst.set_start(start);
    for word in words {
        let mut state = start;
        for &label in *word {
            let mut next = NO_STATE_ID;
            let mut aiter = fst.arcs(state);
            while !aiter.done() {
                if aiter.value().ilabel == label {
                    next = aiter.value().nextstate;
                    break;
                }
                aiter.next();
            }
            drop(aiter);
            if next == NO_STATE_ID {
                next = fst.add_state();
                fst.add_arc(state, Arc::new(label, label, W::one(), next));
            }
            state = next;
        }
        fst.set_final(state, W::one());
    }
    fst
}

/// Runs `word` through a deterministic acceptor, treating a rho arc as
/// matching any label without an explicit arc.
fn accepts(fst: &impl Fst<W>, word: &[Label]) -> bool {
    let mut state = fst.start();
    if state == NO_STATE_ID {
        return false;
    }
    for &label in word {
        let mut next = NO_STATE_ID;
        let mut rho_next = NO_STATE_ID;
        let mut aiter = fst.arcs(state);
        while !aiter.done() {
            let arc = aiter.value();
            if arc.ilabel == label {
                next = arc.nextstate;
                break;
            }
            if arc.ilabel == RHO_LABEL {
                rho_next = arc.nextstate;
            }
            aiter.next();
        }
        state = if next != NO_STATE_ID { next } else { rho_next };
        if state == NO_STATE_ID {
            return false;
        }
    }
    fst.final_weight(state) != W::zero()
}

/// Replaces rho arcs by explicit arcs over a concrete alphabet, the way
/// the set-difference consumer would read them.
fn expand_rho(fst: &impl Fst<W>, alphabet: &[Label]) -> VectorFst<W> {
    let mut out = VectorFst::new();
    let mut states = Vec::new();
    let mut siter = fst.states();
    while !siter.done() {
        states.push(siter.value());
        siter.next();
    }
    for _ in &states {
        out.add_state();
    }
    out.set_start(fst.start());
    for &s in &states {
        out.set_final(s, fst.final_weight(s));
        let mut present = Vec::new();
        let mut rho_target = NO_STATE_ID;
        let mut aiter = fst.arcs(s);
        while !aiter.done() {
            let arc = aiter.value().clone();
            if arc.ilabel == RHO_LABEL {
                rho_target = arc.nextstate;
            } else {
                present.push(arc.ilabel);
                out.add_arc(s, arc);
            }
            aiter.next();
        }
        if rho_target != NO_STATE_ID {
            for &label in alphabet {
                if !present.contains(&label) {
                    out.add_arc(s, Arc::new(label, label, W::one(), rho_target));
                }
            }
        }
    }
    out
}

/// All words over `alphabet` up to length `max_len`.
fn words_up_to(alphabet: &[Label], max_len: usize) -> Vec<Vec<Label>> {
    let mut words: Vec<Vec<Label>> = vec![Vec::new()];
    let mut frontier: Vec<Vec<Label>> = vec![Vec::new()];
    for _ in 0..max_len {
        let mut next = Vec::new();
        for word in &frontier {
            for &label in alphabet {
                let mut extended = word.clone();
                extended.push(label);
                next.push(extended);
            }
        }
        words.extend(next.iter().cloned());
        frontier = next;
    }
    words
}

#[test]
fn complement_flips_acceptance_for_every_word() {
    let alphabet = [1, 2];
    let fst = acceptor(&[&[1], &[1, 2], &[2, 2, 1]]);
    let comp = ComplementFst::new(fst.clone());

    for word in words_up_to(&alphabet, 4) {
        assert_eq!(
            accepts(&comp, &word),
            !accepts(&fst, &word),
            "word {:?}",
            word
        );
    }
}

#[test]
fn complement_of_empty_language_accepts_everything() {
    let mut fst = VectorFst::<W>::new();
    let s0 = fst.add_state();
    fst.set_start(s0);

    let comp = ComplementFst::new(fst);
    for word in words_up_to(&[1, 2], 3) {
        assert!(accepts(&comp, &word), "word {:?}", word);
    }
}

#[test]
fn double_complement_is_language_equivalent() {
    let alphabet = [1, 2, 3];
    let fst = acceptor(&[&[3], &[1, 2], &[1, 3]]);

    // Expand the first complement over the alphabet so the second
    // complement sees an ordinary deterministic acceptor again.
    let first = expand_rho(&ComplementFst::new(fst.clone()), &alphabet);
    let double = ComplementFst::new(first);

    for word in words_up_to(&alphabet, 3) {
        assert_eq!(
            accepts(&double, &word),
            accepts(&fst, &word),
            "word {:?}",
            word
        );
    }
}

#[test]
fn materialized_complement_matches_lazy_view() {
    let fst = acceptor(&[&[1, 1], &[2]]);
    let view = ComplementFst::new(fst.clone());

    let mut eager = VectorFst::new();
    complement(&fst, &mut eager);

    for word in words_up_to(&[1, 2], 3) {
        assert_eq!(accepts(&view, &word), accepts(&eager, &word));
    }
    assert_eq!(
        eager.properties(ACCEPTOR | UNWEIGHTED | NO_EPSILONS | I_DETERMINISTIC, false),
        ACCEPTOR | UNWEIGHTED | NO_EPSILONS | I_DETERMINISTIC
    );
}

#[test]
fn complement_precondition_failure_is_sticky() {
    // Weighted operand: precondition violated.
    let mut fst = VectorFst::<W>::new();
    let s0 = fst.add_state();
    let s1 = fst.add_state();
    fst.set_start(s0);
    fst.set_final(s1, W::one());
    fst.add_arc(s0, Arc::new(1, 1, W::new(0.5), s1));

    let comp = ComplementFst::new(fst);
    assert_ne!(comp.properties(ERROR, false) & ERROR, 0);
    assert_eq!(comp.start(), NO_STATE_ID);
    // Copies share the error state.
    let copy = comp.clone();
    assert_ne!(copy.properties(ERROR, false) & ERROR, 0);
}

#[test]
fn operand_error_propagates_through_view() {
    let mut fst = acceptor(&[&[1]]);
    fst.set_error();
    let comp = ComplementFst::new(fst);
    assert_ne!(comp.properties(ERROR, false) & ERROR, 0);
}
