//! Dispatch of operations by name and arc type.
//!
//! The registry is a two-level map keyed by `(operation name, arc type
//! tag)`. Each operation declares an argument pack, a plain struct
//! bundling its inputs and output slots; implementations are registered
//! per arc type and invoked through [`apply`], which type-erases the
//! pack behind [`Any`]. A lookup miss logs and leaves the output slots
//! untouched.
//!
//! The crate's own operations (`complement`, `encode`, `decode`) are
//! registered for the `standard` and `log` arc families on first
//! registry access. Dynamic loading of additional arc types is out of
//! scope; new registrations happen through
//! [`register_operation`].

use crate::algorithm::{complement, decode, encode, EncodeMapper};
use crate::fst::{Fst, VectorFst};
use crate::semiring::{LogWeight, Semiring, TropicalWeight};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::sync::OnceLock;

type OpKey = (String, String);
type OpFn = Box<dyn Fn(&mut dyn Any) + Send + Sync>;

struct OperationRegister {
    ops: RwLock<FxHashMap<OpKey, OpFn>>,
}

static REGISTER: OnceLock<OperationRegister> = OnceLock::new();

fn register() -> &'static OperationRegister {
    REGISTER.get_or_init(|| {
        let mut ops = FxHashMap::default();
        add_builtins::<TropicalWeight>(&mut ops);
        add_builtins::<LogWeight>(&mut ops);
        OperationRegister {
            ops: RwLock::new(ops),
        }
    })
}

fn erase<A: Any>(op: fn(&mut A)) -> OpFn {
    Box::new(move |args: &mut dyn Any| match args.downcast_mut::<A>() {
        Some(args) => op(args),
        None => log::error!("apply: argument pack has the wrong type"),
    })
}

fn add_builtins<W: Semiring>(ops: &mut FxHashMap<OpKey, OpFn>) {
    let arc_type = W::arc_type().to_string();
    ops.insert(
        ("complement".to_string(), arc_type.clone()),
        erase(complement_op::<W>),
    );
    ops.insert(
        ("encode".to_string(), arc_type.clone()),
        erase(encode_op::<W>),
    );
    ops.insert(("decode".to_string(), arc_type), erase(decode_op::<W>));
}

/// Argument pack of the `complement` operation.
pub struct ComplementArgs<W: Semiring> {
    /// The acceptor to complement.
    pub ifst: VectorFst<W>,
    /// Output slot for the materialized complement.
    pub ofst: VectorFst<W>,
}

/// Argument pack of the `encode` operation.
pub struct EncodeArgs<W: Semiring> {
    /// The transducer, encoded in place.
    pub fst: VectorFst<W>,
    /// The mapper whose table the encoding extends.
    pub mapper: EncodeMapper<W>,
}

/// Argument pack of the `decode` operation.
pub struct DecodeArgs<W: Semiring> {
    /// The transducer, decoded in place.
    pub fst: VectorFst<W>,
    /// The mapper whose table drives the decoding.
    pub mapper: EncodeMapper<W>,
}

fn complement_op<W: Semiring>(args: &mut ComplementArgs<W>) {
    complement(&args.ifst, &mut args.ofst);
}

fn encode_op<W: Semiring>(args: &mut EncodeArgs<W>) {
    encode(&mut args.fst, &mut args.mapper);
}

fn decode_op<W: Semiring>(args: &mut DecodeArgs<W>) {
    decode(&mut args.fst, &args.mapper);
}

/// Registers an implementation of `name` for `arc_type`, replacing any
/// previous entry for the pair.
pub fn register_operation<A: Any>(name: &str, arc_type: &str, op: fn(&mut A)) {
    register()
        .ops
        .write()
        .insert((name.to_string(), arc_type.to_string()), erase(op));
}

/// Looks up and invokes the implementation of `name` for `arc_type`.
///
/// Returns whether an implementation was found. On a miss, or when the
/// registered implementation expects a different argument pack, the
/// failure is logged and `args` is left untouched.
pub fn apply<A: Any>(name: &str, arc_type: &str, args: &mut A) -> bool {
    let ops = register().ops.read();
    match ops.get(&(name.to_string(), arc_type.to_string())) {
        Some(op) => {
            op(args);
            true
        }
        None => {
            log::error!("no operation found for {} on arc type {}", name, arc_type);
            false
        }
    }
}

/// Checks that two transducers share an arc type, logging a diagnostic
/// for `op_name` when they do not.
///
/// A precondition helper for every operation taking two transducers.
pub fn arc_types_match<WA: Semiring, WB: Semiring>(
    a: &dyn Fst<WA>,
    b: &dyn Fst<WB>,
    op_name: &str,
) -> bool {
    if a.arc_type() != b.arc_type() {
        log::error!(
            "arguments with non-matching arc types passed to {}: {} and {}",
            op_name,
            a.arc_type(),
            b.arc_type()
        );
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{EncodeType, ENCODE_LABELS, RHO_LABEL};
    use crate::fst::{Arc, ArcIter as _, ExpandedFst, MutableFst, NO_LABEL};

    type W = TropicalWeight;

    fn single_string_acceptor() -> VectorFst<W> {
        let mut fst = VectorFst::new();
        let s0 = fst.add_state();
        let s1 = fst.add_state();
        fst.set_start(s0);
        fst.set_final(s1, W::one());
        fst.add_arc(s0, Arc::new(1, 1, W::one(), s1));
        fst
    }

    #[test]
    fn test_apply_complement() {
        let mut args = ComplementArgs {
            ifst: single_string_acceptor(),
            ofst: VectorFst::new(),
        };
        assert!(apply("complement", "standard", &mut args));
        assert_eq!(args.ofst.num_states(), 3);
        assert_eq!(args.ofst.start(), 1);
        let mut aiter = args.ofst.arcs(1);
        assert_eq!(aiter.value().ilabel, RHO_LABEL);
    }

    #[test]
    fn test_apply_encode_roundtrip() {
        let mapper = EncodeMapper::new(ENCODE_LABELS, EncodeType::Encode);
        let mut args = EncodeArgs {
            fst: single_string_acceptor(),
            mapper,
        };
        assert!(apply("encode", "standard", &mut args));
        assert_eq!(args.mapper.size(), 1);
    }

    #[test]
    fn test_apply_miss_leaves_args_untouched() {
        let mut args = ComplementArgs {
            ifst: single_string_acceptor(),
            ofst: VectorFst::new(),
        };
        assert!(!apply("minimize", "standard", &mut args));
        assert_eq!(args.ofst.num_states(), 0);
        // Registered operation, unknown arc type.
        assert!(!apply("complement", "tricky", &mut args));
        assert_eq!(args.ofst.num_states(), 0);
    }

    #[test]
    fn test_register_custom_operation() {
        struct ReverseLabelArgs {
            label: i32,
        }
        fn negate(args: &mut ReverseLabelArgs) {
            args.label = -args.label;
        }
        register_operation("negate-label", "standard", negate);
        let mut args = ReverseLabelArgs { label: 7 };
        assert!(apply("negate-label", "standard", &mut args));
        assert_eq!(args.label, -7);
    }

    #[test]
    fn test_wrong_arg_pack_is_logged_noop() {
        let mut args = NO_LABEL;
        assert!(apply("complement", "standard", &mut args));
        assert_eq!(args, NO_LABEL);
    }

    #[test]
    fn test_arc_types_match() {
        let a = single_string_acceptor();
        let b = single_string_acceptor();
        let c = VectorFst::<LogWeight>::new();
        assert!(arc_types_match(&a, &b, "difference"));
        assert!(!arc_types_match(&a, &c, "difference"));
    }
}
