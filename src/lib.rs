//! # libwfst
//!
//! An in-memory algebra of weighted finite-state transducers (WFSTs)
//! parameterized over an arbitrary weight semiring.
//!
//! The crate provides the core transducer contract with lazy
//! (on-demand) views, queue-driven visitation under pluggable queue
//! disciplines, lazy complementation of deterministic acceptors, and a
//! reversible label/weight encoding that lets semiring-aware machines
//! be driven by acceptor-only engines.
//!
//! ## Example
//!
//! ```rust,ignore
//! use libwfst::prelude::*;
//!
//! let mut fst = VectorFst::<TropicalWeight>::new();
//! let s0 = fst.add_state();
//! let s1 = fst.add_state();
//! fst.set_start(s0);
//! fst.set_final(s1, TropicalWeight::one());
//! fst.add_arc(s0, Arc::new(1, 1, TropicalWeight::one(), s1));
//!
//! let mut mapper = EncodeMapper::new(ENCODE_LABELS | ENCODE_WEIGHTS, EncodeType::Encode);
//! encode(&mut fst, &mut mapper);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithm;
pub mod fst;
pub mod registry;
pub mod semiring;

use thiserror::Error;

/// Errors produced by the stream serialization of encode tables and
/// symbol tables.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The stream does not begin with the expected magic number.
    #[error("bad header magic: expected {expected}, found {found}")]
    BadMagic {
        /// The magic number the reader requires.
        expected: i32,
        /// The value actually read.
        found: i32,
    },
    /// The stream ended before the announced payload.
    #[error("truncated stream")]
    Truncated,
    /// Symbol-table section error.
    #[error("symbol table section")]
    SymbolTable(#[from] bincode::Error),
    /// Underlying I/O failure.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Common imports for convenient usage.
pub mod prelude {
    pub use crate::algorithm::complement::{complement, ComplementFst};
    pub use crate::algorithm::encode::{
        decode, encode, DecodeFst, EncodeFst, EncodeMapper, EncodeTable, EncodeType,
        ENCODE_LABELS, ENCODE_WEIGHTS,
    };
    pub use crate::algorithm::visit::{
        visit, AnyArcFilter, ArcFilter, CopyVisitor, FifoQueue, LifoQueue, PartialVisitor, Queue,
        Visitor,
    };
    pub use crate::fst::{
        Arc, ArcIter, ExpandedFst, Fst, Label, LogArc, MutableFst, StateId, StateIter, StdArc,
        SymbolTable, VectorFst, EPSILON, NO_LABEL, NO_STATE_ID,
    };
    pub use crate::semiring::{BooleanWeight, LogWeight, Semiring, TropicalWeight};
}
