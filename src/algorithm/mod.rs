//! Transducer algorithms: lazy views, in-place transformations and the
//! visitation engine.

pub mod arc_map;
pub mod complement;
pub mod encode;
pub mod rm_final_epsilon;
pub mod visit;

pub use arc_map::{arc_map, ArcMapFst, ArcMapper, MapFinalAction};
pub use complement::{complement, ComplementFst, RHO_LABEL};
pub use encode::{
    decode, encode, DecodeFst, EncodeFst, EncodeMapper, EncodeTable, EncodeTuple, EncodeType,
    ENCODE_FLAGS, ENCODE_LABELS, ENCODE_MAGIC_NUMBER, ENCODE_WEIGHTS,
};
pub use rm_final_epsilon::rm_final_epsilon;
pub use visit::{
    visit, AnyArcFilter, ArcFilter, CopyVisitor, EpsilonArcFilter, FifoQueue,
    InputEpsilonArcFilter, LifoQueue, OutputEpsilonArcFilter, PartialVisitor, Queue, Visitor,
};
