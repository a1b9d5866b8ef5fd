//! Reversible label/weight encoding of transducers.
//!
//! Encoding folds the selected arc features (labels and/or weight)
//! into a single compact positive label, making a weighted transducer
//! amenable to acceptor-only algorithms (classical determinization,
//! minimization). The [`EncodeTable`] is bidirectional and shared,
//! reference-counted, between the encoder and every decoder derived
//! from it; decoders have read-only access and observe the table as of
//! each call, so a machine may be decoded on the fly while its encoding
//! is still being extended.

use super::arc_map::{arc_map, ArcMapFst, ArcMapper, MapFinalAction};
use super::rm_final_epsilon::rm_final_epsilon;
use crate::fst::properties::{
    ADD_SUPERFINAL_PROPERTIES, ERROR, FST_PROPERTIES, I_LABEL_INVARIANT_PROPERTIES,
    O_LABEL_INVARIANT_PROPERTIES, RM_SUPERFINAL_PROPERTIES, WEIGHT_INVARIANT_PROPERTIES,
};
use crate::fst::{
    Arc, ArcIter, ExpandedFst, Fst, Label, MutableFst, StateId, StateIter, SymbolTable, EPSILON,
    NO_LABEL, NO_STATE_ID,
};
use crate::semiring::Semiring;
use crate::FormatError;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc as Shared;

/// Encode flag: input and output labels participate in the encoding.
pub const ENCODE_LABELS: u32 = 0x0001;
/// Encode flag: weights participate in the encoding.
pub const ENCODE_WEIGHTS: u32 = 0x0002;
/// All caller-selectable encode flags.
pub const ENCODE_FLAGS: u32 = 0x0003;

/// Internal flag: the table carries an input symbol table.
pub const ENCODE_HAS_I_SYMBOLS: u32 = 0x0004;
/// Internal flag: the table carries an output symbol table.
pub const ENCODE_HAS_O_SYMBOLS: u32 = 0x0008;

/// Identifies stream data as an encode table, and its endianness by
/// value.
pub const ENCODE_MAGIC_NUMBER: i32 = 2129983209;

/// The direction a mapper applies the shared table in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodeType {
    /// Fold arc features into encoded labels.
    Encode,
    /// Expand encoded labels back into arc features.
    Decode,
}

/// The feature vector stored per encoded label: input label, output
/// label and weight, with unselected features holding neutral values
/// (`olabel = 0`, `weight =` **1**).
#[derive(Clone, Debug, PartialEq)]
pub struct EncodeTuple<W: Semiring> {
    /// Input label.
    pub ilabel: Label,
    /// Output label, 0 when labels are not encoded.
    pub olabel: Label,
    /// Weight, **1** when weights are not encoded.
    pub weight: W,
}

// Member weights only; the no-weight sentinel never enters the table.
impl<W: Semiring> Eq for EncodeTuple<W> {}

impl<W: Semiring> Hash for EncodeTuple<W> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Seed with ilabel, rotate left 5 and fold in the remaining
        // features. Unselected features hold neutral values, so mixing
        // them unconditionally matches mixing only the selected ones.
        const LSHIFT: u32 = 5;
        const RSHIFT: u32 = 64 - 5;
        let mut hash = self.ilabel as u64;
        hash = hash << LSHIFT ^ hash >> RSHIFT ^ self.olabel as u64;
        hash = hash << LSHIFT ^ hash >> RSHIFT ^ self.weight.hash_value();
        state.write_u64(hash);
    }
}

/// Bidirectional table mapping arc feature vectors to compact positive
/// labels.
///
/// Ids are 1-based; id 0 is reserved. The forward map (tuple → id) and
/// the reverse map (id → tuple) are maintained as inverses.
#[derive(Debug)]
pub struct EncodeTable<W: Semiring> {
    flags: u32,
    tuples: Vec<EncodeTuple<W>>,
    ids: FxHashMap<EncodeTuple<W>, Label>,
    isymbols: Option<SymbolTable>,
    osymbols: Option<SymbolTable>,
}

impl<W: Semiring> EncodeTable<W> {
    /// Creates an empty table for the given encode flags.
    pub fn new(flags: u32) -> Self {
        EncodeTable {
            flags,
            tuples: Vec::new(),
            ids: FxHashMap::default(),
            isymbols: None,
            osymbols: None,
        }
    }

    fn tuple_of(&self, arc: &Arc<W>) -> EncodeTuple<W> {
        EncodeTuple {
            ilabel: arc.ilabel,
            olabel: if self.flags & ENCODE_LABELS != 0 {
                arc.olabel
            } else {
                0
            },
            weight: if self.flags & ENCODE_WEIGHTS != 0 {
                arc.weight.clone()
            } else {
                W::one()
            },
        }
    }

    /// Encodes an arc's feature vector, assigning the next free id on
    /// first sight.
    pub fn encode(&mut self, arc: &Arc<W>) -> Label {
        let tuple = self.tuple_of(arc);
        if let Some(&id) = self.ids.get(&tuple) {
            return id;
        }
        // Ids are 1-based: computed from the reverse-table length
        // before the push.
        let id = (self.tuples.len() + 1) as Label;
        self.tuples.push(tuple.clone());
        self.ids.insert(tuple, id);
        id
    }

    /// Looks up an arc's encoded label without inserting. Returns
    /// [`NO_LABEL`] when the feature vector has not been encoded.
    pub fn get_label(&self, arc: &Arc<W>) -> Label {
        let tuple = self.tuple_of(arc);
        self.ids.get(&tuple).copied().unwrap_or(NO_LABEL)
    }

    /// The feature vector behind an encoded label, or `None` for an
    /// unknown id.
    pub fn decode(&self, id: Label) -> Option<&EncodeTuple<W>> {
        if id < 1 || id as usize > self.tuples.len() {
            log::error!("EncodeTable::decode: unknown decode key: {}", id);
            return None;
        }
        Some(&self.tuples[id as usize - 1])
    }

    /// Number of encoded feature vectors.
    pub fn size(&self) -> usize {
        self.tuples.len()
    }

    /// The caller-selectable encode flags.
    pub fn flags(&self) -> u32 {
        self.flags & ENCODE_FLAGS
    }

    /// The pre-encoding input symbol table, if attached.
    pub fn input_symbols(&self) -> Option<&SymbolTable> {
        self.isymbols.as_ref()
    }

    /// The pre-encoding output symbol table, if attached.
    pub fn output_symbols(&self) -> Option<&SymbolTable> {
        self.osymbols.as_ref()
    }

    /// Attaches or clears the input symbol table.
    pub fn set_input_symbols(&mut self, symbols: Option<SymbolTable>) {
        if symbols.is_some() {
            self.flags |= ENCODE_HAS_I_SYMBOLS;
        } else {
            self.flags &= !ENCODE_HAS_I_SYMBOLS;
        }
        self.isymbols = symbols;
    }

    /// Attaches or clears the output symbol table.
    pub fn set_output_symbols(&mut self, symbols: Option<SymbolTable>) {
        if symbols.is_some() {
            self.flags |= ENCODE_HAS_O_SYMBOLS;
        } else {
            self.flags &= !ENCODE_HAS_O_SYMBOLS;
        }
        self.osymbols = symbols;
    }

    /// Serializes the table onto `writer` in the stable little-endian
    /// format.
    pub fn write<Wr: Write>(&self, writer: &mut Wr) -> Result<(), FormatError> {
        writer.write_all(&ENCODE_MAGIC_NUMBER.to_le_bytes())?;
        writer.write_all(&self.flags.to_le_bytes())?;
        writer.write_all(&(self.tuples.len() as i64).to_le_bytes())?;
        for tuple in &self.tuples {
            writer.write_all(&tuple.ilabel.to_le_bytes())?;
            writer.write_all(&tuple.olabel.to_le_bytes())?;
            tuple.weight.write_binary(writer)?;
        }
        if let Some(symbols) = &self.isymbols {
            symbols.write(writer)?;
        }
        if let Some(symbols) = &self.osymbols {
            symbols.write(writer)?;
        }
        Ok(())
    }

    /// Deserializes a table from `reader`, rejecting the stream on a
    /// magic mismatch or short read.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        let magic = read_i32_le(reader)?;
        if magic != ENCODE_MAGIC_NUMBER {
            log::error!("EncodeTable::read: bad encode table header");
            return Err(FormatError::BadMagic {
                expected: ENCODE_MAGIC_NUMBER,
                found: magic,
            });
        }
        let flags = read_u32_le(reader)?;
        let size = read_i64_le(reader)?;
        if size < 0 {
            return Err(FormatError::Truncated);
        }
        let mut table = EncodeTable::new(flags);
        for _ in 0..size {
            let ilabel = read_i32_le(reader)?;
            let olabel = read_i32_le(reader)?;
            let weight = W::read_binary(reader)?;
            let tuple = EncodeTuple {
                ilabel,
                olabel,
                weight,
            };
            let id = (table.tuples.len() + 1) as Label;
            table.tuples.push(tuple.clone());
            table.ids.insert(tuple, id);
        }
        if flags & ENCODE_HAS_I_SYMBOLS != 0 {
            table.isymbols = Some(SymbolTable::read(reader)?);
        }
        if flags & ENCODE_HAS_O_SYMBOLS != 0 {
            table.osymbols = Some(SymbolTable::read(reader)?);
        }
        Ok(table)
    }
}

fn read_i32_le<R: Read>(reader: &mut R) -> Result<i32, FormatError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(short_read)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u32_le<R: Read>(reader: &mut R) -> Result<u32, FormatError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(short_read)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i64_le<R: Read>(reader: &mut R) -> Result<i64, FormatError> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf).map_err(short_read)?;
    Ok(i64::from_le_bytes(buf))
}

fn short_read(err: std::io::Error) -> FormatError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        FormatError::Truncated
    } else {
        FormatError::Io(err)
    }
}

/// Encodes and decodes arcs against a shared [`EncodeTable`].
///
/// The table is shared between the encoder and every decoder derived
/// from it via [`to_decoder`](EncodeMapper::to_decoder); only an
/// encoder extends the table, and decoders observe its state at the
/// moment of each call. Copies are O(1).
///
/// Applied as an [`ArcMapper`], the mapper implements the per-arc
/// contracts: encoding folds the selected features into a fresh or
/// existing 1-based id, leaving superfinal placeholder arcs untouched;
/// decoding restores the features, flagging malformed input and
/// unknown ids through the sticky error state.
#[derive(Debug)]
pub struct EncodeMapper<W: Semiring> {
    flags: u32,
    ty: EncodeType,
    table: Shared<RwLock<EncodeTable<W>>>,
    error: AtomicBool,
}

impl<W: Semiring> EncodeMapper<W> {
    /// Creates a mapper with a fresh table.
    pub fn new(flags: u32, ty: EncodeType) -> Self {
        EncodeMapper {
            flags,
            ty,
            table: Shared::new(RwLock::new(EncodeTable::new(flags & ENCODE_FLAGS))),
            error: AtomicBool::new(false),
        }
    }

    /// A mapper sharing this table but applying it in direction `ty`.
    /// Only the per-mapper direction flag changes.
    pub fn with_type(&self, ty: EncodeType) -> Self {
        EncodeMapper {
            flags: self.flags,
            ty,
            table: Shared::clone(&self.table),
            error: AtomicBool::new(self.error.load(Ordering::Relaxed)),
        }
    }

    /// A read-only decoder over this mapper's table.
    pub fn to_decoder(&self) -> Self {
        self.with_type(EncodeType::Decode)
    }

    /// The caller-selectable encode flags.
    pub fn flags(&self) -> u32 {
        self.flags & ENCODE_FLAGS
    }

    /// The direction this mapper applies the table in.
    pub fn encode_type(&self) -> EncodeType {
        self.ty
    }

    /// Number of feature vectors in the shared table.
    pub fn size(&self) -> usize {
        self.table.read().size()
    }

    /// Non-inserting lookup of an arc's encoded label.
    pub fn get_label(&self, arc: &Arc<W>) -> Label {
        self.table.read().get_label(arc)
    }

    /// The feature vector behind an encoded label, or `None` for an
    /// unknown id.
    pub fn decode(&self, id: Label) -> Option<EncodeTuple<W>> {
        self.table.read().decode(id).cloned()
    }

    /// The pre-encoding input symbol table, if attached.
    pub fn input_symbols(&self) -> Option<SymbolTable> {
        self.table.read().input_symbols().cloned()
    }

    /// The pre-encoding output symbol table, if attached.
    pub fn output_symbols(&self) -> Option<SymbolTable> {
        self.table.read().output_symbols().cloned()
    }

    /// Attaches or clears the shared table's input symbol table.
    pub fn set_input_symbols(&self, symbols: Option<SymbolTable>) {
        self.table.write().set_input_symbols(symbols);
    }

    /// Attaches or clears the shared table's output symbol table.
    pub fn set_output_symbols(&self, symbols: Option<SymbolTable>) {
        self.table.write().set_output_symbols(symbols);
    }

    /// Serializes the shared table onto `writer`.
    pub fn write<Wr: Write>(&self, writer: &mut Wr) -> Result<(), FormatError> {
        self.table.read().write(writer).map_err(|err| {
            log::error!("EncodeMapper::write: {}", err);
            err
        })
    }

    /// Reads a mapper back from a serialized table, applying it in
    /// direction `ty`.
    pub fn read<R: Read>(reader: &mut R, ty: EncodeType) -> Result<Self, FormatError> {
        let table = EncodeTable::read(reader).map_err(|err| {
            log::error!("EncodeMapper::read: {}", err);
            err
        })?;
        Ok(EncodeMapper {
            flags: table.flags(),
            ty,
            table: Shared::new(RwLock::new(table)),
            error: AtomicBool::new(false),
        })
    }

    fn set_error(&self) {
        self.error.store(true, Ordering::Relaxed);
    }

    fn encode_arc(&self, arc: &Arc<W>) -> Arc<W> {
        // A superfinal placeholder stays untouched: a final pseudo-arc
        // whose weight does not participate or is 0.
        if arc.nextstate == NO_STATE_ID
            && (self.flags & ENCODE_WEIGHTS == 0 || arc.weight == W::zero())
        {
            return arc.clone();
        }
        let label = self.table.write().encode(arc);
        Arc::new(
            label,
            if self.flags & ENCODE_LABELS != 0 {
                label
            } else {
                arc.olabel
            },
            if self.flags & ENCODE_WEIGHTS != 0 {
                W::one()
            } else {
                arc.weight.clone()
            },
            arc.nextstate,
        )
    }

    fn decode_arc(&self, arc: &Arc<W>) -> Arc<W> {
        if arc.nextstate == NO_STATE_ID || arc.ilabel == EPSILON {
            return arc.clone();
        }
        if self.flags & ENCODE_LABELS != 0 && arc.ilabel != arc.olabel {
            log::error!(
                "EncodeMapper: label-encoded arc has different input and output labels"
            );
            self.set_error();
            return Arc::new(NO_LABEL, NO_LABEL, W::no_weight(), arc.nextstate);
        }
        if self.flags & ENCODE_WEIGHTS != 0 && arc.weight != W::one() {
            log::error!("EncodeMapper: weight-encoded arc has non-trivial weight");
            self.set_error();
            return Arc::new(NO_LABEL, NO_LABEL, W::no_weight(), arc.nextstate);
        }
        match self.table.read().decode(arc.ilabel) {
            None => {
                self.set_error();
                Arc::new(NO_LABEL, NO_LABEL, W::no_weight(), arc.nextstate)
            }
            Some(tuple) => Arc::new(
                tuple.ilabel,
                if self.flags & ENCODE_LABELS != 0 {
                    tuple.olabel
                } else {
                    arc.olabel
                },
                if self.flags & ENCODE_WEIGHTS != 0 {
                    tuple.weight.clone()
                } else {
                    arc.weight.clone()
                },
                arc.nextstate,
            ),
        }
    }
}

impl<W: Semiring> Clone for EncodeMapper<W> {
    fn clone(&self) -> Self {
        EncodeMapper {
            flags: self.flags,
            ty: self.ty,
            table: Shared::clone(&self.table),
            error: AtomicBool::new(false),
        }
    }
}

impl<W: Semiring> ArcMapper<W> for EncodeMapper<W> {
    fn map_arc(&self, arc: &Arc<W>) -> Arc<W> {
        match self.ty {
            EncodeType::Encode => self.encode_arc(arc),
            EncodeType::Decode => self.decode_arc(arc),
        }
    }

    fn final_action(&self) -> MapFinalAction {
        if self.ty == EncodeType::Encode && self.flags & ENCODE_WEIGHTS != 0 {
            MapFinalAction::RequireSuperfinal
        } else {
            MapFinalAction::NoSuperfinal
        }
    }

    fn map_properties(&self, inprops: u64) -> u64 {
        let mut outprops = inprops;
        if self.error() {
            outprops |= ERROR;
        }
        let mut mask = FST_PROPERTIES;
        if self.flags & ENCODE_LABELS != 0 {
            mask &= I_LABEL_INVARIANT_PROPERTIES & O_LABEL_INVARIANT_PROPERTIES;
        }
        if self.flags & ENCODE_WEIGHTS != 0 {
            mask &= I_LABEL_INVARIANT_PROPERTIES
                & WEIGHT_INVARIANT_PROPERTIES
                & if self.ty == EncodeType::Encode {
                    ADD_SUPERFINAL_PROPERTIES
                } else {
                    RM_SUPERFINAL_PROPERTIES
                };
        }
        (outprops & mask) | (outprops & ERROR)
    }

    fn error(&self) -> bool {
        self.error.load(Ordering::Relaxed)
    }
}

/// Encodes the labels and/or weights of `fst` in place.
///
/// The mapper adopts the transducer's symbol tables, which are cleared
/// on the now-encoded machine and restored by [`decode`]. Complexity is
/// O(states + arcs).
pub fn encode<W, F>(fst: &mut F, mapper: &mut EncodeMapper<W>)
where
    W: Semiring,
    F: MutableFst<W> + ExpandedFst<W>,
{
    mapper.set_input_symbols(fst.input_symbols().cloned());
    mapper.set_output_symbols(fst.output_symbols().cloned());
    let encoder = mapper.with_type(EncodeType::Encode);
    arc_map(fst, &encoder);
    fst.set_input_symbols(None);
    fst.set_output_symbols(None);
}

/// Decodes `fst` in place against the mapper's shared table, removing
/// the superfinal states weight encoding introduced and restoring the
/// symbol tables the encoder adopted.
pub fn decode<W, F>(fst: &mut F, mapper: &EncodeMapper<W>)
where
    W: Semiring,
    F: MutableFst<W> + ExpandedFst<W>,
{
    let decoder = mapper.to_decoder();
    arc_map(fst, &decoder);
    rm_final_epsilon(fst);
    fst.set_input_symbols(mapper.input_symbols());
    fst.set_output_symbols(mapper.output_symbols());
}

/// On-the-fly label/weight encoding of a transducer.
///
/// Construction is O(1); traversal is O(states visited + arcs visited)
/// with per-state caching. The wrapped encoder keeps extending the
/// shared table as traversal discovers new feature vectors.
pub struct EncodeFst<W: Semiring, F: Fst<W>> {
    inner: ArcMapFst<W, F, EncodeMapper<W>>,
}

impl<W: Semiring, F: Fst<W>> EncodeFst<W, F> {
    /// Wraps `fst` in a lazy encoding view over `mapper`'s table. The
    /// mapper adopts the operand's symbol tables.
    pub fn new(fst: F, mapper: &EncodeMapper<W>) -> Self {
        mapper.set_input_symbols(fst.input_symbols().cloned());
        mapper.set_output_symbols(fst.output_symbols().cloned());
        let encoder = mapper.with_type(EncodeType::Encode);
        EncodeFst {
            inner: ArcMapFst::new(fst, encoder),
        }
    }

    /// The encoder driving this view.
    pub fn mapper(&self) -> &EncodeMapper<W> {
        self.inner.mapper()
    }
}

impl<W: Semiring, F: Fst<W>> Clone for EncodeFst<W, F> {
    fn clone(&self) -> Self {
        EncodeFst {
            inner: self.inner.clone(),
        }
    }
}

impl<W: Semiring, F: Fst<W>> Fst<W> for EncodeFst<W, F> {
    fn start(&self) -> StateId {
        self.inner.start()
    }

    fn final_weight(&self, state: StateId) -> W {
        self.inner.final_weight(state)
    }

    fn num_arcs(&self, state: StateId) -> usize {
        self.inner.num_arcs(state)
    }

    fn num_input_epsilons(&self, state: StateId) -> usize {
        self.inner.num_input_epsilons(state)
    }

    fn num_output_epsilons(&self, state: StateId) -> usize {
        self.inner.num_output_epsilons(state)
    }

    fn properties(&self, mask: u64, test: bool) -> u64 {
        self.inner.properties(mask, test)
    }

    // Encoded labels have no meaning under the operand's symbols.
    fn input_symbols(&self) -> Option<&SymbolTable> {
        None
    }

    fn output_symbols(&self) -> Option<&SymbolTable> {
        None
    }

    fn num_states_if_known(&self) -> Option<usize> {
        self.inner.num_states_if_known()
    }

    fn states(&self) -> Box<dyn StateIter + '_> {
        self.inner.states()
    }

    fn arcs(&self, state: StateId) -> Box<dyn ArcIter<W> + '_> {
        self.inner.arcs(state)
    }
}

/// On-the-fly decoding of an encoded transducer.
///
/// Construction is O(1); traversal is O(states visited + arcs visited)
/// with per-state caching. The view snapshots the mapper's symbol
/// tables at construction and exposes them as its own.
pub struct DecodeFst<W: Semiring, F: Fst<W>> {
    inner: ArcMapFst<W, F, EncodeMapper<W>>,
    isymbols: Option<Shared<SymbolTable>>,
    osymbols: Option<Shared<SymbolTable>>,
}

impl<W: Semiring, F: Fst<W>> DecodeFst<W, F> {
    /// Wraps `fst` in a lazy decoding view over `mapper`'s table.
    pub fn new(fst: F, mapper: &EncodeMapper<W>) -> Self {
        let isymbols = mapper.input_symbols().map(Shared::new);
        let osymbols = mapper.output_symbols().map(Shared::new);
        DecodeFst {
            inner: ArcMapFst::new(fst, mapper.to_decoder()),
            isymbols,
            osymbols,
        }
    }

    /// The decoder driving this view.
    pub fn mapper(&self) -> &EncodeMapper<W> {
        self.inner.mapper()
    }
}

impl<W: Semiring, F: Fst<W>> Clone for DecodeFst<W, F> {
    fn clone(&self) -> Self {
        DecodeFst {
            inner: self.inner.clone(),
            isymbols: self.isymbols.clone(),
            osymbols: self.osymbols.clone(),
        }
    }
}

impl<W: Semiring, F: Fst<W>> Fst<W> for DecodeFst<W, F> {
    fn start(&self) -> StateId {
        self.inner.start()
    }

    fn final_weight(&self, state: StateId) -> W {
        self.inner.final_weight(state)
    }

    fn num_arcs(&self, state: StateId) -> usize {
        self.inner.num_arcs(state)
    }

    fn num_input_epsilons(&self, state: StateId) -> usize {
        self.inner.num_input_epsilons(state)
    }

    fn num_output_epsilons(&self, state: StateId) -> usize {
        self.inner.num_output_epsilons(state)
    }

    fn properties(&self, mask: u64, test: bool) -> u64 {
        self.inner.properties(mask, test)
    }

    fn input_symbols(&self) -> Option<&SymbolTable> {
        self.isymbols.as_deref()
    }

    fn output_symbols(&self) -> Option<&SymbolTable> {
        self.osymbols.as_deref()
    }

    fn num_states_if_known(&self) -> Option<usize> {
        self.inner.num_states_if_known()
    }

    fn states(&self) -> Box<dyn StateIter + '_> {
        self.inner.states()
    }

    fn arcs(&self, state: StateId) -> Box<dyn ArcIter<W> + '_> {
        self.inner.arcs(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semiring::TropicalWeight;

    type W = TropicalWeight;

    #[test]
    fn test_encode_labels_only() {
        let mapper = EncodeMapper::<W>::new(ENCODE_LABELS, EncodeType::Encode);
        let w = W::new(0.5);
        let w2 = W::new(0.25);
        let a = mapper.map_arc(&Arc::new(1, 2, w, 10));
        let b = mapper.map_arc(&Arc::new(1, 2, w2, 11));
        let c = mapper.map_arc(&Arc::new(3, 4, w, 12));

        assert_eq!((a.ilabel, a.olabel), (1, 1));
        assert_eq!((b.ilabel, b.olabel), (1, 1));
        assert_eq!((c.ilabel, c.olabel), (2, 2));
        // Weights pass through untouched.
        assert_eq!(a.weight, w);
        assert_eq!(b.weight, w2);
        assert_eq!(mapper.size(), 2);
    }

    #[test]
    fn test_encode_weights_only() {
        let mapper = EncodeMapper::<W>::new(ENCODE_WEIGHTS, EncodeType::Encode);
        let a = mapper.map_arc(&Arc::new(1, 2, W::new(0.5), 10));
        let b = mapper.map_arc(&Arc::new(1, 3, W::new(0.5), 10));
        let c = mapper.map_arc(&Arc::new(1, 2, W::new(0.7), 10));

        assert_eq!(a.ilabel, 1);
        assert_eq!(b.ilabel, 1);
        assert_eq!(c.ilabel, 2);
        // Output labels survive, weights become 1.
        assert_eq!(a.olabel, 2);
        assert_eq!(b.olabel, 3);
        assert_eq!(a.weight, W::one());
        assert_eq!(c.weight, W::one());
        assert_eq!(mapper.size(), 2);
    }

    #[test]
    fn test_encode_idempotent_table() {
        let mapper = EncodeMapper::<W>::new(ENCODE_LABELS, EncodeType::Encode);
        mapper.map_arc(&Arc::new(1, 2, W::one(), 0));
        mapper.map_arc(&Arc::new(3, 4, W::one(), 0));
        let size = mapper.size();
        mapper.map_arc(&Arc::new(1, 2, W::one(), 5));
        mapper.map_arc(&Arc::new(3, 4, W::one(), 6));
        assert_eq!(mapper.size(), size);
    }

    #[test]
    fn test_decode_restores_features() {
        let mapper = EncodeMapper::<W>::new(ENCODE_LABELS | ENCODE_WEIGHTS, EncodeType::Encode);
        let encoded = mapper.map_arc(&Arc::new(7, 8, W::new(1.5), 3));
        let decoder = mapper.to_decoder();
        let decoded = decoder.map_arc(&encoded);
        assert_eq!(decoded, Arc::new(7, 8, W::new(1.5), 3));
        assert!(!decoder.error());
    }

    #[test]
    fn test_decode_mutated_labels_is_error() {
        let mapper = EncodeMapper::<W>::new(ENCODE_LABELS, EncodeType::Encode);
        let encoded = mapper.map_arc(&Arc::new(7, 8, W::one(), 3));
        let decoder = mapper.to_decoder();
        // A consumer corrupted the output label.
        let mutated = Arc::new(encoded.ilabel, encoded.olabel + 1, encoded.weight, 3);
        let decoded = decoder.map_arc(&mutated);
        assert!(decoder.error());
        assert_eq!(decoded.ilabel, NO_LABEL);
        assert_eq!(decoded.olabel, NO_LABEL);
        assert!(!decoded.weight.is_member());
    }

    #[test]
    fn test_decode_unknown_id_is_error() {
        let mapper = EncodeMapper::<W>::new(ENCODE_LABELS, EncodeType::Encode);
        let decoder = mapper.to_decoder();
        let decoded = decoder.map_arc(&Arc::new(42, 42, W::one(), 1));
        assert!(decoder.error());
        assert_eq!(decoded.ilabel, NO_LABEL);
        assert_eq!(decoded.nextstate, 1);
    }

    #[test]
    fn test_decoder_observes_table_per_call() {
        let mapper = EncodeMapper::<W>::new(ENCODE_LABELS, EncodeType::Encode);
        // Decoder constructed before encoding has happened.
        let decoder = mapper.to_decoder();
        let encoded = mapper.map_arc(&Arc::new(5, 6, W::one(), 2));
        let decoded = decoder.map_arc(&encoded);
        assert_eq!(decoded, Arc::new(5, 6, W::one(), 2));
        assert!(!decoder.error());
    }

    #[test]
    fn test_table_stream_roundtrip() {
        let mapper = EncodeMapper::<W>::new(ENCODE_LABELS | ENCODE_WEIGHTS, EncodeType::Encode);
        mapper.map_arc(&Arc::new(1, 2, W::new(0.5), 0));
        mapper.map_arc(&Arc::new(3, 4, W::new(0.75), 0));
        let mut symbols = SymbolTable::new("in");
        symbols.add_symbol("<eps>");
        mapper.set_input_symbols(Some(symbols));

        let mut buf = Vec::new();
        mapper.write(&mut buf).unwrap();

        let read = EncodeMapper::<W>::read(&mut buf.as_slice(), EncodeType::Decode).unwrap();
        assert_eq!(read.size(), 2);
        assert_eq!(read.flags(), ENCODE_LABELS | ENCODE_WEIGHTS);
        let tuple = read.decode(1).unwrap();
        assert_eq!((tuple.ilabel, tuple.olabel), (1, 2));
        assert_eq!(tuple.weight, W::new(0.5));
        assert_eq!(read.input_symbols().unwrap().name(), "in");
        assert!(read.output_symbols().is_none());
    }

    #[test]
    fn test_read_rejects_bad_magic() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&123456i32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0i64.to_le_bytes());
        assert!(matches!(
            EncodeTable::<W>::read(&mut buf.as_slice()),
            Err(FormatError::BadMagic { .. })
        ));
    }

    #[test]
    fn test_read_rejects_short_stream() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&ENCODE_MAGIC_NUMBER.to_le_bytes());
        buf.extend_from_slice(&ENCODE_LABELS.to_le_bytes());
        buf.extend_from_slice(&5i64.to_le_bytes());
        // Announces five tuples, delivers none.
        assert!(matches!(
            EncodeTable::<W>::read(&mut buf.as_slice()),
            Err(FormatError::Truncated)
        ));
    }

    #[test]
    fn test_get_label_does_not_insert() {
        let mapper = EncodeMapper::<W>::new(ENCODE_LABELS, EncodeType::Encode);
        assert_eq!(mapper.get_label(&Arc::new(1, 2, W::one(), 0)), NO_LABEL);
        assert_eq!(mapper.size(), 0);
        mapper.map_arc(&Arc::new(1, 2, W::one(), 0));
        assert_eq!(mapper.get_label(&Arc::new(1, 2, W::one(), 9)), 1);
    }

    #[test]
    fn test_superfinal_placeholder_untouched() {
        let mapper = EncodeMapper::<W>::new(ENCODE_WEIGHTS, EncodeType::Encode);
        let placeholder = Arc::new(EPSILON, EPSILON, W::zero(), NO_STATE_ID);
        assert_eq!(mapper.map_arc(&placeholder), placeholder);
        assert_eq!(mapper.size(), 0);
        // A non-zero final weight under weight encoding does encode.
        let final_arc = mapper.map_arc(&Arc::new(EPSILON, EPSILON, W::new(2.0), NO_STATE_ID));
        assert_eq!(final_arc.ilabel, 1);
        assert_eq!(final_arc.weight, W::one());
    }
}
