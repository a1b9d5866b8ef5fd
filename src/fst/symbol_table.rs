//! Label ↔ symbol mapping attached to transducer tapes.
//!
//! Symbol tables are opaque to every algorithm in this crate: they are
//! copied, attached, detached and serialized, never interpreted.

use super::arc::{Label, NO_LABEL};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::FormatError;

/// A bidirectional mapping between labels and symbol strings.
///
/// Labels are dense and assigned in insertion order starting at 0,
/// which by convention names epsilon.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    name: String,
    symbols: Vec<String>,
    by_symbol: FxHashMap<String, Label>,
}

impl SymbolTable {
    /// Creates an empty symbol table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        SymbolTable {
            name: name.into(),
            symbols: Vec::new(),
            by_symbol: FxHashMap::default(),
        }
    }

    /// The table's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a symbol, returning its label. Re-adding an existing
    /// symbol returns the label it already has.
    pub fn add_symbol(&mut self, symbol: impl Into<String>) -> Label {
        let symbol = symbol.into();
        if let Some(&label) = self.by_symbol.get(&symbol) {
            return label;
        }
        let label = self.symbols.len() as Label;
        self.symbols.push(symbol.clone());
        self.by_symbol.insert(symbol, label);
        label
    }

    /// The symbol for `label`, if present.
    pub fn find(&self, label: Label) -> Option<&str> {
        if label < 0 {
            return None;
        }
        self.symbols.get(label as usize).map(String::as_str)
    }

    /// The label for `symbol`, or [`NO_LABEL`].
    pub fn find_symbol(&self, symbol: &str) -> Label {
        self.by_symbol.get(symbol).copied().unwrap_or(NO_LABEL)
    }

    /// Number of symbols in the table.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the table has no symbols.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Serializes the table onto `writer`.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), FormatError> {
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    /// Deserializes a table from `reader`.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        Ok(bincode::deserialize_from(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_find() {
        let mut table = SymbolTable::new("letters");
        let eps = table.add_symbol("<eps>");
        let a = table.add_symbol("a");
        assert_eq!(eps, 0);
        assert_eq!(a, 1);
        assert_eq!(table.find(a), Some("a"));
        assert_eq!(table.find_symbol("a"), a);
        assert_eq!(table.find_symbol("b"), NO_LABEL);
        assert_eq!(table.add_symbol("a"), a);
    }

    #[test]
    fn test_stream_roundtrip() {
        let mut table = SymbolTable::new("t");
        table.add_symbol("<eps>");
        table.add_symbol("x");
        let mut buf = Vec::new();
        table.write(&mut buf).unwrap();
        let read = SymbolTable::read(&mut buf.as_slice()).unwrap();
        assert_eq!(table, read);
    }
}
