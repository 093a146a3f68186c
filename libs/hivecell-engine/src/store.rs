use std::collections::{BTreeMap, HashMap};
use std::fmt;

use parking_lot::RwLock;

use crate::error::EngineError;

// ═══════════════════════════════════════════════════════════════
//  Cells & mutations
// ═══════════════════════════════════════════════════════════════

/// Storage address of a column: family plus qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnRef {
    pub family: String,
    pub qualifier: String,
}

impl ColumnRef {
    pub fn new(family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.qualifier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub column: ColumnRef,
    pub value: Vec<u8>,
}

/// Puts and deletes against one row, applied together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowMutation {
    pub row_key: Vec<u8>,
    pub puts: Vec<Cell>,
    pub deletes: Vec<ColumnRef>,
}

impl RowMutation {
    pub fn new(row_key: Vec<u8>) -> Self {
        Self {
            row_key,
            ..Default::default()
        }
    }

    pub fn put(&mut self, column: ColumnRef, value: Vec<u8>) {
        self.puts.push(Cell { column, value });
    }

    pub fn delete(&mut self, column: ColumnRef) {
        self.deletes.push(column);
    }

    pub fn is_empty(&self) -> bool {
        self.puts.is_empty() && self.deletes.is_empty()
    }
}

/// Latest cell values of one row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowCells {
    cells: BTreeMap<ColumnRef, Vec<u8>>,
}

impl RowCells {
    pub fn get(&self, column: &ColumnRef) -> Option<&[u8]> {
        self.cells.get(column).map(Vec::as_slice)
    }

    /// True if the row holds no cell in `family`.
    pub fn family_is_empty(&self, family: &str) -> bool {
        !self.cells.keys().any(|c| c.family == family)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ColumnRef, &[u8])> {
        self.cells.iter().map(|(c, v)| (c, v.as_slice()))
    }
}

impl FromIterator<(ColumnRef, Vec<u8>)> for RowCells {
    fn from_iter<I: IntoIterator<Item = (ColumnRef, Vec<u8>)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  CellStore
// ═══════════════════════════════════════════════════════════════

/// Column-family store holding encoded rows.
///
/// The engine only needs point reads and single-row mutations; a store is
/// free to back these with anything.
pub trait CellStore: Send + Sync {
    /// All cells of a row, `None` if the row does not exist.
    fn get_row(&self, table: &str, row_key: &[u8]) -> Result<Option<RowCells>, EngineError>;

    /// Apply a mutation atomically: puts first, then deletes.
    fn apply(&self, table: &str, mutation: RowMutation) -> Result<(), EngineError>;
}

// ═══════════════════════════════════════════════════════════════
//  MemoryCellStore
// ═══════════════════════════════════════════════════════════════

type Rows = BTreeMap<Vec<u8>, RowCells>;

/// In-memory cell store. Tables appear on first write.
#[derive(Default)]
pub struct MemoryCellStore {
    tables: RwLock<HashMap<String, Rows>>,
}

impl MemoryCellStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, BTreeMap::len)
    }
}

impl CellStore for MemoryCellStore {
    fn get_row(&self, table: &str, row_key: &[u8]) -> Result<Option<RowCells>, EngineError> {
        let tables = self.tables.read();
        Ok(tables.get(table).and_then(|rows| rows.get(row_key)).cloned())
    }

    fn apply(&self, table: &str, mutation: RowMutation) -> Result<(), EngineError> {
        if mutation.row_key.is_empty() {
            return Err(EngineError::Store(format!("{table}: empty row key")));
        }

        let mut tables = self.tables.write();
        let rows = tables.entry(table.to_string()).or_default();
        let row = rows.entry(mutation.row_key.clone()).or_default();

        for cell in mutation.puts {
            row.cells.insert(cell.column, cell.value);
        }
        for column in &mutation.deletes {
            row.cells.remove(column);
        }

        if row.is_empty() {
            rows.remove(&mutation.row_key);
        }
        Ok(())
    }
}
