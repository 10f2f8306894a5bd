// ── Generic tabular row model ──
//
// Every query result is a `Table<C>` of `Row<C>`, where `C` is the
// entity's column enum. Rows keep insertion order and may repeat; a row
// only enters a table once every mandatory column of its schema is set.

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::error::Error;

/// Storage type of a column's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Int,
    U64,
    Float,
    Text,
}

/// Column identifier of one entity schema.
///
/// Implemented by the per-entity enums generated with `columns!`.
pub trait Column: Copy + Eq + Hash + fmt::Debug + 'static {
    /// Entity name used in schema errors.
    const ENTITY: &'static str;

    /// Every column of the schema, in declaration order.
    const ALL: &'static [Self];

    /// Wire field the column is read from.
    fn name(self) -> &'static str;

    /// Declared storage type. History values vary with the requested
    /// value type; see [`value_kind`](crate::schema::history::value_kind).
    fn kind(self) -> CellKind;

    /// Whether every row must carry this column.
    fn is_mandatory(self) -> bool;
}

/// Declares an entity column enum and its [`Column`] impl.
///
/// ```ignore
/// columns! {
///     /// Columns of the group table.
///     GroupColumn ("group") {
///         GroupId = "groupid": U64,
///         Name = "name": Text,
///         Extra = "extra": Int [optional],
///     }
/// }
/// ```
macro_rules! columns {
    (
        $(#[$meta:meta])*
        $name:ident ($entity:literal) {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $field:literal : $kind:ident $([$flag:ident])?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )*
        }

        impl $crate::table::Column for $name {
            const ENTITY: &'static str = $entity;
            const ALL: &'static [Self] = &[$(Self::$variant),*];

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $field,)*
                }
            }

            #[allow(clippy::match_same_arms)]
            fn kind(self) -> $crate::table::CellKind {
                match self {
                    $(Self::$variant => $crate::table::CellKind::$kind,)*
                }
            }

            #[allow(clippy::match_same_arms)]
            fn is_mandatory(self) -> bool {
                match self {
                    $(Self::$variant => $crate::table::columns!(@mandatory $($flag)?),)*
                }
            }
        }
    };
    (@mandatory) => {
        true
    };
    (@mandatory optional) => {
        false
    };
}

pub(crate) use columns;

// ── Cell ────────────────────────────────────────────────────────────

/// A typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    U64(u64),
    Float(f64),
    Text(String),
}

impl Cell {
    pub fn kind(&self) -> CellKind {
        match self {
            Self::Int(_) => CellKind::Int,
            Self::U64(_) => CellKind::U64,
            Self::Float(_) => CellKind::Float,
            Self::Text(_) => CellKind::Text,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Cell {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

// ── Row ─────────────────────────────────────────────────────────────

/// One record: column id -> cell, in the order columns were set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row<C: Column> {
    cells: IndexMap<C, Cell>,
}

impl<C: Column> Default for Row<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Column> Row<C> {
    pub fn new() -> Self {
        Self {
            cells: IndexMap::with_capacity(C::ALL.len()),
        }
    }

    /// Set a cell, returning the previous value if the column was set.
    pub fn insert(&mut self, column: C, cell: impl Into<Cell>) -> Option<Cell> {
        self.cells.insert(column, cell.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, column: C, cell: impl Into<Cell>) -> Self {
        self.insert(column, cell);
        self
    }

    pub fn get(&self, column: C) -> Option<&Cell> {
        self.cells.get(&column)
    }

    pub fn contains(&self, column: C) -> bool {
        self.cells.contains_key(&column)
    }

    pub fn int(&self, column: C) -> Option<i64> {
        self.get(column).and_then(Cell::as_int)
    }

    pub fn u64(&self, column: C) -> Option<u64> {
        self.get(column).and_then(Cell::as_u64)
    }

    pub fn float(&self, column: C) -> Option<f64> {
        self.get(column).and_then(Cell::as_float)
    }

    pub fn text(&self, column: C) -> Option<&str> {
        self.get(column).and_then(Cell::as_text)
    }

    /// Split a comma-joined id list stored in a text column.
    pub fn ids(&self, column: C) -> Result<Vec<u64>, Error> {
        let raw = self.text(column).ok_or_else(|| {
            Error::schema(C::ENTITY, column.name(), "expected a text id list")
        })?;
        raw.split(',')
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse().map_err(|_| {
                    Error::schema(C::ENTITY, column.name(), format!("invalid id {part:?}"))
                })
            })
            .collect()
    }

    /// First mandatory column this row does not set, if any.
    pub fn missing_mandatory(&self) -> Option<C> {
        C::ALL
            .iter()
            .copied()
            .find(|c| c.is_mandatory() && !self.cells.contains_key(c))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (C, &Cell)> {
        self.cells.iter().map(|(c, cell)| (*c, cell))
    }
}

// ── Table ───────────────────────────────────────────────────────────

/// Ordered rows of one entity schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<C: Column> {
    rows: Vec<Row<C>>,
}

impl<C: Column> Default for Table<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Column> Table<C> {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Append a row, rejecting it if a mandatory column is unset.
    pub fn push(&mut self, row: Row<C>) -> Result<(), Error> {
        if let Some(column) = row.missing_mandatory() {
            return Err(Error::schema(
                C::ENTITY,
                column.name(),
                "mandatory column missing",
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn rows(&self) -> &[Row<C>] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Row<C>> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row<C>> {
        self.rows.iter()
    }

    /// Every cell of one column, in row order.
    pub fn column(&self, column: C) -> impl Iterator<Item = &Cell> {
        self.rows.iter().filter_map(move |row| row.get(column))
    }

    pub fn into_rows(self) -> Vec<Row<C>> {
        self.rows
    }
}

impl<C: Column> IntoIterator for Table<C> {
    type Item = Row<C>;
    type IntoIter = std::vec::IntoIter<Row<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a, C: Column> IntoIterator for &'a Table<C> {
    type Item = &'a Row<C>;
    type IntoIter = std::slice::Iter<'a, Row<C>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
