// Entity schemas
//
// One module per entity: its column enum plus the parser turning a raw
// JSON-RPC `result` into a `Table`. Zabbix serializes ids, timestamps and
// enum codes as decimal strings; JSON numbers are accepted as well.

pub mod application;
pub mod event;
pub mod function;
pub mod group;
pub mod history;
pub mod host;
pub mod item;
pub mod trigger;

use serde_json::{Map, Value};

use crate::error::Error;
use crate::table::{Cell, CellKind, Column, Row};

/// The elements of an array-shaped `result`.
pub(crate) fn elements<'a>(
    entity: &'static str,
    result: &'a Value,
) -> Result<&'a [Value], Error> {
    result.as_array().map(Vec::as_slice).ok_or_else(|| {
        Error::schema(
            entity,
            "result",
            format!("expected an array, got {}", kind_of(result)),
        )
    })
}

/// One JSON object of a response, with typed field access.
pub(crate) struct Record<'a> {
    entity: &'static str,
    fields: &'a Map<String, Value>,
}

impl<'a> Record<'a> {
    pub(crate) fn new(entity: &'static str, value: &'a Value) -> Result<Self, Error> {
        let fields = value.as_object().ok_or_else(|| {
            Error::schema(
                entity,
                "result[]",
                format!("expected an object, got {}", kind_of(value)),
            )
        })?;
        Ok(Self { entity, fields })
    }

    pub(crate) fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    fn field(&self, name: &str) -> Result<&'a Value, Error> {
        self.fields
            .get(name)
            .ok_or_else(|| Error::schema(self.entity, name, "field missing"))
    }

    fn invalid(&self, name: &str, expected: &str, got: &Value) -> Error {
        Error::schema(self.entity, name, format!("expected {expected}, got {got}"))
    }

    pub(crate) fn u64(&self, name: &str) -> Result<u64, Error> {
        let value = self.field(name)?;
        let parsed = match value {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_u64(),
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid(name, "an unsigned integer", value))
    }

    pub(crate) fn int(&self, name: &str) -> Result<i64, Error> {
        let value = self.field(name)?;
        let parsed = match value {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid(name, "an integer", value))
    }

    pub(crate) fn float(&self, name: &str) -> Result<f64, Error> {
        let value = self.field(name)?;
        let parsed = match value {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        };
        parsed.ok_or_else(|| self.invalid(name, "a number", value))
    }

    pub(crate) fn text(&self, name: &str) -> Result<String, Error> {
        let value = self.field(name)?;
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(self.invalid(name, "a string", value)),
        }
    }

    pub(crate) fn array(&self, name: &str) -> Result<&'a [Value], Error> {
        let value = self.field(name)?;
        value
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| self.invalid(name, "an array", value))
    }

    /// Read `name` as a cell of the given kind.
    pub(crate) fn cell(&self, name: &str, kind: CellKind) -> Result<Cell, Error> {
        Ok(match kind {
            CellKind::Int => Cell::Int(self.int(name)?),
            CellKind::U64 => Cell::U64(self.u64(name)?),
            CellKind::Float => Cell::Float(self.float(name)?),
            CellKind::Text => Cell::Text(self.text(name)?),
        })
    }

    /// Ids of the objects in the array field `name`, each read from `id_field`.
    pub(crate) fn nested_ids(&self, name: &str, id_field: &str) -> Result<Vec<u64>, Error> {
        self.array(name)?
            .iter()
            .map(|nested| Record::new(self.entity, nested)?.u64(id_field))
            .collect()
    }
}

/// Build a row from the columns that map one-to-one onto object fields.
pub(crate) fn extract<C: Column>(record: &Record<'_>, columns: &[C]) -> Result<Row<C>, Error> {
    let mut row = Row::new();
    for &column in columns {
        row.insert(column, record.cell(column.name(), column.kind())?);
    }
    Ok(row)
}

/// Comma-join ids for storage in a text column.
pub(crate) fn join_ids(ids: &[u64]) -> String {
    ids.iter().map(u64::to_string).collect::<Vec<_>>().join(",")
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
