// History samples (`history.get`)
//
// The column set is the same for every value type; what changes is the
// storage of `Value`: Float for float items, U64 for integer items and
// Text for string, log and text items. Log samples additionally carry
// the event-log metadata columns.

use serde_json::Value;

use crate::error::Error;
use crate::schema::{Record, elements, extract};
use crate::table::{CellKind, Column, Table, columns};
use crate::value_type::ValueType;

columns! {
    /// Columns of the history table.
    HistoryColumn ("history") {
        ItemId = "itemid": U64,
        Clock = "clock": Int,
        Ns = "ns": Int,
        /// Decoded according to the requested [`ValueType`]; `kind()` is
        /// only nominal here, see [`value_kind`].
        Value = "value": Text,
        LogTimestamp = "timestamp": Int [optional],
        LogSource = "source": Text [optional],
        LogSeverity = "severity": Int [optional],
        LogEventId = "logeventid": Int [optional],
    }
}

const DIRECT: &[HistoryColumn] = &[HistoryColumn::ItemId, HistoryColumn::Clock, HistoryColumn::Ns];

const LOG: &[HistoryColumn] = &[
    HistoryColumn::LogTimestamp,
    HistoryColumn::LogSource,
    HistoryColumn::LogSeverity,
    HistoryColumn::LogEventId,
];

/// Storage type of [`HistoryColumn::Value`] in samples of `value_type`.
pub fn value_kind(value_type: ValueType) -> CellKind {
    match value_type {
        ValueType::Float => CellKind::Float,
        ValueType::Integer => CellKind::U64,
        _ => CellKind::Text,
    }
}

/// Parse a `history.get` result requested for `value_type`.
pub fn parse(result: &Value, value_type: ValueType) -> Result<Table<HistoryColumn>, Error> {
    if value_type == ValueType::Unknown {
        return Err(Error::InvalidArgument(
            "history cannot be decoded for an unknown value type".into(),
        ));
    }

    let elements = elements(HistoryColumn::ENTITY, result)?;
    let mut table = Table::with_capacity(elements.len());

    for element in elements {
        let record = Record::new(HistoryColumn::ENTITY, element)?;
        let mut row = extract(&record, DIRECT)?;

        let value = record.cell(HistoryColumn::Value.name(), value_kind(value_type))?;
        row.insert(HistoryColumn::Value, value);

        if value_type == ValueType::Log {
            for (column, cell) in extract(&record, LOG)?.iter() {
                row.insert(column, cell.clone());
            }
        }

        table.push(row)?;
    }

    Ok(table)
}
