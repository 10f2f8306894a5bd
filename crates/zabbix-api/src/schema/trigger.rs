// Triggers (`trigger.get`)
//
// Requested with `selectHosts: refer` and `selectFunctions: extend`, so
// each element carries a `hosts` reference array and the full function
// definitions. The function table itself is built from the same response
// in `schema::function`.

use serde_json::Value;

use crate::error::Error;
use crate::schema::{Record, elements, extract, join_ids};
use crate::table::{Column, Table, columns};

columns! {
    /// Columns of the trigger table.
    TriggerColumn ("trigger") {
        TriggerId = "triggerid": U64,
        /// First host the trigger belongs to (`hosts[0].hostid`).
        HostId = "hostid": U64,
        Status = "status": Int,
        /// 0 = OK, 1 = problem.
        Value = "value": Int,
        /// Severity, 0 (not classified) to 5 (disaster).
        Priority = "priority": Int,
        LastChange = "lastchange": Int,
        Expression = "expression": Text,
        Description = "description": Text,
        /// Comma-joined `functionid`s referenced by the expression.
        FunctionIds = "functions": Text,
    }
}

const DIRECT: &[TriggerColumn] = &[
    TriggerColumn::TriggerId,
    TriggerColumn::Status,
    TriggerColumn::Value,
    TriggerColumn::Priority,
    TriggerColumn::LastChange,
    TriggerColumn::Expression,
    TriggerColumn::Description,
];

/// Parse a `trigger.get` result.
pub fn parse(result: &Value) -> Result<Table<TriggerColumn>, Error> {
    let elements = elements(TriggerColumn::ENTITY, result)?;
    let mut table = Table::with_capacity(elements.len());

    for element in elements {
        let record = Record::new(TriggerColumn::ENTITY, element)?;
        let mut row = extract(&record, DIRECT)?;

        let host_id = record
            .nested_ids("hosts", "hostid")?
            .first()
            .copied()
            .ok_or_else(|| {
                Error::schema(TriggerColumn::ENTITY, "hosts", "trigger references no host")
            })?;
        row.insert(TriggerColumn::HostId, host_id);

        let function_ids = record.nested_ids("functions", "functionid")?;
        row.insert(TriggerColumn::FunctionIds, join_ids(&function_ids));

        table.push(row)?;
    }

    Ok(table)
}
