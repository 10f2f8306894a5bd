// Trigger functions
//
// Zabbix embeds function definitions in the `trigger.get` response
// (`selectFunctions: extend`); there is no separate query for them.

use serde_json::Value;

use crate::error::Error;
use crate::schema::trigger::TriggerColumn;
use crate::schema::{Record, elements, extract};
use crate::table::{Column, Table, columns};

columns! {
    /// Columns of the function table.
    FunctionColumn ("function") {
        FunctionId = "functionid": U64,
        /// Owning trigger, taken from the enclosing trigger object.
        TriggerId = "triggerid": U64,
        ItemId = "itemid": U64,
        Function = "function": Text,
        Parameter = "parameter": Text,
    }
}

const DIRECT: &[FunctionColumn] = &[
    FunctionColumn::FunctionId,
    FunctionColumn::ItemId,
    FunctionColumn::Function,
    FunctionColumn::Parameter,
];

/// Parse the functions out of a raw `trigger.get` result.
pub fn parse(trigger_result: &Value) -> Result<Table<FunctionColumn>, Error> {
    let mut table = Table::new();

    for trigger in elements(TriggerColumn::ENTITY, trigger_result)? {
        let trigger = Record::new(TriggerColumn::ENTITY, trigger)?;
        let trigger_id = trigger.u64(TriggerColumn::TriggerId.name())?;

        for function in trigger.array("functions")? {
            let record = Record::new(FunctionColumn::ENTITY, function)?;
            let row = extract(&record, DIRECT)?.with(FunctionColumn::TriggerId, trigger_id);
            table.push(row)?;
        }
    }

    Ok(table)
}
