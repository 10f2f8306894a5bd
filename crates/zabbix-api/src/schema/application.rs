// Applications (`application.get`)
//
// Requested either by explicit id list or by the application ids an item
// table references. Either way the id list is deduplicated before it is
// sent.

use indexmap::IndexSet;
use serde_json::Value;

use crate::error::Error;
use crate::schema::item::{ItemColumn, NO_APPLICATION};
use crate::schema::{Record, elements, extract};
use crate::table::{Column, Table, columns};

columns! {
    /// Columns of the application table.
    ApplicationColumn ("application") {
        ApplicationId = "applicationid": U64,
        HostId = "hostid": U64,
        Name = "name": Text,
    }
}

/// Distinct ids in first-seen order.
pub fn distinct_ids(ids: &[u64]) -> Vec<u64> {
    ids.iter().copied().collect::<IndexSet<_>>().into_iter().collect()
}

/// Distinct application ids referenced by `items`, in first-seen order.
/// Items without an application are skipped.
pub fn application_ids(items: &Table<ItemColumn>) -> Vec<u64> {
    items
        .iter()
        .filter_map(|row| row.u64(ItemColumn::ApplicationId))
        .filter(|id| *id != NO_APPLICATION)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

pub fn parse(result: &Value) -> Result<Table<ApplicationColumn>, Error> {
    let elements = elements(ApplicationColumn::ENTITY, result)?;
    let mut table = Table::with_capacity(elements.len());
    for element in elements {
        let record = Record::new(ApplicationColumn::ENTITY, element)?;
        table.push(extract(&record, ApplicationColumn::ALL)?)?;
    }
    Ok(table)
}
