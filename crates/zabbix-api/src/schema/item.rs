// Items (`item.get`)
//
// Requested with `selectApplications: refer`; only the first referenced
// application is kept, 0 when the item belongs to none.

use serde_json::Value;

use crate::error::Error;
use crate::schema::{Record, elements, extract};
use crate::table::{Column, Row, Table, columns};
use crate::value_type::ValueType;

columns! {
    /// Columns of the item table.
    ItemColumn ("item") {
        ItemId = "itemid": U64,
        HostId = "hostid": U64,
        Key = "key_": Text,
        Name = "name": Text,
        /// Wire code, see [`ValueType::from_code`].
        ValueType = "value_type": Int,
        LastClock = "lastclock": Int,
        LastNs = "lastns": Int,
        LastValue = "lastvalue": Text,
        PrevValue = "prevvalue": Text,
        Units = "units": Text,
        /// First application of the item, 0 for none.
        ApplicationId = "applications": U64,
    }
}

/// Sentinel stored in [`ItemColumn::ApplicationId`] for items without one.
pub const NO_APPLICATION: u64 = 0;

const DIRECT: &[ItemColumn] = &[
    ItemColumn::ItemId,
    ItemColumn::HostId,
    ItemColumn::Key,
    ItemColumn::Name,
    ItemColumn::ValueType,
    ItemColumn::LastClock,
    ItemColumn::LastNs,
    ItemColumn::LastValue,
    ItemColumn::PrevValue,
    ItemColumn::Units,
];

/// Parse an `item.get` result.
pub fn parse(result: &Value) -> Result<Table<ItemColumn>, Error> {
    let elements = elements(ItemColumn::ENTITY, result)?;
    let mut table = Table::with_capacity(elements.len());

    for element in elements {
        let record = Record::new(ItemColumn::ENTITY, element)?;
        // Servers from 5.4 on have no applications at all.
        let application_id = if record.has("applications") {
            record
                .nested_ids("applications", "applicationid")?
                .first()
                .copied()
                .unwrap_or(NO_APPLICATION)
        } else {
            NO_APPLICATION
        };
        let row = extract(&record, DIRECT)?.with(ItemColumn::ApplicationId, application_id);
        table.push(row)?;
    }

    Ok(table)
}

/// Value type of an item row, `Unknown` if the code is not recognised.
pub fn value_type_of(row: &Row<ItemColumn>) -> ValueType {
    row.int(ItemColumn::ValueType)
        .map_or(ValueType::Unknown, ValueType::from_code)
}
