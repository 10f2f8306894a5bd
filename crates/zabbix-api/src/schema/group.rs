// Host groups (`hostgroup.get`)

use serde_json::Value;

use crate::error::Error;
use crate::schema::{Record, elements, extract};
use crate::table::{Column, Table, columns};

columns! {
    /// Columns of the group table.
    GroupColumn ("group") {
        GroupId = "groupid": U64,
        Name = "name": Text,
    }
}

pub fn parse(result: &Value) -> Result<Table<GroupColumn>, Error> {
    let elements = elements(GroupColumn::ENTITY, result)?;
    let mut table = Table::with_capacity(elements.len());
    for element in elements {
        let record = Record::new(GroupColumn::ENTITY, element)?;
        table.push(extract(&record, GroupColumn::ALL)?)?;
    }
    Ok(table)
}
