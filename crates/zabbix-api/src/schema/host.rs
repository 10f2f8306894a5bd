// Hosts and host-group membership (`host.get`)
//
// One response, two tables: the hosts themselves, and one membership row
// per (host, group) pair flattened from each host's `groups` array.

use serde_json::Value;

use crate::error::Error;
use crate::schema::{Record, elements, extract};
use crate::table::{Column, Row, Table, columns};

columns! {
    /// Columns of the host table.
    HostColumn ("host") {
        HostId = "hostid": U64,
        Name = "name": Text,
        /// 0 = monitored, 1 = not monitored.
        Status = "status": Int,
    }
}

columns! {
    /// Columns of the host-group membership table.
    HostGroupColumn ("host_group") {
        HostId = "hostid": U64,
        GroupId = "groupid": U64,
    }
}

/// Both tables produced by a host query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostTables {
    pub hosts: Table<HostColumn>,
    pub host_groups: Table<HostGroupColumn>,
}

/// Parse a `host.get` result requested with `selectGroups: refer`.
pub fn parse(result: &Value) -> Result<HostTables, Error> {
    let mut tables = HostTables::default();

    for element in elements(HostColumn::ENTITY, result)? {
        let record = Record::new(HostColumn::ENTITY, element)?;
        let row = extract(&record, HostColumn::ALL)?;
        let host_id = record.u64(HostColumn::HostId.name())?;

        for group_id in record.nested_ids("groups", HostGroupColumn::GroupId.name())? {
            let membership = Row::new()
                .with(HostGroupColumn::HostId, host_id)
                .with(HostGroupColumn::GroupId, group_id);
            tables.host_groups.push(membership)?;
        }
        tables.hosts.push(row)?;
    }

    Ok(tables)
}
