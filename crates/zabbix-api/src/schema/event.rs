// Events (`event.get`)
//
// Two query shapes: an id range (`eventid_from` / `eventid_till`), and a
// single id sorted ascending or descending to find the first or last
// event the server knows about.

use serde_json::Value;

use crate::error::Error;
use crate::schema::{Record, elements, extract};
use crate::table::{Column, Table, columns};

/// Upper bound meaning "no upper bound" in event id ranges.
pub const UNLIMITED: u64 = u64::MAX;

/// Returned by the end-event-id query when the server has no events.
/// Zabbix event ids start at 1.
pub const EVENT_ID_NOT_FOUND: u64 = 0;

columns! {
    /// Columns of the event table.
    EventColumn ("event") {
        EventId = "eventid": U64,
        /// 0 = trigger event.
        Source = "source": Int,
        /// 0 = trigger.
        Object = "object": Int,
        /// Id of the related object, the trigger id for trigger events.
        ObjectId = "objectid": U64,
        Clock = "clock": Int,
        Ns = "ns": Int,
        Value = "value": Int,
        Acknowledged = "acknowledged": Int,
    }
}

pub fn parse(result: &Value) -> Result<Table<EventColumn>, Error> {
    let elements = elements(EventColumn::ENTITY, result)?;
    let mut table = Table::with_capacity(elements.len());
    for element in elements {
        let record = Record::new(EventColumn::ENTITY, element)?;
        table.push(extract(&record, EventColumn::ALL)?)?;
    }
    Ok(table)
}

/// Id of the single event in an end-event-id result, or
/// [`EVENT_ID_NOT_FOUND`] if the array is empty.
pub fn parse_end_event_id(result: &Value) -> Result<u64, Error> {
    match elements(EventColumn::ENTITY, result)?.first() {
        Some(element) => {
            Record::new(EventColumn::ENTITY, element)?.u64(EventColumn::EventId.name())
        }
        None => Ok(EVENT_ID_NOT_FOUND),
    }
}
