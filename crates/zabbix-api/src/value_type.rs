// Item value types
//
// `ValueType` is the wire-level code carried by items (`value_type`) and
// passed to `history.get` (`history`). `ItemValueType` is the
// storage-facing classification handed to downstream consumers. The two
// map onto each other one-to-one; `Unknown` only ever maps to `Unknown`.

use strum::{Display, EnumIter};

/// Wire-level value type of an item or history sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ValueType {
    Unknown,
    Float,
    String,
    Log,
    Integer,
    Text,
}

impl ValueType {
    /// The numeric code used on the wire, `None` for [`Unknown`](Self::Unknown).
    pub fn code(self) -> Option<i64> {
        match self {
            Self::Float => Some(0),
            Self::String => Some(1),
            Self::Log => Some(2),
            Self::Integer => Some(3),
            Self::Text => Some(4),
            Self::Unknown => None,
        }
    }

    /// Decode a wire code; anything outside `0..=4` is `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Float,
            1 => Self::String,
            2 => Self::Log,
            3 => Self::Integer,
            4 => Self::Text,
            _ => Self::Unknown,
        }
    }
}

/// Value classification used by the consumers of the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ItemValueType {
    Unknown,
    Float,
    Integer,
    String,
    Log,
    Text,
}

impl From<ValueType> for ItemValueType {
    fn from(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Float => Self::Float,
            ValueType::String => Self::String,
            ValueType::Log => Self::Log,
            ValueType::Integer => Self::Integer,
            ValueType::Text => Self::Text,
            ValueType::Unknown => Self::Unknown,
        }
    }
}

impl From<ItemValueType> for ValueType {
    fn from(value_type: ItemValueType) -> Self {
        match value_type {
            ItemValueType::Float => Self::Float,
            ItemValueType::Integer => Self::Integer,
            ItemValueType::String => Self::String,
            ItemValueType::Log => Self::Log,
            ItemValueType::Text => Self::Text,
            ItemValueType::Unknown => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn mapping_round_trips_in_both_directions() {
        for vt in ValueType::iter() {
            assert_eq!(ValueType::from(ItemValueType::from(vt)), vt);
        }
        for ivt in ItemValueType::iter() {
            assert_eq!(ItemValueType::from(ValueType::from(ivt)), ivt);
        }
    }

    #[test]
    fn mapping_is_a_bijection() {
        let images: HashSet<ItemValueType> = ValueType::iter().map(ItemValueType::from).collect();
        assert_eq!(images.len(), ItemValueType::iter().count());
    }

    #[test]
    fn unknown_only_maps_to_unknown() {
        for vt in ValueType::iter().filter(|v| *v != ValueType::Unknown) {
            assert_ne!(ItemValueType::from(vt), ItemValueType::Unknown);
        }
        for ivt in ItemValueType::iter().filter(|v| *v != ItemValueType::Unknown) {
            assert_ne!(ValueType::from(ivt), ValueType::Unknown);
        }
        assert_eq!(ItemValueType::from(ValueType::Unknown), ItemValueType::Unknown);
    }

    #[test]
    fn wire_codes() {
        for vt in ValueType::iter() {
            match vt.code() {
                Some(code) => assert_eq!(ValueType::from_code(code), vt),
                None => assert_eq!(vt, ValueType::Unknown),
            }
        }
        assert_eq!(ValueType::from_code(-1), ValueType::Unknown);
        assert_eq!(ValueType::from_code(5), ValueType::Unknown);
        assert_eq!(ValueType::Integer.to_string(), "integer");
    }
}
