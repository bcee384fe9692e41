//! Decoding the type-schema block of a snapshot.
//!
//! The schema travels as a generic nested map (see [`crate::wire`]).
//! Three keys are reserved; anything else in the map is ignored so
//! newer exporters can add keys without breaking older importers.

use std::fmt;
use std::str::FromStr;

use crate::error::ImportError;
use crate::wire::WireValue;

/// Reserved schema map keys.
pub const KEY_ID_PROPERTY: &str = "idProperty";
pub const KEY_ROUTING_PROPERTY: &str = "routingProperty";
pub const KEY_INDEXES: &str = "indexes";

/// The kinds of secondary index the grid supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Equal,
    Ordered,
    Extended,
}

impl FromStr for IndexKind {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EQUAL" => Ok(Self::Equal),
            "ORDERED" => Ok(Self::Ordered),
            "EXTENDED" => Ok(Self::Extended),
            other => Err(ImportError::UnknownIndexKind(other.to_string())),
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Equal => "EQUAL",
            Self::Ordered => "ORDERED",
            Self::Extended => "EXTENDED",
        };
        f.write_str(name)
    }
}

/// An index over one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub property: String,
    pub kind: IndexKind,
}

/// The decoded schema for a type: identity property, routing property,
/// and secondary indexes in the order the stream listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDescriptor {
    pub id_property: Option<String>,
    pub routing_property: Option<String>,
    pub indexes: Vec<IndexSpec>,
}

/// A schema plus the index entries that could not be decoded. Skipped
/// entries are surfaced explicitly so callers (and tests) can assert
/// on them rather than fishing through log output.
#[derive(Debug, Clone, Default)]
pub struct DecodedSchema {
    pub descriptor: SchemaDescriptor,
    pub skipped: Vec<SkippedIndex>,
}

/// One index entry dropped during decode, with the kind string that
/// failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedIndex {
    pub property: String,
    pub kind: String,
}

/// Decode the schema map.
///
/// The id and routing keys are looked up directly; absence of either
/// is valid. The index group is a map from index-kind name to a list
/// of property names, walked kind-then-name in source order. An index
/// entry whose kind string is unrecognized is dropped into `skipped`
/// and does not abort the decode.
pub fn decode_schema(value: &WireValue) -> DecodedSchema {
    let mut decoded = DecodedSchema::default();

    if let Some(id) = value.get(KEY_ID_PROPERTY).and_then(WireValue::as_str) {
        decoded.descriptor.id_property = Some(id.to_string());
    }
    if let Some(routing) = value.get(KEY_ROUTING_PROPERTY).and_then(WireValue::as_str) {
        decoded.descriptor.routing_property = Some(routing.to_string());
    }

    let Some(WireValue::Map(groups)) = value.get(KEY_INDEXES) else {
        return decoded;
    };
    for (kind_name, properties) in groups {
        let WireValue::List(properties) = properties else {
            continue;
        };
        match kind_name.parse::<IndexKind>() {
            Ok(kind) => {
                for property in properties.iter().filter_map(WireValue::as_str) {
                    decoded.descriptor.indexes.push(IndexSpec {
                        property: property.to_string(),
                        kind,
                    });
                }
            }
            Err(_) => {
                for property in properties.iter().filter_map(WireValue::as_str) {
                    decoded.skipped.push(SkippedIndex {
                        property: property.to_string(),
                        kind: kind_name.clone(),
                    });
                }
            }
        }
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_map(pairs: Vec<(&str, WireValue)>) -> WireValue {
        WireValue::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    fn index_group(groups: Vec<(&str, Vec<&str>)>) -> WireValue {
        WireValue::Map(
            groups
                .into_iter()
                .map(|(kind, props)| {
                    (
                        kind.to_string(),
                        WireValue::List(
                            props
                                .into_iter()
                                .map(|p| WireValue::String(p.to_string()))
                                .collect(),
                        ),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn decodes_id_routing_and_indexes() {
        let value = schema_map(vec![
            (KEY_ID_PROPERTY, WireValue::String("id".into())),
            (KEY_ROUTING_PROPERTY, WireValue::String("region".into())),
            (KEY_INDEXES, index_group(vec![("ORDERED", vec!["name"])])),
        ]);

        let decoded = decode_schema(&value);
        assert_eq!(decoded.descriptor.id_property.as_deref(), Some("id"));
        assert_eq!(decoded.descriptor.routing_property.as_deref(), Some("region"));
        assert_eq!(
            decoded.descriptor.indexes,
            vec![IndexSpec {
                property: "name".into(),
                kind: IndexKind::Ordered,
            }]
        );
        assert!(decoded.skipped.is_empty());
    }

    #[test]
    fn missing_id_and_routing_stay_unset() {
        let value = schema_map(vec![(
            KEY_INDEXES,
            index_group(vec![("EQUAL", vec!["name"])]),
        )]);
        let decoded = decode_schema(&value);
        assert!(decoded.descriptor.id_property.is_none());
        assert!(decoded.descriptor.routing_property.is_none());
        assert_eq!(decoded.descriptor.indexes.len(), 1);
    }

    #[test]
    fn preserves_kind_then_name_order() {
        let value = schema_map(vec![(
            KEY_INDEXES,
            index_group(vec![
                ("EXTENDED", vec!["b", "a"]),
                ("ORDERED", vec!["c"]),
            ]),
        )]);
        let decoded = decode_schema(&value);
        let props: Vec<(&str, IndexKind)> = decoded
            .descriptor
            .indexes
            .iter()
            .map(|i| (i.property.as_str(), i.kind))
            .collect();
        assert_eq!(
            props,
            vec![
                ("b", IndexKind::Extended),
                ("a", IndexKind::Extended),
                ("c", IndexKind::Ordered),
            ]
        );
    }

    #[test]
    fn bogus_kind_is_skipped_not_fatal() {
        let value = schema_map(vec![
            (KEY_ID_PROPERTY, WireValue::String("id".into())),
            (
                KEY_INDEXES,
                index_group(vec![("BOGUS", vec!["shoe_size"]), ("ORDERED", vec!["name"])]),
            ),
        ]);
        let decoded = decode_schema(&value);
        assert_eq!(decoded.descriptor.id_property.as_deref(), Some("id"));
        assert_eq!(decoded.descriptor.indexes.len(), 1);
        assert_eq!(
            decoded.skipped,
            vec![SkippedIndex {
                property: "shoe_size".into(),
                kind: "BOGUS".into(),
            }]
        );
    }

    #[test]
    fn unreserved_keys_are_ignored() {
        let value = schema_map(vec![
            ("someFutureKey", WireValue::String("whatever".into())),
            (KEY_ID_PROPERTY, WireValue::String("id".into())),
        ]);
        let decoded = decode_schema(&value);
        assert_eq!(decoded.descriptor.id_property.as_deref(), Some("id"));
        assert!(decoded.descriptor.indexes.is_empty());
    }
}
