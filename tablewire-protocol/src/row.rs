//! JSON representation of table rows.
//!
//! A row arrives in one of two shapes:
//!
//! - an array of strings, `["Airi", "Satou"]`, keyed by position (`"0"`,
//!   `"1"`, ...) once decoded;
//! - an object, `{"DT_RowId": "row_1", "first_name": "Airi"}`, where the
//!   reserved `DT_Row*` keys carry row metadata and every other key is
//!   column data.
//!
//! Rows are always written back as objects, so metadata never travels in
//! the array shape.
//!
//! An array holding anything but strings is not a valid array row, and the
//! error reports it against the object shape instead:
//! `invalid type: sequence, expected an object of string values`.

use crate::message::{Row, RowMap};
use serde::de::{self, MapAccess, SeqAccess, Unexpected, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub const ROW_ID_KEY: &str = "DT_RowId";
pub const ROW_CLASS_KEY: &str = "DT_RowClass";
pub const ROW_DATA_KEY: &str = "DT_RowData";
pub const ROW_ATTR_KEY: &str = "DT_RowAttr";

/// Shape reported when an array row fails to decode.
const OBJECT_ROW: &str = "an object of string values";

/// Keys that carry row metadata and may never appear as column data.
pub const RESERVED_KEYS: [&str; 4] = [ROW_ID_KEY, ROW_CLASS_KEY, ROW_DATA_KEY, ROW_ATTR_KEY];

/// Returns whether `key` is one of the reserved metadata keys.
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.data.iter().filter(|(k, _)| !is_reserved_key(k));
        let len = data.clone().count()
            + usize::from(!self.id.is_empty())
            + usize::from(!self.class.is_empty())
            + usize::from(!self.row_data.is_empty())
            + usize::from(!self.attr.is_empty());

        let mut map = serializer.serialize_map(Some(len))?;
        if !self.id.is_empty() {
            map.serialize_entry(ROW_ID_KEY, &self.id)?;
        }
        if !self.class.is_empty() {
            map.serialize_entry(ROW_CLASS_KEY, &self.class)?;
        }
        if !self.row_data.is_empty() {
            map.serialize_entry(ROW_DATA_KEY, &self.row_data)?;
        }
        if !self.attr.is_empty() {
            map.serialize_entry(ROW_ATTR_KEY, &self.attr)?;
        }
        for (k, v) in data {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RowVisitor)
    }
}

struct RowVisitor;

impl<'de> Visitor<'de> for RowVisitor {
    type Value = Row;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an array of strings or an object of string values")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut data = RowMap::new();
        while let Some(ArrayCell(value)) = seq.next_element()? {
            data.insert(data.len().to_string(), value);
        }
        Ok(Row {
            data,
            ..Default::default()
        })
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut row = Row::default();
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                ROW_ID_KEY => row.id = map.next_value::<Option<String>>()?.unwrap_or_default(),
                ROW_CLASS_KEY => {
                    row.class = map.next_value::<Option<String>>()?.unwrap_or_default()
                }
                ROW_DATA_KEY => {
                    row.row_data = map.next_value::<Option<RowMap>>()?.unwrap_or_default()
                }
                ROW_ATTR_KEY => {
                    row.attr = map.next_value::<Option<RowMap>>()?.unwrap_or_default()
                }
                _ => {
                    let value = map.next_value::<String>().map_err(|e| {
                        <A::Error as de::Error>::custom(format_args!("column {:?}: {}", key, e))
                    })?;
                    row.data.insert(key, value);
                }
            }
        }
        Ok(row)
    }
}

/// One element of an array row.
struct ArrayCell(String);

impl<'de> Deserialize<'de> for ArrayCell {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ArrayCellVisitor)
    }
}

struct ArrayCellVisitor;

/// A non-string element rules out the array shape, so the row as a whole
/// is reported as a sequence that is not an object.
fn not_an_object<E: de::Error>() -> E {
    E::invalid_type(Unexpected::Seq, &OBJECT_ROW)
}

impl<'de> Visitor<'de> for ArrayCellVisitor {
    type Value = ArrayCell;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(ArrayCell(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(ArrayCell(v))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Err(not_an_object())
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Err(not_an_object())
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Err(not_an_object())
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Err(not_an_object())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Err(not_an_object())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Err(not_an_object())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, _: A) -> Result<Self::Value, A::Error> {
        Err(not_an_object())
    }

    fn visit_map<A: MapAccess<'de>>(self, _: A) -> Result<Self::Value, A::Error> {
        Err(not_an_object())
    }
}
