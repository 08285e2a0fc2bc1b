//! Dynamically typed values, materialized records and mutation payloads
//!
//! Storage engines hand rows back as [`Record`]s: ordered mappings from column
//! name to [`Value`]. Writes go the other way as [`Payload`]s. [`Fields`]
//! describes which columns a read should project.
//!
//! # Example
//!
//! ```rust
//! use recordbase::value::{Fields, Payload, Value};
//!
//! let payload = Payload::new().set("name", "alice").set("age", 31);
//! assert_eq!(payload.get("age"), Some(&Value::Integer(31)));
//!
//! let fields = Fields::from(["name"]).including(&["id"]);
//! assert_eq!(fields, Fields::from(["name", "id"]));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A single dynamically typed column value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL
    #[default]
    Null,
    /// Boolean value (stored as 0/1 by SQLite)
    Boolean(bool),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Real(f64),
    /// Text value
    Text(String),
    /// Raw bytes
    Blob(Vec<u8>),
}

impl Value {
    /// Returns `true` for SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` when the value counts as "empty" input
    ///
    /// Null, `false`, zero, the empty string, the string `"0"` and an empty
    /// blob are all blank. Guard clauses use this to reject missing ids.
    ///
    /// ```rust
    /// use recordbase::value::Value;
    ///
    /// assert!(Value::Integer(0).is_blank());
    /// assert!(Value::from("0").is_blank());
    /// assert!(!Value::from("00").is_blank());
    /// assert!(!Value::Integer(7).is_blank());
    /// ```
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Boolean(b) => !b,
            Self::Integer(i) => *i == 0,
            Self::Real(f) => *f == 0.0,
            Self::Text(s) => s.is_empty() || s == "0",
            Self::Blob(b) => b.is_empty(),
        }
    }

    /// Integer view of the value, if it is integral
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Boolean(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Floating point view of any numeric value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Text view of the value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce the value to an integer the way identifier lookups expect
    ///
    /// Integers pass through, reals truncate toward zero, booleans become 0/1
    /// and text yields its leading integer (`"42abc"` → 42, `"abc"` → 0).
    /// Everything else coerces to 0.
    pub fn coerce_integer(&self) -> i64 {
        match self {
            Self::Integer(i) => *i,
            Self::Boolean(b) => i64::from(*b),
            // `as` saturates at the i64 bounds and maps NaN to 0
            Self::Real(f) => f.trunc() as i64,
            Self::Text(s) => leading_integer(s),
            Self::Null | Self::Blob(_) => 0,
        }
    }

    /// Short name of the variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }
}

fn leading_integer(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut acc: i64 = 0;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(byte - b'0');
        acc = if negative {
            acc.saturating_mul(10).saturating_sub(digit)
        } else {
            acc.saturating_mul(10).saturating_add(digit)
        };
    }
    acc
}

// Reals compare and hash by bit pattern so values can key a map.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Blob(a), Self::Blob(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Boolean(b) => b.hash(state),
            Self::Integer(i) => i.hash(state),
            Self::Real(f) => f.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
            Self::Blob(b) => b.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(s) => write!(f, "{}", s),
            Self::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Real(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Blob(bytes)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One materialized row: an ordered mapping from field name to value
///
/// Records are produced by storage engines and carry no link back to the
/// layer that fetched them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty record with room for `capacity` fields
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Look up a field by name
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Whether the record has the named field
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Set a field, replacing any previous value in place
    ///
    /// Returns the previous value if the field was already present.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((field, value));
                None
            }
        }
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields (the "not found" sentinel)
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in column order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate `(field, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (field, value) in iter {
            record.insert(field, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Column values for an insert or update
///
/// Column order is preserved, which keeps generated SQL stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    columns: Vec<(String, Value)>,
}

impl Payload {
    /// Create an empty payload
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a column, replacing any previous value in place
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((column, value)),
        }
    }

    /// Look up a column value
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the payload carries no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in insertion order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate `(column, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut payload = Payload::new();
        for (column, value) in iter {
            payload.insert(column, value);
        }
        payload
    }
}

impl From<Record> for Payload {
    fn from(record: Record) -> Self {
        record.into_iter().collect()
    }
}

/// Column projection for reads
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Fields {
    /// Every column (`*`)
    #[default]
    All,
    /// An explicit list of columns
    Columns(Vec<String>),
}

impl Fields {
    /// Project an explicit list of columns
    pub fn columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Columns(columns.into_iter().map(Into::into).collect())
    }

    /// Whether this projection selects every column
    ///
    /// An empty column list also means every column.
    pub fn is_all(&self) -> bool {
        match self {
            Self::All => true,
            Self::Columns(columns) => columns.is_empty(),
        }
    }

    /// Guarantee that `required` columns are part of the projection
    ///
    /// `All` is returned unchanged. Otherwise the required columns are
    /// appended and duplicates are dropped, keeping first occurrences.
    #[must_use]
    pub fn including(self, required: &[&str]) -> Self {
        match self {
            Self::All => Self::All,
            Self::Columns(columns) if columns.is_empty() => Self::All,
            Self::Columns(columns) => {
                let mut merged: Vec<String> = Vec::with_capacity(columns.len() + required.len());
                let candidates = columns
                    .into_iter()
                    .chain(required.iter().map(|c| (*c).to_string()));
                for column in candidates {
                    if !merged.contains(&column) {
                        merged.push(column);
                    }
                }
                Self::Columns(merged)
            }
        }
    }
}

impl From<&str> for Fields {
    fn from(projection: &str) -> Self {
        let projection = projection.trim();
        if projection.is_empty() || projection == "*" {
            Self::All
        } else {
            Self::Columns(vec![projection.to_string()])
        }
    }
}

impl From<String> for Fields {
    fn from(projection: String) -> Self {
        Self::from(projection.as_str())
    }
}

impl From<Vec<String>> for Fields {
    fn from(columns: Vec<String>) -> Self {
        Self::Columns(columns)
    }
}

impl From<Vec<&str>> for Fields {
    fn from(columns: Vec<&str>) -> Self {
        Self::columns(columns)
    }
}

impl From<&[&str]> for Fields {
    fn from(columns: &[&str]) -> Self {
        Self::columns(columns.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for Fields {
    fn from(columns: [&str; N]) -> Self {
        Self::columns(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_blank_values() {
        assert!(Value::Null.is_blank());
        assert!(Value::Boolean(false).is_blank());
        assert!(Value::Integer(0).is_blank());
        assert!(Value::Real(0.0).is_blank());
        assert!(Value::from("").is_blank());
        assert!(Value::from("0").is_blank());
        assert!(Value::Blob(vec![]).is_blank());

        assert!(!Value::Integer(-1).is_blank());
        assert!(!Value::from(" ").is_blank());
        assert!(!Value::from("0.0").is_blank());
    }

    #[test]
    fn test_coerce_integer() {
        assert_eq!(Value::Integer(12).coerce_integer(), 12);
        assert_eq!(Value::Real(7.9).coerce_integer(), 7);
        assert_eq!(Value::Real(-7.9).coerce_integer(), -7);
        assert_eq!(Value::from("42").coerce_integer(), 42);
        assert_eq!(Value::from("  42abc").coerce_integer(), 42);
        assert_eq!(Value::from("-3").coerce_integer(), -3);
        assert_eq!(Value::from("abc").coerce_integer(), 0);
        assert_eq!(Value::Boolean(true).coerce_integer(), 1);
        assert_eq!(Value::Null.coerce_integer(), 0);
    }

    #[test]
    fn test_coerce_integer_saturates() {
        assert_eq!(
            Value::from("99999999999999999999999").coerce_integer(),
            i64::MAX
        );
        assert_eq!(Value::Real(f64::NAN).coerce_integer(), 0);
    }

    #[test]
    fn test_value_as_map_key() {
        let mut map = HashMap::new();
        map.insert(Value::Integer(1), "one");
        map.insert(Value::Real(1.5), "one and a half");
        map.insert(Value::from("1"), "text one");

        assert_eq!(map.get(&Value::Integer(1)), Some(&"one"));
        assert_eq!(map.get(&Value::Real(1.5)), Some(&"one and a half"));
        assert_eq!(map.get(&Value::from("1")), Some(&"text one"));
        assert_ne!(Value::Integer(1), Value::Real(1.0));
    }

    #[test]
    fn test_value_from_option() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }

    #[test]
    fn test_record_insert_replaces_in_place() {
        let mut record = Record::new();
        record.insert("id", 1);
        record.insert("name", "bob");
        let previous = record.insert("id", 2);

        assert_eq!(previous, Some(Value::Integer(1)));
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["id", "name"]);
        assert_eq!(record.get("id"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_record_serializes_as_ordered_map() {
        let record: Record = vec![("b", Value::Integer(1)), ("a", Value::Null)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"b":1,"a":null}"#);
    }

    #[test]
    fn test_payload_builder() {
        let payload = Payload::new()
            .set("name", "alice")
            .set("score", 3.5)
            .set("name", "alicia");
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get("name"), Some(&Value::from("alicia")));
        assert_eq!(payload.columns().collect::<Vec<_>>(), vec!["name", "score"]);
    }

    #[test]
    fn test_fields_from_str() {
        assert_eq!(Fields::from("*"), Fields::All);
        assert_eq!(Fields::from(""), Fields::All);
        assert_eq!(Fields::from("name"), Fields::Columns(vec!["name".into()]));
    }

    #[test]
    fn test_fields_including_dedupes() {
        let fields = Fields::from(["name", "id"]).including(&["id", "user_id", "user_id"]);
        assert_eq!(fields, Fields::from(["name", "id", "user_id"]));
    }

    #[test]
    fn test_fields_including_keeps_all() {
        assert_eq!(Fields::All.including(&["id"]), Fields::All);
        assert_eq!(Fields::Columns(vec![]).including(&["id"]), Fields::All);
        assert!(Fields::Columns(vec![]).is_all());
    }
}
