//! Value types and data payloads.
//!
//! `ValueType` mirrors the type tags printed and accepted by `reg.exe`.
//! `Data` is the native payload a caller writes or a read returns.

mod codec;

pub use codec::{infer_type, parse_value_data, stringify_data};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RegError, RegResult};

/// Registry value type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    /// `REG_SZ`
    String,
    /// `REG_EXPAND_SZ`
    ExpandString,
    /// `REG_MULTI_SZ`
    MultiString,
    /// `REG_DWORD`, 32-bit integer
    Dword,
    /// `REG_QWORD`, 64-bit integer
    Qword,
    /// `REG_BINARY`
    Binary,
    /// `REG_NONE`
    None,
    /// A tag reported by the tool that this crate does not write,
    /// e.g. `REG_RESOURCE_LIST`. Only produced by reads.
    Other(String),
}

impl ValueType {
    /// Every tag that can be written.
    pub const WRITABLE: [ValueType; 7] = [
        ValueType::String,
        ValueType::MultiString,
        ValueType::ExpandString,
        ValueType::Dword,
        ValueType::Qword,
        ValueType::Binary,
        ValueType::None,
    ];

    /// Tag as printed by `reg.exe`.
    pub fn as_str(&self) -> &str {
        match self {
            ValueType::String => "REG_SZ",
            ValueType::ExpandString => "REG_EXPAND_SZ",
            ValueType::MultiString => "REG_MULTI_SZ",
            ValueType::Dword => "REG_DWORD",
            ValueType::Qword => "REG_QWORD",
            ValueType::Binary => "REG_BINARY",
            ValueType::None => "REG_NONE",
            ValueType::Other(tag) => tag,
        }
    }

    /// Map a tag exactly as printed in `reg.exe` output. Unknown tags become
    /// `Other`.
    pub fn from_output(tag: &str) -> ValueType {
        Self::WRITABLE
            .into_iter()
            .find(|known| known.as_str() == tag)
            .unwrap_or_else(|| ValueType::Other(tag.to_string()))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a user supplied tag. Case is ignored and the `REG_` prefix is
/// optional, so `"sz"`, `"reg_sz"` and `"REG_SZ"` are all `String`.
impl FromStr for ValueType {
    type Err = RegError;

    fn from_str(tag: &str) -> RegResult<Self> {
        let mut upper = tag.trim().to_uppercase();
        if !upper.starts_with("REG_") {
            upper.insert_str(0, "REG_");
        }
        Self::WRITABLE
            .into_iter()
            .find(|known| known.as_str() == upper)
            .ok_or_else(|| {
                let known: Vec<String> = Self::WRITABLE.into_iter().map(String::from).collect();
                RegError::config(format!(
                    "Illegal type '{}', should be one of: '{}'",
                    upper,
                    known.join("', '")
                ))
            })
    }
}

impl TryFrom<String> for ValueType {
    type Error = RegError;

    fn try_from(tag: String) -> RegResult<Self> {
        tag.parse()
    }
}

impl From<ValueType> for String {
    fn from(value_type: ValueType) -> String {
        value_type.as_str().to_string()
    }
}

/// A value payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    /// Text (`REG_SZ`, `REG_EXPAND_SZ`, or anything the parser keeps as text).
    String(String),
    /// Unsigned integer (`REG_DWORD` up to `u32::MAX`, `REG_QWORD` above).
    Integer(u64),
    /// Ordered list of strings (`REG_MULTI_SZ`).
    Strings(Vec<String>),
    /// Raw bytes (`REG_BINARY`).
    Bytes(Vec<u8>),
    /// Boolean. Only meaningful in option records; writing one needs an
    /// explicit type.
    Bool(bool),
    /// Structured payload: one write per entry, nested maps become subkeys and
    /// the `""` entry becomes the default value.
    Map(BTreeMap<String, Data>),
    /// The value exists but holds no data. Distinct from an empty string.
    NotSet,
}

impl Data {
    /// Borrow the text payload, if this is `Data::String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Data::String(text) => Some(text),
            _ => None,
        }
    }

    /// Integer payload, if this is `Data::Integer`.
    pub fn as_integer(&self) -> Option<u64> {
        match self {
            Data::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether this is the "not set" sentinel.
    pub fn is_not_set(&self) -> bool {
        matches!(self, Data::NotSet)
    }
}

impl From<&str> for Data {
    fn from(text: &str) -> Self {
        Data::String(text.to_string())
    }
}

impl From<String> for Data {
    fn from(text: String) -> Self {
        Data::String(text)
    }
}

impl From<u32> for Data {
    fn from(n: u32) -> Self {
        Data::Integer(n as u64)
    }
}

impl From<u64> for Data {
    fn from(n: u64) -> Self {
        Data::Integer(n)
    }
}

impl From<bool> for Data {
    fn from(flag: bool) -> Self {
        Data::Bool(flag)
    }
}

impl From<Vec<String>> for Data {
    fn from(items: Vec<String>) -> Self {
        Data::Strings(items)
    }
}

impl From<Vec<&str>> for Data {
    fn from(items: Vec<&str>) -> Self {
        Data::Strings(items.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Data::Bytes(bytes)
    }
}

impl From<&[u8]> for Data {
    fn from(bytes: &[u8]) -> Self {
        Data::Bytes(bytes.to_vec())
    }
}

impl From<BTreeMap<String, Data>> for Data {
    fn from(map: BTreeMap<String, Data>) -> Self {
        Data::Map(map)
    }
}

/// One named, typed value inside a key. The default value has `name == ""`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueEntry {
    /// Value name, `""` for the default value.
    pub name: String,
    /// Type tag reported by the tool.
    pub value_type: ValueType,
    /// Coerced payload, or `Data::NotSet`.
    pub data: Data,
}

impl ValueEntry {
    /// Whether this is the default (unnamed) value.
    pub fn is_default(&self) -> bool {
        self.name.is_empty()
    }
}

/// Build a `Data::Map` from `(key, data)` pairs.
///
/// ```
/// use regkit::value::{data_map, Data};
///
/// let payload = data_map([
///     ("", Data::from("root data")),
///     ("leader", Data::from("X")),
///     ("nested", data_map([("leader", Data::from("Y"))])),
/// ]);
/// assert!(matches!(payload, Data::Map(_)));
/// ```
pub fn data_map<K, I>(entries: I) -> Data
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Data)>,
{
    Data::Map(
        entries
            .into_iter()
            .map(|(key, data)| (key.into(), data))
            .collect(),
    )
}
