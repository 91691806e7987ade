//! Call arguments and options.
//!
//! Every registry verb accepts a loosely shaped list of positional arguments:
//!
//! ```text
//! get(path)
//! get(path, recursive)
//! get(path, name)
//! get(path, {options})
//! set(path, name, data, type, {options})
//! set(path, {"": "default", "leader": "X"})
//! ```
//!
//! [`normalize`] turns such a list into one canonical [`Request`].
//!
//! # Example
//!
//! ```
//! use regkit::args;
//! use regkit::options::{normalize, CallKind, ClientOptions, Options};
//!
//! let request = normalize(
//!     CallKind::Read,
//!     args!["HKCU/Software/Vendor/", "Version", Options::new().bits(32)],
//!     None,
//!     &ClientOptions::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(request.path.as_deref(), Some("HKCU\\Software\\Vendor"));
//! assert_eq!(request.name.as_deref(), Some("Version"));
//! assert_eq!(request.view_flag(), Some("/reg:32"));
//! ```

mod request;

pub use request::{normalize, Request};

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{RegError, RegResult};
use crate::value::Data;

/// Marker field that turns a plain map into an options record.
pub const IS_OPTIONS: &str = "$isOptions";

/// Default key of the values bucket in simple key trees.
pub const VALUES_KEY: &str = "$values";

/// Output shape of read operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Bare data, name maps and nested name maps.
    #[default]
    Simple,
    /// Full `ValueEntry` records and `KeyNode` trees.
    Complex,
}

impl FromStr for Format {
    type Err = RegError;

    fn from_str(format: &str) -> RegResult<Self> {
        match format.to_ascii_lowercase().as_str() {
            "simple" => Ok(Format::Simple),
            "complex" => Ok(Format::Complex),
            other => Err(RegError::config(format!(
                "Unknown format '{}', use 'simple' or 'complex'",
                other
            ))),
        }
    }
}

/// Which registry view to address on 64-bit systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// `/reg:32`
    Bits32,
    /// `/reg:64`
    Bits64,
}

impl View {
    /// Map a bit width to a view. Anything other than 32 or 64 means the
    /// tool default.
    pub fn from_bits(bits: u64) -> Option<View> {
        match bits {
            32 => Some(View::Bits32),
            64 => Some(View::Bits64),
            _ => None,
        }
    }

    /// The `reg.exe` flag selecting this view.
    pub fn flag(self) -> &'static str {
        match self {
            View::Bits32 => "/reg:32",
            View::Bits64 => "/reg:64",
        }
    }
}

/// Whether a verb reads or writes. Only affects how a trailing map is
/// classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Queries, existence checks and deletes.
    Read,
    /// `set` and `set_value`.
    Write,
}

/// An options record.
///
/// Every field is optional; set fields override lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Key path.
    pub path: Option<String>,
    /// Value name, `""` for the default value.
    pub name: Option<String>,
    /// Payload to write.
    pub data: Option<Data>,
    /// Raw type tag, validated during normalization.
    pub value_type: Option<String>,
    /// Include all descendant keys.
    pub recursive: Option<bool>,
    /// Output shape.
    pub format: Option<Format>,
    /// Fold key and value names to lower case.
    pub lowercase: Option<bool>,
    /// `Some(None)` explicitly selects the tool default view.
    pub view: Option<Option<View>>,
    /// Unknown fields, passed through untouched.
    pub custom: BTreeMap<String, Data>,
}

impl Options {
    /// Empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the value name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the payload.
    pub fn data(mut self, data: impl Into<Data>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the type tag (`"sz"`, `"REG_DWORD"`, ...).
    pub fn value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = Some(value_type.into());
        self
    }

    /// Set the recursive flag.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = Some(recursive);
        self
    }

    /// Set the output format.
    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the case folding flag.
    pub fn lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = Some(lowercase);
        self
    }

    /// Select a view by bit width (32 or 64, anything else is the default).
    pub fn bits(mut self, bits: u64) -> Self {
        self.view = Some(View::from_bits(bits));
        self
    }

    /// Select a view.
    pub fn view(mut self, view: Option<View>) -> Self {
        self.view = Some(view);
        self
    }

    /// Whether a plain map carries the options marker.
    pub fn is_tagged(map: &BTreeMap<String, Data>) -> bool {
        matches!(map.get(IS_OPTIONS), Some(Data::Bool(true)))
    }

    /// Read an options record out of a plain map.
    pub fn from_record(map: BTreeMap<String, Data>) -> RegResult<Self> {
        let mut options = Options::new();
        for (key, value) in map {
            match key.as_str() {
                IS_OPTIONS => {}
                "path" => options.path = Some(expect_text(&key, value)?),
                "name" => options.name = Some(expect_text(&key, value)?),
                "data" => options.data = Some(value),
                "type" => options.value_type = Some(expect_text(&key, value)?),
                "recursive" => options.recursive = Some(expect_bool(&key, value)?),
                "lowercase" => options.lowercase = Some(expect_bool(&key, value)?),
                "format" => options.format = Some(expect_text(&key, value)?.parse()?),
                "view" | "bits" => match value {
                    Data::Integer(bits) => options.view = Some(View::from_bits(bits)),
                    Data::NotSet => options.view = Some(None),
                    other => return Err(malformed(&key, &other)),
                },
                _ => {
                    options.custom.insert(key, value);
                }
            }
        }
        Ok(options)
    }

    /// Overlay every field `other` sets on top of `self`.
    pub fn merge(&mut self, other: Options) {
        if other.path.is_some() {
            self.path = other.path;
        }
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.data.is_some() {
            self.data = other.data;
        }
        if other.value_type.is_some() {
            self.value_type = other.value_type;
        }
        if other.recursive.is_some() {
            self.recursive = other.recursive;
        }
        if other.format.is_some() {
            self.format = other.format;
        }
        if other.lowercase.is_some() {
            self.lowercase = other.lowercase;
        }
        if other.view.is_some() {
            self.view = other.view;
        }
        self.custom.extend(other.custom);
    }
}

fn expect_text(key: &str, value: Data) -> RegResult<String> {
    match value {
        Data::String(text) => Ok(text),
        other => Err(malformed(key, &other)),
    }
}

fn expect_bool(key: &str, value: Data) -> RegResult<bool> {
    match value {
        Data::Bool(flag) => Ok(flag),
        other => Err(malformed(key, &other)),
    }
}

fn malformed(key: &str, value: &Data) -> RegError {
    RegError::config(format!("Option '{}' has an invalid value: {:?}", key, value))
}

/// Client wide defaults, the lowest options layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Fold names to lower case.
    pub lowercase: bool,
    /// Output shape.
    pub format: Format,
    /// Registry view.
    pub view: Option<View>,
    /// Key of the values bucket in simple key trees.
    pub values_key: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            lowercase: true,
            format: Format::Simple,
            view: None,
            values_key: VALUES_KEY.to_string(),
        }
    }
}

/// One positional argument of a registry verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// A string: path, name, string data or type tag depending on the slot.
    Text(String),
    /// A boolean: the recursive flag in slot 2, data in slot 3.
    Flag(bool),
    /// A payload that is never mistaken for options.
    Data(Data),
    /// A plain map: options record or structured payload.
    Map(BTreeMap<String, Data>),
    /// An options record.
    Options(Options),
}

impl Arg {
    fn is_record(&self) -> bool {
        match self {
            Arg::Options(_) => true,
            Arg::Map(map) => Options::is_tagged(map),
            _ => false,
        }
    }

    fn into_record(self) -> RegResult<Options> {
        match self {
            Arg::Options(options) => Ok(options),
            Arg::Map(map) => Options::from_record(map),
            other => Err(RegError::config(format!(
                "Expected an options record, got {:?}",
                other
            ))),
        }
    }
}

impl From<&str> for Arg {
    fn from(text: &str) -> Self {
        Arg::Text(text.to_string())
    }
}

impl From<String> for Arg {
    fn from(text: String) -> Self {
        Arg::Text(text)
    }
}

impl From<&String> for Arg {
    fn from(text: &String) -> Self {
        Arg::Text(text.clone())
    }
}

impl From<bool> for Arg {
    fn from(flag: bool) -> Self {
        Arg::Flag(flag)
    }
}

impl From<u32> for Arg {
    fn from(n: u32) -> Self {
        Arg::Data(Data::from(n))
    }
}

impl From<u64> for Arg {
    fn from(n: u64) -> Self {
        Arg::Data(Data::from(n))
    }
}

impl From<Vec<u8>> for Arg {
    fn from(bytes: Vec<u8>) -> Self {
        Arg::Data(Data::Bytes(bytes))
    }
}

impl From<Vec<String>> for Arg {
    fn from(items: Vec<String>) -> Self {
        Arg::Data(Data::Strings(items))
    }
}

impl From<Vec<&str>> for Arg {
    fn from(items: Vec<&str>) -> Self {
        Arg::Data(Data::from(items))
    }
}

impl From<Data> for Arg {
    fn from(data: Data) -> Self {
        Arg::Data(data)
    }
}

impl From<BTreeMap<String, Data>> for Arg {
    fn from(map: BTreeMap<String, Data>) -> Self {
        Arg::Map(map)
    }
}

impl From<Options> for Arg {
    fn from(options: Options) -> Self {
        Arg::Options(options)
    }
}

/// Build a `Vec<Arg>` from heterogeneous values.
///
/// ```
/// use regkit::args;
/// use regkit::options::Arg;
///
/// let list = args!["HKLM\\SOFTWARE", true];
/// assert_eq!(list, vec![Arg::from("HKLM\\SOFTWARE"), Arg::Flag(true)]);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::options::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::options::Arg::from($arg)),+]
    };
}

#[cfg(test)]
mod tests;
