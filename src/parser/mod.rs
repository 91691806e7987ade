//! Parsing of `reg.exe query` output.
//!
//! The tool prints one line per key path (always the long root spelling) and
//! one indented line per value:
//!
//! ```text
//!
//! HKEY_CURRENT_USER\Software\Vendor
//!     (Default)    REG_SZ    (value not set)
//!     Version    REG_DWORD    0x3
//!
//! HKEY_CURRENT_USER\Software\Vendor\Plugins
//! ```
//!
//! Value lines belong to the most recent key line. Key lines are never
//! trimmed, since key names may end in spaces.

mod tree;

pub use tree::{KeyNode, KeyTree, SimpleEntry, SimpleKeyNode};

use std::collections::BTreeMap;

use crate::error::RegResult;
use crate::executor::Calibration;
use crate::options::{Format, Request};
use crate::path;
use crate::value::{parse_value_data, Data, ValueEntry, ValueType};

/// Result of a single value read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueOutput {
    /// Simple format: the bare payload.
    Data(Data),
    /// Complex format: name, type and payload.
    Entry(ValueEntry),
}

impl ValueOutput {
    /// The payload, whatever the format.
    pub fn data(&self) -> &Data {
        match self {
            ValueOutput::Data(data) => data,
            ValueOutput::Entry(entry) => &entry.data,
        }
    }
}

/// Result of listing the values of a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValuesOutput {
    /// Simple format: value name to payload.
    Simple(BTreeMap<String, Data>),
    /// Complex format: entries in output order.
    Complex(Vec<ValueEntry>),
}

impl ValuesOutput {
    /// Value names, whatever the format.
    pub fn names(&self) -> Vec<&str> {
        match self {
            ValuesOutput::Simple(map) => map.keys().map(String::as_str).collect(),
            ValuesOutput::Complex(entries) => entries.iter().map(|e| e.name.as_str()).collect(),
        }
    }
}

/// Parse one indented value line.
pub fn parse_value_line(
    line: &str,
    lowercase: bool,
    calibration: &Calibration,
) -> Option<ValueEntry> {
    let body = line.strip_prefix("    ")?;
    let mut fields = body.splitn(3, "    ");
    let name = fields.next()?;
    let value_type = ValueType::from_output(fields.next()?);
    let raw = fields.next().unwrap_or("");

    let name = if name == calibration.default_name {
        String::new()
    } else if lowercase {
        name.to_lowercase()
    } else {
        name.to_string()
    };
    let data = if raw == calibration.value_not_set {
        Data::NotSet
    } else {
        parse_value_data(raw, &value_type)
    };

    Some(ValueEntry {
        name,
        value_type,
        data,
    })
}

fn value_lines<'a>(raw: &'a str) -> impl Iterator<Item = &'a str> {
    raw.lines().filter(|line| line.starts_with(' '))
}

/// Build a key tree from the output of `query <path> [/s]`.
pub fn parse_key(raw: &str, request: &Request, calibration: &Calibration) -> RegResult<KeyTree> {
    let full_path = path::extend_key_path(request.key_path()?);
    let trim_by = full_path.len() + 1;

    let mut tree = KeyTree::new(request.format, &request.values_key);
    let mut scope: Vec<String> = Vec::new();

    for line in raw.lines() {
        if line.starts_with(' ') {
            if let Some(entry) = parse_value_line(line, request.lowercase, calibration) {
                tree.insert_value(&scope, entry);
            }
        } else if line.starts_with("HK") {
            let relative = line.get(trim_by..).unwrap_or("");
            scope = if relative.is_empty() {
                Vec::new()
            } else if request.lowercase {
                split_segments(&relative.to_lowercase())
            } else {
                split_segments(relative)
            };
            tree.ensure_key(&scope);
        }
    }

    Ok(tree)
}

fn split_segments(relative: &str) -> Vec<String> {
    relative
        .split(path::SEPARATOR)
        .map(str::to_string)
        .collect()
}

/// Extract the value from the output of `query <path> (/ve | /v <name>)`.
///
/// In simple format a default value without data reads as absent.
pub fn parse_value(raw: &str, request: &Request, calibration: &Calibration) -> Option<ValueOutput> {
    let entry = value_lines(raw)
        .find_map(|line| parse_value_line(line, request.lowercase, calibration))?;
    match request.format {
        Format::Simple if entry.data.is_not_set() => None,
        Format::Simple => Some(ValueOutput::Data(entry.data)),
        Format::Complex => Some(ValueOutput::Entry(entry)),
    }
}

/// Collect the values from the output of `query <path>`.
pub fn parse_value_list(raw: &str, request: &Request, calibration: &Calibration) -> ValuesOutput {
    let entries = value_lines(raw)
        .filter_map(|line| parse_value_line(line, request.lowercase, calibration));
    match request.format {
        Format::Simple => ValuesOutput::Simple(
            entries.map(|entry| (entry.name, entry.data)).collect(),
        ),
        Format::Complex => ValuesOutput::Complex(entries.collect()),
    }
}

/// Collect subkeys from the output of `query <path>`.
///
/// Simple format returns names relative to the queried key, complex format
/// returns full paths as printed.
pub fn parse_key_names(raw: &str, request: &Request) -> RegResult<Vec<String>> {
    let full_path = path::extend_key_path(request.key_path()?);
    let trim_by = full_path.len() + 1;

    let names = raw
        .lines()
        .filter(|line| line.starts_with("HK"))
        .filter(|line| !line.eq_ignore_ascii_case(&full_path))
        .filter_map(|line| match request.format {
            Format::Simple => line.get(trim_by..),
            Format::Complex => Some(line),
        })
        .filter(|name| !name.is_empty())
        .map(|name| {
            if request.lowercase {
                name.to_lowercase()
            } else {
                name.to_string()
            }
        })
        .collect();

    Ok(names)
}

/// Whether the output of `query <path> (/ve | /v <name>)` shows the value.
///
/// The default value only counts when it holds data.
pub fn parse_has_value(raw: &str, request: &Request, calibration: &Calibration) -> bool {
    let name = request.name.as_deref().unwrap_or("");
    value_lines(raw)
        .filter_map(|line| parse_value_line(line, false, calibration))
        .any(|entry| {
            if name.is_empty() {
                entry.is_default() && !entry.data.is_not_set()
            } else {
                entry.name.to_lowercase() == name.to_lowercase()
            }
        })
}
