//! Translation of requests into `reg.exe` argument vectors.
//!
//! Argument vectors never include the program itself.

use crate::error::RegResult;
use crate::options::Request;
use crate::path;
use crate::value::{infer_type, stringify_data, Data, ValueType};

/// Probe whose stderr carries the localized "not found" message.
pub const PROBE_NOT_FOUND: [&str; 2] = ["QUERY", "HKLM\\NONEXISTENT"];

/// Probe whose stdout carries the localized `(Default)` and `(value not set)`
/// strings.
pub const PROBE_DEFAULT_VALUE: [&str; 3] = ["QUERY", "HKCR", "/ve"];

/// Primitive operations understood by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// List the values and direct subkeys (or every descendant) of a key.
    QueryKey,
    /// Read one value.
    QueryValue,
    /// Create a key and leave its default value unset.
    CreateKey,
    /// Create or overwrite one value.
    WriteValue,
    /// Delete a key with everything below it.
    DeleteKey,
    /// Delete one value.
    DeleteValue,
    /// Delete every value of a key, keeping subkeys.
    DeleteAllValues,
}

/// One leaf write of a structured payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueWrite {
    /// Key holding the value.
    pub path: String,
    /// Value name, `""` for the default value.
    pub name: String,
    /// Payload, never a `Data::Map`.
    pub data: Data,
}

/// Builds argument vectors for requests.
pub struct CommandBuilder;

impl CommandBuilder {
    /// Build the argument vectors for `operation`. Most operations produce a
    /// single vector; `CreateKey` produces two that must run in order.
    pub fn build(operation: Operation, request: &Request) -> RegResult<Vec<Vec<String>>> {
        let path = request.key_path()?;
        let view = request.view_flag();

        let commands = match operation {
            Operation::QueryKey => vec![query_key(path, request.recursive, view)],
            Operation::QueryValue => vec![query_value(path, value_name(request), view)],
            Operation::CreateKey => create_key(path, view),
            Operation::WriteValue => {
                let data = request.data.clone().unwrap_or_else(|| Data::from(""));
                vec![write_value(
                    path,
                    value_name(request),
                    &data,
                    request.value_type.as_ref(),
                    view,
                )?]
            }
            Operation::DeleteKey => vec![delete_key(path, view)],
            Operation::DeleteValue => vec![delete_value(path, value_name(request), view)],
            Operation::DeleteAllValues => vec![delete_all_values(path, view)],
        };

        Ok(commands)
    }
}

fn value_name(request: &Request) -> &str {
    request.name.as_deref().unwrap_or("")
}

fn command(parts: &[&str], view: Option<&str>) -> Vec<String> {
    parts
        .iter()
        .copied()
        .chain(view)
        .map(str::to_string)
        .collect()
}

fn value_selector<'a>(name: &'a str) -> Vec<&'a str> {
    if name.is_empty() {
        vec!["/ve"]
    } else {
        vec!["/v", name]
    }
}

/// `query <path> [/s] [view]`
pub fn query_key(path: &str, recursive: bool, view: Option<&str>) -> Vec<String> {
    let mut parts = vec!["query", path];
    if recursive {
        parts.push("/s");
    }
    command(&parts, view)
}

/// `query <path> (/ve | /v <name>) [view]`
pub fn query_value(path: &str, name: &str, view: Option<&str>) -> Vec<String> {
    let mut parts = vec!["query", path];
    parts.extend(value_selector(name));
    command(&parts, view)
}

/// `add <path> /f` followed by `delete <path> /ve /f`.
///
/// `reg add` stamps an empty string into the default value of every key it
/// creates; the second command removes it again.
pub fn create_key(path: &str, view: Option<&str>) -> Vec<Vec<String>> {
    vec![
        command(&["add", path, "/f"], view),
        command(&["delete", path, "/ve", "/f"], view),
    ]
}

/// `add <path> (/ve | /v <name>) /t <TYPE> [/d <data>] /f [view]`
pub fn write_value(
    path: &str,
    name: &str,
    data: &Data,
    value_type: Option<&ValueType>,
    view: Option<&str>,
) -> RegResult<Vec<String>> {
    let value_type = match value_type {
        Some(value_type) => value_type.clone(),
        None => infer_type(data)?,
    };
    let text = stringify_data(data, &value_type)?;

    let mut parts = vec!["add", path];
    parts.extend(value_selector(name));
    parts.push("/t");
    parts.push(value_type.as_str());
    if let Some(text) = text.as_deref() {
        parts.push("/d");
        parts.push(text);
    }
    parts.push("/f");
    Ok(command(&parts, view))
}

/// `delete <path> /f [view]`
pub fn delete_key(path: &str, view: Option<&str>) -> Vec<String> {
    command(&["delete", path, "/f"], view)
}

/// `delete <path> (/ve | /v <name>) /f [view]`
pub fn delete_value(path: &str, name: &str, view: Option<&str>) -> Vec<String> {
    let mut parts = vec!["delete", path];
    parts.extend(value_selector(name));
    parts.push("/f");
    command(&parts, view)
}

/// `delete <path> /va /f [view]`
pub fn delete_all_values(path: &str, view: Option<&str>) -> Vec<String> {
    command(&["delete", path, "/va", "/f"], view)
}

/// Flatten a structured payload into leaf writes.
///
/// A non-empty `name` is appended to `path` first. Nested maps become
/// subkeys and the `""` entry of a map becomes that key's default value.
/// A payload that is not a map is a single write.
pub fn plan_structured_write(path: &str, name: &str, data: &Data) -> Vec<ValueWrite> {
    let entries = match data {
        Data::Map(entries) => entries,
        leaf => {
            return vec![ValueWrite {
                path: path.to_string(),
                name: name.to_string(),
                data: leaf.clone(),
            }]
        }
    };

    let base = path::join(path, name);
    let mut writes = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        writes.extend(plan_structured_write(&base, key, value));
    }
    writes
}
