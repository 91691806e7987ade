//! Conversion between `Data` and the text form used on the `reg.exe` command
//! line and in its output.

use super::{Data, ValueType};
use crate::error::{RegError, RegResult};

/// Literal two-character separator `reg.exe` uses between `REG_MULTI_SZ` items.
pub(crate) const MULTI_SZ_SEPARATOR: &str = "\\0";

/// Pick a type for `data` when the caller did not name one.
pub fn infer_type(data: &Data) -> RegResult<ValueType> {
    match data {
        Data::String(_) | Data::NotSet => Ok(ValueType::String),
        Data::Integer(n) if *n <= u32::MAX as u64 => Ok(ValueType::Dword),
        Data::Integer(_) => Ok(ValueType::Qword),
        Data::Strings(_) => Ok(ValueType::MultiString),
        Data::Bytes(_) => Ok(ValueType::Binary),
        Data::Bool(_) => Err(RegError::config(
            "Cannot infer a value type for boolean data, pass a type explicitly",
        )),
        Data::Map(_) => Err(RegError::config(
            "Structured data must be flattened into single values before writing",
        )),
    }
}

/// Render `data` as the `/d` argument for a value of `value_type`.
///
/// Returns `None` when no `/d` flag should be passed at all.
pub fn stringify_data(data: &Data, value_type: &ValueType) -> RegResult<Option<String>> {
    if let ValueType::Other(tag) = value_type {
        return Err(RegError::config(format!(
            "Values of type '{}' cannot be written",
            tag
        )));
    }

    let text = match data {
        Data::NotSet => return Ok(None),
        Data::Bytes(bytes) => match value_type {
            ValueType::Binary => hex::encode_upper(bytes),
            _ => String::from_utf8_lossy(bytes).into_owned(),
        },
        Data::Strings(items) => items.join(MULTI_SZ_SEPARATOR),
        Data::Integer(n) => n.to_string(),
        Data::String(text) => match value_type {
            ValueType::Binary => hex::encode_upper(text.as_bytes()),
            ValueType::MultiString => text.replace('\0', MULTI_SZ_SEPARATOR),
            _ => text.clone(),
        },
        Data::Bool(flag) => flag.to_string(),
        Data::Map(_) => {
            return Err(RegError::config(
                "Structured data must be flattened into single values before writing",
            ))
        }
    };

    Ok(Some(text))
}

/// Coerce the data column of a value line into a native payload.
///
/// Anything that fails to parse is kept as text.
pub fn parse_value_data(raw: &str, value_type: &ValueType) -> Data {
    match value_type {
        ValueType::Binary | ValueType::None => match hex::decode(raw) {
            Ok(bytes) => Data::Bytes(bytes),
            Err(_) => Data::String(raw.to_string()),
        },
        ValueType::Dword | ValueType::Qword => match parse_integer(raw) {
            Some(n) => Data::Integer(n),
            None => Data::String(raw.to_string()),
        },
        ValueType::MultiString if raw.is_empty() => Data::Strings(Vec::new()),
        ValueType::MultiString => Data::Strings(
            raw.split(MULTI_SZ_SEPARATOR)
                .map(str::to_string)
                .collect(),
        ),
        _ => Data::String(raw.to_string()),
    }
}

fn parse_integer(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(digits) => u64::from_str_radix(digits, 16).ok(),
        None => raw.parse().ok(),
    }
}
