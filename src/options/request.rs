use std::collections::BTreeMap;

use tracing::trace;

use super::{Arg, CallKind, ClientOptions, Format, Options, View};
use crate::error::{RegError, RegResult};
use crate::path;
use crate::value::{Data, ValueType};

/// The canonical form of one registry call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Canonical key path: `\` separators, known root.
    pub path: Option<String>,
    /// Value name, `""` for the default value.
    pub name: Option<String>,
    /// Payload for writes.
    pub data: Option<Data>,
    /// Explicit value type.
    pub value_type: Option<ValueType>,
    /// Include all descendant keys.
    pub recursive: bool,
    /// Output shape.
    pub format: Format,
    /// Fold names to lower case.
    pub lowercase: bool,
    /// Registry view, `None` for the tool default.
    pub view: Option<View>,
    /// Key of the values bucket in simple key trees.
    pub values_key: String,
    /// Unrecognized record fields.
    pub custom: BTreeMap<String, Data>,
}

impl Request {
    /// The canonical path, or a configuration error when none was given.
    pub fn key_path(&self) -> RegResult<&str> {
        self.path
            .as_deref()
            .ok_or_else(|| RegError::config("A key path is required"))
    }

    /// The `/reg:NN` flag for the selected view, if any.
    pub fn view_flag(&self) -> Option<&'static str> {
        self.view.map(View::flag)
    }

    /// Copy of this request addressing another key, keeping every other field.
    pub fn at_path(&self, path: impl Into<String>) -> Request {
        Request {
            path: Some(path.into()),
            ..self.clone()
        }
    }
}

/// Normalize positional arguments into a [`Request`].
///
/// Layers, lowest first: `defaults`, `call_options`, positional fields, then
/// every options record found in `args` in argument order.
pub fn normalize(
    kind: CallKind,
    mut args: Vec<Arg>,
    call_options: Option<&Options>,
    defaults: &ClientOptions,
) -> RegResult<Request> {
    // Write pin: `set(path, {..})` and `set(path, name, {..})` carry data.
    if kind == CallKind::Write
        && matches!(args.len(), 2 | 3)
        && matches!(args.last(), Some(Arg::Map(map)) if !Options::is_tagged(map))
    {
        args.push(Arg::Options(Options::new()));
    }

    let mut records = Vec::new();
    let mut first_slot = 1;
    if matches!(args.first(), Some(Arg::Map(_) | Arg::Options(_))) {
        records.push(args.remove(0).into_record()?);
        first_slot = 2;
    }

    let mut trailing = None;
    if let Some(last) = args.last() {
        let last_slot = first_slot + args.len() - 1;
        let is_trailing_record = match last {
            Arg::Options(_) => last_slot > 1,
            // Positionals sitting between the path slot and the map.
            Arg::Map(map) => last_slot > 1 && (Options::is_tagged(map) || last_slot - 2 < 2),
            _ => false,
        };
        if is_trailing_record {
            trailing = args.pop();
        }
    }

    let mut positional = Options::new();
    for (slot, arg) in (first_slot..).zip(args) {
        if arg.is_record() {
            records.push(arg.into_record()?);
            continue;
        }
        match (slot, arg) {
            (1, Arg::Text(path)) => positional.path = Some(path),
            (1, other) => {
                return Err(RegError::config(format!(
                    "Expected a key path as the first argument, got {:?}",
                    other
                )))
            }
            (2, Arg::Flag(recursive)) => positional.recursive = Some(recursive),
            (2, Arg::Text(name)) => positional.name = Some(name),
            (2, Arg::Map(map)) => positional.data = Some(Data::Map(map)),
            (2, Arg::Data(data)) => positional.data = Some(data),
            (3, Arg::Text(text)) => positional.data = Some(Data::String(text)),
            (3, Arg::Flag(flag)) => positional.data = Some(Data::Bool(flag)),
            (3, Arg::Map(map)) => positional.data = Some(Data::Map(map)),
            (3, Arg::Data(data)) => positional.data = Some(data),
            (4, Arg::Text(value_type)) => positional.value_type = Some(value_type),
            (slot, Arg::Map(map)) if slot >= 4 => records.push(Options::from_record(map)?),
            (slot, other) => {
                return Err(RegError::config(format!(
                    "Unexpected argument in position {}: {:?}",
                    slot, other
                )))
            }
        }
    }
    if let Some(last) = trailing {
        records.push(last.into_record()?);
    }

    let mut merged = Options::new();
    if let Some(call_options) = call_options {
        merged.merge(call_options.clone());
    }
    merged.merge(positional);
    for record in records {
        merged.merge(record);
    }

    let request = build_request(merged, defaults)?;
    trace!(?request, "normalized arguments");
    Ok(request)
}

fn build_request(options: Options, defaults: &ClientOptions) -> RegResult<Request> {
    let path = match options.path {
        Some(raw) => Some(path::resolve_key_path(&raw)?.1),
        None => None,
    };

    let value_type = options
        .value_type
        .as_deref()
        .map(str::parse::<ValueType>)
        .transpose()?;

    Ok(Request {
        path,
        name: options.name,
        data: options.data,
        value_type,
        recursive: options.recursive.unwrap_or(false),
        format: options.format.unwrap_or(defaults.format),
        lowercase: options.lowercase.unwrap_or(defaults.lowercase),
        view: options.view.unwrap_or(defaults.view),
        values_key: defaults.values_key.clone(),
        custom: options.custom,
    })
}
