//! Registry key path handling.
//!
//! Paths accept both `/` and `\` separators and either the short (`HKLM`) or
//! the long (`HKEY_LOCAL_MACHINE`) spelling of the root. `reg.exe` accepts
//! both spellings but always prints the long one.

use std::fmt;

use crate::error::{RegError, RegResult};

/// Separator between key path segments.
pub const SEPARATOR: char = '\\';

/// One of the five top-level registry roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hive {
    /// `HKLM` / `HKEY_LOCAL_MACHINE`
    LocalMachine,
    /// `HKCU` / `HKEY_CURRENT_USER`
    CurrentUser,
    /// `HKCR` / `HKEY_CLASSES_ROOT`
    ClassesRoot,
    /// `HKU` / `HKEY_USERS`
    Users,
    /// `HKCC` / `HKEY_CURRENT_CONFIG`
    CurrentConfig,
}

impl Hive {
    /// All known roots.
    pub const ALL: [Hive; 5] = [
        Hive::LocalMachine,
        Hive::CurrentUser,
        Hive::ClassesRoot,
        Hive::Users,
        Hive::CurrentConfig,
    ];

    /// Short alias, e.g. `HKLM`.
    pub fn short(self) -> &'static str {
        match self {
            Hive::LocalMachine => "HKLM",
            Hive::CurrentUser => "HKCU",
            Hive::ClassesRoot => "HKCR",
            Hive::Users => "HKU",
            Hive::CurrentConfig => "HKCC",
        }
    }

    /// Fully spelled name, e.g. `HKEY_LOCAL_MACHINE`.
    pub fn long(self) -> &'static str {
        match self {
            Hive::LocalMachine => "HKEY_LOCAL_MACHINE",
            Hive::CurrentUser => "HKEY_CURRENT_USER",
            Hive::ClassesRoot => "HKEY_CLASSES_ROOT",
            Hive::Users => "HKEY_USERS",
            Hive::CurrentConfig => "HKEY_CURRENT_CONFIG",
        }
    }

    /// Resolve either spelling, ignoring ASCII case.
    pub fn from_token(token: &str) -> Option<Hive> {
        Self::ALL.into_iter().find(|hive| {
            token.eq_ignore_ascii_case(hive.short()) || token.eq_ignore_ascii_case(hive.long())
        })
    }
}

impl fmt::Display for Hive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

/// Normalize a user supplied key path.
///
/// Trims surrounding whitespace, turns forward slashes into backslashes and
/// strips trailing separators. The result is a fixed point: canonicalizing it
/// again changes nothing.
pub fn canonicalize(path: &str) -> String {
    path.replace('/', "\\")
        .trim_start()
        .trim_end_matches(|c: char| c == SEPARATOR || c.is_whitespace())
        .to_string()
}

/// Convert a long root name into its short alias. Unknown tokens are returned
/// unchanged.
pub fn shorten_root(token: &str) -> String {
    match Hive::from_token(token) {
        Some(hive) => hive.short().to_string(),
        None => token.to_string(),
    }
}

/// Convert a short root alias into the full name. Unknown tokens are returned
/// unchanged.
pub fn extend_root(token: &str) -> String {
    match Hive::from_token(token) {
        Some(hive) => hive.long().to_string(),
        None => token.to_string(),
    }
}

/// Split a path into its root token and the remainder (without the separator).
pub fn split_root(path: &str) -> (&str, &str) {
    match path.split_once(SEPARATOR) {
        Some((root, rest)) => (root, rest),
        None => (path, ""),
    }
}

/// Replace the root token of `path` with its short alias.
pub fn shorten_key_path(path: &str) -> String {
    let (root, rest) = split_root(path);
    rejoin(&shorten_root(root), rest)
}

/// Replace the root token of `path` with its full name.
///
/// The output of `reg.exe` always uses full names, so this is the form the
/// parser compares against.
pub fn extend_key_path(path: &str) -> String {
    let (root, rest) = split_root(path);
    rejoin(&extend_root(root), rest)
}

/// Append a child segment (or relative path) to a key path.
pub fn join(base: &str, child: &str) -> String {
    if child.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        return child.to_string();
    }
    format!("{}{}{}", base, SEPARATOR, child)
}

/// Resolve the root of a canonical path, failing for unknown roots.
pub fn hive_of(path: &str) -> RegResult<Hive> {
    let (root, _) = split_root(path);
    Hive::from_token(root).ok_or_else(|| {
        let known: Vec<&str> = Hive::ALL.iter().map(|hive| hive.short()).collect();
        RegError::config(format!(
            "Invalid hive '{}', use one of the following: {}",
            root,
            known.join(", ")
        ))
    })
}

/// Canonicalize a key path and respell its root as the short alias.
///
/// `hkcu/Software/`, `HKEY_CURRENT_USER\Software` and `HKCU\Software` all
/// resolve to `HKCU\Software`. Fails for unknown roots.
pub fn resolve_key_path(path: &str) -> RegResult<(Hive, String)> {
    let canonical = canonicalize(path);
    let hive = hive_of(&canonical)?;
    let (_, rest) = split_root(&canonical);
    Ok((hive, rejoin(hive.short(), rest)))
}

fn rejoin(root: &str, rest: &str) -> String {
    if rest.is_empty() {
        root.to_string()
    } else {
        format!("{}{}{}", root, SEPARATOR, rest)
    }
}
