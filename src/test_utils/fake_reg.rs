//! In-memory emulation of `reg.exe` and `chcp.com`.
//!
//! The emulator answers `query`, `add` and `delete` with the same text
//! layout, error lines and exit codes as the real tool, so the whole stack
//! above the process seam can be exercised on any platform.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::mocks::{lock, RecordedCall};
use crate::error::RegResult;
use crate::executor::{ProcessOutput, ProcessSpawner};
use crate::path::{self, Hive};

const CODE_PAGES: [u32; 8] = [437, 850, 852, 866, 932, 1250, 1252, 65001];

/// Localized strings printed by the emulated tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    /// Error line for a missing key or value.
    pub not_found: String,
    /// Name printed for the default value.
    pub default_name: String,
    /// Data printed for a default value without data.
    pub value_not_set: String,
    /// Summary line of recursive queries, `{}` is the match count.
    pub end_of_search: String,
    /// Prefix of `chcp.com` output.
    pub active_code_page: String,
}

impl Locale {
    /// Strings of an English installation.
    pub fn english() -> Self {
        Self {
            not_found: "ERROR: The system was unable to find the specified registry key or value."
                .to_string(),
            default_name: "(Default)".to_string(),
            value_not_set: "(value not set)".to_string(),
            end_of_search: "End of search: {} match(es) found.".to_string(),
            active_code_page: "Active code page".to_string(),
        }
    }

    /// Strings of a German installation.
    pub fn german() -> Self {
        Self {
            not_found:
                "FEHLER: Der angegebene Registrierungsschlüssel bzw. Wert wurde nicht gefunden."
                    .to_string(),
            default_name: "(Standard)".to_string(),
            value_not_set: "(Wert nicht festgelegt)".to_string(),
            end_of_search: "Suche beendet: {} Übereinstimmung(en) gefunden.".to_string(),
            active_code_page: "Aktive Codepage".to_string(),
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::english()
    }
}

#[derive(Debug, Clone)]
struct StoredValue {
    name: String,
    value_type: String,
    data: String,
}

#[derive(Debug, Clone)]
struct StoredKey {
    display: String,
    values: Vec<StoredValue>,
}

impl StoredKey {
    fn new(display: String) -> Self {
        Self {
            display,
            values: Vec::new(),
        }
    }

    fn value(&self, name: &str) -> Option<&StoredValue> {
        self.values
            .iter()
            .find(|value| value.name.eq_ignore_ascii_case(name))
    }

    fn set(&mut self, value: StoredValue) {
        match self
            .values
            .iter_mut()
            .find(|existing| existing.name.eq_ignore_ascii_case(&value.name))
        {
            Some(existing) => {
                existing.value_type = value.value_type;
                existing.data = value.data;
            }
            None => self.values.push(value),
        }
    }

    fn remove(&mut self, name: &str) -> bool {
        let before = self.values.len();
        self.values.retain(|value| !value.name.eq_ignore_ascii_case(name));
        before != self.values.len()
    }
}

#[derive(Debug, Default)]
struct FakeState {
    /// Keys of the 64-bit (default) and the 32-bit view, by lowercase long path.
    views: [BTreeMap<String, StoredKey>; 2],
    code_page: u32,
}

/// Which value a command addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selector {
    Key,
    Default,
    Named(String),
    All,
}

#[derive(Debug, Default)]
struct Parsed {
    path: String,
    selector: Option<Selector>,
    recursive: bool,
    value_type: Option<String>,
    data: Option<String>,
    view: usize,
}

/// In-memory `reg.exe`.
#[derive(Debug, Clone)]
pub struct FakeRegExe {
    state: Arc<Mutex<FakeState>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    locale: Locale,
    latency: Option<Duration>,
}

impl Default for FakeRegExe {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRegExe {
    /// Empty registry printing English messages.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                code_page: 437,
                ..FakeState::default()
            })),
            calls: Arc::new(Mutex::new(Vec::new())),
            locale: Locale::english(),
            latency: None,
        }
    }

    /// Print the strings of another locale.
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Delay every answer, to widen concurrency windows in tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls made with exactly `args`.
    pub fn count_calls(&self, args: &[&str]) -> usize {
        lock(&self.calls).iter().filter(|call| call.matches(args)).count()
    }

    /// Current emulated console code page.
    pub fn code_page(&self) -> u32 {
        lock(&self.state).code_page
    }

    /// Whether a key exists in the default view.
    pub fn key_exists(&self, key_path: &str) -> bool {
        let state = lock(&self.state);
        match resolve(key_path) {
            Some((lower, _, is_root)) => is_root || state.views[0].contains_key(&lower),
            None => false,
        }
    }

    fn answer(&self, program: &str, args: &[String]) -> ProcessOutput {
        if args.iter().any(|arg| arg.eq_ignore_ascii_case("chcp.com")) {
            return self.chcp(args);
        }
        if !program.to_ascii_lowercase().starts_with("reg") {
            return ProcessOutput::failure(format!("'{}' is not recognized as a command\r\n", program));
        }

        let Some((verb, rest)) = args.split_first() else {
            return invalid_syntax("REG");
        };
        let verb = verb.to_ascii_uppercase();
        let parsed = match parse_args(rest) {
            Some(parsed) => parsed,
            None => return invalid_syntax(&verb),
        };
        let Some((lower, display, is_root)) = resolve(&parsed.path) else {
            return ProcessOutput::failure("ERROR: Invalid key name.\r\n");
        };

        let mut state = lock(&self.state);
        let keys = &mut state.views[parsed.view];
        match verb.as_str() {
            "QUERY" => self.query(keys, &parsed, &lower, &display, is_root),
            "ADD" => self.add(keys, &parsed, &lower, &display),
            "DELETE" => self.delete(keys, &parsed, &lower, is_root),
            _ => invalid_syntax(&verb),
        }
    }

    fn not_found(&self) -> ProcessOutput {
        ProcessOutput::failure(format!("{}\r\n", self.locale.not_found))
    }

    fn query(
        &self,
        keys: &BTreeMap<String, StoredKey>,
        parsed: &Parsed,
        lower: &str,
        display: &str,
        is_root: bool,
    ) -> ProcessOutput {
        let root_key = StoredKey::new(display.to_string());
        let key = match keys.get(lower) {
            Some(key) => key,
            None if is_root => &root_key,
            None => return self.not_found(),
        };

        let mut lines = vec![String::new(), key.display.clone()];
        match parsed.selector.clone().unwrap_or(Selector::Key) {
            Selector::Default => match key.value("") {
                Some(value) => lines.push(self.value_line(value)),
                None => lines.push(format!(
                    "    {}    REG_SZ    {}",
                    self.locale.default_name, self.locale.value_not_set
                )),
            },
            Selector::Named(name) => match key.value(&name) {
                Some(value) => lines.push(self.value_line(value)),
                None => return self.not_found(),
            },
            Selector::All => return invalid_syntax("QUERY"),
            Selector::Key if parsed.recursive => {
                lines.pop();
                let mut matches = 0;
                self.emit_recursive(keys, lower, key, &mut lines, &mut matches);
                lines.push(self.locale.end_of_search.replace("{}", &matches.to_string()));
                return ProcessOutput::success(join_lines(&lines));
            }
            Selector::Key => {
                lines.extend(key.values.iter().map(|value| self.value_line(value)));
                let children = children_of(keys, lower);
                if !children.is_empty() {
                    lines.push(String::new());
                    lines.extend(children.into_iter().map(|child| child.display.clone()));
                }
            }
        }
        lines.push(String::new());
        ProcessOutput::success(join_lines(&lines))
    }

    fn emit_recursive(
        &self,
        keys: &BTreeMap<String, StoredKey>,
        lower: &str,
        key: &StoredKey,
        lines: &mut Vec<String>,
        matches: &mut usize,
    ) {
        lines.push(key.display.clone());
        *matches += 1;
        for value in &key.values {
            lines.push(self.value_line(value));
            *matches += 1;
        }
        lines.push(String::new());
        for child in children_of(keys, lower) {
            let child_lower = child.display.to_lowercase();
            self.emit_recursive(keys, &child_lower, child, lines, matches);
        }
    }

    fn value_line(&self, value: &StoredValue) -> String {
        let name = if value.name.is_empty() {
            self.locale.default_name.as_str()
        } else {
            value.name.as_str()
        };
        format!("    {}    {}    {}", name, value.value_type, value.data)
    }

    fn add(
        &self,
        keys: &mut BTreeMap<String, StoredKey>,
        parsed: &Parsed,
        lower: &str,
        display: &str,
    ) -> ProcessOutput {
        let value_type = parsed
            .value_type
            .clone()
            .unwrap_or_else(|| "REG_SZ".to_string())
            .to_ascii_uppercase();
        let raw = parsed.data.clone().unwrap_or_default();
        let Some(data) = store_data(&value_type, &raw) else {
            return invalid_syntax("ADD");
        };

        let (name, stamp_default) = match parsed.selector.clone().unwrap_or(Selector::Key) {
            Selector::Key => (String::new(), true),
            Selector::Default => (String::new(), false),
            Selector::Named(name) => (name, false),
            Selector::All => return invalid_syntax("ADD"),
        };

        ensure_key(keys, lower, display);
        if let Some(key) = keys.get_mut(lower) {
            if stamp_default {
                key.set(StoredValue {
                    name,
                    value_type: "REG_SZ".to_string(),
                    data: String::new(),
                });
            } else {
                key.set(StoredValue {
                    name,
                    value_type,
                    data,
                });
            }
        }
        ProcessOutput::success("The operation completed successfully.\r\n")
    }

    fn delete(
        &self,
        keys: &mut BTreeMap<String, StoredKey>,
        parsed: &Parsed,
        lower: &str,
        is_root: bool,
    ) -> ProcessOutput {
        let selector = parsed.selector.clone().unwrap_or(Selector::Key);
        if selector == Selector::Key {
            if is_root {
                return ProcessOutput::failure("ERROR: Access is denied.\r\n");
            }
            if !keys.contains_key(lower) {
                return self.not_found();
            }
            let prefix = format!("{}\\", lower);
            keys.retain(|candidate, _| candidate != lower && !candidate.starts_with(&prefix));
            return ProcessOutput::success("The operation completed successfully.\r\n");
        }

        let Some(key) = keys.get_mut(lower) else {
            return self.not_found();
        };
        let removed = match selector {
            Selector::Default => key.remove(""),
            Selector::Named(name) => key.remove(&name),
            Selector::All => {
                key.values.clear();
                true
            }
            Selector::Key => false,
        };
        if removed {
            ProcessOutput::success("The operation completed successfully.\r\n")
        } else {
            self.not_found()
        }
    }

    fn chcp(&self, args: &[String]) -> ProcessOutput {
        let mut state = lock(&self.state);
        let requested = args
            .iter()
            .skip_while(|arg| !arg.eq_ignore_ascii_case("chcp.com"))
            .nth(1);
        match requested {
            None => ProcessOutput::success(format!(
                "{}: {}\r\n",
                self.locale.active_code_page, state.code_page
            )),
            Some(raw) => match raw.parse::<u32>() {
                Ok(code_page) if CODE_PAGES.contains(&code_page) => {
                    state.code_page = code_page;
                    ProcessOutput::success(format!(
                        "{}: {}\r\n",
                        self.locale.active_code_page, code_page
                    ))
                }
                _ => ProcessOutput::failure("Invalid code page\r\n"),
            },
        }
    }
}

#[async_trait]
impl ProcessSpawner for FakeRegExe {
    async fn run(&self, program: &str, args: &[String]) -> RegResult<ProcessOutput> {
        lock(&self.calls).push(RecordedCall {
            program: program.to_string(),
            args: args.to_vec(),
        });
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.answer(program, args))
    }
}

fn invalid_syntax(verb: &str) -> ProcessOutput {
    ProcessOutput::failure(format!(
        "ERROR: Invalid syntax.\r\nType \"REG {} /?\" for usage.\r\n",
        verb
    ))
}

fn join_lines(lines: &[String]) -> String {
    let mut out = lines.join("\r\n");
    out.push_str("\r\n");
    out
}

/// Lowercase lookup key, display path and whether the path is a bare root.
fn resolve(key_path: &str) -> Option<(String, String, bool)> {
    let canonical = path::canonicalize(key_path);
    let (root, rest) = path::split_root(&canonical);
    let hive = Hive::from_token(root)?;
    let display = if rest.is_empty() {
        hive.long().to_string()
    } else {
        format!("{}\\{}", hive.long(), rest)
    };
    Some((display.to_lowercase(), display, rest.is_empty()))
}

fn parse_args(rest: &[String]) -> Option<Parsed> {
    let (path, flags) = rest.split_first()?;
    let mut parsed = Parsed {
        path: path.clone(),
        ..Parsed::default()
    };
    let mut flags = flags.iter();
    while let Some(flag) = flags.next() {
        match flag.to_ascii_lowercase().as_str() {
            "/s" => parsed.recursive = true,
            "/f" => {}
            "/ve" => parsed.selector = Some(Selector::Default),
            "/va" => parsed.selector = Some(Selector::All),
            "/v" => parsed.selector = Some(Selector::Named(flags.next()?.clone())),
            "/t" => parsed.value_type = Some(flags.next()?.clone()),
            "/d" => parsed.data = Some(flags.next()?.clone()),
            "/reg:32" => parsed.view = 1,
            "/reg:64" => parsed.view = 0,
            _ => return None,
        }
    }
    Some(parsed)
}

/// Normalize written data the way the tool prints it back.
fn store_data(value_type: &str, raw: &str) -> Option<String> {
    match value_type {
        "REG_SZ" | "REG_EXPAND_SZ" | "REG_MULTI_SZ" => Some(raw.to_string()),
        // Stored as a terminated UTF-16 string, printed back as hex.
        "REG_NONE" => {
            let bytes: Vec<u8> = raw
                .encode_utf16()
                .chain(std::iter::once(0))
                .flat_map(u16::to_le_bytes)
                .collect();
            Some(hex::encode_upper(bytes))
        }
        "REG_DWORD" => {
            let n = parse_number(raw)?;
            u32::try_from(n).ok().map(|n| format!("0x{:x}", n))
        }
        "REG_QWORD" => parse_number(raw).map(|n| format!("0x{:x}", n)),
        "REG_BINARY" => {
            let valid = raw.len() % 2 == 0 && raw.chars().all(|c| c.is_ascii_hexdigit());
            valid.then(|| raw.to_ascii_uppercase())
        }
        _ => None,
    }
}

fn parse_number(raw: &str) -> Option<u64> {
    if raw.is_empty() {
        return Some(0);
    }
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(digits) => u64::from_str_radix(digits, 16).ok(),
        None => raw.parse().ok(),
    }
}

/// Create `lower` and every missing ancestor below the root.
fn ensure_key(keys: &mut BTreeMap<String, StoredKey>, lower: &str, display: &str) {
    let segments: Vec<&str> = display.split('\\').collect();
    for depth in 2..segments.len() {
        let ancestor_display = segments[..depth].join("\\");
        keys.entry(ancestor_display.to_lowercase())
            .or_insert_with(|| StoredKey::new(ancestor_display));
    }
    keys.entry(lower.to_string())
        .or_insert_with(|| StoredKey::new(display.to_string()));
}

fn children_of<'a>(keys: &'a BTreeMap<String, StoredKey>, lower: &str) -> Vec<&'a StoredKey> {
    let prefix = format!("{}\\", lower);
    keys.iter()
        .filter(|(candidate, _)| {
            candidate
                .strip_prefix(&prefix)
                .is_some_and(|rest| !rest.is_empty() && !rest.contains('\\'))
        })
        .map(|(_, key)| key)
        .collect()
}
