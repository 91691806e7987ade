//! Locale calibration.
//!
//! `reg.exe` prints localized messages, so the "not found" error line and the
//! names used for the default value are learned from two probe commands
//! before the first real call.

use tracing::warn;

/// English "not found" error line.
pub const DEFAULT_NOT_FOUND: &str =
    "ERROR: The system was unable to find the specified registry key or value.";

/// English name of the default value.
pub const DEFAULT_VALUE_NAME: &str = "(Default)";

/// English data placeholder of a value without data.
pub const DEFAULT_VALUE_NOT_SET: &str = "(value not set)";

/// Localized strings needed to classify and parse output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calibration {
    /// First stderr line reported for a missing key or value.
    pub not_found: String,
    /// Name printed for the default value, e.g. `(Default)`.
    pub default_name: String,
    /// Data printed for a value without data, e.g. `(value not set)`.
    pub value_not_set: String,
}

impl Default for Calibration {
    fn default() -> Self {
        Self::english()
    }
}

impl Calibration {
    /// The strings printed by an English installation.
    pub fn english() -> Self {
        Self {
            not_found: DEFAULT_NOT_FOUND.to_string(),
            default_name: DEFAULT_VALUE_NAME.to_string(),
            value_not_set: DEFAULT_VALUE_NOT_SET.to_string(),
        }
    }

    /// Build a calibration from the stderr of the not-found probe and the
    /// stdout of the default-value probe. Missing pieces fall back to English.
    pub fn from_probes(not_found_stderr: &str, default_stdout: &str) -> Self {
        let not_found = match first_line(not_found_stderr) {
            Some(line) => line.to_string(),
            None => {
                warn!("not-found probe printed nothing, assuming English messages");
                DEFAULT_NOT_FOUND.to_string()
            }
        };

        let (default_name, value_not_set) = parse_default_line(default_stdout);
        let default_name = default_name.unwrap_or_else(|| {
            warn!("default-value probe gave no value name, assuming English");
            DEFAULT_VALUE_NAME.to_string()
        });
        let value_not_set = value_not_set.unwrap_or_else(|| {
            warn!("default-value probe gave no not-set marker, assuming English");
            DEFAULT_VALUE_NOT_SET.to_string()
        });

        Self {
            not_found,
            default_name,
            value_not_set,
        }
    }

    /// Whether `stderr` reports a missing key or value.
    pub fn is_not_found(&self, stderr: &str) -> bool {
        first_line(stderr) == Some(self.not_found.as_str())
    }
}

/// First non-empty line of tool output, surrounding whitespace removed.
pub fn first_line(output: &str) -> Option<&str> {
    output
        .trim()
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

fn parse_default_line(stdout: &str) -> (Option<String>, Option<String>) {
    let Some(line) = stdout.lines().find(|line| line.starts_with("    ")) else {
        return (None, None);
    };
    let line = line.trim_end_matches('\r');
    let mut fields = line[4..].splitn(3, "    ");
    let name = fields.next().filter(|name| is_bracketed(name));
    let _value_type = fields.next();
    let data = fields.next().filter(|data| is_bracketed(data));
    (name.map(str::to_string), data.map(str::to_string))
}

fn is_bracketed(text: &str) -> bool {
    text.len() > 2 && text.starts_with('(') && text.ends_with(')')
}
