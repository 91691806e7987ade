//! Markdown audit log of registry commands.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, Level};

use crate::executor::{Calibration, ProcessOutput};

/// Longest stdout/stderr excerpt written per command.
const EXCERPT_LIMIT: usize = 2000;

/// Audit log of the commands an executor runs.
///
/// Creates a markdown file with a session header followed by one entry per
/// command, calibration result and error.
///
/// Entries are filtered by level. Errors are written at `ERROR`, sessions,
/// commands and calibration at `INFO`, command stdout only at `DEBUG`.
#[derive(Debug)]
pub struct CommandLog {
    log_file: PathBuf,
    log_level: String,
    max_level: Level,
    write_lock: Mutex<()>,
}

impl CommandLog {
    /// Initialize the log.
    ///
    /// # Arguments
    /// * `log_file` - Path to log file. If None, creates a timestamped file in temp directory.
    /// * `log_level` - Logging level (defaults to "INFO"). Unknown levels fall back to "INFO".
    pub fn new(log_file: Option<&Path>, log_level: Option<&str>) -> Result<Self> {
        let log_file = match log_file {
            Some(p) => p.to_path_buf(),
            None => std::env::temp_dir().join("regkit-logs").join(format!(
                "regkit_{}_{}.md",
                Utc::now().timestamp_millis(),
                std::process::id()
            )),
        };

        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }

        let log_level = log_level.unwrap_or("INFO").to_string();
        let max_level = log_level.parse::<Level>().unwrap_or(Level::INFO);
        let log = Self {
            log_file,
            log_level,
            max_level,
            write_lock: Mutex::new(()),
        };

        if !log.log_file.exists() {
            log.initialize_log_file()?;
        }

        Ok(log)
    }

    fn initialize_log_file(&self) -> Result<()> {
        let mut file = File::create(&self.log_file)
            .with_context(|| format!("Failed to create log file: {}", self.log_file.display()))?;

        let now: DateTime<Utc> = Utc::now();

        writeln!(file, "# Registry Command Log\n")?;
        writeln!(file, "Log started: {}\n", now.to_rfc3339())?;
        writeln!(file, "---\n")?;

        Ok(())
    }

    fn append_to_log(&self, content: &str) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)
            .with_context(|| format!("Failed to open log file: {}", self.log_file.display()))?;

        write!(file, "{}", content).with_context(|| "Failed to write to log file")?;

        Ok(())
    }

    fn enabled(&self, level: Level) -> bool {
        level <= self.max_level
    }

    /// Log session start.
    ///
    /// # Arguments
    /// * `program` - Registry tool in use.
    /// * `settings` - Client settings worth recording.
    pub fn log_session_start(
        &self,
        program: &str,
        settings: &HashMap<String, serde_json::Value>,
    ) -> Result<()> {
        if !self.enabled(Level::INFO) {
            return Ok(());
        }
        let now: DateTime<Utc> = Utc::now();
        let content = format!(
            "## Session Started - {}\n\n**Program:** {}\n**Settings:** {}\n\n",
            now.to_rfc3339(),
            program,
            serde_json::to_string_pretty(settings).unwrap_or_default()
        );

        self.append_to_log(&content)?;
        info!(program, "registry session started");
        Ok(())
    }

    /// Log one executed command.
    ///
    /// # Arguments
    /// * `command` - Command line as displayed in errors.
    /// * `output` - Captured process output.
    /// * `outcome` - How the output was classified.
    pub fn log_command(&self, command: &str, output: &ProcessOutput, outcome: &str) -> Result<()> {
        if !self.enabled(Level::INFO) {
            return Ok(());
        }
        let now: DateTime<Utc> = Utc::now();
        let status = output
            .status
            .map(|code| code.to_string())
            .unwrap_or_else(|| "none".to_string());
        let mut content = format!(
            "### Command - {}\n\n**Command:** `{}`\n**Status:** {}\n**Outcome:** {}\n\n",
            now.to_rfc3339(),
            command,
            status,
            outcome
        );

        if self.enabled(Level::DEBUG) && !output.stdout.trim().is_empty() {
            content.push_str(&format!("**Stdout:**\n```\n{}\n```\n\n", excerpt(&output.stdout)));
        }
        if !output.stderr.trim().is_empty() {
            content.push_str(&format!("**Stderr:**\n```\n{}\n```\n\n", excerpt(&output.stderr)));
        }

        self.append_to_log(&content)
    }

    /// Log the localized strings detected for this machine.
    pub fn log_calibration(&self, calibration: &Calibration) -> Result<()> {
        if !self.enabled(Level::INFO) {
            return Ok(());
        }
        let now: DateTime<Utc> = Utc::now();
        let sentinels = serde_json::json!({
            "not_found": calibration.not_found,
            "default_name": calibration.default_name,
            "value_not_set": calibration.value_not_set,
        });
        let content = format!(
            "### Calibration - {}\n\n```json\n{}\n```\n\n",
            now.to_rfc3339(),
            serde_json::to_string_pretty(&sentinels).unwrap_or_default()
        );

        self.append_to_log(&content)
    }

    /// Log error with context.
    ///
    /// # Arguments
    /// * `message` - Error message.
    /// * `context` - Additional context information.
    pub fn log_error(
        &self,
        message: &str,
        context: Option<&HashMap<String, serde_json::Value>>,
    ) -> Result<()> {
        let now: DateTime<Utc> = Utc::now();
        let mut content = format!(
            "### Error - {}\n\n**Error:** {}\n\n",
            now.to_rfc3339(),
            message
        );

        if let Some(ctx) = context {
            content.push_str(&format!(
                "**Context:** {}\n\n",
                serde_json::to_string_pretty(ctx).unwrap_or_default()
            ));
        }

        self.append_to_log(&content)?;
        error!("{}", message);
        Ok(())
    }

    /// Get the log file path.
    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Get the log level.
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

fn excerpt(text: &str) -> &str {
    let text = text.trim_end();
    if text.len() <= EXCERPT_LIMIT {
        return text;
    }
    let mut end = EXCERPT_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
