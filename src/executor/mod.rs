//! Process execution for `reg.exe`.
//!
//! Every registry command goes through [`Executor::execute`], which
//! classifies the outcome into output, "absent" or an error. The process
//! itself is started through the [`ProcessSpawner`] trait so hosts and tests
//! can substitute their own launcher.

mod calibration;

pub use calibration::{
    first_line, Calibration, DEFAULT_NOT_FOUND, DEFAULT_VALUE_NAME, DEFAULT_VALUE_NOT_SET,
};

use std::fmt;
use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::command::{PROBE_DEFAULT_VALUE, PROBE_NOT_FOUND};
use crate::error::{RegError, RegResult};
#[cfg(feature = "observability")]
use crate::observability::CommandLog;

/// Default registry tool.
pub const DEFAULT_PROGRAM: &str = "reg.exe";

/// Default shell used for code page changes.
pub const DEFAULT_SHELL: &str = "cmd.exe";

/// UTF-8 code page.
pub const UTF8_CODE_PAGE: u32 = 65001;

/// Captured output of one process run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Standard output, decoded lossily.
    pub stdout: String,
    /// Standard error, decoded lossily.
    pub stderr: String,
    /// Exit code, `None` if the process was killed by a signal.
    pub status: Option<i32>,
}

impl ProcessOutput {
    /// Successful run printing `stdout`.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            status: Some(0),
        }
    }

    /// Failed run printing `stderr`.
    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            status: Some(1),
        }
    }

    /// Whether the process exited with status 0.
    pub fn succeeded(&self) -> bool {
        self.status == Some(0)
    }
}

/// Starts external processes and collects their output.
#[async_trait]
pub trait ProcessSpawner: Send + Sync {
    /// Run `program` with `args` to completion.
    async fn run(&self, program: &str, args: &[String]) -> RegResult<ProcessOutput>;
}

/// Spawns real processes with `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct TokioSpawner {
    timeout: Option<Duration>,
}

impl TokioSpawner {
    /// Spawner without a time limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawner that kills processes running longer than `limit`.
    pub fn with_timeout(limit: Duration) -> Self {
        Self {
            timeout: Some(limit),
        }
    }

    /// Configured time limit.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait]
impl ProcessSpawner for TokioSpawner {
    async fn run(&self, program: &str, args: &[String]) -> RegResult<ProcessOutput> {
        let mut cmd = TokioCommand::new(program);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => match timeout(limit, cmd.output()).await {
                Ok(output) => output,
                Err(_) => {
                    return Err(RegError::process(format!(
                        "Command timed out after {} seconds",
                        limit.as_secs()
                    )))
                }
            },
            None => cmd.output().await,
        }
        .map_err(|e| RegError::process(format!("Failed to execute {}: {}", program, e)))?;

        Ok(ProcessOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        })
    }
}

/// Runs `reg.exe` commands and classifies their outcome.
pub struct Executor {
    spawner: Arc<dyn ProcessSpawner>,
    program: String,
    shell: String,
    calibration: OnceCell<Calibration>,
    last_code_page: Mutex<Option<u32>>,
    #[cfg(feature = "observability")]
    command_log: Option<Arc<CommandLog>>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("program", &self.program)
            .field("shell", &self.shell)
            .field("calibration", &self.calibration.get())
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Executor running `reg.exe` through `spawner`.
    pub fn new(spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self {
            spawner,
            program: DEFAULT_PROGRAM.to_string(),
            shell: DEFAULT_SHELL.to_string(),
            calibration: OnceCell::new(),
            last_code_page: Mutex::new(None),
            #[cfg(feature = "observability")]
            command_log: None,
        }
    }

    /// The process-wide executor used by `Registry::new()`, created on first
    /// use with a [`TokioSpawner`].
    pub fn shared() -> Arc<Executor> {
        static SHARED: OnceLock<Arc<Executor>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(Executor::new(Arc::new(TokioSpawner::new()))))
            .clone()
    }

    /// Use another registry tool binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Use another shell for `chcp.com`.
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Skip the probes and use known localized strings.
    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = OnceCell::from(calibration);
        self
    }

    /// Append every command to a markdown audit log.
    ///
    /// Writes the session header right away, so attach the log after
    /// choosing the program and shell.
    #[cfg(feature = "observability")]
    pub fn with_command_log(mut self, log: Arc<CommandLog>) -> Self {
        let settings = std::collections::HashMap::from([
            ("shell".to_string(), serde_json::Value::from(self.shell.as_str())),
            (
                "calibrated".to_string(),
                serde_json::Value::Bool(self.calibration.initialized()),
            ),
        ]);
        if let Err(e) = log.log_session_start(&self.program, &settings) {
            warn!(error = %e, "failed to write command log");
        }
        self.command_log = Some(log);
        self
    }

    /// Registry tool binary.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Localized strings, probing the tool on first use.
    ///
    /// Concurrent first callers share one probe run. A failed probe is not
    /// remembered; the next call probes again.
    pub async fn calibration(&self) -> RegResult<&Calibration> {
        self.calibration.get_or_try_init(|| self.calibrate()).await
    }

    async fn calibrate(&self) -> RegResult<Calibration> {
        let not_found_args: Vec<String> = PROBE_NOT_FOUND.iter().map(|s| s.to_string()).collect();
        let default_args: Vec<String> =
            PROBE_DEFAULT_VALUE.iter().map(|s| s.to_string()).collect();

        let (not_found, default_value) = futures_util::future::try_join(
            self.spawner.run(&self.program, &not_found_args),
            self.spawner.run(&self.program, &default_args),
        )
        .await?;

        let calibration = Calibration::from_probes(&not_found.stderr, &default_value.stdout);
        debug!(
            not_found = %calibration.not_found,
            default_name = %calibration.default_name,
            value_not_set = %calibration.value_not_set,
            "calibrated reg.exe messages"
        );

        #[cfg(feature = "observability")]
        if let Some(log) = &self.command_log {
            if let Err(e) = log.log_calibration(&calibration) {
                warn!(error = %e, "failed to write command log");
            }
        }

        Ok(calibration)
    }

    /// Run one `reg.exe` command.
    ///
    /// Returns `Ok(None)` when the tool reports that the key or value does
    /// not exist.
    pub async fn execute(&self, args: &[String]) -> RegResult<Option<String>> {
        let calibration = self.calibration().await?;
        let command_line = format!("reg {}", args.join(" "));
        debug!(command = %command_line, "executing");

        let output = match self.spawner.run(&self.program, args).await {
            Ok(output) => output,
            Err(e) => {
                self.record_error(&command_line, &e);
                return Err(e);
            }
        };
        let result = classify(&output, calibration, &command_line);
        self.record(&command_line, &output, &result);
        result
    }

    #[cfg(feature = "observability")]
    fn record(&self, command_line: &str, output: &ProcessOutput, result: &RegResult<Option<String>>) {
        let Some(log) = &self.command_log else {
            return;
        };
        let outcome = match result {
            Ok(Some(_)) => "ok",
            Ok(None) => "not found",
            Err(_) => "error",
        };
        if let Err(e) = log.log_command(command_line, output, outcome) {
            warn!(error = %e, "failed to write command log");
        }
        if let Err(error) = result {
            self.record_error(command_line, error);
        }
    }

    #[cfg(feature = "observability")]
    fn record_error(&self, command_line: &str, error: &RegError) {
        let Some(log) = &self.command_log else {
            return;
        };
        let context = std::collections::HashMap::from([(
            "command".to_string(),
            serde_json::Value::from(command_line),
        )]);
        if let Err(e) = log.log_error(&error.to_string(), Some(&context)) {
            warn!(error = %e, "failed to write command log");
        }
    }

    #[cfg(not(feature = "observability"))]
    fn record(&self, _command_line: &str, _output: &ProcessOutput, _result: &RegResult<Option<String>>) {}

    #[cfg(not(feature = "observability"))]
    fn record_error(&self, _command_line: &str, _error: &RegError) {}

    /// Active console code page.
    pub async fn code_page(&self) -> RegResult<u32> {
        let output = self.spawner.run(&self.shell, &chcp_args(None)).await?;
        parse_code_page(&output.stdout)
            .ok_or_else(|| RegError::process("Can't get current code page"))
    }

    /// Switch the console code page.
    pub async fn set_code_page(&self, code_page: u32) -> RegResult<()> {
        let invalid = || RegError::config(format!("Invalid code page: {}", code_page));
        let output = self
            .spawner
            .run(&self.shell, &chcp_args(Some(code_page)))
            .await
            .map_err(|_| invalid())?;
        if !output.stderr.trim().is_empty() || !output.succeeded() {
            return Err(invalid());
        }
        Ok(())
    }

    /// Switch to UTF-8, remembering the current code page.
    ///
    /// Returns `false` if unicode mode was already on.
    pub async fn enable_unicode(&self) -> RegResult<bool> {
        let mut last = self.last_code_page.lock().await;
        if last.is_some() {
            return Ok(false);
        }
        let current = self.code_page().await?;
        self.set_code_page(UTF8_CODE_PAGE).await?;
        *last = Some(current);
        debug!(previous = current, "enabled unicode code page");
        Ok(true)
    }

    /// Restore the code page saved by [`Executor::enable_unicode`].
    ///
    /// Returns `false` if unicode mode was not on.
    pub async fn disable_unicode(&self) -> RegResult<bool> {
        let mut last = self.last_code_page.lock().await;
        let Some(previous) = *last else {
            return Ok(false);
        };
        self.set_code_page(previous).await?;
        *last = None;
        debug!(restored = previous, "disabled unicode code page");
        Ok(true)
    }
}

fn classify(
    output: &ProcessOutput,
    calibration: &Calibration,
    command_line: &str,
) -> RegResult<Option<String>> {
    if let Some(line) = first_line(&output.stderr) {
        if calibration.is_not_found(&output.stderr) {
            debug!(command = %command_line, "key or value not found");
            return Ok(None);
        }
        return Err(RegError::external(error_message(line), command_line));
    }
    if !output.succeeded() {
        let status = output
            .status
            .map_or_else(|| "a signal".to_string(), |code| format!("status {}", code));
        return Err(RegError::external(
            format!("Process ended with {} without an error message", status),
            command_line,
        ));
    }
    Ok(Some(output.stdout.clone()))
}

/// Drop the localized `ERROR:` style prefix of a tool error line.
fn error_message(line: &str) -> &str {
    match line.split_once(": ") {
        Some((prefix, message)) if !prefix.is_empty() && prefix.chars().all(char::is_uppercase) => {
            message
        }
        _ => line,
    }
}

fn chcp_args(code_page: Option<u32>) -> Vec<String> {
    let mut args = vec!["/c".to_string(), "chcp.com".to_string()];
    if let Some(code_page) = code_page {
        args.push(code_page.to_string());
    }
    args
}

/// Read the number out of `Active code page: 437` (any language).
fn parse_code_page(stdout: &str) -> Option<u32> {
    stdout
        .split(':')
        .nth(1)?
        .trim()
        .trim_end_matches('.')
        .parse()
        .ok()
}

#[cfg(test)]
mod tests;
