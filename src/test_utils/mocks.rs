//! Scripted process spawner for testing

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::RegResult;
use crate::executor::{ProcessOutput, ProcessSpawner};

/// One recorded process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Program that was started.
    pub program: String,
    /// Arguments, program excluded.
    pub args: Vec<String>,
}

impl RecordedCall {
    /// Whether this call used exactly `args`.
    pub fn matches(&self, args: &[&str]) -> bool {
        self.args.len() == args.len() && self.args.iter().zip(args).all(|(a, b)| a == b)
    }
}

/// Process spawner answering from a script.
///
/// Calls whose arguments match a rule registered with [`MockSpawner::respond_to`]
/// get that rule's output every time. Other calls consume queued responses in
/// order, then fall back to an empty successful output.
#[derive(Clone, Default)]
pub struct MockSpawner {
    rules: Arc<Mutex<Vec<(Vec<String>, ProcessOutput)>>>,
    queue: Arc<Mutex<VecDeque<RegResult<ProcessOutput>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockSpawner {
    /// Spawner with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call with exactly `args` with `output`.
    pub fn respond_to(self, args: &[&str], output: ProcessOutput) -> Self {
        lock(&self.rules).push((args.iter().map(|a| a.to_string()).collect(), output));
        self
    }

    /// Answer the two locale probes like an English installation.
    pub fn with_english_probes(self) -> Self {
        self.respond_to(
            &["QUERY", "HKLM\\NONEXISTENT"],
            ProcessOutput::failure(format!("{}\r\n", crate::executor::DEFAULT_NOT_FOUND)),
        )
        .respond_to(
            &["QUERY", "HKCR", "/ve"],
            ProcessOutput::success(
                "\r\nHKEY_CLASSES_ROOT\r\n    (Default)    REG_SZ    (value not set)\r\n\r\n",
            ),
        )
    }

    /// Queue the next unmatched response.
    pub fn push_output(&self, output: ProcessOutput) {
        lock(&self.queue).push_back(Ok(output));
    }

    /// Queue a spawn failure.
    pub fn push_error(&self, error: crate::error::RegError) {
        lock(&self.queue).push_back(Err(error));
    }

    /// Every call made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls made with exactly `args`.
    pub fn count_calls(&self, args: &[&str]) -> usize {
        lock(&self.calls).iter().filter(|call| call.matches(args)).count()
    }
}

#[async_trait]
impl ProcessSpawner for MockSpawner {
    async fn run(&self, program: &str, args: &[String]) -> RegResult<ProcessOutput> {
        lock(&self.calls).push(RecordedCall {
            program: program.to_string(),
            args: args.to_vec(),
        });

        let rule = lock(&self.rules)
            .iter()
            .find(|(expected, _)| expected.as_slice() == args)
            .map(|(_, output)| output.clone());
        if let Some(output) = rule {
            return Ok(output);
        }

        lock(&self.queue)
            .pop_front()
            .unwrap_or_else(|| Ok(ProcessOutput::success("")))
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
