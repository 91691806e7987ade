//! The public registry API.
//!
//! [`Registry`] exposes every verb on any key path; [`RegistryKey`] binds the
//! same verbs to one base key.
//!
//! # Example
//!
//! ```no_run
//! use regkit::args;
//! use regkit::client::Registry;
//! use regkit::value::data_map;
//!
//! # async fn demo() -> regkit::error::RegResult<()> {
//! let registry = Registry::new();
//!
//! registry.set_key(args!["HKCU\\Software\\Vendor"]).await?;
//! registry.set(args!["HKCU\\Software\\Vendor", "Version", 3u32]).await?;
//! registry
//!     .set(args!["HKCU\\Software\\Vendor", data_map([("leader", "X".into())])])
//!     .await?;
//!
//! let values = registry.get_values(args!["HKCU\\Software\\Vendor"]).await?;
//! println!("{:?}", values);
//!
//! registry.delete(args!["HKCU\\Software\\Vendor"]).await?;
//! # Ok(())
//! # }
//! ```

mod key;

pub use key::RegistryKey;

use std::sync::Arc;

use futures_util::future::{try_join, try_join_all};
use tracing::debug;

use crate::command::{self, CommandBuilder, Operation, ValueWrite};
use crate::error::RegResult;
use crate::executor::{Executor, ProcessSpawner};
use crate::options::{normalize, Arg, CallKind, ClientOptions, Format, Options, Request};
use crate::parser::{self, KeyTree, ValueOutput, ValuesOutput};
use crate::path;
use crate::value::Data;

/// Result of [`Registry::get`]: a whole key or a single value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// The call named no value.
    Key(KeyTree),
    /// The call named a value.
    Value(ValueOutput),
}

/// Handle for registry operations.
///
/// Cloning is cheap; clones share the executor and its calibration.
#[derive(Debug, Clone)]
pub struct Registry {
    executor: Arc<Executor>,
    defaults: ClientOptions,
    call_options: Option<Options>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Handle using the process-wide executor and default options.
    pub fn new() -> Self {
        Self::with_executor(Executor::shared())
    }

    /// Handle using a specific executor.
    pub fn with_executor(executor: Arc<Executor>) -> Self {
        Self {
            executor,
            defaults: ClientOptions::default(),
            call_options: None,
        }
    }

    /// Handle running `reg.exe` through `spawner`.
    pub fn with_spawner(spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self::with_executor(Arc::new(Executor::new(spawner)))
    }

    /// New handle with other defaults, sharing this handle's executor.
    pub fn with_defaults(&self, defaults: ClientOptions) -> Self {
        Self {
            executor: self.executor.clone(),
            defaults,
            call_options: self.call_options.clone(),
        }
    }

    /// Build a handle from a loaded configuration.
    #[cfg(feature = "config")]
    pub fn from_config(config: &crate::config::Configuration) -> RegResult<Self> {
        use crate::executor::TokioSpawner;
        use std::time::Duration;

        let spawner = match config.execution.timeout_seconds {
            Some(seconds) => TokioSpawner::with_timeout(Duration::from_secs(seconds)),
            None => TokioSpawner::new(),
        };
        #[allow(unused_mut)]
        let mut executor = Executor::new(Arc::new(spawner))
            .with_program(config.execution.program.as_str())
            .with_shell(config.execution.shell.as_str());

        #[cfg(feature = "observability")]
        if let Some(log_file) = &config.logging.log_file {
            let log = crate::observability::CommandLog::new(
                Some(log_file.as_path()),
                Some(config.logging.log_level.as_str()),
            )
            .map_err(|e| {
                crate::error::RegError::config(format!("Failed to open command log: {:#}", e))
            })?;
            executor = executor.with_command_log(Arc::new(log));
        }

        Ok(Self::with_executor(Arc::new(executor)).with_defaults(config.client_options()?))
    }

    /// Client wide defaults of this handle.
    pub fn defaults(&self) -> &ClientOptions {
        &self.defaults
    }

    /// The executor running commands for this handle.
    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    /// Bind a handle to one key. `options` apply to every call made through
    /// it, below anything passed to the call itself.
    pub fn key(&self, key_path: &str, options: Option<Options>) -> RegResult<RegistryKey> {
        RegistryKey::bind(self, key_path, options)
    }

    pub(crate) fn with_call_options(&self, options: Option<Options>) -> Self {
        Self {
            executor: self.executor.clone(),
            defaults: self.defaults.clone(),
            call_options: options,
        }
    }

    fn request(&self, kind: CallKind, args: Vec<Arg>) -> RegResult<Request> {
        normalize(kind, args, self.call_options.as_ref(), &self.defaults)
    }

    async fn run(&self, operation: Operation, request: &Request) -> RegResult<Option<String>> {
        let mut output = None;
        for args in CommandBuilder::build(operation, request)? {
            output = self.executor.execute(&args).await?;
        }
        Ok(output)
    }

    // Reads

    /// Read a key, or a value when a name is given.
    pub async fn get(&self, args: Vec<Arg>) -> RegResult<Option<Item>> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, name = ?request.name, "get");
        if request.name.is_some() {
            Ok(self.read_value(&request).await?.map(Item::Value))
        } else {
            Ok(self.read_key(&request).await?.map(Item::Key))
        }
    }

    /// Read a key with its values and subkeys (all descendants when
    /// recursive). `None` if the key does not exist.
    pub async fn get_key(&self, args: Vec<Arg>) -> RegResult<Option<KeyTree>> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, recursive = request.recursive, "get_key");
        self.read_key(&request).await
    }

    async fn read_key(&self, request: &Request) -> RegResult<Option<KeyTree>> {
        let Some(raw) = self.run(Operation::QueryKey, request).await? else {
            return Ok(None);
        };
        let calibration = self.executor.calibration().await?;
        parser::parse_key(&raw, request, calibration).map(Some)
    }

    /// Read one value, the default value when no name is given.
    pub async fn get_value(&self, args: Vec<Arg>) -> RegResult<Option<ValueOutput>> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, name = ?request.name, "get_value");
        self.read_value(&request).await
    }

    async fn read_value(&self, request: &Request) -> RegResult<Option<ValueOutput>> {
        let Some(raw) = self.run(Operation::QueryValue, request).await? else {
            return Ok(None);
        };
        let calibration = self.executor.calibration().await?;
        Ok(parser::parse_value(&raw, request, calibration))
    }

    /// Read every value of a key.
    pub async fn get_values(&self, args: Vec<Arg>) -> RegResult<Option<ValuesOutput>> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, "get_values");
        let Some(raw) = self.run(Operation::QueryKey, &request).await? else {
            return Ok(None);
        };
        let calibration = self.executor.calibration().await?;
        Ok(Some(parser::parse_value_list(&raw, &request, calibration)))
    }

    /// List the direct subkeys of a key: names in simple format, full paths
    /// in complex format.
    pub async fn get_keys(&self, args: Vec<Arg>) -> RegResult<Option<Vec<String>>> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, "get_keys");
        self.list_keys(&request).await
    }

    async fn list_keys(&self, request: &Request) -> RegResult<Option<Vec<String>>> {
        let request = Request {
            recursive: false,
            ..request.clone()
        };
        match self.run(Operation::QueryKey, &request).await? {
            Some(raw) => parser::parse_key_names(&raw, &request).map(Some),
            None => Ok(None),
        }
    }

    /// Whether a key, or a value when a name is given, exists.
    pub async fn has(&self, args: Vec<Arg>) -> RegResult<bool> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, name = ?request.name, "has");
        if request.name.is_some() {
            self.value_exists(&request).await
        } else {
            self.key_exists(&request).await
        }
    }

    /// Whether a key exists.
    pub async fn has_key(&self, args: Vec<Arg>) -> RegResult<bool> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, "has_key");
        self.key_exists(&request).await
    }

    async fn key_exists(&self, request: &Request) -> RegResult<bool> {
        let request = Request {
            recursive: false,
            ..request.clone()
        };
        Ok(self.run(Operation::QueryKey, &request).await?.is_some())
    }

    /// Whether a value exists. The default value only counts when it holds
    /// data.
    pub async fn has_value(&self, args: Vec<Arg>) -> RegResult<bool> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, name = ?request.name, "has_value");
        self.value_exists(&request).await
    }

    async fn value_exists(&self, request: &Request) -> RegResult<bool> {
        let Some(raw) = self.run(Operation::QueryValue, request).await? else {
            return Ok(false);
        };
        let calibration = self.executor.calibration().await?;
        Ok(parser::parse_has_value(&raw, request, calibration))
    }

    // Writes

    /// Write a value when a name or data is given, otherwise create the key.
    pub async fn set(&self, args: Vec<Arg>) -> RegResult<()> {
        let request = self.request(CallKind::Write, args)?;
        debug!(path = ?request.path, name = ?request.name, "set");
        if request.name.is_some() || request.data.is_some() {
            self.write_value(&request).await
        } else {
            self.create_key(&request).await
        }
    }

    /// Create a key. Existing keys keep their values and subkeys, but lose
    /// the data of their default value.
    pub async fn set_key(&self, args: Vec<Arg>) -> RegResult<()> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, "set_key");
        self.create_key(&request).await
    }

    async fn create_key(&self, request: &Request) -> RegResult<()> {
        self.run(Operation::CreateKey, request).await?;
        Ok(())
    }

    /// Create or overwrite a value. A map payload writes one value per entry,
    /// nested maps becoming subkeys.
    pub async fn set_value(&self, args: Vec<Arg>) -> RegResult<()> {
        let request = self.request(CallKind::Write, args)?;
        debug!(path = ?request.path, name = ?request.name, "set_value");
        self.write_value(&request).await
    }

    async fn write_value(&self, request: &Request) -> RegResult<()> {
        let Some(payload @ Data::Map(_)) = &request.data else {
            self.run(Operation::WriteValue, request).await?;
            return Ok(());
        };

        let key_path = request.key_path()?;
        let name = request.name.as_deref().unwrap_or("");
        let writes = command::plan_structured_write(key_path, name, payload);
        debug!(path = key_path, count = writes.len(), "structured write");
        try_join_all(writes.iter().map(|write| self.write_leaf(write, request))).await?;
        Ok(())
    }

    async fn write_leaf(&self, write: &ValueWrite, request: &Request) -> RegResult<()> {
        let args = command::write_value(
            &write.path,
            &write.name,
            &write.data,
            None,
            request.view_flag(),
        )?;
        self.executor.execute(&args).await?;
        Ok(())
    }

    // Deletes

    /// Delete a value when a name is given, otherwise the whole key.
    pub async fn delete(&self, args: Vec<Arg>) -> RegResult<()> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, name = ?request.name, "delete");
        let operation = if request.name.is_some() {
            Operation::DeleteValue
        } else {
            Operation::DeleteKey
        };
        self.run(operation, &request).await?;
        Ok(())
    }

    /// Delete a key with all its values and subkeys. Missing keys are
    /// ignored.
    pub async fn delete_key(&self, args: Vec<Arg>) -> RegResult<()> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, "delete_key");
        self.run(Operation::DeleteKey, &request).await?;
        Ok(())
    }

    /// Delete one value, the default value when no name is given.
    pub async fn delete_value(&self, args: Vec<Arg>) -> RegResult<()> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, name = ?request.name, "delete_value");
        self.run(Operation::DeleteValue, &request).await?;
        Ok(())
    }

    /// Delete every value and subkey of a key, keeping the key itself.
    pub async fn clear(&self, args: Vec<Arg>) -> RegResult<()> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, "clear");
        try_join(self.remove_values(&request), self.remove_keys(&request)).await?;
        Ok(())
    }

    /// Delete every value of a key, keeping its subkeys.
    pub async fn clear_values(&self, args: Vec<Arg>) -> RegResult<()> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, "clear_values");
        self.remove_values(&request).await
    }

    async fn remove_values(&self, request: &Request) -> RegResult<()> {
        self.run(Operation::DeleteAllValues, request).await?;
        Ok(())
    }

    /// Delete every subkey of a key, keeping its values.
    pub async fn clear_keys(&self, args: Vec<Arg>) -> RegResult<()> {
        let request = self.request(CallKind::Read, args)?;
        debug!(path = ?request.path, "clear_keys");
        self.remove_keys(&request).await
    }

    async fn remove_keys(&self, request: &Request) -> RegResult<()> {
        let listing = Request {
            format: Format::Simple,
            lowercase: false,
            ..request.clone()
        };
        let Some(names) = self.list_keys(&listing).await? else {
            return Ok(());
        };

        let key_path = request.key_path()?;
        let subkeys: Vec<Request> = names
            .iter()
            .map(|name| request.at_path(path::join(key_path, name)))
            .collect();
        try_join_all(
            subkeys
                .iter()
                .map(|subkey| self.run(Operation::DeleteKey, subkey)),
        )
        .await?;
        Ok(())
    }
}
