//! Registry Kit (regkit) - Windows registry access through `reg.exe`
//!
//! regkit reads, writes and deletes registry keys and values by running the
//! `reg.exe` command line tool and parsing its text output:
//!
//! - **`client`** - The `Registry` handle and the `RegistryKey` wrapper
//! - **`options`** - Positional argument normalization and option layering
//! - **`command`** - `reg.exe` argument vectors
//! - **`executor`** - Process execution, locale calibration, code pages
//! - **`parser`** - Output parsing into key trees and values
//! - **`value`** - Value types and payload conversion
//! - **`path`** - Key path canonicalization and root aliases
//! - **`config`** - Configuration and environment loading
//! - **`observability`** - Markdown command log
//!
//! # Features
//!
//! ```toml
//! [dependencies]
//! regkit = { version = "0.1", default-features = false }
//! # Or pick the layers you need:
//! regkit = { version = "0.1", features = ["config", "observability"] }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use regkit::prelude::*;
//!
//! # async fn demo() -> RegResult<()> {
//! let registry = Registry::new();
//!
//! registry.set(args!["HKCU\\Software\\Vendor", "Version", 3u32]).await?;
//! if let Some(tree) = registry.get_key(args!["HKCU\\Software\\Vendor", true]).await? {
//!     println!("{:?}", tree.value_names());
//! }
//! registry.delete(args!["HKCU\\Software\\Vendor"]).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Using the config feature
//!
//! ```ignore
//! use regkit::client::Registry;
//! use regkit::config::{ConfigurationLoader, EnvironmentLoader};
//! use std::path::Path;
//!
//! let env = EnvironmentLoader::new(None);
//! let mut loader = ConfigurationLoader::new(Some(Path::new("config/regkit.toml"))).unwrap();
//! env.apply(&mut loader.config);
//!
//! let registry = Registry::from_config(&loader.config).unwrap();
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod command;
pub mod error;
pub mod executor;
pub mod options;
pub mod parser;
pub mod path;
pub mod value;

/// In-memory `reg.exe` emulation and scripted spawners for tests.
pub mod test_utils;

/// Configuration management (enabled with the `config` feature)
#[cfg(feature = "config")]
pub mod config;

/// Observability utilities (enabled with the `observability` feature)
#[cfg(feature = "observability")]
pub mod observability;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::args;
    pub use crate::client::{Item, Registry, RegistryKey};
    pub use crate::error::{RegError, RegResult};
    pub use crate::executor::{Executor, ProcessSpawner, TokioSpawner};
    pub use crate::options::{Arg, ClientOptions, Format, Options, View};
    pub use crate::parser::{KeyTree, ValueOutput, ValuesOutput};
    pub use crate::value::{data_map, Data, ValueEntry, ValueType};

    #[cfg(feature = "config")]
    pub use crate::config::{Configuration, ConfigurationLoader, EnvironmentLoader};

    #[cfg(feature = "observability")]
    pub use crate::observability::CommandLog;
}
