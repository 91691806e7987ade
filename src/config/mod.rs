//! Configuration management.
//!
//! This module provides configuration loading through TOML files and
//! environment variable overrides via `.env` files.
//!
//! # Example
//!
//! ```no_run
//! use regkit::client::Registry;
//! use regkit::config::{ConfigurationLoader, EnvironmentLoader};
//! use std::path::Path;
//!
//! let env = EnvironmentLoader::new(Some(Path::new(".env")));
//!
//! let mut loader = ConfigurationLoader::new(Some(Path::new("config/regkit.toml"))).unwrap();
//! env.apply(&mut loader.config);
//!
//! let registry = Registry::from_config(&loader.config).unwrap();
//! println!("Program: {}", registry.executor().program());
//! ```

pub mod config;
pub mod environment;

pub use self::config::{
    Configuration, ConfigurationLoader, DefaultsConfig, ExecutionConfig, LoggingConfig,
};
pub use self::environment::EnvironmentLoader;
