//! Environment variable loading and management.

use std::env;
use std::path::Path;

use tracing::warn;

use super::config::Configuration;

/// Overrides `execution.program`.
pub const PROGRAM_VAR: &str = "REGKIT_PROGRAM";
/// Overrides `execution.timeout_seconds`.
pub const TIMEOUT_VAR: &str = "REGKIT_TIMEOUT_SECONDS";

/// Loads environment variables from .env file and system environment.
#[derive(Debug, Clone)]
pub struct EnvironmentLoader {
    env_file: Option<String>,
}

impl EnvironmentLoader {
    /// Initialize the environment loader.
    ///
    /// # Arguments
    /// * `env_file` - Path to a .env file. Nothing is loaded when None.
    pub fn new(env_file: Option<&Path>) -> Self {
        if let Some(path) = env_file.filter(|path| path.exists()) {
            if let Err(e) = dotenv::from_path(path) {
                warn!("Failed to load .env file {}: {}", path.display(), e);
            }
        }

        Self {
            env_file: env_file.map(|p| p.to_string_lossy().to_string()),
        }
    }

    /// The .env file this loader was created with.
    pub fn env_file(&self) -> Option<&str> {
        self.env_file.as_deref()
    }

    /// Program to run instead of `reg.exe`.
    pub fn program(&self) -> Option<String> {
        env::var(PROGRAM_VAR).ok().filter(|value| !value.is_empty())
    }

    /// Process timeout in seconds. Unparsable values are ignored.
    pub fn timeout_seconds(&self) -> Option<u64> {
        let raw = env::var(TIMEOUT_VAR).ok()?;
        match raw.trim().parse() {
            Ok(seconds) => Some(seconds),
            Err(_) => {
                warn!("Ignoring {}={:?}: not a number of seconds", TIMEOUT_VAR, raw);
                None
            }
        }
    }

    /// Apply the environment overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut Configuration) {
        if let Some(program) = self.program() {
            config.execution.program = program;
        }
        if let Some(seconds) = self.timeout_seconds() {
            config.execution.timeout_seconds = Some(seconds);
        }
    }
}

impl Default for EnvironmentLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    // Both variables are process wide, so one test owns them.
    #[test]
    fn test_overrides() {
        env::remove_var(PROGRAM_VAR);
        env::remove_var(TIMEOUT_VAR);
        let env_loader = EnvironmentLoader::default();
        assert_eq!(env_loader.program(), None);
        assert_eq!(env_loader.timeout_seconds(), None);

        let mut config = Configuration::default();
        env_loader.apply(&mut config);
        assert_eq!(config, Configuration::default());

        env::set_var(TIMEOUT_VAR, "soon");
        assert_eq!(env_loader.timeout_seconds(), None);

        let env_file = NamedTempFile::new().unwrap();
        fs::write(
            env_file.path(),
            "REGKIT_PROGRAM=C:/Tools/reg.exe\nREGKIT_TIMEOUT_SECONDS=15\n",
        )
        .unwrap();
        env::remove_var(TIMEOUT_VAR);
        let env_loader = EnvironmentLoader::new(Some(env_file.path()));
        assert!(env_loader.env_file().is_some());
        env_loader.apply(&mut config);
        assert_eq!(config.execution.program, "C:/Tools/reg.exe");
        assert_eq!(config.execution.timeout_seconds, Some(15));

        env::remove_var(PROGRAM_VAR);
        env::remove_var(TIMEOUT_VAR);
    }

    #[test]
    fn test_env_file_loading() {
        let env_loader = EnvironmentLoader::new(None);
        assert!(env_loader.env_file().is_none());
    }
}
